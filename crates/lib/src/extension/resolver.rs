//! Extension discovery, load sequencing and conflict detection.
//!
//! # Algorithm Overview
//!
//! 1. Walk each search directory (sorted by file name) collecting packages
//! 2. Scan packages in parallel on blocking tasks, then queue their units in
//!    discovery order
//! 3. Load queued units strictly first-in first-out, detecting duplicates,
//!    shared dependencies and shared capabilities
//! 4. Check every requirement on another extension against the loaded set
//!
//! Duplicates abort resolution. Other conflicts are logged and recorded; they
//! only abort under [`CollisionPolicy::Deny`]. No attempt is made to pick a
//! winner between conflicting units.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use super::scanner::{ExtensionScanner, is_package};
use super::types::{DependencyDeclaration, ExtensionId, ExtensionPackage};
use crate::assets::AssetStore;
use crate::version::{ConstraintKind, Version};

/// Default number of packages scanned at once.
pub const DEFAULT_SCAN_CONCURRENCY: usize = 10;

/// What to do when a conflict is detected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
  /// Log and record, keep loading.
  #[default]
  Warn,
  /// Abort resolution on the first conflict.
  Deny,
}

/// A detected conflict between extension units.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Collision {
  /// `unit` declares a dependency already declared by `loaded`.
  Dependency {
    unit: String,
    loaded: String,
    dependency: String,
  },
  /// `unit` provides a capability already provided by `provider`.
  Capability {
    unit: String,
    provider: String,
    capability: String,
  },
  /// `unit` requires another extension that is missing or has the wrong version.
  UnsatisfiedRequirement {
    unit: String,
    requirement: String,
    constraint: ConstraintKind,
    required: Version,
    found: Option<Version>,
  },
}

impl fmt::Display for Collision {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Collision::Dependency {
        unit,
        loaded,
        dependency,
      } => write!(f, "{} shares dependency {} with {}", unit, dependency, loaded),
      Collision::Capability {
        unit,
        provider,
        capability,
      } => write!(f, "{} provides {} already provided by {}", unit, capability, provider),
      Collision::UnsatisfiedRequirement {
        unit,
        requirement,
        constraint,
        required,
        found: Some(found),
      } => write!(
        f,
        "{} requires {} {} {}, found {}",
        unit, requirement, constraint, required, found
      ),
      Collision::UnsatisfiedRequirement {
        unit,
        requirement,
        constraint,
        required,
        found: None,
      } => write!(
        f,
        "{} requires {} {} {}, which is not loaded",
        unit, requirement, constraint, required
      ),
    }
  }
}

/// Errors that abort resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
  #[error("extension {name}@{version} from {} was already loaded", package.display())]
  DuplicateExtension {
    name: String,
    version: Version,
    package: PathBuf,
  },

  #[error("extension conflict: {0}")]
  Collision(Collision),
}

/// A dependency artifact that could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactFailure {
  pub unit: String,
  pub locator: String,
  pub error: String,
}

/// Local paths of every loaded package and its dependency artifacts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArtifactList {
  /// Distinct paths, per unit in load order: its package, then its artifacts.
  pub paths: Vec<PathBuf>,
  pub failures: Vec<ArtifactFailure>,
}

impl ArtifactList {
  pub fn is_complete(&self) -> bool {
    self.failures.is_empty()
  }
}

/// Sequences extension units for loading.
#[derive(Debug)]
pub struct ExtensionResolver {
  scanner: ExtensionScanner,
  policy: CollisionPolicy,
  scan_concurrency: usize,
  pending: VecDeque<ExtensionPackage>,
  loaded: Vec<ExtensionPackage>,
  loaded_ids: HashSet<ExtensionId>,
  dependency_owners: HashMap<DependencyDeclaration, String>,
  providers: HashMap<String, String>,
  collisions: Vec<Collision>,
}

impl Default for ExtensionResolver {
  fn default() -> Self {
    Self::new(ExtensionScanner::default())
  }
}

impl ExtensionResolver {
  pub fn new(scanner: ExtensionScanner) -> Self {
    Self {
      scanner,
      policy: CollisionPolicy::default(),
      scan_concurrency: DEFAULT_SCAN_CONCURRENCY,
      pending: VecDeque::new(),
      loaded: Vec::new(),
      loaded_ids: HashSet::new(),
      dependency_owners: HashMap::new(),
      providers: HashMap::new(),
      collisions: Vec::new(),
    }
  }

  pub fn with_policy(mut self, policy: CollisionPolicy) -> Self {
    self.policy = policy;
    self
  }

  pub fn with_scan_concurrency(mut self, concurrency: usize) -> Self {
    self.scan_concurrency = concurrency.max(1);
    self
  }

  /// Queue every unit found under `dirs`. Returns the number queued.
  ///
  /// Missing directories are skipped. Packages are scanned in parallel but
  /// their units are queued in discovery order.
  pub async fn scan_directories(&mut self, dirs: &[PathBuf]) -> usize {
    let packages = discover_packages(dirs);
    info!(packages = packages.len(), "scanning extension packages");

    let semaphore = Arc::new(Semaphore::new(self.scan_concurrency));
    let mut join_set = JoinSet::new();
    for (index, package) in packages.iter().cloned().enumerate() {
      let scanner = self.scanner.clone();
      let semaphore = semaphore.clone();
      join_set.spawn(async move {
        let _permit = semaphore.acquire_owned().await.ok();
        let units = tokio::task::spawn_blocking(move || scanner.scan(&package)).await;
        (index, units)
      });
    }

    let mut results: Vec<Option<Vec<ExtensionPackage>>> = packages.iter().map(|_| None).collect();
    while let Some(joined) = join_set.join_next().await {
      match joined {
        Ok((index, Ok(units))) => results[index] = Some(units),
        Ok((index, Err(e))) => {
          error!(package = %packages[index].display(), error = %e, "package scan panicked");
        }
        Err(e) => error!(error = %e, "package scan task failed"),
      }
    }

    let mut queued = 0;
    for unit in results.into_iter().flatten().flatten() {
      self.pending.push_back(unit);
      queued += 1;
    }
    debug!(queued, "extension units queued");
    queued
  }

  /// Queue a unit discovered by other means.
  pub fn enqueue(&mut self, unit: ExtensionPackage) {
    self.pending.push_back(unit);
  }

  /// Load every queued unit in order, then check extension requirements.
  pub fn resolve_all(&mut self) -> Result<(), ResolveError> {
    let first_new = self.loaded.len();
    while let Some(unit) = self.pending.pop_front() {
      self.load(unit)?;
    }
    self.check_requirements(first_new)?;
    info!(
      loaded = self.loaded.len(),
      collisions = self.collisions.len(),
      "extensions resolved"
    );
    Ok(())
  }

  fn load(&mut self, unit: ExtensionPackage) -> Result<(), ResolveError> {
    let id = unit.id();
    if self.loaded_ids.contains(&id) {
      return Err(ResolveError::DuplicateExtension {
        name: id.name,
        version: id.version,
        package: id.package,
      });
    }

    let label = unit.to_string();
    for dep in unit.artifacts() {
      if let Some(owner) = self.dependency_owners.get(dep).cloned() {
        self.report(Collision::Dependency {
          unit: label.clone(),
          loaded: owner,
          dependency: dep.to_string(),
        })?;
      }
    }

    for capability in &unit.provides {
      if let Some(provider) = self.providers.get(capability).cloned() {
        self.report(Collision::Capability {
          unit: label.clone(),
          provider,
          capability: capability.clone(),
        })?;
      }
    }

    for dep in unit.artifacts() {
      self.dependency_owners.entry(dep.clone()).or_insert_with(|| label.clone());
    }
    for capability in &unit.provides {
      self.providers.entry(capability.clone()).or_insert_with(|| label.clone());
    }

    debug!(unit = %label, package = %unit.package.display(), "extension loaded");
    self.loaded_ids.insert(id);
    self.loaded.push(unit);
    Ok(())
  }

  fn check_requirements(&mut self, first_new: usize) -> Result<(), ResolveError> {
    let mut unsatisfied = Vec::new();
    for unit in &self.loaded[first_new..] {
      for (name, dep) in unit.requirements() {
        let mut candidates = self.loaded.iter().filter(|u| u.name == name).peekable();
        let found = candidates.peek().map(|u| u.version.clone());
        if candidates.any(|u| u.version.satisfies(&dep.version, dep.constraint)) {
          continue;
        }
        unsatisfied.push(Collision::UnsatisfiedRequirement {
          unit: unit.to_string(),
          requirement: name.to_string(),
          constraint: dep.constraint,
          required: dep.version.clone(),
          found,
        });
      }
    }

    for collision in unsatisfied {
      self.report(collision)?;
    }
    Ok(())
  }

  fn report(&mut self, collision: Collision) -> Result<(), ResolveError> {
    error!(collision = %collision, "extension conflict");
    self.collisions.push(collision.clone());
    match self.policy {
      CollisionPolicy::Warn => Ok(()),
      CollisionPolicy::Deny => Err(ResolveError::Collision(collision)),
    }
  }

  /// Distinct capabilities of all loaded units, in load order.
  pub fn capability_imports(&self) -> Vec<String> {
    let mut seen = HashSet::new();
    self
      .loaded
      .iter()
      .flat_map(|u| u.provides.iter())
      .filter(|c| seen.insert(c.as_str()))
      .cloned()
      .collect()
  }

  /// Fetch every dependency artifact and list the local paths.
  ///
  /// A failed fetch is recorded and the remaining artifacts are still fetched.
  pub async fn artifact_list(&self, store: &AssetStore) -> ArtifactList {
    let mut list = ArtifactList::default();
    let mut seen: HashSet<PathBuf> = HashSet::new();

    for unit in &self.loaded {
      if seen.insert(unit.package.clone()) {
        list.paths.push(unit.package.clone());
      }

      for locator in unit.artifacts().filter_map(DependencyDeclaration::locator) {
        match store.fetch(locator).await {
          Ok(asset) => {
            if seen.insert(asset.path.clone()) {
              list.paths.push(asset.path);
            }
          }
          Err(e) => {
            error!(unit = %unit, locator = %locator, error = %e, "failed to fetch dependency");
            list.failures.push(ArtifactFailure {
              unit: unit.to_string(),
              locator: locator.to_string(),
              error: e.to_string(),
            });
          }
        }
      }
    }

    list
  }

  pub fn loaded(&self) -> &[ExtensionPackage] {
    &self.loaded
  }

  pub fn pending(&self) -> impl Iterator<Item = &ExtensionPackage> {
    self.pending.iter()
  }

  pub fn collisions(&self) -> &[Collision] {
    &self.collisions
  }

  pub fn policy(&self) -> CollisionPolicy {
    self.policy
  }
}

/// Package files under `dirs`, in directory order then walk order.
fn discover_packages(dirs: &[PathBuf]) -> Vec<PathBuf> {
  let mut packages = Vec::new();
  for dir in dirs {
    if !dir.is_dir() {
      info!(dir = %dir.display(), "extension directory not found, skipping");
      continue;
    }

    for entry in WalkDir::new(dir).sort_by_file_name() {
      match entry {
        Ok(entry) if entry.file_type().is_file() && is_package(entry.path()) => {
          packages.push(entry.into_path());
        }
        Ok(_) => {}
        Err(e) => warn!(dir = %dir.display(), error = %e, "failed to read extension directory entry"),
      }
    }
  }
  packages
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::testutil::{unit_manifest, write_package};
  use std::fs;
  use tempfile::TempDir;
  use tracing_test::traced_test;

  fn unit(name: &str, version: &str, provides: &[&str], deps: Vec<DependencyDeclaration>) -> ExtensionPackage {
    ExtensionPackage {
      package: PathBuf::from(format!("/ext/{}.cxt", name)),
      name: name.to_string(),
      version: Version::parse(version).unwrap(),
      provides: provides.iter().map(|p| p.to_string()).collect(),
      dependencies: deps,
      operations: vec![],
    }
  }

  fn url_dep(locator: &str) -> DependencyDeclaration {
    DependencyDeclaration::url(locator, Version::latest())
  }

  fn resolver_with(units: Vec<ExtensionPackage>) -> ExtensionResolver {
    let mut resolver = ExtensionResolver::default();
    for u in units {
      resolver.enqueue(u);
    }
    resolver
  }

  mod resolve {
    use super::*;

    #[test]
    fn loads_in_fifo_order() {
      let mut resolver = resolver_with(vec![
        unit("b", "1", &["B"], vec![]),
        unit("a", "1", &["A"], vec![]),
      ]);

      resolver.resolve_all().unwrap();

      let names: Vec<_> = resolver.loaded().iter().map(|u| u.name.as_str()).collect();
      assert_eq!(names, vec!["b", "a"]);
      assert_eq!(resolver.pending().count(), 0);
      assert!(resolver.collisions().is_empty());
    }

    #[test]
    fn duplicate_unit_is_fatal() {
      let mut resolver = resolver_with(vec![unit("a", "1", &["A"], vec![]), unit("a", "1.0", &["A"], vec![])]);

      let err = resolver.resolve_all().unwrap_err();
      assert!(matches!(err, ResolveError::DuplicateExtension { ref name, .. } if name == "a"));
    }

    #[test]
    fn same_name_from_other_package_is_not_duplicate() {
      let mut other = unit("a", "1", &["A2"], vec![]);
      other.package = PathBuf::from("/elsewhere/a.cxt");
      let mut resolver = resolver_with(vec![unit("a", "1", &["A"], vec![]), other]);

      resolver.resolve_all().unwrap();
      assert_eq!(resolver.loaded().len(), 2);
    }

    #[test]
    #[traced_test]
    fn shared_capability_is_recorded() {
      let mut resolver = resolver_with(vec![unit("a", "1", &["X"], vec![]), unit("b", "1", &["X"], vec![])]);

      resolver.resolve_all().unwrap();

      assert_eq!(resolver.loaded().len(), 2);
      assert_eq!(
        resolver.collisions(),
        &[Collision::Capability {
          unit: "b@1".to_string(),
          provider: "a@1".to_string(),
          capability: "X".to_string(),
        }]
      );
      assert!(logs_contain("extension conflict"));
    }

    #[test]
    fn shared_dependency_is_recorded() {
      let mut resolver = resolver_with(vec![
        unit("a", "1", &["A"], vec![url_dep("file:///lib.jar")]),
        unit("b", "1", &["B"], vec![url_dep("file:///lib.jar")]),
      ]);

      resolver.resolve_all().unwrap();

      assert!(matches!(
        resolver.collisions(),
        [Collision::Dependency { unit, loaded, .. }] if unit == "b@1" && loaded == "a@1"
      ));
    }

    #[test]
    fn same_locator_other_version_is_not_shared() {
      let v2 = DependencyDeclaration::url("file:///lib.jar", Version::parse("2").unwrap());
      let mut resolver = resolver_with(vec![
        unit("a", "1", &["A"], vec![url_dep("file:///lib.jar")]),
        unit("b", "1", &["B"], vec![v2]),
      ]);

      resolver.resolve_all().unwrap();
      assert!(resolver.collisions().is_empty());
    }

    #[test]
    fn deny_policy_aborts() {
      let mut resolver = resolver_with(vec![unit("a", "1", &["X"], vec![]), unit("b", "1", &["X"], vec![])])
        .with_policy(CollisionPolicy::Deny);

      let err = resolver.resolve_all().unwrap_err();
      assert!(matches!(err, ResolveError::Collision(Collision::Capability { .. })));
      assert_eq!(resolver.loaded().len(), 1);
    }
  }

  mod requirements {
    use super::*;

    fn requires(name: &str, version: &str, kind: ConstraintKind) -> DependencyDeclaration {
      DependencyDeclaration::extension(name, Version::parse(version).unwrap(), kind)
    }

    #[test]
    fn satisfied_requirement() {
      let mut resolver = resolver_with(vec![
        unit("app", "1", &["App"], vec![requires("base", "2", ConstraintKind::Higher)]),
        unit("base", "2.1", &["Base"], vec![]),
      ]);

      resolver.resolve_all().unwrap();
      assert!(resolver.collisions().is_empty());
    }

    #[test]
    fn wrong_version_is_recorded() {
      let mut resolver = resolver_with(vec![
        unit("app", "1", &["App"], vec![requires("base", "2", ConstraintKind::Equals)]),
        unit("base", "3", &["Base"], vec![]),
      ]);

      resolver.resolve_all().unwrap();

      match resolver.collisions() {
        [Collision::UnsatisfiedRequirement { found, .. }] => {
          assert_eq!(found.as_ref(), Some(&Version::parse("3").unwrap()))
        }
        other => panic!("unexpected collisions: {other:?}"),
      }
    }

    #[test]
    fn missing_requirement_is_recorded() {
      let mut resolver = resolver_with(vec![unit(
        "app",
        "1",
        &["App"],
        vec![requires("base", "1", ConstraintKind::Any)],
      )]);

      resolver.resolve_all().unwrap();

      assert!(matches!(
        resolver.collisions(),
        [Collision::UnsatisfiedRequirement { found: None, .. }]
      ));
    }
  }

  mod imports {
    use super::*;

    #[test]
    fn distinct_in_load_order() {
      let mut resolver = resolver_with(vec![
        unit("a", "1", &["X", "Y"], vec![]),
        unit("b", "1", &["Z", "X"], vec![]),
      ]);
      resolver.resolve_all().unwrap();

      assert_eq!(resolver.capability_imports(), vec!["X", "Y", "Z"]);
    }
  }

  mod artifacts {
    use super::*;
    use crate::assets::AssetStore;

    #[tokio::test]
    async fn ordered_and_deduplicated() {
      let temp = TempDir::new().unwrap();
      let shared = temp.path().join("shared.jar");
      let own = temp.path().join("own.jar");
      fs::write(&shared, "s").unwrap();
      fs::write(&own, "o").unwrap();
      let shared_loc = shared.display().to_string();
      let own_loc = own.display().to_string();

      let mut resolver = resolver_with(vec![
        unit("a", "1", &["A"], vec![url_dep(&shared_loc)]),
        unit("b", "1", &["B"], vec![url_dep(&own_loc), url_dep(&shared_loc)]),
      ]);
      resolver.resolve_all().unwrap();

      let store = AssetStore::new(temp.path().join("assets"));
      let list = resolver.artifact_list(&store).await;

      let shared_asset = store.get(&shared_loc).unwrap();
      let own_asset = store.get(&own_loc).unwrap();
      assert_eq!(
        list.paths,
        vec![
          PathBuf::from("/ext/a.cxt"),
          shared_asset.path,
          PathBuf::from("/ext/b.cxt"),
          own_asset.path,
        ]
      );
      assert!(list.is_complete());
      assert_eq!(store.download_count(), 2);
    }

    #[tokio::test]
    async fn same_locator_at_two_versions_shares_one_asset() {
      let temp = TempDir::new().unwrap();
      let jar = temp.path().join("lib.jar");
      fs::write(&jar, "lib").unwrap();
      let locator = jar.display().to_string();

      let mut resolver = resolver_with(vec![
        unit("a", "1", &["A"], vec![url_dep(&locator)]),
        unit(
          "b",
          "1",
          &["B"],
          vec![DependencyDeclaration::url(&locator, Version::parse("2").unwrap())],
        ),
      ]);
      resolver.resolve_all().unwrap();

      let store = AssetStore::new(temp.path().join("assets"));
      let list = resolver.artifact_list(&store).await;

      assert!(list.is_complete());
      assert_eq!(store.len(), 1);
      assert_eq!(store.download_count(), 1);
      let stored: Vec<_> = list.paths.iter().filter(|p| p.starts_with(store.store_dir())).collect();
      assert_eq!(stored, vec![&store.get(&locator).unwrap().path]);
    }

    #[tokio::test]
    async fn failures_are_recorded() {
      let temp = TempDir::new().unwrap();
      let good = temp.path().join("good.jar");
      fs::write(&good, "g").unwrap();
      let missing = temp.path().join("missing.jar").display().to_string();

      let mut resolver = resolver_with(vec![unit(
        "a",
        "1",
        &["A"],
        vec![url_dep(&missing), url_dep(&good.display().to_string())],
      )]);
      resolver.resolve_all().unwrap();

      let store = AssetStore::new(temp.path().join("assets"));
      let list = resolver.artifact_list(&store).await;

      assert_eq!(list.paths.len(), 2);
      assert_eq!(list.failures.len(), 1);
      assert_eq!(list.failures[0].unit, "a@1");
      assert_eq!(list.failures[0].locator, missing);
    }

    #[tokio::test]
    async fn extension_requirements_are_not_fetched() {
      let temp = TempDir::new().unwrap();
      let dep = DependencyDeclaration::extension("base", Version::latest(), ConstraintKind::Any);
      let mut resolver = resolver_with(vec![unit("base", "1", &["B"], vec![]), unit("a", "1", &["A"], vec![dep])]);
      resolver.resolve_all().unwrap();

      let store = AssetStore::new(temp.path().join("assets"));
      let list = resolver.artifact_list(&store).await;

      assert_eq!(list.paths.len(), 2);
      assert_eq!(store.download_count(), 0);
    }
  }

  mod scanning {
    use super::*;

    #[tokio::test]
    async fn discovery_order_is_walk_order() {
      let temp = TempDir::new().unwrap();
      let dir = temp.path().join("ext");
      write_package(&dir, "b.cxt", &[unit_manifest("b", "1", &["B"], &[]).as_str()]);
      write_package(&dir, "a.zip", &[unit_manifest("a", "1", &["A"], &[]).as_str()]);
      write_package(&dir.join("sub"), "c.jar", &[unit_manifest("c", "1", &["C"], &[]).as_str()]);
      fs::write(dir.join("notes.txt"), "ignored").unwrap();

      let mut resolver = ExtensionResolver::default().with_scan_concurrency(2);
      let queued = resolver.scan_directories(&[dir]).await;

      assert_eq!(queued, 3);
      let names: Vec<_> = resolver.pending().map(|u| u.name.as_str()).collect();
      assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    #[traced_test]
    async fn missing_directory_is_skipped() {
      let temp = TempDir::new().unwrap();
      let present = temp.path().join("present");
      write_package(&present, "x.cxt", &[unit_manifest("x", "1", &["X"], &[]).as_str()]);

      let mut resolver = ExtensionResolver::default();
      let queued = resolver
        .scan_directories(&[temp.path().join("absent"), present])
        .await;

      assert_eq!(queued, 1);
      assert!(logs_contain("extension directory not found"));
    }

    #[tokio::test]
    async fn directories_keep_their_order() {
      let temp = TempDir::new().unwrap();
      let first = temp.path().join("z-first");
      let second = temp.path().join("a-second");
      write_package(&first, "p.cxt", &[unit_manifest("one", "1", &["1"], &[]).as_str()]);
      write_package(&second, "p.cxt", &[unit_manifest("two", "1", &["2"], &[]).as_str()]);

      let mut resolver = ExtensionResolver::default();
      resolver.scan_directories(&[first, second]).await;
      resolver.resolve_all().unwrap();

      let names: Vec<_> = resolver.loaded().iter().map(|u| u.name.as_str()).collect();
      assert_eq!(names, vec!["one", "two"]);
    }
  }
}
