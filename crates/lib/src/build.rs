//! Build orchestration.
//!
//! A build of a root script runs these steps:
//!
//! 1. Build the script tree ([`build_graph`])
//! 2. Ask the [`BuildCache`] whether the tree changed since the last build
//! 3. If it did, scan and resolve extensions, fetch their artifacts and copy
//!    them into the script's output directory
//! 4. Hand the artifact and import lists to a [`Compiler`]
//! 5. On success, record the tree's signature and persist the cache
//!
//! Compiling and loading are done outside this crate, behind [`Compiler`] and
//! [`LoadableUnit`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::assets::{AssetError, AssetStore};
use crate::config::BuildConfig;
use crate::extension::{ArtifactFailure, Collision, ExtensionResolver, ExtensionScanner, ResolveError};
use crate::script::{BuildCache, GraphError, RequireParser, ScriptGraph, build_graph};

/// Subdirectory of the output directory receiving artifacts.
pub const LIB_DIR: &str = "lib";

/// Error reported by a [`Compiler`].
#[derive(Debug, Error)]
#[error("compilation failed: {message}")]
pub struct CompileError {
  pub message: String,
}

impl CompileError {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
    }
  }
}

/// Errors that fail a build.
#[derive(Debug, Error)]
pub enum BuildError {
  #[error(transparent)]
  Graph(#[from] GraphError),

  #[error(transparent)]
  Resolve(#[from] ResolveError),

  #[error("{} dependency artifact(s) could not be fetched, first: {}", failures.len(), describe_first(failures))]
  Artifacts { failures: Vec<ArtifactFailure> },

  #[error(transparent)]
  Asset(#[from] AssetError),

  #[error(transparent)]
  Compile(#[from] CompileError),
}

fn describe_first(failures: &[ArtifactFailure]) -> String {
  failures
    .first()
    .map(|f| format!("{} for {}: {}", f.locator, f.unit, f.error))
    .unwrap_or_default()
}

/// Everything a compiler needs to build one root script.
#[derive(Debug, Clone)]
pub struct BuildPlan {
  pub graph: ScriptGraph,
  pub rebuild_required: bool,
  /// Distinct artifact copies inside `output_dir/lib`, in load order.
  pub artifacts: Vec<PathBuf>,
  /// Capabilities to import, in load order.
  pub imports: Vec<String>,
  pub collisions: Vec<Collision>,
  pub output_dir: PathBuf,
}

impl BuildPlan {
  /// Hand the artifact and import lists to a runtime loader.
  pub fn load_into<L: LoadableUnit>(&self, loader: &mut L) -> Result<(), L::Error> {
    loader.load(&self.artifacts, &self.imports)
  }
}

/// Compiles a prepared plan into the plan's output directory.
pub trait Compiler: Send + Sync {
  fn compile(&self, plan: &BuildPlan) -> Result<(), CompileError>;
}

/// A host runtime able to load resolved artifacts.
pub trait LoadableUnit {
  type Error;

  fn load(&mut self, artifacts: &[PathBuf], imports: &[String]) -> Result<(), Self::Error>;
}

/// Owns the asset store and build cache for the lifetime of the process.
#[derive(Debug)]
pub struct BuildPipeline {
  config: BuildConfig,
  assets: AssetStore,
  cache: BuildCache,
}

impl BuildPipeline {
  pub fn new(config: BuildConfig) -> Self {
    let cache = BuildCache::load_from(&config.cache_file);
    let assets = AssetStore::new(&config.assets_dir);
    Self { config, assets, cache }
  }

  pub fn config(&self) -> &BuildConfig {
    &self.config
  }

  pub fn assets(&self) -> &AssetStore {
    &self.assets
  }

  pub fn cache(&self) -> &BuildCache {
    &self.cache
  }

  pub fn cache_mut(&mut self) -> &mut BuildCache {
    &mut self.cache
  }

  /// Build the tree of `root` and decide whether it must be rebuilt.
  pub fn check(&self, root: &Path, parser: &dyn RequireParser) -> Result<(ScriptGraph, bool), BuildError> {
    let graph = build_graph(root, parser)?;
    let rebuild = self.cache.needs_rebuild(&graph);
    Ok((graph, rebuild))
  }

  /// Prepare everything a compiler needs, without compiling.
  ///
  /// When the tree is unchanged the plan has no artifacts or imports.
  pub async fn prepare(&self, root: &Path, parser: &dyn RequireParser) -> Result<BuildPlan, BuildError> {
    let (graph, rebuild_required) = self.check(root, parser)?;
    let output_dir = self.config.output_dir_for(graph.root_path());

    if !rebuild_required {
      return Ok(BuildPlan {
        graph,
        rebuild_required,
        artifacts: Vec::new(),
        imports: Vec::new(),
        collisions: Vec::new(),
        output_dir,
      });
    }

    let mut resolver = ExtensionResolver::new(ExtensionScanner::new(&self.config.registry_url))
      .with_policy(self.config.collision_policy)
      .with_scan_concurrency(self.config.scan_concurrency);
    resolver.scan_directories(&self.config.extension_dirs).await;
    resolver.resolve_all()?;

    let list = resolver.artifact_list(&self.assets).await;
    if !list.is_complete() {
      return Err(BuildError::Artifacts { failures: list.failures });
    }

    let lib_dir = output_dir.join(LIB_DIR);
    let mut artifacts = Vec::with_capacity(list.paths.len());
    let mut staged = HashSet::new();
    for path in &list.paths {
      let target = match self.assets.find_by_path(path) {
        Some(asset) => self.assets.materialize(&asset, &lib_dir).await?,
        None => self.assets.stage_package(path, &lib_dir).await?,
      };
      if staged.insert(target.clone()) {
        artifacts.push(target);
      }
    }

    info!(
      root = %graph.root_path().display(),
      scripts = graph.len(),
      artifacts = artifacts.len(),
      output = %output_dir.display(),
      "build prepared"
    );

    Ok(BuildPlan {
      imports: resolver.capability_imports(),
      collisions: resolver.collisions().to_vec(),
      graph,
      rebuild_required,
      artifacts,
      output_dir,
    })
  }

  /// Prepare and, if needed, compile `root`, then persist the cache.
  pub async fn build(
    &mut self,
    root: &Path,
    parser: &dyn RequireParser,
    compiler: &dyn Compiler,
  ) -> Result<BuildPlan, BuildError> {
    let plan = self.prepare(root, parser).await?;
    if !plan.rebuild_required {
      debug!(root = %plan.graph.root_path().display(), "build up to date");
      return Ok(plan);
    }

    compiler.compile(&plan)?;
    self.cache.record(&plan.graph);
    if let Err(e) = self.cache.store() {
      warn!(error = %e, "failed to persist build cache");
    }
    Ok(plan)
  }
}
