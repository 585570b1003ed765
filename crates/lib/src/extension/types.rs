//! Extension units and their dependency declarations.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::version::{ConstraintKind, Version};

/// Where a dependency comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DependencySource {
  /// Direct URL or local path.
  Url { locator: String },
  /// `group:artifact:version` coordinate, already resolved to its download URL.
  Registry { coordinate: String, locator: String },
  /// Another extension unit, identified by name. Never downloaded.
  Extension { name: String },
}

/// One declared dependency of an extension unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DependencyDeclaration {
  pub source: DependencySource,
  pub version: Version,
  pub constraint: ConstraintKind,
}

impl DependencyDeclaration {
  pub fn url(locator: impl Into<String>, version: Version) -> Self {
    Self {
      source: DependencySource::Url {
        locator: locator.into(),
      },
      version,
      constraint: ConstraintKind::default(),
    }
  }

  pub fn extension(name: impl Into<String>, version: Version, constraint: ConstraintKind) -> Self {
    Self {
      source: DependencySource::Extension { name: name.into() },
      version,
      constraint,
    }
  }

  /// Locator to fetch, for dependencies that are artifacts.
  pub fn locator(&self) -> Option<&str> {
    match &self.source {
      DependencySource::Url { locator } | DependencySource::Registry { locator, .. } => Some(locator),
      DependencySource::Extension { .. } => None,
    }
  }

  pub fn is_downloadable(&self) -> bool {
    self.locator().is_some()
  }
}

impl fmt::Display for DependencyDeclaration {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.source {
      DependencySource::Url { locator } => write!(f, "{}@{}", locator, self.version),
      DependencySource::Registry { coordinate, .. } => write!(f, "{}", coordinate),
      DependencySource::Extension { name } => write!(f, "{} ({} {})", name, self.constraint, self.version),
    }
  }
}

/// Identity used to detect the same unit being loaded twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtensionId {
  pub package: PathBuf,
  pub name: String,
  pub version: Version,
}

/// One extension unit declared by a package.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtensionPackage {
  /// Archive the unit was read from.
  pub package: PathBuf,
  pub name: String,
  pub version: Version,
  /// Capability identifiers, distinct, in declaration order.
  pub provides: Vec<String>,
  /// Distinct dependencies of the unit and its operations, first occurrence first.
  pub dependencies: Vec<DependencyDeclaration>,
  pub operations: Vec<String>,
}

impl ExtensionPackage {
  pub fn id(&self) -> ExtensionId {
    ExtensionId {
      package: self.package.clone(),
      name: self.name.clone(),
      version: self.version.clone(),
    }
  }

  pub fn package_path(&self) -> &Path {
    &self.package
  }

  /// Dependencies that resolve to artifacts.
  pub fn artifacts(&self) -> impl Iterator<Item = &DependencyDeclaration> {
    self.dependencies.iter().filter(|d| d.is_downloadable())
  }

  /// Requirements on other extension units.
  pub fn requirements(&self) -> impl Iterator<Item = (&str, &DependencyDeclaration)> {
    self.dependencies.iter().filter_map(|d| match &d.source {
      DependencySource::Extension { name } => Some((name.as_str(), d)),
      _ => None,
    })
  }
}

impl fmt::Display for ExtensionPackage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}@{}", self.name, self.version)
  }
}
