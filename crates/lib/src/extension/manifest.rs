//! Unit manifests stored inside extension packages.
//!
//! Each unit is described by one JSON file under `META-INF/cish/`:
//!
//! ```json
//! {
//!   "name": "org.example.Github",
//!   "version": "1.2.0",
//!   "provides": ["org.example.Github"],
//!   "dependencies": [
//!     { "registry": "com.google.code.gson:gson:2.8.6" },
//!     { "url": "https://example.com/lib.jar", "version": "1.0" },
//!     { "extension": "org.example.Base", "version": "2", "constraint": "higher" }
//!   ],
//!   "operations": [
//!     { "name": "stars", "dependencies": [{ "url": "file:///opt/x.jar" }] }
//!   ]
//! }
//! ```
//!
//! `version` defaults to `latest`, `constraint` to `equals` and `provides` to
//! the unit's own name.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use super::types::{DependencyDeclaration, DependencySource, ExtensionPackage};
use crate::version::{ConstraintKind, LATEST, Version, VersionError};

/// Errors raised while interpreting a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("invalid manifest JSON: {0}")]
  Json(#[source] serde_json::Error),

  #[error("manifest has an empty name")]
  EmptyName,

  #[error("invalid version in {context}: {source}")]
  Version {
    context: String,
    #[source]
    source: VersionError,
  },

  #[error("invalid registry coordinate '{0}' (expected group:artifact:version)")]
  InvalidCoordinate(String),

  #[error("dependency declares no source (expected one of registry, url, extension)")]
  MissingSource,

  #[error("dependency declares more than one source")]
  AmbiguousSource,
}

#[derive(Debug, Deserialize)]
struct UnitManifest {
  name: String,
  #[serde(default)]
  version: Option<String>,
  #[serde(default)]
  provides: Vec<String>,
  #[serde(default)]
  dependencies: Vec<DependencyManifest>,
  #[serde(default)]
  operations: Vec<OperationManifest>,
}

#[derive(Debug, Deserialize)]
struct OperationManifest {
  name: String,
  #[serde(default)]
  dependencies: Vec<DependencyManifest>,
}

#[derive(Debug, Deserialize)]
struct DependencyManifest {
  registry: Option<String>,
  url: Option<String>,
  extension: Option<String>,
  version: Option<String>,
  #[serde(default)]
  constraint: ConstraintKind,
}

/// Parse one manifest into a unit read from `package`.
///
/// Registry coordinates are resolved against `registry_url`.
pub fn parse_manifest(bytes: &[u8], package: &Path, registry_url: &str) -> Result<ExtensionPackage, ManifestError> {
  let manifest: UnitManifest = serde_json::from_slice(bytes).map_err(ManifestError::Json)?;

  let name = manifest.name.trim().to_string();
  if name.is_empty() {
    return Err(ManifestError::EmptyName);
  }

  let version = parse_version(manifest.version.as_deref(), &name)?;

  let mut provides: Vec<String> = Vec::new();
  for capability in manifest.provides {
    if !provides.contains(&capability) {
      provides.push(capability);
    }
  }
  if provides.is_empty() {
    provides.push(name.clone());
  }

  let mut dependencies: Vec<DependencyDeclaration> = Vec::new();
  let mut operations = Vec::with_capacity(manifest.operations.len());
  let declared = manifest
    .dependencies
    .into_iter()
    .chain(manifest.operations.into_iter().flat_map(|op| {
      operations.push(op.name);
      op.dependencies
    }));
  for dep in declared {
    let dep = dep.into_declaration(registry_url)?;
    if !dependencies.contains(&dep) {
      dependencies.push(dep);
    }
  }

  Ok(ExtensionPackage {
    package: package.to_path_buf(),
    name,
    version,
    provides,
    dependencies,
    operations,
  })
}

impl DependencyManifest {
  fn into_declaration(self, registry_url: &str) -> Result<DependencyDeclaration, ManifestError> {
    let source_count = [self.registry.is_some(), self.url.is_some(), self.extension.is_some()]
      .iter()
      .filter(|present| **present)
      .count();
    match source_count {
      0 => return Err(ManifestError::MissingSource),
      1 => {}
      _ => return Err(ManifestError::AmbiguousSource),
    }

    if let Some(coordinate) = self.registry {
      let (locator, version) = registry_locator(registry_url, &coordinate)?;
      let version = parse_version(Some(&version), &coordinate)?;
      return Ok(DependencyDeclaration {
        source: DependencySource::Registry { coordinate, locator },
        version,
        constraint: self.constraint,
      });
    }

    let (source, context) = match (self.url, self.extension) {
      (Some(locator), _) => (DependencySource::Url { locator: locator.clone() }, locator),
      (_, Some(name)) => (DependencySource::Extension { name: name.clone() }, name),
      (None, None) => return Err(ManifestError::MissingSource),
    };

    Ok(DependencyDeclaration {
      source,
      version: parse_version(self.version.as_deref(), &context)?,
      constraint: self.constraint,
    })
  }
}

/// Resolve a `group:artifact:version` coordinate to its download URL.
///
/// Returns the URL and the coordinate's version string.
pub fn registry_locator(registry_url: &str, coordinate: &str) -> Result<(String, String), ManifestError> {
  let parts: Vec<&str> = coordinate.trim().split(':').collect();
  let [group, artifact, version] = parts.as_slice() else {
    return Err(ManifestError::InvalidCoordinate(coordinate.to_string()));
  };
  if group.is_empty() || artifact.is_empty() || version.is_empty() {
    return Err(ManifestError::InvalidCoordinate(coordinate.to_string()));
  }

  let url = format!(
    "{}/{}/{}/{}/{}-{}.jar",
    registry_url.trim_end_matches('/'),
    group.replace('.', "/"),
    artifact,
    version,
    artifact,
    version
  );
  Ok((url, version.to_string()))
}

fn parse_version(raw: Option<&str>, context: &str) -> Result<Version, ManifestError> {
  Version::parse(raw.unwrap_or(LATEST)).map_err(|source| ManifestError::Version {
    context: context.to_string(),
    source,
  })
}
