//! Reading extension units out of package archives.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use tracing::{debug, error};

use super::manifest::parse_manifest;
use super::types::ExtensionPackage;
use crate::consts::{DEFAULT_REGISTRY_URL, MANIFEST_DIR, PACKAGE_EXTENSIONS};

/// Whether `path` has a package file extension.
pub fn is_package(path: &Path) -> bool {
  path
    .extension()
    .map(|ext| {
      let ext = ext.to_string_lossy().to_ascii_lowercase();
      PACKAGE_EXTENSIONS.contains(&ext.as_str())
    })
    .unwrap_or(false)
}

/// Reads the units declared by a package.
#[derive(Debug, Clone)]
pub struct ExtensionScanner {
  registry_url: String,
}

impl Default for ExtensionScanner {
  fn default() -> Self {
    Self::new(DEFAULT_REGISTRY_URL)
  }
}

impl ExtensionScanner {
  /// Scanner resolving registry coordinates against `registry_url`.
  pub fn new(registry_url: impl Into<String>) -> Self {
    Self {
      registry_url: registry_url.into(),
    }
  }

  pub fn registry_url(&self) -> &str {
    &self.registry_url
  }

  /// Every valid unit in `package`, ordered by manifest entry name.
  ///
  /// Never fails: an unreadable archive yields no units, and a bad manifest
  /// is logged and skipped while its siblings are still read.
  pub fn scan(&self, package: &Path) -> Vec<ExtensionPackage> {
    let file = match File::open(package) {
      Ok(file) => file,
      Err(e) => {
        error!(package = %package.display(), error = %e, "failed to open extension package");
        return Vec::new();
      }
    };

    let mut archive = match zip::ZipArchive::new(BufReader::new(file)) {
      Ok(archive) => archive,
      Err(e) => {
        error!(package = %package.display(), error = %e, "extension package is not a valid archive");
        return Vec::new();
      }
    };

    let mut manifests: Vec<String> = archive
      .file_names()
      .filter(|name| name.starts_with(MANIFEST_DIR) && name.ends_with(".json"))
      .map(str::to_string)
      .collect();
    manifests.sort();

    let mut units = Vec::with_capacity(manifests.len());
    for entry in manifests {
      let mut bytes = Vec::new();
      let read = archive
        .by_name(&entry)
        .map_err(|e| e.to_string())
        .and_then(|mut file| file.read_to_end(&mut bytes).map_err(|e| e.to_string()));
      if let Err(e) = read {
        error!(package = %package.display(), entry = %entry, error = %e, "failed to read unit manifest");
        continue;
      }

      match parse_manifest(&bytes, package, &self.registry_url) {
        Ok(unit) => {
          debug!(package = %package.display(), unit = %unit, "found extension unit");
          units.push(unit);
        }
        Err(e) => {
          error!(package = %package.display(), entry = %entry, error = %e, "skipping invalid unit manifest");
        }
      }
    }

    units
  }
}
