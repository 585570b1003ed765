//! Build configuration.
//!
//! Defaults come from the platform directories. Environment variables override
//! them:
//!
//! - `CISH_EXTENSION_PATH`: extension search directories (platform path list)
//! - `CISH_REGISTRY_URL`: registry used to resolve `group:artifact:version`
//! - `CISH_CACHE_DIR`: root of the build cache, asset store and build outputs

use std::path::{Path, PathBuf};

use crate::consts::DEFAULT_REGISTRY_URL;
use crate::extension::resolver::{CollisionPolicy, DEFAULT_SCAN_CONCURRENCY};
use crate::platform::paths::{assets_dir, build_cache_file, compiled_dir, extension_search_path};
use crate::util::hash::{hash_str, short_hash};

/// Environment variable overriding the registry URL.
pub const REGISTRY_URL_ENV: &str = "CISH_REGISTRY_URL";

/// Paths and knobs for one build pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
  /// Extension search directories, in scan order.
  pub extension_dirs: Vec<PathBuf>,
  /// Persisted build cache.
  pub cache_file: PathBuf,
  /// Asset store directory.
  pub assets_dir: PathBuf,
  /// Root of the per-script output directories.
  pub output_root: PathBuf,
  pub registry_url: String,
  pub collision_policy: CollisionPolicy,
  /// Maximum number of packages scanned at once.
  pub scan_concurrency: usize,
}

impl Default for BuildConfig {
  fn default() -> Self {
    let registry_url = std::env::var(REGISTRY_URL_ENV)
      .ok()
      .filter(|url| !url.trim().is_empty())
      .unwrap_or_else(|| DEFAULT_REGISTRY_URL.to_string());

    Self {
      extension_dirs: extension_search_path(),
      cache_file: build_cache_file(),
      assets_dir: assets_dir(),
      output_root: compiled_dir(),
      registry_url,
      collision_policy: CollisionPolicy::default(),
      scan_concurrency: DEFAULT_SCAN_CONCURRENCY,
    }
  }
}

impl BuildConfig {
  pub fn with_extension_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
    self.extension_dirs = dirs;
    self
  }

  /// Place the build cache, asset store and outputs under `dir`.
  pub fn with_cache_dir(mut self, dir: impl AsRef<Path>) -> Self {
    let dir = dir.as_ref();
    self.cache_file = dir.join("build-cache.json");
    self.assets_dir = dir.join("assets");
    self.output_root = dir.join("compiled");
    self
  }

  pub fn with_cache_file(mut self, path: impl Into<PathBuf>) -> Self {
    self.cache_file = path.into();
    self
  }

  pub fn with_assets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.assets_dir = dir.into();
    self
  }

  pub fn with_output_root(mut self, dir: impl Into<PathBuf>) -> Self {
    self.output_root = dir.into();
    self
  }

  pub fn with_registry_url(mut self, url: impl Into<String>) -> Self {
    self.registry_url = url.into();
    self
  }

  pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
    self.collision_policy = policy;
    self
  }

  pub fn with_scan_concurrency(mut self, concurrency: usize) -> Self {
    self.scan_concurrency = concurrency.max(1);
    self
  }

  /// Output directory for the build of `root` (a canonical path).
  pub fn output_dir_for(&self, root: &Path) -> PathBuf {
    let hash = hash_str(&root.to_string_lossy());
    self.output_root.join(short_hash(&hash.0))
  }
}
