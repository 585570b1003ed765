//! Incremental build cache.
//!
//! Each root script maps to the combined signature of its tree: the SHA-256 of
//! every node's content, ordered by node path and joined with `:`. A build is
//! needed when the stored signature is missing or differs.
//!
//! # File Format
//!
//! ```json
//! {
//!   "version": 1,
//!   "entries": {
//!     "/home/user/scripts/main.s": "9f86d0...:2c26b4..."
//!   }
//! }
//! ```
//!
//! A cache that cannot be read or parsed is treated as empty.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::graph::ScriptGraph;
use crate::platform::paths::build_cache_file;
use crate::util::hash::hash_str;

/// Current cache file format version.
pub const CACHE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CacheFile {
  version: u32,
  entries: BTreeMap<String, String>,
}

/// Errors raised while reading or writing the cache file.
#[derive(Debug, Error)]
pub enum CacheError {
  #[error("failed to read build cache {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write build cache {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse build cache: {0}")]
  Parse(#[source] serde_json::Error),

  #[error("failed to serialize build cache: {0}")]
  Serialize(#[source] serde_json::Error),

  #[error("unsupported build cache version {0}, expected {CACHE_VERSION}")]
  UnsupportedVersion(u32),
}

/// Persisted map of root script path to tree signature.
#[derive(Debug, Clone)]
pub struct BuildCache {
  path: PathBuf,
  entries: BTreeMap<String, String>,
}

impl BuildCache {
  /// Empty cache that will be stored at `path`.
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      entries: BTreeMap::new(),
    }
  }

  /// Load from the default location.
  pub fn load() -> Self {
    Self::load_from(build_cache_file())
  }

  /// Load from `path`, degrading to an empty cache on any failure.
  pub fn load_from(path: impl Into<PathBuf>) -> Self {
    let path = path.into();
    match read_cache_file(&path) {
      Ok(Some(file)) => {
        debug!(path = %path.display(), entries = file.entries.len(), "loaded build cache");
        Self {
          path,
          entries: file.entries,
        }
      }
      Ok(None) => Self::new(path),
      Err(e) => {
        warn!(path = %path.display(), error = %e, "ignoring unreadable build cache");
        Self::new(path)
      }
    }
  }

  /// Where [`store`](Self::store) writes.
  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Whether the tree's signature differs from the recorded one.
  pub fn needs_rebuild(&self, graph: &ScriptGraph) -> bool {
    let key = cache_key(graph.root_path());
    let current = signature(graph);
    let rebuild = self.entries.get(&key) != Some(&current);
    if rebuild {
      info!(script = %key, "build cache miss");
    } else {
      info!(script = %key, "build cache hit");
    }
    rebuild
  }

  /// Record the tree's current signature, replacing any previous entry.
  pub fn record(&mut self, graph: &ScriptGraph) {
    let key = cache_key(graph.root_path());
    self.entries.insert(key, signature(graph));
  }

  /// Forget the entry for `root`. Returns whether one existed.
  pub fn remove(&mut self, root: &Path) -> bool {
    let canonical = dunce::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
    self.entries.remove(&cache_key(&canonical)).is_some()
  }

  pub fn clear(&mut self) {
    self.entries.clear();
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Recorded entries as `(root path, signature)`, ordered by path.
  pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
    self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  /// Write the cache to its location, creating parent directories.
  ///
  /// Uses atomic write (write to temp, then rename).
  pub fn store(&self) -> Result<(), CacheError> {
    let file = CacheFile {
      version: CACHE_VERSION,
      entries: self.entries.clone(),
    };
    let content = serde_json::to_string_pretty(&file).map_err(CacheError::Serialize)?;

    let write_err = |source| CacheError::Write {
      path: self.path.clone(),
      source,
    };

    if let Some(parent) = self.path.parent() {
      fs::create_dir_all(parent).map_err(write_err)?;
    }

    let temp_path = self.path.with_extension("json.tmp");
    fs::write(&temp_path, content).map_err(write_err)?;
    fs::rename(&temp_path, &self.path).map_err(write_err)?;

    debug!(path = %self.path.display(), entries = self.entries.len(), "stored build cache");
    Ok(())
  }
}

/// Combined signature of every node in the tree.
pub fn signature(graph: &ScriptGraph) -> String {
  let mut hashed: Vec<(&Path, String)> = graph
    .iter()
    .map(|(_, node)| (node.path.as_path(), hash_str(&node.content).0))
    .collect();
  hashed.sort_by(|a, b| a.0.cmp(b.0));
  hashed.into_iter().map(|(_, h)| h).collect::<Vec<_>>().join(":")
}

fn cache_key(root: &Path) -> String {
  root.to_string_lossy().into_owned()
}

fn read_cache_file(path: &Path) -> Result<Option<CacheFile>, CacheError> {
  let content = match fs::read_to_string(path) {
    Ok(content) => content,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
    Err(source) => {
      return Err(CacheError::Read {
        path: path.to_path_buf(),
        source,
      });
    }
  };

  let file: CacheFile = serde_json::from_str(&content).map_err(CacheError::Parse)?;
  if file.version != CACHE_VERSION {
    return Err(CacheError::UnsupportedVersion(file.version));
  }
  Ok(Some(file))
}
