//! Content-addressed cache of downloaded or copied artifacts.
//!
//! # Store Structure
//!
//! ```text
//! ~/.cache/cish/assets/
//!   index.json          # {"version": 1, "assets": {locator: store name}}
//!   3b1f9c...e2.jar     # sha256(file name of the locator) + extension
//!   a07d41...9c.jar
//! ```
//!
//! Store names are derived from the locator's *file name*, not from the
//! downloaded bytes. Two locators ending in the same file name therefore map
//! to the same store file. Extension packages themselves never go through the
//! store; they are staged by full path with [`AssetStore::stage_package`].

mod fetch;
mod store;

use std::io;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::util::hash::ContentHash;

pub use fetch::{Source, locator_file_name};
pub use store::{AssetStore, INDEX_FILE};

/// A fetched artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Asset {
  /// Origin locator, exactly as requested.
  pub locator: String,
  /// Hash of the locator's file name.
  pub hash: ContentHash,
  /// Location inside the asset store.
  pub path: PathBuf,
}

/// Errors raised while fetching or materialising assets.
#[derive(Debug, Error)]
pub enum AssetError {
  #[error("unsupported asset locator '{0}'")]
  InvalidLocator(String),

  #[error("failed to download '{url}': {message}")]
  Download { url: String, message: String },

  #[error("failed to copy '{from}' to '{to}': {source}")]
  Copy {
    from: PathBuf,
    to: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write '{path}': {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to create directory '{path}': {source}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}
