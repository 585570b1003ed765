//! Transfer of a single locator into the asset store.
//!
//! Locators are either remote URLs (`http://`, `https://`) downloaded with
//! reqwest, or local files (`file://` URLs and plain paths) that are copied.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::AssetError;

/// Where a locator points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
  Remote(String),
  Local(PathBuf),
}

impl Source {
  pub fn parse(locator: &str) -> Result<Self, AssetError> {
    let trimmed = locator.trim();
    if trimmed.is_empty() {
      return Err(AssetError::InvalidLocator(locator.to_string()));
    }

    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
      return Ok(Source::Remote(trimmed.to_string()));
    }

    if let Some(path) = trimmed.strip_prefix("file://") {
      if path.is_empty() {
        return Err(AssetError::InvalidLocator(locator.to_string()));
      }
      return Ok(Source::Local(PathBuf::from(path)));
    }

    if trimmed.contains("://") {
      return Err(AssetError::InvalidLocator(locator.to_string()));
    }

    Ok(Source::Local(PathBuf::from(trimmed)))
  }
}

/// Last path segment of a locator, without query string or fragment.
pub fn locator_file_name(locator: &str) -> String {
  let without_query = locator.split(['?', '#']).next().unwrap_or(locator);
  without_query
    .trim_end_matches('/')
    .rsplit(['/', '\\'])
    .next()
    .unwrap_or(without_query)
    .to_string()
}

/// Copy or download `source` to `dest`. Returns the number of bytes written.
///
/// Content is written to a uniquely named temporary file next to `dest` and
/// renamed into place, so a failed transfer never leaves a partial file at
/// `dest` and concurrent transfers to one `dest` never share a temporary file.
pub async fn transfer(source: &Source, dest: &Path) -> Result<u64, AssetError> {
  let parent = dest.parent().unwrap_or_else(|| Path::new("."));
  fs::create_dir_all(parent).await.map_err(|e| AssetError::CreateDir {
    path: parent.to_path_buf(),
    source: e,
  })?;

  let write_err = |source| AssetError::Write {
    path: dest.to_path_buf(),
    source,
  };
  let temp_path = tempfile::Builder::new()
    .prefix(".cish-")
    .suffix(".part")
    .tempfile_in(parent)
    .map_err(write_err)?
    .into_temp_path();

  let written = match source {
    Source::Remote(url) => download(url, &temp_path).await?,
    Source::Local(path) => fs::copy(path, &temp_path).await.map_err(|e| AssetError::Copy {
      from: path.clone(),
      to: dest.to_path_buf(),
      source: e,
    })?,
  };

  temp_path.persist(dest).map_err(|e| write_err(e.error))?;
  Ok(written)
}

async fn download(url: &str, dest: &Path) -> Result<u64, AssetError> {
  info!(url = %url, "downloading asset");

  let response = reqwest::get(url).await.map_err(|e| AssetError::Download {
    url: url.to_string(),
    message: e.to_string(),
  })?;

  if !response.status().is_success() {
    return Err(AssetError::Download {
      url: url.to_string(),
      message: format!("HTTP {}", response.status()),
    });
  }

  let bytes = response.bytes().await.map_err(|e| AssetError::Download {
    url: url.to_string(),
    message: e.to_string(),
  })?;

  let write_err = |e| AssetError::Write {
    path: dest.to_path_buf(),
    source: e,
  };
  let mut file = fs::File::create(dest).await.map_err(write_err)?;
  file.write_all(&bytes).await.map_err(write_err)?;
  file.flush().await.map_err(write_err)?;

  debug!(path = %dest.display(), size = bytes.len(), "download complete");
  Ok(bytes.len() as u64)
}
