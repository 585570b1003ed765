use std::collections::{BTreeMap, HashMap};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::fetch::{self, Source, locator_file_name};
use super::{Asset, AssetError};
use crate::platform::paths::assets_dir;
use crate::util::hash::{hash_str, short_hash};

/// Name of the persisted locator index inside the store directory.
pub const INDEX_FILE: &str = "index.json";

/// Current index file format version.
pub const INDEX_VERSION: u32 = 1;

/// Locator to store file name, persisted so later processes can reuse stored
/// assets without transferring them again.
#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexFile {
  version: u32,
  assets: BTreeMap<String, String>,
}

/// Process-wide registry of fetched assets.
///
/// Each distinct locator is transferred at most once per store, even when
/// requested concurrently. Failed transfers are not remembered, so a later
/// request retries. Locators recorded in the store's index by an earlier
/// process are reused while their store file still exists.
#[derive(Debug)]
pub struct AssetStore {
  store_dir: PathBuf,
  assets: Mutex<HashMap<String, Arc<OnceCell<Asset>>>>,
  index: Mutex<BTreeMap<String, String>>,
  materialized: Mutex<HashMap<(String, PathBuf), PathBuf>>,
  downloads: AtomicUsize,
}

impl Default for AssetStore {
  fn default() -> Self {
    Self::new(assets_dir())
  }
}

impl AssetStore {
  pub fn new(store_dir: impl Into<PathBuf>) -> Self {
    let store_dir = store_dir.into();
    let index = load_index(&store_dir.join(INDEX_FILE));
    Self {
      store_dir,
      assets: Mutex::new(HashMap::new()),
      index: Mutex::new(index),
      materialized: Mutex::new(HashMap::new()),
      downloads: AtomicUsize::new(0),
    }
  }

  pub fn store_dir(&self) -> &Path {
    &self.store_dir
  }

  /// Return the asset for `locator`, transferring it on first use.
  pub async fn fetch(&self, locator: &str) -> Result<Asset, AssetError> {
    let cell = {
      let mut assets = self.assets.lock().unwrap_or_else(PoisonError::into_inner);
      assets.entry(locator.to_string()).or_default().clone()
    };

    let asset = cell.get_or_try_init(|| self.transfer(locator)).await?;
    Ok(asset.clone())
  }

  /// The asset registered for `locator`, if it has been fetched.
  pub fn get(&self, locator: &str) -> Option<Asset> {
    let assets = self.assets.lock().unwrap_or_else(PoisonError::into_inner);
    assets.get(locator).and_then(|cell| cell.get().cloned())
  }

  /// The fetched asset stored at `path`, if any.
  pub fn find_by_path(&self, path: &Path) -> Option<Asset> {
    let assets = self.assets.lock().unwrap_or_else(PoisonError::into_inner);
    assets
      .values()
      .filter_map(|cell| cell.get())
      .find(|asset| asset.path == path)
      .cloned()
  }

  /// Number of fetched assets.
  pub fn len(&self) -> usize {
    let assets = self.assets.lock().unwrap_or_else(PoisonError::into_inner);
    assets.values().filter(|cell| cell.initialized()).count()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Number of transfers actually performed by this store.
  pub fn download_count(&self) -> usize {
    self.downloads.load(Ordering::SeqCst)
  }

  /// Copy `asset` into `target_dir`, once per `(locator, target_dir)`.
  ///
  /// Returns the path of the copy.
  pub async fn materialize(&self, asset: &Asset, target_dir: &Path) -> Result<PathBuf, AssetError> {
    let key = (asset.locator.clone(), target_dir.to_path_buf());
    if let Some(path) = self.materialized_at(&key) {
      debug!(locator = %asset.locator, target = %path.display(), "asset already materialized");
      return Ok(path);
    }

    let file_name = asset
      .path
      .file_name()
      .ok_or_else(|| AssetError::InvalidLocator(asset.locator.clone()))?;
    let target = target_dir.join(file_name);
    fetch::transfer(&Source::Local(asset.path.clone()), &target).await?;
    debug!(locator = %asset.locator, target = %target.display(), "materialized asset");

    self.mark_materialized(key, target.clone());
    Ok(target)
  }

  /// Copy a local extension package into `target_dir`, once per target.
  ///
  /// The copy is prefixed with a hash of the package's full path, so packages
  /// sharing a file name in different directories stay distinct.
  pub async fn stage_package(&self, package: &Path, target_dir: &Path) -> Result<PathBuf, AssetError> {
    let canonical = dunce::canonicalize(package).unwrap_or_else(|_| package.to_path_buf());
    let key = (canonical.to_string_lossy().into_owned(), target_dir.to_path_buf());
    if let Some(path) = self.materialized_at(&key) {
      return Ok(path);
    }

    let file_name = canonical
      .file_name()
      .ok_or_else(|| AssetError::InvalidLocator(package.display().to_string()))?;
    let hash = hash_str(&key.0);
    let target = target_dir.join(format!("{}-{}", short_hash(&hash.0), file_name.to_string_lossy()));
    fetch::transfer(&Source::Local(canonical.clone()), &target).await?;
    debug!(package = %canonical.display(), target = %target.display(), "staged package");

    self.mark_materialized(key, target.clone());
    Ok(target)
  }

  fn materialized_at(&self, key: &(String, PathBuf)) -> Option<PathBuf> {
    let done = self.materialized.lock().unwrap_or_else(PoisonError::into_inner);
    done.get(key).cloned()
  }

  fn mark_materialized(&self, key: (String, PathBuf), target: PathBuf) {
    let mut done = self.materialized.lock().unwrap_or_else(PoisonError::into_inner);
    done.insert(key, target);
  }

  async fn transfer(&self, locator: &str) -> Result<Asset, AssetError> {
    let source = Source::parse(locator)?;
    let file_name = locator_file_name(locator);
    let hash = hash_str(&file_name);
    let extension = Path::new(&file_name)
      .extension()
      .map(|ext| format!(".{}", ext.to_string_lossy()))
      .unwrap_or_default();
    let store_name = format!("{}{}", hash.0, extension);
    let path = self.store_dir.join(&store_name);

    if self.is_recorded(locator, &store_name) && path.is_file() {
      debug!(locator = %locator, path = %path.display(), "reusing stored asset");
    } else {
      let size = fetch::transfer(&source, &path).await?;
      self.downloads.fetch_add(1, Ordering::SeqCst);
      info!(locator = %locator, path = %path.display(), size, "fetched asset");
      self.record(locator, store_name);
    }

    Ok(Asset {
      locator: locator.to_string(),
      hash,
      path,
    })
  }

  fn is_recorded(&self, locator: &str, store_name: &str) -> bool {
    let index = self.index.lock().unwrap_or_else(PoisonError::into_inner);
    index.get(locator).is_some_and(|name| name == store_name)
  }

  fn record(&self, locator: &str, store_name: String) {
    let mut index = self.index.lock().unwrap_or_else(PoisonError::into_inner);
    index.insert(locator.to_string(), store_name);
    let path = self.store_dir.join(INDEX_FILE);
    if let Err(e) = store_index(&path, &index) {
      warn!(path = %path.display(), error = %e, "failed to persist asset index");
    }
  }
}

fn load_index(path: &Path) -> BTreeMap<String, String> {
  let content = match std::fs::read_to_string(path) {
    Ok(content) => content,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return BTreeMap::new(),
    Err(e) => {
      warn!(path = %path.display(), error = %e, "ignoring unreadable asset index");
      return BTreeMap::new();
    }
  };

  match serde_json::from_str::<IndexFile>(&content) {
    Ok(file) if file.version == INDEX_VERSION => file.assets,
    Ok(file) => {
      warn!(path = %path.display(), version = file.version, "ignoring asset index with unsupported version");
      BTreeMap::new()
    }
    Err(e) => {
      warn!(path = %path.display(), error = %e, "ignoring unreadable asset index");
      BTreeMap::new()
    }
  }
}

fn store_index(path: &Path, assets: &BTreeMap<String, String>) -> io::Result<()> {
  let file = IndexFile {
    version: INDEX_VERSION,
    assets: assets.clone(),
  };
  let content = serde_json::to_string_pretty(&file)?;
  let dir = path.parent().unwrap_or_else(|| Path::new("."));
  std::fs::create_dir_all(dir)?;

  let mut temp = tempfile::NamedTempFile::new_in(dir)?;
  temp.write_all(content.as_bytes())?;
  temp.persist(path).map_err(|e| e.error)?;
  Ok(())
}
