use crate::consts::APP_NAME;
use std::path::PathBuf;

/// Name of the directory that holds extension packages inside each search root.
const EXTENSIONS_DIR: &str = "extensions";

/// Returns the user's home directory
#[cfg(windows)]
pub fn home_dir() -> PathBuf {
  std::env::var_os("USERPROFILE").map(PathBuf::from).unwrap_or_default()
}

/// Returns the user's home directory
#[cfg(not(windows))]
pub fn home_dir() -> PathBuf {
  std::env::var_os("HOME").map(PathBuf::from).unwrap_or_default()
}

/// Returns the directory for configuration files for the application
#[cfg(windows)]
pub fn config_dir() -> PathBuf {
  std::env::var_os("APPDATA")
    .map(PathBuf::from)
    .unwrap_or_else(home_dir)
    .join(APP_NAME)
}

/// Returns the directory for configuration files for the application
#[cfg(not(windows))]
pub fn config_dir() -> PathBuf {
  let config_home = std::env::var("XDG_CONFIG_HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join(".config"));
  config_home.join(APP_NAME)
}

/// Returns the directory for cache files for the application
///
/// `CISH_CACHE_DIR` takes precedence over the platform default.
#[cfg(windows)]
pub fn cache_dir() -> PathBuf {
  if let Some(dir) = std::env::var_os("CISH_CACHE_DIR") {
    return PathBuf::from(dir);
  }
  std::env::var_os("LOCALAPPDATA")
    .map(PathBuf::from)
    .unwrap_or_else(home_dir)
    .join(APP_NAME)
    .join("Cache")
}

/// Returns the directory for cache files for the application
///
/// `CISH_CACHE_DIR` takes precedence over the platform default.
#[cfg(not(windows))]
pub fn cache_dir() -> PathBuf {
  if let Some(dir) = std::env::var_os("CISH_CACHE_DIR") {
    return PathBuf::from(dir);
  }
  let cache_home = std::env::var("XDG_CACHE_HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join(".cache"));
  cache_home.join(APP_NAME)
}

/// Returns the system-wide extensions directory
#[cfg(windows)]
pub fn system_extensions_dir() -> PathBuf {
  std::env::var_os("PROGRAMDATA")
    .map(PathBuf::from)
    .unwrap_or_else(|| PathBuf::from(r"C:\ProgramData"))
    .join(APP_NAME)
    .join(EXTENSIONS_DIR)
}

/// Returns the system-wide extensions directory
#[cfg(not(windows))]
pub fn system_extensions_dir() -> PathBuf {
  PathBuf::from("/var/lib").join(APP_NAME).join(EXTENSIONS_DIR)
}

/// Returns the per-user extensions directory
pub fn user_extensions_dir() -> PathBuf {
  config_dir().join(EXTENSIONS_DIR)
}

/// Returns the project-local extensions directory, relative to the working directory
pub fn project_extensions_dir() -> PathBuf {
  PathBuf::from(format!(".{}", APP_NAME)).join(EXTENSIONS_DIR)
}

/// Returns the default extension search path: user, system, then project.
///
/// `CISH_EXTENSION_PATH` (platform path-list syntax) replaces the defaults.
pub fn extension_search_path() -> Vec<PathBuf> {
  if let Some(list) = std::env::var_os("CISH_EXTENSION_PATH") {
    return std::env::split_paths(&list).filter(|p| !p.as_os_str().is_empty()).collect();
  }
  vec![user_extensions_dir(), system_extensions_dir(), project_extensions_dir()]
}

/// Returns the content-addressed asset store directory
pub fn assets_dir() -> PathBuf {
  cache_dir().join("assets")
}

/// Returns the root under which per-script build outputs are written
pub fn compiled_dir() -> PathBuf {
  cache_dir().join("compiled")
}

/// Returns the location of the persisted build cache
pub fn build_cache_file() -> PathBuf {
  cache_dir().join("build-cache.json")
}
