//! Shared test helpers for CLI integration tests.

use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Isolated test environment.
///
/// Each test gets its own temporary directory with isolated cache, config and
/// extension paths.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn empty() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
    }
  }

  /// Write a file relative to the temp directory.
  pub fn write_file(&self, relative_path: &str, content: &str) -> PathBuf {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
  }

  /// Write an extension package into the extensions directory.
  pub fn write_package(&self, file_name: &str, manifests: &[String]) -> PathBuf {
    let path = self.extensions_path().join(file_name);
    let mut zip = ZipWriter::new(File::create(&path).unwrap());
    for (i, manifest) in manifests.iter().enumerate() {
      zip
        .start_file(format!("META-INF/cish/unit{}.json", i), SimpleFileOptions::default())
        .unwrap();
      zip.write_all(manifest.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
    path
  }

  /// Write a local artifact and return its `file://` locator.
  pub fn write_artifact(&self, file_name: &str, content: &str) -> String {
    let path = self.write_file(&format!("artifacts/{}", file_name), content);
    format!("file://{}", path.display())
  }

  fn dir(&self, name: &str) -> PathBuf {
    let p = self.temp.path().join(name);
    fs::create_dir_all(&p).unwrap();
    dunce::canonicalize(&p).unwrap_or(p)
  }

  pub fn extensions_path(&self) -> PathBuf {
    self.dir("extensions")
  }

  pub fn cache_path(&self) -> PathBuf {
    self.dir("cache")
  }

  pub fn config_path(&self) -> PathBuf {
    self.dir("config")
  }

  pub fn cache_file(&self) -> PathBuf {
    self.cache_path().join("build-cache.json")
  }

  /// Get a pre-configured Command for the cish binary.
  ///
  /// Sets environment variables for isolated testing:
  /// - `CISH_CACHE_DIR`: build cache, assets and outputs
  /// - `CISH_EXTENSION_PATH`: the test's extensions directory only
  /// - `XDG_CONFIG_HOME` / `APPDATA`: isolated config path
  pub fn cish_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("cish");
    cmd.env("CISH_CACHE_DIR", self.cache_path());
    cmd.env("CISH_EXTENSION_PATH", self.extensions_path());
    cmd.env("XDG_CONFIG_HOME", self.config_path());
    cmd.env("APPDATA", self.config_path()); // For Windows
    cmd.env_remove("CISH_REGISTRY_URL");
    cmd.env_remove("RUST_LOG");
    cmd
  }
}

/// Manifest JSON for a unit.
pub fn unit_manifest(name: &str, provides: &[&str], urls: &[&str]) -> String {
  let deps: Vec<serde_json::Value> = urls.iter().map(|u| serde_json::json!({ "url": u })).collect();
  serde_json::json!({
    "name": name,
    "version": "1.0",
    "provides": provides,
    "dependencies": deps,
  })
  .to_string()
}

/// Parse a command's stdout as JSON.
pub fn stdout_json(output: &[u8]) -> serde_json::Value {
  serde_json::from_slice(output).unwrap_or_else(|e| panic!("invalid JSON output: {}", e))
}
