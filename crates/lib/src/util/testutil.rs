//! Test fixtures for cish-lib: extension packages and script trees.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::consts::MANIFEST_DIR;

/// Write a zip archive at `dir/file_name` holding `entries` (name, content).
pub fn write_archive(dir: &Path, file_name: &str, entries: &[(&str, &str)]) -> PathBuf {
  fs::create_dir_all(dir).unwrap();
  let path = dir.join(file_name);
  let mut zip = ZipWriter::new(File::create(&path).unwrap());
  let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
  for (name, content) in entries {
    zip.start_file(*name, options).unwrap();
    zip.write_all(content.as_bytes()).unwrap();
  }
  zip.finish().unwrap();
  path
}

/// Write an extension package whose units are given as manifest JSON.
///
/// Manifests are stored as `META-INF/cish/unit<N>.json` in order.
pub fn write_package(dir: &Path, file_name: &str, manifests: &[&str]) -> PathBuf {
  let names: Vec<String> = (0..manifests.len())
    .map(|i| format!("{}unit{}.json", MANIFEST_DIR, i))
    .collect();
  let entries: Vec<(&str, &str)> = names.iter().map(String::as_str).zip(manifests.iter().copied()).collect();
  write_archive(dir, file_name, &entries)
}

/// Manifest JSON for a unit with the given capabilities and URL dependencies.
pub fn unit_manifest(name: &str, version: &str, provides: &[&str], urls: &[&str]) -> String {
  let deps: Vec<serde_json::Value> = urls.iter().map(|u| serde_json::json!({ "url": u })).collect();
  serde_json::json!({
    "name": name,
    "version": version,
    "provides": provides,
    "dependencies": deps,
  })
  .to_string()
}

/// Write a script file, creating parent directories.
pub fn write_script(dir: &Path, rel: &str, content: &str) -> PathBuf {
  let path = dir.join(rel);
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).unwrap();
  }
  fs::write(&path, content).unwrap();
  path
}
