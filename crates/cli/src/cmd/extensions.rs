//! Extensions command implementation.
//!
//! Scans the extension search path (or a single directory), resolves the
//! discovered units and lists what a build would load.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;

use cish_lib::config::BuildConfig;
use cish_lib::extension::{Collision, ExtensionPackage, ExtensionResolver, ExtensionScanner};

use crate::output::{OutputFormat, print_info, print_item, print_json, print_stat, print_success, print_warning};

#[derive(Debug, Serialize)]
struct ExtensionsOutput<'a> {
  directories: Vec<String>,
  units: &'a [ExtensionPackage],
  imports: Vec<String>,
  collisions: &'a [Collision],
}

pub fn cmd_extensions(config: BuildConfig, dir: Option<PathBuf>, verbose: bool, output: OutputFormat) -> Result<()> {
  let dirs = match dir {
    Some(dir) => vec![dir],
    None => config.extension_dirs.clone(),
  };

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let mut resolver = ExtensionResolver::new(ExtensionScanner::new(&config.registry_url))
    .with_policy(config.collision_policy)
    .with_scan_concurrency(config.scan_concurrency);
  rt.block_on(resolver.scan_directories(&dirs));
  resolver.resolve_all().context("Failed to resolve extensions")?;

  if output.is_json() {
    return print_json(&ExtensionsOutput {
      directories: dirs.iter().map(|d| d.display().to_string()).collect(),
      units: resolver.loaded(),
      imports: resolver.capability_imports(),
      collisions: resolver.collisions(),
    });
  }

  if resolver.loaded().is_empty() {
    print_info("No extension units found");
    for dir in &dirs {
      print_item(&dir.display().to_string());
    }
    return Ok(());
  }

  print_success(&format!("{} extension unit(s) loaded", resolver.loaded().len()));
  for unit in resolver.loaded() {
    println!();
    print_stat("Unit", &unit.to_string());
    print_stat("Package", &unit.package_path().display().to_string());
    print_stat("Provides", &unit.provides.join(", "));
    if verbose {
      for dependency in &unit.dependencies {
        print_item(&dependency.to_string());
      }
    } else {
      print_stat("Dependencies", &unit.dependencies.len().to_string());
    }
  }

  println!();
  print_stat("Imports", &resolver.capability_imports().join(", "));
  for collision in resolver.collisions() {
    print_warning(&collision.to_string());
  }

  Ok(())
}
