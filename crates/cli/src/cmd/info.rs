use anyhow::Result;
use serde::Serialize;

use cish_lib::config::BuildConfig;
use cish_lib::extension::CollisionPolicy;
use cish_lib::platform::paths::{cache_dir, config_dir};

use crate::output::{OutputFormat, print_item, print_json, print_stat};

#[derive(Debug, Serialize)]
struct InfoOutput {
  version: &'static str,
  config_dir: String,
  cache_dir: String,
  extension_dirs: Vec<String>,
  cache_file: String,
  assets_dir: String,
  output_root: String,
  registry_url: String,
  collision_policy: CollisionPolicy,
}

pub fn cmd_info(config: &BuildConfig, output: OutputFormat) -> Result<()> {
  let extension_dirs: Vec<String> = config.extension_dirs.iter().map(|d| d.display().to_string()).collect();

  if output.is_json() {
    return print_json(&InfoOutput {
      version: env!("CARGO_PKG_VERSION"),
      config_dir: config_dir().display().to_string(),
      cache_dir: cache_dir().display().to_string(),
      extension_dirs,
      cache_file: config.cache_file.display().to_string(),
      assets_dir: config.assets_dir.display().to_string(),
      output_root: config.output_root.display().to_string(),
      registry_url: config.registry_url.clone(),
      collision_policy: config.collision_policy,
    });
  }

  println!("cish {}", env!("CARGO_PKG_VERSION"));
  print_stat("Config", &config_dir().display().to_string());
  print_stat("Cache", &cache_dir().display().to_string());
  print_stat("Build cache", &config.cache_file.display().to_string());
  print_stat("Assets", &config.assets_dir.display().to_string());
  print_stat("Outputs", &config.output_root.display().to_string());
  print_stat("Registry", &config.registry_url);
  print_stat("Collisions", if config.collision_policy == CollisionPolicy::Deny { "deny" } else { "warn" });
  print_stat("Extension path", "");
  for dir in &extension_dirs {
    print_item(dir);
  }

  Ok(())
}
