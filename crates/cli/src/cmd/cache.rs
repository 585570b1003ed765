use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use serde::Serialize;
use tracing::debug;

use cish_lib::config::BuildConfig;
use cish_lib::script::BuildCache;
use cish_lib::util::hash::short_hash;

use crate::output::{OutputFormat, print_info, print_json, print_stat, print_success, print_warning};

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
  /// List recorded scripts
  List,

  /// Forget every recorded script
  Clear,

  /// Forget one script, forcing its next build
  Remove {
    /// Root script
    script: PathBuf,
  },
}

#[derive(Debug, Serialize)]
struct CacheEntry<'a> {
  script: &'a str,
  signature: &'a str,
}

#[derive(Debug, Serialize)]
struct CacheListOutput<'a> {
  path: String,
  entries: Vec<CacheEntry<'a>>,
}

#[derive(Debug, Serialize)]
struct CacheChangeOutput {
  path: String,
  removed: usize,
}

pub fn cmd_cache(config: BuildConfig, command: CacheCommand, output: OutputFormat) -> Result<()> {
  let mut cache = BuildCache::load_from(&config.cache_file);
  debug!(path = %cache.path().display(), entries = cache.len(), "opened build cache");

  match command {
    CacheCommand::List => cmd_list(&cache, output),
    CacheCommand::Clear => {
      let removed = cache.len();
      cache.clear();
      cache.store().context("Failed to write build cache")?;
      report_change(&cache, removed, output, "Cleared build cache")
    }
    CacheCommand::Remove { script } => {
      if !cache.remove(&script) {
        if output.is_json() {
          return report_change(&cache, 0, output, "");
        }
        print_warning(&format!("{} is not in the build cache", script.display()));
        return Ok(());
      }
      cache.store().context("Failed to write build cache")?;
      report_change(&cache, 1, output, &format!("Removed {}", script.display()))
    }
  }
}

fn cmd_list(cache: &BuildCache, output: OutputFormat) -> Result<()> {
  if output.is_json() {
    return print_json(&CacheListOutput {
      path: cache.path().display().to_string(),
      entries: cache
        .entries()
        .map(|(script, signature)| CacheEntry { script, signature })
        .collect(),
    });
  }

  if cache.is_empty() {
    print_info("Build cache is empty");
    return Ok(());
  }

  print_info(&format!("{} recorded script(s)", cache.len()));
  for (script, signature) in cache.entries() {
    print_stat(script, short_hash(signature));
  }
  Ok(())
}

fn report_change(cache: &BuildCache, removed: usize, output: OutputFormat, message: &str) -> Result<()> {
  if output.is_json() {
    return print_json(&CacheChangeOutput {
      path: cache.path().display().to_string(),
      removed,
    });
  }
  print_success(message);
  print_stat("Entries removed", &removed.to_string());
  Ok(())
}
