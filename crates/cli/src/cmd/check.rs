use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use cish_lib::build::BuildPipeline;
use cish_lib::config::BuildConfig;
use cish_lib::script::DirectiveParser;
use cish_lib::script::cache::signature;
use cish_lib::util::hash::short_hash;

use crate::output::{OutputFormat, print_info, print_item, print_json, print_stat, print_success};

#[derive(Debug, Serialize)]
struct CheckOutput {
  root: String,
  rebuild_required: bool,
  scripts: usize,
  signature: String,
}

pub fn cmd_check(config: BuildConfig, script: &Path, output: OutputFormat) -> Result<()> {
  let pipeline = BuildPipeline::new(config);
  let (graph, rebuild_required) = pipeline
    .check(script, &DirectiveParser)
    .with_context(|| format!("Failed to check {}", script.display()))?;
  let signature = signature(&graph);

  if output.is_json() {
    return print_json(&CheckOutput {
      root: graph.root_path().display().to_string(),
      rebuild_required,
      scripts: graph.len(),
      signature,
    });
  }

  if rebuild_required {
    print_info(&format!("{} needs to be rebuilt", graph.root_path().display()));
  } else {
    print_success(&format!("{} is up to date", graph.root_path().display()));
  }
  print_stat("Scripts", &graph.len().to_string());
  for (_, node) in graph.iter() {
    print_item(&format!("{} [{}]", node.path.display(), node.namespace));
  }
  print_stat("Signature", short_hash(&signature));

  Ok(())
}
