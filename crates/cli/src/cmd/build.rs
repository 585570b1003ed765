//! Build command implementation.
//!
//! Resolves extensions for a script, stages their artifacts in the script's
//! output directory and records the tree in the build cache. Compilation
//! itself belongs to the host toolchain, so the compiler here only reports.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use cish_lib::build::{BuildPipeline, BuildPlan, CompileError, Compiler};
use cish_lib::config::BuildConfig;
use cish_lib::extension::Collision;
use cish_lib::script::DirectiveParser;

use crate::output::{
  OutputFormat, format_duration, print_info, print_item, print_json, print_stat, print_success, print_warning,
};

/// Accepts every plan without producing output.
struct NoopCompiler;

impl Compiler for NoopCompiler {
  fn compile(&self, plan: &BuildPlan) -> Result<(), CompileError> {
    info!(
      root = %plan.graph.root_path().display(),
      artifacts = plan.artifacts.len(),
      imports = plan.imports.len(),
      "no compiler configured, plan accepted"
    );
    Ok(())
  }
}

#[derive(Debug, Serialize)]
struct BuildOutput<'a> {
  root: String,
  rebuild_required: bool,
  scripts: Vec<String>,
  artifacts: Vec<String>,
  imports: &'a [String],
  collisions: &'a [Collision],
  output_dir: String,
  duration_ms: u128,
}

pub fn cmd_build(config: BuildConfig, script: &Path, output: OutputFormat) -> Result<()> {
  let start = Instant::now();
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;

  let mut pipeline = BuildPipeline::new(config);
  let plan = rt
    .block_on(pipeline.build(script, &DirectiveParser, &NoopCompiler))
    .with_context(|| format!("Failed to build {}", script.display()))?;
  let elapsed = start.elapsed();

  if output.is_json() {
    return print_json(&BuildOutput {
      root: plan.graph.root_path().display().to_string(),
      rebuild_required: plan.rebuild_required,
      scripts: plan.graph.all_scripts().iter().map(|p| p.display().to_string()).collect(),
      artifacts: plan.artifacts.iter().map(|p| p.display().to_string()).collect(),
      imports: &plan.imports,
      collisions: &plan.collisions,
      output_dir: plan.output_dir.display().to_string(),
      duration_ms: elapsed.as_millis(),
    });
  }

  if !plan.rebuild_required {
    print_info(&format!("{} is up to date", plan.graph.root_path().display()));
    print_stat("Duration", &format_duration(elapsed));
    return Ok(());
  }

  print_success(&format!("Built {}", plan.graph.root_path().display()));
  print_stat("Scripts", &plan.graph.len().to_string());
  print_stat("Artifacts", &plan.artifacts.len().to_string());
  for artifact in &plan.artifacts {
    print_item(&artifact.display().to_string());
  }
  print_stat("Imports", &plan.imports.len().to_string());
  for import in &plan.imports {
    print_item(import);
  }
  print_stat("Output", &plan.output_dir.display().to_string());
  print_stat("Duration", &format_duration(elapsed));

  for collision in &plan.collisions {
    print_warning(&collision.to_string());
  }

  Ok(())
}
