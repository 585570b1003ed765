mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cish_lib::config::BuildConfig;
use cish_lib::extension::CollisionPolicy;

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "cish")]
#[command(about = "Build orchestration for cish scripts", long_about = None)]
#[command(version)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Output format
  #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
  output: OutputFormat,

  /// Extension search directory (repeatable, replaces the default search path)
  #[arg(long = "extensions-dir", global = true, value_name = "DIR")]
  extensions_dirs: Vec<PathBuf>,

  /// Root directory for compiled outputs
  #[arg(long, global = true, value_name = "DIR")]
  output_dir: Option<PathBuf>,

  /// Abort on the first extension conflict instead of warning
  #[arg(long, global = true)]
  deny_collisions: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Resolve extensions and stage artifacts for a script
  Build {
    /// Root script
    script: PathBuf,
  },

  /// Report whether a script needs to be rebuilt
  Check {
    /// Root script
    script: PathBuf,
  },

  /// Scan, resolve and list extension units
  Extensions {
    /// Scan only this directory
    #[arg(long)]
    dir: Option<PathBuf>,
  },

  /// Inspect or modify the build cache
  Cache {
    #[command(subcommand)]
    command: cmd::CacheCommand,
  },

  /// Show resolved directories and settings
  Info,
}

impl Cli {
  fn build_config(&self) -> BuildConfig {
    let mut config = BuildConfig::default();
    if !self.extensions_dirs.is_empty() {
      config = config.with_extension_dirs(self.extensions_dirs.clone());
    }
    if let Some(dir) = &self.output_dir {
      config = config.with_output_root(dir);
    }
    if self.deny_collisions {
      config = config.with_collision_policy(CollisionPolicy::Deny);
    }
    config
  }
}

fn init_tracing(verbose: bool) {
  let default = if verbose { "info" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .without_time()
    .with_writer(std::io::stderr)
    .init();
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  let config = cli.build_config();
  let result = match cli.command {
    Commands::Build { script } => cmd::cmd_build(config, &script, cli.output),
    Commands::Check { script } => cmd::cmd_check(config, &script, cli.output),
    Commands::Extensions { dir } => cmd::cmd_extensions(config, dir, cli.verbose, cli.output),
    Commands::Cache { command } => cmd::cmd_cache(config, command, cli.output),
    Commands::Info => cmd::cmd_info(&config, cli.output),
  };

  if let Err(e) = &result {
    output::print_error(&format!("{:#}", e));
    std::process::exit(1);
  }
  Ok(())
}
