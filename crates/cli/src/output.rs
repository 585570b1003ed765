//! Terminal reporting for cish commands.
//!
//! Human-readable status lines go to stdout (errors and warnings to stderr)
//! with a leading marker per [`Status`]. `--output json` bypasses all of it in
//! favour of [`print_json`].

use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream, Style};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    self == OutputFormat::Json
  }
}

/// Kind of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
  Done,
  Failed,
  Warning,
  Note,
}

impl Status {
  fn marker(self) -> &'static str {
    match self {
      Status::Done => "✓",
      Status::Failed => "✗",
      Status::Warning => "⚠",
      Status::Note => "•",
    }
  }

  fn style(self) -> Style {
    match self {
      Status::Done => Style::new().green(),
      Status::Failed => Style::new().red().bold(),
      Status::Warning => Style::new().yellow(),
      Status::Note => Style::new().blue(),
    }
  }

  fn stream(self) -> Stream {
    match self {
      Status::Failed | Status::Warning => Stream::Stderr,
      Status::Done | Status::Note => Stream::Stdout,
    }
  }

  fn emit(self, message: &str) {
    let style = self.style();
    let marker = self.marker();
    let marker = marker.if_supports_color(self.stream(), |m| m.style(style));
    match self.stream() {
      Stream::Stderr => eprintln!("{} {}", marker, message),
      _ => println!("{} {}", marker, message),
    }
  }
}

pub fn print_success(message: &str) {
  Status::Done.emit(message);
}

pub fn print_error(message: &str) {
  Status::Failed.emit(message);
}

pub fn print_warning(message: &str) {
  Status::Warning.emit(message);
}

pub fn print_info(message: &str) {
  Status::Note.emit(message);
}

/// An indented `label: value` line.
pub fn print_stat(label: &str, value: &str) {
  let label = format!("{}:", label);
  println!("  {} {}", label.if_supports_color(Stream::Stdout, |l| l.dimmed()), value);
}

/// A nested list entry under the preceding stat.
pub fn print_item(value: &str) {
  println!("    - {}", value);
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
  println!("{}", json);
  Ok(())
}

/// Elapsed time as `850ms`, `2.4s` or `3m 12s`.
pub fn format_duration(duration: Duration) -> String {
  let millis = duration.as_millis();
  match millis {
    0..=999 => format!("{}ms", millis),
    1_000..=59_999 => format!("{:.1}s", duration.as_secs_f64()),
    _ => format!("{}m {}s", millis / 60_000, (millis % 60_000) / 1_000),
  }
}
