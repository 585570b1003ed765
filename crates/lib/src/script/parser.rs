//! Extraction of `require` targets from script source.
//!
//! The full cish parser lives outside this crate. The graph builder only needs
//! the list of scripts a file requires, which is what [`RequireParser`] exposes.
//! [`DirectiveParser`] is a line-based implementation that understands the
//! `require` directive on its own:
//!
//! ```text
//! # comments are ignored
//! require lib/strings.s
//! require "lib/with space.s"
//! ```

use std::path::Path;

use thiserror::Error;

/// Errors produced while extracting requirements.
#[derive(Debug, Error)]
pub enum ParseError {
  #[error("line {line}: require without a target")]
  MissingTarget { line: usize },

  #[error("line {line}: unterminated quoted require target")]
  UnterminatedQuote { line: usize },

  /// Raised by external parser implementations.
  #[error("{0}")]
  Other(String),
}

/// Lists the scripts required by a script, in declaration order.
pub trait RequireParser: Send + Sync {
  /// `path` is the script being parsed; targets are returned as written.
  fn requirements(&self, path: &Path, content: &str) -> Result<Vec<String>, ParseError>;
}

/// Line-based parser for `require <path>` and `require "<path>"` directives.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectiveParser;

const KEYWORD: &str = "require";

impl RequireParser for DirectiveParser {
  fn requirements(&self, _path: &Path, content: &str) -> Result<Vec<String>, ParseError> {
    let mut targets = Vec::new();

    for (idx, raw) in content.lines().enumerate() {
      let line = idx + 1;
      let trimmed = raw.trim_start();
      if trimmed.starts_with('#') {
        continue;
      }

      let Some(rest) = trimmed.strip_prefix(KEYWORD) else {
        continue;
      };

      // `required_by = 1` and friends are not directives
      if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        continue;
      }

      let rest = rest.trim();
      let target = if let Some(quoted) = rest.strip_prefix('"') {
        match quoted.find('"') {
          Some(end) => quoted[..end].to_string(),
          None => return Err(ParseError::UnterminatedQuote { line }),
        }
      } else {
        let unquoted = rest.split('#').next().unwrap_or_default();
        unquoted.split_whitespace().next().unwrap_or_default().to_string()
      };

      if target.is_empty() {
        return Err(ParseError::MissingTarget { line });
      }
      targets.push(target);
    }

    Ok(targets)
  }
}
