//! Version strings and version constraints.
//!
//! Versions are dot-separated non-negative integers (`1`, `1.2`, `10.0.3`).
//! The literal `latest` parses to a sentinel that compares higher than every
//! concrete version.
//!
//! # Comparison
//!
//! Fields are compared left to right. Missing trailing fields count as zero,
//! so `1.2` and `1.2.0` are equal (and hash equal).

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Token accepted in place of a concrete version.
pub const LATEST: &str = "latest";

/// Errors produced while parsing versions or constraint kinds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
  /// The version string was empty.
  #[error("version string is empty")]
  Empty,

  /// The version string is not a dot-separated list of integers.
  #[error("invalid version format: '{0}'")]
  Invalid(String),

  /// The constraint kind is not one of `equals`, `lower`, `higher`, `any`.
  #[error("unknown version constraint '{0}' (expected equals, lower, higher or any)")]
  UnknownConstraint(String),
}

/// A parsed version.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
  raw: String,
  fields: Vec<u64>,
}

impl Version {
  /// Parse a version string, failing immediately on malformed input.
  pub fn parse(input: &str) -> Result<Self, VersionError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
      return Err(VersionError::Empty);
    }

    if trimmed == LATEST {
      return Ok(Self::latest());
    }

    let fields = trimmed
      .split('.')
      .map(|part| {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
          return Err(VersionError::Invalid(input.to_string()));
        }
        part.parse::<u64>().map_err(|_| VersionError::Invalid(input.to_string()))
      })
      .collect::<Result<Vec<_>, _>>()?;

    Ok(Self {
      raw: trimmed.to_string(),
      fields,
    })
  }

  /// The `latest` sentinel.
  pub fn latest() -> Self {
    Self {
      raw: LATEST.to_string(),
      fields: vec![u64::MAX],
    }
  }

  /// Whether this is the `latest` sentinel.
  pub fn is_latest(&self) -> bool {
    self.raw == LATEST
  }

  /// The version as originally written (trimmed).
  pub fn as_str(&self) -> &str {
    &self.raw
  }

  /// Numeric fields, as parsed.
  pub fn fields(&self) -> &[u64] {
    &self.fields
  }

  /// Evaluate `self` against `other` under `kind`.
  pub fn satisfies(&self, other: &Version, kind: ConstraintKind) -> bool {
    evaluate(self, other, kind)
  }

  /// Fields with trailing zeros removed, so equal versions hash equally.
  fn significant_fields(&self) -> &[u64] {
    let len = self.fields.iter().rposition(|f| *f != 0).map_or(0, |i| i + 1);
    &self.fields[..len]
  }
}

impl Ord for Version {
  fn cmp(&self, other: &Self) -> Ordering {
    let len = self.fields.len().max(other.fields.len());
    for i in 0..len {
      let a = self.fields.get(i).copied().unwrap_or(0);
      let b = other.fields.get(i).copied().unwrap_or(0);
      match a.cmp(&b) {
        Ordering::Equal => continue,
        unequal => return unequal,
      }
    }
    Ordering::Equal
  }
}

impl PartialOrd for Version {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl PartialEq for Version {
  fn eq(&self, other: &Self) -> bool {
    self.cmp(other) == Ordering::Equal
  }
}

impl Eq for Version {}

impl Hash for Version {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.significant_fields().hash(state);
  }
}

impl fmt::Display for Version {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.raw)
  }
}

impl FromStr for Version {
  type Err = VersionError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::parse(s)
  }
}

impl TryFrom<String> for Version {
  type Error = VersionError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    Self::parse(&value)
  }
}

impl From<Version> for String {
  fn from(value: Version) -> Self {
    value.raw
  }
}

/// How a candidate version must relate to a required version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ConstraintKind {
  /// Candidate equals the required version.
  #[default]
  Equals,
  /// Candidate is lower than the required version.
  Lower,
  /// Candidate is higher than the required version.
  Higher,
  /// Any candidate is acceptable.
  Any,
}

impl ConstraintKind {
  /// Whether an ordering of `candidate.cmp(required)` satisfies this kind.
  pub fn accepts(self, ordering: Ordering) -> bool {
    match self {
      ConstraintKind::Equals => ordering == Ordering::Equal,
      ConstraintKind::Lower => ordering == Ordering::Less,
      ConstraintKind::Higher => ordering == Ordering::Greater,
      ConstraintKind::Any => true,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      ConstraintKind::Equals => "equals",
      ConstraintKind::Lower => "lower",
      ConstraintKind::Higher => "higher",
      ConstraintKind::Any => "any",
    }
  }
}

impl fmt::Display for ConstraintKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ConstraintKind {
  type Err = VersionError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "equals" | "eq" => Ok(ConstraintKind::Equals),
      "lower" | "lt" => Ok(ConstraintKind::Lower),
      "higher" | "gt" => Ok(ConstraintKind::Higher),
      "any" | "all" => Ok(ConstraintKind::Any),
      _ => Err(VersionError::UnknownConstraint(s.to_string())),
    }
  }
}

impl TryFrom<String> for ConstraintKind {
  type Error = VersionError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

impl From<ConstraintKind> for String {
  fn from(value: ConstraintKind) -> Self {
    value.as_str().to_string()
  }
}

/// Evaluate `candidate` against `required` under `kind`.
///
/// `Equals` holds when the versions compare equal, `Lower` when the candidate
/// is lower, `Higher` when it is higher. `Any` always holds.
pub fn evaluate(candidate: &Version, required: &Version, kind: ConstraintKind) -> bool {
  kind.accepts(candidate.cmp(required))
}
