//! Runtime configuration toggles sourced from `ICONFALL_*` environment
//! variables.
//!
//! Values are captured once (via [`RuntimeToggles::from_env`]) and reused for
//! the rest of the run. Callers can also construct instances from an explicit
//! map to override environment-derived behavior when embedding the library.

use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct RuntimeToggles {
  raw: HashMap<String, String>,
}

impl RuntimeToggles {
  /// Parse all `ICONFALL_*` environment variables into a toggle map.
  pub fn from_env() -> Self {
    let raw = std::env::vars()
      .filter(|(k, _)| k.starts_with("ICONFALL_"))
      .collect::<HashMap<_, _>>();
    Self { raw }
  }

  /// Construct a toggle set from a provided map of key/value pairs.
  pub fn from_map(raw: HashMap<String, String>) -> Self {
    Self { raw }
  }

  /// Returns the raw string value for a toggle, if set.
  pub fn get(&self, key: &str) -> Option<&str> {
    self.raw.get(key).map(String::as_str)
  }

  /// Returns true when the toggle is present and truthy (`!= 0`/`false`/`off`).
  pub fn truthy(&self, key: &str) -> bool {
    self.truthy_with_default(key, false)
  }

  /// Returns true when the toggle is present and truthy, otherwise the
  /// provided default.
  pub fn truthy_with_default(&self, key: &str, default: bool) -> bool {
    self
      .get(key)
      .map(|v| !matches_ignore_case(v, &["0", "false", "off"]))
      .unwrap_or(default)
  }

  /// Parse a toggle as `usize`, returning `None` when unset or unparseable.
  pub fn usize(&self, key: &str) -> Option<usize> {
    self.get(key).and_then(|v| v.trim().parse::<usize>().ok())
  }

  /// Parse a toggle as `usize`, falling back to a default when unset or
  /// invalid.
  pub fn usize_with_default(&self, key: &str, default: usize) -> usize {
    self.usize(key).unwrap_or(default)
  }
}

fn matches_ignore_case(value: &str, candidates: &[&str]) -> bool {
  candidates
    .iter()
    .any(|c| value.trim().eq_ignore_ascii_case(c))
}
