//! Engine options.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// User-facing switches for the copy/paste engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct PasteOptions {
  /// Master switch. Disabled, every paste is a plain unmodified insert.
  pub escape_on_paste:       bool,
  /// Tag copies with provenance so same-session pastes can reuse the exact
  /// source text instead of defensively re-escaping.
  pub track_copy_provenance: bool,
}

impl Default for PasteOptions {
  fn default() -> Self {
    Self {
      escape_on_paste:       true,
      track_copy_provenance: true,
    }
  }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
  #[error(transparent)]
  Parse(#[from] toml::de::Error),
}

impl PasteOptions {
  pub fn from_toml(src: &str) -> Result<Self, ConfigError> {
    Ok(toml::from_str(src)?)
  }
}
