//! Clipboard abstraction.
//!
//! The engine only defines the interface plus an in-memory implementation
//! for tests and headless hosts; editor runtimes provide the real one.
//!
//! Besides plain text, a clipboard carries keyed side-channel entries (the
//! copy provenance record) and a sequence number that changes whenever the
//! plain text is replaced. A paste compares the sequence number recorded at
//! copy time against the current one to detect that some other application
//! has written the clipboard since.

use std::{borrow::Cow, collections::HashMap};

use thiserror::Error;

/// Key for the plain text slot. Writing it starts a new clipboard
/// generation: the sequence number advances and side-channel slots clear.
pub const TEXT_KEY: &str = "text";

/// Key for the provenance record written by tracked copies.
pub const PROVENANCE_KEY: &str = "string-paste/provenance";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClipboardError {
  #[error("clipboard does not support writing")]
  WritingNotSupported,
  #[error("clipboard error: {0}")]
  Platform(String),
}

pub type Result<T> = std::result::Result<T, ClipboardError>;

pub trait ClipboardProvider {
  fn name(&self) -> Cow<'_, str>;
  /// Current clipboard generation.
  fn sequence_number(&self) -> u64;
  fn get_text(&self, key: &str) -> Option<String>;
  fn set_text(&mut self, key: &str, text: &str) -> Result<()>;
}

/// In-memory clipboard.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
  sequence: u64,
  slots:    HashMap<String, String>,
}

impl MemoryClipboard {
  pub fn new() -> Self {
    Self::default()
  }

  /// A clipboard already holding external text, as if another application
  /// had copied it.
  pub fn with_text(text: &str) -> Self {
    let mut clipboard = Self::new();
    let _ = clipboard.set_text(TEXT_KEY, text);
    clipboard
  }
}

impl ClipboardProvider for MemoryClipboard {
  fn name(&self) -> Cow<'_, str> {
    "memory".into()
  }

  fn sequence_number(&self) -> u64 {
    self.sequence
  }

  fn get_text(&self, key: &str) -> Option<String> {
    self.slots.get(key).cloned()
  }

  fn set_text(&mut self, key: &str, text: &str) -> Result<()> {
    if key == TEXT_KEY {
      self.sequence += 1;
      self.slots.clear();
    }
    self.slots.insert(key.to_string(), text.to_string());
    Ok(())
  }
}

/// Null object: reads nothing, rejects writes.
#[derive(Debug, Default)]
pub struct NoClipboard;

impl ClipboardProvider for NoClipboard {
  fn name(&self) -> Cow<'_, str> {
    "none".into()
  }

  fn sequence_number(&self) -> u64 {
    0
  }

  fn get_text(&self, _key: &str) -> Option<String> {
    None
  }

  fn set_text(&mut self, _key: &str, _text: &str) -> Result<()> {
    Err(ClipboardError::WritingNotSupported)
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn text_write_starts_new_generation() {
    let mut clipboard = MemoryClipboard::new();
    clipboard.set_text(TEXT_KEY, "one").unwrap();
    clipboard.set_text(PROVENANCE_KEY, "{}").unwrap();
    let seq = clipboard.sequence_number();
    assert_eq!(clipboard.get_text(PROVENANCE_KEY).as_deref(), Some("{}"));

    clipboard.set_text(TEXT_KEY, "two").unwrap();
    assert_ne!(clipboard.sequence_number(), seq);
    assert_eq!(clipboard.get_text(PROVENANCE_KEY), None);
  }
}
