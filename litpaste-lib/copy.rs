//! Copy-side resolution and clipboard provenance.
//!
//! A copy observed inside the session is resolved against the literal it came
//! from: if the selection maps cleanly onto whole content parts, the exact
//! logical characters it denotes are recorded next to the plain text, tagged
//! with the clipboard sequence number. A later paste that sees a matching
//! sequence number may treat the clipboard as a known source; anything else
//! (external copies, stale records, selections straddling escape boundaries)
//! is opaque text that gets defensively escaped.

use litpaste_core::span::Span;
use ropey::Rope;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
  clipboard::{ClipboardError, ClipboardProvider, PROVENANCE_KEY, TEXT_KEY},
  config::PasteOptions,
  literal::{LiteralDescriptor, StringKind, SyntaxProvider},
  parts::{decompose, logical_for_span},
};

/// Side-channel record written by a tracked copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
  /// Clipboard generation this record belongs to.
  pub sequence:     u64,
  /// Kind of the literal the text was copied out of.
  pub kind:         StringKind,
  pub dollar_count: usize,
  /// The characters the copied text evaluates to once parsed.
  pub logical:      String,
  /// The copied on-disk text, verbatim.
  pub raw:          String,
}

/// What a paste knows about its clipboard contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasteSource {
  Known {
    kind:         StringKind,
    dollar_count: usize,
    logical:      String,
    raw:          String,
  },
  External {
    text: String,
  },
}

impl PasteSource {
  /// The characters the paste should make the destination literal denote.
  /// External text has no interpretation to undo, so it is its own logical
  /// content.
  pub fn logical(&self) -> &str {
    match self {
      Self::Known { logical, .. } => logical,
      Self::External { text } => text,
    }
  }

  /// The text a plain (literal-unaware) insert would produce.
  pub fn plain_text(&self) -> &str {
    match self {
      Self::Known { raw, .. } => raw,
      Self::External { text } => text,
    }
  }
}

pub type Result<T> = std::result::Result<T, CopyError>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CopyError {
  #[error("selection {from}..{to} is out of bounds for document length {len}")]
  SelectionOutOfBounds {
    from: usize,
    to:   usize,
    len:  usize,
  },
  #[error(transparent)]
  Clipboard(#[from] ClipboardError),
}

/// Copies `selection` to the clipboard, attaching a provenance record when
/// the selection resolves cleanly inside a classified literal.
pub fn copy(
  doc: &Rope,
  selection: Span,
  provider: &dyn SyntaxProvider,
  clipboard: &mut dyn ClipboardProvider,
  options: &PasteOptions,
) -> Result<()> {
  if selection.end > doc.len_chars() {
    return Err(CopyError::SelectionOutOfBounds {
      from: selection.start,
      to:   selection.end,
      len:  doc.len_chars(),
    });
  }

  let raw: String = doc.slice(selection.start..selection.end).to_string();
  clipboard.set_text(TEXT_KEY, &raw)?;
  if !options.track_copy_provenance {
    return Ok(());
  }

  let Some((kind, dollar_count, logical)) = resolve_selection(doc, selection, provider) else {
    tracing::trace!("copy selection did not resolve cleanly; plain text only");
    return Ok(());
  };

  let record = Provenance {
    sequence: clipboard.sequence_number(),
    kind,
    dollar_count,
    logical,
    raw,
  };
  match serde_json::to_string(&record) {
    Ok(json) => {
      if let Err(err) = clipboard.set_text(PROVENANCE_KEY, &json) {
        tracing::warn!(%err, "failed to write copy provenance");
      }
    },
    Err(err) => tracing::warn!(%err, "failed to serialize copy provenance"),
  }
  Ok(())
}

/// Maps a copy selection to the logical characters it denotes, or `None`
/// when it cannot be done cleanly (outside a literal, crossing a delimiter,
/// or straddling part of an escape sequence or interpolation hole).
fn resolve_selection(
  doc: &Rope,
  selection: Span,
  provider: &dyn SyntaxProvider,
) -> Option<(StringKind, usize, String)> {
  let desc = provider.literal_at(doc.slice(..), selection.start)?;
  if !desc.content_span.contains_span(selection) {
    return None;
  }
  let parts = decompose(&desc, doc.slice(..));
  let mut logical = logical_for_span(&parts, doc.slice(..), selection)?;
  if desc.kind.is_multi_line_raw() {
    logical = raw_multi_line_logical(logical, doc, &desc, selection);
  }
  Some((desc.kind, desc.dollar_count, logical))
}

/// A multi-line raw literal's parsed value excludes the newline after the
/// opening delimiter, the closing delimiter's own line, and the closing
/// line's indentation at the start of every content line. The raw selection
/// text still carries all three, so they are stripped here.
fn raw_multi_line_logical(
  mut text: String,
  doc: &Rope,
  desc: &LiteralDescriptor,
  selection: Span,
) -> String {
  let prefix = desc.indentation.as_deref().unwrap_or("");

  if selection.end == desc.content_span.end {
    while text.ends_with(' ') || text.ends_with('\t') {
      text.pop();
    }
    if text.ends_with('\n') {
      text.pop();
      if text.ends_with('\r') {
        text.pop();
      }
    } else if text.ends_with('\r') {
      text.pop();
    }
  }

  let strip_first;
  if selection.start == desc.content_span.start {
    if text.starts_with("\r\n") {
      text.drain(..2);
    } else if text.starts_with('\n') || text.starts_with('\r') {
      text.drain(..1);
    }
    strip_first = true;
  } else {
    strip_first = selection.start > 0
      && matches!(doc.char(selection.start - 1), '\n' | '\r');
  }

  strip_line_prefixes(&text, prefix, strip_first)
}

/// Removes `prefix` (or as much of it as the line actually has, for blank
/// lines) from the start of every line; the first line only when it sits at
/// a line start. Original line endings are preserved.
fn strip_line_prefixes(text: &str, prefix: &str, strip_first: bool) -> String {
  if prefix.is_empty() {
    return text.to_string();
  }
  let mut out = String::with_capacity(text.len());
  let mut rest = text;
  let mut first = true;
  loop {
    let (line, ending) = next_line(rest);
    if first && !strip_first {
      out.push_str(line);
    } else {
      let shared = line
        .chars()
        .zip(prefix.chars())
        .take_while(|(a, b)| a == b)
        .count();
      let at: usize = line.chars().take(shared).map(char::len_utf8).sum();
      out.push_str(&line[at..]);
    }
    out.push_str(ending);
    if ending.is_empty() {
      break;
    }
    rest = &rest[line.len() + ending.len()..];
    first = false;
  }
  out
}

fn next_line(text: &str) -> (&str, &str) {
  match text.find(['\n', '\r']) {
    None => (text, ""),
    Some(i) => {
      let ending = if text[i..].starts_with("\r\n") {
        &text[i..i + 2]
      } else {
        &text[i..i + 1]
      };
      (&text[..i], ending)
    },
  }
}

/// Reads the clipboard into a paste source. The provenance record is only
/// trusted when its sequence number matches the clipboard's current one and
/// its raw text still equals the plain text slot.
pub fn resolve_source(clipboard: &dyn ClipboardProvider) -> PasteSource {
  let text = clipboard.get_text(TEXT_KEY).unwrap_or_default();
  if let Some(json) = clipboard.get_text(PROVENANCE_KEY) {
    match serde_json::from_str::<Provenance>(&json) {
      Ok(record) if record.sequence == clipboard.sequence_number() && record.raw == text => {
        return PasteSource::Known {
          kind:         record.kind,
          dollar_count: record.dollar_count,
          logical:      record.logical,
          raw:          record.raw,
        };
      },
      Ok(_) => tracing::trace!("stale clipboard provenance ignored"),
      Err(err) => tracing::warn!(%err, "malformed clipboard provenance ignored"),
    }
  }
  PasteSource::External { text }
}
