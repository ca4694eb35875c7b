//! Line ending detection and ending-preserving line iteration.
//!
//! The engine synthesizes newlines when it converts a single-line raw literal
//! to multi-line form or re-indents pasted content, and those newlines must
//! match what the document already uses.

use ropey::Rope;

#[cfg(target_os = "windows")]
pub const NATIVE_LINE_ENDING: LineEnding = LineEnding::Crlf;

#[cfg(not(target_os = "windows"))]
pub const NATIVE_LINE_ENDING: LineEnding = LineEnding::LF;

#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum LineEnding {
  /// CarriageReturn followed by LineFeed.
  Crlf,

  /// U+000A -- LineFeed
  LF,
}

impl LineEnding {
  #[inline]
  pub const fn len_chars(&self) -> usize {
    match self {
      Self::Crlf => 2,
      Self::LF => 1,
    }
  }

  #[inline]
  pub const fn as_str(&self) -> &'static str {
    match self {
      Self::Crlf => "\u{000D}\u{000A}",
      Self::LF => "\u{000A}",
    }
  }
}

#[inline]
pub const fn char_starts_line_ending(ch: char) -> bool {
  matches!(ch, '\u{000A}' | '\u{000D}')
}

/// Returns the document's line ending, judged from the first line break
/// found. Scanning is bounded; an ending-free document gets the platform
/// default.
pub fn auto_detect_line_ending(doc: &Rope) -> LineEnding {
  let mut prev = '\0';
  for ch in doc.chars().take(10_000) {
    if ch == '\u{000A}' {
      return if prev == '\u{000D}' {
        LineEnding::Crlf
      } else {
        LineEnding::LF
      };
    }
    prev = ch;
  }
  NATIVE_LINE_ENDING
}

/// Splits `text` on `\r\n`, `\n`, or bare `\r`, yielding lines without their
/// endings. A trailing ending yields a final empty line, so joining the
/// result with any ending reconstructs the line structure.
pub fn split_lines(text: &str) -> Vec<&str> {
  let mut lines = Vec::new();
  let mut start = 0;
  let bytes = text.as_bytes();
  let mut i = 0;
  while i < bytes.len() {
    match bytes[i] {
      b'\n' => {
        lines.push(&text[start..i]);
        i += 1;
        start = i;
      },
      b'\r' => {
        lines.push(&text[start..i]);
        i += if bytes.get(i + 1) == Some(&b'\n') { 2 } else { 1 };
        start = i;
      },
      _ => i += 1,
    }
  }
  lines.push(&text[start..]);
  lines
}

/// Whether `text` contains any line ending at all.
#[inline]
pub fn has_line_ending(text: &str) -> bool {
  text.contains(['\u{000A}', '\u{000D}'])
}
