//! Decomposition of literal content into ordered parts.
//!
//! A literal's content region is an alternating sequence of plain text runs,
//! escape sequences, and interpolation holes. Both sides of the engine use
//! the decomposition: the paste side to know what structure the caret or the
//! replaced selection touches, the copy side to resolve a selection to the
//! logical characters it denotes.
//!
//! Holes are opaque: their logical value is their raw source text, braces and
//! all. Pasting a hole's text into a literal of another kind copies that
//! textual form, never an evaluated value.

use litpaste_core::span::Span;
use ropey::RopeSlice;

use crate::literal::{LiteralDescriptor, StringKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
  /// Plain characters meaning themselves.
  TextRun { span: Span },
  /// One escape sequence (`\n`, `""`, `{{`, ...) and the char it denotes.
  EscapeSequence { span: Span, value: char },
  /// `{expr}`, `{expr,align}`, `{expr:format}`; `span` covers the braces.
  InterpolationHole {
    span:   Span,
    expr:   Span,
    format: Option<Span>,
  },
}

impl ContentPart {
  #[inline]
  pub fn span(&self) -> Span {
    match self {
      Self::TextRun { span }
      | Self::EscapeSequence { span, .. }
      | Self::InterpolationHole { span, .. } => *span,
    }
  }
}

/// Splits the literal's content region into ordered parts. Concatenating the
/// part spans reconstructs the content span exactly.
pub fn decompose(desc: &LiteralDescriptor, doc: RopeSlice) -> Vec<ContentPart> {
  let mut scan = Scan::new(desc, doc);
  match desc.kind {
    StringKind::RawSingleLine | StringKind::RawMultiLine => {
      scan.flush_to_end();
    },
    StringKind::Normal => {
      while let Some(ch) = scan.peek() {
        match ch {
          '\\' => scan.take_backslash_escape(),
          _ => scan.bump(),
        }
      }
      scan.flush_to_end();
    },
    StringKind::Verbatim => {
      while let Some(ch) = scan.peek() {
        match ch {
          '"' if scan.peek_at(1) == Some('"') => scan.take_escape(2, '"'),
          _ => scan.bump(),
        }
      }
      scan.flush_to_end();
    },
    StringKind::Interpolated | StringKind::VerbatimInterpolated => {
      let verbatim = desc.kind.is_verbatim();
      while let Some(ch) = scan.peek() {
        match ch {
          '\\' if !verbatim => scan.take_backslash_escape(),
          '"' if verbatim && scan.peek_at(1) == Some('"') => scan.take_escape(2, '"'),
          '{' if scan.peek_at(1) == Some('{') => scan.take_escape(2, '{'),
          '}' if scan.peek_at(1) == Some('}') => scan.take_escape(2, '}'),
          '{' => scan.take_hole(1),
          _ => scan.bump(),
        }
      }
      scan.flush_to_end();
    },
    StringKind::RawInterpolatedSingleLine | StringKind::RawInterpolatedMultiLine => {
      let open_len = desc.dollar_count;
      while let Some(ch) = scan.peek() {
        match ch {
          '{' => {
            let run = scan.run_len('{');
            if run >= open_len {
              // The first `run - open_len` braces are literal; the final
              // `open_len` open the hole.
              for _ in 0..run - open_len {
                scan.bump();
              }
              scan.take_hole(open_len);
            } else {
              for _ in 0..run {
                scan.bump();
              }
            }
          },
          _ => scan.bump(),
        }
      }
      scan.flush_to_end();
    },
  }
  scan.parts
}

/// The logical character sequence the parts denote once parsed.
pub fn logical_content(parts: &[ContentPart], doc: RopeSlice) -> String {
  let mut out = String::new();
  for part in parts {
    match part {
      ContentPart::TextRun { span } => out.extend(doc.slice(span.start..span.end).chars()),
      ContentPart::EscapeSequence { value, .. } => out.push(*value),
      ContentPart::InterpolationHole { span, .. } => {
        out.extend(doc.slice(span.start..span.end).chars());
      },
    }
  }
  out
}

/// Resolves a selection inside the content region to logical characters.
///
/// Text runs may be partially selected; escape sequences and holes must be
/// wholly inside the selection. A selection straddling a partial escape or
/// hole boundary has no clean logical value and yields `None` — the copy
/// downgrades to unknown-source treatment.
pub fn logical_for_span(parts: &[ContentPart], doc: RopeSlice, sel: Span) -> Option<String> {
  let mut out = String::new();
  for part in parts {
    let span = part.span();
    if span.end <= sel.start || span.start >= sel.end {
      continue;
    }
    match part {
      ContentPart::TextRun { span } => {
        let from = span.start.max(sel.start);
        let to = span.end.min(sel.end);
        out.extend(doc.slice(from..to).chars());
      },
      ContentPart::EscapeSequence { span, value } => {
        if !sel.contains_span(*span) {
          return None;
        }
        out.push(*value);
      },
      ContentPart::InterpolationHole { span, .. } => {
        if !sel.contains_span(*span) {
          return None;
        }
        out.extend(doc.slice(span.start..span.end).chars());
      },
    }
  }
  Some(out)
}

/// Index-based scanner over the content region. Spans it produces are
/// absolute document positions.
struct Scan {
  offset:    usize,
  chars:     Vec<char>,
  pos:       usize,
  run_start: usize,
  parts:     Vec<ContentPart>,
}

impl Scan {
  fn new(desc: &LiteralDescriptor, doc: RopeSlice) -> Self {
    let span = desc.content_span;
    Self {
      offset: span.start,
      chars: doc.slice(span.start..span.end).chars().collect(),
      pos: 0,
      run_start: 0,
      parts: Vec::new(),
    }
  }

  #[inline]
  fn peek(&self) -> Option<char> {
    self.peek_at(0)
  }

  #[inline]
  fn peek_at(&self, off: usize) -> Option<char> {
    self.chars.get(self.pos + off).copied()
  }

  #[inline]
  fn bump(&mut self) {
    self.pos += 1;
  }

  fn run_len(&self, ch: char) -> usize {
    let mut n = 0;
    while self.peek_at(n) == Some(ch) {
      n += 1;
    }
    n
  }

  /// Closes the pending text run, if non-empty, ending at the current
  /// position.
  fn flush_text(&mut self) {
    if self.pos > self.run_start {
      self.parts.push(ContentPart::TextRun {
        span: Span::new(self.offset + self.run_start, self.offset + self.pos),
      });
    }
  }

  fn flush_to_end(&mut self) {
    self.pos = self.chars.len();
    self.flush_text();
  }

  /// Emits an escape part of `len` chars denoting `value`.
  fn take_escape(&mut self, len: usize, value: char) {
    self.flush_text();
    let start = self.offset + self.pos;
    self.pos += len;
    self.run_start = self.pos;
    self.parts.push(ContentPart::EscapeSequence {
      span: Span::new(start, self.offset + self.pos),
      value,
    });
  }

  /// Parses a `\`-introduced escape. An unrecognized escape keeps the
  /// backslash as plain text rather than guessing.
  fn take_backslash_escape(&mut self) {
    let Some(next) = self.peek_at(1) else {
      self.bump();
      return;
    };
    let simple = match next {
      '\'' => Some('\''),
      '"' => Some('"'),
      '\\' => Some('\\'),
      '0' => Some('\0'),
      'a' => Some('\u{0007}'),
      'b' => Some('\u{0008}'),
      'e' => Some('\u{001B}'),
      'f' => Some('\u{000C}'),
      'n' => Some('\n'),
      'r' => Some('\r'),
      't' => Some('\t'),
      'v' => Some('\u{000B}'),
      _ => None,
    };
    if let Some(value) = simple {
      self.take_escape(2, value);
      return;
    }
    let (digits, max) = match next {
      'u' => (4, 4),
      'U' => (8, 8),
      'x' => (1, 4),
      _ => {
        self.bump();
        return;
      },
    };
    let mut hex = String::new();
    while hex.len() < max {
      match self.peek_at(2 + hex.len()) {
        Some(ch) if ch.is_ascii_hexdigit() => hex.push(ch),
        _ => break,
      }
    }
    if hex.len() < digits {
      self.bump();
      return;
    }
    match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
      Some(value) => self.take_escape(2 + hex.len(), value),
      None => self.bump(),
    }
  }

  /// Parses an interpolation hole whose opening brace run of `brace_len` is
  /// at the current position. Balancing is a depth counter, not an
  /// expression parse; nested string and char literals are stepped over.
  fn take_hole(&mut self, brace_len: usize) {
    self.flush_text();
    let start = self.pos;
    self.pos += brace_len;
    let expr_start = self.pos;
    let mut depth = 0usize;
    let mut format_start = None;
    let mut expr_end = None;
    loop {
      let Some(ch) = self.peek() else {
        // Unterminated hole: the classifier rejects these before
        // decomposition, but stay total anyway.
        expr_end.get_or_insert(self.pos);
        break;
      };
      match ch {
        '{' => {
          depth += 1;
          self.bump();
        },
        '}' => {
          if depth == 0 && self.run_len('}') >= brace_len {
            expr_end.get_or_insert(self.pos);
            self.pos += brace_len;
            break;
          }
          depth = depth.saturating_sub(1);
          self.bump();
        },
        ':' if depth == 0 && format_start.is_none() => {
          expr_end = Some(self.pos);
          self.bump();
          format_start = Some(self.pos);
        },
        '"' if format_start.is_none() => self.skip_nested_string(),
        '\'' if format_start.is_none() => self.skip_char_literal(),
        _ => self.bump(),
      }
    }
    let close_start = expr_end.unwrap_or(self.pos);
    let format = format_start.map(|fs| {
      Span::new(
        self.offset + fs,
        self.offset + (self.pos - brace_len).max(fs),
      )
    });
    let expr_span = if let Some(fs) = format_start {
      Span::new(self.offset + expr_start, self.offset + fs - 1)
    } else {
      Span::new(self.offset + expr_start, self.offset + close_start)
    };
    self.run_start = self.pos;
    self.parts.push(ContentPart::InterpolationHole {
      span:   Span::new(self.offset + start, self.offset + self.pos),
      expr:   expr_span,
      format,
    });
  }

  fn skip_nested_string(&mut self) {
    let run = self.run_len('"');
    self.pos += run;
    match run {
      2 => {},
      1 => {
        while let Some(ch) = self.peek() {
          match ch {
            '\\' => {
              self.bump();
              self.bump();
            },
            '"' => {
              self.bump();
              return;
            },
            _ => self.bump(),
          }
        }
      },
      n => {
        while self.peek().is_some() {
          if self.run_len('"') >= n {
            self.pos += n;
            return;
          }
          self.bump();
        }
      },
    }
  }

  fn skip_char_literal(&mut self) {
    self.bump();
    if self.peek() == Some('\\') {
      self.bump();
    }
    self.bump();
    if self.peek() == Some('\'') {
      self.bump();
    }
  }
}
