//! String literal classification.
//!
//! Given a buffer and a char position, [`classify`] finds the string literal
//! token containing that position and extracts its delimiter structure: which
//! of the eight literal kinds it is, how many quotes and dollar signs delimit
//! it, where its content region lies, and (for multi-line raw literals) the
//! indentation prefix established by the closing delimiter line.
//!
//! Positions at either edge of the content region count as inside, since a
//! paste is legal at both. Positions inside a delimiter, inside an
//! unterminated literal, or outside any literal classify as `None`, and the
//! paste orchestrator falls back to a plain insert.
//!
//! Classification is a lexical scan from the start of the buffer that skips
//! comments and char literals. Hosts that keep a full parse tree can provide
//! their own [`SyntaxProvider`] instead.

use litpaste_core::{
  chars::{DOLLAR, QUOTE, char_is_blank, char_is_line_ending},
  span::Span,
};
use ropey::RopeSlice;
use serde::{Deserialize, Serialize};

/// The eight literal kinds the engine distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StringKind {
  /// `"..."`
  Normal,
  /// `@"..."`
  Verbatim,
  /// `$"..."`
  Interpolated,
  /// `$@"..."` or `@$"..."`
  VerbatimInterpolated,
  /// `"""..."""` on one line
  RawSingleLine,
  /// `"""` ... `"""` across lines
  RawMultiLine,
  /// `$"""..."""` (any dollar count) on one line
  RawInterpolatedSingleLine,
  /// `$"""` ... `"""` (any dollar count) across lines
  RawInterpolatedMultiLine,
}

impl StringKind {
  #[inline]
  pub const fn is_raw(self) -> bool {
    matches!(
      self,
      Self::RawSingleLine
        | Self::RawMultiLine
        | Self::RawInterpolatedSingleLine
        | Self::RawInterpolatedMultiLine
    )
  }

  #[inline]
  pub const fn is_interpolated(self) -> bool {
    matches!(
      self,
      Self::Interpolated
        | Self::VerbatimInterpolated
        | Self::RawInterpolatedSingleLine
        | Self::RawInterpolatedMultiLine
    )
  }

  #[inline]
  pub const fn is_verbatim(self) -> bool {
    matches!(self, Self::Verbatim | Self::VerbatimInterpolated)
  }

  #[inline]
  pub const fn is_multi_line_raw(self) -> bool {
    matches!(self, Self::RawMultiLine | Self::RawInterpolatedMultiLine)
  }

  /// Kinds whose content understands `\` escape sequences.
  #[inline]
  pub const fn has_backslash_escapes(self) -> bool {
    matches!(self, Self::Normal | Self::Interpolated)
  }

  /// The multi-line counterpart of a raw kind (identity for the rest).
  #[inline]
  pub const fn to_multi_line(self) -> Self {
    match self {
      Self::RawSingleLine => Self::RawMultiLine,
      Self::RawInterpolatedSingleLine => Self::RawInterpolatedMultiLine,
      other => other,
    }
  }
}

/// Delimiter structure of one string literal token.
///
/// Computed fresh per copy/paste operation from the current buffer snapshot;
/// immutable once computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralDescriptor {
  pub kind:         StringKind,
  /// Quotes per delimiter; 1 for non-raw kinds, >= 3 for raw kinds.
  pub quote_count:  usize,
  /// Dollars in the open delimiter; 0 for non-interpolated kinds.
  pub dollar_count: usize,
  pub open_span:    Span,
  pub close_span:   Span,
  pub content_span: Span,
  /// Leading whitespace of the closing delimiter line; multi-line raw only.
  pub indentation:  Option<String>,
}

impl LiteralDescriptor {
  #[inline]
  pub fn token_span(&self) -> Span {
    Span::new(self.open_span.start, self.close_span.end)
  }

  /// Shortest brace run in content that is ambiguous with an interpolation
  /// hole. `usize::MAX` when braces are inert (non-interpolated kinds).
  #[inline]
  pub fn brace_limit(&self) -> usize {
    if !self.kind.is_interpolated() {
      usize::MAX
    } else if self.kind.is_raw() {
      self.dollar_count
    } else {
      1
    }
  }
}

/// Source of literal classification. The engine ships [`LexicalScanner`];
/// hosts with a real parse tree substitute their own.
pub trait SyntaxProvider {
  fn literal_at(&self, doc: RopeSlice, position: usize) -> Option<LiteralDescriptor>;
}

/// Classifier backed by a lexical scan of the buffer.
#[derive(Debug, Default)]
pub struct LexicalScanner;

impl SyntaxProvider for LexicalScanner {
  fn literal_at(&self, doc: RopeSlice, position: usize) -> Option<LiteralDescriptor> {
    classify(doc, position)
  }
}

/// Finds the string literal containing `position`. See the module docs for
/// the boundary policy.
pub fn classify(doc: RopeSlice, position: usize) -> Option<LiteralDescriptor> {
  if position > doc.len_chars() {
    return None;
  }

  let mut cur = Cursor::new(doc);
  while let Some(ch) = cur.peek() {
    if cur.pos > position {
      return None;
    }
    match ch {
      '/' if cur.peek_at(1) == Some('/') => cur.skip_line_comment(),
      '/' if cur.peek_at(1) == Some('*') => cur.skip_block_comment(),
      '\'' => cur.skip_char_literal(),
      QUOTE | DOLLAR | '@' => {
        let token = scan_string(&mut cur);
        match token {
          ScannedToken::Literal(desc) => {
            if desc.content_span.contains_inclusive(position) {
              return Some(desc);
            }
            if desc.token_span().contains(position) {
              // Inside a delimiter.
              return None;
            }
            if desc.token_span().start > position {
              return None;
            }
          },
          ScannedToken::Malformed(span) => {
            if span.contains_inclusive(position) {
              return None;
            }
          },
          ScannedToken::NotAString => {},
        }
      },
      _ => {
        cur.bump();
      },
    }
  }
  None
}

enum ScannedToken {
  Literal(LiteralDescriptor),
  /// Unterminated or otherwise unclassifiable; positions inside never get
  /// literal-aware treatment.
  Malformed(Span),
  /// `@identifier`, a lone `$`, and similar near-misses.
  NotAString,
}

/// Scans one candidate string token starting at the cursor, which sits on a
/// `"`, `$`, or `@`.
fn scan_string(cur: &mut Cursor) -> ScannedToken {
  let start = cur.pos;

  let mut dollar_count = 0;
  let mut verbatim = false;
  loop {
    match cur.peek() {
      Some(DOLLAR) if dollar_count == 0 => dollar_count = cur.skip_run(DOLLAR),
      Some('@') if !verbatim => {
        verbatim = true;
        cur.bump();
      },
      _ => break,
    }
  }

  let quote_run = cur.run_len(QUOTE);
  if quote_run == 0 {
    // `@identifier` or a stray `$`; the prefix chars are already consumed.
    if cur.pos == start {
      cur.bump();
    }
    return ScannedToken::NotAString;
  }

  if !verbatim && quote_run >= 3 {
    return scan_raw(cur, start, dollar_count);
  }
  if dollar_count > 1 {
    // Multiple dollars require a raw literal.
    cur.skip_run(QUOTE);
    return ScannedToken::Malformed(Span::new(start, cur.pos));
  }
  scan_non_raw(cur, start, dollar_count, verbatim)
}

fn scan_raw(cur: &mut Cursor, start: usize, dollar_count: usize) -> ScannedToken {
  let quote_count = cur.skip_run(QUOTE);
  let open_span = Span::new(start, cur.pos);
  let content_start = cur.pos;

  let mut multi_line = false;
  let close_span = loop {
    let Some(ch) = cur.peek() else {
      return ScannedToken::Malformed(Span::new(start, cur.pos));
    };
    match ch {
      QUOTE => {
        let run_start = cur.pos;
        let run = cur.skip_run(QUOTE);
        if run == quote_count {
          break Span::new(run_start, cur.pos);
        }
        if run > quote_count {
          // Quote run longer than the delimiter is not representable.
          return ScannedToken::Malformed(Span::new(start, cur.pos));
        }
      },
      '{' if dollar_count > 0 => {
        let run = cur.skip_run('{');
        if run >= dollar_count {
          // The last `dollar_count` braces of the run open a hole.
          cur.skip_hole(dollar_count);
        }
      },
      ch => {
        if char_is_line_ending(ch) {
          multi_line = true;
        }
        cur.bump();
      },
    }
  };

  let content_span = Span::new(content_start, close_span.start);
  let kind = match (dollar_count > 0, multi_line) {
    (false, false) => StringKind::RawSingleLine,
    (false, true) => StringKind::RawMultiLine,
    (true, false) => StringKind::RawInterpolatedSingleLine,
    (true, true) => StringKind::RawInterpolatedMultiLine,
  };
  let indentation = multi_line.then(|| closing_line_indentation(cur.text, close_span.start));

  ScannedToken::Literal(LiteralDescriptor {
    kind,
    quote_count,
    dollar_count,
    open_span,
    close_span,
    content_span,
    indentation,
  })
}

fn scan_non_raw(
  cur: &mut Cursor,
  start: usize,
  dollar_count: usize,
  verbatim: bool,
) -> ScannedToken {
  // Only the first quote belongs to the delimiter; `""` is an empty literal.
  cur.bump();
  let open_span = Span::new(start, cur.pos);
  let content_start = cur.pos;
  let interpolated = dollar_count > 0;

  let close_span = loop {
    let Some(ch) = cur.peek() else {
      return ScannedToken::Malformed(Span::new(start, cur.pos));
    };
    match ch {
      QUOTE => {
        if verbatim && cur.peek_at(1) == Some(QUOTE) {
          cur.bump();
          cur.bump();
        } else {
          let at = cur.pos;
          cur.bump();
          break Span::new(at, cur.pos);
        }
      },
      '\\' if !verbatim => {
        cur.bump();
        cur.bump();
      },
      '{' if interpolated => {
        if cur.peek_at(1) == Some('{') {
          cur.bump();
          cur.bump();
        } else {
          cur.bump();
          cur.skip_hole(1);
        }
      },
      '}' if interpolated && cur.peek_at(1) == Some('}') => {
        cur.bump();
        cur.bump();
      },
      ch if char_is_line_ending(ch) && !verbatim => {
        // Normal and interpolated literals end at the line; unterminated.
        return ScannedToken::Malformed(Span::new(start, cur.pos));
      },
      _ => {
        cur.bump();
      },
    }
  };

  let kind = match (interpolated, verbatim) {
    (false, false) => StringKind::Normal,
    (false, true) => StringKind::Verbatim,
    (true, false) => StringKind::Interpolated,
    (true, true) => StringKind::VerbatimInterpolated,
  };

  ScannedToken::Literal(LiteralDescriptor {
    kind,
    quote_count: 1,
    dollar_count,
    open_span,
    close_span,
    content_span: Span::new(content_start, close_span.start),
    indentation: None,
  })
}

/// Leading whitespace of the line holding the closing delimiter.
fn closing_line_indentation(text: RopeSlice, close_start: usize) -> String {
  let line_idx = text.char_to_line(close_start);
  let line_start = text.line_to_char(line_idx);
  text
    .slice(line_start..close_start)
    .chars()
    .take_while(|&ch| char_is_blank(ch))
    .collect()
}

struct Cursor<'a> {
  text: RopeSlice<'a>,
  pos:  usize,
  len:  usize,
}

impl<'a> Cursor<'a> {
  fn new(text: RopeSlice<'a>) -> Self {
    Self {
      text,
      pos: 0,
      len: text.len_chars(),
    }
  }

  #[inline]
  fn peek(&self) -> Option<char> {
    self.peek_at(0)
  }

  #[inline]
  fn peek_at(&self, offset: usize) -> Option<char> {
    let at = self.pos + offset;
    (at < self.len).then(|| self.text.char(at))
  }

  #[inline]
  fn bump(&mut self) {
    if self.pos < self.len {
      self.pos += 1;
    }
  }

  /// Length of the run of `ch` starting at the cursor, without consuming.
  fn run_len(&self, ch: char) -> usize {
    let mut n = 0;
    while self.peek_at(n) == Some(ch) {
      n += 1;
    }
    n
  }

  /// Consumes the run of `ch` at the cursor and returns its length.
  fn skip_run(&mut self, ch: char) -> usize {
    let n = self.run_len(ch);
    self.pos += n;
    n
  }

  fn skip_line_comment(&mut self) {
    while let Some(ch) = self.peek() {
      if char_is_line_ending(ch) {
        return;
      }
      self.bump();
    }
  }

  fn skip_block_comment(&mut self) {
    self.bump();
    self.bump();
    while let Some(ch) = self.peek() {
      if ch == '*' && self.peek_at(1) == Some('/') {
        self.bump();
        self.bump();
        return;
      }
      self.bump();
    }
  }

  fn skip_char_literal(&mut self) {
    self.bump();
    match self.peek() {
      Some('\\') => {
        self.bump();
        self.bump();
      },
      Some(ch) if !char_is_line_ending(ch) => self.bump(),
      _ => return,
    }
    if self.peek() == Some('\'') {
      self.bump();
    }
  }

  /// Skips an interpolation hole body, cursor sitting just past the opening
  /// brace run. The hole closes at a run of `close_len` consecutive `}` at
  /// brace depth zero. Nested braces, nested string and char literals inside
  /// the expression are stepped over with a depth counter, not a parser.
  fn skip_hole(&mut self, close_len: usize) {
    let mut depth = 0usize;
    while let Some(ch) = self.peek() {
      match ch {
        '{' => {
          depth += 1;
          self.bump();
        },
        '}' => {
          if depth == 0 && self.run_len('}') >= close_len {
            self.pos += close_len;
            return;
          }
          depth = depth.saturating_sub(1);
          self.bump();
        },
        QUOTE => self.skip_nested_string(),
        '\'' => self.skip_char_literal(),
        _ => self.bump(),
      }
    }
  }

  /// Steps over a string literal nested inside a hole expression. Only the
  /// token boundary matters here, so this is deliberately cruder than
  /// [`scan_string`].
  fn skip_nested_string(&mut self) {
    let run = self.skip_run(QUOTE);
    match run {
      // Empty literal, or an escaped quote pair inside a verbatim string we
      // are already past caring about.
      2 => {},
      1 => {
        while let Some(ch) = self.peek() {
          match ch {
            '\\' => {
              self.bump();
              self.bump();
            },
            QUOTE => {
              self.bump();
              return;
            },
            ch if char_is_line_ending(ch) => return,
            _ => self.bump(),
          }
        }
      },
      // Nested raw literal: runs shorter than the delimiter are content.
      n => {
        while self.peek().is_some() {
          if self.run_len(QUOTE) >= n {
            self.pos += n;
            return;
          }
          self.bump();
        }
      },
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use ropey::Rope;

  fn classify_str(src: &str, position: usize) -> Option<LiteralDescriptor> {
    classify(Rope::from(src).slice(..), position)
  }

  #[test]
  fn not_in_literal() {
    assert!(classify_str("let x = 1;", 4).is_none());
    assert!(classify_str(r#"var s = "abc";"#, 2).is_none());
  }

  #[test]
  fn normal_literal() {
    let src = r#"var s = "abc";"#;
    let desc = classify_str(src, 10).unwrap();
    assert_eq!(desc.kind, StringKind::Normal);
    assert_eq!(desc.quote_count, 1);
    assert_eq!(desc.dollar_count, 0);
    assert_eq!(desc.content_span, Span::new(9, 12));
  }

  #[test]
  fn content_boundaries_are_inside() {
    let src = r#"var s = "abc";"#;
    assert!(classify_str(src, 9).is_some());
    assert!(classify_str(src, 12).is_some());
    // On the quotes themselves: outside.
    assert!(classify_str(src, 8).is_none());
    assert!(classify_str(src, 13).is_none());
  }

  #[test]
  fn empty_literal() {
    let src = r#"var s = "";"#;
    let desc = classify_str(src, 9).unwrap();
    assert_eq!(desc.kind, StringKind::Normal);
    assert!(desc.content_span.is_empty());
  }

  #[test]
  fn verbatim_literal() {
    let src = r#"var s = @"a""b";"#;
    let desc = classify_str(src, 11).unwrap();
    assert_eq!(desc.kind, StringKind::Verbatim);
    // The doubled quote is content, not a terminator.
    assert_eq!(desc.content_span, Span::new(10, 14));
  }

  #[test]
  fn interpolated_literal_with_hole() {
    let src = r#"var s = $"a{x:N2}b";"#;
    let desc = classify_str(src, 11).unwrap();
    assert_eq!(desc.kind, StringKind::Interpolated);
    assert_eq!(desc.dollar_count, 1);
    assert_eq!(desc.content_span, Span::new(10, 18));
  }

  #[test]
  fn hole_with_nested_string_and_braces() {
    let src = r#"var s = $"x{Get("}", new[] { 1 })}y";"#;
    let desc = classify_str(src, 10).unwrap();
    assert_eq!(desc.kind, StringKind::Interpolated);
    assert_eq!(src.chars().nth(desc.close_span.start), Some('"'));
    assert_eq!(desc.close_span.start, 35);
  }

  #[test]
  fn verbatim_interpolated_both_orders() {
    for src in [r#"var s = $@"ab";"#, r#"var s = @$"ab";"#] {
      let desc = classify_str(src, 12).unwrap();
      assert_eq!(desc.kind, StringKind::VerbatimInterpolated);
      assert_eq!(desc.dollar_count, 1);
    }
  }

  #[test]
  fn raw_single_line() {
    let src = r#"var s = """a "b" c""";"#;
    let desc = classify_str(src, 12).unwrap();
    assert_eq!(desc.kind, StringKind::RawSingleLine);
    assert_eq!(desc.quote_count, 3);
    assert_eq!(desc.content_span, Span::new(11, 18));
    assert!(desc.indentation.is_none());
  }

  #[test]
  fn raw_multi_line_indentation() {
    let src = "var s = \"\"\"\n    abc\n    \"\"\";";
    let desc = classify_str(src, 16).unwrap();
    assert_eq!(desc.kind, StringKind::RawMultiLine);
    assert_eq!(desc.indentation.as_deref(), Some("    "));
  }

  #[test]
  fn raw_interpolated_dollar_count() {
    let src = "var s = $$$$\"\"\"\n    {{{\n    \"\"\";";
    let desc = classify_str(src, 20).unwrap();
    assert_eq!(desc.kind, StringKind::RawInterpolatedMultiLine);
    assert_eq!(desc.dollar_count, 4);
    assert_eq!(desc.quote_count, 3);
  }

  #[test]
  fn raw_interpolated_hole_with_quotes() {
    let src = r#"var s = $"""x {Get("}")} y""";"#;
    let desc = classify_str(src, 13).unwrap();
    assert_eq!(desc.kind, StringKind::RawInterpolatedSingleLine);
    assert_eq!(src[desc.close_span.start..].chars().as_str(), "\"\"\";");
  }

  #[test]
  fn unterminated_literals() {
    assert!(classify_str(r#"var s = "abc"#, 10).is_none());
    assert!(classify_str("var s = \"abc\nvar t = 1;", 10).is_none());
    assert!(classify_str(r#"var s = """abc"#, 12).is_none());
  }

  #[test]
  fn literal_in_comment_is_skipped() {
    let src = "// \"not a literal\"\nvar s = \"real\";";
    assert!(classify_str(src, 5).is_none());
    let desc = classify_str(src, 28).unwrap();
    assert_eq!(desc.kind, StringKind::Normal);
  }

  #[test]
  fn quote_char_literal_is_skipped() {
    let src = r#"var c = '"'; var s = "x";"#;
    let desc = classify_str(src, 22).unwrap();
    assert_eq!(desc.kind, StringKind::Normal);
    assert_eq!(desc.content_span, Span::new(22, 23));
  }

  #[test]
  fn second_literal_on_line() {
    let src = r#"f("a", "b");"#;
    let desc = classify_str(src, 8).unwrap();
    assert_eq!(desc.content_span, Span::new(8, 9));
  }
}
