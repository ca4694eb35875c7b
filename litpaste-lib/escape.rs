//! Per-kind escaping, unescaping, and raw delimiter widening.
//!
//! Each literal kind gets a pure `escape`/`unescape` function pair dispatched
//! by an exhaustive `match` over [`StringKind`], so a new kind cannot be
//! added without deciding its escaping here. For raw kinds escaping is the
//! identity; safety comes from [`required_widening`] instead, which decides
//! whether the literal's delimiters must grow to keep inserted quote or brace
//! runs unambiguous.

use litpaste_core::chars::{DOLLAR, QUOTE, leading_run, longest_run, trailing_run};
use litpaste_core::line_ending::has_line_ending;

use crate::literal::{LiteralDescriptor, StringKind};

/// Converts logical content into the on-disk form for `kind`.
///
/// Raw kinds return the content unchanged; whether the destination delimiter
/// can hold it is [`required_widening`]'s concern.
pub fn escape_text(content: &str, kind: StringKind) -> String {
  match kind {
    StringKind::Normal => escape_c_style(content, false),
    StringKind::Interpolated => escape_c_style(content, true),
    StringKind::Verbatim => content.replace(QUOTE, "\"\""),
    StringKind::VerbatimInterpolated => {
      content
        .replace(QUOTE, "\"\"")
        .replace('{', "{{")
        .replace('}', "}}")
    },
    StringKind::RawSingleLine
    | StringKind::RawMultiLine
    | StringKind::RawInterpolatedSingleLine
    | StringKind::RawInterpolatedMultiLine => content.to_string(),
  }
}

/// The exact inverse of [`escape_text`] for well-formed input. Unrecognized
/// escapes pass through untouched rather than guessing.
pub fn unescape_text(raw: &str, kind: StringKind) -> String {
  match kind {
    StringKind::Normal => unescape_c_style(raw, false),
    StringKind::Interpolated => unescape_c_style(raw, true),
    StringKind::Verbatim => raw.replace("\"\"", "\""),
    StringKind::VerbatimInterpolated => {
      raw
        .replace("\"\"", "\"")
        .replace("{{", "{")
        .replace("}}", "}")
    },
    StringKind::RawSingleLine
    | StringKind::RawMultiLine
    | StringKind::RawInterpolatedSingleLine
    | StringKind::RawInterpolatedMultiLine => raw.to_string(),
  }
}

fn escape_c_style(content: &str, braces: bool) -> String {
  let mut out = String::with_capacity(content.len());
  for ch in content.chars() {
    match ch {
      '\\' => out.push_str("\\\\"),
      QUOTE => out.push_str("\\\""),
      '\n' => out.push_str("\\n"),
      '\r' => out.push_str("\\r"),
      '\t' => out.push_str("\\t"),
      '\0' => out.push_str("\\0"),
      '\u{0007}' => out.push_str("\\a"),
      '\u{0008}' => out.push_str("\\b"),
      '\u{000B}' => out.push_str("\\v"),
      '\u{000C}' => out.push_str("\\f"),
      '{' if braces => out.push_str("{{"),
      '}' if braces => out.push_str("}}"),
      ch if (ch as u32) < 0x20 || ch == '\u{007F}' => {
        out.push_str(&format!("\\u{:04X}", ch as u32));
      },
      ch => out.push(ch),
    }
  }
  out
}

fn unescape_c_style(raw: &str, braces: bool) -> String {
  let chars: Vec<char> = raw.chars().collect();
  let mut out = String::with_capacity(raw.len());
  let mut i = 0;
  while i < chars.len() {
    let ch = chars[i];
    if braces && (ch == '{' || ch == '}') && chars.get(i + 1) == Some(&ch) {
      out.push(ch);
      i += 2;
      continue;
    }
    if ch != '\\' {
      out.push(ch);
      i += 1;
      continue;
    }
    let Some(&next) = chars.get(i + 1) else {
      out.push(ch);
      i += 1;
      continue;
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
      out.push(value);
      i += 2;
      continue;
    }
    let (min_digits, max_digits) = match next {
      'u' => (4, 4),
      'U' => (8, 8),
      'x' => (1, 4),
      _ => {
        out.push('\\');
        i += 1;
        continue;
      },
    };
    let mut hex = String::new();
    while hex.len() < max_digits {
      match chars.get(i + 2 + hex.len()) {
        Some(d) if d.is_ascii_hexdigit() => hex.push(*d),
        _ => break,
      }
    }
    match (hex.len() >= min_digits)
      .then(|| u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32))
      .flatten()
    {
      Some(value) => {
        out.push(value);
        i += 2 + hex.len();
      },
      None => {
        out.push('\\');
        i += 1;
      },
    }
  }
  out
}

/// What the pasted content's runs are adjacent to at the insertion point.
///
/// A run of quotes or braces in pasted text can join with an identical run
/// already sitting next to the caret, so the widening scan must measure the
/// joined runs, not the pasted text in isolation. Content-edge adjacency
/// (the caret touching a raw delimiter itself) cannot be fixed by widening
/// and forces multi-line conversion instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertionContext {
  pub quotes_before:       usize,
  pub quotes_after:        usize,
  pub open_braces_before:  usize,
  pub open_braces_after:   usize,
  pub close_braces_before: usize,
  pub close_braces_after:  usize,
  pub at_content_start:    bool,
  pub at_content_end:      bool,
}

/// Delimiter growth required before `content` can sit inside `dest`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Widen {
  /// New quote count for both delimiters, when growth is needed.
  pub quote_count:      Option<usize>,
  /// New dollar count for the open delimiter, when growth is needed.
  pub dollar_count:     Option<usize>,
  /// A single-line raw literal must become multi-line to hold the content.
  pub force_multi_line: bool,
}

impl Widen {
  #[inline]
  pub fn is_noop(&self) -> bool {
    self.quote_count.is_none() && self.dollar_count.is_none() && !self.force_multi_line
  }
}

/// Decides delimiter widening for a raw destination. One linear scan per
/// delimiter character; widening never narrows, and there is no ceiling on
/// the computed counts (a ceiling would make the paste lossy).
///
/// Returns `Widen::default()` (a no-op) for non-raw destinations.
pub fn required_widening(
  content: &str,
  dest: &LiteralDescriptor,
  ctx: InsertionContext,
) -> Widen {
  if !dest.kind.is_raw() {
    return Widen::default();
  }

  let mut widen = Widen::default();

  let quote_run = joined_run(content, QUOTE, ctx.quotes_before, ctx.quotes_after);
  if quote_run >= dest.quote_count {
    widen.quote_count = Some(quote_run + 1);
  }

  if dest.kind.is_interpolated() {
    let open = joined_run(content, '{', ctx.open_braces_before, ctx.open_braces_after);
    let close = joined_run(
      content,
      '}',
      ctx.close_braces_before,
      ctx.close_braces_after,
    );
    let brace_run = open.max(close);
    if brace_run >= dest.dollar_count {
      widen.dollar_count = Some(brace_run + 1);
    }
  }

  if !dest.kind.is_multi_line_raw() {
    let edge_quote = (ctx.at_content_start && content.starts_with(QUOTE))
      || (ctx.at_content_end && content.ends_with(QUOTE));
    if has_line_ending(content) || edge_quote {
      widen.force_multi_line = true;
    }
  }

  widen
}

/// Longest run of `ch` once `content` sits between an existing run of
/// `before` on its left and `after` on its right.
fn joined_run(content: &str, ch: char, before: usize, after: usize) -> usize {
  if content.is_empty() {
    return 0;
  }
  let lead = leading_run(content, ch);
  if lead == content.chars().count() {
    // The content is nothing but `ch`; both neighbors join through it.
    return before + lead + after;
  }
  let trail = trailing_run(content, ch);
  (before + lead)
    .max(trail + after)
    .max(longest_run(content, ch))
}

/// Renders the open delimiter of `desc` after applying `widen`.
pub fn open_delimiter(desc: &LiteralDescriptor, widen: &Widen) -> String {
  let dollars = widen.dollar_count.unwrap_or(desc.dollar_count);
  let quotes = widen.quote_count.unwrap_or(desc.quote_count);
  let mut out = String::with_capacity(dollars + quotes + 2);
  match desc.kind {
    StringKind::Verbatim => out.push('@'),
    StringKind::VerbatimInterpolated => out.push_str("$@"),
    _ => {
      for _ in 0..dollars {
        out.push(DOLLAR);
      }
    },
  }
  for _ in 0..quotes {
    out.push(QUOTE);
  }
  out
}

/// Renders the close delimiter of `desc` after applying `widen`.
pub fn close_delimiter(desc: &LiteralDescriptor, widen: &Widen) -> String {
  let quotes = widen.quote_count.unwrap_or(desc.quote_count);
  std::iter::repeat_n(QUOTE, quotes).collect()
}

#[cfg(test)]
mod test {
  use super::*;
  use litpaste_core::span::Span;

  fn raw_dest(kind: StringKind, quote_count: usize, dollar_count: usize) -> LiteralDescriptor {
    LiteralDescriptor {
      kind,
      quote_count,
      dollar_count,
      open_span: Span::new(0, dollar_count + quote_count),
      close_span: Span::point(0),
      content_span: Span::point(0),
      indentation: None,
    }
  }

  #[test]
  fn normal_escaping() {
    assert_eq!(escape_text("a\"b", StringKind::Normal), "a\\\"b");
    assert_eq!(escape_text("a\\b", StringKind::Normal), "a\\\\b");
    assert_eq!(escape_text("a\nb\r", StringKind::Normal), "a\\nb\\r");
    assert_eq!(escape_text("\u{0001}", StringKind::Normal), "\\u0001");
    assert_eq!(escape_text("{x}", StringKind::Normal), "{x}");
  }

  #[test]
  fn interpolated_doubles_braces() {
    assert_eq!(escape_text("{x}", StringKind::Interpolated), "{{x}}");
    assert_eq!(escape_text("a\"b", StringKind::Interpolated), "a\\\"b");
  }

  #[test]
  fn verbatim_doubles_quotes_only() {
    assert_eq!(escape_text("a\"b", StringKind::Verbatim), "a\"\"b");
    assert_eq!(escape_text("a\\b\n", StringKind::Verbatim), "a\\b\n");
    assert_eq!(
      escape_text("{\"}", StringKind::VerbatimInterpolated),
      "{{\"\"}}"
    );
  }

  #[test]
  fn raw_is_identity() {
    assert_eq!(escape_text("a\"b\\{c", StringKind::RawMultiLine), "a\"b\\{c");
    assert_eq!(
      unescape_text("a\"b\\{c", StringKind::RawMultiLine),
      "a\"b\\{c"
    );
  }

  #[test]
  fn unescape_hex_forms() {
    assert_eq!(unescape_text("\\x41\\u0042", StringKind::Normal), "AB");
    assert_eq!(unescape_text("\\U0001F600", StringKind::Normal), "\u{1F600}");
    // Unknown escape: backslash passes through.
    assert_eq!(unescape_text("\\q", StringKind::Normal), "\\q");
  }

  #[test]
  fn no_widening_when_runs_fit() {
    let dest = raw_dest(StringKind::RawSingleLine, 3, 0);
    let w = required_widening("a \"\" b", &dest, InsertionContext::default());
    assert!(w.is_noop());
  }

  #[test]
  fn quote_run_widens_to_run_plus_one() {
    let dest = raw_dest(StringKind::RawMultiLine, 3, 0);
    let w = required_widening("a \"\"\"\" b", &dest, InsertionContext::default());
    assert_eq!(w.quote_count, Some(5));
    assert_eq!(w.dollar_count, None);
  }

  #[test]
  fn widening_is_idempotent_for_wide_delimiters() {
    let dest = raw_dest(StringKind::RawMultiLine, 5, 0);
    let w = required_widening("a \"\"\"\" b", &dest, InsertionContext::default());
    assert!(w.is_noop());
  }

  #[test]
  fn brace_run_widens_dollar_count() {
    let dest = raw_dest(StringKind::RawInterpolatedMultiLine, 3, 1);
    let w = required_widening("{{{", &dest, InsertionContext::default());
    assert_eq!(w.dollar_count, Some(4));
    assert_eq!(w.quote_count, None);
  }

  #[test]
  fn adjacent_runs_join_across_the_caret() {
    let dest = raw_dest(StringKind::RawMultiLine, 3, 0);
    // Pasting `""` right before an existing `"`: joined run of three.
    let ctx = InsertionContext {
      quotes_after: 1,
      ..Default::default()
    };
    let w = required_widening("\"\"", &dest, ctx);
    assert_eq!(w.quote_count, Some(4));
  }

  #[test]
  fn edge_quote_forces_multi_line() {
    let dest = raw_dest(StringKind::RawSingleLine, 3, 0);
    let ctx = InsertionContext {
      at_content_end: true,
      ..Default::default()
    };
    let w = required_widening("tail\"", &dest, ctx);
    assert!(w.force_multi_line);
  }

  #[test]
  fn newline_forces_multi_line() {
    let dest = raw_dest(StringKind::RawInterpolatedSingleLine, 3, 1);
    let w = required_widening("a\nb", &dest, InsertionContext::default());
    assert!(w.force_multi_line);
  }

  #[test]
  fn delimiter_rendering() {
    let dest = raw_dest(StringKind::RawInterpolatedSingleLine, 3, 1);
    let widen = Widen {
      quote_count: None,
      dollar_count: Some(4),
      force_multi_line: false,
    };
    assert_eq!(open_delimiter(&dest, &widen), "$$$$\"\"\"");
    assert_eq!(close_delimiter(&dest, &widen), "\"\"\"");
  }

  quickcheck::quickcheck! {
      fn roundtrip_normal(s: String) -> bool {
          unescape_text(&escape_text(&s, StringKind::Normal), StringKind::Normal) == s
      }

      fn roundtrip_interpolated(s: String) -> bool {
          unescape_text(&escape_text(&s, StringKind::Interpolated), StringKind::Interpolated) == s
      }

      fn roundtrip_verbatim(s: String) -> bool {
          unescape_text(&escape_text(&s, StringKind::Verbatim), StringKind::Verbatim) == s
      }

      fn roundtrip_raw(s: String) -> bool {
          unescape_text(&escape_text(&s, StringKind::RawMultiLine), StringKind::RawMultiLine) == s
      }
  }
}
