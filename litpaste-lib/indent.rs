//! Indentation normalization for multi-line raw literals.
//!
//! A multi-line raw literal strips the closing delimiter line's leading
//! whitespace from every content line, so every non-blank content line must
//! be at least that indented. Pasted multi-line content has to be re-indented
//! to keep that invariant, and when it cannot be (a pasted line is less
//! indented than the closing delimiter), the closing delimiter line itself is
//! reduced to the minimum instead.
//!
//! Blank lines are exempt throughout: they are inserted empty, with no
//! trailing whitespace.

use litpaste_core::chars::{leading_blanks, line_is_blank};
use litpaste_core::line_ending::{LineEnding, split_lines};

/// Re-indents pasted text for insertion in the middle of an existing line of
/// a multi-line raw literal. The first line continues the caret's line and is
/// left alone; every following non-blank line gets `prefix` prepended (its
/// own leading whitespace survives after the prefix, preserving the block's
/// relative structure); blank lines become empty.
pub fn reindent(text: &str, prefix: &str, ending: LineEnding) -> String {
  let lines = split_lines(text);
  let mut out = String::with_capacity(text.len() + prefix.len() * lines.len());
  for (i, line) in lines.iter().enumerate() {
    if i == 0 {
      out.push_str(line);
      continue;
    }
    out.push_str(ending.as_str());
    if !line_is_blank(line) {
      out.push_str(prefix);
      out.push_str(line);
    }
  }
  out
}

/// Indents every line of a block, including the first — used when the block
/// starts on a freshly synthesized line (single-line to multi-line
/// conversion). Blank lines become empty.
pub fn indent_block(text: &str, prefix: &str, ending: LineEnding) -> String {
  let lines = split_lines(text);
  let mut out = String::with_capacity(text.len() + prefix.len() * lines.len());
  for (i, line) in lines.iter().enumerate() {
    if i > 0 {
      out.push_str(ending.as_str());
    }
    if !line_is_blank(line) {
      out.push_str(prefix);
      out.push_str(line);
    }
  }
  out
}

/// The longest whitespace prefix shared by all non-blank lines, or `None`
/// when every line is blank.
pub fn common_indentation<'a>(lines: impl IntoIterator<Item = &'a str>) -> Option<String> {
  let mut common: Option<String> = None;
  for line in lines {
    if line_is_blank(line) {
      continue;
    }
    let indent = leading_blanks(line);
    common = Some(match common {
      None => indent.to_string(),
      Some(prev) => shared_prefix(&prev, indent),
    });
  }
  common
}

/// If some content line is less indented than the closing delimiter line,
/// returns the reduced indentation the closing line must drop to.
pub fn closing_indentation_fix<'a>(
  lines: impl IntoIterator<Item = &'a str>,
  prefix: &str,
) -> Option<String> {
  let common = common_indentation(lines)?;
  let shared = shared_prefix(prefix, &common);
  (shared != prefix).then_some(shared)
}

fn shared_prefix(a: &str, b: &str) -> String {
  a.chars()
    .zip(b.chars())
    .take_while(|(x, y)| x == y)
    .map(|(x, _)| x)
    .collect()
}
