//! Character predicates and run scanning for string-literal delimiters.

use crate::line_ending::char_starts_line_ending;

/// The quote character shared by every literal kind.
pub const QUOTE: char = '"';

/// The interpolation marker that prefixes interpolated literals.
pub const DOLLAR: char = '$';

#[inline]
pub fn char_is_line_ending(ch: char) -> bool {
  char_starts_line_ending(ch)
}

/// Horizontal whitespace only; line endings are never "blank".
#[inline]
pub fn char_is_blank(ch: char) -> bool {
  ch == ' ' || ch == '\t'
}

/// The leading horizontal whitespace of a single line.
#[inline]
pub fn leading_blanks(line: &str) -> &str {
  let end = line
    .char_indices()
    .find(|&(_, ch)| !char_is_blank(ch))
    .map(|(i, _)| i)
    .unwrap_or(line.len());
  &line[..end]
}

/// Whether a line consists solely of horizontal whitespace (or is empty).
#[inline]
pub fn line_is_blank(line: &str) -> bool {
  line.chars().all(char_is_blank)
}

/// Length of the longest run of `ch` in `text`. One linear scan.
pub fn longest_run(text: &str, ch: char) -> usize {
  let mut longest = 0;
  let mut current = 0;
  for c in text.chars() {
    if c == ch {
      current += 1;
      longest = longest.max(current);
    } else {
      current = 0;
    }
  }
  longest
}

/// Number of consecutive `ch` at the start of `text`.
pub fn leading_run(text: &str, ch: char) -> usize {
  text.chars().take_while(|&c| c == ch).count()
}

/// Number of consecutive `ch` at the end of `text`.
pub fn trailing_run(text: &str, ch: char) -> usize {
  text.chars().rev().take_while(|&c| c == ch).count()
}
