//! The paste orchestrator.
//!
//! One paste runs a straight-line pipeline: resolve what the clipboard holds
//! (known source vs external text), classify the literal under the caret,
//! transform the content for that literal kind, normalize indentation for
//! multi-line raw destinations, and assemble an ordered batch of 1–3 edits
//! plus the post-edit caret. Every step that cannot reach a confident
//! classification falls back to inserting the clipboard text unmodified,
//! which never corrupts the document.
//!
//! All state is local to one invocation; collaborators come in by reference.

use litpaste_core::{
  chars::QUOTE,
  line_ending::{LineEnding, auto_detect_line_ending, has_line_ending, split_lines},
  span::Span,
};
use ropey::{Rope, RopeSlice};

use crate::{
  clipboard::ClipboardProvider,
  config::PasteOptions,
  copy::{PasteSource, resolve_source},
  edit::{EditBatch, TextEdit},
  escape::{
    InsertionContext, Widen, close_delimiter, escape_text, open_delimiter, required_widening,
  },
  indent::{closing_indentation_fix, indent_block, reindent},
  literal::{LiteralDescriptor, SyntaxProvider},
  parts::{ContentPart, decompose},
};

/// The edits a paste wants applied, plus where the caret lands afterwards
/// (in post-edit coordinates).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasteOutcome {
  pub edits: EditBatch,
  pub caret: usize,
}

/// Handles a paste command: resolves the clipboard and delegates to
/// [`paste_source`].
pub fn paste(
  doc: &Rope,
  selection: Span,
  provider: &dyn SyntaxProvider,
  clipboard: &dyn ClipboardProvider,
  options: &PasteOptions,
) -> PasteOutcome {
  let source = resolve_source(clipboard);
  paste_source(doc, selection, &source, provider, options)
}

/// Computes the paste edits for an already-resolved source.
pub fn paste_source(
  doc: &Rope,
  selection: Span,
  source: &PasteSource,
  provider: &dyn SyntaxProvider,
  options: &PasteOptions,
) -> PasteOutcome {
  let len = doc.len_chars();
  let selection = Span::new(selection.start.min(len), selection.end.min(len));
  let plain_text = source.plain_text();

  if !options.escape_on_paste {
    return plain_outcome(selection, plain_text);
  }
  if plain_text.is_empty() && selection.is_empty() {
    return PasteOutcome {
      edits: EditBatch::new(),
      caret: selection.start,
    };
  }

  let Some(dest) = provider.literal_at(doc.slice(..), selection.start) else {
    tracing::trace!("paste target is not inside a string literal");
    return plain_outcome(selection, plain_text);
  };
  if !dest.content_span.contains_span(selection) {
    tracing::trace!("paste selection crosses the literal boundary");
    return plain_outcome(selection, plain_text);
  }
  let parts = decompose(&dest, doc.slice(..));
  if selection_splits_part(&parts, selection) {
    tracing::trace!("paste selection splits an escape or interpolation hole");
    return plain_outcome(selection, plain_text);
  }

  // A known source of the same shape carries its on-disk text forward
  // verbatim; everything else re-escapes the logical content. Multi-line raw
  // sources are excluded because their on-disk text embeds site-specific
  // indentation.
  let escaped = match source {
    PasteSource::Known {
      kind,
      dollar_count,
      raw,
      ..
    } if *kind == dest.kind
      && *dollar_count == dest.dollar_count
      && !dest.kind.is_multi_line_raw() =>
    {
      raw.clone()
    },
    _ => escape_text(source.logical(), dest.kind),
  };

  if !dest.kind.is_raw() {
    let caret = selection.start + escaped.chars().count();
    let mut edits = EditBatch::new();
    edits.push(TextEdit::replace(selection, escaped));
    return PasteOutcome { edits, caret };
  }

  let ctx = insertion_context(doc.slice(..), &dest, selection);
  let widen = required_widening(&escaped, &dest, ctx);
  if let Some(quotes) = widen.quote_count {
    tracing::debug!(quotes, "widening raw string delimiters");
  }
  if let Some(dollars) = widen.dollar_count {
    tracing::debug!(dollars, "widening interpolation dollar count");
  }

  let ending = auto_detect_line_ending(doc);
  if dest.kind.is_multi_line_raw() {
    multi_line_raw_outcome(doc, &dest, selection, &escaped, &widen, ending)
  } else if widen.force_multi_line {
    tracing::debug!("converting single-line raw literal to multi-line");
    convert_to_multi_line(doc, &dest, selection, &escaped, &widen, ending)
  } else {
    single_line_raw_outcome(&dest, selection, &escaped, &widen)
  }
}

/// The fallback: clipboard text inserted byte-for-byte over the selection.
fn plain_outcome(selection: Span, text: &str) -> PasteOutcome {
  let mut edits = EditBatch::new();
  if !(selection.is_empty() && text.is_empty()) {
    edits.push(TextEdit::replace(selection, text));
  }
  PasteOutcome {
    edits,
    caret: selection.start + text.chars().count(),
  }
}

/// A caret strictly inside an escape sequence or interpolation hole, or a
/// selection covering part of one, is not a plain string-content position.
fn selection_splits_part(parts: &[ContentPart], selection: Span) -> bool {
  parts.iter().any(|part| {
    let span = part.span();
    if matches!(part, ContentPart::TextRun { .. }) {
      return false;
    }
    if selection.is_empty() {
      let p = selection.start;
      span.contains(p) && p != span.start
    } else {
      span.overlaps(selection) && !selection.contains_span(span)
    }
  })
}

/// Runs of delimiter characters sitting against the insertion point; see
/// [`InsertionContext`].
fn insertion_context(text: RopeSlice, dest: &LiteralDescriptor, selection: Span) -> InsertionContext {
  let c = dest.content_span;
  InsertionContext {
    quotes_before:       run_before(text, selection.start, c.start, QUOTE),
    quotes_after:        run_after(text, selection.end, c.end, QUOTE),
    open_braces_before:  run_before(text, selection.start, c.start, '{'),
    open_braces_after:   run_after(text, selection.end, c.end, '{'),
    close_braces_before: run_before(text, selection.start, c.start, '}'),
    close_braces_after:  run_after(text, selection.end, c.end, '}'),
    at_content_start:    selection.start == c.start,
    at_content_end:      selection.end == c.end,
  }
}

fn run_before(text: RopeSlice, mut at: usize, floor: usize, ch: char) -> usize {
  let mut n = 0;
  while at > floor && text.char(at - 1) == ch {
    at -= 1;
    n += 1;
  }
  n
}

fn run_after(text: RopeSlice, mut at: usize, ceil: usize, ch: char) -> usize {
  let mut n = 0;
  while at < ceil && text.char(at) == ch {
    at += 1;
    n += 1;
  }
  n
}

fn open_widening_edit(dest: &LiteralDescriptor, widen: &Widen) -> (Option<TextEdit>, isize) {
  if widen.quote_count.is_none() && widen.dollar_count.is_none() {
    return (None, 0);
  }
  let text = open_delimiter(dest, widen);
  let delta = text.chars().count() as isize - dest.open_span.len() as isize;
  (Some(TextEdit::replace(dest.open_span, text)), delta)
}

fn single_line_raw_outcome(
  dest: &LiteralDescriptor,
  selection: Span,
  escaped: &str,
  widen: &Widen,
) -> PasteOutcome {
  let mut edits = EditBatch::new();
  let (open_edit, open_delta) = open_widening_edit(dest, widen);
  if let Some(edit) = open_edit {
    edits.push(edit);
  }
  edits.push(TextEdit::replace(selection, escaped));
  if widen.quote_count.is_some() {
    edits.push(TextEdit::replace(dest.close_span, close_delimiter(dest, widen)));
  }
  PasteOutcome {
    edits,
    caret: offset(selection.start, open_delta) + escaped.chars().count(),
  }
}

fn multi_line_raw_outcome(
  doc: &Rope,
  dest: &LiteralDescriptor,
  selection: Span,
  escaped: &str,
  widen: &Widen,
  ending: LineEnding,
) -> PasteOutcome {
  let c = dest.content_span;
  let prefix = dest.indentation.clone().unwrap_or_default();
  let before_head: String = doc.slice(c.start..selection.start).to_string();
  let after_tail: String = doc.slice(selection.end..c.end).to_string();

  let mut insert_text = if has_line_ending(&before_head) {
    reindent(escaped, &prefix, ending)
  } else {
    // The caret sits on the opening delimiter line; content must start on a
    // fresh line of its own.
    let mut text = String::from(ending.as_str());
    text.push_str(&indent_block(escaped, &prefix, ending));
    text
  };
  let caret_offset = insert_text.chars().count();
  if !has_line_ending(&after_tail) {
    // Nothing between the insertion and the closing delimiter ends the
    // line, so the delimiter must be pushed onto one of its own.
    insert_text.push_str(ending.as_str());
    insert_text.push_str(&prefix);
  }

  let mut edits = EditBatch::new();
  let (open_edit, open_delta) = open_widening_edit(dest, widen);
  if let Some(edit) = open_edit {
    edits.push(edit);
  }

  let close_text = close_delimiter(dest, widen);
  let indent_start = dest.close_span.start.saturating_sub(prefix.chars().count());
  let mut close_edit = None;
  if selection.end <= indent_start {
    let mut new_content = before_head;
    new_content.push_str(&insert_text);
    new_content.push_str(&after_tail);
    let lines = split_lines(&new_content);
    if lines.len() >= 2 {
      let interior = lines[1..lines.len() - 1].iter().copied();
      if let Some(reduced) = closing_indentation_fix(interior, &prefix) {
        tracing::debug!("reducing closing delimiter line indentation");
        close_edit = Some(TextEdit::replace(
          Span::new(indent_start, dest.close_span.end),
          format!("{reduced}{close_text}"),
        ));
      }
    }
  }
  if close_edit.is_none() && widen.quote_count.is_some() {
    close_edit = Some(TextEdit::replace(dest.close_span, close_text));
  }

  edits.push(TextEdit::replace(selection, insert_text));
  // The close-side edit starts at or after the selection end, so the batch
  // stays ordered.
  if let Some(edit) = close_edit {
    edits.push(edit);
  }

  PasteOutcome {
    edits,
    caret: offset(selection.start, open_delta) + caret_offset,
  }
}

/// Rewrites a single-line raw literal into multi-line form around the paste:
/// the opening delimiter gains a newline and indentation, the closing
/// delimiter moves to its own indented line, and the pasted lines are
/// indented like the rest of the block.
fn convert_to_multi_line(
  doc: &Rope,
  dest: &LiteralDescriptor,
  selection: Span,
  escaped: &str,
  widen: &Widen,
  ending: LineEnding,
) -> PasteOutcome {
  let prefix = open_line_indentation(doc.slice(..), dest.open_span.start);

  let mut open_text = open_delimiter(dest, widen);
  open_text.push_str(ending.as_str());
  open_text.push_str(&prefix);
  let open_delta = open_text.chars().count() as isize - dest.open_span.len() as isize;

  let insert_text = reindent(escaped, &prefix, ending);
  let caret_offset = insert_text.chars().count();

  let mut close_text = String::from(ending.as_str());
  close_text.push_str(&prefix);
  close_text.push_str(&close_delimiter(dest, widen));

  let mut edits = EditBatch::new();
  edits.push(TextEdit::replace(dest.open_span, open_text));
  edits.push(TextEdit::replace(selection, insert_text));
  edits.push(TextEdit::replace(dest.close_span, close_text));

  PasteOutcome {
    edits,
    caret: offset(selection.start, open_delta) + caret_offset,
  }
}

/// Leading whitespace of the line holding the opening delimiter, used as the
/// synthesized indentation when a literal first becomes multi-line.
fn open_line_indentation(text: RopeSlice, open_start: usize) -> String {
  let line = text.char_to_line(open_start);
  let start = text.line_to_char(line);
  text
    .slice(start..open_start)
    .chars()
    .take_while(|&ch| ch == ' ' || ch == '\t')
    .collect()
}

fn offset(base: usize, delta: isize) -> usize {
  (base as isize + delta) as usize
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::{clipboard::MemoryClipboard, copy::copy, literal::LexicalScanner};

  /// Splits a `[|...|]` selection (or `[||]` caret) marker out of a test
  /// document.
  fn parse_marked(marked: &str) -> (Rope, Span) {
    let open = marked.find("[|").expect("missing [| marker");
    let close = marked.find("|]").expect("missing |] marker");
    let selected = &marked[open + 2..close];
    let mut text = String::new();
    text.push_str(&marked[..open]);
    text.push_str(selected);
    text.push_str(&marked[close + 2..]);
    let start = marked[..open].chars().count();
    let end = start + selected.chars().count();
    (Rope::from(text), Span::new(start, end))
  }

  fn apply(doc: &Rope, outcome: &PasteOutcome) -> String {
    let mut out = doc.clone();
    outcome.edits.apply(&mut out).unwrap();
    out.to_string()
  }

  /// Applies the outcome and checks it against a `[||]`-marked expectation,
  /// where the marker is the final caret position.
  fn check(doc: &Rope, outcome: &PasteOutcome, expected: &str) {
    let (want_doc, want_caret) = parse_marked(expected);
    assert_eq!(apply(doc, outcome), want_doc.to_string());
    assert_eq!(outcome.caret, want_caret.start, "caret position");
  }

  /// Pastes external clipboard text at the marker.
  fn check_external(marked: &str, clip: &str, expected: &str) {
    let (doc, sel) = parse_marked(marked);
    let clipboard = MemoryClipboard::with_text(clip);
    let outcome = paste(&doc, sel, &LexicalScanner, &clipboard, &PasteOptions::default());
    check(&doc, &outcome, expected);
  }

  /// Copies the source marker's selection, then pastes at the destination
  /// marker — the known-source round trip.
  fn check_copied(source_marked: &str, dest_marked: &str, expected: &str) {
    let (src_doc, src_sel) = parse_marked(source_marked);
    let mut clipboard = MemoryClipboard::new();
    copy(
      &src_doc,
      src_sel,
      &LexicalScanner,
      &mut clipboard,
      &PasteOptions::default(),
    )
    .unwrap();
    let (doc, sel) = parse_marked(dest_marked);
    let outcome = paste(&doc, sel, &LexicalScanner, &clipboard, &PasteOptions::default());
    check(&doc, &outcome, expected);
  }

  #[test]
  fn outside_literal_inserts_clipboard_verbatim() {
    check_external(
      "var x = [||]1;",
      "\"quoted \\ text\"",
      "var x = \"quoted \\ text\"[||]1;",
    );
  }

  #[test]
  fn unterminated_literal_falls_back_to_plain_insert() {
    check_external("var s = \"abc[||]", "x\"y", "var s = \"abcx\"y[||]");
  }

  #[test]
  fn empty_clipboard_is_a_no_op() {
    let (doc, sel) = parse_marked("var s = \"a[||]b\";");
    let clipboard = MemoryClipboard::new();
    let outcome = paste(&doc, sel, &LexicalScanner, &clipboard, &PasteOptions::default());
    assert!(outcome.edits.is_empty());
    assert_eq!(outcome.caret, sel.start);
  }

  #[test]
  fn disabled_engine_always_inserts_plainly() {
    let (doc, sel) = parse_marked("var s = \"[||]\";");
    let clipboard = MemoryClipboard::with_text("\"x\"");
    let options = PasteOptions {
      escape_on_paste: false,
      ..Default::default()
    };
    let outcome = paste(&doc, sel, &LexicalScanner, &clipboard, &options);
    check(&doc, &outcome, "var s = \"\"x\"[||]\";");
  }

  #[test]
  fn external_text_is_escaped_for_normal_literal() {
    check_external(
      "var r = \"[||]\";",
      "one\ntwo\t\"q\"",
      "var r = \"one\\ntwo\\t\\\"q\\\"[||]\";",
    );
  }

  #[test]
  fn external_quotes_are_escaped_in_verbatim() {
    check_external(
      "var r = @\"[||]\";",
      "warning \"CA2013\" fired",
      "var r = @\"warning \"\"CA2013\"\" fired[||]\";",
    );
  }

  #[test]
  fn external_braces_are_doubled_in_interpolated() {
    check_external("var r = $\"a[||]b\";", "{x}", "var r = $\"a{{x}}[||]b\";");
  }

  #[test]
  fn known_source_into_raw_interpolated_multi_line() {
    check_copied(
      "var v = \"[|goo|]\";",
      "var r = $\"\"\"\n    [||]\n    \"\"\";",
      "var r = $\"\"\"\n    goo[||]\n    \"\"\";",
    );
  }

  #[test]
  fn brace_run_widens_dollar_count_to_four() {
    check_external(
      "var r = $\"\"\"\n    [||]\n    \"\"\";",
      "{{{",
      "var r = $$$$\"\"\"\n    {{{[||]\n    \"\"\";",
    );
  }

  #[test]
  fn quote_run_widens_both_raw_delimiters() {
    check_external(
      "var s = \"\"\"x[||]y\"\"\";",
      "a\"\"\"\"b",
      "var s = \"\"\"\"\"xa\"\"\"\"b[||]y\"\"\"\"\";",
    );
  }

  #[test]
  fn pasted_run_joins_adjacent_content_quotes() {
    check_external(
      "var s = \"\"\"a[||]\"b\"\"\";",
      "\"\"",
      "var s = \"\"\"\"a\"\"[||]\"b\"\"\"\";",
    );
  }

  #[test]
  fn no_widening_when_delimiter_already_wide() {
    let (doc, sel) = parse_marked("var s = \"\"\"\"\"a[||]b\"\"\"\"\";");
    let clipboard = MemoryClipboard::with_text("\"\"\"\"");
    let outcome = paste(&doc, sel, &LexicalScanner, &clipboard, &PasteOptions::default());
    assert_eq!(outcome.edits.len(), 1);
  }

  #[test]
  fn trailing_quote_converts_single_line_raw_to_multi_line() {
    check_external(
      "    var s = \"\"\"ab[||]\"\"\";",
      "tail\"",
      "    var s = \"\"\"\n    abtail\"[||]\n    \"\"\";",
    );
  }

  #[test]
  fn multi_line_text_converts_single_line_raw() {
    check_external(
      "    var s = \"\"\"a[||]b\"\"\";",
      "one\ntwo",
      "    var s = \"\"\"\n    aone\n    two[||]b\n    \"\"\";",
    );
  }

  #[test]
  fn multi_line_paste_reindents_following_lines() {
    check_external(
      "var s = $\"\"\"\n    a[||]b\n    \"\"\";",
      "one\ntwo",
      "var s = $\"\"\"\n    aone\n    two[||]b\n    \"\"\";",
    );
  }

  #[test]
  fn crlf_documents_get_crlf_reindentation() {
    check_external(
      "var s = \"\"\"\r\n    a[||]\r\n    \"\"\";",
      "x\ny",
      "var s = \"\"\"\r\n    ax\r\n    y[||]\r\n    \"\"\";",
    );
  }

  #[test]
  fn dedented_remainder_reduces_closing_delimiter() {
    // Pasting a trailing newline pushes `def` onto an unindented line; the
    // closing delimiter line drops to the new minimum.
    check_external(
      "var s = \"\"\"\n    abc[||]def\n    \"\"\";",
      "x\n",
      "var s = \"\"\"\n    abcx\n[||]def\n\"\"\";",
    );
  }

  #[test]
  fn caret_inside_hole_gets_plain_insert() {
    check_external("var s = $\"a{x[||]y}b\";", "\"", "var s = $\"a{x\"[||]y}b\";");
  }

  #[test]
  fn selection_covering_whole_hole_is_replaced() {
    check_external("var s = $\"a[|{x}|]b\";", "{v}", "var s = $\"a{{v}}[||]b\";");
  }

  #[test]
  fn known_source_same_kind_carries_original_escapes() {
    // `\x41` is `A`; a same-kind paste keeps the author's spelling.
    check_copied(
      "var a = \"[|G\\x41G|]\";",
      "var b = \"[||]\";",
      "var b = \"G\\x41G[||]\";",
    );
  }

  #[test]
  fn known_source_cross_kind_re_escapes_logical_content() {
    check_copied(
      "var a = \"[|G\\x41G|]\";",
      "var b = @\"[||]\";",
      "var b = @\"GAG[||]\";",
    );
  }

  #[test]
  fn known_multi_line_raw_source_into_normal_literal() {
    check_copied(
      "var a = \"\"\"\n    [|one\n    two|]\n    \"\"\";",
      "var b = \"[||]\";",
      "var b = \"one\\ntwo[||]\";",
    );
  }

  #[test]
  fn selection_replacement_matches_delete_then_paste() {
    let (doc, sel) = parse_marked("var s = \"\"\"one [|mid|] two\"\"\";");
    let clipboard = MemoryClipboard::with_text("a\"\"\"\"b");
    let outcome = paste(&doc, sel, &LexicalScanner, &clipboard, &PasteOptions::default());
    let direct = apply(&doc, &outcome);

    let mut deleted = doc.clone();
    deleted.remove(sel.start..sel.end);
    let outcome = paste(
      &deleted,
      Span::point(sel.start),
      &LexicalScanner,
      &clipboard,
      &PasteOptions::default(),
    );
    assert_eq!(direct, apply(&deleted, &outcome));
  }
}
