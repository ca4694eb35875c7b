//! Text edits and atomic batch application.
//!
//! A paste produces an ordered batch of up to three non-overlapping edits
//! (open-delimiter widening, content insertion, close-delimiter adjustment).
//! The host applies the batch as one undoable transaction; [`EditBatch::apply`]
//! does the same thing for tests and headless hosts, and [`EditBatch::map_pos`]
//! maps pre-edit positions into the post-edit document.

use litpaste_core::span::Span;
use ropey::Rope;
use smallvec::SmallVec;
use thiserror::Error;

use crate::Tendril;

pub type Result<T> = std::result::Result<T, EditError>;

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum EditError {
  #[error("edit range {from}..{to} is out of bounds for document length {len}")]
  RangeOutOfBounds {
    from: usize,
    to:   usize,
    len:  usize,
  },
  #[error("edit range {from}..{to} overlaps previous edit ending at {prev_end}")]
  OverlappingRange {
    prev_end: usize,
    from:     usize,
    to:       usize,
  },
}

/// One replacement: `span` is removed and `text` takes its place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
  pub span: Span,
  pub text: Tendril,
}

impl TextEdit {
  pub fn insert(at: usize, text: impl Into<Tendril>) -> Self {
    Self {
      span: Span::point(at),
      text: text.into(),
    }
  }

  pub fn replace(span: Span, text: impl Into<Tendril>) -> Self {
    Self {
      span,
      text: text.into(),
    }
  }

  /// Change in document length, in chars.
  pub fn delta(&self) -> isize {
    self.text.chars().count() as isize - self.span.len() as isize
  }
}

/// An ordered batch of non-overlapping edits applied atomically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditBatch {
  edits: SmallVec<[TextEdit; 3]>,
}

impl EditBatch {
  pub fn new() -> Self {
    Self::default()
  }

  /// Appends an edit; edits must be pushed in ascending span order.
  pub fn push(&mut self, edit: TextEdit) {
    self.edits.push(edit);
  }

  pub fn edits(&self) -> &[TextEdit] {
    &self.edits
  }

  pub fn is_empty(&self) -> bool {
    self.edits.is_empty()
  }

  pub fn len(&self) -> usize {
    self.edits.len()
  }

  /// Checks ordering, overlap, and bounds against a document of `len` chars.
  /// Adjacent edits (one ending where the next starts) are fine.
  pub fn validate(&self, len: usize) -> Result<()> {
    let mut prev_end = 0;
    for (i, edit) in self.edits.iter().enumerate() {
      let Span { start, end } = edit.span;
      if end > len {
        return Err(EditError::RangeOutOfBounds {
          from: start,
          to:   end,
          len,
        });
      }
      if i > 0 && start < prev_end {
        return Err(EditError::OverlappingRange {
          prev_end,
          from: start,
          to: end,
        });
      }
      prev_end = end;
    }
    Ok(())
  }

  /// Applies the batch to `doc`. Validation failures leave `doc` untouched.
  pub fn apply(&self, doc: &mut Rope) -> Result<()> {
    self.validate(doc.len_chars())?;
    // Back to front so earlier spans stay valid.
    for edit in self.edits.iter().rev() {
      doc.remove(edit.span.start..edit.span.end);
      doc.insert(edit.span.start, &edit.text);
    }
    Ok(())
  }

  /// Maps a pre-edit position into post-edit coordinates. A position inside
  /// a replaced span lands at the end of the replacement; a position at an
  /// insertion point lands after the inserted text.
  pub fn map_pos(&self, pos: usize) -> usize {
    let mut delta = 0isize;
    for edit in &self.edits {
      if edit.span.end <= pos {
        delta += edit.delta();
      } else if edit.span.start < pos {
        return (edit.span.start as isize + delta) as usize + edit.text.chars().count();
      } else {
        break;
      }
    }
    (pos as isize + delta) as usize
  }
}

impl FromIterator<TextEdit> for EditBatch {
  fn from_iter<I: IntoIterator<Item = TextEdit>>(iter: I) -> Self {
    Self {
      edits: iter.into_iter().collect(),
    }
  }
}
