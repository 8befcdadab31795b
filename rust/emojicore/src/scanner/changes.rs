//! ChangeBatch: one editor transaction worth of edits
//!
//! Edits are expressed in coordinates of the document *before* the batch,
//! sorted and non-overlapping, the way an editor reports a transaction.
//!
//! # Position mapping
//! `map_pos` follows the usual editor rules:
//! - a position before an edit is unchanged
//! - a position after an edit shifts by the edit's net length delta
//! - a position at the start of a replaced range maps to the start of the insertion
//! - a position strictly inside a replaced range maps to the start (`Bias::Before`)
//!   or the end (`Bias::After`) of the inserted text
//! - a pure insertion exactly at a position leaves it in front of the inserted
//!   text for `Bias::Before` and moves it past for `Bias::After`

use serde::{Deserialize, Serialize};

use crate::error::{EmojiError, Result};

// =============================================================================
// Types
// =============================================================================

/// Which side of an edit a mapped position sticks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    Before,
    After,
}

/// Replace `from..to` of the old document with `insert`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edit {
    pub from: usize,
    pub to: usize,
    #[serde(default)]
    pub insert: String,
}

impl Edit {
    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self { from: at, to: at, insert: text.into() }
    }

    pub fn delete(from: usize, to: usize) -> Self {
        Self { from, to, insert: String::new() }
    }

    pub fn replace(from: usize, to: usize, text: impl Into<String>) -> Self {
        Self { from, to, insert: text.into() }
    }

    /// Length of the deleted range
    pub fn deleted_len(&self) -> usize {
        self.to - self.from
    }

    /// Net length change
    pub fn shift(&self) -> i64 {
        self.insert.len() as i64 - self.deleted_len() as i64
    }

    fn is_noop(&self) -> bool {
        self.from == self.to && self.insert.is_empty()
    }
}

/// A validated, sorted set of edits against a document of `old_len` bytes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeBatch {
    edits: Vec<Edit>,
    old_len: usize,
}

// =============================================================================
// ChangeBatch
// =============================================================================

impl ChangeBatch {
    /// Validate and sort the edits. No-op edits are dropped.
    pub fn new(edits: Vec<Edit>, old_len: usize) -> Result<Self> {
        let mut edits: Vec<Edit> = edits.into_iter().filter(|e| !e.is_noop()).collect();
        edits.sort_by_key(|e| (e.from, e.to));

        let mut last_end = 0;
        for edit in &edits {
            if edit.from > edit.to || edit.to > old_len || edit.from < last_end {
                return Err(EmojiError::InvalidEdit {
                    from: edit.from,
                    to: edit.to,
                    len: old_len,
                });
            }
            last_end = edit.to;
        }

        Ok(Self { edits, old_len })
    }

    /// A batch that changes nothing
    pub fn empty(len: usize) -> Self {
        Self { edits: Vec::new(), old_len: len }
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    /// Length of the document the batch applies to
    pub fn old_len(&self) -> usize {
        self.old_len
    }

    /// Length of the document after the batch
    pub fn new_len(&self) -> usize {
        let shift: i64 = self.edits.iter().map(Edit::shift).sum();
        (self.old_len as i64 + shift).max(0) as usize
    }

    /// `(from, to, inserted)` per edit, in old-document coordinates
    pub fn iter_changes(&self) -> impl Iterator<Item = (usize, usize, &str)> {
        self.edits.iter().map(|e| (e.from, e.to, e.insert.as_str()))
    }

    /// Map an old-document position into the new document
    pub fn map_pos(&self, pos: usize, bias: Bias) -> usize {
        let mut delta: i64 = 0;

        for edit in &self.edits {
            if edit.from > pos {
                break;
            }
            let ins = edit.insert.len();
            let len = edit.deleted_len();

            let covers = edit.to > pos || (edit.to == pos && len == 0 && bias == Bias::Before);
            if covers {
                let start = (edit.from as i64 + delta).max(0) as usize;
                return if pos == edit.from || bias == Bias::Before {
                    start
                } else {
                    start + ins
                };
            }

            delta += edit.shift();
        }

        (pos as i64 + delta).max(0) as usize
    }

    /// Apply the batch to the old document text
    pub fn apply(&self, text: &str) -> Result<String> {
        if text.len() != self.old_len {
            return Err(EmojiError::InvalidEdit {
                from: 0,
                to: text.len(),
                len: self.old_len,
            });
        }

        let mut out = String::with_capacity(self.new_len());
        let mut cursor = 0;
        for edit in &self.edits {
            if !text.is_char_boundary(edit.from) || !text.is_char_boundary(edit.to) {
                return Err(EmojiError::InvalidEdit {
                    from: edit.from,
                    to: edit.to,
                    len: self.old_len,
                });
            }
            out.push_str(&text[cursor..edit.from]);
            out.push_str(&edit.insert);
            cursor = edit.to;
        }
        out.push_str(&text[cursor..]);
        Ok(out)
    }
}

// =============================================================================
// Tests
// =============================================================================
