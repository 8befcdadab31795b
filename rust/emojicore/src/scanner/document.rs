//! Document service: the read-only view of a text buffer the scanners need
//!
//! Offsets are UTF-8 byte offsets. `SourceText` is the owned implementation
//! used by the reference surface and the WASM binding; it also converts
//! to and from UTF-16 code units, the offset unit of JS editors.

use std::borrow::Cow;

use super::changes::ChangeBatch;
use crate::error::{EmojiError, Result};

// =============================================================================
// Types
// =============================================================================

/// One line of a document, without its line break
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    /// 0-based line number
    pub number: usize,
    /// Offset of the first character of the line
    pub from: usize,
    pub text: &'a str,
}

impl Line<'_> {
    /// Offset just past the last character (before the line break)
    pub fn to(&self) -> usize {
        self.from + self.text.len()
    }
}

/// Read access to a text document
pub trait TextDocument {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn line_count(&self) -> usize;

    /// Line `n` (0-based)
    fn line(&self, n: usize) -> Result<Line<'_>>;

    /// The line containing `offset`
    fn line_at(&self, offset: usize) -> Result<Line<'_>>;

    /// Text between two offsets
    fn slice(&self, from: usize, to: usize) -> Result<Cow<'_, str>>;
}

// =============================================================================
// SourceText
// =============================================================================

/// Owned document text with line start tables in bytes and UTF-16 units
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceText {
    text: String,
    line_starts: Vec<usize>,
    utf16_starts: Vec<usize>,
}

impl SourceText {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let line_starts = compute_line_starts(&text);
        let utf16_starts = compute_utf16_starts(&text, &line_starts);
        Self {
            text,
            line_starts,
            utf16_starts,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// New document with the batch applied
    pub fn apply(&self, changes: &ChangeBatch) -> Result<SourceText> {
        Ok(SourceText::new(changes.apply(&self.text)?))
    }

    /// Byte offset → UTF-16 code unit offset. Costs one line walk.
    pub fn to_utf16(&self, offset: usize) -> usize {
        let offset = offset.min(self.text.len());
        let line = self.line_index(offset);
        let start = self.line_starts[line];
        self.utf16_starts[line] + utf16_len_upto(&self.text[start..], offset - start)
    }

    /// UTF-16 code unit offset → byte offset (clamped to a char boundary).
    /// Costs one line walk.
    pub fn from_utf16(&self, offset: usize) -> usize {
        // utf16_starts[0] == 0, so the partition point is at least 1
        let line = self.utf16_starts.partition_point(|&units| units <= offset) - 1;
        let start = self.line_starts[line];
        let end = self.line_starts.get(line + 1).copied().unwrap_or(self.text.len());

        let mut units = self.utf16_starts[line];
        for (idx, c) in self.text[start..end].char_indices() {
            if units >= offset {
                return start + idx;
            }
            units += c.len_utf16();
        }
        end
    }

    fn line_index(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        }
    }

    fn check_offset(&self, offset: usize) -> Result<()> {
        if offset > self.text.len() || !self.text.is_char_boundary(offset) {
            return Err(EmojiError::OffsetOutOfRange {
                offset,
                len: self.text.len(),
            });
        }
        Ok(())
    }
}

impl TextDocument for SourceText {
    fn len(&self) -> usize {
        self.text.len()
    }

    fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    fn line(&self, n: usize) -> Result<Line<'_>> {
        let from = *self.line_starts.get(n).ok_or(EmojiError::LineOutOfRange {
            line: n,
            count: self.line_starts.len(),
        })?;
        let end = match self.line_starts.get(n + 1) {
            // Next line starts after the '\n'
            Some(next) => next - 1,
            None => self.text.len(),
        };
        let text = self.text[from..end].strip_suffix('\r').unwrap_or(&self.text[from..end]);
        Ok(Line { number: n, from, text })
    }

    fn line_at(&self, offset: usize) -> Result<Line<'_>> {
        self.check_offset(offset)?;
        self.line(self.line_index(offset))
    }

    fn slice(&self, from: usize, to: usize) -> Result<Cow<'_, str>> {
        self.check_offset(from)?;
        self.check_offset(to)?;
        if from > to {
            return Err(EmojiError::OffsetOutOfRange {
                offset: from,
                len: self.text.len(),
            });
        }
        Ok(Cow::Borrowed(&self.text[from..to]))
    }
}

fn compute_line_starts(text: &str) -> Vec<usize> {
    let mut starts = vec![0];
    starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
    starts
}

/// UTF-16 offset of every line start
fn compute_utf16_starts(text: &str, line_starts: &[usize]) -> Vec<usize> {
    let mut starts = Vec::with_capacity(line_starts.len());
    let mut units = 0;
    for (i, &from) in line_starts.iter().enumerate() {
        starts.push(units);
        let end = line_starts.get(i + 1).copied().unwrap_or(text.len());
        units += text[from..end].encode_utf16().count();
    }
    starts
}

fn utf16_len_upto(text: &str, byte_len: usize) -> usize {
    text.char_indices()
        .take_while(|(i, _)| *i < byte_len)
        .map(|(_, c)| c.len_utf16())
        .sum()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines() {
        let doc = SourceText::new("hello\nworld\n\nend");
        assert_eq!(doc.line_count(), 4);

        let l1 = doc.line(1).unwrap();
        assert_eq!(l1.text, "world");
        assert_eq!(l1.from, 6);
        assert_eq!(l1.to(), 11);

        assert_eq!(doc.line(2).unwrap().text, "");
        assert_eq!(doc.line(3).unwrap().text, "end");
        assert!(matches!(doc.line(4), Err(EmojiError::LineOutOfRange { line: 4, count: 4 })));
    }

    #[test]
    fn test_crlf_lines() {
        let doc = SourceText::new("a :x:\r\nb");
        assert_eq!(doc.line(0).unwrap().text, "a :x:");
        assert_eq!(doc.line(1).unwrap().from, 7);
    }

    #[test]
    fn test_line_at() {
        let doc = SourceText::new("ab\ncd");
        assert_eq!(doc.line_at(0).unwrap().number, 0);
        assert_eq!(doc.line_at(2).unwrap().number, 0);
        assert_eq!(doc.line_at(3).unwrap().number, 1);
        assert_eq!(doc.line_at(5).unwrap().number, 1);
        assert!(doc.line_at(6).is_err());
    }

    #[test]
    fn test_slice_bounds() {
        let doc = SourceText::new("hello");
        assert_eq!(doc.slice(1, 3).unwrap(), "el");
        assert!(doc.slice(3, 1).is_err());
        assert!(doc.slice(0, 9).is_err());
    }

    #[test]
    fn test_empty_document() {
        let doc = SourceText::new("");
        assert!(doc.is_empty());
        assert_eq!(doc.line_count(), 1);
        assert_eq!(doc.line(0).unwrap().text, "");
    }

    #[test]
    fn test_utf16_conversion() {
        // 'é' is 2 bytes / 1 unit, '🎉' is 4 bytes / 2 units
        let doc = SourceText::new("é🎉\n:wave:");
        let wave = doc.as_str().find(":wave:").unwrap();
        assert_eq!(wave, 8);
        assert_eq!(doc.to_utf16(wave), 4);
        assert_eq!(doc.from_utf16(4), wave);
        assert_eq!(doc.from_utf16(0), 0);
        assert_eq!(doc.to_utf16(doc.len()), 10);
        assert_eq!(doc.from_utf16(100), doc.len());
    }

    #[test]
    fn test_utf16_conversion_large_document() {
        let line = "ab é 🎉 :wave: 日本\r\n";
        let doc = SourceText::new(line.repeat(3000));

        // Reference offsets from one forward sweep
        let mut units = 0;
        for (idx, c) in doc.as_str().char_indices() {
            assert_eq!(doc.to_utf16(idx), units, "byte {}", idx);
            assert_eq!(doc.from_utf16(units), idx, "unit {}", units);
            units += c.len_utf16();
        }
        assert_eq!(doc.to_utf16(doc.len()), units);
        assert_eq!(doc.from_utf16(units), doc.len());
    }

    #[test]
    fn test_from_utf16_inside_surrogate_pair() {
        // Unit 1 falls between the two halves of '🎉'
        let doc = SourceText::new("🎉x\ny");
        assert_eq!(doc.from_utf16(1), 4);
        assert_eq!(doc.from_utf16(3), 5);
        assert_eq!(doc.from_utf16(4), 6);
        assert_eq!(doc.to_utf16(6), 4);
    }
}
