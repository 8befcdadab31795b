//! EmojiScanner - locates dictionary shortcodes in a document
//!
//! # Operations
//! - `scan_document`: full line-by-line scan, replaces the cache
//! - `update_cached_positions`: remap cached spans through an edit batch
//! - `validate_cached_positions`: cheap corruption check before the cache is reused
//!
//! Lines that are blank, open/close a fence or are indented code are skipped
//! up front. That is only a pre-filter; the context classifier makes the
//! real decision per match.

use serde::{Deserialize, Serialize};

use super::changes::{Bias, ChangeBatch};
use super::document::TextDocument;
use crate::dictionary::{shortcode_label, ShortcodeDictionary};
use crate::error::Result;

const ESCAPE: u8 = b'\\';

// ==================== TYPE DEFINITIONS ====================

/// A dictionary hit in a document
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct EmojiLocation {
    /// Inclusive start offset
    pub from: usize,
    /// Exclusive end offset
    pub to: usize,
    pub shortcode: String,
    pub image_path: String,
    /// Accessibility text, e.g. `wave hello` for `:wave_hello:`
    pub label: String,
}

impl EmojiLocation {
    /// Identity used by visibility tracking
    pub fn key(&self) -> (usize, usize) {
        (self.from, self.to)
    }

    pub fn len(&self) -> usize {
        self.to.saturating_sub(self.from)
    }

    pub fn is_empty(&self) -> bool {
        self.to <= self.from
    }
}

/// Statistics for the last scan
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScanStats {
    pub lines_scanned: usize,
    pub lines_skipped: usize,
    pub matches: usize,
    pub escaped: usize,
    pub timing_us: u64,
}

// ==================== HELPERS ====================

/// Pre-filter: blank lines, fence delimiters and indented code
pub fn should_skip_line(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.is_empty()
        || trimmed.starts_with("```")
        || trimmed.starts_with("~~~")
        || text.starts_with("    ")
        || text.starts_with('\t')
}

/// True if the match at `start` is preceded by a backslash
pub fn is_escaped(text: &str, start: usize) -> bool {
    start > 0 && text.as_bytes().get(start - 1) == Some(&ESCAPE)
}

// ==================== MAIN IMPLEMENTATION ====================

/// Document scanner with a cache of the last scan
#[derive(Debug, Default)]
pub struct EmojiScanner {
    cache: Vec<EmojiLocation>,
    last_stats: ScanStats,
}

impl EmojiScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan every line of `doc`. The result becomes the cache.
    pub fn scan_document<D: TextDocument + ?Sized>(
        &mut self,
        doc: &D,
        dictionary: &ShortcodeDictionary,
    ) -> Result<&[EmojiLocation]> {
        let start = instant::Instant::now();
        let mut stats = ScanStats::default();
        let mut found = Vec::new();

        if !dictionary.is_empty() {
            for n in 0..doc.line_count() {
                let line = doc.line(n)?;
                if should_skip_line(line.text) {
                    stats.lines_skipped += 1;
                    continue;
                }
                stats.lines_scanned += 1;
                stats.escaped += scan_line(line.text, line.from, dictionary, &mut found);
            }
        }

        stats.matches = found.len();
        stats.timing_us = start.elapsed().as_micros() as u64;
        tracing::debug!(
            matches = stats.matches,
            lines = stats.lines_scanned,
            skipped = stats.lines_skipped,
            "document scanned"
        );

        self.cache = found;
        self.last_stats = stats;
        Ok(&self.cache)
    }

    /// Remap every cached span through `changes`.
    ///
    /// `from` maps with `Bias::Before`, `to` with `Bias::After`. A span that
    /// collapses or runs past the new document end is dropped. Returns true
    /// if any span moved or was dropped.
    pub fn update_cached_positions(&mut self, changes: &ChangeBatch) -> bool {
        if changes.is_empty() {
            return false;
        }

        let new_len = changes.new_len();
        let mut changed = false;

        self.cache.retain_mut(|loc| {
            let from = changes.map_pos(loc.from, Bias::Before);
            let to = changes.map_pos(loc.to, Bias::After);

            if to <= from || to > new_len {
                changed = true;
                return false;
            }
            if from != loc.from || to != loc.to {
                loc.from = from;
                loc.to = to;
                changed = true;
            }
            true
        });

        changed
    }

    /// False if any cached span lies outside the document or no longer holds
    /// its shortcode. The cache must then be rebuilt.
    pub fn validate_cached_positions<D: TextDocument + ?Sized>(&self, doc: &D) -> bool {
        let len = doc.len();
        self.cache.iter().all(|loc| {
            loc.from < loc.to
                && loc.to <= len
                && loc.len() == loc.shortcode.len()
                && matches!(doc.slice(loc.from, loc.to), Ok(text) if text == loc.shortcode)
        })
    }

    pub fn cached(&self) -> &[EmojiLocation] {
        &self.cache
    }

    pub fn last_stats(&self) -> &ScanStats {
        &self.last_stats
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

/// Scan one line, pushing document-absolute locations. Returns the number of
/// escaped matches skipped.
pub fn scan_line(
    text: &str,
    line_from: usize,
    dictionary: &ShortcodeDictionary,
    out: &mut Vec<EmojiLocation>,
) -> usize {
    let mut escaped = 0;
    for m in dictionary.find_iter(text) {
        if m.end <= m.start {
            continue;
        }
        if is_escaped(text, m.start) {
            escaped += 1;
            continue;
        }
        out.push(EmojiLocation {
            from: line_from + m.start,
            to: line_from + m.end,
            shortcode: m.shortcode.to_string(),
            image_path: m.image_path.to_string(),
            label: shortcode_label(m.shortcode),
        });
    }
    escaped
}

// ==================== TESTS ====================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::changes::Edit;
    use crate::scanner::document::SourceText;

    fn wave_dict() -> ShortcodeDictionary {
        ShortcodeDictionary::new([(":wave:", "img/wave.png")]).unwrap()
    }

    fn scan(text: &str, dict: &ShortcodeDictionary) -> Vec<EmojiLocation> {
        let mut scanner = EmojiScanner::new();
        scanner.scan_document(&SourceText::new(text), dict).unwrap().to_vec()
    }

    // -------------------------------------------------------------------------
    // Requirement 1: Located matches with labels
    // -------------------------------------------------------------------------
    #[test]
    fn test_single_match() {
        let found = scan("hello :wave: there", &wave_dict());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].from, 6);
        assert_eq!(found[0].to, 12);
        assert_eq!(found[0].shortcode, ":wave:");
        assert_eq!(found[0].image_path, "img/wave.png");
        assert_eq!(found[0].label, "wave");
    }

    #[test]
    fn test_offsets_are_document_absolute() {
        let text = "first line\nsecond :wave:";
        let found = scan(text, &wave_dict());
        assert_eq!(found.len(), 1);
        assert_eq!(&text[found[0].from..found[0].to], ":wave:");
    }

    #[test]
    fn test_unknown_shortcode_ignored() {
        assert!(scan(":nope: :wav:", &wave_dict()).is_empty());
    }

    #[test]
    fn test_empty_dictionary() {
        assert!(scan("hello :wave:", &ShortcodeDictionary::empty()).is_empty());
    }

    // -------------------------------------------------------------------------
    // Requirement 2: Skip rules
    // -------------------------------------------------------------------------
    #[test]
    fn test_escaped_match_skipped() {
        let mut scanner = EmojiScanner::new();
        let doc = SourceText::new(r"\:wave: and :wave:");
        let found = scanner.scan_document(&doc, &wave_dict()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].from, 12);
        assert_eq!(scanner.last_stats().escaped, 1);
    }

    #[test]
    fn test_skipped_lines() {
        let text = "```\n:wave:\n```\n    :wave:\n\t:wave:\n   \n~~~ :wave:\nok :wave:";
        let found = scan(text, &wave_dict());
        // Only the fence content line and the last line reach the matcher
        assert_eq!(found.len(), 2);
        assert_eq!(found[1].from, text.rfind(":wave:").unwrap());
    }

    // -------------------------------------------------------------------------
    // Requirement 3: Overlap precedence
    // -------------------------------------------------------------------------
    #[test]
    fn test_longest_key_at_same_start() {
        let dict = ShortcodeDictionary::new([(":a:", "a.png"), (":ab:", "ab.png")]).unwrap();
        let found = scan(":ab:", &dict);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].shortcode, ":ab:");
        assert_eq!((found[0].from, found[0].to), (0, 4));
    }

    #[test]
    fn test_scan_is_idempotent() {
        let dict = wave_dict();
        let doc = SourceText::new(":wave: a :wave:\n:wave:");
        let mut scanner = EmojiScanner::new();
        let first = scanner.scan_document(&doc, &dict).unwrap().to_vec();
        let second = scanner.scan_document(&doc, &dict).unwrap().to_vec();
        assert_eq!(first, second);
    }

    // -------------------------------------------------------------------------
    // Requirement 4: Incremental remapping
    // -------------------------------------------------------------------------
    #[test]
    fn test_insert_before_shifts() {
        let doc = SourceText::new("hello :wave: there");
        let mut scanner = EmojiScanner::new();
        scanner.scan_document(&doc, &wave_dict()).unwrap();

        let batch = ChangeBatch::new(vec![Edit::insert(0, "abc")], doc.len()).unwrap();
        assert!(scanner.update_cached_positions(&batch));
        assert_eq!(scanner.cached()[0].key(), (9, 15));

        let new_doc = doc.apply(&batch).unwrap();
        assert!(scanner.validate_cached_positions(&new_doc));
    }

    #[test]
    fn test_edit_after_is_unchanged() {
        let doc = SourceText::new("hello :wave: there");
        let mut scanner = EmojiScanner::new();
        scanner.scan_document(&doc, &wave_dict()).unwrap();

        let batch = ChangeBatch::new(vec![Edit::delete(13, 18)], doc.len()).unwrap();
        assert!(!scanner.update_cached_positions(&batch));
        assert_eq!(scanner.cached()[0].key(), (6, 12));
    }

    #[test]
    fn test_insert_inside_fails_validation() {
        let doc = SourceText::new("hello :wave: there");
        let mut scanner = EmojiScanner::new();
        scanner.scan_document(&doc, &wave_dict()).unwrap();

        let batch = ChangeBatch::new(vec![Edit::insert(8, "xx")], doc.len()).unwrap();
        assert!(scanner.update_cached_positions(&batch));
        let new_doc = doc.apply(&batch).unwrap();
        assert!(!scanner.validate_cached_positions(&new_doc));
    }

    #[test]
    fn test_same_length_replacement_fails_validation() {
        let doc = SourceText::new("hello :wave: there");
        let mut scanner = EmojiScanner::new();
        scanner.scan_document(&doc, &wave_dict()).unwrap();

        let batch = ChangeBatch::new(vec![Edit::replace(8, 9, "b")], doc.len()).unwrap();
        scanner.update_cached_positions(&batch);
        let new_doc = doc.apply(&batch).unwrap();
        assert_eq!(new_doc.as_str(), "hello :wbve: there");
        assert!(!scanner.validate_cached_positions(&new_doc));
    }

    #[test]
    fn test_deleted_span_dropped() {
        let doc = SourceText::new("hello :wave: there");
        let mut scanner = EmojiScanner::new();
        scanner.scan_document(&doc, &wave_dict()).unwrap();

        let batch = ChangeBatch::new(vec![Edit::delete(5, 13)], doc.len()).unwrap();
        assert!(scanner.update_cached_positions(&batch));
        assert!(scanner.cached().is_empty());
    }

    #[test]
    fn test_empty_batch_reports_no_change() {
        let mut scanner = EmojiScanner::new();
        scanner.scan_document(&SourceText::new(":wave:"), &wave_dict()).unwrap();
        assert!(!scanner.update_cached_positions(&ChangeBatch::empty(6)));
    }
}
