//! ChangeAnalyzer: decides how much work an edit batch needs
//!
//! Most keystrokes never touch shortcode text, and for those the cached
//! matches only need their positions remapped. An edit forces a full rescan
//! when it deletes a colon, inserts text containing a colon or types a colon
//! that may close an open shortcode. Inserting a complete key (picker, paste)
//! is reported separately.
//!
//! Everything else gets a local check: the lines an edit touches are scanned
//! before and after, and any difference from the remapped old matches (a key
//! completed from the inside, a line un-indented) forces a rescan too.
//!
//! False positives (needless rescans) are fine. A missed completion is not.

use serde::{Deserialize, Serialize};

use super::changes::ChangeBatch;
use super::document::TextDocument;
use super::emoji::{scan_line, should_skip_line};
use crate::dictionary::ShortcodeDictionary;
use crate::error::Result;

// =============================================================================
// Types
// =============================================================================

/// How a document edit must be handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeKind {
    /// No shortcode text affected: remap cached positions
    PositionMapping,
    /// Shortcode text may have appeared or disappeared
    Rescan,
    /// A complete dictionary key was inserted
    ExplicitInsertion,
}

impl ChangeKind {
    pub fn requires_rescan(&self) -> bool {
        !matches!(self, ChangeKind::PositionMapping)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::PositionMapping => "position-mapping",
            ChangeKind::Rescan => "rescan",
            ChangeKind::ExplicitInsertion => "explicit-insertion",
        }
    }
}

/// Counters over the analyzer's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzerStats {
    pub analyzed: u64,
    pub remaps: u64,
    pub rescans: u64,
    pub insertions: u64,
}

// =============================================================================
// Free helpers
// =============================================================================

/// True if every edit only deletes and inserts whitespace
pub fn is_trivial_change<D: TextDocument + ?Sized>(changes: &ChangeBatch, start_doc: &D) -> Result<bool> {
    for (from, to, inserted) in changes.iter_changes() {
        let deleted = start_doc.slice(from, to)?;
        if !deleted.trim().is_empty() || !inserted.trim().is_empty() {
            return Ok(false);
        }
    }
    Ok(true)
}

fn floor_boundary(text: &str, mut idx: usize) -> usize {
    idx = idx.min(text.len());
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_boundary(text: &str, mut idx: usize) -> usize {
    idx = idx.min(text.len());
    while !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

/// `(from, to, shortcode)` of every match in `region`, scanned line by line
/// the way the document scanner does, relative to the region start
fn region_matches(region: &str, dictionary: &ShortcodeDictionary) -> Vec<(usize, usize, String)> {
    let mut found = Vec::new();
    let mut offset = 0;
    for raw in region.split('\n') {
        let text = raw.strip_suffix('\r').unwrap_or(raw);
        if !should_skip_line(text) {
            scan_line(text, offset, dictionary, &mut found);
        }
        offset += raw.len() + 1;
    }
    found.into_iter().map(|loc| (loc.from, loc.to, loc.shortcode)).collect()
}

/// True if `before` ends in `:token` with a non-empty, whitespace-free token
fn closes_open_shortcode(before: &str) -> bool {
    match before.rfind(':') {
        Some(idx) => {
            let between = &before[idx + 1..];
            !between.is_empty() && !between.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

// =============================================================================
// ChangeAnalyzer
// =============================================================================

/// Edit batch classifier
#[derive(Debug, Clone)]
pub struct ChangeAnalyzer {
    /// Bytes searched around an edit for shortcode context
    lookback: usize,
    stats: AnalyzerStats,
}

impl Default for ChangeAnalyzer {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_CLOSING_COLON_LOOKBACK)
    }
}

impl ChangeAnalyzer {
    pub fn new(lookback: usize) -> Self {
        Self {
            lookback,
            stats: AnalyzerStats::default(),
        }
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    pub fn set_lookback(&mut self, lookback: usize) {
        self.lookback = lookback;
    }

    pub fn stats(&self) -> AnalyzerStats {
        self.stats
    }

    /// Percentage of batches handled by remapping alone
    pub fn remap_rate(&self) -> f64 {
        if self.stats.analyzed == 0 {
            return 0.0;
        }
        (self.stats.remaps as f64 / self.stats.analyzed as f64) * 100.0
    }

    pub fn reset(&mut self) {
        self.stats = AnalyzerStats::default();
    }

    /// Classify a batch against the document it was applied to
    pub fn analyze<D: TextDocument + ?Sized>(
        &mut self,
        changes: &ChangeBatch,
        start_doc: &D,
        dictionary: &ShortcodeDictionary,
    ) -> Result<ChangeKind> {
        let mut kind = ChangeKind::PositionMapping;
        let mut previous_last_line: Option<usize> = None;

        for (from, to, inserted) in changes.iter_changes() {
            if dictionary.contains_any(inserted) {
                kind = ChangeKind::ExplicitInsertion;
                break;
            }
            if kind == ChangeKind::Rescan {
                continue;
            }

            let deleted = start_doc.slice(from, to)?;
            if deleted.contains(':') {
                kind = ChangeKind::Rescan;
            } else if inserted == ":" && deleted.is_empty() {
                if self.colon_closes_shortcode(start_doc, from)? {
                    kind = ChangeKind::Rescan;
                }
            } else if inserted.contains(':') {
                kind = ChangeKind::Rescan;
            }

            if kind == ChangeKind::PositionMapping && !dictionary.is_empty() {
                let first_line = start_doc.line_at(from)?.number;
                let last_line = start_doc.line_at(to)?.number;
                // Two edits on one line: the per-edit check below cannot see both
                let shares_line = previous_last_line.is_some_and(|last| last >= first_line);
                if shares_line || edited_lines_change_matches(start_doc, from, to, inserted, dictionary)? {
                    kind = ChangeKind::Rescan;
                }
                previous_last_line = Some(last_line);
            }
        }

        self.stats.analyzed += 1;
        match kind {
            ChangeKind::PositionMapping => self.stats.remaps += 1,
            ChangeKind::Rescan => self.stats.rescans += 1,
            ChangeKind::ExplicitInsertion => self.stats.insertions += 1,
        }
        tracing::debug!(kind = kind.as_str(), edits = changes.edits().len(), "change analyzed");

        Ok(kind)
    }

    fn window<'d, D: TextDocument + ?Sized>(
        &self,
        doc: &'d D,
        from: usize,
        to: usize,
    ) -> Result<(std::borrow::Cow<'d, str>, std::borrow::Cow<'d, str>)> {
        let line_start = doc.line_at(from)?.from;
        let line_end = doc.line_at(to)?.to();

        let before_start = from.saturating_sub(self.lookback).max(line_start);
        let after_end = (to + self.lookback).min(line_end);

        let line = doc.slice(line_start, line_end.max(to))?;
        let before_start = line_start + ceil_boundary(&line, before_start - line_start);
        let after_end = line_start + floor_boundary(&line, after_end.max(to) - line_start);

        Ok((doc.slice(before_start, from)?, doc.slice(to, after_end)?))
    }

    /// A typed `:` with `:token` right before it
    fn colon_closes_shortcode<D: TextDocument + ?Sized>(&self, doc: &D, at: usize) -> Result<bool> {
        let (before, after) = self.window(doc, at, at)?;
        // A colon typed in front of `token:` opens a shortcode just the same
        let opens = after
            .find(':')
            .map(|idx| idx > 0 && !after[..idx].chars().any(char::is_whitespace))
            .unwrap_or(false);
        Ok(closes_open_shortcode(&before) || opens)
    }
}

/// True if the lines touched by one edit hold different matches afterwards
/// than remapping their old matches predicts, e.g. typing `e` into `:wav:`
/// or removing the indentation in front of `:wave:`
fn edited_lines_change_matches<D: TextDocument + ?Sized>(
    doc: &D,
    from: usize,
    to: usize,
    inserted: &str,
    dictionary: &ShortcodeDictionary,
) -> Result<bool> {
    let first = doc.line_at(from)?;
    let last = doc.line_at(to)?;
    let old_region = doc.slice(first.from, last.to().max(to))?;

    let from_rel = from - first.from;
    let to_rel = to - first.from;
    let mut new_region = String::with_capacity(old_region.len() + inserted.len());
    new_region.push_str(&old_region[..from_rel]);
    new_region.push_str(inserted);
    new_region.push_str(&old_region[to_rel..]);

    let shift = inserted.len() as i64 - (to - from) as i64;
    let mut expected = Vec::new();
    for (start, end, shortcode) in region_matches(&old_region, dictionary) {
        if end <= from_rel {
            expected.push((start, end, shortcode));
        } else if start >= to_rel {
            let moved = |p: usize| (p as i64 + shift) as usize;
            expected.push((moved(start), moved(end), shortcode));
        } else {
            // Edited inside an existing match
            return Ok(true);
        }
    }

    Ok(region_matches(&new_region, dictionary) != expected)
}

// =============================================================================
// Tests
// =============================================================================
