//! CursorProximity - which matches must show raw text near the cursor
//!
//! A match is hidden while the cursor (or either end of a selection) lies
//! within `[from - buffer, to + buffer]`, so the user can edit the literal
//! characters. Moving away collapses it back to its image.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::DEFAULT_HIDE_DISTANCE;
use crate::scanner::EmojiLocation;

/// Match identity: its `(from, to)` span
pub type EmojiKey = (usize, usize);

/// Match identity → shown as image
pub type VisibilityMap = BTreeMap<EmojiKey, bool>;

// =============================================================================
// Types
// =============================================================================

/// The main selection of an editor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    /// Collapsed selection at `pos`
    pub fn cursor(pos: usize) -> Self {
        Self { anchor: pos, head: pos }
    }

    pub fn from(&self) -> usize {
        self.anchor.min(self.head)
    }

    pub fn to(&self) -> usize {
        self.anchor.max(self.head)
    }

    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }
}

/// Span around the selection that forces nearby matches to raw text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProximityRange {
    pub from: usize,
    pub to: usize,
}

// =============================================================================
// CursorProximity
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorProximity {
    buffer: usize,
}

impl Default for CursorProximity {
    fn default() -> Self {
        Self::new(DEFAULT_HIDE_DISTANCE)
    }
}

impl CursorProximity {
    pub fn new(buffer: usize) -> Self {
        Self { buffer }
    }

    pub fn buffer(&self) -> usize {
        self.buffer
    }

    fn near(&self, pos: usize, from: usize, to: usize) -> bool {
        pos >= from.saturating_sub(self.buffer) && pos <= to + self.buffer
    }

    /// True if the match must be shown as raw text
    pub fn should_hide(&self, from: usize, to: usize, selection: &Selection) -> bool {
        if self.near(selection.head, from, to) {
            return true;
        }
        !selection.is_empty() && self.near(selection.anchor, from, to)
    }

    /// The span within which matches are hidden
    pub fn affected_range(&self, selection: &Selection) -> ProximityRange {
        ProximityRange {
            from: selection.from().saturating_sub(self.buffer),
            to: selection.to() + self.buffer,
        }
    }

    /// Visibility of every match in one pass
    pub fn check_all(&self, matches: &[EmojiLocation], selection: &Selection) -> VisibilityMap {
        matches
            .iter()
            .map(|m| (m.key(), !self.should_hide(m.from, m.to, selection)))
            .collect()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(from: usize, to: usize) -> EmojiLocation {
        EmojiLocation {
            from,
            to,
            shortcode: ":wave:".into(),
            image_path: "img/wave.png".into(),
            label: "wave".into(),
        }
    }

    // -------------------------------------------------------------------------
    // Requirement 1: Cursor buffer
    // -------------------------------------------------------------------------
    #[test]
    fn test_cursor_at_start_hides() {
        let p = CursorProximity::new(1);
        assert!(p.should_hide(6, 12, &Selection::cursor(6)));
        assert!(!p.should_hide(6, 12, &Selection::cursor(3)));
    }

    #[test]
    fn test_buffer_edges() {
        let p = CursorProximity::new(1);
        assert!(p.should_hide(6, 12, &Selection::cursor(5)));
        assert!(!p.should_hide(6, 12, &Selection::cursor(4)));
        assert!(p.should_hide(6, 12, &Selection::cursor(13)));
        assert!(!p.should_hide(6, 12, &Selection::cursor(14)));
    }

    #[test]
    fn test_match_at_document_start() {
        let p = CursorProximity::new(3);
        assert!(p.should_hide(0, 6, &Selection::cursor(0)));
    }

    // -------------------------------------------------------------------------
    // Requirement 2: Selections check both ends
    // -------------------------------------------------------------------------
    #[test]
    fn test_selection_ends() {
        let p = CursorProximity::default();
        assert!(p.should_hide(6, 12, &Selection::new(8, 30)));
        assert!(p.should_hide(6, 12, &Selection::new(30, 8)));
        assert!(!p.should_hide(6, 12, &Selection::new(20, 30)));
        // Spanning the match without an end near it
        assert!(!p.should_hide(6, 12, &Selection::new(0, 30)));
    }

    #[test]
    fn test_affected_range() {
        let p = CursorProximity::new(2);
        assert_eq!(p.affected_range(&Selection::cursor(1)), ProximityRange { from: 0, to: 3 });
        assert_eq!(p.affected_range(&Selection::new(20, 10)), ProximityRange { from: 8, to: 22 });
    }

    // -------------------------------------------------------------------------
    // Requirement 3: check_all round trip
    // -------------------------------------------------------------------------
    #[test]
    fn test_check_all_round_trip() {
        let p = CursorProximity::default();
        let matches = vec![loc(0, 6), loc(20, 26)];

        let before = p.check_all(&matches, &Selection::cursor(50));
        assert!(before.values().all(|v| *v));

        let near = p.check_all(&matches, &Selection::cursor(21));
        assert!(!near[&(20, 26)]);
        assert!(near[&(0, 6)]);

        let after = p.check_all(&matches, &Selection::cursor(50));
        assert_eq!(before, after);
    }
}
