//! ProximityState - remembers the last visibility map
//!
//! Lets the coordinator skip rebuilding spans when a selection move changes
//! nothing on screen.

use serde::{Deserialize, Serialize};

use super::proximity::{EmojiKey, VisibilityMap};

/// One match whose visibility differs from the stored baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProximityChange {
    pub key: EmojiKey,
    pub was_visible: bool,
    pub is_visible: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ProximityState {
    last: VisibilityMap,
}

impl ProximityState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if any match appeared, disappeared or flipped
    pub fn has_changed(&self, current: &VisibilityMap) -> bool {
        current != &self.last
    }

    /// Replace the baseline
    pub fn update(&mut self, current: VisibilityMap) {
        self.last = current;
    }

    /// `has_changed`, storing `current` as the new baseline when it did
    pub fn should_rebuild(&mut self, current: &VisibilityMap) -> bool {
        let changed = self.has_changed(current);
        if changed {
            self.last = current.clone();
        }
        changed
    }

    /// Per-match differences. A removed match reports `is_visible: false`,
    /// a new one `was_visible: false`.
    pub fn changes(&self, current: &VisibilityMap) -> Vec<ProximityChange> {
        let mut out = Vec::new();
        for (key, &is_visible) in current {
            let was_visible = self.last.get(key).copied().unwrap_or(false);
            if was_visible != is_visible {
                out.push(ProximityChange { key: *key, was_visible, is_visible });
            }
        }
        for (key, &was_visible) in &self.last {
            if !current.contains_key(key) {
                out.push(ProximityChange { key: *key, was_visible, is_visible: false });
            }
        }
        out
    }

    pub fn last(&self) -> &VisibilityMap {
        &self.last
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }

    pub fn clear(&mut self) {
        self.last.clear();
    }
}

// ==================== TESTS ====================
