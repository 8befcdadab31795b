//! EmojiDecorator - turns visible matches into the span set a host renders
//!
//! # Pipeline
//! 1. `filter_visible`: keep matches the proximity check marked visible
//! 2. `validate_ranges`: drop spans outside the document
//! 3. `build`: sort by `from`, keep a span only if it starts at or after the
//!    end of the last kept one (first wins, nothing is merged or truncated)
//! 4. `create_atomic_ranges`: same spans, for cursor/deletion atomicity

use serde::{Deserialize, Serialize};

use super::proximity::VisibilityMap;
use crate::scanner::EmojiLocation;

// ==================== TYPE DEFINITIONS ====================

/// Renderable payload replacing a shortcode
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EmojiWidget {
    /// Literal text, shown on hover and restored if the image fails to load
    pub shortcode: String,
    pub image_path: String,
    pub label: String,
}

impl EmojiWidget {
    pub fn from_location(location: &EmojiLocation) -> Self {
        Self {
            shortcode: location.shortcode.clone(),
            image_path: location.image_path.clone(),
            label: location.label.clone(),
        }
    }

    /// Plain text to show when the image cannot be rendered
    pub fn fallback_text(&self) -> &str {
        &self.shortcode
    }
}

/// One `[from, to)` replacement
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RenderSpan {
    pub from: usize,
    pub to: usize,
    pub widget: EmojiWidget,
}

/// Sorted, non-overlapping spans
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderSpanSet {
    spans: Vec<RenderSpan>,
}

impl RenderSpanSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn spans(&self) -> &[RenderSpan] {
        &self.spans
    }

    pub fn iter(&self) -> impl Iterator<Item = &RenderSpan> {
        self.spans.iter()
    }

    /// Spans intersecting `[from, to)`
    pub fn between(&self, from: usize, to: usize) -> impl Iterator<Item = &RenderSpan> {
        self.spans.iter().filter(move |s| s.from < to && s.to > from)
    }

    /// True if a span covers `pos`
    pub fn has_span_at(&self, pos: usize) -> bool {
        self.between(pos, pos + 1).next().is_some()
    }
}

/// A span the host must treat as one unit for cursor motion and deletion
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct AtomicRange {
    pub from: usize,
    pub to: usize,
}

// ==================== MAIN IMPLEMENTATION ====================

#[derive(Debug, Clone, Copy, Default)]
pub struct EmojiDecorator;

impl EmojiDecorator {
    pub fn new() -> Self {
        Self
    }

    pub fn create_widget(&self, location: &EmojiLocation) -> EmojiWidget {
        EmojiWidget::from_location(location)
    }

    /// Matches whose visibility entry is `true`
    pub fn filter_visible<'a>(&self, matches: &'a [EmojiLocation], visibility: &VisibilityMap) -> Vec<&'a EmojiLocation> {
        matches
            .iter()
            .filter(|m| visibility.get(&m.key()).copied().unwrap_or(false))
            .collect()
    }

    /// Drop matches with invalid bounds
    pub fn validate_ranges<'a>(&self, matches: Vec<&'a EmojiLocation>, doc_len: usize) -> Vec<&'a EmojiLocation> {
        matches
            .into_iter()
            .filter(|m| m.from < m.to && m.to <= doc_len)
            .collect()
    }

    /// Sorted, first-wins span set
    pub fn build(&self, mut matches: Vec<&EmojiLocation>) -> RenderSpanSet {
        if matches.is_empty() {
            return RenderSpanSet::empty();
        }

        // Stable: equal starts keep scan order
        matches.sort_by_key(|m| m.from);

        let mut spans: Vec<RenderSpan> = Vec::with_capacity(matches.len());
        let mut last_end = 0;
        for m in matches {
            if m.from >= last_end {
                spans.push(RenderSpan {
                    from: m.from,
                    to: m.to,
                    widget: self.create_widget(m),
                });
                last_end = m.to;
            } else {
                tracing::debug!(from = m.from, to = m.to, "overlapping span dropped");
            }
        }

        RenderSpanSet { spans }
    }

    /// Atomic ranges for every span inside the document
    pub fn create_atomic_ranges(&self, set: &RenderSpanSet, doc_len: usize) -> Vec<AtomicRange> {
        set.between(0, doc_len)
            .map(|s| AtomicRange { from: s.from, to: s.to })
            .collect()
    }
}

// ==================== DECORATION CACHE ====================

/// The span set currently installed in a view
#[derive(Debug, Clone, Default)]
pub struct DecorationCache {
    current: RenderSpanSet,
}

impl DecorationCache {
    pub fn get(&self) -> &RenderSpanSet {
        &self.current
    }

    pub fn update(&mut self, set: RenderSpanSet) {
        self.current = set;
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    pub fn clear(&mut self) {
        self.current = RenderSpanSet::empty();
    }

    /// Number of spans within the document
    pub fn count(&self, doc_len: usize) -> usize {
        self.current.between(0, doc_len).count()
    }

    pub fn has_decoration_at(&self, pos: usize) -> bool {
        self.current.has_span_at(pos)
    }
}

// ==================== TESTS ====================
