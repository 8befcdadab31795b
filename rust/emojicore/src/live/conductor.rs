//! LiveDecorations: per-view coordinator for live emoji rendering
//!
//! # Design Principles
//! 1. State machine: Uninitialized → Synchronized → Destroyed
//! 2. Dictionary changes always rescan; edits rescan only when the change
//!    analyzer says shortcode text may be affected, otherwise cached
//!    positions are remapped
//! 3. Selection moves re-run proximity only, and skip the span rebuild when
//!    no match changed visibility
//! 4. Failures never reach the host: any error clears the span set
//!
//! # Usage
//! ```rust,ignore
//! let mut live = LiveDecorations::new(&EmojiSettings::default());
//! live.set_dictionary(dictionary, &state);  // full scan
//! live.update(&view_update);                // remap or rescan
//! let spans = live.spans();
//! ```

use serde::{Deserialize, Serialize};
use std::rc::Rc;

use super::decorations::{AtomicRange, DecorationCache, EmojiDecorator, RenderSpanSet};
use super::proximity::{CursorProximity, Selection, VisibilityMap};
use super::state::ProximityState;
use crate::config::EmojiSettings;
use crate::dictionary::{ShortcodeDictionary, Subscription};
use crate::error::Result;
use crate::scanner::{
    ChangeAnalyzer, ChangeBatch, ContextClassifier, EmojiLocation, EmojiScanner, StructureClassifier,
    TextDocument,
};

// =============================================================================
// Editor snapshots
// =============================================================================

/// What every transition reads: the current document, selection and
/// optional structural classifier
#[derive(Clone, Copy)]
pub struct EditorState<'a> {
    pub doc: &'a dyn TextDocument,
    pub selection: Selection,
    pub structure: Option<&'a dyn StructureClassifier>,
}

impl<'a> EditorState<'a> {
    pub fn new(doc: &'a dyn TextDocument, selection: Selection) -> Self {
        Self { doc, selection, structure: None }
    }

    pub fn with_structure(mut self, structure: &'a dyn StructureClassifier) -> Self {
        self.structure = Some(structure);
        self
    }
}

/// One editor update notification
#[derive(Clone, Copy)]
pub struct ViewUpdate<'a> {
    /// Document before `changes`
    pub start_doc: &'a dyn TextDocument,
    /// State after `changes`
    pub state: EditorState<'a>,
    pub changes: &'a ChangeBatch,
    pub selection_set: bool,
}

impl ViewUpdate<'_> {
    pub fn doc_changed(&self) -> bool {
        !self.changes.is_empty()
    }
}

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// No dictionary yet, no spans
    Uninitialized,
    /// Cache, visibility and spans match the document and selection
    Synchronized,
    /// Unsubscribed, all state dropped
    Destroyed,
}

/// What a transition did to the span set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpdateOutcome {
    /// New span set produced
    Rebuilt,
    /// Nothing visible changed; the host keeps its spans
    Unchanged,
    /// Spans emptied after a contained failure
    Cleared,
    /// Destroyed or not initialized
    Ignored,
}

impl UpdateOutcome {
    /// True if the host must reinstall spans
    pub fn spans_changed(&self) -> bool {
        matches!(self, UpdateOutcome::Rebuilt | UpdateOutcome::Cleared)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateOutcome::Rebuilt => "rebuilt",
            UpdateOutcome::Unchanged => "unchanged",
            UpdateOutcome::Cleared => "cleared",
            UpdateOutcome::Ignored => "ignored",
        }
    }
}

/// Counters over the coordinator's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStats {
    pub full_scans: u64,
    pub position_remaps: u64,
    pub proximity_checks: u64,
    pub skipped_rebuilds: u64,
    pub failures: u64,
}

// =============================================================================
// LiveDecorations
// =============================================================================

/// Live decoration coordinator for one editing surface
pub struct LiveDecorations {
    state: State,
    dictionary: Option<Rc<ShortcodeDictionary>>,
    scanner: EmojiScanner,
    analyzer: ChangeAnalyzer,
    classifier: ContextClassifier,
    proximity: CursorProximity,
    decorator: EmojiDecorator,
    visibility: ProximityState,
    cache: DecorationCache,
    /// Cached matches that passed the context filter
    allowed: Vec<EmojiLocation>,
    atomic: Vec<AtomicRange>,
    /// Set after a contained failure: the next transition rescans
    stale: bool,
    subscription: Option<Subscription>,
    stats: LiveStats,
}

impl Default for LiveDecorations {
    fn default() -> Self {
        Self::new(&EmojiSettings::default())
    }
}

impl LiveDecorations {
    pub fn new(settings: &EmojiSettings) -> Self {
        Self {
            state: State::Uninitialized,
            dictionary: None,
            scanner: EmojiScanner::new(),
            analyzer: ChangeAnalyzer::new(settings.closing_colon_lookback),
            classifier: ContextClassifier::new(settings),
            proximity: CursorProximity::new(settings.hide_distance),
            decorator: EmojiDecorator::new(),
            visibility: ProximityState::new(),
            cache: DecorationCache::default(),
            allowed: Vec::new(),
            atomic: Vec::new(),
            stale: false,
            subscription: None,
            stats: LiveStats::default(),
        }
    }

    /// Keep the dictionary subscription alive until `destroy`
    pub fn attach_subscription(&mut self, subscription: Subscription) {
        if self.state == State::Destroyed {
            // Dropping the guard unsubscribes right away
            return;
        }
        self.subscription = Some(subscription);
    }

    pub fn is_ready(&self) -> bool {
        self.state == State::Synchronized
    }

    pub fn is_destroyed(&self) -> bool {
        self.state == State::Destroyed
    }

    /// Current state name (for debugging)
    pub fn state_name(&self) -> &'static str {
        match self.state {
            State::Uninitialized => "uninitialized",
            State::Synchronized => "synchronized",
            State::Destroyed => "destroyed",
        }
    }

    pub fn spans(&self) -> &RenderSpanSet {
        self.cache.get()
    }

    pub fn atomic_ranges(&self) -> &[AtomicRange] {
        &self.atomic
    }

    /// Every cached match, before context and proximity filtering
    pub fn cached_matches(&self) -> &[EmojiLocation] {
        self.scanner.cached()
    }

    /// Cached matches the context filter allows
    pub fn allowed_matches(&self) -> &[EmojiLocation] {
        &self.allowed
    }

    pub fn visibility(&self) -> &VisibilityMap {
        self.visibility.last()
    }

    pub fn stats(&self) -> LiveStats {
        self.stats
    }

    // -------------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------------

    /// Dictionary loaded or replaced: always a full rebuild
    pub fn set_dictionary(&mut self, dictionary: Rc<ShortcodeDictionary>, editor: &EditorState<'_>) -> UpdateOutcome {
        if self.state == State::Destroyed {
            tracing::debug!("dictionary update after destroy ignored");
            return UpdateOutcome::Ignored;
        }
        self.dictionary = Some(dictionary);
        self.state = State::Synchronized;
        let result = self.full_rebuild(editor);
        self.contain(result)
    }

    /// Settings changed: reconfigure and rebuild
    pub fn set_settings(&mut self, settings: &EmojiSettings, editor: &EditorState<'_>) -> UpdateOutcome {
        if self.state == State::Destroyed {
            return UpdateOutcome::Ignored;
        }
        self.analyzer.set_lookback(settings.closing_colon_lookback);
        self.classifier = ContextClassifier::new(settings);
        self.proximity = CursorProximity::new(settings.hide_distance);

        if self.state != State::Synchronized {
            return UpdateOutcome::Ignored;
        }
        let result = self.full_rebuild(editor);
        self.contain(result)
    }

    /// Document and/or selection update from the host
    pub fn update(&mut self, update: &ViewUpdate<'_>) -> UpdateOutcome {
        if self.state != State::Synchronized {
            return UpdateOutcome::Ignored;
        }

        let result = if self.stale && (update.doc_changed() || update.selection_set) {
            self.full_rebuild(&update.state)
        } else if update.doc_changed() {
            self.on_doc_changed(update)
        } else if update.selection_set {
            self.on_selection_changed(&update.state)
        } else {
            Ok(UpdateOutcome::Unchanged)
        };

        self.contain(result)
    }

    /// Unsubscribe and drop all cached state. Later calls are no-ops.
    pub fn destroy(&mut self) {
        if self.state == State::Destroyed {
            return;
        }
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
        }
        self.state = State::Destroyed;
        self.dictionary = None;
        self.scanner.clear();
        self.visibility.clear();
        self.cache.clear();
        self.allowed.clear();
        self.atomic.clear();
        tracing::debug!("live decorations destroyed");
    }

    // -------------------------------------------------------------------------
    // Transition bodies
    // -------------------------------------------------------------------------

    fn on_doc_changed(&mut self, update: &ViewUpdate<'_>) -> Result<UpdateOutcome> {
        let Some(dictionary) = self.dictionary.clone() else {
            return Ok(UpdateOutcome::Ignored);
        };

        let kind = self.analyzer.analyze(update.changes, update.start_doc, &dictionary)?;
        if kind.requires_rescan() {
            tracing::debug!(kind = kind.as_str(), "full rescan");
            return self.full_rebuild(&update.state);
        }

        let moved = self.scanner.update_cached_positions(update.changes);
        self.stats.position_remaps += 1;

        if !self.scanner.validate_cached_positions(update.state.doc) {
            tracing::debug!("cached positions invalid after remap, rescanning");
            return self.full_rebuild(&update.state);
        }

        tracing::debug!(moved, "position remap only");
        if moved {
            self.visibility.clear();
        }
        self.refresh(&update.state, moved)
    }

    fn on_selection_changed(&mut self, editor: &EditorState<'_>) -> Result<UpdateOutcome> {
        let map = self.proximity.check_all(&self.allowed, &editor.selection);
        self.stats.proximity_checks += 1;

        if !self.visibility.should_rebuild(&map) {
            tracing::debug!("visibility unchanged, rebuild skipped");
            self.stats.skipped_rebuilds += 1;
            return Ok(UpdateOutcome::Unchanged);
        }

        self.rebuild_spans(&map, editor.doc.len());
        Ok(UpdateOutcome::Rebuilt)
    }

    fn full_rebuild(&mut self, editor: &EditorState<'_>) -> Result<UpdateOutcome> {
        let Some(dictionary) = self.dictionary.clone() else {
            return Ok(UpdateOutcome::Ignored);
        };

        self.scanner.scan_document(editor.doc, &dictionary)?;
        self.stats.full_scans += 1;
        self.stale = false;
        self.visibility.clear();
        self.refresh(editor, true)
    }

    /// Context filter, proximity, spans. Skips the span rebuild when nothing
    /// visible changed unless `force`.
    fn refresh(&mut self, editor: &EditorState<'_>, force: bool) -> Result<UpdateOutcome> {
        self.allowed = self.filter_context(editor)?;

        let map = self.proximity.check_all(&self.allowed, &editor.selection);
        self.stats.proximity_checks += 1;

        let changed = self.visibility.should_rebuild(&map);
        if !changed && !force {
            self.stats.skipped_rebuilds += 1;
            return Ok(UpdateOutcome::Unchanged);
        }

        self.rebuild_spans(&map, editor.doc.len());
        Ok(UpdateOutcome::Rebuilt)
    }

    fn filter_context(&self, editor: &EditorState<'_>) -> Result<Vec<EmojiLocation>> {
        let mut allowed = Vec::with_capacity(self.scanner.cached().len());
        for location in self.scanner.cached() {
            let line = editor.doc.line_at(location.from)?;
            let permitted = self.classifier.allows_rendering(
                location.from,
                line.text,
                location.from - line.from,
                editor.doc,
                editor.structure,
            );
            if permitted {
                allowed.push(location.clone());
            }
        }
        Ok(allowed)
    }

    fn rebuild_spans(&mut self, map: &VisibilityMap, doc_len: usize) {
        let visible = self.decorator.filter_visible(&self.allowed, map);
        let valid = self.decorator.validate_ranges(visible, doc_len);
        let set = self.decorator.build(valid);
        self.atomic = self.decorator.create_atomic_ranges(&set, doc_len);
        tracing::debug!(spans = set.len(), "spans rebuilt");
        self.cache.update(set);
    }

    /// Turn a failed transition into an empty span set
    fn contain(&mut self, result: Result<UpdateOutcome>) -> UpdateOutcome {
        match result {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(error = %e, "live emoji update failed, rendering plain text");
                self.stats.failures += 1;
                self.stale = true;
                self.scanner.clear();
                self.visibility.clear();
                self.cache.clear();
                self.allowed.clear();
                self.atomic.clear();
                UpdateOutcome::Cleared
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
