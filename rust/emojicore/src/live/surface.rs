//! EditorSurface - reference editing surface for the live engine
//!
//! Owns the document text, the selection, the optional markdown region table
//! and one [`LiveDecorations`]. A surface subscribes to a [`DictionaryHub`]
//! through a weak reference, so dropping the surface ends the subscription
//! and a late notification finds nothing to update.

use std::cell::RefCell;
use std::rc::Rc;

use super::conductor::{EditorState, LiveDecorations, UpdateOutcome, ViewUpdate};
use super::decorations::{AtomicRange, RenderSpanSet};
use super::proximity::Selection;
use crate::config::EmojiSettings;
use crate::dictionary::{DictionaryHub, ShortcodeDictionary};
use crate::error::Result;
use crate::scanner::{Bias, ChangeBatch, Edit, MarkdownStructure, SourceText, TextDocument};

fn editor_state<'a>(
    doc: &'a SourceText,
    selection: Selection,
    structure: &'a Option<MarkdownStructure>,
) -> EditorState<'a> {
    let state = EditorState::new(doc, selection);
    match structure {
        Some(structure) => state.with_structure(structure),
        None => state,
    }
}

fn analyze_structure(doc: &SourceText) -> Option<MarkdownStructure> {
    match MarkdownStructure::analyze(doc.as_str()) {
        Ok(structure) => Some(structure),
        Err(e) => {
            tracing::warn!(error = %e, "markdown analysis failed, using textual fallback");
            None
        }
    }
}

/// One open editor
pub struct EditorSurface {
    doc: SourceText,
    selection: Selection,
    markdown: bool,
    structure: Option<MarkdownStructure>,
    live: LiveDecorations,
}

impl EditorSurface {
    pub fn new(text: impl Into<String>, settings: &EmojiSettings) -> Self {
        Self {
            doc: SourceText::new(text),
            selection: Selection::default(),
            markdown: false,
            structure: None,
            live: LiveDecorations::new(settings),
        }
    }

    /// Classify contexts with [`MarkdownStructure`], rebuilt after every edit
    pub fn with_markdown_structure(mut self) -> Self {
        self.markdown = true;
        self.structure = analyze_structure(&self.doc);
        self
    }

    pub fn into_shared(self) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(self))
    }

    /// Subscribe `surface` to `hub` and render with the hub's current
    /// dictionary, if one is loaded
    pub fn attach(surface: &Rc<RefCell<Self>>, hub: &Rc<DictionaryHub>) -> UpdateOutcome {
        let weak = Rc::downgrade(surface);
        let subscription = hub.subscribe(move |dictionary| {
            let Some(surface) = weak.upgrade() else {
                return;
            };
            match surface.try_borrow_mut() {
                Ok(mut surface) => {
                    surface.set_dictionary(dictionary.clone());
                }
                Err(_) => tracing::warn!("surface busy, dictionary update dropped"),
            };
        });

        let mut this = surface.borrow_mut();
        this.live.attach_subscription(subscription);
        match hub.current() {
            Some(dictionary) => this.set_dictionary(dictionary),
            None => UpdateOutcome::Ignored,
        }
    }

    pub fn set_dictionary(&mut self, dictionary: Rc<ShortcodeDictionary>) -> UpdateOutcome {
        let state = editor_state(&self.doc, self.selection, &self.structure);
        self.live.set_dictionary(dictionary, &state)
    }

    pub fn set_settings(&mut self, settings: &EmojiSettings) -> UpdateOutcome {
        let state = editor_state(&self.doc, self.selection, &self.structure);
        self.live.set_settings(settings, &state)
    }

    /// Apply an edit batch. Without an explicit selection the current one is
    /// mapped through the edits.
    pub fn apply_changes(&mut self, changes: &ChangeBatch, selection: Option<Selection>) -> Result<UpdateOutcome> {
        self.apply_changes_with(changes, |_| selection)
    }

    /// `apply_changes` with the selection resolved against the new document
    pub fn apply_changes_with<F>(&mut self, changes: &ChangeBatch, selection: F) -> Result<UpdateOutcome>
    where
        F: FnOnce(&SourceText) -> Option<Selection>,
    {
        let next = self.doc.apply(changes)?;
        let start_doc = std::mem::replace(&mut self.doc, next);

        if self.markdown && !changes.is_empty() {
            self.structure = analyze_structure(&self.doc);
        }

        let previous = self.selection;
        self.selection = match selection(&self.doc) {
            Some(selection) => self.clamp(selection),
            None => Selection::new(
                changes.map_pos(previous.anchor, Bias::After),
                changes.map_pos(previous.head, Bias::After),
            ),
        };

        let update = ViewUpdate {
            start_doc: &start_doc,
            state: editor_state(&self.doc, self.selection, &self.structure),
            changes,
            selection_set: self.selection != previous,
        };
        Ok(self.live.update(&update))
    }

    /// `apply_changes` for edits against the current document
    pub fn apply_edits(&mut self, edits: Vec<Edit>, selection: Option<Selection>) -> Result<UpdateOutcome> {
        let batch = ChangeBatch::new(edits, self.doc.len())?;
        self.apply_changes(&batch, selection)
    }

    pub fn set_selection(&mut self, selection: Selection) -> UpdateOutcome {
        self.selection = self.clamp(selection);
        let unchanged = ChangeBatch::empty(self.doc.len());
        let update = ViewUpdate {
            start_doc: &self.doc,
            state: editor_state(&self.doc, self.selection, &self.structure),
            changes: &unchanged,
            selection_set: true,
        };
        self.live.update(&update)
    }

    /// Unsubscribe and drop cached state
    pub fn destroy(&mut self) {
        self.live.destroy();
        self.structure = None;
    }

    fn clamp(&self, selection: Selection) -> Selection {
        let len = self.doc.len();
        Selection::new(selection.anchor.min(len), selection.head.min(len))
    }

    pub fn text(&self) -> &str {
        self.doc.as_str()
    }

    pub fn document(&self) -> &SourceText {
        &self.doc
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn spans(&self) -> &RenderSpanSet {
        self.live.spans()
    }

    pub fn atomic_ranges(&self) -> &[AtomicRange] {
        self.live.atomic_ranges()
    }

    pub fn live(&self) -> &LiveDecorations {
        &self.live
    }
}

// ==================== TESTS ====================
