//! JS bindings: `EmojiHub` (dictionary + map files) and `LiveView` (one
//! editing surface)
//!
//! Offsets crossing this boundary are UTF-16 code units, as in JS editors.
//! They are converted to byte offsets against the relevant document here and
//! nowhere else.

use std::cell::{RefCell, RefMut};
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;
use web_sys::console;

use super::conductor::UpdateOutcome;
use super::decorations::{AtomicRange, RenderSpan};
use super::proximity::Selection;
use super::surface::EditorSurface;
use crate::config::EmojiSettings;
use crate::dictionary::{build_map, load_dictionary, parse_map_file, to_map_file, DictionaryHub, ShortcodeDictionary};
use crate::reading;
use crate::scanner::{ChangeBatch, Edit, SourceText, TextDocument};

// ==================== HELPERS ====================

fn settings_from_js(value: JsValue) -> Result<EmojiSettings, JsValue> {
    if value.is_null() || value.is_undefined() {
        return Ok(EmojiSettings::default());
    }
    serde_wasm_bindgen::from_value(value).map_err(|e| JsValue::from_str(&format!("Failed to parse settings: {}", e)))
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn js_error(context: &str, e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("{}: {}", context, e))
}

fn report(outcome: UpdateOutcome) -> String {
    if outcome == UpdateOutcome::Cleared {
        console::warn_1(&JsValue::from_str("emojicore: live emoji update failed, showing plain text"));
    }
    outcome.as_str().to_string()
}

/// Selection as sent by the host, in UTF-16 units
#[derive(Deserialize)]
struct JsSelection {
    anchor: usize,
    head: usize,
}

impl JsSelection {
    fn to_bytes(&self, doc: &SourceText) -> Selection {
        Selection::new(doc.from_utf16(self.anchor), doc.from_utf16(self.head))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BuiltMap {
    map_file: String,
    added: usize,
    total: usize,
}

// ==================== EMOJI HUB ====================

/// Dictionary owner shared by every `LiveView`
#[wasm_bindgen]
pub struct EmojiHub {
    hub: Rc<DictionaryHub>,
    settings: EmojiSettings,
}

#[wasm_bindgen]
impl EmojiHub {
    #[wasm_bindgen(constructor)]
    pub fn new(settings: JsValue) -> Result<EmojiHub, JsValue> {
        Ok(EmojiHub {
            hub: DictionaryHub::new(),
            settings: settings_from_js(settings)?,
        })
    }

    #[wasm_bindgen(js_name = "setSettings")]
    pub fn js_set_settings(&mut self, settings: JsValue) -> Result<(), JsValue> {
        self.settings = settings_from_js(settings)?;
        Ok(())
    }

    /// Validate a map file against the image files present and publish it.
    /// Returns the rejected entries. A malformed file publishes an empty
    /// dictionary and is reported as an error.
    #[wasm_bindgen(js_name = "loadMap")]
    pub fn js_load_map(&mut self, json: &str, files: JsValue) -> Result<JsValue, JsValue> {
        let files: Vec<String> = serde_wasm_bindgen::from_value(files)
            .map_err(|e| js_error("Failed to parse file list", e))?;
        let available: HashSet<String> = files.into_iter().collect();
        let loaded = load_dictionary(json, &available, self.settings.preserve_invalid_entries);

        if !loaded.rejected.is_empty() {
            console::warn_1(&JsValue::from_str(&format!(
                "emojicore: skipped {} invalid emoji map entries",
                loaded.rejected.len()
            )));
        }

        let rejected = to_js(&loaded.rejected)?;
        self.hub.publish(loaded.dictionary);

        match loaded.load_error {
            Some(e) => {
                console::error_1(&JsValue::from_str(&format!("emojicore: {}", e)));
                Err(js_error("Failed to load emoji map", e))
            }
            None => Ok(rejected),
        }
    }

    /// Publish a dictionary without validating files
    #[wasm_bindgen(js_name = "setEntries")]
    pub fn js_set_entries(&mut self, entries: JsValue) -> Result<(), JsValue> {
        let entries: BTreeMap<String, String> = serde_wasm_bindgen::from_value(entries)
            .map_err(|e| js_error("Failed to parse entries", e))?;
        let dictionary = ShortcodeDictionary::new(entries).map_err(|e| js_error("Failed to build dictionary", e))?;
        self.hub.publish(dictionary);
        Ok(())
    }

    /// Add entries for new image files to `existing` (map file text, may be
    /// empty). Returns `{ mapFile, added, total }`.
    #[wasm_bindgen(js_name = "buildMap")]
    pub fn js_build_map(&self, existing: &str, files: JsValue) -> Result<JsValue, JsValue> {
        let files: Vec<String> = serde_wasm_bindgen::from_value(files)
            .map_err(|e| js_error("Failed to parse file list", e))?;
        let mut map = if existing.trim().is_empty() {
            BTreeMap::new()
        } else {
            parse_map_file(existing).map_err(|e| js_error("Failed to parse emoji map", e))?
        };

        let report = build_map(
            &mut map,
            &files,
            self.settings.filetype_preference,
            self.settings.preserve_invalid_entries,
        )
        .map_err(|e| js_error("Failed to build emoji map", e))?;

        let map_file = to_map_file(&map).map_err(|e| js_error("Failed to write emoji map", e))?;
        to_js(&BuiltMap {
            map_file,
            added: report.added,
            total: report.total,
        })
    }

    #[wasm_bindgen(js_name = "lookup")]
    pub fn js_lookup(&self, shortcode: &str) -> Option<String> {
        self.hub.current()?.lookup(shortcode).map(str::to_string)
    }

    /// Loaded shortcodes, in dictionary order
    #[wasm_bindgen(js_name = "shortcodes")]
    pub fn js_shortcodes(&self) -> js_sys::Array {
        let codes = js_sys::Array::new();
        if let Some(dictionary) = self.hub.current() {
            for code in dictionary.shortcodes() {
                codes.push(&JsValue::from_str(code));
            }
        }
        codes
    }

    /// Reading-mode segments for one text node
    #[wasm_bindgen(js_name = "segments")]
    pub fn js_segments(&self, text: &str) -> Result<JsValue, JsValue> {
        let segments = match self.hub.current() {
            Some(dictionary) => reading::segments(text, &dictionary),
            None => reading::segments(text, &ShortcodeDictionary::empty()),
        };
        to_js(&segments)
    }

    #[wasm_bindgen(js_name = "isLoaded")]
    pub fn js_is_loaded(&self) -> bool {
        self.hub.is_loaded()
    }

    #[wasm_bindgen(js_name = "subscriberCount")]
    pub fn js_subscriber_count(&self) -> usize {
        self.hub.subscriber_count()
    }

    #[wasm_bindgen(js_name = "stats")]
    pub fn js_stats(&self) -> Result<JsValue, JsValue> {
        let stats = match self.hub.current() {
            Some(dictionary) => dictionary.stats(),
            None => ShortcodeDictionary::empty().stats(),
        };
        to_js(&stats)
    }
}

// ==================== LIVE VIEW ====================

/// Live emoji rendering for one editor
#[wasm_bindgen]
pub struct LiveView {
    surface: Rc<RefCell<EditorSurface>>,
}

impl LiveView {
    fn surface_mut(&self) -> Result<RefMut<'_, EditorSurface>, JsValue> {
        self.surface
            .try_borrow_mut()
            .map_err(|_| JsValue::from_str("LiveView is busy"))
    }
}

#[wasm_bindgen]
impl LiveView {
    /// `markdown` enables the built-in markdown structure classifier
    #[wasm_bindgen(constructor)]
    pub fn new(text: &str, settings: JsValue, markdown: bool) -> Result<LiveView, JsValue> {
        let settings = settings_from_js(settings)?;
        let mut surface = EditorSurface::new(text, &settings);
        if markdown {
            surface = surface.with_markdown_structure();
        }
        Ok(LiveView {
            surface: surface.into_shared(),
        })
    }

    /// Subscribe to `hub`; renders right away if a dictionary is loaded
    #[wasm_bindgen(js_name = "attach")]
    pub fn js_attach(&self, hub: &EmojiHub) -> String {
        report(EditorSurface::attach(&self.surface, &hub.hub))
    }

    /// Apply `[{ from, to, insert }]` (start-document coordinates) and an
    /// optional new `{ anchor, head }` selection
    #[wasm_bindgen(js_name = "applyChanges")]
    pub fn js_apply_changes(&self, changes: JsValue, selection: JsValue) -> Result<String, JsValue> {
        let edits: Vec<Edit> = serde_wasm_bindgen::from_value(changes)
            .map_err(|e| js_error("Failed to parse changes", e))?;
        let selection: Option<JsSelection> = if selection.is_null() || selection.is_undefined() {
            None
        } else {
            Some(serde_wasm_bindgen::from_value(selection).map_err(|e| js_error("Failed to parse selection", e))?)
        };

        let mut surface = self.surface_mut()?;
        let batch = {
            let doc = surface.document();
            let edits = edits
                .into_iter()
                .map(|e| Edit::replace(doc.from_utf16(e.from), doc.from_utf16(e.to), e.insert))
                .collect();
            ChangeBatch::new(edits, doc.len()).map_err(|e| js_error("Invalid changes", e))?
        };

        let outcome = surface
            .apply_changes_with(&batch, |doc| selection.map(|s| s.to_bytes(doc)))
            .map_err(|e| js_error("Failed to apply changes", e))?;
        Ok(report(outcome))
    }

    #[wasm_bindgen(js_name = "setSelection")]
    pub fn js_set_selection(&self, anchor: usize, head: usize) -> Result<String, JsValue> {
        let mut surface = self.surface_mut()?;
        let selection = JsSelection { anchor, head }.to_bytes(surface.document());
        Ok(report(surface.set_selection(selection)))
    }

    #[wasm_bindgen(js_name = "setSettings")]
    pub fn js_set_settings(&self, settings: JsValue) -> Result<String, JsValue> {
        let settings = settings_from_js(settings)?;
        Ok(report(self.surface_mut()?.set_settings(&settings)))
    }

    /// Current spans: `[{ from, to, widget: { shortcode, imagePath, label } }]`
    #[wasm_bindgen(js_name = "decorations")]
    pub fn js_decorations(&self) -> Result<JsValue, JsValue> {
        let surface = self.surface.borrow();
        let doc = surface.document();
        let spans: Vec<RenderSpan> = surface
            .spans()
            .iter()
            .map(|s| RenderSpan {
                from: doc.to_utf16(s.from),
                to: doc.to_utf16(s.to),
                widget: s.widget.clone(),
            })
            .collect();
        to_js(&spans)
    }

    #[wasm_bindgen(js_name = "atomicRanges")]
    pub fn js_atomic_ranges(&self) -> Result<JsValue, JsValue> {
        let surface = self.surface.borrow();
        let doc = surface.document();
        let ranges: Vec<AtomicRange> = surface
            .atomic_ranges()
            .iter()
            .map(|r| AtomicRange {
                from: doc.to_utf16(r.from),
                to: doc.to_utf16(r.to),
            })
            .collect();
        to_js(&ranges)
    }

    #[wasm_bindgen(js_name = "text")]
    pub fn js_text(&self) -> String {
        self.surface.borrow().text().to_string()
    }

    #[wasm_bindgen(js_name = "stateName")]
    pub fn js_state_name(&self) -> String {
        self.surface.borrow().live().state_name().to_string()
    }

    #[wasm_bindgen(js_name = "stats")]
    pub fn js_stats(&self) -> Result<JsValue, JsValue> {
        to_js(&self.surface.borrow().live().stats())
    }

    /// Unsubscribe and drop all cached state
    #[wasm_bindgen(js_name = "destroy")]
    pub fn js_destroy(&self) -> Result<(), JsValue> {
        self.surface_mut()?.destroy();
        Ok(())
    }
}
