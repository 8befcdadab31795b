//! EmojiCore: Shortcode Scanner + Live Emoji Decoration Engine
//!
//! A Rust/WASM implementation of custom-emoji live preview for markdown
//! editors: `:shortcode:` text renders as an image everywhere except next to
//! the cursor and inside contexts the user excluded.
//!
//! # Architecture
//!
//! ## Dictionary
//! - `dictionary/mod.rs` - ShortcodeDictionary: shortcode → image, one Aho-Corasick matcher
//! - `dictionary/hub.rs` - DictionaryHub: current dictionary + update subscribers
//! - `dictionary/map_file.rs` - Map file parsing, validation and generation
//!
//! ## Scanner Components
//! - `document.rs` - TextDocument / SourceText: lines, slices, UTF-16 offsets
//! - `changes.rs` - ChangeBatch: edit batches and position mapping
//! - `emoji.rs` - EmojiScanner: full scan + cached position remapping
//! - `change.rs` - ChangeAnalyzer: remap vs rescan decision per edit batch
//! - `syntax.rs` - ContextClassifier: code/link/frontmatter/comment filtering
//! - `markdown.rs` - MarkdownStructure: built-in region classifier
//!
//! ## Live Engine
//! - `proximity.rs` - CursorProximity: raw text near the cursor
//! - `state.rs` - ProximityState: skip rebuilds when visibility is unchanged
//! - `decorations.rs` - EmojiDecorator: sorted, non-overlapping render spans
//! - `conductor.rs` - LiveDecorations: per-view state machine
//! - `surface.rs` - EditorSurface: one editor wired to a hub
//!
//! ## Reading Mode
//! - `reading.rs` - Segment: text/emoji split for rendered notes
//!
//! # Usage (WASM)
//! ```javascript,ignore
//! import init, { EmojiHub, LiveView } from 'emojicore';
//!
//! await init();
//!
//! const hub = new EmojiHub(settings);
//! hub.loadMap(mapFileText, imagePaths);   // returns rejected entries
//!
//! // One LiveView per editor, offsets in UTF-16 units
//! const view = new LiveView(editor.state.doc.toString(), settings, true);
//! view.attach(hub);
//!
//! // On every editor update
//! view.applyChanges([{ from: 5, to: 5, insert: ':' }], { anchor: 6, head: 6 });
//! view.setSelection(0, 0);
//! console.log(view.decorations());  // [{ from, to, widget: { shortcode, imagePath, label } }]
//! console.log(view.atomicRanges());
//!
//! view.destroy();
//! ```

pub mod config;
pub mod error;
pub mod dictionary;
pub mod scanner;
pub mod live;
pub mod reading;

// Public exports
pub use config::*;
pub use error::{EmojiError, Result};
pub use dictionary::*;
pub use scanner::*;
pub use live::*;

use wasm_bindgen::prelude::*;

// When the `wee_alloc` feature is enabled, use `wee_alloc` as the global
// allocator for smaller WASM bundle size.
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Get version information
#[wasm_bindgen]
pub fn version() -> String {
    format!("emojicore v{}", env!("CARGO_PKG_VERSION"))
}
