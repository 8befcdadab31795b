//! Browser smoke tests for the JS bindings
#![cfg(target_arch = "wasm32")]

use emojicore::{Edit, EmojiHub, LiveView, RejectedEntry, RenderSpan, Selection};
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn hub() -> EmojiHub {
    let mut hub = EmojiHub::new(JsValue::NULL).unwrap();
    let files = serde_wasm_bindgen::to_value(&vec!["emoji/wave.png"]).unwrap();
    let rejected = hub
        .js_load_map(r#"{":wave:": "emoji/wave.png", ":gone:": "emoji/gone.png"}"#, files)
        .unwrap();
    let rejected: Vec<RejectedEntry> = serde_wasm_bindgen::from_value(rejected).unwrap();
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].shortcode, ":gone:");
    hub
}

fn spans(view: &LiveView) -> Vec<RenderSpan> {
    serde_wasm_bindgen::from_value(view.js_decorations().unwrap()).unwrap()
}

#[wasm_bindgen_test]
fn test_load_map_and_lookup() {
    let hub = hub();
    assert!(hub.js_is_loaded());
    assert_eq!(hub.js_lookup(":wave:"), Some("emoji/wave.png".to_string()));
    assert_eq!(hub.js_lookup(":gone:"), None);
}

#[wasm_bindgen_test]
fn test_bad_map_file_clears_dictionary() {
    let mut hub = hub();
    let view = LiveView::new("hi :wave:", JsValue::NULL, false).unwrap();
    view.js_attach(&hub);
    assert_eq!(spans(&view).len(), 1);

    let files = serde_wasm_bindgen::to_value(&vec!["emoji/wave.png"]).unwrap();
    assert!(hub.js_load_map("not json", files).is_err());
    assert_eq!(hub.js_lookup(":wave:"), None);
    assert_eq!(hub.js_shortcodes().length(), 0);
    assert!(spans(&view).is_empty());
}

#[wasm_bindgen_test]
fn test_live_view_utf16_offsets() {
    let hub = hub();
    // '🎉' is two UTF-16 units and four bytes
    let view = LiveView::new("🎉 :wave:", JsValue::NULL, false).unwrap();
    assert_eq!(view.js_attach(&hub), "rebuilt");

    let found = spans(&view);
    assert_eq!(found.len(), 1);
    assert_eq!((found[0].from, found[0].to), (3, 9));
    assert_eq!(found[0].widget.image_path, "emoji/wave.png");

    // Cursor right after the match, in UTF-16 units
    assert_eq!(view.js_set_selection(9, 9).unwrap(), "rebuilt");
    assert!(spans(&view).is_empty());
}

#[wasm_bindgen_test]
fn test_apply_changes_and_destroy() {
    let hub = hub();
    let view = LiveView::new("say :wave", JsValue::NULL, true).unwrap();
    view.js_attach(&hub);
    assert_eq!(hub.js_subscriber_count(), 1);

    let changes = serde_wasm_bindgen::to_value(&vec![Edit::insert(9, ":")]).unwrap();
    let selection = serde_wasm_bindgen::to_value(&Selection::cursor(0)).unwrap();
    assert_eq!(view.js_apply_changes(changes, selection).unwrap(), "rebuilt");
    assert_eq!(view.js_text(), "say :wave:");
    assert_eq!(spans(&view).len(), 1);

    view.js_destroy().unwrap();
    assert_eq!(view.js_state_name(), "destroyed");
    assert_eq!(hub.js_subscriber_count(), 0);
}
