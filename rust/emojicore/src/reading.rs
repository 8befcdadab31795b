//! Reading-mode segmentation
//!
//! Splits a rendered text node into plain text and emoji segments with the
//! same matcher and escape rule as the live scanner. The host has already
//! excluded code and link elements, so no context filtering happens here.

use serde::{Deserialize, Serialize};

use crate::dictionary::{shortcode_label, ShortcodeDictionary};
use crate::scanner::is_escaped;

/// A piece of a text node
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Segment {
    Text {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    Emoji {
        shortcode: String,
        image_path: String,
        label: String,
    },
}

impl Segment {
    /// Literal text of the segment; for an emoji whose image fails, the
    /// shortcode
    pub fn fallback_text(&self) -> &str {
        match self {
            Segment::Text { text } => text,
            Segment::Emoji { shortcode, .. } => shortcode,
        }
    }

    pub fn is_emoji(&self) -> bool {
        matches!(self, Segment::Emoji { .. })
    }
}

/// Split `text` into segments. Adjacent plain text is merged.
pub fn segments(text: &str, dictionary: &ShortcodeDictionary) -> Vec<Segment> {
    let mut out = Vec::new();
    let mut cursor = 0;

    for m in dictionary.find_iter(text) {
        if is_escaped(text, m.start) {
            continue;
        }
        if m.start > cursor {
            out.push(Segment::Text {
                text: text[cursor..m.start].to_string(),
            });
        }
        out.push(Segment::Emoji {
            shortcode: m.shortcode.to_string(),
            image_path: m.image_path.to_string(),
            label: shortcode_label(m.shortcode),
        });
        cursor = m.end;
    }

    if cursor < text.len() {
        out.push(Segment::Text {
            text: text[cursor..].to_string(),
        });
    }
    out
}

/// True if `text` would produce at least one emoji segment
pub fn has_emoji(text: &str, dictionary: &ShortcodeDictionary) -> bool {
    dictionary.find_iter(text).any(|m| !is_escaped(text, m.start))
}

/// Concatenated fallback text, equal to the input of `segments`
pub fn plain_text(segments: &[Segment]) -> String {
    segments.iter().map(Segment::fallback_text).collect()
}
