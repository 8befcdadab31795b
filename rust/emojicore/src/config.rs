//! EmojiSettings: user configuration for rendering and map building
//!
//! Field names are camelCase on the wire so a host can pass its persisted
//! plugin settings object unchanged. Missing fields take their defaults.

use serde::{Deserialize, Serialize};

use crate::error::{EmojiError, Result};

/// Default proximity buffer around the cursor, in characters
pub const DEFAULT_HIDE_DISTANCE: usize = 1;

/// Default backward window searched for an opening colon
pub const DEFAULT_CLOSING_COLON_LOOKBACK: usize = 50;

// ==================== TYPE DEFINITIONS ====================

/// Preferred image format when both an SVG and a PNG exist for one base name
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FiletypePreference {
    #[default]
    Svg,
    Png,
    /// Prefer SVG, fall back to PNG
    Auto,
}

impl FiletypePreference {
    /// (preferred, fallback) extensions without the dot
    pub fn extensions(&self) -> (&'static str, &'static str) {
        match self {
            FiletypePreference::Png => ("png", "svg"),
            FiletypePreference::Svg | FiletypePreference::Auto => ("svg", "png"),
        }
    }
}

/// Configuration for the live engine and the dictionary loader
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmojiSettings {
    #[serde(default)]
    pub render_in_codeblocks: bool,
    #[serde(default)]
    pub render_in_inline_code: bool,
    #[serde(default)]
    pub render_in_urls: bool,
    #[serde(default)]
    pub render_in_frontmatter: bool,
    #[serde(default = "default_true")]
    pub render_in_comments: bool,
    #[serde(default = "default_hide_distance")]
    pub hide_distance: usize,
    #[serde(default = "default_lookback")]
    pub closing_colon_lookback: usize,
    #[serde(default)]
    pub filetype_preference: FiletypePreference,
    #[serde(default)]
    pub preserve_invalid_entries: bool,
}

fn default_true() -> bool {
    true
}

fn default_hide_distance() -> usize {
    DEFAULT_HIDE_DISTANCE
}

fn default_lookback() -> usize {
    DEFAULT_CLOSING_COLON_LOOKBACK
}

impl Default for EmojiSettings {
    fn default() -> Self {
        Self {
            render_in_codeblocks: false,
            render_in_inline_code: false,
            render_in_urls: false,
            render_in_frontmatter: false,
            render_in_comments: true,
            hide_distance: DEFAULT_HIDE_DISTANCE,
            closing_colon_lookback: DEFAULT_CLOSING_COLON_LOOKBACK,
            filetype_preference: FiletypePreference::Svg,
            preserve_invalid_entries: false,
        }
    }
}

impl EmojiSettings {
    /// Parse settings from a JSON object. Unknown fields are ignored.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| EmojiError::InvalidSettings(e.to_string()))
    }
}

// ==================== TESTS ====================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = EmojiSettings::default();
        assert!(!settings.render_in_codeblocks);
        assert!(!settings.render_in_inline_code);
        assert!(!settings.render_in_urls);
        assert!(!settings.render_in_frontmatter);
        assert!(settings.render_in_comments);
        assert_eq!(settings.hide_distance, 1);
        assert_eq!(settings.closing_colon_lookback, 50);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings = EmojiSettings::from_json(r#"{"renderInInlineCode": true}"#).unwrap();
        assert!(settings.render_in_inline_code);
        assert!(settings.render_in_comments);
        assert_eq!(settings.hide_distance, DEFAULT_HIDE_DISTANCE);
    }

    #[test]
    fn test_plugin_settings_object() {
        // Extra host fields (folder path) are ignored
        let json = r#"{
            "filetypePreference": "png",
            "emojiFolderPath": "assets/emoji",
            "renderInCodeblocks": true,
            "renderInComments": false
        }"#;
        let settings = EmojiSettings::from_json(json).unwrap();
        assert_eq!(settings.filetype_preference, FiletypePreference::Png);
        assert!(settings.render_in_codeblocks);
        assert!(!settings.render_in_comments);
    }

    #[test]
    fn test_invalid_json() {
        let err = EmojiSettings::from_json(r#"{"hideDistance": "far"}"#).unwrap_err();
        assert!(matches!(err, EmojiError::InvalidSettings(_)));
    }

    #[test]
    fn test_filetype_extensions() {
        assert_eq!(FiletypePreference::Svg.extensions(), ("svg", "png"));
        assert_eq!(FiletypePreference::Png.extensions(), ("png", "svg"));
        assert_eq!(FiletypePreference::Auto.extensions(), ("svg", "png"));
    }
}
