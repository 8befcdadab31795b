//! Error types shared by the scanner, the dictionary layer and the live engine.
//!
//! Nothing here is fatal to an editing surface: the live coordinator turns
//! every `EmojiError` into an empty decoration set (plain text).

use thiserror::Error;

/// Errors produced by emojicore operations
#[derive(Debug, Error)]
pub enum EmojiError {
    #[error("offset {offset} is outside the document (length {len})")]
    OffsetOutOfRange { offset: usize, len: usize },

    #[error("line {line} is outside the document ({count} lines)")]
    LineOutOfRange { line: usize, count: usize },

    #[error("edit {from}..{to} is out of order or outside the document (length {len})")]
    InvalidEdit { from: usize, to: usize, len: usize },

    #[error("structure classifier failed: {0}")]
    Classifier(String),

    #[error("failed to build shortcode matcher: {0}")]
    MatcherBuild(#[from] aho_corasick::BuildError),

    #[error("invalid structure pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("emoji map file is not a valid JSON object: {0}")]
    InvalidMapFile(#[from] serde_json::Error),

    #[error("invalid shortcode format: {0}")]
    InvalidShortcode(String),

    #[error("unsupported image path for {shortcode}: {path}")]
    InvalidImagePath { shortcode: String, path: String },

    #[error("no .png or .svg files found in the emoji directory")]
    NoImageFiles,

    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

pub type Result<T> = std::result::Result<T, EmojiError>;
