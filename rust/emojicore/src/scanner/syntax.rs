//! ContextClassifier - decides whether a match's surroundings permit rendering
//!
//! Structural information comes from a host-provided [`StructureClassifier`]
//! that reports the regions enclosing an offset, innermost first. Regions are
//! reduced to a closed set of [`ContextCategory`] values; the first region
//! with a category decides, per the user's settings. Regions without a
//! category are transparent.
//!
//! Without a structural verdict a textual fallback runs:
//! - fence toggling (``` / ~~~) from the document start through the line
//! - backtick parity on the line (odd count before, at least one after)
//! - 4-space / tab indented lines
//!
//! No information at all means rendering is allowed.

use serde::{Deserialize, Serialize};

use super::document::TextDocument;
use crate::config::EmojiSettings;
use crate::error::Result;

// ==================== TYPE DEFINITIONS ====================

/// Syntactic contexts that can suppress rendering
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ContextCategory {
    CodeBlock,
    InlineCode,
    Link,
    Frontmatter,
    Comment,
}

const CODE_BLOCK_NAMES: &[&str] = &[
    "codeblock", "code-block", "code_block", "fencedcode", "fenced-code", "fenced_code",
    "codefence", "code-fence", "codeinfo", "indentedcode",
];

const INLINE_CODE_NAMES: &[&str] = &[
    "inlinecode", "inline-code", "inline_code", "code-inline", "codespan", "code-span", "code_span",
    "backtick", "monospace",
];

const LINK_NAMES: &[&str] = &["link", "url", "uri", "href", "anchor"];

const FRONTMATTER_NAMES: &[&str] = &["frontmatter", "front-matter", "yaml"];

const COMMENT_NAMES: &[&str] = &["comment"];

/// Node names shared by fenced and inline code; they say nothing on their own
const AMBIGUOUS_CODE_NAMES: &[&str] = &["codetext", "codemark"];

impl ContextCategory {
    /// Map a host grammar node name onto a category.
    ///
    /// Matching is case-insensitive substring matching over the common
    /// markdown grammar spellings. Unknown names return `None`.
    pub fn from_node_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        let has = |names: &[&str]| names.iter().any(|n| lower.contains(n));

        if has(AMBIGUOUS_CODE_NAMES) {
            return None;
        }
        if has(CODE_BLOCK_NAMES) || lower == "pre" {
            Some(ContextCategory::CodeBlock)
        } else if has(INLINE_CODE_NAMES) || lower == "code" {
            Some(ContextCategory::InlineCode)
        } else if has(FRONTMATTER_NAMES) {
            Some(ContextCategory::Frontmatter)
        } else if has(COMMENT_NAMES) {
            Some(ContextCategory::Comment)
        } else if has(LINK_NAMES) {
            Some(ContextCategory::Link)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContextCategory::CodeBlock => "code-block",
            ContextCategory::InlineCode => "inline-code",
            ContextCategory::Link => "link",
            ContextCategory::Frontmatter => "frontmatter",
            ContextCategory::Comment => "comment",
        }
    }
}

/// Structural introspection provided by the host
pub trait StructureClassifier {
    /// Regions enclosing `offset`, innermost first. `None` entries are
    /// regions with no recognized category.
    fn classify_at(&self, offset: usize) -> Result<Vec<Option<ContextCategory>>>;
}

/// Per-context rendering switches
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContextRules {
    pub code_blocks: bool,
    pub inline_code: bool,
    pub urls: bool,
    pub frontmatter: bool,
    pub comments: bool,
}

impl From<&EmojiSettings> for ContextRules {
    fn from(settings: &EmojiSettings) -> Self {
        Self {
            code_blocks: settings.render_in_codeblocks,
            inline_code: settings.render_in_inline_code,
            urls: settings.render_in_urls,
            frontmatter: settings.render_in_frontmatter,
            comments: settings.render_in_comments,
        }
    }
}

impl Default for ContextRules {
    fn default() -> Self {
        Self::from(&EmojiSettings::default())
    }
}

impl ContextRules {
    pub fn allows(&self, category: ContextCategory) -> bool {
        match category {
            ContextCategory::CodeBlock => self.code_blocks,
            ContextCategory::InlineCode => self.inline_code,
            ContextCategory::Link => self.urls,
            ContextCategory::Frontmatter => self.frontmatter,
            ContextCategory::Comment => self.comments,
        }
    }

    /// True when any context suppresses rendering
    pub fn has_any_filtering(&self) -> bool {
        !(self.code_blocks && self.inline_code && self.urls && self.frontmatter && self.comments)
    }
}

// ==================== MAIN IMPLEMENTATION ====================

/// Settings-driven context filter
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextClassifier {
    rules: ContextRules,
}

impl ContextClassifier {
    pub fn new(settings: &EmojiSettings) -> Self {
        Self {
            rules: ContextRules::from(settings),
        }
    }

    pub fn rules(&self) -> &ContextRules {
        &self.rules
    }

    /// Whether a match starting at `position` may render.
    ///
    /// `line_text` is the line holding the match and `line_offset` the match
    /// start within it. Never fails: classifier errors fall through to the
    /// textual fallback.
    pub fn allows_rendering<D: TextDocument + ?Sized>(
        &self,
        position: usize,
        line_text: &str,
        line_offset: usize,
        doc: &D,
        structure: Option<&dyn StructureClassifier>,
    ) -> bool {
        if !self.rules.has_any_filtering() {
            return true;
        }

        if let Some(structure) = structure {
            match structure.classify_at(position) {
                Ok(regions) => {
                    if let Some(category) = regions.into_iter().flatten().next() {
                        return self.rules.allows(category);
                    }
                }
                Err(e) => {
                    tracing::warn!(position, error = %e, "structure classifier failed, using fallback");
                }
            }
        }

        match self.fallback_filters(position, line_text, line_offset, doc) {
            Some(filtered) => !filtered,
            None => true,
        }
    }

    /// Textual detection. `Some(true)` filters, `None` means no verdict.
    fn fallback_filters<D: TextDocument + ?Sized>(
        &self,
        position: usize,
        line_text: &str,
        line_offset: usize,
        doc: &D,
    ) -> Option<bool> {
        if !self.rules.code_blocks {
            match inside_fenced_code(doc, position) {
                Ok(true) => return Some(true),
                Ok(false) => {}
                Err(e) => tracing::warn!(position, error = %e, "fence detection failed"),
            }
        }

        if !self.rules.inline_code && inside_inline_code(line_text, line_offset) {
            return Some(true);
        }

        if !self.rules.code_blocks && (line_text.starts_with("    ") || line_text.starts_with('\t')) {
            return Some(true);
        }

        None
    }
}

/// Toggle on every fence line from the document start through the line
/// holding `position`
pub fn inside_fenced_code<D: TextDocument + ?Sized>(doc: &D, position: usize) -> Result<bool> {
    let target = doc.line_at(position)?.number;
    let mut inside = false;
    for n in 0..=target {
        let text = doc.line(n)?.text.trim();
        if text.starts_with("```") || text.starts_with("~~~") {
            inside = !inside;
        }
    }
    Ok(inside)
}

/// Odd number of backticks before `offset` and at least one at or after it
pub fn inside_inline_code(line_text: &str, offset: usize) -> bool {
    let offset = offset.min(line_text.len());
    let bytes = line_text.as_bytes();
    let before = bytes[..offset].iter().filter(|&&b| b == b'`').count();
    let after = bytes[offset..].iter().filter(|&&b| b == b'`').count();
    before % 2 == 1 && after > 0
}

// ==================== TESTS ====================
