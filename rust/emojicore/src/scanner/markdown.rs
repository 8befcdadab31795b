//! MarkdownStructure - built-in structural classifier for markdown text
//!
//! For hosts without a syntax tree of their own. Regions are computed once
//! per document version:
//! - YAML frontmatter: `---` on the first line through the next `---`/`...` line
//! - fenced code: ``` or ~~~ through a closing fence of the same character
//! - indented code: 4-space/tab lines after a blank line
//! - inline code: matching backtick runs on a line
//! - links: `[..](..)`, images, `<scheme:..>` autolinks, bare http(s) URLs, `[[wikilinks]]`
//! - comments: `<!-- -->` and `%% %%`
//!
//! Inline regions that start inside code or frontmatter are discarded.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use super::syntax::{ContextCategory, StructureClassifier};
use crate::error::{EmojiError, Result};

// ==================== TYPE DEFINITIONS ====================

/// One classified region of the document
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct MarkdownRegion {
    pub from: usize,
    pub to: usize,
    pub category: ContextCategory,
}

impl MarkdownRegion {
    fn contains(&self, offset: usize) -> bool {
        self.from <= offset && offset < self.to
    }

    fn len(&self) -> usize {
        self.to - self.from
    }
}

struct Patterns {
    markdown_link: Regex,
    autolink: Regex,
    bare_url: Regex,
    wikilink: Regex,
    html_comment: Regex,
    percent_comment: Regex,
}

impl Patterns {
    fn compile() -> std::result::Result<Self, regex::Error> {
        Ok(Self {
            // [text](target) and ![alt](src)
            markdown_link: Regex::new(r"!?\[[^\]\n]*\]\([^)\n]*\)")?,
            // <https://example.com>, <mailto:x@y>
            autolink: Regex::new(r"<[A-Za-z][A-Za-z0-9+.\-]{1,31}:[^<>\s]*>")?,
            bare_url: Regex::new(r"https?://[^\s<>)\]]+")?,
            // [[Target]] and ![[Embed]]
            wikilink: Regex::new(r"!?\[\[[^\]\n]+\]\]")?,
            html_comment: Regex::new(r"(?s)<!--.*?-->")?,
            percent_comment: Regex::new(r"(?s)%%.*?%%")?,
        })
    }
}

static PATTERNS: OnceLock<std::result::Result<Patterns, regex::Error>> = OnceLock::new();

fn patterns() -> Result<&'static Patterns> {
    PATTERNS
        .get_or_init(Patterns::compile)
        .as_ref()
        .map_err(|e| EmojiError::Pattern(e.clone()))
}

// ==================== MAIN IMPLEMENTATION ====================

/// Precomputed region table for one markdown document
#[derive(Debug, Clone, Default)]
pub struct MarkdownStructure {
    regions: Vec<MarkdownRegion>,
}

struct RawLine<'a> {
    from: usize,
    to: usize,
    text: &'a str,
}

fn split_lines(text: &str) -> Vec<RawLine<'_>> {
    let mut lines = Vec::new();
    let mut from = 0;
    for segment in text.split('\n') {
        let to = from + segment.len();
        lines.push(RawLine {
            from,
            to,
            text: segment.strip_suffix('\r').unwrap_or(segment),
        });
        from = to + 1;
    }
    lines
}

/// Fence character and run length if the line opens or closes a fence
fn fence_marker(line: &str) -> Option<(char, usize)> {
    let trimmed = line.trim_start();
    let c = trimmed.chars().next()?;
    if c != '`' && c != '~' {
        return None;
    }
    let run = trimmed.chars().take_while(|&ch| ch == c).count();
    (run >= 3).then_some((c, run))
}

fn is_indented(line: &str) -> bool {
    line.starts_with("    ") || line.starts_with('\t')
}

impl MarkdownStructure {
    /// Build the region table for `text`
    pub fn analyze(text: &str) -> Result<Self> {
        let patterns = patterns()?;
        let lines = split_lines(text);
        let mut blocks = Vec::new();
        let mut body_start = 0;

        // Frontmatter
        if lines.first().map(|l| l.text.trim_end() == "---").unwrap_or(false) {
            let close = lines
                .iter()
                .enumerate()
                .skip(1)
                .find(|(_, l)| matches!(l.text.trim_end(), "---" | "..."));
            if let Some((idx, line)) = close {
                blocks.push(MarkdownRegion {
                    from: 0,
                    to: line.to,
                    category: ContextCategory::Frontmatter,
                });
                body_start = idx + 1;
            }
        }

        // Fenced and indented code
        let mut open_fence: Option<(char, usize, usize)> = None;
        let mut prev_blank = true;
        let mut indented_from: Option<usize> = None;
        let mut indented_to = 0;

        for line in &lines[body_start.min(lines.len())..] {
            if let Some((c, run, start)) = open_fence {
                let closes = fence_marker(line.text)
                    .map(|(fc, frun)| fc == c && frun >= run && line.text.trim().chars().all(|ch| ch == c))
                    .unwrap_or(false);
                if closes {
                    blocks.push(MarkdownRegion { from: start, to: line.to, category: ContextCategory::CodeBlock });
                    open_fence = None;
                    prev_blank = false;
                }
                continue;
            }

            let blank = line.text.trim().is_empty();
            let indented_code = !blank && is_indented(line.text) && (prev_blank || indented_from.is_some());

            if indented_code {
                indented_from.get_or_insert(line.from);
                indented_to = line.to;
            } else if !blank {
                if let Some(from) = indented_from.take() {
                    blocks.push(MarkdownRegion { from, to: indented_to, category: ContextCategory::CodeBlock });
                }
            }

            if !indented_code {
                if let Some((c, run)) = fence_marker(line.text) {
                    open_fence = Some((c, run, line.from));
                }
            }
            prev_blank = blank;
        }
        if let Some((_, _, start)) = open_fence {
            blocks.push(MarkdownRegion { from: start, to: text.len(), category: ContextCategory::CodeBlock });
        }
        if let Some(from) = indented_from {
            blocks.push(MarkdownRegion { from, to: indented_to, category: ContextCategory::CodeBlock });
        }

        let in_block = |offset: usize| blocks.iter().any(|r| r.contains(offset));

        // Inline code, per line
        let mut inline_code = Vec::new();
        for line in &lines {
            if in_block(line.from) {
                continue;
            }
            inline_code.extend(inline_code_spans(line.text, line.from));
        }

        let in_code = |offset: usize| in_block(offset) || inline_code.iter().any(|r: &MarkdownRegion| r.contains(offset));

        // Links and comments
        let mut inline = Vec::new();
        for re in [&patterns.markdown_link, &patterns.autolink, &patterns.wikilink] {
            for m in re.find_iter(text) {
                if !in_code(m.start()) {
                    inline.push(MarkdownRegion { from: m.start(), to: m.end(), category: ContextCategory::Link });
                }
            }
        }
        // Bare URLs already covered by a link are part of that link
        for m in patterns.bare_url.find_iter(text) {
            let covered = inline.iter().any(|r| r.contains(m.start()));
            if !covered && !in_code(m.start()) {
                inline.push(MarkdownRegion { from: m.start(), to: m.end(), category: ContextCategory::Link });
            }
        }
        for re in [&patterns.html_comment, &patterns.percent_comment] {
            for m in re.find_iter(text) {
                if !in_code(m.start()) {
                    inline.push(MarkdownRegion { from: m.start(), to: m.end(), category: ContextCategory::Comment });
                }
            }
        }

        let mut regions = blocks;
        regions.extend(inline_code);
        regions.extend(inline);
        regions.sort_by_key(|r| (r.from, std::cmp::Reverse(r.to)));

        tracing::debug!(regions = regions.len(), "markdown structure analyzed");
        Ok(Self { regions })
    }

    pub fn regions(&self) -> &[MarkdownRegion] {
        &self.regions
    }

    /// Categories of every region containing `offset`, innermost first
    pub fn categories_at(&self, offset: usize) -> Vec<ContextCategory> {
        let mut containing: Vec<&MarkdownRegion> = self.regions.iter().filter(|r| r.contains(offset)).collect();
        containing.sort_by_key(|r| r.len());
        containing.into_iter().map(|r| r.category).collect()
    }
}

impl StructureClassifier for MarkdownStructure {
    fn classify_at(&self, offset: usize) -> Result<Vec<Option<ContextCategory>>> {
        Ok(self.categories_at(offset).into_iter().map(Some).collect())
    }
}

/// Backtick runs closed by a run of the same length
fn inline_code_spans(line: &str, line_from: usize) -> Vec<MarkdownRegion> {
    let bytes = line.as_bytes();
    let mut runs = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'`' {
            let start = i;
            while i < bytes.len() && bytes[i] == b'`' {
                i += 1;
            }
            runs.push((start, i - start));
        } else {
            i += 1;
        }
    }

    let mut spans = Vec::new();
    let mut idx = 0;
    while idx < runs.len() {
        let (start, len) = runs[idx];
        match runs[idx + 1..].iter().position(|&(_, l)| l == len) {
            Some(offset) => {
                let (close, close_len) = runs[idx + 1 + offset];
                spans.push(MarkdownRegion {
                    from: line_from + start,
                    to: line_from + close + close_len,
                    category: ContextCategory::InlineCode,
                });
                idx += offset + 2;
            }
            None => idx += 1,
        }
    }
    spans
}

// ==================== TESTS ====================

#[cfg(test)]
mod tests {
    use super::*;
    use ContextCategory::*;

    fn at(text: &str, needle: &str) -> Vec<ContextCategory> {
        let structure = MarkdownStructure::analyze(text).unwrap();
        structure.categories_at(text.find(needle).unwrap())
    }

    #[test]
    fn test_plain_text_has_no_regions() {
        assert!(at("hello :wave: there", ":wave:").is_empty());
    }

    #[test]
    fn test_frontmatter() {
        let text = "---\ntitle: :wave:\n---\nbody :cat:";
        assert_eq!(at(text, ":wave:"), vec![Frontmatter]);
        assert!(at(text, ":cat:").is_empty());
    }

    #[test]
    fn test_unclosed_frontmatter_is_not_frontmatter() {
        assert!(at("---\ntitle :wave:", ":wave:").is_empty());
    }

    #[test]
    fn test_fenced_code() {
        let text = "a\n```js\nx :wave:\n```\nb :cat:";
        assert_eq!(at(text, ":wave:"), vec![CodeBlock]);
        assert!(at(text, ":cat:").is_empty());
    }

    #[test]
    fn test_fence_needs_same_character() {
        let text = "~~~\n```\n:wave:\n~~~\n:cat:";
        assert_eq!(at(text, ":wave:"), vec![CodeBlock]);
        assert!(at(text, ":cat:").is_empty());
    }

    #[test]
    fn test_unclosed_fence_runs_to_end() {
        assert_eq!(at("```\n:wave:", ":wave:"), vec![CodeBlock]);
    }

    #[test]
    fn test_indented_code_needs_blank_line() {
        assert_eq!(at("para\n\n    :wave:", ":wave:"), vec![CodeBlock]);
        assert!(at("- item\n    :wave:", ":wave:").is_empty());
    }

    #[test]
    fn test_inline_code() {
        assert_eq!(at("code: `:wave:` end", ":wave:"), vec![InlineCode]);
        assert_eq!(at("``a ` :wave:`` b", ":wave:"), vec![InlineCode]);
        assert!(at("lonely ` :wave:", ":wave:").is_empty());
    }

    #[test]
    fn test_links() {
        assert_eq!(at("[hi :wave:](https://x.y)", ":wave:"), vec![Link]);
        assert_eq!(at("see [[Note :wave:]]", ":wave:"), vec![Link]);
        assert_eq!(at("go https://x.y/:wave: now", ":wave:"), vec![Link]);
        assert_eq!(at("<https://x.y/:wave:>", ":wave:"), vec![Link]);
    }

    #[test]
    fn test_link_inside_inline_code_is_code() {
        assert_eq!(at("`https://x.y/:wave:`", ":wave:"), vec![InlineCode]);
    }

    #[test]
    fn test_comments() {
        assert_eq!(at("a <!-- :wave: --> b", ":wave:"), vec![Comment]);
        assert_eq!(at("a %%\n:wave:\n%% b", ":wave:"), vec![Comment]);
    }

    #[test]
    fn test_nested_innermost_first() {
        let text = "<!-- [x :wave:](u) -->";
        assert_eq!(at(text, ":wave:"), vec![Link, Comment]);
    }

    #[test]
    fn test_classify_at_wraps_categories() {
        let structure = MarkdownStructure::analyze("`:wave:`").unwrap();
        assert_eq!(structure.classify_at(1).unwrap(), vec![Some(InlineCode)]);
        assert!(structure.classify_at(100).unwrap().is_empty());
    }
}
