//! ShortcodeDictionary - shortcode → image lookup with a combined matcher
//!
//! All keys are compiled into one Aho-Corasick automaton with LeftmostLongest
//! semantics. Keys are matched as literal text, so no escaping is involved, and
//! at any start offset the longest key wins (`:ab:` is never read as `:a:`
//! followed by a dangling `b:`).
//!
//! The automaton is rebuilt whenever the mapping changes; a new dictionary is
//! simply a new value handed out through the [`DictionaryHub`].

pub mod hub;
pub mod map_file;

pub use hub::*;
pub use map_file::*;

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::error::Result;

// ==================== TYPE DEFINITIONS ====================

/// A dictionary key found in a piece of text
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShortcodeMatch<'a> {
    pub start: usize,
    pub end: usize,
    pub shortcode: &'a str,
    pub image_path: &'a str,
}

/// Statistics about the dictionary
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DictionaryStats {
    pub entry_count: usize,
    pub is_built: bool,
}

// ==================== MAIN IMPLEMENTATION ====================

/// Immutable shortcode dictionary
pub struct ShortcodeDictionary {
    entries: HashMap<String, String>,
    /// Pattern id → key, sorted for deterministic pattern numbering
    keys: Vec<String>,
    /// None when the dictionary is empty: matches nothing
    automaton: Option<AhoCorasick>,
}

impl std::fmt::Debug for ShortcodeDictionary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShortcodeDictionary")
            .field("entries", &self.entries.len())
            .field("is_built", &self.automaton.is_some())
            .finish()
    }
}

impl Default for ShortcodeDictionary {
    fn default() -> Self {
        Self::empty()
    }
}

impl ShortcodeDictionary {
    /// A dictionary with no entries. Its matcher never matches.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
            keys: Vec::new(),
            automaton: None,
        }
    }

    /// Build a dictionary and its matcher from shortcode → image path pairs.
    ///
    /// Empty keys are dropped: they would produce zero-width matches.
    pub fn new<I, K, V>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = HashMap::new();
        for (key, path) in entries {
            let key = key.into();
            if key.is_empty() {
                tracing::warn!("skipping empty shortcode key");
                continue;
            }
            map.insert(key, path.into());
        }

        let mut keys: Vec<String> = map.keys().cloned().collect();
        keys.sort();

        let automaton = if keys.is_empty() {
            None
        } else {
            Some(
                AhoCorasickBuilder::new()
                    .match_kind(MatchKind::LeftmostLongest)
                    .build(&keys)?,
            )
        };

        Ok(Self {
            entries: map,
            keys,
            automaton,
        })
    }

    /// Resolve a shortcode to its image path
    pub fn lookup(&self, shortcode: &str) -> Option<&str> {
        self.entries.get(shortcode).map(String::as_str)
    }

    pub fn contains(&self, shortcode: &str) -> bool {
        self.entries.contains_key(shortcode)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in sorted order
    pub fn shortcodes(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// Sorted copy of the mapping, the shape written to the map file
    pub fn to_sorted_map(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Every non-overlapping key occurrence in `text`, left to right
    pub fn find_iter<'a>(&'a self, text: &'a str) -> impl Iterator<Item = ShortcodeMatch<'a>> + 'a {
        self.automaton
            .iter()
            .flat_map(move |ac| ac.find_iter(text))
            .map(move |m| {
                let shortcode = self.keys[m.pattern().as_usize()].as_str();
                ShortcodeMatch {
                    start: m.start(),
                    end: m.end(),
                    shortcode,
                    image_path: self.entries[shortcode].as_str(),
                }
            })
    }

    /// Quick check if text contains any key
    pub fn contains_any(&self, text: &str) -> bool {
        match self.automaton.as_ref() {
            Some(ac) => ac.is_match(text),
            None => false,
        }
    }

    /// First complete key contained in `text`, if any
    pub fn first_key_in<'a>(&'a self, text: &'a str) -> Option<&'a str> {
        self.find_iter(text).next().map(|m| m.shortcode)
    }

    pub fn stats(&self) -> DictionaryStats {
        DictionaryStats {
            entry_count: self.entries.len(),
            is_built: self.automaton.is_some(),
        }
    }
}

/// Accessibility label for a shortcode: `:wave_hello:` → `wave hello`
pub fn shortcode_label(shortcode: &str) -> String {
    let inner = shortcode.strip_prefix(':').unwrap_or(shortcode);
    let inner = inner.strip_suffix(':').unwrap_or(inner);

    let mut label = String::with_capacity(inner.len());
    let mut in_underscores = false;
    for c in inner.chars() {
        if c == '_' {
            if !in_underscores {
                label.push(' ');
            }
            in_underscores = true;
        } else {
            label.push(c);
            in_underscores = false;
        }
    }
    label
}

// ==================== TESTS ====================

#[cfg(test)]
mod tests {
    use super::*;

    fn dict(pairs: &[(&str, &str)]) -> ShortcodeDictionary {
        ShortcodeDictionary::new(pairs.iter().map(|(k, v)| (*k, *v))).unwrap()
    }

    #[test]
    fn test_lookup() {
        let d = dict(&[(":wave:", "img/wave.png")]);
        assert_eq!(d.lookup(":wave:"), Some("img/wave.png"));
        assert_eq!(d.lookup(":nope:"), None);
        assert!(d.contains(":wave:"));
        assert_eq!(d.len(), 1);
    }

    #[test]
    fn test_empty_matches_nothing() {
        let d = ShortcodeDictionary::empty();
        assert_eq!(d.find_iter(":wave: :: x").count(), 0);
        assert!(!d.contains_any(":wave:"));
        assert!(!d.stats().is_built);

        let d = dict(&[]);
        assert!(d.is_empty());
        assert_eq!(d.find_iter("").count(), 0);
    }

    #[test]
    fn test_empty_key_dropped() {
        let d = dict(&[("", "img/blank.png"), (":a:", "img/a.png")]);
        assert_eq!(d.len(), 1);
        // No zero-width matches anywhere
        assert!(d.find_iter("xyz").all(|m| m.end > m.start));
    }

    #[test]
    fn test_metacharacters_matched_literally() {
        let d = dict(&[(":+1:", "img/plus.png"), (":a.b:", "img/dot.png")]);
        let found: Vec<_> = d.find_iter("ok :+1: and :axb: and :a.b:").map(|m| m.shortcode).collect();
        assert_eq!(found, vec![":+1:", ":a.b:"]);
    }

    #[test]
    fn test_longest_key_wins_at_same_start() {
        let d = dict(&[(":a:", "img/a.png"), (":ab:", "img/ab.png")]);
        let found: Vec<_> = d.find_iter(":ab:").collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].shortcode, ":ab:");
        assert_eq!((found[0].start, found[0].end), (0, 4));
        assert_eq!(found[0].image_path, "img/ab.png");
    }

    #[test]
    fn test_adjacent_matches() {
        let d = dict(&[(":a:", "img/a.png")]);
        let found: Vec<_> = d.find_iter(":a::a:").map(|m| (m.start, m.end)).collect();
        assert_eq!(found, vec![(0, 3), (3, 6)]);
    }

    #[test]
    fn test_first_key_in() {
        let d = dict(&[(":wave:", "w.png"), (":cat:", "c.png")]);
        assert_eq!(d.first_key_in("say :cat: hi"), Some(":cat:"));
        assert_eq!(d.first_key_in(":wav"), None);
    }

    #[test]
    fn test_sorted_map() {
        let d = dict(&[(":b:", "b.png"), (":a:", "a.png")]);
        let keys: Vec<_> = d.to_sorted_map().into_keys().collect();
        assert_eq!(keys, vec![":a:", ":b:"]);
        assert_eq!(d.shortcodes().collect::<Vec<_>>(), vec![":a:", ":b:"]);
    }

    #[test]
    fn test_shortcode_label() {
        assert_eq!(shortcode_label(":wave:"), "wave");
        assert_eq!(shortcode_label(":wave_hello:"), "wave hello");
        assert_eq!(shortcode_label(":trans__flag:"), "trans flag");
        assert_eq!(shortcode_label(":_x_:"), " x ");
        assert_eq!(shortcode_label("plain"), "plain");
    }
}
