//! Emoji map file: parsing, validation and generation
//!
//! The map file is a JSON object `{ ":shortcode:": "path/to/image.svg" }`
//! written with sorted keys. Reading directories is the host's job; these
//! functions work on the already-listed file paths.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use super::ShortcodeDictionary;
use crate::config::FiletypePreference;
use crate::error::{EmojiError, Result};

const SUPPORTED_EXTENSIONS: [&str; 2] = [".png", ".svg"];

// =============================================================================
// Types
// =============================================================================

/// Why an entry was left out of the runtime dictionary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RejectReason {
    InvalidShortcode,
    UnsupportedExtension,
    MissingFile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedEntry {
    pub shortcode: String,
    pub path: String,
    pub reason: RejectReason,
}

/// Result of validating a map against the available image files
#[derive(Debug, Default)]
pub struct ValidatedMap {
    pub dictionary: ShortcodeDictionary,
    pub rejected: Vec<RejectedEntry>,
    /// Why the whole file was dropped, set only by [`load_dictionary`]
    pub load_error: Option<EmojiError>,
}

/// Summary of a map build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapBuildReport {
    pub added: usize,
    pub total: usize,
}

// =============================================================================
// File format
// =============================================================================

/// Parse the map file contents
pub fn parse_map_file(json: &str) -> Result<BTreeMap<String, String>> {
    Ok(serde_json::from_str(json)?)
}

/// Serialize a map the way it is stored on disk: sorted keys, two-space indent
pub fn to_map_file(map: &BTreeMap<String, String>) -> Result<String> {
    let mut out = serde_json::to_string_pretty(map)?;
    out.push('\n');
    Ok(out)
}

// =============================================================================
// Validation
// =============================================================================

fn has_supported_extension(path: &str) -> bool {
    SUPPORTED_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Format check applied to every entry regardless of settings
pub fn validate_entry(shortcode: &str, path: &str) -> Result<()> {
    if shortcode.len() < 2 || !shortcode.starts_with(':') || !shortcode.ends_with(':') {
        return Err(EmojiError::InvalidShortcode(shortcode.to_string()));
    }
    if !has_supported_extension(path) {
        return Err(EmojiError::InvalidImagePath {
            shortcode: shortcode.to_string(),
            path: path.to_string(),
        });
    }
    Ok(())
}

/// Keep the entries usable at runtime.
///
/// With `preserve_invalid` an entry whose file is missing is still kept; the
/// format check always applies.
pub fn validate_entries(
    map: &BTreeMap<String, String>,
    available_files: &HashSet<String>,
    preserve_invalid: bool,
) -> Result<ValidatedMap> {
    let mut accepted = Vec::with_capacity(map.len());
    let mut rejected = Vec::new();

    for (shortcode, path) in map {
        let reason = match validate_entry(shortcode, path) {
            Err(EmojiError::InvalidShortcode(_)) => Some(RejectReason::InvalidShortcode),
            Err(_) => Some(RejectReason::UnsupportedExtension),
            Ok(()) if !preserve_invalid && !available_files.contains(path) => {
                Some(RejectReason::MissingFile)
            }
            Ok(()) => None,
        };

        match reason {
            None => accepted.push((shortcode.clone(), path.clone())),
            Some(reason) => {
                tracing::warn!(%shortcode, %path, ?reason, "emoji map entry rejected");
                rejected.push(RejectedEntry {
                    shortcode: shortcode.clone(),
                    path: path.clone(),
                    reason,
                });
            }
        }
    }

    let dictionary = ShortcodeDictionary::new(accepted)?;
    tracing::info!(
        emojis = dictionary.len(),
        files = available_files.len(),
        rejected = rejected.len(),
        "emoji map validated"
    );

    Ok(ValidatedMap {
        dictionary,
        rejected,
        load_error: None,
    })
}

/// Load a map file into a runtime dictionary.
///
/// A malformed file yields an empty dictionary with `load_error` set, so
/// rendering degrades to plain text instead of keeping a stale map.
pub fn load_dictionary(
    json: &str,
    available_files: &HashSet<String>,
    preserve_invalid: bool,
) -> ValidatedMap {
    let map = match parse_map_file(json) {
        Ok(map) => map,
        Err(e) => {
            tracing::warn!(error = %e, "emoji map file unreadable, using empty dictionary");
            return ValidatedMap {
                load_error: Some(e),
                ..ValidatedMap::default()
            };
        }
    };

    validate_entries(&map, available_files, preserve_invalid).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "emoji map rejected, using empty dictionary");
        ValidatedMap {
            load_error: Some(e),
            ..ValidatedMap::default()
        }
    })
}

// =============================================================================
// Generation
// =============================================================================

#[derive(Default)]
struct Versions<'a> {
    svg: Option<&'a str>,
    png: Option<&'a str>,
}

impl<'a> Versions<'a> {
    fn get(&self, ext: &str) -> Option<&'a str> {
        match ext {
            "svg" => self.svg,
            "png" => self.png,
            _ => None,
        }
    }
}

/// Split `dir/name.ext` into (`name`, `ext` lowercased)
fn split_file_name(path: &str) -> (&str, String) {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    match file_name.rfind('.') {
        Some(dot) => (&file_name[..dot], file_name[dot + 1..].to_lowercase()),
        None => (file_name, String::new()),
    }
}

/// Add `:base:` entries for every image file not yet in the map.
///
/// Entries whose file disappeared are pruned first unless `preserve_invalid`.
/// Existing shortcodes are never overwritten.
pub fn build_map(
    existing: &mut BTreeMap<String, String>,
    files: &[String],
    preference: FiletypePreference,
    preserve_invalid: bool,
) -> Result<MapBuildReport> {
    let images: Vec<&str> = files
        .iter()
        .map(String::as_str)
        .filter(|f| has_supported_extension(f))
        .collect();

    if images.is_empty() {
        return Err(EmojiError::NoImageFiles);
    }

    if !preserve_invalid {
        let available: HashSet<&str> = images.iter().copied().collect();
        existing.retain(|_, path| available.contains(path.as_str()));
    }

    // Group by base name across folders; later files win within a format
    let mut by_base: HashMap<&str, Versions<'_>> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for &file in &images {
        let (base, ext) = split_file_name(file);
        let entry = by_base.entry(base).or_insert_with(|| {
            order.push(base);
            Versions::default()
        });
        match ext.as_str() {
            "svg" => entry.svg = Some(file),
            "png" => entry.png = Some(file),
            _ => {}
        }
    }

    let (preferred, fallback) = preference.extensions();
    let mut added = 0;
    for base in order {
        let shortcode = format!(":{}:", base);
        if existing.contains_key(&shortcode) {
            continue;
        }
        let versions = &by_base[base];
        if let Some(chosen) = versions.get(preferred).or_else(|| versions.get(fallback)) {
            existing.insert(shortcode, chosen.to_string());
            added += 1;
        }
    }

    Ok(MapBuildReport {
        added,
        total: existing.len(),
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn files(list: &[&str]) -> HashSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_and_write_sorted() {
        let map = parse_map_file(r#"{":b:": "e/b.png", ":a:": "e/a.svg"}"#).unwrap();
        let out = to_map_file(&map).unwrap();
        assert_eq!(out, "{\n  \":a:\": \"e/a.svg\",\n  \":b:\": \"e/b.png\"\n}\n");
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(matches!(parse_map_file("[1, 2]"), Err(EmojiError::InvalidMapFile(_))));
    }

    #[test]
    fn test_validate_entry() {
        assert!(validate_entry(":wave:", "e/wave.png").is_ok());
        assert!(matches!(validate_entry("wave", "e/wave.png"), Err(EmojiError::InvalidShortcode(_))));
        assert!(matches!(validate_entry(":", "e/wave.png"), Err(EmojiError::InvalidShortcode(_))));
        assert!(matches!(
            validate_entry(":wave:", "e/wave.gif"),
            Err(EmojiError::InvalidImagePath { .. })
        ));
    }

    #[test]
    fn test_validate_entries_reasons() {
        let mut map = BTreeMap::new();
        map.insert(":ok:".to_string(), "e/ok.svg".to_string());
        map.insert("bad".to_string(), "e/bad.svg".to_string());
        map.insert(":gif:".to_string(), "e/gif.gif".to_string());
        map.insert(":gone:".to_string(), "e/gone.png".to_string());

        let available = files(&["e/ok.svg", "e/bad.svg", "e/gif.gif"]);
        let result = validate_entries(&map, &available, false).unwrap();

        assert_eq!(result.dictionary.len(), 1);
        assert!(result.dictionary.contains(":ok:"));

        let reasons: Vec<_> = result.rejected.iter().map(|r| (r.shortcode.as_str(), r.reason)).collect();
        assert!(reasons.contains(&("bad", RejectReason::InvalidShortcode)));
        assert!(reasons.contains(&(":gif:", RejectReason::UnsupportedExtension)));
        assert!(reasons.contains(&(":gone:", RejectReason::MissingFile)));
    }

    #[test]
    fn test_preserve_invalid_keeps_missing_files() {
        let mut map = BTreeMap::new();
        map.insert(":gone:".to_string(), "e/gone.png".to_string());
        let result = validate_entries(&map, &HashSet::new(), true).unwrap();
        assert!(result.dictionary.contains(":gone:"));
        assert!(result.rejected.is_empty());
    }

    #[test]
    fn test_load_dictionary_malformed_is_empty() {
        let result = load_dictionary("{ not json", &HashSet::new(), false);
        assert!(result.dictionary.is_empty());
        assert!(matches!(result.load_error, Some(EmojiError::InvalidMapFile(_))));
    }

    #[test]
    fn test_load_dictionary_valid_has_no_error() {
        let files: HashSet<String> = ["e/wave.png".to_string()].into_iter().collect();
        let result = load_dictionary(r#"{":wave:": "e/wave.png"}"#, &files, false);
        assert!(result.dictionary.contains(":wave:"));
        assert!(result.load_error.is_none());
    }

    #[test]
    fn test_build_map_adds_and_prefers() {
        let mut map = BTreeMap::new();
        let list: Vec<String> = ["e/wave.png", "e/wave.svg", "e/cat.png", "e/readme.txt"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let report = build_map(&mut map, &list, FiletypePreference::Svg, false).unwrap();
        assert_eq!(report, MapBuildReport { added: 2, total: 2 });
        assert_eq!(map[":wave:"], "e/wave.svg");
        assert_eq!(map[":cat:"], "e/cat.png");

        let mut map = BTreeMap::new();
        build_map(&mut map, &list, FiletypePreference::Png, false).unwrap();
        assert_eq!(map[":wave:"], "e/wave.png");
    }

    #[test]
    fn test_build_map_prunes_and_keeps_existing() {
        let mut map = BTreeMap::new();
        map.insert(":hi:".to_string(), "e/wave.png".to_string());
        map.insert(":old:".to_string(), "e/old.png".to_string());

        let list = vec!["e/wave.png".to_string()];
        let report = build_map(&mut map, &list, FiletypePreference::Auto, false).unwrap();

        assert!(!map.contains_key(":old:"));
        assert_eq!(map[":hi:"], "e/wave.png");
        assert_eq!(map[":wave:"], "e/wave.png");
        assert_eq!(report, MapBuildReport { added: 1, total: 2 });
    }

    #[test]
    fn test_build_map_without_images() {
        let mut map = BTreeMap::new();
        let list = vec!["notes.md".to_string()];
        assert!(matches!(
            build_map(&mut map, &list, FiletypePreference::Svg, false),
            Err(EmojiError::NoImageFiles)
        ));
    }
}
