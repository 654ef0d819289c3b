//! Search Filter
//!
//! Case-insensitive substring search over the canonical collection, plus
//! autocomplete suggestions drawn from the same data.

use std::collections::HashSet;

use crate::core::record::Entry;

/// Minimum query length (in characters) before suggestions are offered.
pub const SUGGEST_MIN_CHARS: usize = 2;

/// Filter `entries` by a free-text query.
///
/// A blank query returns the input unchanged. Otherwise an entry matches when
/// the lower-cased query occurs in its lower-cased name or country, or in the
/// decimal text of its player id or score. Relative order is preserved.
pub fn filter(entries: &[Entry], query: &str) -> Vec<Entry> {
    if query.trim().is_empty() {
        return entries.to_vec();
    }

    let needle = query.to_lowercase();
    entries
        .iter()
        .filter(|entry| matches(entry, &needle))
        .cloned()
        .collect()
}

/// Whether an entry matches an already lower-cased needle.
fn matches(entry: &Entry, needle: &str) -> bool {
    entry.name().to_lowercase().contains(needle)
        || entry.country().to_lowercase().contains(needle)
        || entry.player_id.to_string().contains(needle)
        || entry.score_text().contains(needle)
}

/// Autocomplete values for a query.
///
/// Collects name, country, player id and wealth text across all entries,
/// drops duplicates (first occurrence wins) and keeps the values that contain
/// the query case-insensitively. Queries shorter than
/// [`SUGGEST_MIN_CHARS`] produce nothing.
pub fn suggest(entries: &[Entry], query: &str) -> Vec<String> {
    if query.chars().count() < SUGGEST_MIN_CHARS {
        return Vec::new();
    }

    let needle = query.to_lowercase();
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();

    for entry in entries {
        let candidates = [
            entry.name().to_string(),
            entry.country().to_string(),
            entry.player_id.to_string(),
            entry.wealth().as_text().to_string(),
        ];

        for value in candidates {
            if !seen.insert(value.clone()) {
                continue;
            }
            if value.to_lowercase().contains(&needle) {
                out.push(value);
            }
        }
    }

    out
}
