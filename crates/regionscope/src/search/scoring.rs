//! Relevance scoring of a query against a single entry.
//!
//! The first rule that fires sets the base score; kind boosts are added only on top of
//! a non-zero base.
//!
//! | rule                                  | score |
//! |---------------------------------------|-------|
//! | exact name or code                    | 100   |
//! | name or code starts with query        | 80    |
//! | a word of the name starts with query  | 70    |
//! | name or code contains query           | 60    |
//! | facility address contains query       | 50    |
//! | facility care type contains query     | 45    |
//! | a word of the facility address starts | 40    |
//! | edit distance <= 2 (name), <= 1 (code)| 40    |

use once_cell::sync::Lazy;
use regex::Regex;
use regionscope_data::BoundaryKind;

use crate::{config::ScoreBoosts, index::SearchEntry};

static NUMERIC_QUERY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+$").expect("Invalid numeric query pattern"));

const EXACT: u32 = 100;
const PREFIX: u32 = 80;
const WORD_PREFIX: u32 = 70;
const SUBSTRING: u32 = 60;
const ADDRESS_SUBSTRING: u32 = 50;
const CARE_TYPE_SUBSTRING: u32 = 45;
const ADDRESS_WORD_PREFIX: u32 = 40;
const FUZZY: u32 = 40;

const MAX_NAME_EDITS: usize = 2;
const MAX_CODE_EDITS: usize = 1;

/// Whether the trimmed query is made of ASCII digits only.
pub fn is_numeric_query(query: &str) -> bool {
    NUMERIC_QUERY.is_match(query.trim())
}

/// Levenshtein distance over Unicode scalar values.
pub fn edit_distance(a: &str, b: &str) -> usize {
    rapidfuzz::distance::levenshtein::distance(a.chars(), b.chars())
}

/// Ladder score of an already lower-cased, trimmed query, without boosts.
pub fn base_score(query: &str, entry: &SearchEntry) -> u32 {
    if query.is_empty() {
        return 0;
    }
    let name = entry.name.to_lowercase();
    let code = entry.code.as_deref().map(str::to_lowercase);
    let code = code.as_deref();

    if name == query || code == Some(query) {
        return EXACT;
    }
    if name.starts_with(query) || code.is_some_and(|c| c.starts_with(query)) {
        return PREFIX;
    }
    if name.split_whitespace().any(|word| word.starts_with(query)) {
        return WORD_PREFIX;
    }
    if name.contains(query) || code.is_some_and(|c| c.contains(query)) {
        return SUBSTRING;
    }
    if let Some(facility) = &entry.facility {
        let address = facility.address.as_deref().map(str::to_lowercase);
        if address.as_deref().is_some_and(|a| a.contains(query)) {
            return ADDRESS_SUBSTRING;
        }
        if facility.care_type.to_lowercase().contains(query) {
            return CARE_TYPE_SUBSTRING;
        }
        if address
            .as_deref()
            .is_some_and(|a| a.split_whitespace().any(|word| word.starts_with(query)))
        {
            return ADDRESS_WORD_PREFIX;
        }
    }
    if edit_distance(query, &name) <= MAX_NAME_EDITS
        || code.is_some_and(|c| edit_distance(query, c) <= MAX_CODE_EDITS)
    {
        return FUZZY;
    }
    0
}

/// Additive boost for `kind` given the query's shape.
pub fn kind_boost(kind: BoundaryKind, numeric: bool, boosts: &ScoreBoosts) -> u32 {
    match kind {
        BoundaryKind::Facility if !numeric => boosts.facility,
        BoundaryKind::Locality if numeric => boosts.locality_numeric,
        BoundaryKind::Locality => boosts.locality_text,
        BoundaryKind::Postcode if numeric => boosts.postcode_numeric,
        BoundaryKind::Postcode => boosts.postcode_text,
        BoundaryKind::Lga => boosts.lga,
        _ => 0,
    }
}

/// Final relevance score of `query` for `entry`. Zero means no match.
pub fn score(query: &str, entry: &SearchEntry, boosts: &ScoreBoosts) -> u32 {
    let query = query.trim().to_lowercase();
    match base_score(&query, entry) {
        0 => 0,
        base => base + kind_boost(entry.kind, is_numeric_query(&query), boosts),
    }
}
