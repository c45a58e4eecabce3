//! Canonical name normalization and derivation
//!
//! Canonical names are lowercase, `[a-z0-9_-]` only, at most
//! `MAX_NAME_LEN` characters. Derivation from free text is deterministic
//! so that concurrent requests over identical text produce identical
//! `(topic, canonical_name)` creation keys.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

/// Upper bound on canonical name length
pub const MAX_NAME_LEN: usize = 50;

/// Name used when normalization consumes the whole input
pub const GENERIC_NAME: &str = "general";

/// Number of significant tokens joined into a derived name
const DERIVED_TOKENS: usize = 3;

static INVALID_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9_-]+").unwrap());
static UNDERSCORE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"_{2,}").unwrap());

/// Words carrying no classification signal
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "at", "been", "being", "by", "for", "from", "had", "has", "have",
    "in", "is", "it", "near", "of", "on", "or", "our", "reported", "that", "the", "there",
    "this", "to", "was", "were", "with",
];

/// Normalize a raw label into a valid canonical name
///
/// Lowercases, maps invalid character runs to a single underscore,
/// collapses underscore runs, strips leading/trailing underscores and
/// truncates to `MAX_NAME_LEN`. An input that normalizes to nothing
/// becomes `GENERIC_NAME`.
pub fn normalize_name(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let replaced = INVALID_CHARS.replace_all(&lowered, "_");
    let collapsed = UNDERSCORE_RUNS.replace_all(&replaced, "_");
    let mut name: String = collapsed.trim_matches('_').to_string();

    if name.len() > MAX_NAME_LEN {
        name.truncate(MAX_NAME_LEN);
        name = name.trim_end_matches(['_', '-']).to_string();
    }

    if name.is_empty() {
        GENERIC_NAME.to_string()
    } else {
        name
    }
}

/// Derive a canonical-name candidate from free text
///
/// Takes the first `DERIVED_TOKENS` significant tokens (stopwords and
/// short fragments dropped) joined by underscores, then normalizes.
pub fn derive_candidate_name(text: &str) -> String {
    let mut seen = BTreeSet::new();
    let joined: Vec<String> = significant_tokens_ordered(text)
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .take(DERIVED_TOKENS)
        .collect();
    normalize_name(&joined.join("_"))
}

/// Human-friendly display form of a canonical name
pub fn display_name_from(name: &str) -> String {
    name.split(['_', '-'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Significant tokens of a text, de-duplicated, order-independent
pub fn tokens(text: &str) -> BTreeSet<String> {
    significant_tokens_ordered(text).into_iter().collect()
}

fn significant_tokens_ordered(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| t.len() >= 3 && !STOPWORDS.contains(t))
        .map(|t| t.to_string())
        .collect()
}

/// Whether two tokens refer to the same word modulo inflection
///
/// Exact match, or a shared prefix covering more than 60% of the shorter
/// token (minimum 4 characters). Catches pairs like "collided" /
/// "collision" without a stemmer.
pub fn tokens_match(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    let common = a
        .chars()
        .zip(b.chars())
        .take_while(|(x, y)| x == y)
        .count();
    if common < 4 {
        return false;
    }
    let shorter = a.len().min(b.len());
    common as f32 / shorter as f32 > 0.6
}
