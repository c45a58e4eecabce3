//! Similarity matcher over existing subcategories
//!
//! Before any new subcategory is created, the taxonomy is searched for an
//! entry whose name or aliases are close to the candidate. A sufficiently
//! similar entry absorbs the candidate as an alias instead of a duplicate
//! being created. This is what keeps the taxonomy from fragmenting under
//! near-synonymous free text ("collision" vs "accident").

use super::naming;
use crate::types::Subcategory;

/// Tiered similarity of a candidate name against one entry, in [0, 1]
///
/// Exact canonical match scores 1.0, exact alias 0.9, containment in the
/// canonical name 0.8, in an alias 0.7, in the display name 0.6, in the
/// description 0.4; otherwise inflection-tolerant token overlap.
pub fn score(entry: &Subcategory, candidate: &str) -> f32 {
    let candidate = candidate.trim().to_lowercase();
    if candidate.is_empty() {
        return 0.0;
    }

    if entry.canonical_name == candidate {
        return 1.0;
    }
    if entry.aliases.contains(&candidate) {
        return 0.9;
    }
    if entry.canonical_name.contains(&candidate) || candidate.contains(&entry.canonical_name) {
        return 0.8;
    }
    if entry
        .aliases
        .iter()
        .any(|a| a.contains(&candidate) || candidate.contains(a.as_str()))
    {
        return 0.7;
    }
    let display = entry.display_name.to_lowercase();
    if display.contains(&candidate) || candidate.contains(&display) {
        return 0.6;
    }
    if let Some(desc) = &entry.description {
        if desc.to_lowercase().contains(&candidate) {
            return 0.4;
        }
    }

    token_overlap(entry, &candidate)
}

/// Rank offerable entries by similarity to the candidate, descending
pub fn rank<'a>(
    entries: &'a [Subcategory],
    candidate: &str,
    limit: usize,
) -> Vec<(&'a Subcategory, f32)> {
    let mut scored: Vec<(&Subcategory, f32)> = entries
        .iter()
        .filter(|e| e.is_offerable())
        .map(|e| (e, score(e, candidate)))
        .filter(|(_, s)| *s > 0.0)
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);
    scored
}

/// Best entry at or above `threshold`, if any
pub fn best_match<'a>(
    entries: &'a [Subcategory],
    candidate: &str,
    threshold: f32,
) -> Option<(&'a Subcategory, f32)> {
    rank(entries, candidate, 1)
        .into_iter()
        .next()
        .filter(|(_, s)| *s >= threshold)
}

fn token_overlap(entry: &Subcategory, candidate: &str) -> f32 {
    let candidate_tokens = naming::tokens(&candidate.replace(['_', '-'], " "));
    let mut entry_tokens = naming::tokens(&entry.canonical_name.replace(['_', '-'], " "));
    for alias in &entry.aliases {
        entry_tokens.extend(naming::tokens(&alias.replace(['_', '-'], " ")));
    }
    if candidate_tokens.is_empty() || entry_tokens.is_empty() {
        return 0.0;
    }

    let matched = entry_tokens
        .iter()
        .filter(|et| {
            candidate_tokens
                .iter()
                .any(|ct| naming::tokens_match(et, ct))
        })
        .count();
    let union = entry_tokens.len() + candidate_tokens.len() - matched;
    if union == 0 {
        0.0
    } else {
        matched as f32 / union as f32
    }
}
