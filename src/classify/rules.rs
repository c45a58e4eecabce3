//! Rule-based fallback classifier
//!
//! Deterministic token-overlap matching of free text against the
//! name/alias sets of offerable subcategories. No external calls, no
//! failure mode beyond "no match", and always terminates quickly.

use super::naming;
use crate::types::{Subcategory, SubcategoryId};
use std::collections::BTreeSet;

/// Best rule-based match for a piece of text
#[derive(Debug, Clone)]
pub struct RuleMatch {
    pub subcategory_id: SubcategoryId,
    pub canonical_name: String,

    /// Overlap score in [0, 1]; the orchestrator caps the reported
    /// confidence at the rule ceiling
    pub score: f32,
}

/// Match text against the offerable entries of a topic
///
/// Scores each entry by overlap between the text's significant tokens and
/// the entry's name/display/alias token set, with inflection-tolerant
/// token comparison. Returns the best entry at or above `floor`, or
/// `None`, never a below-floor guess.
pub fn best_match(entries: &[Subcategory], text: &str, floor: f32) -> Option<RuleMatch> {
    let text_tokens = naming::tokens(text);
    if text_tokens.is_empty() {
        return None;
    }

    let mut best: Option<RuleMatch> = None;
    for entry in entries.iter().filter(|e| e.is_offerable()) {
        let entry_tokens = label_tokens(entry);
        if entry_tokens.is_empty() {
            continue;
        }

        let score = overlap_score(&entry_tokens, &text_tokens);
        if score >= floor && best.as_ref().map_or(true, |b| score > b.score) {
            best = Some(RuleMatch {
                subcategory_id: entry.id,
                canonical_name: entry.canonical_name.clone(),
                score,
            });
        }
    }
    best
}

/// Token set of an entry's canonical name, display name and aliases
fn label_tokens(entry: &Subcategory) -> BTreeSet<String> {
    let mut set = naming::tokens(&entry.canonical_name.replace(['_', '-'], " "));
    set.extend(naming::tokens(&entry.display_name));
    for alias in &entry.aliases {
        set.extend(naming::tokens(&alias.replace(['_', '-'], " ")));
    }
    set
}

/// Overlap coefficient: matched tokens over the smaller set
fn overlap_score(entry_tokens: &BTreeSet<String>, text_tokens: &BTreeSet<String>) -> f32 {
    let matched = entry_tokens
        .iter()
        .filter(|et| text_tokens.iter().any(|tt| naming::tokens_match(et, tt)))
        .count();
    if matched == 0 {
        return 0.0;
    }
    matched as f32 / entry_tokens.len().min(text_tokens.len()) as f32
}
