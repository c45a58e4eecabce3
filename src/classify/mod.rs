//! Classification pipeline
//!
//! Components:
//! - naming: canonical name normalization and derivation
//! - rules: deterministic token-overlap fallback classifier
//! - similarity: near-duplicate detection over existing entries
//! - orchestrator: the ordered-fallback classification engine

pub mod naming;
pub mod orchestrator;
pub mod rules;
pub mod similarity;

pub use orchestrator::ClassificationEngine;
pub use rules::RuleMatch;
