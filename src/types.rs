//! Core data types for the Linnaeus taxonomy engine
//!
//! This module defines the fundamental data structures used throughout the
//! crate: topics, subcategories, classification requests and outcomes, and
//! feedback records. Subcategories form a dynamically evolving taxonomy
//! under a closed set of top-level topics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Unique identifier for subcategories
///
/// Wraps a UUID to provide type safety and prevent mixing subcategory IDs
/// with other UUID-based identifiers in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubcategoryId(pub Uuid);

impl SubcategoryId {
    /// Create a new random subcategory ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a subcategory ID from a string
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for SubcategoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubcategoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for classification outcomes
///
/// Feedback submissions reference outcomes by this ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutcomeId(pub Uuid);

impl OutcomeId {
    /// Create a new random outcome ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an outcome ID from a string
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for OutcomeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OutcomeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Closed set of top-level incident topics
///
/// Subcategories are always classified under exactly one topic; the set is
/// fixed at compile time while the subcategories beneath it evolve at
/// runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Traffic,
    Infrastructure,
    Weather,
    Events,
    Safety,
}

impl Topic {
    /// All topics, for iteration in analytics and seeding
    pub const ALL: [Topic; 5] = [
        Topic::Traffic,
        Topic::Infrastructure,
        Topic::Weather,
        Topic::Events,
        Topic::Safety,
    ];

    /// Stable string form used in keys and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Traffic => "traffic",
            Topic::Infrastructure => "infrastructure",
            Topic::Weather => "weather",
            Topic::Events => "events",
            Topic::Safety => "safety",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status of a subcategory
///
/// Created as `PendingReview`, promoted to `Active` by the analytics
/// aggregator once the promotion policy is crossed. `Deprecated` entries
/// stop being offered as classification targets but remain resolvable.
/// `Merged` is terminal and redirects to another entry via `merged_into`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubcategoryStatus {
    PendingReview,
    Active,
    Deprecated,
    Merged,
}

impl SubcategoryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubcategoryStatus::PendingReview => "pending_review",
            SubcategoryStatus::Active => "active",
            SubcategoryStatus::Deprecated => "deprecated",
            SubcategoryStatus::Merged => "merged",
        }
    }
}

impl std::fmt::Display for SubcategoryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Running mean over classification confidence values
///
/// Updated incrementally; no history is stored. `absorb` combines two
/// running means weighted by sample count, used when merging entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceStats {
    pub mean: f32,
    pub samples: u64,
}

impl ConfidenceStats {
    /// Record one confidence value, clamped into [0, 1]
    pub fn record(&mut self, value: f32) {
        let value = value.clamp(0.0, 1.0);
        self.samples += 1;
        self.mean += (value - self.mean) / self.samples as f32;
    }

    /// Absorb another running mean, weighted by sample counts
    pub fn absorb(&mut self, other: &ConfidenceStats) {
        let total = self.samples + other.samples;
        if total == 0 {
            return;
        }
        self.mean = (self.mean * self.samples as f32 + other.mean * other.samples as f32)
            / total as f32;
        self.samples = total;
    }
}

/// A named, aliasable classification target within a topic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subcategory {
    pub id: SubcategoryId,
    pub topic: Topic,

    /// Immutable once created; unique per topic among non-merged entries
    pub canonical_name: String,

    /// Human-friendly form of the canonical name
    pub display_name: String,

    pub description: Option<String>,

    /// Alternate text tokens mapped to this entry for rule-based matching.
    /// No alias is shared between two non-merged entries in a topic.
    pub aliases: BTreeSet<String>,

    /// Optional hierarchy parent
    pub parent_id: Option<SubcategoryId>,

    pub status: SubcategoryStatus,

    /// Monotonically non-decreasing, except merge summation
    pub usage_count: u64,

    /// User feedback tallies
    pub confirmations: u64,
    pub rejections: u64,

    pub confidence_stats: ConfidenceStats,

    /// Set only when status is `Merged`; resolution follows this chain
    pub merged_into: Option<SubcategoryId>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subcategory {
    /// Create a fresh entry in `PendingReview` status
    pub fn new(
        topic: Topic,
        canonical_name: impl Into<String>,
        display_name: impl Into<String>,
        description: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: SubcategoryId::new(),
            topic,
            canonical_name: canonical_name.into(),
            display_name: display_name.into(),
            description,
            aliases: BTreeSet::new(),
            parent_id: None,
            status: SubcategoryStatus::PendingReview,
            usage_count: 0,
            confirmations: 0,
            rejections: 0,
            confidence_stats: ConfidenceStats::default(),
            merged_into: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_merged(&self) -> bool {
        self.status == SubcategoryStatus::Merged
    }

    /// Whether this entry may be offered as a classification target
    pub fn is_offerable(&self) -> bool {
        matches!(
            self.status,
            SubcategoryStatus::Active | SubcategoryStatus::PendingReview
        )
    }

    /// Exact match against the canonical name or any alias
    pub fn matches_label(&self, label: &str) -> bool {
        self.canonical_name == label || self.aliases.contains(label)
    }

    /// Confirmations over total feedback, if any feedback exists
    pub fn satisfaction_rate(&self) -> Option<f32> {
        let total = self.confirmations + self.rejections;
        if total == 0 {
            None
        } else {
            Some(self.confirmations as f32 / total as f32)
        }
    }
}

/// Creation payload for `compare_and_create`
///
/// The canonical name travels separately as the creation key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSubcategory {
    pub display_name: String,
    pub description: Option<String>,
    pub aliases: BTreeSet<String>,
    pub parent_id: Option<SubcategoryId>,
}

/// Free-text context accompanying a classification request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextContext {
    pub title: String,
    pub description: String,
    pub location_hint: Option<String>,
    pub media_hints: Vec<String>,
}

impl TextContext {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            location_hint: None,
            media_hints: Vec::new(),
        }
    }

    /// Render the full classification text
    pub fn combined(&self) -> String {
        let mut text = format!("{} {}", self.title, self.description);
        if let Some(loc) = &self.location_hint {
            text.push(' ');
            text.push_str(loc);
        }
        for hint in &self.media_hints {
            text.push(' ');
            text.push_str(hint);
        }
        text
    }
}

/// A request to classify free text under a topic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationRequest {
    pub topic: Topic,
    pub context: TextContext,

    /// Overrides the configured acceptance threshold when set
    pub min_confidence_threshold: Option<f32>,
}

impl ClassificationRequest {
    pub fn new(topic: Topic, context: TextContext) -> Self {
        Self {
            topic,
            context,
            min_confidence_threshold: None,
        }
    }
}

/// Which classification strategy produced an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    Ai,
    Rule,
    Fallback,
}

impl ClassificationSource {
    pub const ALL: [ClassificationSource; 3] = [
        ClassificationSource::Ai,
        ClassificationSource::Rule,
        ClassificationSource::Fallback,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationSource::Ai => "ai",
            ClassificationSource::Rule => "rule",
            ClassificationSource::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for ClassificationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Final result of one classification request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationOutcome {
    pub outcome_id: OutcomeId,
    pub subcategory_id: SubcategoryId,
    pub resolved_name: String,
    pub display_name: String,

    /// Always in [0, 1]; rule outcomes are capped at the rule ceiling
    pub confidence: f32,
    pub source: ClassificationSource,
    pub is_new_subcategory: bool,

    /// False when the taxonomy store was unreachable. The outcome is
    /// still usable, but nothing was recorded; the caller may retry
    /// persistence later.
    pub persisted: bool,

    pub reasoning: Option<String>,
    pub alternatives: Vec<String>,
}

/// User feedback on a classification outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub outcome_id: OutcomeId,
    pub confirmed: bool,
    pub timestamp: DateTime<Utc>,
}

/// Acknowledgement returned from feedback submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackAck {
    pub outcome_id: OutcomeId,
    pub subcategory_id: SubcategoryId,

    /// Entry status after any lifecycle transition triggered by this
    /// feedback (promotion or deprecation)
    pub status_after: SubcategoryStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_stats_running_mean() {
        let mut stats = ConfidenceStats::default();
        stats.record(0.8);
        stats.record(0.6);
        assert_eq!(stats.samples, 2);
        assert!((stats.mean - 0.7).abs() < 1e-6);

        // Out-of-range values are clamped
        stats.record(1.5);
        assert!(stats.mean <= 1.0);
    }

    #[test]
    fn test_confidence_stats_absorb() {
        let mut a = ConfidenceStats {
            mean: 0.8,
            samples: 3,
        };
        let b = ConfidenceStats {
            mean: 0.4,
            samples: 1,
        };
        a.absorb(&b);
        assert_eq!(a.samples, 4);
        assert!((a.mean - 0.7).abs() < 1e-6);

        let mut empty = ConfidenceStats::default();
        empty.absorb(&ConfidenceStats::default());
        assert_eq!(empty.samples, 0);
    }

    #[test]
    fn test_topic_roundtrip() {
        for topic in Topic::ALL {
            let json = serde_json::to_string(&topic).unwrap();
            let back: Topic = serde_json::from_str(&json).unwrap();
            assert_eq!(topic, back);
        }
        assert_eq!(Topic::Traffic.to_string(), "traffic");
    }

    #[test]
    fn test_matches_label() {
        let mut entry = Subcategory::new(Topic::Traffic, "accident", "Accident", None);
        entry.aliases.insert("collision".to_string());

        assert!(entry.matches_label("accident"));
        assert!(entry.matches_label("collision"));
        assert!(!entry.matches_label("congestion"));
    }

    #[test]
    fn test_satisfaction_rate() {
        let mut entry = Subcategory::new(Topic::Weather, "flood", "Flood", None);
        assert_eq!(entry.satisfaction_rate(), None);

        entry.confirmations = 3;
        entry.rejections = 1;
        assert_eq!(entry.satisfaction_rate(), Some(0.75));
    }

    #[test]
    fn test_combined_context() {
        let mut ctx = TextContext::new("Flooded underpass", "water rising fast");
        ctx.location_hint = Some("5th avenue".to_string());
        let text = ctx.combined();
        assert!(text.contains("Flooded underpass"));
        assert!(text.contains("5th avenue"));
    }
}
