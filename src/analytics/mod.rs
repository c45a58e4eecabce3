//! Analytics and feedback aggregation
//!
//! Tracks usage counts and running confidence per subcategory and per
//! classification source, accepts user feedback, and drives the
//! subcategory lifecycle: pending entries crossing the promotion policy
//! become active, rejection-heavy active entries are deprecated. All
//! increments are commutative (counters and running means), so concurrent
//! classification requests need no coordination here.

use crate::config::LifecyclePolicy;
use crate::error::{Result, TaxonomyError};
use crate::storage::TaxonomyStore;
use crate::types::{
    ClassificationOutcome, ClassificationSource, ConfidenceStats, FeedbackAck, OutcomeId,
    Subcategory, SubcategoryId, SubcategoryStatus, Topic,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// What the aggregator remembers about one outcome, so later feedback can
/// be validated and attributed to the producing source
#[derive(Debug, Clone)]
struct RecordedOutcome {
    topic: Topic,
    subcategory_id: SubcategoryId,
    source: ClassificationSource,
}

/// Accumulated accuracy signal for one classification source
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SourceStats {
    pub confidence: ConfidenceStats,
    pub confirmations: u64,
    pub rejections: u64,
}

impl SourceStats {
    /// Feedback agreement ratio, if any feedback exists
    pub fn accuracy(&self) -> Option<f32> {
        let total = self.confirmations + self.rejections;
        if total == 0 {
            None
        } else {
            Some(self.confirmations as f32 / total as f32)
        }
    }
}

/// Per-topic slice of the taxonomy for the overview report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicDistribution {
    pub topic: Topic,
    pub total: usize,
    pub active: usize,
    pub pending_review: usize,
    pub deprecated: usize,
    pub merged: usize,
    pub top_used: Vec<UsageRankEntry>,
}

/// One row of the flat usage ranking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRankEntry {
    pub subcategory_id: SubcategoryId,
    pub canonical_name: String,
    pub topic: Topic,
    pub status: SubcategoryStatus,
    pub usage_count: u64,
    pub mean_confidence: f32,
}

/// On-demand aggregate overview
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsOverview {
    pub total_subcategories: usize,
    pub by_topic: Vec<TopicDistribution>,
    pub generated_at: DateTime<Utc>,
}

/// Per-source performance row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcePerformance {
    pub source: ClassificationSource,
    pub outcomes: u64,
    pub mean_confidence: f32,
    pub confirmations: u64,
    pub rejections: u64,
    pub accuracy: Option<f32>,
}

/// Entry flagged for operator attention
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewFlag {
    pub subcategory_id: SubcategoryId,
    pub canonical_name: String,
    pub topic: Topic,
    pub reason: String,
}

/// On-demand performance report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub total_subcategories: usize,
    pub total_usage: u64,
    pub total_feedback: u64,
    pub overall_satisfaction: Option<f32>,
    pub sources: Vec<SourcePerformance>,
    pub usage_ranking: Vec<UsageRankEntry>,
    pub needs_review: Vec<ReviewFlag>,
    pub generated_at: DateTime<Utc>,
}

/// Mean confidence below this, with enough samples, flags an entry
const REVIEW_CONFIDENCE_FLOOR: f32 = 0.5;
const REVIEW_MIN_SAMPLES: u64 = 3;

/// Usage and feedback aggregator
pub struct UsageAggregator {
    store: Arc<dyn TaxonomyStore>,
    policy: LifecyclePolicy,
    outcomes: RwLock<HashMap<OutcomeId, RecordedOutcome>>,
    source_stats: RwLock<HashMap<ClassificationSource, SourceStats>>,
}

impl UsageAggregator {
    pub fn new(store: Arc<dyn TaxonomyStore>, policy: LifecyclePolicy) -> Self {
        Self {
            store,
            policy,
            outcomes: RwLock::new(HashMap::new()),
            source_stats: RwLock::new(HashMap::new()),
        }
    }

    /// Record one classification outcome
    ///
    /// Registers the outcome for later feedback, updates per-source
    /// stats, increments the entry's usage in the store and evaluates the
    /// promotion policy. A store failure downgrades the outcome to
    /// `persisted = false` instead of surfacing an error.
    pub async fn record_outcome(&self, topic: Topic, outcome: &mut ClassificationOutcome) {
        self.outcomes.write().await.insert(
            outcome.outcome_id,
            RecordedOutcome {
                topic,
                subcategory_id: outcome.subcategory_id,
                source: outcome.source,
            },
        );

        {
            let mut stats = self.source_stats.write().await;
            stats
                .entry(outcome.source)
                .or_default()
                .confidence
                .record(outcome.confidence);
        }

        if !outcome.persisted {
            return;
        }

        if let Err(e) = self
            .store
            .record_usage(outcome.subcategory_id, outcome.confidence)
            .await
        {
            warn!(
                subcategory = %outcome.subcategory_id,
                error = %e,
                "failed to record usage; outcome not persisted"
            );
            outcome.persisted = false;
            return;
        }

        self.evaluate_lifecycle(outcome.subcategory_id).await;
    }

    /// Accept user feedback on a previously returned outcome
    ///
    /// Unknown outcome ids are rejected and mutate nothing.
    pub async fn submit_feedback(
        &self,
        outcome_id: OutcomeId,
        confirmed: bool,
    ) -> Result<FeedbackAck> {
        let recorded = {
            let registry = self.outcomes.read().await;
            registry
                .get(&outcome_id)
                .cloned()
                .ok_or_else(|| TaxonomyError::OutcomeNotFound(outcome_id.to_string()))?
        };

        debug!(
            outcome = %outcome_id,
            confirmed = confirmed,
            topic = %recorded.topic,
            "feedback received"
        );

        let entry = self
            .store
            .record_feedback(recorded.subcategory_id, confirmed)
            .await?;

        {
            let mut stats = self.source_stats.write().await;
            let s = stats.entry(recorded.source).or_default();
            if confirmed {
                s.confirmations += 1;
            } else {
                s.rejections += 1;
            }
        }

        let status_after = self.apply_lifecycle(&entry).await;

        Ok(FeedbackAck {
            outcome_id,
            subcategory_id: entry.id,
            status_after,
        })
    }

    /// Re-read an entry and apply the lifecycle policy to it
    async fn evaluate_lifecycle(&self, id: SubcategoryId) {
        match self.store.get(id).await {
            Ok(entry) => {
                self.apply_lifecycle(&entry).await;
            }
            Err(e) => {
                debug!(subcategory = %id, error = %e, "lifecycle evaluation skipped");
            }
        }
    }

    /// Apply promotion/deprecation against a snapshot of the entry.
    /// Idempotent: promoting an already-active entry is a store no-op.
    async fn apply_lifecycle(&self, entry: &Subcategory) -> SubcategoryStatus {
        if self.policy.should_promote(entry) {
            match self
                .store
                .set_status(entry.id, SubcategoryStatus::Active)
                .await
            {
                Ok(updated) => {
                    info!(
                        subcategory = %entry.canonical_name,
                        topic = %entry.topic,
                        "promoted to active"
                    );
                    return updated.status;
                }
                Err(e) => {
                    debug!(subcategory = %entry.id, error = %e, "promotion skipped");
                }
            }
        } else if self.policy.should_deprecate(entry) {
            match self
                .store
                .set_status(entry.id, SubcategoryStatus::Deprecated)
                .await
            {
                Ok(updated) => {
                    warn!(
                        subcategory = %entry.canonical_name,
                        topic = %entry.topic,
                        rejections = entry.rejections,
                        "deprecated after rejection-heavy feedback"
                    );
                    return updated.status;
                }
                Err(e) => {
                    debug!(subcategory = %entry.id, error = %e, "deprecation skipped");
                }
            }
        }
        entry.status
    }

    /// Per-topic distribution of the taxonomy
    pub async fn overview(&self) -> Result<AnalyticsOverview> {
        let mut by_topic = Vec::with_capacity(Topic::ALL.len());
        let mut total = 0;

        for topic in Topic::ALL {
            let entries = self.store.list_topic(topic, None).await?;
            total += entries.len();

            let count = |status: SubcategoryStatus| {
                entries.iter().filter(|e| e.status == status).count()
            };

            let mut ranked: Vec<&Subcategory> = entries.iter().collect();
            ranked.sort_by(|a, b| b.usage_count.cmp(&a.usage_count));
            let top_used = ranked
                .into_iter()
                .take(5)
                .filter(|e| e.usage_count > 0)
                .map(rank_entry)
                .collect();

            by_topic.push(TopicDistribution {
                topic,
                total: entries.len(),
                active: count(SubcategoryStatus::Active),
                pending_review: count(SubcategoryStatus::PendingReview),
                deprecated: count(SubcategoryStatus::Deprecated),
                merged: count(SubcategoryStatus::Merged),
                top_used,
            });
        }

        Ok(AnalyticsOverview {
            total_subcategories: total,
            by_topic,
            generated_at: Utc::now(),
        })
    }

    /// Usage ranking, per-source accuracy and review flags
    pub async fn performance_report(&self, topic: Option<Topic>) -> Result<PerformanceReport> {
        let mut entries = Vec::new();
        match topic {
            Some(t) => entries.extend(self.store.list_topic(t, None).await?),
            None => {
                for t in Topic::ALL {
                    entries.extend(self.store.list_topic(t, None).await?);
                }
            }
        }

        let total_usage: u64 = entries.iter().map(|e| e.usage_count).sum();
        let total_confirmations: u64 = entries.iter().map(|e| e.confirmations).sum();
        let total_feedback: u64 = entries
            .iter()
            .map(|e| e.confirmations + e.rejections)
            .sum();
        let overall_satisfaction = if total_feedback == 0 {
            None
        } else {
            Some(total_confirmations as f32 / total_feedback as f32)
        };

        let sources = {
            let stats = self.source_stats.read().await;
            ClassificationSource::ALL
                .iter()
                .map(|source| {
                    let s = stats.get(source).copied().unwrap_or_default();
                    SourcePerformance {
                        source: *source,
                        outcomes: s.confidence.samples,
                        mean_confidence: s.confidence.mean,
                        confirmations: s.confirmations,
                        rejections: s.rejections,
                        accuracy: s.accuracy(),
                    }
                })
                .collect()
        };

        let mut ranked: Vec<&Subcategory> =
            entries.iter().filter(|e| !e.is_merged()).collect();
        ranked.sort_by(|a, b| b.usage_count.cmp(&a.usage_count));
        let usage_ranking: Vec<UsageRankEntry> =
            ranked.iter().map(|e| rank_entry(e)).collect();

        let needs_review = entries
            .iter()
            .filter(|e| !e.is_merged())
            .filter_map(|e| {
                let low_confidence = e.confidence_stats.samples >= REVIEW_MIN_SAMPLES
                    && e.confidence_stats.mean < REVIEW_CONFIDENCE_FLOOR;
                let rejection_heavy = e.rejections > e.confirmations && e.rejections > 0;
                let reason = if low_confidence {
                    "low mean confidence"
                } else if rejection_heavy {
                    "high rejection rate"
                } else {
                    return None;
                };
                Some(ReviewFlag {
                    subcategory_id: e.id,
                    canonical_name: e.canonical_name.clone(),
                    topic: e.topic,
                    reason: reason.to_string(),
                })
            })
            .collect();

        Ok(PerformanceReport {
            total_subcategories: entries.len(),
            total_usage,
            total_feedback,
            overall_satisfaction,
            sources,
            usage_ranking,
            needs_review,
            generated_at: Utc::now(),
        })
    }

    /// Number of outcomes currently registered for feedback
    pub async fn tracked_outcomes(&self) -> usize {
        self.outcomes.read().await.len()
    }
}

fn rank_entry(e: &Subcategory) -> UsageRankEntry {
    UsageRankEntry {
        subcategory_id: e.id,
        canonical_name: e.canonical_name.clone(),
        topic: e.topic,
        status: e.status,
        usage_count: e.usage_count,
        mean_confidence: e.confidence_stats.mean,
    }
}
