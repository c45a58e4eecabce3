//! Inbound service facade
//!
//! `SubcategoryService` is the sole entry point consumed by the
//! surrounding event-processing flow: classification, listing,
//! suggestions, feedback and analytics. It wires the classification
//! engine and the usage aggregator over one shared store.

use crate::analytics::{AnalyticsOverview, PerformanceReport, UsageAggregator};
use crate::classify::{naming, similarity, ClassificationEngine};
use crate::config::LinnaeusConfig;
use crate::error::Result;
use crate::services::TextClassifier;
use crate::storage::TaxonomyStore;
use crate::types::{
    ClassificationOutcome, ClassificationRequest, FeedbackAck, OutcomeId, Subcategory,
    SubcategoryId, SubcategoryStatus, Topic,
};
use std::sync::Arc;
use tracing::info;

/// Facade over the classification pipeline and taxonomy analytics
pub struct SubcategoryService {
    store: Arc<dyn TaxonomyStore>,
    engine: ClassificationEngine,
    analytics: Arc<UsageAggregator>,
}

impl SubcategoryService {
    pub fn new(
        store: Arc<dyn TaxonomyStore>,
        classifier: Arc<dyn TextClassifier>,
        config: LinnaeusConfig,
    ) -> Self {
        let engine =
            ClassificationEngine::new(store.clone(), classifier, config.thresholds.clone());
        let analytics = Arc::new(UsageAggregator::new(store.clone(), config.lifecycle.clone()));
        Self {
            store,
            engine,
            analytics,
        }
    }

    /// Classify free text under a topic
    ///
    /// Always produces an outcome; the outcome is recorded by the
    /// analytics aggregator regardless of which pipeline branch produced
    /// it.
    pub async fn classify_subcategory(
        &self,
        request: ClassificationRequest,
    ) -> ClassificationOutcome {
        let topic = request.topic;
        let mut outcome = self.engine.classify(&request).await;
        self.analytics.record_outcome(topic, &mut outcome).await;

        info!(
            topic = %topic,
            subcategory = %outcome.resolved_name,
            source = %outcome.source,
            confidence = outcome.confidence,
            new = outcome.is_new_subcategory,
            persisted = outcome.persisted,
            "classified"
        );
        outcome
    }

    /// List subcategories under a topic, optionally filtered by status
    pub async fn list_subcategories(
        &self,
        topic: Topic,
        status: Option<SubcategoryStatus>,
    ) -> Result<Vec<Subcategory>> {
        let mut entries = self.store.list_topic(topic, status).await?;
        entries.sort_by(|a, b| b.usage_count.cmp(&a.usage_count));
        Ok(entries)
    }

    /// Rank existing subcategories against a free-text query
    pub async fn suggest_subcategories(
        &self,
        topic: Topic,
        query: &str,
        limit: usize,
    ) -> Result<Vec<(Subcategory, f32)>> {
        let entries = self.store.list_topic(topic, None).await?;
        let candidate = naming::normalize_name(query);
        Ok(similarity::rank(&entries, &candidate, limit)
            .into_iter()
            .map(|(e, s)| (e.clone(), s))
            .collect())
    }

    /// Submit user feedback on a classification outcome
    pub async fn submit_feedback(
        &self,
        outcome_id: OutcomeId,
        confirmed: bool,
    ) -> Result<FeedbackAck> {
        self.analytics.submit_feedback(outcome_id, confirmed).await
    }

    /// Per-topic distribution of the taxonomy
    pub async fn analytics_overview(&self) -> Result<AnalyticsOverview> {
        self.analytics.overview().await
    }

    /// Usage ranking, per-source accuracy and review flags
    pub async fn performance_report(&self, topic: Option<Topic>) -> Result<PerformanceReport> {
        self.analytics.performance_report(topic).await
    }

    /// Follow merge redirects to the terminal entry for an id
    pub async fn resolve(&self, id: SubcategoryId) -> Result<Subcategory> {
        self.store.resolve(id).await
    }
}
