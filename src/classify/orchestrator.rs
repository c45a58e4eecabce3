//! Classification orchestrator
//!
//! Composes the AI adapter, rule-based classifier, similarity matcher and
//! taxonomy store into a single ordered-fallback pipeline. Classification
//! always produces *some* outcome: AI first, rules second, similarity
//! attach third, new-subcategory proposal last. Store outages degrade to
//! `persisted = false` outcomes instead of errors, so event processing is
//! never blocked by taxonomy-store trouble.

use super::{naming, rules, similarity};
use crate::config::ClassifierThresholds;
use crate::services::{LabelPrediction, TextClassifier};
use crate::storage::TaxonomyStore;
use crate::types::{
    ClassificationOutcome, ClassificationRequest, ClassificationSource, NewSubcategory,
    OutcomeId, Subcategory, SubcategoryId, Topic,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Orchestrates one classification request through the fallback chain
pub struct ClassificationEngine {
    store: Arc<dyn TaxonomyStore>,
    classifier: Arc<dyn TextClassifier>,
    thresholds: ClassifierThresholds,
}

impl ClassificationEngine {
    pub fn new(
        store: Arc<dyn TaxonomyStore>,
        classifier: Arc<dyn TextClassifier>,
        thresholds: ClassifierThresholds,
    ) -> Self {
        Self {
            store,
            classifier,
            thresholds,
        }
    }

    /// Classify free text under a topic
    ///
    /// Always returns an outcome: every failure mode inside the pipeline
    /// falls through to a cheaper step, down to proposing a new
    /// `pending_review` entry.
    pub async fn classify(&self, request: &ClassificationRequest) -> ClassificationOutcome {
        let topic = request.topic;
        let threshold = request
            .min_confidence_threshold
            .unwrap_or(self.thresholds.min_confidence)
            .clamp(0.0, 1.0);
        let text = request.context.combined();

        let candidates = self.offerable_candidates(topic).await;
        let labels: Vec<String> = candidates
            .iter()
            .map(|e| e.canonical_name.clone())
            .collect();

        // Step 1: AI adapter, bounded by its timeout
        let timeout = Duration::from_millis(self.thresholds.ai_timeout_ms);
        match self
            .classifier
            .classify(topic, &text, &labels, timeout)
            .await
        {
            Ok(prediction) if prediction.confidence >= threshold => {
                return self
                    .resolve_accepted_label(topic, prediction, &candidates)
                    .await;
            }
            Ok(prediction) => {
                debug!(
                    topic = %topic,
                    confidence = prediction.confidence,
                    "AI prediction below threshold, falling back to rules"
                );
            }
            Err(e) => {
                debug!(topic = %topic, error = %e, "AI adapter unavailable, falling back to rules");
            }
        }

        // Step 2: deterministic rule-based match
        if let Some(m) = rules::best_match(&candidates, &text, self.thresholds.rule_score_floor) {
            if let Some(entry) = candidates.iter().find(|e| e.id == m.subcategory_id) {
                let confidence = m.score.min(self.thresholds.rule_confidence_ceiling);
                return self.outcome_for_existing(entry, ClassificationSource::Rule, confidence);
            }
        }

        // Step 3: similarity against a name derived from the text
        let candidate_name = naming::derive_candidate_name(&text);
        if let Some((entry, score)) =
            similarity::best_match(&candidates, &candidate_name, self.thresholds.similarity_attach)
        {
            let attached = self.attach_alias_lenient(entry, &candidate_name).await;
            return self.outcome_for_existing(&attached, ClassificationSource::Fallback, score);
        }

        // Step 4: propose a new subcategory
        self.propose_new(
            topic,
            candidate_name,
            ClassificationSource::Fallback,
            self.thresholds.new_subcategory_confidence,
            None,
            Vec::new(),
        )
        .await
    }

    /// Offerable classification targets for a topic; a store outage here
    /// degrades to an empty candidate set rather than failing the request
    async fn offerable_candidates(&self, topic: Topic) -> Vec<Subcategory> {
        match self.store.list_topic(topic, None).await {
            Ok(entries) => entries.into_iter().filter(|e| e.is_offerable()).collect(),
            Err(e) => {
                warn!(topic = %topic, error = %e, "store unavailable while listing candidates");
                Vec::new()
            }
        }
    }

    /// An accepted AI label still has to land on one entity: resolve it
    /// against existing names/aliases, then near-duplicates, and only
    /// then create it
    async fn resolve_accepted_label(
        &self,
        topic: Topic,
        prediction: LabelPrediction,
        candidates: &[Subcategory],
    ) -> ClassificationOutcome {
        let LabelPrediction {
            label,
            confidence,
            reasoning,
            alternatives,
            ..
        } = prediction;
        // Adapters are not trusted to emit canonical-form labels
        let label = naming::normalize_name(&label);

        match self.store.find_by_name_or_alias(topic, &label).await {
            Ok(Some(entry)) => {
                let entry = if entry.is_merged() {
                    match self.store.resolve(entry.id).await {
                        Ok(resolved) => resolved,
                        Err(e) => {
                            warn!(error = %e, "failed to resolve merged entry, using it as-is");
                            entry
                        }
                    }
                } else {
                    entry
                };
                let mut outcome =
                    self.outcome_for_existing(&entry, ClassificationSource::Ai, confidence);
                outcome.reasoning = reasoning;
                outcome.alternatives = alternatives;
                return outcome;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "store lookup failed for AI label, matching against cached candidates");
            }
        }

        if let Some((entry, _)) =
            similarity::best_match(candidates, &label, self.thresholds.similarity_attach)
        {
            let attached = self.attach_alias_lenient(entry, &label).await;
            let mut outcome =
                self.outcome_for_existing(&attached, ClassificationSource::Ai, confidence);
            outcome.reasoning = reasoning;
            outcome.alternatives = alternatives;
            return outcome;
        }

        self.propose_new(
            topic,
            label,
            ClassificationSource::Ai,
            confidence,
            reasoning,
            alternatives,
        )
        .await
    }

    /// Attach an alias, keeping the original entry when the store refuses
    /// (conflict or outage); classification still succeeds either way
    async fn attach_alias_lenient(&self, entry: &Subcategory, alias: &str) -> Subcategory {
        if entry.matches_label(alias) {
            return entry.clone();
        }
        match self.store.attach_alias(entry.id, alias).await {
            Ok(updated) => updated,
            Err(e) => {
                debug!(
                    subcategory = %entry.canonical_name,
                    alias = %alias,
                    error = %e,
                    "alias attach skipped"
                );
                entry.clone()
            }
        }
    }

    fn outcome_for_existing(
        &self,
        entry: &Subcategory,
        source: ClassificationSource,
        confidence: f32,
    ) -> ClassificationOutcome {
        ClassificationOutcome {
            outcome_id: OutcomeId::new(),
            subcategory_id: entry.id,
            resolved_name: entry.canonical_name.clone(),
            display_name: entry.display_name.clone(),
            confidence: confidence.clamp(0.0, 1.0),
            source,
            is_new_subcategory: false,
            persisted: true,
            reasoning: None,
            alternatives: Vec::new(),
        }
    }

    async fn propose_new(
        &self,
        topic: Topic,
        canonical_name: String,
        source: ClassificationSource,
        confidence: f32,
        reasoning: Option<String>,
        alternatives: Vec<String>,
    ) -> ClassificationOutcome {
        let display_name = naming::display_name_from(&canonical_name);
        let payload = NewSubcategory {
            display_name: display_name.clone(),
            description: reasoning.clone(),
            ..Default::default()
        };

        match self
            .store
            .compare_and_create(topic, &canonical_name, payload)
            .await
        {
            Ok((entry, created)) => {
                if created {
                    debug!(topic = %topic, name = %canonical_name, "created new subcategory");
                }
                ClassificationOutcome {
                    outcome_id: OutcomeId::new(),
                    subcategory_id: entry.id,
                    resolved_name: entry.canonical_name,
                    display_name: entry.display_name,
                    confidence: confidence.clamp(0.0, 1.0),
                    source,
                    is_new_subcategory: created,
                    persisted: true,
                    reasoning,
                    alternatives,
                }
            }
            Err(e) => {
                warn!(
                    topic = %topic,
                    name = %canonical_name,
                    error = %e,
                    "store unreachable during create; returning unpersisted outcome"
                );
                ClassificationOutcome {
                    outcome_id: OutcomeId::new(),
                    subcategory_id: SubcategoryId::new(),
                    resolved_name: canonical_name,
                    display_name,
                    confidence: confidence.clamp(0.0, 1.0),
                    source,
                    is_new_subcategory: true,
                    persisted: false,
                    reasoning,
                    alternatives,
                }
            }
        }
    }
}
