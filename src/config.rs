//! Configuration for the taxonomy engine
//!
//! All classification thresholds and lifecycle policy parameters live
//! here as explicit configuration rather than constants in the code.
//! Values can be loaded from a TOML file with `LINNAEUS_*` environment
//! overrides layered on top.

use crate::error::Result;
use crate::types::Subcategory;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Thresholds steering the ordered-fallback classification pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierThresholds {
    /// AI predictions below this confidence fall through to the rule path
    pub min_confidence: f32,

    /// Rule matches scoring below this floor report "no match" rather
    /// than a low-confidence guess
    pub rule_score_floor: f32,

    /// Rule-based outcomes never claim confidence above this ceiling
    pub rule_confidence_ceiling: f32,

    /// Similarity at or above this blocks creation and attaches an alias
    /// to the existing entry instead
    pub similarity_attach: f32,

    /// Confidence assigned to fallback-proposed new subcategories
    pub new_subcategory_confidence: f32,

    /// Per-request bound on the external classification call
    pub ai_timeout_ms: u64,
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        Self {
            min_confidence: 0.7,
            rule_score_floor: 0.3,
            rule_confidence_ceiling: 0.5,
            similarity_attach: 0.8,
            new_subcategory_confidence: 0.4,
            ai_timeout_ms: 3000,
        }
    }
}

/// Policy parameters driving subcategory promotion and deprecation
///
/// Promotion fires on either threshold: enough usages OR enough
/// confirmations. Deprecation requires a minimum feedback volume before
/// the rejection ratio is considered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecyclePolicy {
    pub promote_min_usages: u64,
    pub promote_min_confirmations: u64,
    pub deprecate_min_feedback: u64,
    pub deprecate_max_rejection_ratio: f32,
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self {
            promote_min_usages: 10,
            promote_min_confirmations: 3,
            deprecate_min_feedback: 5,
            deprecate_max_rejection_ratio: 0.6,
        }
    }
}

impl LifecyclePolicy {
    /// Whether a pending entry has crossed the promotion policy
    pub fn should_promote(&self, entry: &Subcategory) -> bool {
        entry.status == crate::types::SubcategoryStatus::PendingReview
            && (entry.usage_count >= self.promote_min_usages
                || entry.confirmations >= self.promote_min_confirmations)
    }

    /// Whether an active entry has accumulated enough rejections to be
    /// pulled from the set of classification targets
    pub fn should_deprecate(&self, entry: &Subcategory) -> bool {
        if entry.status != crate::types::SubcategoryStatus::Active {
            return false;
        }
        let total = entry.confirmations + entry.rejections;
        if total < self.deprecate_min_feedback {
            return false;
        }
        let rejection_ratio = entry.rejections as f32 / total as f32;
        rejection_ratio > self.deprecate_max_rejection_ratio
    }
}

/// Settings for the LLM-backed classification adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Model identifier sent to the messages API
    pub model: String,
    pub max_tokens: usize,
    pub temperature: f32,
    pub api_url: String,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: "claude-3-5-haiku-20241022".to_string(),
            max_tokens: 512,
            temperature: 0.2,
            api_url: "https://api.anthropic.com/v1/messages".to_string(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LinnaeusConfig {
    pub thresholds: ClassifierThresholds,
    pub lifecycle: LifecyclePolicy,
    pub llm: LlmSettings,
}

impl LinnaeusConfig {
    /// Load from a TOML file, with `LINNAEUS_*` environment variables
    /// layered on top (e.g. `LINNAEUS_THRESHOLDS__MIN_CONFIDENCE=0.8`)
    pub fn from_file(path: &Path) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(config::Environment::with_prefix("LINNAEUS").separator("__"))
            .build()?;
        Ok(cfg.try_deserialize()?)
    }

    /// Defaults plus environment overrides, no file required
    pub fn load() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::with_prefix("LINNAEUS").separator("__"))
            .build()?;
        let mut loaded: LinnaeusConfig = cfg.try_deserialize()?;
        loaded.clamp();
        Ok(loaded)
    }

    /// Force all ratio-valued settings into [0, 1]
    pub fn clamp(&mut self) {
        let t = &mut self.thresholds;
        t.min_confidence = t.min_confidence.clamp(0.0, 1.0);
        t.rule_score_floor = t.rule_score_floor.clamp(0.0, 1.0);
        t.rule_confidence_ceiling = t.rule_confidence_ceiling.clamp(0.0, 1.0);
        t.similarity_attach = t.similarity_attach.clamp(0.0, 1.0);
        t.new_subcategory_confidence = t.new_subcategory_confidence.clamp(0.0, 1.0);
        self.lifecycle.deprecate_max_rejection_ratio =
            self.lifecycle.deprecate_max_rejection_ratio.clamp(0.0, 1.0);
    }
}
