//! AI classification adapter
//!
//! Defines the contract for the external text-classification capability
//! and an LLM-backed implementation. The core treats the model as a black
//! box with exactly three outcomes per call: success with usable
//! confidence, success with weak confidence, or failure/timeout. A failed
//! or slow call affects only its own request; every call is bounded by an
//! explicit timeout and the orchestrator always has a synchronous fallback.

use crate::classify::naming;
use crate::config::LlmSettings;
use crate::error::{Result, TaxonomyError};
use crate::types::Topic;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::debug;

/// One prediction from the external classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelPrediction {
    /// Canonical-form label; may name an entry that does not exist yet
    pub label: String,

    /// Always clamped into [0, 1]
    pub confidence: f32,

    /// The model believes no candidate label fits and proposes a new one
    pub is_new: bool,

    pub reasoning: Option<String>,
    pub alternatives: Vec<String>,
}

/// External text-classification capability
///
/// `classify(text, candidate_labels, timeout) -> prediction | failure`.
/// Implementations must return within `timeout`; the orchestrator treats
/// any error as "adapter unavailable for this request".
#[async_trait]
pub trait TextClassifier: Send + Sync {
    async fn classify(
        &self,
        topic: Topic,
        text: &str,
        candidate_labels: &[String],
        timeout: Duration,
    ) -> Result<LabelPrediction>;
}

/// Anthropic API message format
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: usize,
    temperature: f32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

/// Anthropic API response format
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    text: String,
}

/// Shape the model is prompted to emit
#[derive(Debug, Deserialize)]
struct RawPrediction {
    label: String,
    #[serde(default = "default_confidence")]
    confidence: f32,
    #[serde(default)]
    is_new_subcategory: bool,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    alternatives: Vec<String>,
}

fn default_confidence() -> f32 {
    0.5
}

/// LLM-backed classifier
pub struct LlmClassifier {
    settings: LlmSettings,
    api_key: String,
    client: reqwest::Client,
}

impl LlmClassifier {
    /// Create a new classifier; the API key comes from `LINNAEUS_API_KEY`
    /// or `ANTHROPIC_API_KEY`
    pub fn new(settings: LlmSettings) -> Result<Self> {
        let api_key = env::var("LINNAEUS_API_KEY")
            .or_else(|_| env::var("ANTHROPIC_API_KEY"))
            .unwrap_or_default();
        if api_key.is_empty() {
            return Err(TaxonomyError::Config(config::ConfigError::Message(
                "LINNAEUS_API_KEY / ANTHROPIC_API_KEY not set".to_string(),
            )));
        }

        Ok(Self {
            settings,
            api_key,
            client: reqwest::Client::new(),
        })
    }

    fn build_prompt(topic: Topic, text: &str, candidate_labels: &[String]) -> String {
        let existing = if candidate_labels.is_empty() {
            "(none yet)".to_string()
        } else {
            candidate_labels.join(", ")
        };

        format!(
            r#"You are an incident classification expert. Classify the following report into the most appropriate subcategory.

TOPIC: {topic}
REPORT: {text}

EXISTING SUBCATEGORIES for {topic}: {existing}

INSTRUCTIONS:
1. If the report clearly fits an existing subcategory, use that exact name
2. If no existing subcategory is appropriate, suggest a NEW subcategory name
3. Use lowercase with underscores for spaces (e.g. "signal_issue" not "Signal Issue")
4. Keep subcategory names concise but descriptive
5. Provide a confidence score between 0.0 and 1.0

RESPONSE FORMAT (JSON only):
{{
    "label": "exact_subcategory_name",
    "confidence": 0.85,
    "is_new_subcategory": false,
    "reasoning": "Brief explanation of why this subcategory was chosen",
    "alternatives": ["alt1", "alt2"]
}}

Respond with ONLY the JSON, no other text."#
        )
    }

    async fn call_api(&self, prompt: &str) -> Result<String> {
        let request = AnthropicRequest {
            model: self.settings.model.clone(),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post(&self.settings.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<AnthropicResponse>()
            .await?;

        response
            .content
            .first()
            .map(|c| c.text.clone())
            .ok_or_else(|| TaxonomyError::Classifier("empty model response".to_string()))
    }

    fn parse_prediction(raw: &str) -> Result<LabelPrediction> {
        // Models occasionally wrap the JSON in a Markdown fence
        let cleaned = raw
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();

        let parsed: RawPrediction = serde_json::from_str(cleaned)?;

        Ok(LabelPrediction {
            label: naming::normalize_name(&parsed.label),
            confidence: parsed.confidence.clamp(0.0, 1.0),
            is_new: parsed.is_new_subcategory,
            reasoning: parsed.reasoning,
            alternatives: parsed
                .alternatives
                .iter()
                .map(|a| naming::normalize_name(a))
                .collect(),
        })
    }
}

#[async_trait]
impl TextClassifier for LlmClassifier {
    async fn classify(
        &self,
        topic: Topic,
        text: &str,
        candidate_labels: &[String],
        timeout: Duration,
    ) -> Result<LabelPrediction> {
        let prompt = Self::build_prompt(topic, text, candidate_labels);

        let response = tokio::time::timeout(timeout, self.call_api(&prompt))
            .await
            .map_err(|_| {
                TaxonomyError::Classifier(format!(
                    "classification timed out after {}ms",
                    timeout.as_millis()
                ))
            })??;

        let prediction = Self::parse_prediction(&response)?;
        debug!(
            topic = %topic,
            label = %prediction.label,
            confidence = prediction.confidence,
            "AI classification"
        );
        Ok(prediction)
    }
}
