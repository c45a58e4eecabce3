//! Linnaeus - Dynamic Incident Taxonomy Engine
//!
//! Classifies free-text incident reports into a dynamically evolving
//! taxonomy of subcategories and manages that taxonomy's lifecycle:
//! - Ordered-fallback classification (AI, then rules, then similarity)
//! - Race-safe dynamic schema evolution via atomic compare-and-create
//! - Alias management and irreversible merges with statistic absorption
//! - Feedback-driven confidence tracking, promotion and deprecation
//!
//! # Architecture
//!
//! The system is organized into several layers:
//! - **Types**: Core data structures (Subcategory, ClassificationOutcome, etc.)
//! - **Storage**: The taxonomy store seam and an in-memory reference backend
//! - **Services**: The external text-classification adapter
//! - **Classify**: Naming, rules, similarity and the orchestrating engine
//! - **Analytics**: Usage/feedback aggregation and lifecycle policy
//!
//! # Example
//!
//! ```ignore
//! use linnaeus::{
//!     ClassificationRequest, LinnaeusConfig, LlmClassifier, MemoryStore,
//!     SubcategoryService, TextContext, Topic,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = LinnaeusConfig::load()?;
//!     let store = Arc::new(MemoryStore::with_defaults());
//!     let classifier = Arc::new(LlmClassifier::new(config.llm.clone())?);
//!     let service = SubcategoryService::new(store, classifier, config);
//!
//!     let outcome = service
//!         .classify_subcategory(ClassificationRequest::new(
//!             Topic::Traffic,
//!             TextContext::new("Pileup on the bridge", "three cars collided"),
//!         ))
//!         .await;
//!
//!     println!("{} ({:.2})", outcome.resolved_name, outcome.confidence);
//!     Ok(())
//! }
//! ```

pub mod analytics;
pub mod classify;
pub mod config;
pub mod error;
pub mod service;
pub mod services;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use analytics::{AnalyticsOverview, PerformanceReport, UsageAggregator};
pub use classify::ClassificationEngine;
pub use config::{ClassifierThresholds, LifecyclePolicy, LinnaeusConfig, LlmSettings};
pub use error::{Result, TaxonomyError};
pub use service::SubcategoryService;
pub use services::{LabelPrediction, LlmClassifier, TextClassifier};
pub use storage::{MemoryStore, TaxonomyStore};
pub use types::{
    ClassificationOutcome, ClassificationRequest, ClassificationSource, ConfidenceStats,
    FeedbackAck, FeedbackRecord, NewSubcategory, OutcomeId, Subcategory, SubcategoryId,
    SubcategoryStatus, TextContext, Topic,
};
