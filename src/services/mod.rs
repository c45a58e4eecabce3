//! Services layer for the taxonomy engine
//!
//! Provides the external text-classification seam and its LLM-backed
//! implementation.

pub mod ai;

pub use ai::{LabelPrediction, LlmClassifier, TextClassifier};
