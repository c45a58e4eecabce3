//! Error types for the Linnaeus taxonomy engine
//!
//! This module provides comprehensive error handling using thiserror for
//! structured error definitions and anyhow for error propagation.

use thiserror::Error;

/// Main error type for taxonomy operations
#[derive(Error, Debug)]
pub enum TaxonomyError {
    /// Taxonomy store could not be reached; classification outcomes
    /// degrade to `persisted = false` rather than failing
    #[error("Taxonomy store unavailable: {0}")]
    StoreUnavailable(String),

    /// Subcategory not found
    #[error("Subcategory not found: {0}")]
    SubcategoryNotFound(String),

    /// Classification outcome not found (stale or unknown feedback id)
    #[error("Classification outcome not found: {0}")]
    OutcomeNotFound(String),

    /// Alias already attached to a different subcategory in the topic
    #[error("Alias '{alias}' already belongs to subcategory {holder}")]
    AliasConflict { alias: String, holder: String },

    /// Merge chain loops back on itself; data-integrity violation
    #[error("Merge cycle detected while resolving subcategory {0}")]
    MergeCycle(String),

    /// Canonical name rejected by the naming rules
    #[error("Invalid canonical name: {0}")]
    InvalidName(String),

    /// Invalid lifecycle operation (e.g. re-activating a merged entry)
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// External text-classification call failed or timed out
    #[error("Classifier error: {0}")]
    Classifier(String),

    /// Invalid subcategory ID format
    #[error("Invalid subcategory ID: {0}")]
    InvalidId(#[from] uuid::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for taxonomy operations
pub type Result<T> = std::result::Result<T, TaxonomyError>;

/// Convert anyhow::Error to TaxonomyError
impl From<anyhow::Error> for TaxonomyError {
    fn from(err: anyhow::Error) -> Self {
        TaxonomyError::Other(err.to_string())
    }
}

impl TaxonomyError {
    /// Whether the error indicates the store was unreachable, as opposed
    /// to a logical rejection of the operation
    pub fn is_unavailable(&self) -> bool {
        matches!(self, TaxonomyError::StoreUnavailable(_))
    }
}
