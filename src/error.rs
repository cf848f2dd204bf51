//! Error kinds surfaced by the analytics core.
//!
//! Only conditions that must fail a run live here. An empty dataset or a
//! zero-variance measure is reported through `None` values in the report.

use thiserror::Error;

/// Result alias for operations that can fail with an [`AnalyticsError`].
pub type Result<T> = std::result::Result<T, AnalyticsError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalyticsError {
    /// A record is missing a field, references an unknown entity, or carries
    /// an out-of-range value. Rejected at ingestion.
    #[error("malformed {entity} '{id}': {reason}")]
    MalformedInput {
        entity: &'static str,
        id: String,
        reason: String,
    },

    /// The configuration cannot price or maintain the loaded dataset.
    #[error("configuration error: {reason}")]
    Configuration { reason: String },
}

impl AnalyticsError {
    pub fn malformed(
        entity: &'static str,
        id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        AnalyticsError::MalformedInput {
            entity,
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn configuration(reason: impl Into<String>) -> Self {
        AnalyticsError::Configuration {
            reason: reason.into(),
        }
    }
}
