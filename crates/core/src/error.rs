//! Analytics error model.

use thiserror::Error;

/// Result type used across the analytics engine.
pub type AnalyticsResult<T> = Result<T, AnalyticsError>;

/// Engine-level error.
///
/// Configuration errors abort engine construction. Validation and computation
/// errors are scoped to a single SKU: the engine records them as diagnostics and
/// keeps going with the rest of the population.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnalyticsError {
    /// Invalid engine configuration (smoothing constants, thresholds, windows).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Malformed per-SKU input (negative quantities, non-positive lead time).
    #[error("input validation failed: {0}")]
    InputValidation(String),

    /// A numeric computation could not be completed (overflow, non-finite value).
    #[error("computation failed: {0}")]
    Computation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A collaborator (history, stock or catalog reader) failed.
    #[error("source unavailable: {0}")]
    Source(String),

    /// The run was cancelled before it could produce a consistent snapshot.
    #[error("run cancelled")]
    Cancelled,
}

impl AnalyticsError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::InputValidation(msg.into())
    }

    pub fn computation(msg: impl Into<String>) -> Self {
        Self::Computation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    /// True for errors that only affect one SKU and must not abort a run.
    pub fn is_sku_scoped(&self) -> bool {
        matches!(self, Self::InputValidation(_) | Self::Computation(_))
    }
}
