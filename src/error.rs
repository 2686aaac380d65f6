// src/error.rs
// Centralized error taxonomy for the memory and governance core.
// Empty results are never errors here; callers get Ok with an empty value.

use thiserror::Error;

/// Errors surfaced by the memory, consolidation, and governor layers.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Bad input rejected before any store access (empty org id, blank keys).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Transient record-store failure. The caller retries, we don't.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// An audit write failed. Provenance is a correctness requirement,
    /// so this one propagates loudly.
    #[error("consolidation failed: {0}")]
    ConsolidationFailed(String),

    /// The model capability returned an error.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// The model capability exceeded the caller-supplied timeout.
    #[error("model call timed out after {0}ms")]
    ModelTimeout(u64),
}

impl CoreError {
    /// Stable machine-readable code for logging and API translation.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "VALIDATION",
            CoreError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            CoreError::ConsolidationFailed(_) => "CONSOLIDATION_FAILED",
            CoreError::ModelUnavailable(_) => "MODEL_UNAVAILABLE",
            CoreError::ModelTimeout(_) => "MODEL_TIMEOUT",
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation(message.into())
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        CoreError::StoreUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::StoreUnavailable(format!("serialization: {err}"))
    }
}

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Rejects a blank organization id before any store round-trip.
pub fn require_org_id(org_id: &str) -> CoreResult<()> {
    if org_id.trim().is_empty() {
        return Err(CoreError::validation("organization id must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(CoreError::validation("x").code(), "VALIDATION");
        assert_eq!(
            CoreError::ConsolidationFailed("x".into()).code(),
            "CONSOLIDATION_FAILED"
        );
        assert_eq!(CoreError::ModelTimeout(100).code(), "MODEL_TIMEOUT");
    }

    #[test]
    fn test_require_org_id() {
        assert!(require_org_id("org_123").is_ok());
        assert!(require_org_id("").is_err());
        assert!(require_org_id("   ").is_err());
    }
}
