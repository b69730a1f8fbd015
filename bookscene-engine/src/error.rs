//! Error types for bookscene-engine
//!
//! Propagation rules:
//! - [`ExtractionError`] never escapes the strategy layer; it is logged and
//!   counted against the failing processor's health.
//! - Quorum and configuration errors are the only ones surfaced to callers
//!   during normal operation.

use crate::types::StrategyKind;
use std::time::Duration;
use thiserror::Error;

/// Single-adapter failure
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExtractionError {
    /// Adapter backend is not available (missing model, unsupported language, ...)
    #[error("Processor not available: {0}")]
    NotAvailable(String),

    /// Adapter did not finish before the call deadline
    #[error("Processor timed out after {0:?}")]
    Timeout(Duration),

    /// Call cancelled by the caller
    #[error("Processor call cancelled")]
    Cancelled,

    /// Adapter returned spans outside the text or not on char boundaries
    #[error("Invalid output: {0}")]
    InvalidOutput(String),

    /// Backend failure (panic, internal error)
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Engine error
#[derive(Debug, Error)]
pub enum EngineError {
    /// Fewer adapters usable than the registry quorum (fatal at load)
    #[error("Processors unavailable: {available} usable, {required} required")]
    ProcessorUnavailable { available: usize, required: usize },

    /// One adapter failed within a call; collected per strategy step and
    /// reported when the step misses its quorum
    #[error("Processor '{processor}' failed: {source}")]
    ProcessorExtraction {
        processor: String,
        #[source]
        source: ExtractionError,
    },

    /// Too few adapters succeeded for this call
    #[error("Ensemble quorum not met for {strategy}: {succeeded} succeeded, {required} required")]
    EnsembleQuorum {
        strategy: StrategyKind,
        succeeded: usize,
        required: usize,
    },

    /// Invalid processor or engine configuration (fatal at load)
    #[error("Configuration validation failed: {0}")]
    ConfigValidation(String),

    /// Strategy exceeded its time budget
    #[error("Strategy {strategy} timed out after {timeout:?}")]
    StrategyTimeout {
        strategy: StrategyKind,
        timeout: Duration,
    },

    /// Caller cancelled the call
    #[error("Processing cancelled")]
    Cancelled,

    /// Settings store failure
    #[error("Settings error: {0}")]
    Settings(#[from] bookscene_common::Error),
}

impl EngineError {
    /// Whether the orchestrator may retry with the next fallback strategy
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::EnsembleQuorum { .. } | EngineError::StrategyTimeout { .. }
        )
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
