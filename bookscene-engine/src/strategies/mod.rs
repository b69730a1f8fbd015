//! Processing strategies
//!
//! A strategy decides which processors run and how their outputs combine.
//!
//! | Strategy | Runs | Merge | Quorum |
//! |----------|------|-------|--------|
//! | Single | highest-weight processor | none | 1 |
//! | Parallel | all, concurrently | union + positional dedup | `min_quorum` |
//! | Sequential | one at a time, by weight, until quality is good enough | union + positional dedup | 1 |
//! | Ensemble | all, concurrently | weighted consensus voting | `min_quorum` |
//! | Adaptive | decides between the four above | delegated | delegated |
//!
//! Strategies never retry; the orchestrator owns the fallback chain.

pub mod adaptive;
mod dispatch;
pub mod ensemble;
pub mod parallel;
pub mod sequential;
pub mod single;

use crate::config_loader::EngineSettings;
use crate::error::EngineResult;
use crate::quality::QualityScorer;
use crate::registry::{ActiveProcessor, ProcessorRegistry};
use crate::types::{ProcessingResult, StrategyKind};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub use adaptive::{decide, AdaptiveState, AdaptiveStrategy};
pub use ensemble::EnsembleStrategy;
pub use parallel::ParallelStrategy;
pub use sequential::SequentialStrategy;
pub use single::SingleStrategy;

/// Everything a strategy needs besides the text and processor list
#[derive(Clone)]
pub struct StrategyContext {
    pub settings: Arc<EngineSettings>,
    pub registry: Arc<ProcessorRegistry>,
    pub scorer: QualityScorer,
    pub cancel: CancellationToken,
    /// Current load factor (0.0-1.0), read by Adaptive
    pub load: f64,
}

impl StrategyContext {
    pub fn new(settings: Arc<EngineSettings>, registry: Arc<ProcessorRegistry>) -> Self {
        Self {
            settings,
            registry,
            scorer: QualityScorer::new(),
            cancel: CancellationToken::new(),
            load: 0.0,
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_load(mut self, load: f64) -> Self {
        self.load = load.clamp(0.0, 1.0);
        self
    }
}

/// Pluggable processing algorithm
#[async_trait]
pub trait ProcessingStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Run processors over `text` and merge their output
    ///
    /// The returned result carries descriptions, per-processor candidates,
    /// the processors used and any failed processors; timing, attempts and
    /// metrics are filled in by the orchestrator.
    ///
    /// # Errors
    /// - `EngineError::EnsembleQuorum` when too few processors succeeded
    /// - `EngineError::Cancelled` when the context's token fired
    async fn process(
        &self,
        text: &str,
        processors: &[ActiveProcessor],
        ctx: &StrategyContext,
    ) -> EngineResult<ProcessingResult>;
}

/// Strategy implementation for a kind
pub fn strategy_for(kind: StrategyKind) -> Box<dyn ProcessingStrategy> {
    match kind {
        StrategyKind::Single => Box::new(SingleStrategy),
        StrategyKind::Parallel => Box::new(ParallelStrategy),
        StrategyKind::Sequential => Box::new(SequentialStrategy),
        StrategyKind::Ensemble => Box::new(EnsembleStrategy),
        StrategyKind::Adaptive => Box::new(AdaptiveStrategy),
    }
}
