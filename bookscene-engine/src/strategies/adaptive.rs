//! Adaptive strategy
//!
//! Inspects the text and current load, then hands off to one concrete
//! strategy. The decision is a pure function of `(length, complexity, load)`:
//!
//! ```text
//! EVALUATE ──┬─ load ≥ high_load ─────────────────→ SINGLE
//!            ├─ length < short_text_chars ────────→ SINGLE
//!            ├─ load ≥ elevated_load ─────────────→ SEQUENTIAL
//!            ├─ complexity ≥ high_complexity ─────→ ENSEMBLE
//!            ├─ length ≥ long_text_chars ─────────→ PARALLEL
//!            └─ otherwise ────────────────────────→ ENSEMBLE
//! ```
//!
//! Rules are checked top to bottom; the first match wins.

use super::{strategy_for, ProcessingStrategy, StrategyContext};
use crate::config_loader::AdaptiveThresholds;
use crate::error::EngineResult;
use crate::quality::text_complexity;
use crate::registry::ActiveProcessor;
use crate::types::{ProcessingResult, StrategyKind};
use async_trait::async_trait;
use tracing::debug;

/// States of the adaptive decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdaptiveState {
    Evaluate,
    Single,
    Parallel,
    Sequential,
    Ensemble,
}

impl AdaptiveState {
    /// Transition out of `Evaluate`; every other state is terminal
    pub fn next(self, length: usize, complexity: f64, load: f64, thresholds: &AdaptiveThresholds) -> Self {
        if self != AdaptiveState::Evaluate {
            return self;
        }
        if load >= thresholds.high_load || length < thresholds.short_text_chars {
            AdaptiveState::Single
        } else if load >= thresholds.elevated_load {
            AdaptiveState::Sequential
        } else if complexity >= thresholds.high_complexity {
            AdaptiveState::Ensemble
        } else if length >= thresholds.long_text_chars {
            AdaptiveState::Parallel
        } else {
            AdaptiveState::Ensemble
        }
    }

    pub fn strategy(self) -> Option<StrategyKind> {
        match self {
            AdaptiveState::Evaluate => None,
            AdaptiveState::Single => Some(StrategyKind::Single),
            AdaptiveState::Parallel => Some(StrategyKind::Parallel),
            AdaptiveState::Sequential => Some(StrategyKind::Sequential),
            AdaptiveState::Ensemble => Some(StrategyKind::Ensemble),
        }
    }
}

/// Pick a concrete strategy by running the state machine from `Evaluate`
///
/// `length` is in chars, `complexity` and `load` in 0.0-1.0.
pub fn decide(length: usize, complexity: f64, load: f64, thresholds: &AdaptiveThresholds) -> StrategyKind {
    let mut state = AdaptiveState::Evaluate;
    loop {
        if let Some(kind) = state.strategy() {
            return kind;
        }
        state = state.next(length, complexity, load, thresholds);
    }
}

/// Measure the text and decide
pub fn choose(text: &str, load: f64, thresholds: &AdaptiveThresholds) -> StrategyKind {
    let length = text.chars().count();
    let complexity = text_complexity(text);
    let chosen = decide(length, complexity, load, thresholds);
    debug!(length, complexity, load, strategy = %chosen, "Adaptive strategy decision");
    chosen
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AdaptiveStrategy;

#[async_trait]
impl ProcessingStrategy for AdaptiveStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Adaptive
    }

    async fn process(
        &self,
        text: &str,
        processors: &[ActiveProcessor],
        ctx: &StrategyContext,
    ) -> EngineResult<ProcessingResult> {
        let chosen = choose(text, ctx.load, &ctx.settings.adaptive);
        strategy_for(chosen).process(text, processors, ctx).await
    }
}
