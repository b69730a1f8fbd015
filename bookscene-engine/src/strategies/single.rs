//! Single strategy: run only the highest-weight processor

use super::dispatch::{check_quorum, collect, run_concurrent};
use super::{ProcessingStrategy, StrategyContext};
use crate::error::EngineResult;
use crate::registry::ActiveProcessor;
use crate::types::{ProcessingResult, StrategyKind};
use crate::voting::sort_by_position;
use async_trait::async_trait;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default)]
pub struct SingleStrategy;

/// Highest weight; ties go to the earlier-registered processor
pub fn select_primary(processors: &[ActiveProcessor]) -> Option<&ActiveProcessor> {
    processors.iter().fold(None, |best: Option<&ActiveProcessor>, p| match best {
        Some(b) if b.weight() >= p.weight() => Some(b),
        _ => Some(p),
    })
}

#[async_trait]
impl ProcessingStrategy for SingleStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Single
    }

    async fn process(
        &self,
        text: &str,
        processors: &[ActiveProcessor],
        ctx: &StrategyContext,
    ) -> EngineResult<ProcessingResult> {
        let selected: Vec<ActiveProcessor> = select_primary(processors).cloned().into_iter().collect();
        if let Some(primary) = selected.first() {
            debug!(processor = %primary.name(), weight = primary.weight(), "Single strategy selected processor");
        }

        let runs = run_concurrent(text, &selected, ctx).await?;
        let collected = collect(text, runs, ctx);
        check_quorum(StrategyKind::Single, &collected, 1)?;

        let mut descriptions = collected.descriptions();
        sort_by_position(&mut descriptions);

        let mut result = ProcessingResult::empty(StrategyKind::Single);
        result.descriptions = descriptions;
        result.processor_results = collected.processor_results;
        result.processors_used = collected.processors_used;
        result.quality_metrics.failed_processors = collected.failed_processors;
        Ok(result)
    }
}
