//! Parallel strategy: run everything, keep the union

use super::dispatch::{check_quorum, collect, run_concurrent, union_merge};
use super::{ProcessingStrategy, StrategyContext};
use crate::error::EngineResult;
use crate::registry::ActiveProcessor;
use crate::types::{ProcessingResult, StrategyKind};
use async_trait::async_trait;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default)]
pub struct ParallelStrategy;

#[async_trait]
impl ProcessingStrategy for ParallelStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Parallel
    }

    async fn process(
        &self,
        text: &str,
        processors: &[ActiveProcessor],
        ctx: &StrategyContext,
    ) -> EngineResult<ProcessingResult> {
        let runs = run_concurrent(text, processors, ctx).await?;
        let collected = collect(text, runs, ctx);
        check_quorum(StrategyKind::Parallel, &collected, ctx.settings.min_quorum)?;

        let descriptions = union_merge(&collected, ctx);
        debug!(
            processors = collected.succeeded(),
            descriptions = descriptions.len(),
            "Parallel merge complete"
        );

        let mut result = ProcessingResult::empty(StrategyKind::Parallel);
        result.descriptions = descriptions;
        result.processor_results = collected.processor_results;
        result.processors_used = collected.processors_used;
        result.quality_metrics.failed_processors = collected.failed_processors;
        Ok(result)
    }
}
