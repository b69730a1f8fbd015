//! Ensemble strategy: run everything, merge by weighted consensus

use super::dispatch::{check_quorum, collect, run_concurrent};
use super::{ProcessingStrategy, StrategyContext};
use crate::error::EngineResult;
use crate::registry::ActiveProcessor;
use crate::types::{ProcessingResult, StrategyKind};
use crate::voting::EnsembleVoter;
use async_trait::async_trait;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default)]
pub struct EnsembleStrategy;

#[async_trait]
impl ProcessingStrategy for EnsembleStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Ensemble
    }

    async fn process(
        &self,
        text: &str,
        processors: &[ActiveProcessor],
        ctx: &StrategyContext,
    ) -> EngineResult<ProcessingResult> {
        let runs = run_concurrent(text, processors, ctx).await?;
        let collected = collect(text, runs, ctx);
        check_quorum(StrategyKind::Ensemble, &collected, ctx.settings.min_quorum)?;

        let voter = EnsembleVoter::from_settings(&ctx.settings);
        let descriptions = voter.vote(text, &collected.processor_results, &collected.weights);
        debug!(
            processors = collected.succeeded(),
            raw_candidates = collected.processor_results.values().map(Vec::len).sum::<usize>(),
            accepted = descriptions.len(),
            "Ensemble merge complete"
        );

        let mut result = ProcessingResult::empty(StrategyKind::Ensemble);
        result.descriptions = descriptions;
        result.processor_results = collected.processor_results;
        result.processors_used = collected.processors_used;
        result.quality_metrics.failed_processors = collected.failed_processors;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::mock::{candidate, MockAdapter};
    use crate::strategies::test_support::{context_with, raw_settings, sample_text};
    use crate::types::{DescriptionType, TextSpan};
    use std::time::Duration;

    #[tokio::test]
    async fn test_consensus_over_four_processors() {
        let (ctx, processors) = context_with(
            vec![
                MockAdapter::fixed("general", vec![candidate(10, 120, DescriptionType::Location, 0.8)]),
                MockAdapter::fixed("specialist", vec![candidate(15, 118, DescriptionType::Location, 0.9)]),
                MockAdapter::fixed("dependency", vec![]),
                MockAdapter::fixed("zero_shot", vec![candidate(12, 121, DescriptionType::Location, 0.6)]),
            ],
            raw_settings(),
        );
        let result = EnsembleStrategy.process(&sample_text(), &processors, &ctx).await.unwrap();

        assert_eq!(result.descriptions.len(), 1);
        let d = &result.descriptions[0];
        assert_eq!(d.span, TextSpan::new(10, 121));
        assert!((d.consensus_weight - 0.8).abs() < 1e-9);
        assert_eq!(d.contributing_processors.len(), 3);
    }

    #[tokio::test]
    async fn test_timed_out_processor_is_left_out() {
        let mut settings = raw_settings();
        settings.processor_timeout_ms = 100;
        let (ctx, processors) = context_with(
            vec![
                MockAdapter::fixed("general", vec![candidate(0, 66, DescriptionType::Location, 0.8)]),
                MockAdapter::fixed("specialist", vec![candidate(0, 66, DescriptionType::Location, 0.8)]),
                MockAdapter::fixed("dependency", vec![candidate(0, 66, DescriptionType::Location, 0.8)]),
                MockAdapter::delayed("zero_shot", Duration::from_secs(10), vec![]),
            ],
            settings,
        );
        let result = EnsembleStrategy.process(&sample_text(), &processors, &ctx).await.unwrap();
        assert_eq!(result.processors_used.len(), 3);
        assert_eq!(result.quality_metrics.failed_processors, vec!["zero_shot"]);
        assert_eq!(result.descriptions.len(), 1);
        assert!((result.descriptions[0].consensus_weight - 1.0).abs() < 1e-9);
    }
}
