//! Sequential strategy
//!
//! Runs processors one at a time in descending weight order and stops as soon
//! as the mean quality of everything collected so far reaches
//! `sequential_quality_threshold`.

use super::dispatch::{check_quorum, collect, run_concurrent, union_merge, Collected};
use super::{ProcessingStrategy, StrategyContext};
use crate::error::{EngineError, EngineResult};
use crate::registry::ActiveProcessor;
use crate::types::{ProcessingResult, StrategyKind};
use async_trait::async_trait;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialStrategy;

/// Descending weight, stable for ties
pub fn weight_order(processors: &[ActiveProcessor]) -> Vec<ActiveProcessor> {
    let mut ordered = processors.to_vec();
    ordered.sort_by(|a, b| b.weight().total_cmp(&a.weight()));
    ordered
}

/// Mean quality score over all collected candidates
fn accumulated_quality(collected: &Collected, ctx: &StrategyContext) -> f64 {
    let scores: Vec<f64> = collected
        .processor_results
        .values()
        .flatten()
        .map(|c| ctx.scorer.score(&c.text, c.description_type))
        .collect();
    if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

#[async_trait]
impl ProcessingStrategy for SequentialStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Sequential
    }

    async fn process(
        &self,
        text: &str,
        processors: &[ActiveProcessor],
        ctx: &StrategyContext,
    ) -> EngineResult<ProcessingResult> {
        let threshold = ctx.settings.sequential_quality_threshold;
        let mut collected = Collected::default();

        for processor in weight_order(processors) {
            if ctx.cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            let runs = run_concurrent(text, std::slice::from_ref(&processor), ctx).await?;
            collected.extend(collect(text, runs, ctx));

            let quality = accumulated_quality(&collected, ctx);
            debug!(processor = %processor.name(), quality, threshold, "Sequential step complete");
            if collected.succeeded() > 0 && quality >= threshold {
                debug!(processors = collected.succeeded(), "Sequential quality threshold reached");
                break;
            }
        }

        check_quorum(StrategyKind::Sequential, &collected, 1)?;
        let descriptions = union_merge(&collected, ctx);

        let mut result = ProcessingResult::empty(StrategyKind::Sequential);
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
    use crate::types::DescriptionType;

    #[test]
    fn test_weight_order() {
        let (_, processors) = context_with(
            vec![
                MockAdapter::fixed("general", vec![]),
                MockAdapter::fixed("specialist", vec![]),
                MockAdapter::fixed("dependency", vec![]),
                MockAdapter::fixed("zero_shot", vec![]),
            ],
            raw_settings(),
        );
        let names: Vec<String> = weight_order(&processors).iter().map(|p| p.name().to_string()).collect();
        assert_eq!(names, vec!["specialist", "general", "zero_shot", "dependency"]);
    }

    #[tokio::test]
    async fn test_stops_early_when_quality_reached() {
        let mut settings = raw_settings();
        settings.sequential_quality_threshold = 0.0;
        let (ctx, processors) = context_with(
            vec![
                MockAdapter::fixed("general", vec![candidate(0, 66, DescriptionType::Location, 0.6)]),
                MockAdapter::fixed("specialist", vec![candidate(0, 66, DescriptionType::Location, 0.6)]),
            ],
            settings,
        );
        let result = SequentialStrategy.process(&sample_text(), &processors, &ctx).await.unwrap();
        assert_eq!(result.processors_used, vec!["specialist"]);
        assert_eq!(ctx.registry.status()["general"].total_calls, 0);
    }

    #[tokio::test]
    async fn test_runs_all_when_threshold_unreachable() {
        let mut settings = raw_settings();
        settings.sequential_quality_threshold = 1.0;
        let (ctx, processors) = context_with(
            vec![
                MockAdapter::failing("general", "boom"),
                MockAdapter::fixed("specialist", vec![candidate(0, 66, DescriptionType::Location, 0.6)]),
                MockAdapter::fixed("dependency", vec![]),
            ],
            settings,
        );
        let result = SequentialStrategy.process(&sample_text(), &processors, &ctx).await.unwrap();
        assert_eq!(result.processors_used, vec!["specialist", "dependency"]);
        assert_eq!(result.quality_metrics.failed_processors, vec!["general"]);
        assert_eq!(result.descriptions.len(), 1);
    }
}
