//! Processor dispatch shared by all strategies
//!
//! Runs adapters as tokio tasks against one shared deadline, races each call
//! against the cancellation token and waits for all of them (join barrier)
//! before anything is merged. Outcomes are recorded in processor health, then
//! successful outputs are validated, threshold-filtered and rescored.

use super::StrategyContext;
use crate::error::{EngineError, EngineResult, ExtractionError};
use crate::quality::filter_candidates;
use crate::quality::text::{is_valid_span, span_text};
use crate::registry::ActiveProcessor;
use crate::types::{clamp_unit, CandidateDescription, Description, RawCandidate, StrategyKind};
use crate::voting::dedupe_by_position;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Outcome of one processor call
pub(crate) struct ProcessorRun {
    pub processor: ActiveProcessor,
    pub outcome: Result<Vec<RawCandidate>, ExtractionError>,
    pub elapsed: Duration,
}

/// Successful outputs of a set of runs
#[derive(Debug, Default)]
pub(crate) struct Collected {
    /// Filtered, rescored candidates per successful processor
    pub processor_results: BTreeMap<String, Vec<CandidateDescription>>,
    /// Weights of the processors that succeeded
    pub weights: BTreeMap<String, f64>,
    /// Successful processors, in run order
    pub processors_used: Vec<String>,
    pub failed_processors: Vec<String>,
    /// `EngineError::ProcessorExtraction` per failed processor
    pub failures: Vec<EngineError>,
}

impl Collected {
    pub fn succeeded(&self) -> usize {
        self.processors_used.len()
    }

    pub fn extend(&mut self, other: Collected) {
        self.processor_results.extend(other.processor_results);
        self.weights.extend(other.weights);
        self.processors_used.extend(other.processors_used);
        self.failed_processors.extend(other.failed_processors);
        self.failures.extend(other.failures);
    }

    /// All candidates as single-source descriptions
    pub fn descriptions(&self) -> Vec<Description> {
        self.processor_results
            .values()
            .flatten()
            .map(Description::from_candidate)
            .collect()
    }
}

/// Run processors concurrently and wait for all of them
///
/// # Errors
/// `EngineError::Cancelled` if the context's token fired during the call
pub(crate) async fn run_concurrent(
    text: &str,
    processors: &[ActiveProcessor],
    ctx: &StrategyContext,
) -> EngineResult<Vec<ProcessorRun>> {
    let timeout = ctx.settings.processor_timeout();
    let deadline = tokio::time::Instant::now() + timeout;
    let shared_text: Arc<str> = Arc::from(text);

    let handles = processors.iter().cloned().map(|processor| {
        let text = Arc::clone(&shared_text);
        let cancel = ctx.cancel.clone();
        tokio::spawn(async move {
            let started = Instant::now();
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(ExtractionError::Cancelled),
                result = tokio::time::timeout_at(deadline, processor.adapter.extract(&text)) => {
                    result.unwrap_or(Err(ExtractionError::Timeout(timeout)))
                }
            };
            (outcome, started.elapsed())
        })
    });
    let joined = join_all(handles).await;

    if ctx.cancel.is_cancelled() {
        debug!(processors = processors.len(), "Dispatch cancelled, discarding results");
        return Err(EngineError::Cancelled);
    }

    Ok(processors
        .iter()
        .cloned()
        .zip(joined)
        .map(|(processor, joined)| {
            let (outcome, elapsed) = joined.unwrap_or_else(|e| {
                (Err(ExtractionError::Backend(format!("task failed: {}", e))), Duration::ZERO)
            });
            ProcessorRun {
                processor,
                outcome,
                elapsed,
            }
        })
        .collect())
}

/// Record health and turn successful runs into filtered, rescored candidates
pub(crate) fn collect(text: &str, runs: Vec<ProcessorRun>, ctx: &StrategyContext) -> Collected {
    let mut collected = Collected::default();
    for run in runs {
        let name = run.processor.name().to_string();
        let outcome = run.outcome.and_then(|raw| validate_spans(text, raw));
        match outcome {
            Ok(raw) => {
                ctx.registry.record_success(&run.processor);
                let candidates = rescore(text, &run.processor, raw, ctx);
                debug!(
                    processor = %name,
                    candidates = candidates.len(),
                    elapsed_ms = run.elapsed.as_millis() as u64,
                    "Processor completed"
                );
                collected.weights.insert(name.clone(), run.processor.weight());
                collected.processor_results.insert(name.clone(), candidates);
                collected.processors_used.push(name);
            }
            Err(e) => {
                ctx.registry.record_failure(&run.processor, &e);
                let failure = EngineError::ProcessorExtraction {
                    processor: name.clone(),
                    source: e,
                };
                warn!(processor = %name, error = %failure, "Processor failed");
                collected.failed_processors.push(name);
                collected.failures.push(failure);
            }
        }
    }
    collected
}

fn validate_spans(text: &str, raw: Vec<RawCandidate>) -> Result<Vec<RawCandidate>, ExtractionError> {
    match raw.iter().find(|c| c.span.is_empty() || !is_valid_span(text, &c.span)) {
        Some(bad) => Err(ExtractionError::InvalidOutput(format!(
            "span {} invalid for text of {} bytes",
            bad.span,
            text.len()
        ))),
        None => Ok(raw),
    }
}

/// Apply the processor threshold, blend in quality, then type/length filters
fn rescore(
    text: &str,
    processor: &ActiveProcessor,
    raw: Vec<RawCandidate>,
    ctx: &StrategyContext,
) -> Vec<CandidateDescription> {
    let blend = ctx.settings.quality_blend;
    let candidates = raw
        .into_iter()
        .filter(|c| c.confidence >= processor.config.confidence_threshold)
        .map(|c| {
            let covered = span_text(text, &c.span).to_string();
            let confidence = if blend > 0.0 {
                let quality = ctx.scorer.score(&covered, c.description_type);
                clamp_unit((1.0 - blend) * c.confidence + blend * quality)
            } else {
                c.confidence
            };
            CandidateDescription {
                span: c.span,
                description_type: c.description_type,
                confidence,
                source_processor: processor.name().to_string(),
                text: covered,
            }
        })
        .collect();
    filter_candidates(candidates, &ctx.settings)
}

/// Fail with `EnsembleQuorum` if fewer than `required` processors succeeded
pub(crate) fn check_quorum(strategy: StrategyKind, collected: &Collected, required: usize) -> EngineResult<()> {
    if collected.succeeded() < required {
        let failures: Vec<String> = collected.failures.iter().map(ToString::to_string).collect();
        warn!(
            strategy = %strategy,
            succeeded = collected.succeeded(),
            required,
            failures = ?failures,
            "Quorum not met"
        );
        return Err(EngineError::EnsembleQuorum {
            strategy,
            succeeded: collected.succeeded(),
            required,
        });
    }
    Ok(())
}

/// Union of all candidates with positional dedup (no weighting)
pub(crate) fn union_merge(collected: &Collected, ctx: &StrategyContext) -> Vec<Description> {
    dedupe_by_position(
        collected.descriptions(),
        ctx.settings.merge_overlap_ratio,
        ctx.settings.merge_gap,
    )
}
