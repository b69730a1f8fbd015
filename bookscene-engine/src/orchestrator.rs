//! Description engine (public entry point)
//!
//! # Call flow
//! 1. Mask boilerplate (offsets preserved); short input returns an empty result
//! 2. Resolve the strategy (Adaptive decides from length, complexity and load)
//! 3. Walk the [`FallbackPlan`] until a strategy succeeds; each step has its own timeout
//! 4. Score, filter, rank and sort descriptions; compute metrics and recommendations
//!
//! # Configuration snapshots
//! Configuration and registry live in one `Arc` snapshot. Every call clones
//! the snapshot on entry; [`DescriptionEngine::reload_config`] swaps in a new
//! one without touching calls already in flight.

use crate::config_loader::{ConfigLoader, EngineConfig, EngineSettings};
use crate::error::{EngineError, EngineResult};
use crate::processors::{AdapterFactory, BuiltinFactory};
use crate::quality::text::content_length;
use crate::quality::{
    apply_output_filters, compute_metrics, mask_boilerplate, recommendations, CallOutcome, QualityScorer,
};
use crate::registry::{HealthSnapshot, ProcessorRegistry, MIN_REGISTRY_QUORUM};
use crate::stats::{EngineStatistics, StatisticsSnapshot};
use crate::strategies::{adaptive, strategy_for, StrategyContext};
use crate::types::{ProcessingResult, StrategyAttempt, StrategyKind};
use bookscene_common::SettingsStore;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

// ============================================================================
// Fallback Plan
// ============================================================================

/// Ordered `(strategy, timeout)` attempts for one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackPlan {
    steps: Vec<(StrategyKind, Duration)>,
}

impl FallbackPlan {
    /// Start at `initial` and continue down `chain`
    ///
    /// A strategy that is not part of the chain is followed by the chain's
    /// last entry only.
    pub fn build(initial: StrategyKind, chain: &[StrategyKind], timeout: Duration) -> Self {
        let kinds: Vec<StrategyKind> = match chain.iter().position(|k| *k == initial) {
            Some(index) => chain[index..].to_vec(),
            None => std::iter::once(initial).chain(chain.last().copied()).collect(),
        };
        Self {
            steps: kinds.into_iter().map(|k| (k, timeout)).collect(),
        }
    }

    pub fn steps(&self) -> &[(StrategyKind, Duration)] {
        &self.steps
    }

    pub fn strategies(&self) -> Vec<StrategyKind> {
        self.steps.iter().map(|(k, _)| *k).collect()
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Immutable configuration + registry snapshot
struct EngineState {
    config: Arc<EngineConfig>,
    settings: Arc<EngineSettings>,
    registry: Arc<ProcessorRegistry>,
}

impl EngineState {
    fn new(config: EngineConfig, registry: ProcessorRegistry) -> Self {
        Self {
            settings: Arc::new(config.engine.clone()),
            config: Arc::new(config),
            registry: Arc::new(registry),
        }
    }
}

/// Decrements the in-flight counter on drop
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    /// Enter; returns the guard and the number of calls already in flight
    fn enter(counter: &'a AtomicUsize) -> (Self, usize) {
        let previous = counter.fetch_add(1, Ordering::AcqRel);
        (Self(counter), previous)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Multi-backend description extraction engine
pub struct DescriptionEngine {
    settings_store: Arc<dyn SettingsStore>,
    factory: Arc<dyn AdapterFactory>,
    state: RwLock<Arc<EngineState>>,
    scorer: QualityScorer,
    in_flight: AtomicUsize,
    stats: EngineStatistics,
}

impl DescriptionEngine {
    /// Create engine with the built-in backends
    ///
    /// # Errors
    /// - `EngineError::ConfigValidation` on invalid settings
    /// - `EngineError::ProcessorUnavailable` when fewer than two processors start
    pub async fn new(settings_store: Arc<dyn SettingsStore>) -> EngineResult<Self> {
        Self::with_factory(settings_store, Arc::new(BuiltinFactory)).await
    }

    /// Create engine with a custom adapter factory
    pub async fn with_factory(
        settings_store: Arc<dyn SettingsStore>,
        factory: Arc<dyn AdapterFactory>,
    ) -> EngineResult<Self> {
        let config = ConfigLoader::new(Arc::clone(&settings_store)).load().await?;
        let registry = ProcessorRegistry::load(
            &config.processors,
            factory.as_ref(),
            config.engine.failure_threshold,
            None,
        )?;
        info!(processors = registry.len(), "Description engine initialized");

        Ok(Self {
            settings_store,
            factory,
            state: RwLock::new(Arc::new(EngineState::new(config, registry))),
            scorer: QualityScorer::new(),
            in_flight: AtomicUsize::new(0),
            stats: EngineStatistics::new(),
        })
    }

    /// Extract descriptions; Adaptive selects the strategy when `mode` is `None`
    pub async fn process(&self, text: &str, mode: Option<StrategyKind>) -> EngineResult<ProcessingResult> {
        self.process_with_cancel(text, mode, CancellationToken::new()).await
    }

    /// Extract descriptions, aborting when `cancel` fires
    ///
    /// # Errors
    /// - `EngineError::EnsembleQuorum` / `StrategyTimeout` when every fallback step failed
    /// - `EngineError::Cancelled` when `cancel` fired
    pub async fn process_with_cancel(
        &self,
        text: &str,
        mode: Option<StrategyKind>,
        cancel: CancellationToken,
    ) -> EngineResult<ProcessingResult> {
        let started = Instant::now();
        self.stats.record_request();
        let (_in_flight, previous) = InFlight::enter(&self.in_flight);
        let state = Arc::clone(&*self.state.read().await);
        let settings = &state.settings;

        let masked = mask_boilerplate(text);
        let requested = mode.unwrap_or(StrategyKind::Adaptive);

        if content_length(&masked) < settings.min_text_length {
            debug!(
                length = content_length(&masked),
                min = settings.min_text_length,
                "Text below minimum length, nothing to extract"
            );
            self.stats.record_empty_input();
            // No strategy runs: strategy_used echoes the requested mode, attempts stay empty
            let mut result = ProcessingResult::empty(requested);
            result.processing_time = started.elapsed();
            self.stats.record_success(&result);
            return Ok(result);
        }

        let load = (previous as f64 / settings.max_concurrent_calls as f64).min(1.0);
        let initial = match requested {
            StrategyKind::Adaptive => adaptive::choose(&masked, load, &settings.adaptive),
            explicit => explicit,
        };
        let plan = FallbackPlan::build(initial, &settings.fallback_chain, settings.strategy_timeout());
        debug!(requested = %requested, plan = ?plan.strategies(), load, "Processing plan");

        let mut attempts: Vec<StrategyAttempt> = Vec::new();
        let mut last_error: Option<EngineError> = None;

        for (index, (kind, timeout)) in plan.steps().iter().copied().enumerate() {
            if cancel.is_cancelled() {
                self.stats.record_failure();
                return Err(EngineError::Cancelled);
            }

            let attempt_token = cancel.child_token();
            let ctx = StrategyContext::new(Arc::clone(&state.settings), Arc::clone(&state.registry))
                .with_cancel(attempt_token.clone())
                .with_load(load);
            let processors = state.registry.get_active_processors();
            let attempt_started = Instant::now();

            let outcome = match tokio::time::timeout(timeout, strategy_for(kind).process(&masked, &processors, &ctx)).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    attempt_token.cancel();
                    Err(EngineError::StrategyTimeout { strategy: kind, timeout })
                }
            };

            match outcome {
                Ok(result) => {
                    attempts.push(StrategyAttempt {
                        strategy: kind,
                        error: None,
                        elapsed: attempt_started.elapsed(),
                    });
                    let result = self.finish(result, &masked, attempts, started, settings);
                    info!(
                        request_id = %result.request_id,
                        strategy = %result.strategy_used,
                        descriptions = result.descriptions.len(),
                        processors = result.processors_used.len(),
                        elapsed_ms = result.processing_time.as_millis() as u64,
                        "Text processed"
                    );
                    return Ok(result);
                }
                Err(e) if e.is_retryable() => {
                    warn!(strategy = %kind, error = %e, "Strategy failed");
                    attempts.push(StrategyAttempt {
                        strategy: kind,
                        error: Some(e.to_string()),
                        elapsed: attempt_started.elapsed(),
                    });
                    if index + 1 < plan.steps().len() {
                        self.stats.record_fallback();
                    }
                    last_error = Some(e);
                }
                Err(e) => {
                    self.stats.record_failure();
                    return Err(e);
                }
            }
        }

        self.stats.record_failure();
        Err(last_error.unwrap_or(EngineError::ProcessorUnavailable {
            available: 0,
            required: MIN_REGISTRY_QUORUM,
        }))
    }

    /// Score, filter and annotate a strategy result
    fn finish(
        &self,
        mut result: ProcessingResult,
        text: &str,
        attempts: Vec<StrategyAttempt>,
        started: Instant,
        settings: &EngineSettings,
    ) -> ProcessingResult {
        let scored = std::mem::take(&mut result.descriptions)
            .into_iter()
            .map(|mut d| {
                d.quality_score = self.scorer.score(&d.text, d.description_type);
                d
            })
            .collect();
        result.descriptions = apply_output_filters(scored, settings);

        let outcome = CallOutcome {
            processors_ran: result.processors_used.len(),
            failed_processors: std::mem::take(&mut result.quality_metrics.failed_processors),
            fell_back: attempts.len() > 1,
        };
        result.quality_metrics = compute_metrics(&result.descriptions, text.len(), &outcome);
        result.recommendations = recommendations(&result.quality_metrics, result.descriptions.len());
        result.attempts = attempts;
        result.processing_time = started.elapsed();

        self.stats.record_success(&result);
        result
    }

    /// Health snapshot per registered processor
    pub async fn get_processor_status(&self) -> BTreeMap<String, HealthSnapshot> {
        self.state.read().await.registry.status()
    }

    /// Poll processor availability; degraded processors that are available again recover
    pub async fn health_check(&self) -> BTreeMap<String, HealthSnapshot> {
        let registry = Arc::clone(&self.state.read().await.registry);
        registry.health_check()
    }

    /// Re-read settings and rebuild the registry
    ///
    /// Calls already running keep the previous snapshot. On error the current
    /// snapshot stays in place.
    pub async fn reload_config(&self) -> EngineResult<()> {
        let config = ConfigLoader::new(Arc::clone(&self.settings_store)).load().await?;
        let previous = Arc::clone(&*self.state.read().await);
        let registry = ProcessorRegistry::load(
            &config.processors,
            self.factory.as_ref(),
            config.engine.failure_threshold,
            Some(previous.registry.as_ref()),
        )?;
        let processors = registry.len();
        *self.state.write().await = Arc::new(EngineState::new(config, registry));
        info!(processors, "Configuration reloaded");
        Ok(())
    }

    pub fn get_statistics(&self) -> StatisticsSnapshot {
        self.stats.snapshot()
    }

    /// Current configuration snapshot
    pub async fn config(&self) -> Arc<EngineConfig> {
        Arc::clone(&self.state.read().await.config)
    }

    /// Calls currently in flight
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAIN: [StrategyKind; 3] = [StrategyKind::Ensemble, StrategyKind::Parallel, StrategyKind::Single];

    #[test]
    fn test_plan_from_ensemble_walks_whole_chain() {
        let plan = FallbackPlan::build(StrategyKind::Ensemble, &CHAIN, Duration::from_secs(30));
        assert_eq!(plan.strategies(), CHAIN.to_vec());
        assert!(plan.steps().iter().all(|(_, t)| *t == Duration::from_secs(30)));
    }

    #[test]
    fn test_plan_starts_mid_chain() {
        let plan = FallbackPlan::build(StrategyKind::Parallel, &CHAIN, Duration::from_secs(1));
        assert_eq!(plan.strategies(), vec![StrategyKind::Parallel, StrategyKind::Single]);

        let plan = FallbackPlan::build(StrategyKind::Single, &CHAIN, Duration::from_secs(1));
        assert_eq!(plan.strategies(), vec![StrategyKind::Single]);
    }

    #[test]
    fn test_plan_for_strategy_outside_chain() {
        let plan = FallbackPlan::build(StrategyKind::Sequential, &CHAIN, Duration::from_secs(1));
        assert_eq!(plan.strategies(), vec![StrategyKind::Sequential, StrategyKind::Single]);
    }

    #[test]
    fn test_in_flight_guard() {
        let counter = AtomicUsize::new(0);
        {
            let (_a, before_a) = InFlight::enter(&counter);
            let (_b, before_b) = InFlight::enter(&counter);
            assert_eq!((before_a, before_b), (0, 1));
            assert_eq!(counter.load(Ordering::Acquire), 2);
        }
        assert_eq!(counter.load(Ordering::Acquire), 0);
    }
}
