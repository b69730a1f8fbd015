//! Integration tests for DescriptionEngine
//!
//! Backends are scripted mocks unless a test says otherwise. Quality blending
//! is switched off so candidate confidences reach the voter unchanged.

use bookscene_common::settings::MemorySettingsStore;
use bookscene_engine::processors::mock::{candidate, MockAdapter, MockFactory};
use bookscene_engine::quality::text::span_text;
use bookscene_engine::{DescriptionEngine, DescriptionType, EngineError, StrategyKind, TextSpan};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const NAMES: [&str; 4] = ["general", "specialist", "dependency", "zero_shot"];

/// 603 bytes of plain prose; sentences start at 0, 67, 134, ...
fn sample_text() -> String {
    "The river ran past the old mill and the grey stones of the bridge. ".repeat(9)
}

fn base_store() -> MemorySettingsStore {
    MemorySettingsStore::new().with_setting("engine", "quality_blend", "0.0")
}

fn factory(build: impl Fn(&str) -> MockAdapter) -> MockFactory {
    NAMES.iter().fold(MockFactory::new(), |f, name| f.with(build(name)))
}

async fn engine(store: MemorySettingsStore, factory: &MockFactory) -> DescriptionEngine {
    DescriptionEngine::with_factory(Arc::new(store), Arc::new(factory.clone()))
        .await
        .unwrap()
}

fn three_sentences() -> Vec<bookscene_engine::RawCandidate> {
    vec![
        candidate(0, 66, DescriptionType::Location, 0.8),
        candidate(67, 133, DescriptionType::Location, 0.7),
        candidate(134, 200, DescriptionType::Object, 0.9),
    ]
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_merge_scenario() {
    let mocks = factory(|name| match name {
        "general" => MockAdapter::fixed(name, vec![candidate(10, 120, DescriptionType::Location, 0.8)]),
        "specialist" => MockAdapter::fixed(name, vec![candidate(15, 118, DescriptionType::Location, 0.9)]),
        "zero_shot" => MockAdapter::fixed(name, vec![candidate(12, 121, DescriptionType::Location, 0.6)]),
        _ => MockAdapter::fixed(name, vec![]),
    });
    let engine = engine(base_store(), &mocks).await;

    let result = engine.process(&sample_text(), Some(StrategyKind::Ensemble)).await.unwrap();

    assert_eq!(result.strategy_used, StrategyKind::Ensemble);
    assert_eq!(result.processors_used.len(), 4);
    assert_eq!(result.descriptions.len(), 1);

    let d = &result.descriptions[0];
    assert_eq!(d.span, TextSpan::new(10, 121));
    assert!((d.consensus_weight - 0.8).abs() < 1e-9);
    let expected = (1.0 * 0.8 + 1.2 * 0.9 + 1.0 * 0.6) / 3.2;
    assert!((d.weighted_confidence - expected).abs() < 1e-9);
    assert_eq!(d.contributing_processors.len(), 3);
    assert!(!d.contributing_processors.contains(&"dependency".to_string()));
    assert_eq!(d.text, span_text(&sample_text(), &d.span));
    assert!(d.quality_score > 0.0);
    assert!(d.priority_score > 0.0);

    assert_eq!(result.attempts.len(), 1);
    assert!(!result.quality_metrics.degraded);
}

#[tokio::test]
async fn test_empty_input_returns_empty_result() {
    let mocks = factory(|name| MockAdapter::fixed(name, three_sentences()));
    let engine = engine(base_store(), &mocks).await;

    for text in ["", "   \n\t  ", "Too short."] {
        let result = engine.process(text, None).await.unwrap();
        assert!(result.descriptions.is_empty());
        assert!(result.processors_used.is_empty());
        assert!(result.attempts.is_empty());
        assert_eq!(result.strategy_used, StrategyKind::Adaptive);
        assert!(result.processing_time > Duration::ZERO);
    }
    let explicit = engine.process("Too short.", Some(StrategyKind::Parallel)).await.unwrap();
    assert_eq!(explicit.strategy_used, StrategyKind::Parallel);
    assert!(explicit.attempts.is_empty());

    assert_eq!(mocks.adapter("general").unwrap().call_count(), 0);
    assert_eq!(engine.get_statistics().empty_inputs, 4);
}

#[tokio::test]
async fn test_one_timeout_out_of_four() {
    let store = base_store().with_setting("engine", "processor_timeout_ms", "100");
    let mocks = factory(|name| match name {
        "zero_shot" => MockAdapter::delayed(name, Duration::from_secs(10), three_sentences()),
        _ => MockAdapter::fixed(name, three_sentences()),
    });
    let engine = engine(store, &mocks).await;

    let result = engine.process(&sample_text(), Some(StrategyKind::Ensemble)).await.unwrap();

    assert_eq!(result.processors_used.len(), 3);
    assert_eq!(result.quality_metrics.failed_processors, vec!["zero_shot"]);
    assert!(result.quality_metrics.degraded);
    assert_eq!(result.descriptions.len(), 3);
    assert!(result.descriptions.iter().all(|d| (d.consensus_weight - 1.0).abs() < 1e-9));
}

#[tokio::test]
async fn test_completion_order_does_not_change_output() {
    let delays = [[5u64, 40, 20, 60], [60, 5, 40, 20], [20, 60, 5, 40]];
    let mut outputs = Vec::new();

    for permutation in delays {
        let mocks = NAMES
            .iter()
            .zip(permutation)
            .fold(MockFactory::new(), |f, (name, ms)| {
                f.with(MockAdapter::delayed(*name, Duration::from_millis(ms), three_sentences()))
            });
        let engine = engine(base_store(), &mocks).await;
        let result = engine.process(&sample_text(), Some(StrategyKind::Ensemble)).await.unwrap();
        outputs.push(result.descriptions);
    }

    let starts: Vec<usize> = outputs[0].iter().map(|d| d.span.start).collect();
    assert_eq!(starts, vec![0, 67, 134]);
    assert_eq!(outputs[0], outputs[1]);
    assert_eq!(outputs[1], outputs[2]);
}

#[tokio::test]
async fn test_identical_calls_yield_identical_descriptions() {
    let mocks = factory(|name| MockAdapter::fixed(name, three_sentences()));
    let engine = engine(base_store(), &mocks).await;

    for mode in [StrategyKind::Ensemble, StrategyKind::Parallel, StrategyKind::Sequential, StrategyKind::Single] {
        let first = engine.process(&sample_text(), Some(mode)).await.unwrap();
        let second = engine.process(&sample_text(), Some(mode)).await.unwrap();
        assert_eq!(first.descriptions, second.descriptions, "{}", mode);
        assert_ne!(first.request_id, second.request_id);
    }
}

// ============================================================================
// Fallback and degradation
// ============================================================================

#[tokio::test]
async fn test_quorum_failure_walks_fallback_chain() {
    let mocks = factory(|name| match name {
        "specialist" => MockAdapter::fixed(name, three_sentences()),
        _ => MockAdapter::failing(name, "backend crashed"),
    });
    let engine = engine(base_store(), &mocks).await;

    let result = engine.process(&sample_text(), Some(StrategyKind::Ensemble)).await.unwrap();

    assert_eq!(result.strategy_used, StrategyKind::Single);
    let tried: Vec<StrategyKind> = result.attempts.iter().map(|a| a.strategy).collect();
    assert_eq!(tried, vec![StrategyKind::Ensemble, StrategyKind::Parallel, StrategyKind::Single]);
    assert!(result.attempts[0].error.is_some());
    assert!(result.attempts[2].error.is_none());
    assert_eq!(result.processors_used, vec!["specialist"]);
    assert!(result.quality_metrics.degraded);
    assert!(!result.recommendations.is_empty());

    let stats = engine.get_statistics();
    assert_eq!(stats.fallbacks, 2);
    assert_eq!(stats.successful_requests, 1);
}

#[tokio::test]
async fn test_all_strategies_failing_surfaces_quorum_error() {
    let mocks = factory(|name| MockAdapter::failing(name, "backend crashed"));
    let engine = engine(base_store(), &mocks).await;

    let err = engine.process(&sample_text(), Some(StrategyKind::Ensemble)).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::EnsembleQuorum {
            strategy: StrategyKind::Single,
            ..
        }
    ));
    assert_eq!(engine.get_statistics().failed_requests, 1);
}

#[tokio::test]
async fn test_strategy_timeout_falls_back() {
    let store = base_store()
        .with_setting("engine", "strategy_timeout_ms", "250")
        .with_setting("engine", "sequential_quality_threshold", "1.0");
    let mocks = factory(|name| MockAdapter::delayed(name, Duration::from_millis(100), three_sentences()));
    let engine = engine(store, &mocks).await;

    // Sequential is outside the chain, so it falls back straight to Single
    let result = engine.process(&sample_text(), Some(StrategyKind::Sequential)).await.unwrap();

    assert_eq!(result.strategy_used, StrategyKind::Single);
    assert_eq!(result.attempts.len(), 2);
    assert_eq!(result.attempts[0].strategy, StrategyKind::Sequential);
    assert!(result.attempts[0].error.as_deref().unwrap_or_default().contains("timed out"));
}

#[tokio::test]
async fn test_degraded_processor_skipped_until_health_check() {
    let mocks = factory(|name| match name {
        "specialist" => MockAdapter::failing(name, "model crashed"),
        _ => MockAdapter::fixed(name, three_sentences()),
    });
    let engine = engine(base_store(), &mocks).await;

    // Single always picks the heaviest processor (specialist, 1.2)
    for _ in 0..3 {
        assert!(engine.process(&sample_text(), Some(StrategyKind::Single)).await.is_err());
    }
    let status = engine.get_processor_status().await;
    assert!(status["specialist"].degraded);
    assert_eq!(status["specialist"].consecutive_failures, 3);
    assert_eq!(status["specialist"].last_error.as_deref(), Some("Backend error: model crashed"));

    let result = engine.process(&sample_text(), Some(StrategyKind::Single)).await.unwrap();
    assert_eq!(result.processors_used, vec!["general"]);

    let status = engine.health_check().await;
    assert!(!status["specialist"].degraded);
    assert_eq!(status["specialist"].consecutive_failures, 0);
}

#[tokio::test]
async fn test_unavailable_processor_excluded_until_available() {
    let mocks = factory(|name| MockAdapter::fixed(name, three_sentences()));
    let engine = engine(base_store(), &mocks).await;

    mocks.adapter("zero_shot").unwrap().set_available(false);
    let status = engine.health_check().await;
    assert!(!status["zero_shot"].available);

    let result = engine.process(&sample_text(), Some(StrategyKind::Ensemble)).await.unwrap();
    assert_eq!(result.processors_used.len(), 3);

    mocks.adapter("zero_shot").unwrap().set_available(true);
    engine.health_check().await;
    let result = engine.process(&sample_text(), Some(StrategyKind::Ensemble)).await.unwrap();
    assert_eq!(result.processors_used.len(), 4);
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn test_cancelled_before_start() {
    let mocks = factory(|name| MockAdapter::fixed(name, three_sentences()));
    let engine = engine(base_store(), &mocks).await;

    let token = CancellationToken::new();
    token.cancel();
    let err = engine
        .process_with_cancel(&sample_text(), Some(StrategyKind::Ensemble), token)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Cancelled));
    assert_eq!(mocks.adapter("general").unwrap().call_count(), 0);
}

#[tokio::test]
async fn test_cancelled_mid_call() {
    let mocks = factory(|name| MockAdapter::delayed(name, Duration::from_secs(5), three_sentences()));
    let engine = engine(base_store(), &mocks).await;

    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let err = engine
        .process_with_cancel(&sample_text(), Some(StrategyKind::Ensemble), token)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(engine.in_flight(), 0);
}

// ============================================================================
// Adaptive and configuration
// ============================================================================

#[tokio::test]
async fn test_adaptive_uses_single_for_short_text() {
    let mocks = factory(|name| MockAdapter::fixed(name, three_sentences()));
    let engine = engine(base_store(), &mocks).await;

    let result = engine.process(&sample_text(), None).await.unwrap();
    assert_eq!(result.strategy_used, StrategyKind::Single);
    assert_eq!(result.descriptions.len(), 3);
    assert_eq!(engine.get_statistics().strategy_usage[&StrategyKind::Single], 1);
}

#[tokio::test]
async fn test_reload_applies_new_settings() {
    let store = Arc::new(base_store());
    let mocks = factory(|name| match name {
        "general" => MockAdapter::fixed(name, vec![candidate(10, 120, DescriptionType::Location, 0.8)]),
        "specialist" => MockAdapter::fixed(name, vec![candidate(15, 118, DescriptionType::Location, 0.9)]),
        "zero_shot" => MockAdapter::fixed(name, vec![candidate(12, 121, DescriptionType::Location, 0.6)]),
        _ => MockAdapter::fixed(name, vec![]),
    });
    let engine = DescriptionEngine::with_factory(store.clone(), Arc::new(mocks.clone()))
        .await
        .unwrap();

    let before = engine.process(&sample_text(), Some(StrategyKind::Ensemble)).await.unwrap();
    assert_eq!(before.descriptions.len(), 1);

    // Consensus of 0.8 no longer passes
    store.set("engine", "consensus_threshold", "0.9").unwrap();
    engine.reload_config().await.unwrap();
    assert!((engine.config().await.engine.consensus_threshold - 0.9).abs() < 1e-9);

    let after = engine.process(&sample_text(), Some(StrategyKind::Ensemble)).await.unwrap();
    assert!(after.descriptions.is_empty());
}

#[tokio::test]
async fn test_invalid_reload_keeps_current_config() {
    let store = Arc::new(base_store());
    let mocks = factory(|name| MockAdapter::fixed(name, three_sentences()));
    let engine = DescriptionEngine::with_factory(store.clone(), Arc::new(mocks.clone()))
        .await
        .unwrap();

    store.set("processor.general", "weight", "-1").unwrap();
    let err = engine.reload_config().await.unwrap_err();
    assert!(matches!(err, EngineError::ConfigValidation(_)));

    let config = engine.config().await;
    assert!((config.processor("general").unwrap().weight - 1.0).abs() < 1e-9);
    assert!(engine.process(&sample_text(), Some(StrategyKind::Ensemble)).await.is_ok());
}

#[tokio::test]
async fn test_reload_keeps_health_records() {
    let store = Arc::new(base_store());
    let mocks = factory(|name| match name {
        "specialist" => MockAdapter::failing(name, "model crashed"),
        _ => MockAdapter::fixed(name, three_sentences()),
    });
    let engine = DescriptionEngine::with_factory(store.clone(), Arc::new(mocks.clone()))
        .await
        .unwrap();

    let _ = engine.process(&sample_text(), Some(StrategyKind::Single)).await;
    engine.reload_config().await.unwrap();
    assert_eq!(engine.get_processor_status().await["specialist"].total_failures, 1);
}

#[tokio::test]
async fn test_too_few_processors_fails_construction() {
    let mocks = MockFactory::new().with(MockAdapter::fixed("general", vec![]));
    let result = DescriptionEngine::with_factory(Arc::new(base_store()), Arc::new(mocks)).await;
    assert!(matches!(result, Err(EngineError::ProcessorUnavailable { available: 1, required: 2 })));
}

// ============================================================================
// Built-in backends
// ============================================================================

const PASSAGE: &str = "The old castle stood on a steep hill above the dark forest, its grey towers \
    black against the evening sky. A cold wind carried the smell of rain across the empty courtyard. \
    \"We should go,\" she said. \
    The stranger was a tall man with a scarred face, long grey hair and a heavy black cloak. \
    On the oak table lay a rusty sword, an iron key and a small silver lantern. \
    The mist was thick and silent, and the village below was lost in the gloom of the valley.";

#[tokio::test]
async fn test_builtin_backends_end_to_end() {
    let engine = DescriptionEngine::new(Arc::new(MemorySettingsStore::new())).await.unwrap();

    let result = engine.process(PASSAGE, Some(StrategyKind::Parallel)).await.unwrap();

    assert_eq!(result.processors_used.len(), 4);
    assert!(!result.descriptions.is_empty());
    assert!(result.descriptions.windows(2).all(|w| w[0].span.start <= w[1].span.start));
    for d in &result.descriptions {
        assert_eq!(d.text, span_text(PASSAGE, &d.span));
        assert!((0.0..=1.0).contains(&d.confidence));
        assert!((0.0..=100.0).contains(&d.priority_score));
    }

    let json = serde_json::to_string(&result).unwrap();
    assert!(json.contains("\"strategy_used\""));
}

#[tokio::test]
async fn test_builtin_backends_every_mode_succeeds() {
    let engine = DescriptionEngine::new(Arc::new(MemorySettingsStore::new())).await.unwrap();

    for mode in [
        StrategyKind::Single,
        StrategyKind::Parallel,
        StrategyKind::Sequential,
        StrategyKind::Ensemble,
        StrategyKind::Adaptive,
    ] {
        let result = engine.process(PASSAGE, Some(mode)).await;
        assert!(result.is_ok(), "{}: {:?}", mode, result.err());
    }
    assert_eq!(engine.get_statistics().total_requests, 5);
}

#[tokio::test]
async fn test_builtin_backends_cut_off_at_processor_timeout() {
    let store = MemorySettingsStore::new().with_setting("engine", "processor_timeout_ms", 1);
    let engine = DescriptionEngine::new(Arc::new(store)).await.unwrap();
    let text = PASSAGE.repeat(1_000);

    let result = engine.process(&text, Some(StrategyKind::Ensemble)).await;

    assert!(
        matches!(result, Err(EngineError::EnsembleQuorum { succeeded: 0, .. })),
        "expected every backend to time out, got {:?}",
        result.map(|r| r.processors_used)
    );
    for (name, health) in engine.get_processor_status().await {
        assert!(health.total_failures >= 1, "{} recorded no failure", name);
        let last_error = health.last_error.unwrap_or_default();
        assert!(last_error.contains("timed out"), "{}: {}", name, last_error);
    }
}
