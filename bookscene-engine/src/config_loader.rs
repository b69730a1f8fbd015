//! Processor and engine configuration
//!
//! Builds an immutable [`EngineConfig`] snapshot from built-in defaults merged
//! with values read from a [`SettingsStore`]:
//!
//! | Category | Keys |
//! |----------|------|
//! | `engine` | every [`EngineSettings`] field (durations in ms, lists comma-separated) |
//! | `processor.<name>` | `enabled`, `weight`, `confidence_threshold`; any other key is an extra param |
//!
//! Validation happens once at load time. Malformed or out-of-range values are
//! reported as [`EngineError::ConfigValidation`]; no value is silently
//! replaced by its default.

use crate::error::{EngineError, EngineResult};
use crate::processors::ProcessorKind;
use crate::types::{DescriptionType, StrategyKind};
use bookscene_common::{CategorySettings, SettingsStore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Settings category for engine-wide values
pub const ENGINE_CATEGORY: &str = "engine";

/// Settings category for one processor
pub fn processor_category(name: &str) -> String {
    format!("processor.{}", name)
}

// ============================================================================
// Processor Configuration
// ============================================================================

/// Per-processor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    pub name: String,
    pub kind: ProcessorKind,
    pub enabled: bool,
    /// Voting weight (> 0)
    pub weight: f64,
    /// Candidates below this confidence are dropped (0.0-1.0)
    pub confidence_threshold: f64,
    /// Kind-specific parameters
    pub extra: BTreeMap<String, String>,
}

impl ProcessorConfig {
    /// Config with the kind's defaults under a custom name
    pub fn new(name: impl Into<String>, kind: ProcessorKind) -> Self {
        Self {
            name: name.into(),
            kind,
            enabled: true,
            weight: kind.default_weight(),
            confidence_threshold: kind.default_confidence_threshold(),
            extra: kind
                .default_extra()
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Config with the kind's defaults under the kind's own name
    pub fn with_defaults(kind: ProcessorKind) -> Self {
        Self::new(kind.as_str(), kind)
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_threshold(mut self, confidence_threshold: f64) -> Self {
        self.confidence_threshold = confidence_threshold;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Merge values from the settings store over the defaults
    pub fn apply_settings(&mut self, values: &CategorySettings) -> EngineResult<()> {
        let category = processor_category(&self.name);
        // Sorted for deterministic error reporting
        let sorted: BTreeMap<&String, &String> = values.iter().collect();
        for (key, raw) in sorted {
            match key.as_str() {
                "enabled" => self.enabled = parse_bool(&category, key, raw)?,
                "weight" => self.weight = parse_value(&category, key, raw)?,
                "confidence_threshold" => self.confidence_threshold = parse_value(&category, key, raw)?,
                _ => {
                    self.extra.insert(key.clone(), raw.trim().to_string());
                }
            }
        }
        Ok(())
    }

    /// Check weight, threshold and the kind's required parameters
    pub fn validate(&self) -> EngineResult<()> {
        if !self.weight.is_finite() || self.weight <= 0.0 {
            return Err(invalid(format!(
                "processor '{}': weight must be > 0, got {}",
                self.name, self.weight
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(invalid(format!(
                "processor '{}': confidence_threshold must be within [0, 1], got {}",
                self.name, self.confidence_threshold
            )));
        }
        if !self.enabled {
            return Ok(());
        }
        for param in self.kind.required_params() {
            let present = self.extra.get(*param).is_some_and(|v| !v.trim().is_empty());
            if !present {
                return Err(invalid(format!(
                    "processor '{}': required parameter '{}' is missing",
                    self.name, param
                )));
            }
        }
        self.kind
            .validate_extra(&self.extra)
            .map_err(|e| invalid(format!("processor '{}': {}", self.name, e)))
    }
}

// ============================================================================
// Engine Settings
// ============================================================================

/// Thresholds for the adaptive strategy decision
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveThresholds {
    /// Load at or above which only Single runs
    pub high_load: f64,
    /// Load at or above which Sequential runs
    pub elevated_load: f64,
    /// Texts shorter than this (chars) use Single
    pub short_text_chars: usize,
    /// Texts at least this long (chars) use Parallel
    pub long_text_chars: usize,
    /// Complexity at or above which Ensemble runs
    pub high_complexity: f64,
}

impl Default for AdaptiveThresholds {
    fn default() -> Self {
        Self {
            high_load: 0.85,
            elevated_load: 0.60,
            short_text_chars: 1_000,
            long_text_chars: 20_000,
            high_complexity: 0.55,
        }
    }
}

/// Engine-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Texts with fewer content chars return an empty result
    pub min_text_length: usize,
    pub min_description_length: usize,
    pub max_description_length: usize,
    /// Final descriptions below this confidence are dropped
    pub min_confidence: f64,
    /// Cap on descriptions per call (highest ranked kept)
    pub max_descriptions: usize,
    pub consensus_threshold: f64,
    pub merge_overlap_ratio: f64,
    /// Bytes of gap tolerated between spans when clustering
    pub merge_gap: usize,
    /// Successful processors required by Parallel and Ensemble
    pub min_quorum: usize,
    pub processor_timeout_ms: u64,
    pub strategy_timeout_ms: u64,
    /// Consecutive failures before a processor is marked degraded
    pub failure_threshold: u32,
    pub sequential_quality_threshold: f64,
    /// Share of the quality score in a candidate's confidence
    pub quality_blend: f64,
    /// In-flight calls counted as full load
    pub max_concurrent_calls: usize,
    pub description_types: Vec<DescriptionType>,
    pub adaptive: AdaptiveThresholds,
    pub fallback_chain: Vec<StrategyKind>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            min_text_length: 20,
            min_description_length: 20,
            max_description_length: 4_000,
            min_confidence: 0.0,
            max_descriptions: 500,
            consensus_threshold: 0.6,
            merge_overlap_ratio: 0.5,
            merge_gap: 0,
            min_quorum: 2,
            processor_timeout_ms: 10_000,
            strategy_timeout_ms: 30_000,
            failure_threshold: 3,
            sequential_quality_threshold: 0.7,
            quality_blend: 0.5,
            max_concurrent_calls: 8,
            description_types: DescriptionType::ALL.to_vec(),
            adaptive: AdaptiveThresholds::default(),
            fallback_chain: vec![StrategyKind::Ensemble, StrategyKind::Parallel, StrategyKind::Single],
        }
    }
}

impl EngineSettings {
    pub fn processor_timeout(&self) -> Duration {
        Duration::from_millis(self.processor_timeout_ms)
    }

    pub fn strategy_timeout(&self) -> Duration {
        Duration::from_millis(self.strategy_timeout_ms)
    }

    /// Merge values from the `engine` category over the defaults
    pub fn apply_settings(&mut self, values: &CategorySettings) -> EngineResult<()> {
        let c = ENGINE_CATEGORY;
        let sorted: BTreeMap<&String, &String> = values.iter().collect();
        for (key, raw) in sorted {
            match key.as_str() {
                "min_text_length" => self.min_text_length = parse_value(c, key, raw)?,
                "min_description_length" => self.min_description_length = parse_value(c, key, raw)?,
                "max_description_length" => self.max_description_length = parse_value(c, key, raw)?,
                "min_confidence" => self.min_confidence = parse_value(c, key, raw)?,
                "max_descriptions" => self.max_descriptions = parse_value(c, key, raw)?,
                "consensus_threshold" => self.consensus_threshold = parse_value(c, key, raw)?,
                "merge_overlap_ratio" => self.merge_overlap_ratio = parse_value(c, key, raw)?,
                "merge_gap" => self.merge_gap = parse_value(c, key, raw)?,
                "min_quorum" => self.min_quorum = parse_value(c, key, raw)?,
                "processor_timeout_ms" => self.processor_timeout_ms = parse_value(c, key, raw)?,
                "strategy_timeout_ms" => self.strategy_timeout_ms = parse_value(c, key, raw)?,
                "failure_threshold" => self.failure_threshold = parse_value(c, key, raw)?,
                "sequential_quality_threshold" => {
                    self.sequential_quality_threshold = parse_value(c, key, raw)?
                }
                "quality_blend" => self.quality_blend = parse_value(c, key, raw)?,
                "max_concurrent_calls" => self.max_concurrent_calls = parse_value(c, key, raw)?,
                "description_types" => self.description_types = parse_list(c, key, raw)?,
                "fallback_chain" => self.fallback_chain = parse_list(c, key, raw)?,
                "adaptive_high_load" => self.adaptive.high_load = parse_value(c, key, raw)?,
                "adaptive_elevated_load" => self.adaptive.elevated_load = parse_value(c, key, raw)?,
                "adaptive_short_text_chars" => self.adaptive.short_text_chars = parse_value(c, key, raw)?,
                "adaptive_long_text_chars" => self.adaptive.long_text_chars = parse_value(c, key, raw)?,
                "adaptive_high_complexity" => self.adaptive.high_complexity = parse_value(c, key, raw)?,
                other => warn!(category = c, key = other, "Ignoring unknown engine setting"),
            }
        }
        Ok(())
    }

    /// Check ranges and cross-field constraints
    pub fn validate(&self) -> EngineResult<()> {
        unit_range("consensus_threshold", self.consensus_threshold)?;
        unit_range("merge_overlap_ratio", self.merge_overlap_ratio)?;
        unit_range("min_confidence", self.min_confidence)?;
        unit_range("sequential_quality_threshold", self.sequential_quality_threshold)?;
        unit_range("quality_blend", self.quality_blend)?;
        unit_range("adaptive_high_load", self.adaptive.high_load)?;
        unit_range("adaptive_elevated_load", self.adaptive.elevated_load)?;
        unit_range("adaptive_high_complexity", self.adaptive.high_complexity)?;

        if self.consensus_threshold <= 0.0 {
            return Err(invalid("consensus_threshold must be > 0".to_string()));
        }
        if self.merge_overlap_ratio <= 0.0 {
            return Err(invalid("merge_overlap_ratio must be > 0".to_string()));
        }
        if self.min_description_length > self.max_description_length {
            return Err(invalid(format!(
                "min_description_length ({}) exceeds max_description_length ({})",
                self.min_description_length, self.max_description_length
            )));
        }
        if self.min_quorum < 2 {
            return Err(invalid(format!("min_quorum must be at least 2, got {}", self.min_quorum)));
        }
        for (key, value) in [
            ("max_descriptions", self.max_descriptions as u64),
            ("processor_timeout_ms", self.processor_timeout_ms),
            ("strategy_timeout_ms", self.strategy_timeout_ms),
            ("failure_threshold", u64::from(self.failure_threshold)),
            ("max_concurrent_calls", self.max_concurrent_calls as u64),
        ] {
            if value == 0 {
                return Err(invalid(format!("{} must be > 0", key)));
            }
        }
        if self.adaptive.elevated_load > self.adaptive.high_load {
            return Err(invalid(format!(
                "adaptive_elevated_load ({}) exceeds adaptive_high_load ({})",
                self.adaptive.elevated_load, self.adaptive.high_load
            )));
        }
        if self.adaptive.short_text_chars > self.adaptive.long_text_chars {
            return Err(invalid(format!(
                "adaptive_short_text_chars ({}) exceeds adaptive_long_text_chars ({})",
                self.adaptive.short_text_chars, self.adaptive.long_text_chars
            )));
        }
        if self.description_types.is_empty() {
            return Err(invalid("description_types must not be empty".to_string()));
        }
        if self.fallback_chain.is_empty() {
            return Err(invalid("fallback_chain must not be empty".to_string()));
        }
        if self.fallback_chain.contains(&StrategyKind::Adaptive) {
            return Err(invalid("fallback_chain cannot contain 'adaptive'".to_string()));
        }
        for (i, kind) in self.fallback_chain.iter().enumerate() {
            if self.fallback_chain[..i].contains(kind) {
                return Err(invalid(format!("fallback_chain lists '{}' twice", kind)));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Engine Configuration Snapshot
// ============================================================================

/// Immutable configuration snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Processor configs in registration order
    pub processors: Vec<ProcessorConfig>,
    pub engine: EngineSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            processors: ProcessorKind::ALL.into_iter().map(ProcessorConfig::with_defaults).collect(),
            engine: EngineSettings::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> EngineResult<()> {
        self.engine.validate()?;
        for (i, processor) in self.processors.iter().enumerate() {
            processor.validate()?;
            if self.processors[..i].iter().any(|p| p.name == processor.name) {
                return Err(invalid(format!("duplicate processor name '{}'", processor.name)));
            }
        }
        Ok(())
    }

    pub fn processor(&self, name: &str) -> Option<&ProcessorConfig> {
        self.processors.iter().find(|p| p.name == name)
    }
}

// ============================================================================
// Loader
// ============================================================================

/// Reads and validates configuration from a settings store
pub struct ConfigLoader {
    store: Arc<dyn SettingsStore>,
}

impl ConfigLoader {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store }
    }

    /// Build a validated snapshot
    ///
    /// # Errors
    /// - `EngineError::Settings` if the store cannot be read
    /// - `EngineError::ConfigValidation` on malformed or out-of-range values
    pub async fn load(&self) -> EngineResult<EngineConfig> {
        let mut engine = EngineSettings::default();
        let engine_values = self.store.get_category_settings(ENGINE_CATEGORY).await?;
        engine.apply_settings(&engine_values)?;

        let mut processors = Vec::with_capacity(ProcessorKind::ALL.len());
        for kind in ProcessorKind::ALL {
            let mut processor = ProcessorConfig::with_defaults(kind);
            let values = self
                .store
                .get_category_settings(&processor_category(&processor.name))
                .await?;
            processor.apply_settings(&values)?;
            debug!(
                processor = %processor.name,
                enabled = processor.enabled,
                weight = processor.weight,
                threshold = processor.confidence_threshold,
                "Processor config loaded"
            );
            processors.push(processor);
        }

        let config = EngineConfig { processors, engine };
        config.validate()?;

        info!(
            processors = config.processors.iter().filter(|p| p.enabled).count(),
            consensus_threshold = config.engine.consensus_threshold,
            min_quorum = config.engine.min_quorum,
            "Engine configuration loaded"
        );
        Ok(config)
    }
}

// ============================================================================
// Parsing helpers
// ============================================================================

fn invalid(message: String) -> EngineError {
    EngineError::ConfigValidation(message)
}

fn unit_range(key: &str, value: f64) -> EngineResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(format!("{} must be within [0, 1], got {}", key, value)))
    }
}

fn parse_value<T>(category: &str, key: &str, raw: &str) -> EngineResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| invalid(format!("{}.{}: cannot parse '{}': {}", category, key, raw, e)))
}

fn parse_bool(category: &str, key: &str, raw: &str) -> EngineResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(invalid(format!("{}.{}: '{}' is not a boolean", category, key, raw))),
    }
}

fn parse_list<T>(category: &str, key: &str, raw: &str) -> EngineResult<Vec<T>>
where
    T: FromStr,
    T::Err: Display,
{
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| parse_value(category, key, item))
        .collect()
}
