//! Processor registry
//!
//! Initializes adapters from configuration, tracks their health and hands the
//! usable ones to strategies.
//!
//! # Health model
//! - Every call outcome is recorded atomically (`record_success` / `record_failure`)
//! - `failure_threshold` consecutive failures mark a processor **degraded**:
//!   it stays registered but is skipped by [`ProcessorRegistry::get_active_processors`]
//! - [`ProcessorRegistry::health_check`] clears the degraded mark of any
//!   processor that reports itself available again

use crate::config_loader::ProcessorConfig;
use crate::error::{EngineError, EngineResult, ExtractionError};
use crate::processors::{AdapterFactory, ProcessorAdapter};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, info, warn};

/// Minimum number of usable processors for the registry to start
pub const MIN_REGISTRY_QUORUM: usize = 2;

// ============================================================================
// Health
// ============================================================================

/// Live health record of one processor
#[derive(Debug)]
pub struct ProcessorHealth {
    available: AtomicBool,
    degraded: AtomicBool,
    consecutive_failures: AtomicU32,
    total_calls: AtomicU64,
    total_failures: AtomicU64,
    last_error: Mutex<Option<String>>,
}

/// Serializable view of [`ProcessorHealth`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub available: bool,
    pub degraded: bool,
    pub consecutive_failures: u32,
    pub total_calls: u64,
    pub total_failures: u64,
    pub last_error: Option<String>,
}

impl ProcessorHealth {
    pub fn new(available: bool) -> Self {
        Self {
            available: AtomicBool::new(available),
            degraded: AtomicBool::new(false),
            consecutive_failures: AtomicU32::new(0),
            total_calls: AtomicU64::new(0),
            total_failures: AtomicU64::new(0),
            last_error: Mutex::new(None),
        }
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Acquire)
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Acquire)
    }

    pub fn record_success(&self) {
        self.total_calls.fetch_add(1, Ordering::AcqRel);
        self.consecutive_failures.store(0, Ordering::Release);
    }

    /// Record a failure; returns true when this failure degraded the processor
    pub fn record_failure(&self, error: &ExtractionError, failure_threshold: u32) -> bool {
        self.total_calls.fetch_add(1, Ordering::AcqRel);
        self.total_failures.fetch_add(1, Ordering::AcqRel);
        *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) = Some(error.to_string());

        let failures = self.consecutive_failures.fetch_add(1, Ordering::AcqRel) + 1;
        if matches!(error, ExtractionError::NotAvailable(_)) {
            self.available.store(false, Ordering::Release);
        }
        failures >= failure_threshold && !self.degraded.swap(true, Ordering::AcqRel)
    }

    fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    fn recover(&self) {
        self.degraded.store(false, Ordering::Release);
        self.consecutive_failures.store(0, Ordering::Release);
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            available: self.is_available(),
            degraded: self.is_degraded(),
            consecutive_failures: self.consecutive_failures(),
            total_calls: self.total_calls.load(Ordering::Acquire),
            total_failures: self.total_failures.load(Ordering::Acquire),
            last_error: self.last_error.lock().unwrap_or_else(PoisonError::into_inner).clone(),
        }
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Adapter paired with its config and health handle
#[derive(Clone)]
pub struct ActiveProcessor {
    pub adapter: Arc<dyn ProcessorAdapter>,
    pub config: ProcessorConfig,
    pub health: Arc<ProcessorHealth>,
}

impl ActiveProcessor {
    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn weight(&self) -> f64 {
        self.config.weight
    }
}

impl std::fmt::Debug for ActiveProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveProcessor")
            .field("name", &self.config.name)
            .field("version", &self.adapter.version())
            .field("weight", &self.config.weight)
            .finish()
    }
}

/// Registered processors, in registration order
#[derive(Debug)]
pub struct ProcessorRegistry {
    entries: Vec<ActiveProcessor>,
    failure_threshold: u32,
}

impl ProcessorRegistry {
    /// Initialize every enabled processor
    ///
    /// A processor whose initialization fails (or that reports itself
    /// unavailable) is logged and left out. Health records in `previous` are
    /// carried over for processors with the same name.
    ///
    /// # Errors
    /// `EngineError::ProcessorUnavailable` when fewer than
    /// [`MIN_REGISTRY_QUORUM`] processors are usable
    pub fn load(
        configs: &[ProcessorConfig],
        factory: &dyn AdapterFactory,
        failure_threshold: u32,
        previous: Option<&ProcessorRegistry>,
    ) -> EngineResult<Self> {
        let mut entries = Vec::new();
        for config in configs.iter().filter(|c| c.enabled) {
            let adapter = match factory.create(config) {
                Ok(adapter) => adapter,
                Err(e) => {
                    error!(processor = %config.name, error = %e, "Processor initialization failed");
                    continue;
                }
            };
            if !adapter.is_available() {
                warn!(processor = %config.name, "Processor reports unavailable, excluded");
                continue;
            }

            let health = previous
                .and_then(|registry| registry.health_of(&config.name))
                .unwrap_or_else(|| Arc::new(ProcessorHealth::new(true)));
            health.set_available(true);

            info!(
                processor = %config.name,
                version = adapter.version(),
                weight = config.weight,
                "Processor registered"
            );
            entries.push(ActiveProcessor {
                adapter,
                config: config.clone(),
                health,
            });
        }

        if entries.len() < MIN_REGISTRY_QUORUM {
            error!(
                available = entries.len(),
                required = MIN_REGISTRY_QUORUM,
                "Not enough processors available"
            );
            return Err(EngineError::ProcessorUnavailable {
                available: entries.len(),
                required: MIN_REGISTRY_QUORUM,
            });
        }

        Ok(Self {
            entries,
            failure_threshold: failure_threshold.max(1),
        })
    }

    /// Processors that are enabled, available and not degraded, in registration order
    pub fn get_active_processors(&self) -> Vec<ActiveProcessor> {
        self.entries
            .iter()
            .filter(|e| e.health.is_available() && !e.health.is_degraded())
            .cloned()
            .collect()
    }

    /// Every registered processor, including degraded ones
    pub fn processors(&self) -> &[ActiveProcessor] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    fn health_of(&self, name: &str) -> Option<Arc<ProcessorHealth>> {
        self.entries
            .iter()
            .find(|e| e.config.name == name)
            .map(|e| Arc::clone(&e.health))
    }

    /// Poll availability of every processor
    ///
    /// Available processors lose their degraded mark; unavailable ones are
    /// excluded until a later check finds them available.
    pub fn health_check(&self) -> BTreeMap<String, HealthSnapshot> {
        for entry in &self.entries {
            let available = entry.adapter.is_available();
            entry.health.set_available(available);
            if available && entry.health.is_degraded() {
                info!(processor = %entry.config.name, "Processor recovered");
                entry.health.recover();
            } else if !available {
                warn!(processor = %entry.config.name, "Processor unavailable");
            }
        }
        debug!(processors = self.entries.len(), "Health check complete");
        self.status()
    }

    pub fn record_success(&self, processor: &ActiveProcessor) {
        processor.health.record_success();
    }

    pub fn record_failure(&self, processor: &ActiveProcessor, error: &ExtractionError) {
        if processor.health.record_failure(error, self.failure_threshold) {
            warn!(
                processor = %processor.config.name,
                consecutive_failures = processor.health.consecutive_failures(),
                "Processor degraded, excluded until next health check"
            );
        }
    }

    /// Health snapshot per processor
    pub fn status(&self) -> BTreeMap<String, HealthSnapshot> {
        self.entries
            .iter()
            .map(|e| (e.config.name.clone(), e.health.snapshot()))
            .collect()
    }
}
