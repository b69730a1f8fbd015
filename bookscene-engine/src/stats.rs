//! Engine statistics
//!
//! Process-lifetime counters. Totals are lock-free atomics; per-strategy and
//! per-processor usage maps sit behind a mutex (updated once per call, off
//! the adapter hot path).

use crate::types::{ProcessingResult, StrategyKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

#[derive(Debug, Default)]
struct UsageCounts {
    strategies: BTreeMap<StrategyKind, u64>,
    processors: BTreeMap<String, u64>,
}

/// Engine statistics collector
#[derive(Debug, Default)]
pub struct EngineStatistics {
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    fallbacks: AtomicU64,
    empty_inputs: AtomicU64,
    descriptions_produced: AtomicU64,
    /// Sum of processing time of successful calls (microseconds)
    total_processing_us: AtomicU64,
    usage: Mutex<UsageCounts>,
}

/// Serializable view of [`EngineStatistics`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub fallbacks: u64,
    pub empty_inputs: u64,
    pub descriptions_produced: u64,
    pub average_processing_time: Duration,
    pub strategy_usage: BTreeMap<StrategyKind, u64>,
    pub processor_usage: BTreeMap<String, u64>,
}

impl EngineStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_empty_input(&self) {
        self.empty_inputs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed call
    pub fn record_success(&self, result: &ProcessingResult) {
        self.successful_requests.fetch_add(1, Ordering::Relaxed);
        self.descriptions_produced
            .fetch_add(result.descriptions.len() as u64, Ordering::Relaxed);
        self.total_processing_us
            .fetch_add(result.processing_time.as_micros() as u64, Ordering::Relaxed);

        let mut usage = self.usage.lock().unwrap_or_else(PoisonError::into_inner);
        *usage.strategies.entry(result.strategy_used).or_default() += 1;
        for processor in &result.processors_used {
            *usage.processors.entry(processor.clone()).or_default() += 1;
        }
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        let successful = self.successful_requests.load(Ordering::Relaxed);
        let total_us = self.total_processing_us.load(Ordering::Relaxed);
        let average_processing_time = if successful == 0 {
            Duration::ZERO
        } else {
            Duration::from_micros(total_us / successful)
        };
        let usage = self.usage.lock().unwrap_or_else(PoisonError::into_inner);

        StatisticsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_requests: successful,
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
            empty_inputs: self.empty_inputs.load(Ordering::Relaxed),
            descriptions_produced: self.descriptions_produced.load(Ordering::Relaxed),
            average_processing_time,
            strategy_usage: usage.strategies.clone(),
            processor_usage: usage.processors.clone(),
        }
    }
}
