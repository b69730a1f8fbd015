//! Mock adapters for tests
//!
//! Scriptable [`ProcessorAdapter`] implementations: fixed output, failure,
//! delay (for timeout and completion-order tests) and availability toggling.
//! [`MockFactory`] hands them to the registry by processor name.

use super::{AdapterFactory, ProcessorAdapter};
use crate::config_loader::ProcessorConfig;
use crate::error::ExtractionError;
use crate::types::{DescriptionType, RawCandidate, TextSpan};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// What a mock does when called
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Return these candidates
    Fixed(Vec<RawCandidate>),
    /// Sleep, then return these candidates
    Delayed(Duration, Vec<RawCandidate>),
    /// Return a backend error
    Fail(String),
}

pub struct MockAdapter {
    name: String,
    behavior: MockBehavior,
    available: AtomicBool,
    calls: AtomicUsize,
}

impl MockAdapter {
    pub fn new(name: impl Into<String>, behavior: MockBehavior) -> Self {
        Self {
            name: name.into(),
            behavior,
            available: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn fixed(name: impl Into<String>, candidates: Vec<RawCandidate>) -> Self {
        Self::new(name, MockBehavior::Fixed(candidates))
    }

    pub fn delayed(name: impl Into<String>, delay: Duration, candidates: Vec<RawCandidate>) -> Self {
        Self::new(name, MockBehavior::Delayed(delay, candidates))
    }

    pub fn failing(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(name, MockBehavior::Fail(message.into()))
    }

    /// Mark the mock unavailable from the start
    pub fn unavailable(self) -> Self {
        self.available.store(false, Ordering::SeqCst);
        self
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProcessorAdapter for MockAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        "mock"
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn extract(&self, _text: &str) -> Result<Vec<RawCandidate>, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            MockBehavior::Fixed(candidates) => Ok(candidates.clone()),
            MockBehavior::Delayed(delay, candidates) => {
                tokio::time::sleep(*delay).await;
                Ok(candidates.clone())
            }
            MockBehavior::Fail(message) => Err(ExtractionError::Backend(message.clone())),
        }
    }
}

/// Candidate shorthand
pub fn candidate(start: usize, end: usize, description_type: DescriptionType, confidence: f64) -> RawCandidate {
    RawCandidate::new(TextSpan::new(start, end), description_type, confidence)
}

/// Factory returning pre-built mocks by processor name
///
/// Names without a registered mock fail initialization with `NotAvailable`.
#[derive(Default, Clone)]
pub struct MockFactory {
    adapters: HashMap<String, Arc<MockAdapter>>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, adapter: MockAdapter) -> Self {
        self.adapters.insert(adapter.name.clone(), Arc::new(adapter));
        self
    }

    pub fn adapter(&self, name: &str) -> Option<Arc<MockAdapter>> {
        self.adapters.get(name).cloned()
    }
}

impl AdapterFactory for MockFactory {
    fn create(&self, config: &ProcessorConfig) -> Result<Arc<dyn ProcessorAdapter>, ExtractionError> {
        self.adapters
            .get(&config.name)
            .map(|adapter| adapter.clone() as Arc<dyn ProcessorAdapter>)
            .ok_or_else(|| ExtractionError::NotAvailable(format!("no mock registered for '{}'", config.name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_counts_calls_and_fails() {
        let ok = MockAdapter::fixed("a", vec![candidate(0, 10, DescriptionType::Object, 0.5)]);
        assert_eq!(ok.extract("text").await.unwrap().len(), 1);
        assert_eq!(ok.call_count(), 1);

        let bad = MockAdapter::failing("b", "boom");
        assert_eq!(
            bad.extract("text").await,
            Err(ExtractionError::Backend("boom".to_string()))
        );
    }

    #[test]
    fn test_factory_lookup() {
        let factory = MockFactory::new().with(MockAdapter::fixed("general", vec![]));
        let config = ProcessorConfig::new("general", crate::processors::ProcessorKind::GeneralTagger);
        assert!(factory.create(&config).is_ok());

        let other = ProcessorConfig::new("zero_shot", crate::processors::ProcessorKind::ZeroShot);
        assert!(matches!(factory.create(&other), Err(ExtractionError::NotAvailable(_))));
    }
}
