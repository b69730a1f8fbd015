//! Extraction Backends
//!
//! Every backend implements [`ProcessorAdapter`] so strategies can run them
//! uniformly. The set of backend kinds is fixed and ordered
//! ([`ProcessorKind::ALL`]); no runtime discovery.
//!
//! # Backends
//! 1. **general** - general-purpose tagger: keyword lexicon per sentence
//! 2. **specialist** - language-specialist tagger: stem matching, merges adjacent sentences
//! 3. **dependency** - dependency-style clause patterns (place phrases, subject + appearance verb)
//! 4. **zero_shot** - zero-shot labelling: similarity against label prototypes
//!
//! # Error Isolation
//! Adapters return `ExtractionError`; callers (registry, strategies) catch,
//! log and count it. An adapter error never fails a whole call.

pub mod dependency;
pub mod general;
#[cfg(any(test, feature = "test-support"))]
pub mod mock;
pub mod specialist;
pub mod zero_shot;

use crate::config_loader::ProcessorConfig;
use crate::error::ExtractionError;
use crate::quality::text::{sentence_spans, span_text, tokens};
use crate::types::{DescriptionType, RawCandidate, TextSpan};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub use dependency::DependencyParser;
pub use general::GeneralTagger;
pub use specialist::LanguageSpecialist;
pub use zero_shot::ZeroShotTagger;

/// Uniform wrapper around one extraction backend
///
/// Implementations are pure functions over the input text: no mutable state
/// shared across calls. CPU-bound work must not block the async worker; the
/// built-in backends hand it to `run_blocking`.
#[async_trait]
pub trait ProcessorAdapter: Send + Sync {
    /// Backend name for provenance tracking
    fn name(&self) -> &str;

    /// Backend version string
    fn version(&self) -> &str;

    /// Check whether the backend can currently serve calls
    fn is_available(&self) -> bool {
        true
    }

    /// Extract candidate spans
    ///
    /// # Errors
    /// Returns `ExtractionError` on failure (isolated by the caller)
    async fn extract(&self, text: &str) -> Result<Vec<RawCandidate>, ExtractionError>;
}

/// Builds adapters from configuration
///
/// The registry calls the factory once per enabled processor. Closures
/// `Fn(&ProcessorConfig) -> Result<Arc<dyn ProcessorAdapter>, ExtractionError>`
/// implement this trait, which is how tests inject mock adapters.
pub trait AdapterFactory: Send + Sync {
    fn create(&self, config: &ProcessorConfig) -> Result<Arc<dyn ProcessorAdapter>, ExtractionError>;
}

impl<F> AdapterFactory for F
where
    F: Fn(&ProcessorConfig) -> Result<Arc<dyn ProcessorAdapter>, ExtractionError> + Send + Sync,
{
    fn create(&self, config: &ProcessorConfig) -> Result<Arc<dyn ProcessorAdapter>, ExtractionError> {
        self(config)
    }
}

/// Factory for the built-in rule-based backends
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinFactory;

impl AdapterFactory for BuiltinFactory {
    fn create(&self, config: &ProcessorConfig) -> Result<Arc<dyn ProcessorAdapter>, ExtractionError> {
        let adapter: Arc<dyn ProcessorAdapter> = match config.kind {
            ProcessorKind::GeneralTagger => Arc::new(GeneralTagger::from_config(config)?),
            ProcessorKind::LanguageSpecialist => Arc::new(LanguageSpecialist::from_config(config)?),
            ProcessorKind::DependencyParser => Arc::new(DependencyParser::from_config(config)?),
            ProcessorKind::ZeroShot => Arc::new(ZeroShotTagger::from_config(config)?),
        };
        Ok(adapter)
    }
}

// ============================================================================
// Processor Kinds
// ============================================================================

/// Backend family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorKind {
    GeneralTagger,
    LanguageSpecialist,
    DependencyParser,
    ZeroShot,
}

impl ProcessorKind {
    /// All kinds, in registration order
    pub const ALL: [ProcessorKind; 4] = [
        ProcessorKind::GeneralTagger,
        ProcessorKind::LanguageSpecialist,
        ProcessorKind::DependencyParser,
        ProcessorKind::ZeroShot,
    ];

    /// Default processor name (also the settings category suffix)
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessorKind::GeneralTagger => "general",
            ProcessorKind::LanguageSpecialist => "specialist",
            ProcessorKind::DependencyParser => "dependency",
            ProcessorKind::ZeroShot => "zero_shot",
        }
    }

    pub fn default_weight(&self) -> f64 {
        match self {
            ProcessorKind::GeneralTagger => 1.0,
            ProcessorKind::LanguageSpecialist => 1.2,
            ProcessorKind::DependencyParser => 0.8,
            ProcessorKind::ZeroShot => 1.0,
        }
    }

    pub fn default_confidence_threshold(&self) -> f64 {
        match self {
            ProcessorKind::ZeroShot => 0.35,
            _ => 0.3,
        }
    }

    /// Extra parameters that must be present (and non-empty)
    pub fn required_params(&self) -> &'static [&'static str] {
        match self {
            ProcessorKind::GeneralTagger => &["language"],
            ProcessorKind::LanguageSpecialist => &["language"],
            ProcessorKind::DependencyParser => &["max_clause_words"],
            ProcessorKind::ZeroShot => &["labels"],
        }
    }

    /// Default values for extra parameters
    pub fn default_extra(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            ProcessorKind::GeneralTagger => &[("language", "en")],
            ProcessorKind::LanguageSpecialist => &[("language", "en")],
            ProcessorKind::DependencyParser => &[("max_clause_words", "40")],
            ProcessorKind::ZeroShot => &[("labels", "location,character,atmosphere,object")],
        }
    }

    /// Kind-specific checks on extra parameter values
    pub fn validate_extra(&self, extra: &std::collections::BTreeMap<String, String>) -> Result<(), String> {
        match self {
            ProcessorKind::DependencyParser => {
                let raw = extra.get("max_clause_words").map(String::as_str).unwrap_or("");
                match raw.trim().parse::<usize>() {
                    Ok(n) if n > 0 => Ok(()),
                    _ => Err(format!("max_clause_words must be a positive integer, got '{}'", raw)),
                }
            }
            ProcessorKind::ZeroShot => {
                let raw = extra.get("labels").map(String::as_str).unwrap_or("");
                parse_labels(raw).map(|_| ())
            }
            ProcessorKind::GeneralTagger | ProcessorKind::LanguageSpecialist => Ok(()),
        }
    }
}

impl fmt::Display for ProcessorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProcessorKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s.trim())
            .ok_or_else(|| format!("unknown processor kind '{}'", s))
    }
}

/// Parse a comma-separated list of description types
pub fn parse_labels(raw: &str) -> Result<Vec<DescriptionType>, String> {
    let mut labels = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let label = part.parse::<DescriptionType>()?;
        if !labels.contains(&label) {
            labels.push(label);
        }
    }
    if labels.is_empty() {
        return Err("labels must name at least one description type".to_string());
    }
    Ok(labels)
}

// ============================================================================
// Shared helpers for the built-in backends
// ============================================================================

/// Sentence with its lowercased tokens
pub(crate) struct Sentence<'a> {
    pub span: TextSpan,
    pub text: &'a str,
    pub tokens: Vec<String>,
}

impl Sentence<'_> {
    pub fn token_refs(&self) -> Vec<&str> {
        self.tokens.iter().map(String::as_str).collect()
    }
}

/// Split text into sentences with tokens, skipping very short fragments
pub(crate) fn sentences(text: &str, min_words: usize) -> Vec<Sentence<'_>> {
    sentence_spans(text)
        .into_iter()
        .filter_map(|span| {
            let sentence_text = span_text(text, &span);
            let sentence_tokens = tokens(sentence_text);
            (sentence_tokens.len() >= min_words).then_some(Sentence {
                span,
                text: sentence_text,
                tokens: sentence_tokens,
            })
        })
        .collect()
}

/// Run a backend's tagging pass on the blocking thread pool
///
/// The built-in backends are CPU-bound with no await points. Off the async
/// worker, the dispatcher's deadline and cancellation race can resolve while
/// the pass is still running; the abandoned pass finishes in the background
/// and its output is dropped.
pub(crate) async fn run_blocking<F>(name: &str, work: F) -> Result<Vec<RawCandidate>, ExtractionError>
where
    F: FnOnce() -> Vec<RawCandidate> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ExtractionError::Backend(format!("{} task panicked: {}", name, e)))
}

/// Type with the most lexicon hits; ties resolved by `DescriptionType::ALL` order
pub(crate) fn dominant_type(
    scores: impl IntoIterator<Item = (DescriptionType, usize)>,
) -> Option<(DescriptionType, usize)> {
    let mut best: Option<(DescriptionType, usize)> = None;
    for (ty, hits) in scores {
        if hits == 0 {
            continue;
        }
        match best {
            Some((_, best_hits)) if best_hits >= hits => {}
            _ => best = Some((ty, hits)),
        }
    }
    best
}
