//! General-purpose tagger
//!
//! Flags every sentence whose vocabulary hits one of the per-type keyword
//! lexicons. Confidence grows with the number of hits for the winning type.

use super::{dominant_type, run_blocking, sentences, ProcessorAdapter};
use crate::config_loader::ProcessorConfig;
use crate::error::ExtractionError;
use crate::lexicon;
use crate::types::{DescriptionType, RawCandidate};
use async_trait::async_trait;
use tracing::debug;

const VERSION: &str = "1.0.0";

/// Sentences shorter than this are ignored
const MIN_SENTENCE_WORDS: usize = 4;

#[derive(Clone)]
pub struct GeneralTagger {
    name: String,
    language: String,
}

impl GeneralTagger {
    pub fn new(name: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            language: language.into(),
        }
    }

    pub fn from_config(config: &ProcessorConfig) -> Result<Self, ExtractionError> {
        let language = config
            .extra
            .get("language")
            .map(|l| l.trim().to_ascii_lowercase())
            .filter(|l| !l.is_empty())
            .ok_or_else(|| ExtractionError::NotAvailable(format!("{}: no language configured", config.name)))?;
        Ok(Self::new(config.name.clone(), language))
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    fn tag(&self, text: &str) -> Vec<RawCandidate> {
        let mut candidates = Vec::new();
        for sentence in sentences(text, MIN_SENTENCE_WORDS) {
            let words = sentence.token_refs();
            let scores = DescriptionType::ALL
                .iter()
                .map(|ty| (*ty, lexicon::for_type(*ty).hits(words.iter().copied())));
            if let Some((ty, hits)) = dominant_type(scores) {
                let confidence = (0.4 + 0.1 * hits as f64).min(0.95);
                candidates.push(RawCandidate::new(sentence.span, ty, confidence));
            }
        }
        debug!(processor = %self.name, candidates = candidates.len(), "General tagging complete");
        candidates
    }
}

#[async_trait]
impl ProcessorAdapter for GeneralTagger {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        VERSION
    }

    async fn extract(&self, text: &str) -> Result<Vec<RawCandidate>, ExtractionError> {
        let this = self.clone();
        let text = text.to_owned();
        run_blocking(&self.name, move || this.tag(&text)).await
    }
}
