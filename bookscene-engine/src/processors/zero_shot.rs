//! Zero-shot labelling
//!
//! Scores each sentence against a prototype per candidate label (the label's
//! lexicon) and keeps the most similar label. Only the labels configured in
//! `labels` are considered.

use super::{parse_labels, run_blocking, sentences, ProcessorAdapter};
use crate::config_loader::ProcessorConfig;
use crate::error::ExtractionError;
use crate::lexicon;
use crate::types::{DescriptionType, RawCandidate};
use async_trait::async_trait;
use tracing::debug;

const VERSION: &str = "1.0.0";

const MIN_SENTENCE_WORDS: usize = 5;

/// Similarity below this is "no label"
const MIN_SIMILARITY: f64 = 0.25;

#[derive(Clone)]
pub struct ZeroShotTagger {
    name: String,
    labels: Vec<DescriptionType>,
}

impl ZeroShotTagger {
    pub fn new(name: impl Into<String>, labels: Vec<DescriptionType>) -> Self {
        Self {
            name: name.into(),
            labels,
        }
    }

    pub fn from_config(config: &ProcessorConfig) -> Result<Self, ExtractionError> {
        let raw = config.extra.get("labels").map(String::as_str).unwrap_or("");
        let labels = parse_labels(raw)
            .map_err(|e| ExtractionError::NotAvailable(format!("{}: {}", config.name, e)))?;
        Ok(Self::new(config.name.clone(), labels))
    }

    pub fn labels(&self) -> &[DescriptionType] {
        &self.labels
    }

    /// Prototype hits normalised by sqrt(sentence length)
    fn similarity(words: &[&str], label: DescriptionType) -> f64 {
        let hits = lexicon::for_type(label).hits(words.iter().copied());
        hits as f64 / (words.len() as f64).sqrt()
    }

    fn classify(&self, text: &str) -> Vec<RawCandidate> {
        let mut candidates = Vec::new();
        for sentence in sentences(text, MIN_SENTENCE_WORDS) {
            let words = sentence.token_refs();
            let best = self
                .labels
                .iter()
                .map(|label| (*label, Self::similarity(&words, *label)))
                .fold(None::<(DescriptionType, f64)>, |best, (label, sim)| match best {
                    Some((_, best_sim)) if best_sim >= sim => best,
                    _ => Some((label, sim)),
                });

            if let Some((label, sim)) = best {
                if sim >= MIN_SIMILARITY {
                    candidates.push(RawCandidate::new(sentence.span, label, (sim * 0.8).min(0.95)));
                }
            }
        }
        debug!(processor = %self.name, candidates = candidates.len(), "Zero-shot labelling complete");
        candidates
    }
}

#[async_trait]
impl ProcessorAdapter for ZeroShotTagger {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        VERSION
    }

    async fn extract(&self, text: &str) -> Result<Vec<RawCandidate>, ExtractionError> {
        let this = self.clone();
        let text = text.to_owned();
        run_blocking(&self.name, move || this.classify(&text)).await
    }
}
