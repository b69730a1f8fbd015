//! Language-specialist tagger
//!
//! Matches word stems for one configured language (`en` or `ru`) instead of
//! whole words, so inflected forms count. Adjacent sentences of the same type
//! are merged into a single passage.

use super::{dominant_type, run_blocking, sentences, ProcessorAdapter};
use crate::config_loader::ProcessorConfig;
use crate::error::ExtractionError;
use crate::lexicon::{self, Lexicon};
use crate::types::{DescriptionType, RawCandidate};
use async_trait::async_trait;
use tracing::debug;

const VERSION: &str = "1.0.0";

const MIN_SENTENCE_WORDS: usize = 4;

/// Supported languages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    English,
    Russian,
}

impl Language {
    pub fn parse(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Some(Language::English),
            "ru" | "russian" => Some(Language::Russian),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct LanguageSpecialist {
    name: String,
    language: Language,
}

impl LanguageSpecialist {
    pub fn new(name: impl Into<String>, language: Language) -> Self {
        Self {
            name: name.into(),
            language,
        }
    }

    pub fn from_config(config: &ProcessorConfig) -> Result<Self, ExtractionError> {
        let code = config.extra.get("language").map(String::as_str).unwrap_or("");
        let language = Language::parse(code).ok_or_else(|| {
            ExtractionError::NotAvailable(format!("{}: unsupported language '{}'", config.name, code))
        })?;
        Ok(Self::new(config.name.clone(), language))
    }

    fn stem_hits(&self, lexicon: &Lexicon, words: &[&str]) -> usize {
        match self.language {
            Language::English => words
                .iter()
                .filter(|w| w.is_ascii())
                .filter(|w| {
                    let stem = english_stem(w);
                    lexicon.words.iter().any(|entry| english_stem(entry) == stem)
                })
                .count(),
            Language::Russian => words
                .iter()
                .filter(|w| !w.is_ascii())
                .filter(|w| lexicon.matches_stem(w))
                .count(),
        }
    }

    fn tag(&self, text: &str) -> Vec<RawCandidate> {
        let mut candidates: Vec<RawCandidate> = Vec::new();
        let mut last_sentence_end: Option<usize> = None;

        for sentence in sentences(text, MIN_SENTENCE_WORDS) {
            let words = sentence.token_refs();
            let scores = DescriptionType::ALL
                .iter()
                .map(|ty| (*ty, self.stem_hits(lexicon::for_type(*ty), &words)));
            let Some((ty, hits)) = dominant_type(scores) else {
                last_sentence_end = None;
                continue;
            };
            let confidence = (0.5 + 0.1 * hits as f64).min(0.95);

            // Extend the previous passage when the directly preceding sentence had the same type
            if let (Some(prev), Some(prev_end)) = (candidates.last_mut(), last_sentence_end) {
                if prev.description_type == ty && prev.span.end == prev_end {
                    prev.span = prev.span.union(&sentence.span);
                    prev.confidence = (prev.confidence.max(confidence) + 0.05).min(0.95);
                    last_sentence_end = Some(sentence.span.end);
                    continue;
                }
            }
            candidates.push(RawCandidate::new(sentence.span, ty, confidence));
            last_sentence_end = Some(sentence.span.end);
        }
        debug!(processor = %self.name, candidates = candidates.len(), "Specialist tagging complete");
        candidates
    }
}

/// Light suffix stripping for English
fn english_stem(word: &str) -> &str {
    for suffix in ["ings", "ing", "edly", "ed", "es", "s", "ly"] {
        if let Some(stem) = word.strip_suffix(suffix) {
            if stem.len() >= 3 {
                return stem;
            }
        }
    }
    word
}

#[async_trait]
impl ProcessorAdapter for LanguageSpecialist {
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
