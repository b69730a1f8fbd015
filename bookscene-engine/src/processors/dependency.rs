//! Dependency-style clause patterns
//!
//! Works on clauses (sentence pieces split at `,` `;` `:`) and recognises
//! head/dependent patterns instead of bare keywords:
//!
//! | Pattern | Type |
//! |---------|------|
//! | spatial preposition → (determiner) → (modifiers) → place noun | location |
//! | subject → appearance verb, clause mentions a physical feature | character |
//! | determiner → descriptive modifier → object noun | object |
//! | atmosphere noun → copula (`was`, `were`, `был`...) | atmosphere |
//!
//! Each sentence yields at most one candidate covering the whole sentence.

use super::{run_blocking, sentences, ProcessorAdapter};
use crate::config_loader::ProcessorConfig;
use crate::error::ExtractionError;
use crate::lexicon::{
    APPEARANCE_VERBS, ATMOSPHERE, CHARACTER, DESCRIPTIVE, DETERMINERS, LOCATION, OBJECT,
    SPATIAL_PREPOSITIONS, SUBJECTS,
};
use crate::quality::text::tokens;
use crate::types::{DescriptionType, RawCandidate};
use async_trait::async_trait;
use tracing::debug;

const VERSION: &str = "1.0.0";

const MIN_SENTENCE_WORDS: usize = 4;

/// Tokens a head may be separated from its dependent by
const MAX_DEPENDENCY_DISTANCE: usize = 4;

const COPULAS: &[&str] = &["was", "were", "is", "are", "seemed", "hung", "был", "была", "было", "были"];

#[derive(Clone)]
pub struct DependencyParser {
    name: String,
    max_clause_words: usize,
}

impl DependencyParser {
    pub fn new(name: impl Into<String>, max_clause_words: usize) -> Self {
        Self {
            name: name.into(),
            max_clause_words: max_clause_words.max(1),
        }
    }

    pub fn from_config(config: &ProcessorConfig) -> Result<Self, ExtractionError> {
        let raw = config.extra.get("max_clause_words").map(String::as_str).unwrap_or("");
        let max_clause_words = raw
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                ExtractionError::NotAvailable(format!("{}: invalid max_clause_words '{}'", config.name, raw))
            })?;
        Ok(Self::new(config.name.clone(), max_clause_words))
    }

    fn parse(&self, text: &str) -> Vec<RawCandidate> {
        let mut candidates = Vec::new();
        for sentence in sentences(text, MIN_SENTENCE_WORDS) {
            let best = sentence
                .text
                .split([',', ';', ':'])
                .map(tokens)
                .filter(|clause| !clause.is_empty() && clause.len() <= self.max_clause_words)
                .filter_map(|clause| match_clause(&clause))
                .fold(None::<(DescriptionType, f64)>, |best, (ty, confidence)| match best {
                    Some((_, best_conf)) if best_conf >= confidence => best,
                    _ => Some((ty, confidence)),
                });

            if let Some((ty, confidence)) = best {
                candidates.push(RawCandidate::new(sentence.span, ty, confidence));
            }
        }
        debug!(processor = %self.name, candidates = candidates.len(), "Clause parsing complete");
        candidates
    }
}

/// Strongest pattern in one clause
fn match_clause(clause: &[String]) -> Option<(DescriptionType, f64)> {
    let words: Vec<&str> = clause.iter().map(String::as_str).collect();
    let modifiers = DESCRIPTIVE.hits(words.iter().copied());
    let modifier_bonus = (modifiers as f64 * 0.05).min(0.2);

    let mut matches = Vec::new();
    if place_phrase(&words) {
        matches.push((DescriptionType::Location, 0.55 + modifier_bonus));
    }
    if appearance_clause(&words) {
        matches.push((DescriptionType::Character, 0.6 + modifier_bonus));
    }
    if modified_object(&words) {
        matches.push((DescriptionType::Object, 0.5 + modifier_bonus));
    }
    if atmosphere_predicate(&words) {
        matches.push((DescriptionType::Atmosphere, 0.5 + modifier_bonus));
    }

    matches
        .into_iter()
        .fold(None, |best: Option<(DescriptionType, f64)>, (ty, c)| match best {
            Some((_, b)) if b >= c => best,
            _ => Some((ty, c.min(0.9))),
        })
}

/// Preposition heading a noun phrase that ends in a place noun
fn place_phrase(words: &[&str]) -> bool {
    words.iter().enumerate().any(|(i, w)| {
        SPATIAL_PREPOSITIONS.contains(w)
            && words
                .iter()
                .skip(i + 1)
                .take(MAX_DEPENDENCY_DISTANCE)
                .take_while(|d| !SPATIAL_PREPOSITIONS.contains(d))
                .any(|d| LOCATION.contains(d))
    })
}

/// Subject followed by an appearance verb, with a physical feature in the clause
fn appearance_clause(words: &[&str]) -> bool {
    let has_feature = words.iter().any(|w| CHARACTER.contains(w));
    has_feature
        && words.iter().enumerate().any(|(i, w)| {
            SUBJECTS.contains(w)
                && words
                    .iter()
                    .skip(i + 1)
                    .take(MAX_DEPENDENCY_DISTANCE)
                    .any(|v| APPEARANCE_VERBS.contains(v))
        })
}

/// Determiner, at least one descriptive modifier, then an object noun
fn modified_object(words: &[&str]) -> bool {
    words.iter().enumerate().any(|(i, w)| {
        if !DETERMINERS.contains(w) {
            return false;
        }
        let window: Vec<&str> = words.iter().skip(i + 1).take(MAX_DEPENDENCY_DISTANCE).copied().collect();
        match window.iter().position(|d| OBJECT.contains(d)) {
            Some(noun) => window[..noun].iter().any(|m| DESCRIPTIVE.contains(m)),
            None => false,
        }
    })
}

/// Atmosphere noun as the subject of a copula
fn atmosphere_predicate(words: &[&str]) -> bool {
    words
        .windows(2)
        .any(|pair| ATMOSPHERE.contains(pair[0]) && COPULAS.contains(&pair[1]))
}

#[async_trait]
impl ProcessorAdapter for DependencyParser {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        VERSION
    }

    async fn extract(&self, text: &str) -> Result<Vec<RawCandidate>, ExtractionError> {
        let this = self.clone();
        let text = text.to_owned();
        run_blocking(&self.name, move || this.parse(&text)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(s: &str) -> Vec<String> {
        tokens(s)
    }

    #[test]
    fn test_place_phrase_pattern() {
        let w = words("they walked into the dark forest");
        let refs: Vec<&str> = w.iter().map(String::as_str).collect();
        assert!(place_phrase(&refs));

        let w = words("the forest walked");
        let refs: Vec<&str> = w.iter().map(String::as_str).collect();
        assert!(!place_phrase(&refs));
    }

    #[test]
    fn test_appearance_pattern() {
        let w = words("she wore a long crimson cloak");
        let refs: Vec<&str> = w.iter().map(String::as_str).collect();
        assert!(appearance_clause(&refs));
        assert_eq!(match_clause(&w).map(|(t, _)| t), Some(DescriptionType::Character));
    }

    #[test]
    fn test_atmosphere_predicate() {
        let w = words("the fog was thick and cold");
        let refs: Vec<&str> = w.iter().map(String::as_str).collect();
        assert!(atmosphere_predicate(&refs));
    }

    #[tokio::test]
    async fn test_long_clauses_are_skipped() {
        let text = "They walked slowly into the dark silent forest.";
        let strict = DependencyParser::new("dependency", 3);
        assert!(strict.extract(text).await.unwrap().is_empty());

        let relaxed = DependencyParser::new("dependency", 40);
        let candidates = relaxed.extract(text).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].description_type, DescriptionType::Location);
    }
}
