//! Multi-Factor Quality Scorer
//!
//! Scores a candidate passage on five factors and combines them by weighted
//! average. The result feeds two consumers:
//! - strategies blend it into each candidate's confidence before merging
//! - the Sequential strategy uses the mean score as its early-exit signal
//!
//! # Factors
//! 1. **Clarity** (weight: 0.20): word count per sentence near the 8-35 sweet spot
//! 2. **Detail** (weight: 0.25): colour, size, texture, material and number density
//! 3. **Emotional salience** (weight: 0.15): emotionally loaded vocabulary
//! 4. **Contextual coherence** (weight: 0.25): vocabulary agrees with the claimed type
//! 5. **Literary quality** (weight: 0.15): lexical diversity plus figurative markers

use super::text::{lexical_diversity, sentence_spans, tokens};
use crate::lexicon::{self, DESCRIPTIVE, EMOTION, FIGURATIVE};
use crate::types::DescriptionType;
use serde::{Deserialize, Serialize};

/// Per-factor weights; must sum to 1.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorWeights {
    pub clarity: f64,
    pub detail: f64,
    pub emotional_salience: f64,
    pub contextual_coherence: f64,
    pub literary_quality: f64,
}

impl Default for FactorWeights {
    fn default() -> Self {
        Self {
            clarity: 0.20,
            detail: 0.25,
            emotional_salience: 0.15,
            contextual_coherence: 0.25,
            literary_quality: 0.15,
        }
    }
}

impl FactorWeights {
    fn total(&self) -> f64 {
        self.clarity
            + self.detail
            + self.emotional_salience
            + self.contextual_coherence
            + self.literary_quality
    }
}

/// Factor scores and their weighted combination (all 0.0-1.0)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct QualityBreakdown {
    pub clarity: f64,
    pub detail: f64,
    pub emotional_salience: f64,
    pub contextual_coherence: f64,
    pub literary_quality: f64,
    pub overall: f64,
}

/// Quality scorer
#[derive(Debug, Clone, Default)]
pub struct QualityScorer {
    weights: FactorWeights,
}

impl QualityScorer {
    /// Create scorer with default weights
    pub fn new() -> Self {
        Self::default()
    }

    /// Create scorer with custom weights (normalized to sum 1.0)
    pub fn with_weights(weights: FactorWeights) -> Self {
        Self { weights }
    }

    /// Overall score only
    pub fn score(&self, text: &str, description_type: DescriptionType) -> f64 {
        self.breakdown(text, description_type).overall
    }

    /// Score every factor
    pub fn breakdown(&self, text: &str, description_type: DescriptionType) -> QualityBreakdown {
        let words = tokens(text);
        if words.is_empty() {
            return QualityBreakdown::default();
        }
        let word_refs: Vec<&str> = words.iter().map(String::as_str).collect();

        let clarity = score_clarity(text, words.len());
        let detail = score_detail(&word_refs);
        let emotional_salience = score_emotion(text, &word_refs);
        let contextual_coherence = score_coherence(&word_refs, description_type);
        let literary_quality = score_literary(text, &words, &word_refs);

        let w = &self.weights;
        let total = w.total();
        let overall = if total > 0.0 {
            (clarity * w.clarity
                + detail * w.detail
                + emotional_salience * w.emotional_salience
                + contextual_coherence * w.contextual_coherence
                + literary_quality * w.literary_quality)
                / total
        } else {
            0.0
        };

        QualityBreakdown {
            clarity,
            detail,
            emotional_salience,
            contextual_coherence,
            literary_quality,
            overall: overall.clamp(0.0, 1.0),
        }
    }
}

fn score_clarity(text: &str, word_count: usize) -> f64 {
    let sentences = sentence_spans(text).len().max(1);
    let avg = word_count as f64 / sentences as f64;
    if (8.0..=35.0).contains(&avg) {
        1.0
    } else if avg < 8.0 {
        // Fragments: linear ramp from 0.3 at one word
        0.3 + 0.7 * (avg - 1.0).max(0.0) / 7.0
    } else {
        // Run-ons lose 0.02 per word past 35, floor 0.3
        (1.0 - (avg - 35.0) * 0.02).max(0.3)
    }
}

fn score_detail(words: &[&str]) -> f64 {
    let descriptive = DESCRIPTIVE.hits(words.iter().copied());
    let numbers = words
        .iter()
        .filter(|w| w.chars().all(|c| c.is_ascii_digit()))
        .count();
    let density = (descriptive + numbers) as f64 / words.len() as f64;
    // One descriptive word in eight saturates the factor
    (density * 8.0).min(1.0)
}

fn score_emotion(text: &str, words: &[&str]) -> f64 {
    let hits = EMOTION.hits(words.iter().copied());
    let exclamations = text.matches('!').count();
    ((hits as f64 * 0.25) + (exclamations as f64 * 0.1)).min(1.0)
}

fn score_coherence(words: &[&str], description_type: DescriptionType) -> f64 {
    let own = lexicon::for_type(description_type).hits(words.iter().copied());
    let all: usize = DescriptionType::ALL
        .iter()
        .map(|t| lexicon::for_type(*t).hits(words.iter().copied()))
        .sum();
    if all == 0 {
        return 0.2;
    }
    let share = own as f64 / all as f64;
    let presence = (own as f64 / 2.0).min(1.0);
    (share * 0.5 + presence * 0.5).clamp(0.0, 1.0)
}

fn score_literary(text: &str, words: &[String], word_refs: &[&str]) -> f64 {
    let diversity = lexical_diversity(words);
    let lower = text.to_lowercase();
    let figurative = FIGURATIVE.hits(word_refs.iter().copied())
        + lower.matches("as if").count()
        + lower.matches("as though").count()
        + lower.matches("как будто").count();
    (diversity * 0.7 + (figurative as f64 * 0.15).min(0.3)).min(1.0)
}
