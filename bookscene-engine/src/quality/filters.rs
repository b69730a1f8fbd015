//! Candidate and output filters
//!
//! Type, length and confidence filtering, priority scoring and the
//! per-call cap on descriptions.

use super::text::content_length;
use crate::config_loader::EngineSettings;
use crate::types::{CandidateDescription, Description};
use crate::voting::{rank_order, sort_by_position};
use tracing::debug;

/// Whether text length (non-whitespace chars) is within the description bounds
pub fn passes_length(text: &str, settings: &EngineSettings) -> bool {
    let len = content_length(text);
    len >= settings.min_description_length && len <= settings.max_description_length
}

/// Drop candidates of unwanted types or out-of-range length
pub fn filter_candidates(
    candidates: Vec<CandidateDescription>,
    settings: &EngineSettings,
) -> Vec<CandidateDescription> {
    candidates
        .into_iter()
        .filter(|c| settings.description_types.contains(&c.description_type))
        .filter(|c| passes_length(&c.text, settings))
        .collect()
}

/// Ranking score for image generation (0-100): type base priority × confidence
pub fn priority_score(description: &Description) -> f64 {
    (description.description_type.base_priority() * description.confidence).clamp(0.0, 100.0)
}

/// Final filtering pass
///
/// Applies type, length and `min_confidence` filters, assigns priority
/// scores, keeps the `max_descriptions` highest-priority entries and
/// returns them sorted by position.
pub fn apply_output_filters(descriptions: Vec<Description>, settings: &EngineSettings) -> Vec<Description> {
    let before = descriptions.len();
    let mut kept: Vec<Description> = descriptions
        .into_iter()
        .filter(|d| settings.description_types.contains(&d.description_type))
        .filter(|d| passes_length(&d.text, settings))
        .filter(|d| d.confidence >= settings.min_confidence)
        .map(|mut d| {
            d.priority_score = priority_score(&d);
            d
        })
        .collect();

    if kept.len() > settings.max_descriptions {
        kept.sort_by(|a, b| {
            b.priority_score
                .total_cmp(&a.priority_score)
                .then_with(|| rank_order(a, b))
        });
        kept.truncate(settings.max_descriptions);
    }
    sort_by_position(&mut kept);

    debug!(before, after = kept.len(), "Output filters applied");
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DescriptionType, TextSpan};

    fn desc(start: usize, text: &str, ty: DescriptionType, confidence: f64) -> Description {
        Description {
            span: TextSpan::new(start, start + text.len()),
            text: text.to_string(),
            description_type: ty,
            confidence,
            weighted_confidence: confidence,
            consensus_weight: 1.0,
            contributing_processors: vec!["general".to_string()],
            priority_score: 0.0,
            quality_score: 0.0,
        }
    }

    const LONG: &str = "The grey castle stood over the valley.";

    #[test]
    fn test_length_bounds() {
        let settings = EngineSettings::default();
        assert!(!passes_length("Too short.", &settings));
        assert!(passes_length(LONG, &settings));

        let mut tight = EngineSettings::default();
        tight.max_description_length = 10;
        tight.min_description_length = 1;
        assert!(!passes_length(LONG, &tight));
    }

    #[test]
    fn test_type_and_confidence_filters() {
        let mut settings = EngineSettings::default();
        settings.description_types = vec![DescriptionType::Location];
        settings.min_confidence = 0.5;

        let out = apply_output_filters(
            vec![
                desc(0, LONG, DescriptionType::Location, 0.8),
                desc(50, LONG, DescriptionType::Object, 0.9),
                desc(100, LONG, DescriptionType::Location, 0.3),
            ],
            &settings,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].span.start, 0);
        assert!((out[0].priority_score - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_cap_keeps_highest_priority_in_position_order() {
        let mut settings = EngineSettings::default();
        settings.max_descriptions = 2;

        let out = apply_output_filters(
            vec![
                desc(0, LONG, DescriptionType::Object, 0.5),
                desc(100, LONG, DescriptionType::Location, 0.9),
                desc(200, LONG, DescriptionType::Character, 0.9),
            ],
            &settings,
        );
        let starts: Vec<usize> = out.iter().map(|d| d.span.start).collect();
        assert_eq!(starts, vec![100, 200]);
    }
}
