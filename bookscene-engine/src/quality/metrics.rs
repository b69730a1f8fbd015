//! Aggregate metrics and recommendations for one processing call

use crate::types::{Description, DescriptionType, QualityMetrics, TextSpan};
use std::collections::BTreeMap;

/// Inputs describing how the call went
#[derive(Debug, Clone, Default)]
pub struct CallOutcome {
    /// Processors that completed successfully
    pub processors_ran: usize,
    /// Processors that failed or timed out
    pub failed_processors: Vec<String>,
    /// Whether a fallback strategy produced the result
    pub fell_back: bool,
}

/// Compute aggregate metrics over final descriptions
pub fn compute_metrics(descriptions: &[Description], text_len: usize, outcome: &CallOutcome) -> QualityMetrics {
    let mut type_distribution: BTreeMap<DescriptionType, usize> = BTreeMap::new();
    for d in descriptions {
        *type_distribution.entry(d.description_type).or_default() += 1;
    }

    let count = descriptions.len() as f64;
    let (average_confidence, average_quality, processor_agreement) = if descriptions.is_empty() {
        (0.0, 0.0, 0.0)
    } else {
        let ran = outcome.processors_ran.max(1) as f64;
        (
            descriptions.iter().map(|d| d.confidence).sum::<f64>() / count,
            descriptions.iter().map(|d| d.quality_score).sum::<f64>() / count,
            descriptions
                .iter()
                .map(|d| (d.contributing_processors.len() as f64 / ran).min(1.0))
                .sum::<f64>()
                / count,
        )
    };

    QualityMetrics {
        average_confidence,
        average_quality,
        type_diversity: type_distribution.len() as f64 / DescriptionType::ALL.len() as f64,
        type_distribution,
        text_coverage: coverage(descriptions.iter().map(|d| d.span), text_len),
        processor_agreement,
        degraded: !outcome.failed_processors.is_empty() || outcome.fell_back,
        failed_processors: outcome.failed_processors.clone(),
    }
}

/// Fraction of `text_len` covered by the union of spans
fn coverage(spans: impl Iterator<Item = TextSpan>, text_len: usize) -> f64 {
    if text_len == 0 {
        return 0.0;
    }
    let mut spans: Vec<TextSpan> = spans.collect();
    spans.sort();
    let mut covered = 0;
    let mut current: Option<TextSpan> = None;
    for span in spans {
        current = match current {
            Some(open) if span.start <= open.end => Some(open.union(&span)),
            Some(open) => {
                covered += open.len();
                Some(span)
            }
            None => Some(span),
        };
    }
    covered += current.map_or(0, |s| s.len());
    (covered as f64 / text_len as f64).min(1.0)
}

/// Human-readable suggestions derived from the metrics
pub fn recommendations(metrics: &QualityMetrics, description_count: usize) -> Vec<String> {
    let mut recommendations = Vec::new();

    if description_count == 0 {
        recommendations.push("No visual descriptions found (text may be dialogue or exposition)".to_string());
        return recommendations;
    }
    if metrics.degraded {
        if metrics.failed_processors.is_empty() {
            recommendations.push("Result produced by a fallback strategy (reduced consensus)".to_string());
        } else {
            recommendations.push(format!(
                "Processors failed: {} (check processor status)",
                metrics.failed_processors.join(", ")
            ));
        }
    }
    if metrics.average_confidence < 0.4 {
        recommendations.push(format!(
            "Low average confidence: {:.1}% (recommend manual review)",
            metrics.average_confidence * 100.0
        ));
    }
    if metrics.average_quality < 0.4 {
        recommendations.push(format!(
            "Low description quality: {:.1}% (descriptions may be too sparse for image generation)",
            metrics.average_quality * 100.0
        ));
    }
    if metrics.type_diversity <= 0.25 && description_count > 3 {
        recommendations.push("All descriptions share one type (consider widening description_types)".to_string());
    }
    if metrics.processor_agreement < 0.5 {
        recommendations.push(format!(
            "Low processor agreement: {:.1}% (consider the ensemble strategy)",
            metrics.processor_agreement * 100.0
        ));
    }
    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(start: usize, end: usize, ty: DescriptionType, processors: usize) -> Description {
        Description {
            span: TextSpan::new(start, end),
            text: String::new(),
            description_type: ty,
            confidence: 0.6,
            weighted_confidence: 0.6,
            consensus_weight: 1.0,
            contributing_processors: (0..processors).map(|i| format!("p{}", i)).collect(),
            priority_score: 0.0,
            quality_score: 0.5,
        }
    }

    #[test]
    fn test_coverage_merges_overlaps() {
        let spans = vec![TextSpan::new(0, 10), TextSpan::new(5, 20), TextSpan::new(50, 60)];
        assert!((coverage(spans.into_iter(), 100) - 0.3).abs() < 1e-9);
        assert_eq!(coverage(std::iter::empty(), 0), 0.0);
    }

    #[test]
    fn test_metrics_and_degraded_flag() {
        let descriptions = vec![
            desc(0, 10, DescriptionType::Location, 3),
            desc(20, 30, DescriptionType::Object, 1),
        ];
        let outcome = CallOutcome {
            processors_ran: 3,
            failed_processors: vec!["zero_shot".to_string()],
            fell_back: false,
        };
        let metrics = compute_metrics(&descriptions, 100, &outcome);

        assert_eq!(metrics.type_distribution[&DescriptionType::Location], 1);
        assert!((metrics.type_diversity - 0.5).abs() < 1e-9);
        assert!((metrics.text_coverage - 0.2).abs() < 1e-9);
        assert!((metrics.processor_agreement - (1.0 + 1.0 / 3.0) / 2.0).abs() < 1e-9);
        assert!(metrics.degraded);

        let recs = recommendations(&metrics, descriptions.len());
        assert!(recs.iter().any(|r| r.contains("zero_shot")));
    }

    #[test]
    fn test_empty_result_recommendation() {
        let metrics = compute_metrics(&[], 100, &CallOutcome::default());
        assert!(!metrics.degraded);
        assert_eq!(recommendations(&metrics, 0).len(), 1);
    }
}
