//! Weighted-consensus ensemble voting
//!
//! Combines candidate spans from several processors into accepted
//! descriptions:
//!
//! 1. Sort all candidates by start offset (longer spans first on ties)
//! 2. Sweep once, growing a cluster while the next candidate overlaps it enough
//! 3. Per cluster, each processor votes once with its best member
//! 4. `consensus_weight = Σ voter weights / Σ weights of processors that ran`
//! 5. Accept when `consensus_weight >= consensus_threshold`
//! 6. `confidence = weighted_confidence × consensus_weight`
//!
//! Accepted descriptions go through positional dedup and come out sorted by
//! start offset.

use crate::config_loader::EngineSettings;
use crate::quality::text::span_text;
use crate::types::{clamp_unit, CandidateDescription, Description, DescriptionType, TextSpan};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// One processor's vote within a cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleVote {
    pub processor: String,
    pub weight: f64,
    pub confidence: f64,
}

/// Candidates merged into one span cluster
#[derive(Debug)]
struct Cluster<'a> {
    span: TextSpan,
    members: Vec<&'a CandidateDescription>,
}

/// Ensemble voter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnsembleVoter {
    consensus_threshold: f64,
    merge_overlap_ratio: f64,
    merge_gap: usize,
}

impl EnsembleVoter {
    pub fn new(consensus_threshold: f64, merge_overlap_ratio: f64, merge_gap: usize) -> Self {
        Self {
            consensus_threshold,
            merge_overlap_ratio,
            merge_gap,
        }
    }

    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self::new(
            settings.consensus_threshold,
            settings.merge_overlap_ratio,
            settings.merge_gap,
        )
    }

    pub fn consensus_threshold(&self) -> f64 {
        self.consensus_threshold
    }

    /// Vote over per-processor candidates
    ///
    /// `weights` holds every processor that ran (including those that
    /// returned nothing); candidates from processors missing there are ignored.
    pub fn vote(
        &self,
        text: &str,
        candidates: &BTreeMap<String, Vec<CandidateDescription>>,
        weights: &BTreeMap<String, f64>,
    ) -> Vec<Description> {
        let total_weight: f64 = weights.values().sum();
        if total_weight <= 0.0 {
            return Vec::new();
        }

        let mut all: Vec<&CandidateDescription> = Vec::new();
        for (processor, list) in candidates {
            if weights.contains_key(processor) {
                all.extend(list.iter());
            } else {
                warn!(processor = %processor, "Ignoring candidates from processor without weight");
            }
        }
        all.sort_by(|a, b| candidate_order(a, b));

        let clusters = self.cluster(all);
        let cluster_count = clusters.len();

        let accepted: Vec<Description> = clusters
            .into_iter()
            .filter_map(|cluster| self.evaluate(text, cluster, weights, total_weight))
            .collect();

        debug!(
            clusters = cluster_count,
            accepted = accepted.len(),
            total_weight,
            "Ensemble vote complete"
        );

        dedupe_by_position(accepted, self.merge_overlap_ratio, self.merge_gap)
    }

    /// Single sweep over start-sorted candidates
    fn cluster<'a>(&self, sorted: Vec<&'a CandidateDescription>) -> Vec<Cluster<'a>> {
        let mut clusters: Vec<Cluster<'a>> = Vec::new();
        for candidate in sorted {
            if let Some(open) = clusters.last_mut() {
                if spans_merge(&open.span, &candidate.span, self.merge_overlap_ratio, self.merge_gap) {
                    open.span = open.span.union(&candidate.span);
                    open.members.push(candidate);
                    continue;
                }
            }
            clusters.push(Cluster {
                span: candidate.span,
                members: vec![candidate],
            });
        }
        clusters
    }

    fn evaluate(
        &self,
        text: &str,
        cluster: Cluster<'_>,
        weights: &BTreeMap<String, f64>,
        total_weight: f64,
    ) -> Option<Description> {
        // Best member per processor
        let mut representatives: BTreeMap<&str, &CandidateDescription> = BTreeMap::new();
        for member in cluster.members.iter().copied() {
            representatives
                .entry(member.source_processor.as_str())
                .and_modify(|best| {
                    if candidate_rank(member, *best) == Ordering::Less {
                        *best = member;
                    }
                })
                .or_insert(member);
        }

        let votes: Vec<EnsembleVote> = representatives
            .iter()
            .map(|(processor, c)| EnsembleVote {
                processor: processor.to_string(),
                weight: weights.get(*processor).copied().unwrap_or(0.0),
                confidence: c.confidence,
            })
            .collect();

        let support: f64 = votes.iter().map(|v| v.weight).sum();
        let consensus_weight = clamp_unit(support / total_weight);
        if consensus_weight < self.consensus_threshold || support <= 0.0 {
            debug!(
                span = %cluster.span,
                consensus_weight,
                voters = votes.len(),
                "Cluster rejected"
            );
            return None;
        }

        let weighted_confidence =
            clamp_unit(votes.iter().map(|v| v.weight * v.confidence).sum::<f64>() / support);
        let description_type = majority_type(representatives.values().copied());

        Some(Description {
            span: cluster.span,
            text: span_text(text, &cluster.span).to_string(),
            description_type,
            confidence: clamp_unit(weighted_confidence * consensus_weight),
            weighted_confidence,
            consensus_weight,
            contributing_processors: votes.into_iter().map(|v| v.processor).collect(),
            priority_score: 0.0,
            quality_score: 0.0,
        })
    }
}

/// Whether `next` joins a cluster covering `open`
///
/// Requires `next` to start within `gap` bytes of the cluster end and
/// `overlap + gap >= ratio × min(len)`.
pub fn spans_merge(open: &TextSpan, next: &TextSpan, ratio: f64, gap: usize) -> bool {
    if next.start > open.end.saturating_add(gap) || open.start > next.end.saturating_add(gap) {
        return false;
    }
    let closeness = (open.overlap(next) + gap) as f64;
    let shorter = open.len().min(next.len()) as f64;
    closeness > 0.0 && closeness >= ratio * shorter
}

/// Majority type among voters; ties go to the most confident voter's type
fn majority_type<'a>(voters: impl Iterator<Item = &'a CandidateDescription>) -> DescriptionType {
    let voters: Vec<&CandidateDescription> = voters.collect();
    let mut counts: BTreeMap<DescriptionType, usize> = BTreeMap::new();
    for v in &voters {
        *counts.entry(v.description_type).or_default() += 1;
    }
    let top = counts.values().copied().max().unwrap_or(0);

    voters
        .iter()
        .filter(|v| counts.get(&v.description_type).copied() == Some(top))
        .min_by(|a, b| candidate_rank(a, b))
        .map(|v| v.description_type)
        .unwrap_or(DescriptionType::Location)
}

// ============================================================================
// Ordering and positional dedup
// ============================================================================

/// Sweep order: start ascending, longer first, then a stable total order
fn candidate_order(a: &CandidateDescription, b: &CandidateDescription) -> Ordering {
    a.span
        .start
        .cmp(&b.span.start)
        .then_with(|| b.span.len().cmp(&a.span.len()))
        .then_with(|| a.source_processor.cmp(&b.source_processor))
        .then_with(|| b.confidence.total_cmp(&a.confidence))
        .then_with(|| a.description_type.cmp(&b.description_type))
}

/// Best-first: higher confidence, longer span, earlier start
fn candidate_rank(a: &CandidateDescription, b: &CandidateDescription) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| b.span.len().cmp(&a.span.len()))
        .then_with(|| a.span.start.cmp(&b.span.start))
}

/// Best-first: higher confidence, longer span, earlier start, then type
pub fn rank_order(a: &Description, b: &Description) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| b.span.len().cmp(&a.span.len()))
        .then_with(|| a.span.start.cmp(&b.span.start))
        .then_with(|| a.description_type.cmp(&b.description_type))
}

/// Output order: start ascending, ties by [`rank_order`]
pub fn sort_by_position(descriptions: &mut [Description]) {
    descriptions.sort_by(|a, b| a.span.start.cmp(&b.span.start).then_with(|| rank_order(a, b)));
}

/// Drop descriptions overlapping a better-ranked one beyond the merge ratio
///
/// Returns the survivors sorted by position.
pub fn dedupe_by_position(mut descriptions: Vec<Description>, ratio: f64, gap: usize) -> Vec<Description> {
    descriptions.sort_by(rank_order);
    let mut kept: Vec<Description> = Vec::with_capacity(descriptions.len());
    for description in descriptions {
        let conflicts = kept
            .iter()
            .any(|k| k.span.overlap(&description.span) > 0 && spans_merge(&k.span, &description.span, ratio, gap));
        if !conflicts {
            kept.push(description);
        }
    }
    sort_by_position(&mut kept);
    kept
}
