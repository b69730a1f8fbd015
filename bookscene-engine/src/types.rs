//! Core Types for the Extraction Engine
//!
//! Shared data model for the pipeline:
//! - **Adapters** produce [`RawCandidate`]s
//! - **Strategies** tag them with provenance as [`CandidateDescription`]s
//! - **EnsembleVoter** / positional dedup turn them into final [`Description`]s
//! - The orchestrator wraps everything in a [`ProcessingResult`]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

// ============================================================================
// Description Types
// ============================================================================

/// Kind of visual description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptionType {
    Location,
    Character,
    Atmosphere,
    Object,
}

impl DescriptionType {
    /// All types, in priority order
    pub const ALL: [DescriptionType; 4] = [
        DescriptionType::Location,
        DescriptionType::Character,
        DescriptionType::Atmosphere,
        DescriptionType::Object,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DescriptionType::Location => "location",
            DescriptionType::Character => "character",
            DescriptionType::Atmosphere => "atmosphere",
            DescriptionType::Object => "object",
        }
    }

    /// Base priority (0-100) used for ranking descriptions for image generation
    pub fn base_priority(&self) -> f64 {
        match self {
            DescriptionType::Location => 75.0,
            DescriptionType::Character => 60.0,
            DescriptionType::Atmosphere => 45.0,
            DescriptionType::Object => 40.0,
        }
    }
}

impl fmt::Display for DescriptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DescriptionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "location" => Ok(DescriptionType::Location),
            "character" => Ok(DescriptionType::Character),
            "atmosphere" => Ok(DescriptionType::Atmosphere),
            "object" => Ok(DescriptionType::Object),
            other => Err(format!("unknown description type '{}'", other)),
        }
    }
}

// ============================================================================
// Spans
// ============================================================================

/// Half-open byte range `[start, end)` into the processed text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TextSpan {
    pub start: usize,
    pub end: usize,
}

impl TextSpan {
    /// Create a span; `end` is raised to `start` if smaller
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    /// Number of bytes shared with `other`
    pub fn overlap(&self, other: &TextSpan) -> usize {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        end.saturating_sub(start)
    }

    /// Smallest span covering both
    pub fn union(&self, other: &TextSpan) -> TextSpan {
        TextSpan::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// Overlap relative to the shorter of the two spans (0.0-1.0)
    pub fn overlap_ratio(&self, other: &TextSpan) -> f64 {
        let shorter = self.len().min(other.len());
        if shorter == 0 {
            return 0.0;
        }
        self.overlap(other) as f64 / shorter as f64
    }
}

impl fmt::Display for TextSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]", self.start, self.end)
    }
}

// ============================================================================
// Candidates
// ============================================================================

/// Adapter output: one flagged span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCandidate {
    pub span: TextSpan,
    pub description_type: DescriptionType,
    /// Backend confidence (0.0-1.0)
    pub confidence: f64,
}

impl RawCandidate {
    /// Create candidate with clamped confidence (0.0-1.0)
    pub fn new(span: TextSpan, description_type: DescriptionType, confidence: f64) -> Self {
        Self {
            span,
            description_type,
            confidence: clamp_unit(confidence),
        }
    }
}

/// Candidate description with provenance, as fed to merging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateDescription {
    pub span: TextSpan,
    pub description_type: DescriptionType,
    pub confidence: f64,
    pub source_processor: String,
    pub text: String,
}

// ============================================================================
// Final Output
// ============================================================================

/// Accepted visual description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Description {
    pub span: TextSpan,
    pub text: String,
    pub description_type: DescriptionType,
    /// Final confidence (after consensus scaling, if any)
    pub confidence: f64,
    /// Weight-weighted average of contributing confidences, unscaled
    pub weighted_confidence: f64,
    /// Share of the total processor weight that supported this span (0.0-1.0)
    pub consensus_weight: f64,
    /// Names of processors that reported this span
    pub contributing_processors: Vec<String>,
    /// Ranking score for image generation (0-100)
    pub priority_score: f64,
    /// Multi-factor quality score of the span text (0.0-1.0)
    pub quality_score: f64,
}

impl Description {
    /// Build a single-source description (Single / Sequential / Parallel)
    pub fn from_candidate(candidate: &CandidateDescription) -> Self {
        Self {
            span: candidate.span,
            text: candidate.text.clone(),
            description_type: candidate.description_type,
            confidence: candidate.confidence,
            weighted_confidence: candidate.confidence,
            consensus_weight: 1.0,
            contributing_processors: vec![candidate.source_processor.clone()],
            priority_score: 0.0,
            quality_score: 0.0,
        }
    }
}

// ============================================================================
// Strategy Selection
// ============================================================================

/// Processing strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Single,
    Parallel,
    Sequential,
    Ensemble,
    Adaptive,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Single => "single",
            StrategyKind::Parallel => "parallel",
            StrategyKind::Sequential => "sequential",
            StrategyKind::Ensemble => "ensemble",
            StrategyKind::Adaptive => "adaptive",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(StrategyKind::Single),
            "parallel" => Ok(StrategyKind::Parallel),
            "sequential" => Ok(StrategyKind::Sequential),
            "ensemble" => Ok(StrategyKind::Ensemble),
            "adaptive" => Ok(StrategyKind::Adaptive),
            other => Err(format!("unknown strategy '{}'", other)),
        }
    }
}

/// One entry of the fallback chain as it was executed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyAttempt {
    pub strategy: StrategyKind,
    /// `None` on success, error message otherwise
    pub error: Option<String>,
    pub elapsed: Duration,
}

// ============================================================================
// Processing Result
// ============================================================================

/// Aggregate quality metrics of one processing call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub average_confidence: f64,
    pub average_quality: f64,
    pub type_distribution: BTreeMap<DescriptionType, usize>,
    /// Distinct types present / 4
    pub type_diversity: f64,
    /// Fraction of the text covered by descriptions
    pub text_coverage: f64,
    /// Mean share of processors supporting each description
    pub processor_agreement: f64,
    /// Set when adapters failed or a fallback strategy produced the result
    pub degraded: bool,
    pub failed_processors: Vec<String>,
}

/// Result of one `process` call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub request_id: Uuid,
    /// Final descriptions, ascending start offset
    pub descriptions: Vec<Description>,
    /// Raw (filtered, rescored) candidates per processor that ran successfully
    pub processor_results: BTreeMap<String, Vec<CandidateDescription>>,
    pub processing_time: Duration,
    /// Processors whose output contributed to this result
    pub processors_used: Vec<String>,
    /// Strategy that produced the result. When nothing ran (input below the
    /// minimum length) this echoes the requested mode and `attempts` is empty.
    pub strategy_used: StrategyKind,
    /// Strategy steps in order, including failed ones that fell back
    pub attempts: Vec<StrategyAttempt>,
    pub quality_metrics: QualityMetrics,
    pub recommendations: Vec<String>,
    pub processed_at: chrono::DateTime<chrono::Utc>,
}

impl ProcessingResult {
    /// Empty result (input below minimum length, nothing to do)
    ///
    /// `requested` is the caller's mode, `Adaptive` included; no attempts are recorded.
    pub fn empty(requested: StrategyKind) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            descriptions: Vec::new(),
            processor_results: BTreeMap::new(),
            processing_time: Duration::ZERO,
            processors_used: Vec::new(),
            strategy_used: requested,
            attempts: Vec::new(),
            quality_metrics: QualityMetrics::default(),
            recommendations: Vec::new(),
            processed_at: chrono::Utc::now(),
        }
    }

    /// Raw candidate count across all processors
    pub fn raw_candidate_count(&self) -> usize {
        self.processor_results.values().map(Vec::len).sum()
    }
}

/// Clamp to 0.0-1.0, mapping NaN to 0.0
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
