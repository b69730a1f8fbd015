//! Quality and filter utilities
//!
//! - [`text`]: boilerplate masking, segmentation, tokenization, complexity
//! - [`scorer`]: five-factor quality score
//! - [`filters`]: type/length/confidence filters, priority score, cap
//! - [`metrics`]: per-call quality metrics and recommendations

pub mod filters;
pub mod metrics;
pub mod scorer;
pub mod text;

pub use filters::{apply_output_filters, filter_candidates, priority_score};
pub use metrics::{compute_metrics, recommendations, CallOutcome};
pub use scorer::{FactorWeights, QualityBreakdown, QualityScorer};
pub use text::{mask_boilerplate, text_complexity};
