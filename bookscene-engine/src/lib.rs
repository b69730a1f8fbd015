//! bookscene-engine library interface
//!
//! Extracts visual descriptions (locations, characters, atmosphere, objects)
//! from book text by running several extraction backends and merging their
//! output.
//!
//! Layers, bottom up:
//! - [`processors`]: extraction backends behind [`processors::ProcessorAdapter`]
//! - [`registry`]: active processors and their health
//! - [`strategies`]: Single, Parallel, Sequential, Ensemble, Adaptive
//! - [`voting`]: weighted consensus merge
//! - [`quality`]: masking, scoring, filters, metrics
//! - [`orchestrator`]: [`DescriptionEngine`], the public entry point

pub mod config_loader;
pub mod error;
pub mod lexicon;
pub mod orchestrator;
pub mod processors;
pub mod quality;
pub mod registry;
pub mod stats;
pub mod strategies;
pub mod types;
pub mod voting;

pub use crate::config_loader::{ConfigLoader, EngineConfig, EngineSettings, ProcessorConfig};
pub use crate::error::{EngineError, EngineResult, ExtractionError};
pub use crate::orchestrator::{DescriptionEngine, FallbackPlan};
pub use crate::processors::{AdapterFactory, BuiltinFactory, ProcessorAdapter, ProcessorKind};
pub use crate::registry::{HealthSnapshot, ProcessorRegistry};
pub use crate::stats::StatisticsSnapshot;
pub use crate::types::{
    CandidateDescription, Description, DescriptionType, ProcessingResult, QualityMetrics, RawCandidate,
    StrategyKind, TextSpan,
};
