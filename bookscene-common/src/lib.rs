//! # BookScene Common Library
//!
//! Shared code for the BookScene workspace:
//! - Error and result types
//! - Bootstrap configuration loading and config file resolution
//! - Logging initialization
//! - Settings store collaborator (memory, TOML file, SQLite)

pub mod config;
pub mod error;
pub mod logging;
pub mod settings;

pub use error::{Error, Result};
pub use settings::{CategorySettings, SettingsStore};
