//! Settings store collaborator
//!
//! The engine reads per-category key/value settings through [`SettingsStore`]
//! and never writes them. Categories are dotted names such as `engine` or
//! `processor.general`. Values are strings; consumers parse them.
//!
//! Implementations:
//! - [`MemorySettingsStore`] - in-process map (tests, embedding)
//! - [`TomlSettingsStore`] - TOML file, re-read on every call
//! - [`SqliteSettingsStore`] - `settings(category, key, value)` table

mod toml_store;
#[cfg(feature = "sqlx")]
mod sqlite_store;

pub use toml_store::TomlSettingsStore;
#[cfg(feature = "sqlx")]
pub use sqlite_store::SqliteSettingsStore;

use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// Key/value settings of one category
pub type CategorySettings = HashMap<String, String>;

/// Read-only access to categorized settings
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Fetch all settings of a category
    ///
    /// Unknown categories yield an empty map, not an error.
    async fn get_category_settings(&self, category: &str) -> Result<CategorySettings>;
}

/// In-memory settings store
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    categories: RwLock<HashMap<String, CategorySettings>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter
    pub fn with_setting(self, category: &str, key: &str, value: impl ToString) -> Self {
        // Freshly built store, lock cannot be contended
        let _ = self.set(category, key, value);
        self
    }

    /// Set (insert or replace) a single setting
    pub fn set(&self, category: &str, key: &str, value: impl ToString) -> Result<()> {
        let mut categories = self
            .categories
            .write()
            .map_err(|_| Error::Internal("settings lock poisoned".to_string()))?;
        categories
            .entry(category.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// Remove a single setting, returning its previous value
    pub fn remove(&self, category: &str, key: &str) -> Result<Option<String>> {
        let mut categories = self
            .categories
            .write()
            .map_err(|_| Error::Internal("settings lock poisoned".to_string()))?;
        Ok(categories.get_mut(category).and_then(|c| c.remove(key)))
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn get_category_settings(&self, category: &str) -> Result<CategorySettings> {
        let categories = self
            .categories
            .read()
            .map_err(|_| Error::Internal("settings lock poisoned".to_string()))?;
        Ok(categories.get(category).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemorySettingsStore::new()
            .with_setting("processor.general", "weight", 1.5)
            .with_setting("processor.general", "enabled", true);

        let settings = store.get_category_settings("processor.general").await.unwrap();
        assert_eq!(settings.get("weight").map(String::as_str), Some("1.5"));
        assert_eq!(settings.get("enabled").map(String::as_str), Some("true"));
    }

    #[tokio::test]
    async fn test_unknown_category_is_empty() {
        let store = MemorySettingsStore::new();
        let settings = store.get_category_settings("engine").await.unwrap();
        assert!(settings.is_empty());
    }

    #[tokio::test]
    async fn test_set_replaces_and_remove_deletes() {
        let store = MemorySettingsStore::new().with_setting("engine", "min_quorum", 2);
        store.set("engine", "min_quorum", 3).unwrap();
        assert_eq!(
            store.get_category_settings("engine").await.unwrap()["min_quorum"],
            "3"
        );

        assert_eq!(store.remove("engine", "min_quorum").unwrap(), Some("3".to_string()));
        assert!(store.get_category_settings("engine").await.unwrap().is_empty());
    }
}
