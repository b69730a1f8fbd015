//! TOML file settings store
//!
//! Category `processor.general` maps to the table `[processor.general]`.
//! Scalars are stringified, arrays joined with commas, nested tables skipped.

use super::{CategorySettings, SettingsStore};
use crate::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Settings store backed by a TOML file
///
/// The file is re-read on every call so a reload picks up edits.
/// A missing file is treated as "no settings".
#[derive(Debug, Clone)]
pub struct TomlSettingsStore {
    path: PathBuf,
}

impl TomlSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> Result<Option<toml::Table>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Settings file not found, using defaults");
                return Ok(None);
            }
            Err(e) => return Err(Error::Io(e)),
        };

        content
            .parse::<toml::Table>()
            .map(Some)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", self.path.display(), e)))
    }
}

#[async_trait]
impl SettingsStore for TomlSettingsStore {
    async fn get_category_settings(&self, category: &str) -> Result<CategorySettings> {
        let Some(document) = self.read_document().await? else {
            return Ok(CategorySettings::new());
        };
        Ok(category_from_table(&document, category))
    }
}

/// Extract a dotted category from a parsed TOML document
pub(crate) fn category_from_table(document: &toml::Table, category: &str) -> CategorySettings {
    let mut table = document;
    for part in category.split('.') {
        match table.get(part) {
            Some(toml::Value::Table(inner)) => table = inner,
            _ => return CategorySettings::new(),
        }
    }

    table
        .iter()
        .filter_map(|(key, value)| value_to_string(value).map(|v| (key.clone(), v)))
        .collect()
}

fn value_to_string(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Boolean(b) => Some(b.to_string()),
        toml::Value::Datetime(d) => Some(d.to_string()),
        toml::Value::Array(items) => Some(
            items
                .iter()
                .filter_map(value_to_string)
                .collect::<Vec<_>>()
                .join(","),
        ),
        toml::Value::Table(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[engine]
min_quorum = 2
consensus_threshold = 0.65
fallback_chain = ["ensemble", "parallel", "single"]

[processor.general]
enabled = true
weight = 1.0
language = "en"

[processor.zero_shot]
labels = ["location", "character"]
"#;

    #[test]
    fn test_category_from_table_nested() {
        let document: toml::Table = SAMPLE.parse().unwrap();
        let general = category_from_table(&document, "processor.general");
        assert_eq!(general["enabled"], "true");
        assert_eq!(general["weight"], "1");
        assert_eq!(general["language"], "en");
    }

    #[test]
    fn test_arrays_are_comma_joined() {
        let document: toml::Table = SAMPLE.parse().unwrap();
        let engine = category_from_table(&document, "engine");
        assert_eq!(engine["fallback_chain"], "ensemble,parallel,single");
        assert_eq!(engine["consensus_threshold"], "0.65");

        let zero_shot = category_from_table(&document, "processor.zero_shot");
        assert_eq!(zero_shot["labels"], "location,character");
    }

    #[test]
    fn test_parent_category_skips_nested_tables() {
        let document: toml::Table = SAMPLE.parse().unwrap();
        let processor = category_from_table(&document, "processor");
        assert!(processor.is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = TomlSettingsStore::new(dir.path().join("absent.toml"));
        assert!(store.get_category_settings("engine").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_is_reread_on_each_call() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[engine]\nmin_quorum = 2\n").unwrap();

        let store = TomlSettingsStore::new(&path);
        assert_eq!(store.get_category_settings("engine").await.unwrap()["min_quorum"], "2");

        std::fs::write(&path, "[engine]\nmin_quorum = 3\n").unwrap();
        assert_eq!(store.get_category_settings("engine").await.unwrap()["min_quorum"], "3");
    }

    #[tokio::test]
    async fn test_malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[engine\n").unwrap();

        let err = TomlSettingsStore::new(&path)
            .get_category_settings("engine")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
