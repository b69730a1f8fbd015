//! SQLite settings store
//!
//! Follows the key/value `settings` table pattern, with an extra `category`
//! column so each processor gets its own namespace.

use super::{CategorySettings, SettingsStore};
use crate::{Error, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;

/// Settings store backed by a SQLite `settings` table
#[derive(Debug, Clone)]
pub struct SqliteSettingsStore {
    pool: SqlitePool,
}

impl SqliteSettingsStore {
    /// Wrap an existing pool (schema must already exist, see [`Self::ensure_schema`])
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (or create) a database file and ensure the schema exists
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path.display()))
            .map_err(Error::Database)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Create the settings table if missing
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS settings (
                category TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (category, key)
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert or update a single setting
    pub async fn set_setting<T>(&self, category: &str, key: &str, value: T) -> Result<()>
    where
        T: std::fmt::Display,
    {
        sqlx::query(
            "INSERT INTO settings (category, key, value) VALUES (?, ?, ?)
             ON CONFLICT(category, key) DO UPDATE SET value = excluded.value",
        )
        .bind(category)
        .bind(key)
        .bind(value.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn get_category_settings(&self, category: &str) -> Result<CategorySettings> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT key, value FROM settings WHERE category = ?")
                .bind(category)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// In-memory store; a single connection keeps the database alive
    async fn setup_test_store() -> SqliteSettingsStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteSettingsStore::new(pool);
        store.ensure_schema().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_get_category_settings() {
        let store = setup_test_store().await;
        store.set_setting("processor.general", "weight", 1.25).await.unwrap();
        store.set_setting("processor.general", "language", "en").await.unwrap();
        store.set_setting("processor.dependency", "weight", 0.8).await.unwrap();

        let general = store.get_category_settings("processor.general").await.unwrap();
        assert_eq!(general.len(), 2);
        assert_eq!(general["weight"], "1.25");
        assert_eq!(general["language"], "en");
    }

    #[tokio::test]
    async fn test_set_setting_upserts() {
        let store = setup_test_store().await;
        store.set_setting("engine", "min_quorum", 2).await.unwrap();
        store.set_setting("engine", "min_quorum", 3).await.unwrap();

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM settings WHERE category = 'engine' AND key = 'min_quorum'",
        )
        .fetch_one(store.pool())
        .await
        .unwrap();
        assert_eq!(count, 1, "Should have exactly one entry after update");
        assert_eq!(store.get_category_settings("engine").await.unwrap()["min_quorum"], "3");
    }

    #[tokio::test]
    async fn test_unknown_category_is_empty() {
        let store = setup_test_store().await;
        assert!(store.get_category_settings("nothing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.db");

        let store = SqliteSettingsStore::open(&path).await.unwrap();
        store.set_setting("engine", "merge_gap", 4).await.unwrap();

        assert!(path.exists());
        assert_eq!(store.get_category_settings("engine").await.unwrap()["merge_gap"], "4");
    }
}
