use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::domain::{MapData, MapId};

const IN_MEMORY_URL: &str = "sqlite::memory:";

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // Every connection to an in-memory database opens a fresh database.
        let max_connections = if database_url.starts_with(IN_MEMORY_URL) {
            1
        } else {
            5
        };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn put_map(&self, map_id: &MapId, map: &MapData) -> Result<()> {
        let document = serde_json::to_string(map).context("failed to encode map document")?;
        sqlx::query(
            r#"
            INSERT INTO map_documents (map_id, document, updated_at)
            VALUES (?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(map_id) DO UPDATE SET
                document = excluded.document,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(map_id.as_str())
        .bind(document)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to store map document '{map_id}'"))?;
        Ok(())
    }

    pub async fn get_map(&self, map_id: &MapId) -> Result<Option<MapData>> {
        let row = sqlx::query("SELECT document FROM map_documents WHERE map_id = ?")
            .bind(map_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to load map document '{map_id}'"))?;
        let Some(row) = row else {
            return Ok(None);
        };
        let document: String = row.try_get("document")?;
        let map = serde_json::from_str(&document)
            .with_context(|| format!("stored map document '{map_id}' is not valid"))?;
        Ok(Some(map))
    }

    pub async fn list_map_ids(&self) -> Result<Vec<MapId>> {
        let rows = sqlx::query("SELECT map_id FROM map_documents ORDER BY map_id")
            .fetch_all(&self.pool)
            .await
            .context("failed to list map documents")?;
        rows.into_iter()
            .map(|row| Ok(MapId(row.try_get::<String, _>("map_id")?)))
            .collect()
    }

    pub async fn delete_map(&self, map_id: &MapId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM map_documents WHERE map_id = ?")
            .bind(map_id.as_str())
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete map document '{map_id}'"))?;
        Ok(result.rows_affected() > 0)
    }
}

/// Durable key/value cache the dashboard reads before live data arrives.
#[async_trait]
pub trait LocalCache: Send + Sync {
    async fn get_raw(&self, key: &str) -> Result<Option<String>>;
    async fn put_raw(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

#[async_trait]
impl LocalCache for Storage {
    async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let value = sqlx::query_scalar::<_, String>(
            "SELECT value FROM cache_entries WHERE cache_key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to read cache entry '{key}'"))?;
        Ok(value)
    }

    async fn put_raw(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cache_entries (cache_key, value, updated_at)
            VALUES (?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(cache_key) DO UPDATE SET
                value = excluded.value,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to write cache entry '{key}'"))?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM cache_entries WHERE cache_key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to remove cache entry '{key}'"))?;
        Ok(())
    }
}

pub async fn cache_get_json<T: DeserializeOwned>(
    cache: &dyn LocalCache,
    key: &str,
) -> Result<Option<T>> {
    let Some(raw) = cache.get_raw(key).await? else {
        return Ok(None);
    };
    let value = serde_json::from_str(&raw)
        .with_context(|| format!("cache entry '{key}' is not valid json"))?;
    Ok(Some(value))
}

pub async fn cache_put_json<T: Serialize + ?Sized>(
    cache: &dyn LocalCache,
    key: &str,
    value: &T,
) -> Result<()> {
    let raw = serde_json::to_string(value)
        .with_context(|| format!("failed to encode cache entry '{key}'"))?;
    cache.put_raw(key, &raw).await
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == IN_MEMORY_URL || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
