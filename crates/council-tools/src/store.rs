//! SQLite data store scoped to a single run
//!
//! The pool holds one connection; dropping the [`DataStore`] (or calling
//! [`DataStore::close`]) releases it.

use crate::error::{Error, Result};
use crate::table::Table;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Executor, Row, Statement, TypeInfo, ValueRef};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// How the store file is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    /// Writes are rejected by SQLite itself
    #[default]
    ReadOnly,
    /// Statements run exactly as given, including writes
    ReadWrite,
}

/// Handle to a single-file relational store
#[derive(Debug)]
pub struct DataStore {
    pool: SqlitePool,
    path: PathBuf,
    mode: AccessMode,
}

impl DataStore {
    /// Open an existing store file.
    ///
    /// Never creates the file. Fails if it is missing or is not a database.
    pub async fn open(path: impl AsRef<Path>, mode: AccessMode) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(Error::Store(format!(
                "database file not found: {}",
                path.display()
            )));
        }

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(false)
            .read_only(mode == AccessMode::ReadOnly);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| Error::Store(format!("Failed to open {}: {}", path.display(), e)))?;

        // SQLite opens lazily; the first read is what detects a non-database file.
        sqlx::query("SELECT count(*) FROM sqlite_master")
            .fetch_one(&pool)
            .await
            .map_err(|e| Error::Store(format!("Failed to read {}: {}", path.display(), e)))?;

        info!(path = %path.display(), mode = ?mode, "Opened data store");
        Ok(Self { pool, path, mode })
    }

    /// Path the store was opened from
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Access mode
    #[must_use]
    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Names of user tables, excluding SQLite's internal ones
    pub async fn user_tables(&self) -> Result<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Store(format!("Failed to list tables: {}", e)))
    }

    /// `(name, declared type)` for each column of `table`
    pub async fn table_columns(&self, table: &str) -> Result<Vec<(String, String)>> {
        let pragma = format!("PRAGMA table_info('{}')", table.replace('\'', "''"));
        let rows = sqlx::query(&pragma)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::Store(format!("Failed to read columns of {}: {}", table, e)))?;

        rows.iter()
            .map(|row| {
                let name: String = row
                    .try_get("name")
                    .map_err(|e| Error::Store(e.to_string()))?;
                let declared: String = row.try_get("type").unwrap_or_default();
                Ok((name, declared))
            })
            .collect()
    }

    /// Run one statement and materialize every row
    pub async fn fetch_table(&self, sql: &str) -> Result<Table> {
        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::Execution(e.to_string()))?;

        let columns: Vec<String> = match rows.first() {
            Some(first) => first.columns().iter().map(|c| c.name().to_string()).collect(),
            // No rows to read names from; ask the prepared statement instead.
            None => match (&self.pool).prepare(sql).await {
                Ok(statement) => statement
                    .columns()
                    .iter()
                    .map(|c| c.name().to_string())
                    .collect(),
                Err(_) => Vec::new(),
            },
        };

        let data = rows
            .iter()
            .map(|row| decode_row(row, columns.len()))
            .collect::<Result<Vec<_>>>()?;

        debug!(rows = data.len(), columns = columns.len(), "Fetched result set");
        Ok(Table::new(columns, data))
    }

    /// Close the pool, waiting for the connection to be released
    pub async fn close(&self) {
        self.pool.close().await;
        debug!(path = %self.path.display(), "Closed data store");
    }

    /// Whether the pool has been closed
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

fn decode_row(row: &SqliteRow, width: usize) -> Result<Vec<Value>> {
    (0..width).map(|i| decode_value(row, i)).collect()
}

fn decode_value(row: &SqliteRow, index: usize) -> Result<Value> {
    let raw = row
        .try_get_raw(index)
        .map_err(|e| Error::Execution(e.to_string()))?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let storage = raw.type_info().name().to_string();
    let decode_err = |e: sqlx::Error| Error::Execution(format!("column {}: {}", index, e));

    let value = match storage.as_str() {
        "INTEGER" | "BOOLEAN" => {
            Value::from(row.try_get_unchecked::<i64, _>(index).map_err(decode_err)?)
        }
        "REAL" | "NUMERIC" => {
            let n = row.try_get_unchecked::<f64, _>(index).map_err(decode_err)?;
            serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number)
        }
        "BLOB" => {
            let bytes = row
                .try_get_unchecked::<Vec<u8>, _>(index)
                .map_err(decode_err)?;
            Value::String(base64::engine::general_purpose::STANDARD.encode(bytes))
        }
        _ => Value::String(
            row.try_get_unchecked::<String, _>(index)
                .map_err(decode_err)?,
        ),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn seed(path: &Path) {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await.unwrap();
        for stmt in [
            "CREATE TABLE sales (id INTEGER, amount REAL, region TEXT, raw BLOB)",
            "INSERT INTO sales VALUES (1, 100.5, 'West', x'0102'), (2, NULL, 'East', NULL)",
        ] {
            sqlx::query(stmt).execute(&pool).await.unwrap();
        }
        pool.close().await;
    }

    #[tokio::test]
    async fn test_missing_file_is_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = DataStore::open(dir.path().join("nope.db"), AccessMode::ReadOnly).await;
        assert!(matches!(result, Err(Error::Store(_))));
        assert!(!dir.path().join("nope.db").exists());
    }

    #[tokio::test]
    async fn test_non_database_file_is_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.db");
        std::fs::write(&path, "this is not sqlite, just some text padding it out".repeat(20))
            .unwrap();
        let result = DataStore::open(&path, AccessMode::ReadOnly).await;
        assert!(matches!(result, Err(Error::Store(_))));
    }

    #[tokio::test]
    async fn test_fetch_decodes_storage_classes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.db");
        seed(&path).await;

        let store = DataStore::open(&path, AccessMode::ReadOnly).await.unwrap();
        let table = store
            .fetch_table("SELECT id, amount, region, raw FROM sales ORDER BY id")
            .await
            .unwrap();

        assert_eq!(table.columns, vec!["id", "amount", "region", "raw"]);
        assert_eq!(table.rows[0], vec![json!(1), json!(100.5), json!("West"), json!("AQI=")]);
        assert_eq!(table.rows[1][1], Value::Null);
        assert_eq!(table.rows[1][3], Value::Null);
    }

    #[tokio::test]
    async fn test_empty_result_keeps_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.db");
        seed(&path).await;

        let store = DataStore::open(&path, AccessMode::ReadOnly).await.unwrap();
        let table = store
            .fetch_table("SELECT region FROM sales WHERE id > 100")
            .await
            .unwrap();
        assert!(table.is_empty());
        assert_eq!(table.columns, vec!["region"]);
    }

    #[tokio::test]
    async fn test_read_only_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.db");
        seed(&path).await;

        let store = DataStore::open(&path, AccessMode::ReadOnly).await.unwrap();
        let result = store.fetch_table("DELETE FROM sales").await;
        assert!(matches!(result, Err(Error::Execution(_))));
    }

    #[tokio::test]
    async fn test_read_write_executes_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.db");
        seed(&path).await;

        let store = DataStore::open(&path, AccessMode::ReadWrite).await.unwrap();
        store.fetch_table("DELETE FROM sales WHERE id = 2").await.unwrap();
        let remaining = store.fetch_table("SELECT id FROM sales").await.unwrap();
        assert_eq!(remaining.len(), 1);
    }

    #[tokio::test]
    async fn test_close_releases_pool() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.db");
        seed(&path).await;

        let store = DataStore::open(&path, AccessMode::ReadOnly).await.unwrap();
        assert!(!store.is_closed());
        store.close().await;
        assert!(store.is_closed());
    }
}
