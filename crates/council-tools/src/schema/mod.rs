//! Schema inspection with a bounded, process-wide memo
//!
//! [`SchemaCache::describe`] renders one line per user table:
//!
//! ```text
//! - sales: id (INTEGER), amount (REAL), region (TEXT)
//! ```
//!
//! Results are keyed by store identity (the canonical path of the file) and
//! evicted least-recently-used once `capacity` distinct stores are cached.

use crate::error::Result;
use crate::store::{AccessMode, DataStore};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::{debug, instrument};

/// Default number of distinct stores remembered
pub const DEFAULT_CACHE_CAPACITY: usize = 32;

/// Description returned for a store without user tables
pub const NO_USER_TABLES: &str = "(no user tables found)";

/// Memoized schema descriptions
pub struct SchemaCache {
    entries: Mutex<LruCache<PathBuf, String>>,
    introspections: AtomicUsize,
}

impl Default for SchemaCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl std::fmt::Debug for SchemaCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("introspections", &self.introspection_count())
            .finish()
    }
}

impl SchemaCache {
    /// Create a cache holding at most `capacity` stores (minimum 1)
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            introspections: AtomicUsize::new(0),
        }
    }

    /// Describe the store at `store_path`.
    ///
    /// A cached description is returned without touching the store. Open
    /// failures are returned and nothing is cached for that store.
    #[instrument(skip(self, store_path), fields(store = %store_path.as_ref().display()))]
    pub async fn describe(&self, store_path: impl AsRef<Path>) -> Result<String> {
        let store_path = store_path.as_ref();
        let key = store_identity(store_path).await;

        if let Some(hit) = self.lock().get(&key) {
            debug!("Schema cache hit");
            return Ok(hit.clone());
        }

        let store = DataStore::open(store_path, AccessMode::ReadOnly).await?;
        let description = introspect(&store).await;
        store.close().await;
        let description = description?;
        self.introspections.fetch_add(1, Ordering::SeqCst);

        self.lock().put(key, description.clone());
        debug!("Schema cached");
        Ok(description)
    }

    /// Number of times a store was actually queried
    #[must_use]
    pub fn introspection_count(&self) -> usize {
        self.introspections.load(Ordering::SeqCst)
    }

    /// Number of cached stores
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is cached
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Maximum number of cached stores
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }

    /// Whether a description for `store_path` is cached, without touching recency
    pub async fn contains(&self, store_path: impl AsRef<Path>) -> bool {
        let key = store_identity(store_path.as_ref()).await;
        self.lock().contains(&key)
    }

    // Never held across an await.
    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<PathBuf, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

async fn store_identity(path: &Path) -> PathBuf {
    tokio::fs::canonicalize(path)
        .await
        .unwrap_or_else(|_| path.to_path_buf())
}

async fn introspect(store: &DataStore) -> Result<String> {
    let tables = store.user_tables().await?;
    if tables.is_empty() {
        return Ok(NO_USER_TABLES.to_string());
    }

    let mut lines = Vec::with_capacity(tables.len());
    for table in tables {
        let columns = store.table_columns(&table).await?;
        let rendered: Vec<String> = columns
            .iter()
            .map(|(name, declared)| format!("{} ({})", name, declared))
            .collect();
        lines.push(format!("- {}: {}", table, rendered.join(", ")));
    }
    Ok(lines.join("\n"))
}
