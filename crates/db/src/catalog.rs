//! TTL-cached schema introspection.
//!
//! Import batches only include fields whose target columns actually exist,
//! so the pipeline consults the backing store's metadata per table. The
//! catalog is an injected service object (never module-global state) with a
//! per-table TTL cache: live schema changes are picked up within one TTL
//! window without re-querying `information_schema` on every row.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::DbPool;

// ---------------------------------------------------------------------------
// Table schema
// ---------------------------------------------------------------------------

/// Column metadata for one table, in ordinal order.
#[derive(Debug, Clone, Default)]
pub struct TableSchema {
    columns: Vec<(String, String)>,
}

impl TableSchema {
    pub fn new(columns: Vec<(String, String)>) -> Self {
        Self { columns }
    }

    /// The table has no columns: it does not exist (or introspection
    /// failed). Callers treat every field as "do not include".
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|(c, _)| c == name)
    }

    pub fn column_names(&self) -> HashSet<String> {
        self.columns.iter().map(|(c, _)| c.clone()).collect()
    }

    pub fn column_types(&self) -> HashMap<String, String> {
        self.columns.iter().cloned().collect()
    }

    /// Declared type of one column, if present.
    pub fn column_type(&self, name: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(c, _)| c == name)
            .map(|(_, t)| t.as_str())
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

struct CacheEntry {
    schema: Arc<TableSchema>,
    fetched_at: Instant,
}

/// Injected schema catalog with a per-table TTL cache.
///
/// Unknown tables yield an empty schema rather than an error. Safe for
/// concurrent reads once populated; the only cross-run shared mutable
/// state in the pipeline.
#[derive(Clone)]
pub struct SchemaCatalog {
    pool: DbPool,
    ttl: Duration,
    cache: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl SchemaCatalog {
    pub fn new(pool: DbPool, ttl: Duration) -> Self {
        Self {
            pool,
            ttl,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Column metadata for a table, served from cache within the TTL.
    pub async fn table_schema(&self, table: &str) -> Arc<TableSchema> {
        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.get(table) {
                if entry.fetched_at.elapsed() < self.ttl {
                    return Arc::clone(&entry.schema);
                }
            }
        }

        let schema = Arc::new(self.fetch(table).await);
        let mut cache = self.cache.write().await;
        cache.insert(
            table.to_string(),
            CacheEntry {
                schema: Arc::clone(&schema),
                fetched_at: Instant::now(),
            },
        );
        schema
    }

    /// The set of column names for a table (empty for unknown tables).
    pub async fn columns(&self, table: &str) -> HashSet<String> {
        self.table_schema(table).await.column_names()
    }

    /// Column name → declared type map (empty for unknown tables).
    pub async fn column_types(&self, table: &str) -> HashMap<String, String> {
        self.table_schema(table).await.column_types()
    }

    /// Drop one cached table so the next lookup re-queries.
    pub async fn invalidate(&self, table: &str) {
        self.cache.write().await.remove(table);
    }

    async fn fetch(&self, table: &str) -> TableSchema {
        let rows: Result<Vec<(String, String)>, sqlx::Error> = sqlx::query_as(
            "SELECT column_name, data_type
             FROM information_schema.columns
             WHERE table_schema = 'public' AND table_name = $1
             ORDER BY ordinal_position",
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await;

        match rows {
            Ok(columns) => TableSchema::new(columns),
            Err(err) => {
                // Introspection failure degrades to "no columns"; the
                // import reports the affected rows instead of crashing.
                tracing::warn!(error = %err, table, "Schema introspection failed");
                TableSchema::default()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_schema_has_no_columns() {
        let schema = TableSchema::default();
        assert!(schema.is_empty());
        assert!(!schema.has_column("anything"));
        assert!(schema.column_names().is_empty());
    }

    #[test]
    fn schema_lookups() {
        let schema = TableSchema::new(vec![
            ("id".to_string(), "uuid".to_string()),
            ("amount".to_string(), "numeric".to_string()),
        ]);
        assert!(schema.has_column("amount"));
        assert_eq!(schema.column_type("amount"), Some("numeric"));
        assert_eq!(schema.column_type("missing"), None);
        assert_eq!(schema.column_names().len(), 2);
    }
}
