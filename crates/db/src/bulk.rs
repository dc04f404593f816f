//! Chunked set-based upserts with constraint-shape probing and row-level
//! fallback.
//!
//! Writes are idempotent at the data-model level: every statement is an
//! `INSERT … ON CONFLICT … DO UPDATE` keyed on the tenant-scoped natural
//! key, so re-running the same file overwrites rather than duplicates.
//! Chunks are issued sequentially; a chunk either bulk-succeeds, is retried
//! under the secondary conflict-key shape, or is replayed row by row so
//! exactly the failing rows are reported. One bad row never discards an
//! otherwise-good chunk, and every input row is accounted for.

use std::collections::HashMap;

use sqlx::{PgPool, Postgres, QueryBuilder};

use ledgerly_core::coerce::Scalar;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Conflict key column sets for one target table.
///
/// `primary` is the tenant-scoped natural key. `secondary` covers older
/// deployment generations whose unique constraint omits the tenant column.
#[derive(Debug, Clone, Copy)]
pub struct ConflictKeys {
    pub primary: &'static [&'static str],
    pub secondary: &'static [&'static str],
}

/// One prepared row, value-aligned with the column list passed to
/// [`BulkUpsertExecutor::upsert`].
#[derive(Debug, Clone)]
pub struct BulkRow {
    /// 1-based row number in the source file, for diagnostics.
    pub source_row: usize,
    pub values: Vec<Scalar>,
}

/// A row rejected during the row-level fallback, with the exact error.
#[derive(Debug, Clone)]
pub struct RowError {
    pub source_row: usize,
    pub message: String,
}

/// Outcome of one upsert call.
///
/// Invariant: `written + row_errors.len()` equals the number of rows
/// passed in — no silent drops.
#[derive(Debug, Default)]
pub struct UpsertOutcome {
    pub written: usize,
    pub row_errors: Vec<RowError>,
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

pub struct BulkUpsertExecutor {
    pool: PgPool,
    chunk_size: usize,
}

impl BulkUpsertExecutor {
    pub fn new(pool: PgPool, chunk_size: usize) -> Self {
        Self {
            pool,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Upsert `rows` into `table` in fixed-size chunks.
    ///
    /// The conflict-key shape is selected up front by probing the table's
    /// unique constraints; a residual `42P10` at runtime still switches to
    /// the secondary keys. Bulk failures of any other class abandon bulk
    /// mode for the remainder of the run and replay rows one at a time.
    /// Only connectivity-class errors propagate as `Err`; committed chunks
    /// stay committed either way.
    pub async fn upsert(
        &self,
        table: &str,
        columns: &[&str],
        rows: &[BulkRow],
        keys: &ConflictKeys,
    ) -> Result<UpsertOutcome, sqlx::Error> {
        let mut outcome = UpsertOutcome::default();
        if rows.is_empty() || columns.is_empty() {
            return Ok(outcome);
        }

        let mut conflict_cols = self.probe_conflict_keys(table, keys).await;
        let mut bulk_mode = true;

        for chunk in rows.chunks(self.chunk_size) {
            if bulk_mode {
                match self.upsert_chunk(table, columns, chunk, conflict_cols).await {
                    Ok(()) => {
                        outcome.written += chunk.len();
                        continue;
                    }
                    Err(err) if is_conflict_shape_error(&err) && conflict_cols != keys.secondary => {
                        tracing::warn!(
                            table,
                            "No unique constraint matches the primary conflict keys; retrying chunk with secondary keys"
                        );
                        conflict_cols = keys.secondary;
                        match self.upsert_chunk(table, columns, chunk, conflict_cols).await {
                            Ok(()) => {
                                outcome.written += chunk.len();
                                continue;
                            }
                            Err(retry_err) => {
                                if is_connectivity_error(&retry_err) {
                                    return Err(retry_err);
                                }
                                tracing::warn!(
                                    error = %retry_err,
                                    table,
                                    "Bulk upsert failed under secondary keys; falling back to row-level writes"
                                );
                                bulk_mode = false;
                            }
                        }
                    }
                    Err(err) => {
                        if is_connectivity_error(&err) {
                            return Err(err);
                        }
                        tracing::warn!(
                            error = %err,
                            table,
                            "Bulk upsert failed; falling back to row-level writes"
                        );
                        bulk_mode = false;
                    }
                }
            }

            for row in chunk {
                match self
                    .upsert_chunk(table, columns, std::slice::from_ref(row), conflict_cols)
                    .await
                {
                    Ok(()) => outcome.written += 1,
                    Err(err) if is_connectivity_error(&err) => return Err(err),
                    Err(err) => outcome.row_errors.push(RowError {
                        source_row: row.source_row,
                        message: err.to_string(),
                    }),
                }
            }
        }

        Ok(outcome)
    }

    /// Pick the conflict key set by probing the table's unique constraints.
    /// Probe failures are non-fatal: the runtime error path still corrects
    /// a wrong guess.
    async fn probe_conflict_keys(
        &self,
        table: &str,
        keys: &ConflictKeys,
    ) -> &'static [&'static str] {
        match unique_constraint_columns(&self.pool, table).await {
            Ok(sets) => {
                if sets.iter().any(|set| column_set_matches(set, keys.primary)) {
                    keys.primary
                } else if sets.iter().any(|set| column_set_matches(set, keys.secondary)) {
                    tracing::debug!(
                        table,
                        "Primary conflict keys not constrained; using secondary keys"
                    );
                    keys.secondary
                } else {
                    keys.primary
                }
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    table,
                    "Constraint probe failed; assuming primary conflict keys"
                );
                keys.primary
            }
        }
    }

    async fn upsert_chunk(
        &self,
        table: &str,
        columns: &[&str],
        chunk: &[BulkRow],
        conflict: &[&str],
    ) -> Result<(), sqlx::Error> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("INSERT INTO {table} ({}) ", columns.join(", ")));
        qb.push_values(chunk, |mut b, row| {
            for value in &row.values {
                match value {
                    Scalar::Text(v) => b.push_bind(v.clone()),
                    Scalar::Integer(v) => b.push_bind(*v),
                    Scalar::Decimal(v) => b.push_bind(*v),
                    Scalar::Boolean(v) => b.push_bind(*v),
                    Scalar::Date(v) => b.push_bind(*v),
                    Scalar::Timestamp(v) => b.push_bind(*v),
                    Scalar::Uuid(v) => b.push_bind(*v),
                };
            }
        });
        qb.push(format!(
            " ON CONFLICT ({}) DO UPDATE SET {}",
            conflict.join(", "),
            update_assignments(columns, conflict)
        ));
        qb.build().execute(&self.pool).await.map(|_| ())
    }
}

// ---------------------------------------------------------------------------
// Statement helpers
// ---------------------------------------------------------------------------

/// `EXCLUDED`-based SET list for the non-key columns, always bumping
/// `updated_at`.
fn update_assignments(columns: &[&str], conflict: &[&str]) -> String {
    let mut assignments: Vec<String> = columns
        .iter()
        .filter(|c| !conflict.contains(*c))
        .map(|c| format!("{c} = EXCLUDED.{c}"))
        .collect();
    assignments.push("updated_at = now()".to_string());
    assignments.join(", ")
}

/// Compare a constraint's column set against a conflict key set,
/// order-insensitively.
fn column_set_matches(constraint: &[String], keys: &[&str]) -> bool {
    constraint.len() == keys.len() && keys.iter().all(|k| constraint.iter().any(|c| c == k))
}

/// Fetch the column sets of every PRIMARY KEY / UNIQUE constraint on a
/// table.
async fn unique_constraint_columns(
    pool: &PgPool,
    table: &str,
) -> Result<Vec<Vec<String>>, sqlx::Error> {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT tc.constraint_name, kcu.column_name
         FROM information_schema.table_constraints tc
         JOIN information_schema.key_column_usage kcu
           ON kcu.constraint_name = tc.constraint_name
          AND kcu.table_schema = tc.table_schema
         WHERE tc.table_schema = 'public'
           AND tc.table_name = $1
           AND tc.constraint_type IN ('PRIMARY KEY', 'UNIQUE')
         ORDER BY tc.constraint_name, kcu.ordinal_position",
    )
    .bind(table)
    .fetch_all(pool)
    .await?;

    let mut grouped: HashMap<String, Vec<String>> = HashMap::new();
    for (constraint, column) in rows {
        grouped.entry(constraint).or_default().push(column);
    }
    Ok(grouped.into_values().collect())
}

// ---------------------------------------------------------------------------
// Error classification
// ---------------------------------------------------------------------------

/// `42P10` is PostgreSQL's "invalid column reference" code, raised when an
/// ON CONFLICT target has no matching unique constraint.
fn is_conflict_shape_error(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("42P10"),
        _ => false,
    }
}

/// Errors that mean the backing store itself is gone; these abort the run
/// instead of being attributed to individual rows.
fn is_connectivity_error(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Tls(_)
            | sqlx::Error::WorkerCrashed
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_assignments_exclude_conflict_columns() {
        let sql = update_assignments(
            &["tenant_id", "sku", "name", "selling_price"],
            &["tenant_id", "sku"],
        );
        assert_eq!(
            sql,
            "name = EXCLUDED.name, selling_price = EXCLUDED.selling_price, updated_at = now()"
        );
    }

    #[test]
    fn update_assignments_always_touch_updated_at() {
        let sql = update_assignments(&["tenant_id", "sku"], &["tenant_id", "sku"]);
        assert_eq!(sql, "updated_at = now()");
    }

    #[test]
    fn column_set_match_is_order_insensitive() {
        let constraint = vec!["sku".to_string(), "tenant_id".to_string()];
        assert!(column_set_matches(&constraint, &["tenant_id", "sku"]));
        assert!(!column_set_matches(&constraint, &["sku"]));
        assert!(!column_set_matches(&constraint, &["tenant_id", "name"]));
    }
}
