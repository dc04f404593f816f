//! Per-entity import orchestrators.
//!
//! One orchestrator per entity kind composes the pipeline stages into a
//! coherent operation: authorize, normalize, coerce, resolve, precheck,
//! bulk-upsert, then run the post-commit notification list. Shared
//! machinery (batch preparation against the live schema, natural-key
//! deduplication, post-commit execution) lives here.

pub mod contacts;
pub mod customers;
pub mod expenses;
pub mod inventory;
pub mod sales;
pub mod suppliers;

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use ledgerly_core::coerce::{coerce, Scalar};
use ledgerly_core::normalize::RawRow;
use ledgerly_core::types::EntityId;
use ledgerly_db::bulk::BulkRow;
use ledgerly_db::catalog::TableSchema;

use crate::context::ImportContext;
use crate::error::{ImportError, PipelineResult};
use crate::report::ImportResult;

// ---------------------------------------------------------------------------
// Entity kinds
// ---------------------------------------------------------------------------

/// Entity kinds accepted by the import entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Inventory,
    Customers,
    Suppliers,
    Sales,
    Expenses,
}

impl EntityKind {
    /// Return the kind name as used in selectors, cache tags, and audit
    /// records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inventory => "inventory",
            Self::Customers => "customers",
            Self::Suppliers => "suppliers",
            Self::Sales => "sales",
            Self::Expenses => "expenses",
        }
    }

    /// Parse a kind string. Returns `None` for unknown values.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "inventory" => Some(Self::Inventory),
            "customers" => Some(Self::Customers),
            "suppliers" => Some(Self::Suppliers),
            "sales" => Some(Self::Sales),
            "expenses" => Some(Self::Expenses),
            _ => None,
        }
    }

    /// All valid kind values.
    pub const ALL: &'static [&'static str] =
        &["inventory", "customers", "suppliers", "sales", "expenses"];
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dispatch an import batch to the matching orchestrator.
pub async fn run_import(
    ctx: &ImportContext,
    tenant_id: EntityId,
    kind: EntityKind,
    rows: Vec<RawRow>,
) -> PipelineResult<ImportResult> {
    match kind {
        EntityKind::Inventory => inventory::import(ctx, tenant_id, rows).await,
        EntityKind::Customers => customers::import(ctx, tenant_id, rows).await,
        EntityKind::Suppliers => suppliers::import(ctx, tenant_id, rows).await,
        EntityKind::Sales => sales::import(ctx, tenant_id, rows).await,
        EntityKind::Expenses => expenses::import(ctx, tenant_id, rows).await,
    }
}

// ---------------------------------------------------------------------------
// Authorization
// ---------------------------------------------------------------------------

/// Role required for every import action.
const REQUIRED_ROLE: &str = "editor";

/// Check the external authorizer unless the context is a trusted internal
/// caller. Failures are fatal.
pub(crate) async fn authorize(
    ctx: &ImportContext,
    action: &str,
    tenant_id: EntityId,
) -> Result<(), ImportError> {
    if ctx.trusted {
        return Ok(());
    }
    ctx.collaborators
        .authorizer
        .authorize(action, REQUIRED_ROLE, tenant_id)
        .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Batch preparation
// ---------------------------------------------------------------------------

/// One field of a pending row: either already typed by the orchestrator
/// (identifiers, hashes, parsed dates) or raw source text left for the
/// coercion engine to type against the live column declaration.
#[derive(Debug, Clone)]
pub(crate) enum FieldValue {
    Typed(Scalar),
    Raw(Json),
}

/// A normalized row awaiting batch preparation.
#[derive(Debug, Clone)]
pub(crate) struct PendingRow {
    /// 1-based row number in the source file.
    pub source_row: usize,
    pub fields: Vec<(&'static str, FieldValue)>,
}

/// A batch ready for the bulk executor: one shared column list plus
/// value-aligned rows.
#[derive(Debug)]
pub(crate) struct PreparedBatch {
    pub columns: Vec<&'static str>,
    pub rows: Vec<BulkRow>,
}

/// Intersect the candidate columns with the live schema and coerce every
/// raw field against its column's declared type. Fields whose columns do
/// not exist are dropped; columns a row never set become typed NULLs.
pub(crate) fn prepare_batch(
    candidates: &[&'static str],
    schema: &TableSchema,
    pending: Vec<PendingRow>,
) -> PreparedBatch {
    let types = schema.column_types();
    let columns: Vec<&'static str> = candidates
        .iter()
        .copied()
        .filter(|c| types.contains_key(*c))
        .collect();
    let rows = pending
        .into_iter()
        .map(|row| BulkRow {
            source_row: row.source_row,
            values: columns
                .iter()
                .map(|col| {
                    let db_type = types[*col].as_str();
                    match row.fields.iter().find(|(name, _)| name == col) {
                        Some((_, FieldValue::Typed(scalar))) => scalar.clone(),
                        Some((_, FieldValue::Raw(raw))) => coerce(raw, db_type),
                        None => Scalar::null_for(db_type),
                    }
                })
                .collect(),
        })
        .collect();
    PreparedBatch { columns, rows }
}

/// Collapse rows sharing a natural key, keeping the last occurrence in its
/// first position (set-based upserts reject a conflict key appearing twice
/// in one statement). Returns the survivors and the collapsed count; the
/// collapsed rows still count as written, since their survivor represents
/// them.
pub(crate) fn dedupe_last_wins<T>(
    items: Vec<T>,
    key: impl Fn(&T) -> String,
) -> (Vec<T>, usize) {
    let mut slots: Vec<Option<T>> = Vec::with_capacity(items.len());
    let mut by_key: HashMap<String, usize> = HashMap::new();
    let mut collapsed = 0;
    for item in items {
        let k = key(&item);
        match by_key.get(&k) {
            Some(&slot) => {
                slots[slot] = Some(item);
                collapsed += 1;
            }
            None => {
                by_key.insert(k, slots.len());
                slots.push(Some(item));
            }
        }
    }
    (slots.into_iter().flatten().collect(), collapsed)
}

/// Unwrap a decimal coercion result.
pub(crate) fn decimal_value(scalar: Scalar) -> Option<rust_decimal::Decimal> {
    match scalar {
        Scalar::Decimal(value) => value,
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Post-commit notifications
// ---------------------------------------------------------------------------

/// A side effect executed after the authoritative write. Each is
/// independently fallible and only logged on failure; none gate the
/// success of the import itself.
pub(crate) enum PostCommit {
    Audit {
        action: &'static str,
        details: Json,
    },
    Invalidate {
        tag: String,
    },
    Notify,
    ResyncDay {
        date: NaiveDate,
    },
}

/// Run the post-commit notification list in order.
pub(crate) async fn run_post_commit(
    ctx: &ImportContext,
    tenant_id: EntityId,
    kind: EntityKind,
    steps: Vec<PostCommit>,
) {
    for step in steps {
        let (what, result) = match step {
            PostCommit::Audit { action, details } => (
                "audit",
                ctx.collaborators
                    .audit
                    .record(action, kind.as_str(), tenant_id, details)
                    .await,
            ),
            PostCommit::Invalidate { tag } => (
                "cache invalidation",
                ctx.collaborators.cache.invalidate(&tag).await,
            ),
            PostCommit::Notify => (
                "change notification",
                ctx.collaborators.cache.notify(tenant_id, kind.as_str()).await,
            ),
            PostCommit::ResyncDay { date } => (
                "daily aggregate resync",
                ctx.collaborators.aggregates.resync_daily(date, tenant_id).await,
            ),
        };
        if let Err(err) = result {
            tracing::warn!(
                error = %err,
                tenant_id = %tenant_id,
                entity = kind.as_str(),
                "Post-commit {what} failed"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
