//! Expense import: accounting voucher rows into `expenses`.
//!
//! Supplier references are optional: a miss degrades the row to a NULL
//! supplier rather than failing it. A row without a numeric amount is a
//! row-level validation error.

use std::collections::HashMap;

use serde_json::json;

use ledgerly_core::coerce::{coerce, Scalar};
use ledgerly_core::hashing::fingerprint;
use ledgerly_core::normalize::{synonyms::expense as syn, RawRow};
use ledgerly_core::pii::name_hash;
use ledgerly_core::temporal::parse_date_time;
use ledgerly_core::types::EntityId;
use ledgerly_db::bulk::ConflictKeys;
use ledgerly_db::repositories::SupplierRepo;

use crate::context::ImportContext;
use crate::error::PipelineResult;
use crate::report::{ImportResult, ResultReporter};

use super::{
    authorize, decimal_value, dedupe_last_wins, prepare_batch, run_post_commit, EntityKind,
    FieldValue, PendingRow, PostCommit,
};

const TABLE: &str = "expenses";

const CONFLICT: ConflictKeys = ConflictKeys {
    primary: &["tenant_id", "external_ref"],
    secondary: &["external_ref"],
};

const CANDIDATE_COLUMNS: &[&str] = &[
    "tenant_id",
    "external_ref",
    "category",
    "description",
    "amount",
    "supplier_id",
    "payment_method",
    "spent_on",
];

/// Import a batch of expense rows for one tenant.
pub async fn import(
    ctx: &ImportContext,
    tenant_id: EntityId,
    rows: Vec<RawRow>,
) -> PipelineResult<ImportResult> {
    authorize(ctx, "expenses_import", tenant_id).await?;

    let mut reporter = ResultReporter::new();
    let schema = ctx.catalog.table_schema(TABLE).await;
    if schema.is_empty() {
        for i in 0..rows.len() {
            reporter.row_failed(i + 1, "target table expenses has no columns");
        }
        return Ok(reporter.finish(0, None));
    }

    let supplier_lookup: HashMap<String, EntityId> =
        SupplierRepo::list_index_entries(&ctx.pool, tenant_id)
            .await?
            .into_iter()
            .flat_map(|entry| {
                let id = entry.id;
                entry
                    .code
                    .into_iter()
                    .chain(entry.name)
                    .map(move |hash| (hash, id))
            })
            .collect();

    let mut pending: Vec<(String, PendingRow)> = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let source_row = i + 1;
        let amount = match decimal_value(coerce(&row.raw(syn::AMOUNT), "numeric")) {
            Some(amount) => amount,
            None => {
                reporter.row_failed(source_row, "no numeric amount in row");
                continue;
            }
        };

        let category = row.text(syn::CATEGORY);
        let description = row.text(syn::DESCRIPTION);
        let (spent_on, _) = parse_date_time(row.text(syn::DATE).as_deref(), None);
        let supplier_id = row
            .text(syn::SUPPLIER)
            .and_then(|s| supplier_lookup.get(&name_hash(&tenant_id, &s)).copied());
        let external_ref = row.text(syn::REFERENCE).unwrap_or_else(|| {
            fingerprint(&[
                category.as_deref().unwrap_or_default(),
                description.as_deref().unwrap_or_default(),
                &amount.to_string(),
                &spent_on.to_string(),
            ])
        });

        pending.push((
            external_ref.clone(),
            PendingRow {
                source_row,
                fields: vec![
                    ("tenant_id", FieldValue::Typed(Scalar::Uuid(Some(tenant_id)))),
                    ("external_ref", FieldValue::Typed(Scalar::Text(Some(external_ref)))),
                    ("category", FieldValue::Typed(Scalar::Text(category))),
                    ("description", FieldValue::Typed(Scalar::Text(description))),
                    ("amount", FieldValue::Typed(Scalar::Decimal(Some(amount)))),
                    ("supplier_id", FieldValue::Typed(Scalar::Uuid(supplier_id))),
                    ("payment_method", FieldValue::Raw(row.raw(syn::PAYMENT_METHOD))),
                    ("spent_on", FieldValue::Typed(Scalar::Date(Some(spent_on)))),
                ],
            },
        ));
    }

    let (deduped, collapsed) = dedupe_last_wins(pending, |(key, _)| key.clone());
    let batch = prepare_batch(
        CANDIDATE_COLUMNS,
        &schema,
        deduped.into_iter().map(|(_, row)| row).collect(),
    );

    let outcome = ctx
        .executor()
        .upsert(TABLE, &batch.columns, &batch.rows, &CONFLICT)
        .await?;
    reporter.absorb_row_errors(&outcome.row_errors);
    let written = outcome.written + collapsed;

    run_post_commit(
        ctx,
        tenant_id,
        EntityKind::Expenses,
        vec![
            PostCommit::Audit {
                action: "expenses_import",
                details: json!({ "written": written, "failed": reporter.failed() }),
            },
            PostCommit::Invalidate {
                tag: format!("expenses:{tenant_id}"),
            },
            PostCommit::Notify,
        ],
    )
    .await;

    Ok(reporter.finish(written, None))
}
