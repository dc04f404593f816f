//! Inventory import: heterogeneous stock exports into `inventory_items`.

use serde_json::json;

use ledgerly_core::coerce::Scalar;
use ledgerly_core::normalize::{
    canonical_key, fallback_name, is_unit_token, pick_first_meaningful,
    synonyms::inventory as syn, RawRow,
};
use ledgerly_core::types::EntityId;
use ledgerly_db::bulk::ConflictKeys;

use crate::context::ImportContext;
use crate::error::PipelineResult;
use crate::report::{ImportResult, ResultReporter};

use super::{
    authorize, dedupe_last_wins, prepare_batch, run_post_commit, EntityKind, FieldValue,
    PendingRow, PostCommit,
};

const TABLE: &str = "inventory_items";

pub(crate) const CONFLICT: ConflictKeys = ConflictKeys {
    primary: &["tenant_id", "sku"],
    secondary: &["sku"],
};

const CANDIDATE_COLUMNS: &[&str] = &[
    "tenant_id",
    "sku",
    "name",
    "category",
    "unit",
    "quantity_on_hand",
    "purchase_price",
    "selling_price",
    "tax_rate",
    "is_placeholder",
];

/// Import a batch of inventory rows for one tenant.
pub async fn import(
    ctx: &ImportContext,
    tenant_id: EntityId,
    rows: Vec<RawRow>,
) -> PipelineResult<ImportResult> {
    authorize(ctx, "inventory_import", tenant_id).await?;

    let mut reporter = ResultReporter::new();
    let schema = ctx.catalog.table_schema(TABLE).await;
    if schema.is_empty() {
        for i in 0..rows.len() {
            reporter.row_failed(i + 1, "target table inventory_items has no columns");
        }
        return Ok(reporter.finish(0, None));
    }

    let mut pending: Vec<(String, PendingRow)> = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        // A name candidate that is really a unit token ("PCS") must never
        // become the product identity; fall back to the SKU, then to a
        // deterministic row-indexed name.
        let name = pick_first_meaningful(&[row.text(syn::NAME), row.text(syn::SKU)])
            .unwrap_or_else(|| fallback_name("item", i));
        let sku = row
            .text(syn::SKU)
            .filter(|s| !is_unit_token(s))
            .unwrap_or_else(|| canonical_key(&name));

        pending.push((
            sku.clone(),
            PendingRow {
                source_row: i + 1,
                fields: vec![
                    ("tenant_id", FieldValue::Typed(Scalar::Uuid(Some(tenant_id)))),
                    ("sku", FieldValue::Typed(Scalar::Text(Some(sku)))),
                    ("name", FieldValue::Typed(Scalar::Text(Some(name)))),
                    ("category", FieldValue::Raw(row.raw(syn::CATEGORY))),
                    ("unit", FieldValue::Raw(row.raw(syn::UNIT))),
                    ("quantity_on_hand", FieldValue::Raw(row.raw(syn::QUANTITY))),
                    ("purchase_price", FieldValue::Raw(row.raw(syn::PURCHASE_PRICE))),
                    ("selling_price", FieldValue::Raw(row.raw(syn::SELLING_PRICE))),
                    ("tax_rate", FieldValue::Raw(row.raw(syn::TAX_RATE))),
                    ("is_placeholder", FieldValue::Typed(Scalar::Boolean(Some(false)))),
                ],
            },
        ));
    }

    let (deduped, collapsed) = dedupe_last_wins(pending, |(sku, _)| sku.clone());
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
        EntityKind::Inventory,
        vec![
            PostCommit::Audit {
                action: "inventory_import",
                details: json!({ "written": written, "failed": reporter.failed() }),
            },
            PostCommit::Invalidate {
                tag: format!("inventory:{tenant_id}"),
            },
            PostCommit::Notify,
        ],
    )
    .await;

    Ok(reporter.finish(written, None))
}
