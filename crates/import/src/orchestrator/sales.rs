//! Sales import: POS and accounting export rows into `sales`.
//!
//! The only pipeline with mandatory cross-entity references: every row
//! names a product, which is resolved against the per-run inventory index
//! (optionally minting deduplicated placeholders), prechecked under the
//! configured missing-reference strategy, and only then written. Customer
//! references are optional and degrade to NULL on a miss. After the
//! write, the daily aggregate collaborator is asked to recompute every
//! distinct sale date the batch touched.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::json;

use ledgerly_core::coerce::{coerce, Scalar};
use ledgerly_core::hashing::fingerprint;
use ledgerly_core::normalize::{pick_first_meaningful, synonyms::sale as syn, RawRow};
use ledgerly_core::pii::name_hash;
use ledgerly_core::types::EntityId;
use ledgerly_core::temporal::parse_date_time;
use ledgerly_db::bulk::ConflictKeys;
use ledgerly_db::repositories::{CustomerRepo, InventoryRepo};

use crate::context::ImportContext;
use crate::error::PipelineResult;
use crate::precheck::{apply_strategy, UnresolvedRow};
use crate::report::{ImportResult, ResultReporter};
use crate::resolver::{EntityIndex, PlaceholderSet};

use super::{
    authorize, decimal_value, dedupe_last_wins, inventory, prepare_batch, run_post_commit,
    EntityKind, FieldValue, PendingRow, PostCommit,
};

const TABLE: &str = "sales";

const CONFLICT: ConflictKeys = ConflictKeys {
    primary: &["tenant_id", "external_ref"],
    secondary: &["external_ref"],
};

const CANDIDATE_COLUMNS: &[&str] = &[
    "tenant_id",
    "external_ref",
    "product_id",
    "customer_id",
    "quantity",
    "unit_price",
    "total",
    "tax_amount",
    "payment_method",
    "sale_date",
    "sold_at",
];

/// A normalized sale row awaiting reference resolution.
struct PendingSale {
    source_row: usize,
    product_ref: String,
    product_id: Option<EntityId>,
    customer_id: Option<EntityId>,
    external_ref: String,
    quantity: Decimal,
    unit_price: Option<Decimal>,
    total: Option<Decimal>,
    tax_amount: Option<Decimal>,
    payment_method: Option<String>,
    sale_date: NaiveDate,
    sold_at: DateTime<Utc>,
}

/// Import a batch of sale rows for one tenant.
pub async fn import(
    ctx: &ImportContext,
    tenant_id: EntityId,
    rows: Vec<RawRow>,
) -> PipelineResult<ImportResult> {
    authorize(ctx, "sales_import", tenant_id).await?;

    let mut reporter = ResultReporter::new();
    let schema = ctx.catalog.table_schema(TABLE).await;
    if schema.is_empty() {
        for i in 0..rows.len() {
            reporter.row_failed(i + 1, "target table sales has no columns");
        }
        return Ok(reporter.finish(0, None));
    }

    // Build both lookup structures before touching any row. The product
    // index is read-only for the rest of the run (rebuilt wholesale after
    // placeholder creation); the customer lookup maps deterministic
    // hashes to ids, so references resolve without decrypting PII.
    let mut product_index =
        EntityIndex::build(InventoryRepo::list_index_entries(&ctx.pool, tenant_id).await?);
    let customer_lookup: HashMap<String, EntityId> =
        CustomerRepo::list_index_entries(&ctx.pool, tenant_id)
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

    let mut pending: Vec<PendingSale> = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let source_row = i + 1;
        let product_ref = match row
            .text(syn::PRODUCT_ID)
            .or_else(|| pick_first_meaningful(&[row.text(syn::PRODUCT)]))
        {
            Some(reference) => reference,
            None => {
                reporter.row_failed(source_row, "no product reference in row");
                continue;
            }
        };

        // A sale without a usable quantity is still a sale of one unit;
        // POS exports routinely omit the column for single-item lines.
        let quantity =
            decimal_value(coerce(&row.raw(syn::QUANTITY), "numeric")).unwrap_or(Decimal::ONE);
        let unit_price = decimal_value(coerce(&row.raw(syn::UNIT_PRICE), "numeric"));
        let total = decimal_value(coerce(&row.raw(syn::TOTAL), "numeric"));
        let tax_amount = decimal_value(coerce(&row.raw(syn::TAX_AMOUNT), "numeric"));
        let (sale_date, sold_at) = parse_date_time(
            row.text(syn::DATE).as_deref(),
            row.text(syn::TIME).as_deref(),
        );

        let customer_id = row
            .text(syn::CUSTOMER)
            .and_then(|c| customer_lookup.get(&name_hash(&tenant_id, &c)).copied());

        let external_ref = row.text(syn::REFERENCE).unwrap_or_else(|| {
            fingerprint(&[
                &product_ref,
                &quantity.to_string(),
                &total.map(|t| t.to_string()).unwrap_or_default(),
                &sold_at.to_rfc3339(),
            ])
        });

        pending.push(PendingSale {
            source_row,
            product_id: product_index.resolve(&product_ref),
            product_ref,
            customer_id,
            external_ref,
            quantity,
            unit_price,
            total,
            tax_amount,
            payment_method: row.text(syn::PAYMENT_METHOD),
            sale_date,
            sold_at,
        });
    }

    // Placeholder creation: mint one deduplicated stand-in per unknown
    // reference, persist them in bulk before the dependent rows, then
    // re-query and rewrite.
    if ctx.config.auto_create_placeholders {
        let mut placeholders = PlaceholderSet::default();
        for sale in pending.iter().filter(|s| s.product_id.is_none()) {
            placeholders.mint(&sale.product_ref);
        }
        if !placeholders.is_empty() {
            persist_placeholders(ctx, tenant_id, &placeholders).await?;
            product_index =
                EntityIndex::build(InventoryRepo::list_index_entries(&ctx.pool, tenant_id).await?);
            for sale in pending.iter_mut().filter(|s| s.product_id.is_none()) {
                sale.product_id = product_index.resolve(&sale.product_ref);
            }
        }
    }

    let items: Vec<(PendingSale, Option<UnresolvedRow>)> = pending
        .into_iter()
        .map(|sale| {
            let unresolved = sale.product_id.is_none().then(|| UnresolvedRow {
                row_number: sale.source_row,
                reference: sale.product_ref.clone(),
                label: "product".to_string(),
                reason: format!("product '{}' not found for tenant", sale.product_ref),
            });
            (sale, unresolved)
        })
        .collect();
    let prechecked = apply_strategy(ctx.config.missing_reference_strategy, items)?;
    for skipped in prechecked.skipped {
        reporter.reference_skipped(skipped);
    }

    let (accepted, collapsed) = dedupe_last_wins(prechecked.accepted, |s| s.external_ref.clone());
    let touched_dates: BTreeSet<NaiveDate> = accepted.iter().map(|s| s.sale_date).collect();

    let batch = prepare_batch(
        CANDIDATE_COLUMNS,
        &schema,
        accepted
            .into_iter()
            .map(|s| PendingRow {
                source_row: s.source_row,
                fields: vec![
                    ("tenant_id", FieldValue::Typed(Scalar::Uuid(Some(tenant_id)))),
                    ("external_ref", FieldValue::Typed(Scalar::Text(Some(s.external_ref)))),
                    ("product_id", FieldValue::Typed(Scalar::Uuid(s.product_id))),
                    ("customer_id", FieldValue::Typed(Scalar::Uuid(s.customer_id))),
                    ("quantity", FieldValue::Typed(Scalar::Decimal(Some(s.quantity)))),
                    ("unit_price", FieldValue::Typed(Scalar::Decimal(s.unit_price))),
                    ("total", FieldValue::Typed(Scalar::Decimal(s.total))),
                    ("tax_amount", FieldValue::Typed(Scalar::Decimal(s.tax_amount))),
                    ("payment_method", FieldValue::Typed(Scalar::Text(s.payment_method))),
                    ("sale_date", FieldValue::Typed(Scalar::Date(Some(s.sale_date)))),
                    ("sold_at", FieldValue::Typed(Scalar::Timestamp(Some(s.sold_at)))),
                ],
            })
            .collect(),
    );

    let outcome = ctx
        .executor()
        .upsert(TABLE, &batch.columns, &batch.rows, &CONFLICT)
        .await?;
    reporter.absorb_row_errors(&outcome.row_errors);
    let written = outcome.written + collapsed;

    let mut steps = vec![
        PostCommit::Audit {
            action: "sales_import",
            details: json!({ "written": written, "failed": reporter.failed() }),
        },
        PostCommit::Invalidate {
            tag: format!("sales:{tenant_id}"),
        },
        PostCommit::Notify,
    ];
    steps.extend(
        touched_dates
            .into_iter()
            .map(|date| PostCommit::ResyncDay { date }),
    );
    run_post_commit(ctx, tenant_id, EntityKind::Sales, steps).await;

    let export = reporter.export_skipped(ctx.config.failed_rows_dir.as_deref(), "sales");
    Ok(reporter.finish(written, export))
}

/// Persist minted placeholder products in one bulk upsert so dependent
/// sale rows can reference them.
async fn persist_placeholders(
    ctx: &ImportContext,
    tenant_id: EntityId,
    placeholders: &PlaceholderSet,
) -> PipelineResult<()> {
    let schema = ctx.catalog.table_schema("inventory_items").await;
    let rows: Vec<PendingRow> = placeholders
        .iter()
        .enumerate()
        .map(|(i, placeholder)| PendingRow {
            source_row: i + 1,
            fields: vec![
                ("tenant_id", FieldValue::Typed(Scalar::Uuid(Some(tenant_id)))),
                ("sku", FieldValue::Typed(Scalar::Text(Some(placeholder.code.clone())))),
                ("name", FieldValue::Typed(Scalar::Text(Some(placeholder.name.clone())))),
                ("is_placeholder", FieldValue::Typed(Scalar::Boolean(Some(true)))),
            ],
        })
        .collect();
    let batch = prepare_batch(&["tenant_id", "sku", "name", "is_placeholder"], &schema, rows);
    let outcome = ctx
        .executor()
        .upsert("inventory_items", &batch.columns, &batch.rows, &inventory::CONFLICT)
        .await?;
    if !outcome.row_errors.is_empty() {
        tracing::warn!(
            count = outcome.row_errors.len(),
            tenant_id = %tenant_id,
            "Some placeholder products failed to persist; their rows will fail the precheck"
        );
    }
    Ok(())
}
