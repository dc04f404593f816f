//! Shared engine for the customer and supplier import pipelines.
//!
//! Both entities are contact rows holding personal data. Name, phone, and
//! address are encrypted under the tenant's data-encryption key before
//! they enter the write path — concurrently, one task per row, bounded to
//! a chunk at a time — while deterministic digests (`phone_hash`,
//! `name_hash`) keep upserts idempotent and references resolvable without
//! decryption. A missing key degrades to plaintext with a logged warning;
//! it never fails the import.

use serde_json::json;

use ledgerly_core::coerce::Scalar;
use ledgerly_core::error::CoreError;
use ledgerly_core::normalize::{
    fallback_name, pick_first_meaningful, synonyms::contact as syn, RawRow,
};
use ledgerly_core::pii::{encrypt_field, generated_phone, name_hash, phone_hash, TenantKey};
use ledgerly_core::types::EntityId;
use ledgerly_db::bulk::ConflictKeys;

use crate::context::ImportContext;
use crate::error::{ImportError, PipelineResult};
use crate::report::{ImportResult, ResultReporter};

use super::{
    authorize, dedupe_last_wins, prepare_batch, run_post_commit, EntityKind, FieldValue,
    PendingRow, PostCommit,
};

const CONFLICT: ConflictKeys = ConflictKeys {
    primary: &["tenant_id", "phone_hash"],
    secondary: &["phone_hash"],
};

const CANDIDATE_COLUMNS: &[&str] = &[
    "tenant_id",
    "name",
    "phone",
    "phone_hash",
    "name_hash",
    "email",
    "address",
];

/// Which contact table a run targets.
pub(crate) struct ContactTarget {
    pub table: &'static str,
    pub kind: EntityKind,
    pub action: &'static str,
    pub fallback_prefix: &'static str,
}

/// A normalized contact row before optional encryption.
struct PendingContact {
    source_row: usize,
    name: String,
    phone: String,
    phone_hash: String,
    name_hash: String,
    email: Option<String>,
    address: Option<String>,
}

/// Import a batch of contact rows into the target table.
pub(crate) async fn import_contacts(
    ctx: &ImportContext,
    tenant_id: EntityId,
    rows: Vec<RawRow>,
    target: ContactTarget,
) -> PipelineResult<ImportResult> {
    authorize(ctx, target.action, tenant_id).await?;

    let mut reporter = ResultReporter::new();
    let schema = ctx.catalog.table_schema(target.table).await;
    if schema.is_empty() {
        for i in 0..rows.len() {
            reporter.row_failed(i + 1, format!("target table {} has no columns", target.table));
        }
        return Ok(reporter.finish(0, None));
    }

    let key = match ctx.collaborators.keys.tenant_key(tenant_id).await {
        Ok(key) => Some(key),
        Err(err) => {
            tracing::warn!(
                error = %err,
                tenant_id = %tenant_id,
                table = target.table,
                "No tenant encryption key available; contact fields will be stored unencrypted"
            );
            None
        }
    };

    let pending: Vec<PendingContact> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let name = pick_first_meaningful(&[row.text(syn::NAME)])
                .unwrap_or_else(|| fallback_name(target.fallback_prefix, i));
            // Lenient-input policy: a missing phone gets a deterministic
            // generated value derived from the name, so the row succeeds
            // and re-imports collapse onto the same record.
            let phone = row
                .text(syn::PHONE)
                .unwrap_or_else(|| generated_phone(&tenant_id, &name));
            PendingContact {
                source_row: i + 1,
                phone_hash: phone_hash(&tenant_id, &phone),
                name_hash: name_hash(&tenant_id, &name),
                email: row.text(syn::EMAIL),
                address: row.text(syn::ADDRESS),
                name,
                phone,
            }
        })
        .collect();

    let (mut contacts, collapsed) = dedupe_last_wins(pending, |c| c.phone_hash.clone());

    if let Some(key) = &key {
        contacts = encrypt_contacts(
            contacts,
            key,
            tenant_id,
            target.table,
            ctx.config.bulk_chunk_size,
        )
        .await?;
    }

    let batch = prepare_batch(
        CANDIDATE_COLUMNS,
        &schema,
        contacts
            .into_iter()
            .map(|c| PendingRow {
                source_row: c.source_row,
                fields: vec![
                    ("tenant_id", FieldValue::Typed(Scalar::Uuid(Some(tenant_id)))),
                    ("name", FieldValue::Typed(Scalar::Text(Some(c.name)))),
                    ("phone", FieldValue::Typed(Scalar::Text(Some(c.phone)))),
                    ("phone_hash", FieldValue::Typed(Scalar::Text(Some(c.phone_hash)))),
                    ("name_hash", FieldValue::Typed(Scalar::Text(Some(c.name_hash)))),
                    ("email", FieldValue::Typed(Scalar::Text(c.email))),
                    ("address", FieldValue::Typed(Scalar::Text(c.address))),
                ],
            })
            .collect(),
    );

    let outcome = ctx
        .executor()
        .upsert(target.table, &batch.columns, &batch.rows, &CONFLICT)
        .await?;
    reporter.absorb_row_errors(&outcome.row_errors);
    let written = outcome.written + collapsed;

    run_post_commit(
        ctx,
        tenant_id,
        target.kind,
        vec![
            PostCommit::Audit {
                action: target.action,
                details: json!({
                    "written": written,
                    "failed": reporter.failed(),
                    "encrypted": key.is_some(),
                }),
            },
            PostCommit::Invalidate {
                tag: format!("{}:{tenant_id}", target.kind.as_str()),
            },
            PostCommit::Notify,
        ],
    )
    .await;

    Ok(reporter.finish(written, None))
}

/// Encrypt contact PII concurrently, one blocking task per row, bounded to
/// one chunk's worth of rows at a time. Row order is preserved; each
/// row's encryption is independent.
async fn encrypt_contacts(
    contacts: Vec<PendingContact>,
    key: &TenantKey,
    tenant_id: EntityId,
    table: &'static str,
    chunk_size: usize,
) -> Result<Vec<PendingContact>, ImportError> {
    let mut encrypted = Vec::with_capacity(contacts.len());
    let mut remaining = contacts.into_iter();
    loop {
        let chunk: Vec<PendingContact> = remaining.by_ref().take(chunk_size.max(1)).collect();
        if chunk.is_empty() {
            break;
        }
        let tasks = chunk.into_iter().map(|mut contact| {
            let key = key.clone();
            tokio::task::spawn_blocking(move || -> Result<PendingContact, CoreError> {
                contact.name =
                    encrypt_field(&contact.name, &format!("{table}.name:{tenant_id}"), &key)?;
                contact.phone =
                    encrypt_field(&contact.phone, &format!("{table}.phone:{tenant_id}"), &key)?;
                if let Some(address) = contact.address.take() {
                    contact.address = Some(encrypt_field(
                        &address,
                        &format!("{table}.address:{tenant_id}"),
                        &key,
                    )?);
                }
                Ok(contact)
            })
        });
        for handle in futures::future::join_all(tasks).await {
            let contact = handle
                .map_err(|err| CoreError::Internal(format!("Encryption task failed: {err}")))??;
            encrypted.push(contact);
        }
    }
    Ok(encrypted)
}
