//! Supplier import.

use ledgerly_core::normalize::RawRow;
use ledgerly_core::types::EntityId;

use crate::context::ImportContext;
use crate::error::PipelineResult;
use crate::report::ImportResult;

use super::contacts::{import_contacts, ContactTarget};
use super::EntityKind;

/// Import a batch of supplier rows for one tenant.
pub async fn import(
    ctx: &ImportContext,
    tenant_id: EntityId,
    rows: Vec<RawRow>,
) -> PipelineResult<ImportResult> {
    import_contacts(
        ctx,
        tenant_id,
        rows,
        ContactTarget {
            table: "suppliers",
            kind: EntityKind::Suppliers,
            action: "suppliers_import",
            fallback_prefix: "supplier",
        },
    )
    .await
}
