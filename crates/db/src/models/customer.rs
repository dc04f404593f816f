//! Customer model.
//!
//! `name`, `phone`, and `address` hold ciphertext when the tenant has a
//! data-encryption key; `phone_hash`/`name_hash` are deterministic lookup
//! digests so upserts and reference resolution work either way.

use ledgerly_core::types::{EntityId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `customers` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Customer {
    pub id: EntityId,
    pub tenant_id: EntityId,
    pub name: String,
    pub phone: String,
    pub phone_hash: String,
    pub name_hash: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
