//! Supplier model. Same encryption layout as customers.

use ledgerly_core::types::{EntityId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `suppliers` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Supplier {
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
