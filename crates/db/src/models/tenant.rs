//! Tenant model.

use ledgerly_core::types::{EntityId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `tenants` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Tenant {
    pub id: EntityId,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a tenant.
#[derive(Debug, Deserialize)]
pub struct CreateTenant {
    pub name: String,
}
