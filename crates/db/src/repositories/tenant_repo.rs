//! Repository for the `tenants` table.

use ledgerly_core::types::EntityId;
use sqlx::PgPool;

use crate::models::tenant::{CreateTenant, Tenant};

/// Column list for tenants queries.
const COLUMNS: &str = "id, name, created_at, updated_at";

/// Provides CRUD operations for tenants.
pub struct TenantRepo;

impl TenantRepo {
    /// Create a new tenant, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateTenant) -> Result<Tenant, sqlx::Error> {
        let query = format!("INSERT INTO tenants (name) VALUES ($1) RETURNING {COLUMNS}");
        sqlx::query_as::<_, Tenant>(&query)
            .bind(&input.name)
            .fetch_one(pool)
            .await
    }

    /// Find a tenant by ID.
    pub async fn find_by_id(pool: &PgPool, id: EntityId) -> Result<Option<Tenant>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tenants WHERE id = $1");
        sqlx::query_as::<_, Tenant>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
