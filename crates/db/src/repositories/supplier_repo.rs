//! Repository for the `suppliers` table.

use ledgerly_core::types::EntityId;
use sqlx::PgPool;

use crate::models::supplier::Supplier;
use crate::models::IndexEntry;

/// Column list for suppliers queries.
const COLUMNS: &str = "id, tenant_id, name, phone, phone_hash, name_hash, email, address, \
    created_at, updated_at";

/// Provides read operations for suppliers.
pub struct SupplierRepo;

impl SupplierRepo {
    /// Lookup entries keyed by the deterministic hashes.
    pub async fn list_index_entries(
        pool: &PgPool,
        tenant_id: EntityId,
    ) -> Result<Vec<IndexEntry>, sqlx::Error> {
        sqlx::query_as::<_, IndexEntry>(
            "SELECT id, phone_hash AS code, name_hash AS name FROM suppliers WHERE tenant_id = $1",
        )
        .bind(tenant_id)
        .fetch_all(pool)
        .await
    }

    /// Find a supplier by the deterministic phone hash.
    pub async fn find_by_phone_hash(
        pool: &PgPool,
        tenant_id: EntityId,
        phone_hash: &str,
    ) -> Result<Option<Supplier>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM suppliers WHERE tenant_id = $1 AND phone_hash = $2");
        sqlx::query_as::<_, Supplier>(&query)
            .bind(tenant_id)
            .bind(phone_hash)
            .fetch_optional(pool)
            .await
    }

    /// Total suppliers for a tenant.
    pub async fn count(pool: &PgPool, tenant_id: EntityId) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM suppliers WHERE tenant_id = $1")
                .bind(tenant_id)
                .fetch_one(pool)
                .await?;
        Ok(count)
    }
}
