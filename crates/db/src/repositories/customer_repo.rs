//! Repository for the `customers` table.

use ledgerly_core::types::EntityId;
use sqlx::PgPool;

use crate::models::customer::Customer;
use crate::models::IndexEntry;

/// Column list for customers queries.
const COLUMNS: &str = "id, tenant_id, name, phone, phone_hash, name_hash, email, address, \
    created_at, updated_at";

/// Provides read operations for customers.
pub struct CustomerRepo;

impl CustomerRepo {
    /// Lookup entries keyed by the deterministic hashes, so references
    /// resolve without decrypting the PII columns.
    pub async fn list_index_entries(
        pool: &PgPool,
        tenant_id: EntityId,
    ) -> Result<Vec<IndexEntry>, sqlx::Error> {
        sqlx::query_as::<_, IndexEntry>(
            "SELECT id, phone_hash AS code, name_hash AS name FROM customers WHERE tenant_id = $1",
        )
        .bind(tenant_id)
        .fetch_all(pool)
        .await
    }

    /// Find a customer by the deterministic phone hash.
    pub async fn find_by_phone_hash(
        pool: &PgPool,
        tenant_id: EntityId,
        phone_hash: &str,
    ) -> Result<Option<Customer>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM customers WHERE tenant_id = $1 AND phone_hash = $2");
        sqlx::query_as::<_, Customer>(&query)
            .bind(tenant_id)
            .bind(phone_hash)
            .fetch_optional(pool)
            .await
    }

    /// Total customers for a tenant.
    pub async fn count(pool: &PgPool, tenant_id: EntityId) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM customers WHERE tenant_id = $1")
                .bind(tenant_id)
                .fetch_one(pool)
                .await?;
        Ok(count)
    }
}
