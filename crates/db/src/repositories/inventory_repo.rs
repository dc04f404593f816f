//! Repository for the `inventory_items` table.

use ledgerly_core::types::EntityId;
use sqlx::PgPool;

use crate::models::inventory_item::InventoryItem;
use crate::models::IndexEntry;

/// Column list for inventory_items queries.
const COLUMNS: &str = "id, tenant_id, sku, name, category, unit, quantity_on_hand, \
    purchase_price, selling_price, tax_rate, is_placeholder, created_at, updated_at";

/// Provides read operations for inventory items.
pub struct InventoryRepo;

impl InventoryRepo {
    /// All (id, sku, name) triples for a tenant, for the per-run entity
    /// index.
    pub async fn list_index_entries(
        pool: &PgPool,
        tenant_id: EntityId,
    ) -> Result<Vec<IndexEntry>, sqlx::Error> {
        sqlx::query_as::<_, IndexEntry>(
            "SELECT id, sku AS code, name FROM inventory_items WHERE tenant_id = $1",
        )
        .bind(tenant_id)
        .fetch_all(pool)
        .await
    }

    /// Find an item by its tenant-scoped SKU.
    pub async fn find_by_sku(
        pool: &PgPool,
        tenant_id: EntityId,
        sku: &str,
    ) -> Result<Option<InventoryItem>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM inventory_items WHERE tenant_id = $1 AND sku = $2");
        sqlx::query_as::<_, InventoryItem>(&query)
            .bind(tenant_id)
            .bind(sku)
            .fetch_optional(pool)
            .await
    }

    /// Total items for a tenant.
    pub async fn count(pool: &PgPool, tenant_id: EntityId) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM inventory_items WHERE tenant_id = $1")
                .bind(tenant_id)
                .fetch_one(pool)
                .await?;
        Ok(count)
    }

    /// Auto-created placeholder items for a tenant.
    pub async fn count_placeholders(
        pool: &PgPool,
        tenant_id: EntityId,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM inventory_items WHERE tenant_id = $1 AND is_placeholder",
        )
        .bind(tenant_id)
        .fetch_one(pool)
        .await?;
        Ok(count)
    }
}
