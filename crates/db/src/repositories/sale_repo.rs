//! Repository for the `sales` table.

use chrono::NaiveDate;
use ledgerly_core::types::EntityId;
use sqlx::PgPool;

use crate::models::sale::Sale;

/// Column list for sales queries.
const COLUMNS: &str = "id, tenant_id, external_ref, product_id, customer_id, quantity, \
    unit_price, total, tax_amount, payment_method, sale_date, sold_at, created_at, updated_at";

/// Provides read operations for sale records.
pub struct SaleRepo;

impl SaleRepo {
    /// Find a sale by its tenant-scoped external reference.
    pub async fn find_by_external_ref(
        pool: &PgPool,
        tenant_id: EntityId,
        external_ref: &str,
    ) -> Result<Option<Sale>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM sales WHERE tenant_id = $1 AND external_ref = $2");
        sqlx::query_as::<_, Sale>(&query)
            .bind(tenant_id)
            .bind(external_ref)
            .fetch_optional(pool)
            .await
    }

    /// All sales for a tenant on one date, newest first.
    pub async fn list_by_date(
        pool: &PgPool,
        tenant_id: EntityId,
        sale_date: NaiveDate,
    ) -> Result<Vec<Sale>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM sales
             WHERE tenant_id = $1 AND sale_date = $2
             ORDER BY sold_at DESC"
        );
        sqlx::query_as::<_, Sale>(&query)
            .bind(tenant_id)
            .bind(sale_date)
            .fetch_all(pool)
            .await
    }

    /// Total sales for a tenant.
    pub async fn count(pool: &PgPool, tenant_id: EntityId) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sales WHERE tenant_id = $1")
            .bind(tenant_id)
            .fetch_one(pool)
            .await?;
        Ok(count)
    }
}
