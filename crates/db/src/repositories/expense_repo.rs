//! Repository for the `expenses` table.

use ledgerly_core::types::EntityId;
use sqlx::PgPool;

use crate::models::expense::Expense;

/// Column list for expenses queries.
const COLUMNS: &str = "id, tenant_id, external_ref, category, description, amount, \
    supplier_id, payment_method, spent_on, created_at, updated_at";

/// Provides read operations for expense records.
pub struct ExpenseRepo;

impl ExpenseRepo {
    /// Find an expense by its tenant-scoped external reference.
    pub async fn find_by_external_ref(
        pool: &PgPool,
        tenant_id: EntityId,
        external_ref: &str,
    ) -> Result<Option<Expense>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM expenses WHERE tenant_id = $1 AND external_ref = $2");
        sqlx::query_as::<_, Expense>(&query)
            .bind(tenant_id)
            .bind(external_ref)
            .fetch_optional(pool)
            .await
    }

    /// Total expenses for a tenant.
    pub async fn count(pool: &PgPool, tenant_id: EntityId) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM expenses WHERE tenant_id = $1")
                .bind(tenant_id)
                .fetch_one(pool)
                .await?;
        Ok(count)
    }
}
