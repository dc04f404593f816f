//! Expense record model.

use chrono::NaiveDate;
use ledgerly_core::types::{EntityId, Timestamp};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `expenses` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Expense {
    pub id: EntityId,
    pub tenant_id: EntityId,
    /// Source voucher number or row fingerprint; the natural key.
    pub external_ref: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub amount: Decimal,
    pub supplier_id: Option<EntityId>,
    pub payment_method: Option<String>,
    pub spent_on: NaiveDate,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
