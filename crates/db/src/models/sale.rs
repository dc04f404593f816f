//! Sale record model.

use chrono::NaiveDate;
use ledgerly_core::types::{EntityId, Timestamp};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `sales` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Sale {
    pub id: EntityId,
    pub tenant_id: EntityId,
    /// Source voucher/receipt number, or a fingerprint of the row's
    /// identifying fields when the file carried none. The natural key.
    pub external_ref: String,
    pub product_id: EntityId,
    pub customer_id: Option<EntityId>,
    pub quantity: Decimal,
    pub unit_price: Option<Decimal>,
    pub total: Option<Decimal>,
    pub tax_amount: Option<Decimal>,
    pub payment_method: Option<String>,
    pub sale_date: NaiveDate,
    pub sold_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
