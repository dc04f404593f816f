//! Inventory item model.

use ledgerly_core::types::{EntityId, Timestamp};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `inventory_items` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct InventoryItem {
    pub id: EntityId,
    pub tenant_id: EntityId,
    pub sku: String,
    pub name: String,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub quantity_on_hand: Option<Decimal>,
    pub purchase_price: Option<Decimal>,
    pub selling_price: Option<Decimal>,
    pub tax_rate: Option<Decimal>,
    /// Auto-created stand-in minted by the import pipeline; surfaced to
    /// operators for review.
    pub is_placeholder: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
