//! Persisted entity models. Rows are created and updated exclusively by
//! the bulk upsert executor; repositories cover reads.

pub mod customer;
pub mod expense;
pub mod inventory_item;
pub mod sale;
pub mod supplier;
pub mod tenant;

use ledgerly_core::types::EntityId;
use serde::Serialize;
use sqlx::FromRow;

/// One lookup entry for the per-run entity index: the persisted id plus
/// the code/name forms a reference may arrive under.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct IndexEntry {
    pub id: EntityId,
    pub code: Option<String>,
    pub name: Option<String>,
}
