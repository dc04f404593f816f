//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument. Bulk writes go through
//! [`crate::bulk::BulkUpsertExecutor`]; repositories cover the reads the
//! pipeline needs (index listings, lookups, counts) and tenant bootstrap.

pub mod customer_repo;
pub mod expense_repo;
pub mod inventory_repo;
pub mod sale_repo;
pub mod supplier_repo;
pub mod tenant_repo;

pub use customer_repo::CustomerRepo;
pub use expense_repo::ExpenseRepo;
pub use inventory_repo::InventoryRepo;
pub use sale_repo::SaleRepo;
pub use supplier_repo::SupplierRepo;
pub use tenant_repo::TenantRepo;
