//! Integration tests for the bulk upsert executor against a real database:
//! row accounting, conflict-key updates, constraint-shape selection, and
//! the row-level fallback.

use sqlx::PgPool;
use uuid::Uuid;

use ledgerly_core::coerce::Scalar;
use ledgerly_db::bulk::{BulkRow, BulkUpsertExecutor, ConflictKeys};
use ledgerly_db::models::tenant::CreateTenant;
use ledgerly_db::repositories::{InventoryRepo, TenantRepo};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const INVENTORY_CONFLICT: ConflictKeys = ConflictKeys {
    primary: &["tenant_id", "sku"],
    secondary: &["sku"],
};

const INVENTORY_COLUMNS: &[&str] = &["tenant_id", "sku", "name", "is_placeholder"];

async fn tenant(pool: &PgPool) -> Uuid {
    TenantRepo::create(
        pool,
        &CreateTenant {
            name: format!("tenant-{}", Uuid::new_v4()),
        },
    )
    .await
    .expect("create tenant")
    .id
}

fn item_row(source_row: usize, tenant_id: Uuid, sku: &str, name: Option<&str>) -> BulkRow {
    BulkRow {
        source_row,
        values: vec![
            Scalar::Uuid(Some(tenant_id)),
            Scalar::Text(Some(sku.to_string())),
            Scalar::Text(name.map(str::to_string)),
            Scalar::Boolean(Some(false)),
        ],
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn every_row_is_accounted_for(pool: PgPool) {
    let tenant_id = tenant(&pool).await;
    let executor = BulkUpsertExecutor::new(pool.clone(), 100);

    // Row 2 violates the NOT NULL name constraint, sinking the bulk path
    // and forcing the row-level fallback to isolate it.
    let rows = vec![
        item_row(1, tenant_id, "SKU-1", Some("Rice")),
        item_row(2, tenant_id, "SKU-2", None),
        item_row(3, tenant_id, "SKU-3", Some("Soap")),
    ];
    let total = rows.len();

    let outcome = executor
        .upsert("inventory_items", INVENTORY_COLUMNS, &rows, &INVENTORY_CONFLICT)
        .await
        .expect("upsert");

    assert_eq!(outcome.written + outcome.row_errors.len(), total);
    assert_eq!(outcome.written, 2);
    assert_eq!(outcome.row_errors.len(), 1);
    assert_eq!(outcome.row_errors[0].source_row, 2);
    assert!(outcome.row_errors[0].message.contains("null"));

    assert_eq!(InventoryRepo::count(&pool, tenant_id).await.unwrap(), 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn conflict_updates_instead_of_duplicating(pool: PgPool) {
    let tenant_id = tenant(&pool).await;
    let executor = BulkUpsertExecutor::new(pool.clone(), 100);

    let first = vec![item_row(1, tenant_id, "SKU-1", Some("Old Name"))];
    executor
        .upsert("inventory_items", INVENTORY_COLUMNS, &first, &INVENTORY_CONFLICT)
        .await
        .expect("first upsert");

    let second = vec![item_row(1, tenant_id, "SKU-1", Some("New Name"))];
    let outcome = executor
        .upsert("inventory_items", INVENTORY_COLUMNS, &second, &INVENTORY_CONFLICT)
        .await
        .expect("second upsert");

    assert_eq!(outcome.written, 1);
    assert_eq!(InventoryRepo::count(&pool, tenant_id).await.unwrap(), 1);
    let item = InventoryRepo::find_by_sku(&pool, tenant_id, "SKU-1")
        .await
        .unwrap()
        .expect("item exists");
    assert_eq!(item.name, "New Name");
}

#[sqlx::test(migrations = "./migrations")]
async fn chunked_batches_all_commit(pool: PgPool) {
    let tenant_id = tenant(&pool).await;
    // Chunk size 2 forces several statements for 5 rows.
    let executor = BulkUpsertExecutor::new(pool.clone(), 2);

    let rows: Vec<BulkRow> = (0..5)
        .map(|i| item_row(i + 1, tenant_id, &format!("SKU-{i}"), Some("Item")))
        .collect();

    let outcome = executor
        .upsert("inventory_items", INVENTORY_COLUMNS, &rows, &INVENTORY_CONFLICT)
        .await
        .expect("upsert");

    assert_eq!(outcome.written, 5);
    assert!(outcome.row_errors.is_empty());
    assert_eq!(InventoryRepo::count(&pool, tenant_id).await.unwrap(), 5);
}

#[sqlx::test(migrations = "./migrations")]
async fn secondary_conflict_keys_cover_legacy_constraints(pool: PgPool) {
    // An older deployment generation: the unique constraint omits the
    // tenant column. The probe must select the secondary key set and the
    // second import must update, not duplicate.
    sqlx::query(
        "CREATE TABLE legacy_products (
            id uuid PRIMARY KEY DEFAULT gen_random_uuid(),
            tenant_id uuid,
            sku text NOT NULL,
            name text,
            is_placeholder boolean NOT NULL DEFAULT false,
            updated_at timestamptz NOT NULL DEFAULT now(),
            CONSTRAINT uq_legacy_products_sku UNIQUE (sku)
        )",
    )
    .execute(&pool)
    .await
    .expect("create legacy table");

    let tenant_id = tenant(&pool).await;
    let executor = BulkUpsertExecutor::new(pool.clone(), 100);

    let rows = vec![item_row(1, tenant_id, "SKU-1", Some("First"))];
    executor
        .upsert("legacy_products", INVENTORY_COLUMNS, &rows, &INVENTORY_CONFLICT)
        .await
        .expect("first upsert");

    let rows = vec![item_row(1, tenant_id, "SKU-1", Some("Second"))];
    executor
        .upsert("legacy_products", INVENTORY_COLUMNS, &rows, &INVENTORY_CONFLICT)
        .await
        .expect("second upsert");

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM legacy_products")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
    let (name,): (String,) = sqlx::query_as("SELECT name FROM legacy_products WHERE sku = 'SKU-1'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(name, "Second");
}

#[sqlx::test(migrations = "./migrations")]
async fn empty_batch_is_a_no_op(pool: PgPool) {
    let executor = BulkUpsertExecutor::new(pool.clone(), 100);
    let outcome = executor
        .upsert("inventory_items", INVENTORY_COLUMNS, &[], &INVENTORY_CONFLICT)
        .await
        .expect("upsert");
    assert_eq!(outcome.written, 0);
    assert!(outcome.row_errors.is_empty());
}
