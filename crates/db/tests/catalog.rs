//! Integration tests for the schema catalog.

use std::time::Duration;

use sqlx::PgPool;

use ledgerly_db::catalog::SchemaCatalog;

#[sqlx::test(migrations = "./migrations")]
async fn known_table_lists_columns_and_types(pool: PgPool) {
    let catalog = SchemaCatalog::new(pool, Duration::from_secs(300));

    let columns = catalog.columns("inventory_items").await;
    assert!(columns.contains("sku"));
    assert!(columns.contains("quantity_on_hand"));

    let types = catalog.column_types("inventory_items").await;
    assert_eq!(types.get("sku").map(String::as_str), Some("text"));
    assert_eq!(types.get("quantity_on_hand").map(String::as_str), Some("numeric"));
    assert_eq!(types.get("is_placeholder").map(String::as_str), Some("boolean"));
    assert_eq!(types.get("id").map(String::as_str), Some("uuid"));
}

#[sqlx::test(migrations = "./migrations")]
async fn unknown_table_is_empty_not_an_error(pool: PgPool) {
    let catalog = SchemaCatalog::new(pool, Duration::from_secs(300));
    let schema = catalog.table_schema("no_such_table").await;
    assert!(schema.is_empty());
    assert!(catalog.columns("no_such_table").await.is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn cache_serves_within_ttl_and_invalidation_refreshes(pool: PgPool) {
    let catalog = SchemaCatalog::new(pool.clone(), Duration::from_secs(300));

    // Prime the cache, then change the table underneath it.
    assert!(!catalog.columns("inventory_items").await.contains("reorder_level"));
    sqlx::query("ALTER TABLE inventory_items ADD COLUMN reorder_level numeric")
        .execute(&pool)
        .await
        .expect("alter table");

    // Within the TTL the cached shape is served.
    assert!(!catalog.columns("inventory_items").await.contains("reorder_level"));

    // Invalidation forces a re-query.
    catalog.invalidate("inventory_items").await;
    assert!(catalog.columns("inventory_items").await.contains("reorder_level"));
}

#[sqlx::test(migrations = "./migrations")]
async fn zero_ttl_always_requeries(pool: PgPool) {
    let catalog = SchemaCatalog::new(pool.clone(), Duration::from_secs(0));

    assert!(!catalog.columns("inventory_items").await.contains("reorder_level"));
    sqlx::query("ALTER TABLE inventory_items ADD COLUMN reorder_level numeric")
        .execute(&pool)
        .await
        .expect("alter table");
    assert!(catalog.columns("inventory_items").await.contains("reorder_level"));
}
