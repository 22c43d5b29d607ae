//! PostgreSQL store tests. Require a reachable `DATABASE_URL`.

use assert_matches::assert_matches;
use serde_json::json;
use sqlx::PgPool;
use storefront_core::EntityKind;
use storefront_db::document::into_document;
use storefront_db::{DocumentStore, LinkRecord, LinkSide, PgStore, StoreError};

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_natural_key_uniqueness(pool: PgPool) {
    storefront_db::health_check(&pool).await.unwrap();
    let store = PgStore::new(pool);

    let region = into_document(json!({"id": "reg_1", "name": "Pakistan"})).unwrap();
    store.insert(EntityKind::Region, region).await.unwrap();

    let dup = into_document(json!({"id": "reg_2", "name": "Pakistan"})).unwrap();
    let err = store.insert(EntityKind::Region, dup).await.unwrap_err();
    assert_matches!(err, StoreError::AlreadyExists { kind: EntityKind::Region, .. });
    assert_eq!(store.list(EntityKind::Region).await.unwrap().len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_list_is_insertion_ordered(pool: PgPool) {
    let store = PgStore::new(pool);
    for (id, name) in [("sloc_b", "Second"), ("sloc_a", "First")] {
        let doc = into_document(json!({"id": id, "name": name})).unwrap();
        store.insert(EntityKind::StockLocation, doc).await.unwrap();
    }
    let ids: Vec<String> = store
        .list(EntityKind::StockLocation)
        .await
        .unwrap()
        .iter()
        .map(|d| d["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, ["sloc_b", "sloc_a"]);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_restore_keeps_original_order(pool: PgPool) {
    let store = PgStore::new(pool);
    for (id, name) in [("sloc_a", "First"), ("sloc_b", "Second")] {
        let doc = into_document(json!({"id": id, "name": name})).unwrap();
        store.insert(EntityKind::StockLocation, doc).await.unwrap();
    }
    let first = store.get(EntityKind::StockLocation, "sloc_a").await.unwrap().unwrap();
    let position = store
        .position(EntityKind::StockLocation, "sloc_a")
        .await
        .unwrap()
        .unwrap();
    store.delete(EntityKind::StockLocation, "sloc_a").await.unwrap();
    store
        .restore(EntityKind::StockLocation, first, position)
        .await
        .unwrap();

    let ids: Vec<String> = store
        .list(EntityKind::StockLocation)
        .await
        .unwrap()
        .iter()
        .map(|d| d["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, ["sloc_a", "sloc_b"]);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_duplicate_link(pool: PgPool) {
    let store = PgStore::new(pool);
    let link = LinkRecord::new(LinkSide::stock_location("sloc_1"), LinkSide::sales_channel("sc_1"));
    store.insert_link(&link).await.unwrap();
    assert_matches!(store.insert_link(&link).await, Err(StoreError::DuplicateLink(_)));
    assert_eq!(store.list_links().await.unwrap(), vec![link.clone()]);
    assert!(store.delete_link(&link).await.unwrap());
}
