//! Catalog behaviour against PostgreSQL + PostGIS.
//!
//! **IMPORTANT**: These tests require a PostgreSQL server with the PostGIS
//! extension available. Each test creates and drops its own schema.
//! Set `DATABASE_URL` or start the test database on port 15432.

use std::collections::HashSet;

use storefinder_db::test_fixtures::{store_input, TestCatalog};
use storefinder_db::{
    CreateReviewRequest, Error, GeoSearch, ListStoresRequest, NearQuery, RatingAggregator,
    ReviewRepository, StoreRepository, StoreSearch, TagAggregator,
};
use uuid::Uuid;

#[tokio::test]
#[ignore = "requires migrated database with PostGIS"]
async fn test_slug_sequence_and_lookup() {
    let db = TestCatalog::new().await.unwrap();
    let author = db.insert_author("Ada").await.unwrap();
    let stores = &db.catalog.stores;

    let a = stores
        .create(store_input("Cafe Luna", -79.40, 43.65), author)
        .await
        .unwrap();
    let b = stores
        .create(store_input("Cafe Luna", -79.41, 43.66), author)
        .await
        .unwrap();
    assert_eq!(a.slug, "cafe-luna");
    assert_eq!(b.slug, "cafe-luna-2");

    let detail = stores.find_by_slug("Cafe-Luna-2").await.unwrap().unwrap();
    assert_eq!(detail.store.id, b.id);
    assert_eq!(detail.author.map(|a| a.name), Some("Ada".to_string()));

    db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires migrated database with PostGIS"]
async fn test_concurrent_creates_reserve_distinct_slugs() {
    let db = TestCatalog::new().await.unwrap();
    let author = Uuid::new_v4();

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let stores = db.catalog.stores.clone();
            tokio::spawn(async move {
                stores
                    .create(store_input("Cafe Luna", 0.0, 0.0), author)
                    .await
            })
        })
        .collect();

    let mut slugs = HashSet::new();
    for handle in handles {
        let store = handle.await.unwrap().unwrap();
        assert!(slugs.insert(store.slug));
    }
    assert!(slugs.contains("cafe-luna"));

    // The unique index rejects a duplicate written behind the resolver's back.
    let duplicate = sqlx::query(
        "INSERT INTO store (id, name, slug, longitude, latitude, address, author_id) \
         VALUES ($1, 'Dup', 'CAFE-LUNA', 0, 0, 'x', $2)",
    )
    .bind(Uuid::new_v4())
    .bind(author)
    .execute(&db.pool)
    .await;
    assert!(duplicate.is_err());

    db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires migrated database with PostGIS"]
async fn test_update_ownership_and_rename() {
    let db = TestCatalog::new().await.unwrap();
    let owner = Uuid::new_v4();
    let stores = &db.catalog.stores;

    let store = stores
        .create(store_input("Cafe Luna", 0.0, 0.0).with_photo("a.png"), owner)
        .await
        .unwrap();

    let rejected = stores
        .update(store.id, store_input("Hijacked", 0.0, 0.0), Uuid::new_v4())
        .await;
    assert!(matches!(rejected, Err(Error::OwnershipViolation { .. })));
    assert_eq!(
        stores.find_by_id(store.id).await.unwrap().unwrap().name,
        "Cafe Luna"
    );

    let renamed = stores
        .update(store.id, store_input("Tea House", 0.0, 0.0), owner)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(renamed.slug, "tea-house");
    assert_eq!(renamed.photo.as_deref(), Some("a.png"));

    assert!(stores
        .update(Uuid::new_v4(), store_input("Ghost", 0.0, 0.0), owner)
        .await
        .unwrap()
        .is_none());

    db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires migrated database with PostGIS"]
async fn test_queries_and_aggregations() {
    let db = TestCatalog::new().await.unwrap();
    let author = Uuid::new_v4();
    let catalog = &db.catalog;

    let near = catalog
        .stores
        .create(
            store_input("Coffee Roastery", 0.01, 0.0).with_tags(["Wifi", "Coffee"]),
            author,
        )
        .await
        .unwrap();
    let mid = catalog
        .stores
        .create(
            store_input("Corner Shop", 0.05, 0.0)
                .with_description("We pour coffee too")
                .with_tags(["Wifi"]),
            author,
        )
        .await
        .unwrap();
    catalog
        .stores
        .create(store_input("Far Away", 0.5, 0.0), author)
        .await
        .unwrap();

    let nearby = catalog.geo.find_near(NearQuery::around(0.0, 0.0)).await.unwrap();
    let ids: Vec<Uuid> = nearby.iter().map(|n| n.store.id).collect();
    assert_eq!(ids, vec![near.id, mid.id]);

    let hits = catalog.search.search("coffee", 5).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].store.id, near.id);

    let counts = catalog.tags.tag_counts().await.unwrap();
    assert_eq!(counts[0].tag, "Wifi");
    assert_eq!(counts.iter().map(|c| c.count).sum::<i64>(), 3);

    for (store, rating) in [(&near, 5), (&near, 4), (&mid, 2)] {
        catalog
            .reviews
            .create(
                CreateReviewRequest {
                    store_id: store.id,
                    rating,
                    text: "fine".to_string(),
                },
                Uuid::new_v4(),
            )
            .await
            .unwrap();
    }
    let top = catalog.ratings.top_rated(10).await.unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].store.id, near.id);
    assert_eq!(top[0].average_rating, 4.5);

    let page = catalog.stores.list(ListStoresRequest::default()).await.unwrap();
    assert_eq!(page.total, 3);

    db.cleanup().await;
}
