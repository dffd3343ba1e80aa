use super::*;
use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use tempfile::TempDir;

async fn create_test_pool() -> (TempDir, SqlitePool) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("test.db");

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(
            sqlx::sqlite::SqliteConnectOptions::new()
                .filename(&db_path)
                .create_if_missing(true)
                .foreign_keys(true),
        )
        .await
        .expect("Failed to create test pool");

    sqlx::raw_sql(include_str!("../migrations/001_initial_schema.sql"))
        .execute(&pool)
        .await
        .expect("Failed to run migrations");

    (temp_dir, pool)
}

fn test_document(id: &str) -> Document {
    Document {
        id: id.to_string(),
        title: "Intro to embeddings".to_string(),
        origin: Some("upload".to_string()),
        created_date: Utc::now().naive_utc(),
    }
}

fn test_slice(id: &str, document_id: &str, vector_id: Option<&str>) -> Slice {
    Slice {
        id: id.to_string(),
        document_id: document_id.to_string(),
        content: "hello world".to_string(),
        word_count: 11,
        vector_id: vector_id.map(str::to_string),
        enabled: true,
        created_date: Utc::now().naive_utc(),
    }
}

#[tokio::test]
async fn document_crud_operations() {
    let (_temp_dir, pool) = create_test_pool().await;

    let doc = test_document("d1");
    DocumentQueries::insert(&pool, &doc)
        .await
        .expect("Failed to insert document");

    let retrieved = DocumentQueries::get_by_id(&pool, "d1")
        .await
        .expect("Failed to get document")
        .expect("Document should exist");
    assert_eq!(retrieved.title, "Intro to embeddings");
    assert_eq!(retrieved.origin.as_deref(), Some("upload"));

    let updated = Document {
        title: "Advanced embeddings".to_string(),
        ..doc.clone()
    };
    DocumentQueries::update_by_id(&pool, &updated)
        .await
        .expect("Failed to update document");

    let retrieved = DocumentQueries::get_by_id(&pool, "d1")
        .await
        .expect("Failed to get document")
        .expect("Document should exist");
    assert_eq!(retrieved.title, "Advanced embeddings");
    // Creation date is immutable
    assert_eq!(retrieved.created_date, doc.created_date);

    let deleted = DocumentQueries::delete_by_id(&pool, "d1")
        .await
        .expect("Failed to delete document");
    assert!(deleted);

    let not_found = DocumentQueries::get_by_id(&pool, "d1")
        .await
        .expect("Query should succeed");
    assert!(not_found.is_none());

    let deleted_again = DocumentQueries::delete_by_id(&pool, "d1")
        .await
        .expect("Repeated delete should succeed");
    assert!(!deleted_again);
}

#[tokio::test]
async fn document_insert_conflict() {
    let (_temp_dir, pool) = create_test_pool().await;

    let doc = test_document("d1");
    DocumentQueries::insert(&pool, &doc)
        .await
        .expect("Failed to insert document");

    let err = DocumentQueries::insert(&pool, &doc)
        .await
        .expect_err("Duplicate id should conflict");
    assert!(err.is_conflict());
}

#[tokio::test]
async fn document_update_missing_row() {
    let (_temp_dir, pool) = create_test_pool().await;

    let err = DocumentQueries::update_by_id(&pool, &test_document("ghost"))
        .await
        .expect_err("Updating a missing document should fail");
    assert!(err.is_not_found());
}

#[tokio::test]
async fn slice_crud_operations() {
    let (_temp_dir, pool) = create_test_pool().await;

    DocumentQueries::insert(&pool, &test_document("d1"))
        .await
        .expect("Failed to insert document");

    let slice = test_slice("s1", "d1", None);
    SliceQueries::insert(&pool, &slice)
        .await
        .expect("Failed to insert slice");

    let retrieved = SliceQueries::get_by_id(&pool, "s1")
        .await
        .expect("Failed to get slice")
        .expect("Slice should exist");
    assert_eq!(retrieved.content, "hello world");
    assert_eq!(retrieved.word_count, 11);
    assert!(retrieved.vector_id.is_none());
    assert!(retrieved.enabled);

    let updated = Slice {
        vector_id: Some("v1".to_string()),
        enabled: false,
        ..slice
    };
    SliceQueries::update_by_id(&pool, &updated)
        .await
        .expect("Failed to update slice");

    let retrieved = SliceQueries::get_by_id(&pool, "s1")
        .await
        .expect("Failed to get slice")
        .expect("Slice should exist");
    assert_eq!(retrieved.vector_id.as_deref(), Some("v1"));
    assert!(!retrieved.enabled);
}

#[tokio::test]
async fn slice_insert_conflict_and_missing_document() {
    let (_temp_dir, pool) = create_test_pool().await;

    DocumentQueries::insert(&pool, &test_document("d1"))
        .await
        .expect("Failed to insert document");

    let slice = test_slice("s1", "d1", None);
    SliceQueries::insert(&pool, &slice)
        .await
        .expect("Failed to insert slice");

    let err = SliceQueries::insert(&pool, &slice)
        .await
        .expect_err("Duplicate id should conflict");
    assert!(err.is_conflict());

    let orphan = test_slice("s2", "no-such-document", None);
    let err = SliceQueries::insert(&pool, &orphan)
        .await
        .expect_err("Slice without owning document should fail");
    assert!(err.is_not_found());
    // The error names the missing document, not the slice being inserted
    assert_eq!(err.to_string(), "document not found: no-such-document");
}

#[tokio::test]
async fn slice_update_missing_row() {
    let (_temp_dir, pool) = create_test_pool().await;

    let err = SliceQueries::update_by_id(&pool, &test_slice("ghost", "d1", None))
        .await
        .expect_err("Updating a missing slice should fail");
    assert!(err.is_not_found());
}

#[tokio::test]
async fn vector_id_listing_skips_unregistered_slices() {
    let (_temp_dir, pool) = create_test_pool().await;

    DocumentQueries::insert(&pool, &test_document("d1"))
        .await
        .expect("Failed to insert document");
    DocumentQueries::insert(&pool, &test_document("d2"))
        .await
        .expect("Failed to insert document");

    SliceQueries::insert(&pool, &test_slice("s1", "d1", Some("v1")))
        .await
        .expect("Failed to insert slice");
    SliceQueries::insert(&pool, &test_slice("s2", "d1", None))
        .await
        .expect("Failed to insert slice");
    SliceQueries::insert(&pool, &test_slice("s3", "d2", Some("v3")))
        .await
        .expect("Failed to insert slice");

    let ids = SliceQueries::list_vector_ids_of_document(&pool, "d1")
        .await
        .expect("Failed to list vector ids");
    assert_eq!(ids, vec!["v1".to_string()]);

    let mut all_ids = SliceQueries::list_all_vector_ids(&pool)
        .await
        .expect("Failed to list all vector ids");
    all_ids.sort();
    assert_eq!(all_ids, vec!["v1".to_string(), "v3".to_string()]);
}

#[tokio::test]
async fn delete_all_of_document_removes_only_its_rows() {
    let (_temp_dir, pool) = create_test_pool().await;

    DocumentQueries::insert(&pool, &test_document("d1"))
        .await
        .expect("Failed to insert document");
    DocumentQueries::insert(&pool, &test_document("d2"))
        .await
        .expect("Failed to insert document");

    SliceQueries::insert(&pool, &test_slice("s1", "d1", Some("v1")))
        .await
        .expect("Failed to insert slice");
    SliceQueries::insert(&pool, &test_slice("s2", "d1", None))
        .await
        .expect("Failed to insert slice");
    SliceQueries::insert(&pool, &test_slice("s3", "d2", Some("v3")))
        .await
        .expect("Failed to insert slice");

    let removed = SliceQueries::delete_all_of_document(&pool, "d1")
        .await
        .expect("Failed to delete slices");
    assert_eq!(removed, 2);

    // Second call is a no-op
    let removed = SliceQueries::delete_all_of_document(&pool, "d1")
        .await
        .expect("Repeated delete should succeed");
    assert_eq!(removed, 0);

    assert_eq!(
        SliceQueries::count_of_document(&pool, "d1")
            .await
            .expect("Failed to count slices"),
        0
    );
    assert_eq!(
        SliceQueries::count_of_document(&pool, "d2")
            .await
            .expect("Failed to count slices"),
        1
    );
}
