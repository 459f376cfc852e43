use super::*;
use crate::backend::DbPool;
use crate::sqlite;
use crate::workbook;
use serde_json::json;

async fn seeded_backend() -> DbPool {
    let backend = DbPool::Sqlite(sqlite::create_memory_pool().await.unwrap());
    backend
        .execute("CREATE TABLE t1 (id INTEGER, name TEXT)", "t1")
        .await
        .unwrap();
    backend
        .execute("INSERT INTO t1 VALUES (1, 'ada'), (2, 'grace')", "t1")
        .await
        .unwrap();
    backend
        .execute("CREATE TABLE t2 (id INTEGER)", "t2")
        .await
        .unwrap();
    backend
}

#[test]
fn default_file_stems() {
    assert_eq!(
        ExportScope::Table("orders".to_string()).default_file_stem("shop"),
        "orders"
    );
    assert_eq!(
        ExportScope::Query("SELECT 1".to_string()).default_file_stem("shop"),
        "query_result"
    );
    assert_eq!(ExportScope::Database.default_file_stem("shop"), "shop_full");
}

#[tokio::test]
async fn table_scope_extracts_one_table() {
    let backend = seeded_backend().await;
    match extract(&backend, &ExportScope::Table("t1".to_string()))
        .await
        .unwrap()
    {
        SourceData::SingleTable(table) => {
            assert_eq!(table.columns, ["id", "name"]);
            assert_eq!(table.row_count(), 2);
        }
        other => panic!("expected single table, got {other:?}"),
    }
}

#[tokio::test]
async fn query_scope_runs_the_statement_as_is() {
    let backend = seeded_backend().await;
    let scope = ExportScope::Query("SELECT name FROM t1 WHERE id = 2".to_string());
    match extract(&backend, &scope).await.unwrap() {
        SourceData::SingleTable(table) => {
            assert_eq!(table.rows, vec![vec![json!("grace")]]);
        }
        other => panic!("expected single table, got {other:?}"),
    }
}

#[tokio::test]
async fn database_scope_collects_every_table() {
    let backend = seeded_backend().await;
    match extract(&backend, &ExportScope::Database).await.unwrap() {
        SourceData::KeyedCollection(tables) => {
            let names: Vec<&String> = tables.keys().collect();
            assert_eq!(names, ["t1", "t2"]);
            assert!(tables["t2"].is_empty());
        }
        other => panic!("expected collection, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_database_export_is_rejected() {
    let backend = DbPool::Sqlite(sqlite::create_memory_pool().await.unwrap());
    let err = extract(&backend, &ExportScope::Database).await.unwrap_err();
    assert!(matches!(err, crate::error::TransferError::ValidationError(_)));
}

#[tokio::test]
async fn whole_database_export_writes_header_only_sheets_for_empty_tables() {
    let backend = seeded_backend().await;
    let data = extract(&backend, &ExportScope::Database).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shop_full.xlsx");
    write_dataset(&path, "shop_full", &data).unwrap();

    let sheets = workbook::read_workbook(&path).unwrap();
    let names: Vec<&String> = sheets.keys().collect();
    assert_eq!(names, ["t1", "t2"]);
    assert_eq!(sheets["t1"].row_count(), 2);
    assert_eq!(sheets["t2"].columns, ["id"]);
    assert!(sheets["t2"].is_empty());
}

#[tokio::test]
async fn single_table_collection_round_trip() {
    let backend = seeded_backend().await;
    let data = extract(&backend, &ExportScope::Table("t1".to_string()))
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("t1.json");
    write_dataset(&path, "t1", &data).unwrap();

    match crate::collection::read_collection(&path).unwrap() {
        SourceData::SingleTable(table) => assert_eq!(table.row_count(), 2),
        other => panic!("expected single table, got {other:?}"),
    }
}
