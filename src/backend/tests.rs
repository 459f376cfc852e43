use super::*;
use serde_json::json;

#[test]
fn identifier_quoting_escapes_delimiters() {
    assert_eq!(quote_ident_mysql("or`ders"), "`or``ders`");
    assert_eq!(quote_ident_sqlite("or\"ders"), "\"or\"\"ders\"");
}

#[test]
fn string_literal_escaping_differs_per_backend() {
    assert_eq!(
        value_to_sql_literal(BackendKind::MySql, &json!("it's a \\ test")),
        "'it''s a \\\\ test'"
    );
    assert_eq!(
        value_to_sql_literal(BackendKind::Sqlite, &json!("it's a \\ test")),
        "'it''s a \\ test'"
    );
}

#[test]
fn bool_literal_differs_per_backend() {
    assert_eq!(value_to_sql_literal(BackendKind::MySql, &json!(true)), "1");
    assert_eq!(
        value_to_sql_literal(BackendKind::Sqlite, &json!(true)),
        "TRUE"
    );
}

#[test]
fn null_literal() {
    assert_eq!(
        value_to_sql_literal(BackendKind::Sqlite, &serde_json::Value::Null),
        "NULL"
    );
}

#[tokio::test]
async fn insert_and_fetch_round_trip_sqlite() {
    let pool = crate::sqlite::create_memory_pool().await.unwrap();
    let db = DbPool::Sqlite(pool);

    db.create_table(
        "items",
        &[
            ("id".to_string(), crate::table::SqlType::Integer),
            ("label".to_string(), crate::table::SqlType::Text),
        ],
    )
    .await
    .unwrap();

    let data = DataTable {
        columns: vec!["id".into(), "label".into()],
        rows: vec![
            vec![json!(1), json!("first")],
            vec![json!(2), serde_json::Value::Null],
        ],
    };
    let written = db.insert_rows("items", &data, false).await.unwrap();
    assert_eq!(written, 2);

    let fetched = db.fetch_table("items").await.unwrap();
    assert_eq!(fetched.columns, vec!["id", "label"]);
    assert_eq!(fetched.rows[0], vec![json!(1), json!("first")]);
    assert_eq!(fetched.rows[1][1], serde_json::Value::Null);
}

#[tokio::test]
async fn backslashes_survive_sqlite_round_trip() {
    let pool = crate::sqlite::create_memory_pool().await.unwrap();
    let db = DbPool::Sqlite(pool);
    db.execute("CREATE TABLE paths (p TEXT)", "paths")
        .await
        .unwrap();

    let data = DataTable {
        columns: vec!["p".into()],
        rows: vec![vec![json!("C:\\temp\\file")]],
    };
    db.insert_rows("paths", &data, false).await.unwrap();

    let fetched = db.fetch_table("paths").await.unwrap();
    assert_eq!(fetched.rows[0][0], json!("C:\\temp\\file"));
}

#[tokio::test]
async fn fetch_empty_table_keeps_header() {
    let pool = crate::sqlite::create_memory_pool().await.unwrap();
    let db = DbPool::Sqlite(pool);
    db.execute("CREATE TABLE empty_t (a TEXT, b INTEGER)", "empty_t")
        .await
        .unwrap();

    let fetched = db.fetch_table("empty_t").await.unwrap();
    assert_eq!(fetched.columns, vec!["a", "b"]);
    assert!(fetched.rows.is_empty());
}

#[tokio::test]
async fn insert_ignore_skips_duplicate_keys() {
    let pool = crate::sqlite::create_memory_pool().await.unwrap();
    let db = DbPool::Sqlite(pool);
    db.execute(
        "CREATE TABLE keyed (id INTEGER PRIMARY KEY, label TEXT)",
        "keyed",
    )
    .await
    .unwrap();

    let first = DataTable {
        columns: vec!["id".into(), "label".into()],
        rows: vec![vec![json!(1), json!("a")]],
    };
    assert_eq!(db.insert_rows("keyed", &first, false).await.unwrap(), 1);

    let second = DataTable {
        columns: vec!["id".into(), "label".into()],
        rows: vec![vec![json!(1), json!("dup")], vec![json!(2), json!("b")]],
    };
    let written = db.insert_rows("keyed", &second, true).await.unwrap();
    assert_eq!(written, 1);

    let fetched = db.fetch_table("keyed").await.unwrap();
    assert_eq!(fetched.row_count(), 2);
    assert_eq!(fetched.rows[0][1], json!("a"));
}
