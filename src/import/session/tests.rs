use super::*;
use crate::source::SourceData;
use crate::sqlite;
use crate::table::DataTable;
use indexmap::IndexMap;
use serde_json::json;

async fn memory_backend() -> DbPool {
    DbPool::Sqlite(sqlite::create_memory_pool().await.unwrap())
}

fn orders_table() -> DataTable {
    let mut table = DataTable::new(vec!["Order ID".to_string(), "Amount".to_string()]);
    table.rows.push(vec![json!(1), json!(10)]);
    table.rows.push(vec![json!(2), json!(20)]);
    table
}

fn single_source() -> SourceDataset {
    SourceDataset {
        name: "orders".to_string(),
        data: SourceData::SingleTable(orders_table()),
    }
}

fn keyed_source() -> SourceDataset {
    let mut tables = IndexMap::new();
    tables.insert("Orders".to_string(), orders_table());
    let mut refunds = DataTable::new(vec!["order_id".to_string()]);
    refunds.rows.push(vec![json!(1)]);
    tables.insert("Refund Log".to_string(), refunds);
    SourceDataset {
        name: "bundle".to_string(),
        data: SourceData::KeyedCollection(tables),
    }
}

fn single_selection() -> TargetSelection {
    TargetSelection::Single {
        unit: None,
        table: "orders".to_string(),
    }
}

#[tokio::test]
async fn walks_review_then_commits_every_table() {
    let backend = memory_backend().await;
    let mut session = ImportSession::begin(
        backend,
        None,
        keyed_source(),
        TargetSelection::AllUnits,
        SessionOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(session.state(), SessionState::AwaitingConfirmation(0));
    assert_eq!(session.current().unwrap().target_table, "orders");

    assert_eq!(
        session.confirm().unwrap(),
        SessionState::AwaitingConfirmation(1)
    );
    assert_eq!(session.current().unwrap().target_table, "refund_log");
    assert_eq!(session.confirm().unwrap(), SessionState::Committing);
    assert!(session.current().is_none());

    let outcome = session.commit().await.unwrap();
    assert!(outcome.failures.is_empty());
    let written: Vec<(&str, u64)> = outcome
        .reports
        .iter()
        .map(|r| (r.table.as_str(), r.rows_written))
        .collect();
    assert_eq!(written, [("orders", 2), ("refund_log", 1)]);
}

#[tokio::test]
async fn exclusions_must_name_source_fields() {
    let backend = memory_backend().await;
    let mut session = ImportSession::begin(
        backend,
        None,
        single_source(),
        single_selection(),
        SessionOptions::default(),
    )
    .await
    .unwrap();

    let err = session
        .set_exclusions(["no_such_field".to_string()].into())
        .unwrap_err();
    assert!(matches!(err, TransferError::ValidationError(_)));

    session
        .set_exclusions(["Amount".to_string()].into())
        .unwrap();
    assert_eq!(
        session.exclusions_for("orders"),
        ["amount".to_string()].into()
    );
}

#[tokio::test]
async fn excluded_fields_are_dropped_from_the_write() {
    let backend = memory_backend().await;
    let mut session = ImportSession::begin(
        backend,
        None,
        single_source(),
        single_selection(),
        SessionOptions::default(),
    )
    .await
    .unwrap();

    session
        .set_exclusions(["amount".to_string()].into())
        .unwrap();
    session.confirm().unwrap();

    let outcome = session.commit().await.unwrap();
    assert_eq!(outcome.reports[0].dropped_columns, ["amount"]);
}

#[tokio::test]
async fn auto_excluded_identity_column_can_be_re_included() {
    let backend = memory_backend().await;
    backend
        .execute(
            "CREATE TABLE people (id INTEGER PRIMARY KEY, name TEXT)",
            "people",
        )
        .await
        .unwrap();

    let mut table = DataTable::new(vec!["id".to_string(), "name".to_string()]);
    table.rows.push(vec![json!(7), json!("ada")]);
    let source = SourceDataset {
        name: "people".to_string(),
        data: SourceData::SingleTable(table),
    };

    let mut session = ImportSession::begin(
        backend,
        None,
        source,
        TargetSelection::Single {
            unit: None,
            table: "people".to_string(),
        },
        SessionOptions {
            mode: WriteMode::Append,
            ..SessionOptions::default()
        },
    )
    .await
    .unwrap();

    // Planner pre-excluded the identity column.
    assert_eq!(session.exclusions_for("people"), ["id".to_string()].into());

    // Operator re-includes it by confirming an empty exclusion set.
    session.set_exclusions(BTreeSet::new()).unwrap();
    session.confirm().unwrap();

    let outcome = session.commit().await.unwrap();
    assert!(outcome.reports[0].dropped_columns.is_empty());
}

#[tokio::test]
async fn commit_before_full_confirmation_is_rejected() {
    let backend = memory_backend().await;
    let session = ImportSession::begin(
        backend,
        None,
        keyed_source(),
        TargetSelection::AllUnits,
        SessionOptions::default(),
    )
    .await
    .unwrap();

    let err = session.commit().await.unwrap_err();
    assert!(matches!(err, TransferError::ValidationError(_)));
}

#[tokio::test]
async fn abort_releases_the_session_without_writing() {
    let backend = memory_backend().await;
    let session = ImportSession::begin(
        backend,
        None,
        single_source(),
        single_selection(),
        SessionOptions::default(),
    )
    .await
    .unwrap();

    session.abort().await;
}

#[tokio::test]
async fn empty_keyed_source_fails_planning() {
    let backend = memory_backend().await;
    let source = SourceDataset {
        name: "empty".to_string(),
        data: SourceData::KeyedCollection(IndexMap::new()),
    };

    let result = ImportSession::begin(
        backend,
        None,
        source,
        TargetSelection::AllUnits,
        SessionOptions::default(),
    )
    .await;
    assert!(matches!(result, Err(TransferError::ValidationError(_))));
}
