use super::*;
use serde_json::json;

fn people() -> DataTable {
    let mut table = DataTable::new(vec!["id".to_string(), "name".to_string()]);
    table.rows.push(vec![json!(1), json!("ada")]);
    table.rows.push(vec![json!(2), json!("grace")]);
    table
}

#[test]
fn single_table_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("people.json");

    write_single(&path, &people()).unwrap();
    match read_collection(&path).unwrap() {
        SourceData::SingleTable(table) => assert_eq!(table, people()),
        other => panic!("expected single table, got {other:?}"),
    }
}

#[test]
fn collection_preserves_declared_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bundle.json");

    let mut tables = IndexMap::new();
    tables.insert("zebra".to_string(), people());
    tables.insert("aardvark".to_string(), DataTable::new(vec!["x".to_string()]));
    write_collection(&path, &tables).unwrap();

    match read_collection(&path).unwrap() {
        SourceData::KeyedCollection(read) => {
            let names: Vec<&String> = read.keys().collect();
            assert_eq!(names, ["zebra", "aardvark"]);
        }
        other => panic!("expected collection, got {other:?}"),
    }
}

#[test]
fn table_kind_is_tagged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tagged.json");
    write_single(&path, &people()).unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["kind"], "table");
    assert_eq!(raw["columns"][1], "name");
}

#[test]
fn unreadable_file_names_the_path() {
    let err = read_collection(Path::new("/nonexistent/source.json")).unwrap_err();
    assert!(matches!(err, TransferError::SourceUnreadable(_)));
    assert!(err.to_string().contains("/nonexistent/source.json"));
}
