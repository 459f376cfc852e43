use super::*;
use serde_json::json;

fn keyed(units: &[(&str, &[&str])]) -> SourceDataset {
    let mut tables = IndexMap::new();
    for (name, columns) in units {
        tables.insert(
            name.to_string(),
            DataTable::new(columns.iter().map(|c| c.to_string()).collect()),
        );
    }
    SourceDataset {
        name: "bundle".to_string(),
        data: SourceData::KeyedCollection(tables),
    }
}

fn single(columns: &[&str]) -> SourceDataset {
    SourceDataset {
        name: "Order Items".to_string(),
        data: SourceData::SingleTable(DataTable::new(
            columns.iter().map(|c| c.to_string()).collect(),
        )),
    }
}

#[test]
fn single_source_has_no_unit_names() {
    assert!(single(&["id"]).unit_names().is_empty());
}

#[test]
fn keyed_source_lists_units_in_declared_order() {
    let source = keyed(&[("Sheet B", &["x"]), ("Sheet A", &["y"])]);
    assert_eq!(source.unit_names(), ["Sheet B", "Sheet A"]);
}

#[test]
fn peek_fields_normalizes_headers() {
    let source = single(&[" Customer ID ", "Order Total"]);
    assert_eq!(
        source.peek_fields(None).unwrap(),
        ["customer_id", "order_total"]
    );
}

#[test]
fn none_unit_selects_first_sheet() {
    let source = keyed(&[("First", &["a"]), ("Second", &["b"])]);
    let table = source.table_for_unit(None).unwrap();
    assert_eq!(table.columns, ["a"]);
}

#[test]
fn unknown_unit_reports_available_units() {
    let source = keyed(&[("orders", &["id"]), ("items", &["id"])]);
    match source.table_for_unit(Some("payments")).unwrap_err() {
        TransferError::UnitNotFound { unit, available } => {
            assert_eq!(unit, "payments");
            assert_eq!(available, ["orders", "items"]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn unit_on_single_source_is_not_found() {
    let err = single(&["id"]).table_for_unit(Some("orders")).unwrap_err();
    assert!(matches!(err, TransferError::UnitNotFound { .. }));
}

#[test]
fn derived_name_falls_back_to_dataset_name() {
    let source = single(&["id"]);
    assert_eq!(source.derived_table_name(None), "order_items");
    assert_eq!(source.derived_table_name(Some("Región 1")), "región_1");
}

#[test]
fn units_labels_a_lone_table_with_none() {
    let source = single(&["id"]);
    let units = source.units();
    assert_eq!(units.len(), 1);
    assert!(units[0].0.is_none());
}

#[test]
fn load_dispatches_on_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("inventory.json");
    let mut table = DataTable::new(vec!["sku".to_string()]);
    table.rows.push(vec![json!("A-1")]);
    collection::write_single(&path, &table).unwrap();

    let loaded = SourceDataset::load(&path).unwrap();
    assert_eq!(loaded.name, "inventory");
    assert!(matches!(loaded.data, SourceData::SingleTable(_)));
}
