use super::*;
use serde_json::json;

#[test]
fn infer_integer_column() {
    let t = infer_column_type("id", vec![json!(1), json!(2), Value::Null].into_iter()).unwrap();
    assert_eq!(t, SqlType::Integer);
}

#[test]
fn integer_widens_to_float() {
    let t = infer_column_type("amount", vec![json!(1), json!(2.5)].into_iter()).unwrap();
    assert_eq!(t, SqlType::Float);
}

#[test]
fn all_null_column_falls_back_to_text() {
    let t = infer_column_type("note", vec![Value::Null, Value::Null].into_iter()).unwrap();
    assert_eq!(t, SqlType::Text);
}

#[test]
fn mixed_string_and_number_is_ambiguous() {
    let err = infer_column_type("code", vec![json!(1), json!("x")].into_iter()).unwrap_err();
    match err {
        TransferError::SchemaInferenceAmbiguous { column, .. } => assert_eq!(column, "code"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn nested_value_is_ambiguous() {
    let err = infer_column_type("meta", vec![json!({"a": 1})].into_iter()).unwrap_err();
    assert!(matches!(
        err,
        TransferError::SchemaInferenceAmbiguous { .. }
    ));
}

#[test]
fn without_columns_drops_by_index() {
    let table = DataTable {
        columns: vec!["a".into(), "b".into(), "c".into()],
        rows: vec![vec![json!(1), json!(2), json!(3)]],
    };
    let trimmed = table.without_columns(&[1]);
    assert_eq!(trimmed.columns, vec!["a", "c"]);
    assert_eq!(trimmed.rows, vec![vec![json!(1), json!(3)]]);
}
