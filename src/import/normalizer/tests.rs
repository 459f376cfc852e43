use super::*;

#[test]
fn trims_replaces_and_lowercases() {
    assert_eq!(normalize("  Order ID "), "order_id");
    assert_eq!(normalize("Amount "), "amount");
    assert_eq!(normalize("already_clean"), "already_clean");
}

#[test]
fn idempotent() {
    for raw in ["  Order ID ", "Amount ", "MiXeD Case Name", "", "  ", "a b c"] {
        let once = normalize(raw);
        assert_eq!(normalize(&once), once);
    }
}

#[test]
fn internal_spaces_only() {
    // Leading/trailing spaces are trimmed before replacement, so they do
    // not become underscores.
    assert_eq!(normalize(" a b "), "a_b");
}
