use super::*;
use std::collections::HashMap;

fn fake_env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

#[test]
fn profile_uses_plain_variables_by_default() {
    let get = fake_env(&[
        ("MYSQL_HOST", "db.local"),
        ("MYSQL_USER", "app"),
        ("MYSQL_PASSWORD", "secret"),
        ("MYSQL_PORT", "3307"),
    ]);
    let profile = mysql_profile_with("orders", false, get).unwrap();
    assert_eq!(profile.host, "db.local");
    assert_eq!(profile.port, 3307);
    assert_eq!(profile.database, "orders");
}

#[test]
fn prod_toggle_switches_prefix() {
    let get = fake_env(&[
        ("MYSQL_HOST", "dev.local"),
        ("PROD_MYSQL_HOST", "prod.local"),
        ("PROD_MYSQL_USER", "app"),
        ("PROD_MYSQL_PASSWORD", "secret"),
    ]);
    let profile = mysql_profile_with("orders", true, get).unwrap();
    assert_eq!(profile.host, "prod.local");
    assert_eq!(profile.port, 3306);
}

#[test]
fn missing_variables_are_listed() {
    let get = fake_env(&[("MYSQL_HOST", "db.local")]);
    let err = mysql_profile_with("orders", false, get).unwrap_err();
    match err {
        TransferError::ConfigurationMissing(keys) => {
            assert!(keys.contains("MYSQL_USER"));
            assert!(keys.contains("MYSQL_PASSWORD"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn empty_database_name_is_validation_error() {
    let err = mysql_profile_with("  ", false, |_| None).unwrap_err();
    assert!(matches!(err, TransferError::ValidationError(_)));
}

#[test]
fn tunnel_absent_without_ssh_host() {
    assert!(tunnel_settings_with(|_| None).unwrap().is_none());
}

#[test]
fn tunnel_requires_user() {
    let get = fake_env(&[("SSH_HOST", "bastion")]);
    assert!(tunnel_settings_with(get).is_err());
}
