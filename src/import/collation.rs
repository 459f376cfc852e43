//! Collation policy resolution and status.
//!
//! Resolution turns the operator's choice ("server default" or a named
//! collation) into an effective collation plus a display label. Comparison
//! is display-only at plan time; it blocks a write only through the
//! executor's `stop_on_mismatch` guard.

use crate::import::models::TableDescriptor;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollationChoice {
    #[default]
    ServerDefault,
    Explicit(String),
}

/// The resolved collation. `collation: None` means unknown (server default
/// requested but not determinable), which renders as such and compares as
/// `Incomparable`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveCollation {
    pub collation: Option<String>,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollationStatus {
    Match,
    Mismatch,
    Incomparable,
}

pub fn resolve(choice: &CollationChoice, server_default: Option<&str>) -> EffectiveCollation {
    match choice {
        CollationChoice::Explicit(name) => EffectiveCollation {
            collation: Some(name.clone()),
            label: name.clone(),
        },
        CollationChoice::ServerDefault => match server_default {
            Some(name) => EffectiveCollation {
                collation: Some(name.to_string()),
                label: format!("server default ({name})"),
            },
            None => EffectiveCollation {
                collation: None,
                label: "server default (unknown)".to_string(),
            },
        },
    }
}

/// Compares a table's reported collation against the effective one.
/// Either side being unknown makes the pair incomparable rather than
/// mismatched.
pub fn compare(table_collation: Option<&str>, effective: &EffectiveCollation) -> CollationStatus {
    match (table_collation, effective.collation.as_deref()) {
        (Some(actual), Some(wanted)) if actual.eq_ignore_ascii_case(wanted) => {
            CollationStatus::Match
        }
        (Some(_), Some(_)) => CollationStatus::Mismatch,
        _ => CollationStatus::Incomparable,
    }
}

/// Names of text columns whose own collation differs from the effective
/// one. Columns without a reported collation (non-text) are skipped.
pub fn mismatched_columns(descriptor: &TableDescriptor, effective: &EffectiveCollation) -> Vec<String> {
    let Some(wanted) = effective.collation.as_deref() else {
        return Vec::new();
    };
    descriptor
        .columns
        .iter()
        .filter(|column| {
            column
                .collation
                .as_deref()
                .is_some_and(|actual| !actual.eq_ignore_ascii_case(wanted))
        })
        .map(|column| column.name.clone())
        .collect()
}
