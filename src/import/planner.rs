//! Reconciliation planning.
//!
//! For every target table an import addresses, the planner pairs the
//! normalized source field list with a fresh destination schema snapshot
//! and classifies each field as present in both, source-only, or
//! destination-only. Auto-increment destination columns are pre-excluded
//! when the table exists; the operator may re-include them.

use crate::error::Result;
use crate::import::inspector::SchemaInspector;
use crate::import::models::{
    ComparisonRecord, FieldEntry, FieldStatus, TableDescriptor, TargetSelection,
};
use crate::import::normalizer::normalize;
use crate::source::SourceDataset;
use std::collections::BTreeSet;

/// Builds one comparison per target table, in source-declared unit order.
/// A failing step carries its error in place so the remaining tables still
/// get planned; the caller decides whether the subset is worth committing.
pub async fn plan(
    source: &SourceDataset,
    selection: &TargetSelection,
    inspector: &dyn SchemaInspector,
) -> Vec<Result<ComparisonRecord>> {
    let targets: Vec<(Option<String>, String)> = match selection {
        TargetSelection::Single { unit, table } => {
            vec![(unit.clone(), normalize(table))]
        }
        TargetSelection::AllUnits => source
            .units()
            .into_iter()
            .map(|(unit, _)| {
                let table = source.derived_table_name(unit.as_deref());
                (unit, table)
            })
            .collect(),
    };

    let mut comparisons = Vec::with_capacity(targets.len());
    for (unit, table) in targets {
        comparisons.push(plan_one(source, unit, table, inspector).await);
    }
    comparisons
}

async fn plan_one(
    source: &SourceDataset,
    unit: Option<String>,
    table: String,
    inspector: &dyn SchemaInspector,
) -> Result<ComparisonRecord> {
    let source_fields = source.peek_fields(unit.as_deref())?;
    let descriptor = inspector.describe_table(&table).await?;

    let field_status = classify_fields(&source_fields, descriptor.as_ref());
    let auto_excluded = suggest_exclusions(&source_fields, descriptor.as_ref());

    Ok(ComparisonRecord {
        target_table: table,
        source_unit: unit,
        source_fields,
        descriptor,
        field_status,
        auto_excluded,
    })
}

/// Partitions the union of source and destination field names into the
/// three disjoint status classes. Source fields keep declared order and
/// come first; destination-only columns follow in schema order.
pub fn classify_fields(
    source_fields: &[String],
    descriptor: Option<&TableDescriptor>,
) -> Vec<FieldEntry> {
    let destination: Vec<String> = descriptor
        .map(|d| d.columns.iter().map(|c| normalize(&c.name)).collect())
        .unwrap_or_default();
    let destination_set: BTreeSet<&str> = destination.iter().map(String::as_str).collect();
    let source_set: BTreeSet<&str> = source_fields.iter().map(String::as_str).collect();

    let mut entries = Vec::with_capacity(source_fields.len() + destination.len());
    let mut seen = BTreeSet::new();

    for field in source_fields {
        if !seen.insert(field.as_str()) {
            continue;
        }
        let status = if destination_set.contains(field.as_str()) {
            FieldStatus::Both
        } else {
            FieldStatus::SourceOnly
        };
        entries.push(FieldEntry {
            name: field.clone(),
            status,
        });
    }

    for column in &destination {
        if source_set.contains(column.as_str()) || !seen.insert(column.as_str()) {
            continue;
        }
        entries.push(FieldEntry {
            name: column.clone(),
            status: FieldStatus::DestinationOnly,
        });
    }

    entries
}

/// Identity columns should be server-generated, not re-imported, so any
/// auto-increment destination column that also arrives from the source is
/// pre-excluded. A missing table pre-excludes nothing.
fn suggest_exclusions(
    source_fields: &[String],
    descriptor: Option<&TableDescriptor>,
) -> BTreeSet<String> {
    let Some(descriptor) = descriptor else {
        return BTreeSet::new();
    };
    let source_set: BTreeSet<&str> = source_fields.iter().map(String::as_str).collect();

    descriptor
        .columns
        .iter()
        .filter(|column| column.is_auto_increment())
        .map(|column| normalize(&column.name))
        .filter(|name| source_set.contains(name.as_str()))
        .collect()
}
