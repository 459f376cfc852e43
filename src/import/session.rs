//! Import session orchestration.
//!
//! A session owns everything one import needs: the loaded source, the
//! backend pool, an optional tunnel guard, the planned comparisons, and
//! the operator's per-table exclusion choices. It is an explicit state
//! machine: planning happens in `begin`, the operator walks the
//! comparisons one by one, and `commit` writes each table in plan order.
//! Dropping the session releases the tunnel; `commit` and `abort` also
//! close the pool.

use crate::backend::DbPool;
use crate::error::{Result, TransferError};
use crate::import::models::{
    ComparisonRecord, TableWriteReport, TargetSelection, WriteMode, WriteOptions,
};
use crate::import::normalizer::normalize;
use crate::import::{executor, planner};
use crate::source::SourceDataset;
use crate::ssh_tunnel::SshTunnel;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Reviewing comparison `i`; exclusions for it may still change.
    AwaitingConfirmation(usize),
    /// Every comparison confirmed; ready to write.
    Committing,
}

/// Write parameters shared by every table in the session. Per-table
/// exclusions live in the session's exclusion map instead.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub mode: WriteMode,
    pub desired_collation: Option<String>,
    pub stop_on_mismatch: bool,
}

/// What a committed session hands back: one report per written table and
/// one rendered failure per skipped table.
#[derive(Debug)]
pub struct SessionOutcome {
    pub reports: Vec<TableWriteReport>,
    pub failures: Vec<(String, TransferError)>,
}

pub struct ImportSession {
    backend: DbPool,
    _tunnel: Option<SshTunnel>,
    source: SourceDataset,
    options: SessionOptions,
    comparisons: Vec<ComparisonRecord>,
    planning_failures: Vec<TransferError>,
    exclusions: BTreeMap<String, BTreeSet<String>>,
    state: SessionState,
}

impl ImportSession {
    /// Plans the import and opens the review sequence. Exclusion maps are
    /// seeded from each comparison's auto-excluded set. Fails when not a
    /// single target table could be planned.
    pub async fn begin(
        backend: DbPool,
        tunnel: Option<SshTunnel>,
        source: SourceDataset,
        selection: TargetSelection,
        options: SessionOptions,
    ) -> Result<ImportSession> {
        let planned = planner::plan(&source, &selection, &backend).await;

        let mut comparisons = Vec::new();
        let mut planning_failures = Vec::new();
        for step in planned {
            match step {
                Ok(record) => comparisons.push(record),
                Err(err) => {
                    log::warn!("planning failed: {err}");
                    planning_failures.push(err);
                }
            }
        }

        if comparisons.is_empty() {
            backend.close().await;
            return Err(TransferError::ValidationError(
                "no importable units remain after planning".to_string(),
            ));
        }

        let exclusions = comparisons
            .iter()
            .map(|record| (record.target_table.clone(), record.auto_excluded.clone()))
            .collect();

        Ok(ImportSession {
            backend,
            _tunnel: tunnel,
            source,
            options,
            comparisons,
            planning_failures,
            exclusions,
            state: SessionState::AwaitingConfirmation(0),
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn comparisons(&self) -> &[ComparisonRecord] {
        &self.comparisons
    }

    pub fn planning_failures(&self) -> &[TransferError] {
        &self.planning_failures
    }

    /// The comparison under review, while one is.
    pub fn current(&self) -> Option<&ComparisonRecord> {
        match self.state {
            SessionState::AwaitingConfirmation(i) => self.comparisons.get(i),
            SessionState::Committing => None,
        }
    }

    /// Exclusions currently in effect for a table (auto-suggested plus
    /// operator edits).
    pub fn exclusions_for(&self, table: &str) -> BTreeSet<String> {
        self.exclusions.get(table).cloned().unwrap_or_default()
    }

    /// Replaces the exclusion set for the comparison under review. The
    /// set may only name fields present in the source field list, which
    /// is also how an auto-excluded field gets re-included: confirm with
    /// a set that omits it.
    pub fn set_exclusions(&mut self, fields: BTreeSet<String>) -> Result<()> {
        let SessionState::AwaitingConfirmation(i) = self.state else {
            return Err(TransferError::ValidationError(
                "no comparison is under review".to_string(),
            ));
        };
        let record = &self.comparisons[i];

        let normalized: BTreeSet<String> = fields.iter().map(|f| normalize(f)).collect();
        let unknown: Vec<&String> = normalized
            .iter()
            .filter(|f| !record.source_fields.contains(f))
            .collect();
        if !unknown.is_empty() {
            return Err(TransferError::ValidationError(format!(
                "excluded field(s) not in source '{}': {}",
                record.target_table,
                unknown
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        self.exclusions
            .insert(record.target_table.clone(), normalized);
        Ok(())
    }

    /// Confirms the comparison under review and moves to the next one, or
    /// to the commit phase after the last.
    pub fn confirm(&mut self) -> Result<SessionState> {
        let SessionState::AwaitingConfirmation(i) = self.state else {
            return Err(TransferError::ValidationError(
                "session is already past review".to_string(),
            ));
        };
        self.state = if i + 1 < self.comparisons.len() {
            SessionState::AwaitingConfirmation(i + 1)
        } else {
            SessionState::Committing
        };
        Ok(self.state)
    }

    /// Writes every confirmed table in plan order, then tears the session
    /// down. A per-table failure skips that table and the rest proceed,
    /// except a collation mismatch on a single-table session, which
    /// aborts the whole operation.
    pub async fn commit(self) -> Result<SessionOutcome> {
        if self.state != SessionState::Committing {
            self.backend.close().await;
            return Err(TransferError::ValidationError(
                "not every comparison has been confirmed".to_string(),
            ));
        }

        let single_table = self.comparisons.len() == 1;
        let mut reports = Vec::new();
        let mut failures = Vec::new();

        for record in &self.comparisons {
            let result = self.write_one(record).await;
            match result {
                Ok(report) => reports.push(report),
                Err(err @ TransferError::CollationMismatch { .. }) if single_table => {
                    self.backend.close().await;
                    return Err(err);
                }
                Err(err) => {
                    log::error!("import into '{}' failed: {err}", record.target_table);
                    failures.push((record.target_table.clone(), err));
                }
            }
        }

        self.backend.close().await;
        Ok(SessionOutcome { reports, failures })
    }

    /// Cancels the session and releases its resources.
    pub async fn abort(self) {
        log::info!("import session aborted");
        self.backend.close().await;
    }

    async fn write_one(&self, record: &ComparisonRecord) -> Result<TableWriteReport> {
        let data = self.source.table_for_unit(record.source_unit.as_deref())?;
        let opts = WriteOptions {
            mode: self.options.mode,
            excluded_fields: self.exclusions_for(&record.target_table),
            desired_collation: self.options.desired_collation.clone(),
            stop_on_mismatch: self.options.stop_on_mismatch,
        };
        executor::write_table(&self.backend, &record.target_table, data, &opts).await
    }
}

#[cfg(test)]
mod tests;
