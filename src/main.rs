use clap::{Args, Parser, Subcommand, ValueEnum};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::process::ExitCode;
use tabferry::config::{self, ConnectionProfile};
use tabferry::export::{self, ExportScope};
use tabferry::import::normalizer::normalize;
use tabferry::import::{
    FieldStatus, ImportSession, SessionOptions, SessionState, TargetSelection, WriteMode,
};
use tabferry::source::SourceDataset;
use tabferry::ssh_tunnel::SshTunnel;
use tabferry::{mysql, sqlite, DbPool, Result, TransferError};

#[derive(Parser)]
#[command(name = "tabferry", version, about = "Move tabular data between MySQL/SQLite and xlsx/JSON collection files")]
struct Cli {
    #[command(flatten)]
    backend: BackendArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct BackendArgs {
    /// MySQL database name; connection settings come from MYSQL_* (or
    /// PROD_MYSQL_* with --prod) environment variables.
    #[arg(long, global = true, conflicts_with = "sqlite")]
    database: Option<String>,

    /// Path to a SQLite database file instead of MySQL.
    #[arg(long, global = true)]
    sqlite: Option<PathBuf>,

    /// Use the PROD_-prefixed connection variables.
    #[arg(long, global = true)]
    prod: bool,

    /// Route the MySQL connection through the SSH tunnel configured via
    /// SSH_HOST / SSH_USER / SSH_BIND_PORT.
    #[arg(long, global = true)]
    tunnel: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Preview the reconciliation plan for a source file without writing.
    Plan {
        /// Source file: .xlsx/.xls workbook or JSON collection.
        source: PathBuf,
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Import a source file into the database.
    Import {
        source: PathBuf,
        #[command(flatten)]
        target: TargetArgs,
        #[arg(long, value_enum, default_value = "append")]
        mode: ModeArg,
        /// Exclude a field, either globally (`field`) or per table
        /// (`table:field`). Repeatable; adds to the auto-exclusions.
        #[arg(long = "exclude", value_name = "[TABLE:]FIELD")]
        excludes: Vec<String>,
        /// Re-include a field the planner auto-excluded. Repeatable.
        #[arg(long = "include", value_name = "FIELD")]
        includes: Vec<String>,
        /// Desired collation for created or replaced tables (MySQL).
        #[arg(long)]
        collation: Option<String>,
        /// Abort a table write when the existing collation differs from
        /// the requested one.
        #[arg(long)]
        stop_on_mismatch: bool,
    },
    /// Export a table, a query result, or the whole database to a file.
    Export {
        #[command(flatten)]
        scope: ScopeArgs,
        /// Output path; extension selects the codec (.xlsx or .json).
        /// Defaults to `<scope>.xlsx` in the working directory.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// List the collations the server offers (MySQL).
    Collations,
}

#[derive(Args)]
struct TargetArgs {
    /// Target table name (single-table import).
    #[arg(long, conflicts_with = "all_units")]
    table: Option<String>,

    /// Source unit (sheet or collection key) to read; defaults to the
    /// first unit.
    #[arg(long, requires = "table")]
    unit: Option<String>,

    /// Import every unit, deriving each target table from its unit name.
    #[arg(long)]
    all_units: bool,
}

#[derive(Args)]
struct ScopeArgs {
    /// Export one table.
    #[arg(long, conflicts_with_all = ["query", "all_tables"])]
    table: Option<String>,

    /// Export the result of a SQL query.
    #[arg(long, conflicts_with = "all_tables")]
    query: Option<String>,

    /// Export every table.
    #[arg(long)]
    all_tables: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Replace,
    Append,
}

impl From<ModeArg> for WriteMode {
    fn from(mode: ModeArg) -> WriteMode {
        match mode {
            ModeArg::Replace => WriteMode::Replace,
            ModeArg::Append => WriteMode::Append,
        }
    }
}

impl TargetArgs {
    fn selection(&self) -> Result<TargetSelection> {
        if self.all_units {
            return Ok(TargetSelection::AllUnits);
        }
        match &self.table {
            Some(table) => Ok(TargetSelection::Single {
                unit: self.unit.clone(),
                table: table.clone(),
            }),
            None => Err(TransferError::ValidationError(
                "a target table is required unless --all-units is set".to_string(),
            )),
        }
    }
}

impl ScopeArgs {
    fn scope(&self) -> Result<ExportScope> {
        if self.all_tables {
            return Ok(ExportScope::Database);
        }
        if let Some(table) = &self.table {
            return Ok(ExportScope::Table(table.clone()));
        }
        if let Some(query) = &self.query {
            return Ok(ExportScope::Query(query.clone()));
        }
        Err(TransferError::ValidationError(
            "one of --table, --query, --all-tables is required".to_string(),
        ))
    }
}

/// A connected backend plus the tunnel keeping it reachable, if any.
struct Connection {
    pool: DbPool,
    tunnel: Option<SshTunnel>,
    /// Label used for default output names.
    label: String,
}

async fn connect(args: &BackendArgs) -> Result<Connection> {
    if let Some(path) = &args.sqlite {
        let label = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "sqlite".to_string());
        let pool = sqlite::create_pool(&path.to_string_lossy()).await?;
        return Ok(Connection {
            pool: DbPool::Sqlite(pool),
            tunnel: None,
            label,
        });
    }

    let Some(database) = &args.database else {
        return Err(TransferError::ValidationError(
            "either --database or --sqlite is required".to_string(),
        ));
    };
    let profile = config::mysql_profile(database, args.prod)?;

    let (profile, tunnel) = if args.tunnel {
        let settings = config::tunnel_settings()?.ok_or_else(|| {
            TransferError::ConfigurationMissing(
                "SSH_HOST is required with --tunnel".to_string(),
            )
        })?;
        let tunnel = SshTunnel::open(&settings, &profile.host, profile.port)?;
        let local = ConnectionProfile {
            host: "127.0.0.1".to_string(),
            port: tunnel.local_port(),
            ..profile
        };
        (local, Some(tunnel))
    } else {
        (profile, None)
    };

    log::info!("connecting to {}", profile.display_target());
    let pool = mysql::create_pool(&profile).await?;
    Ok(Connection {
        pool: DbPool::MySql(pool),
        tunnel,
        label: profile.database.clone(),
    })
}

/// Splits `--exclude` values into the per-table exclusion map. A bare
/// field name applies to every planned table. Table keys are normalized
/// so they line up with the target-table names the planner produces.
fn parse_excludes(raw: &[String]) -> (BTreeSet<String>, BTreeMap<String, BTreeSet<String>>) {
    let mut global = BTreeSet::new();
    let mut per_table: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for entry in raw {
        match entry.split_once(':') {
            Some((table, field)) => {
                per_table
                    .entry(normalize(table))
                    .or_default()
                    .insert(field.to_string());
            }
            None => {
                global.insert(entry.clone());
            }
        }
    }
    (global, per_table)
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Plan { source, target } => {
            let selection = target.selection()?;
            let connection = connect(&cli.backend).await?;
            let source = SourceDataset::load(&source)?;

            let planned =
                tabferry::import::planner::plan(&source, &selection, &connection.pool).await;
            connection.pool.close().await;

            for step in &planned {
                match step {
                    Ok(record) => {
                        println!("{}", serde_json::to_string_pretty(record).unwrap_or_default())
                    }
                    Err(err) => eprintln!("plan step failed: {err}"),
                }
            }
            if planned.iter().all(|step| step.is_err()) {
                return Err(TransferError::ValidationError(
                    "no importable units remain after planning".to_string(),
                ));
            }
            Ok(())
        }
        Command::Import {
            source,
            target,
            mode,
            excludes,
            includes,
            collation,
            stop_on_mismatch,
        } => {
            let selection = target.selection()?;
            let connection = connect(&cli.backend).await?;
            let source = SourceDataset::load(&source)?;

            let options = SessionOptions {
                mode: mode.into(),
                desired_collation: collation,
                stop_on_mismatch,
            };
            let mut session = ImportSession::begin(
                connection.pool,
                connection.tunnel,
                source,
                selection,
                options,
            )
            .await?;

            let (global, per_table) = parse_excludes(&excludes);
            loop {
                let Some(record) = session.current() else { break };
                let table = record.target_table.clone();
                log::info!(
                    "{table}: both [{}], source-only [{}], destination-only [{}]",
                    record.fields_with_status(FieldStatus::Both).join(", "),
                    record.fields_with_status(FieldStatus::SourceOnly).join(", "),
                    record.fields_with_status(FieldStatus::DestinationOnly).join(", ")
                );
                if !global.is_empty() || !includes.is_empty() || per_table.contains_key(&table) {
                    let mut fields = session.exclusions_for(&table);
                    fields.extend(global.iter().cloned());
                    if let Some(extra) = per_table.get(&table) {
                        fields.extend(extra.iter().cloned());
                    }
                    for field in &includes {
                        fields.remove(&normalize(field));
                    }
                    session.set_exclusions(fields)?;
                }
                if session.confirm()? == SessionState::Committing {
                    break;
                }
            }

            let outcome = session.commit().await?;
            for report in &outcome.reports {
                println!(
                    "{}: {} row(s) written ({:?}){}",
                    report.table,
                    report.rows_written,
                    report.action,
                    if report.dropped_columns.is_empty() {
                        String::new()
                    } else {
                        format!(", dropped: {}", report.dropped_columns.join(", "))
                    }
                );
            }
            for (table, err) in &outcome.failures {
                eprintln!("{table}: {err}");
            }
            if outcome.failures.is_empty() {
                Ok(())
            } else {
                Err(TransferError::ValidationError(format!(
                    "{} of {} table(s) failed",
                    outcome.failures.len(),
                    outcome.failures.len() + outcome.reports.len()
                )))
            }
        }
        Command::Export { scope, output } => {
            let scope = scope.scope()?;
            let connection = connect(&cli.backend).await?;

            let data = export::extract(&connection.pool, &scope).await?;
            connection.pool.close().await;

            let stem = scope.default_file_stem(&connection.label);
            let path = output.unwrap_or_else(|| PathBuf::from(format!("{stem}.xlsx")));
            export::write_dataset(&path, &stem, &data)?;
            println!("wrote {}", path.display());
            Ok(())
        }
        Command::Collations => {
            let connection = connect(&cli.backend).await?;
            let collations = match &connection.pool {
                DbPool::MySql(pool) => mysql::list_collations(pool).await?,
                DbPool::Sqlite(_) => {
                    return Err(TransferError::ValidationError(
                        "collation listing is a MySQL feature".to_string(),
                    ))
                }
            };
            connection.pool.close().await;
            for name in collations {
                println!("{name}");
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclude_table_keys_are_normalized() {
        let raw = vec!["Order Items:id".to_string(), "notes".to_string()];
        let (global, per_table) = parse_excludes(&raw);

        assert!(global.contains("notes"));
        let fields = per_table.get("order_items").expect("normalized key");
        assert!(fields.contains("id"));
        assert!(!per_table.contains_key("Order Items"));
    }
}
