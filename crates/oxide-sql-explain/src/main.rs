//! oxide-sql-explain CLI
//!
//! Compiles a SQL script against a JSON catalog and prints what each
//! statement reads, writes and depends on.

use std::io::Read;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use oxide_sql_explain::{explain, load_catalog, load_config, StatementReport};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Text,
    Json,
}

/// Compile SQL against a catalog and explain the statements.
#[derive(Parser)]
#[command(name = "oxide-sql-explain")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// SQL script to compile (stdin if not specified).
    sql: Option<PathBuf>,

    /// Catalog JSON describing schemas, tables, sequences and principals.
    #[arg(short, long, env = "OXIDE_SQL_CATALOG")]
    catalog: Option<PathBuf>,

    /// Compiler settings JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, value_enum, default_value = "text")]
    format: Format,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let catalog = load_catalog(cli.catalog.as_deref())?;
    let config = load_config(cli.config.as_deref())?;
    let sql = match &cli.sql {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut sql = String::new();
            std::io::stdin().read_to_string(&mut sql)?;
            sql
        }
    };
    debug!(bytes = sql.len(), tables = catalog.tables.len(), "loaded inputs");

    let statements = explain(&sql, &catalog, config)?;
    let reports: Vec<StatementReport> = statements.iter().map(StatementReport::from).collect();

    match cli.format {
        Format::Text => {
            for report in &reports {
                println!("{report}");
            }
        }
        Format::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
    }

    Ok(())
}
