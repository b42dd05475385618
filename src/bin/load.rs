use anyhow::{Context, Result};
use clap::Parser;
use finbot::db::{migrate, Db};
use finbot::load::{load_tables, read_tables};
use finbot::{graph, Config};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "load")]
#[command(about = "Load year × metric tables from JSON into the FinBot graph (safe to re-run)")]
struct Args {
    /// JSON file: array of {"<table name>": [[header...], [row...], ...]}
    input: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", config.finbot.log_level.as_str())
    ).init();

    log::info!("Starting FinBot load");
    log::info!("Database path: {}", config.db_path().display());

    let tables = read_tables(&args.input)
        .with_context(|| format!("Failed to read tables from {}", args.input.display()))?;
    log::info!("Read {} table group(s) from {}", tables.len(), args.input.display());

    let db = Db::open(config.db_path())?;
    let migrations_dir = config.migrations_dir().to_path_buf();
    db.with_connection(move |conn| migrate::run_migrations(conn, &migrations_dir))
        .await?;

    let start = Instant::now();
    let report = load_tables(&db, &tables).await?;
    let total = graph::count_facts(&db).await?;

    log::info!("=== Load Complete ===");
    log::info!("Tables: {}", report.tables);
    log::info!("Rows loaded: {} (skipped: {})", report.rows_loaded, report.rows_skipped);
    log::info!("Facts merged: {} (non-numeric cells dropped: {})", report.facts_upserted, report.cells_dropped);
    log::info!("Facts in graph: {}", total);
    log::info!("Time: {:?}", start.elapsed());

    db.close()?;
    Ok(())
}
