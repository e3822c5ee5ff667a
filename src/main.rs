use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use meter_readings::journal::JournalStore;
use meter_readings::parser::parse_accounts;
use meter_readings::{IngestionEngine, MemoryStore, ReadingStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Validate and ingest meter reading uploads
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Account seed CSV (AccountId,FirstName,LastName)
    #[arg(long)]
    accounts: PathBuf,

    /// Reading journal to load and append to; readings stay in memory if omitted
    #[arg(long)]
    journal: Option<PathBuf>,

    /// Remove every stored reading before ingesting
    #[arg(long)]
    clear: bool,

    /// Meter reading CSV files, ingested in order
    #[arg(required = true)]
    readings: Vec<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let seed = File::open(&args.accounts)
        .with_context(|| format!("Failed to open accounts file '{}'", args.accounts.display()))?;
    let accounts = parse_accounts(seed).context("Failed to load accounts")?;
    info!(count = accounts.len(), "loaded accounts");

    match &args.journal {
        Some(path) => {
            let store = JournalStore::open(path, accounts)
                .with_context(|| format!("Failed to open journal '{}'", path.display()))?;
            run(IngestionEngine::new(store), &args)
        }
        None => run(IngestionEngine::new(MemoryStore::with_accounts(accounts)), &args),
    }
}

fn run<S: ReadingStore>(mut engine: IngestionEngine<S>, args: &Args) -> Result<()> {
    if args.clear {
        engine
            .clear_all()
            .context("Failed to clear meter readings")?;
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();

    for path in &args.readings {
        let file = File::open(path)
            .with_context(|| format!("Failed to open readings file '{}'", path.display()))?;
        let result = engine.ingest(file);

        serde_json::to_writer(&mut out, &result).context("Failed to write batch result")?;
        writeln!(out)?;
    }

    Ok(())
}
