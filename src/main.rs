mod catalog;
mod config;
mod db;
mod error;
mod ingest;
mod models;
mod report;
mod shell;
mod validate;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use catalog::{HeadHunterClient, DEFAULT_API_URL};
use config::{DbConfig, DEFAULT_DB_NAME};
use db::Store;
use ingest::{IngestStats, Ingester};
use shell::Shell;

#[derive(Parser)]
#[command(name = "hhdb")]
#[command(about = "Load employers and vacancies from hh.ru into a local database and query them")]
struct Cli {
    /// Database name (file stem of the database file)
    #[arg(long, env = "DB_NAME", default_value = DEFAULT_DB_NAME, global = true)]
    db_name: String,

    /// Directory holding the database file
    #[arg(long, env = "DB_DIR", global = true)]
    db_dir: Option<PathBuf>,

    /// Base URL of the catalog API
    #[arg(long, env = "HH_API_URL", default_value = DEFAULT_API_URL, global = true)]
    api_url: String,

    /// Print query results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Without a command: load from the catalog, then open the console
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and tables
    Init,

    /// Load employers and their postings from the catalog
    Load {
        /// Employer search text (repeatable); defaults to the built-in list
        #[arg(short, long = "query")]
        queries: Vec<String>,
    },

    /// Employers with their number of postings
    Companies,

    /// All postings with employer names
    Vacancies,

    /// Average midpoint salary
    AvgSalary,

    /// Postings paid above the average
    AboveAverage,

    /// Postings whose name contains a keyword (case-insensitive)
    Search {
        /// Keyword to look for; empty matches everything
        #[arg(default_value = "")]
        keyword: String,
    },

    /// Interactive console without loading
    Shell,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();

    let config = DbConfig::new(&cli.db_name, cli.db_dir.clone())?;
    let mut store = Store::open(&config).with_context(|| {
        format!(
            "Failed to open database '{}' in {}",
            config.name(),
            config.dir().display()
        )
    })?;

    let result = run(cli, &store);

    if let Err(err) = store.close() {
        warn!(error = %err, "failed to close database");
    }
    result
}

fn run(cli: Cli, store: &Store) -> Result<()> {
    let mut out = io::stdout().lock();

    match cli.command {
        None => {
            let stats = load(store, &cli.api_url, Vec::new())?;
            print_stats(&mut out, &stats)?;
            drop(out);
            Shell::new(store, io::stdin().lock(), io::stdout()).run()?;
        }

        Some(Commands::Init) => {
            let (employers, postings) = store.counts()?;
            writeln!(
                out,
                "Database ready at {} ({} employers, {} postings)",
                store.path().display(),
                employers,
                postings
            )?;
        }

        Some(Commands::Load { queries }) => {
            let stats = load(store, &cli.api_url, queries)?;
            print_stats(&mut out, &stats)?;
        }

        Some(Commands::Companies) => {
            let rows = store.count_postings_by_employer()?;
            if cli.json {
                print_json(&mut out, &rows)?;
            } else {
                report::employer_counts(&mut out, &rows)?;
            }
        }

        Some(Commands::Vacancies) => {
            let rows = store.list_all_postings()?;
            if cli.json {
                print_json(&mut out, &rows)?;
            } else {
                report::listings(&mut out, &rows)?;
            }
        }

        Some(Commands::AvgSalary) => {
            let avg = store.average_salary()?;
            if cli.json {
                print_json(&mut out, &avg)?;
            } else {
                writeln!(out, "Average salary: {}", report::average(avg))?;
            }
        }

        Some(Commands::AboveAverage) => {
            let rows = store.list_above_average_salary()?;
            if cli.json {
                print_json(&mut out, &rows)?;
            } else {
                report::summaries(&mut out, &rows)?;
            }
        }

        Some(Commands::Search { keyword }) => {
            let rows = store.list_by_keyword(&keyword)?;
            if cli.json {
                print_json(&mut out, &rows)?;
            } else {
                report::summaries(&mut out, &rows)?;
            }
        }

        Some(Commands::Shell) => {
            drop(out);
            Shell::new(store, io::stdin().lock(), io::stdout()).run()?;
        }
    }

    Ok(())
}

fn load(store: &Store, api_url: &str, queries: Vec<String>) -> Result<IngestStats> {
    let client = if queries.is_empty() {
        HeadHunterClient::with_default_queries(api_url)?
    } else {
        HeadHunterClient::new(api_url, queries)?
    };
    Ingester::new(client)
        .run(store)
        .context("Ingestion aborted")
}

fn print_stats(out: &mut impl Write, stats: &IngestStats) -> io::Result<()> {
    writeln!(
        out,
        "Employers: {} fetched, {} new, {} already stored, {} skipped",
        stats.employers_fetched,
        stats.employers_inserted,
        stats.employers_existing,
        stats.employers_rejected + stats.employers_failed
    )?;
    writeln!(
        out,
        "Postings:  {} fetched, {} new, {} already stored, {} skipped",
        stats.postings_fetched,
        stats.postings_inserted,
        stats.postings_existing,
        stats.postings_rejected + stats.postings_failed
    )?;
    if stats.posting_fetch_failures > 0 {
        writeln!(
            out,
            "Posting fetch failed for {} employer(s)",
            stats.posting_fetch_failures
        )?;
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(out: &mut impl Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
