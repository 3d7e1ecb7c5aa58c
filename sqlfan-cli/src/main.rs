//! sqlfan CLI - run independent SQL queries concurrently against SQLite
//!
//! Subcommands:
//! - `seed` creates the demo users table and reference rows
//! - `fetch` fans queries out concurrently and prints results in input order
//! - `stream` pages lazily through one query's results

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use sqlfan_core::{
    fetch_concurrently_with, FetchOptions, Query, QueryPager, SqliteStore, Value,
};
use tracing::info;

mod config;
mod output;
mod tracing_setup;

use output::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "sqlfan",
    author,
    version,
    about = "Run independent SQL queries concurrently against a SQLite database",
    long_about = "Fan out independent read queries against one SQLite database, each over \
                  its own short-lived connection, and print the results in input order."
)]
struct Cli {
    /// Suppress progress spinners (for script consumption)
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Database file (overrides config; defaults to ./example.db)
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the demo users table and insert the reference rows
    Seed,
    /// Run queries concurrently, printing result sets in input order
    Fetch(FetchArgs),
    /// Page lazily through one query's results
    Stream(StreamArgs),
}

#[derive(Parser, Debug)]
struct FetchArgs {
    /// Queries to run concurrently
    #[arg(required = true, value_name = "SQL")]
    queries: Vec<String>,

    /// JSON array of bound parameters for the nth query (repeatable)
    #[arg(long = "params", value_name = "JSON")]
    params: Vec<String>,

    /// Fail the whole fetch after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<f64>,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,
}

#[derive(Parser, Debug)]
struct StreamArgs {
    /// Query to page through (must not carry LIMIT/OFFSET)
    #[arg(value_name = "SQL")]
    query: String,

    /// Rows per page
    #[arg(long, default_value = "100")]
    page_size: u32,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::SqlfanConfig::load();

    tracing_setup::init(&tracing_setup::TracingConfig {
        debug: cli.debug,
        default_filter: cfg.log_level.clone(),
    })?;

    let db = cli
        .db
        .clone()
        .or(cfg.database)
        .unwrap_or_else(|| PathBuf::from("example.db"));

    match cli.command {
        Commands::Seed => seed(&db).await,
        Commands::Fetch(args) => fetch(&db, args, cli.quiet).await,
        Commands::Stream(args) => stream(&db, args).await,
    }
}

const SEED_ROWS: &[(&str, i64)] = &[
    ("Alice", 30),
    ("Bob", 45),
    ("Charlie", 25),
    ("Diana", 52),
    ("Eve", 38),
    ("Frank", 41),
];

async fn seed(db: &Path) -> Result<()> {
    let store = SqliteStore::new(db).create_if_missing(true);

    let mut statements = vec![Query::new(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            age INTEGER
        )",
    )];
    for (name, age) in SEED_ROWS {
        statements.push(
            Query::new("INSERT OR IGNORE INTO users (name, age) VALUES (?, ?)")
                .bind(*name)
                .bind(*age),
        );
    }

    let affected = store
        .execute_batch(&statements)
        .await
        .with_context(|| format!("seeding {} failed", db.display()))?;

    info!(db = %db.display(), rows = affected, "seed complete");
    println!("Seeded {} ({} rows written)", db.display(), affected);
    Ok(())
}

async fn fetch(db: &Path, args: FetchArgs, quiet: bool) -> Result<()> {
    let queries = build_queries(&args)?;
    let store = SqliteStore::new(db);
    let options = FetchOptions {
        timeout: args.timeout.map(Duration::from_secs_f64),
    };

    let pb = output::maybe_spinner(!quiet);
    if let Some(pb) = pb.as_ref() {
        pb.set_message(format!("running {} queries concurrently...", queries.len()));
    }

    let results = fetch_concurrently_with(&store, &queries, options).await;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let results =
        results.with_context(|| format!("concurrent fetch against {} failed", db.display()))?;
    output::render_results(&queries, &results, args.format)
}

async fn stream(db: &Path, args: StreamArgs) -> Result<()> {
    let store = SqliteStore::new(db);
    let mut pager = QueryPager::new(&store, Query::new(args.query), args.page_size);

    let mut page_no = 0usize;
    while let Some(page) = pager
        .next_page()
        .await
        .with_context(|| format!("paged fetch against {} failed", db.display()))?
    {
        page_no += 1;
        output::render_page(page_no, &page, args.format)?;
    }

    info!(pages = page_no, "stream complete");
    Ok(())
}

fn build_queries(args: &FetchArgs) -> Result<Vec<Query>> {
    if args.params.len() > args.queries.len() {
        bail!(
            "{} --params given for {} queries",
            args.params.len(),
            args.queries.len()
        );
    }

    let mut queries = Vec::with_capacity(args.queries.len());
    for (idx, sql) in args.queries.iter().enumerate() {
        let params = match args.params.get(idx) {
            Some(raw) => parse_params(raw)
                .with_context(|| format!("invalid --params for query {}", idx))?,
            None => Vec::new(),
        };
        queries.push(Query::with_params(sql.clone(), params));
    }
    Ok(queries)
}

fn parse_params(raw: &str) -> Result<Vec<Value>> {
    let json: Vec<serde_json::Value> =
        serde_json::from_str(raw).context("expected a JSON array")?;
    json.into_iter().map(json_to_value).collect()
}

fn json_to_value(value: serde_json::Value) -> Result<Value> {
    use serde_json::Value as Json;

    Ok(match value {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Integer(i64::from(b)),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else {
                Value::Real(n.as_f64().context("unrepresentable number")?)
            }
        }
        Json::String(s) => Value::Text(s),
        other => bail!("unsupported parameter: {}", other),
    })
}
