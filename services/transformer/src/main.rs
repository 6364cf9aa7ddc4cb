//! Transformer CLI - Builds the movies warehouse from a raw snapshot
//!
//! Usage:
//!   # Transform a snapshot and write silver/gold tables:
//!   cargo run --bin transformer -- run --input data/raw/imdb_movies.csv
//!
//!   # Also write search documents, fail on bad values:
//!   cargo run --bin transformer -- run --input movies.xlsx --strict --search-docs
//!
//!   # Query previously written search documents:
//!   cargo run --bin transformer -- search --documents data/warehouse/movie_documents.json --query heat

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use transformer::config::DEFAULT_DATE_FORMAT;
use transformer::search::DOCUMENTS_FILE;
use transformer::source::{load_snapshot, Snapshot};
use transformer::{
    build_documents, transform, write_warehouse, MovieDocument, MovieFilter, RunManifest,
    TransformConfig, Warehouse,
};

#[derive(Parser, Debug)]
#[command(name = "transformer", about = "Builds the movies warehouse from raw snapshots")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Transform a snapshot into silver and gold tables
    Run(RunArgs),
    /// Filter search documents written by a previous run
    Search(SearchArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Snapshot file (csv, json, xls, xlsx, xlsb, ods)
    #[arg(long)]
    input: PathBuf,

    /// Output directory (overrides OUTPUT_DIR)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Fail on unparseable values and unresolved references
    #[arg(long, default_value = "false")]
    strict: bool,

    /// Release date format (overrides DATE_FORMAT)
    #[arg(long)]
    date_format: Option<String>,

    /// Dry run - transform and report, write nothing
    #[arg(long, default_value = "false")]
    dry_run: bool,

    /// Also write movie search documents
    #[arg(long, default_value = "false")]
    search_docs: bool,
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Search documents file
    #[arg(long)]
    documents: PathBuf,

    /// Text in name, original title or overview
    #[arg(long)]
    query: Option<String>,

    #[arg(long)]
    country: Option<String>,

    #[arg(long)]
    language: Option<String>,

    #[arg(long)]
    min_score: Option<f64>,

    /// Earliest release date (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Latest release date (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,

    #[arg(long)]
    limit: Option<usize>,

    #[arg(long, default_value = "0")]
    offset: usize,
}

/// Environment configuration
struct Config {
    output_dir: PathBuf,
    date_format: String,
    strict: bool,
}

impl Config {
    fn from_env() -> Result<Self> {
        Ok(Self {
            output_dir: PathBuf::from(
                std::env::var("OUTPUT_DIR").unwrap_or_else(|_| "./data/warehouse".to_string()),
            ),
            date_format: std::env::var("DATE_FORMAT")
                .unwrap_or_else(|_| DEFAULT_DATE_FORMAT.to_string()),
            strict: match std::env::var("STRICT_MODE") {
                Ok(value) => parse_flag(&value)
                    .with_context(|| format!("STRICT_MODE must be true or false, got '{}'", value))?,
                Err(_) => false,
            },
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

fn print_summary(warehouse: &Warehouse) {
    println!("\n{:-<60}", "");
    println!("Input rows: {}", warehouse.stats.input_rows);
    println!("Movies: {}", warehouse.stats.movies);
    println!("Dropped references: {}", warehouse.stats.dropped_references);
    println!("\nSilver:");
    for (table, rows) in warehouse.silver.row_counts() {
        println!("  {:<28} {:>8}", table, rows);
    }
    println!("Gold:");
    for (table, rows) in warehouse.gold.row_counts() {
        println!("  {:<28} {:>8}", table, rows);
    }
    println!("{:-<60}", "");
}

async fn run(args: RunArgs, config: Config) -> Result<()> {
    let started_at = Utc::now();
    let output_dir = args.output_dir.unwrap_or(config.output_dir);
    let strict = args.strict || config.strict;

    let mut transform_config = if strict {
        TransformConfig::strict()
    } else {
        TransformConfig::default()
    };
    transform_config =
        transform_config.with_date_format(args.date_format.unwrap_or(config.date_format));

    println!("=== Movies Warehouse Transformer ===");
    println!("Input: {}", args.input.display());
    println!("Output: {}", output_dir.display());
    println!("Mode: {}", if args.dry_run { "dry-run" } else { "live" });
    println!("Policy: {}", if strict { "strict" } else { "lenient" });

    let bytes = fs::read(&args.input)
        .await
        .with_context(|| format!("Failed to read snapshot {}", args.input.display()))?;
    println!("Content size: {} bytes", bytes.len());

    let Snapshot {
        table,
        content_hash,
        ..
    } = load_snapshot(&args.input, &bytes, &transform_config.date_format).context("Failed to load snapshot")?;
    println!("Hash: {}", content_hash);

    let warehouse = transform(table, &transform_config).context("Transformation failed")?;
    print_summary(&warehouse);

    if args.dry_run {
        println!("Dry run - nothing written");
        return Ok(());
    }

    let manifest = RunManifest::new(
        started_at,
        args.input.display().to_string(),
        content_hash,
        transform_config.is_strict(),
        transform_config.date_format.clone(),
        &warehouse,
    );
    let written = write_warehouse(&output_dir, &warehouse, &manifest)
        .with_context(|| format!("Failed to write warehouse to {}", output_dir.display()))?;
    println!("Wrote {} files (run {})", written.len(), manifest.run_id);

    if args.search_docs {
        let documents = build_documents(&warehouse.silver);
        let path = output_dir.join(DOCUMENTS_FILE);
        fs::write(&path, serde_json::to_vec_pretty(&documents)?)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Wrote {} search documents to {}", documents.len(), path.display());
    }

    Ok(())
}

async fn load_documents(path: &Path) -> Result<Vec<MovieDocument>> {
    let bytes = fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_slice(&bytes).context("Invalid search documents file")
}

async fn search(args: SearchArgs) -> Result<()> {
    let documents = load_documents(&args.documents).await?;

    let filter = MovieFilter {
        query: args.query,
        country: args.country,
        language: args.language,
        min_score: args.min_score,
        from: args.from,
        to: args.to,
        offset: args.offset,
        limit: args.limit,
    };
    let page = filter.apply(&documents);
    tracing::debug!(documents = documents.len(), matched = page.len(), "search done");

    let output = serde_json::json!({
        "offset": filter.offset,
        "limit": filter.effective_limit(),
        "movies": page,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "transformer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    execute(cli.command).await
}

/// Environment configuration is only read by `run`.
async fn execute(command: Commands) -> Result<()> {
    match command {
        Commands::Run(args) => run(args, Config::from_env()?).await,
        Commands::Search(args) => search(args).await,
    }
}
