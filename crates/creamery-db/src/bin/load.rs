//! creamery-load: offline bulk ingestion of catalog products.
//!
//! Reads a JSON array of products and creates all of them in one
//! transaction. Either every product is loaded or none is.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use creamery_db::{CatalogRepository, Database, Item, Operation};

#[derive(Parser)]
#[command(name = "creamery-load")]
#[command(author, version, about = "Bulk load products into the creamery catalog")]
struct Cli {
    /// JSON file holding an array of products
    #[arg(short, long)]
    file: PathBuf,

    /// Database URL (default: DATABASE_URL, then sqlite://creamery.db)
    #[arg(short, long)]
    database_url: Option<String>,

    /// Create missing catalog tables before loading
    #[arg(long)]
    init_schema: bool,

    /// Sweep unreferenced lookup rows after loading
    #[arg(long)]
    sweep: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let _file_guard = init_tracing();

    let database_url = cli
        .database_url
        .clone()
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .unwrap_or_else(|| "sqlite://creamery.db".to_string());

    let items = read_items(&cli.file)?;
    let start = Instant::now();

    let db = Database::connect(&database_url)
        .await
        .with_context(|| format!("connecting to {}", database_url))?;
    if cli.init_schema {
        db.ensure_schema().await.context("creating catalog schema")?;
    }

    let count = items.len();
    let row_ids = db
        .catalog
        .bulk_load(items)
        .await
        .map_err(|e| anyhow::anyhow!("bulk load failed: {}", e.public_message()))?;

    let swept = if cli.sweep {
        Some(db.catalog.sweep().await.context("sweeping lookups")?)
    } else {
        None
    };

    info!(
        subsystem = "loader",
        op = Operation::BulkLoad.as_str(),
        item_count = count,
        duration_ms = start.elapsed().as_millis() as u64,
        "Load finished"
    );

    let output = serde_json::json!({
        "message": Operation::BulkLoad.success_message(),
        "loaded": row_ids.len(),
        "row_ids": row_ids,
        "swept": swept,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn read_items(path: &Path) -> anyhow::Result<Vec<Item>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let items: Vec<Item> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(items)
}

/// Initialize tracing.
///
/// Environment variables:
///   LOG_FORMAT  - "json" or "text" (default: "text")
///   LOG_FILE    - path to log file (optional, enables file logging)
///   RUST_LOG    - standard env filter (default: "creamery_db=info")
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "creamery_db=info,creamery_load=info".into());
    let registry = tracing_subscriber::registry().with(env_filter);

    if let Some(ref path) = log_file {
        let path = Path::new(path);
        let file_dir = path.parent().unwrap_or(Path::new("."));
        let file_name = path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("creamery-load.log");
        let file_appender = tracing_appender::rolling::never(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false),
                )
                .init();
        }
        Some(guard)
    } else {
        // stdout carries the JSON summary, logs go to stderr
        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        } else {
            registry
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
        None
    }
}
