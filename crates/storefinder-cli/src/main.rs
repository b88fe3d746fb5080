//! storefinder: operator tool for the store catalog.
//!
//! Runs catalog queries and maintenance against the configured database and
//! prints results as JSON.
//!
//! Environment variables:
//!   DATABASE_URL, PHOTO_STORAGE_PATH, PHOTO_MAX_WIDTH, PHOTO_MAX_BYTES,
//!   DB_MAX_CONNECTIONS - catalog configuration (see `CatalogConfig`)
//!   LOG_FORMAT         - "json" or "text" (default: "text")
//!   LOG_FILE           - path to log file (optional, daily rotation)
//!   RUST_LOG           - standard env filter (default: "storefinder=info")

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefinder_db::defaults::{NEAR_LIMIT, NEAR_MAX_DISTANCE_M, SEARCH_LIMIT, TOP_RATED_LIMIT};
use storefinder_db::{
    Catalog, CatalogConfig, GeoSearch, ListStoresRequest, NearQuery, PhotoUpload,
    RatingAggregator, StoreRepository, StoreSearch, TagAggregator,
};

#[derive(Parser)]
#[command(name = "storefinder")]
#[command(author, version, about = "Store catalog operations")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,

    /// Stores near a point, nearest first
    Near {
        /// Longitude of the query point
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,

        /// Latitude of the query point
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Search radius in meters
        #[arg(short = 'd', long, default_value_t = NEAR_MAX_DISTANCE_M)]
        max_distance: f64,

        /// Maximum number of results
        #[arg(short, long, default_value_t = NEAR_LIMIT)]
        limit: i64,
    },

    /// Full-text search over store names and descriptions
    Search {
        /// Search terms
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value_t = SEARCH_LIMIT)]
        limit: i64,
    },

    /// Tag usage counts, most used first
    Tags,

    /// Stores ranked by average review rating
    Top {
        /// Maximum number of results
        #[arg(short, long, default_value_t = TOP_RATED_LIMIT)]
        limit: i64,
    },

    /// One store with its author and reviews
    Show {
        /// Store slug
        slug: String,
    },

    /// Stores newest first, one page at a time
    List {
        /// Page number (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: i64,
    },

    /// Resize and store a photo, printing the generated filename
    IngestPhoto {
        /// Image file to ingest
        path: PathBuf,

        /// Declared MIME type (sniffed from the file when omitted)
        #[arg(short, long)]
        mime: Option<String>,
    },
}

/// Initialise tracing from LOG_FORMAT / LOG_FILE / RUST_LOG.
///
/// The returned guard must live until exit so buffered file output is
/// flushed.
fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "storefinder=info,storefinder_db=info".into());
    let registry = tracing_subscriber::registry().with(env_filter);

    if let Some(ref path) = log_file {
        let file_dir = Path::new(path).parent().unwrap_or(Path::new("."));
        let file_name = Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("storefinder.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
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
                        .with_ansi(false)
                        .with_writer(non_blocking),
                )
                .init();
        }
        Some(guard)
    } else {
        // Logs go to stderr so stdout stays clean JSON.
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

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = init_logging();
    let cli = Cli::parse();

    let config = CatalogConfig::from_env().context("loading configuration")?;
    info!(
        subsystem = "cli",
        photo_storage_path = %config.photo_storage_path.display(),
        max_connections = config.db_max_connections,
        "Configuration loaded"
    );

    let catalog = Catalog::from_config(&config)
        .await
        .context("connecting to the catalog database")?;

    match cli.command {
        Commands::Migrate => {
            catalog.migrate().await?;
            info!(subsystem = "cli", op = "migrate", "Migrations applied");
            print_json(&json!({ "migrated": true }))?;
        }
        Commands::Near {
            lng,
            lat,
            max_distance,
            limit,
        } => {
            let query = NearQuery::around(lng, lat).within(max_distance).limit(limit);
            print_json(&catalog.geo.find_near(query).await?)?;
        }
        Commands::Search { query, limit } => {
            print_json(&catalog.search.search(&query, limit).await?)?;
        }
        Commands::Tags => {
            print_json(&catalog.tags.tag_counts().await?)?;
        }
        Commands::Top { limit } => {
            print_json(&catalog.ratings.top_rated(limit).await?)?;
        }
        Commands::Show { slug } => match catalog.stores.find_by_slug(&slug).await? {
            Some(detail) => print_json(&detail)?,
            None => bail!("no store with slug {:?}", slug),
        },
        Commands::List { page } => {
            print_json(&catalog.stores.list(ListStoresRequest::page(page)).await?)?;
        }
        Commands::IngestPhoto { path, mime } => {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            let mime = match mime {
                Some(mime) => mime,
                None => infer::get(&bytes)
                    .map(|kind| kind.mime_type().to_string())
                    .with_context(|| format!("cannot detect the type of {}", path.display()))?,
            };
            let filename = catalog
                .photos()?
                .ingest(Some(PhotoUpload::new(bytes, mime)))
                .await?;
            print_json(&json!({ "photo": filename }))?;
        }
    }

    Ok(())
}
