//! # storefinder-db
//!
//! Persistence for the storefinder catalog.
//!
//! This crate provides:
//! - Connection pool management
//! - PostgreSQL + PostGIS implementations of the catalog traits
//! - An in-process [`MemoryCatalog`] implementing the same traits
//! - The photo ingestion pipeline and its filesystem storage backend
//! - Environment-driven configuration
//!
//! ## Example
//!
//! ```rust,ignore
//! use storefinder_db::{Catalog, CatalogConfig, GeoPoint, StoreInput, StoreRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let catalog = Catalog::from_config(&CatalogConfig::from_env()?).await?;
//!
//!     let store = catalog
//!         .stores
//!         .create(
//!             StoreInput::new("Cafe Luna", "12 Main St", GeoPoint::new(-79.4, 43.6)),
//!             author_id,
//!         )
//!         .await?;
//!
//!     println!("Created store: {}", store.slug);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod file_storage;
pub mod geo;
pub mod memory;
pub mod photos;
pub mod pool;
pub mod ratings;
pub mod reviews;
pub mod search;
pub mod stores;
pub mod tags;

// Always compiled so integration tests (in tests/) can share them.
pub mod test_fixtures;

// Re-export core types
pub use storefinder_core::*;

pub use config::CatalogConfig;
pub use file_storage::{FilesystemBackend, StorageBackend};
pub use geo::PgGeoSearch;
pub use memory::MemoryCatalog;
pub use photos::PhotoPipeline;
pub use pool::{connect_pool, PoolConfig};
pub use ratings::PgRatingAggregator;
pub use reviews::PgReviewRepository;
pub use search::PgStoreSearch;
pub use stores::PgStoreRepository;
pub use tags::PgTagAggregator;

/// Combined catalog context with all PostgreSQL repositories.
#[derive(Clone)]
pub struct Catalog {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    pub stores: PgStoreRepository,
    pub search: PgStoreSearch,
    pub geo: PgGeoSearch,
    pub tags: PgTagAggregator,
    pub ratings: PgRatingAggregator,
    pub reviews: PgReviewRepository,
    /// Photo pipeline; set with [`Catalog::with_photo_pipeline`].
    pub photos: Option<PhotoPipeline>,
}

impl Catalog {
    /// Create a catalog from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            stores: PgStoreRepository::new(pool.clone()),
            search: PgStoreSearch::new(pool.clone()),
            geo: PgGeoSearch::new(pool.clone()),
            tags: PgTagAggregator::new(pool.clone()),
            ratings: PgRatingAggregator::new(pool.clone()),
            reviews: PgReviewRepository::new(pool.clone()),
            photos: None,
            pool,
        }
    }

    pub fn with_photo_pipeline(mut self, pipeline: PhotoPipeline) -> Self {
        self.photos = Some(pipeline);
        self
    }

    /// Connect with the default pool configuration.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_config(url, &PoolConfig::default()).await
    }

    /// Connect with a custom pool configuration.
    pub async fn connect_with_config(url: &str, config: &PoolConfig) -> Result<Self> {
        let pool = connect_pool(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Connect and attach a filesystem photo pipeline, both from configuration.
    pub async fn from_config(config: &CatalogConfig) -> Result<Self> {
        let catalog =
            Self::connect_with_config(&config.database_url, &PoolConfig::from(config)).await?;
        Ok(catalog.with_photo_pipeline(PhotoPipeline::from_config(config)))
    }

    /// The photo pipeline, or a configuration error when none is attached.
    pub fn photos(&self) -> Result<&PhotoPipeline> {
        self.photos
            .as_ref()
            .ok_or_else(|| Error::Config("photo storage is not configured".to_string()))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }
}
