//! Centralized default values for the catalog.
//!
//! Operation defaults, photo limits, and environment variable names live here
//! so the repositories, the photo pipeline and the binary agree on them.

// =============================================================================
// QUERY DEFAULTS
// =============================================================================

/// Default radius for proximity search, in meters (10 km).
pub const NEAR_MAX_DISTANCE_M: f64 = 10_000.0;

/// Default number of stores returned by proximity search.
pub const NEAR_LIMIT: i64 = 10;

/// Default number of stores returned by text search.
pub const SEARCH_LIMIT: i64 = 5;

/// Default number of stores returned by the top-rated ranking.
pub const TOP_RATED_LIMIT: i64 = 10;

/// Minimum number of reviews a store needs to be ranked.
pub const MIN_REVIEWS_FOR_RANKING: i64 = 2;

/// Default page size for store listings.
pub const PAGE_LIMIT: i64 = 6;

// =============================================================================
// SLUGS
// =============================================================================

/// Base used when a store name transliterates to nothing.
pub const SLUG_FALLBACK: &str = "store";

/// Attempts to reserve a slug before giving up on concurrent conflicts.
pub const SLUG_RESERVE_ATTEMPTS: usize = 8;

// =============================================================================
// PHOTOS
// =============================================================================

/// Maximum stored photo width in pixels.
pub const PHOTO_MAX_WIDTH: u32 = 800;

/// Maximum accepted upload size (10 MiB).
pub const PHOTO_MAX_BYTES: usize = 10 * 1024 * 1024;

/// Default content directory for stored photos.
pub const PHOTO_STORAGE_PATH: &str = "./public/uploads";

// =============================================================================
// DATABASE POOL
// =============================================================================

/// Maximum pool connections.
pub const DB_MAX_CONNECTIONS: u32 = 10;

/// Seconds to wait for a free pool connection.
pub const DB_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Seconds an idle pool connection is kept open.
pub const DB_IDLE_TIMEOUT_SECS: u64 = 600;

// =============================================================================
// REVIEWS
// =============================================================================

/// Lowest accepted review rating.
pub const RATING_MIN: i32 = 1;

/// Highest accepted review rating.
pub const RATING_MAX: i32 = 5;

// =============================================================================
// ENVIRONMENT
// =============================================================================

/// PostgreSQL connection string.
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";

/// Content directory for photos.
pub const ENV_PHOTO_STORAGE_PATH: &str = "PHOTO_STORAGE_PATH";

/// Override for [`PHOTO_MAX_WIDTH`].
pub const ENV_PHOTO_MAX_WIDTH: &str = "PHOTO_MAX_WIDTH";

/// Override for [`PHOTO_MAX_BYTES`].
pub const ENV_PHOTO_MAX_BYTES: &str = "PHOTO_MAX_BYTES";

/// Override for [`DB_MAX_CONNECTIONS`].
pub const ENV_DB_MAX_CONNECTIONS: &str = "DB_MAX_CONNECTIONS";

/// Fallback database URL for local development.
pub const DATABASE_URL: &str = "postgres://localhost/storefinder";
