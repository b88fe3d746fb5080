//! Core traits for storefinder abstractions.
//!
//! These traits define the interfaces the catalog backends implement. The
//! PostgreSQL and in-memory backends both satisfy all of them, so callers
//! can be written once and tested without a database.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// STORE REPOSITORY
// =============================================================================

/// Repository for store listings.
#[async_trait]
pub trait StoreRepository: Send + Sync {
    /// Validate and persist a new store owned by `author`.
    ///
    /// The slug is derived from the name and made unique. Timestamps are set
    /// by the backend.
    async fn create(&self, input: StoreInput, author: Uuid) -> Result<Store>;

    /// Apply a full-field update on behalf of `acting_user`.
    ///
    /// Returns `Ok(None)` when no store has this id and
    /// [`Error::OwnershipViolation`](crate::Error::OwnershipViolation) when the
    /// acting user is not the author. The slug is re-derived only when the
    /// name changes; `input.photo == None` keeps the current photo.
    async fn update(&self, id: Uuid, input: StoreInput, acting_user: Uuid)
        -> Result<Option<Store>>;

    /// Fetch a store by id.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Store>>;

    /// Fetch a store by slug (case-insensitive) with its author and reviews.
    async fn find_by_slug(&self, slug: &str) -> Result<Option<StoreDetail>>;

    /// List stores newest first, one page at a time.
    async fn list(&self, req: ListStoresRequest) -> Result<ListStoresResponse>;

    /// Stores carrying `tag`, or every store with at least one tag when
    /// `tag` is `None`.
    async fn find_by_tag(&self, tag: Option<&str>) -> Result<Vec<Store>>;
}

// =============================================================================
// QUERY TRAITS
// =============================================================================

/// Relevance-ranked free-text search over name and description.
#[async_trait]
pub trait StoreSearch: Send + Sync {
    /// Stores matching any query term, most relevant first.
    async fn search(&self, query: &str, limit: i64) -> Result<Vec<StoreSearchHit>>;
}

/// Proximity search.
#[async_trait]
pub trait GeoSearch: Send + Sync {
    /// Stores within `query.max_distance_m` of `query.point`, nearest first.
    async fn find_near(&self, query: NearQuery) -> Result<Vec<NearbyStore>>;
}

/// Tag frequency aggregation.
#[async_trait]
pub trait TagAggregator: Send + Sync {
    /// Every distinct tag with its occurrence count, most frequent first.
    async fn tag_counts(&self) -> Result<Vec<TagCount>>;
}

/// Average-rating ranking.
#[async_trait]
pub trait RatingAggregator: Send + Sync {
    /// Stores with enough reviews, ordered by average rating descending.
    async fn top_rated(&self, limit: i64) -> Result<Vec<TopRatedStore>>;
}

// =============================================================================
// REVIEW REPOSITORY
// =============================================================================

/// Repository for store reviews.
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Persist a review. The target store must exist.
    async fn create(&self, req: CreateReviewRequest, author: Uuid) -> Result<Review>;

    /// Reviews for a store, newest first.
    async fn list_for_store(&self, store_id: Uuid) -> Result<Vec<Review>>;
}
