//! Core data models for storefinder.
//!
//! These types are shared across the storefinder crates and represent the
//! catalog's domain entities, request payloads and query results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::defaults;

// =============================================================================
// GEOGRAPHY
// =============================================================================

/// A WGS84 point, stored as (longitude, latitude).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Coordinates in storage order.
    pub fn coordinates(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }
}

/// Geometry kind of a location. Locations are always points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationKind {
    #[default]
    Point,
}

impl LocationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationKind::Point => "Point",
        }
    }
}

/// A store's physical location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "type", default)]
    pub kind: LocationKind,
    pub point: GeoPoint,
    pub address: String,
}

// =============================================================================
// STORE TYPES
// =============================================================================

/// A store listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub location: Location,
    /// Filename written by the photo pipeline, if a photo was uploaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    pub author: Uuid,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
}

/// Location as submitted by a client, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationInput {
    #[serde(default)]
    pub address: String,
    /// Expected to hold exactly `[longitude, latitude]`.
    #[serde(default)]
    pub coordinates: Vec<f64>,
}

/// Store attributes supplied on create and full-field update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub location: LocationInput,
    /// Filename from the photo pipeline. `None` on update keeps the current photo.
    #[serde(default)]
    pub photo: Option<String>,
}

impl StoreInput {
    /// Convenience constructor used by callers and tests.
    pub fn new(name: impl Into<String>, address: impl Into<String>, point: GeoPoint) -> Self {
        Self {
            name: name.into(),
            location: LocationInput {
                address: address.into(),
                coordinates: point.coordinates().to_vec(),
            },
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_photo(mut self, photo: impl Into<String>) -> Self {
        self.photo = Some(photo.into());
        self
    }
}

/// Externally owned user record, resolved for presentation only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// A store with its author and reviews joined at read time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreDetail {
    pub store: Store,
    pub author: Option<Author>,
    pub reviews: Vec<Review>,
}

/// Request for listing stores.
#[derive(Debug, Clone)]
pub struct ListStoresRequest {
    /// 1-based page number.
    pub page: i64,
    pub limit: i64,
}

impl Default for ListStoresRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: defaults::PAGE_LIMIT,
        }
    }
}

impl ListStoresRequest {
    pub fn page(page: i64) -> Self {
        Self {
            page,
            ..Default::default()
        }
    }

    /// Rows to skip for this page. Saturates for pages far past the end.
    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1).saturating_mul(self.limit.max(0))
    }
}

/// Response for listing stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListStoresResponse {
    pub stores: Vec<Store>,
    pub total: i64,
    pub page: i64,
    pub pages: i64,
}

impl ListStoresResponse {
    pub fn new(stores: Vec<Store>, total: i64, req: &ListStoresRequest) -> Self {
        let pages = if req.limit > 0 {
            total / req.limit + i64::from(total % req.limit != 0)
        } else {
            0
        };
        Self {
            stores,
            total,
            page: req.page.max(1),
            pages,
        }
    }
}

// =============================================================================
// REVIEW TYPES
// =============================================================================

/// A review of a store. Consumed by the rating aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub store_id: Uuid,
    pub author: Uuid,
    pub rating: i32,
    pub text: String,
    pub created_at_utc: DateTime<Utc>,
}

/// Request for creating a review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReviewRequest {
    pub store_id: Uuid,
    pub rating: i32,
    pub text: String,
}

// =============================================================================
// QUERY RESULTS
// =============================================================================

/// Parameters for a proximity query.
#[derive(Debug, Clone, Copy)]
pub struct NearQuery {
    pub point: GeoPoint,
    pub max_distance_m: f64,
    pub limit: i64,
}

impl NearQuery {
    /// Query around a point with the default radius and limit.
    pub fn around(longitude: f64, latitude: f64) -> Self {
        Self {
            point: GeoPoint::new(longitude, latitude),
            max_distance_m: defaults::NEAR_MAX_DISTANCE_M,
            limit: defaults::NEAR_LIMIT,
        }
    }

    pub fn within(mut self, max_distance_m: f64) -> Self {
        self.max_distance_m = max_distance_m;
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }
}

/// A proximity search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearbyStore {
    pub store: Store,
    pub distance_m: f64,
}

/// A text search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSearchHit {
    pub store: Store,
    pub score: f32,
}

/// Number of occurrences of a tag across all stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    pub tag: String,
    pub count: i64,
}

/// A store ranked by the average rating of its reviews.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopRatedStore {
    pub store: Store,
    pub average_rating: f64,
    pub review_count: i64,
}

// =============================================================================
// PHOTO TYPES
// =============================================================================

/// Raw upload handed over by the upload-handling collaborator.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl PhotoUpload {
    pub fn new(bytes: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_kind_serializes_as_point() {
        let loc = Location {
            kind: LocationKind::Point,
            point: GeoPoint::new(-79.38, 43.65),
            address: "1 Front St".to_string(),
        };
        let json = serde_json::to_value(&loc).unwrap();
        assert_eq!(json["type"], "Point");
    }

    #[test]
    fn test_list_request_offset() {
        assert_eq!(ListStoresRequest::page(1).offset(), 0);
        assert_eq!(ListStoresRequest::page(3).offset(), 12);
        assert_eq!(ListStoresRequest::page(0).offset(), 0);
    }

    #[test]
    fn test_list_response_pages_round_up() {
        let req = ListStoresRequest::default();
        let resp = ListStoresResponse::new(Vec::new(), 13, &req);
        assert_eq!(resp.pages, 3);

        let resp = ListStoresResponse::new(Vec::new(), 0, &req);
        assert_eq!(resp.pages, 0);
    }

    #[test]
    fn test_list_paging_saturates_at_extremes() {
        let far = ListStoresRequest {
            page: i64::MAX,
            limit: 6,
        };
        assert_eq!(far.offset(), i64::MAX);
        let resp = ListStoresResponse::new(Vec::new(), 13, &far);
        assert_eq!(resp.pages, 3);
        assert_eq!(resp.page, i64::MAX);

        let huge = ListStoresRequest {
            page: 1,
            limit: i64::MAX,
        };
        assert_eq!(huge.offset(), 0);
        assert_eq!(ListStoresResponse::new(Vec::new(), 13, &huge).pages, 1);
        assert_eq!(ListStoresResponse::new(Vec::new(), 0, &huge).pages, 0);

        let both = ListStoresRequest {
            page: i64::MAX,
            limit: i64::MAX,
        };
        assert_eq!(both.offset(), i64::MAX);
    }

    #[test]
    fn test_near_query_defaults() {
        let q = NearQuery::around(1.0, 2.0);
        assert_eq!(q.max_distance_m, 10_000.0);
        assert_eq!(q.limit, 10);
        assert_eq!(q.point.coordinates(), [1.0, 2.0]);
    }

    #[test]
    fn test_store_input_builder() {
        let input = StoreInput::new("Cafe Luna", "12 Main St", GeoPoint::new(2.0, 48.0))
            .with_description("Espresso")
            .with_tags(["Wifi", "Open Late"]);
        assert_eq!(input.location.coordinates, vec![2.0, 48.0]);
        assert_eq!(input.tags, vec!["Wifi", "Open Late"]);
        assert_eq!(input.description.as_deref(), Some("Espresso"));
    }
}
