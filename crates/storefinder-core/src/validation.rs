//! Input validation for store and review writes.
//!
//! Validation runs before any persistence attempt, so a rejected write never
//! leaves partial state behind.

use uuid::Uuid;

use crate::defaults::{RATING_MAX, RATING_MIN};
use crate::error::{Error, Result};
use crate::geo::validate_point;
use crate::models::{CreateReviewRequest, GeoPoint, Location, LocationKind, StoreInput};

/// Store attributes after trimming and validation.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreFields {
    pub name: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub location: Location,
    pub photo: Option<String>,
}

/// Validate and normalize client-supplied store attributes.
///
/// - `name` and `location.address` are trimmed and must be non-empty
/// - `location.coordinates` must be exactly `[longitude, latitude]` in range
/// - `description` is trimmed; blank becomes `None`
/// - tags are trimmed, blank entries dropped, order and duplicates kept
/// - location is always normalized to a point
pub fn validate_store_input(input: StoreInput) -> Result<StoreFields> {
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(Error::Validation("Please enter a store name".to_string()));
    }

    let address = input.location.address.trim().to_string();
    if address.is_empty() {
        return Err(Error::Validation("You must supply an address".to_string()));
    }

    let point = match input.location.coordinates.as_slice() {
        [longitude, latitude] => GeoPoint::new(*longitude, *latitude),
        [] => {
            return Err(Error::Validation(
                "You must supply coordinates".to_string(),
            ))
        }
        other => {
            return Err(Error::Validation(format!(
                "Coordinates must be a [longitude, latitude] pair, got {} values",
                other.len()
            )))
        }
    };
    validate_point(&point)?;

    let description = input
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());

    let tags = input
        .tags
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    let photo = input
        .photo
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());

    Ok(StoreFields {
        name,
        description,
        tags,
        location: Location {
            kind: LocationKind::Point,
            point,
            address,
        },
        photo,
    })
}

/// Reject a missing (nil) author identity.
pub fn validate_author(author: Uuid) -> Result<()> {
    if author.is_nil() {
        return Err(Error::Validation("You must supply an author".to_string()));
    }
    Ok(())
}

/// Validate a review and return it with trimmed text.
pub fn validate_review(req: CreateReviewRequest) -> Result<CreateReviewRequest> {
    if !(RATING_MIN..=RATING_MAX).contains(&req.rating) {
        return Err(Error::Validation(format!(
            "Rating must be between {} and {}, got {}",
            RATING_MIN, RATING_MAX, req.rating
        )));
    }
    let text = req.text.trim().to_string();
    if text.is_empty() {
        return Err(Error::Validation("Your review must have text".to_string()));
    }
    Ok(CreateReviewRequest { text, ..req })
}

/// Validate a result limit. Non-positive limits mean "return nothing".
pub fn effective_limit(limit: i64) -> Option<usize> {
    if limit <= 0 {
        None
    } else {
        Some(limit as usize)
    }
}
