//! Error types for storefinder.

use thiserror::Error;
use uuid::Uuid;

/// Result type alias using storefinder's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for catalog operations.
///
/// Lookups that find nothing return `Ok(None)` rather than an error, so
/// there is deliberately no `NotFound` variant here.
#[derive(Error, Debug)]
pub enum Error {
    /// A required field is missing or a value is out of range.
    /// Raised before any persistence attempt.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Uploaded content is not an image.
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Mutation attempted by someone other than the store's author.
    #[error("Ownership violation: user {actor} does not own store {store_id}")]
    OwnershipViolation { store_id: Uuid, actor: Uuid },

    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Image decode/resize/encode failed
    #[error("Image error: {0}")]
    Image(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::Image(e.to_string())
    }
}
