//! # storefinder-core
//!
//! Core types, traits, and algorithms for the storefinder catalog.
//!
//! This crate provides the domain model and repository traits that the
//! persistence crate implements, plus the backend-independent pieces of the
//! catalog: slug derivation, distance math, text tokenization, aggregation
//! and photo resizing.
//!
//! ## Logging
//!
//! Every crate logs through `tracing` with the same structured fields:
//! `subsystem` (`catalog`, `search`, `photos`, `storage`, `db`, `config`,
//! `cli`), `component`, `op`, plus entity fields (`store_id`, `slug`,
//! `actor`, `query`, `photo`) and measurements (`duration_ms`,
//! `result_count`, `slug_conflicts`).
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic retry applied |
//! | INFO  | Lifecycle events, completed writes |
//! | DEBUG | Decision points (slug collisions, no-op ingestion) |
//! | TRACE | Per-item data (search hits, distances) |

pub mod defaults;
pub mod error;
pub mod geo;
pub mod models;
pub mod photo;
pub mod ratings;
pub mod slug;
pub mod tags;
pub mod text;
pub mod traits;
pub mod validation;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use geo::{haversine_distance_m, validate_point, validate_radius};
pub use models::*;
pub use photo::{
    ensure_image_content, ensure_image_mime, extension_for_mime, generate_photo_filename,
    resize_to_width, scaled_dimensions, ResizedPhoto,
};
pub use ratings::{average_rating, rank_top_rated};
pub use slug::{resolve_slug, slugify, suffixed_slug, SlugMatcher};
pub use tags::count_tags;
pub use text::{or_tsquery, tokenize, TextIndex};
pub use traits::*;
pub use validation::{
    effective_limit, validate_author, validate_review, validate_store_input, StoreFields,
};
