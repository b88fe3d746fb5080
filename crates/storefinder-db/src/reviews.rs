//! Review repository implementation.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use tracing::info;
use uuid::Uuid;

use storefinder_core::{
    validate_author, validate_review, CreateReviewRequest, Error, Result, Review,
    ReviewRepository,
};

const REVIEW_COLUMNS: &str = "id, store_id, author_id, rating, text, created_at_utc";

fn review_from_row(row: &PgRow) -> Result<Review> {
    Ok(Review {
        id: row.try_get("id")?,
        store_id: row.try_get("store_id")?,
        author: row.try_get("author_id")?,
        rating: row.try_get("rating")?,
        text: row.try_get("text")?,
        created_at_utc: row.try_get("created_at_utc")?,
    })
}

/// Reviews for one store, newest first.
pub(crate) async fn fetch_reviews(pool: &Pool<Postgres>, store_id: Uuid) -> Result<Vec<Review>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM review WHERE store_id = $1 ORDER BY created_at_utc DESC, id DESC",
        REVIEW_COLUMNS
    ))
    .bind(store_id)
    .fetch_all(pool)
    .await
    .map_err(Error::Database)?;

    rows.iter().map(review_from_row).collect()
}

/// PostgreSQL implementation of ReviewRepository.
#[derive(Clone)]
pub struct PgReviewRepository {
    pool: Pool<Postgres>,
}

impl PgReviewRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewRepository for PgReviewRepository {
    async fn create(&self, req: CreateReviewRequest, author: Uuid) -> Result<Review> {
        validate_author(author)?;
        let req = validate_review(req)?;

        let store_exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM store WHERE id = $1)")
                .bind(req.store_id)
                .fetch_one(&self.pool)
                .await
                .map_err(Error::Database)?;
        if !store_exists {
            return Err(Error::Validation(format!(
                "Cannot review unknown store {}",
                req.store_id
            )));
        }

        let row = sqlx::query(&format!(
            "INSERT INTO review (id, store_id, author_id, rating, text) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            REVIEW_COLUMNS
        ))
        .bind(Uuid::now_v7())
        .bind(req.store_id)
        .bind(author)
        .bind(req.rating)
        .bind(&req.text)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        let review = review_from_row(&row)?;
        info!(
            subsystem = "catalog",
            component = "reviews",
            op = "create",
            store_id = %review.store_id,
            rating = review.rating,
            "Review created"
        );
        Ok(review)
    }

    async fn list_for_store(&self, store_id: Uuid) -> Result<Vec<Review>> {
        fetch_reviews(&self.pool, store_id).await
    }
}
