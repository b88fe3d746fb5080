//! Top-rated stores: an explicit store/review join ranked by average rating.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;

use storefinder_core::defaults::MIN_REVIEWS_FOR_RANKING;
use storefinder_core::{effective_limit, Error, RatingAggregator, Result, TopRatedStore};

use crate::stores::{store_from_row, STORE_COLUMNS_S};

/// PostgreSQL implementation of RatingAggregator.
#[derive(Clone)]
pub struct PgRatingAggregator {
    pool: Pool<Postgres>,
}

impl PgRatingAggregator {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RatingAggregator for PgRatingAggregator {
    async fn top_rated(&self, limit: i64) -> Result<Vec<TopRatedStore>> {
        let Some(limit) = effective_limit(limit) else {
            return Ok(Vec::new());
        };

        let rows = sqlx::query(&format!(
            r#"
            SELECT {},
                   AVG(r.rating)::float8 AS average_rating,
                   COUNT(r.id) AS review_count
            FROM store s
            JOIN review r ON r.store_id = s.id
            GROUP BY s.id
            HAVING COUNT(r.id) >= $1
            ORDER BY average_rating DESC, s.seq ASC
            LIMIT $2
            "#,
            STORE_COLUMNS_S
        ))
        .bind(MIN_REVIEWS_FOR_RANKING)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let ranked = rows
            .iter()
            .map(|row| -> Result<TopRatedStore> {
                Ok(TopRatedStore {
                    store: store_from_row(row)?,
                    average_rating: row.try_get("average_rating")?,
                    review_count: row.try_get("review_count")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            subsystem = "catalog",
            component = "ratings",
            op = "top_rated",
            result_count = ranked.len(),
            "Top-rated ranking complete"
        );
        Ok(ranked)
    }
}
