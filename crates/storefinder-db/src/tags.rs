//! Tag frequency aggregation.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};

use storefinder_core::{Error, Result, TagAggregator, TagCount};

/// PostgreSQL implementation of TagAggregator.
#[derive(Clone)]
pub struct PgTagAggregator {
    pool: Pool<Postgres>,
}

impl PgTagAggregator {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TagAggregator for PgTagAggregator {
    async fn tag_counts(&self) -> Result<Vec<TagCount>> {
        // One row per occurrence, so repeats within a store each count.
        let rows = sqlx::query(
            r#"
            SELECT t.tag, COUNT(*) AS count
            FROM store s
            CROSS JOIN LATERAL unnest(s.tags) AS t(tag)
            GROUP BY t.tag
            ORDER BY count DESC, t.tag COLLATE "C" ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter()
            .map(|row| -> Result<TagCount> {
                Ok(TagCount {
                    tag: row.try_get("tag")?,
                    count: row.try_get("count")?,
                })
            })
            .collect()
    }
}
