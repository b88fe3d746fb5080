//! Full-text search over store name and description.
//!
//! Queries run against the generated `tsv` column (name weighted `A`,
//! description `B`) and are ordered by `ts_rank`, ties by insertion order.

use std::time::Instant;

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use tracing::{debug, trace};

use storefinder_core::{effective_limit, or_tsquery, Error, Result, StoreSearch, StoreSearchHit};

use crate::stores::{store_from_row, STORE_COLUMNS_S};

/// PostgreSQL full-text search provider.
#[derive(Clone)]
pub struct PgStoreSearch {
    pool: Pool<Postgres>,
}

impl PgStoreSearch {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StoreSearch for PgStoreSearch {
    async fn search(&self, query: &str, limit: i64) -> Result<Vec<StoreSearchHit>> {
        let start = Instant::now();
        let Some(limit) = effective_limit(limit) else {
            return Ok(Vec::new());
        };
        let Some(tsquery) = or_tsquery(query) else {
            return Ok(Vec::new());
        };

        let rows = sqlx::query(&format!(
            "SELECT {}, ts_rank(s.tsv, q)::float4 AS score \
             FROM store s, to_tsquery('english', $1) q \
             WHERE s.tsv @@ q \
             ORDER BY score DESC, s.seq ASC \
             LIMIT $2",
            STORE_COLUMNS_S
        ))
        .bind(&tsquery)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let hits = rows
            .iter()
            .map(|row| -> Result<StoreSearchHit> {
                let hit = StoreSearchHit {
                    store: store_from_row(row)?,
                    score: row.try_get("score")?,
                };
                trace!(store_id = %hit.store.id, score = hit.score, "search hit");
                Ok(hit)
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            subsystem = "search",
            component = "fts",
            op = "search",
            query = %query,
            result_count = hits.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Text search complete"
        );
        Ok(hits)
    }
}
