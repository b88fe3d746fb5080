//! Proximity search over the PostGIS `location` column.

use std::time::Instant;

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;

use storefinder_core::{
    effective_limit, validate_point, validate_radius, Error, GeoSearch, NearQuery, NearbyStore,
    Result,
};

use crate::stores::{store_from_row, STORE_COLUMNS_S};

/// PostGIS-backed geo search.
#[derive(Clone)]
pub struct PgGeoSearch {
    pool: Pool<Postgres>,
}

impl PgGeoSearch {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GeoSearch for PgGeoSearch {
    async fn find_near(&self, query: NearQuery) -> Result<Vec<NearbyStore>> {
        let start = Instant::now();
        validate_point(&query.point)?;
        validate_radius(query.max_distance_m)?;
        let Some(limit) = effective_limit(query.limit) else {
            return Ok(Vec::new());
        };

        let rows = sqlx::query(&format!(
            r#"
            SELECT {},
                   ST_Distance(s.location, ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography)
                       AS distance_m
            FROM store s
            WHERE ST_DWithin(s.location, ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography, $3)
            ORDER BY distance_m ASC, s.seq ASC
            LIMIT $4
            "#,
            STORE_COLUMNS_S
        ))
        .bind(query.point.longitude)
        .bind(query.point.latitude)
        .bind(query.max_distance_m)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let results = rows
            .iter()
            .map(|row| -> Result<NearbyStore> {
                Ok(NearbyStore {
                    store: store_from_row(row)?,
                    distance_m: row.try_get("distance_m")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            subsystem = "search",
            component = "geo",
            op = "find_near",
            longitude = query.point.longitude,
            latitude = query.point.latitude,
            max_distance_m = query.max_distance_m,
            result_count = results.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Proximity search complete"
        );
        Ok(results)
    }
}
