//! Store repository implementation.
//!
//! Slugs are assigned from the count of conflicting records and then
//! reserved against the `store_slug_key` unique index. A violation means a
//! concurrent writer took the candidate; the next suffix is tried, up to
//! [`SLUG_RESERVE_ATTEMPTS`] times.

use std::time::Instant;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Pool, Postgres, Row};
use tracing::{debug, info, warn};
use uuid::Uuid;

use storefinder_core::defaults::SLUG_RESERVE_ATTEMPTS;
use storefinder_core::slug::{base_slug, slug_pattern};
use storefinder_core::{
    suffixed_slug, validate_author, validate_store_input, Author, Error, GeoPoint,
    ListStoresRequest, ListStoresResponse, Location, LocationKind, Result, Store, StoreDetail,
    StoreFields, StoreInput, StoreRepository,
};

use crate::reviews::fetch_reviews;

/// Columns selected for a `Store`, unqualified.
pub(crate) const STORE_COLUMNS: &str = "id, name, slug, description, tags, location_type, \
     longitude, latitude, address, photo, author_id, created_at_utc, updated_at_utc";

/// Columns selected for a `Store`, qualified with the `s` alias.
pub(crate) const STORE_COLUMNS_S: &str = "s.id, s.name, s.slug, s.description, s.tags, \
     s.location_type, s.longitude, s.latitude, s.address, s.photo, s.author_id, \
     s.created_at_utc, s.updated_at_utc";

const SLUG_UNIQUE_CONSTRAINT: &str = "store_slug_key";

/// Map a row selected with [`STORE_COLUMNS`] to a `Store`.
pub(crate) fn store_from_row(row: &PgRow) -> Result<Store> {
    let location_type: String = row.try_get("location_type")?;
    let kind = match location_type.as_str() {
        "Point" => LocationKind::Point,
        other => {
            return Err(Error::Internal(format!(
                "unexpected location type {:?}",
                other
            )))
        }
    };

    Ok(Store {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        description: row.try_get("description")?,
        tags: row.try_get("tags")?,
        location: Location {
            kind,
            point: GeoPoint::new(row.try_get("longitude")?, row.try_get("latitude")?),
            address: row.try_get("address")?,
        },
        photo: row.try_get("photo")?,
        author: row.try_get("author_id")?,
        created_at_utc: row.try_get("created_at_utc")?,
        updated_at_utc: row.try_get("updated_at_utc")?,
    })
}

/// True when `err` is a violation of the slug unique index.
fn is_slug_conflict(err: &sqlx::Error) -> bool {
    err.as_database_error().is_some_and(|db| {
        db.is_unique_violation() && db.constraint().map_or(true, |c| c == SLUG_UNIQUE_CONSTRAINT)
    })
}

/// Count records whose slug matches `base` or a numeric suffix of it,
/// optionally ignoring one record (the one being renamed).
async fn count_slug_conflicts(
    conn: &mut PgConnection,
    base: &str,
    exclude: Option<Uuid>,
) -> Result<usize> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM store WHERE slug ~* $1 AND ($2::uuid IS NULL OR id <> $2)",
    )
    .bind(slug_pattern(base))
    .bind(exclude)
    .fetch_one(conn)
    .await
    .map_err(Error::Database)?;
    Ok(count.max(0) as usize)
}

/// PostgreSQL implementation of StoreRepository.
#[derive(Clone)]
pub struct PgStoreRepository {
    pool: Pool<Postgres>,
}

impl PgStoreRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn insert_store(
        conn: &mut PgConnection,
        id: Uuid,
        slug: &str,
        fields: &StoreFields,
        author: Uuid,
    ) -> std::result::Result<PgRow, sqlx::Error> {
        sqlx::query(&format!(
            "INSERT INTO store (id, name, slug, description, tags, location_type, longitude, \
             latitude, address, photo, author_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {}",
            STORE_COLUMNS
        ))
        .bind(id)
        .bind(&fields.name)
        .bind(slug)
        .bind(&fields.description)
        .bind(&fields.tags)
        .bind(fields.location.kind.as_str())
        .bind(fields.location.point.longitude)
        .bind(fields.location.point.latitude)
        .bind(&fields.location.address)
        .bind(&fields.photo)
        .bind(author)
        .fetch_one(conn)
        .await
    }

    async fn update_store(
        conn: &mut PgConnection,
        id: Uuid,
        slug: &str,
        fields: &StoreFields,
        photo: Option<&str>,
    ) -> std::result::Result<PgRow, sqlx::Error> {
        sqlx::query(&format!(
            "UPDATE store SET name = $2, slug = $3, description = $4, tags = $5, \
             location_type = $6, longitude = $7, latitude = $8, address = $9, photo = $10, \
             updated_at_utc = now() \
             WHERE id = $1 RETURNING {}",
            STORE_COLUMNS
        ))
        .bind(id)
        .bind(&fields.name)
        .bind(slug)
        .bind(&fields.description)
        .bind(&fields.tags)
        .bind(fields.location.kind.as_str())
        .bind(fields.location.point.longitude)
        .bind(fields.location.point.latitude)
        .bind(&fields.location.address)
        .bind(photo)
        .fetch_one(conn)
        .await
    }

    async fn fetch_author(&self, id: Uuid) -> Result<Option<Author>> {
        let row = sqlx::query("SELECT id, name, email FROM app_user WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        row.map(|row| -> Result<Author> {
            Ok(Author {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                email: row.try_get("email")?,
            })
        })
        .transpose()
    }
}

#[async_trait]
impl StoreRepository for PgStoreRepository {
    async fn create(&self, input: StoreInput, author: Uuid) -> Result<Store> {
        let start = Instant::now();
        validate_author(author)?;
        let fields = validate_store_input(input)?;

        let id = Uuid::now_v7();
        let base = base_slug(&fields.name);
        let mut conn = self.pool.acquire().await.map_err(Error::Database)?;
        let mut conflicts = count_slug_conflicts(&mut conn, &base, None).await?;
        if conflicts > 0 {
            debug!(
                subsystem = "catalog",
                component = "slug",
                slug = %base,
                slug_conflicts = conflicts,
                "Slug base already in use"
            );
        }

        for attempt in 1..=SLUG_RESERVE_ATTEMPTS {
            let slug = suffixed_slug(&base, conflicts);
            match Self::insert_store(&mut conn, id, &slug, &fields, author).await {
                Ok(row) => {
                    let store = store_from_row(&row)?;
                    info!(
                        subsystem = "catalog",
                        component = "stores",
                        op = "create",
                        store_id = %store.id,
                        slug = %store.slug,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Store created"
                    );
                    return Ok(store);
                }
                Err(e) if is_slug_conflict(&e) => {
                    warn!(
                        subsystem = "catalog",
                        component = "slug",
                        slug = %slug,
                        attempt,
                        "Slug taken concurrently, retrying with next suffix"
                    );
                    conflicts += 1;
                }
                Err(e) => return Err(Error::Database(e)),
            }
        }

        Err(Error::Internal(format!(
            "could not reserve a slug for {:?} after {} attempts",
            base, SLUG_RESERVE_ATTEMPTS
        )))
    }

    async fn update(
        &self,
        id: Uuid,
        input: StoreInput,
        acting_user: Uuid,
    ) -> Result<Option<Store>> {
        let start = Instant::now();
        let fields = validate_store_input(input)?;

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let row = sqlx::query(&format!(
            "SELECT {} FROM store WHERE id = $1 FOR UPDATE",
            STORE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(Error::Database)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let current = store_from_row(&row)?;

        if current.author != acting_user {
            warn!(
                subsystem = "catalog",
                component = "stores",
                op = "update",
                store_id = %id,
                actor = %acting_user,
                "Update rejected, acting user is not the author"
            );
            return Err(Error::OwnershipViolation {
                store_id: id,
                actor: acting_user,
            });
        }

        let photo = fields.photo.as_deref().or(current.photo.as_deref());

        let updated = if fields.name == current.name {
            let row = Self::update_store(&mut tx, id, &current.slug, &fields, photo)
                .await
                .map_err(Error::Database)?;
            store_from_row(&row)?
        } else {
            let base = base_slug(&fields.name);
            let mut conflicts = count_slug_conflicts(&mut tx, &base, Some(id)).await?;
            let mut reserved = None;

            for attempt in 1..=SLUG_RESERVE_ATTEMPTS {
                let slug = suffixed_slug(&base, conflicts);
                sqlx::query("SAVEPOINT slug_reserve")
                    .execute(&mut *tx)
                    .await
                    .map_err(Error::Database)?;

                match Self::update_store(&mut tx, id, &slug, &fields, photo).await {
                    Ok(row) => {
                        sqlx::query("RELEASE SAVEPOINT slug_reserve")
                            .execute(&mut *tx)
                            .await
                            .map_err(Error::Database)?;
                        reserved = Some(store_from_row(&row)?);
                        break;
                    }
                    Err(e) if is_slug_conflict(&e) => {
                        sqlx::query("ROLLBACK TO SAVEPOINT slug_reserve")
                            .execute(&mut *tx)
                            .await
                            .map_err(Error::Database)?;
                        warn!(
                            subsystem = "catalog",
                            component = "slug",
                            slug = %slug,
                            attempt,
                            "Slug taken concurrently, retrying with next suffix"
                        );
                        conflicts += 1;
                    }
                    Err(e) => return Err(Error::Database(e)),
                }
            }

            reserved.ok_or_else(|| {
                Error::Internal(format!(
                    "could not reserve a slug for {:?} after {} attempts",
                    base, SLUG_RESERVE_ATTEMPTS
                ))
            })?
        };

        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "catalog",
            component = "stores",
            op = "update",
            store_id = %id,
            slug = %updated.slug,
            duration_ms = start.elapsed().as_millis() as u64,
            "Store updated"
        );
        Ok(Some(updated))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Store>> {
        let row = sqlx::query(&format!("SELECT {} FROM store WHERE id = $1", STORE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        row.as_ref().map(store_from_row).transpose()
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<StoreDetail>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM store WHERE lower(slug) = lower($1)",
            STORE_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let store = store_from_row(&row)?;
        let author = self.fetch_author(store.author).await?;
        let reviews = fetch_reviews(&self.pool, store.id).await?;

        Ok(Some(StoreDetail {
            store,
            author,
            reviews,
        }))
    }

    async fn list(&self, req: ListStoresRequest) -> Result<ListStoresResponse> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM store")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;

        if req.limit <= 0 {
            return Ok(ListStoresResponse::new(Vec::new(), total, &req));
        }

        let rows = sqlx::query(&format!(
            "SELECT {} FROM store ORDER BY created_at_utc DESC, seq DESC LIMIT $1 OFFSET $2",
            STORE_COLUMNS
        ))
        .bind(req.limit)
        .bind(req.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let stores = rows.iter().map(store_from_row).collect::<Result<Vec<_>>>()?;
        Ok(ListStoresResponse::new(stores, total, &req))
    }

    async fn find_by_tag(&self, tag: Option<&str>) -> Result<Vec<Store>> {
        let rows = match tag {
            Some(tag) => {
                sqlx::query(&format!(
                    "SELECT {} FROM store WHERE $1 = ANY(tags) \
                     ORDER BY created_at_utc DESC, seq DESC",
                    STORE_COLUMNS
                ))
                .bind(tag)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {} FROM store WHERE cardinality(tags) > 0 \
                     ORDER BY created_at_utc DESC, seq DESC",
                    STORE_COLUMNS
                ))
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(Error::Database)?;

        rows.iter().map(store_from_row).collect()
    }
}
