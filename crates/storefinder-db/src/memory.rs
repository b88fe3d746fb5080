//! In-process catalog backend.
//!
//! `MemoryCatalog` implements every catalog trait over state held behind one
//! async `RwLock`. The text and geo indexes are part of that state and are
//! maintained under the same write lock as the records, so a read issued
//! after a write always sees it. Slug resolution and the insert happen under
//! that lock too, which makes the count-derived slug race-free here.
//!
//! Useful for tests and for running the catalog without PostgreSQL.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use storefinder_core::slug::base_slug;
use storefinder_core::{
    count_tags, effective_limit, haversine_distance_m, rank_top_rated, suffixed_slug,
    validate_author, validate_point, validate_radius, validate_review, validate_store_input,
    Author, CreateReviewRequest, Error, GeoPoint, GeoSearch, ListStoresRequest,
    ListStoresResponse, NearQuery, NearbyStore, RatingAggregator, Result, Review,
    ReviewRepository, SlugMatcher, Store, StoreDetail, StoreInput, StoreRepository, StoreSearch,
    StoreSearchHit, TagAggregator, TagCount, TextIndex, TopRatedStore,
};

#[derive(Debug, Clone)]
struct StoredStore {
    seq: u64,
    store: Store,
}

#[derive(Debug, Default)]
struct CatalogState {
    stores: HashMap<Uuid, StoredStore>,
    next_seq: u64,
    text: TextIndex,
    points: HashMap<Uuid, GeoPoint>,
    reviews: Vec<Review>,
    authors: HashMap<Uuid, Author>,
}

impl CatalogState {
    /// Stores in insertion order.
    fn in_seq_order(&self) -> Vec<&StoredStore> {
        let mut stores: Vec<&StoredStore> = self.stores.values().collect();
        stores.sort_by_key(|s| s.seq);
        stores
    }

    /// Stores newest first.
    fn newest_first(&self) -> Vec<&StoredStore> {
        let mut stores = self.in_seq_order();
        stores.reverse();
        stores
    }

    fn slug_taken(&self, slug: &str, exclude: Option<Uuid>) -> bool {
        self.stores
            .values()
            .any(|s| Some(s.store.id) != exclude && s.store.slug.eq_ignore_ascii_case(slug))
    }

    /// Count-derived slug for `name`. If that candidate is already held (a
    /// gap left by an earlier rename), later suffixes are tried in order.
    fn reserve_slug(&self, name: &str, exclude: Option<Uuid>) -> Result<String> {
        let base = base_slug(name);
        let matcher = SlugMatcher::new(&base)?;
        let mut conflicts = matcher.count_conflicts(
            self.stores
                .values()
                .filter(|s| Some(s.store.id) != exclude)
                .map(|s| s.store.slug.as_str()),
        );
        if conflicts > 0 {
            debug!(
                subsystem = "catalog",
                component = "slug",
                slug = %base,
                slug_conflicts = conflicts,
                "Slug base already in use"
            );
        }

        loop {
            let candidate = suffixed_slug(&base, conflicts);
            if !self.slug_taken(&candidate, exclude) {
                return Ok(candidate);
            }
            warn!(
                subsystem = "catalog",
                component = "slug",
                slug = %candidate,
                "Count-derived slug already held, trying next suffix"
            );
            conflicts += 1;
        }
    }

    fn index(&mut self, seq: u64, store: &Store) {
        self.text
            .upsert(store.id, seq, &store.name, store.description.as_deref());
        self.points.insert(store.id, store.location.point);
    }
}

/// In-memory implementation of the catalog traits.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    state: Arc<RwLock<CatalogState>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make an externally owned user resolvable as a store author.
    pub async fn register_author(&self, author: Author) {
        self.state.write().await.authors.insert(author.id, author);
    }

    /// Number of stores held.
    pub async fn len(&self) -> usize {
        self.state.read().await.stores.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.stores.is_empty()
    }
}

#[async_trait]
impl StoreRepository for MemoryCatalog {
    async fn create(&self, input: StoreInput, author: Uuid) -> Result<Store> {
        validate_author(author)?;
        let fields = validate_store_input(input)?;

        let mut state = self.state.write().await;
        let slug = state.reserve_slug(&fields.name, None)?;
        let now = Utc::now();
        let store = Store {
            id: Uuid::now_v7(),
            name: fields.name,
            slug,
            description: fields.description,
            tags: fields.tags,
            location: fields.location,
            photo: fields.photo,
            author,
            created_at_utc: now,
            updated_at_utc: now,
        };

        let seq = state.next_seq;
        state.next_seq += 1;
        state.index(seq, &store);
        state.stores.insert(
            store.id,
            StoredStore {
                seq,
                store: store.clone(),
            },
        );

        info!(
            subsystem = "catalog",
            component = "memory",
            op = "create",
            store_id = %store.id,
            slug = %store.slug,
            "Store created"
        );
        Ok(store)
    }

    async fn update(
        &self,
        id: Uuid,
        input: StoreInput,
        acting_user: Uuid,
    ) -> Result<Option<Store>> {
        let fields = validate_store_input(input)?;

        let mut state = self.state.write().await;
        let Some(current) = state.stores.get(&id) else {
            return Ok(None);
        };
        if current.store.author != acting_user {
            warn!(
                subsystem = "catalog",
                component = "memory",
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

        let seq = current.seq;
        let slug = if fields.name == current.store.name {
            current.store.slug.clone()
        } else {
            state.reserve_slug(&fields.name, Some(id))?
        };

        let mut store = state.stores[&id].store.clone();
        store.name = fields.name;
        store.slug = slug;
        store.description = fields.description;
        store.tags = fields.tags;
        store.location = fields.location;
        if let Some(photo) = fields.photo {
            store.photo = Some(photo);
        }
        store.updated_at_utc = Utc::now();

        state.index(seq, &store);
        state.stores.insert(
            id,
            StoredStore {
                seq,
                store: store.clone(),
            },
        );

        info!(
            subsystem = "catalog",
            component = "memory",
            op = "update",
            store_id = %id,
            slug = %store.slug,
            "Store updated"
        );
        Ok(Some(store))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Store>> {
        let state = self.state.read().await;
        Ok(state.stores.get(&id).map(|s| s.store.clone()))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<StoreDetail>> {
        let state = self.state.read().await;
        let Some(found) = state
            .stores
            .values()
            .find(|s| s.store.slug.eq_ignore_ascii_case(slug))
        else {
            return Ok(None);
        };

        let store = found.store.clone();
        let author = state.authors.get(&store.author).cloned();
        let reviews = state
            .reviews
            .iter()
            .rev()
            .filter(|r| r.store_id == store.id)
            .cloned()
            .collect();

        Ok(Some(StoreDetail {
            store,
            author,
            reviews,
        }))
    }

    async fn list(&self, req: ListStoresRequest) -> Result<ListStoresResponse> {
        let state = self.state.read().await;
        let total = state.stores.len() as i64;
        let stores = match effective_limit(req.limit) {
            Some(limit) => state
                .newest_first()
                .into_iter()
                .skip(req.offset().max(0) as usize)
                .take(limit)
                .map(|s| s.store.clone())
                .collect(),
            None => Vec::new(),
        };
        Ok(ListStoresResponse::new(stores, total, &req))
    }

    async fn find_by_tag(&self, tag: Option<&str>) -> Result<Vec<Store>> {
        let state = self.state.read().await;
        Ok(state
            .newest_first()
            .into_iter()
            .filter(|s| match tag {
                Some(tag) => s.store.tags.iter().any(|t| t == tag),
                None => !s.store.tags.is_empty(),
            })
            .map(|s| s.store.clone())
            .collect())
    }
}

#[async_trait]
impl StoreSearch for MemoryCatalog {
    async fn search(&self, query: &str, limit: i64) -> Result<Vec<StoreSearchHit>> {
        let Some(limit) = effective_limit(limit) else {
            return Ok(Vec::new());
        };
        let state = self.state.read().await;
        let hits: Vec<StoreSearchHit> = state
            .text
            .search(query, limit)
            .into_iter()
            .filter_map(|(id, score)| {
                state.stores.get(&id).map(|s| StoreSearchHit {
                    store: s.store.clone(),
                    score,
                })
            })
            .collect();

        debug!(
            subsystem = "search",
            component = "memory",
            op = "search",
            query = %query,
            result_count = hits.len(),
            "Text search complete"
        );
        Ok(hits)
    }
}

#[async_trait]
impl GeoSearch for MemoryCatalog {
    async fn find_near(&self, query: NearQuery) -> Result<Vec<NearbyStore>> {
        validate_point(&query.point)?;
        validate_radius(query.max_distance_m)?;
        let Some(limit) = effective_limit(query.limit) else {
            return Ok(Vec::new());
        };

        let state = self.state.read().await;
        let mut hits: Vec<(f64, u64, Uuid)> = state
            .points
            .iter()
            .filter_map(|(id, point)| {
                let distance = haversine_distance_m(&query.point, point);
                let seq = state.stores.get(id)?.seq;
                (distance <= query.max_distance_m).then_some((distance, seq, *id))
            })
            .collect();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        hits.truncate(limit);

        let results: Vec<NearbyStore> = hits
            .into_iter()
            .filter_map(|(distance_m, _, id)| {
                state.stores.get(&id).map(|s| NearbyStore {
                    store: s.store.clone(),
                    distance_m,
                })
            })
            .collect();

        debug!(
            subsystem = "search",
            component = "memory",
            op = "find_near",
            result_count = results.len(),
            "Proximity search complete"
        );
        Ok(results)
    }
}

#[async_trait]
impl TagAggregator for MemoryCatalog {
    async fn tag_counts(&self) -> Result<Vec<TagCount>> {
        let state = self.state.read().await;
        Ok(count_tags(
            state
                .in_seq_order()
                .into_iter()
                .map(|s| s.store.tags.as_slice()),
        ))
    }
}

#[async_trait]
impl RatingAggregator for MemoryCatalog {
    async fn top_rated(&self, limit: i64) -> Result<Vec<TopRatedStore>> {
        let Some(limit) = effective_limit(limit) else {
            return Ok(Vec::new());
        };
        let state = self.state.read().await;
        Ok(rank_top_rated(
            state.in_seq_order().into_iter().map(|s| &s.store),
            &state.reviews,
            limit,
        ))
    }
}

#[async_trait]
impl ReviewRepository for MemoryCatalog {
    async fn create(&self, req: CreateReviewRequest, author: Uuid) -> Result<Review> {
        validate_author(author)?;
        let req = validate_review(req)?;

        let mut state = self.state.write().await;
        if !state.stores.contains_key(&req.store_id) {
            return Err(Error::Validation(format!(
                "Cannot review unknown store {}",
                req.store_id
            )));
        }

        let review = Review {
            id: Uuid::now_v7(),
            store_id: req.store_id,
            author,
            rating: req.rating,
            text: req.text,
            created_at_utc: Utc::now(),
        };
        state.reviews.push(review.clone());

        info!(
            subsystem = "catalog",
            component = "memory",
            op = "create_review",
            store_id = %review.store_id,
            rating = review.rating,
            "Review created"
        );
        Ok(review)
    }

    async fn list_for_store(&self, store_id: Uuid) -> Result<Vec<Review>> {
        let state = self.state.read().await;
        Ok(state
            .reviews
            .iter()
            .rev()
            .filter(|r| r.store_id == store_id)
            .cloned()
            .collect())
    }
}
