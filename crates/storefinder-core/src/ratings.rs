//! Top-rated ranking: join stores with their reviews, drop stores with too
//! few reviews, order by average rating.

use std::collections::HashMap;

use uuid::Uuid;

use crate::defaults::MIN_REVIEWS_FOR_RANKING;
use crate::models::{Review, Store, TopRatedStore};

/// Arithmetic mean of ratings, `None` for an empty slice.
pub fn average_rating(ratings: &[i32]) -> Option<f64> {
    if ratings.is_empty() {
        return None;
    }
    let sum: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
    Some(sum as f64 / ratings.len() as f64)
}

/// Rank stores by the average rating of their reviews.
///
/// Stores with fewer than [`MIN_REVIEWS_FOR_RANKING`] reviews never appear.
/// Equal averages keep the order in which `stores` was supplied.
pub fn rank_top_rated<'a, S, R>(stores: S, reviews: R, limit: usize) -> Vec<TopRatedStore>
where
    S: IntoIterator<Item = &'a Store>,
    R: IntoIterator<Item = &'a Review>,
{
    let mut by_store: HashMap<Uuid, Vec<i32>> = HashMap::new();
    for review in reviews {
        by_store.entry(review.store_id).or_default().push(review.rating);
    }

    let mut ranked: Vec<TopRatedStore> = stores
        .into_iter()
        .filter_map(|store| {
            let ratings = by_store.get(&store.id)?;
            if (ratings.len() as i64) < MIN_REVIEWS_FOR_RANKING {
                return None;
            }
            Some(TopRatedStore {
                store: store.clone(),
                average_rating: average_rating(ratings)?,
                review_count: ratings.len() as i64,
            })
        })
        .collect();

    // sort_by is stable, so ties keep the input order
    ranked.sort_by(|a, b| b.average_rating.total_cmp(&a.average_rating));
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GeoPoint, Location, LocationKind};
    use chrono::Utc;

    fn store(name: &str) -> Store {
        Store {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: name.to_lowercase(),
            description: None,
            tags: Vec::new(),
            location: Location {
                kind: LocationKind::Point,
                point: GeoPoint::new(0.0, 0.0),
                address: "somewhere".to_string(),
            },
            photo: None,
            author: Uuid::new_v4(),
            created_at_utc: Utc::now(),
            updated_at_utc: Utc::now(),
        }
    }

    fn review(store: &Store, rating: i32) -> Review {
        Review {
            id: Uuid::new_v4(),
            store_id: store.id,
            author: Uuid::new_v4(),
            rating,
            text: "ok".to_string(),
            created_at_utc: Utc::now(),
        }
    }

    #[test]
    fn test_average_rating() {
        assert_eq!(average_rating(&[]), None);
        assert_eq!(average_rating(&[4, 5]), Some(4.5));
        assert_eq!(average_rating(&[1, 2, 3]), Some(2.0));
    }

    #[test]
    fn test_single_review_excluded() {
        let lone = store("Lone");
        let pair = store("Pair");
        let reviews = vec![review(&lone, 5), review(&pair, 3), review(&pair, 4)];

        let ranked = rank_top_rated([&lone, &pair], &reviews, 10);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].store.id, pair.id);
        assert_eq!(ranked[0].average_rating, 3.5);
        assert_eq!(ranked[0].review_count, 2);
    }

    #[test]
    fn test_sorted_descending_and_limited() {
        let a = store("A");
        let b = store("B");
        let c = store("C");
        let reviews = vec![
            review(&a, 2),
            review(&a, 3),
            review(&b, 5),
            review(&b, 4),
            review(&c, 4),
            review(&c, 4),
        ];

        let ranked = rank_top_rated([&a, &b, &c], &reviews, 2);
        let names: Vec<&str> = ranked.iter().map(|r| r.store.name.as_str()).collect();
        assert_eq!(names, vec!["B", "C"]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let first = store("First");
        let second = store("Second");
        let reviews = vec![
            review(&second, 4),
            review(&second, 4),
            review(&first, 4),
            review(&first, 4),
        ];
        let ranked = rank_top_rated([&first, &second], &reviews, 10);
        assert_eq!(ranked[0].store.id, first.id);
    }

    #[test]
    fn test_no_reviews_no_ranking() {
        let a = store("A");
        assert!(rank_top_rated([&a], &Vec::new(), 10).is_empty());
    }
}
