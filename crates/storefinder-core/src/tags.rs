//! Tag frequency aggregation.

use std::collections::HashMap;

use crate::models::TagCount;

/// Count tag occurrences across stores.
///
/// Every occurrence counts, including repeats within one store. Tags are
/// grouped by exact string equality and sorted by descending count, then
/// ascending tag so equal counts come back in a stable order.
pub fn count_tags<'a, I>(tag_lists: I) -> Vec<TagCount>
where
    I: IntoIterator<Item = &'a [String]>,
{
    let mut counts: HashMap<&'a str, i64> = HashMap::new();
    for tags in tag_lists {
        for tag in tags {
            *counts.entry(tag.as_str()).or_insert(0) += 1;
        }
    }

    let mut result: Vec<TagCount> = counts
        .into_iter()
        .map(|(tag, count)| TagCount {
            tag: tag.to_string(),
            count,
        })
        .collect();
    result.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_counts_every_occurrence() {
        let stores = [
            tags(&["Wifi", "Open Late"]),
            tags(&["Wifi", "Wifi"]),
            tags(&["Family Friendly"]),
        ];
        let counts = count_tags(stores.iter().map(Vec::as_slice));

        assert_eq!(counts[0], TagCount { tag: "Wifi".to_string(), count: 3 });
        let total: i64 = counts.iter().map(|c| c.count).sum();
        assert_eq!(total, 5);
    }

    #[test]
    fn test_sorted_descending_with_stable_ties() {
        let stores = [tags(&["b", "a", "c"]), tags(&["c"])];
        let counts = count_tags(stores.iter().map(Vec::as_slice));
        let order: Vec<&str> = counts.iter().map(|c| c.tag.as_str()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_exact_equality_grouping() {
        let stores = [tags(&["wifi", "Wifi"])];
        let counts = count_tags(stores.iter().map(Vec::as_slice));
        assert_eq!(counts.len(), 2);
    }

    #[test]
    fn test_no_stores() {
        let stores: Vec<Vec<String>> = Vec::new();
        assert!(count_tags(stores.iter().map(Vec::as_slice)).is_empty());
    }
}
