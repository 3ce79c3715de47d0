// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Sorting a sequence of records by an externally supplied custom order.
//!
//! Records whose key appears in the custom order come first, in the order of the custom order.
//! Records whose key does not appear come last. Ties are broken by a secondary key, and the
//! sort is stable, so records that tie on both keep their input order.

use std::{collections::HashMap, hash::Hash};

use crate::{Plant, PlantId, Result};

/// A record that can be placed by a custom order.
pub trait CustomOrdered {
    /// Key looked up in the custom order.
    type Key: Eq + Hash;

    /// Key used to break ties between records of equal rank.
    type Secondary: Ord + ?Sized;

    /// Returns the key looked up in the custom order.
    fn order_key(&self) -> &Self::Key;

    /// Returns the tie-breaking key.
    fn secondary_key(&self) -> &Self::Secondary;
}

impl CustomOrdered for Plant {
    type Key = PlantId;
    type Secondary = str;

    fn order_key(&self) -> &PlantId {
        &self.plant_id
    }

    fn secondary_key(&self) -> &str {
        &self.name
    }
}

/// Returns a copy of `items` sorted by `(rank in custom_order, secondary key)`.
///
/// The rank of an item is the position of the first occurrence of its key in `custom_order`;
/// items whose key is absent rank after every item whose key is present. The input is left
/// untouched.
///
/// # Example
///
/// ```
/// use greenhouse::{GrowZone, Plant, PlantId, apply_sort};
///
/// let plants = vec![
///     Plant::new("b", "Beet", GrowZone::new(2)),
///     Plant::new("a", "Apple", GrowZone::new(3)),
///     Plant::new("c", "Celery", GrowZone::new(2)),
/// ];
/// let order = [PlantId::new("a"), PlantId::new("c")];
///
/// let sorted = apply_sort(&plants, &order);
/// let ids: Vec<_> = sorted.iter().map(|plant| plant.plant_id.as_str()).collect();
/// assert_eq!(ids, ["a", "c", "b"]);
/// ```
pub fn apply_sort<T>(items: &[T], custom_order: &[T::Key]) -> Vec<T>
where
    T: CustomOrdered + Clone,
{
    let mut ranks = HashMap::with_capacity(custom_order.len());
    for (position, key) in custom_order.iter().enumerate() {
        ranks.entry(key).or_insert(position);
    }

    let mut ranked: Vec<(usize, &T)> = items
        .iter()
        .map(|item| (ranks.get(item.order_key()).copied().unwrap_or(usize::MAX), item))
        .collect();

    ranked.sort_by(|(left_rank, left), (right_rank, right)| {
        left_rank
            .cmp(right_rank)
            .then_with(|| left.secondary_key().cmp(right.secondary_key()))
    });

    ranked.into_iter().map(|(_, item)| item.clone()).collect()
}

/// Sorts `items` with [`apply_sort`], on the blocking thread pool when there are at least
/// `offload_threshold` of them and inline otherwise.
///
/// Dropping the returned future does not stop a sort that already runs on the blocking pool;
/// its result is discarded.
///
/// # Errors
///
/// Returns [`Error::Background`](crate::Error::Background) if the offloaded sort panics.
pub async fn sort_in_background<T>(items: Vec<T>, custom_order: Vec<T::Key>, offload_threshold: usize) -> Result<Vec<T>>
where
    T: CustomOrdered + Clone + Send + 'static,
    T::Key: Send + 'static,
{
    if items.len() < offload_threshold {
        return Ok(apply_sort(&items, &custom_order));
    }

    tracing::debug!(items = items.len(), "offloading sort to the blocking pool");
    let sorted = tokio::task::spawn_blocking(move || apply_sort(&items, &custom_order)).await?;
    Ok(sorted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, GrowZone};

    fn plant(id: &str, name: &str) -> Plant {
        Plant::new(id, name, GrowZone::new(1))
    }

    fn ids(plants: &[Plant]) -> Vec<&str> {
        plants.iter().map(|plant| plant.plant_id.as_str()).collect()
    }

    fn order(ids: &[&str]) -> Vec<PlantId> {
        ids.iter().copied().map(PlantId::from).collect()
    }

    #[test]
    fn ranked_items_come_first_in_custom_order() {
        let plants = vec![plant("b", "Beet"), plant("a", "Apple"), plant("c", "Celery")];

        let sorted = apply_sort(&plants, &order(&["a", "c"]));

        assert_eq!(ids(&sorted), ["a", "c", "b"]);
    }

    #[test]
    fn unranked_items_are_sorted_by_name() {
        let plants = vec![plant("z", "Zucchini"), plant("t", "Tomato"), plant("a", "Apple"), plant("m", "Mint")];

        let sorted = apply_sort(&plants, &order(&["t"]));

        assert_eq!(ids(&sorted), ["t", "a", "m", "z"]);
    }

    #[test]
    fn empty_order_sorts_by_name() {
        let plants = vec![plant("3", "Cherry"), plant("1", "Apple"), plant("2", "Banana")];

        let sorted = apply_sort(&plants, &[]);

        assert_eq!(ids(&sorted), ["1", "2", "3"]);
    }

    #[test]
    fn first_occurrence_of_duplicate_key_wins() {
        let plants = vec![plant("a", "Apple"), plant("b", "Beet")];

        let sorted = apply_sort(&plants, &order(&["b", "a", "b"]));

        assert_eq!(ids(&sorted), ["b", "a"]);
    }

    #[test]
    fn full_ties_keep_input_order() {
        let plants = vec![plant("x", "Same"), plant("y", "Same"), plant("w", "Same")];

        let sorted = apply_sort(&plants, &[]);

        assert_eq!(ids(&sorted), ["x", "y", "w"]);
    }

    #[test]
    fn input_is_not_mutated_and_output_is_a_permutation() {
        let plants = vec![plant("b", "Beet"), plant("a", "Apple"), plant("c", "Celery"), plant("d", "Dill")];
        let before = plants.clone();

        let sorted = apply_sort(&plants, &order(&["d", "c"]));

        assert_eq!(plants, before);
        assert_eq!(sorted.len(), plants.len());

        let mut sorted_ids = ids(&sorted);
        let mut input_ids = ids(&plants);
        sorted_ids.sort_unstable();
        input_ids.sort_unstable();
        assert_eq!(sorted_ids, input_ids);
    }

    #[test]
    fn order_keys_not_in_items_are_ignored() {
        let plants = vec![plant("b", "Beet")];

        let sorted = apply_sort(&plants, &order(&["missing", "b"]));

        assert_eq!(ids(&sorted), ["b"]);
    }

    #[tokio::test]
    async fn offloaded_sort_matches_inline_sort() {
        let plants: Vec<_> = (0..50).rev().map(|n| plant(&format!("id-{n}"), &format!("Plant {n:02}"))).collect();
        let custom = order(&["id-7", "id-3"]);

        let inline = sort_in_background(plants.clone(), custom.clone(), usize::MAX)
            .await
            .expect("inline sort cannot fail");
        let offloaded = sort_in_background(plants.clone(), custom.clone(), 1)
            .await
            .expect("offloaded sort must complete");

        assert_eq!(inline, offloaded);
        assert_eq!(inline, apply_sort(&plants, &custom));
        assert_eq!(ids(&inline)[..2], ["id-7", "id-3"]);
    }

    #[derive(Clone)]
    struct Unsortable(u32);

    impl CustomOrdered for Unsortable {
        type Key = u32;
        type Secondary = u32;

        fn order_key(&self) -> &u32 {
            &self.0
        }

        fn secondary_key(&self) -> &u32 {
            assert!(self.0 == u32::MAX, "secondary key of {} is unavailable", self.0);
            &self.0
        }
    }

    #[tokio::test]
    async fn panicking_offloaded_sort_is_a_background_error() {
        let items = vec![Unsortable(2), Unsortable(1)];

        let result = sort_in_background(items, Vec::new(), 1).await;

        assert!(matches!(result, Err(Error::Background(_))));
    }
}
