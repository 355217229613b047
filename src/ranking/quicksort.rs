use crate::core::Trip;
use crate::ranking::key::{value, SortKey, SortOrder};

/// Primitive operation counts of one ranking pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RankStats {
    pub comparisons: u64,
    pub swaps: u64,
}

/// Instrumented quicksort (Lomuto partition, last-element pivot)
///
/// Construct one per ranking request; counters belong to the instance and
/// are zeroed at the start of every [`sort_by`](Self::sort_by) call.
///
/// The partition predicate is strict, so the sort is not stable, and
/// already-ordered input degrades to quadratic work. Both are part of the
/// reported behaviour and must not be optimised away. Every predicate hit
/// swaps, including self-swaps, and every partition ends with a pivot swap.
#[derive(Debug, Default)]
pub struct QuickSortRanker {
    stats: RankStats,
}

impl QuickSortRanker {
    /// Algorithm name reported to callers
    pub const NAME: &'static str = "QuickSort";

    /// Theoretical bound reported to callers, independent of observed counts
    pub const COMPLEXITY: &'static str = "O(n log n) average, O(n²) worst";

    pub fn new() -> Self {
        Self::default()
    }

    /// Rank trips in place by `key` in `order`
    pub fn rank(&mut self, trips: &mut [Trip], key: SortKey, order: SortOrder) {
        self.sort_by(trips, |trip| value(trip, key), order);
    }

    /// Sort `items` in place by the numeric key returned from `key`
    pub fn sort_by<T, F>(&mut self, items: &mut [T], key: F, order: SortOrder)
    where
        F: Fn(&T) -> f64,
    {
        self.stats = RankStats::default();

        if items.len() <= 1 {
            return;
        }

        // Explicit stack: sorted input drives partitions n deep.
        let mut pending = vec![(0usize, items.len() - 1)];
        while let Some((low, high)) = pending.pop() {
            if low >= high {
                continue;
            }

            let pivot_index = self.partition(items, low, high, &key, order);

            if pivot_index + 1 < high {
                pending.push((pivot_index + 1, high));
            }
            if pivot_index > low + 1 {
                pending.push((low, pivot_index - 1));
            }
        }
    }

    fn partition<T, F>(
        &mut self,
        items: &mut [T],
        low: usize,
        high: usize,
        key: &F,
        order: SortOrder,
    ) -> usize
    where
        F: Fn(&T) -> f64,
    {
        let pivot = key(&items[high]);
        let mut boundary = low;

        for j in low..high {
            self.stats.comparisons += 1;
            let current = key(&items[j]);

            let goes_first = match order {
                SortOrder::Desc => current > pivot,
                SortOrder::Asc => current < pivot,
            };

            if goes_first {
                self.swap(items, boundary, j);
                boundary += 1;
            }
        }

        self.swap(items, boundary, high);
        boundary
    }

    fn swap<T>(&mut self, items: &mut [T], i: usize, j: usize) {
        self.stats.swaps += 1;
        items.swap(i, j);
    }

    /// Counters of the most recent sort
    pub fn stats(&self) -> RankStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn sort_values(values: &[f64], order: SortOrder) -> (Vec<f64>, RankStats) {
        let mut items = values.to_vec();
        let mut ranker = QuickSortRanker::new();
        ranker.sort_by(&mut items, |v| *v, order);
        (items, ranker.stats())
    }

    fn distance_trip(id: &str, km: f64) -> Trip {
        Trip::new(id).with_analytics(km, 0.0, 0)
    }

    #[test]
    fn test_reference_batch_descending() {
        let (sorted, stats) = sort_values(&[5.2, 8.1, 12.5, 6.8, 9.3], SortOrder::Desc);
        assert_eq!(sorted, vec![12.5, 9.3, 8.1, 6.8, 5.2]);
        assert_eq!(stats, RankStats { comparisons: 7, swaps: 5 });
    }

    #[test]
    fn test_reference_batch_ascending() {
        let (sorted, stats) = sort_values(&[5.2, 8.1, 12.5, 6.8, 9.3], SortOrder::Asc);
        assert_eq!(sorted, vec![5.2, 6.8, 8.1, 9.3, 12.5]);
        assert_eq!(stats, RankStats { comparisons: 6, swaps: 6 });
    }

    #[test]
    fn test_trivial_inputs() {
        let (sorted, stats) = sort_values(&[], SortOrder::Desc);
        assert!(sorted.is_empty());
        assert_eq!(stats, RankStats::default());

        let (sorted, stats) = sort_values(&[4.2], SortOrder::Asc);
        assert_eq!(sorted, vec![4.2]);
        assert_eq!(stats, RankStats::default());
    }

    #[test]
    fn test_presorted_input_is_quadratic() {
        // Ascending input ranked descending: every partition peels one element.
        let (sorted, stats) = sort_values(&[1.0, 2.0, 3.0, 4.0, 5.0], SortOrder::Desc);
        assert_eq!(sorted, vec![5.0, 4.0, 3.0, 2.0, 1.0]);
        assert_eq!(stats, RankStats { comparisons: 10, swaps: 8 });

        // Already in target order: predicate hits every scan, self-swaps counted.
        let (sorted, stats) = sort_values(&[5.0, 4.0, 3.0, 2.0, 1.0], SortOrder::Desc);
        assert_eq!(sorted, vec![5.0, 4.0, 3.0, 2.0, 1.0]);
        assert_eq!(stats, RankStats { comparisons: 10, swaps: 14 });

        let (_, stats) = sort_values(&[1.0, 2.0, 3.0, 4.0, 5.0], SortOrder::Asc);
        assert_eq!(stats, RankStats { comparisons: 10, swaps: 14 });
    }

    #[test]
    fn test_sorted_input_costs_n_choose_2() {
        let n = 400;
        let values: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let (_, stats) = sort_values(&values, SortOrder::Asc);
        assert_eq!(stats.comparisons, (n * (n - 1) / 2) as u64);
    }

    #[test]
    fn test_deep_degenerate_input_does_not_overflow() {
        let values: Vec<f64> = (0..5_000).map(|i| i as f64).collect();
        let (sorted, _) = sort_values(&values, SortOrder::Desc);
        assert_eq!(sorted.first(), Some(&4_999.0));
        assert_eq!(sorted.last(), Some(&0.0));
    }

    #[test]
    fn test_equal_keys() {
        let (sorted, stats) = sort_values(&[7.0, 7.0, 7.0, 7.0], SortOrder::Desc);
        assert_eq!(sorted, vec![7.0; 4]);
        assert_eq!(stats, RankStats { comparisons: 6, swaps: 3 });
    }

    #[test]
    fn test_counters_reset_between_calls() {
        let mut ranker = QuickSortRanker::new();

        let mut first = vec![3.0, 1.0, 2.0, 5.0, 4.0];
        ranker.sort_by(&mut first, |v| *v, SortOrder::Asc);
        let first_stats = ranker.stats();

        let mut second = vec![3.0, 1.0, 2.0, 5.0, 4.0];
        ranker.sort_by(&mut second, |v| *v, SortOrder::Asc);
        assert_eq!(ranker.stats(), first_stats);

        ranker.sort_by(&mut Vec::<f64>::new(), |v| *v, SortOrder::Asc);
        assert_eq!(ranker.stats(), RankStats::default());
    }

    #[test]
    fn test_rank_trips_by_distance() {
        let mut trips = vec![
            distance_trip("a", 5.2),
            Trip::new("no_analytics"),
            distance_trip("b", 12.5),
            distance_trip("c", 6.8),
        ];

        let mut ranker = QuickSortRanker::new();
        ranker.rank(&mut trips, SortKey::Distance, SortOrder::Desc);

        let ids: Vec<&str> = trips.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a", "no_analytics"]);
    }

    #[test]
    fn test_random_batches_are_ordered_permutations() {
        let mut rng = StdRng::seed_from_u64(0x7a11);

        for round in 0..200 {
            let len = rng.gen_range(0..120);
            // Narrow value range forces plenty of ties.
            let values: Vec<f64> = (0..len).map(|_| rng.gen_range(0..25) as f64 / 2.0).collect();
            let order = if round % 2 == 0 { SortOrder::Desc } else { SortOrder::Asc };

            let (sorted, stats) = sort_values(&values, order);

            let mut expected = values.clone();
            expected.sort_by(|a, b| a.partial_cmp(b).unwrap());
            if order == SortOrder::Desc {
                expected.reverse();
            }
            assert_eq!(sorted, expected);

            let (_, again) = sort_values(&values, order);
            assert_eq!(stats, again);

            if len > 1 {
                assert!(stats.comparisons >= (len - 1) as u64);
            }
        }
    }

    #[test]
    fn test_permutation_preserves_records() {
        let mut rng = StdRng::seed_from_u64(99);
        let trips: Vec<Trip> = (0..60)
            .map(|i| distance_trip(&format!("trip_{i}"), rng.gen_range(0..10) as f64))
            .collect();

        let mut ranked = trips.clone();
        QuickSortRanker::new().rank(&mut ranked, SortKey::Distance, SortOrder::Desc);

        let mut before: Vec<&str> = trips.iter().map(|t| t.id.as_str()).collect();
        let mut after: Vec<&str> = ranked.iter().map(|t| t.id.as_str()).collect();
        before.sort_unstable();
        after.sort_unstable();
        assert_eq!(before, after);

        for pair in ranked.windows(2) {
            assert!(value(&pair[0], SortKey::Distance) >= value(&pair[1], SortKey::Distance));
        }
    }

    #[test]
    fn test_reranking_keeps_key_sequence() {
        let values = [4.0, 9.0, 1.0, 9.0, 3.0, 3.0, 7.0];
        let (once, _) = sort_values(&values, SortOrder::Asc);
        let (twice, _) = sort_values(&once, SortOrder::Asc);
        assert_eq!(once, twice);
    }
}
