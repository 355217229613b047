pub mod key;
pub mod quicksort;

use serde::{Deserialize, Serialize};

use crate::core::Trip;
use crate::error::{MobilityError, Result};

pub use key::{SortKey, SortOrder};
pub use quicksort::{QuickSortRanker, RankStats};

/// Number of trips returned when the caller gives no limit
pub const DEFAULT_RANK_LIMIT: i64 = 100;

/// Cost and size metadata of one ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingStats {
    /// Input size before truncation
    pub total_trips: usize,
    pub comparisons: u64,
    pub swaps: u64,
    /// Theoretical bound of the algorithm, not derived from the counters
    pub complexity: String,
}

/// Ranked, truncated trips with the parameters and cost of the ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingResult {
    pub trips: Vec<Trip>,
    pub algorithm: String,
    /// Sort key token as requested
    pub sort_by: String,
    /// Order token as requested
    pub order: String,
    pub stats: RankingStats,
}

/// Rank a copy of `trips` and keep the first `limit`
///
/// `sort_by` and `order` are request tokens, resolved through
/// [`SortKey::from`] and [`SortOrder::from`] and echoed back verbatim.
/// A `limit` of zero yields no trips, a negative one is rejected.
pub fn rank_trips(trips: &[Trip], sort_by: &str, order: &str, limit: i64) -> Result<RankingResult> {
    if limit < 0 {
        return Err(MobilityError::InvalidLimit(limit));
    }

    let key = SortKey::from(sort_by);
    let direction = SortOrder::from(order);

    let mut working = trips.to_vec();
    let mut ranker = QuickSortRanker::new();
    ranker.rank(&mut working, key, direction);
    let stats = ranker.stats();

    tracing::debug!(
        "Ranked {} trips by {} {}: {} comparisons, {} swaps",
        trips.len(),
        key.as_str(),
        direction.as_str(),
        stats.comparisons,
        stats.swaps
    );

    let keep = usize::try_from(limit).unwrap_or(usize::MAX);
    working.truncate(keep);

    Ok(RankingResult {
        trips: working,
        algorithm: QuickSortRanker::NAME.to_string(),
        sort_by: sort_by.to_string(),
        order: order.to_string(),
        stats: RankingStats {
            total_trips: trips.len(),
            comparisons: stats.comparisons,
            swaps: stats.swaps,
            complexity: QuickSortRanker::COMPLEXITY.to_string(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback::fallback_trips;
    use crate::ranking::key::value;

    fn distances(result: &RankingResult) -> Vec<f64> {
        result
            .trips
            .iter()
            .map(|t| value(t, SortKey::Distance))
            .collect()
    }

    #[test]
    fn test_rank_fallback_batch() {
        let trips = fallback_trips();
        let result = rank_trips(&trips, "distance", "desc", 100).unwrap();

        assert_eq!(distances(&result), vec![12.5, 9.3, 8.1, 6.8, 5.2]);
        assert_eq!(result.algorithm, "QuickSort");
        assert_eq!(result.stats.total_trips, 5);
        assert_eq!(result.stats.comparisons, 7);
        assert_eq!(result.stats.swaps, 5);
        assert_eq!(result.stats.complexity, "O(n log n) average, O(n²) worst");
    }

    #[test]
    fn test_input_is_untouched() {
        let trips = fallback_trips();
        let snapshot = trips.clone();
        let _ = rank_trips(&trips, "distance", "desc", 2).unwrap();
        assert_eq!(trips, snapshot);
    }

    #[test]
    fn test_truncation() {
        let trips = fallback_trips();

        let result = rank_trips(&trips, "distance", "desc", 2).unwrap();
        assert_eq!(distances(&result), vec![12.5, 9.3]);
        assert_eq!(result.stats.total_trips, 5);

        let result = rank_trips(&trips, "distance", "desc", 50).unwrap();
        assert_eq!(result.trips.len(), 5);
    }

    #[test]
    fn test_zero_limit_is_empty_but_sorted() {
        let result = rank_trips(&fallback_trips(), "distance", "desc", 0).unwrap();
        assert!(result.trips.is_empty());
        assert_eq!(result.stats.total_trips, 5);
        assert_eq!(result.stats.comparisons, 7);
    }

    #[test]
    fn test_negative_limit_is_rejected() {
        let err = rank_trips(&fallback_trips(), "distance", "desc", -1).unwrap_err();
        assert!(matches!(err, MobilityError::InvalidLimit(-1)));
    }

    #[test]
    fn test_empty_input() {
        let result = rank_trips(&[], "distance", "desc", 100).unwrap();
        assert!(result.trips.is_empty());
        assert_eq!(result.stats.total_trips, 0);
        assert_eq!(result.stats.comparisons, 0);
        assert_eq!(result.stats.swaps, 0);
    }

    #[test]
    fn test_unknown_tokens_fall_back() {
        let trips = fallback_trips();
        let result = rank_trips(&trips, "tip", "sideways", 100).unwrap();

        // distance key, ascending order; raw tokens echoed
        assert_eq!(distances(&result), vec![5.2, 6.8, 8.1, 9.3, 12.5]);
        assert_eq!(result.sort_by, "tip");
        assert_eq!(result.order, "sideways");
    }

    #[test]
    fn test_rank_by_duration_ties() {
        let trips = fallback_trips();
        let result = rank_trips(&trips, "duration", "desc", 100).unwrap();

        let durations: Vec<f64> = result
            .trips
            .iter()
            .map(|t| value(t, SortKey::Duration))
            .collect();
        assert_eq!(durations, vec![1500.0, 1500.0, 1200.0, 1200.0, 900.0]);
    }

    #[test]
    fn test_missing_analytics_sinks_under_desc() {
        let mut trips = fallback_trips();
        let mut bare = Trip::new("trip_bare");
        bare.vendor_id = Some(1);
        trips.insert(2, bare);

        let result = rank_trips(&trips, "distance", "desc", 100).unwrap();
        assert_eq!(result.trips.last().map(|t| t.id.as_str()), Some("trip_bare"));
    }

    #[test]
    fn test_response_shape() {
        let result = rank_trips(&fallback_trips(), "speed", "asc", 1).unwrap();
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["algorithm"], "QuickSort");
        assert_eq!(json["sortBy"], "speed");
        assert_eq!(json["order"], "asc");
        assert_eq!(json["stats"]["totalTrips"], 5);
        assert_eq!(json["trips"][0]["id"], "trip_4");
        assert_eq!(json["trips"][0]["analytics"]["tripSpeedKmh"], 20.4);
        assert_eq!(json["trips"][0]["vendor"]["name"], "Blue Taxi");
    }
}
