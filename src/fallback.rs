//! Fixed dataset served when the trip store is unavailable.

use chrono::{DateTime, NaiveDate, Utc};

use crate::core::{Trip, VendorSummary};
use crate::store::TripFilter;

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(2023, 12, 1)
        .and_then(|d| d.and_hms_opt(hour, minute, 0))
        .map(|naive| naive.and_utc())
        .unwrap_or_default()
}

/// Five sample trips across three vendors
pub fn fallback_trips() -> Vec<Trip> {
    vec![
        Trip::new("trip_1")
            .with_vendor(1, "Green Taxi")
            .with_times(at(8, 30), at(8, 45))
            .with_passengers(2)
            .with_duration(900)
            .with_analytics(5.2, 20.8, 8),
        Trip::new("trip_2")
            .with_vendor(2, "Yellow Taxi")
            .with_times(at(9, 15), at(9, 35))
            .with_passengers(1)
            .with_duration(1200)
            .with_analytics(8.1, 24.3, 9),
        Trip::new("trip_3")
            .with_vendor(1, "Green Taxi")
            .with_times(at(10, 0), at(10, 25))
            .with_passengers(3)
            .with_duration(1500)
            .with_analytics(12.5, 30.0, 10),
        Trip::new("trip_4")
            .with_vendor(3, "Blue Taxi")
            .with_times(at(11, 30), at(11, 50))
            .with_passengers(1)
            .with_duration(1200)
            .with_analytics(6.8, 20.4, 11),
        Trip::new("trip_5")
            .with_vendor(2, "Yellow Taxi")
            .with_times(at(14, 15), at(14, 40))
            .with_passengers(2)
            .with_duration(1500)
            .with_analytics(9.3, 22.3, 14),
    ]
}

/// Vendors matching [`fallback_trips`]
pub fn fallback_vendors() -> Vec<VendorSummary> {
    vec![
        VendorSummary::new(1, Some("Green Taxi".into()), 2),
        VendorSummary::new(2, Some("Yellow Taxi".into()), 2),
        VendorSummary::new(3, Some("Blue Taxi".into()), 1),
    ]
}

/// Fallback trips narrowed by vendor and pickup hour, then paged
pub fn filter_fallback_trips(filter: &TripFilter) -> Vec<Trip> {
    let hour = filter.hour.map(|h| h.to_string());

    fallback_trips()
        .into_iter()
        .filter(|trip| filter.vendor_id.map_or(true, |id| trip.vendor_id == Some(id)))
        .filter(|trip| match &hour {
            Some(hour) => trip
                .analytics
                .as_ref()
                .and_then(|a| a.pickup_hour.as_ref())
                .is_some_and(|h| h == hour),
            None => true,
        })
        .skip(filter.offset())
        .take(filter.limit as usize)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_shape() {
        let trips = fallback_trips();
        assert_eq!(trips.len(), 5);
        assert!(trips.iter().all(|t| t.vendor.is_some() && t.analytics.is_some()));

        let vendors = fallback_vendors();
        let total: u64 = vendors.iter().map(|v| v.trip_count).sum();
        assert_eq!(total as usize, trips.len());
    }

    #[test]
    fn test_filter_by_vendor() {
        let filter = TripFilter {
            vendor_id: Some(2),
            ..TripFilter::default()
        };
        let ids: Vec<String> = filter_fallback_trips(&filter).into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["trip_2", "trip_5"]);
    }

    #[test]
    fn test_filter_by_hour() {
        let filter = TripFilter {
            hour: Some(10),
            ..TripFilter::default()
        };
        let trips = filter_fallback_trips(&filter);
        assert_eq!(trips.len(), 1);
        assert_eq!(trips[0].id, "trip_3");
    }

    #[test]
    fn test_paging() {
        let filter = TripFilter {
            page: 2,
            limit: 2,
            ..TripFilter::default()
        };
        let ids: Vec<String> = filter_fallback_trips(&filter).into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["trip_3", "trip_4"]);
    }
}
