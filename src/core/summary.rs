use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::core::Trip;
use crate::ranking::key::{value, SortKey};

/// Base fare charged on every trip
pub const BASE_FARE: f64 = 2.50;
/// Per-kilometre rate
pub const PER_KM_RATE: f64 = 1.80;
/// Per-minute rate
pub const PER_MINUTE_RATE: f64 = 0.35;

/// Flat trip view served by the trip listing
///
/// Field names are snake_case because the dashboard table binds to them
/// directly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TripSummary {
    pub id: String,
    pub pickup_datetime: Option<String>,
    pub dropoff_datetime: Option<String>,
    pub vendor_id: Option<i64>,
    pub vendor_name: String,
    /// Estimated fare, see [`estimate_fare`]
    pub fare_amount: f64,
    pub distance_km: f64,
    pub avg_speed: f64,
    pub passenger_count: Option<i64>,
    pub trip_duration: Option<i64>,
}

/// Estimate a fare from distance and duration, rounded to cents
pub fn estimate_fare(distance_km: f64, duration_secs: f64) -> f64 {
    let minutes = duration_secs / 60.0;
    let fare = BASE_FARE + distance_km * PER_KM_RATE + minutes * PER_MINUTE_RATE;
    (fare * 100.0).round() / 100.0
}

/// `2023-12-01T08:00:00.000Z`, the form the dashboard parses
fn iso_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl From<&Trip> for TripSummary {
    fn from(trip: &Trip) -> Self {
        let distance_km = value(trip, SortKey::Distance);
        let duration = value(trip, SortKey::Duration);

        Self {
            id: trip.id.clone(),
            pickup_datetime: trip.pickup_datetime.as_ref().map(iso_timestamp),
            dropoff_datetime: trip.dropoff_datetime.as_ref().map(iso_timestamp),
            vendor_id: trip.vendor_id,
            vendor_name: trip.vendor_name(),
            fare_amount: estimate_fare(distance_km, duration),
            distance_km,
            avg_speed: value(trip, SortKey::Speed),
            passenger_count: trip.passenger_count,
            trip_duration: trip.trip_duration.as_ref().map(|_| duration as i64),
        }
    }
}

/// Vendor with its trip count
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VendorSummary {
    pub vendor_id: i64,
    pub name: String,
    pub trip_count: u64,
}

impl VendorSummary {
    pub fn new(vendor_id: i64, name: Option<String>, trip_count: u64) -> Self {
        Self {
            vendor_id,
            name: name.unwrap_or_else(|| format!("Vendor {}", vendor_id)),
            trip_count,
        }
    }
}

/// Aggregates for one pickup hour
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HourlyStat {
    pub pickup_hour: String,
    pub trip_count: u64,
    pub avg_speed: f64,
    pub avg_distance: f64,
}

/// Aggregates for one pickup day of week
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyStat {
    pub pickup_dayofweek: String,
    pub trip_count: u64,
    pub avg_speed: f64,
    pub avg_distance: f64,
}

/// Whole-table aggregates
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OverallStats {
    pub total_trips: u64,
    pub avg_duration: f64,
    pub avg_passengers: f64,
}

/// Response of the analysis endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub hourly_stats: Vec<HourlyStat>,
    pub daily_stats: Vec<DailyStat>,
    pub overall_stats: OverallStats,
}

/// Round to two decimals, as the aggregate columns are reported
pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
