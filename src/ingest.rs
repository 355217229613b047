//! Trip CSV import.
//!
//! Reads raw trip rows in the taxi dataset layout (`id, vendor_id,
//! pickup_datetime, dropoff_datetime, passenger_count, pickup/dropoff
//! longitude/latitude, store_and_fwd_flag, trip_duration`), derives the
//! analytics columns and writes the trips to a [`TripStore`] in batches.
//! Ids already in the store, or repeated within the file, are skipped.
//! Extra columns are ignored, so a file that already carries derived
//! columns imports the same way.

use std::io::Read;

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::core::summary::round2;
use crate::core::{Trip, TripAnalytics};
use crate::error::Result;
use crate::store::TripStore;

/// Trips written per store transaction
pub const IMPORT_BATCH_SIZE: usize = 5000;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// One row of the trip CSV
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TripRecord {
    pub id: String,
    pub vendor_id: i64,
    pub pickup_datetime: String,
    pub dropoff_datetime: String,
    pub passenger_count: Option<i64>,
    pub pickup_longitude: f64,
    pub pickup_latitude: f64,
    pub dropoff_longitude: f64,
    pub dropoff_latitude: f64,
    pub store_and_fwd_flag: Option<String>,
    /// Seconds
    pub trip_duration: i64,
}

/// Outcome of one import run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub rows_read: usize,
    /// Rows whose id was already stored or seen earlier in the file
    pub skipped: usize,
    pub imported: usize,
    pub batches: usize,
}

/// Great-circle distance in kilometres between two points in degrees
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1, lat2) = (lat1.to_radians(), lat2.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * a.sqrt().asin() * EARTH_RADIUS_KM
}

/// `YYYY-MM-DD HH:MM:SS` (UTC) or RFC 3339; `None` when neither parses
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

impl TripRecord {
    /// Analytics derived from coordinates, duration and pickup time
    ///
    /// Distance is rounded to 2 decimals before the speed is computed from
    /// it. A non-positive duration leaves the speed empty.
    pub fn analytics(&self) -> TripAnalytics {
        let pickup = parse_timestamp(&self.pickup_datetime);
        let distance_km = round2(haversine_km(
            self.pickup_latitude,
            self.pickup_longitude,
            self.dropoff_latitude,
            self.dropoff_longitude,
        ));
        let duration_hours = self.trip_duration as f64 / 3600.0;
        let speed_kmh = (self.trip_duration > 0).then(|| round2(distance_km / duration_hours));

        TripAnalytics {
            trip_id: Some(self.id.clone()),
            pickup_hour: pickup.map(|dt| dt.hour().to_string()),
            pickup_dayofweek: pickup.map(|dt| dt.format("%A").to_string()),
            trip_distance_km: Some(Value::from(distance_km)),
            trip_duration_hours: Some(Value::from(duration_hours)),
            trip_speed_kmh: speed_kmh.map(Value::from),
        }
    }

    pub fn into_trip(self) -> Trip {
        let analytics = self.analytics();
        let vendor_name = format!("Vendor {}", self.vendor_id);

        let mut trip = Trip::new(self.id)
            .with_vendor(self.vendor_id, vendor_name)
            .with_duration(self.trip_duration);
        trip.pickup_datetime = parse_timestamp(&self.pickup_datetime);
        trip.dropoff_datetime = parse_timestamp(&self.dropoff_datetime);
        trip.passenger_count = self.passenger_count;
        trip.pickup_longitude = Some(self.pickup_longitude);
        trip.pickup_latitude = Some(self.pickup_latitude);
        trip.dropoff_longitude = Some(self.dropoff_longitude);
        trip.dropoff_latitude = Some(self.dropoff_latitude);
        trip.store_and_fwd_flag = self.store_and_fwd_flag;
        trip.analytics = Some(analytics);
        trip
    }
}

/// Parse every row of a trip CSV with a header line
pub fn read_records<R: Read>(reader: R) -> Result<Vec<TripRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let records = csv_reader
        .deserialize()
        .collect::<std::result::Result<Vec<TripRecord>, csv::Error>>()?;
    Ok(records)
}

/// Write records not yet stored, `batch_size` trips per transaction
pub async fn import_records(
    store: &dyn TripStore,
    records: Vec<TripRecord>,
    batch_size: usize,
) -> Result<ImportSummary> {
    let rows_read = records.len();
    let mut seen = store.trip_ids().await?;
    tracing::info!("📥 Importing {} rows ({} trips already stored)", rows_read, seen.len());

    let fresh: Vec<Trip> = records
        .into_iter()
        .filter(|record| seen.insert(record.id.clone()))
        .map(TripRecord::into_trip)
        .collect();

    let mut summary = ImportSummary {
        rows_read,
        skipped: rows_read - fresh.len(),
        ..ImportSummary::default()
    };

    let mut done = 0;
    for batch in fresh.chunks(batch_size.max(1)) {
        summary.imported += store.insert_trips(batch).await?;
        summary.batches += 1;
        done += batch.len();
        tracing::info!(
            "Progress: {}/{} ({:.1}%)",
            done,
            fresh.len(),
            done as f64 / fresh.len() as f64 * 100.0
        );
    }

    tracing::info!(
        "✅ Imported {} trips, skipped {}",
        summary.imported,
        summary.skipped
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MobilityError;
    use crate::ranking::key::{value, SortKey};
    use crate::store::SqliteStore;

    const SAMPLE: &str = "\
id,vendor_id,pickup_datetime,dropoff_datetime,passenger_count,pickup_longitude,pickup_latitude,dropoff_longitude,dropoff_latitude,store_and_fwd_flag,trip_duration
id2875421,2,2016-03-14 17:24:55,2016-03-14 17:32:30,1,-73.982154846191406,40.767936706542969,-73.964630126953125,40.765602111816406,N,455
id2377394,1,2016-06-12 00:43:35,2016-06-12 00:54:38,1,-73.980415344238281,40.738563537597656,-73.999481201171875,40.731151580810547,N,663
id2875421,2,2016-03-14 17:24:55,2016-03-14 17:32:30,1,-73.982154846191406,40.767936706542969,-73.964630126953125,40.765602111816406,N,455
";

    fn sample_records() -> Vec<TripRecord> {
        read_records(SAMPLE.as_bytes()).unwrap()
    }

    #[test]
    fn test_haversine() {
        assert!((haversine_km(0.0, 0.0, 0.0, 1.0) - 111.19).abs() < 0.01);
        assert_eq!(haversine_km(40.7, -73.9, 40.7, -73.9), 0.0);
    }

    #[test]
    fn test_parse_timestamp() {
        let expected = "2016-03-14T17:24:55Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(parse_timestamp("2016-03-14 17:24:55"), Some(expected));
        assert_eq!(parse_timestamp("2016-03-14T17:24:55.000Z"), Some(expected));
        assert_eq!(parse_timestamp("14/03/2016"), None);
    }

    #[test]
    fn test_derived_analytics() {
        let records = sample_records();
        assert_eq!(records.len(), 3);

        let trip = records[0].clone().into_trip();
        assert_eq!(trip.vendor_name(), "Vendor 2");
        assert_eq!(value(&trip, SortKey::Distance), 1.5);
        // 1.50 km over 455 s
        assert_eq!(value(&trip, SortKey::Speed), 11.87);

        let analytics = trip.analytics.unwrap();
        assert_eq!(analytics.pickup_hour.as_deref(), Some("17"));
        assert_eq!(analytics.pickup_dayofweek.as_deref(), Some("Monday"));

        let trip = records[1].clone().into_trip();
        assert_eq!(value(&trip, SortKey::Distance), 1.81);
        assert_eq!(value(&trip, SortKey::Speed), 9.83);
    }

    #[test]
    fn test_zero_duration_has_no_speed() {
        let mut record = sample_records().remove(0);
        record.trip_duration = 0;
        assert_eq!(record.analytics().trip_speed_kmh, None);
    }

    #[test]
    fn test_malformed_row() {
        let bad = "id,vendor_id,pickup_datetime,dropoff_datetime,passenger_count,pickup_longitude,pickup_latitude,dropoff_longitude,dropoff_latitude,store_and_fwd_flag,trip_duration\n\
                   x,two,2016-03-14 17:24:55,2016-03-14 17:32:30,1,0,0,0,0,N,455\n";
        assert!(matches!(read_records(bad.as_bytes()), Err(MobilityError::Csv(_))));
    }

    #[tokio::test]
    async fn test_import_skips_known_ids() {
        let store = SqliteStore::new(":memory:").await.unwrap();

        let first = import_records(&store, sample_records(), 1).await.unwrap();
        assert_eq!(
            first,
            ImportSummary {
                rows_read: 3,
                skipped: 1,
                imported: 2,
                batches: 2,
            }
        );

        let second = import_records(&store, sample_records(), IMPORT_BATCH_SIZE)
            .await
            .unwrap();
        assert_eq!(second.imported, 0);
        assert_eq!(second.skipped, 3);
        assert_eq!(second.batches, 0);

        let vendors = store.list_vendors().await.unwrap();
        let names: Vec<&str> = vendors.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["Vendor 1", "Vendor 2"]);

        let stored = store.get_trip("id2377394").await.unwrap().unwrap();
        assert_eq!(value(&stored, SortKey::Duration), 663.0);
        assert_eq!(stored.store_and_fwd_flag.as_deref(), Some("N"));
    }
}
