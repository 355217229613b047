use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, Transaction};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::core::summary::round2;
use crate::core::{
    AnalysisReport, DailyStat, HourlyStat, OverallStats, Trip, TripAnalytics, Vendor,
    VendorSummary,
};
use crate::error::{MobilityError, Result};
use crate::ranking::key::{parse_float, parse_int};
use crate::store::{TripFilter, TripStore};

/// SQLite-backed trip store
///
/// Schema mirrors the trip loader's tables:
/// ```sql
/// CREATE TABLE vendors (vendor_id INTEGER PRIMARY KEY, name TEXT);
/// CREATE TABLE trips (id TEXT PRIMARY KEY, vendor_id INTEGER, pickup_datetime TEXT, ...);
/// CREATE TABLE trip_analytics (trip_id TEXT PRIMARY KEY, pickup_hour TEXT, ...);
/// ```
/// Datetimes are stored as RFC 3339 UTC text with second precision so that
/// string comparison orders them chronologically.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS vendors (
        vendor_id INTEGER PRIMARY KEY,
        name TEXT
    );
    CREATE TABLE IF NOT EXISTS trips (
        id TEXT PRIMARY KEY,
        vendor_id INTEGER REFERENCES vendors(vendor_id),
        pickup_datetime TEXT,
        dropoff_datetime TEXT,
        passenger_count INTEGER,
        pickup_longitude REAL,
        pickup_latitude REAL,
        dropoff_longitude REAL,
        dropoff_latitude REAL,
        store_and_fwd_flag TEXT,
        trip_duration INTEGER,
        fare_amount REAL
    );
    CREATE TABLE IF NOT EXISTS trip_analytics (
        trip_id TEXT PRIMARY KEY REFERENCES trips(id),
        pickup_hour TEXT,
        pickup_dayofweek TEXT,
        trip_distance_km REAL,
        trip_duration_hours REAL,
        trip_speed_kmh REAL
    );
    CREATE INDEX IF NOT EXISTS idx_trips_pickup ON trips(pickup_datetime);
    CREATE INDEX IF NOT EXISTS idx_trips_vendor ON trips(vendor_id);
    CREATE INDEX IF NOT EXISTS idx_analytics_hour ON trip_analytics(pickup_hour);
";

const TRIP_SELECT: &str = "
    SELECT t.id, t.vendor_id, t.pickup_datetime, t.dropoff_datetime, t.passenger_count,
           t.pickup_longitude, t.pickup_latitude, t.dropoff_longitude, t.dropoff_latitude,
           t.store_and_fwd_flag, t.trip_duration, t.fare_amount,
           v.vendor_id, v.name,
           a.trip_id, a.pickup_hour, a.pickup_dayofweek,
           a.trip_distance_km, a.trip_duration_hours, a.trip_speed_kmh
    FROM trips t
    LEFT JOIN vendors v ON v.vendor_id = t.vendor_id
    LEFT JOIN trip_analytics a ON a.trip_id = t.id
";

impl SqliteStore {
    /// Open (or create) the database at `db_path`; `:memory:` is accepted
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| MobilityError::Store(format!("connection lock poisoned: {}", e)))
    }

    fn format_datetime(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    fn parse_datetime(raw: Option<String>) -> Option<DateTime<Utc>> {
        raw.and_then(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
        })
    }

    fn trip_from_row(row: &Row<'_>) -> rusqlite::Result<Trip> {
        let vendor_id: Option<i64> = row.get(1)?;
        let trip_duration: Option<i64> = row.get(10)?;
        let fare_amount: Option<f64> = row.get(11)?;

        let vendor = match row.get::<_, Option<i64>>(12)? {
            Some(id) => Some(Vendor {
                vendor_id: id,
                name: row.get(13)?,
            }),
            None => None,
        };

        let analytics = match row.get::<_, Option<String>>(14)? {
            Some(trip_id) => Some(TripAnalytics {
                trip_id: Some(trip_id),
                pickup_hour: row.get(15)?,
                pickup_dayofweek: row.get(16)?,
                trip_distance_km: row.get::<_, Option<f64>>(17)?.map(Value::from),
                trip_duration_hours: row.get::<_, Option<f64>>(18)?.map(Value::from),
                trip_speed_kmh: row.get::<_, Option<f64>>(19)?.map(Value::from),
            }),
            None => None,
        };

        Ok(Trip {
            id: row.get(0)?,
            vendor_id,
            pickup_datetime: Self::parse_datetime(row.get(2)?),
            dropoff_datetime: Self::parse_datetime(row.get(3)?),
            passenger_count: row.get(4)?,
            pickup_longitude: row.get(5)?,
            pickup_latitude: row.get(6)?,
            dropoff_longitude: row.get(7)?,
            dropoff_latitude: row.get(8)?,
            store_and_fwd_flag: row.get(9)?,
            trip_duration: trip_duration.map(Value::from),
            fare_amount: fare_amount.map(Value::from),
            vendor,
            analytics,
            extra: Default::default(),
        })
    }

    fn query_trips(conn: &Connection, sql: &str, args: &[SqlValue]) -> Result<Vec<Trip>> {
        let mut stmt = conn.prepare(sql)?;
        let trips = stmt
            .query_map(params_from_iter(args.iter()), Self::trip_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(trips)
    }

    fn vendor_from_row(row: &Row<'_>) -> rusqlite::Result<VendorSummary> {
        Ok(VendorSummary::new(row.get(0)?, row.get(1)?, row.get(2)?))
    }

    /// Write one trip with its vendor and analytics; returns 1 when the trip
    /// row is new. Numeric fields that do not parse are stored as NULL.
    fn write_trip(tx: &Transaction<'_>, trip: &Trip) -> Result<usize> {
        if let Some(vendor_id) = trip.vendor_id {
            tx.execute(
                "INSERT OR IGNORE INTO vendors (vendor_id, name) VALUES (?1, ?2)",
                params![vendor_id, trip.vendor_name()],
            )?;
        }

        let written = tx.execute(
            "INSERT OR IGNORE INTO trips (id, vendor_id, pickup_datetime, dropoff_datetime,
                passenger_count, pickup_longitude, pickup_latitude, dropoff_longitude,
                dropoff_latitude, store_and_fwd_flag, trip_duration, fare_amount)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                trip.id,
                trip.vendor_id,
                trip.pickup_datetime.as_ref().map(Self::format_datetime),
                trip.dropoff_datetime.as_ref().map(Self::format_datetime),
                trip.passenger_count,
                trip.pickup_longitude,
                trip.pickup_latitude,
                trip.dropoff_longitude,
                trip.dropoff_latitude,
                trip.store_and_fwd_flag,
                parse_int(trip.trip_duration.as_ref()).map(|secs| secs as i64),
                parse_float(trip.fare_amount.as_ref()),
            ],
        )?;

        if let Some(analytics) = &trip.analytics {
            tx.execute(
                "INSERT OR IGNORE INTO trip_analytics (trip_id, pickup_hour, pickup_dayofweek,
                    trip_distance_km, trip_duration_hours, trip_speed_kmh)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    trip.id,
                    analytics.pickup_hour,
                    analytics.pickup_dayofweek,
                    parse_float(analytics.trip_distance_km.as_ref()),
                    parse_float(analytics.trip_duration_hours.as_ref()),
                    parse_float(analytics.trip_speed_kmh.as_ref()),
                ],
            )?;
        }

        Ok(written)
    }
}

#[async_trait]
impl TripStore for SqliteStore {
    async fn insert_vendor(&self, vendor_id: i64, name: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO vendors (vendor_id, name) VALUES (?1, ?2)",
            params![vendor_id, name],
        )?;
        Ok(())
    }

    async fn insert_trip(&self, trip: &Trip) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        Self::write_trip(&tx, trip)?;
        tx.commit()?;
        Ok(())
    }

    async fn insert_trips(&self, trips: &[Trip]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut written = 0;
        for trip in trips {
            written += Self::write_trip(&tx, trip)?;
        }
        tx.commit()?;
        Ok(written)
    }

    async fn trip_ids(&self) -> Result<HashSet<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id FROM trips")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<HashSet<String>>>()?;
        Ok(ids)
    }

    async fn list_trips(&self, filter: &TripFilter) -> Result<Vec<Trip>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut args: Vec<SqlValue> = Vec::new();

        if let Some(vendor_id) = filter.vendor_id {
            clauses.push("t.vendor_id = ?");
            args.push(SqlValue::Integer(vendor_id));
        }
        if let Some((start, end)) = filter.date_range() {
            clauses.push("t.pickup_datetime BETWEEN ? AND ?");
            args.push(SqlValue::Text(Self::format_datetime(&start)));
            args.push(SqlValue::Text(Self::format_datetime(&end)));
        }
        if let Some(hour) = filter.hour {
            clauses.push("a.pickup_hour = ?");
            args.push(SqlValue::Text(hour.to_string()));
        }
        if let Some(min_distance) = filter.min_distance {
            clauses.push("a.trip_distance_km >= ?");
            args.push(SqlValue::Real(min_distance));
        }

        let mut sql = String::from(TRIP_SELECT);
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY t.pickup_datetime DESC LIMIT ? OFFSET ?");
        args.push(SqlValue::Integer(i64::from(filter.limit)));
        args.push(SqlValue::Integer(filter.offset() as i64));

        let conn = self.conn()?;
        let trips = Self::query_trips(&conn, &sql, &args)?;
        tracing::debug!("Listed {} trips (page {})", trips.len(), filter.page);
        Ok(trips)
    }

    async fn get_trip(&self, id: &str) -> Result<Option<Trip>> {
        let conn = self.conn()?;
        let sql = format!("{} WHERE t.id = ?1", TRIP_SELECT);
        let trip = conn
            .query_row(&sql, params![id], Self::trip_from_row)
            .optional()?;
        Ok(trip)
    }

    async fn delete_trip(&self, id: &str) -> Result<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM trip_analytics WHERE trip_id = ?1", params![id])?;
        let deleted = tx.execute("DELETE FROM trips WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    async fn fetch_trips(&self, cap: usize) -> Result<Vec<Trip>> {
        let conn = self.conn()?;
        let sql = format!("{} ORDER BY t.rowid LIMIT ?", TRIP_SELECT);
        let cap = i64::try_from(cap).unwrap_or(i64::MAX);
        Self::query_trips(&conn, &sql, &[SqlValue::Integer(cap)])
    }

    async fn list_vendors(&self) -> Result<Vec<VendorSummary>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT v.vendor_id, v.name, COUNT(t.id)
             FROM vendors v
             LEFT JOIN trips t ON v.vendor_id = t.vendor_id
             GROUP BY v.vendor_id, v.name
             ORDER BY v.vendor_id",
        )?;
        let vendors = stmt
            .query_map([], Self::vendor_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(vendors)
    }

    async fn get_vendor(&self, vendor_id: i64) -> Result<Option<VendorSummary>> {
        let conn = self.conn()?;
        let vendor = conn
            .query_row(
                "SELECT v.vendor_id, v.name, COUNT(t.id)
                 FROM vendors v
                 LEFT JOIN trips t ON v.vendor_id = t.vendor_id
                 WHERE v.vendor_id = ?1
                 GROUP BY v.vendor_id, v.name",
                params![vendor_id],
                Self::vendor_from_row,
            )
            .optional()?;
        Ok(vendor)
    }

    async fn analyze(&self) -> Result<AnalysisReport> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT pickup_hour, COUNT(*), AVG(trip_speed_kmh), AVG(trip_distance_km)
             FROM trip_analytics
             WHERE pickup_hour IS NOT NULL
             GROUP BY pickup_hour
             ORDER BY CAST(pickup_hour AS INTEGER)
             LIMIT 24",
        )?;
        let hourly_stats = stmt
            .query_map([], |row| {
                Ok(HourlyStat {
                    pickup_hour: row.get(0)?,
                    trip_count: row.get(1)?,
                    avg_speed: round2(row.get::<_, Option<f64>>(2)?.unwrap_or_default()),
                    avg_distance: round2(row.get::<_, Option<f64>>(3)?.unwrap_or_default()),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(
            "SELECT pickup_dayofweek, COUNT(*), AVG(trip_speed_kmh), AVG(trip_distance_km)
             FROM trip_analytics
             WHERE pickup_dayofweek IS NOT NULL
             GROUP BY pickup_dayofweek
             ORDER BY pickup_dayofweek
             LIMIT 7",
        )?;
        let daily_stats = stmt
            .query_map([], |row| {
                Ok(DailyStat {
                    pickup_dayofweek: row.get(0)?,
                    trip_count: row.get(1)?,
                    avg_speed: round2(row.get::<_, Option<f64>>(2)?.unwrap_or_default()),
                    avg_distance: round2(row.get::<_, Option<f64>>(3)?.unwrap_or_default()),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let overall_stats = conn.query_row(
            "SELECT COUNT(*), AVG(trip_duration), AVG(passenger_count) FROM trips",
            [],
            |row| {
                Ok(OverallStats {
                    total_trips: row.get(0)?,
                    avg_duration: round2(row.get::<_, Option<f64>>(1)?.unwrap_or_default()),
                    avg_passengers: round2(row.get::<_, Option<f64>>(2)?.unwrap_or_default()),
                })
            },
        )?;

        Ok(AnalysisReport {
            hourly_stats,
            daily_stats,
            overall_stats,
        })
    }
}
