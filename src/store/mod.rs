pub mod sqlite;

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::core::{AnalysisReport, Trip, VendorSummary};
use crate::error::Result;

pub use sqlite::SqliteStore;

/// Upper bound on trips handed to the ranker per request
pub const RANK_FETCH_CAP: usize = 1000;

/// Trait for trip storage backends
#[async_trait]
pub trait TripStore: Send + Sync {
    /// Insert a vendor, ignoring duplicates
    async fn insert_vendor(&self, vendor_id: i64, name: &str) -> Result<()>;

    /// Insert a trip with its vendor and analytics rows, ignoring duplicates
    async fn insert_trip(&self, trip: &Trip) -> Result<()>;

    /// Insert trips in one transaction; returns how many were new
    async fn insert_trips(&self, trips: &[Trip]) -> Result<usize>;

    /// Ids of every stored trip
    async fn trip_ids(&self) -> Result<HashSet<String>>;

    /// Filtered page of trips, newest pickup first
    async fn list_trips(&self, filter: &TripFilter) -> Result<Vec<Trip>>;

    /// Single trip with vendor and analytics joined
    async fn get_trip(&self, id: &str) -> Result<Option<Trip>>;

    /// Delete a trip and its analytics; false when it did not exist
    async fn delete_trip(&self, id: &str) -> Result<bool>;

    /// Up to `cap` trips with vendor and analytics, in storage order
    async fn fetch_trips(&self, cap: usize) -> Result<Vec<Trip>>;

    /// All vendors with trip counts, by vendor id
    async fn list_vendors(&self) -> Result<Vec<VendorSummary>>;

    /// Single vendor with its trip count
    async fn get_vendor(&self, vendor_id: i64) -> Result<Option<VendorSummary>>;

    /// Hourly, daily and overall aggregates
    async fn analyze(&self) -> Result<AnalysisReport>;
}

/// Trip listing filter and page
#[derive(Debug, Clone)]
pub struct TripFilter {
    pub vendor_id: Option<i64>,
    /// Pickup range; applied only when both bounds are set
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// Pickup hour (0-23)
    pub hour: Option<u32>,
    pub min_distance: Option<f64>,
    /// 1-based page number
    pub page: u32,
    pub limit: u32,
}

impl Default for TripFilter {
    fn default() -> Self {
        Self {
            vendor_id: None,
            start_date: None,
            end_date: None,
            hour: None,
            min_distance: None,
            page: 1,
            limit: 100,
        }
    }
}

impl TripFilter {
    /// Rows skipped before this page
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1) as usize * self.limit as usize
    }

    /// Pickup range, if both bounds are present
    pub fn date_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        self.start_date.zip(self.end_date)
    }
}
