use std::io::Read;
use std::sync::Arc;
use std::time::Instant;

use crate::core::{AnalysisReport, Trip, TripSummary, VendorSummary};
use crate::error::{MobilityError, Result};
use crate::fallback::{fallback_trips, fallback_vendors, filter_fallback_trips};
use crate::ingest::{import_records, read_records, ImportSummary};
use crate::ranking::{rank_trips, RankingResult, DEFAULT_RANK_LIMIT};
use crate::store::{SqliteStore, TripFilter, TripStore, RANK_FETCH_CAP};

/// Trip explorer orchestrator: store access, fallback data and ranking
pub struct MobilityEngine {
    store: Arc<dyn TripStore>,
    options: EngineOptions,
}

/// Engine options/configuration
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Trips fetched from the store before ranking
    pub fetch_cap: usize,
    /// Serve the fixed dataset when the store fails
    pub use_fallback: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            fetch_cap: RANK_FETCH_CAP,
            use_fallback: true,
        }
    }
}

/// Trip listing parameters
#[derive(Debug, Clone, Default)]
pub struct TripQuery {
    pub filter: TripFilter,
    /// Bounds on the estimated fare
    pub min_fare: Option<f64>,
    pub max_fare: Option<f64>,
}

/// Ranking request parameters, as raw tokens
#[derive(Debug, Clone)]
pub struct RankQuery {
    pub sort_by: String,
    pub order: String,
    pub limit: i64,
}

impl Default for RankQuery {
    fn default() -> Self {
        Self {
            sort_by: "distance".to_string(),
            order: "desc".to_string(),
            limit: DEFAULT_RANK_LIMIT,
        }
    }
}

impl MobilityEngine {
    /// Create engine backed by a SQLite database
    pub async fn new(db_path: impl AsRef<str>) -> Result<Self> {
        let store = Arc::new(SqliteStore::new(db_path.as_ref()).await?);
        Ok(Self::with_store(store, EngineOptions::default()))
    }

    /// Create engine over any store
    pub fn with_store(store: Arc<dyn TripStore>, options: EngineOptions) -> Self {
        Self { store, options }
    }

    fn fallback_or<T>(&self, what: &str, err: MobilityError, fallback: impl FnOnce() -> T) -> Result<T> {
        if self.options.use_fallback {
            tracing::warn!("⚠️ Store unavailable for {}, serving fallback data: {}", what, err);
            Ok(fallback())
        } else {
            Err(err)
        }
    }

    /// Filtered page of trips in the flat dashboard shape
    pub async fn list_trips(&self, query: &TripQuery) -> Result<Vec<TripSummary>> {
        let trips = match self.store.list_trips(&query.filter).await {
            Ok(trips) => trips,
            Err(e) => self.fallback_or("trip listing", e, || filter_fallback_trips(&query.filter))?,
        };

        let summaries = trips.iter().map(TripSummary::from);

        if query.min_fare.is_none() && query.max_fare.is_none() {
            return Ok(summaries.collect());
        }

        let min = query.min_fare.unwrap_or(0.0);
        let max = query.max_fare.unwrap_or(f64::INFINITY);
        Ok(summaries
            .filter(|s| s.fare_amount >= min && s.fare_amount <= max)
            .collect())
    }

    pub async fn get_trip(&self, id: &str) -> Result<Trip> {
        self.store
            .get_trip(id)
            .await?
            .ok_or_else(|| MobilityError::NotFound(format!("trip {}", id)))
    }

    pub async fn delete_trip(&self, id: &str) -> Result<()> {
        if self.store.delete_trip(id).await? {
            tracing::info!("🗑️ Deleted trip {}", id);
            Ok(())
        } else {
            Err(MobilityError::NotFound(format!("trip {}", id)))
        }
    }

    /// Fetch a bounded batch and rank it
    pub async fn ranked_trips(&self, query: &RankQuery) -> Result<RankingResult> {
        let start = Instant::now();

        let trips = match self.store.fetch_trips(self.options.fetch_cap).await {
            Ok(trips) => trips,
            Err(e) => self.fallback_or("ranking", e, fallback_trips)?,
        };

        let result = rank_trips(&trips, &query.sort_by, &query.order, query.limit)?;

        tracing::info!(
            "🏁 Ranked {} trips by {} {} → {} returned ({} comparisons, {} swaps, {:.2}ms)",
            result.stats.total_trips,
            query.sort_by,
            query.order,
            result.trips.len(),
            result.stats.comparisons,
            result.stats.swaps,
            start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(result)
    }

    pub async fn analyze(&self) -> Result<AnalysisReport> {
        self.store.analyze().await
    }

    pub async fn list_vendors(&self) -> Result<Vec<VendorSummary>> {
        match self.store.list_vendors().await {
            Ok(vendors) => Ok(vendors),
            Err(e) => self.fallback_or("vendor listing", e, fallback_vendors),
        }
    }

    pub async fn get_vendor(&self, vendor_id: i64) -> Result<VendorSummary> {
        self.store
            .get_vendor(vendor_id)
            .await?
            .ok_or_else(|| MobilityError::NotFound(format!("vendor {}", vendor_id)))
    }

    /// Load the fallback dataset into the store; returns trips written
    pub async fn seed_fallback(&self) -> Result<usize> {
        let trips = fallback_trips();
        for trip in &trips {
            self.store.insert_trip(trip).await?;
        }
        Ok(trips.len())
    }

    /// Import a trip CSV, deriving analytics and skipping stored ids
    pub async fn import_csv<R: Read>(&self, reader: R, batch_size: usize) -> Result<ImportSummary> {
        let start = Instant::now();
        let records = read_records(reader)?;
        let summary = import_records(self.store.as_ref(), records, batch_size).await?;
        tracing::info!(
            "📦 Import finished in {:.2}s",
            start.elapsed().as_secs_f64()
        );
        Ok(summary)
    }
}
