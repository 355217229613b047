//! # Mobility Engine
//!
//! Backend for the taxi trip explorer dashboard:
//! - SQLite trip/vendor store with filtered listing and aggregates
//! - Instrumented quicksort ranking of trip batches
//! - Fixed fallback dataset when the store is unavailable
//! - CSV import with derived distance, speed and pickup-time analytics
//! - Multiple interfaces: Rust library, HTTP API, CLI
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use mobility_engine::{MobilityEngine, RankQuery};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = MobilityEngine::new("mobility.db").await?;
//!
//!     let ranked = engine.ranked_trips(&RankQuery {
//!         sort_by: "speed".to_string(),
//!         order: "desc".to_string(),
//!         limit: 10,
//!     }).await?;
//!
//!     println!("{} of {} trips, {} comparisons",
//!         ranked.trips.len(), ranked.stats.total_trips, ranked.stats.comparisons);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod fallback;
pub mod ingest;
pub mod ranking;
pub mod store;

// Re-export primary types
pub use config::ServerConfig;
pub use core::{AnalysisReport, Trip, TripAnalytics, TripSummary, Vendor, VendorSummary};
pub use engine::{EngineOptions, MobilityEngine, RankQuery, TripQuery};
pub use error::{MobilityError, Result};
pub use ingest::{ImportSummary, TripRecord, IMPORT_BATCH_SIZE};
pub use ranking::{rank_trips, RankingResult, RankingStats, SortKey, SortOrder};
pub use store::{SqliteStore, TripFilter, TripStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
