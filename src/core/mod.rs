pub mod summary;
pub mod trip;

pub use summary::{
    AnalysisReport, DailyStat, HourlyStat, OverallStats, TripSummary, VendorSummary,
};
pub use trip::{Trip, TripAnalytics, Vendor};
