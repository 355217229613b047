use clap::{Parser, Subcommand};
use mobility_engine::{
    ranking::key::{value, SortKey},
    MobilityEngine, RankQuery, IMPORT_BATCH_SIZE,
};
use std::fs::File;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mobility-cli")]
#[command(about = "Mobility Data Explorer CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Database path
    #[arg(short, long, default_value = "mobility.db")]
    db: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank stored trips
    Rank {
        /// Sort key: distance, speed, duration or fare
        #[arg(short, long, default_value = "distance")]
        sort_by: String,

        /// Sort order: asc or desc
        #[arg(short, long, default_value = "desc")]
        order: String,

        /// Number of trips to show
        #[arg(short, long, default_value = "10", allow_negative_numbers = true)]
        limit: i64,
    },

    /// List vendors with trip counts
    Vendors,

    /// Show hourly, daily and overall aggregates
    Analyze,

    /// Load the built-in sample trips into the database
    Seed,

    /// Import trips from a CSV file, deriving distance and speed
    Import {
        /// CSV file with a header row
        path: PathBuf,

        /// Trips written per transaction
        #[arg(short, long, default_value_t = IMPORT_BATCH_SIZE)]
        batch_size: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let engine = MobilityEngine::new(&cli.db).await?;

    match cli.command {
        Commands::Rank { sort_by, order, limit } => {
            let key = SortKey::from(sort_by.as_str());
            let result = engine
                .ranked_trips(&RankQuery {
                    sort_by,
                    order,
                    limit,
                })
                .await?;

            println!(
                "🏁 Top {} of {} trips by {} ({})",
                result.trips.len(),
                result.stats.total_trips,
                key.as_str(),
                result.order
            );
            for (i, trip) in result.trips.iter().enumerate() {
                println!(
                    "   {:>3}. {:<12} {:>10.2}  {}",
                    i + 1,
                    trip.id,
                    value(trip, key),
                    trip.vendor_name()
                );
            }

            println!("\n📊 {}", result.algorithm);
            println!("   Comparisons: {}", result.stats.comparisons);
            println!("   Swaps: {}", result.stats.swaps);
            println!("   Complexity: {}", result.stats.complexity);
        }

        Commands::Vendors => {
            let vendors = engine.list_vendors().await?;

            println!("🚕 Vendors:");
            for vendor in vendors {
                println!("   {:>3}  {:<20} {} trips", vendor.vendor_id, vendor.name, vendor.trip_count);
            }
        }

        Commands::Analyze => {
            let report = engine.analyze().await?;

            println!("📊 Overall:");
            println!("   Total trips: {}", report.overall_stats.total_trips);
            println!("   Avg duration: {:.2}s", report.overall_stats.avg_duration);
            println!("   Avg passengers: {:.2}", report.overall_stats.avg_passengers);

            println!("\n🕐 By hour:");
            for stat in &report.hourly_stats {
                println!(
                    "   {:>2}h  {:>6} trips  {:>6.2} km/h  {:>6.2} km",
                    stat.pickup_hour, stat.trip_count, stat.avg_speed, stat.avg_distance
                );
            }

            println!("\n📅 By day:");
            for stat in &report.daily_stats {
                println!(
                    "   {:<10} {:>6} trips  {:>6.2} km/h  {:>6.2} km",
                    stat.pickup_dayofweek, stat.trip_count, stat.avg_speed, stat.avg_distance
                );
            }
        }

        Commands::Seed => {
            let written = engine.seed_fallback().await?;
            println!("✅ Seeded {} trips into {}", written, cli.db);
        }

        Commands::Import { path, batch_size } => {
            let file = File::open(&path)?;
            let summary = engine.import_csv(file, batch_size).await?;

            println!("✅ Imported {} trips from {}", summary.imported, path.display());
            println!("   Rows read: {}", summary.rows_read);
            println!("   Skipped (already stored): {}", summary.skipped);
            println!("   Batches: {}", summary.batches);
        }
    }

    Ok(())
}
