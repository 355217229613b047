use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mobility_engine::{
    error::MobilityError, AnalysisReport, EngineOptions, MobilityEngine, RankQuery, RankingResult,
    ServerConfig, SqliteStore, Trip, TripFilter, TripQuery, TripSummary, VendorSummary,
};

#[derive(Clone)]
struct AppState {
    engine: Arc<MobilityEngine>,
}

#[derive(Debug, Deserialize)]
struct TripListParams {
    page: Option<String>,
    limit: Option<String>,
    vendor: Option<String>,
    vendor_id: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    hour: Option<String>,
    min_distance: Option<String>,
    min_fare: Option<String>,
    max_fare: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RankParams {
    sort_by: Option<String>,
    order: Option<String>,
    limit: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mobility_server=debug,mobility_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();

    tracing::info!("🚀 Starting Mobility Data Explorer API");
    tracing::info!("📦 Database: {}", config.db_path);
    tracing::info!("🔌 Port: {}", config.port);

    let store = Arc::new(SqliteStore::new(&config.db_path).await?);
    let engine = MobilityEngine::with_store(
        store,
        EngineOptions {
            fetch_cap: config.fetch_cap,
            use_fallback: config.use_fallback,
        },
    );

    let state = AppState {
        engine: Arc::new(engine),
    };

    let app = Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/api/trips", get(list_trips_handler))
        .route("/api/trips/analyze", get(analyze_handler))
        .route("/api/trips/ranked", get(ranked_handler))
        .route("/api/trips/:id", get(get_trip_handler).delete(delete_trip_handler))
        .route("/api/vendors", get(list_vendors_handler))
        .route("/api/vendors/:id", get(get_vendor_handler))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("🚕 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Parse an optional query parameter, rejecting malformed values
fn parse_param<T: FromStr>(name: &str, raw: Option<&String>) -> Result<Option<T>, MobilityError> {
    match raw.map(|s| s.trim()).filter(|s| !s.is_empty()) {
        Some(s) => s.parse().map(Some).map_err(|_| MobilityError::InvalidParameter {
            name: name.to_string(),
            value: s.to_string(),
        }),
        None => Ok(None),
    }
}

/// Non-blank token, or `None`
fn token(raw: Option<String>) -> Option<String> {
    raw.filter(|s| !s.trim().is_empty())
}

/// Resolve ranking parameters; blank tokens take the defaults
fn rank_query(params: RankParams) -> Result<RankQuery, MobilityError> {
    let defaults = RankQuery::default();
    Ok(RankQuery {
        limit: parse_param("limit", params.limit.as_ref())?.unwrap_or(defaults.limit),
        sort_by: token(params.sort_by).unwrap_or(defaults.sort_by),
        order: token(params.order).unwrap_or(defaults.order),
    })
}

/// RFC 3339 timestamp or bare `YYYY-MM-DD` (midnight UTC)
fn parse_date(name: &str, raw: Option<&String>) -> Result<Option<DateTime<Utc>>, MobilityError> {
    let Some(s) = raw.map(|s| s.trim()).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Some(naive.and_utc()))
        .ok_or_else(|| MobilityError::InvalidParameter {
            name: name.to_string(),
            value: s.to_string(),
        })
}

async fn root_handler() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Mobility Data Explorer API".to_string(),
    })
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: mobility_engine::VERSION.to_string(),
    })
}

async fn list_trips_handler(
    State(state): State<AppState>,
    Query(params): Query<TripListParams>,
) -> Result<Json<Vec<TripSummary>>, AppError> {
    let defaults = TripFilter::default();
    let vendor = params.vendor.as_ref().or(params.vendor_id.as_ref());

    let filter = TripFilter {
        vendor_id: parse_param("vendor", vendor)?,
        start_date: parse_date("start_date", params.start_date.as_ref())?,
        end_date: parse_date("end_date", params.end_date.as_ref())?,
        hour: parse_param("hour", params.hour.as_ref())?,
        min_distance: parse_param("min_distance", params.min_distance.as_ref())?,
        page: parse_param::<u32>("page", params.page.as_ref())?
            .filter(|p| *p > 0)
            .unwrap_or(defaults.page),
        limit: parse_param::<u32>("limit", params.limit.as_ref())?
            .filter(|l| *l > 0)
            .unwrap_or(defaults.limit),
    };

    let query = TripQuery {
        filter,
        min_fare: parse_param("min_fare", params.min_fare.as_ref())?,
        max_fare: parse_param("max_fare", params.max_fare.as_ref())?,
    };

    tracing::debug!("Trip listing: {:?}", query);
    Ok(Json(state.engine.list_trips(&query).await?))
}

async fn ranked_handler(
    State(state): State<AppState>,
    Query(params): Query<RankParams>,
) -> Result<Json<RankingResult>, AppError> {
    let query = rank_query(params)?;
    Ok(Json(state.engine.ranked_trips(&query).await?))
}

async fn analyze_handler(State(state): State<AppState>) -> Result<Json<AnalysisReport>, AppError> {
    Ok(Json(state.engine.analyze().await?))
}

async fn get_trip_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Trip>, AppError> {
    Ok(Json(state.engine.get_trip(&id).await?))
}

async fn delete_trip_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    state.engine.delete_trip(&id).await?;
    Ok(Json(MessageResponse {
        message: "Trip deleted successfully".to_string(),
    }))
}

async fn list_vendors_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<VendorSummary>>, AppError> {
    Ok(Json(state.engine.list_vendors().await?))
}

async fn get_vendor_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<VendorSummary>, AppError> {
    let vendor_id = parse_param::<i64>("id", Some(&id))?
        .ok_or_else(|| MobilityError::NotFound(format!("vendor {}", id)))?;
    Ok(Json(state.engine.get_vendor(vendor_id).await?))
}

// Error handling
#[derive(Debug)]
struct AppError(MobilityError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            MobilityError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = self.0.to_string();

        tracing::error!("❌ Error: {} - {}", status, message);

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<MobilityError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
