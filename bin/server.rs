// Mercuriales Dashboard - Data Server
// REST API with Axum: serves the record array the dashboard fetches, plus filtered views

use anyhow::{bail, Context, Result};
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use mercuriales_dashboard::{
    encode, filter, load_records_file, ChartConfig, DashboardConfig, DashboardError,
    FilterCriteria, Record, RecordStore, EXPORT_FILENAME, NOTHING_TO_EXPORT,
};

/// Shared application state
#[derive(Clone)]
struct AppState {
    store: Arc<RecordStore>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn failure(message: String) -> Self {
        Self {
            success: false,
            data: (),
            error: Some(message),
        }
    }
}

/// Selector values present in the store
#[derive(Serialize)]
struct FiltersResponse {
    years: Vec<i32>,
    markets: Vec<String>,
}

#[derive(Parser)]
#[command(name = "mercuriales-server", version, about = "Serves mercuriales price records over HTTP")]
struct Cli {
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON array of records to serve
    #[arg(long)]
    data_file: Option<PathBuf>,

    /// Listen address
    #[arg(long)]
    bind: Option<String>,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/data - Every record, bare array (what the dashboard fetches)
async fn get_data(State(state): State<AppState>) -> Json<Vec<Record>> {
    Json(state.store.records().to_vec())
}

/// GET /api/filters - Available years and markets
async fn get_filters(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::ok(FiltersResponse {
        years: state.store.available_years(),
        markets: state.store.available_markets(),
    }))
}

/// GET /api/records?search=&year=&market= - Filtered records, input order
async fn get_records(
    State(state): State<AppState>,
    Query(criteria): Query<FilterCriteria>,
) -> impl IntoResponse {
    let filtered = filter(state.store.records(), &criteria);
    Json(ApiResponse::ok(filtered))
}

/// GET /api/chart?search=&year=&market= - Line chart configuration
async fn get_chart(
    State(state): State<AppState>,
    Query(criteria): Query<FilterCriteria>,
) -> impl IntoResponse {
    let filtered = filter(state.store.records(), &criteria);
    let config = ChartConfig::from_records(&filtered, &mut rand::thread_rng());
    Json(ApiResponse::ok(config))
}

/// GET /api/export?search=&year=&market= - CSV download
async fn get_export(
    State(state): State<AppState>,
    Query(criteria): Query<FilterCriteria>,
) -> impl IntoResponse {
    let filtered = filter(state.store.records(), &criteria);

    match encode(&filtered) {
        Ok(bytes) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", EXPORT_FILENAME),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(DashboardError::NothingToExport) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::failure(NOTHING_TO_EXPORT.to_string())),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "export failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::failure(e.to_string())),
            )
                .into_response()
        }
    }
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = DashboardConfig::load(cli.config.as_deref())?;
    if let Some(data_file) = cli.data_file {
        config.data_file = Some(data_file);
    }
    if let Some(bind) = cli.bind {
        config.bind = bind;
    }

    let Some(data_file) = config.data_file.as_ref() else {
        bail!("no data file configured (use --data-file or \"data_file\" in the config)");
    };

    let records = load_records_file(data_file)
        .with_context(|| format!("Failed to load records from {:?}", data_file))?;
    info!(count = records.len(), path = %data_file.display(), "records loaded");

    // Create shared state
    let state = AppState {
        store: Arc::new(RecordStore::from_records(records)),
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/data", get(get_data))
        .route("/filters", get(get_filters))
        .route("/records", get(get_records))
        .route("/chart", get(get_chart))
        .route("/export", get(get_export))
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!("server running on http://{}", config.bind);
    info!("dashboard endpoint: http://{}/api/data", config.bind);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
