// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use anyhow::Context;
use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::assessment_service::AssessmentService;
use crate::application::interchange_service::InterchangeService;
use crate::application::measurement_repository::MeasurementRepository;
use crate::application::report_service::ReportService;
use crate::infrastructure::config::{IN_MEMORY_DATABASE, load_app_config};
use crate::infrastructure::memory_repository::MemoryRepository;
use crate::infrastructure::sqlite_repository::SqliteRepository;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    all_assessments, clear_assessments, create_assessment, delete_assessment, export_measurements,
    export_results, export_template, get_assessment, health_check, history, import,
    list_assessments, reclassify_assessment, report,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_app_config()?;

    // Create repository (infrastructure layer)
    let repository: Arc<dyn MeasurementRepository> = if config.database.path == IN_MEMORY_DATABASE {
        tracing::warn!("Using in-memory storage; records are lost on shutdown");
        Arc::new(MemoryRepository::new())
    } else {
        Arc::new(SqliteRepository::open(&config.database.path)?)
    };

    // Create services (application layer)
    let assessment_service = AssessmentService::new(repository.clone());
    let report_service = ReportService::new(repository.clone(), config.report.clone(), config.history.seed);
    let interchange_service = InterchangeService::new(repository.clone());

    // Create application state
    let state = Arc::new(AppState {
        assessment_service,
        report_service,
        interchange_service,
    });

    // Build router (presentation layer)
    // Compression is applied per response in http_response, not via a layer
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route(
            "/assessments",
            get(list_assessments).post(create_assessment).delete(clear_assessments),
        )
        .route("/assessments/all", get(all_assessments))
        .route("/assessments/:date", get(get_assessment).delete(delete_assessment))
        .route("/assessments/:date/index", put(reclassify_assessment))
        .route("/reports/:date", get(report))
        .route("/history", get(history))
        .route("/export/measurements.csv", get(export_measurements))
        .route("/export/results.csv", get(export_results))
        .route("/export/template/:table", get(export_template))
        .route("/import", post(import))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config
        .server
        .bind_address
        .parse()
        .with_context(|| format!("Invalid bind address '{}'", config.server.bind_address))?;
    tracing::info!("Starting pm25-aqi service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
