//! CaseFlow Reports - org-scoped spreadsheet exports over the CaseFlow store.

mod auth;
mod config;
mod enrich;
mod error;
mod export;
mod query;
mod registry;
mod render;
mod report;
mod schema;
mod store;
mod style;
mod summary;

use auth::CallerSession;
use axum::{
    body::Bytes,
    extract::State,
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        HeaderMap,
    },
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use config::ServiceConfig;
use error::ExportError;
use export::export_report;
use report::{ExportRequest, Locale};
use std::sync::Arc;
use store::{supabase::SupabaseClient, Store};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const LOCALE_HEADER: &str = "x-locale";

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    store: Arc<dyn Store>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "caseflow_reports=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServiceConfig::from_env()?;
    let store = SupabaseClient::from_config(&config);
    info!("Supabase client initialized for {}", config.supabase_url);

    let app = router(AppState {
        store: Arc::new(store),
    });

    // Run server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Server listening on http://{}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/reports/export", post(export))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Export a report as an `.xlsx` attachment.
async fn export(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ExportError> {
    let request: ExportRequest =
        serde_json::from_slice(&body).map_err(|e| ExportError::InvalidBody(e.to_string()))?;
    let locale = Locale::from_header(headers.get(LOCALE_HEADER).and_then(|v| v.to_str().ok()));
    let session = CallerSession::from_headers(&headers);

    let exported = export_report(state.store.as_ref(), session.as_ref(), request, locale).await?;
    info!(
        "Sending {} ({} rows, {} bytes)",
        exported.filename,
        exported.row_count,
        exported.bytes.len()
    );

    Ok((
        [
            (CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", exported.filename),
            ),
        ],
        exported.bytes,
    )
        .into_response())
}
