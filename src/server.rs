use crate::config::Config;
use crate::document::SUPPORTED_MEDIA_TYPES;
use crate::engine::OcrEngine;
use crate::engines;
use crate::error::ReportError;
use crate::pipeline::ReportProcessor;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<ReportProcessor>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(engine: Arc<dyn OcrEngine>, config: Config) -> Self {
        Self {
            processor: Arc::new(ReportProcessor::new(engine, &config)),
            config: Arc::new(config),
        }
    }
}

/// Filing response
#[derive(Serialize)]
pub struct ReportResponse {
    pub message: String,
    pub outcome: String,
    /// Saved (or conflicting) file, when there is one
    pub path: Option<String>,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Server info response
#[derive(Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub engine: String,
    pub supported_media_types: Vec<String>,
    pub max_file_size_bytes: usize,
}

/// Build the router for an already-initialized engine
pub fn router(state: AppState) -> Router {
    let max_file_size = state.config.max_file_size;

    Router::new()
        .route("/reports", post(handle_report))
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        .layer(DefaultBodyLimit::max(max_file_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(config: Config) -> anyhow::Result<()> {
    let engine = engines::create(&config)?;
    let addr = format!("{}:{}", config.host, config.port);
    let app = router(AppState::new(engine, config));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Handle report uploads
async fn handle_report(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ReportResponse>, ReportError> {
    let start = Instant::now();

    let mut file_data: Option<Bytes> = None;
    let mut content_type: Option<String> = None;
    let mut filename = String::new();
    let mut destination: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ReportError::InvalidRequest(format!("Failed to parse multipart: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "file" => {
                content_type = field.content_type().map(|s| s.to_string());
                filename = field.file_name().unwrap_or_default().to_string();
                file_data = Some(field.bytes().await.map_err(|e| {
                    ReportError::InvalidRequest(format!("Failed to read file data: {}", e))
                })?);
            }
            "destination" => {
                destination = Some(field.text().await.map_err(|e| {
                    ReportError::InvalidRequest(format!("Invalid destination: {}", e))
                })?);
            }
            _ => {}
        }
    }

    let data = file_data.ok_or(ReportError::MissingField("file"))?;
    let destination = destination.ok_or(ReportError::MissingField("destination"))?;

    if data.len() > state.config.max_file_size {
        return Err(ReportError::FileTooLarge {
            size: data.len(),
            max: state.config.max_file_size,
        });
    }

    let media_type = content_type.unwrap_or_else(|| "application/octet-stream".to_string());

    // OCR and disk writes are blocking work
    let processor = state.processor.clone();
    let result = tokio::task::spawn_blocking(move || {
        processor.process(data.to_vec(), &media_type, &filename, &destination)
    })
    .await
    .map_err(|e| ReportError::Internal(format!("Filing task failed: {}", e)))??;

    tracing::info!(
        "Handled upload in {}ms: {}",
        start.elapsed().as_millis(),
        result.outcome()
    );

    Ok(Json(ReportResponse {
        message: result.message(),
        outcome: result.outcome().to_string(),
        path: result.path().map(|p| p.display().to_string()),
    }))
}

/// Handle health check requests
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle info requests
async fn handle_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        engine: state.processor.engine_name().to_string(),
        supported_media_types: SUPPORTED_MEDIA_TYPES.iter().map(|s| s.to_string()).collect(),
        max_file_size_bytes: state.config.max_file_size,
    })
}
