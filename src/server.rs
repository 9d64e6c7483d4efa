use crate::config::ServerConfig;
use crate::error::ScanError;
use crate::matcher::VocabularyTable;
use crate::resolver::MAX_ENTITIES;
use crate::result::AnalysisResult;
use crate::scanner::Scanner;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    response::{IntoResponse, Json},
    routing::{get, post, put},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub scanner: Arc<Scanner>,
    pub config: Arc<ServerConfig>,
}

/// Analysis response
#[derive(Serialize)]
pub struct AnalyzeResponse {
    #[serde(flatten)]
    pub result: AnalysisResult,
    pub processing_time_ms: u64,
}

/// Vocabulary update response
#[derive(Serialize)]
pub struct VocabularyResponse {
    pub entries: usize,
    pub index_keys: usize,
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
    pub languages: Vec<String>,
    pub vocabulary_size: usize,
    pub max_entities_limit: usize,
    pub default_max_entities: usize,
    pub default_confidence_threshold: f32,
    pub max_file_size_bytes: usize,
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let max_file_size = state.config.max_file_size;

    Router::new()
        .route("/analyze", post(handle_analyze))
        .route("/vocabulary", put(handle_vocabulary))
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        .layer(DefaultBodyLimit::max(max_file_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(scanner: Arc<Scanner>, config: ServerConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);

    let app = router(AppState {
        scanner,
        config: Arc::new(config),
    });

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Handle image analysis requests
async fn handle_analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, ScanError> {
    let start = Instant::now();
    let defaults = state.scanner.settings();

    let mut file_data: Option<Bytes> = None;
    let mut max_entities = defaults.max_entities;
    let mut confidence_threshold = defaults.confidence_threshold;

    // Parse multipart form
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ScanError::InvalidRequest(format!("Failed to parse multipart: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "file" => {
                file_data = Some(field.bytes().await.map_err(|e| {
                    ScanError::InvalidRequest(format!("Failed to read file data: {}", e))
                })?);
            }
            "max_entities" => {
                let text = field_text(field, "max_entities").await?;
                max_entities = text.trim().parse().map_err(|_| {
                    ScanError::InvalidRequest(format!("Invalid max_entities: {}", text))
                })?;
            }
            "confidence_threshold" => {
                let text = field_text(field, "confidence_threshold").await?;
                confidence_threshold = text.trim().parse().map_err(|_| {
                    ScanError::InvalidRequest(format!("Invalid confidence_threshold: {}", text))
                })?;
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    // Validate file was provided
    let data = file_data.ok_or(ScanError::MissingFile)?;

    if data.len() > state.config.max_file_size {
        return Err(ScanError::ImageTooLarge {
            size: data.len(),
            max: state.config.max_file_size,
        });
    }

    // Decoding and recognition are CPU bound
    let scanner = Arc::clone(&state.scanner);
    let result = tokio::task::spawn_blocking(move || {
        let image = image::load_from_memory(&data)
            .map_err(|e| ScanError::InvalidRequest(format!("Unsupported image: {}", e)))?;
        Ok::<_, ScanError>(scanner.analyze_single_image(&image, max_entities, confidence_threshold))
    })
    .await
    .map_err(|e| ScanError::Internal(format!("Analysis task failed: {}", e)))??;

    let processing_time_ms = start.elapsed().as_millis() as u64;

    tracing::info!(
        "Analysis completed in {}ms: {}",
        processing_time_ms,
        result
            .detection_key()
            .unwrap_or_else(|| result.error().unwrap_or("no detection").to_string())
    );

    Ok(Json(AnalyzeResponse {
        result,
        processing_time_ms,
    }))
}

async fn field_text(field: axum::extract::multipart::Field<'_>, name: &str) -> Result<String, ScanError> {
    field
        .text()
        .await
        .map_err(|e| ScanError::InvalidRequest(format!("Invalid {}: {}", name, e)))
}

/// Replace the vocabulary with a JSON array of names or a canonical map
async fn handle_vocabulary(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<VocabularyResponse>, ScanError> {
    let table = VocabularyTable::from_json(&body)?;
    if table.is_empty() {
        return Err(ScanError::VocabularyError("vocabulary is empty".to_string()));
    }

    state.scanner.update_vocabulary_table(&table);

    Ok(Json(VocabularyResponse {
        entries: table.len(),
        index_keys: state.scanner.vocabulary_size(),
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
    let settings = state.scanner.settings();
    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        engine: state.scanner.recognizer().name().to_string(),
        languages: state.scanner.languages().languages().to_vec(),
        vocabulary_size: state.scanner.vocabulary_size(),
        max_entities_limit: MAX_ENTITIES,
        default_max_entities: settings.max_entities,
        default_confidence_threshold: settings.confidence_threshold,
        max_file_size_bytes: state.config.max_file_size,
    })
}
