//! Web server for the scan UI and API

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use parking_lot::RwLock;
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::bubbles::ScanPoint;
use crate::config::Config;
use crate::error::ScanError;
use crate::geometry::{CornerId, Corners};
use crate::grading::{self, parse_key, GradeReport};
use crate::loader::decode_bytes;
use crate::overlay::{encode_png, render_overlay};
use crate::raster::RasterImage;
use crate::scanner::{AnswersMap, Scanner};
use crate::template::SheetTemplate;

/// Embedded static files for the web UI
#[derive(RustEmbed)]
#[folder = "static/"]
struct StaticAssets;

/// Shared application state
pub struct AppState {
    /// Configuration (scan defaults and the active sheet template)
    pub config: Arc<RwLock<Config>>,
    /// Path to save configuration
    config_path: PathBuf,
}

impl AppState {
    pub fn new(config: Arc<RwLock<Config>>, config_path: PathBuf) -> Self {
        Self {
            config,
            config_path,
        }
    }

    /// Save configuration to file
    pub fn save_config(&self) -> Result<()> {
        let config = self.config.read();
        config.save(&self.config_path)
    }
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let upload_limit = state.config.read().server.max_upload_mb * 1024 * 1024;

    Router::new()
        // Static files and UI
        .route("/", get(index_handler))
        .route("/static/*path", get(static_handler))
        // API endpoints
        .route("/api/scan", post(scan_handler))
        .route("/api/template", get(get_template))
        .route("/api/template", post(set_template))
        .route("/api/template/reset", post(reset_template))
        .route("/api/template/save", post(save_template))
        .route("/api/info", get(get_info))
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(cors)
        .with_state(state)
}

/// Run the web server
pub async fn run_server(addr: &str, state: Arc<AppState>) -> Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Web server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Serve the main index page
async fn index_handler() -> impl IntoResponse {
    match StaticAssets::get("index.html") {
        Some(content) => Html(content.data.to_vec()).into_response(),
        None => (StatusCode::NOT_FOUND, "Index not found").into_response(),
    }
}

/// Serve static files
async fn static_handler(Path(path): Path<String>) -> impl IntoResponse {
    let path = path.trim_start_matches('/');

    match StaticAssets::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            (
                [(axum::http::header::CONTENT_TYPE, mime.as_ref())],
                content.data.to_vec(),
            )
                .into_response()
        }
        None => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

/// Error body returned by every API endpoint
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    missing: Vec<CornerId>,
}

enum ApiError {
    Scan(ScanError),
    BadRequest(String),
    Internal(String),
}

impl From<ScanError> for ApiError {
    fn from(err: ScanError) -> Self {
        ApiError::Scan(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Scan(err) => {
                let status = match err {
                    ScanError::MarkersNotFound { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                    ScanError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
                    _ => StatusCode::BAD_REQUEST,
                };
                let missing = match &err {
                    ScanError::MarkersNotFound { missing } => missing.clone(),
                    _ => Vec::new(),
                };
                (
                    status,
                    ErrorBody {
                        error: err.tag(),
                        message: err.to_string(),
                        missing,
                    },
                )
            }
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "bad-request",
                    message,
                    missing: Vec::new(),
                },
            ),
            ApiError::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: "internal",
                    message,
                    missing: Vec::new(),
                },
            ),
        };

        (status, Json(body)).into_response()
    }
}

#[derive(Deserialize)]
struct ScanQuery {
    /// Overrides the configured question count
    questions: Option<usize>,
    /// Include a PNG debug overlay (base64) in the response
    #[serde(default)]
    overlay: bool,
    /// Answer key to grade against, e.g. "ABCDABCD"
    key: Option<String>,
}

/// API response for a scanned sheet
#[derive(Serialize)]
struct ScanResponse {
    answers: AnswersMap,
    answered: usize,
    corners: Corners,
    scan_points: Vec<ScanPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    grade: Option<GradeReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    overlay_png: Option<String>,
}

/// Analyze an uploaded sheet photo (raw JPEG/PNG request body)
async fn scan_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ScanQuery>,
    body: Bytes,
) -> Result<Json<ScanResponse>, ApiError> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("request body is empty".to_string()));
    }

    let key = query
        .key
        .as_deref()
        .filter(|k| !k.trim().is_empty())
        .map(parse_key)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let (template, question_count, working_width) = {
        let config = state.config.read();
        (
            config.template.clone(),
            query.questions.unwrap_or(config.scan.question_count),
            config.scan.working_width(),
        )
    };
    let with_overlay = query.overlay;

    let result = tokio::task::spawn_blocking(move || -> Result<ScanResponse, ScanError> {
        let image = decode_bytes(&body, working_width)?;
        let raster = RasterImage::from_rgba(&image)?;
        let scan = Scanner::new(template).analyze(&raster, question_count)?;

        let overlay_png = if with_overlay {
            let png = encode_png(&render_overlay(&image, &scan))?;
            Some(STANDARD.encode(png))
        } else {
            None
        };

        Ok(ScanResponse {
            answered: scan.answered_count(),
            grade: key.map(|k| grading::grade(&scan.answers, &k)),
            answers: scan.answers,
            corners: scan.corners,
            scan_points: scan.scan_points,
            overlay_png,
        })
    })
    .await
    .map_err(|e| ApiError::Internal(format!("scan task failed: {}", e)))?;

    match result {
        Ok(response) => Ok(Json(response)),
        Err(err) => {
            warn!("Scan rejected: {}", err);
            Err(err.into())
        }
    }
}

/// Get the active sheet template
async fn get_template(State(state): State<Arc<AppState>>) -> Json<SheetTemplate> {
    Json(state.config.read().template.clone())
}

/// Replace the active sheet template (not persisted until saved)
async fn set_template(
    State(state): State<Arc<AppState>>,
    Json(template): Json<SheetTemplate>,
) -> Result<StatusCode, ApiError> {
    template
        .validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    state.config.write().template = template;
    info!("Sheet template updated");

    Ok(StatusCode::OK)
}

/// Reset the template to the built-in layout
async fn reset_template(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.config.write().template = SheetTemplate::default();
    StatusCode::OK
}

/// Save configuration (including the template) to file
async fn save_template(State(state): State<Arc<AppState>>) -> Result<StatusCode, ApiError> {
    state
        .save_config()
        .map_err(|e| ApiError::Internal(format!("{:#}", e)))?;
    Ok(StatusCode::OK)
}

/// System information response
#[derive(Serialize)]
struct InfoResponse {
    version: String,
    question_count: usize,
    working_width: u32,
    columns: [f64; 4],
}

/// Get system information
async fn get_info(State(state): State<Arc<AppState>>) -> Json<InfoResponse> {
    let config = state.config.read();

    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        question_count: config.scan.question_count,
        working_width: config.scan.working_width,
        columns: config.template.columns,
    })
}
