//! HTTP routes and handlers

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, State,
    },
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use serde_json::{json, Value};
use std::time::Instant;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

use crate::config::CorsConfig;
use crate::state::AppState;
use crate::upload::TempUpload;
use truthlens_core::{MediaKind, MediaReport, TextLabel, TextReport};
use truthlens_detectors::{compose_media_report, local_timestamp};

pub const REQUESTS_TOTAL: &str = "truthlens_requests_total";
pub const ERRORS_TOTAL: &str = "truthlens_errors_total";
pub const INFERENCE_LATENCY_US: &str = "truthlens_inference_latency_us";
pub const VERDICTS_TOTAL: &str = "truthlens_verdicts_total";

const DEFAULT_MEDIA_TYPE: &str = "image";

pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config.server.max_upload_bytes;
    let cors = cors_layer(&state.config.server.cors);

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/deepfake", post(deepfake_detection))
        .route("/fakenews", post(fakenews_detection))
        .fallback(fallback)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if config.allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn metrics(State(state): State<AppState>) -> String {
    state.metrics_handle.render()
}

async fn fallback() -> AppError {
    AppError::NotFound
}

/// Media deepfake detection
async fn deepfake_detection(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<MediaReport>, AppError> {
    metrics::counter!(REQUESTS_TOTAL, "endpoint" => "deepfake").increment(1);

    match analyze_media(&state, multipart).await {
        Ok(report) => {
            let verdict = if report.is_authentic {
                "authentic"
            } else {
                "manipulated"
            };
            metrics::counter!(VERDICTS_TOTAL, "endpoint" => "deepfake", "verdict" => verdict)
                .increment(1);
            Ok(Json(report))
        }
        Err(e) => {
            metrics::counter!(ERRORS_TOTAL, "endpoint" => "deepfake", "kind" => e.kind())
                .increment(1);
            Err(e)
        }
    }
}

async fn analyze_media(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<MediaReport, AppError> {
    let start = Instant::now();

    let multipart = multipart.map_err(|e| {
        debug!("Rejected non-multipart upload: {}", e);
        AppError::InvalidRequest("No file provided".to_string())
    })?;
    let form = MediaForm::read(multipart).await?;

    let file = form
        .file
        .ok_or_else(|| AppError::InvalidRequest("No file provided".to_string()))?;
    if file.filename.is_empty() {
        return Err(AppError::InvalidRequest("No file selected".to_string()));
    }

    let kind: MediaKind = form
        .media_type
        .as_deref()
        .unwrap_or(DEFAULT_MEDIA_TYPE)
        .parse()?;

    debug!(
        media_type = %kind,
        filename = %file.filename,
        size = file.bytes.len(),
        "Received media upload"
    );

    let upload = TempUpload::write(&state.config.server.upload_dir, &file.filename, &file.bytes)
        .await
        .map_err(truthlens_core::Error::from)?;

    let inference_start = Instant::now();
    let outcome = state.media.detect(kind, upload.path()).await;
    upload.remove().await;
    let score = outcome?;

    metrics::histogram!(
        INFERENCE_LATENCY_US,
        "endpoint" => "deepfake",
        "media_type" => kind.as_str()
    )
    .record(inference_start.elapsed().as_micros() as f64);

    let report = compose_media_report(
        kind,
        score,
        state.scores.as_ref(),
        start.elapsed(),
        local_timestamp(),
    );

    debug!(
        detector = state.media.name(),
        media_type = %kind,
        model_score = score,
        overall = report.overall_confidence,
        authentic = report.is_authentic,
        "Media analyzed"
    );

    Ok(report)
}

/// The parts of the upload form the media endpoint reads
#[derive(Debug, Default)]
struct MediaForm {
    file: Option<UploadedFile>,
    media_type: Option<String>,
}

#[derive(Debug)]
struct UploadedFile {
    filename: String,
    bytes: Bytes,
}

impl MediaForm {
    /// Collect the first `file` part carrying a filename and the first
    /// `mediaType` part; other parts are skipped
    async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(AppError::from)? {
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some("file") if form.file.is_none() => {
                    let Some(filename) = field.file_name().map(str::to_string) else {
                        continue;
                    };
                    let bytes = field.bytes().await.map_err(AppError::from)?;
                    form.file = Some(UploadedFile { filename, bytes });
                }
                Some("mediaType") if form.media_type.is_none() => {
                    form.media_type = Some(field.text().await.map_err(AppError::from)?);
                }
                _ => {}
            }
        }

        Ok(form)
    }
}

/// Fake-news detection
async fn fakenews_detection(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<TextReport>, AppError> {
    metrics::counter!(REQUESTS_TOTAL, "endpoint" => "fakenews").increment(1);

    match analyze_text(&state, &body).await {
        Ok(report) => {
            let verdict = if report.result == TextLabel::Fake.message() {
                "fake"
            } else {
                "real"
            };
            metrics::counter!(VERDICTS_TOTAL, "endpoint" => "fakenews", "verdict" => verdict)
                .increment(1);
            Ok(Json(report))
        }
        Err(e) => {
            metrics::counter!(ERRORS_TOTAL, "endpoint" => "fakenews", "kind" => e.kind())
                .increment(1);
            Err(e)
        }
    }
}

async fn analyze_text(state: &AppState, body: &[u8]) -> Result<TextReport, AppError> {
    let text = extract_text(body)
        .ok_or_else(|| AppError::InvalidRequest("No text provided".to_string()))?;

    let start = Instant::now();
    let report = state.text.detect(&text).await?;

    metrics::histogram!(INFERENCE_LATENCY_US, "endpoint" => "fakenews")
        .record(start.elapsed().as_micros() as f64);

    debug!(
        chars = text.chars().count(),
        confidence = report.confidence,
        phrases = report.suspicious_phrases.len(),
        "Text analyzed"
    );

    Ok(report)
}

/// The `text` member of a JSON object body, when it is a string
fn extract_text(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    match value.get("text")? {
        Value::String(text) => Some(text.clone()),
        _ => None,
    }
}

/// Error type for HTTP handlers
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    #[error("Not found")]
    NotFound,

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// Label used for the error counter
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::Rejected { .. } => "rejected",
            AppError::NotFound => "not_found",
            AppError::Internal(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Rejected { status, .. } => *status,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<truthlens_core::Error> for AppError {
    fn from(err: truthlens_core::Error) -> Self {
        if err.is_invalid_input() {
            AppError::InvalidRequest(err.to_string())
        } else {
            AppError::Internal(err.to_string())
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::Rejected {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
