//! HTTP routes
//!
//! - `GET /health` - translator readiness
//! - `POST /translate-text` - JSON text translation
//! - `POST /translate-file` - multipart document translation, returns a `.docx`

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{HeaderName, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use doclingua_mt::{
    MtError, SourceLanguage, Strategy, TranslateOptions, TranslatorState, translate_text,
    translate_upload,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Number of fragments that kept their original text
pub const FALLBACKS_HEADER: HeaderName = HeaderName::from_static("x-translation-fallbacks");

#[derive(Clone)]
pub struct AppState {
    pub translator: Arc<TranslatorState>,
    /// Strategy used when a request does not name one
    pub strategy: Strategy,
    pub concurrency: usize,
}

#[derive(Serialize, Deserialize)]
pub struct TranslateTextRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub source_lang: Option<String>,
    #[serde(default)]
    pub target_lang: String,
}

#[derive(Serialize, Deserialize)]
pub struct TranslateTextResponse {
    pub translated_text: String,
}

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub translator: String,
    pub provider: Option<String>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error returned to the client as `{"error": "..."}`
#[derive(Debug)]
pub struct ApiError(pub StatusCode, pub String);

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        ApiError(StatusCode::BAD_REQUEST, message.into())
    }
}

impl From<MtError> for ApiError {
    fn from(error: MtError) -> Self {
        let status = match &error {
            MtError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
            e if e.is_internal() => StatusCode::INTERNAL_SERVER_ERROR,
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::BAD_GATEWAY,
        };
        ApiError(status, error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(ErrorResponse { error: self.1 })).into_response()
    }
}

/// Build the application router
pub fn app(state: AppState, static_dir: Option<&Path>, max_upload_bytes: usize) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .route("/translate-text", post(translate_text_handler))
        .route("/translate-file", post(translate_file_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes));

    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let (status, translator) = if state.translator.is_ready() {
        ("ok", "ready")
    } else {
        ("degraded", "unavailable")
    };
    Json(HealthResponse {
        status: status.to_string(),
        translator: translator.to_string(),
        provider: state.translator.provider_name().map(str::to_string),
    })
}

async fn translate_text_handler(
    State(state): State<AppState>,
    Json(request): Json<TranslateTextRequest>,
) -> Result<Json<TranslateTextResponse>, ApiError> {
    if request.text.trim().is_empty() {
        return Err(ApiError::bad_request("No text provided"));
    }
    let options = request_options(
        &state,
        &request.target_lang,
        request.source_lang.as_deref(),
        None,
    )?;
    let client = state.translator.client()?;

    info!(
        source = %options.source,
        target_lang = %options.target,
        chars = request.text.chars().count(),
        "Translating text"
    );
    let translated_text = translate_text(&client, &request.text, &options)
        .await
        .inspect_err(|e| warn!(target_lang = %options.target, error = %e, "Text translation failed"))?;

    Ok(Json(TranslateTextResponse { translated_text }))
}

/// An uploaded file as read from the multipart body
struct Upload {
    file_name: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

async fn translate_file_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut upload = None;
    let mut target_lang = String::new();
    let mut source_lang = None;
    let mut strategy = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError(e.status(), e.body_text()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError(e.status(), e.body_text()))?;
                upload = Some(Upload {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            "target_lang" | "source_lang" | "strategy" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError(e.status(), e.body_text()))?;
                match name.as_str() {
                    "target_lang" => target_lang = value,
                    "source_lang" => source_lang = Some(value),
                    _ => strategy = Some(value),
                }
            }
            _ => {}
        }
    }

    let upload = upload.ok_or_else(|| ApiError::bad_request("No file part in the request"))?;
    if upload.file_name.trim().is_empty() {
        return Err(ApiError::bad_request("No file selected"));
    }
    let options = request_options(&state, &target_lang, source_lang.as_deref(), strategy.as_deref())?;
    let client = state.translator.client()?;

    let output = translate_upload(
        &client,
        &upload.file_name,
        upload.content_type.as_deref(),
        &upload.bytes,
        &options,
    )
    .await
    .inspect_err(|e| {
        error!(
            document = %upload.file_name,
            source = %options.source,
            target_lang = %options.target,
            error = %e,
            "File translation failed"
        );
    })?;

    let headers = [
        (header::CONTENT_TYPE, output.mime_type.to_string()),
        (header::CONTENT_DISPOSITION, content_disposition(&output.file_name)),
        (FALLBACKS_HEADER, output.report.fallbacks.len().to_string()),
    ];
    Ok((StatusCode::OK, headers, output.bytes).into_response())
}

fn request_options(
    state: &AppState,
    target_lang: &str,
    source_lang: Option<&str>,
    strategy: Option<&str>,
) -> Result<TranslateOptions, ApiError> {
    if target_lang.trim().is_empty() {
        return Err(ApiError::bad_request("target_lang is required"));
    }
    let strategy = match strategy.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => value.parse::<Strategy>().map_err(|e| match e {
            MtError::Config(message) => ApiError::bad_request(message),
            other => ApiError::from(other),
        })?,
        None => state.strategy,
    };

    Ok(TranslateOptions::new(target_lang)?
        .with_source(SourceLanguage::parse(source_lang)?)
        .with_strategy(strategy)
        .with_concurrency(state.concurrency))
}

/// `attachment; filename="..."` with characters that cannot go in a header
/// replaced
fn content_disposition(file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("attachment; filename=\"{}\"", safe)
}
