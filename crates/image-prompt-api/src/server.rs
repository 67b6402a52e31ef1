//! HTTP server for prompt generation and reference images
//!
//! Provides /health, /generate (multipart), /generate-json and
//! /refs/{filename}.

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use prompt_builder::{build_prompt, FormDataIn, PromptOut};
use ref_image_store::{ref_url, resolve_public_base, ImageKind, RefStore, RequestOrigin};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowHeaders, Any, CorsLayer};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::AppError;
use crate::guard::check_referer;
use crate::types::HealthResponse;

/// Shared state for the HTTP server
pub struct ServerState {
    pub store: Arc<RefStore>,
    pub wp_origin: Option<String>,
    /// Authority reported when a request carries no Host header
    pub fallback_authority: String,
    pub started_at: DateTime<Utc>,
}

impl ServerState {
    pub fn new(store: Arc<RefStore>, config: &Config) -> Self {
        Self {
            store,
            wp_origin: config.wp_origin.clone(),
            fallback_authority: format!("localhost:{}", config.port),
            started_at: Utc::now(),
        }
    }
}

pub type SharedState = Arc<ServerState>;

/// Create the HTTP router
pub fn create_router(state: SharedState, config: &Config) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/generate", post(generate))
        .route("/generate-json", post(generate_json))
        .route("/refs/{filename}", get(get_ref))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes()))
        .layer(cors_layer(config))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.allows_any_origin() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .allow_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(AllowHeaders::mirror_request())
            .allow_credentials(true)
    }
}

/// Start the HTTP server; returns once `cancel` fires or a shutdown signal arrives
pub async fn start_server(
    state: SharedState,
    config: &Config,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    let router = create_router(state, config);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await
}

/// Wait for Ctrl+C, SIGTERM, or cancellation
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = cancel.cancelled() => {}
    }

    info!("Shutdown signal received");
}

/// Health check endpoint
async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let refs = state.store.stats().await.unwrap_or_else(|e| {
        warn!(error = %e, "Failed to read reference store stats");
        Default::default()
    });
    let uptime_secs = (Utc::now() - state.started_at).num_seconds().max(0) as u64;

    Json(HealthResponse {
        ok: true,
        uptime_secs,
        refs,
    })
}

/// POST /generate
/// Multipart form with a `json_data` text field and an optional `reference_image` file.
async fn generate(
    State(state): State<SharedState>,
    headers: HeaderMap,
    uri: Uri,
    mut multipart: Multipart,
) -> Result<Json<PromptOut>, AppError> {
    check_referer(state.wp_origin.as_deref(), header_str(&headers, header::REFERER))?;

    let mut json_data = None;
    let mut upload = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("json_data") => json_data = Some(field.text().await?),
            Some("reference_image") => {
                let content_type = field
                    .content_type()
                    .unwrap_or(ImageKind::Png.content_type())
                    .to_string();
                let data = field.bytes().await?;
                // Browsers send an empty part when no file was picked
                if !data.is_empty() {
                    upload = Some((data, content_type));
                }
            }
            _ => {}
        }
    }

    let json_data = json_data
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("json_data form field is required".to_string()))?;
    let form = FormDataIn::from_json(&json_data)?;

    let reference_url = match upload {
        Some((data, content_type)) => {
            Some(store_reference(&state, &headers, &uri, data.to_vec(), &content_type).await?)
        }
        None => None,
    };

    let prompt = build_prompt(&form, reference_url.as_deref())?;
    Ok(Json(PromptOut { prompt }))
}

/// POST /generate-json
/// Same as /generate but with the reference image inline as a data URL or base64.
async fn generate_json(
    State(state): State<SharedState>,
    headers: HeaderMap,
    uri: Uri,
    body: Bytes,
) -> Result<Json<PromptOut>, AppError> {
    check_referer(state.wp_origin.as_deref(), header_str(&headers, header::REFERER))?;

    let body = std::str::from_utf8(&body)
        .map_err(|_| AppError::BadRequest("request body is not valid UTF-8".to_string()))?;
    let form = FormDataIn::from_json(body)?;

    let reference_url = match form.reference_image() {
        Some(encoded) => {
            let (data, content_type) = ref_image_store::decode_data_url_or_base64(encoded)?;
            Some(store_reference(&state, &headers, &uri, data, &content_type).await?)
        }
        None => None,
    };

    let prompt = build_prompt(&form, reference_url.as_deref())?;
    Ok(Json(PromptOut { prompt }))
}

/// Ingest an image and return its public URL
async fn store_reference(
    state: &ServerState,
    headers: &HeaderMap,
    uri: &Uri,
    data: Vec<u8>,
    content_type: &str,
) -> Result<String, AppError> {
    let stored = state.store.ingest(data, content_type).await?;

    let origin = RequestOrigin {
        scheme: uri.scheme_str().unwrap_or("http").to_string(),
        authority: uri
            .authority()
            .map(|a| a.to_string())
            .unwrap_or_else(|| state.fallback_authority.clone()),
    };
    let base = resolve_public_base(
        header_str(headers, "x-forwarded-proto"),
        header_str(headers, "x-forwarded-host"),
        header_str(headers, header::HOST),
        &origin,
    );
    let url = ref_url(&base, &stored.filename);

    info!(
        filename = %stored.filename,
        size = stored.size_bytes,
        deduplicated = stored.deduplicated,
        url = %url,
        "Stored reference image"
    );
    Ok(url)
}

/// GET /refs/{filename}
async fn get_ref(State(state): State<SharedState>, Path(filename): Path<String>) -> Response {
    if !RefStore::is_valid_filename(&filename) {
        return not_found();
    }

    match tokio::fs::read(state.store.path_for(&filename)).await {
        Ok(data) => {
            let content_type = filename
                .rsplit_once('.')
                .and_then(|(_, ext)| ImageKind::from_extension(ext))
                .unwrap_or(ImageKind::Png)
                .content_type();

            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, content_type),
                    (header::CACHE_CONTROL, "public, max-age=86400"),
                ],
                Body::from(data),
            )
                .into_response()
        }
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(filename = %filename, error = %e, "Failed to read reference");
            }
            not_found()
        }
    }
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "detail": "Not Found" })),
    )
        .into_response()
}

fn header_str<K: header::AsHeaderName>(headers: &HeaderMap, key: K) -> Option<&str> {
    headers.get(key).and_then(|v| v.to_str().ok())
}
