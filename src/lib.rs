pub mod api;
pub mod config;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::ServiceConfig;
use crate::services::compress_upload::CompressUploadService;
use crate::services::compressor::PdfCompressor;
use crate::services::storage::StorageService;
use crate::services::temp_files::TempFileManager;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Slack on top of the file size cap for multipart framing and text fields
const MULTIPART_OVERHEAD: usize = 10 * 1024 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::health::health_check,
        api::handlers::compress::compress_upload,
    ),
    components(
        schemas(
            api::handlers::health::HealthResponse,
            api::handlers::compress::CompressUploadForm,
            api::handlers::compress::CompressUploadResponse,
            api::handlers::compress::ErrorResponse,
        )
    ),
    tags(
        (name = "compression", description = "PDF compression and upload"),
        (name = "system", description = "Liveness")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub compress_upload: Arc<CompressUploadService>,
}

impl AppState {
    pub fn new(
        config: ServiceConfig,
        compressor: Arc<dyn PdfCompressor>,
        storage: Arc<dyn StorageService>,
    ) -> Self {
        let compress_upload = Arc::new(CompressUploadService::new(
            compressor,
            storage,
            TempFileManager::new(config.tmp_dir.clone()),
            config.compression_preset.clone(),
            config.max_output_mb,
        ));

        Self {
            config: Arc::new(config),
            compress_upload,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let body_limit = state
        .config
        .max_input_bytes()
        .saturating_add(MULTIPART_OVERHEAD);

    // Sits inside the request-id layer so every span carries the final id
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &axum::http::Request<_>| {
            let request_id = request
                .headers()
                .get(&api::middleware::request_id::REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown");
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        })
        .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
            info!("📥 {} {}", request.method(), request.uri());
        })
        .on_response(
            |response: &axum::http::Response<_>,
             latency: std::time::Duration,
             _span: &tracing::Span| {
                info!(
                    "📤 Finished in {:?} with status {}",
                    latency,
                    response.status()
                );
            },
        );

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route(
            "/compress-upload",
            post(api::handlers::compress::compress_upload),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(from_fn(api::middleware::metrics::metrics_middleware))
        .layer(trace_layer)
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(api::middleware::recovery::catch_panic_layer())
        .with_state(state)
}
