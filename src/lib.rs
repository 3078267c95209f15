pub mod api;
pub mod config;
pub mod models;
pub mod services;
pub mod utils;

use crate::api::middleware::request_id::{REQUEST_ID_HEADER, request_id_middleware};
use crate::config::GatewayConfig;
use crate::services::prediction::PredictionService;
use crate::services::staging::StagingArea;
use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::from_fn,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::upload::upload_file,
        api::handlers::upload::delete_file,
        api::handlers::detect::detect,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            api::handlers::upload::ImageUpload,
            api::handlers::health::HealthResponse,
            models::UploadResponse,
            models::MessageResponse,
            models::ErrorResponse,
            models::DetectResponse,
            models::DetectFailure,
            models::DetectionResult,
            models::Prediction,
        )
    ),
    tags(
        (name = "files", description = "Upload, serve and delete staged images"),
        (name = "detection", description = "Relay images to the prediction service"),
        (name = "system", description = "Service status")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub staging: StagingArea,
    pub predictor: Arc<dyn PredictionService>,
    pub config: GatewayConfig,
}

impl AppState {
    pub fn new(config: GatewayConfig, predictor: Arc<dyn PredictionService>) -> Self {
        Self {
            staging: StagingArea::new(config.upload_dir.clone()),
            predictor,
            config,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let body_limit = match state.config.max_upload_size {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };

    Router::new()
        .route("/upload", post(api::handlers::upload::upload_file))
        .route("/upload/:filename", delete(api::handlers::upload::delete_file))
        .route("/detect", post(api::handlers::detect::detect))
        .nest_service("/uploads", ServeDir::new(state.staging.dir()))
        .route("/health", get(api::handlers::health::health_check))
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .layer(body_limit)
        .layer(cors_layer(&state.config))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    let request_id = request
                        .headers()
                        .get(REQUEST_ID_HEADER)
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
                ),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

fn cors_layer(config: &GatewayConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if config.allows_any_origin() {
        return layer.allow_origin(Any);
    }

    match config.cors_origin.parse::<HeaderValue>() {
        Ok(origin) => layer.allow_origin(origin),
        Err(_) => {
            warn!(
                "Ignoring invalid CORS_ORIGIN {:?}, cross-origin requests will be refused",
                config.cors_origin
            );
            layer
        }
    }
}
