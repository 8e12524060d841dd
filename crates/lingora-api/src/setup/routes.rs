//! Route configuration.

use std::sync::Arc;

use anyhow::Result;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use lingora_core::Config;

use crate::api_doc::ApiDoc;
use crate::handlers;
use crate::state::AppState;

/// Setup all application routes.
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router> {
    let cors = setup_cors(config)?;

    // Storage keys contain slashes, so the delete route takes a catch-all.
    let profile_routes = Router::new()
        .route(
            "/profile",
            get(handlers::profile_get::get_profile).put(handlers::profile_update::update_profile),
        )
        .route(
            "/profile/avatar",
            post(handlers::avatar_upload::upload_avatar),
        )
        .route(
            "/profile/file/{file_type}/{*key}",
            delete(handlers::file_delete::delete_file),
        );

    let http_concurrency_limit = std::env::var("HTTP_CONCURRENCY_LIMIT")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(1024)
        .max(1);

    // The body limit sits above the avatar size cap on purpose: oversize
    // uploads should reach the validator and get its 400, not a bare 413.
    let app = Router::new()
        .route("/health", get(health))
        .route("/api/openapi.json", get(openapi_spec))
        .nest("/api/v0", profile_routes)
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        .layer(RequestBodyLimitLayer::new(config.max_request_body_bytes))
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

/// Liveness probe. Answers as long as the process is serving requests; it
/// deliberately checks no backend, so a flapping dependency cannot make an
/// orchestrator restart a healthy process.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

fn setup_cors(config: &Config) -> Result<CorsLayer> {
    let cors = if config.cors_origins.contains(&"*".to_string()) {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers(Any)
    } else {
        let origins: Result<Vec<HeaderValue>, _> =
            config.cors_origins.iter().map(|o| o.parse()).collect();
        CorsLayer::new()
            .allow_origin(origins.unwrap_or_default())
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers(Any)
    };
    Ok(cors)
}
