//! Router assembly and HTTP middleware layers.

use anyhow::Result;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use gala_core::Config;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

use crate::api_doc::ApiDoc;
use crate::handlers;
use crate::state::AppState;

/// Intent/complete/list bodies are small JSON; originals never pass through
/// this service.
const MAX_BODY_BYTES: usize = 64 * 1024;

pub fn build_router(state: Arc<AppState>, config: &Config) -> Result<Router> {
    let cors = build_cors_layer(config)?;

    let router = Router::new()
        .route("/health", get(handlers::health::health))
        .route(
            "/api/v0/uploads/intent",
            post(handlers::upload_intent::create_upload_intent),
        )
        .route(
            "/api/v0/uploads/complete",
            post(handlers::upload_complete::complete_upload),
        )
        .route(
            "/api/v0/events/{code}/media",
            get(handlers::gallery::list_event_media),
        )
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/rapidoc"))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state);

    Ok(router)
}

fn build_cors_layer(config: &Config) -> Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    if config.cors_origins.iter().any(|o| o == "*") {
        Ok(layer.allow_origin(Any))
    } else {
        let origins = config
            .cors_origins
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(layer.allow_origin(origins))
    }
}
