//! HTTP application assembly
//!
//! Merges the feature routers and applies the shared tower layers.

use axum::{
    Router,
    http::{HeaderValue, Method, StatusCode, header},
    routing::get,
};
use tower_http::compression::{CompressionLayer, CompressionLevel};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::core::auth::{AuthApiState, AuthService, auth_api_router};
use crate::core::config::Config;
use crate::core::db::CredentialStore;
use crate::core::presence::{PresenceHandle, presence_router};
use crate::core::response::ApiResponse;

/// Build the full application router
pub fn app<S: CredentialStore>(
    auth_service: AuthService<S>,
    presence: PresenceHandle,
    config: &Config,
) -> Router {
    let port = config.port;

    Router::new()
        .route(
            "/",
            get(move || async move {
                ApiResponse::success(StatusCode::OK, format!("Server is running on port {port}."))
            }),
        )
        // REST API: /auth/*
        .merge(auth_api_router(AuthApiState::new(auth_service)))
        // WebSocket endpoint for presence: ws://{host}/presence
        .merge(presence_router(presence))
        .layer(cors_layer(config.allowed_origins()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CompressionLayer::new()
                .br(true)
                .gzip(true)
                .quality(CompressionLevel::Default),
        )
}

/// CORS for the single-page client, cookies included
fn cors_layer<'a>(origins: impl Iterator<Item = &'a str>) -> CorsLayer {
    // A wildcard cannot be combined with credentials
    let origins: Vec<HeaderValue> = origins
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) if value != "*" => Some(value),
            _ => {
                tracing::warn!("{:?} is not a valid origin, skipping it for CORS", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_origin(AllowOrigin::list(origins))
}
