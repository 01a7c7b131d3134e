//! SketchFlow room relay.
//!
//! Clients join named rooms over a WebSocket and push whole-canvas
//! snapshots; each snapshot is forwarded to the other members of the room.
//! The relay keeps no canvas state.

pub mod config;
pub mod protocol;
pub mod relay;
pub mod ws;

use axum::{
    Json, Router,
    http::Method,
    response::IntoResponse,
    routing::get,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

pub use config::{Config, ConfigError};
pub use protocol::{ClientMessage, ServerMessage};
pub use relay::{PeerId, RelayError, RoomRelay};

/// Build the HTTP router: health endpoints plus the `/ws` upgrade.
pub fn router(relay: Arc<RoomRelay>, config: &Config) -> Router {
    let cors = if config.allowed_origins.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(config.allowed_origins.iter().cloned()))
            .allow_methods([Method::GET, Method::POST])
    };

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/health", get(api_health))
        .route("/ws", get(ws::ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(relay)
}

/// Index page
async fn index() -> &'static str {
    "SketchFlow Relay Server - Connect via WebSocket at /ws"
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

async fn api_health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}
