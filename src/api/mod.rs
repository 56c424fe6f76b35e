//! API router for activity-sync.
//!
//! Mounts all endpoint groups under /v1/:
//! - /v1/tokens     — credential provisioning + access token retrieval (internal)
//! - /v1/activities — cached Strava activity reads
//! - /v1/spotify    — now-playing proxy
//! - /v1/webhooks   — Strava push events + subscription handshake
//! - /v1/status     — health check

pub mod routes;

use crate::SharedState;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/v1", routes::v1_router(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
