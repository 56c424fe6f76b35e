//! API route handlers for the activity-sync service.
//!
//! All handlers receive `SharedState` via Axum state extraction. The token
//! endpoints are internal-only: other services of the site call them with the
//! shared `x-internal-secret` header; nothing here is end-user facing except
//! the cached reads.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::error::SyncError;
use crate::tokens;
use crate::webhooks::strava as strava_webhooks;
use crate::SharedState;

// =============================================================================
// V1 Router
// =============================================================================

pub fn v1_router(state: SharedState) -> Router {
    Router::new()
        // ── Health ───────────────────────────────────────────────────────
        .route("/status", get(status))
        // ── Tokens (internal) ────────────────────────────────────────────
        .route("/tokens/{name}", put(token_provision))
        .route("/tokens/{name}", get(token_get))
        // ── Cached activities ────────────────────────────────────────────
        .route("/activities/latest", get(activity_latest))
        .route("/activities/{id}", get(activity_get))
        // ── Spotify ──────────────────────────────────────────────────────
        .route("/spotify/now-playing", get(spotify_now_playing))
        // ── Webhooks ─────────────────────────────────────────────────────
        .route(
            "/webhooks/strava",
            get(strava_webhooks::strava_webhook_verify)
                .post(strava_webhooks::strava_webhook_event),
        )
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

async fn status(State(state): State<SharedState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "activity-sync",
        "version": state.version,
    }))
}

// =============================================================================
// Tokens
// =============================================================================

/// Check the `x-internal-secret` header for service-to-service endpoints.
fn require_internal(state: &SharedState, headers: &HeaderMap) -> Result<(), SyncError> {
    let internal = headers
        .get("x-internal-secret")
        .and_then(|v| v.to_str().ok())
        .ok_or(SyncError::Unauthorized)?;

    if internal != state.config.internal_secret {
        return Err(SyncError::Unauthorized);
    }

    Ok(())
}

#[derive(Deserialize)]
struct ProvisionTokenBody {
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

/// PUT /v1/tokens/:name — Provision or replace a credential.
///
/// This is the only way a name comes into existence; the refresh flow never
/// creates rows.
async fn token_provision(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(name): Path<String>,
    Json(body): Json<ProvisionTokenBody>,
) -> Result<Json<serde_json::Value>, SyncError> {
    require_internal(&state, &headers)?;

    state
        .store
        .upsert_token(
            &state.crypto,
            &name,
            &body.access_token,
            &body.refresh_token,
            body.expires_at,
        )
        .await?;

    tracing::info!("Provisioned credential '{name}'");

    Ok(Json(json!({ "data": { "name": name, "expires_at": body.expires_at } })))
}

#[derive(Deserialize)]
struct TokenQuery {
    #[serde(default)]
    force_refresh: bool,
}

/// GET /v1/tokens/:name — Get a valid access token (auto-refreshes if expired).
async fn token_get(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(name): Path<String>,
    Query(q): Query<TokenQuery>,
) -> Result<Json<serde_json::Value>, SyncError> {
    require_internal(&state, &headers)?;

    let access_token = tokens::access_token(&state, &name, q.force_refresh).await?;

    Ok(Json(json!({ "data": { "access_token": access_token } })))
}

// =============================================================================
// Cached activities
// =============================================================================

/// GET /v1/activities/latest — The most recently started cached activity.
async fn activity_latest(
    State(state): State<SharedState>,
) -> Result<Json<serde_json::Value>, SyncError> {
    let activity = state
        .store
        .latest_activity()
        .await?
        .ok_or_else(|| SyncError::NotFound("activity".into()))?;

    Ok(Json(json!({ "data": activity })))
}

/// GET /v1/activities/:id — A cached activity by Strava id.
async fn activity_get(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, SyncError> {
    let activity = state
        .store
        .get_activity(id)
        .await?
        .ok_or_else(|| SyncError::NotFound("activity".into()))?;

    Ok(Json(json!({ "data": activity })))
}

// =============================================================================
// Spotify
// =============================================================================

/// GET /v1/spotify/now-playing — The currently-playing track, if any.
async fn spotify_now_playing(
    State(state): State<SharedState>,
) -> Result<Json<serde_json::Value>, SyncError> {
    let spotify = state
        .providers
        .spotify
        .as_ref()
        .ok_or_else(|| SyncError::ProviderNotFound("spotify".into()))?;

    let access_token = tokens::access_token(&state, "spotify", false).await?;

    match spotify.currently_playing(&access_token).await? {
        Some(track) => Ok(Json(json!({ "data": track }))),
        None => Ok(Json(json!({ "data": { "is_playing": false } }))),
    }
}
