//! Strava Webhook Handler
//!
//! Receives Strava push events and keeps the `strava_activities` cache in
//! sync: activity creates/updates trigger a fetch-and-upsert, deletes remove
//! the cached row. Updates arriving within the debounce window are dropped
//! without touching the Strava API (the API quota is small; a burst of edits
//! to one activity should cost a single fetch).
//!
//! Subscription handshake: Strava `GET`s the endpoint with `hub.challenge` and
//! `hub.verify_token` query parameters and expects the challenge echoed back
//! as JSON iff the verify token matches.

use axum::{
    extract::{Query, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::SyncError;
use crate::tokens;
use crate::SharedState;

/// Repeated `update` events for an activity within this window are dropped.
const DEBOUNCE_WINDOW_SECS: i64 = 60;

// =============================================================================
// Event Shapes
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectType {
    Create,
    Update,
    Delete,
}

/// Inbound event envelope. `object_type` is "activity" or "athlete".
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub object_id: i64,
    pub aspect_type: AspectType,
    pub object_type: String,
}

#[derive(Debug, Deserialize)]
pub struct HubChallengeQuery {
    #[serde(rename = "hub.challenge")]
    pub challenge: String,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /webhooks/strava — subscription verification handshake.
///
/// A wrong verify token gets no echo; the 401 makes the misconfigured
/// subscription visible in Strava's dashboard instead of silently "working".
pub async fn strava_webhook_verify(
    State(state): State<SharedState>,
    Query(q): Query<HubChallengeQuery>,
) -> Result<Json<Value>, SyncError> {
    match challenge_reply(&q, &state.config.strava_verify_token) {
        Some(reply) => {
            tracing::info!("[Webhook:Strava] subscription handshake verified");
            Ok(Json(reply))
        }
        None => {
            tracing::warn!("[Webhook:Strava] handshake with wrong verify token — rejecting");
            Err(SyncError::Unauthorized)
        }
    }
}

/// Handshake decision: the challenge is echoed only for a matching verify
/// token; anything else gets no echo at all.
fn challenge_reply(q: &HubChallengeQuery, expected_token: &str) -> Option<Value> {
    (q.verify_token == expected_token).then(|| json!({ "hub.challenge": q.challenge }))
}

/// POST /webhooks/strava — receive a push event.
///
/// The body is parsed by hand so malformed payloads map to 400 rather than an
/// extractor rejection. Sync failures propagate as 5xx; Strava redelivers on
/// non-2xx and that redelivery is the whole retry strategy.
pub async fn strava_webhook_event(
    State(state): State<SharedState>,
    body: axum::body::Bytes,
) -> Result<Json<Value>, SyncError> {
    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| SyncError::BadRequest(format!("invalid webhook payload: {e}")))?;

    tracing::info!(
        "[Webhook:Strava] {:?} {} id={}",
        event.aspect_type,
        event.object_type,
        event.object_id
    );

    if let Err(e) = sync_event(&state, &event).await {
        tracing::error!(
            "[Webhook:Strava] sync error for activity {}: {e}",
            event.object_id
        );
        return Err(e);
    }

    Ok(Json(json!({ "received": true })))
}

// =============================================================================
// Sync
// =============================================================================

/// Apply one event to the cache.
async fn sync_event(state: &crate::AppState, event: &WebhookEvent) -> Result<(), SyncError> {
    // Athlete events (deauthorization etc.) carry nothing to cache.
    if event.object_type != "activity" {
        tracing::debug!("[Webhook:Strava] ignoring object_type={}", event.object_type);
        return Ok(());
    }

    match event.aspect_type {
        AspectType::Create | AspectType::Update => {
            // Non-transactional read-then-write: two concurrent deliveries for
            // the same id can both pass this check and fetch; the second
            // upsert wins.
            let last_update = state.store.activity_last_update(event.object_id).await?;

            if !should_fetch(event.aspect_type, last_update, Utc::now()) {
                tracing::info!(
                    "[Webhook:Strava] dropping update for {} — fetched <{DEBOUNCE_WINDOW_SECS}s ago",
                    event.object_id
                );
                return Ok(());
            }

            let access_token = tokens::access_token(state, "strava", false).await?;
            let strava = state
                .providers
                .strava
                .as_ref()
                .ok_or_else(|| SyncError::ProviderNotFound("strava".into()))?;

            let activity = strava.fetch_activity(&access_token, event.object_id).await?;
            state.store.upsert_activity(event.object_id, &activity).await?;

            tracing::info!("[Webhook:Strava] cached activity {}", event.object_id);
        }
        AspectType::Delete => {
            let removed = state.store.delete_activity(event.object_id).await?;
            tracing::info!(
                "[Webhook:Strava] delete for {} — {}",
                event.object_id,
                if removed { "removed" } else { "not cached" }
            );
        }
    }

    Ok(())
}

/// Debounce decision: creates always fetch; updates fetch only when the cached
/// row is absent or older than the window.
fn should_fetch(
    aspect: AspectType,
    last_update: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    match aspect {
        AspectType::Create => true,
        AspectType::Update => match last_update {
            Some(lu) => (now - lu).num_seconds() >= DEBOUNCE_WINDOW_SECS,
            None => true,
        },
        // Deletes take their own path in `sync_event`; they never fetch.
        AspectType::Delete => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(now: DateTime<Utc>, secs_ago: i64) -> Option<DateTime<Utc>> {
        Some(now - Duration::seconds(secs_ago))
    }

    #[test]
    fn test_create_always_fetches() {
        let now = Utc::now();
        assert!(should_fetch(AspectType::Create, at(now, 5), now));
        assert!(should_fetch(AspectType::Create, None, now));
    }

    #[test]
    fn test_recent_update_dropped() {
        let now = Utc::now();
        assert!(!should_fetch(AspectType::Update, at(now, 30), now));
    }

    #[test]
    fn test_stale_update_fetches() {
        let now = Utc::now();
        assert!(should_fetch(AspectType::Update, at(now, 90), now));
    }

    #[test]
    fn test_update_for_uncached_activity_fetches() {
        assert!(should_fetch(AspectType::Update, None, Utc::now()));
    }

    #[test]
    fn test_delete_never_fetches() {
        let now = Utc::now();
        assert!(!should_fetch(AspectType::Delete, at(now, 90), now));
        assert!(!should_fetch(AspectType::Delete, None, now));
    }

    #[test]
    fn test_handshake_echoes_challenge_for_matching_token() {
        let q = HubChallengeQuery {
            challenge: "15f7d1a91c1f40f8a748fd134752feb3".into(),
            verify_token: "s3cret".into(),
        };
        let reply = challenge_reply(&q, "s3cret").unwrap();
        assert_eq!(
            reply["hub.challenge"],
            json!("15f7d1a91c1f40f8a748fd134752feb3")
        );
    }

    #[test]
    fn test_handshake_rejects_wrong_token() {
        let q = HubChallengeQuery {
            challenge: "15f7d1a91c1f40f8a748fd134752feb3".into(),
            verify_token: "guess".into(),
        };
        assert!(challenge_reply(&q, "s3cret").is_none());
    }

    #[test]
    fn test_parse_event_payload() {
        let body = r#"{
            "object_id": 12345678987654321,
            "aspect_type": "update",
            "object_type": "activity",
            "owner_id": 134815,
            "subscription_id": 120475,
            "event_time": 1516126040,
            "updates": {"title": "Morning run"}
        }"#;
        let event: WebhookEvent = serde_json::from_slice(body.as_bytes()).unwrap();
        assert_eq!(event.object_id, 12345678987654321);
        assert_eq!(event.aspect_type, AspectType::Update);
        assert_eq!(event.object_type, "activity");
    }

    #[test]
    fn test_unknown_aspect_rejected() {
        let body = r#"{"object_id": 1, "aspect_type": "promote", "object_type": "activity"}"#;
        assert!(serde_json::from_slice::<WebhookEvent>(body.as_bytes()).is_err());
    }
}
