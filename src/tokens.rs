//! On-demand token refresh.
//!
//! `access_token` is the single entry point every outbound provider call goes
//! through: it serves the cached access token while it is valid and hits the
//! provider's OAuth refresh endpoint only when the token expired (or a refresh
//! is forced).

use tracing::info;

use crate::error::SyncError;
use crate::store::db::StoredToken;
use crate::AppState;

/// Return a currently-valid access token for the named credential, refreshing
/// and persisting a new pair if the stored one expired.
///
/// The credential must be pre-provisioned; this flow never creates rows.
/// Concurrent refreshes for the same name race with last-writer-wins — the
/// provider hands out independent valid tokens, so this is tolerated rather
/// than locked.
pub async fn access_token(
    state: &AppState,
    name: &str,
    force_refresh: bool,
) -> Result<String, SyncError> {
    let stored = state
        .store
        .get_token(&state.crypto, name)
        .await?
        .ok_or_else(|| SyncError::MissingCredential(name.to_string()))?;

    if !should_refresh(&stored, force_refresh) {
        return Ok(stored.access_token);
    }

    let provider = state
        .providers
        .registry
        .get(name)
        .ok_or_else(|| SyncError::ProviderNotFound(name.to_string()))?;

    // Provider rejection is unrecoverable here: no retry, no backoff.
    let tokens = provider.refresh_token(&stored.refresh_token).await?;

    // A provider that omits expiry gets the conventional one-hour lifetime.
    let expires_at = tokens
        .expires_at
        .unwrap_or_else(|| chrono::Utc::now() + chrono::Duration::hours(1));

    // Persisted only after the full response validated — no partial writes.
    state
        .store
        .update_refreshed_tokens(
            &state.crypto,
            name,
            &tokens.access_token,
            tokens.refresh_token.as_deref(),
            expires_at,
        )
        .await?;

    info!("Refreshed {name} token (expires {expires_at})");

    Ok(tokens.access_token)
}

fn should_refresh(stored: &StoredToken, force_refresh: bool) -> bool {
    force_refresh || stored.is_expired
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn token(expired: bool) -> StoredToken {
        let offset = if expired { -1 } else { 1 };
        let expires_at = Utc::now() + Duration::hours(offset);
        StoredToken {
            access_token: "access".into(),
            refresh_token: "refresh".into(),
            expires_at,
            is_expired: expired,
        }
    }

    #[test]
    fn test_valid_token_served_from_cache() {
        assert!(!should_refresh(&token(false), false));
    }

    #[test]
    fn test_expired_token_triggers_refresh() {
        assert!(should_refresh(&token(true), false));
    }

    #[test]
    fn test_force_refresh_ignores_validity() {
        assert!(should_refresh(&token(false), true));
    }
}
