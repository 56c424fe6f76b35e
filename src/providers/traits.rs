use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// A token pair returned from a provider's refresh endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    /// `None` when the provider does not rotate refresh tokens (Spotify);
    /// the store keeps the previously persisted one in that case.
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Trait every OAuth provider must implement.
///
/// This service never runs an interactive authorization flow — credentials are
/// provisioned with a working refresh token, and the only provider-side OAuth
/// operation is exchanging it for a fresh access token.
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Unique provider identifier (e.g., "strava", "spotify").
    fn id(&self) -> &str;

    /// Human-readable display name (e.g., "Strava", "Spotify").
    fn display_name(&self) -> &str;

    /// Exchange a refresh token for a fresh access token.
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenSet, SyncError>;
}
