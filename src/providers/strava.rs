use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::traits::{OAuthProvider, TokenSet};
use crate::error::SyncError;

const TOKEN_URL: &str = "https://www.strava.com/oauth/token";
const API_BASE: &str = "https://www.strava.com/api/v3";

/// Strava OAuth 2.0 provider + REST client.
///
/// Quirks:
/// - The token endpoint returns an absolute `expires_at` (unix seconds) in
///   addition to the relative `expires_in`.
/// - Refresh responses always carry a refresh token, which may rotate —
///   it must be persisted on every refresh.
pub struct StravaProvider {
    client_id: String,
    client_secret: String,
    http: reqwest::Client,
}

/// Matches Strava's exact token endpoint response.
#[derive(Debug, Deserialize)]
struct StravaTokenResponse {
    access_token: String,
    refresh_token: String,
    expires_at: i64,
    #[allow(dead_code)]
    expires_in: i64,
    #[allow(dead_code)]
    token_type: String,
}

impl StravaProvider {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client_id,
            client_secret,
            http: reqwest::Client::new(),
        }
    }

    /// Fetch the full activity payload by id.
    ///
    /// The payload is treated as opaque JSON — it is cached verbatim and served
    /// back to readers without interpretation.
    pub async fn fetch_activity(
        &self,
        access_token: &str,
        activity_id: i64,
    ) -> Result<serde_json::Value, SyncError> {
        let resp = self
            .http
            .get(format!("{API_BASE}/activities/{activity_id}"))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| SyncError::ProviderError(format!("Activity fetch failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(SyncError::ProviderError(format!(
                "Strava activity {activity_id} fetch failed ({status}): {body}"
            )));
        }

        resp.json()
            .await
            .map_err(|e| SyncError::ProviderError(format!("Invalid activity response: {e}")))
    }
}

#[async_trait]
impl OAuthProvider for StravaProvider {
    fn id(&self) -> &str {
        "strava"
    }

    fn display_name(&self) -> &str {
        "Strava"
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenSet, SyncError> {
        let resp = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await
            .map_err(|e| SyncError::RefreshFailed(format!("Refresh request failed: {e}")))?;

        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SyncError::RefreshFailed(format!(
                "Strava refresh failed: {body}"
            )));
        }

        let token_resp: StravaTokenResponse = resp
            .json()
            .await
            .map_err(|e| SyncError::RefreshFailed(format!("Failed to parse refresh response: {e}")))?;

        Ok(TokenSet {
            access_token: token_resp.access_token,
            refresh_token: Some(token_resp.refresh_token),
            expires_at: DateTime::<Utc>::from_timestamp(token_resp.expires_at, 0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_token_response() {
        let body = r#"{
            "token_type": "Bearer",
            "access_token": "a9b8c7d6",
            "expires_at": 1739467200,
            "expires_in": 21600,
            "refresh_token": "e5f4a3b2"
        }"#;
        let resp: StravaTokenResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.access_token, "a9b8c7d6");
        assert_eq!(resp.refresh_token, "e5f4a3b2");
        assert_eq!(resp.expires_at, 1739467200);
    }

    #[test]
    fn test_token_response_requires_refresh_token() {
        // A refresh response without a refresh token is malformed and must
        // fail before anything is persisted.
        let body = r#"{"token_type": "Bearer", "access_token": "x", "expires_at": 1, "expires_in": 1}"#;
        assert!(serde_json::from_str::<StravaTokenResponse>(body).is_err());
    }
}
