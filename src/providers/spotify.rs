use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::traits::{OAuthProvider, TokenSet};
use crate::error::SyncError;

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const API_BASE: &str = "https://api.spotify.com/v1";

/// Spotify OAuth 2.0 provider + Web API client.
///
/// Quirks:
/// - Client credentials go in an HTTP basic auth header, not the form body.
/// - Refresh responses never include a new refresh token; the provisioned one
///   stays valid indefinitely.
pub struct SpotifyProvider {
    client_id: String,
    client_secret: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SpotifyTokenResponse {
    access_token: String,
    expires_in: i64,
    #[allow(dead_code)]
    token_type: String,
}

/// Currently-playing track, flattened for the API response.
#[derive(Debug, Clone, Serialize)]
pub struct NowPlaying {
    pub is_playing: bool,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub track_url: Option<String>,
}

// Raw shapes from /me/player/currently-playing — only the fields we serve.
#[derive(Debug, Deserialize)]
struct CurrentlyPlayingResponse {
    is_playing: bool,
    item: Option<TrackItem>,
}

#[derive(Debug, Deserialize)]
struct TrackItem {
    name: String,
    artists: Vec<TrackArtist>,
    album: TrackAlbum,
    external_urls: Option<ExternalUrls>,
}

#[derive(Debug, Deserialize)]
struct TrackArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TrackAlbum {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

impl SpotifyProvider {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client_id,
            client_secret,
            http: reqwest::Client::new(),
        }
    }

    /// Fetch the currently-playing track. `None` when nothing is playing
    /// (Spotify answers 204 with an empty body).
    pub async fn currently_playing(
        &self,
        access_token: &str,
    ) -> Result<Option<NowPlaying>, SyncError> {
        let resp = self
            .http
            .get(format!("{API_BASE}/me/player/currently-playing"))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| SyncError::ProviderError(format!("Now-playing request failed: {e}")))?;

        if resp.status() == reqwest::StatusCode::NO_CONTENT {
            return Ok(None);
        }

        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SyncError::ProviderError(format!(
                "Spotify now-playing failed: {body}"
            )));
        }

        let playing: CurrentlyPlayingResponse = resp
            .json()
            .await
            .map_err(|e| SyncError::ProviderError(format!("Invalid now-playing response: {e}")))?;

        Ok(playing.item.map(|item| NowPlaying {
            is_playing: playing.is_playing,
            artist: item
                .artists
                .iter()
                .map(|a| a.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            title: item.name,
            album: item.album.name,
            track_url: item.external_urls.and_then(|u| u.spotify),
        }))
    }
}

#[async_trait]
impl OAuthProvider for SpotifyProvider {
    fn id(&self) -> &str {
        "spotify"
    }

    fn display_name(&self) -> &str {
        "Spotify"
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenSet, SyncError> {
        let resp = self
            .http
            .post(TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await
            .map_err(|e| SyncError::RefreshFailed(format!("Refresh request failed: {e}")))?;

        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SyncError::RefreshFailed(format!(
                "Spotify refresh failed: {body}"
            )));
        }

        let token_resp: SpotifyTokenResponse = resp
            .json()
            .await
            .map_err(|e| SyncError::RefreshFailed(format!("Failed to parse refresh response: {e}")))?;

        Ok(TokenSet {
            access_token: token_resp.access_token,
            // Spotify keeps the original refresh token valid
            refresh_token: None,
            expires_at: Some(Utc::now() + chrono::Duration::seconds(token_resp.expires_in)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_currently_playing() {
        let body = r#"{
            "is_playing": true,
            "item": {
                "name": "Weird Fishes/ Arpeggi",
                "artists": [{"name": "Radiohead"}],
                "album": {"name": "In Rainbows"},
                "external_urls": {"spotify": "https://open.spotify.com/track/51t"}
            }
        }"#;
        let resp: CurrentlyPlayingResponse = serde_json::from_str(body).unwrap();
        assert!(resp.is_playing);
        assert_eq!(resp.item.unwrap().artists[0].name, "Radiohead");
    }

    #[test]
    fn test_parse_paused_without_item() {
        // Podcasts and private sessions can report is_playing with no item.
        let body = r#"{"is_playing": false, "item": null}"#;
        let resp: CurrentlyPlayingResponse = serde_json::from_str(body).unwrap();
        assert!(resp.item.is_none());
    }

    #[test]
    fn test_multiple_artists_joined() {
        let item = TrackItem {
            name: "Track".into(),
            artists: vec![
                TrackArtist { name: "A".into() },
                TrackArtist { name: "B".into() },
            ],
            album: TrackAlbum { name: "Album".into() },
            external_urls: None,
        };
        let joined = item
            .artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        assert_eq!(joined, "A, B");
    }
}
