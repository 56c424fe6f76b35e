use anyhow::{Context, Result};

/// Application configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // ── Server ──────────────────────────────────────────────────────────
    pub host: String,
    pub port: u16,

    // ── Database (PostgreSQL) ───────────────────────────────────────────
    pub database_url: String,

    // ── Crypto ──────────────────────────────────────────────────────────
    /// 32-byte base64-encoded master key for AES-256-GCM token encryption.
    pub master_key: String,

    // ── Service-to-service auth ─────────────────────────────────────────
    /// Shared secret for the token provisioning/retrieval endpoints.
    pub internal_secret: String,

    // ── Strava ──────────────────────────────────────────────────────────
    pub strava_client_id: Option<String>,
    pub strava_client_secret: Option<String>,
    /// Echoed back during the webhook subscription handshake.
    pub strava_verify_token: String,

    // ── Spotify ─────────────────────────────────────────────────────────
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,

    // ── Version resolution ──────────────────────────────────────────────
    /// Explicit version override; wins over any lookup.
    pub app_version: Option<String>,
    /// "owner/repo" to query for the latest release tag.
    pub github_repo: Option<String>,
    /// Commit SHA injected by the deploy platform.
    pub git_commit_sha: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8460".into())
                .parse()
                .context("Invalid PORT")?,

            database_url: std::env::var("DATABASE_URL")
                .context("DATABASE_URL is required (PostgreSQL connection string)")?,
            master_key: std::env::var("MASTER_KEY")
                .context("MASTER_KEY is required (32 bytes, base64)")?,

            internal_secret: std::env::var("INTERNAL_SECRET")
                .context("INTERNAL_SECRET is required for the token endpoints")?,

            strava_client_id: std::env::var("STRAVA_CLIENT_ID").ok(),
            strava_client_secret: std::env::var("STRAVA_CLIENT_SECRET").ok(),
            strava_verify_token: std::env::var("STRAVA_VERIFY_TOKEN")
                .context("STRAVA_VERIFY_TOKEN is required for webhook subscription")?,

            spotify_client_id: std::env::var("SPOTIFY_CLIENT_ID").ok(),
            spotify_client_secret: std::env::var("SPOTIFY_CLIENT_SECRET").ok(),

            app_version: std::env::var("APP_VERSION").ok(),
            github_repo: std::env::var("GITHUB_REPO").ok(),
            git_commit_sha: std::env::var("GIT_COMMIT_SHA").ok(),
        })
    }
}
