//! PostgreSQL-backed store. Tables:
//! - `tokens`: one encrypted OAuth token pair per provider name
//! - `strava_activities`: cached activity payloads keyed by Strava's id

use crate::crypto::CryptoEngine;
use crate::error::SyncError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgPool, Row};

/// Store backed by PostgreSQL.
pub struct SyncStore {
    pool: PgPool,
}

impl SyncStore {
    pub async fn new(db_url: &str) -> Result<Self, SyncError> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(db_url)
            .await
            .map_err(|e| SyncError::Database(format!("Failed to connect to PostgreSQL: {e}")))?;

        Ok(Self { pool })
    }

    /// Run schema migrations.
    pub async fn migrate(&self) -> Result<(), SyncError> {
        // One token pair per provider name; rows are provisioned, then updated
        // in place on every refresh, never deleted by the refresh flow.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tokens (
                name            TEXT PRIMARY KEY,
                access_token    TEXT NOT NULL,
                refresh_token   TEXT NOT NULL,
                expires_at      TIMESTAMPTZ NOT NULL,
                created_at      TIMESTAMPTZ DEFAULT NOW(),
                updated_at      TIMESTAMPTZ DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Cached activity payloads, keyed by Strava's activity id.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS strava_activities (
                id              BIGINT PRIMARY KEY,
                activity_data   JSONB NOT NULL,
                last_update     TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_strava_activities_start \
             ON strava_activities ((activity_data->>'start_date') DESC)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // =========================================================================
    // Tokens
    // =========================================================================

    /// Provision or replace a credential (stores encrypted tokens).
    pub async fn upsert_token(
        &self,
        crypto: &CryptoEngine,
        name: &str,
        access_token: &str,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), SyncError> {
        let enc_access = crypto.encrypt(access_token)?;
        let enc_refresh = crypto.encrypt(refresh_token)?;

        sqlx::query(
            r#"
            INSERT INTO tokens (name, access_token, refresh_token, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (name)
            DO UPDATE SET
                access_token  = EXCLUDED.access_token,
                refresh_token = EXCLUDED.refresh_token,
                expires_at    = EXCLUDED.expires_at,
                updated_at    = NOW()
            "#,
        )
        .bind(name)
        .bind(&enc_access)
        .bind(&enc_refresh)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Persist a refreshed token pair. Providers that never rotate the refresh
    /// token pass `None` and the stored one is kept.
    pub async fn update_refreshed_tokens(
        &self,
        crypto: &CryptoEngine,
        name: &str,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), SyncError> {
        let enc_access = crypto.encrypt(access_token)?;
        let enc_refresh = match refresh_token {
            Some(rt) => Some(crypto.encrypt(rt)?),
            None => None,
        };

        sqlx::query(
            r#"
            UPDATE tokens
            SET access_token  = $1,
                refresh_token = COALESCE($2, refresh_token),
                expires_at    = $3,
                updated_at    = NOW()
            WHERE name = $4
            "#,
        )
        .bind(&enc_access)
        .bind(&enc_refresh)
        .bind(expires_at)
        .bind(name)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get a decrypted token pair by provider name.
    pub async fn get_token(
        &self,
        crypto: &CryptoEngine,
        name: &str,
    ) -> Result<Option<StoredToken>, SyncError> {
        let row = sqlx::query(
            "SELECT access_token, refresh_token, expires_at FROM tokens WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        let row = match row {
            Some(r) => r,
            None => return Ok(None),
        };

        let enc_access: String = row.get(0);
        let enc_refresh: String = row.get(1);
        let expires_at: DateTime<Utc> = row.get(2);

        Ok(Some(StoredToken {
            access_token: crypto.decrypt(&enc_access)?,
            refresh_token: crypto.decrypt(&enc_refresh)?,
            expires_at,
            is_expired: expires_at < Utc::now(),
        }))
    }

    // =========================================================================
    // Strava activities
    // =========================================================================

    /// `last_update` of a cached activity, if the row exists.
    pub async fn activity_last_update(
        &self,
        activity_id: i64,
    ) -> Result<Option<DateTime<Utc>>, SyncError> {
        let row = sqlx::query("SELECT last_update FROM strava_activities WHERE id = $1")
            .bind(activity_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get(0)))
    }

    /// Insert or replace a cached activity with a fresh `last_update`.
    pub async fn upsert_activity(
        &self,
        activity_id: i64,
        activity_data: &serde_json::Value,
    ) -> Result<(), SyncError> {
        sqlx::query(
            r#"
            INSERT INTO strava_activities (id, activity_data, last_update)
            VALUES ($1, $2, NOW())
            ON CONFLICT (id)
            DO UPDATE SET
                activity_data = EXCLUDED.activity_data,
                last_update   = NOW()
            "#,
        )
        .bind(activity_id)
        .bind(activity_data)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Delete a cached activity. Returns whether a row was removed.
    pub async fn delete_activity(&self, activity_id: i64) -> Result<bool, SyncError> {
        let affected = sqlx::query("DELETE FROM strava_activities WHERE id = $1")
            .bind(activity_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(affected > 0)
    }

    /// Get a cached activity by id.
    pub async fn get_activity(&self, activity_id: i64) -> Result<Option<CachedActivity>, SyncError> {
        let row = sqlx::query(
            "SELECT id, activity_data, last_update FROM strava_activities WHERE id = $1",
        )
        .bind(activity_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| CachedActivity {
            id: r.get(0),
            activity_data: r.get(1),
            last_update: r.get(2),
        }))
    }

    /// The most recently started cached activity (what the site's widget shows).
    pub async fn latest_activity(&self) -> Result<Option<CachedActivity>, SyncError> {
        let row = sqlx::query(
            r#"
            SELECT id, activity_data, last_update
            FROM strava_activities
            ORDER BY activity_data->>'start_date' DESC NULLS LAST
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| CachedActivity {
            id: r.get(0),
            activity_data: r.get(1),
            last_update: r.get(2),
        }))
    }
}

// ── Types ────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct StoredToken {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub is_expired: bool,
}

#[derive(Debug, Serialize)]
pub struct CachedActivity {
    pub id: i64,
    pub activity_data: serde_json::Value,
    pub last_update: DateTime<Utc>,
}
