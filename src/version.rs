//! Deployed-version resolution for the status endpoint.
//!
//! Three tiers, first match wins:
//! 1. explicit `APP_VERSION` env var
//! 2. latest GitHub release tag of the configured repo
//! 3. short commit SHA injected by the deploy platform
//! falling back to the crate version when all three are absent.

use serde::Deserialize;
use tracing::warn;

use crate::config::Config;

#[derive(Debug, Deserialize)]
struct ReleaseResponse {
    tag_name: String,
}

/// Resolve once at startup; the result is kept in `AppState`.
pub async fn resolve(config: &Config) -> String {
    let release_tag = match (&config.app_version, &config.github_repo) {
        // Skip the network call when an explicit version is set.
        (None, Some(repo)) => latest_release_tag(repo).await,
        _ => None,
    };

    pick(
        config.app_version.clone(),
        release_tag,
        config.git_commit_sha.clone(),
    )
}

async fn latest_release_tag(repo: &str) -> Option<String> {
    let resp = reqwest::Client::new()
        .get(format!("https://api.github.com/repos/{repo}/releases/latest"))
        // GitHub rejects requests without a User-Agent
        .header("User-Agent", concat!("activity-sync/", env!("CARGO_PKG_VERSION")))
        .header("Accept", "application/vnd.github+json")
        .send()
        .await;

    let resp = match resp {
        Ok(r) if r.status().is_success() => r,
        Ok(r) => {
            warn!("GitHub release lookup for {repo} returned {}", r.status());
            return None;
        }
        Err(e) => {
            warn!("GitHub release lookup for {repo} failed: {e}");
            return None;
        }
    };

    resp.json::<ReleaseResponse>()
        .await
        .ok()
        .map(|r| r.tag_name)
}

fn pick(
    explicit: Option<String>,
    release_tag: Option<String>,
    commit_sha: Option<String>,
) -> String {
    if let Some(v) = explicit {
        return v;
    }
    if let Some(tag) = release_tag {
        return tag.strip_prefix('v').map(str::to_string).unwrap_or(tag);
    }
    if let Some(sha) = commit_sha {
        let short = sha.get(..7).unwrap_or(&sha);
        return format!("git-{short}");
    }
    env!("CARGO_PKG_VERSION").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_version_wins() {
        let v = pick(
            Some("2.0.0".into()),
            Some("v1.9.0".into()),
            Some("deadbeefcafe".into()),
        );
        assert_eq!(v, "2.0.0");
    }

    #[test]
    fn test_release_tag_loses_v_prefix() {
        assert_eq!(pick(None, Some("v1.9.0".into()), None), "1.9.0");
    }

    #[test]
    fn test_commit_sha_shortened() {
        assert_eq!(pick(None, None, Some("deadbeefcafe".into())), "git-deadbee");
    }

    #[test]
    fn test_short_sha_kept_whole() {
        assert_eq!(pick(None, None, Some("abc".into())), "git-abc");
    }

    #[test]
    fn test_falls_back_to_crate_version() {
        assert_eq!(pick(None, None, None), env!("CARGO_PKG_VERSION"));
    }
}
