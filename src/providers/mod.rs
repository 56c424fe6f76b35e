mod registry;
mod spotify;
mod strava;
mod traits;

pub use registry::ProviderRegistry;
pub use spotify::{NowPlaying, SpotifyProvider};
pub use strava::StravaProvider;
pub use traits::{OAuthProvider, TokenSet};

use std::sync::Arc;

use crate::config::Config;

/// All configured providers: the dyn registry for the token-refresh flow plus
/// concrete handles for provider-specific REST calls.
pub struct Providers {
    pub registry: ProviderRegistry,
    pub strava: Option<Arc<StravaProvider>>,
    pub spotify: Option<Arc<SpotifyProvider>>,
}

/// Build every provider that has credentials configured.
pub fn from_config(config: &Config) -> Providers {
    let mut registry = ProviderRegistry::new();

    let strava = match (&config.strava_client_id, &config.strava_client_secret) {
        (Some(id), Some(secret)) => {
            let p = Arc::new(StravaProvider::new(id.clone(), secret.clone()));
            registry.register(p.clone());
            Some(p)
        }
        _ => None,
    };

    let spotify = match (&config.spotify_client_id, &config.spotify_client_secret) {
        (Some(id), Some(secret)) => {
            let p = Arc::new(SpotifyProvider::new(id.clone(), secret.clone()));
            registry.register(p.clone());
            Some(p)
        }
        _ => None,
    };

    Providers {
        registry,
        strava,
        spotify,
    }
}
