mod spotify;

use async_trait::async_trait;
use std::time::Duration;

use crate::types::Track;

pub use spotify::{playlist_id_from_url, SpotifyAuth, SpotifyProvider};

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors that can occur while resolving a playlist
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Playlist not found")]
    NotFound,

    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Response parsing failed: {0}")]
    ParseError(String),
}

/// How the invoking command referred to a playlist
#[derive(Debug, Clone, PartialEq)]
pub enum PlaylistRef {
    /// Direct link, e.g. `https://open.spotify.com/playlist/<id>?si=...`
    Url(String),
    /// Free-text search query
    Search(String),
}

/// Trait that all music catalogs must implement
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Resolve a playlist into its ordered track list
    async fn resolve_playlist(&self, playlist: &PlaylistRef) -> CatalogResult<Vec<Track>>;

    /// Get the name of this provider
    fn name(&self) -> &str;
}

/// Configuration for the catalog provider
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Pre-acquired bearer token (skips the client-credentials flow)
    pub access_token: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Timeout for a single HTTP request
    pub request_timeout: Duration,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            client_id: None,
            client_secret: None,
            request_timeout: Duration::from_secs(20),
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

impl CatalogConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            access_token: non_empty_env("SPOTIFY_ACCESS_TOKEN"),
            client_id: non_empty_env("SPOTIFY_CLIENT_ID"),
            client_secret: non_empty_env("SPOTIFY_CLIENT_SECRET"),
            request_timeout: non_empty_env("CATALOG_TIMEOUT")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(20)),
        }
    }

    /// Pick the authentication mode from whatever credentials are configured
    pub fn auth(&self) -> CatalogResult<SpotifyAuth> {
        if let Some(token) = &self.access_token {
            return Ok(SpotifyAuth::Bearer(token.clone()));
        }

        match (&self.client_id, &self.client_secret) {
            (Some(client_id), Some(client_secret)) => Ok(SpotifyAuth::ClientCredentials {
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
            }),
            _ => Err(CatalogError::ConfigError(
                "No catalog credentials configured. Set SPOTIFY_ACCESS_TOKEN or SPOTIFY_CLIENT_ID and SPOTIFY_CLIENT_SECRET".to_string(),
            )),
        }
    }

    /// Build the configured catalog provider
    pub fn build_provider(&self) -> CatalogResult<SpotifyProvider> {
        SpotifyProvider::new(self.auth()?, self.request_timeout)
    }
}
