use super::*;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Instant;
use tokio::sync::RwLock;

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const API_BASE: &str = "https://api.spotify.com/v1";

/// Upper bound on followed `next` links (100 tracks per page)
const MAX_TRACK_PAGES: usize = 50;

/// Refresh the cached token this long before Spotify says it expires
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// How the provider authenticates against the Web API
#[derive(Debug, Clone)]
pub enum SpotifyAuth {
    /// Already-acquired bearer token
    Bearer(String),
    /// Client-credentials flow, token fetched on demand and cached
    ClientCredentials {
        client_id: String,
        client_secret: String,
    },
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Spotify Web API catalog
pub struct SpotifyProvider {
    client: reqwest::Client,
    auth: SpotifyAuth,
    cached_token: RwLock<Option<CachedToken>>,
    request_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    playlists: Option<PlaylistSearchPage>,
}

#[derive(Debug, Deserialize)]
struct PlaylistSearchPage {
    // Spotify may return null entries in search results
    #[serde(default)]
    items: Vec<Option<PlaylistSummary>>,
}

#[derive(Debug, Deserialize)]
struct PlaylistSummary {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PlaylistResponse {
    tracks: TrackPage,
}

#[derive(Debug, Deserialize)]
struct TrackPage {
    #[serde(default)]
    items: Vec<PlaylistItem>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    track: Option<SpotifyTrack>,
}

#[derive(Debug, Deserialize)]
struct SpotifyTrack {
    name: Option<String>,
    #[serde(default)]
    artists: Vec<SpotifyArtist>,
}

#[derive(Debug, Deserialize)]
struct SpotifyArtist {
    name: String,
}

/// Extract the playlist id from a playlist link.
///
/// `https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M?si=abc` yields
/// `37i9dQZF1DXcBWIGoYBM5M`.
pub fn playlist_id_from_url(url: &str) -> Option<String> {
    let path = url.split('?').next().unwrap_or_default();
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty() && !id.contains(':'))
        .map(str::to_string)
}

/// Keep playable tracks, preserving artist order (main artist first)
fn tracks_from_page(page: TrackPage) -> Vec<Track> {
    page.items
        .into_iter()
        .filter_map(|item| item.track)
        .filter_map(|track| {
            let title = track.name.filter(|name| !name.trim().is_empty())?;
            let artists: Vec<String> = track
                .artists
                .into_iter()
                .map(|artist| artist.name)
                .filter(|name| !name.trim().is_empty())
                .collect();
            (!artists.is_empty()).then(|| Track::new(title, artists))
        })
        .collect()
}

impl SpotifyProvider {
    /// Create a new Spotify provider with the given authentication mode
    pub fn new(auth: SpotifyAuth, request_timeout: Duration) -> CatalogResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| CatalogError::ConfigError(e.to_string()))?;

        Ok(Self {
            client,
            auth,
            cached_token: RwLock::new(None),
            request_timeout,
        })
    }

    fn request_error(&self, e: reqwest::Error) -> CatalogError {
        if e.is_timeout() {
            CatalogError::Timeout(self.request_timeout)
        } else {
            CatalogError::ApiError(e.to_string())
        }
    }

    async fn access_token(&self) -> CatalogResult<String> {
        let (client_id, client_secret) = match &self.auth {
            SpotifyAuth::Bearer(token) => return Ok(token.clone()),
            SpotifyAuth::ClientCredentials {
                client_id,
                client_secret,
            } => (client_id, client_secret),
        };

        if let Some(cached) = self.cached_token.read().await.as_ref() {
            if cached.expires_at > Instant::now() {
                return Ok(cached.value.clone());
            }
        }

        tracing::debug!("Requesting Spotify client-credentials token");
        let credentials = STANDARD.encode(format!("{}:{}", client_id, client_secret));
        let response = self
            .client
            .post(TOKEN_URL)
            .header(AUTHORIZATION, format!("Basic {}", credentials))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        if !response.status().is_success() {
            return Err(CatalogError::ApiError(format!(
                "Spotify token endpoint returned status: {}",
                response.status()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::ParseError(e.to_string()))?;

        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(3600))
            .saturating_sub(TOKEN_EXPIRY_MARGIN);
        *self.cached_token.write().await = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        Ok(token.access_token)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> CatalogResult<T> {
        let token = self.access_token().await?;

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound);
        }
        if !response.status().is_success() {
            return Err(CatalogError::ApiError(format!(
                "Spotify API returned status: {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| CatalogError::ParseError(e.to_string()))
    }

    async fn search_playlist(&self, query: &str) -> CatalogResult<String> {
        let response: SearchResponse = self
            .get_json(
                &format!("{}/search", API_BASE),
                &[("q", query), ("type", "playlist"), ("limit", "1")],
            )
            .await?;

        response
            .playlists
            .and_then(|page| page.items.into_iter().flatten().next())
            .map(|playlist| playlist.id)
            .ok_or(CatalogError::NotFound)
    }
}

#[async_trait]
impl CatalogProvider for SpotifyProvider {
    async fn resolve_playlist(&self, playlist: &PlaylistRef) -> CatalogResult<Vec<Track>> {
        let playlist_id = match playlist {
            PlaylistRef::Url(url) => playlist_id_from_url(url).ok_or(CatalogError::NotFound)?,
            PlaylistRef::Search(query) => self.search_playlist(query).await?,
        };
        tracing::info!("Resolving Spotify playlist {}", playlist_id);

        let response: PlaylistResponse = self
            .get_json(&format!("{}/playlists/{}", API_BASE, playlist_id), &[])
            .await?;

        let mut next = response.tracks.next.clone();
        let mut tracks = tracks_from_page(response.tracks);
        let mut pages = 1;

        while let Some(url) = next {
            if pages >= MAX_TRACK_PAGES {
                tracing::warn!(
                    "Playlist {} has more than {} pages, ignoring the rest",
                    playlist_id,
                    MAX_TRACK_PAGES
                );
                break;
            }
            let page: TrackPage = self.get_json(&url, &[]).await?;
            next = page.next.clone();
            tracks.extend(tracks_from_page(page));
            pages += 1;
        }

        tracing::info!("Playlist {} resolved to {} tracks", playlist_id, tracks.len());
        Ok(tracks)
    }

    fn name(&self) -> &str {
        "spotify"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playlist_id_from_url() {
        assert_eq!(
            playlist_id_from_url("https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M?si=abc"),
            Some("37i9dQZF1DXcBWIGoYBM5M".to_string())
        );
        assert_eq!(
            playlist_id_from_url("https://open.spotify.com/playlist/abc123/"),
            Some("abc123".to_string())
        );
        assert_eq!(playlist_id_from_url("https://"), None);
    }

    #[test]
    fn test_tracks_from_page_keeps_artist_order_and_drops_junk() {
        let page: TrackPage = serde_json::from_value(serde_json::json!({
            "items": [
                { "track": { "name": "Work", "artists": [{ "name": "Rihanna" }, { "name": "Drake" }] } },
                { "track": null },
                { "track": { "name": "No Artists", "artists": [] } },
                { "track": { "name": null, "artists": [{ "name": "Ghost" }] } },
                { "track": { "name": "Hello (Live)", "artists": [{ "name": "Adele" }] } }
            ],
            "next": null
        }))
        .unwrap();

        let tracks = tracks_from_page(page);
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].title, "Work");
        assert_eq!(tracks[0].artists, vec!["Rihanna", "Drake"]);
        assert_eq!(tracks[1].title, "Hello (Live)");
    }

    #[test]
    fn test_search_response_skips_null_items() {
        let response: SearchResponse = serde_json::from_value(serde_json::json!({
            "playlists": { "items": [null, { "id": "xyz" }] }
        }))
        .unwrap();
        let first = response
            .playlists
            .and_then(|page| page.items.into_iter().flatten().next())
            .map(|p| p.id);
        assert_eq!(first, Some("xyz".to_string()));
    }

    #[tokio::test]
    #[ignore] // Only run with real Spotify credentials
    async fn test_spotify_resolve_search() {
        let config = CatalogConfig::from_env();
        let provider = config.build_provider().expect("credentials not set");

        let tracks = provider
            .resolve_playlist(&PlaylistRef::Search("today's top hits".to_string()))
            .await
            .unwrap();

        assert!(!tracks.is_empty());
        println!("First track: {:?}", tracks[0]);
    }
}
