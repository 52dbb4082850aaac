mod genius;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

pub use genius::{artist_name_matches, extract_lyrics_html, GeniusProvider};

/// Result type for lyrics operations
pub type LyricsResult<T> = Result<T, LyricsError>;

/// Errors that can occur while fetching lyrics
#[derive(Debug, thiserror::Error)]
pub enum LyricsError {
    #[error("Lyrics not found")]
    NotFound,

    #[error("Best match belongs to a different artist: {0}")]
    ArtistMismatch(String),

    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Response parsing failed: {0}")]
    ParseError(String),
}

/// Trait that all lyrics sources must implement
#[async_trait]
pub trait LyricsProvider: Send + Sync {
    /// Fetch cleaned lyrics (no annotations, no blank lines) for a song
    async fn fetch_lyrics(&self, song_query: &str, artist_query: &str) -> LyricsResult<String>;

    /// Get the name of this provider
    fn name(&self) -> &str;
}

/// Characters that show up when the provider returned a tracklist or some
/// other page instead of song lyrics
pub const MISMATCH_MARKERS: &[char] = &['•', ';'];

static ANNOTATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[.*?\]").unwrap());
static EMBED_TRAILER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\d*Embed").unwrap());
static PROMO_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)You might also like.*").unwrap());
static LYRICS_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i).*Lyrics").unwrap());

/// Strip provider boilerplate from raw lyrics.
///
/// Removes `[Chorus]`-style annotations, the `123Embed` trailer, "You might
/// also like" promos and the "<Song> Lyrics" header, then drops blank lines.
pub fn clean_lyrics(raw: &str) -> String {
    let text = ANNOTATION.replace_all(raw, "");
    let text = EMBED_TRAILER.replace_all(&text, "");
    let text = PROMO_LINE.replace_all(&text, "");
    let text = LYRICS_HEADER.replace_all(&text, "");
    remove_blank_lines(text.trim())
}

/// Drop lines that are empty or whitespace-only
pub fn remove_blank_lines(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Whether the lyrics look like a garbled or mismatched result
pub fn has_mismatch_markers(lyrics: &str) -> bool {
    lyrics.contains(MISMATCH_MARKERS)
}

/// Configuration for the lyrics provider
#[derive(Debug, Clone)]
pub struct LyricsConfig {
    /// Genius API access token
    pub genius_token: Option<String>,
    /// Timeout for a single HTTP request
    pub request_timeout: Duration,
}

impl Default for LyricsConfig {
    fn default() -> Self {
        Self {
            genius_token: None,
            request_timeout: Duration::from_secs(20),
        }
    }
}

impl LyricsConfig {
    /// Load configuration from environment variables
    /// GENIUS_TOKEN is preferred, TOKEN is accepted for older deployments
    pub fn from_env() -> Self {
        let genius_token = ["GENIUS_TOKEN", "TOKEN"].iter().find_map(|key| {
            std::env::var(key).ok().and_then(|token| {
                let trimmed = token.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
        });

        Self {
            genius_token,
            request_timeout: std::env::var("LYRICS_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(20)),
        }
    }

    /// Build the configured lyrics provider
    pub fn build_provider(&self) -> LyricsResult<GeniusProvider> {
        let token = self.genius_token.clone().ok_or_else(|| {
            LyricsError::ConfigError("No lyrics token configured. Set GENIUS_TOKEN".to_string())
        })?;
        GeniusProvider::new(token, self.request_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_clean_lyrics_removes_boilerplate() {
        let raw = "Hello Lyrics\n[Verse 1]\nHello, it's me\n\nI was wondering\nYou might also like Rolling in the Deep\n[Chorus]\nHello from the other side\n42Embed";
        let cleaned = clean_lyrics(raw);
        assert_eq!(
            cleaned,
            "Hello, it's me\nI was wondering\nHello from the other side"
        );
    }

    #[test]
    fn test_clean_lyrics_inline_annotation() {
        assert_eq!(clean_lyrics("line one [x2]\nline two"), "line one \nline two");
    }

    #[test]
    fn test_remove_blank_lines() {
        assert_eq!(remove_blank_lines("a\n\n  \nb\n"), "a\nb");
    }

    #[test]
    fn test_mismatch_markers() {
        assert!(has_mismatch_markers("1. Intro • 2. Outro"));
        assert!(has_mismatch_markers("Artist; Other Artist"));
        assert!(!has_mismatch_markers("Just a normal line\nAnd another"));
    }

    #[test]
    #[serial]
    fn test_lyrics_config_token_fallback() {
        std::env::remove_var("GENIUS_TOKEN");
        std::env::set_var("TOKEN", "legacy");
        assert_eq!(
            LyricsConfig::from_env().genius_token,
            Some("legacy".to_string())
        );

        std::env::set_var("GENIUS_TOKEN", "preferred");
        assert_eq!(
            LyricsConfig::from_env().genius_token,
            Some("preferred".to_string())
        );

        std::env::remove_var("GENIUS_TOKEN");
        std::env::remove_var("TOKEN");
        assert!(LyricsConfig::default().build_provider().is_err());
    }
}
