use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Session identifier (ULID string)
pub type SessionId = String;

/// Display name of a chat participant.
///
/// Display names are not unique: two participants sharing a name share a
/// leaderboard entry.
pub type Participant = String;

/// A track as returned by the music catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    /// Title as listed in the catalog, possibly with "(Live)" or " - Remastered" noise
    pub title: String,
    /// Main artist first, then featured artists
    pub artists: Vec<String>,
}

impl Track {
    pub fn new(title: impl Into<String>, artists: Vec<String>) -> Self {
        Self {
            title: title.into(),
            artists,
        }
    }

    /// Main artist, if the catalog listed any
    pub fn main_artist(&self) -> Option<&str> {
        self.artists.first().map(String::as_str)
    }

    /// Featured artists (everyone after the main artist)
    pub fn featured_artists(&self) -> &[String] {
        self.artists.get(1..).unwrap_or(&[])
    }
}

/// A labeled field shown under an embed's description
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
}

/// Structured output rendered to the chat channel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Embed {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<EmbedField>,
}

impl Embed {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            field: None,
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.field = Some(EmbedField {
            name: name.into(),
            value: value.into(),
        });
        self
    }
}

/// An inbound chat line, as seen by a running game
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub author: Participant,
    pub content: String,
}

impl ChatMessage {
    pub fn new(author: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            content: content.into(),
        }
    }
}

/// Timing and sizing knobs for a game session
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Silence allowed between two guesses before the round times out
    pub guess_timeout: Duration,
    /// Number of consecutive lyric lines shown per round
    pub snippet_lines: usize,
    /// Upper bound for a single catalog or lyrics call
    pub fetch_timeout: Duration,
    /// Pause after the snippet is shown
    pub reveal_pause: Duration,
    /// Pause after the round outcome is shown
    pub round_pause: Duration,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            guess_timeout: Duration::from_secs(15),
            snippet_lines: 4,
            fetch_timeout: Duration::from_secs(30),
            reveal_pause: Duration::from_millis(1000),
            round_pause: Duration::from_millis(2000),
        }
    }
}

impl GameConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            guess_timeout: env_parse("GUESS_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.guess_timeout),
            snippet_lines: env_parse("SNIPPET_LINES")
                .filter(|&n: &usize| n > 0)
                .unwrap_or(defaults.snippet_lines),
            fetch_timeout: env_parse("FETCH_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.fetch_timeout),
            reveal_pause: env_parse("REVEAL_PAUSE_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.reveal_pause),
            round_pause: env_parse("ROUND_PAUSE_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.round_pause),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_track_artist_split() {
        let track = Track::new(
            "Work",
            vec!["Rihanna".to_string(), "Drake".to_string()],
        );
        assert_eq!(track.main_artist(), Some("Rihanna"));
        assert_eq!(track.featured_artists(), &["Drake".to_string()]);

        let solo = Track::new("Hello", vec!["Adele".to_string()]);
        assert!(solo.featured_artists().is_empty());

        let empty = Track::new("Untitled", vec![]);
        assert_eq!(empty.main_artist(), None);
        assert!(empty.featured_artists().is_empty());
    }

    #[test]
    fn test_embed_field_serialization() {
        let plain = serde_json::to_value(Embed::new("Round 1", "Soon")).unwrap();
        assert!(plain.get("field").is_none());

        let with_field =
            serde_json::to_value(Embed::new("Round over", "").with_field("Points table", "1. A: 2"))
                .unwrap();
        assert_eq!(with_field["field"]["name"], "Points table");
    }

    #[test]
    #[serial]
    fn test_game_config_from_env() {
        std::env::set_var("GUESS_TIMEOUT_SECS", "20");
        std::env::set_var("SNIPPET_LINES", "0");
        std::env::remove_var("FETCH_TIMEOUT_SECS");

        let config = GameConfig::from_env();
        assert_eq!(config.guess_timeout, Duration::from_secs(20));
        // Zero lines is rejected in favour of the default window
        assert_eq!(config.snippet_lines, 4);
        assert_eq!(config.fetch_timeout, Duration::from_secs(30));

        std::env::remove_var("GUESS_TIMEOUT_SECS");
        std::env::remove_var("SNIPPET_LINES");
    }
}
