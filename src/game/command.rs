//! Parsing of the `!game` chat command

use once_cell::sync::Lazy;
use regex::Regex;

use crate::catalog::PlaylistRef;

/// Chat prefix that invokes the game
pub const COMMAND_PREFIX: &str = "!game";

/// Rounds played when the command does not say
pub const DEFAULT_ROUNDS: usize = 1;

/// Playlist text with this prefix is a direct link rather than a search
pub const URL_PREFIX: &str = "https://";

static COMMAND_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^(?P<playlist>.*?)(?:(?:^|\s+)num_rounds=(?P<rounds>\S*))?\s*$").unwrap()
});

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("No playlist url or name given")]
    EmptyPlaylist,

    #[error("num_rounds must be a positive integer, got '{0}'")]
    InvalidRoundCount(String),
}

/// A parsed game invocation
#[derive(Debug, Clone, PartialEq)]
pub struct GameCommand {
    pub playlist: PlaylistRef,
    pub rounds: usize,
}

impl GameCommand {
    /// Parse `<playlist-url-or-search-text> [num_rounds=<n>]`
    pub fn parse(text: &str) -> Result<Self, CommandError> {
        let text = text.trim();
        let captures = COMMAND_PATTERN
            .captures(text)
            .ok_or(CommandError::EmptyPlaylist)?;

        let playlist = captures
            .name("playlist")
            .map(|m| m.as_str().trim())
            .unwrap_or_default();
        if playlist.is_empty() {
            return Err(CommandError::EmptyPlaylist);
        }

        let rounds = match captures.name("rounds") {
            Some(m) => m
                .as_str()
                .parse::<usize>()
                .ok()
                .filter(|&n| n > 0)
                .ok_or_else(|| CommandError::InvalidRoundCount(m.as_str().to_string()))?,
            None => DEFAULT_ROUNDS,
        };

        let playlist = if playlist.starts_with(URL_PREFIX) {
            PlaylistRef::Url(playlist.to_string())
        } else {
            PlaylistRef::Search(playlist.to_lowercase())
        };

        Ok(Self { playlist, rounds })
    }
}

/// Return the command arguments if `text` invokes the game command
pub fn strip_command_prefix(text: &str) -> Option<&str> {
    let rest = text.trim_start().strip_prefix(COMMAND_PREFIX)?;
    match rest.chars().next() {
        None => Some(rest),
        Some(c) if c.is_whitespace() => Some(rest.trim_start()),
        Some(_) => None,
    }
}
