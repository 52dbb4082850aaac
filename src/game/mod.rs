//! Lyrics guessing game
//!
//! A session (one `!game` invocation) runs a number of rounds sequentially.
//! Each round shows a lyric snippet and scores chat guesses for the main
//! artist, the song title and every featured artist.

pub mod command;
pub mod leaderboard;
pub mod round;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use std::sync::Arc;

use crate::catalog::CatalogProvider;
use crate::lyrics::LyricsProvider;
use crate::types::{Embed, GameConfig};

pub use command::{CommandError, GameCommand};
pub use leaderboard::{Leaderboard, LeaderboardEntry};
pub use round::{play_round, Claim, GuessTarget, RoundOutcome, RoundPhase, RoundState, TargetKind};
pub use session::{run_session, SessionReport, SessionState};

/// Renders game output to the chat channel.
///
/// Publishing is fire-and-forget: implementations swallow delivery failures.
#[async_trait]
pub trait Presenter: Send + Sync {
    async fn publish(&self, embed: Embed);
}

/// Everything a session needs from the outside world
#[derive(Clone)]
pub struct GameContext {
    pub catalog: Arc<dyn CatalogProvider>,
    pub lyrics: Arc<dyn LyricsProvider>,
    pub presenter: Arc<dyn Presenter>,
    pub config: GameConfig,
}

impl GameContext {
    pub fn new(
        catalog: Arc<dyn CatalogProvider>,
        lyrics: Arc<dyn LyricsProvider>,
        presenter: Arc<dyn Presenter>,
        config: GameConfig,
    ) -> Self {
        Self {
            catalog,
            lyrics,
            presenter,
            config,
        }
    }

    /// Publish an embed without a field
    pub async fn announce(&self, title: impl Into<String>, description: impl Into<String>) {
        self.presenter.publish(Embed::new(title, description)).await;
    }
}
