use crate::broadcast::BroadcastPresenter;
use crate::catalog::CatalogProvider;
use crate::game::{run_session, GameContext, SessionReport};
use crate::lyrics::LyricsProvider;
use crate::protocol::ServerMessage;
use crate::types::{ChatMessage, GameConfig};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;

/// Buffered guesses per running game
const INBOX_CAPACITY: usize = 256;

/// Buffered outbound messages per room subscriber
const ROOM_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RoomError {
    #[error("A game is already running in this room")]
    GameRunning,
}

/// The chat room: outbound broadcast plus the inbox of the running game
#[derive(Clone)]
pub struct AppState {
    /// Messages for every connected client
    pub room: broadcast::Sender<ServerMessage>,
    active_game: Arc<RwLock<Option<mpsc::Sender<ChatMessage>>>>,
    last_report: Arc<RwLock<Option<SessionReport>>>,
    pub catalog: Arc<dyn CatalogProvider>,
    pub lyrics: Arc<dyn LyricsProvider>,
    pub config: GameConfig,
}

impl AppState {
    pub fn new(
        catalog: Arc<dyn CatalogProvider>,
        lyrics: Arc<dyn LyricsProvider>,
        config: GameConfig,
    ) -> Self {
        let (room, _rx) = broadcast::channel(ROOM_CAPACITY);
        Self {
            room,
            active_game: Arc::new(RwLock::new(None)),
            last_report: Arc::new(RwLock::new(None)),
            catalog,
            lyrics,
            config,
        }
    }

    pub async fn is_game_running(&self) -> bool {
        self.active_game
            .read()
            .await
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }

    pub async fn last_report(&self) -> Option<SessionReport> {
        self.last_report.read().await.clone()
    }

    /// Echo a chat line to the whole room
    pub fn broadcast_chat(&self, message: &ChatMessage) {
        // Ignore send errors (no receivers connected is fine)
        let _ = self.room.send(ServerMessage::chat(message));
    }

    /// Start a game session for `command_text` in the background.
    ///
    /// The returned handle resolves to the session report once the game is over.
    pub async fn start_game(
        &self,
        command_text: impl Into<String>,
    ) -> Result<JoinHandle<SessionReport>, RoomError> {
        let command_text = command_text.into();
        let mut slot = self.active_game.write().await;
        if slot.as_ref().is_some_and(|tx| !tx.is_closed()) {
            return Err(RoomError::GameRunning);
        }

        let (tx, mut rx) = mpsc::channel(INBOX_CAPACITY);
        *slot = Some(tx.clone());
        drop(slot);

        let ctx = GameContext::new(
            self.catalog.clone(),
            self.lyrics.clone(),
            Arc::new(BroadcastPresenter::new(self.room.clone())),
            self.config.clone(),
        );
        let state = self.clone();

        tracing::info!("Game command received: {:?}", command_text);
        Ok(tokio::spawn(async move {
            let report = run_session(&ctx, &command_text, &mut rx).await;

            {
                let mut slot = state.active_game.write().await;
                if slot.as_ref().is_some_and(|active| active.same_channel(&tx)) {
                    *slot = None;
                }
            }
            *state.last_report.write().await = Some(report.clone());
            report
        }))
    }

    /// Forward a chat line to the running game, if any.
    ///
    /// Returns whether a game received it.
    pub async fn route_message(&self, message: ChatMessage) -> bool {
        let inbox = self.active_game.read().await.clone();
        match inbox {
            Some(tx) => tx.send(message).await.is_ok(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogResult, PlaylistRef};
    use crate::lyrics::{LyricsError, LyricsResult};
    use crate::types::Track;
    use async_trait::async_trait;
    use std::time::Duration;

    struct OneTrack;

    #[async_trait]
    impl CatalogProvider for OneTrack {
        async fn resolve_playlist(&self, _playlist: &PlaylistRef) -> CatalogResult<Vec<Track>> {
            Ok(vec![Track::new("Hello", vec!["Adele".to_string()])])
        }

        fn name(&self) -> &str {
            "one-track"
        }
    }

    struct SlowLyrics;

    #[async_trait]
    impl LyricsProvider for SlowLyrics {
        async fn fetch_lyrics(&self, _song: &str, _artist: &str) -> LyricsResult<String> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Err(LyricsError::NotFound)
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    fn state() -> AppState {
        AppState::new(Arc::new(OneTrack), Arc::new(SlowLyrics), GameConfig::default())
    }

    #[tokio::test]
    async fn test_route_without_game() {
        let state = state();
        assert!(!state.is_game_running().await);
        assert!(!state.route_message(ChatMessage::new("alice", "adele")).await);
    }

    #[tokio::test]
    async fn test_only_one_game_at_a_time() {
        let state = state();

        let handle = state.start_game("pop").await.unwrap();
        assert!(state.is_game_running().await);
        assert_eq!(state.start_game("rock").await.unwrap_err(), RoomError::GameRunning);

        let report = handle.await.unwrap();
        assert!(report.resolved);
        assert_eq!(report.rounds_skipped, 1);

        assert!(!state.is_game_running().await);
        assert!(state.last_report().await.is_some());
        assert!(state.start_game("rock").await.is_ok());
    }
}
