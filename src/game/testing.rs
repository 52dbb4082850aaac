//! In-memory providers and a scripted chat for game tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use super::{GameContext, Presenter};
use crate::catalog::{CatalogError, CatalogProvider, CatalogResult, PlaylistRef};
use crate::lyrics::{LyricsError, LyricsProvider, LyricsResult};
use crate::types::{ChatMessage, Embed, GameConfig, Track};

pub struct FakeCatalog {
    tracks: Vec<Track>,
}

impl FakeCatalog {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }
}

#[async_trait]
impl CatalogProvider for FakeCatalog {
    async fn resolve_playlist(&self, playlist: &PlaylistRef) -> CatalogResult<Vec<Track>> {
        match playlist {
            PlaylistRef::Search(q) if q == "missing" => Err(CatalogError::NotFound),
            _ => Ok(self.tracks.clone()),
        }
    }

    fn name(&self) -> &str {
        "fake-catalog"
    }
}

/// Lyrics keyed by song query; unknown songs are `NotFound`
#[derive(Default)]
pub struct FakeLyrics {
    songs: HashMap<String, String>,
}

impl FakeLyrics {
    pub fn with(mut self, song_query: &str, lyrics: &str) -> Self {
        self.songs.insert(song_query.to_string(), lyrics.to_string());
        self
    }
}

#[async_trait]
impl LyricsProvider for FakeLyrics {
    async fn fetch_lyrics(&self, song_query: &str, _artist_query: &str) -> LyricsResult<String> {
        self.songs
            .get(song_query)
            .cloned()
            .ok_or(LyricsError::NotFound)
    }

    fn name(&self) -> &str {
        "fake-lyrics"
    }
}

/// Records every embed and plays one batch of chat lines into the game
/// each time a snippet is shown.
pub struct ScriptedPresenter {
    published: Mutex<Vec<Embed>>,
    batches: Mutex<Vec<Vec<(String, String)>>>,
    tx: mpsc::Sender<ChatMessage>,
}

impl ScriptedPresenter {
    pub fn new(tx: mpsc::Sender<ChatMessage>, batches: Vec<Vec<(&str, &str)>>) -> Self {
        let mut batches: Vec<Vec<(String, String)>> = batches
            .into_iter()
            .map(|batch| {
                batch
                    .into_iter()
                    .map(|(author, text)| (author.to_string(), text.to_string()))
                    .collect()
            })
            .collect();
        batches.reverse();

        Self {
            published: Mutex::new(Vec::new()),
            batches: Mutex::new(batches),
            tx,
        }
    }

    pub fn published(&self) -> Vec<Embed> {
        self.published.lock().unwrap().clone()
    }

    pub fn titles(&self) -> Vec<String> {
        self.published().into_iter().map(|e| e.title).collect()
    }
}

#[async_trait]
impl Presenter for ScriptedPresenter {
    async fn publish(&self, embed: Embed) {
        let snippet_shown = embed.title.starts_with("Guess the song");
        self.published.lock().unwrap().push(embed);

        if snippet_shown {
            let batch = self.batches.lock().unwrap().pop().unwrap_or_default();
            for (author, text) in batch {
                self.tx.try_send(ChatMessage::new(author, text)).unwrap();
            }
        }
    }
}

pub fn fast_config() -> GameConfig {
    GameConfig {
        guess_timeout: Duration::from_millis(100),
        snippet_lines: 4,
        fetch_timeout: Duration::from_secs(1),
        reveal_pause: Duration::ZERO,
        round_pause: Duration::ZERO,
    }
}

pub fn test_context(presenter: Arc<ScriptedPresenter>) -> GameContext {
    test_context_with(
        Arc::new(FakeCatalog::new(Vec::new())),
        Arc::new(FakeLyrics::default()),
        presenter,
    )
}

pub fn test_context_with(
    catalog: Arc<dyn CatalogProvider>,
    lyrics: Arc<dyn LyricsProvider>,
    presenter: Arc<ScriptedPresenter>,
) -> GameContext {
    GameContext::new(catalog, lyrics, presenter, fast_config())
}
