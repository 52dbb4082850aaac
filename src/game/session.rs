//! Session aggregator
//!
//! Runs the rounds of one `!game` invocation back to back, never repeating a
//! track, and keeps the leaderboard for the whole session.

use futures::FutureExt;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use tokio::sync::mpsc;

use super::round::{play_round, RoundOutcome};
use super::{GameCommand, GameContext, Leaderboard};
use crate::lyrics::{has_mismatch_markers, remove_blank_lines};
use crate::normalize::clean_title;
use crate::types::{ChatMessage, Embed, SessionId, Track};

/// Track pool and progress of one session
#[derive(Debug)]
pub struct SessionState {
    pool: Vec<Track>,
    /// Unplayed pool indices in random order, drawn from the back
    remaining: Vec<usize>,
    chosen: HashSet<usize>,
    pub leaderboard: Leaderboard,
    rounds_requested: usize,
    rounds_played: usize,
    rounds_skipped: usize,
}

impl SessionState {
    pub fn new<R: Rng + ?Sized>(pool: Vec<Track>, rounds_requested: usize, rng: &mut R) -> Self {
        let mut remaining: Vec<usize> = (0..pool.len()).collect();
        remaining.shuffle(rng);

        Self {
            pool,
            remaining,
            chosen: HashSet::new(),
            leaderboard: Leaderboard::new(),
            rounds_requested,
            rounds_played: 0,
            rounds_skipped: 0,
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    pub fn rounds_requested(&self) -> usize {
        self.rounds_requested
    }

    /// Rounds that will actually run: never more than there are tracks
    pub fn rounds_planned(&self) -> usize {
        self.rounds_requested.min(self.pool.len())
    }

    pub fn was_clamped(&self) -> bool {
        self.rounds_requested > self.pool.len()
    }

    /// Draw an unplayed track. `None` once every track has been used.
    pub fn draw_track(&mut self) -> Option<(usize, Track)> {
        let index = self.remaining.pop()?;
        let fresh = self.chosen.insert(index);
        debug_assert!(fresh, "track {} drawn twice", index);
        Some((index, self.pool[index].clone()))
    }

    #[cfg(test)]
    fn chosen(&self) -> &HashSet<usize> {
        &self.chosen
    }

    pub fn record_played(&mut self) {
        self.rounds_played += 1;
    }

    pub fn record_skipped(&mut self) {
        self.rounds_skipped += 1;
    }

    pub fn rounds_completed(&self) -> usize {
        self.rounds_played + self.rounds_skipped
    }
}

/// Summary of a finished session
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub session_id: SessionId,
    /// False when the command or playlist could not be resolved
    pub resolved: bool,
    pub rounds_planned: usize,
    pub rounds_played: usize,
    pub rounds_skipped: usize,
    pub won_rounds: usize,
    pub leaderboard: Leaderboard,
}

impl SessionReport {
    fn unresolved(session_id: SessionId) -> Self {
        Self {
            session_id,
            resolved: false,
            rounds_planned: 0,
            rounds_played: 0,
            rounds_skipped: 0,
            won_rounds: 0,
            leaderboard: Leaderboard::new(),
        }
    }
}

/// Why a round was skipped before it started
#[derive(Debug)]
enum RoundSkip {
    /// Lyrics could not be fetched
    Unavailable(String),
    /// Lyrics were fetched but look like the wrong page
    Garbled,
}

impl RoundSkip {
    fn reason(&self) -> &str {
        match self {
            RoundSkip::Unavailable(reason) => reason,
            RoundSkip::Garbled => "lyrics contain mismatch markers",
        }
    }

    fn embed(&self, song_query: &str) -> Embed {
        let title = match self {
            RoundSkip::Unavailable(_) => format!("Couldn't fetch the lyrics for {}", song_query),
            RoundSkip::Garbled => format!("The lyrics for {} were wrong", song_query),
        };
        Embed::new(title, "Let's skip this song!")
    }
}

async fn announce_resolution_failure(ctx: &GameContext) {
    ctx.announce(
        "Something went wrong",
        "Check the playlist url or the name you have provided.",
    )
    .await;
}

async fn fetch_round_lyrics(
    ctx: &GameContext,
    song_query: &str,
    main_artist: &str,
) -> Result<String, RoundSkip> {
    let fetched = tokio::time::timeout(
        ctx.config.fetch_timeout,
        ctx.lyrics.fetch_lyrics(song_query, main_artist),
    )
    .await;

    let lyrics = match fetched {
        Ok(Ok(lyrics)) => remove_blank_lines(&lyrics),
        Ok(Err(e)) => return Err(RoundSkip::Unavailable(e.to_string())),
        Err(_) => {
            return Err(RoundSkip::Unavailable(format!(
                "{} timed out after {:?}",
                ctx.lyrics.name(),
                ctx.config.fetch_timeout
            )))
        }
    };

    if lyrics.is_empty() {
        return Err(RoundSkip::Unavailable("empty lyrics".to_string()));
    }
    if has_mismatch_markers(&lyrics) {
        return Err(RoundSkip::Garbled);
    }
    Ok(lyrics)
}

/// Run a whole game for the command arguments in `command_text`.
///
/// Guesses are read from `inbox` in arrival order. Recoverable problems skip
/// a round; only an unresolvable command or playlist ends the session early.
pub async fn run_session(
    ctx: &GameContext,
    command_text: &str,
    inbox: &mut mpsc::Receiver<ChatMessage>,
) -> SessionReport {
    let session_id = ulid::Ulid::new().to_string();
    tracing::info!("Session {} started with command: {:?}", session_id, command_text);

    let command = match GameCommand::parse(command_text) {
        Ok(command) => command,
        Err(e) => {
            tracing::warn!("Session {}: invalid command: {}", session_id, e);
            announce_resolution_failure(ctx).await;
            return SessionReport::unresolved(session_id);
        }
    };

    let resolved = tokio::time::timeout(
        ctx.config.fetch_timeout,
        ctx.catalog.resolve_playlist(&command.playlist),
    )
    .await;
    let pool = match resolved {
        Ok(Ok(tracks)) if !tracks.is_empty() => tracks,
        Ok(Ok(_)) => {
            tracing::warn!("Session {}: playlist {:?} has no tracks", session_id, command.playlist);
            announce_resolution_failure(ctx).await;
            return SessionReport::unresolved(session_id);
        }
        Ok(Err(e)) => {
            tracing::warn!(
                "Session {}: {} failed to resolve {:?}: {}",
                session_id,
                ctx.catalog.name(),
                command.playlist,
                e
            );
            announce_resolution_failure(ctx).await;
            return SessionReport::unresolved(session_id);
        }
        Err(_) => {
            tracing::warn!(
                "Session {}: playlist lookup timed out after {:?}",
                session_id,
                ctx.config.fetch_timeout
            );
            announce_resolution_failure(ctx).await;
            return SessionReport::unresolved(session_id);
        }
    };

    let mut session = {
        let mut rng = rand::rng();
        SessionState::new(pool, command.rounds, &mut rng)
    };

    if session.was_clamped() {
        ctx.announce(
            format!(
                "Cannot play {} rounds with only {} songs.",
                session.rounds_requested(),
                session.pool_size()
            ),
            "Reducing rounds to match song count.",
        )
        .await;
    }

    let mut won_rounds = 0;
    for round_no in 1..=session.rounds_planned() {
        ctx.announce(format!("Round {}", round_no), "The round will start shortly.")
            .await;

        let Some((index, track)) = session.draw_track() else {
            break;
        };

        let title = clean_title(&track.title);
        let main_artist = track.main_artist().unwrap_or_default().to_string();
        let song_query = format!("{} {}", main_artist, title).trim().to_string();
        tracing::info!(
            "Session {} round {}: track #{} {:?}",
            session_id,
            round_no,
            index,
            song_query
        );

        let lyrics = if main_artist.is_empty() {
            Err(RoundSkip::Unavailable("track has no artist".to_string()))
        } else {
            fetch_round_lyrics(ctx, &song_query, &main_artist).await
        };

        let lyrics = match lyrics {
            Ok(lyrics) => lyrics,
            Err(skip) => {
                tracing::warn!(
                    "Session {} round {} skipped ({}): {}",
                    session_id,
                    round_no,
                    song_query,
                    skip.reason()
                );
                ctx.presenter.publish(skip.embed(&song_query)).await;
                session.record_skipped();
                continue;
            }
        };

        let played = AssertUnwindSafe(play_round(
            ctx,
            inbox,
            &track,
            &lyrics,
            &mut session.leaderboard,
        ))
        .catch_unwind()
        .await;

        match played {
            Ok(outcome) => {
                if outcome == RoundOutcome::Won {
                    won_rounds += 1;
                }
                session.record_played();
            }
            Err(_) => {
                tracing::error!(
                    "Session {} round {} failed unexpectedly, skipping",
                    session_id,
                    round_no
                );
                ctx.presenter
                    .publish(RoundSkip::Unavailable("round failed".to_string()).embed(&song_query))
                    .await;
                session.record_skipped();
            }
        }
    }

    ctx.presenter
        .publish(
            Embed::new("Game over! Thanks for playing.", "")
                .with_field("Final standings", session.leaderboard.render()),
        )
        .await;

    tracing::info!(
        "Session {} finished: {}/{} rounds ({} played, {} skipped, {} won)",
        session_id,
        session.rounds_completed(),
        session.rounds_planned(),
        session.rounds_played,
        session.rounds_skipped,
        won_rounds
    );

    SessionReport {
        session_id,
        resolved: true,
        rounds_planned: session.rounds_planned(),
        rounds_played: session.rounds_played,
        rounds_skipped: session.rounds_skipped,
        won_rounds,
        leaderboard: session.leaderboard,
    }
}
