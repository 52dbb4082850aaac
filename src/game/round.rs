//! Round engine
//!
//! A round moves `Setup -> Active -> {Won, TimedOut}`. While active it waits
//! for chat messages one at a time; any silence longer than the guess timeout
//! ends the round.

use rand::Rng;
use serde::Serialize;
use std::collections::HashSet;
use tokio::sync::mpsc;

use super::{GameContext, Leaderboard};
use crate::normalize::{clean_title, match_score, normalize_guess};
use crate::types::{ChatMessage, Embed, Track};

pub const MAIN_ARTIST_POINTS: u32 = 2;
pub const SONG_TITLE_POINTS: u32 = 2;
pub const FEATURED_ARTIST_POINTS: u32 = 1;

/// What a guess can score against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TargetKind {
    MainArtist,
    SongTitle,
    /// Index into the track's artist list (always >= 1)
    FeaturedArtist(usize),
}

impl TargetKind {
    pub fn points(self) -> u32 {
        match self {
            TargetKind::MainArtist => MAIN_ARTIST_POINTS,
            TargetKind::SongTitle => SONG_TITLE_POINTS,
            TargetKind::FeaturedArtist(_) => FEATURED_ARTIST_POINTS,
        }
    }

    fn label(self) -> &'static str {
        match self {
            TargetKind::MainArtist => "the main artist",
            TargetKind::SongTitle => "the song title",
            TargetKind::FeaturedArtist(_) => "a featured artist",
        }
    }
}

/// One answer of the round and whether someone already found it
#[derive(Debug, Clone)]
pub struct GuessTarget {
    pub kind: TargetKind,
    pub canonical: String,
    claimed: bool,
}

impl GuessTarget {
    fn new(kind: TargetKind, canonical: impl Into<String>) -> Self {
        Self {
            kind,
            canonical: canonical.into(),
            claimed: false,
        }
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed
    }

    fn open_score(&self, guess: &str) -> Option<f64> {
        if self.claimed {
            return None;
        }
        match_score(guess, &self.canonical)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundPhase {
    Setup,
    Active,
    Won,
    TimedOut,
}

/// Terminal result of a played round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    Won,
    TimedOut,
}

/// A guess that claimed a target
#[derive(Debug, Clone, PartialEq)]
pub struct Claim {
    pub target: TargetKind,
    pub canonical: String,
    pub points: u32,
}

impl Claim {
    fn headline(&self) -> String {
        if self.points == 1 {
            "Correct! +1 point.".to_string()
        } else {
            format!("Correct! +{} points.", self.points)
        }
    }
}

/// Per-round scoring state
#[derive(Debug, Clone)]
pub struct RoundState {
    track: Track,
    title: String,
    targets: Vec<GuessTarget>,
    points_awarded: u32,
    points_needed: u32,
    phase: RoundPhase,
    rejected: HashSet<String>,
}

impl RoundState {
    /// Derive the guess targets for a track: main artist, cleaned-up title and
    /// one target per featured artist, in that priority order.
    pub fn new(track: Track) -> Self {
        let title = clean_title(&track.title);

        let mut targets = vec![
            GuessTarget::new(
                TargetKind::MainArtist,
                track.main_artist().unwrap_or_default(),
            ),
            GuessTarget::new(TargetKind::SongTitle, title.clone()),
        ];
        targets.extend(
            track
                .featured_artists()
                .iter()
                .enumerate()
                .map(|(idx, artist)| GuessTarget::new(TargetKind::FeaturedArtist(idx + 1), artist.clone())),
        );

        let points_needed = targets.iter().map(|t| t.kind.points()).sum();

        Self {
            track,
            title,
            targets,
            points_awarded: 0,
            points_needed,
            phase: RoundPhase::Setup,
            rejected: HashSet::new(),
        }
    }

    /// Open the floor for guesses
    pub fn start(&mut self) {
        if self.phase == RoundPhase::Setup {
            self.phase = RoundPhase::Active;
        }
    }

    /// End an unfinished round because nobody guessed in time
    pub fn time_out(&mut self) {
        if self.phase == RoundPhase::Active {
            self.phase = RoundPhase::TimedOut;
        }
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    /// Title with parenthetical and " - " suffix noise removed
    /// (kept whole when it is nothing but decoration)
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn targets(&self) -> &[GuessTarget] {
        &self.targets
    }

    pub fn points_awarded(&self) -> u32 {
        self.points_awarded
    }

    pub fn points_needed(&self) -> u32 {
        self.points_needed
    }

    /// Full answer, e.g. "Drake, Rihanna - Take Care"
    pub fn answer(&self) -> String {
        format!("{} - {}", self.track.artists.join(", "), self.title)
    }

    /// Score a chat message against the open targets.
    ///
    /// Main artist is tried first, then the title, then the featured artists
    /// (best similarity wins when several match). Returns `None` and leaves
    /// the state untouched when nothing matches.
    pub fn evaluate(&mut self, message: &str) -> Option<Claim> {
        if self.phase != RoundPhase::Active {
            return None;
        }

        let guess = normalize_guess(message);
        if guess.is_empty() || self.rejected.contains(&guess) {
            return None;
        }

        let index = self.find_target(&guess);
        let Some(index) = index else {
            self.rejected.insert(guess);
            return None;
        };

        let target = &mut self.targets[index];
        target.claimed = true;
        let claim = Claim {
            target: target.kind,
            canonical: target.canonical.clone(),
            points: target.kind.points(),
        };

        self.points_awarded += claim.points;
        debug_assert!(self.points_awarded <= self.points_needed);
        if self.points_awarded == self.points_needed {
            self.phase = RoundPhase::Won;
        }

        Some(claim)
    }

    fn find_target(&self, guess: &str) -> Option<usize> {
        for kind in [TargetKind::MainArtist, TargetKind::SongTitle] {
            let index = self.targets.iter().position(|t| t.kind == kind)?;
            if self.targets[index].open_score(guess).is_some() {
                return Some(index);
            }
        }

        let mut best: Option<(usize, f64)> = None;
        for (index, target) in self.targets.iter().enumerate() {
            if !matches!(target.kind, TargetKind::FeaturedArtist(_)) {
                continue;
            }
            if let Some(score) = target.open_score(guess) {
                if best.map_or(true, |(_, best_score)| score > best_score) {
                    best = Some((index, score));
                }
            }
        }
        best.map(|(index, _)| index)
    }
}

/// Pick `window` consecutive lines starting at a uniformly random offset.
///
/// Lyrics shorter than the window are shown in full.
pub fn pick_snippet<R: Rng + ?Sized>(lyrics: &str, window: usize, rng: &mut R) -> String {
    let lines: Vec<&str> = lyrics.lines().collect();
    if lines.len() <= window {
        return lines.join("\n");
    }

    let start = rng.random_range(0..=lines.len() - window);
    lines[start..start + window].join("\n")
}

/// Play one round to completion and credit claims to `leaderboard`.
///
/// Messages already queued in `inbox` before the snippet is shown are
/// discarded; after that every message is processed in arrival order.
pub async fn play_round(
    ctx: &GameContext,
    inbox: &mut mpsc::Receiver<ChatMessage>,
    track: &Track,
    lyrics: &str,
    leaderboard: &mut Leaderboard,
) -> RoundOutcome {
    let mut round = RoundState::new(track.clone());
    let snippet = {
        let mut rng = rand::rng();
        pick_snippet(lyrics, ctx.config.snippet_lines, &mut rng)
    };

    while inbox.try_recv().is_ok() {}

    ctx.presenter
        .publish(
            Embed::new(
                "Guess the song and artist(s) from the following lyrics snippet",
                "Send a message in this channel to make a guess.",
            )
            .with_field("Lyrics snippet", snippet),
        )
        .await;
    tokio::time::sleep(ctx.config.reveal_pause).await;

    round.start();
    tracing::info!(
        "Round started: {} ({} points to win)",
        round.answer(),
        round.points_needed()
    );

    let outcome = loop {
        if round.phase() == RoundPhase::Won {
            break RoundOutcome::Won;
        }

        match tokio::time::timeout(ctx.config.guess_timeout, inbox.recv()).await {
            Ok(Some(message)) => {
                tracing::debug!("Guess from {}: {}", message.author, message.content);
                let Some(claim) = round.evaluate(&message.content) else {
                    continue;
                };

                let total = leaderboard.award(&message.author, claim.points);
                tracing::info!(
                    "{} claimed {:?} (+{}, total {}, round {}/{})",
                    message.author,
                    claim.target,
                    claim.points,
                    total,
                    round.points_awarded(),
                    round.points_needed()
                );

                ctx.presenter
                    .publish(Embed::new(
                        claim.headline(),
                        format!(
                            "{} found {}: {}",
                            message.author,
                            claim.target.label(),
                            claim.canonical
                        ),
                    ))
                    .await;
            }
            Ok(None) => {
                tracing::warn!("Chat inbox closed, ending round");
                round.time_out();
                break RoundOutcome::TimedOut;
            }
            Err(_) => {
                round.time_out();
                break RoundOutcome::TimedOut;
            }
        }
    };

    let description = match outcome {
        RoundOutcome::Won => format!(
            "Congratulations! You guessed all artists and the song name! The answer was: {}",
            round.answer()
        ),
        RoundOutcome::TimedOut => format!("Time's up! The correct answer was: {}", round.answer()),
    };
    tracing::info!("Round over ({:?}): {}", outcome, round.answer());

    ctx.presenter
        .publish(Embed::new("Round over", description).with_field("Points table", leaderboard.render()))
        .await;
    tokio::time::sleep(ctx.config.round_pause).await;

    outcome
}
