use serde::Serialize;

use crate::types::Participant;

/// Accumulated score of one participant
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LeaderboardEntry {
    pub participant: Participant,
    pub score: u32,
}

/// Cross-round scores for one session, keyed by display name.
///
/// Entries keep first-seen order so that ties in [`Leaderboard::standings`]
/// resolve to whoever scored first.
#[derive(Debug, Clone, Default)]
pub struct Leaderboard {
    entries: Vec<LeaderboardEntry>,
}

impl Leaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add points to a participant, creating the entry at 0 if needed.
    /// Returns the participant's new total.
    pub fn award(&mut self, participant: &str, points: u32) -> u32 {
        match self
            .entries
            .iter_mut()
            .find(|entry| entry.participant == participant)
        {
            Some(entry) => {
                entry.score += points;
                entry.score
            }
            None => {
                self.entries.push(LeaderboardEntry {
                    participant: participant.to_string(),
                    score: points,
                });
                points
            }
        }
    }

    pub fn score(&self, participant: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|entry| entry.participant == participant)
            .map(|entry| entry.score)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by score descending, ties in first-seen order
    pub fn standings(&self) -> Vec<LeaderboardEntry> {
        let mut standings = self.entries.clone();
        // sort_by is stable
        standings.sort_by(|a, b| b.score.cmp(&a.score));
        standings
    }

    /// Points table as shown in chat, one "rank. name: score" line per entry
    pub fn render(&self) -> String {
        if self.entries.is_empty() {
            return "No points yet.".to_string();
        }

        self.standings()
            .iter()
            .enumerate()
            .map(|(idx, entry)| format!("{}. {}: {}", idx + 1, entry.participant, entry.score))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
