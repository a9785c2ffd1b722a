use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Emotion;

/// Outcome of one challenge round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoundResult {
    pub round_index: usize,
    pub target_emotion: Emotion,
    pub detected_emotion: Option<Emotion>,
    pub score: u32,
    pub stars: u8,
    pub avg_confidence: f64,
    pub elapsed_ms: u64,
    pub vote_count: usize,
}

/// End-of-game breakdown exposed once the last round closes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    pub game_id: Uuid,
    pub player: String,
    pub total_score: u32,
    pub rounds: usize,
    pub total_stars: u32,
    pub results: Vec<RoundResult>,
}

/// One leaderboard row, in the wire shape the leaderboard service uses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeaderboardEntry {
    pub name: String,
    pub score: u32,
    pub rounds: u32,
    #[serde(default)]
    pub date: Option<String>,
}

impl From<&GameSummary> for LeaderboardEntry {
    fn from(summary: &GameSummary) -> Self {
        Self {
            name: summary.player.clone(),
            score: summary.total_score,
            rounds: summary.rounds as u32,
            date: None,
        }
    }
}
