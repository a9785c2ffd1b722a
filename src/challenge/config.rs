use serde::{Deserialize, Serialize};

/// Challenge-mode tunables. Round windows shrink by `round_step_ms` each round
/// down to `min_round_ms`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChallengeConfig {
    pub rounds: usize,
    pub countdown_secs: u32,
    pub base_round_ms: u64,
    pub round_step_ms: u64,
    pub min_round_ms: u64,
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            rounds: 5,
            countdown_secs: 3,
            base_round_ms: 5000,
            round_step_ms: 400,
            min_round_ms: 2000,
        }
    }
}

impl ChallengeConfig {
    /// Window length of round `round_index` (zero based).
    pub fn round_duration_ms(&self, round_index: usize) -> u64 {
        let shrink = self.round_step_ms.saturating_mul(round_index as u64);
        self.base_round_ms
            .saturating_sub(shrink)
            .max(self.min_round_ms)
    }
}
