use serde::{Deserialize, Serialize};

/// Tunables for the scan-window vote aggregation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VotingConfig {
    /// Number of most recent votes feeding the live preview label.
    pub smoothing_window: usize,

    /// Votes required at window close for the tally to produce a decision.
    pub min_votes: usize,

    /// Multiplier applied to every non-neutral emotion's vote count.
    pub non_neutral_weight: f64,
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            smoothing_window: 6,
            min_votes: 3,
            non_neutral_weight: 1.5,
        }
    }
}
