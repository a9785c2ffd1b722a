use serde::{Deserialize, Serialize};

use crate::models::{Emotion, Vote};
use crate::voting::config::VotingConfig;

/// The frozen outcome of a scan window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub emotion: Emotion,
    pub confidence: f64,
    pub vote_count: usize,
}

/// Votes grouped by emotion, preserving the order each emotion first appeared.
#[derive(Debug, Clone)]
pub struct VoteGroup {
    pub emotion: Emotion,
    pub count: usize,
    pub confidence_sum: f64,
}

impl VoteGroup {
    pub fn mean_confidence(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.confidence_sum / self.count as f64
        }
    }
}

pub fn group_votes(votes: &[Vote]) -> Vec<VoteGroup> {
    let mut groups: Vec<VoteGroup> = Vec::new();
    for vote in votes {
        match groups.iter_mut().find(|g| g.emotion == vote.emotion) {
            Some(group) => {
                group.count += 1;
                group.confidence_sum += vote.confidence;
            }
            None => groups.push(VoteGroup {
                emotion: vote.emotion,
                count: 1,
                confidence_sum: vote.confidence,
            }),
        }
    }
    groups
}

/// Biased majority vote over a closed window.
///
/// Each group scores its vote count, multiplied by `non_neutral_weight` for every
/// emotion except Neutral. Ties keep the emotion seen first. Returns `None` when
/// fewer than `min_votes` votes were collected.
pub fn final_tally(votes: &[Vote], config: &VotingConfig) -> Option<Decision> {
    if votes.is_empty() || votes.len() < config.min_votes {
        return None;
    }

    let mut winner: Option<(f64, VoteGroup)> = None;
    for group in group_votes(votes) {
        let weight = if group.emotion.is_neutral() {
            1.0
        } else {
            config.non_neutral_weight
        };
        let score = group.count as f64 * weight;
        let beats_current = winner.as_ref().map_or(true, |(best, _)| score > *best);
        if beats_current {
            winner = Some((score, group));
        }
    }

    winner.map(|(_, group)| Decision {
        emotion: group.emotion,
        confidence: group.mean_confidence(),
        vote_count: votes.len(),
    })
}
