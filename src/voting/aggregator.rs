use crate::models::{Emotion, Vote};

use super::config::VotingConfig;
use super::smoothing::SmoothingWindow;
use super::tally::{final_tally, Decision};

/// Votes collected for the currently open scan window.
#[derive(Debug, Clone)]
pub struct VotingAggregator {
    config: VotingConfig,
    votes: Vec<Vote>,
    smoothing: SmoothingWindow,
}

impl VotingAggregator {
    pub fn new(config: VotingConfig) -> Self {
        let smoothing = SmoothingWindow::new(config.smoothing_window);
        Self {
            config,
            votes: Vec::new(),
            smoothing,
        }
    }

    /// Adds a vote and returns the refreshed live label.
    pub fn record(&mut self, vote: Vote) -> Option<(Emotion, f64)> {
        self.votes.push(vote);
        self.smoothing.push(vote);
        self.smoothing.label()
    }

    pub fn live_label(&self) -> Option<(Emotion, f64)> {
        self.smoothing.label()
    }

    pub fn vote_count(&self) -> usize {
        self.votes.len()
    }

    pub fn votes(&self) -> &[Vote] {
        &self.votes
    }

    /// Closes the window: tallies and clears every vote it held.
    pub fn finalize(&mut self) -> Option<Decision> {
        let decision = final_tally(&self.votes, &self.config);
        self.clear();
        decision
    }

    pub fn clear(&mut self) {
        self.votes.clear();
        self.smoothing.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_label_tracks_recent_votes_only() {
        let mut aggregator = VotingAggregator::new(VotingConfig::default());
        for _ in 0..5 {
            aggregator.record(Vote::new(Emotion::Neutral, 0.9));
        }
        for _ in 0..6 {
            aggregator.record(Vote::new(Emotion::Happy, 0.5));
        }
        assert_eq!(aggregator.live_label().map(|(e, _)| e), Some(Emotion::Happy));
        assert_eq!(aggregator.vote_count(), 11);
    }

    #[test]
    fn finalize_empties_the_window() {
        let mut aggregator = VotingAggregator::new(VotingConfig::default());
        aggregator.record(Vote::new(Emotion::Sad, 0.8));
        aggregator.record(Vote::new(Emotion::Sad, 0.6));
        aggregator.record(Vote::new(Emotion::Happy, 0.9));

        let decision = aggregator.finalize().unwrap();
        assert_eq!(decision.emotion, Emotion::Sad);
        assert_eq!(aggregator.vote_count(), 0);
        assert!(aggregator.live_label().is_none());
    }
}
