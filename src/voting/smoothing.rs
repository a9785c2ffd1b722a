use std::collections::VecDeque;

use crate::models::{Emotion, Vote};

/// Bounded FIFO of the most recent votes, used only for the live preview label.
#[derive(Debug, Clone)]
pub struct SmoothingWindow {
    capacity: usize,
    votes: VecDeque<Vote>,
}

impl SmoothingWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            votes: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, vote: Vote) {
        if self.votes.len() == self.capacity {
            self.votes.pop_front();
        }
        self.votes.push_back(vote);
    }

    pub fn len(&self) -> usize {
        self.votes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    pub fn clear(&mut self) {
        self.votes.clear();
    }

    /// Emotion with the highest summed confidence across the window, with that sum
    /// averaged back over the emotion's votes. First-seen wins ties.
    pub fn label(&self) -> Option<(Emotion, f64)> {
        // (emotion, confidence sum, count), in first-seen order
        let mut sums: Vec<(Emotion, f64, usize)> = Vec::new();
        for vote in &self.votes {
            match sums.iter_mut().find(|(emotion, _, _)| *emotion == vote.emotion) {
                Some(entry) => {
                    entry.1 += vote.confidence;
                    entry.2 += 1;
                }
                None => sums.push((vote.emotion, vote.confidence, 1)),
            }
        }

        let mut best: Option<(Emotion, f64, usize)> = None;
        for entry in sums {
            if best.map_or(true, |(_, best_sum, _)| entry.1 > best_sum) {
                best = Some(entry);
            }
        }

        best.map(|(emotion, sum, count)| (emotion, sum / count as f64))
    }
}
