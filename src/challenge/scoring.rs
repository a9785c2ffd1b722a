use crate::models::{Emotion, Vote};
use crate::voting::group_votes;

/// Score of one closed challenge round before it is stamped into a `RoundResult`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundScore {
    pub score: u32,
    pub stars: u8,
    pub match_ratio: f64,
    pub avg_confidence: f64,
    pub speed_bonus: f64,
    pub detected: Option<Emotion>,
}

/// Scores a round: the share of votes matching the target, scaled by their mean
/// confidence and a speed bonus that never drops below 0.5.
///
/// Unlike the scan tally there is no minimum vote count and no neutral bias.
pub fn score_round(target: Emotion, votes: &[Vote], elapsed_ms: u64, window_ms: u64) -> RoundScore {
    let matching: Vec<&Vote> = votes.iter().filter(|v| v.emotion == target).collect();

    let match_ratio = if votes.is_empty() {
        0.0
    } else {
        matching.len() as f64 / votes.len() as f64
    };
    let avg_confidence = if matching.is_empty() {
        0.0
    } else {
        matching.iter().map(|v| v.confidence).sum::<f64>() / matching.len() as f64
    };
    let speed_bonus = speed_bonus(elapsed_ms, window_ms);

    let raw = (match_ratio * avg_confidence * 100.0 * speed_bonus).round();
    let score = raw.clamp(0.0, 100.0) as u32;

    RoundScore {
        score,
        stars: stars_for(score),
        match_ratio,
        avg_confidence,
        speed_bonus,
        detected: most_frequent(votes),
    }
}

pub fn speed_bonus(elapsed_ms: u64, window_ms: u64) -> f64 {
    if window_ms == 0 {
        return 0.5;
    }
    (1.0 - elapsed_ms as f64 / (window_ms as f64 * 2.0)).max(0.5)
}

pub fn stars_for(score: u32) -> u8 {
    match score {
        s if s >= 90 => 3,
        s if s >= 60 => 2,
        s if s >= 30 => 1,
        _ => 0,
    }
}

/// Most voted emotion in the round, whatever the target was. First seen wins ties.
pub fn most_frequent(votes: &[Vote]) -> Option<Emotion> {
    let mut best: Option<(Emotion, usize)> = None;
    for group in group_votes(votes) {
        if best.map_or(true, |(_, count)| group.count > count) {
            best = Some((group.emotion, group.count));
        }
    }
    best.map(|(emotion, _)| emotion)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worked_example_scores_42() {
        let votes = vec![
            Vote::new(Emotion::Sad, 0.8),
            Vote::new(Emotion::Sad, 0.6),
            Vote::new(Emotion::Happy, 0.9),
        ];
        let round = score_round(Emotion::Sad, &votes, 1000, 5000);
        assert!((round.match_ratio - 2.0 / 3.0).abs() < 1e-9);
        assert!((round.avg_confidence - 0.7).abs() < 1e-9);
        assert!((round.speed_bonus - 0.9).abs() < 1e-9);
        assert_eq!(round.score, 42);
        assert_eq!(round.stars, 1);
        assert_eq!(round.detected, Some(Emotion::Sad));
    }

    #[test]
    fn empty_round_scores_zero() {
        let round = score_round(Emotion::Happy, &[], 5000, 5000);
        assert_eq!(round.score, 0);
        assert_eq!(round.stars, 0);
        assert_eq!(round.detected, None);
    }

    #[test]
    fn detected_label_ignores_the_target() {
        let votes = vec![
            Vote::new(Emotion::Angry, 0.9),
            Vote::new(Emotion::Angry, 0.9),
            Vote::new(Emotion::Happy, 0.9),
        ];
        let round = score_round(Emotion::Happy, &votes, 0, 4000);
        assert_eq!(round.detected, Some(Emotion::Angry));
        // 1/3 × 0.9 × 100 × 1.0 = 30
        assert_eq!(round.score, 30);
        assert_eq!(round.stars, 1);
    }

    #[test]
    fn speed_bonus_floors_at_half() {
        assert!((speed_bonus(0, 5000) - 1.0).abs() < 1e-9);
        assert!((speed_bonus(5000, 5000) - 0.5).abs() < 1e-9);
        assert!((speed_bonus(20_000, 5000) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn star_thresholds() {
        assert_eq!(stars_for(100), 3);
        assert_eq!(stars_for(90), 3);
        assert_eq!(stars_for(89), 2);
        assert_eq!(stars_for(60), 2);
        assert_eq!(stars_for(59), 1);
        assert_eq!(stars_for(30), 1);
        assert_eq!(stars_for(29), 0);
    }

    #[test]
    fn perfect_instant_round_is_capped_at_100() {
        let votes = vec![Vote::new(Emotion::Surprised, 1.0); 4];
        let round = score_round(Emotion::Surprised, &votes, 0, 2000);
        assert_eq!(round.score, 100);
        assert_eq!(round.stars, 3);
    }
}
