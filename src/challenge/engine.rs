use std::sync::Arc;

use log::info;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{Duration, Instant};
use uuid::Uuid;

use crate::events::{EventBus, KioskEvent};
use crate::kiosk::KioskInput;
use crate::leaderboard::{self, LeaderboardService};
use crate::models::{Emotion, FrameObservation, GameSummary, LeaderboardEntry, RoundResult, Vote};
use crate::timer::TimerSlot;

use super::config::ChallengeConfig;
use super::scoring::score_round;

const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ChallengePhase {
    Countdown,
    Round,
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeTimer {
    CountdownTick,
    RoundEnd,
}

#[derive(Debug, Clone)]
struct ActiveRound {
    target: Emotion,
    started_at: Instant,
    deadline: Instant,
    duration_ms: u64,
    votes: Vec<Vote>,
    first_match_at: Option<Instant>,
}

/// One game in progress, or finished and awaiting the next start/exit.
#[derive(Debug, Clone)]
pub struct ChallengeSession {
    pub game_id: Uuid,
    pub player: String,
    pub round_index: usize,
    pub total_score: u32,
    pub results: Vec<RoundResult>,
    pub phase: ChallengePhase,
    pub seconds_left: u32,
    round: Option<ActiveRound>,
}

impl ChallengeSession {
    fn new(player: String) -> Self {
        Self {
            game_id: Uuid::new_v4(),
            player,
            round_index: 0,
            total_score: 0,
            results: Vec::new(),
            phase: ChallengePhase::Countdown,
            seconds_left: 0,
            round: None,
        }
    }

    pub fn active_round_deadline(&self) -> Option<Instant> {
        self.round.as_ref().map(|round| round.deadline)
    }

    pub fn current_target(&self) -> Option<Emotion> {
        self.round.as_ref().map(|round| round.target)
    }

    pub fn round_vote_count(&self) -> usize {
        self.round.as_ref().map(|round| round.votes.len()).unwrap_or(0)
    }

    pub fn summary(&self) -> GameSummary {
        GameSummary {
            game_id: self.game_id,
            player: self.player.clone(),
            total_score: self.total_score,
            rounds: self.results.len(),
            total_stars: self.results.iter().map(|r| r.stars as u32).sum(),
            results: self.results.clone(),
        }
    }
}

/// Timed multi-round game: countdown, round window, scoring, and a leaderboard
/// submission once the last round closes.
///
/// Like the session controller it owns a single timer and a generation counter;
/// phase changes bump the generation so late timers and late frames are dropped.
pub struct ChallengeEngine {
    game: Option<ChallengeSession>,
    generation: u64,
    config: ChallengeConfig,
    timer: TimerSlot<KioskInput>,
    events: EventBus,
    leaderboard: Arc<dyn LeaderboardService>,
    rng: StdRng,
}

impl ChallengeEngine {
    pub fn new(
        config: ChallengeConfig,
        inbox: UnboundedSender<KioskInput>,
        events: EventBus,
        leaderboard: Arc<dyn LeaderboardService>,
    ) -> Self {
        Self {
            game: None,
            generation: 0,
            config,
            timer: TimerSlot::new(inbox),
            events,
            leaderboard,
            rng: StdRng::from_entropy(),
        }
    }

    /// Fixes the target sequence, mostly for tests and demos.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn session(&self) -> Option<&ChallengeSession> {
        self.game.as_ref()
    }

    /// A game is counting down or inside a round window.
    pub fn is_running(&self) -> bool {
        matches!(
            self.game.as_ref().map(|game| game.phase),
            Some(ChallengePhase::Countdown | ChallengePhase::Round)
        )
    }

    pub fn start(&mut self, player: String, now: Instant) {
        if self.game.is_some() {
            self.exit();
        }
        let game = ChallengeSession::new(player);
        info!("challenge {} started for {}", game.game_id, game.player);
        self.game = Some(game);
        self.begin_countdown(now);
    }

    /// Tears the game down. Pending timers and the open round's votes are dropped.
    pub fn exit(&mut self) {
        self.timer.cancel();
        self.generation += 1;
        if let Some(game) = self.game.take() {
            info!("challenge {} exited at round {}", game.game_id, game.round_index);
            self.events.emit(KioskEvent::ChallengeExited {
                game_id: game.game_id,
            });
        }
    }

    pub fn handle_observation(&mut self, observation: &FrameObservation, now: Instant) {
        let Some(game) = self.game.as_mut() else {
            return;
        };
        let Some(round) = game.round.as_mut() else {
            return;
        };
        if game.phase != ChallengePhase::Round || now >= round.deadline {
            return;
        }
        let Some(vote) = observation.vote() else {
            return;
        };

        if vote.emotion == round.target && round.first_match_at.is_none() {
            round.first_match_at = Some(now);
        }
        round.votes.push(vote);

        let elapsed = now.saturating_duration_since(round.started_at).as_millis() as f64;
        let progress = (elapsed / round.duration_ms.max(1) as f64).clamp(0.0, 1.0);
        self.events.emit(KioskEvent::ChallengeRoundProgress {
            game_id: game.game_id,
            round_index: game.round_index,
            progress,
            vote_count: round.votes.len(),
        });
    }

    /// Applies a fired timer. Returns `false` when the timer was stale.
    pub fn handle_timer(&mut self, kind: ChallengeTimer, generation: u64, now: Instant) -> bool {
        let phase = self.game.as_ref().map(|game| game.phase);
        let expected = match kind {
            ChallengeTimer::CountdownTick => Some(ChallengePhase::Countdown),
            ChallengeTimer::RoundEnd => Some(ChallengePhase::Round),
        };
        if generation != self.generation || phase != expected {
            log::debug!(
                "discarding stale {:?} challenge timer (generation {} vs {})",
                kind,
                generation,
                self.generation
            );
            return false;
        }

        match kind {
            ChallengeTimer::CountdownTick => self.countdown_tick(now),
            ChallengeTimer::RoundEnd => self.finish_round(now),
        }
        true
    }

    fn begin_countdown(&mut self, now: Instant) {
        let seconds = self.config.countdown_secs;
        let Some(game) = self.game.as_mut() else {
            return;
        };
        game.phase = ChallengePhase::Countdown;
        game.seconds_left = seconds;
        game.round = None;
        let (game_id, round_index) = (game.game_id, game.round_index);

        self.enter_phase(game_id, round_index, ChallengePhase::Countdown);
        if seconds == 0 {
            self.begin_round(now);
            return;
        }
        self.events.emit(KioskEvent::ChallengeCountdown {
            game_id,
            round_index,
            seconds_left: seconds,
        });
        self.schedule(ChallengeTimer::CountdownTick, COUNTDOWN_TICK);
    }

    fn countdown_tick(&mut self, now: Instant) {
        let Some(game) = self.game.as_mut() else {
            return;
        };
        game.seconds_left = game.seconds_left.saturating_sub(1);
        if game.seconds_left == 0 {
            self.begin_round(now);
            return;
        }
        self.events.emit(KioskEvent::ChallengeCountdown {
            game_id: game.game_id,
            round_index: game.round_index,
            seconds_left: game.seconds_left,
        });
        self.schedule(ChallengeTimer::CountdownTick, COUNTDOWN_TICK);
    }

    fn begin_round(&mut self, now: Instant) {
        let target = Emotion::ALL[self.rng.gen_range(0..Emotion::ALL.len())];
        let Some(game) = self.game.as_mut() else {
            return;
        };
        let duration_ms = self.config.round_duration_ms(game.round_index);
        let duration = Duration::from_millis(duration_ms);
        game.phase = ChallengePhase::Round;
        game.round = Some(ActiveRound {
            target,
            started_at: now,
            deadline: now + duration,
            duration_ms,
            votes: Vec::new(),
            first_match_at: None,
        });
        let (game_id, round_index) = (game.game_id, game.round_index);

        info!("challenge round {} targets {} for {}ms", round_index + 1, target, duration_ms);
        self.enter_phase(game_id, round_index, ChallengePhase::Round);
        self.events.emit(KioskEvent::ChallengeRoundStarted {
            game_id,
            round_index,
            target,
            duration_ms,
        });
        self.schedule(ChallengeTimer::RoundEnd, duration);
    }

    fn finish_round(&mut self, now: Instant) {
        let rounds = self.config.rounds;
        let Some(game) = self.game.as_mut() else {
            return;
        };
        let Some(round) = game.round.take() else {
            return;
        };

        // Reaction time: until the first vote that hit the target, else the whole window.
        let elapsed_ms = round
            .first_match_at
            .map(|at| at.saturating_duration_since(round.started_at).as_millis() as u64)
            .unwrap_or_else(|| {
                now.saturating_duration_since(round.started_at)
                    .as_millis()
                    .max(round.duration_ms as u128) as u64
            });
        let scored = score_round(round.target, &round.votes, elapsed_ms, round.duration_ms);
        let result = RoundResult {
            round_index: game.round_index,
            target_emotion: round.target,
            detected_emotion: scored.detected,
            score: scored.score,
            stars: scored.stars,
            avg_confidence: scored.avg_confidence,
            elapsed_ms,
            vote_count: round.votes.len(),
        };
        game.total_score += result.score;
        game.results.push(result.clone());

        info!(
            "challenge round {} scored {} ({} stars), total {}",
            result.round_index + 1,
            result.score,
            result.stars,
            game.total_score
        );
        self.events.emit(KioskEvent::ChallengeRoundFinished {
            game_id: game.game_id,
            result,
            total_score: game.total_score,
        });

        if game.results.len() < rounds {
            game.round_index += 1;
            self.begin_countdown(now);
        } else {
            self.game_over();
        }
    }

    fn game_over(&mut self) {
        let Some(game) = self.game.as_mut() else {
            return;
        };
        game.phase = ChallengePhase::GameOver;
        let summary = game.summary();
        let round_index = game.round_index;

        self.timer.cancel();
        self.enter_phase(summary.game_id, round_index, ChallengePhase::GameOver);
        info!(
            "challenge {} over: {} points in {} rounds",
            summary.game_id, summary.total_score, summary.rounds
        );

        let entry = LeaderboardEntry::from(&summary);
        self.events.emit(KioskEvent::ChallengeGameOver { summary });
        leaderboard::submit_in_background(self.leaderboard.clone(), entry, self.events.clone());
    }

    fn enter_phase(&mut self, game_id: Uuid, round_index: usize, phase: ChallengePhase) {
        self.timer.cancel();
        self.generation += 1;
        self.events.emit(KioskEvent::ChallengePhaseChanged {
            game_id,
            round_index,
            phase,
        });
    }

    fn schedule(&mut self, kind: ChallengeTimer, after: Duration) {
        self.timer.schedule(
            after,
            KioskInput::ChallengeTimer {
                kind,
                generation: self.generation,
            },
        );
    }
}
