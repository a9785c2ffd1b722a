use std::sync::Arc;

use log::{debug, info};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::challenge::{ChallengeConfig, ChallengeEngine};
use crate::events::EventBus;
use crate::leaderboard::LeaderboardService;
use crate::session::{SessionController, SessionTimings};
use crate::voting::VotingConfig;

use super::{KioskHandle, KioskInput, KioskMode, KioskStatus, ObservationTicket};

const DEFAULT_PLAYER: &str = "Player";

/// Everything needed to assemble a kiosk.
pub struct KioskParts {
    pub timings: SessionTimings,
    pub voting: VotingConfig,
    pub challenge: ChallengeConfig,
    pub leaderboard: Arc<dyn LeaderboardService>,
    /// Fixes the challenge target sequence.
    pub seed: Option<u64>,
}

/// The single task that owns both controllers and applies inputs one at a time.
pub struct Kiosk {
    session: SessionController,
    challenge: ChallengeEngine,
    inbox: mpsc::UnboundedReceiver<KioskInput>,
    tickets: watch::Sender<ObservationTicket>,
}

impl Kiosk {
    fn mode(&self) -> KioskMode {
        if self.challenge.is_running() {
            KioskMode::Challenge
        } else {
            KioskMode::Session
        }
    }

    fn current_ticket(&self) -> ObservationTicket {
        let mode = self.mode();
        let generation = match mode {
            KioskMode::Session => self.session.generation(),
            KioskMode::Challenge => self.challenge.generation(),
        };
        ObservationTicket { mode, generation }
    }

    fn publish_ticket(&self) {
        let ticket = self.current_ticket();
        self.tickets.send_if_modified(|current| {
            if *current == ticket {
                false
            } else {
                *current = ticket;
                true
            }
        });
    }

    fn status(&self) -> KioskStatus {
        let game = self
            .challenge
            .session()
            .filter(|_| self.challenge.is_running());
        KioskStatus {
            mode: self.mode(),
            session: self.session.snapshot(),
            challenge_round: game.map(|game| game.round_index),
            challenge_votes: game.map(|game| game.round_vote_count()),
        }
    }

    pub async fn run(mut self) {
        info!("kiosk ready");
        self.publish_ticket();

        while let Some(input) = self.inbox.recv().await {
            if !self.apply(input) {
                break;
            }
            self.publish_ticket();
        }

        self.challenge.exit();
        info!("kiosk stopped");
    }

    /// Applies one input. Returns `false` once the kiosk should stop.
    fn apply(&mut self, input: KioskInput) -> bool {
        let now = Instant::now();
        match input {
            KioskInput::Observation {
                ticket,
                observation,
                frame,
            } => {
                let current = self.current_ticket();
                if ticket != current {
                    debug!("discarding stale observation ({:?} vs {:?})", ticket, current);
                    return true;
                }
                match current.mode {
                    KioskMode::Session => self.session.handle_observation(&observation, frame, now),
                    KioskMode::Challenge => self.challenge.handle_observation(&observation, now),
                }
            }
            KioskInput::SessionTimer { kind, generation } => {
                self.session.handle_timer(kind, generation, now);
            }
            KioskInput::ChallengeTimer { kind, generation } => {
                self.challenge.handle_timer(kind, generation, now);
            }
            KioskInput::Reset => {
                info!("manual reset");
                self.challenge.exit();
                self.session.reset();
            }
            KioskInput::StartChallenge { player } => {
                let player = player.trim();
                let player = if player.is_empty() { DEFAULT_PLAYER } else { player };
                self.session.reset();
                self.challenge.start(player.to_string(), now);
            }
            KioskInput::ExitChallenge => self.challenge.exit(),
            KioskInput::Status { reply } => {
                let _ = reply.send(self.status());
            }
            KioskInput::Shutdown => return false,
        }
        true
    }
}

/// Builds the kiosk, spawns its task and returns the handle used to drive it.
pub fn spawn_kiosk(parts: KioskParts) -> (KioskHandle, JoinHandle<()>) {
    let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
    let events = EventBus::new();

    let session = SessionController::new(parts.timings, parts.voting, inbox_tx.clone(), events.clone());
    let mut challenge = ChallengeEngine::new(
        parts.challenge,
        inbox_tx.clone(),
        events.clone(),
        parts.leaderboard,
    );
    if let Some(seed) = parts.seed {
        challenge = challenge.with_seed(seed);
    }

    let (tickets_tx, tickets_rx) = watch::channel(ObservationTicket {
        mode: KioskMode::Session,
        generation: session.generation(),
    });

    let kiosk = Kiosk {
        session,
        challenge,
        inbox: inbox_rx,
        tickets: tickets_tx,
    };
    let task = tokio::spawn(kiosk.run());

    (KioskHandle::new(inbox_tx, tickets_rx, events), task)
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::Utc;
    use tokio::time::Duration;

    use super::*;
    use crate::models::{BoundingBox, Emotion, FrameObservation, LeaderboardEntry};
    use crate::session::SessionState;

    struct NoLeaderboard;

    impl LeaderboardService for NoLeaderboard {
        fn top_entries(&self) -> Result<Vec<LeaderboardEntry>> {
            Ok(Vec::new())
        }

        fn submit(&self, _entry: LeaderboardEntry) -> Result<Vec<LeaderboardEntry>> {
            Ok(Vec::new())
        }
    }

    fn kiosk() -> (KioskHandle, JoinHandle<()>) {
        spawn_kiosk(KioskParts {
            timings: SessionTimings::default(),
            voting: VotingConfig::default(),
            challenge: ChallengeConfig::default(),
            leaderboard: Arc::new(NoLeaderboard),
            seed: Some(1),
        })
    }

    fn face(in_zone: bool) -> FrameObservation {
        let x = if in_zone { 590.0 } else { 0.0 };
        FrameObservation {
            detected: true,
            emotion: Some(Emotion::Happy),
            confidence: 0.9,
            face_count: 1,
            bbox: Some(BoundingBox {
                x,
                y: 274.0,
                w: 100.0,
                h: 100.0,
            }),
            frame_width: 1280,
            frame_height: 720,
            timestamp: Utc::now(),
        }
    }

    fn observe(handle: &KioskHandle, ticket: ObservationTicket, in_zone: bool) {
        handle
            .inbox()
            .send(KioskInput::Observation {
                ticket,
                observation: face(in_zone),
                frame: None,
            })
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn stale_reply_cannot_undo_a_transition() {
        let (handle, _task) = kiosk();
        let idle_ticket = *handle.tickets().borrow();

        observe(&handle, idle_ticket, true);
        let status = handle.status().await.unwrap();
        assert_eq!(status.session.state, SessionState::Detecting);

        // Captured while Idle, answered after the transition: would send us back to Idle.
        observe(&handle, idle_ticket, false);
        let status = handle.status().await.unwrap();
        assert_eq!(status.session.state, SessionState::Detecting);
        assert_ne!(handle.tickets().borrow().generation, idle_ticket.generation);

        handle.shutdown().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn detecting_era_replies_do_not_vote_in_the_scan() {
        let (handle, _task) = kiosk();
        observe(&handle, *handle.tickets().borrow(), true);
        assert_eq!(handle.status().await.unwrap().session.state, SessionState::Detecting);
        let detecting_ticket = *handle.tickets().borrow();

        tokio::time::sleep(Duration::from_millis(900)).await;
        let status = handle.status().await.unwrap();
        assert_eq!(status.session.state, SessionState::Scanning);
        assert_eq!(status.session.vote_count, 0);

        for _ in 0..5 {
            observe(&handle, detecting_ticket, true);
        }
        let status = handle.status().await.unwrap();
        assert_eq!(status.session.state, SessionState::Scanning);
        assert_eq!(status.session.vote_count, 0);

        observe(&handle, *handle.tickets().borrow(), true);
        assert_eq!(handle.status().await.unwrap().session.vote_count, 1);

        handle.shutdown().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn previous_round_replies_do_not_vote_in_the_next_round() {
        let (handle, _task) = kiosk();
        handle.start_challenge("Ada").unwrap();
        let countdown_ticket = *handle.tickets().borrow();

        // Countdown 3s, then round 0 opens.
        tokio::time::sleep(Duration::from_millis(3500)).await;
        let status = handle.status().await.unwrap();
        assert_eq!(status.challenge_round, Some(0));
        assert_eq!(status.challenge_votes, Some(0));

        observe(&handle, countdown_ticket, true);
        assert_eq!(handle.status().await.unwrap().challenge_votes, Some(0));

        let round_zero_ticket = *handle.tickets().borrow();
        observe(&handle, round_zero_ticket, true);
        assert_eq!(handle.status().await.unwrap().challenge_votes, Some(1));

        // Round 0 closes at 8s, the next countdown runs to 11s.
        tokio::time::sleep(Duration::from_millis(8000)).await;
        let status = handle.status().await.unwrap();
        assert_eq!(status.challenge_round, Some(1));
        assert_eq!(status.challenge_votes, Some(0));

        for _ in 0..3 {
            observe(&handle, round_zero_ticket, true);
        }
        assert_eq!(handle.status().await.unwrap().challenge_votes, Some(0));

        observe(&handle, *handle.tickets().borrow(), true);
        assert_eq!(handle.status().await.unwrap().challenge_votes, Some(1));

        handle.shutdown().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn challenge_takes_over_and_reset_hands_back() {
        let (handle, task) = kiosk();
        let idle_ticket = *handle.tickets().borrow();
        observe(&handle, idle_ticket, true);

        handle.start_challenge("  ").unwrap();
        let status = handle.status().await.unwrap();
        assert_eq!(status.mode, KioskMode::Challenge);
        assert_eq!(status.session.state, SessionState::Idle);
        assert_eq!(status.challenge_round, Some(0));
        assert_eq!(handle.tickets().borrow().mode, KioskMode::Challenge);

        // Session-stamped frames are ignored while the game runs.
        observe(&handle, idle_ticket, true);
        assert_eq!(handle.status().await.unwrap().session.state, SessionState::Idle);

        handle.reset().unwrap();
        let status = handle.status().await.unwrap();
        assert_eq!(status.mode, KioskMode::Session);
        assert_eq!(status.challenge_round, None);

        handle.shutdown().unwrap();
        task.await.unwrap();
    }
}
