use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::challenge::ChallengePhase;
use crate::models::{CapturedFrame, Emotion, GameSummary, LeaderboardEntry, RoundResult};
use crate::session::SessionState;
use crate::voting::Decision;

const EVENT_CAPACITY: usize = 256;

/// Why a scan window closed without a decision.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DiscardReason {
    FaceLost,
    InsufficientVotes,
    ManualReset,
}

/// Everything presentation, audio and leaderboard collaborators can react to.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum KioskEvent {
    #[serde(rename_all = "camelCase")]
    SessionStateChanged {
        session_id: Option<Uuid>,
        state: SessionState,
        generation: u64,
        /// How long the new state lasts before its timer fires, if it has one.
        duration_ms: Option<u64>,
        /// Frozen tally, present when entering `Result`.
        decision: Option<Decision>,
        /// Last in-zone frame of the scan, present when entering `Result`.
        #[serde(skip)]
        snapshot: Option<Arc<CapturedFrame>>,
    },
    #[serde(rename_all = "camelCase")]
    LivePreview {
        session_id: Option<Uuid>,
        emotion: Option<Emotion>,
        confidence: f64,
        progress: f64,
        vote_count: usize,
    },
    #[serde(rename_all = "camelCase")]
    ScanDiscarded {
        session_id: Option<Uuid>,
        reason: DiscardReason,
        vote_count: usize,
    },
    #[serde(rename_all = "camelCase")]
    ChallengePhaseChanged {
        game_id: Uuid,
        round_index: usize,
        phase: ChallengePhase,
    },
    #[serde(rename_all = "camelCase")]
    ChallengeCountdown {
        game_id: Uuid,
        round_index: usize,
        seconds_left: u32,
    },
    #[serde(rename_all = "camelCase")]
    ChallengeRoundStarted {
        game_id: Uuid,
        round_index: usize,
        target: Emotion,
        duration_ms: u64,
    },
    #[serde(rename_all = "camelCase")]
    ChallengeRoundProgress {
        game_id: Uuid,
        round_index: usize,
        progress: f64,
        vote_count: usize,
    },
    #[serde(rename_all = "camelCase")]
    ChallengeRoundFinished {
        game_id: Uuid,
        result: RoundResult,
        total_score: u32,
    },
    #[serde(rename_all = "camelCase")]
    ChallengeGameOver { summary: GameSummary },
    #[serde(rename_all = "camelCase")]
    ChallengeExited { game_id: Uuid },
    #[serde(rename_all = "camelCase")]
    LeaderboardUpdated { entries: Vec<LeaderboardEntry> },
}

/// Broadcast fan-out for [`KioskEvent`]s. Emitting never fails; events sent with
/// no subscriber attached are dropped.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<KioskEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub fn emit(&self, event: KioskEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<KioskEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
