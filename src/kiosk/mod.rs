pub mod actor;
pub mod handle;

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::oneshot;

use crate::challenge::ChallengeTimer;
use crate::models::{CapturedFrame, FrameObservation};
use crate::session::{SessionSnapshot, SessionTimer};

pub use actor::{spawn_kiosk, Kiosk, KioskParts};
pub use handle::KioskHandle;

/// Which controller currently consumes observations.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum KioskMode {
    Session,
    Challenge,
}

/// Stamp attached to a frame when it is captured. The actor rejects observations
/// whose ticket no longer matches, which keeps a slow classifier reply from
/// landing in a state the kiosk has already left.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ObservationTicket {
    pub mode: KioskMode,
    pub generation: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KioskStatus {
    pub mode: KioskMode,
    pub session: SessionSnapshot,
    pub challenge_round: Option<usize>,
    /// Votes collected in the open challenge round window.
    pub challenge_votes: Option<usize>,
}

/// Messages processed, one at a time, by the kiosk actor.
#[derive(Debug)]
pub enum KioskInput {
    Observation {
        ticket: ObservationTicket,
        observation: FrameObservation,
        frame: Option<Arc<CapturedFrame>>,
    },
    SessionTimer {
        kind: SessionTimer,
        generation: u64,
    },
    ChallengeTimer {
        kind: ChallengeTimer,
        generation: u64,
    },
    Reset,
    StartChallenge {
        player: String,
    },
    ExitChallenge,
    Status {
        reply: oneshot::Sender<KioskStatus>,
    },
    Shutdown,
}
