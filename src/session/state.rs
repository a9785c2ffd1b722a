use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::time::{Duration, Instant};
use uuid::Uuid;

use crate::models::CapturedFrame;
use crate::voting::Decision;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    Idle,
    Detecting,
    Scanning,
    Result,
    Reset,
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Idle
    }
}

/// Timers the session controller schedules, one per timed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTimer {
    DetectDelay,
    ScanEnd,
    ResultEnd,
    ResetEnd,
}

impl SessionTimer {
    /// The state this timer was scheduled for.
    pub fn owner(&self) -> SessionState {
        match self {
            SessionTimer::DetectDelay => SessionState::Detecting,
            SessionTimer::ScanEnd => SessionState::Scanning,
            SessionTimer::ResultEnd => SessionState::Result,
            SessionTimer::ResetEnd => SessionState::Reset,
        }
    }
}

/// Fixed durations of the session flow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionTimings {
    /// Time a face must stay in zone before scanning starts.
    pub detect_delay_ms: u64,
    pub scan_duration_ms: u64,
    pub result_duration_ms: u64,
    pub reset_duration_ms: u64,
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            detect_delay_ms: 800,
            scan_duration_ms: 3000,
            result_duration_ms: 12000,
            reset_duration_ms: 3000,
        }
    }
}

impl SessionTimings {
    pub fn detect_delay(&self) -> Duration {
        Duration::from_millis(self.detect_delay_ms)
    }

    pub fn scan_duration(&self) -> Duration {
        Duration::from_millis(self.scan_duration_ms)
    }

    pub fn result_duration(&self) -> Duration {
        Duration::from_millis(self.result_duration_ms)
    }

    pub fn reset_duration(&self) -> Duration {
        Duration::from_millis(self.reset_duration_ms)
    }
}

/// Per-session data. Everything here is wiped on entering Idle.
#[derive(Debug, Clone, Default)]
pub struct SessionData {
    pub session_id: Option<Uuid>,
    pub detect_started_at: Option<Instant>,
    pub scan_started_at: Option<Instant>,
    pub last_valid_frame: Option<Arc<CapturedFrame>>,
    pub decision: Option<Decision>,
}

impl SessionData {
    pub fn begin_detecting(&mut self, now: Instant) {
        *self = Self {
            session_id: Some(Uuid::new_v4()),
            detect_started_at: Some(now),
            ..Self::default()
        };
    }

    pub fn begin_scanning(&mut self, now: Instant) {
        self.scan_started_at = Some(now);
        self.last_valid_frame = None;
        self.decision = None;
    }

    pub fn detect_elapsed(&self, now: Instant) -> Duration {
        self.detect_started_at
            .map(|started| now.saturating_duration_since(started))
            .unwrap_or_default()
    }

    pub fn scan_elapsed(&self, now: Instant) -> Duration {
        self.scan_started_at
            .map(|started| now.saturating_duration_since(started))
            .unwrap_or_default()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Read-only view of the controller for status queries.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub generation: u64,
    pub session_id: Option<Uuid>,
    pub vote_count: usize,
    pub decision: Option<Decision>,
}
