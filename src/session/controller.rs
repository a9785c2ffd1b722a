use std::sync::Arc;

use log::info;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{Duration, Instant};

use crate::events::{DiscardReason, EventBus, KioskEvent};
use crate::kiosk::KioskInput;
use crate::models::{CapturedFrame, FrameObservation};
use crate::timer::TimerSlot;
use crate::voting::{VotingAggregator, VotingConfig};

use super::{SessionData, SessionSnapshot, SessionState, SessionTimer, SessionTimings};

// Per-frame decisions are chatty; flip to true when debugging the flow.
const ENABLE_LOGS: bool = false;

use crate::log_debug;

/// Idle → Detecting → Scanning → Result → Reset → Idle.
///
/// Owns the scan window's votes and the single timer of the current state. Every
/// transition cancels that timer and bumps `generation`; timer messages scheduled
/// under an older generation are discarded on arrival.
pub struct SessionController {
    state: SessionState,
    generation: u64,
    data: SessionData,
    aggregator: VotingAggregator,
    timings: SessionTimings,
    timer: TimerSlot<KioskInput>,
    events: EventBus,
}

impl SessionController {
    pub fn new(
        timings: SessionTimings,
        voting: VotingConfig,
        inbox: UnboundedSender<KioskInput>,
        events: EventBus,
    ) -> Self {
        Self {
            state: SessionState::Idle,
            generation: 0,
            data: SessionData::default(),
            aggregator: VotingAggregator::new(voting),
            timings,
            timer: TimerSlot::new(inbox),
            events,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn vote_count(&self) -> usize {
        self.aggregator.vote_count()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            generation: self.generation,
            session_id: self.data.session_id,
            vote_count: self.aggregator.vote_count(),
            decision: self.data.decision,
        }
    }

    pub fn handle_observation(
        &mut self,
        observation: &FrameObservation,
        frame: Option<Arc<CapturedFrame>>,
        now: Instant,
    ) {
        let in_zone = observation.in_zone();

        match self.state {
            SessionState::Idle => {
                if in_zone {
                    self.enter_detecting(now);
                }
            }
            SessionState::Detecting => {
                if !in_zone {
                    log_debug!("face left the zone while detecting");
                    self.enter_idle();
                } else if self.data.detect_elapsed(now) > self.timings.detect_delay() {
                    self.enter_scanning(now);
                }
            }
            SessionState::Scanning => {
                if !in_zone {
                    self.abandon_scan(DiscardReason::FaceLost);
                    return;
                }

                if frame.is_some() {
                    self.data.last_valid_frame = frame;
                }
                if let Some(vote) = observation.vote() {
                    self.aggregator.record(vote);
                }
                self.emit_live_preview(now);

                if self.data.scan_elapsed(now) >= self.timings.scan_duration() {
                    self.finish_scan();
                }
            }
            SessionState::Result | SessionState::Reset => {}
        }
    }

    /// Applies a fired timer. Returns `false` when the timer was stale.
    pub fn handle_timer(&mut self, kind: SessionTimer, generation: u64, now: Instant) -> bool {
        if generation != self.generation || kind.owner() != self.state {
            log::debug!(
                "discarding stale {:?} timer (generation {} vs {}, state {:?})",
                kind,
                generation,
                self.generation,
                self.state
            );
            return false;
        }

        match kind {
            SessionTimer::DetectDelay => self.enter_scanning(now),
            SessionTimer::ScanEnd => self.finish_scan(),
            SessionTimer::ResultEnd => self.enter_reset(),
            SessionTimer::ResetEnd => self.enter_idle(),
        }
        true
    }

    /// Manual reset: cancels everything pending and returns to Idle from any state.
    pub fn reset(&mut self) {
        if self.state == SessionState::Scanning {
            self.abandon_scan(DiscardReason::ManualReset);
        } else {
            self.enter_idle();
        }
    }

    fn enter_idle(&mut self) {
        self.aggregator.clear();
        self.data.clear();
        self.transition(SessionState::Idle, None);
    }

    fn enter_detecting(&mut self, now: Instant) {
        self.data.begin_detecting(now);
        let delay = self.timings.detect_delay();
        self.transition(SessionState::Detecting, Some((SessionTimer::DetectDelay, delay)));
    }

    fn enter_scanning(&mut self, now: Instant) {
        self.aggregator.clear();
        self.data.begin_scanning(now);
        let duration = self.timings.scan_duration();
        self.transition(SessionState::Scanning, Some((SessionTimer::ScanEnd, duration)));
    }

    fn enter_reset(&mut self) {
        let duration = self.timings.reset_duration();
        self.transition(SessionState::Reset, Some((SessionTimer::ResetEnd, duration)));
    }

    fn finish_scan(&mut self) {
        let vote_count = self.aggregator.vote_count();
        match self.aggregator.finalize() {
            Some(decision) => {
                info!(
                    "scan decided {} ({:.2}) from {} votes",
                    decision.emotion, decision.confidence, decision.vote_count
                );
                self.data.decision = Some(decision);
                let duration = self.timings.result_duration();
                self.transition(SessionState::Result, Some((SessionTimer::ResultEnd, duration)));
            }
            None => {
                info!("scan closed with {vote_count} votes, not enough for a decision");
                self.events.emit(KioskEvent::ScanDiscarded {
                    session_id: self.data.session_id,
                    reason: DiscardReason::InsufficientVotes,
                    vote_count,
                });
                self.enter_idle();
            }
        }
    }

    fn abandon_scan(&mut self, reason: DiscardReason) {
        self.events.emit(KioskEvent::ScanDiscarded {
            session_id: self.data.session_id,
            reason,
            vote_count: self.aggregator.vote_count(),
        });
        self.enter_idle();
    }

    fn transition(&mut self, next: SessionState, timer: Option<(SessionTimer, Duration)>) {
        self.timer.cancel();
        self.generation += 1;
        let previous = self.state;
        self.state = next;

        if let Some((kind, after)) = timer {
            self.timer.schedule(
                after,
                KioskInput::SessionTimer {
                    kind,
                    generation: self.generation,
                },
            );
        }

        info!("session {:?} -> {:?} (generation {})", previous, next, self.generation);

        let entering_result = next == SessionState::Result;
        self.events.emit(KioskEvent::SessionStateChanged {
            session_id: self.data.session_id,
            state: next,
            generation: self.generation,
            duration_ms: timer.map(|(_, after)| after.as_millis() as u64),
            decision: if entering_result { self.data.decision } else { None },
            snapshot: if entering_result {
                self.data.last_valid_frame.clone()
            } else {
                None
            },
        });
    }

    fn emit_live_preview(&self, now: Instant) {
        let scan = self.timings.scan_duration().as_secs_f64();
        let progress = if scan > 0.0 {
            (self.data.scan_elapsed(now).as_secs_f64() / scan).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let live = self.aggregator.live_label();
        self.events.emit(KioskEvent::LivePreview {
            session_id: self.data.session_id,
            emotion: live.map(|(emotion, _)| emotion),
            confidence: live.map(|(_, confidence)| confidence).unwrap_or(0.0),
            progress,
            vote_count: self.aggregator.vote_count(),
        });
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tokio::sync::{broadcast, mpsc};

    use super::*;
    use crate::models::{BoundingBox, Emotion};

    fn harness() -> (
        SessionController,
        mpsc::UnboundedReceiver<KioskInput>,
        broadcast::Receiver<KioskEvent>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let events = EventBus::new();
        let subscriber = events.subscribe();
        let controller =
            SessionController::new(SessionTimings::default(), VotingConfig::default(), tx, events);
        (controller, rx, subscriber)
    }

    fn seen(emotion: Emotion, confidence: f64) -> FrameObservation {
        FrameObservation {
            detected: true,
            emotion: Some(emotion),
            confidence,
            face_count: 1,
            bbox: Some(BoundingBox {
                x: 590.0,
                y: 274.0,
                w: 100.0,
                h: 100.0,
            }),
            frame_width: 1280,
            frame_height: 720,
            timestamp: Utc::now(),
        }
    }

    fn off_center() -> FrameObservation {
        FrameObservation {
            bbox: Some(BoundingBox {
                x: 0.0,
                y: 0.0,
                w: 100.0,
                h: 100.0,
            }),
            ..seen(Emotion::Happy, 0.9)
        }
    }

    /// Waits for the next scheduled session timer (auto-advancing paused time) and applies it.
    async fn fire_next(
        controller: &mut SessionController,
        rx: &mut mpsc::UnboundedReceiver<KioskInput>,
    ) -> (SessionTimer, bool) {
        match rx.recv().await {
            Some(KioskInput::SessionTimer { kind, generation }) => {
                let applied = controller.handle_timer(kind, generation, Instant::now());
                (kind, applied)
            }
            other => panic!("expected a session timer, got {other:?}"),
        }
    }

    fn drain(events: &mut broadcast::Receiver<KioskEvent>) -> Vec<KioskEvent> {
        let mut out = Vec::new();
        while let Ok(event) = events.try_recv() {
            out.push(event);
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn full_cycle_reaches_result_then_idle() {
        let (mut controller, mut rx, mut events) = harness();

        controller.handle_observation(&seen(Emotion::Happy, 0.9), None, Instant::now());
        assert_eq!(controller.state(), SessionState::Detecting);

        assert_eq!(fire_next(&mut controller, &mut rx).await, (SessionTimer::DetectDelay, true));
        assert_eq!(controller.state(), SessionState::Scanning);

        for confidence in [0.9, 0.7, 0.8, 0.6] {
            controller.handle_observation(&seen(Emotion::Happy, confidence), None, Instant::now());
        }
        controller.handle_observation(&seen(Emotion::Sad, 0.99), None, Instant::now());
        assert_eq!(controller.vote_count(), 5);

        assert_eq!(fire_next(&mut controller, &mut rx).await, (SessionTimer::ScanEnd, true));
        assert_eq!(controller.state(), SessionState::Result);
        let decision = controller.snapshot().decision.unwrap();
        assert_eq!(decision.emotion, Emotion::Happy);
        assert!((decision.confidence - 0.75).abs() < 1e-9);

        let result_event = drain(&mut events).into_iter().find_map(|event| match event {
            KioskEvent::SessionStateChanged {
                state: SessionState::Result,
                decision,
                duration_ms,
                ..
            } => Some((decision, duration_ms)),
            _ => None,
        });
        assert_eq!(result_event, Some((Some(decision), Some(12_000))));

        let result_entered = Instant::now();
        assert_eq!(fire_next(&mut controller, &mut rx).await, (SessionTimer::ResultEnd, true));
        assert!(result_entered.elapsed() >= Duration::from_millis(12_000));
        assert_eq!(controller.state(), SessionState::Reset);

        assert_eq!(fire_next(&mut controller, &mut rx).await, (SessionTimer::ResetEnd, true));
        assert_eq!(controller.state(), SessionState::Idle);
        assert!(controller.snapshot().decision.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn sparse_window_returns_to_idle() {
        let (mut controller, mut rx, mut events) = harness();

        controller.handle_observation(&seen(Emotion::Happy, 0.9), None, Instant::now());
        fire_next(&mut controller, &mut rx).await;
        controller.handle_observation(&seen(Emotion::Happy, 0.9), None, Instant::now());
        controller.handle_observation(&seen(Emotion::Happy, 0.9), None, Instant::now());

        assert_eq!(fire_next(&mut controller, &mut rx).await, (SessionTimer::ScanEnd, true));
        assert_eq!(controller.state(), SessionState::Idle);

        let discarded = drain(&mut events).into_iter().any(|event| {
            matches!(
                event,
                KioskEvent::ScanDiscarded {
                    reason: DiscardReason::InsufficientVotes,
                    vote_count: 2,
                    ..
                }
            )
        });
        assert!(discarded);
    }

    #[tokio::test(start_paused = true)]
    async fn leaving_the_zone_abandons_the_scan() {
        let (mut controller, mut rx, _events) = harness();

        controller.handle_observation(&seen(Emotion::Sad, 0.8), None, Instant::now());
        fire_next(&mut controller, &mut rx).await;
        for _ in 0..4 {
            controller.handle_observation(&seen(Emotion::Sad, 0.8), None, Instant::now());
        }
        let scanning_generation = controller.generation();

        controller.handle_observation(&off_center(), None, Instant::now());
        assert_eq!(controller.state(), SessionState::Idle);
        assert_eq!(controller.vote_count(), 0);

        // The aborted scan timer never fires, and a late copy would be rejected.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
        assert!(!controller.handle_timer(SessionTimer::ScanEnd, scanning_generation, Instant::now()));
        assert_eq!(controller.state(), SessionState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn losing_the_face_while_detecting_goes_idle() {
        let (mut controller, _rx, _events) = harness();

        controller.handle_observation(&seen(Emotion::Happy, 0.9), None, Instant::now());
        let mut gone = seen(Emotion::Happy, 0.9);
        gone.detected = false;
        controller.handle_observation(&gone, None, Instant::now());
        assert_eq!(controller.state(), SessionState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_timers_are_ignored() {
        let (mut controller, _rx, _events) = harness();

        controller.handle_observation(&seen(Emotion::Happy, 0.9), None, Instant::now());
        let detecting_generation = controller.generation();
        controller.handle_observation(&off_center(), None, Instant::now());
        assert_eq!(controller.state(), SessionState::Idle);

        assert!(!controller.handle_timer(
            SessionTimer::DetectDelay,
            detecting_generation,
            Instant::now()
        ));
        assert_eq!(controller.state(), SessionState::Idle);

        // Right generation, wrong state.
        controller.handle_observation(&seen(Emotion::Happy, 0.9), None, Instant::now());
        let generation = controller.generation();
        assert!(!controller.handle_timer(SessionTimer::ResultEnd, generation, Instant::now()));
        assert_eq!(controller.state(), SessionState::Detecting);
    }

    #[tokio::test(start_paused = true)]
    async fn long_enough_in_zone_starts_scan_without_timer() {
        let (mut controller, _rx, _events) = harness();

        let start = Instant::now();
        controller.handle_observation(&seen(Emotion::Happy, 0.9), None, start);
        controller.handle_observation(
            &seen(Emotion::Happy, 0.9),
            None,
            start + Duration::from_millis(799),
        );
        assert_eq!(controller.state(), SessionState::Detecting);

        controller.handle_observation(
            &seen(Emotion::Happy, 0.9),
            None,
            start + Duration::from_millis(801),
        );
        assert_eq!(controller.state(), SessionState::Scanning);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_reset_cancels_pending_result_timer() {
        let (mut controller, mut rx, _events) = harness();

        controller.handle_observation(&seen(Emotion::Happy, 0.9), None, Instant::now());
        fire_next(&mut controller, &mut rx).await;
        for _ in 0..3 {
            controller.handle_observation(&seen(Emotion::Angry, 0.7), None, Instant::now());
        }
        fire_next(&mut controller, &mut rx).await;
        assert_eq!(controller.state(), SessionState::Result);

        // Result ignores frames, in zone or not.
        controller.handle_observation(&off_center(), None, Instant::now());
        assert_eq!(controller.state(), SessionState::Result);

        controller.reset();
        assert_eq!(controller.state(), SessionState::Idle);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn result_carries_last_valid_frame() {
        let (mut controller, mut rx, mut events) = harness();
        let frame = Arc::new(CapturedFrame {
            jpeg: vec![1, 2, 3],
            width: 1280,
            height: 720,
            captured_at: Utc::now(),
        });

        controller.handle_observation(&seen(Emotion::Happy, 0.9), None, Instant::now());
        fire_next(&mut controller, &mut rx).await;
        for _ in 0..3 {
            controller.handle_observation(
                &seen(Emotion::Neutral, 0.6),
                Some(frame.clone()),
                Instant::now(),
            );
        }
        fire_next(&mut controller, &mut rx).await;

        let snapshot = drain(&mut events).into_iter().find_map(|event| match event {
            KioskEvent::SessionStateChanged {
                state: SessionState::Result,
                snapshot,
                ..
            } => snapshot,
            _ => None,
        });
        assert_eq!(snapshot.map(|f| f.jpeg.clone()), Some(vec![1, 2, 3]));
    }
}
