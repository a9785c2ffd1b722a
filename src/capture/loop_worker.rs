use std::sync::Arc;

use tokio::sync::{mpsc::UnboundedSender, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::classifier::EmotionClassifier;
use crate::kiosk::{KioskInput, ObservationTicket};
use crate::models::{CapturedFrame, FrameObservation};

use crate::utils::logging::debug_mode;

use super::{CaptureConfig, FrameSource};

/// Captures, classifies and posts one frame per tick until cancelled, the source
/// runs dry, or the kiosk stops listening.
///
/// The ticket is read when the frame is captured, not when the reply comes back,
/// so a reply that outlives its state is recognisably stale.
pub async fn capture_loop(
    mut source: Box<dyn FrameSource>,
    classifier: Arc<dyn EmotionClassifier>,
    inbox: UnboundedSender<KioskInput>,
    tickets: watch::Receiver<ObservationTicket>,
    config: CaptureConfig,
    cancel_token: CancellationToken,
) {
    // KIOSK_DEBUG turns on one line per classified frame
    let verbose = debug_mode();
    let mut ticker = tokio::time::interval(config.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let ticket = *tickets.borrow();
                let frame = match source.next_frame() {
                    Ok(Some(frame)) => Arc::new(frame),
                    Ok(None) => {
                        log::info!("frame source exhausted, capture loop stopping");
                        break;
                    }
                    Err(err) => {
                        log::warn!("frame capture failed: {err:#}");
                        continue;
                    }
                };

                let observation = tokio::select! {
                    observation = classify(&classifier, &frame, &config) => observation,
                    _ = cancel_token.cancelled() => break,
                };
                if verbose {
                    log::info!(
                        "frame {}x{} -> detected={} emotion={:?} conf={:.2} ticket={:?}",
                        frame.width, frame.height, observation.detected,
                        observation.emotion, observation.confidence, ticket
                    );
                }

                let input = KioskInput::Observation {
                    ticket,
                    observation,
                    frame: Some(frame),
                };
                if inbox.send(input).is_err() {
                    log::info!("kiosk inbox closed, capture loop stopping");
                    break;
                }
            }
            _ = cancel_token.cancelled() => {
                log::info!("capture loop shutting down");
                break;
            }
        }
    }
}

/// Any failure, including a missed deadline, becomes a no-detection observation.
async fn classify(
    classifier: &Arc<dyn EmotionClassifier>,
    frame: &Arc<CapturedFrame>,
    config: &CaptureConfig,
) -> FrameObservation {
    let worker = {
        let classifier = Arc::clone(classifier);
        let frame = Arc::clone(frame);
        tokio::task::spawn_blocking(move || classifier.classify(&frame))
    };

    match tokio::time::timeout(config.classify_timeout(), worker).await {
        Ok(Ok(Ok(observation))) => observation,
        Ok(Ok(Err(err))) => {
            log::warn!("classifier call failed: {err:#}");
            FrameObservation::empty(frame)
        }
        Ok(Err(join_err)) => {
            log::error!("classifier worker panicked: {join_err}");
            FrameObservation::empty(frame)
        }
        Err(_) => {
            log::warn!(
                "classifier timeout (> {}ms), treating frame as empty",
                config.classify_timeout_ms
            );
            FrameObservation::empty(frame)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use anyhow::{anyhow, Result};
    use chrono::Utc;
    use tokio::sync::mpsc;

    use super::*;
    use crate::kiosk::KioskMode;
    use crate::models::{BoundingBox, Emotion};

    struct CountedFrames(usize);

    impl FrameSource for CountedFrames {
        fn next_frame(&mut self) -> Result<Option<CapturedFrame>> {
            if self.0 == 0 {
                return Ok(None);
            }
            self.0 -= 1;
            Ok(Some(CapturedFrame {
                jpeg: vec![0xff, 0xd8],
                width: 640,
                height: 480,
                captured_at: Utc::now(),
            }))
        }
    }

    struct Scripted(Mutex<VecDeque<Result<FrameObservation>>>);

    impl EmotionClassifier for Scripted {
        fn classify(&self, frame: &CapturedFrame) -> Result<FrameObservation> {
            self.0
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(FrameObservation::empty(frame)))
        }
    }

    fn happy() -> FrameObservation {
        FrameObservation {
            detected: true,
            emotion: Some(Emotion::Happy),
            confidence: 0.8,
            face_count: 1,
            bbox: Some(BoundingBox {
                x: 270.0,
                y: 190.0,
                w: 100.0,
                h: 100.0,
            }),
            frame_width: 640,
            frame_height: 480,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn posts_one_observation_per_frame_with_the_capture_ticket() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let ticket = ObservationTicket {
            mode: KioskMode::Session,
            generation: 4,
        };
        let (_ticket_tx, tickets) = watch::channel(ticket);
        let classifier: Arc<dyn EmotionClassifier> = Arc::new(Scripted(Mutex::new(
            vec![Ok(happy()), Err(anyhow!("connection reset")), Ok(happy())].into(),
        )));
        let config = CaptureConfig {
            interval_ms: 5,
            classify_timeout_ms: 1000,
        };

        capture_loop(
            Box::new(CountedFrames(3)),
            classifier,
            tx,
            tickets,
            config,
            CancellationToken::new(),
        )
        .await;

        let mut seen = Vec::new();
        while let Ok(KioskInput::Observation {
            ticket: got,
            observation,
            frame,
        }) = rx.try_recv()
        {
            assert_eq!(got, ticket);
            assert!(frame.is_some());
            seen.push(observation.detected);
        }
        assert_eq!(seen, vec![true, false, true]);
    }

    #[tokio::test]
    async fn cancellation_stops_an_endless_source() {
        struct Endless;
        impl FrameSource for Endless {
            fn next_frame(&mut self) -> Result<Option<CapturedFrame>> {
                CountedFrames(1).next_frame()
            }
        }

        let (tx, _rx) = mpsc::unbounded_channel();
        let (_ticket_tx, tickets) = watch::channel(ObservationTicket {
            mode: KioskMode::Session,
            generation: 0,
        });
        let token = CancellationToken::new();
        let worker = tokio::spawn(capture_loop(
            Box::new(Endless),
            Arc::new(Scripted(Mutex::new(VecDeque::new()))),
            tx,
            tickets,
            CaptureConfig {
                interval_ms: 5,
                classify_timeout_ms: 100,
            },
            token.clone(),
        ));

        tokio::time::sleep(std::time::Duration::from_millis(30)).await;
        token.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(2), worker)
            .await
            .expect("capture loop did not stop")
            .unwrap();
    }
}
