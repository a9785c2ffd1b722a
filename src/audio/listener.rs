use std::sync::Arc;
use std::time::Duration;

use log::warn;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::events::KioskEvent;
use crate::session::SessionState;

use super::{CueLibrary, CuePlayer};

/// Plays the decided emotion's cue when a session enters Result, and silences
/// playback once the session is back in Idle or a game starts.
pub fn spawn_cue_listener(
    mut events: broadcast::Receiver<KioskEvent>,
    mut library: CueLibrary,
    player: Arc<dyn CuePlayer>,
    max_duration: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("audio listener lagged, {skipped} events skipped");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            let outcome = match event {
                KioskEvent::SessionStateChanged {
                    state: SessionState::Result,
                    decision: Some(decision),
                    ..
                } => match library.next_clip(decision.emotion) {
                    Some(clip) => player.play(&clip, max_duration),
                    None => Ok(()),
                },
                KioskEvent::SessionStateChanged {
                    state: SessionState::Idle,
                    ..
                }
                | KioskEvent::ChallengePhaseChanged { .. } => player.stop(),
                _ => Ok(()),
            };
            if let Err(err) = outcome {
                warn!("audio cue failed: {err:#}");
            }
        }
    })
}
