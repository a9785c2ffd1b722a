use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::info;
use tokio::sync::{mpsc::UnboundedSender, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::classifier::EmotionClassifier;
use crate::kiosk::{KioskInput, ObservationTicket};

use super::loop_worker::capture_loop;
use super::{CaptureConfig, FrameSource};

/// Starts and stops the background capture loop.
pub struct CaptureController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl CaptureController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    pub fn start(
        &mut self,
        source: Box<dyn FrameSource>,
        classifier: Arc<dyn EmotionClassifier>,
        inbox: UnboundedSender<KioskInput>,
        tickets: watch::Receiver<ObservationTicket>,
        config: CaptureConfig,
    ) -> Result<()> {
        if self.is_running() {
            bail!("capture already active");
        }

        let cancel_token = CancellationToken::new();
        info!(
            "starting capture every {}ms (classifier deadline {}ms)",
            config.interval_ms, config.classify_timeout_ms
        );
        let handle = tokio::spawn(capture_loop(
            source,
            classifier,
            inbox,
            tickets,
            config,
            cancel_token.clone(),
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("capture loop task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

impl Default for CaptureController {
    fn default() -> Self {
        Self::new()
    }
}
