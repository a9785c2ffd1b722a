use std::time::Duration;

use tokio::{sync::mpsc::UnboundedSender, task::JoinHandle, time};

/// A single cancellable scheduled message.
///
/// Scheduling aborts whatever was pending, so an owner never has two live timers.
/// Abort is best effort: a timer whose sleep already elapsed may have queued its
/// message, which is why every message also carries the owner's generation.
pub struct TimerSlot<M: Send + 'static> {
    tx: UnboundedSender<M>,
    handle: Option<JoinHandle<()>>,
}

impl<M: Send + 'static> TimerSlot<M> {
    pub fn new(tx: UnboundedSender<M>) -> Self {
        Self { tx, handle: None }
    }

    /// Replaces the pending timer with one that delivers `message` after `after`.
    pub fn schedule(&mut self, after: Duration, message: M) {
        self.cancel();
        let tx = self.tx.clone();
        self.handle = Some(tokio::spawn(async move {
            time::sleep(after).await;
            let _ = tx.send(message);
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl<M: Send + 'static> Drop for TimerSlot<M> {
    fn drop(&mut self) {
        self.cancel();
    }
}
