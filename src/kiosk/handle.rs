use anyhow::{anyhow, Result};
use tokio::sync::{broadcast, mpsc::UnboundedSender, oneshot, watch};

use crate::events::{EventBus, KioskEvent};

use super::{KioskInput, KioskStatus, ObservationTicket};

/// Cloneable front door to a running kiosk: manual controls, status and events.
#[derive(Clone)]
pub struct KioskHandle {
    inbox: UnboundedSender<KioskInput>,
    tickets: watch::Receiver<ObservationTicket>,
    events: EventBus,
}

impl KioskHandle {
    pub(super) fn new(
        inbox: UnboundedSender<KioskInput>,
        tickets: watch::Receiver<ObservationTicket>,
        events: EventBus,
    ) -> Self {
        Self {
            inbox,
            tickets,
            events,
        }
    }

    fn send(&self, input: KioskInput) -> Result<()> {
        self.inbox
            .send(input)
            .map_err(|_| anyhow!("kiosk is no longer running"))
    }

    /// Cancels every pending timer and returns to Idle, leaving any game.
    pub fn reset(&self) -> Result<()> {
        self.send(KioskInput::Reset)
    }

    pub fn start_challenge(&self, player: impl Into<String>) -> Result<()> {
        self.send(KioskInput::StartChallenge {
            player: player.into(),
        })
    }

    pub fn exit_challenge(&self) -> Result<()> {
        self.send(KioskInput::ExitChallenge)
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(KioskInput::Shutdown)
    }

    pub async fn status(&self) -> Result<KioskStatus> {
        let (reply, rx) = oneshot::channel();
        self.send(KioskInput::Status { reply })?;
        rx.await.map_err(|_| anyhow!("kiosk stopped before replying"))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<KioskEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Sender for observation producers such as the capture loop.
    pub fn inbox(&self) -> UnboundedSender<KioskInput> {
        self.inbox.clone()
    }

    /// Ticket stamped onto frames at capture time.
    pub fn tickets(&self) -> watch::Receiver<ObservationTicket> {
        self.tickets.clone()
    }
}
