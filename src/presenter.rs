use std::io::Write;

use log::warn;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::events::KioskEvent;

/// Writes every kiosk event to stdout as one JSON line.
pub fn spawn_event_printer(mut events: broadcast::Receiver<KioskEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Err(err) = print_event(&event) {
                        warn!("failed to print event: {err:#}");
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!("event printer lagged, {skipped} events skipped"),
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn print_event(event: &KioskEvent) -> anyhow::Result<()> {
    let line = serde_json::to_string(event)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{line}")?;
    stdout.flush()?;
    Ok(())
}
