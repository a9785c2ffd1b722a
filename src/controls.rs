use std::sync::Arc;

use log::{info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::events::KioskEvent;
use crate::kiosk::KioskHandle;
use crate::leaderboard::{self, LeaderboardService};

/// Operator commands read from stdin, one per line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Reset,
    StartChallenge(String),
    ExitChallenge,
    Leaderboard,
    Status,
    Quit,
}

pub fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    match word.to_ascii_lowercase().as_str() {
        "r" | "reset" => Some(Command::Reset),
        "c" | "challenge" => Some(Command::StartChallenge(rest.to_string())),
        "x" | "exit" => Some(Command::ExitChallenge),
        "l" | "leaderboard" => Some(Command::Leaderboard),
        "s" | "status" => Some(Command::Status),
        "q" | "quit" => Some(Command::Quit),
        _ => None,
    }
}

/// Reads commands from stdin. Only an explicit `q` fires `quit`; closed input just
/// leaves the kiosk running unattended.
pub fn spawn_stdin_controls(
    kiosk: KioskHandle,
    board: Arc<dyn LeaderboardService>,
    quit: oneshot::Sender<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(err) => {
                    warn!("failed to read controls: {err}");
                    break;
                }
            };
            let Some(command) = parse_command(&line) else {
                if !line.trim().is_empty() {
                    warn!("unknown command {:?} (r, c <name>, x, l, s, q)", line.trim());
                }
                continue;
            };

            let sent = match command {
                Command::Reset => kiosk.reset(),
                Command::StartChallenge(player) => kiosk.start_challenge(player),
                Command::ExitChallenge => kiosk.exit_challenge(),
                Command::Leaderboard => {
                    let entries = leaderboard::fetch_entries(board.clone()).await;
                    kiosk.events().emit(KioskEvent::LeaderboardUpdated { entries });
                    Ok(())
                }
                Command::Status => kiosk.status().await.map(|status| {
                    info!("status: {}", serde_json::to_string(&status).unwrap_or_default());
                }),
                Command::Quit => {
                    let _ = quit.send(());
                    return;
                }
            };
            if let Err(err) = sent {
                warn!("command failed: {err:#}");
                break;
            }
        }
        info!("stdin controls closed");
    })
}
