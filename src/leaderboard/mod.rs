pub mod http;
pub mod local;

use std::sync::Arc;

use anyhow::Result;
use log::{info, warn};

use crate::events::{EventBus, KioskEvent};
use crate::models::LeaderboardEntry;

pub use http::HttpLeaderboard;
pub use local::LocalLeaderboard;

/// Store of finished games. Implementations block, so async callers go through
/// `spawn_blocking`.
pub trait LeaderboardService: Send + Sync {
    /// Stored entries, best first.
    fn top_entries(&self) -> Result<Vec<LeaderboardEntry>>;

    /// Records `entry` and returns the refreshed top of the board.
    fn submit(&self, entry: LeaderboardEntry) -> Result<Vec<LeaderboardEntry>>;
}

/// Fire-and-forget submission. Failures are logged and never reach the game.
pub fn submit_in_background(
    service: Arc<dyn LeaderboardService>,
    entry: LeaderboardEntry,
    events: EventBus,
) {
    tokio::spawn(async move {
        let name = entry.name.clone();
        let score = entry.score;
        match tokio::task::spawn_blocking(move || service.submit(entry)).await {
            Ok(Ok(entries)) => {
                info!("leaderboard accepted {name} with {score} points");
                events.emit(KioskEvent::LeaderboardUpdated { entries });
            }
            Ok(Err(err)) => warn!("leaderboard submission for {name} failed: {err:#}"),
            Err(join_err) => warn!("leaderboard submission task panicked: {join_err}"),
        }
    });
}

/// Reads the board off the runtime, returning an empty list on failure.
pub async fn fetch_entries(service: Arc<dyn LeaderboardService>) -> Vec<LeaderboardEntry> {
    match tokio::task::spawn_blocking(move || service.top_entries()).await {
        Ok(Ok(entries)) => entries,
        Ok(Err(err)) => {
            warn!("failed to read leaderboard: {err:#}");
            Vec::new()
        }
        Err(join_err) => {
            warn!("leaderboard read task panicked: {join_err}");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;

    struct Unreachable;

    impl LeaderboardService for Unreachable {
        fn top_entries(&self) -> Result<Vec<LeaderboardEntry>> {
            Err(anyhow!("connection refused"))
        }

        fn submit(&self, _entry: LeaderboardEntry) -> Result<Vec<LeaderboardEntry>> {
            Err(anyhow!("connection refused"))
        }
    }

    #[tokio::test]
    async fn failures_degrade_to_empty_boards() {
        let service: Arc<dyn LeaderboardService> = Arc::new(Unreachable);
        assert!(fetch_entries(service.clone()).await.is_empty());

        let events = EventBus::new();
        let mut rx = events.subscribe();
        submit_in_background(
            service,
            LeaderboardEntry {
                name: "ada".into(),
                score: 10,
                rounds: 5,
                date: None,
            },
            events,
        );
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
    }
}
