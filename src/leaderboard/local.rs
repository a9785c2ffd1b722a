use std::path::PathBuf;

use anyhow::Result;

use crate::db::Database;
use crate::models::LeaderboardEntry;

use super::LeaderboardService;

/// Leaderboard kept in a local SQLite file, for kiosks running without the backend.
#[derive(Clone)]
pub struct LocalLeaderboard {
    db: Database,
}

impl LocalLeaderboard {
    pub fn open(path: PathBuf) -> Result<Self> {
        Ok(Self {
            db: Database::new(path)?,
        })
    }
}

impl LeaderboardService for LocalLeaderboard {
    fn top_entries(&self) -> Result<Vec<LeaderboardEntry>> {
        self.db.leaderboard_entries_blocking()
    }

    fn submit(&self, entry: LeaderboardEntry) -> Result<Vec<LeaderboardEntry>> {
        self.db.submit_leaderboard_entry_blocking(entry)
    }
}
