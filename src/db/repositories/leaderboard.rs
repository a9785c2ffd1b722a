use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, Row};

use crate::db::{
    helpers::{to_i64, to_u32},
    Database,
};
use crate::models::LeaderboardEntry;

/// Rows kept after every insert; lower scores are pruned.
pub const KEPT_ENTRIES: usize = 50;
/// Rows handed back after a submission.
pub const RETURNED_ENTRIES: usize = 10;

fn row_to_entry(row: &Row) -> Result<LeaderboardEntry> {
    Ok(LeaderboardEntry {
        name: row.get("name")?,
        score: to_u32(row.get("score")?, "score")?,
        rounds: to_u32(row.get("rounds")?, "rounds")?,
        date: Some(row.get("date")?),
    })
}

fn select_top(conn: &Connection, limit: usize) -> Result<Vec<LeaderboardEntry>> {
    let mut stmt = conn.prepare(
        "SELECT name, score, rounds, date
         FROM leaderboard_entries
         ORDER BY score DESC, id ASC
         LIMIT ?1",
    )?;
    let mut rows = stmt.query(params![to_i64(limit as u64)?])?;
    let mut entries = Vec::new();
    while let Some(row) = rows.next()? {
        entries.push(row_to_entry(row)?);
    }
    Ok(entries)
}

fn insert_and_prune(conn: &mut Connection, entry: LeaderboardEntry) -> Result<Vec<LeaderboardEntry>> {
    let now = Utc::now().to_rfc3339();
    let date = entry
        .date
        .filter(|date| !date.trim().is_empty())
        .unwrap_or_else(|| now.clone());

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO leaderboard_entries (name, score, rounds, date, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![entry.name, entry.score, entry.rounds, date, now],
    )
    .context("failed to insert leaderboard entry")?;

    // Ties keep their insertion order, so the newest of equal scores is pruned first.
    tx.execute(
        "DELETE FROM leaderboard_entries
         WHERE id NOT IN (
             SELECT id FROM leaderboard_entries
             ORDER BY score DESC, id ASC
             LIMIT ?1
         )",
        params![to_i64(KEPT_ENTRIES as u64)?],
    )
    .context("failed to prune leaderboard")?;

    let top = select_top(&tx, RETURNED_ENTRIES)?;
    tx.commit().context("failed to commit leaderboard entry")?;
    Ok(top)
}

impl Database {
    /// Full stored board, best first.
    pub fn leaderboard_entries_blocking(&self) -> Result<Vec<LeaderboardEntry>> {
        self.execute_blocking(|conn| select_top(conn, KEPT_ENTRIES))
    }

    /// Stores `entry`, stamping today's date when missing, and returns the new top ten.
    pub fn submit_leaderboard_entry_blocking(
        &self,
        entry: LeaderboardEntry,
    ) -> Result<Vec<LeaderboardEntry>> {
        self.execute_blocking(move |conn| insert_and_prune(conn, entry))
    }
}
