pub mod leaderboard;

pub use leaderboard::{KEPT_ENTRIES, RETURNED_ENTRIES};
