pub mod aggregator;
pub mod config;
pub mod smoothing;
pub mod tally;

pub use aggregator::VotingAggregator;
pub use config::VotingConfig;
pub use smoothing::SmoothingWindow;
pub use tally::{final_tally, group_votes, Decision, VoteGroup};
