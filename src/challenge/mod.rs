pub mod config;
pub mod engine;
pub mod scoring;

pub use config::ChallengeConfig;
pub use engine::{ChallengeEngine, ChallengePhase, ChallengeSession, ChallengeTimer};
pub use scoring::{score_round, RoundScore};
