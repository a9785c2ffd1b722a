pub mod challenge;
pub mod emotion;
pub mod frame;
pub mod observation;

pub use challenge::{GameSummary, LeaderboardEntry, RoundResult};
pub use emotion::Emotion;
pub use frame::CapturedFrame;
pub use observation::{BoundingBox, FrameObservation, Vote};
