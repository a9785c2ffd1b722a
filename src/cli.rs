use std::path::PathBuf;

use clap::Parser;

use crate::settings::{KioskConfig, LeaderboardSettings};

#[derive(Parser, Debug, Default)]
#[command(name = "emotion-kiosk", about = "Unattended emotion-detection kiosk")]
pub struct Args {
    /// JSON config file; missing fields use defaults.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Directory of still images replayed as the camera feed.
    #[arg(long)]
    pub frames: Option<PathBuf>,
    /// Replay the frames directory forever.
    #[arg(long)]
    pub loop_frames: bool,
    /// Base URL of the detection backend.
    #[arg(long)]
    pub classifier_url: Option<String>,
    /// Keep the leaderboard in this SQLite file.
    #[arg(long, conflicts_with = "leaderboard_url")]
    pub leaderboard_db: Option<PathBuf>,
    /// Use the backend's leaderboard at this base URL.
    #[arg(long)]
    pub leaderboard_url: Option<String>,
    /// Start a challenge game for this player right away.
    #[arg(long)]
    pub challenge: Option<String>,
    /// Fixed seed for challenge targets.
    #[arg(long)]
    pub seed: Option<u64>,
    /// Disable audio cues.
    #[arg(long)]
    pub no_audio: bool,
    /// Print the effective config as JSON and exit.
    #[arg(long)]
    pub print_config: bool,
}

impl Args {
    /// Command-line flags win over the config file.
    pub fn apply(&self, config: &mut KioskConfig) {
        if let Some(frames) = &self.frames {
            config.frames_dir = Some(frames.clone());
        }
        if self.loop_frames {
            config.loop_frames = true;
        }
        if let Some(url) = &self.classifier_url {
            config.classifier.url = url.clone();
        }
        if let Some(path) = &self.leaderboard_db {
            config.leaderboard = LeaderboardSettings::Local { path: path.clone() };
        }
        if let Some(url) = &self.leaderboard_url {
            config.leaderboard = LeaderboardSettings::Http { url: url.clone() };
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.no_audio {
            config.audio.enabled = false;
        }
    }
}
