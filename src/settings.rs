use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::capture::CaptureConfig;
use crate::challenge::ChallengeConfig;
use crate::session::SessionTimings;
use crate::voting::VotingConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassifierSettings {
    pub url: String,
    pub timeout_ms: u64,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8000".into(),
            timeout_ms: 2000,
        }
    }
}

impl ClassifierSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioSettings {
    pub enabled: bool,
    pub dir: PathBuf,
    pub max_duration_secs: f64,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from("audio"),
            max_duration_secs: 10.0,
        }
    }
}

impl AudioSettings {
    /// Values too large for a `Duration` fall back to the default cap.
    pub fn max_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.max_duration_secs.max(0.0)).unwrap_or_else(|err| {
            warn!(
                "audio max_duration_secs {} is out of range ({err}), using the default",
                self.max_duration_secs
            );
            Duration::from_secs_f64(AudioSettings::default().max_duration_secs)
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum LeaderboardSettings {
    Http { url: String },
    Local { path: PathBuf },
}

impl Default for LeaderboardSettings {
    fn default() -> Self {
        LeaderboardSettings::Local {
            path: PathBuf::from("leaderboard.db"),
        }
    }
}

/// Everything the kiosk binary can be tuned with. Fields missing from the JSON
/// file keep their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KioskConfig {
    pub classifier: ClassifierSettings,
    pub capture: CaptureConfig,
    pub frames_dir: Option<PathBuf>,
    pub loop_frames: bool,
    pub audio: AudioSettings,
    pub leaderboard: LeaderboardSettings,
    pub timings: SessionTimings,
    pub voting: VotingConfig,
    pub challenge: ChallengeConfig,
    pub seed: Option<u64>,
}

impl KioskConfig {
    /// Reads the config at `path`. A missing path gives defaults; an unparsable
    /// file is reported and replaced by defaults so the kiosk still comes up.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            warn!("config {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        match serde_json::from_str(&contents) {
            Ok(config) => Ok(config),
            Err(err) => {
                warn!("config {} is invalid ({err}), using defaults", path.display());
                Ok(Self::default())
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_files_keep_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kiosk.json");
        fs::write(
            &path,
            r#"{
                "classifier": {"url": "http://backend:8000"},
                "leaderboard": {"backend": "http", "url": "http://backend:8000"},
                "timings": {"result_duration_ms": 5000}
            }"#,
        )
        .unwrap();

        let config = KioskConfig::load(Some(&path)).unwrap();
        assert_eq!(config.classifier.url, "http://backend:8000");
        assert_eq!(config.classifier.timeout_ms, 2000);
        assert_eq!(
            config.leaderboard,
            LeaderboardSettings::Http {
                url: "http://backend:8000".into()
            }
        );
        assert_eq!(config.timings.result_duration_ms, 5000);
        assert_eq!(config.timings.scan_duration_ms, 3000);
        assert_eq!(config.challenge.rounds, 5);
    }

    #[test]
    fn broken_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kiosk.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(KioskConfig::load(Some(&path)).unwrap(), KioskConfig::default());
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kiosk.json");
        let mut config = KioskConfig::default();
        config.frames_dir = Some(PathBuf::from("frames"));
        config.seed = Some(9);
        config.save(&path).unwrap();
        assert_eq!(KioskConfig::load(Some(&path)).unwrap(), config);
    }

    #[test]
    fn out_of_range_cue_cap_uses_the_default() {
        let mut audio = AudioSettings::default();
        audio.max_duration_secs = 1e300;
        assert_eq!(audio.max_duration(), Duration::from_secs(10));

        audio.max_duration_secs = -3.0;
        assert_eq!(audio.max_duration(), Duration::ZERO);

        audio.max_duration_secs = 2.5;
        assert_eq!(audio.max_duration(), Duration::from_millis(2500));
    }
}
