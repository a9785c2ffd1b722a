use serde::{Deserialize, Serialize};

/// Emotion labels the classifier can report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Emotion {
    Happy,
    Neutral,
    Sad,
    Stressed,
    Surprised,
    Angry,
}

impl Emotion {
    pub const ALL: [Emotion; 6] = [
        Emotion::Happy,
        Emotion::Neutral,
        Emotion::Sad,
        Emotion::Stressed,
        Emotion::Surprised,
        Emotion::Angry,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Happy => "Happy",
            Emotion::Neutral => "Neutral",
            Emotion::Sad => "Sad",
            Emotion::Stressed => "Stressed",
            Emotion::Surprised => "Surprised",
            Emotion::Angry => "Angry",
        }
    }

    /// Case-insensitive lookup of a classifier label. Unknown labels yield `None`.
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|emotion| emotion.as_str().eq_ignore_ascii_case(label))
    }

    /// The default label that receives no weight bonus in the final tally.
    pub fn is_neutral(&self) -> bool {
        matches!(self, Emotion::Neutral)
    }

    /// Lowercase name used for per-emotion asset folders (`audio/happy/`).
    pub fn folder_name(&self) -> String {
        self.as_str().to_ascii_lowercase()
    }
}

impl std::fmt::Display for Emotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
