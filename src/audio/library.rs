use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::info;

use crate::models::Emotion;

const AUDIO_EXTENSIONS: [&str; 3] = ["wav", "mp3", "ogg"];

/// Clips per emotion, found under `<root>/<emotion>/`, handed out round-robin.
///
/// An emotion without a folder falls back to a flat `<root>/<emotion>.wav`.
#[derive(Debug, Default)]
pub struct CueLibrary {
    clips: HashMap<Emotion, Vec<PathBuf>>,
    next: HashMap<Emotion, usize>,
}

impl CueLibrary {
    pub fn scan(root: &Path) -> Self {
        let mut clips = HashMap::new();

        for emotion in Emotion::ALL {
            let folder = root.join(emotion.folder_name());
            let mut found = list_clips(&folder);
            if found.is_empty() {
                let flat = root.join(format!("{}.wav", emotion.folder_name()));
                if flat.is_file() {
                    found.push(flat);
                }
            }
            if !found.is_empty() {
                info!("{}: {} audio cue(s) ready", emotion, found.len());
                clips.insert(emotion, found);
            }
        }

        Self {
            clips,
            next: HashMap::new(),
        }
    }

    pub fn clip_count(&self, emotion: Emotion) -> usize {
        self.clips.get(&emotion).map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Next clip for `emotion`, cycling 1 → 2 → 3 → 1.
    pub fn next_clip(&mut self, emotion: Emotion) -> Option<PathBuf> {
        let clips = self.clips.get(&emotion)?;
        let index = self.next.entry(emotion).or_insert(0);
        let clip = clips.get(*index % clips.len())?.clone();
        *index = (*index + 1) % clips.len();
        Some(clip)
    }
}

fn list_clips(folder: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(folder) else {
        return Vec::new();
    };
    let mut clips: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| AUDIO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    clips.sort();
    clips
}
