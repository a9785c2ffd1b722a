pub mod library;
pub mod listener;

pub use library::CueLibrary;
pub use listener::spawn_cue_listener;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::{
    mpsc::{self, Sender},
    Arc, Mutex,
};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use rodio::{Decoder, OutputStream, Sink, Source};

/// Anything that can play a cue clip and cut it short.
pub trait CuePlayer: Send + Sync {
    fn play(&self, clip: &Path, max_duration: Duration) -> Result<()>;
    fn stop(&self) -> Result<()>;
}

enum AudioCommand {
    Play { clip: PathBuf, max_duration: Duration },
    Stop,
}

/// Plays cue clips on a dedicated thread holding the non-Send rodio objects.
///
/// A clip that is still playing is not interrupted by a new request.
#[derive(Clone)]
pub struct AudioCueHandle {
    tx: Arc<Mutex<Option<Sender<AudioCommand>>>>,
}

impl AudioCueHandle {
    pub fn new() -> Self {
        Self {
            tx: Arc::new(Mutex::new(None)),
        }
    }

    fn ensure_thread(&self) -> Result<Sender<AudioCommand>> {
        let mut guard = self
            .tx
            .lock()
            .map_err(|_| anyhow!("audio handle lock poisoned"))?;
        if let Some(tx) = guard.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<AudioCommand>();
        thread::Builder::new()
            .name("audio-cues".to_string())
            .spawn(move || {
                let mut _stream: Option<OutputStream> = None;
                let mut sink: Option<Sink> = None;

                fn ensure_sink(stream: &mut Option<OutputStream>, sink: &mut Option<Sink>) -> Result<()> {
                    if sink.is_none() {
                        let (s, handle) = OutputStream::try_default()
                            .context("failed to create audio output stream")?;
                        let new_sink = Sink::try_new(&handle).context("failed to create audio sink")?;
                        *stream = Some(s);
                        *sink = Some(new_sink);
                    }
                    Ok(())
                }

                fn open_clip(clip: &Path) -> Result<Decoder<BufReader<File>>> {
                    let file = File::open(clip)
                        .with_context(|| format!("failed to open {}", clip.display()))?;
                    Decoder::new(BufReader::new(file))
                        .with_context(|| format!("failed to decode {}", clip.display()))
                }

                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        AudioCommand::Play { clip, max_duration } => {
                            if sink.as_ref().map(|s| !s.empty()).unwrap_or(false) {
                                continue;
                            }
                            if let Err(err) = ensure_sink(&mut _stream, &mut sink) {
                                warn!("audio output unavailable: {err:#}");
                                continue;
                            }
                            match open_clip(&clip) {
                                Ok(source) => {
                                    if let Some(ref s) = sink {
                                        s.append(source.take_duration(max_duration));
                                        s.play();
                                    }
                                    info!("playing cue {}", clip.display());
                                }
                                Err(err) => warn!("skipping audio cue: {err:#}"),
                            }
                        }
                        AudioCommand::Stop => {
                            if let Some(ref s) = sink {
                                s.stop();
                            }
                        }
                    }
                }
            })
            .context("failed to spawn audio thread")?;

        *guard = Some(tx.clone());
        Ok(tx)
    }
}

impl Default for AudioCueHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl CuePlayer for AudioCueHandle {
    fn play(&self, clip: &Path, max_duration: Duration) -> Result<()> {
        let tx = self.ensure_thread()?;
        tx.send(AudioCommand::Play {
            clip: clip.to_path_buf(),
            max_duration,
        })
        .map_err(|_| anyhow!("audio thread stopped"))
    }

    fn stop(&self) -> Result<()> {
        if let Ok(Some(tx)) = self.tx.lock().map(|g| g.clone()) {
            let _ = tx.send(AudioCommand::Stop);
        }
        Ok(())
    }
}
