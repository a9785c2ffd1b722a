pub mod audio;
pub mod capture;
pub mod challenge;
pub mod classifier;
pub mod cli;
pub mod controls;
pub mod db;
pub mod events;
pub mod kiosk;
pub mod leaderboard;
pub mod models;
pub mod presenter;
pub mod session;
pub mod settings;
pub mod timer;
pub mod utils;
pub mod voting;
pub mod zone;

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::sync::oneshot;

use audio::{AudioCueHandle, CueLibrary};
use capture::{CaptureController, DirectoryFrameSource};
use classifier::{EmotionClassifier, HttpClassifier};
use cli::Args;
use events::KioskEvent;
use kiosk::{spawn_kiosk, KioskParts};
use leaderboard::{HttpLeaderboard, LeaderboardService, LocalLeaderboard};
use settings::{KioskConfig, LeaderboardSettings};

fn init_logging() {
    let level = if utils::logging::debug_mode() {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}

fn open_leaderboard(settings: &LeaderboardSettings) -> Result<Arc<dyn LeaderboardService>> {
    Ok(match settings {
        LeaderboardSettings::Http { url } => {
            info!("using leaderboard service at {url}");
            Arc::new(HttpLeaderboard::new(url.clone()))
        }
        LeaderboardSettings::Local { path } => Arc::new(
            LocalLeaderboard::open(path.clone())
                .with_context(|| format!("failed to open leaderboard {}", path.display()))?,
        ),
    })
}

pub async fn run(args: Args) -> Result<()> {
    init_logging();

    let mut config = KioskConfig::load(args.config.as_deref())?;
    args.apply(&mut config);
    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    log::info!("Emotion kiosk starting up...");

    let board = open_leaderboard(&config.leaderboard)?;
    let (kiosk, kiosk_task) = spawn_kiosk(KioskParts {
        timings: config.timings.clone(),
        voting: config.voting.clone(),
        challenge: config.challenge.clone(),
        leaderboard: board.clone(),
        seed: config.seed,
    });
    presenter::spawn_event_printer(kiosk.subscribe());

    if config.audio.enabled {
        let library = CueLibrary::scan(&config.audio.dir);
        if library.is_empty() {
            warn!("no audio cues under {}, running silent", config.audio.dir.display());
        } else {
            audio::spawn_cue_listener(
                kiosk.subscribe(),
                library,
                Arc::new(AudioCueHandle::new()),
                config.audio.max_duration(),
            );
        }
    }

    let entries = leaderboard::fetch_entries(board.clone()).await;
    kiosk.events().emit(KioskEvent::LeaderboardUpdated { entries });

    let mut capture = CaptureController::new();
    match &config.frames_dir {
        Some(dir) => {
            let source = DirectoryFrameSource::open(dir, config.loop_frames)?;
            let classifier =
                HttpClassifier::new(config.classifier.url.clone(), config.classifier.timeout());
            let classifier: Arc<dyn EmotionClassifier> = Arc::new(classifier);
            let probe = classifier.clone();
            if !tokio::task::spawn_blocking(move || probe.is_healthy()).await? {
                warn!(
                    "classifier at {} is not answering yet, frames count as empty until it does",
                    config.classifier.url
                );
            }
            capture.start(
                Box::new(source),
                classifier,
                kiosk.inbox(),
                kiosk.tickets(),
                config.capture.clone(),
            )?;
        }
        None => warn!("no frames directory configured, only manual controls are active"),
    }

    if let Some(player) = args.challenge.clone() {
        kiosk.start_challenge(player)?;
    }

    let (quit_tx, quit_rx) = oneshot::channel();
    controls::spawn_stdin_controls(kiosk.clone(), board, quit_tx);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("interrupted"),
        Ok(()) = quit_rx => info!("quit requested"),
    }

    capture.stop().await?;
    if kiosk.shutdown().is_ok() {
        kiosk_task.await.context("kiosk task failed to join")?;
    }
    info!("Emotion kiosk stopped");
    Ok(())
}
