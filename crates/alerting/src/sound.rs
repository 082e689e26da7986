//! Audible alert playback
//!
//! A single background task owns playback. It receives [`SoundCommand`]s,
//! keeps at most one pattern playing, and checks for cancellation between
//! beats.

use crate::AlertConfig;
use dms::AlertLevel;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Sound backend errors
#[derive(Debug, Error)]
pub enum SoundError {
    #[error("Sound backend unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Request sent from the escalator to the sound worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundCommand {
    /// Replace any playing pattern with the one for this level
    Start(AlertLevel),
    /// Silence the playing pattern
    Stop,
}

/// Something that can emit a tone.
///
/// `tone` starts the tone and returns without waiting for it to finish.
pub trait SoundBackend: Send + Sync + 'static {
    fn tone(&self, frequency_hz: u32, duration: Duration) -> Result<(), SoundError>;
}

/// Backend that plays nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBackend;

impl SoundBackend for NullBackend {
    fn tone(&self, _frequency_hz: u32, _duration: Duration) -> Result<(), SoundError> {
        Ok(())
    }
}

/// Rings the terminal bell on stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalBell;

impl SoundBackend for TerminalBell {
    fn tone(&self, _frequency_hz: u32, _duration: Duration) -> Result<(), SoundError> {
        let mut stderr = std::io::stderr().lock();
        stderr.write_all(b"\x07")?;
        stderr.flush()?;
        Ok(())
    }
}

/// Beep pattern for one alert level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeepPattern {
    pub frequency_hz: u32,
    pub tone: Duration,
    pub gap: Duration,
    pub repeats: u32,
}

impl BeepPattern {
    /// Pattern for a level, `None` below [`AlertLevel::Alert`]
    pub fn for_level(level: AlertLevel) -> Option<Self> {
        match level {
            AlertLevel::Normal | AlertLevel::Warning => None,
            AlertLevel::Alert => Some(Self {
                frequency_hz: 1000,
                tone: Duration::from_millis(300),
                gap: Duration::from_millis(200),
                repeats: 2,
            }),
            AlertLevel::Critical => Some(Self {
                frequency_hz: 1500,
                tone: Duration::from_millis(200),
                gap: Duration::from_millis(100),
                repeats: 3,
            }),
        }
    }
}

/// Background playback task
pub struct SoundWorker {
    backend: Arc<dyn SoundBackend>,
    stop_grace: Duration,
}

impl SoundWorker {
    pub fn new(backend: Arc<dyn SoundBackend>, config: &AlertConfig) -> Self {
        Self {
            backend,
            stop_grace: config.stop_grace(),
        }
    }

    /// Spawn the worker on the current runtime.
    ///
    /// The worker exits once every sender is dropped.
    pub fn spawn(self, queue_depth: usize) -> (mpsc::Sender<SoundCommand>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(queue_depth.max(1));
        let handle = tokio::spawn(self.run(rx));
        (tx, handle)
    }

    async fn run(self, mut rx: mpsc::Receiver<SoundCommand>) {
        info!("Sound worker started");
        let mut active: Option<(Arc<AtomicBool>, JoinHandle<()>)> = None;

        while let Some(command) = rx.recv().await {
            match command {
                SoundCommand::Start(level) => {
                    if let Some((playing, handle)) = active.take() {
                        self.stop(playing, handle).await;
                    }

                    let Some(pattern) = BeepPattern::for_level(level) else {
                        continue;
                    };
                    debug!("Playing alert pattern for level {}", level.as_u8());
                    let playing = Arc::new(AtomicBool::new(true));
                    let handle = tokio::spawn(play(self.backend.clone(), pattern, playing.clone()));
                    active = Some((playing, handle));
                }
                SoundCommand::Stop => {
                    if let Some((playing, _)) = &active {
                        playing.store(false, Ordering::SeqCst);
                    }
                }
            }
        }

        if let Some((playing, handle)) = active.take() {
            self.stop(playing, handle).await;
        }
        info!("Sound worker stopped");
    }

    /// Signal a playback task and give it `stop_grace` to finish
    async fn stop(&self, playing: Arc<AtomicBool>, handle: JoinHandle<()>) {
        playing.store(false, Ordering::SeqCst);
        if tokio::time::timeout(self.stop_grace, handle).await.is_err() {
            debug!("Previous alert sound still winding down");
        }
    }
}

async fn play(backend: Arc<dyn SoundBackend>, pattern: BeepPattern, playing: Arc<AtomicBool>) {
    for _ in 0..pattern.repeats {
        if !playing.load(Ordering::SeqCst) {
            break;
        }
        if let Err(e) = backend.tone(pattern.frequency_hz, pattern.tone) {
            warn!("Alert sound unavailable: {}", e);
            break;
        }
        tokio::time::sleep(pattern.tone).await;

        if !playing.load(Ordering::SeqCst) {
            break;
        }
        tokio::time::sleep(pattern.gap).await;
    }
    playing.store(false, Ordering::SeqCst);
}
