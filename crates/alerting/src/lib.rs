//! Alerting System
//!
//! Maps drowsiness results to alert types and drives the audible
//! notification. The escalator is synchronous; sound playback runs as a
//! separate tokio task fed over a channel.

mod escalator;
pub mod sound;

pub use escalator::{AlertEscalator, AlertOutcome, AlertState, AlertType};
pub use sound::{BeepPattern, NullBackend, SoundBackend, SoundCommand, SoundError, SoundWorker, TerminalBell};

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Alerting errors
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("Sound worker has shut down")]
    WorkerClosed,

    #[error("Sound command queue is full")]
    QueueFull,
}

/// Alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Play sounds on escalation
    pub sound_enabled: bool,
    /// How long a new sound waits for the previous one to stop (milliseconds)
    pub stop_grace_ms: u64,
    /// Pending sound commands before new ones are dropped
    pub queue_depth: usize,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            stop_grace_ms: 100,
            queue_depth: 16,
        }
    }
}

impl AlertConfig {
    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }
}
