//! Driver Monitoring System (DMS)
//!
//! Temporal inference over per-frame face/eye detections:
//! - Eye openness smoothing and PERCLOS estimation
//! - Eye-closure hysteresis (blink suppression)
//! - Head displacement tracking
//! - Drowsiness score fusion and alert level grading
//! - One-shot EAR threshold calibration

pub mod analysis;
pub mod calibration;
pub mod config;
pub mod detector;
pub mod drowsiness;
pub mod head;
pub mod perclos;
pub mod state;

pub use analysis::{AlertLevel, DrowsinessResult};
pub use calibration::{CalibrationOutcome, CalibrationResult, Calibrator};
pub use config::DmsConfig;
pub use detector::{DetectionSource, FaceBox, FrameObservation, Point};
pub use drowsiness::{estimate_ear, fuse_score, DrowsinessDetector};
pub use head::{BaselineMode, HeadMotion, HeadTracker};
pub use perclos::PerclosWindow;
pub use state::{EyeClosureState, EyeClosureTracker};

use signal_filter::FilterError;
use thiserror::Error;

/// DMS error types
#[derive(Error, Debug)]
pub enum DmsError {
    #[error("Timestamp {timestamp} is older than newest sample {newest}")]
    NonMonotonicTimestamp { timestamp: f64, newest: f64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    #[error("Detection failed: {0}")]
    Detection(String),

    #[error("Invalid alert level: {0}")]
    InvalidAlertLevel(u8),
}
