//! DMS configuration

use crate::head::BaselineMode;
use crate::DmsError;
use serde::{Deserialize, Serialize};
use signal_filter::FilterMode;
use std::time::Duration;

/// DMS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DmsConfig {
    /// EAR below which the eye counts as closed
    pub ear_threshold: f64,

    /// Continuous closure before eyes are reported closed (seconds)
    pub eye_closed_time_threshold_s: f64,

    /// PERCLOS trailing window (seconds)
    pub perclos_window_s: f64,

    /// EAR smoothing history (samples)
    pub ear_filter_size: usize,

    /// Estimate reported by the smoothing filters
    pub filter_mode: FilterMode,

    /// EWMA smoothing factor, in (0, 1)
    pub ewma_alpha: f64,

    /// Filtered head displacement above which the driver is distracted (pixels)
    pub head_movement_threshold: f64,

    /// Face-centre history used for the head baseline (frames)
    pub head_history_size: usize,

    /// Head movement smoothing history (samples)
    pub movement_filter_size: usize,

    /// Reference point for head displacement
    pub baseline_mode: BaselineMode,

    /// Calibration sampling time (seconds)
    pub calibration_duration_s: f64,
}

impl Default for DmsConfig {
    fn default() -> Self {
        Self {
            ear_threshold: 0.2,
            eye_closed_time_threshold_s: 2.0,
            perclos_window_s: 60.0,
            ear_filter_size: 5,
            filter_mode: FilterMode::MovingAverage,
            ewma_alpha: 0.3,
            head_movement_threshold: 50.0,
            head_history_size: 10,
            movement_filter_size: 3,
            baseline_mode: BaselineMode::Rolling,
            calibration_duration_s: 5.0,
        }
    }
}

impl DmsConfig {
    /// Create strict config (lower thresholds)
    pub fn strict() -> Self {
        Self {
            eye_closed_time_threshold_s: 1.5,
            head_movement_threshold: 35.0,
            ..Default::default()
        }
    }

    /// Create lenient config (higher thresholds)
    pub fn lenient() -> Self {
        Self {
            eye_closed_time_threshold_s: 3.0,
            head_movement_threshold: 70.0,
            ..Default::default()
        }
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<(), DmsError> {
        if !(self.ear_threshold > 0.0) {
            return Err(DmsError::Config(format!(
                "ear_threshold must be positive, got {}",
                self.ear_threshold
            )));
        }
        if !(self.eye_closed_time_threshold_s >= 0.0) {
            return Err(DmsError::Config(
                "eye_closed_time_threshold_s must not be negative".into(),
            ));
        }
        if !(self.perclos_window_s > 0.0) {
            return Err(DmsError::Config("perclos_window_s must be positive".into()));
        }
        if self.ear_filter_size == 0 || self.movement_filter_size == 0 || self.head_history_size == 0 {
            return Err(DmsError::Config("filter and history sizes must be non-zero".into()));
        }
        if !(self.ewma_alpha > 0.0 && self.ewma_alpha < 1.0) {
            return Err(DmsError::Config(format!(
                "ewma_alpha must be in (0, 1), got {}",
                self.ewma_alpha
            )));
        }
        if !(self.head_movement_threshold >= 0.0) {
            return Err(DmsError::Config(
                "head_movement_threshold must not be negative".into(),
            ));
        }
        if !(self.calibration_duration_s >= 0.0) {
            return Err(DmsError::Config(
                "calibration_duration_s must not be negative".into(),
            ));
        }
        Ok(())
    }

    pub fn calibration_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.calibration_duration_s).unwrap_or(Duration::ZERO)
    }
}
