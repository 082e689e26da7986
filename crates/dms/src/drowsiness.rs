//! Drowsiness detection
//!
//! Fuses the filtered eye signal, PERCLOS and head distraction into one
//! score per frame and grades it into an [`AlertLevel`].

use crate::analysis::{AlertLevel, DrowsinessResult};
use crate::config::DmsConfig;
use crate::detector::FrameObservation;
use crate::head::HeadMotion;
use crate::perclos::PerclosWindow;
use crate::state::EyeClosureTracker;
use crate::DmsError;
use signal_filter::TemporalFilter;
use tracing::debug;

const PERCLOS_WEIGHT: f64 = 0.4;
const CLOSED_WEIGHT: f64 = 0.4;
const DISTRACTION_WEIGHT: f64 = 0.2;

/// EAR assigned per detected eye
const EAR_PER_EYE: f64 = 0.15;
/// Ceiling of the eye-count EAR estimate
const MAX_ESTIMATED_EAR: f64 = 0.3;

/// Approximate EAR from the smoothed eye count.
///
/// Two visible eyes map to a fully open 0.3, none to 0.0.
pub fn estimate_ear(filtered_eye_count: f64) -> f64 {
    (filtered_eye_count * EAR_PER_EYE).min(MAX_ESTIMATED_EAR)
}

/// Weighted drowsiness score, in [0, 1]
pub fn fuse_score(perclos: f64, eyes_closed: bool, head_distracted: bool) -> f64 {
    let closed = if eyes_closed { 1.0 } else { 0.0 };
    let distracted = if head_distracted { 1.0 } else { 0.0 };
    (PERCLOS_WEIGHT * perclos + CLOSED_WEIGHT * closed + DISTRACTION_WEIGHT * distracted).clamp(0.0, 1.0)
}

/// Drowsiness state machine
pub struct DrowsinessDetector {
    ear_filter: TemporalFilter,
    perclos: PerclosWindow,
    closure: EyeClosureTracker,
}

impl DrowsinessDetector {
    pub fn new(config: &DmsConfig) -> Result<Self, DmsError> {
        Ok(Self {
            ear_filter: TemporalFilter::with_params(
                config.ear_filter_size,
                config.ewma_alpha,
                config.filter_mode,
            )?,
            perclos: PerclosWindow::new(config.perclos_window_s, config.ear_threshold),
            closure: EyeClosureTracker::new(config.ear_threshold, config.eye_closed_time_threshold_s),
        })
    }

    /// Fail if `timestamp` is older than the last accepted frame
    pub fn check_timestamp(&self, timestamp: f64) -> Result<(), DmsError> {
        self.perclos.check_timestamp(timestamp)
    }

    /// Analyze one frame.
    ///
    /// Without a face the result is neutral and no internal state changes.
    pub fn update(
        &mut self,
        observation: &FrameObservation,
        head: &HeadMotion,
    ) -> Result<DrowsinessResult, DmsError> {
        if !observation.face_detected {
            return Ok(DrowsinessResult::neutral());
        }

        let now = observation.timestamp;
        self.check_timestamp(now)?;

        let ear = self.ear_filter.update(estimate_ear(observation.filtered_eye_count));
        let perclos = self.perclos.update(ear, now)?;
        let closure = self.closure.update(ear, now);

        let eyes_closed = closure.is_closed();
        let drowsiness_score = fuse_score(perclos, eyes_closed, head.head_distracted);
        let alert_level = AlertLevel::from_score(drowsiness_score);

        debug!(
            "ear={:.3} perclos={:.3} closed={} score={:.2} level={}",
            ear,
            perclos,
            eyes_closed,
            drowsiness_score,
            alert_level.as_u8()
        );

        Ok(DrowsinessResult {
            ear,
            perclos,
            eyes_closed,
            head_distracted: head.head_distracted,
            drowsiness_score,
            alert_level,
            eye_closed_duration: self.closure.closed_duration(now),
        })
    }

    /// Set the EAR threshold for both hysteresis and PERCLOS
    pub fn set_ear_threshold(&mut self, threshold: f64) {
        self.closure.set_ear_threshold(threshold);
        self.perclos.set_threshold(threshold);
    }

    pub fn ear_threshold(&self) -> f64 {
        self.closure.ear_threshold()
    }

    pub fn ear_filter(&self) -> &TemporalFilter {
        &self.ear_filter
    }

    pub fn perclos(&self) -> &PerclosWindow {
        &self.perclos
    }

    pub fn closure(&self) -> &EyeClosureTracker {
        &self.closure
    }

    /// Reset state (on driver change)
    pub fn reset(&mut self) {
        self.ear_filter.reset();
        self.perclos.reset();
        self.closure.reset();
    }
}
