//! Per-driver EAR threshold calibration

use crate::config::DmsConfig;
use crate::detector::{DetectionSource, FrameObservation, Point};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// EAR threshold granted per average detected eye
const EAR_PER_EYE: f64 = 0.125;
/// Highest threshold calibration may produce
const MAX_EAR_THRESHOLD: f64 = 0.25;

/// Calibration outcome
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub ear_threshold: f64,
    /// Last face centre seen while sampling
    pub base_face_center: Point,
    /// Frames with a face
    pub samples: usize,
}

/// Calibration result plus the frame that ended sampling
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationOutcome {
    pub result: Option<CalibrationResult>,
    /// First frame at or past the end of the window, not sampled
    pub next_frame: Option<FrameObservation>,
}

/// One-shot threshold calibration.
///
/// Samples the detection source for a fixed duration while the driver looks
/// straight ahead. Owns the source for the whole interval.
#[derive(Debug, Clone)]
pub struct Calibrator {
    duration: Duration,
}

impl Calibrator {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    pub fn from_config(config: &DmsConfig) -> Self {
        Self::new(config.calibration_duration())
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Sample the source and derive a threshold.
    ///
    /// Blocks until the duration elapses or the source ends. Returns `None`
    /// if no face was seen; the caller keeps its previous threshold.
    pub fn calibrate(&self, source: &mut dyn DetectionSource) -> Option<CalibrationResult> {
        self.sample(source).result
    }

    /// Like [`Calibrator::calibrate`], but also returns the first frame past
    /// the sampling window so the caller can monitor it.
    ///
    /// Sampling ends when either the wall clock or the frame timestamps
    /// (measured from the first frame) cover the duration. Recorded streams
    /// replayed faster than real time are cut by their timestamps.
    pub fn sample(&self, source: &mut dyn DetectionSource) -> CalibrationOutcome {
        info!("Starting calibration for {:?}", self.duration);

        let window = self.duration.as_secs_f64();
        let mut samples: Vec<(u32, Point)> = Vec::new();
        let mut first_timestamp: Option<f64> = None;
        let mut next_frame = None;
        let start = Instant::now();

        while start.elapsed() < self.duration {
            match source.next_observation() {
                Ok(Some(observation)) => {
                    let first = *first_timestamp.get_or_insert(observation.timestamp);
                    if observation.timestamp - first >= window {
                        next_frame = Some(observation);
                        break;
                    }
                    if let Some(center) = observation.face_center() {
                        samples.push((observation.eye_count, center));
                    }
                }
                Ok(None) => {
                    warn!("Detection source ended during calibration");
                    break;
                }
                Err(e) => {
                    warn!("Skipping frame during calibration: {}", e);
                }
            }
        }

        let result = Self::derive(&samples);
        match &result {
            Some(r) => info!(
                "Calibration complete: ear_threshold={:.3} from {} samples",
                r.ear_threshold, r.samples
            ),
            None => warn!("Calibration failed: no face detected"),
        }
        CalibrationOutcome { result, next_frame }
    }

    /// Derive the threshold from (eye_count, face_center) samples
    pub fn derive(samples: &[(u32, Point)]) -> Option<CalibrationResult> {
        let &(_, base_face_center) = samples.last()?;

        let mean_eyes = samples.iter().map(|&(eyes, _)| eyes as f64).sum::<f64>() / samples.len() as f64;

        Some(CalibrationResult {
            ear_threshold: (mean_eyes * EAR_PER_EYE).min(MAX_EAR_THRESHOLD),
            base_face_center,
            samples: samples.len(),
        })
    }
}

impl Default for Calibrator {
    fn default() -> Self {
        Self::from_config(&DmsConfig::default())
    }
}
