//! Monitoring session
//!
//! Runs the per-frame pipeline: head tracking, drowsiness detection, then
//! alert escalation. Everything is synchronous; only the sound worker behind
//! the escalator runs elsewhere.

use alerting::{AlertEscalator, AlertOutcome, AlertState};
use chrono::{DateTime, Utc};
use dms::{
    AlertLevel, CalibrationOutcome, CalibrationResult, Calibrator, DetectionSource, DmsConfig, DmsError,
    DrowsinessDetector, DrowsinessResult, FrameObservation, HeadMotion, HeadTracker,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Everything produced for one frame
#[derive(Debug, Clone, Serialize)]
pub struct FrameReport {
    pub frame: u64,
    pub timestamp: f64,
    pub face_detected: bool,
    pub head: HeadMotion,
    pub drowsiness: DrowsinessResult,
    /// Absent for frames without a face; the escalator is not consulted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<AlertOutcome>,
    pub alert_state: AlertState,
}

/// End-of-session statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub frames: u64,
    pub frames_without_face: u64,
    pub rejected_frames: u64,
    pub peak_level: AlertLevel,
    pub notifications: usize,
    pub ear_threshold: f64,
}

/// One driver monitoring session
pub struct MonitoringSession {
    id: Uuid,
    started_at: DateTime<Utc>,
    head: HeadTracker,
    drowsiness: DrowsinessDetector,
    escalator: AlertEscalator,
    calibrator: Calibrator,
    frames: u64,
    frames_without_face: u64,
    rejected_frames: u64,
    peak_level: AlertLevel,
}

impl MonitoringSession {
    pub fn new(config: &DmsConfig, escalator: AlertEscalator) -> Result<Self, DmsError> {
        config.validate()?;
        let id = Uuid::new_v4();
        info!("Starting monitoring session {}", id);

        Ok(Self {
            id,
            started_at: Utc::now(),
            head: HeadTracker::new(config)?,
            drowsiness: DrowsinessDetector::new(config)?,
            escalator,
            calibrator: Calibrator::from_config(config),
            frames: 0,
            frames_without_face: 0,
            rejected_frames: 0,
            peak_level: AlertLevel::Normal,
        })
    }

    /// Process one frame.
    ///
    /// A frame older than the last accepted one is rejected before any
    /// component sees it.
    pub fn process(&mut self, observation: &FrameObservation) -> Result<FrameReport, DmsError> {
        if observation.face_detected {
            if let Err(e) = self.drowsiness.check_timestamp(observation.timestamp) {
                self.rejected_frames += 1;
                return Err(e);
            }
        }

        let head = self.head.track(observation);
        let drowsiness = self.drowsiness.update(observation, &head)?;

        let alert = if observation.face_detected {
            Some(self.escalator.evaluate(&drowsiness))
        } else {
            self.frames_without_face += 1;
            None
        };

        self.frames += 1;
        self.peak_level = self.peak_level.max(drowsiness.alert_level);

        Ok(FrameReport {
            frame: self.frames,
            timestamp: observation.timestamp,
            face_detected: observation.face_detected,
            head,
            drowsiness,
            alert,
            alert_state: self.escalator.state(),
        })
    }

    /// Calibrate against `source` and apply the result.
    ///
    /// On failure the current threshold is kept.
    pub fn calibrate(&mut self, source: &mut dyn DetectionSource) -> Option<CalibrationResult> {
        self.calibrate_stream(source).result
    }

    /// Calibrate and return the first unsampled frame for monitoring
    pub fn calibrate_stream(&mut self, source: &mut dyn DetectionSource) -> CalibrationOutcome {
        let outcome = self.calibrator.sample(source);
        if let Some(result) = &outcome.result {
            self.apply_calibration(result);
        }
        outcome
    }

    pub fn apply_calibration(&mut self, result: &CalibrationResult) {
        self.drowsiness.set_ear_threshold(result.ear_threshold);
        self.head.set_baseline(Some(result.base_face_center));
    }

    /// Takes effect from the next frame
    pub fn set_ear_threshold(&mut self, threshold: f64) {
        info!("EAR threshold set to {:.3}", threshold);
        self.drowsiness.set_ear_threshold(threshold);
    }

    /// Takes effect from the next frame
    pub fn set_movement_threshold(&mut self, threshold: f64) {
        info!("Head movement threshold set to {:.1}", threshold);
        self.head.set_movement_threshold(threshold);
    }

    /// Raise an alert from outside the vision pipeline
    pub fn trigger_external(&mut self, label: impl Into<String>, level: AlertLevel) -> AlertOutcome {
        let outcome = self.escalator.trigger_external(label, level);
        self.peak_level = self.peak_level.max(level);
        outcome
    }

    pub fn ear_threshold(&self) -> f64 {
        self.drowsiness.ear_threshold()
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn head(&self) -> &HeadTracker {
        &self.head
    }

    pub fn drowsiness(&self) -> &DrowsinessDetector {
        &self.drowsiness
    }

    pub fn alert_state(&self) -> AlertState {
        self.escalator.state()
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.id,
            started_at: self.started_at,
            ended_at: Utc::now(),
            frames: self.frames,
            frames_without_face: self.frames_without_face,
            rejected_frames: self.rejected_frames,
            peak_level: self.peak_level,
            notifications: self.escalator.notification_count(),
            ear_threshold: self.ear_threshold(),
        }
    }
}
