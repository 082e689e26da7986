//! Head displacement tracking

use crate::config::DmsConfig;
use crate::detector::{FrameObservation, Point};
use crate::DmsError;
use serde::{Deserialize, Serialize};
use signal_filter::{BoundedHistory, TemporalFilter};
use tracing::debug;

/// Reference point for head displacement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineMode {
    /// Oldest face centre in the history; drifts as frames are evicted
    #[default]
    Rolling,
    /// Fixed centre set from calibration; rolling until one is set
    Calibrated,
}

/// Head displacement for one frame
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HeadMotion {
    /// Raw displacement from the baseline (pixels)
    pub movement: f64,
    /// Smoothed displacement (pixels)
    pub filtered_movement: f64,
    pub dx: f64,
    pub dy: f64,
    pub head_distracted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_center: Option<Point>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_center: Option<Point>,
}

impl HeadMotion {
    /// No movement, not distracted
    pub fn still() -> Self {
        Self::default()
    }
}

/// Bounded-history positional deviation detector
pub struct HeadTracker {
    history: BoundedHistory<Point>,
    movement_filter: TemporalFilter,
    movement_threshold: f64,
    baseline_mode: BaselineMode,
    fixed_baseline: Option<Point>,
}

impl HeadTracker {
    pub fn new(config: &DmsConfig) -> Result<Self, DmsError> {
        Ok(Self {
            history: BoundedHistory::new(config.head_history_size),
            movement_filter: TemporalFilter::with_params(
                config.movement_filter_size,
                config.ewma_alpha,
                config.filter_mode,
            )?,
            movement_threshold: config.head_movement_threshold,
            baseline_mode: config.baseline_mode,
            fixed_baseline: None,
        })
    }

    /// Track the head position of one frame
    pub fn track(&mut self, observation: &FrameObservation) -> HeadMotion {
        let Some(current) = observation.face_center() else {
            return HeadMotion::still();
        };

        self.history.push(current);

        let base = match (self.baseline_mode, self.fixed_baseline) {
            (BaselineMode::Calibrated, Some(fixed)) => fixed,
            _ => {
                if self.history.len() < 2 {
                    return HeadMotion::still();
                }
                match self.history.front() {
                    Some(&oldest) => oldest,
                    None => return HeadMotion::still(),
                }
            }
        };

        let dx = current.x - base.x;
        let dy = current.y - base.y;
        let movement = base.distance(&current);
        let filtered_movement = self.movement_filter.update(movement);
        let head_distracted = filtered_movement > self.movement_threshold;

        if head_distracted {
            debug!(
                "Head displaced {:.1}px (threshold {:.1}px)",
                filtered_movement, self.movement_threshold
            );
        }

        HeadMotion {
            movement,
            filtered_movement,
            dx,
            dy,
            head_distracted,
            base_center: Some(base),
            current_center: Some(current),
        }
    }

    pub fn set_movement_threshold(&mut self, threshold: f64) {
        self.movement_threshold = threshold;
    }

    pub fn movement_threshold(&self) -> f64 {
        self.movement_threshold
    }

    /// Pin the baseline used in [`BaselineMode::Calibrated`]
    pub fn set_baseline(&mut self, center: Option<Point>) {
        self.fixed_baseline = center;
    }

    pub fn baseline_mode(&self) -> BaselineMode {
        self.baseline_mode
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.movement_filter.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::FaceBox;

    fn face_at(t: f64, cx: f64, cy: f64) -> FrameObservation {
        FrameObservation::with_face(t, FaceBox::new(cx - 50.0, cy - 50.0, 100.0, 100.0), 2, 2.0)
    }

    #[test]
    fn test_single_frame_is_still() {
        let mut tracker = HeadTracker::new(&DmsConfig::default()).unwrap();
        let motion = tracker.track(&face_at(0.0, 320.0, 240.0));

        assert_eq!(motion, HeadMotion::still());
        assert_eq!(tracker.history_len(), 1);
    }

    #[test]
    fn test_no_face_does_not_touch_history() {
        let mut tracker = HeadTracker::new(&DmsConfig::default()).unwrap();
        tracker.track(&face_at(0.0, 320.0, 240.0));

        let motion = tracker.track(&FrameObservation::no_face(0.1));
        assert!(!motion.head_distracted);
        assert_eq!(tracker.history_len(), 1);
    }

    #[test]
    fn test_movement_from_oldest() {
        let mut tracker = HeadTracker::new(&DmsConfig::default()).unwrap();
        tracker.track(&face_at(0.0, 0.0, 0.0));
        let motion = tracker.track(&face_at(0.1, 30.0, 40.0));

        assert_eq!(motion.movement, 50.0);
        assert_eq!(motion.dx, 30.0);
        assert_eq!(motion.dy, 40.0);
        assert_eq!(motion.filtered_movement, 50.0);
        // 50 is not above the 50px threshold
        assert!(!motion.head_distracted);
    }

    #[test]
    fn test_sustained_displacement_distracts() {
        let mut tracker = HeadTracker::new(&DmsConfig::default()).unwrap();
        tracker.track(&face_at(0.0, 0.0, 0.0));

        let mut motion = HeadMotion::still();
        for i in 1..4 {
            motion = tracker.track(&face_at(i as f64 * 0.1, 80.0, 0.0));
        }
        assert!(motion.head_distracted);
    }

    #[test]
    fn test_rolling_baseline_drifts() {
        let config = DmsConfig {
            head_history_size: 3,
            ..Default::default()
        };
        let mut tracker = HeadTracker::new(&config).unwrap();
        tracker.track(&face_at(0.0, 0.0, 0.0));

        // After three frames at the new spot the old position is evicted
        let mut motion = HeadMotion::still();
        for i in 1..=3 {
            motion = tracker.track(&face_at(i as f64, 100.0, 0.0));
        }
        assert_eq!(motion.movement, 0.0);
        assert_eq!(motion.base_center, Some(Point::new(100.0, 0.0)));
    }

    #[test]
    fn test_calibrated_baseline_is_fixed() {
        let config = DmsConfig {
            head_history_size: 3,
            baseline_mode: BaselineMode::Calibrated,
            ..Default::default()
        };
        let mut tracker = HeadTracker::new(&config).unwrap();
        tracker.set_baseline(Some(Point::new(0.0, 0.0)));

        let mut motion = HeadMotion::still();
        for i in 0..6 {
            motion = tracker.track(&face_at(i as f64, 100.0, 0.0));
        }
        assert_eq!(motion.movement, 100.0);
        assert!(motion.head_distracted);
    }

    #[test]
    fn test_threshold_setter() {
        let mut tracker = HeadTracker::new(&DmsConfig::default()).unwrap();
        tracker.set_movement_threshold(10.0);
        tracker.track(&face_at(0.0, 0.0, 0.0));

        assert!(tracker.track(&face_at(0.1, 20.0, 0.0)).head_distracted);
    }
}
