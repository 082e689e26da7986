//! Detector boundary
//!
//! The monitor never looks at pixels. Face and eye detection live behind
//! [`DetectionSource`], which hands over one [`FrameObservation`] per frame.

use crate::DmsError;
use serde::{Deserialize, Serialize};

/// 2-D point in image coordinates (pixels)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Face bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl FaceBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Exact centre of the box. Not floored to whole pixels, so odd sizes
    /// land on a half pixel.
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Detector output for a single frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameObservation {
    /// Capture time (seconds, monotonic within a session)
    pub timestamp: f64,
    pub face_detected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_box: Option<FaceBox>,
    /// Eyes found in the current frame
    #[serde(default)]
    pub eye_count: u32,
    /// Eye count smoothed by the detector
    #[serde(default)]
    pub filtered_eye_count: f64,
}

impl FrameObservation {
    /// Frame in which no face was found
    pub fn no_face(timestamp: f64) -> Self {
        Self {
            timestamp,
            face_detected: false,
            face_box: None,
            eye_count: 0,
            filtered_eye_count: 0.0,
        }
    }

    /// Frame with a detected face
    pub fn with_face(timestamp: f64, face_box: FaceBox, eye_count: u32, filtered_eye_count: f64) -> Self {
        Self {
            timestamp,
            face_detected: true,
            face_box: Some(face_box),
            eye_count,
            filtered_eye_count,
        }
    }

    /// Head position for this frame, if a face was found
    pub fn face_center(&self) -> Option<Point> {
        if !self.face_detected {
            return None;
        }
        self.face_box.map(|b| b.center())
    }
}

/// Source of per-frame detections (camera + detector, or a recording).
pub trait DetectionSource {
    /// Pull the next frame's detection.
    ///
    /// `Ok(None)` means the stream has ended. An `Err` is a failed frame; the
    /// caller may skip it and keep pulling.
    fn next_observation(&mut self) -> Result<Option<FrameObservation>, DmsError>;
}
