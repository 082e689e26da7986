//! Drowsiness analysis results

use crate::DmsError;
use serde::{Deserialize, Serialize};

/// Graded alert level, ordered by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum AlertLevel {
    #[default]
    Normal = 0,
    Warning = 1,
    Alert = 2,
    Critical = 3,
}

impl AlertLevel {
    /// Grade a fused drowsiness score (thresholds are exclusive)
    pub fn from_score(score: f64) -> Self {
        if score > 0.7 {
            AlertLevel::Critical
        } else if score > 0.5 {
            AlertLevel::Alert
        } else if score > 0.3 {
            AlertLevel::Warning
        } else {
            AlertLevel::Normal
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Normal => "normal",
            AlertLevel::Warning => "warning",
            AlertLevel::Alert => "alert",
            AlertLevel::Critical => "critical",
        }
    }
}

impl From<AlertLevel> for u8 {
    fn from(level: AlertLevel) -> Self {
        level.as_u8()
    }
}

impl TryFrom<u8> for AlertLevel {
    type Error = DmsError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AlertLevel::Normal),
            1 => Ok(AlertLevel::Warning),
            2 => Ok(AlertLevel::Alert),
            3 => Ok(AlertLevel::Critical),
            other => Err(DmsError::InvalidAlertLevel(other)),
        }
    }
}

/// Per-frame drowsiness output
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DrowsinessResult {
    /// Filtered eye-openness signal
    pub ear: f64,

    /// Closed ratio over the PERCLOS window, in [0, 1]
    pub perclos: f64,

    /// Eye-closure hysteresis reports closed
    pub eyes_closed: bool,

    /// Head tracker reports distraction
    pub head_distracted: bool,

    /// Fused score, in [0, 1]
    pub drowsiness_score: f64,

    pub alert_level: AlertLevel,

    /// Seconds since the current low-EAR run started
    pub eye_closed_duration: f64,
}

impl DrowsinessResult {
    /// Zero result reported while no face is visible
    pub fn neutral() -> Self {
        Self::default()
    }

    pub fn is_neutral(&self) -> bool {
        *self == Self::neutral()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_thresholds() {
        assert_eq!(AlertLevel::from_score(0.0), AlertLevel::Normal);
        assert_eq!(AlertLevel::from_score(0.3), AlertLevel::Normal);
        assert_eq!(AlertLevel::from_score(0.31), AlertLevel::Warning);
        assert_eq!(AlertLevel::from_score(0.5), AlertLevel::Warning);
        assert_eq!(AlertLevel::from_score(0.6), AlertLevel::Alert);
        assert_eq!(AlertLevel::from_score(0.7), AlertLevel::Alert);
        assert_eq!(AlertLevel::from_score(1.0), AlertLevel::Critical);
    }

    #[test]
    fn test_level_ordering() {
        assert!(AlertLevel::Critical > AlertLevel::Alert);
        assert!(AlertLevel::Warning > AlertLevel::Normal);
    }

    #[test]
    fn test_level_serializes_as_integer() {
        let json = serde_json::to_string(&AlertLevel::Alert).unwrap();
        assert_eq!(json, "2");

        let level: AlertLevel = serde_json::from_str("3").unwrap();
        assert_eq!(level, AlertLevel::Critical);
        assert!(serde_json::from_str::<AlertLevel>("7").is_err());
    }

    #[test]
    fn test_neutral() {
        let result = DrowsinessResult::neutral();
        assert_eq!(result.drowsiness_score, 0.0);
        assert_eq!(result.alert_level, AlertLevel::Normal);
        assert!(result.is_neutral());
    }
}
