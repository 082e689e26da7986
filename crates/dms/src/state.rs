//! Eye-closure hysteresis
//!
//! A low EAR must persist longer than the closure threshold before the eyes
//! count as closed, so ordinary blinks never register. Reopening is
//! immediate.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Eye-closure state
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EyeClosureState {
    #[default]
    Open,
    /// EAR below threshold, timer running
    Closing { since: f64 },
    /// Closure held past the duration threshold
    Closed { since: f64 },
}

impl EyeClosureState {
    /// Time the current low-EAR run started
    pub fn since(&self) -> Option<f64> {
        match *self {
            EyeClosureState::Open => None,
            EyeClosureState::Closing { since } | EyeClosureState::Closed { since } => Some(since),
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, EyeClosureState::Closed { .. })
    }
}

/// Hysteresis state machine over the filtered EAR signal
#[derive(Debug, Clone)]
pub struct EyeClosureTracker {
    ear_threshold: f64,
    /// Seconds
    closed_duration_threshold: f64,
    state: EyeClosureState,
}

impl EyeClosureTracker {
    pub fn new(ear_threshold: f64, closed_duration_threshold: f64) -> Self {
        Self {
            ear_threshold,
            closed_duration_threshold,
            state: EyeClosureState::Open,
        }
    }

    /// Advance the state machine with the EAR observed at `now`
    pub fn update(&mut self, ear: f64, now: f64) -> EyeClosureState {
        let below = ear < self.ear_threshold;

        let next = match (self.state, below) {
            (_, false) => EyeClosureState::Open,
            (EyeClosureState::Open, true) => EyeClosureState::Closing { since: now },
            (EyeClosureState::Closing { since }, true) => {
                if now - since > self.closed_duration_threshold {
                    EyeClosureState::Closed { since }
                } else {
                    EyeClosureState::Closing { since }
                }
            }
            (closed @ EyeClosureState::Closed { .. }, true) => closed,
        };

        if std::mem::discriminant(&next) != std::mem::discriminant(&self.state) {
            debug!("Eye closure {:?} -> {:?} (ear {:.3})", self.state, next, ear);
        }
        self.state = next;
        next
    }

    pub fn state(&self) -> EyeClosureState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }

    /// Seconds since the current low-EAR run started (0 when open)
    pub fn closed_duration(&self, now: f64) -> f64 {
        self.state.since().map(|since| (now - since).max(0.0)).unwrap_or(0.0)
    }

    pub fn ear_threshold(&self) -> f64 {
        self.ear_threshold
    }

    pub fn set_ear_threshold(&mut self, threshold: f64) {
        self.ear_threshold = threshold;
    }

    pub fn closed_duration_threshold(&self) -> f64 {
        self.closed_duration_threshold
    }

    /// Reset state (on driver change)
    pub fn reset(&mut self) {
        self.state = EyeClosureState::Open;
    }
}
