//! PERCLOS (Percentage of Eye Closure) over a trailing time window

use crate::DmsError;
use std::collections::VecDeque;

/// Default PERCLOS window (seconds)
pub const DEFAULT_WINDOW_SECONDS: f64 = 60.0;

/// Time-windowed closed-eye ratio estimator.
///
/// Timestamps must be non-decreasing across updates. An older timestamp is
/// rejected before anything is recorded.
#[derive(Debug, Clone)]
pub struct PerclosWindow {
    /// (closed, timestamp), oldest first
    samples: VecDeque<(bool, f64)>,
    window_seconds: f64,
    threshold: f64,
    closed_count: usize,
}

impl PerclosWindow {
    pub fn new(window_seconds: f64, threshold: f64) -> Self {
        Self {
            samples: VecDeque::new(),
            window_seconds,
            threshold,
            closed_count: 0,
        }
    }

    /// Set the EAR below which a sample counts as closed.
    ///
    /// Applies to future samples only.
    pub fn set_threshold(&mut self, threshold: f64) {
        self.threshold = threshold;
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn window_seconds(&self) -> f64 {
        self.window_seconds
    }

    /// Fail if `timestamp` would move the window backwards
    pub fn check_timestamp(&self, timestamp: f64) -> Result<(), DmsError> {
        match self.samples.back() {
            Some(&(_, newest)) if timestamp < newest => {
                Err(DmsError::NonMonotonicTimestamp { timestamp, newest })
            }
            _ => Ok(()),
        }
    }

    /// Record a sample and return the closed ratio over the window
    pub fn update(&mut self, ear: f64, timestamp: f64) -> Result<f64, DmsError> {
        self.check_timestamp(timestamp)?;

        let closed = ear < self.threshold;
        self.samples.push_back((closed, timestamp));
        if closed {
            self.closed_count += 1;
        }

        while let Some(&(was_closed, oldest)) = self.samples.front() {
            if timestamp - oldest <= self.window_seconds {
                break;
            }
            self.samples.pop_front();
            if was_closed {
                self.closed_count -= 1;
            }
        }

        Ok(self.ratio())
    }

    /// Closed ratio over retained samples (0.0 when empty)
    pub fn ratio(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.closed_count as f64 / self.samples.len() as f64
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn oldest_timestamp(&self) -> Option<f64> {
        self.samples.front().map(|&(_, t)| t)
    }

    pub fn newest_timestamp(&self) -> Option<f64> {
        self.samples.back().map(|&(_, t)| t)
    }

    pub fn reset(&mut self) {
        self.samples.clear();
        self.closed_count = 0;
    }
}

impl Default for PerclosWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SECONDS, 0.2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_ratio_is_zero() {
        assert_eq!(PerclosWindow::default().ratio(), 0.0);
    }

    #[test]
    fn test_all_closed_saturates() {
        let mut window = PerclosWindow::new(60.0, 0.2);
        let mut ratio = 0.0;
        for i in 0..700 {
            ratio = window.update(0.05, i as f64 * 0.1).unwrap();
        }
        assert_eq!(ratio, 1.0);
    }

    #[test]
    fn test_all_open_is_zero() {
        let mut window = PerclosWindow::new(60.0, 0.2);
        let mut ratio = 1.0;
        for i in 0..700 {
            ratio = window.update(0.3, i as f64 * 0.1).unwrap();
        }
        assert_eq!(ratio, 0.0);
    }

    #[test]
    fn test_old_samples_evicted() {
        let mut window = PerclosWindow::new(10.0, 0.2);
        window.update(0.0, 0.0).unwrap();
        window.update(0.0, 5.0).unwrap();
        assert_eq!(window.ratio(), 1.0);

        // Sample at t=0 is more than 10s old at t=10.5
        let ratio = window.update(0.3, 10.5).unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window.oldest_timestamp(), Some(5.0));
        assert!((ratio - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_sample_at_exact_window_edge_is_kept() {
        let mut window = PerclosWindow::new(10.0, 0.2);
        window.update(0.0, 0.0).unwrap();
        window.update(0.3, 10.0).unwrap();
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn test_non_monotonic_rejected_without_mutation() {
        let mut window = PerclosWindow::new(60.0, 0.2);
        window.update(0.0, 5.0).unwrap();

        let err = window.update(0.3, 4.0).unwrap_err();
        assert!(matches!(err, DmsError::NonMonotonicTimestamp { .. }));
        assert_eq!(window.len(), 1);
        assert_eq!(window.ratio(), 1.0);

        // Equal timestamps are allowed
        assert!(window.update(0.3, 5.0).is_ok());
    }

    #[test]
    fn test_threshold_change_applies_forward() {
        let mut window = PerclosWindow::new(60.0, 0.2);
        window.update(0.15, 0.0).unwrap();
        window.set_threshold(0.1);
        window.update(0.15, 1.0).unwrap();

        assert!((window.ratio() - 0.5).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn prop_matches_brute_force(
            steps in prop::collection::vec((0.0f64..0.4, 0.0f64..3.0), 1..200),
            window_seconds in 1.0f64..20.0,
        ) {
            let threshold = 0.2;
            let mut window = PerclosWindow::new(window_seconds, threshold);
            let mut history: Vec<(f64, f64)> = Vec::new();
            let mut t = 0.0;

            for (ear, dt) in steps {
                t += dt;
                history.push((ear, t));
                let ratio = window.update(ear, t).unwrap();

                let retained: Vec<_> = history.iter().filter(|&&(_, ts)| t - ts <= window_seconds).collect();
                let closed = retained.iter().filter(|&&&(e, _)| e < threshold).count();
                let expected = closed as f64 / retained.len() as f64;

                prop_assert!((ratio - expected).abs() < 1e-12);
                prop_assert_eq!(window.len(), retained.len());
                prop_assert!(t - window.oldest_timestamp().unwrap() <= window_seconds);
            }
        }
    }
}
