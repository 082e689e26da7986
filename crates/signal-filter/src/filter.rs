//! Temporal smoothing filter

use crate::history::BoundedHistory;
use crate::FilterError;
use serde::{Deserialize, Serialize};

/// Default history length (samples)
pub const DEFAULT_CAPACITY: usize = 5;

/// Default EWMA smoothing factor
pub const DEFAULT_ALPHA: f64 = 0.3;

/// Which estimate `TemporalFilter::update` returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// Arithmetic mean of the retained samples
    #[default]
    MovingAverage,
    /// Exponentially weighted moving average
    Ewma,
}

/// Bounded-history smoother.
///
/// Keeps the last `capacity` samples and reports their mean. An EWMA is
/// advanced on every update as well and is returned instead of the mean when
/// the filter runs in [`FilterMode::Ewma`].
#[derive(Debug, Clone)]
pub struct TemporalFilter {
    history: BoundedHistory<f64>,
    alpha: f64,
    ewma: Option<f64>,
    mode: FilterMode,
}

impl TemporalFilter {
    /// Create a moving-average filter with the default smoothing factor
    pub fn new(capacity: usize) -> Self {
        Self {
            history: BoundedHistory::new(capacity),
            alpha: DEFAULT_ALPHA,
            ewma: None,
            mode: FilterMode::MovingAverage,
        }
    }

    /// Create a filter with explicit parameters
    pub fn with_params(capacity: usize, alpha: f64, mode: FilterMode) -> Result<Self, FilterError> {
        if capacity == 0 {
            return Err(FilterError::ZeroCapacity);
        }
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(FilterError::InvalidAlpha(alpha));
        }
        Ok(Self {
            history: BoundedHistory::new(capacity),
            alpha,
            ewma: None,
            mode,
        })
    }

    /// Add a sample and get the filtered output
    pub fn update(&mut self, value: f64) -> f64 {
        self.history.push(value);

        let ewma = match self.ewma {
            Some(prev) => self.alpha * value + (1.0 - self.alpha) * prev,
            None => value,
        };
        self.ewma = Some(ewma);

        match self.mode {
            FilterMode::MovingAverage => self.mean(),
            FilterMode::Ewma => ewma,
        }
    }

    /// Mean of the retained samples (0.0 before the first update)
    pub fn mean(&self) -> f64 {
        if self.history.is_empty() {
            return 0.0;
        }
        self.history.iter().sum::<f64>() / self.history.len() as f64
    }

    /// Current EWMA estimate, if any sample has been seen
    pub fn ewma(&self) -> Option<f64> {
        self.ewma
    }

    /// Retained samples, oldest first
    pub fn samples(&self) -> Vec<f64> {
        self.history.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.history.capacity()
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    /// Reset the filter
    pub fn reset(&mut self) {
        self.history.clear();
        self.ewma = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_first_update_returns_value() {
        let mut filter = TemporalFilter::new(5);
        assert_eq!(filter.update(0.3), 0.3);
    }

    #[test]
    fn test_moving_average_window() {
        let mut filter = TemporalFilter::new(3);

        filter.update(1.0);
        filter.update(2.0);
        assert!((filter.update(3.0) - 2.0).abs() < 1e-12);

        // 1.0 is evicted
        assert!((filter.update(10.0) - 5.0).abs() < 1e-12);
        assert_eq!(filter.samples(), vec![2.0, 3.0, 10.0]);
    }

    #[test]
    fn test_ewma_mode() {
        let mut filter = TemporalFilter::with_params(5, 0.5, FilterMode::Ewma).unwrap();

        assert_eq!(filter.update(0.0), 0.0);
        assert!((filter.update(1.0) - 0.5).abs() < 1e-12);
        assert!((filter.update(1.0) - 0.75).abs() < 1e-12);

        // Mean is still tracked alongside
        assert!((filter.mean() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_ewma_tracked_in_average_mode() {
        let mut filter = TemporalFilter::new(5);
        assert_eq!(filter.ewma(), None);

        filter.update(1.0);
        filter.update(0.0);
        let expected = DEFAULT_ALPHA * 0.0 + (1.0 - DEFAULT_ALPHA) * 1.0;
        assert!((filter.ewma().unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_params() {
        assert_eq!(
            TemporalFilter::with_params(0, 0.3, FilterMode::MovingAverage).unwrap_err(),
            FilterError::ZeroCapacity
        );
        assert!(matches!(
            TemporalFilter::with_params(5, 1.0, FilterMode::Ewma),
            Err(FilterError::InvalidAlpha(_))
        ));
    }

    #[test]
    fn test_reset() {
        let mut filter = TemporalFilter::new(5);
        filter.update(4.0);
        filter.reset();

        assert!(filter.is_empty());
        assert_eq!(filter.ewma(), None);
        assert_eq!(filter.mean(), 0.0);
    }

    proptest! {
        #[test]
        fn prop_mean_covers_last_n(
            capacity in 1usize..12,
            values in prop::collection::vec(-1000.0f64..1000.0, 1..64),
        ) {
            let mut filter = TemporalFilter::new(capacity);
            let mut last = 0.0;
            for &v in &values {
                last = filter.update(v);
            }

            let tail = &values[values.len().saturating_sub(capacity)..];
            let expected = tail.iter().sum::<f64>() / tail.len() as f64;
            prop_assert!((last - expected).abs() < 1e-9);
            prop_assert!(filter.len() <= capacity);
        }
    }
}
