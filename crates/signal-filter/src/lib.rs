//! Signal Filtering
//!
//! Provides the bounded FIFO history and the temporal smoothing filter shared
//! by the eye-openness and head-movement paths of the driver monitor.

mod filter;
mod history;

pub use filter::{FilterMode, TemporalFilter, DEFAULT_ALPHA, DEFAULT_CAPACITY};
pub use history::BoundedHistory;

use thiserror::Error;

/// Filter construction errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    /// History capacity must hold at least one sample
    #[error("Filter capacity must be greater than zero")]
    ZeroCapacity,

    /// Smoothing coefficient outside the open interval (0, 1)
    #[error("EWMA alpha {0} is outside (0, 1)")]
    InvalidAlpha(f64),
}
