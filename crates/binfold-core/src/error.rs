//! Request validation error types.

use thiserror::Error;

/// Errors detected while validating a reduction request, before any
/// executor work is scheduled.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReduceError {
    #[error("invalid reduction configuration: {0}")]
    Configuration(String),

    #[error("bin index {bin} at element {element} is out of range for {bin_count} bins")]
    BinOutOfRange {
        element: usize,
        bin: u32,
        bin_count: u32,
    },
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, ReduceError>;
