//! wgpu backend error types.

use binfold_core::ReduceError;
use std::time::Duration;
use thiserror::Error;

/// Errors produced by the wgpu reduction backend.
#[derive(Debug, Error)]
pub enum GpuError {
    #[error("no suitable GPU adapter found")]
    NoAdapter,

    #[error("failed to request device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("device capacity exceeded: requested {requested}, limit {limit}")]
    ResourceExhausted { requested: u64, limit: u64 },

    #[error("upload of {actual} bytes into a buffer of {expected} bytes")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("device work did not complete within {waited:?}")]
    SynchronizationTimeout { waited: Duration },

    #[error("buffer mapping failed: {0}")]
    BufferMap(String),

    #[error("invalid reduction request: {0}")]
    Reduce(#[from] ReduceError),
}

impl GpuError {
    /// Whether retrying the same call can succeed.
    ///
    /// Only timeouts qualify; everything else reflects a bad request or a
    /// missing device and will fail again unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GpuError::SynchronizationTimeout { .. })
    }
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, GpuError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_timeout_is_retryable() {
        assert!(
            GpuError::SynchronizationTimeout {
                waited: Duration::from_secs(5)
            }
            .is_retryable()
        );
        assert!(!GpuError::NoAdapter.is_retryable());
        assert!(
            !GpuError::ResourceExhausted {
                requested: 10,
                limit: 5
            }
            .is_retryable()
        );
        assert!(!GpuError::Configuration("bad".into()).is_retryable());
    }

    #[test]
    fn display_no_adapter() {
        assert_eq!(
            format!("{}", GpuError::NoAdapter),
            "no suitable GPU adapter found"
        );
    }

    #[test]
    fn display_size_mismatch() {
        let e = GpuError::SizeMismatch {
            expected: 16,
            actual: 12,
        };
        let s = format!("{e}");
        assert!(s.contains("12"));
        assert!(s.contains("16"));
    }

    #[test]
    fn validation_errors_convert() {
        let e: GpuError = ReduceError::Configuration("bin count must be > 0".into()).into();
        assert!(matches!(e, GpuError::Reduce(_)));
        assert!(format!("{e}").contains("bin count"));
    }
}
