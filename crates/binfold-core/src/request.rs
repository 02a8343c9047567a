//! Reduction request description and host-side validation.

use crate::error::{ReduceError, Result};
use crate::op::Operator;

/// One binned-reduction invocation: a value array, a parallel array of bin
/// assignments, the number of bins, and the operator to fold with.
#[derive(Debug, Clone, Copy)]
pub struct ReduceRequest<'a> {
    pub values: &'a [f32],
    pub bins: &'a [u32],
    pub bin_count: u32,
    pub op: Operator,
}

impl<'a> ReduceRequest<'a> {
    pub fn new(values: &'a [f32], bins: &'a [u32], bin_count: u32, op: Operator) -> Self {
        Self {
            values,
            bins,
            bin_count,
            op,
        }
    }

    /// Number of input elements.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Check every precondition the executors rely on.
    ///
    /// Out-of-range bin indices are rejected here, never clamped; by the
    /// time a kernel runs, every accumulator store lands in bounds.
    pub fn validate(&self) -> Result<()> {
        if self.bin_count == 0 {
            return Err(ReduceError::Configuration("bin count must be > 0".into()));
        }
        if self.values.len() != self.bins.len() {
            return Err(ReduceError::Configuration(format!(
                "values/bins length mismatch: {} vs {}",
                self.values.len(),
                self.bins.len()
            )));
        }
        for (element, &bin) in self.bins.iter().enumerate() {
            if bin >= self.bin_count {
                return Err(ReduceError::BinOutOfRange {
                    element,
                    bin,
                    bin_count: self.bin_count,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_request_passes() {
        let req = ReduceRequest::new(&[3.0, 7.0, 1.0], &[0, 1, 0], 2, Operator::Sum);
        assert!(req.validate().is_ok());
        assert_eq!(req.len(), 3);
        assert!(!req.is_empty());
    }

    #[test]
    fn empty_request_passes() {
        let req = ReduceRequest::new(&[], &[], 4, Operator::Max);
        assert!(req.validate().is_ok());
        assert!(req.is_empty());
    }

    #[test]
    fn zero_bins_rejected() {
        let req = ReduceRequest::new(&[1.0], &[0], 0, Operator::Sum);
        let err = req.validate().unwrap_err();
        assert!(matches!(err, ReduceError::Configuration(_)));
    }

    #[test]
    fn length_mismatch_rejected() {
        let req = ReduceRequest::new(&[1.0, 2.0], &[0], 2, Operator::Min);
        let err = req.validate().unwrap_err();
        assert!(format!("{err}").contains("length mismatch"));
    }

    #[test]
    fn out_of_range_bin_rejected_with_position() {
        let req = ReduceRequest::new(&[1.0, 2.0, 3.0], &[0, 5, 1], 2, Operator::Sum);
        match req.validate().unwrap_err() {
            ReduceError::BinOutOfRange {
                element,
                bin,
                bin_count,
            } => {
                assert_eq!(element, 1);
                assert_eq!(bin, 5);
                assert_eq!(bin_count, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn boundary_bin_index_rejected() {
        // bin == bin_count is the first out-of-range value.
        let req = ReduceRequest::new(&[1.0], &[2], 2, Operator::Sum);
        assert!(req.validate().is_err());
        let req = ReduceRequest::new(&[1.0], &[1], 2, Operator::Sum);
        assert!(req.validate().is_ok());
    }
}
