//! Reduction operator algebra.

use crate::error::ReduceError;

/// Binned-reduction operators, with the wire codes carried in the params
/// uniform of the compute kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Operator {
    Sum = 0,
    Max = 1,
    Min = 2,
}

impl Operator {
    /// The identity element: combining it with any value yields that value.
    ///
    /// Empty bins hold this after a reduction completes.
    pub fn identity(self) -> f32 {
        match self {
            Operator::Sum => 0.0,
            Operator::Max => f32::NEG_INFINITY,
            Operator::Min => f32::INFINITY,
        }
    }

    /// Scalar fold step; the semantics every executor must reproduce.
    pub fn combine(self, a: f32, b: f32) -> f32 {
        match self {
            Operator::Sum => a + b,
            Operator::Max => a.max(b),
            Operator::Min => a.min(b),
        }
    }

    /// Lowercase name for logs and bench labels.
    pub fn name(self) -> &'static str {
        match self {
            Operator::Sum => "sum",
            Operator::Max => "max",
            Operator::Min => "min",
        }
    }

    /// All operators, for exhaustive tests and benches.
    pub fn all() -> [Operator; 3] {
        [Operator::Sum, Operator::Max, Operator::Min]
    }
}

impl TryFrom<u32> for Operator {
    type Error = ReduceError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Operator::Sum),
            1 => Ok(Operator::Max),
            2 => Ok(Operator::Min),
            other => Err(ReduceError::Configuration(format!(
                "unknown operator selector {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes() {
        assert_eq!(Operator::Sum as u32, 0);
        assert_eq!(Operator::Max as u32, 1);
        assert_eq!(Operator::Min as u32, 2);
    }

    #[test]
    fn identity_elements() {
        assert_eq!(Operator::Sum.identity(), 0.0);
        assert_eq!(Operator::Max.identity(), f32::NEG_INFINITY);
        assert_eq!(Operator::Min.identity(), f32::INFINITY);
    }

    #[test]
    fn identity_is_neutral() {
        for op in Operator::all() {
            for v in [-3.5f32, 0.0, 7.25, 1e20] {
                assert_eq!(op.combine(op.identity(), v), v, "{} identity", op.name());
            }
        }
    }

    #[test]
    fn combine_semantics() {
        assert_eq!(Operator::Sum.combine(3.0, 4.0), 7.0);
        assert_eq!(Operator::Max.combine(3.0, 4.0), 4.0);
        assert_eq!(Operator::Min.combine(3.0, 4.0), 3.0);
    }

    #[test]
    fn try_from_roundtrip() {
        for op in Operator::all() {
            assert_eq!(Operator::try_from(op as u32).unwrap(), op);
        }
    }

    #[test]
    fn try_from_rejects_unknown_selector() {
        let err = Operator::try_from(3).unwrap_err();
        assert!(matches!(err, ReduceError::Configuration(_)));
        assert!(format!("{err}").contains("unknown operator selector 3"));
    }

    #[test]
    fn names() {
        assert_eq!(Operator::Sum.name(), "sum");
        assert_eq!(Operator::Max.name(), "max");
        assert_eq!(Operator::Min.name(), "min");
    }
}
