//! Executor-agnostic binned-reduction semantics.
//!
//! A binned reduction folds N scalar values into `bin_count` aggregates
//! according to a parallel array of bin assignments, under a commutative
//! operator (sum, max, or min). This crate defines the operator algebra,
//! request validation, and the lock-free f32 cell that parallel executors
//! accumulate through, plus two CPU executors: a sequential reference and
//! a Rayon data-parallel one. Device execution lives in `binfold-wgpu`.

pub mod atomic;
pub mod error;
pub mod executor;
pub mod op;
pub mod request;

pub use atomic::AtomicF32;
pub use error::ReduceError;
pub use executor::{reduce_parallel, reduce_sequential};
pub use op::Operator;
pub use request::ReduceRequest;
