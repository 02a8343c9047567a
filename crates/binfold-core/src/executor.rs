//! CPU executors for binned reductions.
//!
//! [`reduce_sequential`] is the reference definition: one element at a
//! time, in index order. [`reduce_parallel`] runs the same per-element
//! kernel across the Rayon pool with atomic accumulator cells, which is
//! also the shape the compute shader mirrors on the device.

use crate::atomic::AtomicF32;
use crate::error::Result;
use crate::op::Operator;
use crate::request::ReduceRequest;
use rayon::prelude::*;
use tracing::debug;

/// Fold every element into its bin, sequentially.
pub fn reduce_sequential(request: &ReduceRequest<'_>) -> Result<Vec<f32>> {
    request.validate()?;
    let mut accum = vec![request.op.identity(); request.bin_count as usize];
    for (&value, &bin) in request.values.iter().zip(request.bins) {
        let slot = &mut accum[bin as usize];
        *slot = request.op.combine(*slot, value);
    }
    Ok(accum)
}

/// Fold every element into its bin across the thread pool.
///
/// Elements race on the shared accumulator cells and settle through
/// compare-exchange retries. Max and Min results are bit-identical to the
/// sequential fold; Sum can differ in the trailing bits because addition
/// order is unspecified.
pub fn reduce_parallel(request: &ReduceRequest<'_>) -> Result<Vec<f32>> {
    request.validate()?;
    let accum: Vec<AtomicF32> = (0..request.bin_count)
        .map(|_| AtomicF32::new(request.op.identity()))
        .collect();

    debug!(
        len = request.len(),
        bins = request.bin_count,
        op = request.op.name(),
        "parallel binned reduction"
    );

    (0..request.len()).into_par_iter().for_each(|i| {
        let value = request.values[i];
        let cell = &accum[request.bins[i] as usize];
        match request.op {
            Operator::Sum => {
                cell.fetch_add(value);
            }
            Operator::Max => {
                cell.fetch_max(value);
            }
            Operator::Min => {
                cell.fetch_min(value);
            }
        }
    });

    Ok(accum.iter().map(AtomicF32::load).collect())
}
