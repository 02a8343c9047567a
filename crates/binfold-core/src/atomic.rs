//! Lock-free f32 cell built on `AtomicU32` bit patterns.
//!
//! There is no hardware float atomic to lean on, so every update is a
//! compare-exchange loop over the IEEE-754 bit pattern. This is the same
//! discipline the compute kernel uses for its `array<atomic<u32>>`
//! accumulator, expressed host-side.

use std::sync::atomic::{AtomicU32, Ordering};

/// An atomically updatable f32.
///
/// All orderings are `Relaxed`: cells are independent of one another, and
/// the fork/join boundary around a parallel reduction publishes the final
/// values to the reader.
#[derive(Debug)]
pub struct AtomicF32 {
    bits: AtomicU32,
}

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self {
            bits: AtomicU32::new(value.to_bits()),
        }
    }

    pub fn load(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }

    pub fn store(&self, value: f32) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Replace the cell's value with `desired` if it still holds the bit
    /// pattern of `expected`.
    ///
    /// Returns the previous value on success and the observed value on
    /// failure, so a retry loop can fold the observation into its next
    /// attempt without a separate load.
    pub fn compare_exchange(&self, expected: f32, desired: f32) -> Result<f32, f32> {
        self.bits
            .compare_exchange(
                expected.to_bits(),
                desired.to_bits(),
                Ordering::Relaxed,
                Ordering::Relaxed,
            )
            .map(f32::from_bits)
            .map_err(f32::from_bits)
    }

    /// Atomically add `value`, returning the previous value.
    pub fn fetch_add(&self, value: f32) -> f32 {
        let mut current = self.bits.load(Ordering::Relaxed);
        loop {
            let next = (f32::from_bits(current) + value).to_bits();
            match self
                .bits
                .compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(prev) => return f32::from_bits(prev),
                Err(observed) => current = observed,
            }
        }
    }

    /// Atomically raise the cell to `value` if it exceeds the current
    /// maximum, returning the previous value.
    ///
    /// Losers of the race observe the winner's value and either retry or
    /// drop out once the cell no longer improves.
    pub fn fetch_max(&self, value: f32) -> f32 {
        let mut current = self.bits.load(Ordering::Relaxed);
        loop {
            let seen = f32::from_bits(current);
            if value <= seen {
                return seen;
            }
            match self.bits.compare_exchange_weak(
                current,
                value.to_bits(),
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(prev) => return f32::from_bits(prev),
                Err(observed) => current = observed,
            }
        }
    }

    /// Atomically lower the cell to `value` if it undercuts the current
    /// minimum, returning the previous value.
    pub fn fetch_min(&self, value: f32) -> f32 {
        let mut current = self.bits.load(Ordering::Relaxed);
        loop {
            let seen = f32::from_bits(current);
            if value >= seen {
                return seen;
            }
            match self.bits.compare_exchange_weak(
                current,
                value.to_bits(),
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(prev) => return f32::from_bits(prev),
                Err(observed) => current = observed,
            }
        }
    }
}
