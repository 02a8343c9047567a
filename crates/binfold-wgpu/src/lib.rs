//! GPU execution of binned reductions on wgpu.
//!
//! The crate owns everything device-side: adapter and device setup
//! ([`device::GpuContext`]), buffer lifecycles ([`buffer::GpuBuffer`]),
//! WGSL kernel sources ([`shaders`]), pipeline construction with counting
//! caches ([`cache`], [`pipeline`]), and the dispatch orchestrator
//! ([`reduce::ReduceEngine`]) that turns a [`ReduceRequest`] into one
//! aggregate per bin. CPU-side semantics live in `binfold-core`; results
//! produced here are checked against its executors in the integration
//! tests.
//!
//! Floating-point sums are accumulated with compare-and-swap loops over
//! `u32` bit patterns because WGSL has no `atomic<f32>`. Max and min are
//! exact; sums are order-dependent and should be compared with a
//! tolerance.

pub mod buffer;
pub mod cache;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod network;
pub mod pipeline;
pub mod reduce;
pub mod shaders;

pub use binfold_core::{Operator, ReduceRequest};
pub use buffer::{BufferUsage, GpuBuffer};
pub use cache::{CacheConfig, CacheStats, CountingCache, PipelineObjectCache};
pub use device::GpuContext;
pub use error::{GpuError, Result};
pub use network::{DigitClassifier, NetworkWeights};
pub use reduce::{EngineOptions, ReduceEngine};
