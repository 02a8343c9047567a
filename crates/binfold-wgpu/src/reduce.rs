//! The binned-reduction dispatch engine.
//!
//! A reduction runs as one indivisible submission: upload values, bin
//! indices, an identity-filled accumulator, and a params uniform; encode
//! a single compute pass of `ceil(len / workgroup_size)` workgroups;
//! submit. The host then suspends twice, first until the queue reports
//! the submission complete and again while the staging copy is mapped,
//! so results are never observed mid-flight.

use crate::buffer::{BufferUsage, GpuBuffer};
use crate::cache::PipelineObjectCache;
use crate::device::GpuContext;
use crate::dispatch::workgroup_count;
use crate::error::{GpuError, Result};
use crate::pipeline::{self, PipelineBuilder};
use crate::shaders;
use binfold_core::{Operator, ReduceRequest};
use bytemuck::{Pod, Zeroable};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Uniform parameters for the reduction kernel.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ReduceParams {
    pub len: u32,
    pub bins: u32,
    pub op: u32,
    pub _pad: u32,
}

/// Host-side engine knobs.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Compute units per workgroup; the dispatch covers the input with
    /// `ceil(len / workgroup_size)` groups.
    pub workgroup_size: u32,
    /// Budget for each wait: queue completion and the staging map.
    pub readback_timeout: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            workgroup_size: 64,
            readback_timeout: Duration::from_secs(5),
        }
    }
}

/// Orchestrates binned reductions on a wgpu device.
pub struct ReduceEngine {
    ctx: GpuContext,
    cache: PipelineObjectCache,
    options: EngineOptions,
}

impl ReduceEngine {
    /// Engine with a fresh cache and default options.
    pub fn new(ctx: GpuContext) -> Self {
        Self::with_cache(ctx, PipelineObjectCache::new(), EngineOptions::default())
    }

    /// Engine over an explicitly constructed cache.
    pub fn with_cache(ctx: GpuContext, cache: PipelineObjectCache, options: EngineOptions) -> Self {
        info!(
            adapter = %ctx.adapter_name(),
            workgroup_size = options.workgroup_size,
            "reduction engine ready"
        );
        Self {
            ctx,
            cache,
            options,
        }
    }

    pub fn context(&self) -> &GpuContext {
        &self.ctx
    }

    pub fn cache(&self) -> &PipelineObjectCache {
        &self.cache
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Run one binned reduction to completion and return the per-bin
    /// aggregates.
    pub async fn reduce(&self, request: &ReduceRequest<'_>) -> Result<Vec<f32>> {
        request.validate()?;
        self.check_workgroup_size()?;
        let len = u32::try_from(request.len()).map_err(|_| {
            GpuError::Configuration(format!("input length {} exceeds u32 range", request.len()))
        })?;

        // The accumulator travels as f32 bit patterns; the kernel's CAS
        // loops work on the same representation.
        let identity_bits =
            vec![request.op.identity().to_bits(); request.bin_count as usize];
        let buf_accum = GpuBuffer::from_slice(
            &self.ctx,
            &identity_bits,
            BufferUsage::Storage,
            "reduce-accum",
        )?;

        if request.is_empty() {
            debug!("empty input, skipping dispatch");
            return self.read_accumulator(&buf_accum).await;
        }

        let buf_values = GpuBuffer::from_slice(
            &self.ctx,
            request.values,
            BufferUsage::StorageReadOnly,
            "reduce-values",
        )?;
        let buf_bins = GpuBuffer::from_slice(
            &self.ctx,
            request.bins,
            BufferUsage::StorageReadOnly,
            "reduce-bins",
        )?;
        let params = ReduceParams {
            len,
            bins: request.bin_count,
            op: request.op as u32,
            _pad: 0,
        };
        let buf_params = GpuBuffer::from_value(&self.ctx, &params, "reduce-params")?;

        let groups = workgroup_count(len, self.options.workgroup_size);
        let group_limit = self.ctx.max_workgroups_per_dimension();
        if groups > group_limit {
            return Err(GpuError::ResourceExhausted {
                requested: u64::from(groups),
                limit: u64::from(group_limit),
            });
        }

        let source = shaders::reduce_shader_source(self.options.workgroup_size);
        let builder = PipelineBuilder::new(&self.ctx, &self.cache);
        let prepared = builder.compute_pipeline(
            "reduce",
            &[
                pipeline::storage_read_entry(0),
                pipeline::storage_read_entry(1),
                pipeline::storage_read_write_entry(2),
                pipeline::uniform_entry(3),
            ],
            &source,
            "reduce",
        );

        let bind_group = pipeline::bind_group(
            &self.ctx.device,
            &prepared.bind_group_layout,
            &[&buf_values.raw, &buf_bins.raw, &buf_accum.raw, &buf_params.raw],
            "reduce-bind-group",
        );

        debug!(
            len,
            bins = request.bin_count,
            op = request.op.name(),
            groups,
            "dispatching reduction"
        );

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("reduce-encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("reduce-pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&prepared.pipeline);
            pass.set_bind_group(0, Some(&bind_group), &[]);
            pass.dispatch_workgroups(groups, 1, 1);
        }
        self.ctx.queue.submit(std::iter::once(encoder.finish()));

        self.await_completion().await?;
        self.read_accumulator(&buf_accum).await
    }

    /// Sum per bin.
    pub async fn sum(&self, values: &[f32], bins: &[u32], bin_count: u32) -> Result<Vec<f32>> {
        self.reduce(&ReduceRequest::new(values, bins, bin_count, Operator::Sum))
            .await
    }

    /// Running maximum per bin.
    pub async fn max(&self, values: &[f32], bins: &[u32], bin_count: u32) -> Result<Vec<f32>> {
        self.reduce(&ReduceRequest::new(values, bins, bin_count, Operator::Max))
            .await
    }

    /// Running minimum per bin.
    pub async fn min(&self, values: &[f32], bins: &[u32], bin_count: u32) -> Result<Vec<f32>> {
        self.reduce(&ReduceRequest::new(values, bins, bin_count, Operator::Min))
            .await
    }

    fn check_workgroup_size(&self) -> Result<()> {
        let size = self.options.workgroup_size;
        if size == 0 {
            return Err(GpuError::Configuration("workgroup size must be > 0".into()));
        }
        let limit = self.ctx.max_workgroup_invocations();
        if size > limit {
            return Err(GpuError::Configuration(format!(
                "workgroup size {size} exceeds device limit {limit}"
            )));
        }
        Ok(())
    }

    /// First suspension point: resolve once the queue reports everything
    /// submitted so far as done.
    pub(crate) async fn await_completion(&self) -> Result<()> {
        let (tx, rx) = std::sync::mpsc::channel();
        self.ctx.queue.on_submitted_work_done(move || {
            let _ = tx.send(());
        });
        self.ctx.device.poll(wgpu::Maintain::Wait);
        rx.recv_timeout(self.options.readback_timeout).map_err(|_| {
            warn!(
                timeout = ?self.options.readback_timeout,
                "queue completion wait timed out"
            );
            GpuError::SynchronizationTimeout {
                waited: self.options.readback_timeout,
            }
        })
    }

    /// Second suspension point: staging copy and map, then decode the bit
    /// patterns into finished aggregates.
    async fn read_accumulator(&self, buf: &GpuBuffer) -> Result<Vec<f32>> {
        let bits: Vec<u32> = buf.read_back(&self.ctx, self.options.readback_timeout).await?;
        Ok(bits.into_iter().map(f32::from_bits).collect())
    }
}
