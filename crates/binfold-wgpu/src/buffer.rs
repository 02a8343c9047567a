//! GPU buffer handles with declared access, checked upload, and staged
//! readback.

use crate::device::GpuContext;
use crate::error::{GpuError, Result};
use bytemuck::Pod;
use std::time::Duration;
use tracing::warn;

/// Access pattern a buffer is allocated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    /// Read-write storage: accumulators and kernel outputs. Copyable back
    /// to the host.
    Storage,
    /// Read-only kernel inputs. Upload only, never read back.
    StorageReadOnly,
    /// Uniform parameter blocks.
    Uniform,
}

impl BufferUsage {
    fn flags(self) -> wgpu::BufferUsages {
        match self {
            BufferUsage::Storage => {
                wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_SRC
                    | wgpu::BufferUsages::COPY_DST
            }
            BufferUsage::StorageReadOnly => {
                wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST
            }
            BufferUsage::Uniform => wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        }
    }
}

/// A device buffer paired with its byte size and declared usage.
#[derive(Debug)]
pub struct GpuBuffer {
    pub raw: wgpu::Buffer,
    pub size: u64,
    usage: BufferUsage,
}

impl GpuBuffer {
    /// Allocate `size` bytes, checked against the device limit before any
    /// allocation is attempted.
    pub fn with_capacity(
        ctx: &GpuContext,
        size: u64,
        usage: BufferUsage,
        label: &str,
    ) -> Result<Self> {
        let limit = ctx.max_buffer_size();
        if size > limit {
            return Err(GpuError::ResourceExhausted {
                requested: size,
                limit,
            });
        }
        let raw = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: usage.flags(),
            mapped_at_creation: false,
        });
        Ok(Self { raw, size, usage })
    }

    /// Allocate and upload in one step.
    pub fn from_slice<T: Pod>(
        ctx: &GpuContext,
        data: &[T],
        usage: BufferUsage,
        label: &str,
    ) -> Result<Self> {
        let bytes = bytemuck::cast_slice(data);
        let buf = Self::with_capacity(ctx, bytes.len() as u64, usage, label)?;
        ctx.queue.write_buffer(&buf.raw, 0, bytes);
        Ok(buf)
    }

    /// Allocate and upload a single `Pod` value as a uniform block.
    pub fn from_value<T: Pod>(ctx: &GpuContext, value: &T, label: &str) -> Result<Self> {
        let bytes = bytemuck::bytes_of(value);
        let buf = Self::with_capacity(ctx, bytes.len() as u64, BufferUsage::Uniform, label)?;
        ctx.queue.write_buffer(&buf.raw, 0, bytes);
        Ok(buf)
    }

    /// Re-upload the buffer's contents. `data` must match the allocated
    /// size exactly.
    pub fn write<T: Pod>(&self, ctx: &GpuContext, data: &[T]) -> Result<()> {
        let bytes = bytemuck::cast_slice(data);
        if bytes.len() as u64 != self.size {
            return Err(GpuError::SizeMismatch {
                expected: self.size,
                actual: bytes.len() as u64,
            });
        }
        ctx.queue.write_buffer(&self.raw, 0, bytes);
        Ok(())
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    /// Copy the buffer into a staging area, map it, and return the
    /// contents.
    ///
    /// The await resolves when the map callback fires; a wait longer than
    /// `timeout` surfaces as [`GpuError::SynchronizationTimeout`].
    pub async fn read_back<T: Pod>(&self, ctx: &GpuContext, timeout: Duration) -> Result<Vec<T>> {
        debug_assert!(
            self.usage == BufferUsage::Storage,
            "readback requires a copyable storage buffer"
        );

        let staging = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("staging-readback"),
            size: self.size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("readback-encoder"),
            });
        encoder.copy_buffer_to_buffer(&self.raw, 0, &staging, 0, self.size);
        ctx.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        ctx.device.poll(wgpu::Maintain::Wait);
        match rx.recv_timeout(timeout) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(GpuError::BufferMap(e.to_string())),
            Err(_) => {
                warn!(?timeout, "buffer map did not complete in time");
                return Err(GpuError::SynchronizationTimeout { waited: timeout });
            }
        }

        let data = slice.get_mapped_range();
        let out: Vec<T> = bytemuck::cast_slice(&data).to_vec();
        drop(data);
        staging.unmap();
        Ok(out)
    }
}
