//! On-device digit classifier stub.
//!
//! A two-layer dense network (784 → 128 → 10) evaluated as five chained
//! compute passes in one submission: pixel normalization, matmul with
//! fused bias, relu, a second matmul, and a row softmax. Weights are
//! uploaded once at construction and reused across predictions, which is
//! what makes the engine's pipeline cache earn its keep.

use crate::buffer::{BufferUsage, GpuBuffer};
use crate::dispatch::{matrix_workgroups, workgroup_count};
use crate::error::{GpuError, Result};
use crate::pipeline::{self, PipelineBuilder, PreparedPipeline};
use crate::reduce::ReduceEngine;
use crate::shaders;
use bytemuck::{Pod, Zeroable};
use tracing::debug;

/// Uniform parameters for the matmul kernel.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct MatmulParams {
    pub m: u32,
    pub n: u32,
    pub k: u32,
    pub _pad: u32,
}

/// Uniform parameters for the element-wise kernels.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ElementwiseParams {
    pub len: u32,
    pub _pad: u32,
}

/// Trained parameters for the two dense layers, row-major.
#[derive(Debug, Clone)]
pub struct NetworkWeights {
    /// 784 × 128.
    pub w1: Vec<f32>,
    /// 128.
    pub b1: Vec<f32>,
    /// 128 × 10.
    pub w2: Vec<f32>,
    /// 10.
    pub b2: Vec<f32>,
}

/// Digit classifier holding its weights on the device.
#[derive(Debug)]
pub struct DigitClassifier {
    w1: GpuBuffer,
    b1: GpuBuffer,
    w2: GpuBuffer,
    b2: GpuBuffer,
}

impl DigitClassifier {
    /// Pixels per image (28 × 28).
    pub const INPUT: u32 = 784;
    /// Hidden layer width.
    pub const HIDDEN: u32 = 128;
    /// Output classes (digits 0-9).
    pub const CLASSES: u32 = 10;

    /// Upload the trained weights once.
    pub fn new(engine: &ReduceEngine, weights: &NetworkWeights) -> Result<Self> {
        check_len("w1", &weights.w1, Self::INPUT * Self::HIDDEN)?;
        check_len("b1", &weights.b1, Self::HIDDEN)?;
        check_len("w2", &weights.w2, Self::HIDDEN * Self::CLASSES)?;
        check_len("b2", &weights.b2, Self::CLASSES)?;

        let ctx = engine.context();
        let ro = BufferUsage::StorageReadOnly;
        Ok(Self {
            w1: GpuBuffer::from_slice(ctx, &weights.w1, ro, "classifier-w1")?,
            b1: GpuBuffer::from_slice(ctx, &weights.b1, ro, "classifier-b1")?,
            w2: GpuBuffer::from_slice(ctx, &weights.w2, ro, "classifier-w2")?,
            b2: GpuBuffer::from_slice(ctx, &weights.b2, ro, "classifier-b2")?,
        })
    }

    /// Class probabilities for one image of `u32` pixel intensities in
    /// [0, 255].
    pub async fn forward(&self, engine: &ReduceEngine, pixels: &[u32]) -> Result<Vec<f32>> {
        if pixels.len() != Self::INPUT as usize {
            return Err(GpuError::Configuration(format!(
                "expected {} pixels, got {}",
                Self::INPUT,
                pixels.len()
            )));
        }

        let ctx = engine.context();
        let ro = BufferUsage::StorageReadOnly;
        let rw = BufferUsage::Storage;
        let f32_size = std::mem::size_of::<f32>() as u64;

        let buf_pixels = GpuBuffer::from_slice(ctx, pixels, ro, "classifier-pixels")?;
        let normalized =
            GpuBuffer::with_capacity(ctx, u64::from(Self::INPUT) * f32_size, rw, "normalized")?;
        let hidden =
            GpuBuffer::with_capacity(ctx, u64::from(Self::HIDDEN) * f32_size, rw, "hidden")?;
        let hidden_act =
            GpuBuffer::with_capacity(ctx, u64::from(Self::HIDDEN) * f32_size, rw, "hidden-act")?;
        let logits =
            GpuBuffer::with_capacity(ctx, u64::from(Self::CLASSES) * f32_size, rw, "logits")?;
        let probs =
            GpuBuffer::with_capacity(ctx, u64::from(Self::CLASSES) * f32_size, rw, "probs")?;

        let norm_params = GpuBuffer::from_value(
            ctx,
            &ElementwiseParams {
                len: Self::INPUT,
                _pad: 0,
            },
            "normalize-params",
        )?;
        let mm1_params = GpuBuffer::from_value(
            ctx,
            &MatmulParams {
                m: 1,
                n: Self::HIDDEN,
                k: Self::INPUT,
                _pad: 0,
            },
            "matmul1-params",
        )?;
        let relu_params = GpuBuffer::from_value(
            ctx,
            &ElementwiseParams {
                len: Self::HIDDEN,
                _pad: 0,
            },
            "relu-params",
        )?;
        let mm2_params = GpuBuffer::from_value(
            ctx,
            &MatmulParams {
                m: 1,
                n: Self::CLASSES,
                k: Self::HIDDEN,
                _pad: 0,
            },
            "matmul2-params",
        )?;
        let softmax_params = GpuBuffer::from_value(
            ctx,
            &ElementwiseParams {
                len: Self::CLASSES,
                _pad: 0,
            },
            "softmax-params",
        )?;

        let builder = PipelineBuilder::new(ctx, engine.cache());
        let elementwise_layout = [
            pipeline::storage_read_entry(0),
            pipeline::storage_read_write_entry(1),
            pipeline::uniform_entry(2),
        ];
        let matmul_layout = [
            pipeline::storage_read_entry(0),
            pipeline::storage_read_entry(1),
            pipeline::storage_read_entry(2),
            pipeline::storage_read_write_entry(3),
            pipeline::uniform_entry(4),
        ];

        let normalize = builder.compute_pipeline(
            "elementwise",
            &elementwise_layout,
            shaders::NORMALIZE_SRC,
            "normalize_pixels",
        );
        let matmul = builder.compute_pipeline(
            "matmul",
            &matmul_layout,
            shaders::MATMUL_BIAS_SRC,
            "matmul_bias",
        );
        let relu =
            builder.compute_pipeline("elementwise", &elementwise_layout, shaders::RELU_SRC, "relu");
        let softmax = builder.compute_pipeline(
            "elementwise",
            &elementwise_layout,
            shaders::SOFTMAX_ROW_SRC,
            "softmax_row",
        );

        let device = &ctx.device;
        let bg_normalize = pipeline::bind_group(
            device,
            &normalize.bind_group_layout,
            &[&buf_pixels.raw, &normalized.raw, &norm_params.raw],
            "normalize-bind-group",
        );
        let bg_mm1 = pipeline::bind_group(
            device,
            &matmul.bind_group_layout,
            &[
                &normalized.raw,
                &self.w1.raw,
                &self.b1.raw,
                &hidden.raw,
                &mm1_params.raw,
            ],
            "matmul1-bind-group",
        );
        let bg_relu = pipeline::bind_group(
            device,
            &relu.bind_group_layout,
            &[&hidden.raw, &hidden_act.raw, &relu_params.raw],
            "relu-bind-group",
        );
        let bg_mm2 = pipeline::bind_group(
            device,
            &matmul.bind_group_layout,
            &[
                &hidden_act.raw,
                &self.w2.raw,
                &self.b2.raw,
                &logits.raw,
                &mm2_params.raw,
            ],
            "matmul2-bind-group",
        );
        let bg_softmax = pipeline::bind_group(
            device,
            &softmax.bind_group_layout,
            &[&logits.raw, &probs.raw, &softmax_params.raw],
            "softmax-bind-group",
        );

        debug!("classifier forward pass");

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("classifier-encoder"),
        });
        let ew = shaders::ELEMENTWISE_WORKGROUP;
        let tile = shaders::MATMUL_TILE;
        encode_pass(
            &mut encoder,
            "normalize-pass",
            &normalize,
            &bg_normalize,
            [workgroup_count(Self::INPUT, ew), 1, 1],
        );
        encode_pass(
            &mut encoder,
            "matmul1-pass",
            &matmul,
            &bg_mm1,
            matrix_workgroups(1, Self::HIDDEN, tile),
        );
        encode_pass(
            &mut encoder,
            "relu-pass",
            &relu,
            &bg_relu,
            [workgroup_count(Self::HIDDEN, ew), 1, 1],
        );
        encode_pass(
            &mut encoder,
            "matmul2-pass",
            &matmul,
            &bg_mm2,
            matrix_workgroups(1, Self::CLASSES, tile),
        );
        encode_pass(&mut encoder, "softmax-pass", &softmax, &bg_softmax, [1, 1, 1]);
        ctx.queue.submit(std::iter::once(encoder.finish()));

        engine.await_completion().await?;
        probs
            .read_back(ctx, engine.options().readback_timeout)
            .await
    }

    /// The digit with the highest probability.
    pub async fn predict(&self, engine: &ReduceEngine, pixels: &[u32]) -> Result<usize> {
        let probs = self.forward(engine, pixels).await?;
        Ok(argmax(&probs))
    }
}

fn check_len(name: &str, data: &[f32], expected: u32) -> Result<()> {
    if data.len() != expected as usize {
        return Err(GpuError::Configuration(format!(
            "{name} must have {expected} entries, got {}",
            data.len()
        )));
    }
    Ok(())
}

fn encode_pass(
    encoder: &mut wgpu::CommandEncoder,
    label: &str,
    prepared: &PreparedPipeline,
    bind_group: &wgpu::BindGroup,
    groups: [u32; 3],
) {
    let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
        label: Some(label),
        timestamp_writes: None,
    });
    pass.set_pipeline(&prepared.pipeline);
    pass.set_bind_group(0, Some(bind_group), &[]);
    pass.dispatch_workgroups(groups[0], groups[1], groups[2]);
}

/// Index of the largest value; the first wins on ties.
fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}
