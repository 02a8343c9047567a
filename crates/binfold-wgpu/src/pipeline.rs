//! Bind group layouts and cached pipeline construction.

use crate::cache::{PipelineKey, PipelineObjectCache, hash_source};
use crate::device::GpuContext;
use tracing::debug;

/// Layout entry for a read-only storage buffer.
pub fn storage_read_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: true },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Layout entry for a read-write storage buffer.
pub fn storage_read_write_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: false },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Layout entry for a uniform buffer.
pub fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// A cached pipeline together with the layout bind groups are built from.
pub struct PreparedPipeline {
    pub pipeline: wgpu::ComputePipeline,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

/// Builds compute pipelines, routing every constituent object through
/// the shared cache.
pub struct PipelineBuilder<'a> {
    ctx: &'a GpuContext,
    cache: &'a PipelineObjectCache,
}

impl<'a> PipelineBuilder<'a> {
    pub fn new(ctx: &'a GpuContext, cache: &'a PipelineObjectCache) -> Self {
        Self { ctx, cache }
    }

    /// Fetch or create the compute pipeline for `source` and
    /// `entry_point`, with a bind group layout described by `entries`
    /// and keyed under `layout_tag`.
    pub fn compute_pipeline(
        &self,
        layout_tag: &str,
        entries: &[wgpu::BindGroupLayoutEntry],
        source: &str,
        entry_point: &str,
    ) -> PreparedPipeline {
        let source_hash = hash_source(source);

        let module = self.cache.shader_modules.get_or_insert_with(source_hash, || {
            debug!(entry_point, "compiling shader module");
            self.ctx
                .device
                .create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(entry_point),
                    source: wgpu::ShaderSource::Wgsl(source.into()),
                })
        });

        let bind_group_layout = self.bind_group_layout(layout_tag, entries);

        let pipeline_layout = self
            .cache
            .pipeline_layouts
            .get_or_insert_with(layout_tag.to_string(), || {
                self.ctx
                    .device
                    .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                        label: Some(layout_tag),
                        bind_group_layouts: &[&bind_group_layout],
                        push_constant_ranges: &[],
                    })
            });

        let key = PipelineKey {
            source: source_hash,
            entry: entry_point.to_string(),
        };
        let pipeline = self.cache.pipelines.get_or_insert_with(key, || {
            debug!(entry_point, layout = layout_tag, "building compute pipeline");
            self.ctx
                .device
                .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some(entry_point),
                    layout: Some(&pipeline_layout),
                    module: &module,
                    entry_point: Some(entry_point),
                    compilation_options: Default::default(),
                    cache: None,
                })
        });

        PreparedPipeline {
            pipeline,
            bind_group_layout,
        }
    }

    /// Fetch or create the bind group layout keyed under `layout_tag`.
    pub fn bind_group_layout(
        &self,
        layout_tag: &str,
        entries: &[wgpu::BindGroupLayoutEntry],
    ) -> wgpu::BindGroupLayout {
        self.cache
            .bind_group_layouts
            .get_or_insert_with(layout_tag.to_string(), || {
                self.ctx
                    .device
                    .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                        label: Some(layout_tag),
                        entries,
                    })
            })
    }
}

/// Assemble a bind group over whole buffers, bound in order from 0.
pub fn bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    buffers: &[&wgpu::Buffer],
    label: &str,
) -> wgpu::BindGroup {
    let entries: Vec<wgpu::BindGroupEntry<'_>> = buffers
        .iter()
        .enumerate()
        .map(|(i, buf)| wgpu::BindGroupEntry {
            binding: i as u32,
            resource: buf.as_entire_binding(),
        })
        .collect();
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_helpers_set_binding_slot() {
        assert_eq!(storage_read_entry(0).binding, 0);
        assert_eq!(storage_read_write_entry(2).binding, 2);
        assert_eq!(uniform_entry(3).binding, 3);
    }

    #[test]
    fn storage_read_entry_is_read_only() {
        match storage_read_entry(0).ty {
            wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                ..
            } => assert!(read_only),
            other => panic!("unexpected binding type: {other:?}"),
        }
    }

    #[test]
    fn storage_read_write_entry_is_writable() {
        match storage_read_write_entry(0).ty {
            wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                ..
            } => assert!(!read_only),
            other => panic!("unexpected binding type: {other:?}"),
        }
    }

    #[test]
    fn uniform_entry_is_uniform() {
        assert!(matches!(
            uniform_entry(0).ty,
            wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                ..
            }
        ));
    }

    #[test]
    fn entries_visible_to_compute_only() {
        for entry in [
            storage_read_entry(0),
            storage_read_write_entry(1),
            uniform_entry(2),
        ] {
            assert_eq!(entry.visibility, wgpu::ShaderStages::COMPUTE);
        }
    }
}
