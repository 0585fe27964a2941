//! wgpu implementation of [`ShaderBackend`].
//!
//! Shader modules are deduplicated by the xxh3-128 hash of their final WGSL,
//! so re-linking an unchanged stage after a uniform-only edit does not hit
//! the driver again.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use xxhash_rust::xxh3::xxh3_128;

use crate::errors::{ProcMatError, Result};
use crate::gpu::backend::{CullMode, Pipeline, PipelineState, Program, ShaderBackend};
use crate::gpu::shader::{ShaderSource, ShaderStage};

/// Interleaved sphere vertex: position, normal, uv, joints, weights.
const VERTEX_STRIDE: u64 = 56;

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
    0 => Float32x3,
    1 => Float32x3,
    2 => Float32x2,
    3 => Uint16x4,
    4 => Float32x4,
];

/// Compiled stages of a procedural program.
#[derive(Debug)]
pub struct WgpuProgram {
    pub vertex: wgpu::ShaderModule,
    pub fragment: wgpu::ShaderModule,
}

pub struct WgpuBackend {
    device: wgpu::Device,
    color_format: wgpu::TextureFormat,
    depth_format: wgpu::TextureFormat,
    sample_count: u32,
    /// xxh3-128 of final WGSL → compiled module.
    module_cache: Mutex<FxHashMap<u128, wgpu::ShaderModule>>,
}

impl WgpuBackend {
    #[must_use]
    pub fn new(
        device: wgpu::Device,
        color_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
    ) -> Self {
        Self {
            device,
            color_format,
            depth_format,
            sample_count: 1,
            module_cache: Mutex::new(FxHashMap::default()),
        }
    }

    #[must_use]
    pub fn with_sample_count(mut self, sample_count: u32) -> Self {
        self.sample_count = sample_count;
        self
    }

    fn get_or_compile(&self, stage: ShaderStage, label: &str, wgsl: String) -> wgpu::ShaderModule {
        let hash = xxh3_128(wgsl.as_bytes());
        let mut cache = self.module_cache.lock();
        cache
            .entry(hash)
            .or_insert_with(|| {
                log::debug!("Compiling {stage:?} module '{label}' ({hash:032x})");
                self.device
                    .create_shader_module(wgpu::ShaderModuleDescriptor {
                        label: Some(&format!("Procedural {label}")),
                        source: wgpu::ShaderSource::Wgsl(wgsl.into()),
                    })
            })
            .clone()
    }

    pub fn cached_module_count(&self) -> usize {
        self.module_cache.lock().len()
    }
}

impl ShaderBackend for WgpuBackend {
    fn create_program(
        &self,
        vertex: &ShaderSource,
        fragment: &ShaderSource,
    ) -> Result<Arc<Program>> {
        let vertex_wgsl = vertex.render()?;
        let fragment_wgsl = fragment.render()?;

        let native = WgpuProgram {
            vertex: self.get_or_compile(ShaderStage::Vertex, &vertex.template, vertex_wgsl.clone()),
            fragment: self.get_or_compile(
                ShaderStage::Fragment,
                &fragment.template,
                fragment_wgsl.clone(),
            ),
        };

        Ok(Arc::new(Program::new(
            vertex_wgsl,
            fragment_wgsl,
            fragment.reflection.uniforms.clone(),
            Some(Arc::new(native)),
        )))
    }

    fn create_pipeline(
        &self,
        program: &Arc<Program>,
        state: PipelineState,
    ) -> Result<Arc<Pipeline>> {
        let Some(native) = program
            .native
            .as_ref()
            .and_then(|native| native.as_ref().downcast_ref::<WgpuProgram>())
        else {
            return Err(ProcMatError::ShaderCompile(format!(
                "program {} was not compiled by the wgpu backend",
                program.id
            )));
        };

        let blend = state.blend.then_some(wgpu::BlendState::ALPHA_BLENDING);
        let color_targets = [Some(wgpu::ColorTargetState {
            format: self.color_format,
            blend,
            write_mask: wgpu::ColorWrites::ALL,
        })];

        let vertex_buffers = [wgpu::VertexBufferLayout {
            array_stride: VERTEX_STRIDE,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &VERTEX_ATTRIBUTES,
        }];

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Procedural Pipeline"),
                layout: None,
                vertex: wgpu::VertexState {
                    module: &native.vertex,
                    entry_point: Some(ShaderStage::Vertex.entry_point()),
                    buffers: &vertex_buffers,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &native.fragment,
                    entry_point: Some(ShaderStage::Fragment.entry_point()),
                    targets: &color_targets,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: match state.cull_mode {
                        CullMode::None => None,
                        CullMode::Back => Some(wgpu::Face::Back),
                    },
                    ..Default::default()
                },
                depth_stencil: Some(depth_stencil_state(self.depth_format, state)),
                multisample: wgpu::MultisampleState {
                    count: self.sample_count,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                multiview_mask: None,
                cache: None,
            });

        Ok(Arc::new(Pipeline::new(
            program.clone(),
            state,
            Some(Arc::new(pipeline)),
        )))
    }
}

fn depth_stencil_state(
    format: wgpu::TextureFormat,
    state: PipelineState,
) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format,
        depth_write_enabled: Some(state.depth_write),
        depth_compare: Some(if state.depth_test {
            wgpu::CompareFunction::LessEqual
        } else {
            wgpu::CompareFunction::Always
        }),
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}
