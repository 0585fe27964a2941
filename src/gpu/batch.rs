//! Recorded draw commands.
//!
//! A [`Batch`] is an ordered command list filled during a render pass and
//! replayed by the backend. Recording is allocation-only: nothing touches
//! the GPU until the batch is submitted.

use std::sync::Arc;

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::assets::texture_cache::Texture;
use crate::gpu::backend::Pipeline;
use crate::material::ProceduralMaterial;

/// Triangles in the unit sphere drawn by [`BatchCommand::DrawSphere`].
pub const SPHERE_TRIANGLE_COUNT: usize = 2 * 24 * 12;

#[derive(Debug, Clone)]
pub enum BatchCommand {
    SetPipeline(Arc<Pipeline>),
    Uniform1f {
        slot: u32,
        value: f32,
    },
    Uniform2f {
        slot: u32,
        value: Vec2,
    },
    Uniform3f {
        slot: u32,
        value: Vec3,
    },
    Uniform4f {
        slot: u32,
        value: Vec4,
    },
    SetUniformBuffer {
        slot: u32,
        data: Vec<u8>,
    },
    SetResourceTexture {
        slot: u32,
        texture: Option<Arc<Texture>>,
    },
    SetModelTransform(Mat4),
    BindMaterial {
        material: Arc<ProceduralMaterial>,
        enable_texturing: bool,
    },
    /// Unit sphere. `color` is the vertex color when set.
    DrawSphere {
        color: Option<Vec4>,
    },
}

#[derive(Debug, Default, Clone)]
pub struct Batch {
    commands: Vec<BatchCommand>,
}

impl Batch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn set_pipeline(&mut self, pipeline: Arc<Pipeline>) {
        self.commands.push(BatchCommand::SetPipeline(pipeline));
    }

    #[inline]
    pub fn uniform1f(&mut self, slot: u32, value: f32) {
        self.commands.push(BatchCommand::Uniform1f { slot, value });
    }

    #[inline]
    pub fn uniform2f(&mut self, slot: u32, value: Vec2) {
        self.commands.push(BatchCommand::Uniform2f { slot, value });
    }

    #[inline]
    pub fn uniform3f(&mut self, slot: u32, value: Vec3) {
        self.commands.push(BatchCommand::Uniform3f { slot, value });
    }

    #[inline]
    pub fn uniform4f(&mut self, slot: u32, value: Vec4) {
        self.commands.push(BatchCommand::Uniform4f { slot, value });
    }

    pub fn set_uniform_buffer(&mut self, slot: u32, data: &[u8]) {
        self.commands.push(BatchCommand::SetUniformBuffer {
            slot,
            data: data.to_vec(),
        });
    }

    pub fn set_resource_texture(&mut self, slot: u32, texture: Option<Arc<Texture>>) {
        self.commands
            .push(BatchCommand::SetResourceTexture { slot, texture });
    }

    pub fn set_model_transform(&mut self, transform: Mat4) {
        self.commands.push(BatchCommand::SetModelTransform(transform));
    }

    pub fn bind_material(&mut self, material: Arc<ProceduralMaterial>, enable_texturing: bool) {
        self.commands.push(BatchCommand::BindMaterial {
            material,
            enable_texturing,
        });
    }

    pub fn draw_sphere(&mut self, color: Option<Vec4>) {
        self.commands.push(BatchCommand::DrawSphere { color });
    }

    #[inline]
    #[must_use]
    pub fn commands(&self) -> &[BatchCommand] {
        &self.commands
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Contents of the most recent uniform buffer upload at `slot`.
    #[must_use]
    pub fn last_uniform_buffer(&self, slot: u32) -> Option<&[u8]> {
        self.commands.iter().rev().find_map(|cmd| match cmd {
            BatchCommand::SetUniformBuffer { slot: s, data } if *s == slot => Some(data.as_slice()),
            _ => None,
        })
    }

    /// Number of pipeline binds recorded.
    #[must_use]
    pub fn pipeline_binds(&self) -> usize {
        self.commands
            .iter()
            .filter(|cmd| matches!(cmd, BatchCommand::SetPipeline(_)))
            .count()
    }
}
