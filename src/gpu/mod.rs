//! GPU abstraction used by the procedural engine and material renderers.
//!
//! - [`batch`]: recorded command list
//! - [`shader`]: WGSL template expansion
//! - [`backend`]: program and pipeline creation seam
//! - [`wgpu_backend`]: the wgpu implementation of that seam

pub mod args;
pub mod backend;
pub mod batch;
pub mod shader;
pub mod wgpu_backend;

pub use args::{RenderArgs, RenderDetails, RenderMode};
pub use backend::{CullMode, Pipeline, PipelineState, Program, RecordingBackend, ShaderBackend};
pub use batch::{Batch, BatchCommand, SPHERE_TRIANGLE_COUNT};
pub use shader::{ShaderReflection, ShaderSource, ShaderStage};
pub use wgpu_backend::WgpuBackend;
