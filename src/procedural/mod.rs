//! Procedural Shader Module
//!
//! User-authored shaders bound to a drawable surface:
//!
//! - [`ProceduralData`]: the JSON descriptor (shader URL, version, uniforms,
//!   texture channels)
//! - [`Procedural`]: the engine that resolves sources, caches one pipeline per
//!   [`ProceduralProgramKey`] and uploads uniforms every frame
//! - [`ProceduralContext`]: the caches and backend shared by all engines
//!
//! Shader templates live in `shaders/` and are embedded into the binary.

pub mod context;
pub mod data;
pub mod engine;
pub mod program_key;
pub mod uniforms;

pub use context::ProceduralContext;
pub use data::{MAX_PROCEDURAL_TEXTURE_CHANNELS, ProceduralData};
pub use engine::{FadeState, PROCEDURAL_BLOCK, PROCEDURAL_VERSION, Procedural};
pub use program_key::ProceduralProgramKey;
pub use uniforms::{
    CUSTOM_UNIFORM_SLOT, STANDARD_INPUTS_SLOT, StandardInputs, UniformContext, UniformUpload,
};
