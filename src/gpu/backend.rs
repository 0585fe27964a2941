//! Shader backend seam.
//!
//! The procedural engine asks a [`ShaderBackend`] to turn expanded shader
//! sources into programs and programs plus fixed-function state into
//! pipelines. [`WgpuBackend`](crate::gpu::wgpu_backend::WgpuBackend) does so
//! on a real device; [`RecordingBackend`] only counts and remembers.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::errors::{ProcMatError, Result};
use crate::gpu::shader::ShaderSource;

static NEXT_PROGRAM_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_PIPELINE_ID: AtomicU64 = AtomicU64::new(1);

/// Backend-specific handle.
pub type NativeHandle = Arc<dyn Any + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    None,
    Back,
}

/// Fixed-function state of a procedural pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineState {
    pub cull_mode: CullMode,
    pub depth_test: bool,
    pub depth_write: bool,
    /// Source-alpha blending.
    pub blend: bool,
}

impl PipelineState {
    #[must_use]
    pub const fn opaque() -> Self {
        Self {
            cull_mode: CullMode::Back,
            depth_test: true,
            depth_write: true,
            blend: false,
        }
    }

    #[must_use]
    pub const fn transparent() -> Self {
        Self {
            blend: true,
            ..Self::opaque()
        }
    }
}

/// A linked vertex + fragment program.
#[derive(Debug)]
pub struct Program {
    pub id: u64,
    pub vertex_source: String,
    pub fragment_source: String,
    /// Custom uniform name → slot, as bound at link time.
    pub uniforms: BTreeMap<String, u32>,
    pub native: Option<NativeHandle>,
}

impl Program {
    #[must_use]
    pub fn new(
        vertex_source: String,
        fragment_source: String,
        uniforms: BTreeMap<String, u32>,
        native: Option<NativeHandle>,
    ) -> Self {
        Self {
            id: NEXT_PROGRAM_ID.fetch_add(1, Ordering::Relaxed),
            vertex_source,
            fragment_source,
            uniforms,
            native,
        }
    }
}

#[derive(Debug)]
pub struct Pipeline {
    pub id: u64,
    pub program: Arc<Program>,
    pub state: PipelineState,
    pub native: Option<NativeHandle>,
}

impl Pipeline {
    #[must_use]
    pub fn new(program: Arc<Program>, state: PipelineState, native: Option<NativeHandle>) -> Self {
        Self {
            id: NEXT_PIPELINE_ID.fetch_add(1, Ordering::Relaxed),
            program,
            state,
            native,
        }
    }
}

pub trait ShaderBackend: Send + Sync {
    fn create_program(&self, vertex: &ShaderSource, fragment: &ShaderSource)
    -> Result<Arc<Program>>;

    fn create_pipeline(&self, program: &Arc<Program>, state: PipelineState)
    -> Result<Arc<Pipeline>>;
}

/// Backend that expands templates but never touches a GPU.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    programs_created: AtomicUsize,
    pipelines_created: AtomicUsize,
    fail_compiles: AtomicBool,
    last_program: Mutex<Option<Arc<Program>>>,
}

impl RecordingBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn programs_created(&self) -> usize {
        self.programs_created.load(Ordering::SeqCst)
    }

    pub fn pipelines_created(&self) -> usize {
        self.pipelines_created.load(Ordering::SeqCst)
    }

    /// Makes subsequent program creation fail.
    pub fn set_fail_compiles(&self, fail: bool) {
        self.fail_compiles.store(fail, Ordering::SeqCst);
    }

    pub fn last_program(&self) -> Option<Arc<Program>> {
        self.last_program.lock().clone()
    }
}

impl ShaderBackend for RecordingBackend {
    fn create_program(
        &self,
        vertex: &ShaderSource,
        fragment: &ShaderSource,
    ) -> Result<Arc<Program>> {
        if self.fail_compiles.load(Ordering::SeqCst) {
            return Err(ProcMatError::ShaderCompile(format!(
                "rejected '{}' + '{}'",
                vertex.template, fragment.template
            )));
        }
        let program = Arc::new(Program::new(
            vertex.render()?,
            fragment.render()?,
            fragment.reflection.uniforms.clone(),
            None,
        ));
        self.programs_created.fetch_add(1, Ordering::SeqCst);
        *self.last_program.lock() = Some(program.clone());
        Ok(program)
    }

    fn create_pipeline(
        &self,
        program: &Arc<Program>,
        state: PipelineState,
    ) -> Result<Arc<Pipeline>> {
        self.pipelines_created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(Pipeline::new(program.clone(), state, None)))
    }
}
