use crate::gpu::batch::Batch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    #[default]
    Default,
    Shadow,
    Mirror,
}

/// Per-pass counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderDetails {
    pub material_switches: u32,
    pub triangles_rendered: usize,
}

/// Everything a renderer needs to record one draw.
#[derive(Debug, Default)]
pub struct RenderArgs {
    pub batch: Batch,
    pub render_mode: RenderMode,
    pub enable_texturing: bool,
    pub details: RenderDetails,
}

impl RenderArgs {
    #[must_use]
    pub fn new(render_mode: RenderMode) -> Self {
        Self {
            batch: Batch::new(),
            render_mode,
            enable_texturing: true,
            details: RenderDetails::default(),
        }
    }
}
