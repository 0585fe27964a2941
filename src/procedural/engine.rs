//! Procedural Shader Engine
//!
//! A [`Procedural`] owns one descriptor and everything derived from it: the
//! resolved shader sources, up to four texture channels, a pipeline per
//! [`ProceduralProgramKey`] and the per-frame uniform uploads.
//!
//! # Lifecycle
//!
//! 1. [`Procedural::set_procedural_data`] diffs the new descriptor against the
//!    current one and marks the shader and/or uniforms dirty.
//! 2. [`Procedural::is_ready`] reports whether every configured source and
//!    channel has loaded. The first `true` starts the fade-in clock.
//! 3. [`Procedural::prepare`] runs once per drawn frame: it refreshes sources,
//!    builds missing pipelines, rebuilds uploads when needed, and records the
//!    pipeline, uniforms and textures into the batch.
//!
//! All three lock the same mutex, so descriptors may be applied from any
//! thread while the render thread prepares.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use glam::{Mat3, Quat, Vec2, Vec3, Vec4};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use url::Url;

use crate::assets::embedded::EmbeddedAssets;
use crate::assets::shader_cache::ShaderResource;
use crate::assets::texture_cache::{TextureResource, TextureSampler};
use crate::assets::uri::{EMBEDDED_SCHEME, embedded_path, normalize_url};
use crate::errors::Result;
use crate::gpu::backend::{Pipeline, PipelineState};
use crate::gpu::batch::Batch;
use crate::gpu::shader::{ShaderSource, ShaderStage};
use crate::procedural::context::ProceduralContext;
use crate::procedural::data::{MAX_PROCEDURAL_TEXTURE_CHANNELS, ProceduralData};
use crate::procedural::program_key::ProceduralProgramKey;
use crate::procedural::uniforms::{
    CUSTOM_UNIFORM_SLOT, UniformContext, UniformUpload, build_uniform_uploads,
};

/// Substitution point for the version constant.
pub const PROCEDURAL_VERSION: &str = "PROCEDURAL_VERSION";
/// Substitution point for the user shader text.
pub const PROCEDURAL_BLOCK: &str = "PROCEDURAL_BLOCK";

const VERTEX_TEMPLATE: &str = "procedural_vertex";
const VERTEX_SKINNED_TEMPLATE: &str = "procedural_vertex_skinned";
const VERTEX_SKINNED_DQ_TEMPLATE: &str = "procedural_vertex_skinned_dq";
const FRAGMENT_OPAQUE_TEMPLATE: &str = "procedural_fragment";
const FRAGMENT_TRANSPARENT_TEMPLATE: &str = "procedural_fragment_transparent";

/// Fade-in latch, set the first time the engine reports ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FadeState {
    #[default]
    NotStarted,
    Started(Instant),
}

/// Where a stage's procedural text comes from.
#[derive(Debug, Clone, Default)]
enum ShaderOrigin {
    #[default]
    None,
    /// Local file and the mtime of the last read (`None` until read).
    Local {
        path: PathBuf,
        read_at: Option<SystemTime>,
    },
    Embedded {
        path: String,
        read: bool,
    },
    Network(Arc<ShaderResource>),
}

#[derive(Debug, Clone, Default)]
struct ShaderSlot {
    origin: ShaderOrigin,
    source: String,
}

impl ShaderSlot {
    fn is_configured(&self) -> bool {
        !matches!(self.origin, ShaderOrigin::None)
    }

    fn is_loaded(&self) -> bool {
        match &self.origin {
            ShaderOrigin::None => false,
            ShaderOrigin::Local { .. } | ShaderOrigin::Embedded { .. } => true,
            ShaderOrigin::Network(resource) => resource.is_loaded(),
        }
    }

    fn reset(&mut self) {
        self.origin = ShaderOrigin::None;
        self.source.clear();
    }

    /// Pulls new text from the origin. Returns `true` if the text changed.
    fn refresh(&mut self, hot_reload: bool) -> bool {
        match &mut self.origin {
            ShaderOrigin::None => false,
            ShaderOrigin::Local { path, read_at } => {
                if read_at.is_some() && !hot_reload {
                    return false;
                }
                let modified = std::fs::metadata(&*path)
                    .and_then(|meta| meta.modified())
                    .unwrap_or(UNIX_EPOCH);
                if read_at.is_some_and(|last| modified <= last) {
                    return false;
                }
                *read_at = Some(modified);
                match std::fs::read_to_string(&*path) {
                    Ok(text) => {
                        log::debug!("Loaded procedural shader '{}'", path.display());
                        self.source = text;
                        true
                    }
                    Err(err) => {
                        log::warn!("Cannot read shader '{}': {}", path.display(), err);
                        false
                    }
                }
            }
            ShaderOrigin::Embedded { path, read } => {
                if *read {
                    return false;
                }
                *read = true;
                match EmbeddedAssets::read_to_string(path) {
                    Some(text) => {
                        self.source = text;
                        true
                    }
                    None => {
                        log::warn!("Embedded shader '{path}' not found");
                        false
                    }
                }
            }
            ShaderOrigin::Network(resource) => match resource.data() {
                Some(shader) if shader.source != self.source => {
                    self.source.clone_from(&shader.source);
                    true
                }
                _ => false,
            },
        }
    }
}

struct ProceduralState {
    data: ProceduralData,
    enabled: bool,
    shader_dirty: bool,
    uniforms_dirty: bool,
    vertex: ShaderSlot,
    fragment: ShaderSlot,
    channels: [Option<Arc<TextureResource>>; MAX_PROCEDURAL_TEXTURE_CHANNELS],
    pipelines: FxHashMap<ProceduralProgramKey, Arc<Pipeline>>,
    uploads: Vec<UniformUpload>,
    frame: UniformContext,
    previous_key: Option<ProceduralProgramKey>,
    fade: FadeState,
    pipeline_builds: usize,
    last_build_error: Option<String>,
}

impl Default for ProceduralState {
    fn default() -> Self {
        Self {
            data: ProceduralData::default(),
            enabled: false,
            shader_dirty: false,
            uniforms_dirty: false,
            vertex: ShaderSlot::default(),
            fragment: ShaderSlot::default(),
            channels: Default::default(),
            pipelines: FxHashMap::default(),
            uploads: Vec::new(),
            frame: UniformContext::default(),
            previous_key: None,
            fade: FadeState::NotStarted,
            pipeline_builds: 0,
            last_build_error: None,
        }
    }
}

/// Runtime engine for one procedural shader descriptor.
pub struct Procedural {
    context: ProceduralContext,
    state: Mutex<ProceduralState>,
}

impl fmt::Debug for Procedural {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Procedural")
            .field("data", &state.data)
            .field("enabled", &state.enabled)
            .field("pipelines", &state.pipelines.len())
            .finish_non_exhaustive()
    }
}

impl Procedural {
    #[must_use]
    pub fn new(context: ProceduralContext) -> Self {
        Self {
            context,
            state: Mutex::new(ProceduralState::default()),
        }
    }

    /// Copies the descriptor, sources and channels. Compiled pipelines and
    /// uploads are not shared; the copy builds its own on first prepare.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        let state = self.state.lock();
        let copy = ProceduralState {
            data: state.data.clone(),
            enabled: state.enabled,
            shader_dirty: true,
            uniforms_dirty: true,
            vertex: state.vertex.clone(),
            fragment: state.fragment.clone(),
            channels: state.channels.clone(),
            ..ProceduralState::default()
        };
        Self {
            context: self.context.clone(),
            state: Mutex::new(copy),
        }
    }

    /// Applies a new descriptor. No-op when it equals the current one.
    pub fn set_procedural_data(&self, data: ProceduralData) {
        let mut state = self.state.lock();
        if data == state.data {
            return;
        }

        state.enabled = false;

        if data.version != state.data.version {
            state.data.version = data.version;
            state.shader_dirty = true;
        }

        if data.uniforms != state.data.uniforms {
            // New names need new reflection slots.
            if !data.uniforms.keys().eq(state.data.uniforms.keys()) {
                state.shader_dirty = true;
            }
            state.data.uniforms = data.uniforms;
            state.uniforms_dirty = true;
        }

        if data.channels != state.data.channels {
            state.data.channels = data.channels;
            self.resolve_channels(&mut state);
        }

        if data.fragment_shader_url != state.data.fragment_shader_url {
            state.data.fragment_shader_url = data.fragment_shader_url;
            state.shader_dirty = true;
            state.fragment.reset();

            let Some(url) = state.data.fragment_shader_url.clone() else {
                log::warn!("Invalid fragment shader URL");
                return;
            };
            let Some(origin) = self.resolve_origin(&url) else {
                return;
            };
            state.fragment.origin = origin;
        }

        // Vertex shader URLs are tracked for equality but never activated.
        state.data.vertex_shader_url = data.vertex_shader_url;

        state.enabled = true;
    }

    fn resolve_origin(&self, url: &Url) -> Option<ShaderOrigin> {
        match url.scheme() {
            "file" => {
                let Ok(path) = url.to_file_path() else {
                    log::warn!("Invalid shader file URL '{url}'");
                    return None;
                };
                if !path.exists() {
                    log::warn!("Shader file not found: '{}'", path.display());
                    return None;
                }
                Some(ShaderOrigin::Local {
                    path,
                    read_at: None,
                })
            }
            EMBEDDED_SCHEME => embedded_path(url).map(|path| ShaderOrigin::Embedded {
                path: path.to_string(),
                read: false,
            }),
            _ => Some(ShaderOrigin::Network(
                self.context.shader_cache.get_resource(url),
            )),
        }
    }

    fn resolve_channels(&self, state: &mut ProceduralState) {
        let ProceduralState { data, channels, .. } = state;
        for (index, slot) in channels.iter_mut().enumerate() {
            *slot = data
                .channels
                .get(index)
                .and_then(|raw| normalize_url(raw))
                .map(|url| self.context.texture_cache.get_resource(&url));
        }
        if data.channels.len() > MAX_PROCEDURAL_TEXTURE_CHANNELS {
            log::debug!(
                "Ignoring {} procedural channels beyond the first {}",
                data.channels.len() - MAX_PROCEDURAL_TEXTURE_CHANNELS,
                MAX_PROCEDURAL_TEXTURE_CHANNELS
            );
        }
    }

    /// Whether the engine can draw: enabled, at least one configured shader,
    /// and every configured shader and bound channel loaded.
    ///
    /// The first `true` latches the fade-in start time.
    pub fn is_ready(&self) -> bool {
        if cfg!(feature = "gles") {
            return false;
        }

        let mut state = self.state.lock();
        if !state.enabled {
            return false;
        }

        let has_shader = state.vertex.is_configured() || state.fragment.is_configured();
        if !has_shader {
            return false;
        }
        for slot in [&state.vertex, &state.fragment] {
            if slot.is_configured() && !slot.is_loaded() {
                return false;
            }
        }
        if state
            .channels
            .iter()
            .flatten()
            .any(|channel| !channel.is_loaded())
        {
            return false;
        }

        if state.fade == FadeState::NotStarted {
            state.fade = FadeState::Started(Instant::now());
        }
        true
    }

    /// Records the pipeline, uniforms and channel textures for one draw.
    pub fn prepare(
        &self,
        batch: &mut Batch,
        position: Vec3,
        size: Vec3,
        orientation: Quat,
        key: ProceduralProgramKey,
    ) {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        state.frame.position = position;
        state.frame.scale = size;
        state.frame.orientation = Mat3::from_quat(orientation);

        let hot_reload = self.context.settings.hot_reload_local_shaders;
        if state.vertex.refresh(hot_reload) | state.fragment.refresh(hot_reload) {
            state.shader_dirty = true;
        }

        if state.shader_dirty {
            state.pipelines.clear();
        }

        let mut recompiled = false;
        let pipeline = if let Some(pipeline) = state.pipelines.get(&key) {
            pipeline.clone()
        } else {
            match self.build_pipeline(state, key) {
                Ok(pipeline) => {
                    state.pipelines.insert(key, pipeline.clone());
                    state.pipeline_builds += 1;
                    state.last_build_error = None;
                    state.frame.restart();
                    recompiled = true;
                    pipeline
                }
                Err(err) => {
                    let message = err.to_string();
                    if state.last_build_error.as_deref() != Some(message.as_str()) {
                        log::warn!("Failed to build procedural pipeline {key:?}: {message}");
                        state.last_build_error = Some(message);
                    }
                    state.shader_dirty = false;
                    return;
                }
            }
        };

        batch.set_pipeline(pipeline);

        let rebuild_uploads = state.shader_dirty
            || state.uniforms_dirty
            || recompiled
            || state.previous_key != Some(key);
        if rebuild_uploads {
            state.uploads = build_uniform_uploads(&state.data.uniforms);
        }
        state.previous_key = Some(key);
        state.shader_dirty = false;
        state.uniforms_dirty = false;

        for (extent, channel) in state.frame.channel_sizes.iter_mut().zip(&state.channels) {
            *extent = channel.as_ref().map(|resource| {
                resource
                    .data()
                    .map_or(Vec2::ZERO, |tex| Vec2::new(tex.width as f32, tex.height as f32))
            });
        }

        for upload in &state.uploads {
            upload(batch, &mut state.frame);
        }

        for (slot, channel) in state.channels.iter().enumerate() {
            if let Some(texture) = channel.as_ref().and_then(|resource| resource.data()) {
                texture.set_sampler(TextureSampler::linear());
                texture.set_auto_generate_mips(true);
                batch.set_resource_texture(slot as u32, Some(texture));
            }
        }
    }

    fn build_pipeline(
        &self,
        state: &ProceduralState,
        key: ProceduralProgramKey,
    ) -> Result<Arc<Pipeline>> {
        let vertex_template = if key.is_skinned_dq() {
            VERTEX_SKINNED_DQ_TEMPLATE
        } else if key.is_skinned() {
            VERTEX_SKINNED_TEMPLATE
        } else {
            VERTEX_TEMPLATE
        };
        let (fragment_template, pipeline_state) = if key.is_transparent() {
            (FRAGMENT_TRANSPARENT_TEMPLATE, PipelineState::transparent())
        } else {
            (FRAGMENT_OPAQUE_TEMPLATE, PipelineState::opaque())
        };

        let version = version_define(state.data.version);
        let mut vertex = ShaderSource::new(ShaderStage::Vertex, vertex_template)
            .with_replacement(PROCEDURAL_VERSION, version.clone())
            .with_replacement(PROCEDURAL_BLOCK, state.vertex.source.clone());
        let mut fragment = ShaderSource::new(ShaderStage::Fragment, fragment_template)
            .with_replacement(PROCEDURAL_VERSION, version)
            .with_replacement(PROCEDURAL_BLOCK, state.fragment.source.clone());

        for (name, slot) in state.data.uniforms.keys().zip(CUSTOM_UNIFORM_SLOT..) {
            vertex.reflection.uniforms.insert(name.clone(), slot);
            fragment.reflection.uniforms.insert(name.clone(), slot);
        }

        let backend = &self.context.backend;
        let program = backend.create_program(&vertex, &fragment)?;
        if self.context.settings.log_generated_shaders {
            log::trace!(
                "Procedural program {}:\n{}\n{}",
                program.id,
                program.vertex_source,
                program.fragment_source
            );
        }
        backend.create_pipeline(&program, pipeline_state)
    }

    /// Version 1 content always renders opaque white. Later versions pass the
    /// entity color through.
    pub fn get_color(&self, entity_color: Vec4) -> Vec4 {
        if self.state.lock().data.version == 1 {
            Vec4::ONE
        } else {
            entity_color
        }
    }

    pub fn data(&self) -> ProceduralData {
        self.state.lock().data.clone()
    }

    pub fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    pub fn is_shader_dirty(&self) -> bool {
        self.state.lock().shader_dirty
    }

    pub fn are_uniforms_dirty(&self) -> bool {
        self.state.lock().uniforms_dirty
    }

    pub fn fade_state(&self) -> FadeState {
        self.state.lock().fade
    }

    pub fn is_fading(&self) -> bool {
        matches!(self.fade_state(), FadeState::Started(_))
    }

    /// Number of pipelines built over the engine's lifetime.
    pub fn pipeline_build_count(&self) -> usize {
        self.state.lock().pipeline_builds
    }

    /// Number of pipeline variants currently cached.
    pub fn cached_pipeline_count(&self) -> usize {
        self.state.lock().pipelines.len()
    }

    /// Texture bound to `channel`, if any.
    pub fn channel(&self, channel: usize) -> Option<Arc<TextureResource>> {
        self.state.lock().channels.get(channel).cloned().flatten()
    }
}

fn version_define(version: u8) -> String {
    match version {
        1..=3 => format!("const PROCEDURAL_VERSION: i32 = {version};"),
        _ => String::new(),
    }
}
