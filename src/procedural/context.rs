use std::sync::Arc;

use crate::assets::fetch::Fetcher;
use crate::assets::shader_cache::{ShaderCache, ShaderSourceLoader};
use crate::assets::texture_cache::{TextureCache, TextureLoader};
use crate::gpu::backend::ShaderBackend;
use crate::settings::ProceduralSettings;

/// Shared services every procedural engine draws from.
///
/// Cheap to clone; all members are reference counted.
#[derive(Clone)]
pub struct ProceduralContext {
    pub fetcher: Arc<dyn Fetcher>,
    pub shader_cache: Arc<ShaderCache>,
    pub texture_cache: Arc<TextureCache>,
    pub backend: Arc<dyn ShaderBackend>,
    pub settings: ProceduralSettings,
}

impl ProceduralContext {
    pub fn new(fetcher: Arc<dyn Fetcher>, backend: Arc<dyn ShaderBackend>) -> Self {
        Self::with_settings(fetcher, backend, ProceduralSettings::default())
    }

    pub fn with_settings(
        fetcher: Arc<dyn Fetcher>,
        backend: Arc<dyn ShaderBackend>,
        settings: ProceduralSettings,
    ) -> Self {
        Self {
            shader_cache: Arc::new(ShaderCache::new(ShaderSourceLoader, fetcher.clone())),
            texture_cache: Arc::new(TextureCache::new(TextureLoader, fetcher.clone())),
            fetcher,
            backend,
            settings,
        }
    }
}
