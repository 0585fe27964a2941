//! Procedural Material Cache
//!
//! Material documents are fetched once per URL through the shared
//! [`ResourceCache`]; every requester of the same URL receives the same
//! [`MaterialResource`].

use std::sync::Arc;

use url::Url;

use crate::assets::cache::{ResourceCache, ResourceLoader};
use crate::assets::fetch::Fetcher;
use crate::assets::resource::Resource;
use crate::errors::Result;
use crate::material::parser::{ParsedMaterials, parse_json_materials_str};
use crate::procedural::ProceduralContext;

pub struct MaterialLoader {
    context: ProceduralContext,
}

impl MaterialLoader {
    #[must_use]
    pub fn new(context: ProceduralContext) -> Self {
        Self { context }
    }
}

impl ResourceLoader for MaterialLoader {
    type Output = ParsedMaterials;
    const KIND: &'static str = "material";

    fn load(&self, url: &Url, bytes: Vec<u8>) -> Result<ParsedMaterials> {
        // Only JSON documents are understood; anything else loads empty.
        if !url.as_str().contains(".json") {
            log::debug!("Unsupported material document '{url}'");
            return Ok(ParsedMaterials::default());
        }
        let text = String::from_utf8_lossy(&bytes);
        Ok(parse_json_materials_str(&text, Some(url), &self.context))
    }
}

pub type MaterialResource = Resource<ParsedMaterials>;

/// URL-keyed cache of parsed material documents.
pub struct MaterialCache {
    resources: ResourceCache<MaterialLoader>,
}

impl MaterialCache {
    #[must_use]
    pub fn new(context: ProceduralContext, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            resources: ResourceCache::new(MaterialLoader::new(context), fetcher),
        }
    }

    /// Uses the context's own fetcher.
    #[must_use]
    pub fn from_context(context: &ProceduralContext) -> Self {
        Self::new(context.clone(), context.fetcher.clone())
    }

    /// Shared resource for `url`. Starts a fetch unless one is live.
    pub fn get_material(&self, url: &Url) -> Arc<MaterialResource> {
        self.resources.get_resource(url)
    }

    pub fn context(&self) -> &ProceduralContext {
        &self.resources.loader().context
    }

    pub fn pending_fetches(&self) -> usize {
        self.resources.pending_fetches()
    }
}
