use url::Url;

use crate::assets::cache::{ResourceCache, ResourceLoader};
use crate::assets::resource::Resource;
use crate::errors::Result;

/// Procedural shader text fetched from a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkShader {
    pub source: String,
}

#[derive(Debug, Default)]
pub struct ShaderSourceLoader;

impl ResourceLoader for ShaderSourceLoader {
    type Output = NetworkShader;
    const KIND: &'static str = "shader";

    fn load(&self, _url: &Url, bytes: Vec<u8>) -> Result<NetworkShader> {
        Ok(NetworkShader {
            source: String::from_utf8(bytes)?,
        })
    }
}

pub type ShaderResource = Resource<NetworkShader>;
pub type ShaderCache = ResourceCache<ShaderSourceLoader>;
