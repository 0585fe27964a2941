pub mod cache;
pub mod embedded;
pub mod fetch;
pub mod resource;
pub mod shader_cache;
pub mod texture_cache;
pub mod uri;

pub use cache::{ResourceCache, ResourceLoader};
pub use embedded::EmbeddedAssets;
pub use fetch::{FetchCallback, Fetcher, ManualFetcher, ThreadedFetcher};
pub use resource::{FinishedCallback, Resource, ResourceState};
pub use shader_cache::{NetworkShader, ShaderCache, ShaderSourceLoader, ShaderResource};
pub use texture_cache::{Texture, TextureCache, TextureLoader, TextureResource, TextureSampler};
pub use uri::{EMBEDDED_SCHEME, embedded_path, normalize_url, resolve_relative};
