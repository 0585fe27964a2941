//! Texture resources for procedural channels and material maps.
//!
//! Fetched bytes are decoded with the `image` crate into tightly packed RGBA8.
//! Sampling state lives on the texture itself so the procedural engine can
//! switch a channel to linear filtering with generated mips at bind time.

use std::sync::atomic::{AtomicBool, Ordering};

use image::GenericImageView;
use parking_lot::RwLock;
use url::Url;

use crate::assets::cache::{ResourceCache, ResourceLoader};
use crate::assets::resource::Resource;
use crate::errors::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureSampler {
    pub address_mode_u: wgpu::AddressMode,
    pub address_mode_v: wgpu::AddressMode,
    pub mag_filter: wgpu::FilterMode,
    pub min_filter: wgpu::FilterMode,
    pub mipmap_filter: wgpu::MipmapFilterMode,
}

impl Default for TextureSampler {
    fn default() -> Self {
        Self {
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
        }
    }
}

impl TextureSampler {
    /// Trilinear filtering with repeat addressing.
    #[must_use]
    pub fn linear() -> Self {
        Self {
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Linear,
            ..Self::default()
        }
    }
}

/// A decoded 2D texture.
#[derive(Debug)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    /// RGBA8, row-major, no padding.
    pub data: Vec<u8>,
    sampler: RwLock<TextureSampler>,
    auto_generate_mips: AtomicBool,
}

impl Texture {
    #[must_use]
    pub fn new_rgba8(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
            sampler: RwLock::new(TextureSampler::default()),
            auto_generate_mips: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn sampler(&self) -> TextureSampler {
        *self.sampler.read()
    }

    pub fn set_sampler(&self, sampler: TextureSampler) {
        *self.sampler.write() = sampler;
    }

    #[inline]
    pub fn auto_generate_mips(&self) -> bool {
        self.auto_generate_mips.load(Ordering::Relaxed)
    }

    pub fn set_auto_generate_mips(&self, enabled: bool) {
        self.auto_generate_mips.store(enabled, Ordering::Relaxed);
    }

    /// Mip chain length for the full texture, down to 1x1.
    #[must_use]
    pub fn mip_level_count(&self) -> u32 {
        if !self.auto_generate_mips() {
            return 1;
        }
        32 - self.width.max(self.height).max(1).leading_zeros()
    }
}

#[derive(Debug, Default)]
pub struct TextureLoader;

impl ResourceLoader for TextureLoader {
    type Output = Texture;
    const KIND: &'static str = "texture";

    fn load(&self, _url: &Url, bytes: Vec<u8>) -> Result<Texture> {
        let img = image::load_from_memory(&bytes)?;
        let (width, height) = img.dimensions();
        Ok(Texture::new_rgba8(width, height, img.into_rgba8().into_raw()))
    }
}

pub type TextureResource = Resource<Texture>;
pub type TextureCache = ResourceCache<TextureLoader>;
