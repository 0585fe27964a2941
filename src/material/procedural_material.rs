use std::sync::Arc;

use bitflags::bitflags;
use glam::{Mat3, Vec2, Vec3};
use parking_lot::RwLock;
use url::Url;

use crate::procedural::{Procedural, ProceduralContext, ProceduralData};

bitflags! {
    /// Summary of a material's inputs, used to pick draw state.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct MaterialKey: u32 {
        const EMISSIVE_VAL      = 1 << 0;
        const UNLIT_VAL         = 1 << 1;
        const METALLIC_VAL      = 1 << 2;
        /// Opacity factor below one.
        const OPACITY_VAL       = 1 << 3;
        const EMISSIVE_MAP      = 1 << 4;
        const ALBEDO_MAP        = 1 << 5;
        /// Albedo alpha doubles as the opacity map.
        const OPACITY_MAP       = 1 << 6;
        const ROUGHNESS_MAP     = 1 << 7;
        const METALLIC_MAP      = 1 << 8;
        const NORMAL_MAP        = 1 << 9;
        const OCCLUSION_MAP     = 1 << 10;
        const SCATTERING_MAP    = 1 << 11;
        const LIGHT_MAP         = 1 << 12;
    }
}

impl MaterialKey {
    #[inline]
    #[must_use]
    pub fn is_translucent(self) -> bool {
        self.intersects(Self::OPACITY_VAL | Self::OPACITY_MAP)
    }

    #[inline]
    #[must_use]
    pub fn is_normal_map(self) -> bool {
        self.contains(Self::NORMAL_MAP)
    }

    #[inline]
    #[must_use]
    pub fn is_light_map(self) -> bool {
        self.contains(Self::LIGHT_MAP)
    }

    #[inline]
    #[must_use]
    pub fn is_unlit(self) -> bool {
        self.contains(Self::UNLIT_VAL)
    }
}

/// Property schema a material was authored with.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MaterialModel {
    #[default]
    HifiPbr,
    HifiShaderSimple,
    Unknown(String),
}

impl MaterialModel {
    pub const HIFI_PBR: &'static str = "hifi_pbr";
    pub const HIFI_SHADER_SIMPLE: &'static str = "hifi_shader_simple";

    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            Self::HIFI_PBR => Self::HifiPbr,
            Self::HIFI_SHADER_SIMPLE => Self::HifiShaderSimple,
            other => Self::Unknown(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::HifiPbr => Self::HIFI_PBR,
            Self::HifiShaderSimple => Self::HIFI_SHADER_SIMPLE,
            Self::Unknown(name) => name,
        }
    }
}

/// UV transform built from the entity's material mapping properties.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureTransform {
    pub translation: Vec2,
    pub scale: Vec2,
    /// Radians.
    pub rotation: f32,
}

impl Default for TextureTransform {
    fn default() -> Self {
        Self {
            translation: Vec2::ZERO,
            scale: Vec2::ONE,
            rotation: 0.0,
        }
    }
}

impl TextureTransform {
    /// Builds a transform from mapping properties, rotation in degrees.
    #[must_use]
    pub fn from_mapping(position: Vec2, rotation_degrees: f32, scale: Vec2) -> Self {
        Self {
            translation: position,
            scale,
            rotation: rotation_degrees.to_radians(),
        }
    }

    /// 3x3 UV matrix: translate * rotate * scale.
    #[must_use]
    pub fn matrix(&self) -> Mat3 {
        Mat3::from_scale_angle_translation(self.scale, self.rotation, self.translation)
    }
}

/// Texture references of a PBR material. Each flag selects an alternate
/// encoding of the same channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialMaps {
    pub emissive: Option<Url>,
    pub albedo: Option<Url>,
    pub albedo_alpha_is_opacity: bool,
    pub roughness: Option<Url>,
    /// The roughness map stores gloss (inverted roughness).
    pub roughness_is_gloss: bool,
    pub metallic: Option<Url>,
    /// The metallic map stores specular.
    pub metallic_is_specular: bool,
    pub normal: Option<Url>,
    /// The normal map stores a height (bump) field.
    pub normal_is_bump: bool,
    pub occlusion: Option<Url>,
    pub scattering: Option<Url>,
    pub light: Option<Url>,
}

#[must_use]
pub fn srgb_to_linear(color: Vec3) -> Vec3 {
    let channel = |c: f32| {
        if c <= 0.040_45 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    Vec3::new(channel(color.x), channel(color.y), channel(color.z))
}

#[must_use]
pub fn linear_to_srgb(color: Vec3) -> Vec3 {
    let channel = |c: f32| {
        if c <= 0.003_130_8 {
            c * 12.92
        } else {
            1.055 * c.powf(1.0 / 2.4) - 0.055
        }
    };
    Vec3::new(channel(color.x), channel(color.y), channel(color.z))
}

/// A parsed material: PBR inputs plus an optional procedural shader.
#[derive(Debug)]
pub struct ProceduralMaterial {
    model: MaterialModel,
    name: String,
    /// Linear.
    albedo: Vec3,
    albedo_is_srgb: bool,
    /// Linear.
    emissive: Vec3,
    opacity: f32,
    unlit: bool,
    roughness: f32,
    metallic: f32,
    scattering: f32,
    maps: MaterialMaps,
    texture_transform: RwLock<TextureTransform>,
    procedural: Procedural,
}

impl ProceduralMaterial {
    #[must_use]
    pub fn new(context: ProceduralContext) -> Self {
        Self {
            model: MaterialModel::default(),
            name: String::new(),
            albedo: Vec3::ONE,
            albedo_is_srgb: true,
            emissive: Vec3::ZERO,
            opacity: 1.0,
            unlit: false,
            roughness: 1.0,
            metallic: 0.0,
            scattering: 0.0,
            maps: MaterialMaps::default(),
            texture_transform: RwLock::new(TextureTransform::default()),
            procedural: Procedural::new(context),
        }
    }

    #[must_use]
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    // --- Identity ---

    pub fn model(&self) -> &MaterialModel {
        &self.model
    }

    pub fn set_model(&mut self, model: MaterialModel) {
        self.model = model;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    // --- Factors ---

    /// Linear albedo.
    pub fn albedo(&self) -> Vec3 {
        self.albedo
    }

    /// Albedo converted back to sRGB.
    pub fn albedo_srgb(&self) -> Vec3 {
        linear_to_srgb(self.albedo)
    }

    /// Whether the albedo was authored in sRGB.
    pub fn is_albedo_srgb(&self) -> bool {
        self.albedo_is_srgb
    }

    pub fn set_albedo(&mut self, color: Vec3, is_srgb: bool) {
        self.albedo_is_srgb = is_srgb;
        self.albedo = if is_srgb { srgb_to_linear(color) } else { color };
    }

    pub fn emissive(&self) -> Vec3 {
        self.emissive
    }

    pub fn set_emissive(&mut self, color: Vec3, is_srgb: bool) {
        self.emissive = if is_srgb { srgb_to_linear(color) } else { color };
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }

    pub fn is_unlit(&self) -> bool {
        self.unlit
    }

    pub fn set_unlit(&mut self, unlit: bool) {
        self.unlit = unlit;
    }

    pub fn roughness(&self) -> f32 {
        self.roughness
    }

    pub fn set_roughness(&mut self, roughness: f32) {
        self.roughness = roughness.clamp(0.0, 1.0);
    }

    pub fn metallic(&self) -> f32 {
        self.metallic
    }

    pub fn set_metallic(&mut self, metallic: f32) {
        self.metallic = metallic.clamp(0.0, 1.0);
    }

    pub fn scattering(&self) -> f32 {
        self.scattering
    }

    pub fn set_scattering(&mut self, scattering: f32) {
        self.scattering = scattering.clamp(0.0, 1.0);
    }

    // --- Maps ---

    pub fn maps(&self) -> &MaterialMaps {
        &self.maps
    }

    pub fn set_emissive_map(&mut self, url: Url) {
        self.maps.emissive = Some(url);
    }

    pub fn set_albedo_map(&mut self, url: Url, alpha_is_opacity: bool) {
        self.maps.albedo = Some(url);
        self.maps.albedo_alpha_is_opacity = alpha_is_opacity;
    }

    pub fn set_roughness_map(&mut self, url: Url, is_gloss: bool) {
        self.maps.roughness = Some(url);
        self.maps.roughness_is_gloss = is_gloss;
    }

    pub fn set_metallic_map(&mut self, url: Url, is_specular: bool) {
        self.maps.metallic = Some(url);
        self.maps.metallic_is_specular = is_specular;
    }

    pub fn set_normal_map(&mut self, url: Url, is_bump: bool) {
        self.maps.normal = Some(url);
        self.maps.normal_is_bump = is_bump;
    }

    pub fn set_occlusion_map(&mut self, url: Url) {
        self.maps.occlusion = Some(url);
    }

    pub fn set_scattering_map(&mut self, url: Url) {
        self.maps.scattering = Some(url);
    }

    pub fn set_light_map(&mut self, url: Url) {
        self.maps.light = Some(url);
    }

    #[must_use]
    pub fn key(&self) -> MaterialKey {
        let mut key = MaterialKey::empty();
        key.set(MaterialKey::EMISSIVE_VAL, self.emissive != Vec3::ZERO);
        key.set(MaterialKey::UNLIT_VAL, self.unlit);
        key.set(MaterialKey::METALLIC_VAL, self.metallic > 0.0);
        key.set(MaterialKey::OPACITY_VAL, self.opacity < 1.0);
        key.set(MaterialKey::EMISSIVE_MAP, self.maps.emissive.is_some());
        key.set(MaterialKey::ALBEDO_MAP, self.maps.albedo.is_some());
        key.set(
            MaterialKey::OPACITY_MAP,
            self.maps.albedo.is_some() && self.maps.albedo_alpha_is_opacity,
        );
        key.set(MaterialKey::ROUGHNESS_MAP, self.maps.roughness.is_some());
        key.set(MaterialKey::METALLIC_MAP, self.maps.metallic.is_some());
        key.set(MaterialKey::NORMAL_MAP, self.maps.normal.is_some());
        key.set(MaterialKey::OCCLUSION_MAP, self.maps.occlusion.is_some());
        key.set(MaterialKey::SCATTERING_MAP, self.maps.scattering.is_some());
        key.set(MaterialKey::LIGHT_MAP, self.maps.light.is_some());
        key
    }

    // --- Texture transform ---

    pub fn texture_transform(&self) -> TextureTransform {
        *self.texture_transform.read()
    }

    pub fn set_texture_transform(&self, transform: TextureTransform) {
        *self.texture_transform.write() = transform;
    }

    // --- Procedural ---

    pub fn procedural(&self) -> &Procedural {
        &self.procedural
    }

    /// Applies an inline procedural descriptor given as JSON text.
    pub fn set_procedural_data(&self, json: &str) {
        self.procedural
            .set_procedural_data(ProceduralData::parse(json));
    }

    /// Whether this material draws through its procedural engine.
    pub fn is_procedural(&self) -> bool {
        self.model == MaterialModel::HifiShaderSimple
    }
}

/// A material bound to a parent at a priority. Higher priorities draw over
/// lower ones.
#[derive(Debug, Clone)]
pub struct MaterialLayer {
    pub material: Arc<ProceduralMaterial>,
    pub priority: u16,
}

impl MaterialLayer {
    #[must_use]
    pub fn new(material: Arc<ProceduralMaterial>, priority: u16) -> Self {
        Self { material, priority }
    }
}
