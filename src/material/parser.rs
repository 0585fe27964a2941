//! Material Descriptor Parser
//!
//! Parses material definition documents:
//!
//! ```json
//! {
//!     "materialVersion": 1,
//!     "materials": [
//!         { "name": "red", "model": "hifi_pbr", "albedo": [1, 0, 0] },
//!         { "name": "fx", "model": "hifi_shader_simple", "procedural": { "shaderUrl": "..." } }
//!     ]
//! }
//! ```
//!
//! Every field is optional. A field with the wrong shape is skipped; only a
//! document that is not an object produces an empty result.

use std::sync::Arc;

use glam::Vec3;
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use url::Url;

use crate::assets::uri::resolve_relative;
use crate::material::procedural_material::{MaterialModel, ProceduralMaterial};
use crate::procedural::ProceduralContext;

/// Materials parsed from one document.
///
/// Duplicate names overwrite earlier entries in the lookup map but still
/// appear once per declaration in `names`.
#[derive(Debug, Default)]
pub struct ParsedMaterials {
    pub version: Option<u32>,
    pub materials: FxHashMap<String, Arc<ProceduralMaterial>>,
    pub names: Vec<String>,
}

impl ParsedMaterials {
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<ProceduralMaterial>> {
        self.materials.get(name)
    }

    /// First declared name, used when no requested name matches.
    #[inline]
    #[must_use]
    pub fn first_name(&self) -> Option<&str> {
        self.names.first().map(String::as_str)
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    fn insert(&mut self, name: String, material: ProceduralMaterial) {
        self.materials.insert(name.clone(), material.into_shared());
        self.names.push(name);
    }
}

/// Parses a material document given as text. Invalid JSON yields an empty
/// set.
pub fn parse_json_materials_str(
    text: &str,
    base_url: Option<&Url>,
    context: &ProceduralContext,
) -> ParsedMaterials {
    match serde_json::from_str::<Value>(text) {
        Ok(document) => parse_json_materials(&document, base_url, context),
        Err(err) => {
            log::warn!("Invalid material JSON: {err}");
            ParsedMaterials::default()
        }
    }
}

pub fn parse_json_materials(
    document: &Value,
    base_url: Option<&Url>,
    context: &ProceduralContext,
) -> ParsedMaterials {
    let mut parsed = ParsedMaterials::default();
    let Some(root) = document.as_object() else {
        return parsed;
    };

    if let Some(version) = root.get("materialVersion").and_then(Value::as_f64) {
        parsed.version = Some(version as u32);
    }

    match root.get("materials") {
        Some(Value::Array(materials)) => {
            for material in materials.iter().filter_map(Value::as_object) {
                let (name, material) = parse_json_material(material, base_url, context);
                parsed.insert(name, material);
            }
        }
        Some(Value::Object(material)) => {
            let (name, material) = parse_json_material(material, base_url, context);
            parsed.insert(name, material);
        }
        _ => {}
    }

    parsed
}

/// Parses one material object. Returns its name (empty when absent).
pub fn parse_json_material(
    json: &Map<String, Value>,
    base_url: Option<&Url>,
    context: &ProceduralContext,
) -> (String, ProceduralMaterial) {
    let mut material = ProceduralMaterial::new(context.clone());
    let model = json
        .get("model")
        .and_then(Value::as_str)
        .map_or(MaterialModel::HifiPbr, MaterialModel::from_name);

    let name = json
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    material.set_name(name.clone());

    match model {
        MaterialModel::HifiPbr => parse_pbr(&mut material, json, base_url),
        MaterialModel::HifiShaderSimple => parse_shader_simple(&mut material, json),
        MaterialModel::Unknown(ref other) => {
            log::warn!("Unknown material model '{other}' for material '{name}'");
        }
    }
    material.set_model(model);

    (name, material)
}

fn parse_pbr(material: &mut ProceduralMaterial, json: &Map<String, Value>, base_url: Option<&Url>) {
    let texture = |key: &str| {
        json.get(key)
            .and_then(Value::as_str)
            .and_then(|raw| resolve_relative(base_url, raw))
    };

    for (key, value) in json {
        match key.as_str() {
            "emissive" => {
                if let Some((color, is_srgb)) = parse_json_color(value) {
                    material.set_emissive(color, is_srgb);
                }
            }
            "albedo" => {
                if let Some((color, is_srgb)) = parse_json_color(value) {
                    material.set_albedo(color, is_srgb);
                }
            }
            "opacity" => {
                if let Some(opacity) = value.as_f64() {
                    material.set_opacity(opacity as f32);
                }
            }
            "unlit" => {
                if let Some(unlit) = value.as_bool() {
                    material.set_unlit(unlit);
                }
            }
            "roughness" => {
                if let Some(roughness) = value.as_f64() {
                    material.set_roughness(roughness as f32);
                }
            }
            "metallic" => {
                if let Some(metallic) = value.as_f64() {
                    material.set_metallic(metallic as f32);
                }
            }
            "scattering" => {
                if let Some(scattering) = value.as_f64() {
                    material.set_scattering(scattering as f32);
                }
            }
            "emissiveMap" => {
                if let Some(url) = texture(key) {
                    material.set_emissive_map(url);
                }
            }
            "albedoMap" => {
                if let Some(url) = texture(key) {
                    // Same texture for both: opacity comes from albedo alpha.
                    let alpha_is_opacity = matches!(
                        (json.get("opacityMap"), value),
                        (Some(Value::String(opacity)), Value::String(albedo)) if opacity == albedo
                    );
                    material.set_albedo_map(url, alpha_is_opacity);
                }
            }
            "roughnessMap" | "glossMap" => {
                if let Some(url) = texture(key) {
                    material.set_roughness_map(url, key == "glossMap");
                }
            }
            "metallicMap" | "specularMap" => {
                if let Some(url) = texture(key) {
                    material.set_metallic_map(url, key == "specularMap");
                }
            }
            "normalMap" | "bumpMap" => {
                if let Some(url) = texture(key) {
                    material.set_normal_map(url, key == "bumpMap");
                }
            }
            "occlusionMap" => {
                if let Some(url) = texture(key) {
                    material.set_occlusion_map(url);
                }
            }
            "scatteringMap" => {
                if let Some(url) = texture(key) {
                    material.set_scattering_map(url);
                }
            }
            "lightMap" => {
                if let Some(url) = texture(key) {
                    material.set_light_map(url);
                }
            }
            _ => {}
        }
    }
}

fn parse_shader_simple(material: &mut ProceduralMaterial, json: &Map<String, Value>) {
    for (key, value) in json {
        match key.as_str() {
            "opacity" => {
                if let Some(opacity) = value.as_f64() {
                    material.set_opacity(opacity as f32);
                }
            }
            "albedo" => {
                if let Some((color, is_srgb)) = parse_json_color(value) {
                    material.set_albedo(color, is_srgb);
                }
            }
            "procedural" => match serde_json::to_string(value) {
                Ok(text) => material.set_procedural_data(&text),
                Err(err) => log::warn!("Cannot serialize procedural descriptor: {err}"),
            },
            _ => {}
        }
    }
}

/// Parses a color given as `[r, g, b, srgb?]` or as an object with
/// `x/y/z`, `r/g/b` or `red/green/blue` members.
///
/// Returns the color and whether it is sRGB encoded (default `true`).
#[must_use]
pub fn parse_json_color(value: &Value) -> Option<(Vec3, bool)> {
    match value {
        Value::Array(components) => {
            let [r, g, b] = [0, 1, 2].map(|i| components.get(i).and_then(Value::as_f64));
            let color = Vec3::new(r? as f32, g? as f32, b? as f32);
            let is_srgb = components.get(3).and_then(Value::as_bool).unwrap_or(true);
            Some((color, is_srgb))
        }
        Value::Object(members) => {
            let component = |names: [&str; 3]| {
                names
                    .iter()
                    .find_map(|name| members.get(*name).and_then(Value::as_f64))
            };
            let r = component(["x", "r", "red"])?;
            let g = component(["y", "g", "green"])?;
            let b = component(["z", "b", "blue"])?;
            Some((Vec3::new(r as f32, g as f32, b as f32), true))
        }
        _ => None,
    }
}
