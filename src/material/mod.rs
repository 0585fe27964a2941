//! Materials
//!
//! - [`ProceduralMaterial`]: PBR inputs plus an embedded procedural engine
//! - [`parser`]: material definition documents
//! - [`MaterialCache`]: URL-keyed, deduplicated document fetches

pub mod cache;
pub mod parser;
pub mod procedural_material;

pub use cache::{MaterialCache, MaterialLoader, MaterialResource};
pub use parser::{
    ParsedMaterials, parse_json_color, parse_json_material, parse_json_materials,
    parse_json_materials_str,
};
pub use procedural_material::{
    MaterialKey, MaterialLayer, MaterialMaps, MaterialModel, ProceduralMaterial,
    TextureTransform, linear_to_srgb, srgb_to_linear,
};
