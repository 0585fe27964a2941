//! Material entities and their renderer.

pub mod binding;
pub mod keys;
pub mod material_entity;
pub mod renderer;

pub use binding::{AttachFn, DetachFn, MaterialBindingRegistry, ParentKind};
pub use keys::{ItemKey, ShapeKey};
pub use material_entity::{
    ENTITY_ITEM_DEFAULT_DIMENSIONS, EntityPropertyFlags, MATERIAL_DATA_PREFIX,
    MaterialEntityItem, MaterialEntityProperties, MaterialMappingMode,
};
pub use renderer::MaterialEntityRenderer;
