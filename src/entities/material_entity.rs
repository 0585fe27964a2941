//! Material entity properties.
//!
//! A material entity carries a material reference and the mapping used to
//! apply it to its parent. Every setter records a change flag so edits can
//! be replicated incrementally.

use bitflags::bitflags;
use glam::{Mat4, Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Dimensions every material entity is pinned to.
pub const ENTITY_ITEM_DEFAULT_DIMENSIONS: Vec3 = Vec3::splat(0.1);

/// URL prefix selecting the inline `materialData` document.
pub const MATERIAL_DATA_PREFIX: &str = "materialData";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum MaterialMappingMode {
    #[default]
    Uv,
    Projected,
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct EntityPropertyFlags: u32 {
        const NAME                   = 1 << 0;
        const PARENT_ID              = 1 << 1;
        const POSITION               = 1 << 2;
        const ROTATION               = 1 << 3;
        const VISIBLE                = 1 << 4;
        const MATERIAL_URL           = 1 << 5;
        const MATERIAL_MAPPING_MODE  = 1 << 6;
        const PRIORITY               = 1 << 7;
        const PARENT_MATERIAL_NAME   = 1 << 8;
        const MATERIAL_MAPPING_POS   = 1 << 9;
        const MATERIAL_MAPPING_SCALE = 1 << 10;
        const MATERIAL_MAPPING_ROT   = 1 << 11;
        const MATERIAL_DATA          = 1 << 12;
    }
}

/// Sparse property set. Only fields that are `Some` are applied.
///
/// A nil `parentID` clears the parent.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct MaterialEntityProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "parentID", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Vec3>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Quat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(rename = "materialURL", skip_serializing_if = "Option::is_none")]
    pub material_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material_mapping_mode: Option<MaterialMappingMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_material_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material_mapping_pos: Option<Vec2>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material_mapping_scale: Option<Vec2>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material_mapping_rot: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material_data: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MaterialEntityItem {
    entity_id: Uuid,
    name: String,
    parent_id: Option<Uuid>,
    position: Vec3,
    rotation: Quat,
    visible: bool,

    material_url: String,
    material_mapping_mode: MaterialMappingMode,
    priority: u16,
    parent_material_name: String,
    material_mapping_pos: Vec2,
    material_mapping_scale: Vec2,
    /// Degrees.
    material_mapping_rot: f32,
    material_data: String,

    changed: EntityPropertyFlags,
}

impl Default for MaterialEntityItem {
    fn default() -> Self {
        Self::new(Uuid::new_v4())
    }
}

fn update<T: PartialEq>(
    field: &mut T,
    value: T,
    flag: EntityPropertyFlags,
    changed: &mut EntityPropertyFlags,
) -> bool {
    if *field == value {
        return false;
    }
    *field = value;
    changed.insert(flag);
    true
}

impl MaterialEntityItem {
    #[must_use]
    pub fn new(entity_id: Uuid) -> Self {
        Self {
            entity_id,
            name: String::new(),
            parent_id: None,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            visible: true,
            material_url: String::new(),
            material_mapping_mode: MaterialMappingMode::default(),
            priority: 0,
            parent_material_name: String::new(),
            material_mapping_pos: Vec2::ZERO,
            material_mapping_scale: Vec2::ONE,
            material_mapping_rot: 0.0,
            material_data: String::new(),
            changed: EntityPropertyFlags::empty(),
        }
    }

    /// Builds an entity and applies `properties` on top of the defaults.
    #[must_use]
    pub fn with_properties(entity_id: Uuid, properties: &MaterialEntityProperties) -> Self {
        let mut entity = Self::new(entity_id);
        entity.set_properties(properties);
        entity.changed = EntityPropertyFlags::empty();
        entity
    }

    #[inline]
    pub fn entity_id(&self) -> Uuid {
        self.entity_id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> bool {
        update(&mut self.name, name.into(), EntityPropertyFlags::NAME, &mut self.changed)
    }

    #[inline]
    pub fn parent_id(&self) -> Option<Uuid> {
        self.parent_id
    }

    pub fn set_parent_id(&mut self, parent_id: Option<Uuid>) -> bool {
        let parent_id = parent_id.filter(|id| !id.is_nil());
        update(&mut self.parent_id, parent_id, EntityPropertyFlags::PARENT_ID, &mut self.changed)
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) -> bool {
        update(&mut self.position, position, EntityPropertyFlags::POSITION, &mut self.changed)
    }

    #[inline]
    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn set_rotation(&mut self, rotation: Quat) -> bool {
        update(&mut self.rotation, rotation, EntityPropertyFlags::ROTATION, &mut self.changed)
    }

    #[inline]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) -> bool {
        update(&mut self.visible, visible, EntityPropertyFlags::VISIBLE, &mut self.changed)
    }

    #[inline]
    pub fn material_url(&self) -> &str {
        &self.material_url
    }

    pub fn set_material_url(&mut self, url: impl Into<String>) -> bool {
        update(
            &mut self.material_url,
            url.into(),
            EntityPropertyFlags::MATERIAL_URL,
            &mut self.changed,
        )
    }

    #[inline]
    pub fn material_mapping_mode(&self) -> MaterialMappingMode {
        self.material_mapping_mode
    }

    pub fn set_material_mapping_mode(&mut self, mode: MaterialMappingMode) -> bool {
        update(
            &mut self.material_mapping_mode,
            mode,
            EntityPropertyFlags::MATERIAL_MAPPING_MODE,
            &mut self.changed,
        )
    }

    #[inline]
    pub fn priority(&self) -> u16 {
        self.priority
    }

    pub fn set_priority(&mut self, priority: u16) -> bool {
        update(&mut self.priority, priority, EntityPropertyFlags::PRIORITY, &mut self.changed)
    }

    #[inline]
    pub fn parent_material_name(&self) -> &str {
        &self.parent_material_name
    }

    pub fn set_parent_material_name(&mut self, name: impl Into<String>) -> bool {
        update(
            &mut self.parent_material_name,
            name.into(),
            EntityPropertyFlags::PARENT_MATERIAL_NAME,
            &mut self.changed,
        )
    }

    #[inline]
    pub fn material_mapping_pos(&self) -> Vec2 {
        self.material_mapping_pos
    }

    pub fn set_material_mapping_pos(&mut self, pos: Vec2) -> bool {
        update(
            &mut self.material_mapping_pos,
            pos,
            EntityPropertyFlags::MATERIAL_MAPPING_POS,
            &mut self.changed,
        )
    }

    #[inline]
    pub fn material_mapping_scale(&self) -> Vec2 {
        self.material_mapping_scale
    }

    pub fn set_material_mapping_scale(&mut self, scale: Vec2) -> bool {
        update(
            &mut self.material_mapping_scale,
            scale,
            EntityPropertyFlags::MATERIAL_MAPPING_SCALE,
            &mut self.changed,
        )
    }

    #[inline]
    pub fn material_mapping_rot(&self) -> f32 {
        self.material_mapping_rot
    }

    pub fn set_material_mapping_rot(&mut self, degrees: f32) -> bool {
        update(
            &mut self.material_mapping_rot,
            degrees,
            EntityPropertyFlags::MATERIAL_MAPPING_ROT,
            &mut self.changed,
        )
    }

    #[inline]
    pub fn material_data(&self) -> &str {
        &self.material_data
    }

    pub fn set_material_data(&mut self, data: impl Into<String>) -> bool {
        update(
            &mut self.material_data,
            data.into(),
            EntityPropertyFlags::MATERIAL_DATA,
            &mut self.changed,
        )
    }

    /// Material entities ignore requested dimensions.
    #[inline]
    #[must_use]
    pub fn dimensions(&self) -> Vec3 {
        ENTITY_ITEM_DEFAULT_DIMENSIONS
    }

    /// World transform without scale.
    #[must_use]
    pub fn model_transform(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position)
    }

    /// Snapshot of every property.
    #[must_use]
    pub fn properties(&self) -> MaterialEntityProperties {
        MaterialEntityProperties {
            name: Some(self.name.clone()),
            parent_id: Some(self.parent_id.unwrap_or_else(Uuid::nil)),
            position: Some(self.position),
            rotation: Some(self.rotation),
            visible: Some(self.visible),
            material_url: Some(self.material_url.clone()),
            material_mapping_mode: Some(self.material_mapping_mode),
            priority: Some(self.priority),
            parent_material_name: Some(self.parent_material_name.clone()),
            material_mapping_pos: Some(self.material_mapping_pos),
            material_mapping_scale: Some(self.material_mapping_scale),
            material_mapping_rot: Some(self.material_mapping_rot),
            material_data: Some(self.material_data.clone()),
        }
    }

    /// Applies every supplied property. Returns whether anything changed.
    pub fn set_properties(&mut self, properties: &MaterialEntityProperties) -> bool {
        let mut changed = false;
        if let Some(name) = &properties.name {
            changed |= self.set_name(name.clone());
        }
        if let Some(parent_id) = properties.parent_id {
            changed |= self.set_parent_id(Some(parent_id));
        }
        if let Some(position) = properties.position {
            changed |= self.set_position(position);
        }
        if let Some(rotation) = properties.rotation {
            changed |= self.set_rotation(rotation);
        }
        if let Some(visible) = properties.visible {
            changed |= self.set_visible(visible);
        }
        if let Some(url) = &properties.material_url {
            changed |= self.set_material_url(url.clone());
        }
        if let Some(mode) = properties.material_mapping_mode {
            changed |= self.set_material_mapping_mode(mode);
        }
        if let Some(priority) = properties.priority {
            changed |= self.set_priority(priority);
        }
        if let Some(name) = &properties.parent_material_name {
            changed |= self.set_parent_material_name(name.clone());
        }
        if let Some(pos) = properties.material_mapping_pos {
            changed |= self.set_material_mapping_pos(pos);
        }
        if let Some(scale) = properties.material_mapping_scale {
            changed |= self.set_material_mapping_scale(scale);
        }
        if let Some(rot) = properties.material_mapping_rot {
            changed |= self.set_material_mapping_rot(rot);
        }
        if let Some(data) = &properties.material_data {
            changed |= self.set_material_data(data.clone());
        }
        changed
    }

    /// Properties changed since the last call.
    pub fn take_changed_properties(&mut self) -> EntityPropertyFlags {
        std::mem::take(&mut self.changed)
    }

    #[inline]
    pub fn changed_properties(&self) -> EntityPropertyFlags {
        self.changed
    }

    pub fn debug_dump(&self) {
        log::debug!("MATERIAL entity {}", self.entity_id);
        log::debug!("                   name: {}", self.name);
        log::debug!("           material url: {}", self.material_url);
        log::debug!("  material mapping mode: {:?}", self.material_mapping_mode);
        log::debug!("               priority: {}", self.priority);
        log::debug!("   parent material name: {}", self.parent_material_name);
        log::debug!("   material mapping pos: {}", self.material_mapping_pos);
        log::debug!(" material mapping scale: {}", self.material_mapping_scale);
        log::debug!("   material mapping rot: {}", self.material_mapping_rot);
        log::debug!("               position: {}", self.position);
        log::debug!("             dimensions: {}", self.dimensions());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setters_record_changes_once() {
        let mut entity = MaterialEntityItem::default();
        assert!(entity.set_priority(3));
        assert!(!entity.set_priority(3));
        assert!(entity.set_material_url("https://example.com/m.json"));
        assert_eq!(
            entity.take_changed_properties(),
            EntityPropertyFlags::PRIORITY | EntityPropertyFlags::MATERIAL_URL
        );
        assert!(entity.take_changed_properties().is_empty());
    }

    #[test]
    fn nil_parent_clears_parent() {
        let mut entity = MaterialEntityItem::default();
        let parent = Uuid::new_v4();
        entity.set_parent_id(Some(parent));
        assert_eq!(entity.parent_id(), Some(parent));
        entity.set_parent_id(Some(Uuid::nil()));
        assert_eq!(entity.parent_id(), None);
    }

    #[test]
    fn properties_deserialize_sparse() {
        let properties: MaterialEntityProperties = serde_json::from_str(
            r#"{"materialURL": "materialData", "priority": 2, "materialMappingScale": [2, 2]}"#,
        )
        .unwrap();
        let mut entity = MaterialEntityItem::default();
        assert!(entity.set_properties(&properties));
        assert_eq!(entity.material_url(), "materialData");
        assert_eq!(entity.priority(), 2);
        assert_eq!(entity.material_mapping_scale(), Vec2::splat(2.0));
        assert_eq!(entity.material_mapping_mode(), MaterialMappingMode::Uv);
        assert!(!entity.set_properties(&properties));
    }

    #[test]
    fn dimensions_are_pinned() {
        let entity = MaterialEntityItem::default();
        assert_eq!(entity.dimensions(), ENTITY_ITEM_DEFAULT_DIMENSIONS);
    }

    #[test]
    fn model_transform_has_no_scale() {
        let mut entity = MaterialEntityItem::default();
        entity.set_position(Vec3::new(1.0, 2.0, 3.0));
        let (scale, _, translation) = entity.model_transform().to_scale_rotation_translation();
        assert!(scale.abs_diff_eq(Vec3::ONE, 1e-5));
        assert_eq!(translation, Vec3::new(1.0, 2.0, 3.0));
    }
}
