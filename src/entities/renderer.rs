//! Material Entity Renderer
//!
//! Mirrors the material-relevant properties of one [`MaterialEntityItem`],
//! resolves its material (inline `materialData` or a network document) and
//! keeps it attached to the entity's parent through the
//! [`MaterialBindingRegistry`].
//!
//! # Update cycle
//!
//! The host calls [`MaterialEntityRenderer::needs_render_update_from_typed_entity`]
//! and, when it returns `true` or [`MaterialEntityRenderer::needs_render_update`]
//! does, [`MaterialEntityRenderer::do_render_update_synchronous_typed`]. A failed
//! attach keeps `needs_render_update` true so the attach is retried on every
//! following cycle until the parent shows up or the parent id changes.
//!
//! Network document completions arrive on fetch threads; they are queued and
//! applied on the next update pass.

use std::sync::Arc;

use flume::{Receiver, Sender};
use glam::{Mat4, Vec2};
use url::Url;
use uuid::Uuid;

use crate::assets::uri::normalize_url;
use crate::entities::binding::{MaterialBindingRegistry, ParentKind};
use crate::entities::keys::{ItemKey, ShapeKey};
use crate::entities::material_entity::{MATERIAL_DATA_PREFIX, MaterialEntityItem};
use crate::gpu::args::{RenderArgs, RenderMode};
use crate::gpu::batch::SPHERE_TRIANGLE_COUNT;
use crate::material::{
    MaterialCache, MaterialLayer, MaterialResource, ParsedMaterials, ProceduralMaterial,
    TextureTransform, parse_json_materials_str,
};
use crate::procedural::ProceduralProgramKey;

/// Proxy spheres are drawn at half the entity's dimensions.
const MATERIAL_ENTITY_SCALE: f32 = 0.5;

/// Base for relative texture references in inline material data: the
/// material URL when it is absolute, else the working directory.
fn inline_base_url(material_url: &str) -> Option<Url> {
    normalize_url(material_url)
        .filter(|url| !url.cannot_be_a_base())
        .or_else(|| {
            std::env::current_dir()
                .ok()
                .and_then(|dir| Url::from_directory_path(dir).ok())
        })
}

/// Network document completion, tagged with the URL generation that issued it.
#[derive(Debug, Clone, Copy)]
struct LoadEvent {
    generation: u64,
    success: bool,
}

/// The parent a material is currently attached to.
#[derive(Debug, Clone)]
struct Attachment {
    parent: Uuid,
    kind: ParentKind,
    material: Arc<ProceduralMaterial>,
    slot: String,
}

pub struct MaterialEntityRenderer {
    registry: Arc<MaterialBindingRegistry>,
    materials: Arc<MaterialCache>,

    material_url: String,
    parent_id: Option<Uuid>,
    material_mapping_pos: Vec2,
    material_mapping_scale: Vec2,
    material_mapping_rot: f32,
    priority: u16,
    parent_material_name: String,
    material_data: String,
    visible: bool,
    render_transform: Mat4,

    current_material_name: String,
    parsed_materials: Arc<ParsedMaterials>,
    network_material: Option<Arc<MaterialResource>>,
    url_generation: u64,
    load_tx: Sender<LoadEvent>,
    load_rx: Receiver<LoadEvent>,

    attachment: Option<Attachment>,
    retry_apply: bool,
}

impl MaterialEntityRenderer {
    #[must_use]
    pub fn new(registry: Arc<MaterialBindingRegistry>, materials: Arc<MaterialCache>) -> Self {
        let (load_tx, load_rx) = flume::unbounded();
        Self {
            registry,
            materials,
            material_url: String::new(),
            parent_id: None,
            material_mapping_pos: Vec2::ZERO,
            material_mapping_scale: Vec2::ONE,
            material_mapping_rot: 0.0,
            priority: 0,
            parent_material_name: String::new(),
            material_data: String::new(),
            visible: true,
            render_transform: Mat4::IDENTITY,
            current_material_name: String::new(),
            parsed_materials: Arc::default(),
            network_material: None,
            url_generation: 0,
            load_tx,
            load_rx,
            attachment: None,
            retry_apply: false,
        }
    }

    // ========================================================================
    // Update
    // ========================================================================

    /// `true` while an attach is waiting for its parent or a document load
    /// is queued.
    pub fn needs_render_update(&self) -> bool {
        self.retry_apply || !self.load_rx.is_empty()
    }

    /// Whether any mirrored property differs from `entity`.
    pub fn needs_render_update_from_typed_entity(&self, entity: &MaterialEntityItem) -> bool {
        entity.material_url() != self.material_url
            || entity.parent_id() != self.parent_id
            || entity.material_mapping_pos() != self.material_mapping_pos
            || entity.material_mapping_scale() != self.material_mapping_scale
            || entity.material_mapping_rot() != self.material_mapping_rot
            || entity.priority() != self.priority
            || entity.parent_material_name() != self.parent_material_name
            || entity.material_data() != self.material_data
    }

    /// Pulls changed properties from `entity`, re-resolves the material and
    /// re-attaches it when needed.
    pub fn do_render_update_synchronous_typed(&mut self, entity: &MaterialEntityItem) {
        let mut material_needs_update = false;

        if entity.material_url() != self.material_url {
            self.delete_material();
            material_needs_update = true;
            let url = entity.material_url().to_string();
            self.set_material_url(&url, false);
        }

        if entity.parent_id() != self.parent_id {
            self.delete_material();
            material_needs_update = true;
            self.parent_id = entity.parent_id();
        }

        if entity.material_mapping_pos() != self.material_mapping_pos
            || entity.material_mapping_scale() != self.material_mapping_scale
            || entity.material_mapping_rot() != self.material_mapping_rot
        {
            self.delete_material();
            material_needs_update = true;
            self.material_mapping_pos = entity.material_mapping_pos();
            self.material_mapping_scale = entity.material_mapping_scale();
            self.material_mapping_rot = entity.material_mapping_rot();
        }

        if entity.priority() != self.priority {
            self.delete_material();
            material_needs_update = true;
            self.priority = entity.priority();
        }

        if entity.parent_material_name() != self.parent_material_name {
            self.delete_material();
            material_needs_update = true;
            self.parent_material_name = entity.parent_material_name().to_string();
        }

        if entity.material_data() != self.material_data {
            self.delete_material();
            material_needs_update = true;
            self.material_data = entity.material_data().to_string();
            if self.material_url.starts_with(MATERIAL_DATA_PREFIX) {
                let url = self.material_url.clone();
                self.set_material_url(&url, true);
            }
        }

        let loaded = self.process_material_loads();

        if (self.retry_apply || material_needs_update) && !loaded {
            self.apply_material();
        }
        if self.retry_apply {
            log::trace!(
                "Material entity {} waiting for parent {:?}",
                entity.entity_id(),
                self.parent_id
            );
        }

        self.visible = entity.is_visible();
        self.render_transform = entity.model_transform()
            * Mat4::from_scale(entity.dimensions() * MATERIAL_ENTITY_SCALE);
    }

    /// Applies queued network document completions. Returns whether a
    /// completion for the current URL was applied.
    pub fn process_material_loads(&mut self) -> bool {
        let mut applied = false;
        while let Ok(event) = self.load_rx.try_recv() {
            if event.generation != self.url_generation {
                continue;
            }
            if !event.success {
                log::warn!("Failed to load material '{}'", self.material_url);
                continue;
            }
            let Some(parsed) = self
                .network_material
                .as_ref()
                .and_then(|resource| resource.data())
            else {
                continue;
            };
            self.parsed_materials = parsed;
            let name = self.current_material_name.clone();
            self.set_current_material_name(&name);
            self.apply_material();
            applied = true;
        }
        applied
    }

    /// Switches the material source. A `?name` suffix selects the material
    /// by name. `materialData` URLs parse the entity's inline document;
    /// anything else is requested from the material cache.
    pub fn set_material_url(&mut self, url: &str, material_data_changed: bool) {
        let using_material_data = material_data_changed || url.starts_with(MATERIAL_DATA_PREFIX);

        self.material_url = url.to_string();
        self.url_generation += 1;
        if let Some((_, name)) = url.rsplit_once('?') {
            self.current_material_name = name.to_string();
        }

        if using_material_data {
            self.network_material = None;
            self.parsed_materials = if self.material_data.trim().is_empty() {
                Arc::default()
            } else {
                Arc::new(parse_json_materials_str(
                    &self.material_data,
                    inline_base_url(url).as_ref(),
                    self.materials.context(),
                ))
            };
            let name = self.current_material_name.clone();
            self.set_current_material_name(&name);
            return;
        }

        self.parsed_materials = Arc::default();
        let Some(resolved) = normalize_url(url) else {
            if !url.is_empty() {
                log::warn!("Invalid material URL '{url}'");
            }
            self.network_material = None;
            return;
        };

        let resource = self.materials.get_material(&resolved);
        let sender = self.load_tx.clone();
        let generation = self.url_generation;
        resource.on_finished(Box::new(move |success| {
            // The renderer may be gone by now.
            let _ = sender.send(LoadEvent {
                generation,
                success,
            });
        }));
        self.network_material = Some(resource);
    }

    /// Selects `name` when the parsed set has it, else the first declared
    /// material.
    pub fn set_current_material_name(&mut self, name: &str) {
        if self.parsed_materials.get(name).is_some() {
            self.current_material_name = name.to_string();
        } else if let Some(first) = self.parsed_materials.first_name() {
            self.current_material_name = first.to_string();
        }
    }

    #[must_use]
    pub fn get_material(&self) -> Option<Arc<ProceduralMaterial>> {
        self.parsed_materials
            .get(&self.current_material_name)
            .cloned()
    }

    fn texture_transform(&self) -> TextureTransform {
        TextureTransform::from_mapping(
            self.material_mapping_pos,
            self.material_mapping_rot,
            self.material_mapping_scale,
        )
    }

    // ========================================================================
    // Binding
    // ========================================================================

    /// Detaches the material from its current parent. Calling it again
    /// without a new attach does nothing.
    pub fn delete_material(&mut self) {
        let Some(attachment) = self.attachment.take() else {
            return;
        };
        let Attachment {
            parent,
            kind,
            material,
            slot,
        } = attachment;
        if !self.registry.detach_from(kind, &parent, &material, &slot) {
            // Parent is gone; nothing left to undo.
            log::debug!("Material parent {parent} ({kind:?}) no longer exists");
        }
    }

    /// Attaches the current material to the parent. Sets the retry flag when
    /// no registered kind recognizes the parent id.
    pub fn apply_material(&mut self) {
        self.retry_apply = false;
        self.delete_material();

        let Some(material) = self.get_material() else {
            return;
        };
        let Some(parent) = self.parent_id else {
            return;
        };

        material.set_texture_transform(self.texture_transform());
        let layer = MaterialLayer::new(material.clone(), self.priority);

        match self
            .registry
            .attach(&parent, &layer, &self.parent_material_name)
        {
            Some(kind) => {
                log::debug!("Attached material '{}' to {kind:?} {parent}", material.name());
                self.attachment = Some(Attachment {
                    parent,
                    kind,
                    material,
                    slot: self.parent_material_name.clone(),
                });
            }
            None => self.retry_apply = true,
        }
    }

    // ========================================================================
    // Render
    // ========================================================================

    pub fn get_key(&self) -> ItemKey {
        let mut key = ItemKey::SHAPE;
        if !self.visible {
            key |= ItemKey::INVISIBLE;
        }
        if self
            .get_material()
            .is_some_and(|material| material.key().is_translucent())
        {
            key |= ItemKey::TRANSPARENT;
        }
        key
    }

    pub fn get_shape_key(&self) -> ShapeKey {
        let material = self.get_material();
        let material_key = material.as_ref().map(|m| m.key()).unwrap_or_default();

        let mut key = ShapeKey::empty();
        if material_key.is_translucent() {
            key |= ShapeKey::TRANSLUCENT;
        }
        if material.is_some_and(|m| m.procedural().is_ready()) {
            key |= ShapeKey::OWN_PIPELINE;
        } else {
            key |= ShapeKey::MATERIAL;
            key.set(ShapeKey::TANGENTS, material_key.is_normal_map());
            key.set(ShapeKey::LIGHTMAP, material_key.is_light_map());
            key.set(ShapeKey::UNLIT, material_key.is_unlit());
        }
        key
    }

    /// Draws the proxy sphere. Attached materials are drawn by their parent,
    /// so nothing is recorded while a parent id is set.
    pub fn do_render(&self, args: &mut RenderArgs) {
        if self.parent_id.is_some() {
            return;
        }
        let Some(material) = self.get_material() else {
            return;
        };

        let transform = self.render_transform;
        let procedural = material.procedural();

        if procedural.is_ready() {
            let color = procedural.get_color(material.albedo().extend(1.0));
            let (scale, rotation, translation) = transform.to_scale_rotation_translation();
            procedural.prepare(
                &mut args.batch,
                translation,
                scale,
                rotation,
                ProceduralProgramKey::default(),
            );
            args.batch.set_model_transform(transform);
            args.batch.draw_sphere(Some(color));
        } else {
            args.batch.set_model_transform(transform);
            if args.render_mode != RenderMode::Shadow {
                material.set_texture_transform(self.texture_transform());
                args.batch.bind_material(material, args.enable_texturing);
                args.details.material_switches += 1;
            }
            args.batch.draw_sphere(None);
        }

        args.details.triangles_rendered += SPHERE_TRIANGLE_COUNT;
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    pub fn retry_pending(&self) -> bool {
        self.retry_apply
    }

    #[inline]
    pub fn material_url(&self) -> &str {
        &self.material_url
    }

    #[inline]
    pub fn current_material_name(&self) -> &str {
        &self.current_material_name
    }

    #[inline]
    pub fn parsed_materials(&self) -> &ParsedMaterials {
        &self.parsed_materials
    }

    /// Parent and kind the material is attached to.
    pub fn attached_parent(&self) -> Option<(Uuid, ParentKind)> {
        self.attachment.as_ref().map(|a| (a.parent, a.kind))
    }

    #[inline]
    pub fn render_transform(&self) -> Mat4 {
        self.render_transform
    }
}

impl Drop for MaterialEntityRenderer {
    fn drop(&mut self) {
        self.delete_material();
    }
}
