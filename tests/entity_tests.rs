//! Material Entity Renderer Tests
//!
//! Tests for:
//! - Inline materialData and network material resolution
//! - Attach, retry while the parent is missing, and idempotent detach
//! - Property-change detection and `?name` material selection
//! - Proxy sphere rendering and item/shape keys

use std::sync::Arc;

use glam::{Mat4, Quat, Vec2, Vec3};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use url::Url;
use uuid::Uuid;

use procmat::assets::ManualFetcher;
use procmat::entities::{
    ENTITY_ITEM_DEFAULT_DIMENSIONS, ItemKey, MaterialBindingRegistry, MaterialEntityItem,
    MaterialEntityRenderer, ParentKind, ShapeKey,
};
use procmat::gpu::{BatchCommand, RecordingBackend, RenderArgs, RenderMode, SPHERE_TRIANGLE_COUNT};
use procmat::material::MaterialCache;
use procmat::procedural::ProceduralContext;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Host objects of one kind, with the materials attached to each.
#[derive(Default)]
struct Hosts {
    known: Mutex<Vec<Uuid>>,
    attached: Mutex<FxHashMap<Uuid, Vec<(String, u16, String)>>>,
    attach_calls: Mutex<usize>,
    detach_calls: Mutex<usize>,
}

impl Hosts {
    fn add(&self, id: Uuid) {
        self.known.lock().push(id);
    }

    fn layers(&self, id: &Uuid) -> Vec<(String, u16, String)> {
        self.attached.lock().get(id).cloned().unwrap_or_default()
    }
}

struct World {
    fetcher: Arc<ManualFetcher>,
    registry: Arc<MaterialBindingRegistry>,
    materials: Arc<MaterialCache>,
    hosts: FxHashMap<ParentKind, Arc<Hosts>>,
}

impl World {
    fn new() -> Self {
        init_logger();
        let fetcher = Arc::new(ManualFetcher::new());
        let context = ProceduralContext::new(fetcher.clone(), Arc::new(RecordingBackend::new()));
        let registry = Arc::new(MaterialBindingRegistry::new());
        let mut hosts = FxHashMap::default();

        for kind in ParentKind::ALL {
            let h = Arc::new(Hosts::default());
            let attach_hosts = h.clone();
            let detach_hosts = h.clone();
            registry.register(
                kind,
                move |id, layer, slot| {
                    *attach_hosts.attach_calls.lock() += 1;
                    if !attach_hosts.known.lock().contains(id) {
                        return false;
                    }
                    attach_hosts.attached.lock().entry(*id).or_default().push((
                        layer.material.name().to_string(),
                        layer.priority,
                        slot.to_string(),
                    ));
                    true
                },
                move |id, material, slot| {
                    *detach_hosts.detach_calls.lock() += 1;
                    if !detach_hosts.known.lock().contains(id) {
                        return false;
                    }
                    if let Some(layers) = detach_hosts.attached.lock().get_mut(id) {
                        layers.retain(|(name, _, s)| !(name == material.name() && s == slot));
                    }
                    true
                },
            );
            hosts.insert(kind, h);
        }

        Self {
            fetcher,
            materials: Arc::new(MaterialCache::from_context(&context)),
            registry,
            hosts,
        }
    }

    fn hosts(&self, kind: ParentKind) -> &Hosts {
        &self.hosts[&kind]
    }

    fn renderer(&self) -> MaterialEntityRenderer {
        MaterialEntityRenderer::new(self.registry.clone(), self.materials.clone())
    }
}

const INLINE: &str = r#"{"materials": [
    {"name": "red", "albedo": [1, 0, 0]},
    {"name": "blue", "albedo": [0, 0, 1], "opacity": 0.5}
]}"#;

fn inline_entity(parent: Option<Uuid>) -> MaterialEntityItem {
    let mut entity = MaterialEntityItem::new(Uuid::new_v4());
    entity.set_material_data(INLINE);
    entity.set_material_url("materialData");
    entity.set_parent_id(parent);
    entity
}

fn update(renderer: &mut MaterialEntityRenderer, entity: &MaterialEntityItem) {
    if renderer.needs_render_update() || renderer.needs_render_update_from_typed_entity(entity) {
        renderer.do_render_update_synchronous_typed(entity);
    }
}

// ============================================================================
// Resolution
// ============================================================================

#[test]
fn inline_material_data_selects_first_material() {
    let world = World::new();
    let mut renderer = world.renderer();
    let entity = inline_entity(None);

    assert!(renderer.needs_render_update_from_typed_entity(&entity));
    update(&mut renderer, &entity);
    assert!(!renderer.needs_render_update_from_typed_entity(&entity));

    assert_eq!(renderer.current_material_name(), "red");
    assert_eq!(renderer.get_material().unwrap().name(), "red");
}

#[test]
fn query_suffix_selects_material_by_name() {
    let world = World::new();
    let mut renderer = world.renderer();
    let mut entity = inline_entity(None);
    entity.set_material_url("materialData?blue");
    update(&mut renderer, &entity);
    assert_eq!(renderer.current_material_name(), "blue");
}

#[test]
fn material_data_change_reparses() {
    let world = World::new();
    let mut renderer = world.renderer();
    let mut entity = inline_entity(None);
    update(&mut renderer, &entity);

    entity.set_material_data(r#"{"materials": {"name": "green", "albedo": [0, 1, 0]}}"#);
    assert!(renderer.needs_render_update_from_typed_entity(&entity));
    update(&mut renderer, &entity);
    assert_eq!(renderer.current_material_name(), "green");
}

#[test]
fn network_material_applies_on_completion() {
    let world = World::new();
    let parent = Uuid::new_v4();
    world.hosts(ParentKind::Entity).add(parent);

    let mut renderer = world.renderer();
    let mut entity = MaterialEntityItem::new(Uuid::new_v4());
    entity.set_material_url("https://example.com/set.json?shiny");
    entity.set_parent_id(Some(parent));
    entity.set_priority(4);
    entity.set_parent_material_name("mat::body");
    update(&mut renderer, &entity);

    assert!(renderer.get_material().is_none());
    assert!(!renderer.retry_pending());
    assert!(!renderer.needs_render_update());

    let url = Url::parse("https://example.com/set.json?shiny").unwrap();
    world.fetcher.complete(
        &url,
        br#"{"materials": [{"name": "dull"}, {"name": "shiny", "metallic": 1}]}"#.to_vec(),
    );
    assert!(renderer.needs_render_update());
    update(&mut renderer, &entity);

    assert_eq!(renderer.current_material_name(), "shiny");
    assert_eq!(renderer.attached_parent(), Some((parent, ParentKind::Entity)));
    assert_eq!(
        world.hosts(ParentKind::Entity).layers(&parent),
        [("shiny".to_string(), 4, "mat::body".to_string())]
    );
}

#[test]
fn stale_network_completion_is_ignored() {
    let world = World::new();
    let mut renderer = world.renderer();
    let mut entity = MaterialEntityItem::new(Uuid::new_v4());
    entity.set_material_url("https://example.com/old.json");
    update(&mut renderer, &entity);

    entity.set_material_data(INLINE);
    entity.set_material_url("materialData");
    update(&mut renderer, &entity);
    assert_eq!(renderer.current_material_name(), "red");

    let old = Url::parse("https://example.com/old.json").unwrap();
    world
        .fetcher
        .complete(&old, br#"{"materials": {"name": "old"}}"#.to_vec());
    update(&mut renderer, &entity);
    assert_eq!(renderer.current_material_name(), "red");
}

#[test]
fn inline_relative_maps_resolve_against_working_directory() {
    let world = World::new();
    let mut renderer = world.renderer();
    let mut entity = MaterialEntityItem::new(Uuid::new_v4());
    entity.set_material_data(
        r#"{"materials": {
            "name": "tiled",
            "albedoMap": "tex.png",
            "normalMap": "https://cdn.example.org/normal.png"
        }}"#,
    );
    entity.set_material_url("materialData");
    update(&mut renderer, &entity);

    let material = renderer.get_material().unwrap();
    let maps = material.maps();
    let cwd = Url::from_directory_path(std::env::current_dir().unwrap()).unwrap();
    assert_eq!(maps.albedo, Some(cwd.join("tex.png").unwrap()));
    assert_eq!(
        maps.normal.as_ref().map(Url::as_str),
        Some("https://cdn.example.org/normal.png")
    );
}

// ============================================================================
// Binding
// ============================================================================

#[test]
fn missing_parent_retries_until_it_appears() {
    let world = World::new();
    let parent = Uuid::new_v4();
    let mut renderer = world.renderer();
    let entity = inline_entity(Some(parent));

    update(&mut renderer, &entity);
    assert!(renderer.retry_pending());
    assert!(renderer.needs_render_update());

    update(&mut renderer, &entity);
    assert!(renderer.retry_pending());

    world.hosts(ParentKind::Overlay).add(parent);
    update(&mut renderer, &entity);
    assert!(!renderer.retry_pending());
    assert_eq!(renderer.attached_parent(), Some((parent, ParentKind::Overlay)));
    assert_eq!(world.hosts(ParentKind::Overlay).layers(&parent).len(), 1);
}

#[test]
fn reparenting_moves_the_material() {
    let world = World::new();
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();
    world.hosts(ParentKind::Entity).add(first);
    world.hosts(ParentKind::Avatar).add(second);

    let mut renderer = world.renderer();
    let mut entity = inline_entity(Some(first));
    update(&mut renderer, &entity);
    assert_eq!(world.hosts(ParentKind::Entity).layers(&first).len(), 1);

    entity.set_parent_id(Some(second));
    update(&mut renderer, &entity);
    assert!(world.hosts(ParentKind::Entity).layers(&first).is_empty());
    assert_eq!(world.hosts(ParentKind::Avatar).layers(&second).len(), 1);
    assert_eq!(renderer.attached_parent(), Some((second, ParentKind::Avatar)));
}

#[test]
fn simultaneous_changes_detach_once() {
    let world = World::new();
    let parent = Uuid::new_v4();
    world.hosts(ParentKind::Entity).add(parent);

    let mut renderer = world.renderer();
    let mut entity = inline_entity(Some(parent));
    update(&mut renderer, &entity);

    entity.set_priority(9);
    entity.set_parent_material_name("2");
    entity.set_material_mapping_pos(Vec2::new(0.5, 0.5));
    update(&mut renderer, &entity);

    let hosts = world.hosts(ParentKind::Entity);
    assert_eq!(*hosts.detach_calls.lock(), 1);
    assert_eq!(hosts.layers(&parent), [("red".to_string(), 9, "2".to_string())]);

    let transform = renderer.get_material().unwrap().texture_transform();
    assert_eq!(transform.translation, Vec2::new(0.5, 0.5));
}

#[test]
fn material_data_change_reattaches_network_material() {
    let world = World::new();
    let parent = Uuid::new_v4();
    world.hosts(ParentKind::Entity).add(parent);

    let mut renderer = world.renderer();
    let mut entity = MaterialEntityItem::new(Uuid::new_v4());
    entity.set_material_url("https://example.com/net.json");
    entity.set_parent_id(Some(parent));
    update(&mut renderer, &entity);

    let url = Url::parse("https://example.com/net.json").unwrap();
    world
        .fetcher
        .complete(&url, br#"{"materials": {"name": "net"}}"#.to_vec());
    update(&mut renderer, &entity);
    let hosts = world.hosts(ParentKind::Entity);
    assert_eq!(hosts.layers(&parent), [("net".to_string(), 0, String::new())]);

    // Inline data is ignored for network URLs, but the material is still
    // detached and must come back.
    entity.set_material_data(r#"{"unrelated": true}"#);
    assert!(renderer.needs_render_update_from_typed_entity(&entity));
    update(&mut renderer, &entity);

    assert_eq!(*hosts.detach_calls.lock(), 1);
    assert_eq!(hosts.layers(&parent), [("net".to_string(), 0, String::new())]);
    assert_eq!(renderer.attached_parent(), Some((parent, ParentKind::Entity)));
    assert_eq!(renderer.current_material_name(), "net");
    assert!(!renderer.needs_render_update());

    for _ in 0..3 {
        update(&mut renderer, &entity);
    }
    assert_eq!(*hosts.detach_calls.lock(), 1);
    assert_eq!(hosts.layers(&parent).len(), 1);
}

#[test]
fn repeated_detach_calls_resolver_once() {
    let world = World::new();
    let parent = Uuid::new_v4();
    world.hosts(ParentKind::Avatar).add(parent);

    let mut renderer = world.renderer();
    let entity = inline_entity(Some(parent));
    update(&mut renderer, &entity);

    renderer.delete_material();
    renderer.delete_material();

    let total: usize = ParentKind::ALL
        .iter()
        .map(|kind| *world.hosts(*kind).detach_calls.lock())
        .sum();
    assert_eq!(total, 1);
    assert!(renderer.attached_parent().is_none());
}

#[test]
fn dropping_renderer_detaches() {
    let world = World::new();
    let parent = Uuid::new_v4();
    world.hosts(ParentKind::Entity).add(parent);

    let mut renderer = world.renderer();
    update(&mut renderer, &inline_entity(Some(parent)));
    assert_eq!(world.hosts(ParentKind::Entity).layers(&parent).len(), 1);

    drop(renderer);
    assert!(world.hosts(ParentKind::Entity).layers(&parent).is_empty());
}

#[test]
fn clearing_parent_detaches_without_retry() {
    let world = World::new();
    let parent = Uuid::new_v4();
    world.hosts(ParentKind::Entity).add(parent);

    let mut renderer = world.renderer();
    let mut entity = inline_entity(Some(parent));
    update(&mut renderer, &entity);

    entity.set_parent_id(None);
    update(&mut renderer, &entity);
    assert!(world.hosts(ParentKind::Entity).layers(&parent).is_empty());
    assert!(!renderer.retry_pending());
    assert!(renderer.attached_parent().is_none());
}

// ============================================================================
// Rendering
// ============================================================================

#[test]
fn parented_entity_draws_nothing() {
    let world = World::new();
    let parent = Uuid::new_v4();
    world.hosts(ParentKind::Entity).add(parent);
    let mut renderer = world.renderer();
    update(&mut renderer, &inline_entity(Some(parent)));

    let mut args = RenderArgs::new(RenderMode::Default);
    renderer.do_render(&mut args);
    assert!(args.batch.is_empty());
}

#[test]
fn standalone_entity_draws_material_sphere() {
    let world = World::new();
    let mut renderer = world.renderer();
    let mut entity = inline_entity(None);
    entity.set_position(Vec3::new(1.0, 2.0, 3.0));
    update(&mut renderer, &entity);

    let expected = Mat4::from_scale_rotation_translation(
        ENTITY_ITEM_DEFAULT_DIMENSIONS * 0.5,
        Quat::IDENTITY,
        Vec3::new(1.0, 2.0, 3.0),
    );
    assert!(renderer.render_transform().abs_diff_eq(expected, 1e-6));

    let mut args = RenderArgs::new(RenderMode::Default);
    renderer.do_render(&mut args);
    let commands = args.batch.commands();
    assert!(matches!(commands[0], BatchCommand::SetModelTransform(_)));
    assert!(matches!(commands[1], BatchCommand::BindMaterial { .. }));
    assert!(matches!(commands[2], BatchCommand::DrawSphere { color: None }));
    assert_eq!(args.details.material_switches, 1);
    assert_eq!(args.details.triangles_rendered, SPHERE_TRIANGLE_COUNT);

    let mut shadow = RenderArgs::new(RenderMode::Shadow);
    renderer.do_render(&mut shadow);
    assert_eq!(shadow.batch.len(), 2);
    assert_eq!(shadow.details.material_switches, 0);
}

#[test]
fn procedural_material_draws_through_own_pipeline() {
    let world = World::new();
    let mut renderer = world.renderer();
    let mut entity = MaterialEntityItem::new(Uuid::new_v4());
    entity.set_material_data(
        r#"{"materials": {"name": "fx", "model": "hifi_shader_simple", "albedo": [0.5, 0.5, 0.5, false],
            "procedural": {"version": 1, "shaderUrl": "qrc:/samples/plasma.fs"}}}"#,
    );
    entity.set_material_url("materialData");
    update(&mut renderer, &entity);

    assert!(renderer.get_shape_key().contains(ShapeKey::OWN_PIPELINE));

    let mut args = RenderArgs::new(RenderMode::Default);
    renderer.do_render(&mut args);
    let commands = args.batch.commands();
    assert!(matches!(commands[0], BatchCommand::SetPipeline(_)));
    // Version 1 content is drawn opaque white.
    assert!(matches!(
        commands.last(),
        Some(BatchCommand::DrawSphere { color: Some(color) }) if *color == glam::Vec4::ONE
    ));
    assert_eq!(args.details.material_switches, 0);
}

#[test]
fn keys_reflect_material_state() {
    let world = World::new();
    let mut renderer = world.renderer();
    let mut entity = inline_entity(None);
    entity.set_material_url("materialData?blue");
    entity.set_visible(false);
    update(&mut renderer, &entity);

    assert_eq!(
        renderer.get_key(),
        ItemKey::SHAPE | ItemKey::INVISIBLE | ItemKey::TRANSPARENT
    );
    assert_eq!(
        renderer.get_shape_key(),
        ShapeKey::TRANSLUCENT | ShapeKey::MATERIAL
    );
}
