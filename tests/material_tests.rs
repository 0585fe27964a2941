//! Material Parser and Cache Tests
//!
//! Tests for:
//! - hifi_pbr and hifi_shader_simple property schemas
//! - Color parsing, sRGB flags and texture URL resolution
//! - Duplicate names and declaration order
//! - MaterialCache fetch deduplication and completion callbacks

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use glam::{Vec3, Vec4};
use serde_json::json;
use url::Url;

use procmat::assets::ManualFetcher;
use procmat::gpu::RecordingBackend;
use procmat::material::{
    MaterialCache, MaterialKey, MaterialModel, parse_json_materials, parse_json_materials_str,
};
use procmat::procedural::ProceduralContext;

const EPSILON: f32 = 1e-4;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn context() -> (Arc<ManualFetcher>, ProceduralContext) {
    init_logger();
    let fetcher = Arc::new(ManualFetcher::new());
    let context = ProceduralContext::new(fetcher.clone(), Arc::new(RecordingBackend::new()));
    (fetcher, context)
}

fn base() -> Url {
    Url::parse("https://example.com/materials/set.json").unwrap()
}

// ============================================================================
// Parser: Document Shape
// ============================================================================

#[test]
fn single_pbr_material_in_array() {
    let (_, ctx) = context();
    let parsed = parse_json_materials_str(
        r#"{"materials":[{"name":"a","model":"hifi_pbr","albedo":[1,0,0]}]}"#,
        Some(&base()),
        &ctx,
    );
    assert_eq!(parsed.len(), 1);
    let material = parsed.get("a").unwrap();
    assert_eq!(material.model(), &MaterialModel::HifiPbr);
    assert!(material.is_albedo_srgb());
    assert!(material.albedo_srgb().abs_diff_eq(Vec3::new(1.0, 0.0, 0.0), EPSILON));
}

#[test]
fn materials_object_and_version() {
    let (_, ctx) = context();
    let parsed = parse_json_materials(
        &json!({"materialVersion": 1, "materials": {"name": "solo", "roughness": 0.3}}),
        None,
        &ctx,
    );
    assert_eq!(parsed.version, Some(1));
    assert_eq!(parsed.first_name(), Some("solo"));
    assert!((parsed.get("solo").unwrap().roughness() - 0.3).abs() < EPSILON);
}

#[test]
fn non_object_document_is_empty() {
    let (_, ctx) = context();
    assert!(parse_json_materials(&json!([1, 2, 3]), None, &ctx).is_empty());
    assert!(parse_json_materials_str("{ not json", None, &ctx).is_empty());
}

#[test]
fn duplicate_names_last_write_wins() {
    let (_, ctx) = context();
    let parsed = parse_json_materials(
        &json!({"materials": [
            {"name": "dup", "opacity": 0.25},
            {"name": "other"},
            {"name": "dup", "opacity": 0.75},
        ]}),
        None,
        &ctx,
    );
    assert_eq!(parsed.names, ["dup", "other", "dup"]);
    assert_eq!(parsed.materials.len(), 2);
    assert!((parsed.get("dup").unwrap().opacity() - 0.75).abs() < EPSILON);
}

#[test]
fn invalid_fields_are_skipped() {
    let (_, ctx) = context();
    let parsed = parse_json_materials(
        &json!({"materials": [{"name": "m", "albedo": [1, 0], "opacity": "high", "metallic": 1}]}),
        None,
        &ctx,
    );
    let material = parsed.get("m").unwrap();
    assert_eq!(material.albedo(), Vec3::ONE);
    assert!((material.opacity() - 1.0).abs() < EPSILON);
    assert!((material.metallic() - 1.0).abs() < EPSILON);
}

#[test]
fn unknown_model_keeps_only_name() {
    let (_, ctx) = context();
    let parsed = parse_json_materials(
        &json!({"materials": [{"name": "x", "model": "hifi_toon", "opacity": 0.5}]}),
        None,
        &ctx,
    );
    let material = parsed.get("x").unwrap();
    assert_eq!(material.model(), &MaterialModel::Unknown("hifi_toon".into()));
    assert!((material.opacity() - 1.0).abs() < EPSILON);
}

// ============================================================================
// Parser: hifi_pbr Maps
// ============================================================================

#[test]
fn texture_urls_resolve_against_base() {
    let (_, ctx) = context();
    let parsed = parse_json_materials(
        &json!({"materials": {
            "name": "m",
            "emissiveMap": "tex/glow.png",
            "normalMap": "/shared/normal.png",
            "lightMap": "https://cdn.example.org/light.png",
        }}),
        Some(&base()),
        &ctx,
    );
    let maps = parsed.get("m").unwrap().maps().clone();
    assert_eq!(
        maps.emissive.unwrap().as_str(),
        "https://example.com/materials/tex/glow.png"
    );
    assert_eq!(maps.normal.unwrap().as_str(), "https://example.com/shared/normal.png");
    assert_eq!(maps.light.unwrap().as_str(), "https://cdn.example.org/light.png");
}

#[test]
fn matching_opacity_map_uses_albedo_alpha() {
    let (_, ctx) = context();
    let parsed = parse_json_materials(
        &json!({"materials": [
            {"name": "same", "albedoMap": "a.png", "opacityMap": "a.png"},
            {"name": "different", "albedoMap": "a.png", "opacityMap": "b.png"},
        ]}),
        Some(&base()),
        &ctx,
    );
    let same = parsed.get("same").unwrap();
    assert!(same.maps().albedo_alpha_is_opacity);
    assert!(same.key().is_translucent());

    let different = parsed.get("different").unwrap();
    assert!(!different.maps().albedo_alpha_is_opacity);
    assert!(!different.key().is_translucent());
}

#[test]
fn alternate_channel_encodings_set_flags() {
    let (_, ctx) = context();
    let parsed = parse_json_materials(
        &json!({"materials": [
            {"name": "gloss", "glossMap": "g.png", "specularMap": "s.png", "bumpMap": "b.png"},
            {"name": "rough", "roughnessMap": "r.png", "metallicMap": "m.png", "normalMap": "n.png"},
        ]}),
        Some(&base()),
        &ctx,
    );
    let gloss = parsed.get("gloss").unwrap().maps().clone();
    assert!(gloss.roughness_is_gloss && gloss.metallic_is_specular && gloss.normal_is_bump);

    let rough = parsed.get("rough").unwrap();
    let maps = rough.maps();
    assert!(!maps.roughness_is_gloss && !maps.metallic_is_specular && !maps.normal_is_bump);
    assert!(rough.key().contains(MaterialKey::ROUGHNESS_MAP | MaterialKey::NORMAL_MAP));
}

#[test]
fn linear_colors_are_stored_unchanged() {
    let (_, ctx) = context();
    let parsed = parse_json_materials(
        &json!({"materials": {"name": "m", "emissive": [0.5, 0.5, 0.5, false], "unlit": true}}),
        None,
        &ctx,
    );
    let material = parsed.get("m").unwrap();
    assert_eq!(material.emissive(), Vec3::splat(0.5));
    assert!(material.key().is_unlit());
}

// ============================================================================
// Parser: hifi_shader_simple
// ============================================================================

#[test]
fn shader_simple_embeds_procedural_descriptor() {
    let (_, ctx) = context();
    let parsed = parse_json_materials(
        &json!({"materials": {
            "name": "fx",
            "model": "hifi_shader_simple",
            "albedo": [0.2, 0.4, 0.6, false],
            "roughness": 0.1,
            "procedural": {
                "version": 2,
                "shaderUrl": "qrc:/samples/plasma.fs",
                "uniforms": {"speed": 2}
            }
        }}),
        None,
        &ctx,
    );
    let material = parsed.get("fx").unwrap();
    assert!(material.is_procedural());
    // Not part of the shader_simple schema.
    assert!((material.roughness() - 1.0).abs() < EPSILON);

    let procedural = material.procedural();
    assert_eq!(procedural.data().version, 2);
    assert!(procedural.is_ready());

    let albedo = material.albedo().extend(1.0);
    assert_eq!(procedural.get_color(albedo), albedo);
    assert!(albedo.abs_diff_eq(Vec4::new(0.2, 0.4, 0.6, 1.0), EPSILON));
}

#[test]
fn pbr_material_has_inert_procedural() {
    let (_, ctx) = context();
    let parsed = parse_json_materials(&json!({"materials": {"name": "m"}}), None, &ctx);
    let material = parsed.get("m").unwrap();
    assert!(!material.is_procedural());
    assert!(!material.procedural().is_ready());
}

// ============================================================================
// Cache
// ============================================================================

#[test]
fn cache_deduplicates_fetches() {
    let (fetcher, ctx) = context();
    let cache = MaterialCache::from_context(&ctx);
    let url = base();

    let a = cache.get_material(&url);
    let b = cache.get_material(&url);
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(fetcher.request_count(&url), 1);
}

#[test]
fn completion_notifies_every_listener_once() {
    let (fetcher, ctx) = context();
    let cache = MaterialCache::from_context(&ctx);
    let url = base();
    let resource = cache.get_material(&url);

    let calls = Arc::new(AtomicUsize::new(0));
    for _ in 0..2 {
        let calls = calls.clone();
        resource.on_finished(Box::new(move |success| {
            assert!(success);
            calls.fetch_add(1, Ordering::SeqCst);
        }));
    }

    fetcher.complete(&url, br#"{"materials": [{"name": "a"}, {"name": "b"}]}"#.to_vec());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(!fetcher.complete(&url, b"{}".to_vec()));
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let parsed = resource.data().unwrap();
    assert_eq!(parsed.names, ["a", "b"]);

    // Late listeners still observe the transition.
    let late = calls.clone();
    resource.on_finished(Box::new(move |_| {
        late.fetch_add(1, Ordering::SeqCst);
    }));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn invalid_json_document_loads_empty() {
    let (fetcher, ctx) = context();
    let cache = MaterialCache::from_context(&ctx);
    let url = base();
    let resource = cache.get_material(&url);
    fetcher.complete(&url, b"not json".to_vec());
    assert!(resource.is_loaded());
    assert!(resource.data().unwrap().is_empty());
}
