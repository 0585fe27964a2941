//! Shader Template Expansion
//!
//! Procedural pipelines are built from WGSL templates rendered by minijinja.
//! A [`ShaderSource`] names a template and carries the values substituted
//! into it:
//!
//! - `replacements`: named text blocks (`{{ PROCEDURAL_BLOCK }}` etc.)
//! - `reflection`: custom uniform names and their binding slots, which the
//!   templates turn into uniform declarations
//!
//! Templates use `{$ ... $}` for blocks, `{{ ... }}` for values and `$$` for
//! line statements, so WGSL attribute syntax never collides with the
//! template syntax.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use minijinja::syntax::SyntaxConfig;
use minijinja::{Environment, Error, ErrorKind};
use serde::Serialize;

use crate::assets::embedded::EmbeddedAssets;
use crate::errors::Result;

static SHADER_ENV: OnceLock<Environment<'static>> = OnceLock::new();

/// On-disk template directory consulted first in debug builds.
#[cfg(debug_assertions)]
const SHADER_DIR: &str = "src/procedural/shaders";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    #[must_use]
    pub fn entry_point(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vs_main",
            ShaderStage::Fragment => "fs_main",
        }
    }
}

/// Binding slots discovered for a program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderReflection {
    /// Custom uniform name → slot.
    pub uniforms: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    pub template: Cow<'static, str>,
    pub stage: ShaderStage,
    pub replacements: BTreeMap<String, String>,
    pub reflection: ShaderReflection,
}

#[derive(Serialize)]
struct CustomUniform<'a> {
    name: &'a str,
    slot: u32,
}

#[derive(Serialize)]
struct TemplateContext<'a> {
    #[serde(flatten)]
    replacements: &'a BTreeMap<String, String>,
    custom_uniforms: Vec<CustomUniform<'a>>,
}

impl ShaderSource {
    #[must_use]
    pub fn new(stage: ShaderStage, template: impl Into<Cow<'static, str>>) -> Self {
        Self {
            template: template.into(),
            stage,
            replacements: BTreeMap::new(),
            reflection: ShaderReflection::default(),
        }
    }

    /// Sets a replacement, returning `self` for chaining.
    #[must_use]
    pub fn with_replacement(mut self, key: &str, value: impl Into<String>) -> Self {
        self.replacements.insert(key.to_string(), value.into());
        self
    }

    /// Expands the template into final WGSL.
    pub fn render(&self) -> Result<String> {
        let env = shader_env()?;
        let template = env.get_template(&self.template)?;
        let ctx = TemplateContext {
            replacements: &self.replacements,
            custom_uniforms: self
                .reflection
                .uniforms
                .iter()
                .map(|(name, slot)| CustomUniform { name, slot: *slot })
                .collect(),
        };
        Ok(template.render(ctx)?)
    }
}

fn shader_env() -> Result<&'static Environment<'static>> {
    if let Some(env) = SHADER_ENV.get() {
        return Ok(env);
    }
    let env = build_env()?;
    Ok(SHADER_ENV.get_or_init(|| env))
}

fn build_env() -> Result<Environment<'static>> {
    let mut env = Environment::new();

    let syntax = SyntaxConfig::builder()
        .block_delimiters("{$", "$}")
        .variable_delimiters("{{", "}}")
        .line_statement_prefix("$$")
        .build()?;

    env.set_syntax(syntax);
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.set_undefined_behavior(minijinja::UndefinedBehavior::SemiStrict);

    env.set_loader(shader_loader);

    env.set_path_join_callback(|name, _parent| format!("chunks/{name}").into());

    Ok(env)
}

fn shader_loader(name: &str) -> std::result::Result<Option<String>, Error> {
    let filename = if std::path::Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wgsl"))
    {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("{name}.wgsl"))
    };

    #[cfg(debug_assertions)]
    {
        let path = std::path::Path::new(SHADER_DIR).join(filename.as_ref());
        if path.exists() {
            return std::fs::read_to_string(&path).map(Some).map_err(|e| {
                Error::new(
                    ErrorKind::TemplateNotFound,
                    format!("Failed to read file: {e}"),
                )
            });
        }
    }

    Ok(EmbeddedAssets::read_to_string(&filename))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_replacements_and_custom_uniforms() {
        let mut source = ShaderSource::new(ShaderStage::Fragment, "procedural_fragment")
            .with_replacement("PROCEDURAL_VERSION", "const PROCEDURAL_VERSION: i32 = 2;")
            .with_replacement("PROCEDURAL_BLOCK", "fn getProceduralColor() -> vec3<f32> { return vec3<f32>(1.0); }");
        source.reflection.uniforms.insert("speed".to_string(), 8);

        let wgsl = source.render().unwrap();
        assert!(wgsl.contains("getProceduralColor"));
        assert!(wgsl.contains("var<uniform> speed"));
        assert!(wgsl.contains("@binding(8)"));
    }

    #[test]
    fn missing_template_is_an_error() {
        let source = ShaderSource::new(ShaderStage::Vertex, "does_not_exist");
        assert!(source.render().is_err());
    }
}
