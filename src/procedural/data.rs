//! Procedural shader descriptor.
//!
//! The descriptor is authored as JSON inside entity user data or inside a
//! `hifi_shader_simple` material:
//!
//! ```json
//! {
//!     "version": 2,
//!     "fragmentShaderUrl": "https://example.com/plasma.fs",
//!     "uniforms": { "speed": 0.5, "tint": [1, 0.5, 0] },
//!     "channels": ["https://example.com/noise.png"]
//! }
//! ```

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use url::Url;

use crate::assets::uri::normalize_url;

/// Maximum number of texture channels a procedural shader can sample.
pub const MAX_PROCEDURAL_TEXTURE_CHANNELS: usize = 4;

const USER_DATA_KEY: &str = "ProceduralEntity";
const URL_KEY: &str = "shaderUrl";
const VERTEX_URL_KEY: &str = "vertexShaderUrl";
const FRAGMENT_URL_KEY: &str = "fragmentShaderUrl";
const VERSION_KEY: &str = "version";
const UNIFORMS_KEY: &str = "uniforms";
const CHANNELS_KEY: &str = "channels";

/// Parsed procedural shader configuration. Equality is structural.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProceduralData {
    /// 1, 2 or 3. Zero when no descriptor was given.
    pub version: u8,
    pub fragment_shader_url: Option<Url>,
    /// Parsed but never activated.
    pub vertex_shader_url: Option<Url>,
    /// Custom uniforms, ordered by name.
    pub uniforms: BTreeMap<String, Value>,
    pub channels: Vec<String>,
}

impl ProceduralData {
    /// Parses a JSON document. Malformed JSON yields the empty descriptor.
    #[must_use]
    pub fn parse(json: &str) -> Self {
        if json.trim().is_empty() {
            return Self::default();
        }
        match serde_json::from_str::<Value>(json) {
            Ok(doc) => Self::from_json(&doc),
            Err(err) => {
                log::warn!("Invalid procedural JSON: {err}");
                Self::default()
            }
        }
    }

    /// Builds a descriptor from a parsed document, accepting both the bare
    /// form and the user-data form nested under `"ProceduralEntity"`.
    #[must_use]
    pub fn from_json(doc: &Value) -> Self {
        let Some(object) = doc.as_object() else {
            return Self::default();
        };
        match object.get(USER_DATA_KEY).and_then(Value::as_object) {
            Some(nested) => Self::from_object(nested),
            None => Self::from_object(object),
        }
    }

    fn from_object(object: &Map<String, Value>) -> Self {
        let mut data = Self::default();
        if object.is_empty() {
            return data;
        }

        data.version = match object.get(VERSION_KEY).and_then(Value::as_f64) {
            Some(version) => {
                let version = version.floor();
                if !(1.0..=3.0).contains(&version) {
                    log::warn!("Unsupported procedural version {version}");
                    return Self::default();
                }
                version as u8
            }
            // Unversioned shaders are V1.
            None => 1,
        };

        let url_of = |key: &str| object.get(key).and_then(Value::as_str).and_then(normalize_url);
        data.fragment_shader_url = url_of(FRAGMENT_URL_KEY).or_else(|| url_of(URL_KEY));
        data.vertex_shader_url = url_of(VERTEX_URL_KEY);

        if let Some(uniforms) = object.get(UNIFORMS_KEY).and_then(Value::as_object) {
            data.uniforms = uniforms
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect();
        }

        if let Some(channels) = object.get(CHANNELS_KEY).and_then(Value::as_array) {
            data.channels = channels
                .iter()
                .map(|channel| channel.as_str().unwrap_or_default().to_string())
                .collect();
        }

        data
    }

    /// Whether any descriptor was supplied.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
