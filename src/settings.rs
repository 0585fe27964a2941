//! Procedural Settings
//!
//! Runtime configuration for the procedural material pipeline.
//!
//! ```rust,ignore
//! use procmat::settings::ProceduralSettings;
//!
//! // Default: local shaders are read once, never polled.
//! let settings = ProceduralSettings::default();
//!
//! // Development: re-read local shaders whenever their mtime advances.
//! let settings = ProceduralSettings {
//!     hot_reload_local_shaders: true,
//!     ..Default::default()
//! };
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Configuration shared by every procedural engine created from one context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProceduralSettings {
    /// Stat local (`file://`) shaders every prepared frame and reload them when
    /// their modification time advances.
    ///
    /// This touches the filesystem once per drawn object per frame, so it is
    /// meant for shader authoring sessions only. When disabled, a local shader
    /// is read the first time it is prepared.
    pub hot_reload_local_shaders: bool,

    /// Emit the fully expanded shader sources at `trace` level whenever a
    /// pipeline variant is built.
    pub log_generated_shaders: bool,
}

impl Default for ProceduralSettings {
    #[inline]
    fn default() -> Self {
        Self {
            hot_reload_local_shaders: false,
            log_generated_shaders: false,
        }
    }
}

impl ProceduralSettings {
    /// Parses settings from a JSON document. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
