use rust_embed::RustEmbed;

/// Shader templates and built-in procedural shaders compiled into the binary.
///
/// Also serves `qrc:/` URLs.
#[derive(RustEmbed)]
#[folder = "src/procedural/shaders"]
pub struct EmbeddedAssets;

impl EmbeddedAssets {
    /// Raw bytes of an embedded file.
    #[must_use]
    pub fn read(path: &str) -> Option<Vec<u8>> {
        Self::get(path).map(|file| file.data.into_owned())
    }

    /// An embedded file decoded as UTF-8.
    #[must_use]
    pub fn read_to_string(path: &str) -> Option<String> {
        Self::read(path).and_then(|bytes| String::from_utf8(bytes).ok())
    }
}
