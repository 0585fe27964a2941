//! URL helpers shared by every resource cache.

use std::path::Path;

use url::Url;

/// Scheme used for resources compiled into the binary.
pub const EMBEDDED_SCHEME: &str = "qrc";

/// Parses a user-supplied resource reference.
///
/// Accepts absolute URLs (`https://`, `file://`, `qrc:/...`) and absolute
/// filesystem paths. Returns `None` for empty or unparsable input.
#[must_use]
pub fn normalize_url(raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let path = Path::new(raw);
    if path.is_absolute() && !raw.contains("://") {
        return Url::from_file_path(path).ok();
    }

    Url::parse(raw).ok()
}

/// Resolves `reference` against an optional base URL.
///
/// Absolute references are returned as is. Without a base, relative
/// references are rejected and absolute paths become `file://` URLs.
#[must_use]
pub fn resolve_relative(base: Option<&Url>, reference: &str) -> Option<Url> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }
    match base {
        Some(base) => base.join(reference).ok(),
        None => normalize_url(reference),
    }
}

/// Path of an embedded resource, without the leading slash.
#[must_use]
pub fn embedded_path(url: &Url) -> Option<&str> {
    (url.scheme() == EMBEDDED_SCHEME).then(|| url.path().trim_start_matches('/'))
}
