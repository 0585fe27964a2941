//! Error Types
//!
//! This module defines the error types used throughout the crate.
//!
//! # Overview
//!
//! The main error type [`ProcMatError`] covers the failure modes of the
//! material pipeline seams:
//! - Resource fetching (local files, embedded assets, HTTP)
//! - Decoding (JSON documents, images, UTF-8 shader text)
//! - Shader template rendering and program compilation
//!
//! Most of these never escape the subsystem: a failed fetch leaves its
//! resource in the failed state and a failed compile leaves the procedural
//! engine without a pipeline. The error is logged where it is absorbed.
//!
//! # Usage
//!
//! ```rust,ignore
//! use procmat::errors::{ProcMatError, Result};
//!
//! fn read_shader() -> Result<String> {
//!     Ok(String::new())
//! }
//! ```

use thiserror::Error;

/// The main error type for the crate.
#[derive(Error, Debug)]
pub enum ProcMatError {
    // ========================================================================
    // I/O & Network Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing error.
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// HTTP response error with status code.
    #[error("HTTP response error: status {status}")]
    HttpResponse {
        /// HTTP status code
        status: u16,
    },

    /// Transport-level network failure.
    #[error("Network error: {0}")]
    Network(String),

    /// The URL scheme has no reader.
    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    /// An embedded (`qrc:`) resource does not exist.
    #[error("Embedded resource not found: {0}")]
    EmbeddedNotFound(String),

    // ========================================================================
    // Format & Parsing Errors
    // ========================================================================
    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Image decoding error.
    #[error("Image decode error: {0}")]
    ImageDecode(String),

    /// Shader text is not valid UTF-8.
    #[error("Shader source is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    // ========================================================================
    // Shader Errors
    // ========================================================================
    /// Template expansion failed.
    #[error("Shader template error: {0}")]
    Template(#[from] minijinja::Error),

    /// The backend rejected a program.
    #[error("Shader compile error: {0}")]
    ShaderCompile(String),

    // ========================================================================
    // Platform-Specific Errors
    // ========================================================================
    /// Feature not enabled.
    #[error("Feature not enabled: {0}")]
    FeatureNotEnabled(String),
}

impl From<image::ImageError> for ProcMatError {
    fn from(err: image::ImageError) -> Self {
        ProcMatError::ImageDecode(err.to_string())
    }
}

/// Alias for `Result<T, ProcMatError>`.
pub type Result<T> = std::result::Result<T, ProcMatError>;
