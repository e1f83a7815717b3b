//! Structured error types for the docform engine.
//!
//! Nothing in the engine is fatal to the host: configuration and resource
//! problems degrade locally and are only logged. The variants here cover the
//! failures that must reach the caller, mostly persistence.

use std::io;
use thiserror::Error;

/// The unified error type returned by all public docform API functions.
#[derive(Error, Debug)]
pub enum DocformError {
    /// Input JSON failed to parse.
    #[error("Failed to parse input: {source}{}", hint_suffix(.hint))]
    Parse {
        source: serde_json::Error,
        hint: String,
    },

    /// Settings could not be read, validated or written.
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// Image storage failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Image bytes could not be decoded.
    #[error("Image error: {0}")]
    Image(String),

    /// Composition or PDF serialization failed.
    #[error("Render error: {0}")]
    Render(String),

    /// I/O error outside the stores (CLI input/output).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

fn hint_suffix(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {}", hint)
    }
}

impl From<serde_json::Error> for DocformError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the record schema. Check field names and types.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input, is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        DocformError::Parse { source: e, hint }
    }
}

/// Errors raised by the settings store and settings validation.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// The backing store refused a read or write.
    #[error("Settings store error: {0}")]
    Store(String),

    /// A settings value failed validation.
    #[error("Invalid setting '{key}': {reason}")]
    Invalid { key: String, reason: String },

    /// Stored JSON (settings export or shape collection) could not be handled.
    #[error("Settings JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File-backed store I/O failure.
    #[error("Settings I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Errors raised by the image storage collaborator.
#[derive(Error, Debug)]
pub enum StorageError {
    /// A filename was absolute or escaped the storage directory.
    #[error("Invalid image path '{0}': only relative filenames are allowed")]
    InvalidPath(String),

    /// The file extension is not an accepted image format.
    #[error("Invalid image format '{0}'. Supported: jpg, jpeg, png, gif, webp")]
    UnsupportedFormat(String),

    /// Reading or writing the file failed.
    #[error("Image storage I/O error: {0}")]
    Io(#[from] io::Error),

    /// Thumbnail generation failed.
    #[error("Thumbnail error: {0}")]
    Thumbnail(String),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, DocformError>;
