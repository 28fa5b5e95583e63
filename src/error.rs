//! Error types for the photo-restore library.
//!
//! A single fatal error type, [`RestoreError`], covers every operation that
//! can fail: reading the upload, talking to the restoration service, decoding
//! the result and writing the download.
//!
//! Failures are terminal for the operation that raised them, never for the
//! session. The [`crate::workflow`] controller turns each error into a
//! user-facing message and returns to an interactive state, so callers only
//! see `Err(RestoreError)` from the lower-level pipeline functions.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the photo-restore library.
#[derive(Debug, Error)]
pub enum RestoreError {
    // ── Upload errors ─────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists but reading it failed part-way.
    #[error("Failed to read image file '{path}': {source}")]
    FileReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Upload limits are enforced and the file is not a PNG, JPEG or GIF.
    #[error("Unsupported image '{path}': {detail}\nUse a PNG, JPG or GIF file.")]
    UnsupportedImage { path: PathBuf, detail: String },

    /// Upload limits are enforced and the file is too big.
    #[error("Image '{path}' is {size} bytes; the limit is {limit} bytes")]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },

    // ── Encoding errors ───────────────────────────────────────────────────
    /// A string that should have been a `data:<mime>;base64,<payload>` URI was not.
    #[error("Invalid data URI: {0}")]
    InvalidDataUri(String),

    /// Base64 payload could not be decoded.
    #[error("Invalid base64 image payload: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// Image bytes could not be decoded into pixels.
    #[error("Could not decode image: {detail}")]
    ImageDecode { detail: String },

    // ── Service errors ────────────────────────────────────────────────────
    /// The remote restoration call failed (transport, HTTP status, or
    /// malformed response).
    #[error("AI service failed: {message}")]
    ServiceFailed { message: String },

    /// The service answered but produced no image.
    #[error("The AI model did not return an image. Please try again.")]
    NoImageReturned,

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the restored image file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Viewer errors ─────────────────────────────────────────────────────
    /// The comparison window could not be created or updated.
    #[error("Viewer window error: {0}")]
    Window(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RestoreError {
    /// Wrap any displayable service-side failure.
    pub fn service(message: impl Into<String>) -> Self {
        RestoreError::ServiceFailed {
            message: message.into(),
        }
    }

    /// Report any failure raised by a restoration client as a service failure.
    pub fn into_service(self) -> Self {
        match self {
            e @ RestoreError::ServiceFailed { .. } => e,
            other => RestoreError::service(other.to_string()),
        }
    }

    /// Whether the error rejected the picked file itself.
    pub fn is_upload(&self) -> bool {
        matches!(
            self,
            RestoreError::FileNotFound { .. }
                | RestoreError::PermissionDenied { .. }
                | RestoreError::FileReadFailed { .. }
                | RestoreError::UnsupportedImage { .. }
                | RestoreError::FileTooLarge { .. }
        )
    }
}
