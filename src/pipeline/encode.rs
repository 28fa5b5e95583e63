//! Image encoding: raw upload bytes ↔ base64 [`EncodedImage`].
//!
//! Generative image APIs accept and return images as base64 strings plus a
//! MIME type embedded in the JSON body. The same pair is what the workflow
//! keeps for both the original and the restored photo, and it renders
//! directly as a `data:` URI when a caller wants one.
//!
//! Nothing here re-encodes pixels: uploads are forwarded byte-for-byte and
//! results are decoded only when something needs to draw them.

use crate::error::RestoreError;
use crate::pipeline::input::Upload;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// MIME type assumed for a service result that does not state one.
pub const DEFAULT_RESULT_MIME: &str = "image/jpeg";

static RE_DATA_URI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^data:([\w.+-]+/[\w.+-]+);base64,(.*)$").unwrap());

/// A base64 image payload and its MIME type.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedImage {
    /// Standard (padded) base64 of the image file bytes.
    pub data: String,
    /// e.g. `image/png`.
    pub mime_type: String,
}

impl fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedImage")
            .field("mime_type", &self.mime_type)
            .field("data_len", &self.data.len())
            .finish()
    }
}

impl EncodedImage {
    pub fn new(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Base64-encode raw file bytes.
    pub fn from_bytes(bytes: &[u8], mime_type: impl Into<String>) -> Self {
        Self::new(STANDARD.encode(bytes), mime_type)
    }

    /// Render as `data:<mime>;base64,<payload>`.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    /// Parse a `data:<mime>;base64,<payload>` URI.
    pub fn from_data_uri(uri: &str) -> Result<Self, RestoreError> {
        let caps = RE_DATA_URI.captures(uri.trim()).ok_or_else(|| {
            let head: String = uri.chars().take(32).collect();
            RestoreError::InvalidDataUri(format!("expected data:<mime>;base64,… got '{head}'"))
        })?;
        Ok(Self::new(&caps[2], &caps[1]))
    }

    /// Decode the base64 payload back to file bytes.
    pub fn decode_bytes(&self) -> Result<Vec<u8>, RestoreError> {
        Ok(STANDARD.decode(self.data.trim())?)
    }

    /// Decode the payload into pixels.
    pub fn decode_image(&self) -> Result<DynamicImage, RestoreError> {
        let bytes = self.decode_bytes()?;
        image::load_from_memory(&bytes).map_err(|e| RestoreError::ImageDecode {
            detail: format!("{} ({} bytes): {}", self.mime_type, bytes.len(), e),
        })
    }
}

/// Encode an upload for the restoration request.
pub fn encode_upload(upload: &Upload) -> EncodedImage {
    let encoded = EncodedImage::from_bytes(&upload.bytes, upload.mime_type.clone());
    debug!(
        "Encoded '{}' → {} bytes base64 ({})",
        upload.file_name,
        encoded.data.len(),
        encoded.mime_type
    );
    encoded
}
