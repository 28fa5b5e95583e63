//! One-shot restoration entry points.
//!
//! These functions run the pipeline straight through (read → encode →
//! restore) and return typed errors, for callers that do not need the
//! interactive [`crate::session::RestoreSession`]. An empty service answer
//! becomes [`RestoreError::NoImageReturned`] here, since a plain `Result` has
//! no third case.

use crate::config::RestoreConfig;
use crate::error::RestoreError;
use crate::pipeline::encode::{self, EncodedImage};
use crate::pipeline::input;
use crate::pipeline::restore::{GeminiClient, RestorationClient};
use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// A finished restoration.
#[derive(Debug, Clone, Serialize)]
pub struct RestoredPhoto {
    pub original: EncodedImage,
    pub restored: EncodedImage,
    /// Wall-clock time of the service call.
    pub duration_ms: u64,
}

/// Restore the image at `input` using the Gemini client from `config`.
///
/// # Errors
/// Upload errors (missing file, limits), [`RestoreError::ServiceFailed`], or
/// [`RestoreError::NoImageReturned`].
pub async fn restore(
    input: impl AsRef<Path>,
    config: &RestoreConfig,
) -> Result<RestoredPhoto, RestoreError> {
    let client = GeminiClient::from_config(config)?;
    restore_with_client(input, config, &client).await
}

/// Like [`restore`], with a caller-supplied client.
pub async fn restore_with_client(
    input: impl AsRef<Path>,
    config: &RestoreConfig,
    client: &dyn RestorationClient,
) -> Result<RestoredPhoto, RestoreError> {
    let upload = input::read_upload(input, config.upload_limits).await?;
    let original = encode::encode_upload(&upload);

    let start = Instant::now();
    let restored = client
        .generate(&original, config.prompt())
        .await
        .map_err(RestoreError::into_service)?
        .ok_or(RestoreError::NoImageReturned)?;
    let duration_ms = start.elapsed().as_millis() as u64;

    info!("Restored '{}' in {}ms", upload.file_name, duration_ms);
    Ok(RestoredPhoto {
        original,
        restored,
        duration_ms,
    })
}

/// Restore and write the result to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files. The
/// service's bytes are written unchanged.
pub async fn restore_to_file(
    input: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &RestoreConfig,
) -> Result<RestoredPhoto, RestoreError> {
    let photo = restore(input, config).await?;
    write_image(output_path.as_ref(), &photo.restored).await?;
    Ok(photo)
}

/// Synchronous wrapper around [`restore`].
///
/// Creates a temporary tokio runtime internally.
pub fn restore_sync(
    input: impl AsRef<Path>,
    config: &RestoreConfig,
) -> Result<RestoredPhoto, RestoreError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| RestoreError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(restore(input, config))
}

/// Decode `image` and write its bytes to `path` atomically.
pub async fn write_image(path: &Path, image: &EncodedImage) -> Result<(), RestoreError> {
    let bytes = image.decode_bytes()?;
    write_atomic(path, &bytes).await
}

pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), RestoreError> {
    let fail = |source| RestoreError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(fail)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, bytes).await.map_err(fail)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(fail)?;

    info!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}
