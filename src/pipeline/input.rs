//! Upload resolution: read a user-selected image file into memory.
//!
//! The MIME type is sniffed from the file's magic bytes and falls back to the
//! extension, the way a browser fills in `File.type`. By default anything
//! readable is accepted; with [`UploadLimits::Enforced`] the
//! "PNG, JPG, GIF up to 10MB" guidance becomes a hard check.

use crate::config::{UploadLimits, MAX_UPLOAD_BYTES};
use crate::error::RestoreError;
use image::ImageFormat;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A file the user picked, read fully into memory.
#[derive(Clone)]
pub struct Upload {
    pub path: PathBuf,
    /// Last path component, for display.
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for Upload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Upload")
            .field("path", &self.path)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Read an image file, applying `limits`.
pub async fn read_upload(
    path: impl AsRef<Path>,
    limits: UploadLimits,
) -> Result<Upload, RestoreError> {
    let path = path.as_ref().to_path_buf();

    let meta = tokio::fs::metadata(&path)
        .await
        .map_err(|e| map_io_error(&path, e))?;
    if !meta.is_file() {
        return Err(RestoreError::FileNotFound { path });
    }
    if limits == UploadLimits::Enforced && meta.len() > MAX_UPLOAD_BYTES {
        return Err(RestoreError::FileTooLarge {
            path,
            size: meta.len(),
            limit: MAX_UPLOAD_BYTES,
        });
    }

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| map_io_error(&path, e))?;

    let format = sniff_format(&path, &bytes);
    if limits == UploadLimits::Enforced {
        match format {
            Some(ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Gif) => {}
            Some(other) => {
                return Err(RestoreError::UnsupportedImage {
                    path,
                    detail: format!("{} is not accepted", other.to_mime_type()),
                })
            }
            None => {
                return Err(RestoreError::UnsupportedImage {
                    path,
                    detail: "not a recognised image format".into(),
                })
            }
        }
    }

    let mime_type = format
        .map(|f| f.to_mime_type().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    info!("Loaded '{}' ({} bytes, {})", file_name, bytes.len(), mime_type);

    Ok(Upload {
        path,
        file_name,
        mime_type,
        bytes,
    })
}

/// Content first, extension second.
fn sniff_format(path: &Path, bytes: &[u8]) -> Option<ImageFormat> {
    match image::guess_format(bytes) {
        Ok(f) => Some(f),
        Err(_) => {
            let by_ext = ImageFormat::from_path(path).ok();
            debug!("Magic-byte sniff failed for {}; extension gives {:?}", path.display(), by_ext);
            by_ext
        }
    }
}

fn map_io_error(path: &Path, e: std::io::Error) -> RestoreError {
    match e.kind() {
        ErrorKind::NotFound => RestoreError::FileNotFound {
            path: path.to_path_buf(),
        },
        ErrorKind::PermissionDenied => RestoreError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => RestoreError::FileReadFailed {
            path: path.to_path_buf(),
            source: e,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let err = read_upload("/definitely/not/here.jpg", UploadLimits::Permissive)
            .await
            .unwrap_err();
        assert!(matches!(err, RestoreError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn sniffs_png_regardless_of_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.bin");
        std::fs::write(&path, PNG_MAGIC).unwrap();

        let upload = read_upload(&path, UploadLimits::Permissive).await.unwrap();
        assert_eq!(upload.mime_type, "image/png");
        assert_eq!(upload.file_name, "scan.bin");
    }

    #[tokio::test]
    async fn permissive_accepts_unknown_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();

        let upload = read_upload(&path, UploadLimits::Permissive).await.unwrap();
        assert_eq!(upload.mime_type, "application/octet-stream");
    }

    #[tokio::test]
    async fn enforced_rejects_unknown_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();

        let err = read_upload(&path, UploadLimits::Enforced).await.unwrap_err();
        assert!(matches!(err, RestoreError::UnsupportedImage { .. }));
    }

    #[tokio::test]
    async fn enforced_rejects_oversized_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.png");
        let mut bytes = PNG_MAGIC.to_vec();
        bytes.resize(MAX_UPLOAD_BYTES as usize + 1, 0);
        std::fs::write(&path, bytes).unwrap();

        let err = read_upload(&path, UploadLimits::Enforced).await.unwrap_err();
        assert!(matches!(err, RestoreError::FileTooLarge { .. }));
    }
}
