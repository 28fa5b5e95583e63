//! Configuration types for photo restoration.
//!
//! All behaviour is controlled through [`RestoreConfig`], built via its
//! [`RestoreConfigBuilder`]. Keeping every knob in one struct makes it easy to
//! share a config between the CLI, the viewer and tests, and to log it
//! without leaking the API key.

use crate::error::RestoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default generative model used for restoration.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";

/// Default REST endpoint of the generative service.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Filename offered for the restored download.
pub const DEFAULT_OUTPUT_FILE_NAME: &str = "restored-photo.jpg";

/// Environment variables consulted for the API key, in order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["API_KEY", "GEMINI_API_KEY"];

/// Upload size limit applied by [`UploadLimits::Enforced`] (10 MB).
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Configuration for a restoration session.
///
/// # Example
/// ```rust
/// use photo_restore::RestoreConfig;
///
/// let config = RestoreConfig::builder()
///     .model("gemini-2.5-flash-image")
///     .api_timeout_secs(90)
///     .build()
///     .unwrap();
/// assert_eq!(config.api_timeout_secs, Some(90));
/// ```
#[derive(Clone)]
pub struct RestoreConfig {
    /// Generative model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Static API credential. If `None`, resolved from [`API_KEY_ENV_VARS`]
    /// when the client is built.
    pub api_key: Option<String>,

    /// Service base URL. Default: [`DEFAULT_BASE_URL`].
    pub base_url: String,

    /// Custom restoration instruction. If `None`, uses
    /// [`crate::prompts::RESTORATION_PROMPT`].
    pub prompt: Option<String>,

    /// Per-request timeout in seconds. Default: `None`.
    ///
    /// Restoration is a single long-running call; without a value the
    /// transport's own defaults apply.
    pub api_timeout_secs: Option<u64>,

    /// Whether the upload guidance (size/type) is enforced. Default: permissive.
    pub upload_limits: UploadLimits,

    /// Filename used for the download. Default: [`DEFAULT_OUTPUT_FILE_NAME`].
    pub output_file_name: String,
}

impl Default for RestoreConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            prompt: None,
            api_timeout_secs: None,
            upload_limits: UploadLimits::default(),
            output_file_name: DEFAULT_OUTPUT_FILE_NAME.to_string(),
        }
    }
}

impl fmt::Debug for RestoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestoreConfig")
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("prompt", &self.prompt.as_ref().map(|p| p.len()))
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("upload_limits", &self.upload_limits)
            .field("output_file_name", &self.output_file_name)
            .finish()
    }
}

impl RestoreConfig {
    /// Create a new builder for `RestoreConfig`.
    pub fn builder() -> RestoreConfigBuilder {
        RestoreConfigBuilder {
            config: Self::default(),
        }
    }

    /// The explicit key, or the first non-empty key found in the environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(ref key) = self.api_key {
            if !key.is_empty() {
                return Some(key.clone());
            }
        }
        API_KEY_ENV_VARS
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|v| !v.is_empty())
    }

    /// The prompt override, or the built-in restoration prompt.
    pub fn prompt(&self) -> &str {
        self.prompt
            .as_deref()
            .unwrap_or(crate::prompts::RESTORATION_PROMPT)
    }
}

/// Builder for [`RestoreConfig`].
#[derive(Debug)]
pub struct RestoreConfigBuilder {
    config: RestoreConfig,
}

impl RestoreConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = Some(prompt.into());
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    pub fn upload_limits(mut self, limits: UploadLimits) -> Self {
        self.config.upload_limits = limits;
        self
    }

    pub fn output_file_name(mut self, name: impl Into<String>) -> Self {
        self.config.output_file_name = name.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RestoreConfig, RestoreError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(RestoreError::InvalidConfig("Model must not be empty".into()));
        }
        if !(c.base_url.starts_with("http://") || c.base_url.starts_with("https://")) {
            return Err(RestoreError::InvalidConfig(format!(
                "Base URL must be http(s), got '{}'",
                c.base_url
            )));
        }
        if c.api_timeout_secs == Some(0) {
            return Err(RestoreError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.output_file_name.trim().is_empty() {
            return Err(RestoreError::InvalidConfig(
                "Output file name must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Whether the "PNG, JPG, GIF up to 10MB" guidance is checked on upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UploadLimits {
    /// Accept any readable file and let the service judge it. (default)
    #[default]
    Permissive,
    /// Reject files over [`MAX_UPLOAD_BYTES`] or not sniffed as PNG/JPEG/GIF.
    Enforced,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service() {
        let c = RestoreConfig::default();
        assert_eq!(c.model, "gemini-2.5-flash-image");
        assert_eq!(c.output_file_name, "restored-photo.jpg");
        assert_eq!(c.api_timeout_secs, None);
        assert_eq!(c.upload_limits, UploadLimits::Permissive);
    }

    #[test]
    fn debug_redacts_key() {
        let c = RestoreConfig::builder().api_key("secret-key").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("secret-key"), "got: {dbg}");
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn explicit_key_wins() {
        let c = RestoreConfig::builder().api_key("k1").build().unwrap();
        assert_eq!(c.resolve_api_key().as_deref(), Some("k1"));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(RestoreConfig::builder().model("  ").build().is_err());
        assert!(RestoreConfig::builder().base_url("ftp://x").build().is_err());
        assert!(RestoreConfig::builder().api_timeout_secs(0).build().is_err());
    }

    #[test]
    fn prompt_override() {
        let c = RestoreConfig::builder().prompt("just sharpen").build().unwrap();
        assert_eq!(c.prompt(), "just sharpen");
        assert_eq!(
            RestoreConfig::default().prompt(),
            crate::prompts::RESTORATION_PROMPT
        );
    }
}
