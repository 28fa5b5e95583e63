//! Restoration call: send the encoded photo to the generative service.
//!
//! This is the only stage with network I/O. It makes exactly one attempt and
//! enforces no timeout of its own unless one is configured. The three possible
//! results are kept apart in [`RestoreOutcome`] so the workflow can give
//! "the model returned nothing" its own message instead of treating it like a
//! transport failure.
//!
//! [`RestorationClient`] is the seam: [`GeminiClient`] speaks the Gemini
//! `generateContent` REST API; tests substitute an in-memory client.

use crate::config::RestoreConfig;
use crate::error::RestoreError;
use crate::pipeline::encode::{EncodedImage, DEFAULT_RESULT_MIME};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// A remote service able to turn one image into another.
#[async_trait]
pub trait RestorationClient: Send + Sync {
    /// Send `image` with `prompt`.
    ///
    /// `Ok(None)` means the service answered but produced no image.
    async fn generate(
        &self,
        image: &EncodedImage,
        prompt: &str,
    ) -> Result<Option<EncodedImage>, RestoreError>;
}

/// Result of one restoration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// The service returned an image.
    Restored(EncodedImage),
    /// The service completed without an image.
    NoImage,
    /// The call failed; the message is ready to show to the user.
    Failed(String),
}

/// Run one restoration attempt and classify the result.
pub async fn restore_photo(
    client: &dyn RestorationClient,
    image: &EncodedImage,
    prompt: &str,
) -> RestoreOutcome {
    let start = Instant::now();
    match client.generate(image, prompt).await {
        Ok(Some(restored)) => {
            info!(
                "Restoration returned {} ({} bytes base64) in {:?}",
                restored.mime_type,
                restored.data.len(),
                start.elapsed()
            );
            RestoreOutcome::Restored(restored)
        }
        Ok(None) => {
            warn!("Restoration completed without an image after {:?}", start.elapsed());
            RestoreOutcome::NoImage
        }
        Err(e) => {
            warn!("Restoration failed: {}", e);
            RestoreOutcome::Failed(e.into_service().to_string())
        }
    }
}

// ── Gemini ───────────────────────────────────────────────────────────────

/// Client for the Gemini `models/{model}:generateContent` endpoint.
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("has_api_key", &self.api_key.is_some())
            .finish()
    }
}

impl GeminiClient {
    /// Build a client from `config`.
    ///
    /// A missing API key is only a warning here; requests fail later with a
    /// service error instead.
    pub fn from_config(config: &RestoreConfig) -> Result<Self, RestoreError> {
        let api_key = config.resolve_api_key();
        if api_key.is_none() {
            warn!("API key not found. Please set the API_KEY environment variable.");
        }

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.api_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| RestoreError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            timeout_secs: config.api_timeout_secs,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl RestorationClient for GeminiClient {
    async fn generate(
        &self,
        image: &EncodedImage,
        prompt: &str,
    ) -> Result<Option<EncodedImage>, RestoreError> {
        let key = self.api_key.as_deref().ok_or_else(|| {
            RestoreError::service("API key not found. Please set the API_KEY environment variable.")
        })?;

        let body = GenerateContentRequest::restoration(image, prompt);
        debug!("POST {} ({})", self.endpoint(), self.model);

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RestoreError::service(format!(
                        "request timed out after {}s",
                        self.timeout_secs.unwrap_or_default()
                    ))
                } else {
                    RestoreError::service(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RestoreError::service(e.to_string()))?;

        if !status.is_success() {
            return Err(RestoreError::service(describe_error_body(status.as_u16(), &text)));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text)
            .map_err(|e| RestoreError::service(format!("malformed response: {e}")))?;
        Ok(extract_image(parsed))
    }
}

/// First inline image in the first candidate, if any.
///
/// Image models sometimes lead with a text part, so every part is scanned.
pub fn extract_image(response: GenerateContentResponse) -> Option<EncodedImage> {
    if let Some(ref feedback) = response.prompt_feedback {
        if let Some(ref reason) = feedback.block_reason {
            warn!("Prompt blocked by service: {}", reason);
        }
    }

    let candidate = response.candidates.into_iter().next()?;
    if let Some(ref reason) = candidate.finish_reason {
        debug!("Candidate finish reason: {}", reason);
    }

    candidate
        .content?
        .parts
        .into_iter()
        .filter_map(|p| p.inline_data)
        .find(|d| !d.data.is_empty())
        .map(|d| {
            EncodedImage::new(
                d.data,
                d.mime_type.unwrap_or_else(|| DEFAULT_RESULT_MIME.to_string()),
            )
        })
}

/// Human-readable message for a non-2xx response.
fn describe_error_body(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(env) => match env.error.status {
            Some(s) => format!("{} ({s}, HTTP {status})", env.error.message),
            None => format!("{} (HTTP {status})", env.error.message),
        },
        Err(_) => {
            let snippet: String = body.chars().take(200).collect();
            if snippet.trim().is_empty() {
                format!("HTTP {status}")
            } else {
                format!("HTTP {status}: {}", snippet.trim())
            }
        }
    }
}

// ── Wire format ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    /// Image part first, instruction second, image-only output.
    pub fn restoration(image: &EncodedImage, prompt: &str) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![
                    Part {
                        inline_data: Some(InlineData {
                            mime_type: Some(image.mime_type.clone()),
                            data: image.data.clone(),
                        }),
                        text: None,
                    },
                    Part {
                        inline_data: None,
                        text: Some(prompt.to_string()),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["IMAGE".to_string()],
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub data: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(v: serde_json::Value) -> GenerateContentResponse {
        serde_json::from_value(v).expect("valid response json")
    }

    struct Scripted(Result<Option<EncodedImage>, &'static str>);

    #[async_trait]
    impl RestorationClient for Scripted {
        async fn generate(
            &self,
            _image: &EncodedImage,
            _prompt: &str,
        ) -> Result<Option<EncodedImage>, RestoreError> {
            match &self.0 {
                Ok(v) => Ok(v.clone()),
                Err(msg) => Err(RestoreError::service(*msg)),
            }
        }
    }

    #[test]
    fn request_puts_image_before_prompt() {
        let img = EncodedImage::new("QUJD", "image/png");
        let request = GenerateContentRequest::restoration(&img, "fix it");
        let body = serde_json::to_value(request).unwrap();
        assert_eq!(
            body,
            json!({
                "contents": [{ "parts": [
                    { "inlineData": { "mimeType": "image/png", "data": "QUJD" } },
                    { "text": "fix it" }
                ]}],
                "generationConfig": { "responseModalities": ["IMAGE"] }
            })
        );
    }

    #[test]
    fn extracts_inline_image() {
        let resp = parse(json!({
            "candidates": [{ "content": { "parts": [
                { "inlineData": { "mimeType": "image/png", "data": "iVBOR" } }
            ]}, "finishReason": "STOP" }]
        }));
        let img = extract_image(resp).expect("image present");
        assert_eq!(img, EncodedImage::new("iVBOR", "image/png"));
    }

    #[test]
    fn skips_leading_text_part() {
        let resp = parse(json!({
            "candidates": [{ "content": { "parts": [
                { "text": "Here is your restored photo." },
                { "inlineData": { "data": "AAAA" } }
            ]}}]
        }));
        let img = extract_image(resp).expect("image present");
        assert_eq!(img.mime_type, DEFAULT_RESULT_MIME);
    }

    #[test]
    fn text_only_or_blocked_is_none() {
        let text_only = parse(json!({
            "candidates": [{ "content": { "parts": [{ "text": "I can't do that." }] } }]
        }));
        assert!(extract_image(text_only).is_none());

        let blocked = parse(json!({ "promptFeedback": { "blockReason": "SAFETY" } }));
        assert!(extract_image(blocked).is_none());
    }

    #[test]
    fn error_body_message_is_surfaced() {
        let msg = describe_error_body(
            400,
            r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#,
        );
        assert_eq!(msg, "API key not valid. (INVALID_ARGUMENT, HTTP 400)");
        assert_eq!(describe_error_body(502, ""), "HTTP 502");
        assert_eq!(describe_error_body(503, "overloaded"), "HTTP 503: overloaded");
    }

    #[tokio::test]
    async fn outcomes_are_classified() {
        let img = EncodedImage::new("QUJD", "image/png");

        let ok = Scripted(Ok(Some(img.clone())));
        assert_eq!(restore_photo(&ok, &img, "p").await, RestoreOutcome::Restored(img.clone()));

        let empty = Scripted(Ok(None));
        assert_eq!(restore_photo(&empty, &img, "p").await, RestoreOutcome::NoImage);

        let failing = Scripted(Err("network timeout"));
        assert_eq!(
            restore_photo(&failing, &img, "p").await,
            RestoreOutcome::Failed("AI service failed: network timeout".into())
        );
    }

    #[tokio::test]
    async fn missing_key_fails_at_request_time() {
        let config = RestoreConfig::builder()
            .api_key("")
            .base_url("http://127.0.0.1:9")
            .build()
            .unwrap();
        let mut client = GeminiClient::from_config(&config).unwrap();
        client.api_key = None;

        let img = EncodedImage::new("QUJD", "image/png");
        let err = client.generate(&img, "p").await.unwrap_err();
        assert!(err.to_string().starts_with("AI service failed: API key not found"));
    }
}
