//! OpenAI image generation provider (DALL-E 3).

use crate::error::{parse_retry_after, sanitize_error_message, ImggenError, Result};
use crate::provider::ImageProvider;
use crate::types::{
    GeneratedImage, GenerationMetadata, GenerationRequest, ImageFormat, ProviderKind,
};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Instant;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const MODEL: &str = "dall-e-3";

/// Builder for [`OpenAiProvider`].
#[derive(Debug, Clone)]
pub struct OpenAiProviderBuilder {
    api_key: Option<String>,
    base_url: String,
}

impl Default for OpenAiProviderBuilder {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl OpenAiProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `OPENAI_API_KEY` env var.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Overrides the API base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Builds the provider, resolving the API key.
    pub fn build(self) -> Result<OpenAiProvider> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                ImggenError::Auth("OPENAI_API_KEY not set and no API key provided".into())
            })?;

        Ok(OpenAiProvider {
            client: reqwest::Client::new(),
            api_key,
            base_url: self.base_url,
        })
    }
}

/// OpenAI image generation provider.
///
/// One synchronous POST to the images-generations endpoint, requesting
/// base64-encoded output. Size and quality are forwarded as-is; the server
/// is authoritative about allowed values.
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiProvider {
    /// Creates a new [`OpenAiProviderBuilder`].
    pub fn builder() -> OpenAiProviderBuilder {
        OpenAiProviderBuilder::new()
    }

    fn parse_error(
        &self,
        status: u16,
        text: &str,
        headers: &reqwest::header::HeaderMap,
    ) -> ImggenError {
        let text = sanitize_error_message(text);
        if status == 429 {
            let retry_after = parse_retry_after(headers).map(std::time::Duration::from_secs);
            return ImggenError::RateLimited { retry_after };
        }
        if status == 401 || status == 403 {
            return ImggenError::Auth(text);
        }
        let lower = text.to_lowercase();
        if lower.contains("safety") || lower.contains("content_policy") {
            return ImggenError::ContentBlocked(text);
        }
        ImggenError::Api {
            status,
            message: text,
        }
    }
}

#[async_trait]
impl ImageProvider for OpenAiProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        let start = Instant::now();

        let url = format!("{}/images/generations", self.base_url);
        let body = OpenAiRequest::from_generation_request(request);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(self.parse_error(status.as_u16(), &text, &headers));
        }

        let openai_response: OpenAiResponse = response.json().await?;

        let image_data = openai_response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| ImggenError::UnexpectedResponse("No images in OpenAI response".into()))?;

        let b64 = image_data.b64_json.ok_or_else(|| {
            ImggenError::UnexpectedResponse("OpenAI response contained no image data".into())
        })?;

        let data = base64::engine::general_purpose::STANDARD
            .decode(&b64)
            .map_err(|e| ImggenError::Decode(e.to_string()))?;

        let duration_ms = start.elapsed().as_millis() as u64;
        let format = ImageFormat::from_magic_bytes(&data).unwrap_or(ImageFormat::Png);

        Ok(GeneratedImage::new(
            data,
            format,
            ProviderKind::OpenAi,
            GenerationMetadata {
                model: Some(MODEL.to_string()),
                duration_ms: Some(duration_ms),
            },
        ))
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }
}

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    prompt: String,
    n: u32,
    size: String,
    quality: String,
    response_format: String,
}

impl OpenAiRequest {
    fn from_generation_request(req: &GenerationRequest) -> Self {
        Self {
            model: MODEL.to_string(),
            prompt: req.prompt.clone(),
            n: 1,
            size: req.size_string(),
            quality: req.quality.as_str().to_string(),
            response_format: "b64_json".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    data: Vec<OpenAiImageData>,
}

#[derive(Debug, Deserialize)]
struct OpenAiImageData {
    #[serde(default)]
    b64_json: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    revised_prompt: Option<String>,
}
