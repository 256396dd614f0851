//! Stability AI image generation provider (Stable Image Core).

use crate::error::{parse_retry_after, sanitize_error_message, ImggenError, Result};
use crate::provider::ImageProvider;
use crate::types::{
    GeneratedImage, GenerationMetadata, GenerationRequest, ImageFormat, ProviderKind,
};
use async_trait::async_trait;
use std::time::Instant;

const DEFAULT_BASE_URL: &str = "https://api.stability.ai/v2beta";

/// Builder for [`StabilityProvider`].
#[derive(Debug, Clone)]
pub struct StabilityProviderBuilder {
    api_key: Option<String>,
    base_url: String,
}

impl Default for StabilityProviderBuilder {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl StabilityProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `STABILITY_API_KEY` env var.
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
    pub fn build(self) -> Result<StabilityProvider> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("STABILITY_API_KEY").ok())
            .ok_or_else(|| {
                ImggenError::Auth("STABILITY_API_KEY not set and no API key provided".into())
            })?;

        Ok(StabilityProvider {
            client: reqwest::Client::new(),
            api_key,
            base_url: self.base_url,
        })
    }
}

/// Stability AI image generation provider.
///
/// Sends a multipart form with `Accept: image/*` and treats the raw response
/// body as the image, with no JSON unwrapping.
pub struct StabilityProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl StabilityProvider {
    /// Creates a new [`StabilityProviderBuilder`].
    pub fn builder() -> StabilityProviderBuilder {
        StabilityProviderBuilder::new()
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
        if lower.contains("content_moderation") || lower.contains("flagged") {
            return ImggenError::ContentBlocked(text);
        }
        ImggenError::Api {
            status,
            message: text,
        }
    }
}

#[async_trait]
impl ImageProvider for StabilityProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        let start = Instant::now();

        let url = format!("{}/stable-image/generate/core", self.base_url);

        let form = reqwest::multipart::Form::new()
            .text("prompt", request.prompt.clone())
            .text("output_format", "png")
            .text("width", request.width.to_string())
            .text("height", request.height.to_string());

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Accept", "image/*")
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(self.parse_error(status.as_u16(), &text, &headers));
        }

        let data = response.bytes().await?.to_vec();
        if data.is_empty() {
            return Err(ImggenError::UnexpectedResponse(
                "Stability response body was empty".into(),
            ));
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        let format = ImageFormat::from_magic_bytes(&data).unwrap_or(ImageFormat::Png);

        Ok(GeneratedImage::new(
            data,
            format,
            ProviderKind::Stability,
            GenerationMetadata {
                model: None,
                duration_ms: Some(duration_ms),
            },
        ))
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Stability
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    #[test]
    fn test_builder_with_explicit_key() {
        let provider = StabilityProviderBuilder::new().api_key("st-test").build();
        assert!(provider.is_ok());
    }

    #[tokio::test]
    async fn test_generate_returns_raw_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v2beta/stable-image/generate/core")
                    .header("authorization", "Bearer st-test")
                    .header("accept", "image/*")
                    .body_includes("1024")
                    .body_includes("A sunset")
                    .body_includes("png");
                then.status(200)
                    .header("content-type", "image/png")
                    .body("raw image bytes");
            })
            .await;

        let provider = StabilityProvider::builder()
            .api_key("st-test")
            .base_url(server.url("/v2beta"))
            .build()
            .unwrap();

        let image = provider
            .generate(&GenerationRequest::new("A sunset"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(image.data, b"raw image bytes");
        assert_eq!(image.provider, ProviderKind::Stability);
    }

    #[tokio::test]
    async fn test_generate_surfaces_api_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v2beta/stable-image/generate/core");
                then.status(422).body("invalid dimensions");
            })
            .await;

        let provider = StabilityProvider::builder()
            .api_key("st-test")
            .base_url(server.url("/v2beta"))
            .build()
            .unwrap();

        let err = provider
            .generate(&GenerationRequest::new("x"))
            .await
            .unwrap_err();
        match err {
            ImggenError::Api { status, message } => {
                assert_eq!(status, 422);
                assert_eq!(message, "invalid dimensions");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_generate_empty_body_is_content_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v2beta/stable-image/generate/core");
                then.status(200).header("content-type", "image/png");
            })
            .await;

        let provider = StabilityProvider::builder()
            .api_key("st-test")
            .base_url(server.url("/v2beta"))
            .build()
            .unwrap();

        let err = provider
            .generate(&GenerationRequest::new("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ImggenError::UnexpectedResponse(_)));
    }
}
