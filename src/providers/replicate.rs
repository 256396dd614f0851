//! Replicate image generation provider.
//!
//! Replicate runs predictions asynchronously: one POST creates the job, then
//! the prediction is polled via its `urls.get` endpoint until it reaches a
//! terminal status, and the finished output URL is downloaded.

use crate::error::{parse_retry_after, sanitize_error_message, ImggenError, Result};
use crate::provider::ImageProvider;
use crate::types::{
    GeneratedImage, GenerationMetadata, GenerationRequest, ImageFormat, ProviderKind,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const DEFAULT_BASE_URL: &str = "https://api.replicate.com/v1";

/// Default model when the caller supplies none.
pub(crate) const DEFAULT_MODEL: &str = "black-forest-labs/flux-schnell";

/// Builder for [`ReplicateProvider`].
#[derive(Debug, Clone)]
pub struct ReplicateProviderBuilder {
    api_token: Option<String>,
    base_url: String,
    model: String,
    poll_interval: Duration,
    timeout: Duration,
}

impl Default for ReplicateProviderBuilder {
    fn default() -> Self {
        Self {
            api_token: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            poll_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(600),
        }
    }
}

impl ReplicateProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API token. Falls back to `REPLICATE_API_TOKEN` env var.
    pub fn api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Overrides the API base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the model (e.g. "black-forest-labs/flux-schnell").
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the polling interval.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the maximum time to wait for the prediction to finish.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the provider, resolving the API token.
    pub fn build(self) -> Result<ReplicateProvider> {
        let api_token = self
            .api_token
            .or_else(|| std::env::var("REPLICATE_API_TOKEN").ok())
            .ok_or_else(|| {
                ImggenError::Auth("REPLICATE_API_TOKEN not set and no API token provided".into())
            })?;

        Ok(ReplicateProvider {
            client: reqwest::Client::new(),
            api_token,
            base_url: self.base_url,
            model: self.model,
            poll_interval: self.poll_interval,
            timeout: self.timeout,
        })
    }
}

/// Replicate image generation provider.
pub struct ReplicateProvider {
    client: reqwest::Client,
    api_token: String,
    base_url: String,
    model: String,
    poll_interval: Duration,
    timeout: Duration,
}

impl ReplicateProvider {
    /// Creates a new [`ReplicateProviderBuilder`].
    pub fn builder() -> ReplicateProviderBuilder {
        ReplicateProviderBuilder::new()
    }

    fn parse_error(
        &self,
        status: u16,
        text: &str,
        headers: &reqwest::header::HeaderMap,
    ) -> ImggenError {
        let text = sanitize_error_message(text);
        if status == 429 {
            let retry_after = parse_retry_after(headers).map(Duration::from_secs);
            return ImggenError::RateLimited { retry_after };
        }
        if status == 401 || status == 403 {
            return ImggenError::Auth(text);
        }
        ImggenError::Api {
            status,
            message: text,
        }
    }

    async fn create_prediction(&self, request: &GenerationRequest) -> Result<Prediction> {
        let url = format!("{}/models/{}/predictions", self.base_url, self.model);

        let body = ReplicateRequest {
            input: ReplicateInput {
                prompt: request.prompt.clone(),
            },
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_token))
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

        Ok(response.json().await?)
    }

    /// Polls the prediction until it reaches a terminal status, with an
    /// overall deadline instead of an unbounded loop.
    async fn poll_until_terminal(&self, mut prediction: Prediction) -> Result<Prediction> {
        let start = Instant::now();

        while !prediction.status.is_terminal() {
            if start.elapsed() > self.timeout {
                return Err(ImggenError::Timeout(self.timeout));
            }

            tracing::debug!(
                id = %prediction.id,
                status = ?prediction.status,
                elapsed_secs = start.elapsed().as_secs(),
                "polling replicate prediction"
            );
            tokio::time::sleep(self.poll_interval).await;

            let poll_url = prediction.urls.get.clone();
            let response = self
                .client
                .get(&poll_url)
                .header("Authorization", format!("Bearer {}", self.api_token))
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let headers = response.headers().clone();
                let text = response.text().await.unwrap_or_default();
                return Err(self.parse_error(status.as_u16(), &text, &headers));
            }

            prediction = response.json().await?;
        }

        Ok(prediction)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            if response.status().as_u16() == 403 || response.status().as_u16() == 410 {
                return Err(ImggenError::UrlExpired);
            }
            return Err(ImggenError::Api {
                status: response.status().as_u16(),
                message: "Failed to download image".into(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl ImageProvider for ReplicateProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        let start = Instant::now();

        let prediction = self.create_prediction(request).await?;
        tracing::debug!(id = %prediction.id, model = %self.model, "created replicate prediction");

        let prediction = self.poll_until_terminal(prediction).await?;

        match prediction.status {
            PredictionStatus::Succeeded => {}
            PredictionStatus::Failed | PredictionStatus::Canceled => {
                return Err(ImggenError::UnexpectedResponse(format!(
                    "Generation {}: {}",
                    prediction.status.as_str(),
                    prediction.error.unwrap_or_else(|| "no error reported".into())
                )));
            }
            _ => unreachable!("poll loop only exits on terminal status"),
        }

        let image_url = prediction
            .output
            .and_then(PredictionOutput::into_first_url)
            .ok_or_else(|| {
                ImggenError::UnexpectedResponse("Prediction succeeded but has no output".into())
            })?;

        let data = self.download(&image_url).await?;

        let duration_ms = start.elapsed().as_millis() as u64;
        let format = ImageFormat::from_magic_bytes(&data).unwrap_or(ImageFormat::Png);

        Ok(GeneratedImage::new(
            data,
            format,
            ProviderKind::Replicate,
            GenerationMetadata {
                model: Some(self.model.clone()),
                duration_ms: Some(duration_ms),
            },
        ))
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Replicate
    }
}

#[derive(Debug, Serialize)]
struct ReplicateRequest {
    input: ReplicateInput,
}

#[derive(Debug, Serialize)]
struct ReplicateInput {
    prompt: String,
}

/// Lifecycle status of a Replicate prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum PredictionStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
}

impl PredictionStatus {
    fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Processing => "processing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        }
    }
}

#[derive(Debug, Deserialize)]
struct Prediction {
    id: String,
    status: PredictionStatus,
    urls: PredictionUrls,
    #[serde(default)]
    output: Option<PredictionOutput>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PredictionUrls {
    get: String,
}

/// The output field is a single URL for some models and a list for others.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PredictionOutput {
    Url(String),
    Urls(Vec<String>),
}

impl PredictionOutput {
    fn into_first_url(self) -> Option<String> {
        match self {
            Self::Url(url) => Some(url),
            Self::Urls(urls) => urls.into_iter().next(),
        }
    }
}
