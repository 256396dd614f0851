//! Image provider trait.

use crate::error::Result;
use crate::types::{GeneratedImage, GenerationRequest, ProviderKind};
use async_trait::async_trait;

/// Trait for image generation providers.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Generates an image from the given request.
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage>;

    /// Returns the kind of this provider.
    fn kind(&self) -> ProviderKind;

    /// Returns the name of this provider for display.
    fn name(&self) -> &str {
        match self.kind() {
            ProviderKind::OpenAi => "OpenAI (DALL-E 3)",
            ProviderKind::Gemini => "Gemini (Google)",
            ProviderKind::Stability => "Stability AI",
            ProviderKind::Replicate => "Replicate",
        }
    }
}
