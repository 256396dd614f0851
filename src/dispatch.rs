//! Provider dispatch.

use crate::error::Result;
use crate::provider::ImageProvider;
use crate::providers::{
    GeminiModel, GeminiProvider, OpenAiProvider, ReplicateProvider, StabilityProvider,
};
use crate::types::{GeneratedImage, GenerationRequest, ProviderKind};

/// Generates an image with the selected provider.
///
/// Applies each provider's default model when the request carries none
/// (Gemini: `gemini-3-pro-image-preview`, Replicate:
/// `black-forest-labs/flux-schnell`). Credentials are resolved from the
/// environment when the matching builder runs; an unknown provider name
/// never reaches this function because [`ProviderKind`] is a closed enum.
pub async fn dispatch(
    provider: ProviderKind,
    request: &GenerationRequest,
) -> Result<GeneratedImage> {
    tracing::info!(provider = %provider, prompt_len = request.prompt.len(), "dispatching generation");

    match provider {
        ProviderKind::OpenAi => {
            let provider = OpenAiProvider::builder().build()?;
            provider.generate(request).await
        }
        ProviderKind::Gemini => {
            let mut builder = GeminiProvider::builder();
            if let Some(ref model) = request.model {
                builder = builder.model(GeminiModel::resolve(model));
            }
            let provider = builder.build()?;
            provider.generate(request).await
        }
        ProviderKind::Stability => {
            let provider = StabilityProvider::builder().build()?;
            provider.generate(request).await
        }
        ProviderKind::Replicate => {
            let mut builder = ReplicateProvider::builder();
            if let Some(ref model) = request.model {
                builder = builder.model(model.clone());
            }
            let provider = builder.build()?;
            provider.generate(request).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ImggenError;

    #[test]
    fn test_unknown_provider_fails_before_dispatch() {
        // Provider names are parsed into the closed enum up front, so an
        // unknown name is rejected with zero credential lookups or HTTP.
        let err = "dalle-mini".parse::<ProviderKind>().unwrap_err();
        assert!(matches!(err, ImggenError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_missing_credential_fails_before_any_request() {
        // No mock server is running, so reaching the network would error
        // differently; Auth proves the builder failed first.
        std::env::remove_var("STABILITY_API_KEY");
        let err = dispatch(ProviderKind::Stability, &GenerationRequest::new("x"))
            .await
            .unwrap_err();
        match err {
            ImggenError::Auth(msg) => assert!(msg.contains("STABILITY_API_KEY")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
