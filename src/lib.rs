#![warn(missing_docs)]
//! imggen - generate images from text prompts via multiple AI providers.
//!
//! Dispatches a prompt to OpenAI (DALL-E 3), Google Gemini, Stability AI, or
//! Replicate, normalizes each provider's request/response contract, and hands
//! back the raw image bytes ready to save.
//!
//! # Quick Start
//!
//! ```no_run
//! use imggen::{dispatch, GenerationRequest, ProviderKind};
//!
//! #[tokio::main]
//! async fn main() -> imggen::Result<()> {
//!     let request = GenerationRequest::new("A sunset over mountains").with_size(512, 512);
//!     let image = dispatch(ProviderKind::OpenAi, &request).await?;
//!     let path = image.save("sunset.png")?;
//!     println!("saved to {}", path.display());
//!     Ok(())
//! }
//! ```
//!
//! Credentials come from the environment: `OPENAI_API_KEY`, `GOOGLE_API_KEY`,
//! `STABILITY_API_KEY`, `REPLICATE_API_TOKEN` - each read only when its
//! provider is selected. Providers can also be driven directly through their
//! builders for explicit keys, custom endpoints, or poll tuning.

mod dispatch;
mod error;
mod provider;
pub mod providers;
mod types;

pub use dispatch::dispatch;
pub use error::{ImggenError, Result};
pub use provider::ImageProvider;
pub use types::{
    parse_size, GeneratedImage, GenerationMetadata, GenerationRequest, ImageFormat, ProviderKind,
    Quality,
};
