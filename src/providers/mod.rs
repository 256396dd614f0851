//! Image generation providers.

mod gemini;
mod openai;
mod replicate;
mod stability;

pub use gemini::{GeminiModel, GeminiProvider, GeminiProviderBuilder};
pub use openai::{OpenAiProvider, OpenAiProviderBuilder};
pub use replicate::{ReplicateProvider, ReplicateProviderBuilder};
pub use stability::{StabilityProvider, StabilityProviderBuilder};
