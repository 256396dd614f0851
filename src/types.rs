//! Core types for image generation.

use crate::error::{ImggenError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG format (lossless).
    #[default]
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format (modern, efficient).
    WebP,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 12 {
            return None;
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        None
    }
}

/// Image provider kind. The closed set of supported backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI (DALL-E 3).
    OpenAi,
    /// Google Gemini image models.
    Gemini,
    /// Stability AI (Stable Image Core).
    Stability,
    /// Replicate (Flux and other hosted models).
    Replicate,
}

impl ProviderKind {
    /// Returns the env var holding this provider's credential.
    pub fn credential_var(&self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Gemini => "GOOGLE_API_KEY",
            Self::Stability => "STABILITY_API_KEY",
            Self::Replicate => "REPLICATE_API_TOKEN",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::Gemini => write!(f, "gemini"),
            Self::Stability => write!(f, "stability"),
            Self::Replicate => write!(f, "replicate"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = ImggenError;

    /// Parses a provider name. Anything outside the closed set fails here,
    /// before any credential lookup or network call.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "openai" => Ok(Self::OpenAi),
            "gemini" => Ok(Self::Gemini),
            "stability" => Ok(Self::Stability),
            "replicate" => Ok(Self::Replicate),
            other => Err(ImggenError::InvalidRequest(format!(
                "unknown provider: {other} (expected openai, gemini, stability, or replicate)"
            ))),
        }
    }
}

/// Image quality setting, as understood by DALL-E 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// Standard quality (default).
    #[default]
    Standard,
    /// High definition.
    Hd,
}

impl Quality {
    /// Returns the API quality identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Hd => "hd",
        }
    }
}

/// Parses a "WxH" size string into (width, height).
pub fn parse_size(size: &str) -> Result<(u32, u32)> {
    let (w, h) = size
        .split_once(['x', 'X'])
        .ok_or_else(|| ImggenError::InvalidRequest(format!("invalid size: {size} (expected WxH)")))?;
    let width = w
        .trim()
        .parse()
        .map_err(|_| ImggenError::InvalidRequest(format!("invalid width in size: {size}")))?;
    let height = h
        .trim()
        .parse()
        .map_err(|_| ImggenError::InvalidRequest(format!("invalid height in size: {size}")))?;
    Ok((width, height))
}

/// Metadata about the generation process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationMetadata {
    /// Model used for generation.
    pub model: Option<String>,
    /// Generation duration in milliseconds.
    pub duration_ms: Option<u64>,
}

/// A request to generate an image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The text prompt describing the desired image.
    pub prompt: String,
    /// Desired width in pixels.
    pub width: u32,
    /// Desired height in pixels.
    pub height: u32,
    /// Image quality (OpenAI only).
    pub quality: Quality,
    /// Provider-specific model override. When absent, the dispatcher applies
    /// each provider's default.
    pub model: Option<String>,
}

impl GenerationRequest {
    /// Creates a new request with the given prompt and default 1024x1024 size.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            width: 1024,
            height: 1024,
            quality: Quality::default(),
            model: None,
        }
    }

    /// Sets the desired dimensions.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Sets the quality.
    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    /// Sets the model override.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Returns the size as the "WxH" string the APIs expect.
    pub fn size_string(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// A generated image with its data and metadata.
#[derive(Debug, Clone)]
#[must_use = "generated image should be saved or processed"]
pub struct GeneratedImage {
    /// Raw image bytes, exactly as decoded from the provider.
    pub data: Vec<u8>,
    /// Image format.
    pub format: ImageFormat,
    /// Provider that generated this image.
    pub provider: ProviderKind,
    /// Generation metadata.
    pub metadata: GenerationMetadata,
}

impl GeneratedImage {
    /// Creates a new generated image.
    pub fn new(
        data: Vec<u8>,
        format: ImageFormat,
        provider: ProviderKind,
        metadata: GenerationMetadata,
    ) -> Self {
        Self {
            data,
            format,
            provider,
            metadata,
        }
    }

    /// Returns the size of the image data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Saves the image to the specified path, creating any missing parent
    /// directories and overwriting an existing file. Returns the absolute
    /// resolved path.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, &self.data)?;
        Ok(path.canonicalize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 12] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const JPEG_MAGIC: [u8; 12] = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0, 0, 0, 0, 0];
    const WEBP_MAGIC: [u8; 12] = *b"RIFF\x00\x00\x00\x00WEBP";

    #[test]
    fn test_format_from_magic_bytes() {
        assert_eq!(
            ImageFormat::from_magic_bytes(&PNG_MAGIC),
            Some(ImageFormat::Png)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&JPEG_MAGIC),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&WEBP_MAGIC),
            Some(ImageFormat::WebP)
        );
        assert_eq!(ImageFormat::from_magic_bytes(b"hello"), None);
    }

    #[test]
    fn test_provider_kind_round_trip() {
        for name in ["openai", "gemini", "stability", "replicate"] {
            let kind: ProviderKind = name.parse().unwrap();
            assert_eq!(kind.to_string(), name);
        }
    }

    #[test]
    fn test_provider_kind_unknown() {
        let err = "midjourney".parse::<ProviderKind>().unwrap_err();
        assert!(matches!(err, ImggenError::InvalidRequest(_)));
        assert!(err.to_string().contains("midjourney"));
    }

    #[test]
    fn test_provider_credential_vars() {
        assert_eq!(ProviderKind::OpenAi.credential_var(), "OPENAI_API_KEY");
        assert_eq!(ProviderKind::Gemini.credential_var(), "GOOGLE_API_KEY");
        assert_eq!(
            ProviderKind::Stability.credential_var(),
            "STABILITY_API_KEY"
        );
        assert_eq!(
            ProviderKind::Replicate.credential_var(),
            "REPLICATE_API_TOKEN"
        );
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("1024x1024").unwrap(), (1024, 1024));
        assert_eq!(parse_size("512x768").unwrap(), (512, 768));
        assert!(parse_size("1024").is_err());
        assert!(parse_size("ax b").is_err());
        assert!(parse_size("1024x").is_err());
    }

    #[test]
    fn test_quality_as_str() {
        assert_eq!(Quality::Standard.as_str(), "standard");
        assert_eq!(Quality::Hd.as_str(), "hd");
    }

    #[test]
    fn test_request_defaults() {
        let req = GenerationRequest::new("A sunset");
        assert_eq!(req.size_string(), "1024x1024");
        assert_eq!(req.quality, Quality::Standard);
        assert!(req.model.is_none());
    }

    #[test]
    fn test_save_creates_nested_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/c/out.png");
        let image = GeneratedImage::new(
            b"hello".to_vec(),
            ImageFormat::Png,
            ProviderKind::OpenAi,
            GenerationMetadata::default(),
        );

        let saved = image.save(&path).unwrap();
        assert!(saved.is_absolute());
        assert_eq!(std::fs::read(&saved).unwrap(), b"hello");
    }

    #[test]
    fn test_save_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        std::fs::write(&path, b"old contents").unwrap();

        let image = GeneratedImage::new(
            b"new".to_vec(),
            ImageFormat::Png,
            ProviderKind::Stability,
            GenerationMetadata::default(),
        );
        image.save(&path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"new");
    }
}
