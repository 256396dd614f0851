//! Error types for image generation.

use std::time::Duration;

/// Errors that can occur during image generation.
#[derive(Debug, thiserror::Error)]
pub enum ImggenError {
    /// API key missing or rejected. The message names the env var when the
    /// credential was never provided.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// API returned a non-2xx response.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, sanitized.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Delay suggested by the server's Retry-After header, if any.
        retry_after: Option<Duration>,
    },

    /// Polling exceeded the configured deadline (Replicate).
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// Download URL expired before the image could be fetched.
    #[error("download URL expired")]
    UrlExpired,

    /// Content was blocked by the provider's safety filters.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// Invalid request parameters (malformed size, unknown provider name).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Response parsed but carried no usable image, or a remote job
    /// finished in a failed state.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to decode base64 data.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// I/O error (e.g. saving the image).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for image generation operations.
pub type Result<T> = std::result::Result<T, ImggenError>;

const MAX_ERROR_LEN: usize = 2000;

/// Trims and truncates an upstream error body so it is safe to surface.
pub(crate) fn sanitize_error_message(text: &str) -> String {
    let text = text.trim();
    if text.len() <= MAX_ERROR_LEN {
        return text.to_string();
    }
    let mut end = MAX_ERROR_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

/// Parses a Retry-After header value in seconds, if present.
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ImggenError::Api {
            status: 404,
            message: "Not found".into(),
        };
        assert_eq!(err.to_string(), "API error: 404 - Not found");

        let err = ImggenError::Auth("OPENAI_API_KEY not set".into());
        assert_eq!(
            err.to_string(),
            "authentication failed: OPENAI_API_KEY not set"
        );

        let err = ImggenError::UnexpectedResponse("No image data".into());
        assert_eq!(err.to_string(), "unexpected response: No image data");
    }

    #[test]
    fn test_sanitize_short_message() {
        assert_eq!(sanitize_error_message("  oops \n"), "oops");
    }

    #[test]
    fn test_sanitize_truncates_long_message() {
        let long = "x".repeat(5000);
        let sanitized = sanitize_error_message(&long);
        assert!(sanitized.len() <= MAX_ERROR_LEN + 3);
        assert!(sanitized.ends_with("..."));
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(reqwest::header::RETRY_AFTER, "30".parse().unwrap());
        assert_eq!(parse_retry_after(&headers), Some(30));

        let empty = reqwest::header::HeaderMap::new();
        assert_eq!(parse_retry_after(&empty), None);
    }
}
