//! Completion and image generation clients
//!
//! Both endpoints sit behind small traits so that handlers can be exercised
//! with mocks and the concrete OpenAI-compatible clients can be swapped out.

mod http_utils;
/// Image generation over the OpenAI-compatible images API
pub mod images;
/// Chat completion over the OpenAI-compatible chat API
pub mod openai;

pub use images::OpenAiImageProvider;
pub use openai::OpenAiCompletionProvider;

use thiserror::Error;

/// Errors that can occur while calling an external model endpoint
#[derive(Debug, Error)]
pub enum LlmError {
    /// Error returned by the provider's API
    #[error("API error: {0}")]
    ApiError(String),
    /// Error during network communication
    #[error("Network error: {0}")]
    NetworkError(String),
    /// Error during JSON serialization or deserialization
    #[error("JSON error: {0}")]
    JsonError(String),
    /// Response decoded fine but lacks the expected fields
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    /// Fetching generated image bytes failed
    #[error("Download error: {0}")]
    DownloadError(String),
    /// Any other unexpected error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Single-turn text completion
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Send `prompt` as the only user message and return the generated text
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Image synthesis plus retrieval of the produced image
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ImageProvider: Send + Sync {
    /// Request exactly one image for `prompt` and return its URL
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;

    /// Fetch the raw bytes behind an image URL
    async fn download(&self, url: &str) -> Result<Vec<u8>, LlmError>;
}
