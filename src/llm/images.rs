use super::http_utils::{create_http_client, extract_string, fetch_bytes, send_json_request};
use crate::config::Settings;
use crate::llm::{ImageProvider, LlmError};
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde_json::{json, Value};
use tracing::{debug, error};

/// Image provider for the OpenAI-compatible `/images/generations` endpoint.
///
/// The response is parsed as raw JSON so that a body without `data[0].url`
/// surfaces as [`LlmError::InvalidResponse`] instead of a decode failure.
pub struct OpenAiImageProvider {
    http_client: HttpClient,
    api_key: String,
    api_base: String,
    size: String,
}

impl OpenAiImageProvider {
    /// Create a provider from settings
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        Self {
            http_client: create_http_client(settings.http_timeout()),
            api_key: settings.openai_api_key.clone(),
            api_base: settings.openai_api_base.trim_end_matches('/').to_string(),
            size: settings.image_size.clone(),
        }
    }

    fn generations_url(&self) -> String {
        format!("{}/images/generations", self.api_base)
    }
}

/// Request body asking for exactly one image
#[must_use]
pub fn build_image_request(prompt: &str, size: &str) -> Value {
    json!({
        "prompt": prompt,
        "n": 1,
        "size": size,
    })
}

#[async_trait]
impl ImageProvider for OpenAiImageProvider {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let body = build_image_request(prompt, &self.size);
        let auth = format!("Bearer {}", self.api_key);

        let response = send_json_request(
            &self.http_client,
            &self.generations_url(),
            &body,
            Some(&auth),
        )
        .await?;
        debug!("Image response: {response}");

        let url = extract_string(&response, &["data", "0", "url"]).inspect_err(|_| {
            error!("Invalid image response: {response}");
        })?;
        debug!("Image URL: {url}");
        Ok(url)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, LlmError> {
        let bytes = fetch_bytes(&self.http_client, url).await?;
        debug!(size = bytes.len(), "Fetched generated image");
        Ok(bytes)
    }
}
