//! HTTP utilities for the raw JSON endpoints
//!
//! Provides request/response handling shared by the image client.

use crate::llm::LlmError;
use reqwest::Client as HttpClient;
use serde_json::Value;
use std::time::Duration;

/// Longest error body echoed back in an `ApiError`
const MAX_ERROR_BODY: usize = 500;

/// Creates an HTTP client, optionally bounded by `timeout`.
///
/// With no timeout a slow endpoint is awaited until it answers or fails.
#[must_use]
pub fn create_http_client(timeout: Option<Duration>) -> HttpClient {
    let mut builder = HttpClient::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().unwrap_or_else(|_| HttpClient::new())
}

/// Sends an HTTP POST request with JSON body and returns parsed JSON response.
///
/// # Errors
///
/// Returns `LlmError::NetworkError` on connectivity issues, `LlmError::ApiError` on non-success status codes,
/// or `LlmError::JsonError` if parsing fails.
pub async fn send_json_request(
    client: &HttpClient,
    url: &str,
    body: &Value,
    auth_header: Option<&str>,
) -> Result<Value, LlmError> {
    let mut request = client.post(url).json(body);

    if let Some(auth) = auth_header {
        request = request.header("Authorization", auth);
    }

    let response = request
        .send()
        .await
        .map_err(|e| LlmError::NetworkError(e.to_string()))?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        return Err(LlmError::ApiError(clean_error_body(status, &error_text)));
    }

    response
        .json()
        .await
        .map_err(|e| LlmError::JsonError(e.to_string()))
}

/// Fetches `url` with a plain GET and returns the body bytes.
///
/// # Errors
///
/// Returns `LlmError::DownloadError` on connectivity issues or a non-success status.
pub async fn fetch_bytes(client: &HttpClient, url: &str) -> Result<Vec<u8>, LlmError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| LlmError::DownloadError(e.to_string()))?
        .error_for_status()
        .map_err(|e| LlmError::DownloadError(e.to_string()))?;

    let bytes = response
        .bytes()
        .await
        .map_err(|e| LlmError::DownloadError(e.to_string()))?;

    Ok(bytes.to_vec())
}

/// Formats an error body for inclusion in an error message.
///
/// HTML error pages from proxies are dropped and long bodies are truncated.
fn clean_error_body(status: reqwest::StatusCode, error_text: &str) -> String {
    let trimmed = error_text.trim_start();
    let is_html = trimmed.starts_with("<!DOCTYPE")
        || trimmed.starts_with("<html")
        || trimmed.starts_with("<HTML");

    if is_html {
        return format!("{status} (Server returned HTML error page)");
    }

    if error_text.chars().count() > MAX_ERROR_BODY {
        let truncated: String = error_text.chars().take(MAX_ERROR_BODY).collect();
        format!("{status} - {truncated}... (truncated)")
    } else {
        format!("{status} - {error_text}")
    }
}

/// Extracts a string from a JSON response by navigating a path.
///
/// # Example
/// ```ignore
/// let url = extract_string(&response, &["data", "0", "url"])?;
/// ```
///
/// # Errors
///
/// Returns `LlmError::InvalidResponse` if the path is missing or the target is not a string.
pub fn extract_string(response: &Value, path: &[&str]) -> Result<String, LlmError> {
    let mut current = response;

    for segment in path {
        if let Ok(index) = segment.parse::<usize>() {
            current = current.get(index).ok_or_else(|| {
                LlmError::InvalidResponse(format!("missing index {index}"))
            })?;
        } else {
            current = current.get(*segment).ok_or_else(|| {
                LlmError::InvalidResponse(format!("missing key {segment}"))
            })?;
        }
    }

    current
        .as_str()
        .map(ToString::to_string)
        .ok_or_else(|| LlmError::InvalidResponse(format!("expected string, got: {current}")))
}
