use crate::config::Settings;
use crate::llm::{CompletionProvider, LlmError};
use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
        CreateChatCompletionResponse,
    },
    Client,
};
use async_trait::async_trait;
use tracing::debug;

/// Completion provider for OpenAI-compatible chat APIs
pub struct OpenAiCompletionProvider {
    client: Client<OpenAIConfig>,
    model_id: String,
    max_tokens: u32,
}

impl OpenAiCompletionProvider {
    /// Create a provider from settings
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(settings.openai_api_key.clone())
            .with_api_base(settings.openai_api_base.clone());
        let http_client = super::http_utils::create_http_client(settings.http_timeout());

        Self {
            client: Client::with_config(config).with_http_client(http_client),
            model_id: settings.chat_model.clone(),
            max_tokens: settings.chat_max_tokens,
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompletionProvider {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let request = build_request(&self.model_id, prompt, self.max_tokens)?;
        debug!(model = %self.model_id, max_tokens = self.max_tokens, "Sending chat completion");

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| LlmError::ApiError(e.to_string()))?;

        extract_reply(&response)
    }
}

/// Build a single-message completion request
///
/// # Errors
///
/// Returns `LlmError::Unknown` if the request builder rejects the input.
fn build_request(
    model_id: &str,
    prompt: &str,
    max_tokens: u32,
) -> Result<CreateChatCompletionRequest, LlmError> {
    let message: ChatCompletionRequestMessage = ChatCompletionRequestUserMessageArgs::default()
        .content(prompt)
        .build()
        .map_err(|e| LlmError::Unknown(e.to_string()))?
        .into();

    CreateChatCompletionRequestArgs::default()
        .model(model_id)
        .messages(vec![message])
        .max_tokens(max_tokens)
        .build()
        .map_err(|e| LlmError::Unknown(e.to_string()))
}

/// Take the first choice's content, trimmed
///
/// # Errors
///
/// Returns `LlmError::ApiError` if the response has no content or only whitespace.
fn extract_reply(response: &CreateChatCompletionResponse) -> Result<String, LlmError> {
    response
        .choices
        .first()
        .and_then(|c| c.message.content.as_deref())
        .map(str::trim)
        .filter(|content| !content.is_empty())
        .map(ToString::to_string)
        .ok_or_else(|| LlmError::ApiError("Empty response".to_string()))
}
