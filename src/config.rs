//! Configuration and settings management
//!
//! Loads settings from config files and environment variables and defines defaults.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default OpenAI-compatible API base URL
pub const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
/// Default model for free-text completions
pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";
/// Default completion output bound
pub const DEFAULT_CHAT_MAX_TOKENS: u32 = 150;
/// Default size of generated images
pub const DEFAULT_IMAGE_SIZE: &str = "512x512";
/// Pause before a `/generate` request is sent
pub const DEFAULT_IMAGE_REQUEST_DELAY_MS: u64 = 2000;

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    #[serde(default)]
    pub telegram_token: String,

    /// API key for the completion and image provider
    pub openai_api_key: String,
    /// Base URL of the OpenAI-compatible API
    #[serde(default = "default_openai_api_base")]
    pub openai_api_base: String,

    /// Model used for free-text completions
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    /// Maximum output tokens for a completion
    #[serde(default = "default_chat_max_tokens")]
    pub chat_max_tokens: u32,

    /// Requested image resolution, e.g. `512x512`
    #[serde(default = "default_image_size")]
    pub image_size: String,
    /// Pause in milliseconds before an image request is issued
    #[serde(default = "default_image_request_delay_ms")]
    pub image_request_delay_ms: u64,

    /// Optional timeout for outbound HTTP calls. Unset means no timeout.
    pub http_timeout_secs: Option<u64>,
}

fn default_openai_api_base() -> String {
    DEFAULT_OPENAI_API_BASE.to_string()
}

fn default_chat_model() -> String {
    DEFAULT_CHAT_MODEL.to_string()
}

const fn default_chat_max_tokens() -> u32 {
    DEFAULT_CHAT_MAX_TOKENS
}

fn default_image_size() -> String {
    DEFAULT_IMAGE_SIZE.to_string()
}

const fn default_image_request_delay_ms() -> u64 {
    DEFAULT_IMAGE_REQUEST_DELAY_MS
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use chat_relay_bot::config::Settings;
    ///
    /// let settings = Settings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or the Telegram token is missing.
    pub fn new() -> Result<Self, ConfigError> {
        let mut settings: Self = build_config()?.try_deserialize()?;

        // `TELEGRAM_BOT_TOKEN` is accepted as an alias
        if settings.telegram_token.is_empty() {
            if let Ok(val) = std::env::var("TELEGRAM_BOT_TOKEN") {
                if !val.is_empty() {
                    settings.telegram_token = val;
                }
            }
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Checks that the required credentials are present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` naming the first missing key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram_token.trim().is_empty() {
            return Err(ConfigError::NotFound("telegram_token".to_string()));
        }
        if self.openai_api_key.trim().is_empty() {
            return Err(ConfigError::NotFound("openai_api_key".to_string()));
        }
        Ok(())
    }

    /// Pause applied before each image request
    #[must_use]
    pub const fn image_request_delay(&self) -> Duration {
        Duration::from_millis(self.image_request_delay_ms)
    }

    /// Timeout for outbound HTTP calls, if configured
    #[must_use]
    pub fn http_timeout(&self) -> Option<Duration> {
        self.http_timeout_secs.map(Duration::from_secs)
    }
}

/// Builds the layered configuration source.
///
/// # Errors
///
/// Returns a `ConfigError` if any source fails to load.
pub fn build_config() -> Result<Config, ConfigError> {
    let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

    Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
        // Not checked into git
        .add_source(File::with_name("config/local").required(false))
        // Eg.. `APP__CHAT_MODEL=gpt-4o ./target/app`
        .add_source(Environment::with_prefix("APP").separator("__"))
        // UPPER_SNAKE_CASE env vars map to snake_case keys, empty values count as unset
        .add_source(Environment::default().ignore_empty(true))
        .build()
}
