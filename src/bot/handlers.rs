use crate::bot::router::Route;
use crate::bot::transport::ReplySender;
use crate::config::Settings;
use crate::llm::{CompletionProvider, ImageProvider, LlmError};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use teloxide::types::{ChatId, Message};
use tracing::{debug, error};

/// Reply to `/start`
pub const START_TEXT: &str =
    "Hi! I am a anarcodes_ai. Ask me anything or use /generate to create an image!";
/// Reply to `/help`
pub const HELP_TEXT: &str =
    "You can ask me anything, and I will try my best to answer! Use /generate <description> to create an image.";
/// Reply when the completion call fails
pub const CHAT_FAILED_TEXT: &str = "Sorry, there was an error processing your request.";
/// Reply to `/generate` without a prompt
pub const GENERATE_USAGE_TEXT: &str = "Please provide a description for the image.";
/// Standalone notice sent before the image request
pub const GENERATE_PLACEHOLDER_TEXT: &str = "Please wait, generating picture...";
/// Caption on the generated photo
pub const GENERATE_CAPTION: &str = "Here is your generated image!";
/// Prefix of every image failure reply
pub const GENERATE_FAILED_TEXT: &str = "Sorry, there was an error generating the image";

/// A single text message from a chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    /// Conversation the reply goes to
    pub chat_id: ChatId,
    /// Message text as sent
    pub text: String,
}

impl InboundEvent {
    /// Extract the event from a Telegram message. Non-text messages yield `None`.
    #[must_use]
    pub fn from_message(msg: &Message) -> Option<Self> {
        msg.text().map(|text| Self {
            chat_id: msg.chat.id,
            text: text.to_string(),
        })
    }
}

/// Collaborators shared by all handlers
#[derive(Clone)]
pub struct HandlerContext {
    /// Completion endpoint for free text
    pub completion: Arc<dyn CompletionProvider>,
    /// Image endpoint for `/generate`
    pub images: Arc<dyn ImageProvider>,
    /// Outbound replies
    pub sender: Arc<dyn ReplySender>,
    /// Pause before each image request
    pub image_delay: Duration,
    /// This bot's username, used to recognise `/cmd@name`
    pub bot_username: String,
}

impl HandlerContext {
    /// Bundle the collaborators, taking the image pause from settings
    #[must_use]
    pub fn new(
        settings: &Settings,
        bot_username: String,
        completion: Arc<dyn CompletionProvider>,
        images: Arc<dyn ImageProvider>,
        sender: Arc<dyn ReplySender>,
    ) -> Self {
        Self {
            completion,
            images,
            sender,
            image_delay: settings.image_request_delay(),
            bot_username,
        }
    }
}

/// Route one inbound event and send exactly one final reply.
///
/// Provider failures are turned into replies here; only a failure to deliver
/// that reply is returned. Commands addressed to another bot are skipped
/// without a reply.
///
/// # Errors
///
/// Returns an error if the reply cannot be sent.
pub async fn handle_event(ctx: &HandlerContext, event: &InboundEvent) -> Result<()> {
    let Some(route) = Route::parse(&event.text, &ctx.bot_username) else {
        debug!(chat_id = event.chat_id.0, "Skipping command addressed to another bot");
        return Ok(());
    };
    debug!(chat_id = event.chat_id.0, route = route.name(), "Routing inbound message");

    match route {
        Route::Start => start(ctx, event.chat_id).await,
        Route::Help => help(ctx, event.chat_id).await,
        Route::Generate { prompt } => generate_image(ctx, event.chat_id, &prompt).await,
        Route::Chat { text } => handle_message(ctx, event.chat_id, &text).await,
    }
}

/// `/start` handler
///
/// # Errors
///
/// Returns an error if the greeting cannot be sent.
pub async fn start(ctx: &HandlerContext, chat_id: ChatId) -> Result<()> {
    debug!("Start command received");
    ctx.sender.send_text(chat_id, START_TEXT).await
}

/// `/help` handler
///
/// # Errors
///
/// Returns an error if the help text cannot be sent.
pub async fn help(ctx: &HandlerContext, chat_id: ChatId) -> Result<()> {
    debug!("Help command received");
    ctx.sender.send_text(chat_id, HELP_TEXT).await
}

/// Free-text handler: one completion call, reply with its trimmed output.
///
/// # Errors
///
/// Returns an error if the reply cannot be sent.
pub async fn handle_message(ctx: &HandlerContext, chat_id: ChatId, text: &str) -> Result<()> {
    debug!("Message received: {text}");

    match ctx.completion.complete(text).await {
        Ok(reply) => ctx.sender.send_text(chat_id, reply.trim()).await,
        Err(e) => {
            error!("Error in handle_message: {e}");
            ctx.sender.send_text(chat_id, CHAT_FAILED_TEXT).await
        }
    }
}

/// `/generate` handler.
///
/// An empty prompt is answered locally. Otherwise, after the configured pause,
/// a placeholder is sent, one image is requested and downloaded, and the bytes
/// go back as a photo. Any failure along the way becomes a single error reply.
///
/// # Errors
///
/// Returns an error if the final reply cannot be sent.
pub async fn generate_image(ctx: &HandlerContext, chat_id: ChatId, prompt: &str) -> Result<()> {
    debug!("Generate command received with prompt: {prompt:?}");

    if prompt.is_empty() {
        return ctx.sender.send_text(chat_id, GENERATE_USAGE_TEXT).await;
    }

    tokio::time::sleep(ctx.image_delay).await;

    match run_image_pipeline(ctx, chat_id, prompt).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Error in generate_image: {e}");
            ctx.sender.send_text(chat_id, &image_error_reply(&e)).await
        }
    }
}

async fn run_image_pipeline(ctx: &HandlerContext, chat_id: ChatId, prompt: &str) -> Result<()> {
    ctx.sender
        .send_text(chat_id, GENERATE_PLACEHOLDER_TEXT)
        .await?;

    let url = ctx.images.generate(prompt).await?;
    let bytes = ctx.images.download(&url).await?;

    ctx.sender.send_photo(chat_id, bytes, GENERATE_CAPTION).await
}

/// User-facing text for an image failure.
///
/// A malformed provider response gets the generic text; every other failure
/// carries its description.
#[must_use]
pub fn image_error_reply(err: &anyhow::Error) -> String {
    match err.downcast_ref::<LlmError>() {
        Some(LlmError::InvalidResponse(_)) => format!("{GENERATE_FAILED_TEXT}."),
        _ => format!("{GENERATE_FAILED_TEXT}: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::transport::MockReplySender;
    use crate::llm::{MockCompletionProvider, MockImageProvider};
    use anyhow::anyhow;
    use mockall::Sequence;
    use std::sync::Mutex;
    use tokio::time::Instant;

    const CHAT: ChatId = ChatId(4242);

    fn context(
        completion: MockCompletionProvider,
        images: MockImageProvider,
        sender: MockReplySender,
    ) -> HandlerContext {
        HandlerContext {
            completion: Arc::new(completion),
            images: Arc::new(images),
            sender: Arc::new(sender),
            image_delay: Duration::ZERO,
            bot_username: "relay_bot".to_string(),
        }
    }

    fn no_completion() -> MockCompletionProvider {
        let mut completion = MockCompletionProvider::new();
        completion.expect_complete().never();
        completion
    }

    fn no_images() -> MockImageProvider {
        let mut images = MockImageProvider::new();
        images.expect_generate().never();
        images.expect_download().never();
        images
    }

    fn event(text: &str) -> InboundEvent {
        InboundEvent {
            chat_id: CHAT,
            text: text.to_string(),
        }
    }

    fn expect_single_text(sender: &mut MockReplySender, expected: &'static str) {
        sender
            .expect_send_text()
            .withf(move |chat, text| *chat == CHAT && text == expected)
            .times(1)
            .returning(|_, _| Ok(()));
    }

    #[tokio::test]
    async fn test_start_and_help_are_static() -> Result<()> {
        for (input, expected) in [
            ("/start", START_TEXT),
            ("/start with trailing args", START_TEXT),
            ("/help", HELP_TEXT),
            ("/help /generate cat", HELP_TEXT),
            ("/Start", START_TEXT),
            ("/HELP@relay_bot", HELP_TEXT),
        ] {
            let mut sender = MockReplySender::new();
            expect_single_text(&mut sender, expected);
            sender.expect_send_photo().never();

            let ctx = context(no_completion(), no_images(), sender);
            handle_event(&ctx, &event(input)).await?;
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_free_text_relays_trimmed_completion() -> Result<()> {
        let mut completion = MockCompletionProvider::new();
        completion
            .expect_complete()
            .withf(|prompt| prompt == "What is Rust?")
            .times(1)
            .returning(|_| Ok("  A systems language.\n".to_string()));

        let mut sender = MockReplySender::new();
        expect_single_text(&mut sender, "A systems language.");

        let ctx = context(completion, no_images(), sender);
        handle_event(&ctx, &event("What is Rust?")).await
    }

    #[tokio::test]
    async fn test_unknown_command_goes_to_completion() -> Result<()> {
        let mut completion = MockCompletionProvider::new();
        completion
            .expect_complete()
            .withf(|prompt| prompt == "/weather Paris")
            .times(1)
            .returning(|_| Ok("Sunny".to_string()));

        let mut sender = MockReplySender::new();
        expect_single_text(&mut sender, "Sunny");

        let ctx = context(completion, no_images(), sender);
        handle_event(&ctx, &event("/weather Paris")).await
    }

    #[tokio::test]
    async fn test_completion_failure_is_generic() -> Result<()> {
        let mut completion = MockCompletionProvider::new();
        completion
            .expect_complete()
            .times(1)
            .returning(|_| Err(LlmError::ApiError("context_length_exceeded".to_string())));

        let mut sender = MockReplySender::new();
        expect_single_text(&mut sender, CHAT_FAILED_TEXT);

        let ctx = context(completion, no_images(), sender);
        handle_event(&ctx, &event("a very long question")).await
    }

    #[tokio::test]
    async fn test_generate_without_prompt_makes_no_call() -> Result<()> {
        for input in ["/generate", "/generate   "] {
            let mut sender = MockReplySender::new();
            expect_single_text(&mut sender, GENERATE_USAGE_TEXT);
            sender.expect_send_photo().never();

            let ctx = context(no_completion(), no_images(), sender);
            handle_event(&ctx, &event(input)).await?;
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_generate_sends_placeholder_then_photo() -> Result<()> {
        let mut seq = Sequence::new();
        let mut sender = MockReplySender::new();
        let mut images = MockImageProvider::new();

        sender
            .expect_send_text()
            .withf(|chat, text| *chat == CHAT && text == GENERATE_PLACEHOLDER_TEXT)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        images
            .expect_generate()
            .withf(|prompt| prompt == "panda wearing a hat")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok("https://img.example/panda.png".to_string()));
        images
            .expect_download()
            .withf(|url| url == "https://img.example/panda.png")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec![0x89, b'P', b'N', b'G']));
        sender
            .expect_send_photo()
            .withf(|chat, bytes, caption| {
                *chat == CHAT && bytes == &[0x89, b'P', b'N', b'G'] && caption == GENERATE_CAPTION
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));

        let ctx = context(no_completion(), images, sender);
        handle_event(&ctx, &event("/generate panda wearing a hat")).await
    }

    #[tokio::test]
    async fn test_generate_invalid_response_skips_download() -> Result<()> {
        let mut images = MockImageProvider::new();
        images
            .expect_generate()
            .times(1)
            .returning(|_| Err(LlmError::InvalidResponse("missing key data".to_string())));
        images.expect_download().never();

        let mut sender = MockReplySender::new();
        expect_single_text(&mut sender, GENERATE_PLACEHOLDER_TEXT);
        expect_single_text(&mut sender, "Sorry, there was an error generating the image.");
        sender.expect_send_photo().never();

        let ctx = context(no_completion(), images, sender);
        handle_event(&ctx, &event("/generate a cat")).await
    }

    #[tokio::test]
    async fn test_generate_download_failure_reports_detail() -> Result<()> {
        let mut images = MockImageProvider::new();
        images
            .expect_generate()
            .times(1)
            .returning(|_| Ok("https://img.example/gone.png".to_string()));
        images.expect_download().times(1).returning(|_| {
            Err(LlmError::DownloadError(
                "HTTP status client error (404 Not Found)".to_string(),
            ))
        });

        let mut sender = MockReplySender::new();
        expect_single_text(&mut sender, GENERATE_PLACEHOLDER_TEXT);
        sender
            .expect_send_text()
            .withf(|chat, text| {
                *chat == CHAT && text.starts_with(GENERATE_FAILED_TEXT) && text.contains("404")
            })
            .times(1)
            .returning(|_, _| Ok(()));
        sender.expect_send_photo().never();

        let ctx = context(no_completion(), images, sender);
        handle_event(&ctx, &event("/generate a cat")).await
    }

    #[tokio::test]
    async fn test_generate_placeholder_failure_is_reported() -> Result<()> {
        let mut sender = MockReplySender::new();
        sender
            .expect_send_text()
            .withf(|_, text| text == GENERATE_PLACEHOLDER_TEXT)
            .times(1)
            .returning(|_, _| Err(anyhow!("Bad Request: chat not found")));
        sender
            .expect_send_text()
            .withf(|_, text| text.starts_with(GENERATE_FAILED_TEXT))
            .times(1)
            .returning(|_, _| Ok(()));

        let ctx = context(no_completion(), no_images(), sender);
        handle_event(&ctx, &event("/generate a cat")).await
    }

    #[tokio::test]
    async fn test_reply_delivery_failure_propagates() {
        let mut sender = MockReplySender::new();
        sender
            .expect_send_text()
            .times(1)
            .returning(|_, _| Err(anyhow!("Forbidden: bot was blocked by the user")));

        let ctx = context(no_completion(), no_images(), sender);
        assert!(handle_event(&ctx, &event("/start")).await.is_err());
    }

    #[test]
    fn test_image_error_reply_variants() {
        let invalid = anyhow::Error::new(LlmError::InvalidResponse("x".to_string()));
        assert_eq!(
            image_error_reply(&invalid),
            "Sorry, there was an error generating the image."
        );

        let api = anyhow::Error::new(LlmError::ApiError("401 Unauthorized".to_string()));
        assert_eq!(
            image_error_reply(&api),
            "Sorry, there was an error generating the image: API error: 401 Unauthorized"
        );
    }

    #[tokio::test]
    async fn test_command_for_other_bot_is_skipped() -> Result<()> {
        let mut sender = MockReplySender::new();
        sender.expect_send_text().never();
        sender.expect_send_photo().never();

        let ctx = context(no_completion(), no_images(), sender);
        handle_event(&ctx, &event("/generate@some_other_bot a cat")).await?;
        handle_event(&ctx, &event("/start@some_other_bot")).await
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_waits_before_placeholder() -> Result<()> {
        let placeholder_at = Arc::new(Mutex::new(None));
        let recorded = placeholder_at.clone();

        let mut sender = MockReplySender::new();
        sender
            .expect_send_text()
            .withf(|_, text| text == GENERATE_PLACEHOLDER_TEXT)
            .times(1)
            .returning(move |_, _| {
                if let Ok(mut at) = recorded.lock() {
                    *at = Some(Instant::now());
                }
                Ok(())
            });
        sender
            .expect_send_text()
            .withf(|_, text| text.starts_with(GENERATE_FAILED_TEXT))
            .times(1)
            .returning(|_, _| Ok(()));

        let mut images = MockImageProvider::new();
        images
            .expect_generate()
            .times(1)
            .returning(|_| Err(LlmError::InvalidResponse("missing key data".to_string())));
        images.expect_download().never();

        let mut ctx = context(no_completion(), images, sender);
        ctx.image_delay = Duration::from_secs(2);

        let started = Instant::now();
        handle_event(&ctx, &event("/generate a cat")).await?;

        let sent_at = *placeholder_at
            .lock()
            .map_err(|e| anyhow!("poisoned: {e}"))?;
        let sent_at = sent_at.ok_or_else(|| anyhow!("placeholder not sent"))?;
        assert!(sent_at.duration_since(started) >= Duration::from_secs(2));
        Ok(())
    }

    fn message_from_json(value: serde_json::Value) -> Message {
        serde_json::from_value(value).expect("valid telegram message")
    }

    #[test]
    fn test_inbound_event_from_text_message() {
        let msg = message_from_json(serde_json::json!({
            "message_id": 7,
            "date": 1_700_000_000,
            "chat": {"id": 4242, "type": "private", "first_name": "Ada"},
            "text": "/generate a cat"
        }));

        assert_eq!(InboundEvent::from_message(&msg), Some(event("/generate a cat")));
    }

    #[test]
    fn test_non_text_message_yields_no_event() {
        let msg = message_from_json(serde_json::json!({
            "message_id": 8,
            "date": 1_700_000_000,
            "chat": {"id": 4242, "type": "private", "first_name": "Ada"},
            "photo": [{
                "file_id": "AgACAgIAAxkBAAIB",
                "file_unique_id": "AQADx",
                "width": 90,
                "height": 90,
                "file_size": 1024
            }]
        }));

        assert_eq!(InboundEvent::from_message(&msg), None);
    }
}
