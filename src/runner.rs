use crate::bot::router::Route;
use crate::bot::{handlers, HandlerContext, InboundEvent, TelegramReplySender};
use crate::config::Settings;
use crate::llm::{OpenAiCompletionProvider, OpenAiImageProvider};
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use tracing::{error, info, warn};

/// Run the Telegram long-polling loop until Ctrl-C.
pub async fn run_bot(settings: Arc<Settings>) {
    let bot = Bot::new(settings.telegram_token.clone());
    let bot_username = init_bot_username(&bot).await;
    let context = Arc::new(init_context(&settings, bot.clone(), bot_username));
    info!(
        "Clients initialized (chat model: {}, image size: {}).",
        settings.chat_model, settings.image_size
    );

    register_commands(&bot).await;

    let handler = setup_handler();

    info!("Bot is running...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![context])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn init_bot_username(bot: &Bot) -> String {
    match bot.get_me().await {
        Ok(me) => {
            let username = me.user.username.clone().unwrap_or_default();
            info!("Authorized as @{username}.");
            username
        }
        Err(e) => {
            error!("Failed to fetch bot identity: {e}");
            std::process::exit(1);
        }
    }
}

fn init_context(settings: &Settings, bot: Bot, bot_username: String) -> HandlerContext {
    HandlerContext::new(
        settings,
        bot_username,
        Arc::new(OpenAiCompletionProvider::new(settings)),
        Arc::new(OpenAiImageProvider::new(settings)),
        Arc::new(TelegramReplySender::new(bot)),
    )
}

async fn register_commands(bot: &Bot) {
    if let Err(e) = bot.set_my_commands(Route::command_descriptions()).await {
        warn!("Failed to register bot commands: {e}");
    }
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    // Non-text messages are dropped without a reply
    Update::filter_message()
        .filter_map(|msg: Message| InboundEvent::from_message(&msg))
        .endpoint(handle_text_message)
}

async fn handle_text_message(
    event: InboundEvent,
    context: Arc<HandlerContext>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::handle_event(&context, &event).await {
        error!("Failed to reply to chat {}: {e}", event.chat_id.0);
    }
    respond(())
}
