//! Command routing for inbound text.
//!
//! Classification is pure: no network, no Telegram types beyond the text itself.

use teloxide::types::BotCommand;

/// What a single inbound text asks the bot to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `/start`, arguments ignored
    Start,
    /// `/help`, arguments ignored
    Help,
    /// `/generate <prompt>`; the prompt may be empty and is validated by the handler
    Generate {
        /// Arguments joined by single spaces
        prompt: String,
    },
    /// Anything else is relayed to the completion endpoint verbatim
    Chat {
        /// Original message text
        text: String,
    },
}

impl Route {
    /// Classify a message text.
    ///
    /// The first token decides. Command names match case-insensitively, and a
    /// `/name@bot` suffix must name `bot_username` (also case-insensitively).
    /// A command addressed to another bot yields `None`. Any other text,
    /// including unknown commands, becomes [`Route::Chat`].
    ///
    /// # Examples
    ///
    /// ```
    /// use chat_relay_bot::bot::router::Route;
    ///
    /// assert_eq!(Route::parse("/HELP me", "relay_bot"), Some(Route::Help));
    /// assert_eq!(
    ///     Route::parse("/generate  a   cat", "relay_bot"),
    ///     Some(Route::Generate { prompt: "a cat".to_string() })
    /// );
    /// assert_eq!(Route::parse("/start@other_bot", "relay_bot"), None);
    /// ```
    #[must_use]
    pub fn parse(text: &str, bot_username: &str) -> Option<Self> {
        let mut tokens = text.split_whitespace();
        let Some(command) = tokens.next().and_then(|first| first.strip_prefix('/')) else {
            return Some(Self::chat(text));
        };

        let name = match command.split_once('@') {
            Some((name, target)) if target.eq_ignore_ascii_case(bot_username) => name,
            Some(_) => return None,
            None => command,
        };

        let route = match name.to_ascii_lowercase().as_str() {
            "start" => Self::Start,
            "help" => Self::Help,
            "generate" => Self::Generate {
                prompt: tokens.collect::<Vec<_>>().join(" "),
            },
            _ => Self::chat(text),
        };
        Some(route)
    }

    fn chat(text: &str) -> Self {
        Self::Chat {
            text: text.to_string(),
        }
    }

    /// Short name used in logs
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Help => "help",
            Self::Generate { .. } => "generate",
            Self::Chat { .. } => "chat",
        }
    }

    /// Commands advertised in the Telegram command menu
    #[must_use]
    pub fn command_descriptions() -> Vec<BotCommand> {
        vec![
            BotCommand::new("start", "Start the bot."),
            BotCommand::new("help", "Show what the bot can do."),
            BotCommand::new("generate", "Generate an image from a description."),
        ]
    }
}
