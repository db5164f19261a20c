//! Telegram Bot API channel.
//!
//! Inbound updates arrive through the webhook; this side only talks back
//! via `sendMessage`, `sendChatAction`, `setMyCommands` and `getMe`.
//! Docs: <https://core.telegram.org/bots/api>

pub(crate) mod send;
pub mod types;


use std::time::Duration;
use tokio::sync::OnceCell;

/// Telegram channel bound to one bot token.
pub struct TelegramChannel {
    client: reqwest::Client,
    /// `{api_base_url}/bot{token}`. Never logged.
    base_url: String,
    request_timeout: Duration,
    /// Bot username, resolved on first use via `getMe`.
    username: OnceCell<String>,
}

impl TelegramChannel {
    /// Create a channel for `bot_token` against `api_base_url`.
    pub fn new(api_base_url: &str, bot_token: &str, request_timeout: Duration) -> Self {
        let base_url = format!("{}/bot{bot_token}", api_base_url.trim_end_matches('/'));
        Self {
            client: reqwest::Client::new(),
            base_url,
            request_timeout,
            username: OnceCell::new(),
        }
    }
}
