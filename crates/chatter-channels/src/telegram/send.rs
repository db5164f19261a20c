//! Outbound Bot API calls and the Channel trait implementation.

use super::types::{TgResponse, TgUser};
use super::TelegramChannel;
use async_trait::async_trait;
use chatter_core::{
    error::ChatterError,
    message::{OutgoingMessage, TELEGRAM_MAX_MESSAGE_CHARS},
    traits::Channel,
};
use reqwest::StatusCode;
use tracing::{debug, error, info, warn};

// Bot API URLs embed the token, so request errors are logged without them.
impl TelegramChannel {
    /// Send one text message. Success means HTTP 200 from the Bot API.
    pub async fn send_text(&self, message: &OutgoingMessage) -> Result<(), ChatterError> {
        let len = message.text.chars().count();
        if len > TELEGRAM_MAX_MESSAGE_CHARS {
            return Err(ChatterError::Channel(format!(
                "message of {len} chars exceeds telegram limit of {TELEGRAM_MAX_MESSAGE_CHARS}"
            )));
        }

        info!("Sending message to chat {}", message.chat_id);

        let mut params = vec![
            ("chat_id", message.chat_id.to_string()),
            ("text", message.text.clone()),
        ];
        if let Some(mode) = message.parse_mode {
            params.push(("parse_mode", mode.as_str().to_string()));
        }

        let resp = self
            .client
            .post(format!("{}/sendMessage", self.base_url))
            .timeout(self.request_timeout)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                ChatterError::Channel(format!("telegram send failed: {}", e.without_url()))
            })?;

        let status = resp.status();
        if status != StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            error!("telegram sendMessage got {status}: {body}");
            return Err(ChatterError::Channel(format!(
                "telegram API error: {} - {body}",
                status.as_u16()
            )));
        }

        info!("Message sent successfully");
        Ok(())
    }

    /// Send a chat action (e.g. "typing") to a chat.
    pub async fn send_chat_action(&self, chat_id: i64, action: &str) -> Result<(), ChatterError> {
        let url = format!("{}/sendChatAction", self.base_url);
        let body = serde_json::json!({
            "chat_id": chat_id,
            "action": action,
        });

        let resp = self
            .client
            .post(&url)
            .timeout(self.request_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                ChatterError::Channel(format!(
                    "telegram sendChatAction failed: {}",
                    e.without_url()
                ))
            })?;

        if !resp.status().is_success() {
            debug!("telegram sendChatAction got {}", resp.status());
        }
        Ok(())
    }

    /// Register bot commands with Telegram so users see an autocomplete menu.
    /// Best-effort: logs failures but does not propagate errors.
    pub async fn register_commands(&self) {
        let commands = serde_json::json!({
            "commands": [
                { "command": "start", "description": "Show the welcome message" },
                { "command": "help", "description": "Show available commands" },
                { "command": "ask", "description": "Ask the assistant a question" },
                { "command": "context", "description": "Ask with the active file attached" },
                { "command": "clear", "description": "Clear conversation history" },
                { "command": "status", "description": "Backend and workspace status" },
            ]
        });

        let url = format!("{}/setMyCommands", self.base_url);
        match self
            .client
            .post(&url)
            .timeout(self.request_timeout)
            .json(&commands)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => {
                info!("registered Telegram bot commands");
            }
            Ok(resp) => {
                let body = resp.text().await.unwrap_or_default();
                warn!("failed to register Telegram bot commands: {body}");
            }
            Err(e) => {
                warn!(
                    "failed to register Telegram bot commands: {}",
                    e.without_url()
                );
            }
        }
    }

    /// The bot's username, fetched once via `getMe` and cached.
    ///
    /// A failed lookup is not cached; the next call tries again.
    pub async fn bot_username(&self) -> Option<String> {
        match self
            .username
            .get_or_try_init(|| self.fetch_username())
            .await
        {
            Ok(name) => Some(name.clone()),
            Err(e) => {
                warn!("telegram getMe failed: {e}");
                None
            }
        }
    }

    async fn fetch_username(&self) -> Result<String, ChatterError> {
        let resp: TgResponse<TgUser> = self
            .client
            .get(format!("{}/getMe", self.base_url))
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| {
                ChatterError::Channel(format!("telegram getMe failed: {}", e.without_url()))
            })?
            .json()
            .await
            .map_err(|e| {
                ChatterError::Channel(format!(
                    "telegram getMe parse failed: {}",
                    e.without_url()
                ))
            })?;

        if !resp.ok {
            return Err(ChatterError::Channel(
                resp.description
                    .unwrap_or_else(|| "getMe returned ok=false".into()),
            ));
        }

        resp.result
            .and_then(|u| u.username)
            .ok_or_else(|| ChatterError::Channel("telegram getMe returned no username".into()))
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, message: OutgoingMessage) -> Result<(), ChatterError> {
        self.send_text(&message).await
    }

    async fn send_typing(&self, chat_id: i64) -> Result<(), ChatterError> {
        self.send_chat_action(chat_id, "typing").await
    }

    async fn identity(&self) -> Option<String> {
        self.bot_username().await.map(|name| format!("@{name}"))
    }
}
