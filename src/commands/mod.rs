//! Command router: maps one inbound update to its replies.

mod help;

#[cfg(test)]
mod tests;

use crate::bridge::ModelBridge;
use chatter_channels::{
    format::{chunk, escape_markdown, escape_preserving_code, CHUNK_SIZE},
    telegram::types::Update,
};
use chatter_core::{
    error::ChatterError,
    message::{OutgoingMessage, ParseMode, TELEGRAM_MAX_MESSAGE_CHARS},
    traits::{Channel, WorkspaceContextProvider},
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

const CLEARED: &str = "✅ Conversation history cleared!";
const UNKNOWN_COMMAND: &str = "❓ Unknown command. Use /help to see available commands.";
const FREE_TEXT_TIP: &str = "💡 Tip: Use /ask followed by your question.\n\
                             Example: /ask How do I read a file line by line?";
const GENERIC_FAILURE: &str =
    "❌ An error occurred while processing your request. Check the server logs for details.";
const EMPTY_ANSWER: &str = "🤷 The model returned an empty answer.";

/// Known bot commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Ask,
    Context,
    Clear,
    Status,
}

impl Command {
    /// Parse a command from message text. Returns `None` for free text and
    /// unknown `/` prefixes.
    pub fn parse(text: &str) -> Option<Self> {
        let first = text.split_whitespace().next()?;
        // Strip @botname suffix (e.g. "/help@chatter_bot" → "/help").
        let cmd = first.split('@').next().unwrap_or(first);
        match cmd {
            "/start" => Some(Self::Start),
            "/help" => Some(Self::Help),
            "/ask" => Some(Self::Ask),
            "/context" => Some(Self::Context),
            "/clear" => Some(Self::Clear),
            "/status" => Some(Self::Status),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Help => "help",
            Self::Ask => "ask",
            Self::Context => "context",
            Self::Clear => "clear",
            Self::Status => "status",
        }
    }
}

/// Everything after the command token, trimmed.
fn argument(text: &str) -> &str {
    text.trim_start()
        .split_once(char::is_whitespace)
        .map(|(_, rest)| rest.trim())
        .unwrap_or("")
}

fn usage_hint(cmd: Command) -> String {
    format!(
        "❓ Please provide a question.\n\nExample: /{} How do I implement error handling?",
        cmd.name()
    )
}

pub struct CommandRouter {
    bridge: Arc<ModelBridge>,
    channel: Arc<dyn Channel>,
    workspace: Option<Arc<dyn WorkspaceContextProvider>>,
    uptime: Instant,
}

impl CommandRouter {
    pub fn new(
        bridge: Arc<ModelBridge>,
        channel: Arc<dyn Channel>,
        workspace: Option<Arc<dyn WorkspaceContextProvider>>,
    ) -> Self {
        Self {
            bridge,
            channel,
            workspace,
            uptime: Instant::now(),
        }
    }

    /// Handle one update to completion.
    ///
    /// Model failures become replies; only send failures are returned.
    pub async fn dispatch(&self, update: &Update) -> Result<(), ChatterError> {
        let (Some(chat_id), Some(text)) = (update.chat_id(), update.text()) else {
            debug!("update {} carries no text message, ignoring", update.update_id);
            return Ok(());
        };
        let session = update
            .sender_id()
            .unwrap_or(chat_id)
            .to_string();

        match Command::parse(text) {
            Some(Command::Start) => {
                info!("User started conversation");
                self.send_formatted(chat_id, help::start_text()).await
            }
            Some(Command::Help) => self.send_formatted(chat_id, help::help_text()).await,
            Some(cmd @ (Command::Ask | Command::Context)) => {
                self.handle_ask(chat_id, &session, argument(text), cmd)
                    .await
            }
            Some(Command::Clear) => {
                self.bridge.clear_history(&session);
                self.send_plain(chat_id, CLEARED).await
            }
            Some(Command::Status) => {
                let text = help::status_text(&self.status_info().await);
                self.send_formatted(chat_id, &text).await
            }
            None if text.starts_with('/') => self.send_plain(chat_id, UNKNOWN_COMMAND).await,
            None => self.send_plain(chat_id, FREE_TEXT_TIP).await,
        }
    }

    async fn handle_ask(
        &self,
        chat_id: i64,
        session: &str,
        question: &str,
        cmd: Command,
    ) -> Result<(), ChatterError> {
        if question.is_empty() {
            return self.send_plain(chat_id, &usage_hint(cmd)).await;
        }

        info!("Received /{}: {question}", cmd.name());

        if let Err(e) = self.channel.send_typing(chat_id).await {
            debug!("typing indicator failed: {e}");
        }

        let bridge = self.bridge.clone();
        let session = session.to_string();
        let question = question.to_string();
        let include_context = cmd == Command::Context;
        let joined =
            tokio::spawn(async move { bridge.ask(&session, &question, include_context).await })
                .await;

        let response = match joined {
            Ok(response) => response,
            Err(e) => {
                error!("model task failed: {e}");
                return self.send_plain(chat_id, GENERIC_FAILURE).await;
            }
        };

        if let Some(err) = response.error {
            let text = format!("⚠️ *Error*\n\n{}", escape_markdown(&err));
            return self.send_formatted(chat_id, &text).await;
        }

        self.send_answer(chat_id, &response.text).await
    }

    /// Escape the answer, then split it if it is over the message limit.
    async fn send_answer(&self, chat_id: i64, answer: &str) -> Result<(), ChatterError> {
        if answer.trim().is_empty() {
            return self.send_plain(chat_id, EMPTY_ANSWER).await;
        }

        let formatted = escape_preserving_code(answer);
        let chunks = if formatted.chars().count() <= TELEGRAM_MAX_MESSAGE_CHARS {
            vec![formatted]
        } else {
            chunk(&formatted, CHUNK_SIZE)
        };

        debug!("sending answer in {} message(s)", chunks.len());
        for piece in chunks {
            self.send_formatted(chat_id, &piece).await?;
        }
        Ok(())
    }

    async fn status_info(&self) -> help::StatusInfo {
        let (workspace, active_file) = match &self.workspace {
            Some(ws) => (ws.workspace_name(), ws.active_file()),
            None => (None, None),
        };
        help::StatusInfo {
            identity: self.channel.identity().await,
            backend: self.bridge.backend_name(),
            workspace,
            active_file,
            uptime: self.uptime.elapsed(),
        }
    }

    async fn send_plain(&self, chat_id: i64, text: &str) -> Result<(), ChatterError> {
        self.channel
            .send(OutgoingMessage::plain(chat_id, text))
            .await
    }

    async fn send_formatted(&self, chat_id: i64, text: &str) -> Result<(), ChatterError> {
        self.channel
            .send(OutgoingMessage::formatted(chat_id, text, ParseMode::MarkdownV2))
            .await
    }
}
