use serde::{Deserialize, Serialize};

/// Telegram's hard limit on the text of a single message, in characters.
pub const TELEGRAM_MAX_MESSAGE_CHARS: usize = 4096;

/// Formatting mode attached to an outgoing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseMode {
    /// Telegram's MarkdownV2 dialect (strict escaping rules).
    MarkdownV2,
}

impl ParseMode {
    /// Value sent in the `parse_mode` field of the Bot API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MarkdownV2 => "MarkdownV2",
        }
    }
}

/// An outgoing message to send back through a channel.
///
/// Producers must have chunked the text to at most
/// [`TELEGRAM_MAX_MESSAGE_CHARS`] characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    /// Target chat.
    pub chat_id: i64,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<ParseMode>,
}

impl OutgoingMessage {
    /// A message sent without any formatting mode.
    pub fn plain(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            parse_mode: None,
        }
    }

    /// A message with an explicit formatting mode.
    pub fn formatted(chat_id: i64, text: impl Into<String>, parse_mode: ParseMode) -> Self {
        Self {
            chat_id,
            text: text.into(),
            parse_mode: Some(parse_mode),
        }
    }
}

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single entry in the conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}
