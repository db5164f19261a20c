use crate::message::ConversationTurn;
use serde::{Deserialize, Serialize};

/// A request handed to a model backend.
///
/// Plain data only; backends translate it into their own wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRequest {
    /// System prompt prepended to every request. Empty = none.
    pub system_prompt: String,
    /// Conversation history (oldest first).
    pub history: Vec<ConversationTurn>,
    /// The current user message.
    pub current_message: String,
}

/// A structured role/content message for API-based backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMessage {
    /// "user" or "assistant".
    pub role: String,
    pub content: String,
}

impl ModelRequest {
    /// A stateless single-shot request.
    pub fn new(system_prompt: &str, message: &str) -> Self {
        Self {
            system_prompt: system_prompt.to_string(),
            history: Vec::new(),
            current_message: message.to_string(),
        }
    }

    /// A request continuing an existing conversation.
    pub fn with_history(system_prompt: &str, history: Vec<ConversationTurn>, message: &str) -> Self {
        Self {
            system_prompt: system_prompt.to_string(),
            history,
            current_message: message.to_string(),
        }
    }

    /// Convert the request to structured API messages.
    ///
    /// Returns `(system_prompt, messages)` with the current message last.
    pub fn to_api_messages(&self) -> (String, Vec<ApiMessage>) {
        let mut messages = Vec::with_capacity(self.history.len() + 1);

        for turn in &self.history {
            messages.push(ApiMessage {
                role: turn.role.as_str().to_string(),
                content: turn.content.clone(),
            });
        }

        messages.push(ApiMessage {
            role: "user".to_string(),
            content: self.current_message.clone(),
        });

        (self.system_prompt.clone(), messages)
    }
}

/// The part of the active document included in a workspace snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Excerpt {
    /// The user's current selection.
    Selection(String),
    /// The first `lines` lines of the document.
    Head { lines: usize, text: String },
}

/// A snapshot of the caller's working context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceSnapshot {
    /// File identity (path of the active document).
    pub file_id: String,
    /// Language identifier, e.g. "rust".
    pub language: String,
    pub excerpt: Excerpt,
}

impl WorkspaceSnapshot {
    /// Render the snapshot as the text block sent to the model.
    pub fn render(&self) -> String {
        let mut out = format!("File: {}\nLanguage: {}\n", self.file_id, self.language);
        match &self.excerpt {
            Excerpt::Selection(text) => {
                out.push_str(&format!(
                    "\nSelected code:\n```{}\n{}\n```",
                    self.language, text
                ));
            }
            Excerpt::Head { lines, text } => {
                out.push_str(&format!(
                    "\nFile content (first {lines} lines):\n```{}\n{}\n```",
                    self.language, text
                ));
            }
        }
        out
    }
}
