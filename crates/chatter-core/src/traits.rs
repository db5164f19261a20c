use crate::{
    context::{ModelRequest, WorkspaceSnapshot},
    error::ChatterError,
    message::OutgoingMessage,
};
use async_trait::async_trait;

/// A model reply, fully drained into one piece of text.
#[derive(Debug, Clone, Default)]
pub struct ModelReply {
    pub text: String,
    /// Model identifier reported by the backend, if any.
    pub model: Option<String>,
    /// Wall-clock processing time in milliseconds.
    pub processing_time_ms: u64,
}

/// Model backend trait: the code assistant behind the relay.
///
/// Every backend (OpenAI-compatible endpoint, local gateway, ...) implements
/// this trait as a single request/response call.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Human-readable backend name.
    fn name(&self) -> &str;

    /// Whether the backend is configured and ready to take requests.
    async fn is_available(&self) -> bool;

    /// Send a request and wait for the complete answer.
    async fn complete(&self, request: &ModelRequest) -> Result<ModelReply, ChatterError>;
}

/// Messaging channel trait: outbound delivery to the chat platform.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name.
    fn name(&self) -> &str;

    /// Deliver one message. The text must already fit the platform limit.
    async fn send(&self, message: OutgoingMessage) -> Result<(), ChatterError>;

    /// Send a typing indicator to show the bot is processing.
    async fn send_typing(&self, _chat_id: i64) -> Result<(), ChatterError> {
        Ok(())
    }

    /// The bot's public identity on this channel, if known.
    async fn identity(&self) -> Option<String> {
        None
    }
}

/// Source of the session credentials.
///
/// `None` means the value is absent; the server refuses to start without all three.
pub trait CredentialStore: Send + Sync {
    fn bot_token(&self) -> Option<String>;
    fn secret_token(&self) -> Option<String>;
    fn authorized_user_id(&self) -> Option<i64>;
}

/// Supplies the caller's current working context.
#[async_trait]
pub trait WorkspaceContextProvider: Send + Sync {
    /// Display name of the workspace (e.g. its directory name).
    fn workspace_name(&self) -> Option<String>;

    /// Path of the active document, if any.
    fn active_file(&self) -> Option<String>;

    /// Snapshot of the active document, or `None` when nothing is open.
    async fn current_context(&self) -> Option<WorkspaceSnapshot>;
}
