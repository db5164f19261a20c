//! Static replies: /start, /help, /status. All MarkdownV2.

use chatter_channels::format::escape_markdown;
use std::time::Duration;

pub(super) fn start_text() -> &'static str {
    "🟢 *Chatter Connected\\!*\n\n\
     Your workspace is now connected to Telegram\\.\n\n\
     *Available Commands:*\n\
     /ask \\- Ask the assistant a question\n\
     /context \\- Ask with workspace context\n\
     /clear \\- Clear conversation history\n\
     /status \\- Check connection status\n\
     /help \\- Show this help message\n\n\
     _Example: /ask How do I define a trait in Rust?_"
}

pub(super) fn help_text() -> &'static str {
    "*Chatter Help*\n\n\
     *Commands:*\n\
     • `/ask <question>` \\- Ask the assistant anything\n\
     • `/context <question>` \\- Ask with current file context\n\
     • `/clear` \\- Clear conversation history\n\
     • `/status` \\- Check connection status\n\
     • `/help` \\- Show this help\n\n\
     *Tips:*\n\
     • The assistant remembers your last few messages\n\
     • Use /context when asking about your current code\n\
     • Use /clear to start a fresh conversation"
}

/// Everything /status reports. `None` fields render as placeholders.
pub(super) struct StatusInfo {
    pub identity: Option<String>,
    pub backend: Option<String>,
    pub workspace: Option<String>,
    pub active_file: Option<String>,
    pub uptime: Duration,
}

pub(super) fn status_text(info: &StatusInfo) -> String {
    let secs = info.uptime.as_secs();
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    let field = |value: &Option<String>, fallback: &str| {
        escape_markdown(value.as_deref().unwrap_or(fallback))
    };

    format!(
        "*Chatter Status*\n\n\
         🟢 Webhook server running\n\
         🤖 Bot: {}\n\
         🧠 Backend: {}\n\
         📁 Workspace: {}\n\
         📄 Active File: {}\n\
         ⏱ Uptime: {hours}h {minutes}m {seconds}s\n\
         💬 Ready to receive commands",
        field(&info.identity, "unknown"),
        field(&info.backend, "none"),
        field(&info.workspace, "No workspace"),
        field(&info.active_file, "None"),
    )
}
