
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::error::ChatterError;

/// Top-level Chatter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub chatter: ChatterConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatterConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Optional log file; rotated daily. Empty = stdout only.
    #[serde(default)]
    pub log_file: String,
}

impl Default for ChatterConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
            log_file: String::new(),
        }
    }
}

/// Webhook server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Telegram bot config. Holds the session credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Shared secret expected on every inbound webhook request.
    #[serde(default)]
    pub secret_token: String,
    /// The single Telegram user allowed to talk to the bot. 0 = unset.
    #[serde(default)]
    pub allowed_user_id: i64,
    #[serde(default = "default_telegram_api")]
    pub api_base_url: String,
    /// Timeout for every Bot API call.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            secret_token: String::new(),
            allowed_user_id: 0,
            api_base_url: default_telegram_api(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Which model backend to relay questions to.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// OpenAI-compatible chat completions endpoint.
    #[default]
    Openai,
    /// No backend; every question is answered with "not available".
    None,
}

impl BackendKind {
    pub fn display_name(&self) -> &str {
        match self {
            Self::Openai => "openai",
            Self::None => "none",
        }
    }
}

/// Model backend config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,
    #[serde(default = "default_backend_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Upper bound on a single model call.
    #[serde(default = "default_backend_timeout")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            base_url: default_backend_url(),
            api_key: String::new(),
            model: default_model(),
            system_prompt: default_system_prompt(),
            timeout_secs: default_backend_timeout(),
        }
    }
}

/// Workspace whose files `/context` questions are asked about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default = "default_workspace_root")]
    pub root: String,
    /// Active document, relative to `root` or absolute. Empty = none.
    #[serde(default)]
    pub active_file: String,
    /// 1-based inclusive line range treated as the current selection.
    #[serde(default)]
    pub selection: Option<(usize, usize)>,
    /// Lines of the active document sent when there is no selection.
    #[serde(default = "default_preview_lines")]
    pub preview_lines: usize,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: default_workspace_root(),
            active_file: String::new(),
            selection: None,
            preview_lines: default_preview_lines(),
        }
    }
}

fn default_name() -> String {
    "Chatter".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3847
}
fn default_telegram_api() -> String {
    "https://api.telegram.org".to_string()
}
fn default_request_timeout() -> u64 {
    30
}
fn default_backend_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_model() -> String {
    "gpt-4o".to_string()
}
fn default_system_prompt() -> String {
    "You are a programming assistant answering questions relayed from a Telegram chat. \
     Be concise and put code in fenced code blocks."
        .to_string()
}
fn default_backend_timeout() -> u64 {
    120
}
fn default_workspace_root() -> String {
    ".".to_string()
}
fn default_preview_lines() -> usize {
    50
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Overlay secrets from the environment onto a loaded config.
///
/// `lookup` is `std::env::var` in production.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(token) = lookup("CHATTER_BOT_TOKEN") {
        config.telegram.bot_token = token;
    }
    if let Some(secret) = lookup("CHATTER_SECRET_TOKEN") {
        config.telegram.secret_token = secret;
    }
    if let Some(raw) = lookup("CHATTER_ALLOWED_USER_ID") {
        match raw.trim().parse::<i64>() {
            Ok(id) => config.telegram.allowed_user_id = id,
            Err(e) => warn!("ignoring CHATTER_ALLOWED_USER_ID '{raw}': {e}"),
        }
    }
    if let Some(key) = lookup("CHATTER_API_KEY") {
        config.backend.api_key = key;
    }
}

/// Load configuration from a TOML file, then apply environment overrides.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: &str) -> Result<Config, ChatterError> {
    let mut config = read_file(path)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

fn read_file(path: &str) -> Result<Config, ChatterError> {
    let path = Path::new(path);
    if !path.exists() {
        info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ChatterError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| ChatterError::Config(format!("failed to parse config: {}", e)))?;

    Ok(config)
}
