mod bridge;
mod commands;
mod init;
mod webhook;
mod workspace;

use bridge::ModelBridge;
use chatter_channels::telegram::TelegramChannel;
use chatter_core::{
    config::{self, shellexpand, BackendConfig, BackendKind, ChatterConfig},
    context::ModelRequest,
    credentials::SessionCredentials,
    traits::{CredentialStore, ModelBackend, WorkspaceContextProvider},
};
use chatter_providers::openai::OpenAiBackend;
use clap::{Parser, Subcommand};
use commands::CommandRouter;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use webhook::{SingleUser, WebhookState};
use workspace::FileWorkspace;

#[derive(Parser)]
#[command(
    name = "chatter",
    version,
    about = "Chatter: ask your code assistant from Telegram"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webhook server.
    Start,
    /// Check configuration and backend availability.
    Status,
    /// Send a one-shot question to the model backend.
    Ask {
        /// The question to send.
        #[arg(trailing_var_arg = true)]
        message: Vec<String>,
    },
    /// Interactive setup: writes a fresh config file.
    Init,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Init = cli.command {
        return init::run(&cli.config);
    }

    let cfg = config::load(&cli.config)?;
    let _log_guard = init_tracing(&cfg.chatter)?;

    match cli.command {
        Commands::Start => start(cfg).await?,
        Commands::Status => status(&cli.config, &cfg).await,
        Commands::Ask { message } => {
            if message.is_empty() {
                anyhow::bail!("no message provided. Usage: chatter ask <message>");
            }
            ask(&cfg.backend, &message.join(" ")).await?;
        }
        Commands::Init => {}
    }

    Ok(())
}

/// Console logging, plus a daily-rolling file when `log_file` is set.
///
/// `RUST_LOG` wins over the configured level. The returned guard must live
/// as long as the process or buffered file output is lost.
fn init_tracing(cfg: &ChatterConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match cfg.log_file.trim() {
        "" => (None, None),
        raw => {
            let path = shellexpand(raw);
            let path = Path::new(&path);
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("log_file '{raw}' has no file name"))?;
            std::fs::create_dir_all(dir)?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, name));
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}

/// Build the configured model backend, if any.
fn build_backend(cfg: &BackendConfig) -> Option<Arc<dyn ModelBackend>> {
    match cfg.kind {
        BackendKind::Openai => Some(Arc::new(OpenAiBackend::from_config(
            cfg.base_url.clone(),
            cfg.api_key.clone(),
            cfg.model.clone(),
        ))),
        BackendKind::None => None,
    }
}

/// Resolves once Ctrl-C is received.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn start(cfg: config::Config) -> anyhow::Result<()> {
    let creds = SessionCredentials::resolve(&cfg.telegram)?;
    info!(
        "Starting {} with bot token length: {}",
        cfg.chatter.name,
        creds.bot_token.len()
    );

    let channel = Arc::new(TelegramChannel::new(
        &cfg.telegram.api_base_url,
        &creds.bot_token,
        Duration::from_secs(cfg.telegram.request_timeout_secs),
    ));

    let backend = build_backend(&cfg.backend);
    match &backend {
        Some(b) if b.is_available().await => info!("Model backend '{}' ready", b.name()),
        Some(b) => warn!(
            "Model backend '{}' is not available; questions will be answered with an error",
            b.name()
        ),
        None => warn!("No model backend configured"),
    }

    let workspace: Arc<dyn WorkspaceContextProvider> =
        Arc::new(FileWorkspace::from_config(&cfg.workspace));
    let bridge = Arc::new(ModelBridge::new(
        backend,
        Some(Arc::clone(&workspace)),
        cfg.backend.system_prompt.clone(),
        Duration::from_secs(cfg.backend.timeout_secs),
    ));
    let router = Arc::new(CommandRouter::new(
        bridge,
        channel.clone(),
        Some(workspace),
    ));

    // Best-effort Telegram setup; the server starts regardless.
    {
        let channel = channel.clone();
        tokio::spawn(async move {
            channel.register_commands().await;
            match channel.bot_username().await {
                Some(name) => info!("Bot initialized: @{name}"),
                None => warn!("Bot identity unknown; will retry on /status"),
            }
        });
    }

    let state = WebhookState::new(
        &creds.secret_token,
        Arc::new(SingleUser(creds.authorized_user_id)),
        router,
    );
    webhook::serve(&cfg.server.host, cfg.server.port, state, shutdown_signal()).await
}

async fn status(config_path: &str, cfg: &config::Config) {
    println!("Chatter: Status Check\n");
    println!("Config: {config_path}");
    println!("Listen: {}:{}", cfg.server.host, cfg.server.port);
    println!();

    let present = |ok: bool| if ok { "present" } else { "missing" };
    println!("  bot token:       {}", present(cfg.telegram.bot_token().is_some()));
    println!("  webhook secret:  {}", present(cfg.telegram.secret_token().is_some()));
    match cfg.telegram.authorized_user_id() {
        Some(id) => println!("  authorized user: {id}"),
        None => println!("  authorized user: missing"),
    }
    println!();

    match build_backend(&cfg.backend) {
        Some(b) => {
            let available = b.is_available().await;
            println!(
                "  backend: {} ({}) {}",
                cfg.backend.kind.display_name(),
                cfg.backend.model,
                if available { "available" } else { "not available" }
            );
        }
        None => println!("  backend: none"),
    }

    let ws = FileWorkspace::from_config(&cfg.workspace);
    println!(
        "  workspace: {}",
        ws.workspace_name().unwrap_or_else(|| "No workspace".into())
    );
    println!(
        "  active file: {}",
        ws.active_file().unwrap_or_else(|| "None".into())
    );
}

async fn ask(cfg: &BackendConfig, question: &str) -> anyhow::Result<()> {
    let backend = build_backend(cfg)
        .ok_or_else(|| anyhow::anyhow!("no model backend configured (backend.kind = \"none\")"))?;

    if !backend.is_available().await {
        anyhow::bail!(
            "backend '{}' is not available. Is an API key configured?",
            backend.name()
        );
    }

    let request = ModelRequest::new(&cfg.system_prompt, question);
    let reply = tokio::time::timeout(
        Duration::from_secs(cfg.timeout_secs),
        backend.complete(&request),
    )
    .await
    .map_err(|_| anyhow::anyhow!("model call timed out after {}s", cfg.timeout_secs))??;
    info!(
        "answered by {} in {}ms",
        reply.model.as_deref().unwrap_or(&cfg.model),
        reply.processing_time_ms
    );
    println!("{}", reply.text);
    Ok(())
}
