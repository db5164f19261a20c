//! HTTP ingress: the Telegram webhook and a liveness probe.
//!
//! Every update is authenticated twice (shared secret, then sender) before
//! it reaches the command router, and is processed fully before the HTTP
//! response goes out.

use crate::commands::CommandRouter;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use chatter_channels::telegram::types::Update;
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Shared-secret header checked first.
pub const SECRET_HEADER: &str = "x-webhook-secret-token";
/// Telegram's native header, used when [`SECRET_HEADER`] is absent.
pub const TELEGRAM_SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Decides which senders may reach the router.
pub trait SenderPolicy: Send + Sync {
    fn allows(&self, sender_id: Option<i64>) -> bool;
}

/// Exactly one authorized user.
pub struct SingleUser(pub i64);

impl SenderPolicy for SingleUser {
    fn allows(&self, sender_id: Option<i64>) -> bool {
        sender_id == Some(self.0)
    }
}

/// Shared state for webhook handlers.
#[derive(Clone)]
pub struct WebhookState {
    secret: Arc<str>,
    policy: Arc<dyn SenderPolicy>,
    router: Arc<CommandRouter>,
}

impl WebhookState {
    pub fn new(secret: &str, policy: Arc<dyn SenderPolicy>, router: Arc<CommandRouter>) -> Self {
        Self {
            secret: Arc::from(secret),
            policy,
            router,
        }
    }
}

type Reply = (StatusCode, Json<Value>);

/// Constant-time string comparison to prevent timing attacks on the secret.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Check the shared secret. Returns `None` if it matches.
fn check_secret(headers: &HeaderMap, secret: &str) -> Option<Reply> {
    let presented = headers
        .get(SECRET_HEADER)
        .or_else(|| headers.get(TELEGRAM_SECRET_HEADER))
        .and_then(|v| v.to_str().ok());

    match presented {
        Some(token) if constant_time_eq(token, secret) => None,
        _ => {
            warn!("Invalid secret token received");
            Some((
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "Unauthorized"})),
            ))
        }
    }
}

fn forbidden() -> Reply {
    (StatusCode::FORBIDDEN, Json(json!({"error": "Forbidden"})))
}

/// `POST /webhook`: authenticate, then route one update.
async fn webhook(headers: HeaderMap, State(state): State<WebhookState>, body: Bytes) -> Reply {
    info!("Webhook received");

    if let Some(rejected) = check_secret(&headers, &state.secret) {
        return rejected;
    }

    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            warn!("Rejecting malformed update: {e}");
            return forbidden();
        }
    };

    let sender = update.sender_id();
    if !state.policy.allows(sender) {
        match sender {
            Some(id) => warn!("Unauthorized access attempt from user {id}"),
            None => warn!("Unauthorized access attempt from update without sender"),
        }
        return forbidden();
    }

    match state.router.dispatch(&update).await {
        Ok(()) => (StatusCode::OK, Json(json!({"ok": true}))),
        Err(e) => {
            error!("Error processing update {}: {e}", update.update_id);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Internal error"})),
            )
        }
    }
}

/// `GET /health`: unauthenticated liveness probe.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

/// Build the axum router with shared state.
pub fn build_router(state: WebhookState) -> Router {
    Router::new()
        .route("/webhook", post(webhook))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

/// Serve until `shutdown` resolves.
pub async fn serve<F>(host: &str, port: u16, state: WebhookState, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind webhook server to {addr}: {e}"))?;

    info!("Webhook server listening on {addr}");
    info!(
        "Local webhook URL: http://localhost:{port}/webhook. Expose it (ngrok or similar) \
         and register it with Telegram's setWebhook, passing the secret_token."
    );

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Webhook server stopped");
    Ok(())
}
