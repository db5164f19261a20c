//! Session credentials: resolved once at startup, immutable afterwards.

use crate::{config::TelegramConfig, error::ChatterError, traits::CredentialStore};

/// Credentials a running server instance is bound to.
///
/// Changing any of them requires restarting the webhook server.
#[derive(Clone)]
pub struct SessionCredentials {
    pub bot_token: String,
    pub secret_token: String,
    pub authorized_user_id: i64,
}

impl std::fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCredentials")
            .field("bot_token", &format_args!("<{} chars>", self.bot_token.len()))
            .field("secret_token", &"<redacted>")
            .field("authorized_user_id", &self.authorized_user_id)
            .finish()
    }
}

impl SessionCredentials {
    /// Read all three credentials from `store`.
    ///
    /// Absence of any of them is fatal; the error lists every missing one.
    pub fn resolve(store: &dyn CredentialStore) -> Result<Self, ChatterError> {
        let bot_token = store.bot_token();
        let secret_token = store.secret_token();
        let authorized_user_id = store.authorized_user_id();

        match (bot_token, secret_token, authorized_user_id) {
            (Some(bot_token), Some(secret_token), Some(authorized_user_id)) => Ok(Self {
                bot_token,
                secret_token,
                authorized_user_id,
            }),
            (bot_token, secret_token, user_id) => {
                let mut missing = Vec::new();
                if bot_token.is_none() {
                    missing.push("bot token");
                }
                if secret_token.is_none() {
                    missing.push("webhook secret");
                }
                if user_id.is_none() {
                    missing.push("authorized user id");
                }
                Err(ChatterError::Credentials(format!(
                    "configuration incomplete, missing: {}",
                    missing.join(", ")
                )))
            }
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl CredentialStore for TelegramConfig {
    fn bot_token(&self) -> Option<String> {
        non_empty(&self.bot_token)
    }

    fn secret_token(&self) -> Option<String> {
        non_empty(&self.secret_token)
    }

    fn authorized_user_id(&self) -> Option<i64> {
        (self.allowed_user_id != 0).then_some(self.allowed_user_id)
    }
}
