//! Model bridge: turns a question into one backend call and owns the
//! per-session conversation history.


use chatter_core::{
    context::ModelRequest,
    error::ChatterError,
    message::ConversationTurn,
    traits::{ModelBackend, WorkspaceContextProvider},
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Most recent turns kept per session (five exchanges).
pub const MAX_HISTORY_TURNS: usize = 10;

/// Why an ask produced no answer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AskFailure {
    #[error("Model backend is not available. Please ensure a backend is configured and authenticated.")]
    NoBackendAvailable,
    #[error("Model error: {message} ({code})")]
    BackendError { message: String, code: String },
    #[error("Unexpected error: {0}")]
    UnexpectedError(String),
}

impl From<ChatterError> for AskFailure {
    fn from(e: ChatterError) -> Self {
        match e {
            ChatterError::Backend { message, code } => Self::BackendError { message, code },
            ChatterError::BackendUnavailable(_) => Self::NoBackendAvailable,
            other => Self::UnexpectedError(other.to_string()),
        }
    }
}

/// Outcome of [`ModelBridge::ask`]. `error` is set iff the ask failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AskResponse {
    pub text: String,
    pub error: Option<String>,
}

impl AskResponse {
    fn failed(failure: &AskFailure) -> Self {
        Self {
            text: String::new(),
            error: Some(failure.to_string()),
        }
    }
}

#[derive(Default)]
struct Session {
    turns: Vec<ConversationTurn>,
    /// Bumped on every clear; exchanges started under an older epoch are dropped.
    epoch: u64,
}

pub struct ModelBridge {
    backend: Option<Arc<dyn ModelBackend>>,
    workspace: Option<Arc<dyn WorkspaceContextProvider>>,
    system_prompt: String,
    timeout: Duration,
    sessions: Mutex<HashMap<String, Session>>,
}

impl ModelBridge {
    pub fn new(
        backend: Option<Arc<dyn ModelBackend>>,
        workspace: Option<Arc<dyn WorkspaceContextProvider>>,
        system_prompt: String,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            workspace,
            system_prompt,
            timeout,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Name of the configured backend, if any.
    pub fn backend_name(&self) -> Option<String> {
        self.backend.as_ref().map(|b| b.name().to_string())
    }

    /// Ask the model. Never fails; failures come back in `AskResponse::error`.
    pub async fn ask(&self, session: &str, question: &str, include_context: bool) -> AskResponse {
        match self.try_ask(session, question, include_context).await {
            Ok(text) => AskResponse { text, error: None },
            Err(failure) => {
                warn!("ask failed: {failure}");
                AskResponse::failed(&failure)
            }
        }
    }

    async fn try_ask(
        &self,
        session: &str,
        question: &str,
        include_context: bool,
    ) -> Result<String, AskFailure> {
        let backend = self
            .backend
            .as_ref()
            .ok_or(AskFailure::NoBackendAvailable)?;
        if !backend.is_available().await {
            return Err(AskFailure::NoBackendAvailable);
        }

        if include_context {
            let prompt = self.context_prompt(question).await;
            let request = ModelRequest::new(&self.system_prompt, &prompt);
            return self.call(backend.as_ref(), &request).await;
        }

        let (history, epoch) = self.snapshot(session);
        let request = ModelRequest::with_history(&self.system_prompt, history, question);
        let answer = self.call(backend.as_ref(), &request).await?;
        self.record(session, epoch, question, &answer);
        Ok(answer)
    }

    async fn call(
        &self,
        backend: &dyn ModelBackend,
        request: &ModelRequest,
    ) -> Result<String, AskFailure> {
        info!(
            "model call: backend={} history={}",
            backend.name(),
            request.history.len()
        );
        let reply = tokio::time::timeout(self.timeout, backend.complete(request))
            .await
            .map_err(|_| {
                AskFailure::UnexpectedError(format!(
                    "model call timed out after {}s",
                    self.timeout.as_secs()
                ))
            })??;

        let preview: String = reply.text.chars().take(100).collect();
        debug!(
            "model {} answered in {}ms: {preview}",
            reply.model.as_deref().unwrap_or("(unreported)"),
            reply.processing_time_ms
        );
        Ok(reply.text)
    }

    /// Question prefixed with the active workspace snapshot, when there is one.
    async fn context_prompt(&self, question: &str) -> String {
        let snapshot = match &self.workspace {
            Some(ws) => ws.current_context().await,
            None => None,
        };
        match snapshot {
            Some(snap) => format!(
                "Workspace context:\n{}\n\nUser question: {question}",
                snap.render()
            ),
            None => question.to_string(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn snapshot(&self, session: &str) -> (Vec<ConversationTurn>, u64) {
        let sessions = self.lock();
        sessions
            .get(session)
            .map(|s| (s.turns.clone(), s.epoch))
            .unwrap_or_default()
    }

    fn record(&self, session: &str, epoch: u64, question: &str, answer: &str) {
        let mut sessions = self.lock();
        let entry = sessions.entry(session.to_string()).or_default();
        if entry.epoch != epoch {
            debug!("history cleared during model call, dropping exchange");
            return;
        }
        entry.turns.push(ConversationTurn::user(question));
        entry.turns.push(ConversationTurn::assistant(answer));
        let excess = entry.turns.len().saturating_sub(MAX_HISTORY_TURNS);
        entry.turns.drain(..excess);
    }

    /// Empty the session's history. Idempotent.
    pub fn clear_history(&self, session: &str) {
        let mut sessions = self.lock();
        let entry = sessions.entry(session.to_string()).or_default();
        entry.turns.clear();
        entry.epoch += 1;
        info!("conversation history cleared");
    }

    /// Copy of the session's history, oldest first.
    pub fn history(&self, session: &str) -> Vec<ConversationTurn> {
        self.snapshot(session).0
    }
}
