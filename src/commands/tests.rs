use super::*;
use async_trait::async_trait;
use chatter_core::{
    context::{ModelRequest, WorkspaceSnapshot},
    traits::{ModelBackend, ModelReply},
};
use std::sync::Mutex;
use std::time::Duration;

/// Channel that records everything it is asked to send.
#[derive(Default)]
struct RecordingChannel {
    sent: Arc<Mutex<Vec<OutgoingMessage>>>,
    typing: Arc<Mutex<Vec<i64>>>,
    fail_sends: bool,
}

#[async_trait]
impl Channel for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, message: OutgoingMessage) -> Result<(), ChatterError> {
        if self.fail_sends {
            return Err(ChatterError::Channel("telegram API error: 400 - nope".into()));
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn send_typing(&self, chat_id: i64) -> Result<(), ChatterError> {
        self.typing.lock().unwrap().push(chat_id);
        Ok(())
    }

    async fn identity(&self) -> Option<String> {
        Some("@chatter_bot".into())
    }
}

/// Backend returning a fixed answer and counting calls.
struct FixedBackend {
    answer: String,
    calls: Arc<Mutex<u32>>,
}

#[async_trait]
impl ModelBackend for FixedBackend {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn complete(&self, _request: &ModelRequest) -> Result<ModelReply, ChatterError> {
        *self.calls.lock().unwrap() += 1;
        Ok(ModelReply {
            text: self.answer.clone(),
            ..Default::default()
        })
    }
}

struct PanickingBackend;

#[async_trait]
impl ModelBackend for PanickingBackend {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn complete(&self, _request: &ModelRequest) -> Result<ModelReply, ChatterError> {
        panic!("backend exploded");
    }
}

struct NamedWorkspace;

#[async_trait]
impl WorkspaceContextProvider for NamedWorkspace {
    fn workspace_name(&self) -> Option<String> {
        Some("my_project".into())
    }

    fn active_file(&self) -> Option<String> {
        Some("src/main.rs".into())
    }

    async fn current_context(&self) -> Option<WorkspaceSnapshot> {
        None
    }
}

struct Harness {
    router: CommandRouter,
    bridge: Arc<ModelBridge>,
    sent: Arc<Mutex<Vec<OutgoingMessage>>>,
    typing: Arc<Mutex<Vec<i64>>>,
    calls: Arc<Mutex<u32>>,
}

fn harness_with(backend: Option<Arc<dyn ModelBackend>>, calls: Arc<Mutex<u32>>) -> Harness {
    let channel = RecordingChannel::default();
    let sent = channel.sent.clone();
    let typing = channel.typing.clone();
    let bridge = Arc::new(ModelBridge::new(
        backend,
        None,
        String::new(),
        Duration::from_secs(5),
    ));
    let router = CommandRouter::new(
        bridge.clone(),
        Arc::new(channel),
        Some(Arc::new(NamedWorkspace)),
    );
    Harness {
        router,
        bridge,
        sent,
        typing,
        calls,
    }
}

fn harness(answer: &str) -> Harness {
    let calls = Arc::new(Mutex::new(0));
    let backend = FixedBackend {
        answer: answer.to_string(),
        calls: calls.clone(),
    };
    harness_with(Some(Arc::new(backend)), calls)
}

fn text_update(text: &str) -> Update {
    serde_json::from_value(serde_json::json!({
        "update_id": 1,
        "message": {
            "message_id": 1,
            "from": {"id": 42, "is_bot": false, "first_name": "Ada"},
            "chat": {"id": 4200, "type": "private"},
            "text": text
        }
    }))
    .unwrap()
}

fn sent_texts(h: &Harness) -> Vec<String> {
    h.sent.lock().unwrap().iter().map(|m| m.text.clone()).collect()
}

#[test]
fn test_parse_all_commands() {
    assert_eq!(Command::parse("/start"), Some(Command::Start));
    assert_eq!(Command::parse("/help"), Some(Command::Help));
    assert_eq!(Command::parse("/ask what?"), Some(Command::Ask));
    assert_eq!(Command::parse("/context why?"), Some(Command::Context));
    assert_eq!(Command::parse("/clear"), Some(Command::Clear));
    assert_eq!(Command::parse("/status"), Some(Command::Status));
}

#[test]
fn test_parse_strips_bot_suffix() {
    assert_eq!(Command::parse("/ask@chatter_bot hi"), Some(Command::Ask));
    assert_eq!(Command::parse("/help@chatter_bot"), Some(Command::Help));
}

#[test]
fn test_parse_unknown_and_free_text() {
    assert_eq!(Command::parse("/asking"), None);
    assert_eq!(Command::parse("/nope"), None);
    assert_eq!(Command::parse("hello there"), None);
    assert_eq!(Command::parse(""), None);
}

#[test]
fn test_argument_extraction() {
    assert_eq!(argument("/ask What is 2+2?"), "What is 2+2?");
    assert_eq!(argument("/ask   padded  "), "padded");
    assert_eq!(argument("/ask"), "");
    assert_eq!(argument("/ask   "), "");
    assert_eq!(argument("/ask\nmultiline\nquestion"), "multiline\nquestion");
}

#[tokio::test]
async fn test_ask_sends_escaped_answer() {
    let h = harness("Use `x.y()` here.\n```rust\nlet a = b.c();\n```");
    h.router.dispatch(&text_update("/ask How?")).await.unwrap();

    let sent = h.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].chat_id, 4200);
    assert_eq!(sent[0].parse_mode, Some(ParseMode::MarkdownV2));
    assert_eq!(
        sent[0].text,
        "Use \\`x\\.y\\(\\)\\` here\\.\n```rust\nlet a = b.c();\n```"
    );
    assert_eq!(*h.typing.lock().unwrap(), vec![4200]);
    assert_eq!(h.bridge.history("42").len(), 2);
}

#[tokio::test]
async fn test_ask_without_question_sends_usage_hint() {
    let h = harness("unused");
    h.router.dispatch(&text_update("/ask")).await.unwrap();
    h.router.dispatch(&text_update("/context   ")).await.unwrap();

    let texts = sent_texts(&h);
    assert_eq!(texts.len(), 2);
    assert!(texts[0].contains("Please provide a question"));
    assert!(texts[0].contains("Example: /ask "));
    assert!(texts[1].contains("Example: /context "));
    assert_eq!(*h.calls.lock().unwrap(), 0);
    assert!(h.typing.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_ask_without_backend_replies_not_available() {
    let h = harness_with(None, Arc::new(Mutex::new(0)));
    h.router
        .dispatch(&text_update("/ask What is 2+2?"))
        .await
        .unwrap();

    let sent = h.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text.starts_with("⚠️ *Error*\n\n"));
    assert!(sent[0].text.contains("not available"));
    assert_eq!(sent[0].parse_mode, Some(ParseMode::MarkdownV2));
    assert!(h.bridge.history("42").is_empty());
}

#[tokio::test]
async fn test_long_answer_is_chunked_in_order() {
    let answer = (0..400)
        .map(|i| format!("line number {i:04} with some padding text"))
        .collect::<Vec<_>>()
        .join("\n");
    let h = harness(&answer);
    h.router.dispatch(&text_update("/ask dump")).await.unwrap();

    let texts = sent_texts(&h);
    assert!(texts.len() >= 4, "got {} chunks", texts.len());
    for t in &texts {
        assert!(t.chars().count() <= CHUNK_SIZE);
    }
    assert_eq!(texts.join("\n"), escape_preserving_code(&answer));
    assert!(texts[0].starts_with("line number 0000"));
}

#[tokio::test]
async fn test_answer_at_limit_is_single_message() {
    let answer = "a".repeat(TELEGRAM_MAX_MESSAGE_CHARS);
    let h = harness(&answer);
    h.router.dispatch(&text_update("/ask max")).await.unwrap();
    assert_eq!(sent_texts(&h), vec![answer]);
}

#[tokio::test]
async fn test_empty_answer_gets_placeholder() {
    let h = harness("   ");
    h.router.dispatch(&text_update("/ask anything")).await.unwrap();
    assert_eq!(sent_texts(&h), vec![EMPTY_ANSWER.to_string()]);
}

#[tokio::test]
async fn test_context_does_not_touch_history() {
    let h = harness("ok");
    h.router
        .dispatch(&text_update("/context explain"))
        .await
        .unwrap();
    assert_eq!(*h.calls.lock().unwrap(), 1);
    assert!(h.bridge.history("42").is_empty());
}

#[tokio::test]
async fn test_clear_empties_history_and_confirms() {
    let h = harness("ok");
    h.router.dispatch(&text_update("/ask one")).await.unwrap();
    h.router.dispatch(&text_update("/ask two")).await.unwrap();
    assert_eq!(h.bridge.history("42").len(), 4);

    h.router.dispatch(&text_update("/clear")).await.unwrap();
    assert!(h.bridge.history("42").is_empty());
    assert_eq!(sent_texts(&h).last().unwrap(), CLEARED);
}

#[tokio::test]
async fn test_status_reports_without_model_call() {
    let h = harness("unused");
    h.router.dispatch(&text_update("/status")).await.unwrap();

    let sent = h.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let text = &sent[0].text;
    assert!(text.contains("*Chatter Status*"));
    assert!(text.contains("Bot: @chatter\\_bot"));
    assert!(text.contains("Backend: fixed"));
    assert!(text.contains("Workspace: my\\_project"));
    assert!(text.contains("Active File: src/main\\.rs"));
    assert!(text.contains("Uptime: 0h 0m"));
    assert_eq!(*h.calls.lock().unwrap(), 0);
}

#[tokio::test]
async fn test_start_and_help_are_markdown_v2() {
    let h = harness("unused");
    h.router.dispatch(&text_update("/start")).await.unwrap();
    h.router
        .dispatch(&text_update("/help@chatter_bot"))
        .await
        .unwrap();

    let sent = h.sent.lock().unwrap();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].text.contains("Chatter Connected"));
    assert!(sent[1].text.contains("Chatter Help"));
    assert!(sent
        .iter()
        .all(|m| m.parse_mode == Some(ParseMode::MarkdownV2)));
}

#[tokio::test]
async fn test_unknown_command_and_free_text() {
    let h = harness("unused");
    h.router.dispatch(&text_update("/bogus")).await.unwrap();
    h.router.dispatch(&text_update("just chatting")).await.unwrap();

    let texts = sent_texts(&h);
    assert_eq!(texts, vec![UNKNOWN_COMMAND.to_string(), FREE_TEXT_TIP.to_string()]);
    assert_eq!(*h.calls.lock().unwrap(), 0);
}

#[tokio::test]
async fn test_update_without_text_is_ignored() {
    let h = harness("unused");
    let update: Update = serde_json::from_value(serde_json::json!({
        "update_id": 2,
        "callback_query": {"id": "cb", "from": {"id": 42, "first_name": "Ada"}}
    }))
    .unwrap();
    h.router.dispatch(&update).await.unwrap();
    assert!(h.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_backend_panic_becomes_generic_reply() {
    let h = harness_with(Some(Arc::new(PanickingBackend)), Arc::new(Mutex::new(0)));
    h.router.dispatch(&text_update("/ask boom")).await.unwrap();
    assert_eq!(sent_texts(&h), vec![GENERIC_FAILURE.to_string()]);
    assert!(h.bridge.history("42").is_empty());
}

#[tokio::test]
async fn test_send_failure_propagates() {
    let channel = RecordingChannel {
        fail_sends: true,
        ..Default::default()
    };
    let bridge = Arc::new(ModelBridge::new(
        None,
        None,
        String::new(),
        Duration::from_secs(1),
    ));
    let router = CommandRouter::new(bridge, Arc::new(channel), None);
    let err = router
        .dispatch(&text_update("/start"))
        .await
        .unwrap_err();
    assert!(matches!(err, ChatterError::Channel(_)));
}
