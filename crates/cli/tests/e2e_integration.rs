//! End-to-end tests for the Aide exchange pipeline.
//!
//! These tests build the assistant from configuration, exactly as the CLI
//! does, against a local mock of an OpenAI-compatible chat endpoint and real
//! on-disk knowledge and Obsidian folders.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use aide_agent::{
    Assistant, BUSY_MESSAGE, EMPTY_MESSAGE, PromptAssembler, ToolRouter, ToolSpec, Trigger,
};
use aide_config::AppConfig;
use aide_core::context::{ContextProvider, ContextResult};
use aide_core::error::{ProviderError, SynthesisError};
use aide_core::synthesizer::{Completion, PromptRequest, Synthesizer};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};

// ── Mock chat endpoint ───────────────────────────────────────────────────

#[derive(Clone, Default)]
struct MockLlm {
    requests: Arc<Mutex<Vec<Value>>>,
    fail_with: Arc<Mutex<Option<u16>>>,
}

impl MockLlm {
    fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }

    fn fail_next(&self, status: u16) {
        *self.fail_with.lock().unwrap() = Some(status);
    }

    /// The `messages` array of the n-th request.
    fn messages(&self, n: usize) -> Vec<Value> {
        self.requests()[n]["messages"].as_array().unwrap().clone()
    }
}

async fn chat_completions(
    State(mock): State<MockLlm>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let n = {
        let mut requests = mock.requests.lock().unwrap();
        requests.push(body);
        requests.len()
    };

    if let Some(status) = mock.fail_with.lock().unwrap().take() {
        return (
            StatusCode::from_u16(status).unwrap(),
            Json(json!({"error": {"message": "upstream exploded"}})),
        );
    }

    (
        StatusCode::OK,
        Json(json!({
            "model": "mock-model",
            "choices": [{"message": {"role": "assistant", "content": format!("answer #{n}")}}],
            "usage": {"prompt_tokens": 20, "completion_tokens": 3, "total_tokens": 23}
        })),
    )
}

async fn start_mock() -> (MockLlm, String) {
    let mock = MockLlm::default();
    let app = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .with_state(mock.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (mock, format!("http://{addr}/v1"))
}

// ── Fixture ──────────────────────────────────────────────────────────────

struct Fixture {
    mock: MockLlm,
    assistant: Assistant,
    _vault: tempfile::TempDir,
    _knowledge: tempfile::TempDir,
}

async fn fixture(memory_capacity: usize) -> Fixture {
    let (mock, base_url) = start_mock().await;

    let vault = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(vault.path().join("lang")).unwrap();
    std::fs::write(
        vault.path().join("lang/Rust.md"),
        "Rust ownership: every value has a single owner.",
    )
    .unwrap();
    std::fs::write(vault.path().join("Groceries.md"), "milk, eggs").unwrap();

    let knowledge = tempfile::tempdir().unwrap();
    std::fs::write(knowledge.path().join("Resume.md"), "Five years of Rust.").unwrap();

    let mut config = AppConfig::default();
    config.llm.provider = "openai".into();
    config.llm.api_key = Some("test-key".into());
    config.llm.api_url = Some(base_url);
    config.llm.model = "mock-model".into();
    config.memory.capacity = memory_capacity;
    config.calendar.enabled = false;
    config.notion.api_key = None;
    config.obsidian.vault_path = Some(vault.path().display().to_string());
    config.knowledge.dir = knowledge.path().display().to_string();

    let assistant = Assistant::from_config(&config).unwrap();
    Fixture {
        mock,
        assistant,
        _vault: vault,
        _knowledge: knowledge,
    }
}

fn context_message(messages: &[Value]) -> Option<String> {
    messages
        .iter()
        .filter(|m| m["role"] == "system")
        .filter_map(|m| m["content"].as_str())
        .find(|c| c.starts_with("Use the following context"))
        .map(str::to_string)
}

// ── Tests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn unconfigured_sources_are_not_registered() {
    let f = fixture(8).await;
    assert_eq!(f.assistant.tool_names(), vec!["obsidian", "knowledge_file"]);
}

#[tokio::test]
async fn obsidian_question_carries_note_context() {
    let f = fixture(8).await;

    let answer = f
        .assistant
        .process_command("What do my notes say about Rust ownership?")
        .await;
    assert_eq!(answer, "answer #1");

    let messages = f.mock.messages(0);
    let context = context_message(&messages).expect("context block");
    assert!(context.contains("--- Obsidian ---"));
    assert!(context.contains("single owner"));
    assert!(!context.contains("milk"));

    let last = messages.last().unwrap();
    assert_eq!(last["role"], "user");
    assert_eq!(last["content"], "What do my notes say about Rust ownership?");
}

#[tokio::test]
async fn knowledge_file_is_read_into_context() {
    let f = fixture(8).await;

    f.assistant.process_command("read Resume.md").await;

    let context = context_message(&f.mock.messages(0)).expect("context block");
    assert!(context.contains("Knowledge file 'Resume.md'"));
    assert!(context.contains("Five years of Rust."));
}

#[tokio::test]
async fn missing_knowledge_file_is_reported_to_the_model() {
    let f = fixture(8).await;

    f.assistant.process_command("read nothing-here.txt").await;

    let context = context_message(&f.mock.messages(0)).expect("context block");
    assert!(context.contains("no file named 'nothing-here.txt'"));
}

#[tokio::test]
async fn small_talk_has_no_context_block() {
    let f = fixture(8).await;

    let answer = f.assistant.process_command("hello there").await;
    assert_eq!(answer, "answer #1");

    let messages = f.mock.messages(0);
    assert!(context_message(&messages).is_none());
    assert_eq!(messages.len(), 2);
}

#[tokio::test]
async fn memory_is_replayed_and_bounded() {
    let f = fixture(4).await;

    for question in ["one", "two", "three"] {
        f.assistant.process_command(question).await;
    }

    // system + 4 memory turns + question
    let messages = f.mock.messages(2);
    assert_eq!(messages.len(), 6);
    assert_eq!(messages[1]["content"], "one");
    assert_eq!(messages[2]["content"], "answer #1");
    assert_eq!(messages[5]["content"], "three");

    let memory = f.assistant.memory_snapshot().unwrap();
    assert_eq!(memory.len(), 4);
    assert_eq!(memory[0].text(), "two");
    assert_eq!(memory[3].text(), "answer #3");
}

#[tokio::test]
async fn model_failure_is_surfaced_and_not_remembered() {
    let f = fixture(8).await;

    f.assistant.process_command("first").await;
    f.mock.fail_next(500);
    let answer = f.assistant.process_command("second").await;

    assert!(!answer.is_empty());
    assert!(answer.contains("upstream exploded") || answer.contains("500"));

    let memory = f.assistant.memory_snapshot().unwrap();
    assert_eq!(memory.len(), 2);
    assert_eq!(memory[0].text(), "first");

    // The next exchange only sees the successful one
    f.assistant.process_command("third").await;
    assert_eq!(f.mock.messages(2).len(), 4);
}

#[tokio::test]
async fn rejected_credentials_get_a_friendly_message() {
    let f = fixture(8).await;
    f.mock.fail_next(401);

    let answer = f.assistant.process_command("hello").await;
    assert!(answer.contains("API key"));
}

#[tokio::test]
async fn empty_command_never_reaches_the_model() {
    let f = fixture(8).await;

    assert_eq!(f.assistant.process_command("  \n ").await, EMPTY_MESSAGE);
    assert!(f.mock.requests().is_empty());
}

#[tokio::test]
async fn snapshot_without_sources_still_answers() {
    let f = fixture(8).await;

    let answer = f.assistant.get_snapshot().await;
    assert_eq!(answer, "answer #1");
    assert!(context_message(&f.mock.messages(0)).is_none());
}

// ── Timeouts and concurrency with scripted parts ─────────────────────────

struct Stalled;

#[async_trait::async_trait]
impl ContextProvider for Stalled {
    fn name(&self) -> &str {
        "calendar"
    }
    fn source_name(&self) -> &str {
        "Calendar"
    }
    async fn fetch(&self, _query: &str) -> Result<ContextResult, ProviderError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(ContextResult::found("Calendar", "stale"))
    }
}

struct Echo {
    seen: Mutex<Vec<PromptRequest>>,
    delay: Duration,
}

#[async_trait::async_trait]
impl Synthesizer for Echo {
    fn name(&self) -> &str {
        "echo"
    }
    async fn complete(&self, request: &PromptRequest) -> Result<Completion, SynthesisError> {
        self.seen.lock().unwrap().push(request.clone());
        tokio::time::sleep(self.delay).await;
        Ok(Completion {
            text: format!("echo: {}", request.user_question),
            model: "echo".into(),
            usage: None,
        })
    }
}

fn scripted_assistant(delay: Duration) -> (Arc<Assistant>, Arc<Echo>) {
    let echo = Arc::new(Echo {
        seen: Mutex::new(Vec::new()),
        delay,
    });
    let router = ToolRouter::new().with(ToolSpec::new(
        Arc::new(Stalled),
        vec![Trigger::contains("calendar")],
    ));
    let assistant = Assistant::new(
        router,
        echo.clone(),
        PromptAssembler::new("You are Aide.", 4000),
        8,
    )
    .with_provider_timeout(Duration::from_secs(15));
    (Arc::new(assistant), echo)
}

#[tokio::test(start_paused = true)]
async fn stalled_provider_times_out_and_answer_continues() {
    let (assistant, echo) = scripted_assistant(Duration::ZERO);

    let answer = assistant.process_command("what's on my calendar").await;
    assert_eq!(answer, "echo: what's on my calendar");

    let seen = echo.seen.lock().unwrap();
    assert!(seen[0].context.is_none());
}

#[tokio::test(start_paused = true)]
async fn second_question_during_an_exchange_is_busy() {
    let (assistant, echo) = scripted_assistant(Duration::from_secs(5));

    let first = tokio::spawn({
        let assistant = Arc::clone(&assistant);
        async move { assistant.process_command("first question").await }
    });
    // Let the first exchange reach the synthesizer
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(assistant.process_command("second question").await, BUSY_MESSAGE);
    assert_eq!(first.await.unwrap(), "echo: first question");

    assert_eq!(echo.seen.lock().unwrap().len(), 1);
    let memory = assistant.memory_snapshot().unwrap();
    assert_eq!(memory.len(), 2);
    assert_eq!(memory[0].text(), "first question");
}
