//! End-to-end tests for LlamaChat.
//!
//! These drive the whole per-message pipeline (extraction, context store,
//! assembly, invocation, conversation log, question log) with a scripted
//! provider, both directly and through the HTTP gateway.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use llamachat_chat::{
    ChatPipeline, FALLBACK_MESSAGE, InvocationMode, ModelInvoker, QuestionLog, UserInput,
};
use llamachat_config::AppConfig;
use llamachat_core::error::ProviderError;
use llamachat_core::provider::{GenerateRequest, GenerateResponse, Provider};
use llamachat_core::{Role, Session};
use llamachat_documents::UploadedFile;

// ── Mock Provider ────────────────────────────────────────────────────────

/// A mock provider that returns scripted responses in sequence and records prompts.
struct ScriptedProvider {
    responses: std::sync::Mutex<Vec<Result<String, ProviderError>>>,
    prompts: std::sync::Mutex<Vec<GenerateRequest>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<Result<String, ProviderError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: std::sync::Mutex::new(responses),
            prompts: std::sync::Mutex::new(Vec::new()),
        })
    }

    fn text(responses: &[&str]) -> Arc<Self> {
        Self::new(responses.iter().map(|r| Ok(r.to_string())).collect())
    }

    fn requests(&self) -> Vec<GenerateRequest> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: GenerateRequest) -> Result<GenerateResponse, ProviderError> {
        let call = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(request.clone());
            prompts.len() - 1
        };
        let responses = self.responses.lock().unwrap();
        let scripted = responses
            .get(call)
            .cloned()
            .unwrap_or_else(|| Ok("(no more scripted responses)".into()))?;
        Ok(GenerateResponse {
            text: scripted,
            model: request.model,
            usage: None,
        })
    }
}

fn pipeline(provider: Arc<ScriptedProvider>) -> ChatPipeline {
    ChatPipeline::new(ModelInvoker::new(provider, Duration::from_secs(10)))
}

fn text_file(name: &str, text: &str) -> UploadedFile {
    UploadedFile::new(name, "text/plain", text.as_bytes().to_vec())
}

// ── Pipeline ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn document_conversation_across_turns() {
    let provider = ScriptedProvider::text(&["It greets the world.", "Eleven characters."]);
    let pipeline = pipeline(provider.clone());
    let mut session = Session::default();

    let first = pipeline
        .respond(
            &mut session,
            UserInput::text("what does it say?").with_file(text_file("greeting.txt", "hello world")),
            InvocationMode::Whole,
        )
        .await;
    assert_eq!(first.response, "It greets the world.");

    let second = pipeline
        .respond(&mut session, UserInput::text("how long is it?"), InvocationMode::Whole)
        .await;
    assert_eq!(second.response, "Eleven characters.");

    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].prompt.contains("hello world"));
    assert!(requests[0].prompt.contains("what does it say?"));
    assert!(requests[1].prompt.contains("hello world"));
    assert!(requests[1].prompt.contains("how long is it?"));

    let roles: Vec<Role> = session.log.turns().iter().map(|t| t.role).collect();
    assert_eq!(
        roles,
        vec![Role::Assistant, Role::User, Role::Assistant, Role::User, Role::Assistant]
    );
}

#[tokio::test]
async fn settings_change_applies_to_later_turns() {
    let provider = ScriptedProvider::text(&["one", "two"]);
    let pipeline = pipeline(provider.clone());
    let mut session = Session::default();

    pipeline
        .respond(&mut session, UserInput::text("a"), InvocationMode::Whole)
        .await;
    session
        .settings
        .apply(&llamachat_core::SettingsUpdate {
            temperature: Some(0.1),
            max_tokens: Some(100),
        })
        .unwrap();
    pipeline
        .respond(&mut session, UserInput::text("b"), InvocationMode::Whole)
        .await;

    let requests = provider.requests();
    assert_eq!(requests[0].options.num_predict, Some(512));
    assert_eq!(requests[1].options.num_predict, Some(100));
    assert!((requests[1].options.temperature - 0.1).abs() < 1e-6);
}

#[tokio::test]
async fn failure_then_recovery() {
    let provider = ScriptedProvider::new(vec![
        Err(ProviderError::Network("connection refused".into())),
        Ok("Back online.".into()),
    ]);
    let pipeline = pipeline(provider);
    let mut session = Session::default();

    let failed = pipeline
        .respond(&mut session, UserInput::text("hello?"), InvocationMode::Whole)
        .await;
    assert!(failed.fallback);
    assert_eq!(session.log.last().unwrap().content, FALLBACK_MESSAGE);

    let ok = pipeline
        .respond(&mut session, UserInput::text("hello again"), InvocationMode::Whole)
        .await;
    assert!(!ok.fallback);
    assert_eq!(session.log.last().unwrap().content, "Back online.");
    assert_eq!(session.log.len(), 5);
}

#[tokio::test]
async fn reset_keeps_context_but_not_history() {
    let provider = ScriptedProvider::text(&["first", "second"]);
    let pipeline = pipeline(provider.clone());
    let mut session = Session::default();

    pipeline
        .respond(
            &mut session,
            UserInput::text("read this").with_file(text_file("facts.txt", "the sky is green")),
            InvocationMode::Whole,
        )
        .await;
    session.log.reset();
    assert_eq!(session.log.len(), 1);

    pipeline
        .respond(&mut session, UserInput::text("what colour is the sky?"), InvocationMode::Whole)
        .await;
    assert!(provider.requests()[1].prompt.contains("the sky is green"));
    assert_eq!(session.log.len(), 3);
}

#[tokio::test]
async fn questions_are_written_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let log = Arc::new(QuestionLog::new(dir.path().join("questions.txt")));
    let pipeline = pipeline(ScriptedProvider::text(&["a", "b"])).with_question_log(log.clone());
    let mut session = Session::default();

    pipeline
        .respond(&mut session, UserInput::text("first?"), InvocationMode::Whole)
        .await;
    pipeline
        .respond(
            &mut session,
            UserInput::default().with_file(text_file("x.txt", "x")),
            InvocationMode::Whole,
        )
        .await;

    assert_eq!(
        log.read_all().await.unwrap(),
        vec!["first?", llamachat_chat::UPLOAD_ONLY_TEXT]
    );
}

// ── Through the gateway ──────────────────────────────────────────────────

#[tokio::test]
async fn gateway_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.questions.path = Some(dir.path().join("questions.txt"));

    let provider = ScriptedProvider::text(&["Hello from the model."]);
    let pipeline = Arc::new(ChatPipeline::from_config(provider.clone(), &config));
    let state = llamachat_gateway::build_state(&config, pipeline);
    let app = llamachat_gateway::build_router(state, &config);

    let req = Request::builder()
        .method("POST")
        .uri("/v1/sessions")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let session: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let id = session["id"].as_str().unwrap();

    let payload = concat!(
        "--xyz\r\n",
        "Content-Disposition: form-data; name=\"message\"\r\n\r\n",
        "summarise please\r\n",
        "--xyz\r\n",
        "Content-Disposition: form-data; name=\"files\"; filename=\"report.txt\"\r\n",
        "Content-Type: text/plain\r\n\r\n",
        "quarterly numbers went up\r\n",
        "--xyz--\r\n",
    );
    let req = Request::builder()
        .method("POST")
        .uri(format!("/v1/sessions/{id}/chat"))
        .header("content-type", "multipart/form-data; boundary=xyz")
        .body(Body::from(payload))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let chat: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(chat["response"], "Hello from the model.");
    assert_eq!(chat["attached"][0], "report.txt");

    let prompt = &provider.requests()[0].prompt;
    assert!(prompt.contains("quarterly numbers went up"));
    assert!(prompt.contains("summarise please"));
    assert_eq!(provider.requests()[0].model, config.model);

    let saved = std::fs::read_to_string(dir.path().join("questions.txt")).unwrap();
    assert_eq!(saved, "summarise please\n");
}
