//! HTTP API v1: sessions and chat.
//!
//! Endpoints:
//!
//! - `POST   /v1/sessions`                   Create a session
//! - `GET    /v1/sessions/{id}`              Log, documents and settings
//! - `POST   /v1/sessions/{id}/chat`         Multipart message + files, whole reply
//! - `POST   /v1/sessions/{id}/chat/stream`  Same input, SSE reply
//! - `POST   /v1/sessions/{id}/reset`        Reset the conversation log
//! - `DELETE /v1/sessions/{id}/documents`    Clear the context store
//! - `GET    /v1/sessions/{id}/settings`     Current settings
//! - `PATCH  /v1/sessions/{id}/settings`     Adjust temperature / max tokens
//! - `GET    /v1/sessions/{id}/questions`    Questions asked in this session

use axum::{
    Router,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Json,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    routing::{get, post},
};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;

use llamachat_chat::{AssemblyStats, ChatPipeline, FileWarning, InvocationMode, UserInput};
use llamachat_core::{Role, Session, SessionError, Settings, SettingsUpdate};
use llamachat_documents::UploadedFile;

use crate::sessions::{SessionStore, SharedSession};

// ── State ─────────────────────────────────────────────────────────────────

/// Shared state for the v1 API.
pub struct ApiState {
    pub pipeline: Arc<ChatPipeline>,
    pub sessions: SessionStore,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

pub type SharedApiState = Arc<ApiState>;

// ── Router ────────────────────────────────────────────────────────────────

/// Build the v1 API router. Nest this under "/v1" in the main router.
pub fn v1_router(state: SharedApiState) -> Router {
    Router::new()
        .route("/sessions", post(create_session_handler))
        .route("/sessions/{id}", get(get_session_handler))
        .route("/sessions/{id}/chat", post(chat_handler))
        .route("/sessions/{id}/chat/stream", post(chat_stream_handler))
        .route("/sessions/{id}/reset", post(reset_handler))
        .route(
            "/sessions/{id}/documents",
            axum::routing::delete(clear_documents_handler),
        )
        .route(
            "/sessions/{id}/settings",
            get(get_settings_handler).patch(update_settings_handler),
        )
        .route("/sessions/{id}/questions", get(questions_handler))
        .with_state(state)
}

// ── Response types ────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

impl From<SessionError> for ErrorResponse {
    fn from(e: SessionError) -> Self {
        Self {
            error: e.to_string(),
        }
    }
}

#[derive(Serialize)]
struct TurnDto {
    role: Role,
    content: String,
    timestamp: String,
}

#[derive(Serialize)]
struct DocumentDto {
    id: String,
    chars: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pages: Option<usize>,
}

#[derive(Serialize)]
struct SessionResponse {
    id: String,
    created_at: String,
    turns: Vec<TurnDto>,
    documents: Vec<DocumentDto>,
    settings: Settings,
}

impl From<&Session> for SessionResponse {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id.to_string(),
            created_at: session.created_at.to_rfc3339(),
            turns: session
                .log
                .turns()
                .iter()
                .map(|t| TurnDto {
                    role: t.role,
                    content: t.content.clone(),
                    timestamp: t.timestamp.to_rfc3339(),
                })
                .collect(),
            documents: session
                .context
                .iter()
                .map(|d| DocumentDto {
                    id: d.id.clone(),
                    chars: d.char_count(),
                    pages: d.pages,
                })
                .collect(),
            settings: session.settings.clone(),
        }
    }
}

#[derive(Serialize)]
struct ChatResponse {
    user_text: String,
    response: String,
    fallback: bool,
    attached: Vec<String>,
    warnings: Vec<FileWarning>,
    skipped: Vec<String>,
    prompt: AssemblyStats,
}

#[derive(Serialize)]
struct ClearedResponse {
    cleared: usize,
}

#[derive(Serialize)]
struct QuestionsResponse {
    questions: Vec<String>,
}

// ── Helpers ───────────────────────────────────────────────────────────────

async fn find_session(state: &ApiState, id: &str) -> Result<SharedSession, ApiError> {
    state
        .sessions
        .get(id)
        .await
        .map_err(|e| (StatusCode::NOT_FOUND, Json(e.into())))
}

/// Read `message` and `files` parts. Unknown parts are ignored.
async fn read_chat_form(mut multipart: Multipart) -> Result<UserInput, ApiError> {
    let mut input = UserInput::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("Invalid form data: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "message" => {
                input.message = field.text().await.map_err(|e| {
                    api_error(StatusCode::BAD_REQUEST, format!("Invalid message field: {e}"))
                })?;
            }
            "files" | "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let mime = field.content_type().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    api_error(StatusCode::BAD_REQUEST, format!("Failed to read {file_name}: {e}"))
                })?;
                input.files.push(UploadedFile::new(file_name, mime, bytes.to_vec()));
            }
            _ => {}
        }
    }

    if input.is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "A message or at least one file is required",
        ));
    }
    Ok(input)
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn create_session_handler(
    State(state): State<SharedApiState>,
) -> (StatusCode, Json<SessionResponse>) {
    let (_, session) = state.sessions.create().await;
    let session = session.lock().await;
    (StatusCode::CREATED, Json(SessionResponse::from(&*session)))
}

async fn get_session_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = find_session(&state, &id).await?;
    let session = session.lock().await;
    Ok(Json(SessionResponse::from(&*session)))
}

async fn chat_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<ChatResponse>, ApiError> {
    let session = find_session(&state, &id).await?;
    let input = read_chat_form(multipart).await?;
    info!(session = %id, files = input.files.len(), "v1 chat request");

    let mut session = session.lock().await;
    let outcome = state
        .pipeline
        .respond(&mut session, input, InvocationMode::Whole)
        .await;

    Ok(Json(ChatResponse {
        user_text: outcome.user_text,
        response: outcome.response,
        fallback: outcome.fallback,
        attached: outcome.attached,
        warnings: outcome.warnings,
        skipped: outcome.skipped,
        prompt: outcome.prompt.stats,
    }))
}

async fn chat_stream_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>>>, ApiError> {
    let session = find_session(&state, &id).await?;
    let input = read_chat_form(multipart).await?;
    info!(session = %id, files = input.files.len(), "v1 chat/stream SSE request");

    let guard = session.lock_owned().await;
    let rx = state.pipeline.respond_streaming(guard, input);

    let stream = ReceiverStream::new(rx).map(|event| {
        let event_type = event.event_type().to_string();
        let data = serde_json::to_string(&event).unwrap_or_default();
        Ok(SseEvent::default().event(event_type).data(data))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

async fn reset_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = find_session(&state, &id).await?;
    let mut session = session.lock().await;
    session.log.reset();
    session.touch();
    info!(session = %id, "Conversation reset");
    Ok(Json(SessionResponse::from(&*session)))
}

async fn clear_documents_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
) -> Result<Json<ClearedResponse>, ApiError> {
    let session = find_session(&state, &id).await?;
    let mut session = session.lock().await;
    let cleared = session.context.len();
    session.context.clear();
    info!(session = %id, cleared, "Context cleared");
    Ok(Json(ClearedResponse { cleared }))
}

async fn get_settings_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
) -> Result<Json<Settings>, ApiError> {
    let session = find_session(&state, &id).await?;
    let session = session.lock().await;
    Ok(Json(session.settings.clone()))
}

async fn update_settings_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<Settings>, ApiError> {
    let session = find_session(&state, &id).await?;
    let mut session = session.lock().await;
    session
        .settings
        .apply(&update)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
    info!(
        session = %id,
        temperature = session.settings.temperature,
        max_tokens = session.settings.max_tokens,
        "Settings updated"
    );
    Ok(Json(session.settings.clone()))
}

async fn questions_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
) -> Result<Json<QuestionsResponse>, ApiError> {
    let session = find_session(&state, &id).await?;
    let session = session.lock().await;
    Ok(Json(QuestionsResponse {
        questions: session.questions.clone(),
    }))
}

// ── Tests ─────────────────────────────────────────────────────────────────
