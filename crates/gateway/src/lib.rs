//! HTTP gateway for LlamaChat.
//!
//! Serves the embedded web UI and the v1 session API, and exposes a
//! health check for the gateway itself.
//!
//! Built on Axum.

pub mod api_v1;
pub mod frontend;
pub mod sessions;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::{Router, response::Json, routing::get};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use llamachat_chat::ChatPipeline;
use llamachat_config::AppConfig;

pub use api_v1::{ApiState, SharedApiState};
pub use sessions::SessionStore;

/// Build shared API state from the configuration and a pipeline.
pub fn build_state(config: &AppConfig, pipeline: Arc<ChatPipeline>) -> SharedApiState {
    Arc::new(ApiState {
        pipeline,
        sessions: SessionStore::new(
            config.gateway.max_sessions,
            config.session_settings(),
            config.greeting.clone(),
        ),
        start_time: chrono::Utc::now(),
    })
}

/// Build the full router: health, v1 API and the embedded UI.
///
/// Layers applied:
/// - CORS limited to the gateway's own origin
/// - Request body limit (`gateway.max_upload_bytes`)
/// - HTTP trace logging
pub fn build_router(state: SharedApiState, config: &AppConfig) -> Router {
    let origin = format!("http://{}:{}", config.gateway.host, config.gateway.port);
    let allow_origin = match HeaderValue::from_str(&origin) {
        Ok(value) => AllowOrigin::exact(value),
        Err(_) => {
            warn!(origin = %origin, "Gateway origin is not a valid header value; CORS disabled");
            AllowOrigin::list(Vec::<HeaderValue>::new())
        }
    };
    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_handler))
        .with_state(state.clone())
        .nest("/v1", api_v1::v1_router(state))
        .merge(frontend::frontend_router())
        .layer(DefaultBodyLimit::max(config.gateway.max_upload_bytes))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let provider = llamachat_providers::build_from_config(&config)?;
    let pipeline = Arc::new(ChatPipeline::from_config(provider, &config));
    let state = build_state(&config, pipeline);
    let app = build_router(state, &config);

    info!(addr = %addr, model = %config.model, ollama = %config.ollama_url, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    sessions: usize,
    uptime_secs: i64,
}

async fn health_handler(
    axum::extract::State(state): axum::extract::State<SharedApiState>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        sessions: state.sessions.len().await,
        uptime_secs: (chrono::Utc::now() - state.start_time).num_seconds(),
    })
}
