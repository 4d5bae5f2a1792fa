//! Ollama provider implementation.
//!
//! Talks to the native Ollama API rather than its OpenAI-compatible shim,
//! because only the native API accepts the hardware options
//! (`num_thread`, `num_gpu`) alongside sampling settings.
//!
//! Supports:
//! - `POST /api/generate` (whole response and NDJSON streaming)
//! - `GET /api/tags` for model listing and health checks

use async_trait::async_trait;
use futures::StreamExt;
use llamachat_core::error::ProviderError;
use llamachat_core::provider::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

/// A provider backed by a local Ollama server.
pub struct OllamaProvider {
    name: String,
    base_url: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    /// Create a provider for the server at `base_url` (e.g. `http://localhost:11434`).
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| ProviderError::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            name: "ollama".into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request_body(request: &GenerateRequest, stream: bool) -> ApiGenerateRequest<'_> {
        ApiGenerateRequest {
            model: &request.model,
            prompt: &request.prompt,
            stream,
            options: &request.options,
        }
    }

    async fn send(&self, request: &GenerateRequest, stream: bool) -> Result<reqwest::Response, ProviderError> {
        let url = format!("{}/api/generate", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&Self::request_body(request, stream))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 404 {
            return Err(ProviderError::ModelNotFound(request.model.clone()));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Ollama returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: api_error_message(&error_body),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl llamachat_core::Provider for OllamaProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: GenerateRequest,
    ) -> std::result::Result<GenerateResponse, ProviderError> {
        debug!(provider = %self.name, model = %request.model, prompt_chars = request.prompt.len(), "Sending generate request");

        let response = self.send(&request, false).await?;

        let api_response: ApiGenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        if let Some(error) = api_response.error {
            return Err(ProviderError::ApiError {
                status_code: 200,
                message: error,
            });
        }

        let usage = api_response.usage();
        Ok(GenerateResponse {
            text: api_response.response,
            model: api_response.model.unwrap_or(request.model),
            usage,
        })
    }

    async fn stream(
        &self,
        request: GenerateRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<StreamChunk, ProviderError>>,
        ProviderError,
    > {
        debug!(provider = %self.name, model = %request.model, "Sending streaming generate request");

        let response = self.send(&request, true).await?;

        let (tx, rx) = tokio::sync::mpsc::channel(64);
        let provider_name = self.name.clone();

        // Read the NDJSON byte stream; one JSON object per line
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut buffer: Vec<u8> = Vec::new();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                buffer.extend_from_slice(&bytes);

                while let Some(line_end) = buffer.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=line_end).collect();
                    let line = String::from_utf8_lossy(&line);

                    match parse_stream_line(&line) {
                        None => continue,
                        Some(Ok(chunk)) => {
                            let done = chunk.done;
                            if tx.send(Ok(chunk)).await.is_err() {
                                return; // receiver dropped
                            }
                            if done {
                                return;
                            }
                        }
                        Some(Err(e)) => {
                            trace!(provider = %provider_name, error = %e, "Stream reported an error");
                            let _ = tx.send(Err(e)).await;
                            return;
                        }
                    }
                }
            }

            // Trailing line without a newline
            let line = String::from_utf8_lossy(&buffer).into_owned();
            match parse_stream_line(&line) {
                Some(Ok(chunk)) if chunk.done => {
                    let _ = tx.send(Ok(chunk)).await;
                }
                Some(Err(e)) => {
                    let _ = tx.send(Err(e)).await;
                }
                _ => {
                    let _ = tx
                        .send(Err(ProviderError::StreamInterrupted(
                            "stream ended before completion".into(),
                        )))
                        .await;
                }
            }
        });

        Ok(rx)
    }

    async fn list_models(&self) -> std::result::Result<Vec<String>, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Ok(Vec::new());
        }

        let tags: ApiTagsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }
}

/// Parse one NDJSON line of a streaming response.
///
/// Returns `None` for blank or unparseable lines.
fn parse_stream_line(line: &str) -> Option<Result<StreamChunk, ProviderError>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let parsed: ApiGenerateResponse = match serde_json::from_str(line) {
        Ok(p) => p,
        Err(e) => {
            trace!(data = %line, error = %e, "Ignoring unparseable stream line");
            return None;
        }
    };

    if let Some(error) = parsed.error {
        return Some(Err(ProviderError::StreamInterrupted(error)));
    }

    let usage = parsed.usage();
    Some(Ok(StreamChunk {
        content: (!parsed.response.is_empty()).then_some(parsed.response),
        done: parsed.done,
        usage,
    }))
}

/// Ollama error bodies look like `{"error": "..."}`; fall back to the raw body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| body.to_string())
}

// --- Ollama API types (internal) ---

#[derive(Debug, Serialize)]
struct ApiGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: &'a RuntimeOptions,
}

#[derive(Debug, Deserialize)]
struct ApiGenerateResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
    #[serde(default)]
    error: Option<String>,
}

impl ApiGenerateResponse {
    fn usage(&self) -> Option<Usage> {
        match (self.prompt_eval_count, self.eval_count) {
            (None, None) => None,
            (p, c) => Some(Usage {
                prompt_tokens: p.unwrap_or(0),
                completion_tokens: c.unwrap_or(0),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
struct ApiTagsResponse {
    #[serde(default)]
    models: Vec<ApiModel>,
}

#[derive(Debug, Deserialize)]
struct ApiModel {
    name: String,
}
