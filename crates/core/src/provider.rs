//! Provider trait: the abstraction over the model runtime.
//!
//! A Provider knows how to send a prompt to an LLM and get a response back,
//! either as a complete string or as a stream of text fragments.
//!
//! Implementations: Ollama (native API), scripted mocks in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ProviderError;

/// Sampling and hardware parameters forwarded to the runtime unmodified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeOptions {
    /// Temperature (0.0 = deterministic, 1.0 = creative)
    pub temperature: f32,

    /// CPU worker threads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_thread: Option<u32>,

    /// Number of layers / devices offloaded to the accelerator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_gpu: Option<u32>,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            temperature: 0.75,
            num_thread: None,
            num_gpu: None,
            num_predict: None,
        }
    }
}

/// A single prompt sent to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// The model to use (e.g., "llama3:8b")
    pub model: String,

    /// The fully assembled prompt
    pub prompt: String,

    #[serde(default)]
    pub options: RuntimeOptions,
}

/// A complete (non-streaming) response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// The generated text
    pub text: String,

    /// Which model actually responded
    pub model: String,

    /// Token usage statistics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// A single chunk in a streaming response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Partial content delta
    #[serde(default)]
    pub content: Option<String>,

    /// Whether this is the final chunk
    #[serde(default)]
    pub done: bool,

    /// Usage info (typically only in the final chunk)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// The core Provider trait.
///
/// The chat pipeline calls `complete()` or `stream()` without knowing which
/// runtime sits behind it.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "ollama").
    fn name(&self) -> &str;

    /// Send a prompt and get the complete response.
    async fn complete(&self, request: GenerateRequest) -> std::result::Result<GenerateResponse, ProviderError>;

    /// Send a prompt and get a stream of response chunks.
    ///
    /// Default implementation calls `complete()` and wraps the result as a single chunk.
    async fn stream(
        &self,
        request: GenerateRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<StreamChunk, ProviderError>>,
        ProviderError,
    > {
        let response = self.complete(request).await?;
        let (tx, rx) = tokio::sync::mpsc::channel(1);
        let _ = tx.send(Ok(StreamChunk {
            content: Some(response.text),
            done: true,
            usage: response.usage,
        })).await;
        Ok(rx)
    }

    /// List models available on the runtime.
    async fn list_models(&self) -> std::result::Result<Vec<String>, ProviderError> {
        Ok(Vec::new())
    }

    /// Health check: can we reach the runtime?
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}
