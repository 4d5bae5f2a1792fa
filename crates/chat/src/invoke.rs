//! Model invocation under a deadline.
//!
//! The caller picks [`InvocationMode::Whole`] or [`InvocationMode::Incremental`];
//! the result is an [`Invocation`] holding either the full text or a
//! [`FragmentStream`]. Every invocation is bounded by one deadline, measured
//! from the moment the request is issued; in incremental mode it covers the
//! whole stream, not each fragment.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::Stream;
use llamachat_core::{GenerateRequest, Provider, ProviderError, Settings};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Shown in place of a reply when the model runtime fails.
pub const FALLBACK_MESSAGE: &str = "I'm having trouble processing your request. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationMode {
    /// Block until the full response is available
    Whole,
    /// Yield text fragments as the runtime produces them
    Incremental,
}

impl InvocationMode {
    pub fn from_streaming(streaming: bool) -> Self {
        if streaming { Self::Incremental } else { Self::Whole }
    }
}

pub enum Invocation {
    Whole(String),
    Fragments(FragmentStream),
}

impl Invocation {
    /// The full response text, draining the stream if there is one.
    pub async fn into_text(self) -> Result<String, ProviderError> {
        match self {
            Self::Whole(text) => Ok(text),
            Self::Fragments(mut stream) => {
                let mut text = String::new();
                while let Some(fragment) = stream.next_fragment().await {
                    text.push_str(&fragment?);
                }
                Ok(text)
            }
        }
    }
}

/// In-order, finite, non-restartable sequence of response fragments.
///
/// Dropping the stream stops the task reading from the runtime.
pub struct FragmentStream {
    rx: mpsc::Receiver<Result<String, ProviderError>>,
    task: JoinHandle<()>,
}

impl FragmentStream {
    /// The next fragment, or `None` once the response is complete.
    ///
    /// An `Err` item is always the last one.
    pub async fn next_fragment(&mut self) -> Option<Result<String, ProviderError>> {
        self.rx.recv().await
    }
}

impl Stream for FragmentStream {
    type Item = Result<String, ProviderError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for FragmentStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Sends prompts to a provider with the session's settings.
#[derive(Clone)]
pub struct ModelInvoker {
    provider: Arc<dyn Provider>,
    deadline: Duration,
}

impl ModelInvoker {
    pub fn new(provider: Arc<dyn Provider>, deadline: Duration) -> Self {
        Self { provider, deadline }
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Send `prompt` with the model and runtime options from `settings`.
    pub async fn invoke(
        &self,
        prompt: &str,
        settings: &Settings,
        mode: InvocationMode,
    ) -> Result<Invocation, ProviderError> {
        let request = GenerateRequest {
            model: settings.model.clone(),
            prompt: prompt.to_string(),
            options: settings.runtime_options(),
        };
        let deadline = Instant::now() + self.deadline;

        debug!(
            provider = %self.provider.name(),
            model = %request.model,
            ?mode,
            prompt_chars = request.prompt.chars().count(),
            "Invoking model"
        );

        match mode {
            InvocationMode::Whole => {
                let response = tokio::time::timeout_at(deadline, self.provider.complete(request))
                    .await
                    .map_err(|_| self.timeout_error())??;
                Ok(Invocation::Whole(response.text))
            }
            InvocationMode::Incremental => {
                let upstream = tokio::time::timeout_at(deadline, self.provider.stream(request))
                    .await
                    .map_err(|_| self.timeout_error())??;
                Ok(Invocation::Fragments(self.forward(upstream, deadline)))
            }
        }
    }

    fn timeout_error(&self) -> ProviderError {
        ProviderError::Timeout(format!("no response within {}s", self.deadline.as_secs()))
    }

    fn forward(
        &self,
        mut upstream: mpsc::Receiver<Result<llamachat_core::StreamChunk, ProviderError>>,
        deadline: Instant,
    ) -> FragmentStream {
        let (tx, rx) = mpsc::channel(64);
        let timeout = self.timeout_error();

        let task = tokio::spawn(async move {
            loop {
                let item = match tokio::time::timeout_at(deadline, upstream.recv()).await {
                    Ok(item) => item,
                    Err(_) => {
                        warn!("Model stream exceeded its deadline");
                        let _ = tx.send(Err(timeout)).await;
                        return;
                    }
                };

                match item {
                    Some(Ok(chunk)) => {
                        if let Some(content) = chunk.content.filter(|c| !c.is_empty()) {
                            if tx.send(Ok(content)).await.is_err() {
                                return;
                            }
                        }
                        if chunk.done {
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        let _ = tx.send(Err(e)).await;
                        return;
                    }
                    None => return,
                }
            }
        });

        FragmentStream { rx, task }
    }
}
