//! One user action, end to end.
//!
//! [`ChatPipeline::respond`] answers in a single call; [`ChatPipeline::respond_streaming`]
//! answers through a channel of [`TurnEvent`]s and owns the session guard for
//! the duration of the turn.

use std::sync::Arc;
use std::time::Duration;

use llamachat_config::AppConfig;
use llamachat_core::{ProviderError, Session, Turn};
use llamachat_documents::{Extractor, UploadedFile};
use serde::Serialize;
use tokio::sync::{OwnedMutexGuard, mpsc};
use tracing::{debug, info, warn};

use crate::assembler::{AssembledPrompt, ContextAssembler, ContextLimits};
use crate::event::TurnEvent;
use crate::invoke::{FALLBACK_MESSAGE, Invocation, InvocationMode, ModelInvoker};
use crate::question_log::QuestionLog;

/// User text recorded when files are sent without a message.
pub const UPLOAD_ONLY_TEXT: &str = "📎 Uploaded files";

/// What the user submitted in one action.
#[derive(Debug, Clone, Default)]
pub struct UserInput {
    pub message: String,
    pub files: Vec<UploadedFile>,
}

impl UserInput {
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            files: Vec::new(),
        }
    }

    pub fn with_file(mut self, file: UploadedFile) -> Self {
        self.files.push(file);
        self
    }

    /// Neither text nor attachments.
    pub fn is_empty(&self) -> bool {
        self.message.trim().is_empty() && self.files.is_empty()
    }
}

/// An attachment that contributed no context, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileWarning {
    pub file: String,
    pub message: String,
}

/// Result of a whole-mode turn.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    /// Text recorded as the user turn
    pub user_text: String,
    /// Text recorded as the assistant turn
    pub response: String,
    /// Whether `response` is the fallback message
    pub fallback: bool,
    /// Names of all attached files, in submission order
    pub attached: Vec<String>,
    /// Attachments of an unsupported type
    pub skipped: Vec<String>,
    pub warnings: Vec<FileWarning>,
    pub prompt: AssembledPrompt,
}

/// Everything done before the model is called.
struct PreparedTurn {
    user_text: String,
    attached: Vec<String>,
    skipped: Vec<String>,
    warnings: Vec<FileWarning>,
    prompt: AssembledPrompt,
}

/// The per-message pipeline. Shared by all sessions; holds no session state.
pub struct ChatPipeline {
    assembler: ContextAssembler,
    extractor: Extractor,
    invoker: ModelInvoker,
    question_log: Option<Arc<QuestionLog>>,
}

impl ChatPipeline {
    pub fn new(invoker: ModelInvoker) -> Self {
        Self {
            assembler: ContextAssembler::default(),
            extractor: Extractor::default(),
            invoker,
            question_log: None,
        }
    }

    /// Build the pipeline described by the application config.
    pub fn from_config(provider: Arc<dyn llamachat_core::Provider>, config: &AppConfig) -> Self {
        let invoker = ModelInvoker::new(provider, Duration::from_secs(config.request_timeout_secs));
        let pipeline = Self::new(invoker)
            .with_limits(ContextLimits::from(&config.context))
            .with_extractor(Extractor::new(config.context.pdf_page_limit()));

        if config.questions.enabled {
            pipeline.with_question_log(Arc::new(QuestionLog::new(config.question_log_path())))
        } else {
            pipeline
        }
    }

    pub fn with_limits(mut self, limits: ContextLimits) -> Self {
        self.assembler = ContextAssembler::new(limits);
        self
    }

    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_question_log(mut self, log: Arc<QuestionLog>) -> Self {
        self.question_log = Some(log);
        self
    }

    pub fn question_log(&self) -> Option<&Arc<QuestionLog>> {
        self.question_log.as_ref()
    }

    pub fn invoker(&self) -> &ModelInvoker {
        &self.invoker
    }

    /// Answer one user action and record it in the session.
    ///
    /// Runtime failures never escape: the fallback message is recorded instead.
    pub async fn respond(
        &self,
        session: &mut Session,
        input: UserInput,
        mode: InvocationMode,
    ) -> TurnOutcome {
        let prepared = self.prepare(session, input).await;

        let result = match self
            .invoker
            .invoke(&prepared.prompt.prompt, &session.settings, mode)
            .await
        {
            Ok(invocation) => invocation.into_text().await,
            Err(e) => Err(e),
        };

        let (response, fallback) = match result {
            Ok(text) => (text, false),
            Err(e) => {
                warn!(session = %session.id, error = %e, "Model invocation failed; using fallback");
                (FALLBACK_MESSAGE.to_string(), true)
            }
        };
        session.log.append(Turn::assistant(response.clone()));
        session.touch();

        TurnOutcome {
            user_text: prepared.user_text,
            response,
            fallback,
            attached: prepared.attached,
            skipped: prepared.skipped,
            warnings: prepared.warnings,
            prompt: prepared.prompt,
        }
    }

    /// Answer incrementally. The session stays locked until the turn is
    /// recorded, after which the final [`TurnEvent::Done`] is sent.
    ///
    /// Dropping the receiver cancels the model request; the fragments the
    /// client received are recorded (the fallback message if there were none).
    /// Unsupported attachments produce no event.
    pub fn respond_streaming(
        self: &Arc<Self>,
        mut session: OwnedMutexGuard<Session>,
        input: UserInput,
    ) -> mpsc::Receiver<TurnEvent> {
        let (tx, rx) = mpsc::channel(64);
        let pipeline = Arc::clone(self);

        tokio::spawn(async move {
            let prepared = pipeline.prepare(&mut session, input).await;

            for w in &prepared.warnings {
                let _ = tx
                    .send(TurnEvent::Warning {
                        file: w.file.clone(),
                        message: w.message.clone(),
                    })
                    .await;
            }

            let (response, error) = pipeline
                .stream_reply(&mut session, &prepared.prompt.prompt, &tx)
                .await;

            let fallback = response.is_none();
            let response = response.unwrap_or_else(|| FALLBACK_MESSAGE.to_string());

            if let Some(e) = error {
                warn!(session = %session.id, error = %e, "Model stream failed; using fallback");
                let _ = tx
                    .send(TurnEvent::Fallback {
                        message: FALLBACK_MESSAGE.into(),
                        error: e.to_string(),
                    })
                    .await;
            }

            session.log.append(Turn::assistant(response.clone()));
            session.touch();
            drop(session);

            let _ = tx.send(TurnEvent::Done { response, fallback }).await;
        });

        rx
    }

    /// Forward fragments to `tx`. Returns the reply to record (`None` means
    /// the fallback) and the error that ended the stream, if any.
    async fn stream_reply(
        &self,
        session: &mut Session,
        prompt: &str,
        tx: &mpsc::Sender<TurnEvent>,
    ) -> (Option<String>, Option<ProviderError>) {
        let mut stream = match self
            .invoker
            .invoke(prompt, &session.settings, InvocationMode::Incremental)
            .await
        {
            Ok(Invocation::Fragments(stream)) => stream,
            Ok(Invocation::Whole(text)) => {
                let _ = tx.send(TurnEvent::Chunk { content: text.clone() }).await;
                return (Some(text), None);
            }
            Err(e) => return (None, Some(e)),
        };

        let mut text = String::new();
        while let Some(fragment) = stream.next_fragment().await {
            match fragment {
                Ok(content) => {
                    if tx.send(TurnEvent::Chunk { content: content.clone() }).await.is_err() {
                        info!(session = %session.id, "Client went away; cancelling model stream");
                        return ((!text.is_empty()).then_some(text), None);
                    }
                    text.push_str(&content);
                }
                // A failure mid-stream replaces the partial reply.
                Err(e) => return (None, Some(e)),
            }
        }
        (Some(text), None)
    }

    /// Steps before invocation: user turn, question log, extraction, assembly.
    async fn prepare(&self, session: &mut Session, input: UserInput) -> PreparedTurn {
        session.touch();

        let user_text = if input.message.trim().is_empty() && !input.files.is_empty() {
            UPLOAD_ONLY_TEXT.to_string()
        } else {
            input.message
        };

        self.record_question(session, &user_text).await;
        session.log.append(Turn::user(user_text.clone()));

        let attached: Vec<String> = input.files.iter().map(|f| f.name.clone()).collect();
        let mut skipped = Vec::new();
        let mut warnings = Vec::new();

        for file in input.files {
            let name = file.name.clone();
            if !file.kind().is_supported() {
                debug!(session = %session.id, file = %name, mime = %file.mime, "Skipping unsupported attachment");
                skipped.push(name);
                continue;
            }

            let extractor = self.extractor;
            let extracted = tokio::task::spawn_blocking(move || extractor.extract(&file)).await;

            match extracted {
                Ok(Ok(extraction)) => match extraction.into_document(name.clone()) {
                    Some(doc) => {
                        let chars = doc.char_count();
                        let replaced = session.context.insert(doc);
                        info!(session = %session.id, file = %name, chars, replaced, "Added document to context");
                    }
                    None => warnings.push(FileWarning {
                        file: name,
                        message: "no extractable text".into(),
                    }),
                },
                Ok(Err(e)) => {
                    warn!(session = %session.id, error = %e, "Could not read attachment");
                    warnings.push(FileWarning {
                        file: name,
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!(session = %session.id, file = %name, error = %e, "Extraction task failed");
                    warnings.push(FileWarning {
                        file: name,
                        message: "extraction failed".into(),
                    });
                }
            }
        }

        let prompt = self.assembler.assemble(&session.context, &user_text);

        PreparedTurn {
            user_text,
            attached,
            skipped,
            warnings,
            prompt,
        }
    }

    async fn record_question(&self, session: &mut Session, question: &str) {
        session.questions.push(question.to_string());

        if let Some(log) = &self.question_log {
            if let Err(e) = log.append(question).await {
                warn!(path = %log.path().display(), error = %e, "Failed to append to question log");
            }
        }
    }
}
