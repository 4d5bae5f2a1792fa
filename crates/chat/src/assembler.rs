//! Context assembly: document text plus the user message, bounded.
//!
//! # Algorithm
//!
//! 1. Empty store: the prompt is the user message, verbatim
//! 2. Otherwise take the first `max_documents` documents in insertion order,
//!    at most `max_chars_per_document` characters of each, labelled
//!    `[Document: <id>]`
//! 3. Concatenate the snippets and cut the result to `max_context_chars`
//! 4. Wrap context and question in the instruction template
//!
//! All lengths are counted in `char`s. Assembly is deterministic.

use llamachat_config::ContextConfig;
use llamachat_core::ContextStore;
use serde::Serialize;

const CONTEXT_HEADER: &str = "Context from uploaded document(s):";
const QUESTION_LABEL: &str = "User question:";
const INSTRUCTION: &str = "Answer based only on the provided context. \
If the context does not contain enough information to answer, say so explicitly.";

/// Caps applied to the context portion of a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextLimits {
    pub max_documents: usize,
    pub max_chars_per_document: usize,
    pub max_context_chars: usize,
}

impl Default for ContextLimits {
    fn default() -> Self {
        Self {
            max_documents: 3,
            max_chars_per_document: 2000,
            max_context_chars: 4000,
        }
    }
}

impl From<&ContextConfig> for ContextLimits {
    fn from(config: &ContextConfig) -> Self {
        Self {
            max_documents: config.max_documents,
            max_chars_per_document: config.max_chars_per_document,
            max_context_chars: config.max_context_chars,
        }
    }
}

/// What went into a prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssemblyStats {
    /// Documents that contributed a snippet
    pub documents_used: usize,
    /// Documents in the store
    pub documents_available: usize,
    /// Length of the context portion, in characters
    pub context_chars: usize,
    /// Whether the concatenated snippets were cut to the total cap
    pub truncated: bool,
}

/// A prompt built for one request. Never stored.
#[derive(Debug, Clone, Serialize)]
pub struct AssembledPrompt {
    pub prompt: String,
    pub stats: AssemblyStats,
}

/// Builds prompts from a context store. Stateless; create one and reuse it.
#[derive(Debug, Clone, Default)]
pub struct ContextAssembler {
    limits: ContextLimits,
}

impl ContextAssembler {
    pub fn new(limits: ContextLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &ContextLimits {
        &self.limits
    }

    /// Assemble the prompt for `user_message`.
    pub fn assemble(&self, store: &ContextStore, user_message: &str) -> AssembledPrompt {
        if store.is_empty() {
            return AssembledPrompt {
                prompt: user_message.to_string(),
                stats: AssemblyStats::default(),
            };
        }

        let (context, stats) = self.build_context(store);
        let prompt = format!(
            "{CONTEXT_HEADER}\n{context}\n\n{QUESTION_LABEL} {user_message}\n{INSTRUCTION}"
        );

        tracing::debug!(
            documents_used = stats.documents_used,
            documents_available = stats.documents_available,
            context_chars = stats.context_chars,
            truncated = stats.truncated,
            "Assembled prompt"
        );

        AssembledPrompt { prompt, stats }
    }

    /// The bounded context block alone.
    pub fn build_context(&self, store: &ContextStore) -> (String, AssemblyStats) {
        let mut joined = String::new();
        let mut used = 0;

        for doc in store.iter().take(self.limits.max_documents) {
            if !joined.is_empty() {
                joined.push_str("\n\n");
            }
            joined.push_str("[Document: ");
            joined.push_str(&doc.id);
            joined.push_str("]\n");
            joined.push_str(take_chars(&doc.text, self.limits.max_chars_per_document));
            used += 1;
        }

        let context = take_chars(&joined, self.limits.max_context_chars);
        let truncated = context.len() < joined.len();
        let stats = AssemblyStats {
            documents_used: used,
            documents_available: store.len(),
            context_chars: context.chars().count(),
            truncated,
        };
        (context.to_string(), stats)
    }
}

/// The longest prefix of `s` holding at most `n` characters.
fn take_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
