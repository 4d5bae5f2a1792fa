//! # LlamaChat Core
//!
//! Domain types, traits, and error definitions for LlamaChat, a chat front
//! end for a locally running LLM server. This crate has **zero framework
//! dependencies**: it defines the domain model that all other crates
//! implement against.
//!
//! ## Design Philosophy
//!
//! Everything a chat session owns lives in a typed [`Session`]: the visible
//! [`ConversationLog`], the [`ContextStore`] of extracted document text and
//! the runtime [`Settings`]. The model backend is a trait ([`Provider`]) so
//! the pipeline can be driven by Ollama in production and by scripted mocks
//! in tests.

pub mod conversation;
pub mod document;
pub mod error;
pub mod provider;
pub mod session;

// Re-export key types at crate root for ergonomics
pub use conversation::{ConversationLog, DEFAULT_GREETING, Role, Turn};
pub use document::{ContextStore, Document};
pub use error::{ExtractionError, ProviderError, SessionError, SettingsError};
pub use provider::{GenerateRequest, GenerateResponse, Provider, RuntimeOptions, StreamChunk, Usage};
pub use session::{Session, SessionId, Settings, SettingsUpdate};
