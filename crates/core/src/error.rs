//! Error types for the LlamaChat domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error type.

use thiserror::Error;

/// Failures talking to the model runtime.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// A single uploaded file could not be turned into text.
///
/// Never fatal: the file contributes no context and the remaining files
/// are still processed.
#[derive(Debug, Clone, Error)]
pub enum ExtractionError {
    #[error("Could not parse PDF {file}: {reason}")]
    InvalidPdf { file: String, reason: String },

    #[error("Could not extract text from page {page} of {file}: {reason}")]
    PageFailed {
        file: String,
        page: u32,
        reason: String,
    },

    #[error("Error reading file {file}: {reason}")]
    InvalidText { file: String, reason: String },
}

impl ExtractionError {
    /// The file the error refers to.
    pub fn file(&self) -> &str {
        match self {
            Self::InvalidPdf { file, .. }
            | Self::PageFailed { file, .. }
            | Self::InvalidText { file, .. } => file,
        }
    }
}

/// Rejected runtime settings.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettingsError {
    #[error("temperature must be between 0.0 and 1.0, got {0}")]
    TemperatureOutOfRange(f32),

    #[error("max_tokens must be between 1 and {max}, got {value}")]
    MaxTokensOutOfRange { value: u32, max: u32 },
}

#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),
}
