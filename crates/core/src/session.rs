//! A chat session: everything one user's interaction owns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::conversation::ConversationLog;
use crate::document::ContextStore;
use crate::error::SettingsError;
use crate::provider::RuntimeOptions;

/// Upper bound accepted for the output token limit.
pub const MAX_OUTPUT_TOKENS: u32 = 8192;

/// Unique identifier for a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Model parameters used for the next invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_thread: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_gpu: Option<u32>,
}

impl Settings {
    /// Options forwarded to the runtime for one request.
    pub fn runtime_options(&self) -> RuntimeOptions {
        RuntimeOptions {
            temperature: self.temperature,
            num_thread: self.num_thread,
            num_gpu: self.num_gpu,
            num_predict: Some(self.max_tokens),
        }
    }

    /// Apply a runtime adjustment. Either every field is applied or none.
    pub fn apply(&mut self, update: &SettingsUpdate) -> Result<(), SettingsError> {
        if let Some(t) = update.temperature {
            validate_temperature(t)?;
        }
        if let Some(m) = update.max_tokens {
            validate_max_tokens(m)?;
        }

        if let Some(t) = update.temperature {
            self.temperature = t;
        }
        if let Some(m) = update.max_tokens {
            self.max_tokens = m;
        }
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: "llama3:8b".into(),
            temperature: 0.75,
            max_tokens: 512,
            num_thread: Some(4),
            num_gpu: None,
        }
    }
}

pub fn validate_temperature(t: f32) -> Result<(), SettingsError> {
    if !(0.0..=1.0).contains(&t) {
        return Err(SettingsError::TemperatureOutOfRange(t));
    }
    Ok(())
}

pub fn validate_max_tokens(m: u32) -> Result<(), SettingsError> {
    if m == 0 || m > MAX_OUTPUT_TOKENS {
        return Err(SettingsError::MaxTokensOutOfRange {
            value: m,
            max: MAX_OUTPUT_TOKENS,
        });
    }
    Ok(())
}

/// The runtime-adjustable subset of [`Settings`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsUpdate {
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

/// Typed state of one chat session.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub log: ConversationLog,
    pub context: ContextStore,
    pub settings: Settings,
    /// Questions asked in this session, in order
    pub questions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl Session {
    pub fn new(settings: Settings, greeting: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            log: ConversationLog::new(greeting),
            context: ContextStore::new(),
            settings,
            questions: Vec::new(),
            created_at: now,
            last_active: now,
        }
    }

    pub fn touch(&mut self) {
        self.last_active = Utc::now();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Settings::default(), crate::conversation::DEFAULT_GREETING)
    }
}
