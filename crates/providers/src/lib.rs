//! Model runtime providers for LlamaChat.
//!
//! All providers implement the `llamachat_core::Provider` trait.
//! [`build_from_config`] creates the provider the configuration points at.

pub mod ollama;

use std::sync::Arc;

use llamachat_config::AppConfig;
use llamachat_core::{Provider, ProviderError};

pub use ollama::OllamaProvider;

/// Build the provider described by the configuration.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let provider = OllamaProvider::new(&config.ollama_url)?;
    tracing::debug!(url = %config.ollama_url, model = %config.model, "Configured Ollama provider");
    Ok(Arc::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_ollama_from_default_config() {
        let provider = build_from_config(&AppConfig::default()).unwrap();
        assert_eq!(provider.name(), "ollama");
    }
}
