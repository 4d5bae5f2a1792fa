//! `llamachat serve`: Start the HTTP gateway and web UI.

use llamachat_config::AppConfig;

pub async fn run(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(p) = port {
        config.gateway.port = p;
    }

    println!("🦙 LlamaChat Gateway");
    println!("  Web UI:  http://{}:{}/", config.gateway.host, config.gateway.port);
    println!("  API:     http://{}:{}/v1/sessions", config.gateway.host, config.gateway.port);
    println!("  Health:  http://{}:{}/health", config.gateway.host, config.gateway.port);
    println!("  Model:   {} via {}", config.model, config.ollama_url);
    println!();

    llamachat_gateway::start(config).await
}
