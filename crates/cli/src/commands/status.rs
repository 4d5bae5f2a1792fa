//! `llamachat status`: Show the effective configuration.

use llamachat_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let ctx = &config.context;

    println!("🦙 LlamaChat Status");
    println!("===================");
    println!("  Config dir:    {}", AppConfig::config_dir().display());
    println!("  Ollama:        {}", config.ollama_url);
    println!("  Model:         {}", config.model);
    println!("  Temperature:   {}", config.temperature);
    println!("  Max tokens:    {}", config.max_tokens);
    println!(
        "  Hardware:      threads={} gpu={}",
        config.num_thread.map_or("default".to_string(), |n| n.to_string()),
        config.num_gpu.map_or("default".to_string(), |n| n.to_string()),
    );
    println!("  Timeout:       {}s", config.request_timeout_secs);
    println!("  Streaming:     {}", if config.streaming { "on" } else { "off" });
    println!(
        "  Context:       {} docs × {} chars, {} chars total, {} PDF pages",
        ctx.max_documents,
        ctx.max_chars_per_document,
        ctx.max_context_chars,
        ctx.pdf_page_limit().map_or("all".to_string(), |n| n.to_string()),
    );
    println!("  Gateway:       {}:{}", config.gateway.host, config.gateway.port);
    println!(
        "  Question log:  {}",
        if config.questions.enabled {
            config.question_log_path().display().to_string()
        } else {
            "disabled".to_string()
        }
    );

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file — using defaults (run `llamachat onboard` to create one)");
    }

    Ok(())
}
