//! `llamachat questions`: Print the persisted question log.

use llamachat_chat::QuestionLog;
use llamachat_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let log = QuestionLog::new(config.question_log_path());
    let questions = log.read_all().await?;

    if questions.is_empty() {
        println!("No saved questions in {}", log.path().display());
        return Ok(());
    }

    println!("📝 Saved questions ({})", log.path().display());
    for (i, q) in questions.iter().enumerate() {
        println!("  {:>3}. {q}", i + 1);
    }
    if !config.questions.enabled {
        println!("\n  ⚠️  Recording is disabled in config; no new questions are being saved.");
    }

    Ok(())
}
