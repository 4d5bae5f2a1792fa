//! `llamachat doctor`: Diagnose the setup.

use llamachat_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 LlamaChat Doctor — System Diagnostics");
    println!("========================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    let config = if config_path.exists() {
        match AppConfig::load() {
            Ok(config) => {
                println!("  ✅ Config file valid");
                config
            }
            Err(e) => {
                println!("  ❌ Config file invalid: {e}");
                println!("\n  ⚠️  Fix the config file and re-run doctor.");
                return Ok(());
            }
        }
    } else {
        println!("  ⚠️  No config file — using defaults (run `llamachat onboard`)");
        issues += 1;
        AppConfig::default()
    };

    let provider = llamachat_providers::build_from_config(&config)?;

    match provider.health_check().await {
        Ok(true) => println!("  ✅ Ollama reachable at {}", config.ollama_url),
        Ok(false) => {
            println!("  ❌ Ollama at {} answered with an error", config.ollama_url);
            issues += 1;
        }
        Err(e) => {
            println!("  ❌ Ollama not reachable at {}: {e}", config.ollama_url);
            println!("     Start it with `ollama serve`.");
            issues += 1;
        }
    }

    match provider.list_models().await {
        Ok(models) if models.iter().any(|m| model_matches(m, &config.model)) => {
            println!("  ✅ Model {} is available", config.model);
        }
        Ok(models) => {
            println!("  ❌ Model {} not found — run `ollama pull {}`", config.model, config.model);
            if !models.is_empty() {
                println!("     Installed: {}", models.join(", "));
            }
            issues += 1;
        }
        Err(_) => {
            // Reachability was already reported above.
        }
    }

    if config.questions.enabled {
        let path = config.question_log_path();
        match path.parent() {
            Some(dir) if dir.exists() || std::fs::create_dir_all(dir).is_ok() => {
                println!("  ✅ Question log: {}", path.display());
            }
            _ => {
                println!("  ⚠️  Cannot create question log directory for {}", path.display());
                issues += 1;
            }
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}

/// Ollama reports `name:tag`; a bare name in config means `name:latest`.
fn model_matches(installed: &str, wanted: &str) -> bool {
    installed == wanted || (!wanted.contains(':') && installed == format!("{wanted}:latest"))
}
