//! `llamachat chat`: Terminal chat.
//!
//! Interactive commands:
//! - `/attach <path>`  attach a file to the next message
//! - `/reset`          reset the conversation
//! - `/clear`          drop all document context
//! - `/questions`      list questions asked in this session
//! - `exit`, `quit`, `/exit`, `/quit`, `:q`  leave

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use llamachat_chat::{ChatPipeline, InvocationMode, TurnEvent, TurnOutcome, UserInput};
use llamachat_config::AppConfig;
use llamachat_core::Session;
use llamachat_documents::UploadedFile;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;

const EXIT_WORDS: &[&str] = &["exit", "quit", "/exit", "/quit", ":q"];

pub async fn run(
    message: Option<String>,
    files: Vec<PathBuf>,
    no_stream: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let provider = llamachat_providers::build_from_config(&config)?;
    let pipeline = Arc::new(ChatPipeline::from_config(provider, &config));
    let session = Arc::new(Mutex::new(Session::new(
        config.session_settings(),
        config.greeting.clone(),
    )));
    let streaming = config.streaming && !no_stream;

    let mut pending = load_files(&files)?;

    if let Some(msg) = message {
        let input = UserInput {
            message: msg,
            files: std::mem::take(&mut pending),
        };
        if input.is_empty() {
            return Err("Nothing to send: give a message or at least one --file".into());
        }
        send(&pipeline, &session, input, streaming).await?;
        return Ok(());
    }

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        LlamaChat — Interactive Mode          ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Model:     {}", config.model);
    println!("  Ollama:    {}", config.ollama_url);
    println!("  Streaming: {}", if streaming { "on" } else { "off" });
    if !pending.is_empty() {
        let names: Vec<_> = pending.iter().map(|f| f.name.as_str()).collect();
        println!("  Attached:  {}", names.join(", "));
    }
    println!();
    println!("  Type your message and press Enter. /attach <path> adds a file.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();
    println!("  Assistant > {}", session.lock().await.log.greeting());
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt()?;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim().to_string();

        if EXIT_WORDS.contains(&line.to_lowercase().as_str()) {
            break;
        }

        if let Some(path) = line.strip_prefix("/attach ") {
            match UploadedFile::from_path(&PathBuf::from(path.trim())) {
                Ok(file) => {
                    println!("  📎 {} will be sent with your next message", file.name);
                    pending.push(file);
                }
                Err(e) => eprintln!("  [Error] cannot read {}: {e}", path.trim()),
            }
        } else if line == "/reset" {
            session.lock().await.log.reset();
            println!("  Conversation reset.");
        } else if line == "/clear" {
            session.lock().await.context.clear();
            println!("  Document context cleared.");
        } else if line == "/questions" {
            let session = session.lock().await;
            if session.questions.is_empty() {
                println!("  No questions yet.");
            }
            for (i, q) in session.questions.iter().enumerate() {
                println!("  {:>3}. {q}", i + 1);
            }
        } else if !line.is_empty() || !pending.is_empty() {
            let input = UserInput {
                message: line,
                files: std::mem::take(&mut pending),
            };
            send(&pipeline, &session, input, streaming).await?;
        }

        prompt()?;
    }

    println!();
    println!("  Goodbye! 👋");
    println!();

    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}

fn load_files(paths: &[PathBuf]) -> Result<Vec<UploadedFile>, Box<dyn std::error::Error>> {
    paths
        .iter()
        .map(|p| {
            UploadedFile::from_path(p).map_err(|e| {
                Box::<dyn std::error::Error>::from(format!("Cannot read {}: {e}", p.display()))
            })
        })
        .collect()
}

async fn send(
    pipeline: &Arc<ChatPipeline>,
    session: &Arc<Mutex<Session>>,
    input: UserInput,
    streaming: bool,
) -> std::io::Result<()> {
    if !input.files.is_empty() {
        let names: Vec<_> = input.files.iter().map(|f| f.name.as_str()).collect();
        println!("  Uploaded: {}", names.join(", "));
    }

    if streaming {
        let guard = session.clone().lock_owned().await;
        let mut rx = pipeline.respond_streaming(guard, input);
        let mut started = false;

        while let Some(event) = rx.recv().await {
            match event {
                TurnEvent::Warning { file, message } => eprintln!("  ⚠️  {file}: {message}"),
                TurnEvent::Chunk { content } => {
                    if !started {
                        print!("\n  Assistant > ");
                        started = true;
                    }
                    print!("{content}");
                    std::io::stdout().flush()?;
                }
                TurnEvent::Fallback { message, .. } => {
                    if started {
                        println!();
                    }
                    println!("\n  Assistant > {message}");
                    started = false;
                }
                TurnEvent::Done { .. } => {
                    if started {
                        println!();
                    }
                    println!();
                }
            }
        }
    } else {
        eprint!("  Thinking...");
        let outcome = {
            let mut session = session.lock().await;
            pipeline
                .respond(&mut session, input, InvocationMode::Whole)
                .await
        };
        eprint!("\r             \r");
        print_outcome(&outcome);
    }

    Ok(())
}

fn print_outcome(outcome: &TurnOutcome) {
    for w in &outcome.warnings {
        eprintln!("  ⚠️  {}: {}", w.file, w.message);
    }
    println!();
    for line in outcome.response.lines() {
        println!("  Assistant > {line}");
    }
    println!();
}
