//! Persisted question log: one asked question per line, appended.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Append-only text file of user questions, shared by all sessions.
#[derive(Debug)]
pub struct QuestionLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl QuestionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one question. Line breaks inside it are folded into spaces.
    pub async fn append(&self, question: &str) -> std::io::Result<()> {
        let mut line = fold_line(question);
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }

    /// Every recorded question, oldest first. A missing file is an empty log.
    pub async fn read_all(&self) -> std::io::Result<Vec<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(content
                .lines()
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}

fn fold_line(question: &str) -> String {
    question
        .split(['\r', '\n'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn append_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let log = QuestionLog::new(dir.path().join("nested").join("questions.txt"));

        log.append("What is Rust?").await.unwrap();
        log.append("Summarise the PDF").await.unwrap();

        assert_eq!(
            log.read_all().await.unwrap(),
            vec!["What is Rust?", "Summarise the PDF"]
        );
    }

    #[tokio::test]
    async fn multiline_question_is_one_line() {
        let dir = tempfile::tempdir().unwrap();
        let log = QuestionLog::new(dir.path().join("q.txt"));

        log.append("first line\r\nsecond line\nthird").await.unwrap();

        let raw = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(raw, "first line second line third\n");
    }

    #[tokio::test]
    async fn missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = QuestionLog::new(dir.path().join("never-written.txt"));
        assert!(log.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_appends_do_not_interleave() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(QuestionLog::new(dir.path().join("q.txt")));

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let log = log.clone();
                tokio::spawn(async move { log.append(&format!("question {i}")).await })
            })
            .collect();
        for h in handles {
            h.await.unwrap().unwrap();
        }

        let mut lines = log.read_all().await.unwrap();
        lines.sort();
        assert_eq!(lines.len(), 20);
        assert!(lines.iter().all(|l| l.starts_with("question ")));
    }

    #[test]
    fn fold_line_drops_empty_parts() {
        assert_eq!(fold_line("a\n\nb"), "a b");
        assert_eq!(fold_line("single"), "single");
    }
}
