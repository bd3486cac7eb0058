// ABOUTME: Output writers for formatted snapshots (stdout, files)
// ABOUTME: Handles writing rendered execution reports to their destination

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info};

use super::error::Result;

#[async_trait]
pub trait OutputWriter: Send + Sync {
    async fn write(&self, content: &str) -> Result<()>;
}

pub struct StdoutWriter {
    quiet: bool,
}

pub struct FileWriter {
    path: PathBuf,
    create_dirs: bool,
}

impl Default for StdoutWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl StdoutWriter {
    pub fn new() -> Self {
        Self { quiet: false }
    }

    pub fn quiet() -> Self {
        Self { quiet: true }
    }
}

#[async_trait]
impl OutputWriter for StdoutWriter {
    async fn write(&self, content: &str) -> Result<()> {
        if !self.quiet {
            println!("{}", content.trim_end());
        }

        debug!("Output written to stdout ({} chars)", content.len());
        Ok(())
    }
}

impl FileWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            create_dirs: true,
        }
    }

    pub fn without_create_dirs(mut self) -> Self {
        self.create_dirs = false;
        self
    }
}

#[async_trait]
impl OutputWriter for FileWriter {
    async fn write(&self, content: &str) -> Result<()> {
        if self.create_dirs {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).await?;
            }
        }

        fs::write(&self.path, content).await?;

        info!(
            "Output written to file: {} ({} bytes)",
            self.path.display(),
            content.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_writer_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("reports/nested/run.json");

        FileWriter::new(&path).write("{\"ok\":true}").await.unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content, "{\"ok\":true}");
    }

    #[tokio::test]
    async fn test_file_writer_without_create_dirs_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing/run.json");

        let result = FileWriter::new(&path)
            .without_create_dirs()
            .write("data")
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_quiet_stdout_writer() {
        assert!(StdoutWriter::quiet().write("hidden").await.is_ok());
    }
}
