use std::path::{Path, PathBuf};
use chrono::Utc;
use tokio::io::AsyncWriteExt;
use crate::drivers::ExecutionEvent;
use crate::errors::FlowscopeError;

/// Append-only file copy of an execution's log lines, oldest first.
pub struct TranscriptLogger {
    path: PathBuf,
}

impl TranscriptLogger {
    pub fn new(path: &Path) -> Self {
        Self { path: path.to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn initialize(&self, task_id: &str, session_id: &str) -> Result<(), FlowscopeError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let header = format!(
            "# flowscope transcript\n# Task: {}\n# Session: {}\n# Started: {}\n\n",
            task_id,
            session_id,
            Utc::now().to_rfc3339()
        );
        tokio::fs::write(&self.path, &header).await?;
        Ok(())
    }

    pub async fn append(&self, line: &str) -> Result<(), FlowscopeError> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(format!("{}\n", line).as_bytes()).await?;
        Ok(())
    }

    /// Record the parts of an event worth keeping on disk.
    pub async fn record(&self, event: &ExecutionEvent) -> Result<(), FlowscopeError> {
        match event {
            ExecutionEvent::Log { line } => self.append(line).await,
            ExecutionEvent::StepCompleted { index, step_id } => {
                self.append(&format!("# step {} completed: {}", index, step_id)).await
            }
            ExecutionEvent::ExecutionCompleted { completed_steps, .. } => {
                self.append(&format!("# execution complete ({} steps)", completed_steps)).await
            }
            ExecutionEvent::ExecutionStopped { .. } => self.append("# execution stopped").await,
            _ => Ok(()),
        }
    }
}
