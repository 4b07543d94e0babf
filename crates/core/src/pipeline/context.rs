//! Per-task pipeline context and temporary file cleanup.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Transient state owned by exactly one pipeline execution.
///
/// The context owns the task's working directory. Cleanup is guaranteed on
/// every exit path: the executor calls [`cleanup`](Self::cleanup) on each
/// terminal path, and the `Drop` impl removes whatever is left if the
/// executor unwinds before reaching it.
pub struct PipelineContext {
    task_id: String,
    work_dir: PathBuf,
    cancel_flag: Arc<AtomicBool>,
    cleaned: AtomicBool,
}

impl PipelineContext {
    /// Creates the context and its working directory under `temp_root`.
    pub async fn create(
        temp_root: &Path,
        task_id: &str,
        cancel_flag: Arc<AtomicBool>,
    ) -> std::io::Result<Self> {
        let work_dir = temp_root.join(task_id);
        tokio::fs::create_dir_all(&work_dir).await?;
        Ok(Self {
            task_id: task_id.to_string(),
            work_dir,
            cancel_flag,
            cleaned: AtomicBool::new(false),
        })
    }

    /// The task this context belongs to.
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Working directory for intermediate files.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Whether cancellation was requested for this task.
    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::SeqCst)
    }

    /// Removes the working directory. Idempotent.
    pub async fn cleanup(&self) {
        if self.cleaned.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = tokio::fs::remove_dir_all(&self.work_dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    task_id = %self.task_id,
                    "Failed to remove working directory {}: {}",
                    self.work_dir.display(),
                    e
                );
            }
        } else {
            debug!(task_id = %self.task_id, "Working directory removed");
        }
    }
}

impl Drop for PipelineContext {
    fn drop(&mut self) {
        // Last-resort removal when the executor unwinds before cleanup
        if !self.cleaned.swap(true, Ordering::SeqCst) {
            let _ = std::fs::remove_dir_all(&self.work_dir);
        }
    }
}
