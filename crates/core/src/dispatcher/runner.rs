//! Task dispatcher implementation.
//!
//! Admits submitted tasks in FIFO order and starts pipeline executors up to
//! the configured concurrency limit. The admission queue is unbounded:
//! `submit` never blocks and never rejects for capacity, tasks simply wait
//! in `pending` until a slot frees up.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, Mutex, RwLock, Semaphore};
use tracing::{debug, info, warn};

use crate::metrics::{TASKS_FINISHED, TASKS_RUNNING, TASKS_SUBMITTED};
use crate::pipeline::PipelineExecutor;
use crate::progress::{ProgressBus, ProgressEvent};
use crate::task::{FailureKind, TaskFailure, TaskFilter, TaskState, TaskStore};

use super::config::DispatcherConfig;
use super::types::{DispatcherError, DispatcherStatus};

/// Upper bound on the restart-recovery scan.
const RECOVERY_SCAN_LIMIT: i64 = 500;

/// The task dispatcher - admits tasks and bounds pipeline concurrency.
pub struct TaskDispatcher {
    config: DispatcherConfig,
    store: Arc<dyn TaskStore>,
    executor: Arc<PipelineExecutor>,
    bus: Arc<ProgressBus>,

    // Runtime state
    running: Arc<AtomicBool>,
    queue_tx: mpsc::UnboundedSender<String>,
    queue_rx: Mutex<Option<mpsc::UnboundedReceiver<String>>>,
    semaphore: Arc<Semaphore>,
    active_tasks: Arc<RwLock<HashSet<String>>>,
    cancel_flags: Arc<RwLock<HashMap<String, Arc<AtomicBool>>>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl TaskDispatcher {
    /// Create a new dispatcher.
    pub fn new(
        config: DispatcherConfig,
        store: Arc<dyn TaskStore>,
        executor: Arc<PipelineExecutor>,
        bus: Arc<ProgressBus>,
    ) -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, _) = broadcast::channel(1);
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_tasks.max(1)));

        Self {
            config,
            store,
            executor,
            bus,
            running: Arc::new(AtomicBool::new(false)),
            queue_tx,
            queue_rx: Mutex::new(Some(queue_rx)),
            semaphore,
            active_tasks: Arc::new(RwLock::new(HashSet::new())),
            cancel_flags: Arc::new(RwLock::new(HashMap::new())),
            shutdown_tx,
        }
    }

    /// Start the dispatcher (spawns the admission loop).
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Dispatcher already running");
            return;
        }

        info!("Starting task dispatcher");

        // Fail tasks left running by a previous process; no executor survives
        // a restart, so marking them failed is the documented recovery policy
        self.recover_interrupted_tasks();

        self.spawn_admission_loop().await;

        info!("Task dispatcher started");
    }

    /// Stop the dispatcher gracefully.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Dispatcher not running");
            return;
        }

        info!("Stopping task dispatcher");

        // Signal shutdown to the admission loop
        let _ = self.shutdown_tx.send(());

        // Give in-flight executors a moment to reach a boundary
        tokio::time::sleep(Duration::from_millis(self.config.shutdown_grace_ms)).await;

        info!("Task dispatcher stopped");
    }

    /// Enqueue a task id for execution. Returns immediately.
    pub fn submit(&self, task_id: &str) -> Result<(), DispatcherError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(DispatcherError::NotRunning);
        }

        self.queue_tx
            .send(task_id.to_string())
            .map_err(|_| DispatcherError::NotRunning)?;

        TASKS_SUBMITTED.inc();
        debug!(task_id = %task_id, "Task submitted");
        Ok(())
    }

    /// Request cooperative cancellation of a task.
    ///
    /// The executor observes the flag at its next stage boundary; a stage
    /// already in flight runs to completion first. Returns the error for
    /// unknown tasks and tasks that already reached a terminal state.
    pub async fn cancel(&self, task_id: &str) -> Result<(), DispatcherError> {
        let task = self
            .store
            .get(task_id)?
            .ok_or_else(|| DispatcherError::TaskNotFound(task_id.to_string()))?;

        if task.state.is_terminal() {
            return Err(DispatcherError::InvalidState {
                task_id: task_id.to_string(),
                current_state: task.state.state_type().to_string(),
                operation: "cancel".to_string(),
            });
        }

        let mut flags = self.cancel_flags.write().await;
        flags
            .entry(task_id.to_string())
            .or_insert_with(|| Arc::new(AtomicBool::new(false)))
            .store(true, Ordering::SeqCst);

        info!(task_id = %task_id, "Cancellation requested");
        Ok(())
    }

    /// Get current dispatcher status.
    pub async fn status(&self) -> DispatcherStatus {
        let active_tasks = self.active_tasks.read().await.len();

        let pending_count = self
            .store
            .count(&TaskFilter::new().with_state("pending"))
            .unwrap_or(0) as usize;

        let running_count = self
            .store
            .count(&TaskFilter::new().with_state("running"))
            .unwrap_or(0) as usize;

        DispatcherStatus {
            running: self.running.load(Ordering::Relaxed),
            active_tasks,
            pending_count,
            running_count,
        }
    }

    /// Mark tasks stuck in `running` from a previous process as failed.
    fn recover_interrupted_tasks(&self) {
        let filter = TaskFilter::new()
            .with_state("running")
            .with_limit(RECOVERY_SCAN_LIMIT);

        match self.store.list(&filter) {
            Ok(tasks) => {
                for task in &tasks {
                    let progress = task.state.progress();
                    let result = self.store.update_state(
                        &task.id,
                        TaskState::Failed {
                            error: TaskFailure::new(
                                FailureKind::Interrupted,
                                "process restarted while task was running",
                            ),
                            progress,
                            failed_at: Utc::now(),
                        },
                    );
                    match result {
                        Ok(updated) => {
                            TASKS_FINISHED.with_label_values(&["failed"]).inc();
                            self.bus.publish(&ProgressEvent::from_task(
                                &updated,
                                Some("process restarted while task was running".to_string()),
                            ));
                            info!(task_id = %task.id, "Recovered interrupted task as failed");
                        }
                        Err(e) => {
                            warn!(task_id = %task.id, "Failed to recover task: {}", e);
                        }
                    }
                }
                if !tasks.is_empty() {
                    info!("Recovered {} interrupted tasks", tasks.len());
                }
            }
            Err(e) => {
                warn!("Failed to scan for interrupted tasks: {}", e);
            }
        }
    }

    /// Spawn the admission loop task.
    async fn spawn_admission_loop(&self) {
        let Some(mut queue_rx) = self.queue_rx.lock().await.take() else {
            warn!("Admission loop already spawned");
            return;
        };

        let running = Arc::clone(&self.running);
        let executor = Arc::clone(&self.executor);
        let semaphore = Arc::clone(&self.semaphore);
        let active_tasks = Arc::clone(&self.active_tasks);
        let cancel_flags = Arc::clone(&self.cancel_flags);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("Admission loop started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Admission loop received shutdown signal");
                        break;
                    }
                    maybe_id = queue_rx.recv() => {
                        let Some(task_id) = maybe_id else {
                            break;
                        };
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }

                        // Waiting here is the concurrency bound: the loop
                        // admits the next task only when a slot is free. A
                        // running pipeline holds a permit, not this loop.
                        let permit = match Arc::clone(&semaphore).acquire_owned().await {
                            Ok(permit) => permit,
                            Err(_) => break,
                        };

                        // Single-writer invariant: never two executors for
                        // the same task id
                        {
                            let mut active = active_tasks.write().await;
                            if !active.insert(task_id.clone()) {
                                warn!(task_id = %task_id, "Task already executing, skipping duplicate");
                                drop(permit);
                                continue;
                            }
                        }

                        let cancel_flag = {
                            let mut flags = cancel_flags.write().await;
                            Arc::clone(
                                flags
                                    .entry(task_id.clone())
                                    .or_insert_with(|| Arc::new(AtomicBool::new(false))),
                            )
                        };

                        let executor = Arc::clone(&executor);
                        let active_tasks = Arc::clone(&active_tasks);
                        let cancel_flags = Arc::clone(&cancel_flags);

                        TASKS_RUNNING.inc();
                        tokio::spawn(async move {
                            executor.run(&task_id, cancel_flag).await;

                            TASKS_RUNNING.dec();
                            active_tasks.write().await.remove(&task_id);
                            cancel_flags.write().await.remove(&task_id);
                            drop(permit);
                        });
                    }
                }
            }
            info!("Admission loop stopped");
        });
    }
}
