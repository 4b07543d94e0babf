//! In-process fan-out of progress events to per-task subscribers.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::debug;

use crate::metrics::{PROGRESS_EVENTS_DROPPED, PROGRESS_EVENTS_PUBLISHED};

use super::types::ProgressEvent;

/// Default per-subscriber buffer capacity.
const DEFAULT_CAPACITY: usize = 64;

/// Fan-out bus for task progress events.
///
/// Publishing is non-blocking: each subscriber has its own bounded channel
/// and a slow subscriber drops its own events instead of stalling the
/// publisher. When a terminal event is published the task's subscriber list
/// is removed, which closes every outstanding receiver.
pub struct ProgressBus {
    capacity: usize,
    subscribers: Mutex<HashMap<String, Vec<mpsc::Sender<ProgressEvent>>>>,
}

impl ProgressBus {
    /// Create a new bus with the given per-subscriber buffer capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            subscribers: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe to events for a task.
    ///
    /// The receiver yields every event published after this call until the
    /// task reaches a terminal state, at which point the channel closes.
    /// Dropping the receiver unsubscribes; the stale sender is pruned on the
    /// next publish.
    pub fn subscribe(&self, task_id: &str) -> mpsc::Receiver<ProgressEvent> {
        let (tx, rx) = mpsc::channel(self.capacity);
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers
            .entry(task_id.to_string())
            .or_default()
            .push(tx);
        rx
    }

    /// Deliver an event to every live subscriber of its task.
    ///
    /// Never blocks the caller. A subscriber whose buffer is full loses this
    /// event; a subscriber that went away is removed.
    pub fn publish(&self, event: &ProgressEvent) {
        let terminal = event.is_terminal();
        let mut subscribers = self.subscribers.lock().unwrap();

        if let Some(senders) = subscribers.get_mut(&event.task_id) {
            senders.retain(|tx| match tx.try_send(event.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    debug!(task_id = %event.task_id, "Subscriber buffer full, dropping event");
                    PROGRESS_EVENTS_DROPPED.inc();
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            });
        }

        PROGRESS_EVENTS_PUBLISHED
            .with_label_values(&[&event.status])
            .inc();

        // Closing the channels tells subscribers no further events will come
        if terminal {
            subscribers.remove(&event.task_id);
        }
    }

    /// Drops closed subscriber channels for a task, removing its registry
    /// entry when none remain. Used by callers that subscribe and then
    /// decide not to consume the receiver (e.g. the task was already
    /// terminal), since no further publish will prune for them.
    pub fn prune(&self, task_id: &str) {
        let mut subscribers = self.subscribers.lock().unwrap();
        if let Some(senders) = subscribers.get_mut(task_id) {
            senders.retain(|tx| !tx.is_closed());
            if senders.is_empty() {
                subscribers.remove(task_id);
            }
        }
    }

    /// Number of live subscribers for a task.
    pub fn subscriber_count(&self, task_id: &str) -> usize {
        self.subscribers
            .lock()
            .unwrap()
            .get(task_id)
            .map(|s| s.len())
            .unwrap_or(0)
    }
}

impl Default for ProgressBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
