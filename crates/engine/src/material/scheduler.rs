//! Cancellable delayed tasks for material expiry.
//!
//! A scheduler knows nothing about materials. It arms a timer for a key and,
//! when the deadline passes, hands a [`TimerFired`] message back to the
//! engine, which feeds it into the ordinary transition logic.

use chrono::{DateTime, Utc};
use shared_types::{AppError, TimerHandle};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Delivered when an armed timer reaches its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    pub key: Uuid,
    pub handle: TimerHandle,
    pub fired_at: DateTime<Utc>,
}

pub trait Scheduler: Send + Sync {
    /// Arm a timer that fires for `key` at `deadline`.
    fn schedule(&self, key: Uuid, deadline: DateTime<Utc>) -> Result<TimerHandle, AppError>;

    /// Disarm a timer. Returns false if it already fired or is unknown.
    fn cancel(&self, handle: TimerHandle) -> bool;
}

/// One sleeping tokio task per timer, aborted on cancel.
pub struct TokioScheduler {
    next: AtomicU64,
    tasks: Arc<Mutex<HashMap<u64, JoinHandle<()>>>>,
    sender: mpsc::UnboundedSender<TimerFired>,
}

impl TokioScheduler {
    /// Returns the scheduler and the receiving end fired timers arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TimerFired>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let scheduler = Self {
            next: AtomicU64::new(1),
            tasks: Arc::new(Mutex::new(HashMap::new())),
            sender,
        };
        (scheduler, receiver)
    }

    /// Timers currently armed.
    pub fn armed(&self) -> usize {
        self.tasks.lock().map(|t| t.len()).unwrap_or(0)
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, key: Uuid, deadline: DateTime<Utc>) -> Result<TimerHandle, AppError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| AppError::internal(format!("No async runtime for timers: {}", e)))?;
        let id = self.next.fetch_add(1, Ordering::Relaxed);
        let handle = TimerHandle(id);
        let delay = (deadline - Utc::now()).to_std().unwrap_or_default();

        let sender = self.sender.clone();

        // Held across spawn so the task cannot deregister before it is registered.
        let mut registry = self
            .tasks
            .lock()
            .map_err(|_| AppError::internal("Timer registry lock poisoned"))?;
        let task = runtime.spawn({
            let tasks = Arc::clone(&self.tasks);
            async move {
                tokio::time::sleep(delay).await;
                if let Ok(mut registry) = tasks.lock() {
                    registry.remove(&id);
                }
                let fired = TimerFired {
                    key,
                    handle,
                    fired_at: Utc::now(),
                };
                if sender.send(fired).is_err() {
                    tracing::warn!(key = %key, "Timer fired after the pump stopped");
                }
            }
        });
        registry.insert(id, task);
        drop(registry);

        tracing::debug!(key = %key, handle = id, deadline = %deadline, "Timer armed");
        Ok(handle)
    }

    fn cancel(&self, handle: TimerHandle) -> bool {
        let task = match self.tasks.lock() {
            Ok(mut registry) => registry.remove(&handle.0),
            Err(_) => None,
        };
        match task {
            Some(task) => {
                task.abort();
                tracing::debug!(handle = handle.0, "Timer cancelled");
                true
            }
            None => false,
        }
    }
}
