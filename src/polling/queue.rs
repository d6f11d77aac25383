//! Deduplicating ordered buffer of poll tasks.
//!
//! One task per app id may exist across pending ∪ in-progress at any moment;
//! repeated pushes for the same app coalesce onto the live task so upstream
//! is only called once per refresh.

use crate::{constants::COMPLETED_TASKS_RETAINED, models::AppId};
use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};
use tokio::sync::{watch, Mutex, Semaphore};
use tracing::{debug, warn};

/// A unit of "poll reviews for app X" with a one-shot completion latch.
///
/// The latch decouples waiters from workers: request handlers await the task
/// without knowing which worker executes it, and every awaiter resumes on the
/// same completion edge.
pub struct PollTask {
    app_id: AppId,
    completed_tx: watch::Sender<bool>,
    completed_rx: watch::Receiver<bool>,
}

impl PollTask {
    fn new(app_id: AppId) -> Self {
        let (completed_tx, completed_rx) = watch::channel(false);
        Self {
            app_id,
            completed_tx,
            completed_rx,
        }
    }

    pub fn app_id(&self) -> AppId {
        self.app_id
    }

    pub fn id(&self) -> String {
        format!("task_{}", self.app_id)
    }

    pub fn is_completed(&self) -> bool {
        *self.completed_rx.borrow()
    }

    /// Fires the latch. Idempotent; only the first call has an effect.
    pub fn mark_complete(&self) {
        self.completed_tx.send_replace(true);
    }

    /// Blocks until the latch fires; returns immediately if already fired.
    pub async fn await_completion(&self) {
        let mut completed = self.completed_rx.clone();
        // The sender lives inside the task itself, so wait_for cannot fail
        // while the awaiter still holds the task.
        let _ = completed.wait_for(|done| *done).await;
    }
}

#[derive(Default)]
struct QueueState {
    /// Dispatch order; every element is also indexed in `pending`.
    queue: VecDeque<Arc<PollTask>>,
    pending: HashMap<String, Arc<PollTask>>,
    in_progress: HashMap<String, Arc<PollTask>>,
    completed: HashMap<String, Arc<PollTask>>,
    completed_order: VecDeque<String>,
}

/// Queue for review polling tasks.
///
/// Dispatches FIFO by default; an urgent push goes to the head of the queue
/// (LIFO relative to the default order). Tracks lifecycle through three
/// disjoint indices: pending, in-progress and a bounded completed history.
pub struct PollQueue {
    state: Mutex<QueueState>,
    /// One permit per queued task; carries the not-empty signal to `pop`.
    ready: Semaphore,
}

impl Default for PollQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl PollQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            ready: Semaphore::new(0),
        }
    }

    /// Submits a poll for `app_id` and returns its task.
    ///
    /// If a task for the same app is already pending or in progress, that
    /// task is returned instead and nothing is enqueued. Never blocks.
    pub async fn push(&self, app_id: AppId, urgent: bool) -> Arc<PollTask> {
        let task = Arc::new(PollTask::new(app_id));
        let mut state = self.state.lock().await;

        if let Some(pending) = state.pending.get(&task.id()) {
            warn!("Task is pending already: {}", pending.id());
            return pending.clone();
        }
        if let Some(in_progress) = state.in_progress.get(&task.id()) {
            warn!("Task in progress already: {}", in_progress.id());
            return in_progress.clone();
        }

        state.pending.insert(task.id(), task.clone());
        if urgent {
            state.queue.push_front(task.clone());
        } else {
            state.queue.push_back(task.clone());
        }
        self.ready.add_permits(1);
        task
    }

    /// Takes the next task, blocking while the queue is empty.
    ///
    /// Safe for concurrent consumers; each call returns a distinct task,
    /// moved from pending to in-progress.
    pub async fn pop(&self) -> Arc<PollTask> {
        let permit = self
            .ready
            .acquire()
            .await
            .expect("poll queue semaphore closed");
        permit.forget();

        let mut state = self.state.lock().await;
        let task = state
            .queue
            .pop_front()
            .expect("queue permit issued without a queued task");
        state.pending.remove(&task.id());
        state.in_progress.insert(task.id(), task.clone());
        debug!("Task dequeued: {} (remaining: {})", task.id(), state.queue.len());
        task
    }

    /// Moves a popped task to the completed index and fires its latch.
    ///
    /// Panics when the task was never returned by [`pop`]: completing an
    /// untracked task is a programmer error.
    ///
    /// [`pop`]: Self::pop
    pub async fn mark_complete(&self, task: &Arc<PollTask>) {
        let mut state = self.state.lock().await;
        let id = task.id();
        state
            .in_progress
            .remove(&id)
            .unwrap_or_else(|| panic!("task completed but not in progress: {id}"));

        state.completed_order.retain(|known| known != &id);
        state.completed.insert(id.clone(), task.clone());
        state.completed_order.push_back(id);
        while state.completed_order.len() > COMPLETED_TASKS_RETAINED {
            if let Some(evicted) = state.completed_order.pop_front() {
                state.completed.remove(&evicted);
            }
        }
        drop(state);

        task.mark_complete();
    }

    /// Awaits completion of every task pending or in progress at the moment
    /// of the call. Tasks submitted afterwards are not awaited.
    pub async fn wait_all(&self) {
        let tasks: Vec<Arc<PollTask>> = {
            let state = self.state.lock().await;
            state
                .pending
                .values()
                .chain(state.in_progress.values())
                .cloned()
                .collect()
        };
        for task in tasks {
            task.await_completion().await;
        }
    }

    /// Fires the latch of every outstanding task and drops queue state.
    ///
    /// Shutdown path only, after the workers have stopped: waiters resume
    /// instead of hanging on tasks nobody will process.
    pub async fn release_outstanding(&self) {
        let mut state = self.state.lock().await;
        for task in state.pending.values().chain(state.in_progress.values()) {
            task.mark_complete();
        }
        // drop the permits of the tasks being discarded, or a later pop
        // would acquire a permit with nothing behind it
        self.ready.forget_permits(state.queue.len());
        state.queue.clear();
        state.pending.clear();
        state.in_progress.clear();
    }

    pub async fn is_pending(&self, task_id: &str) -> bool {
        self.state.lock().await.pending.contains_key(task_id)
    }

    pub async fn is_in_progress(&self, task_id: &str) -> bool {
        self.state.lock().await.in_progress.contains_key(task_id)
    }

    pub async fn is_completed(&self, task_id: &str) -> bool {
        self.state.lock().await.completed.contains_key(task_id)
    }

    pub async fn pending_len(&self) -> usize {
        self.state.lock().await.pending.len()
    }
}
