//! Periodic refresher: keeps the cache warm for every known app.

use crate::{polling::queue::PollQueue, storage::StorageService};
use futures::future::select_all;
use std::{sync::Arc, time::Duration};
use tokio::sync::watch;
use tracing::debug;

/// Schedules review polling for all known apps on a fixed cadence.
///
/// Enqueueing is paced by worker availability: before each push the scheduler
/// waits for at least one worker to advertise idleness, so a large catalog
/// cannot be dumped on the queue in one burst while the pool is saturated.
pub struct SchedulerService {
    queue: Arc<PollQueue>,
    storage: Arc<StorageService>,
    workers: Vec<watch::Receiver<bool>>,
    delay: Duration,
}

impl SchedulerService {
    pub fn new(
        queue: Arc<PollQueue>,
        storage: Arc<StorageService>,
        workers: Vec<watch::Receiver<bool>>,
        delay: Duration,
    ) -> Self {
        Self {
            queue,
            storage,
            workers,
            delay,
        }
    }

    pub async fn run(&self) {
        loop {
            self.process().await;
            tokio::time::sleep(self.delay).await;
        }
    }

    /// Schedule review polling for all apps.
    pub async fn process(&self) {
        debug!("Scheduling reviews polling for all apps");
        for app in self.storage.get_app_list().await {
            debug!("Actualizing reviews for app: {}", app.id);
            self.wait_available_worker().await;
            self.queue.push(app.id, false).await;
        }
    }

    /// Resolves as soon as any worker advertises availability.
    async fn wait_available_worker(&self) {
        if self.workers.is_empty() {
            return;
        }
        let waits = self
            .workers
            .iter()
            .map(|availability| {
                let mut availability = availability.clone();
                Box::pin(async move {
                    let _ = availability.wait_for(|available| *available).await;
                })
            })
            .collect::<Vec<_>>();
        select_all(waits).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::App;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_process_enqueues_every_known_app() {
        let queue = Arc::new(PollQueue::new());
        let storage = Arc::new(StorageService::in_memory());
        for app_id in [1, 2, 3] {
            storage.create_app(App { id: app_id }).await.unwrap();
        }

        // a permanently available worker keeps the pacing gate open
        let (available_tx, available_rx) = watch::channel(true);
        let scheduler = SchedulerService::new(
            queue.clone(),
            storage,
            vec![available_rx],
            Duration::from_secs(10),
        );
        scheduler.process().await;
        drop(available_tx);

        assert_eq!(queue.pending_len().await, 3);
        for app_id in [1, 2, 3] {
            assert!(queue.is_pending(&format!("task_{app_id}")).await);
        }
    }

    #[tokio::test]
    async fn test_process_blocks_until_a_worker_is_available() {
        let queue = Arc::new(PollQueue::new());
        let storage = Arc::new(StorageService::in_memory());
        storage.create_app(App { id: 1 }).await.unwrap();

        let (busy_tx, busy_rx) = watch::channel(false);
        let (available_tx, available_rx) = watch::channel(false);
        let scheduler = SchedulerService::new(
            queue.clone(),
            storage,
            vec![busy_rx, available_rx],
            Duration::from_secs(10),
        );

        let sweep = tokio::spawn(async move { scheduler.process().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!sweep.is_finished());
        assert_eq!(queue.pending_len().await, 0);

        // one worker going idle unblocks the sweep
        available_tx.send_replace(true);
        timeout(Duration::from_secs(1), sweep)
            .await
            .expect("sweep should resume once a worker is available")
            .unwrap();
        assert!(queue.is_pending("task_1").await);
        drop(busy_tx);
    }
}
