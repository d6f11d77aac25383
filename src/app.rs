//! Application context and lifecycle: wires the queue, storage, upstream and
//! background tasks together, and tears them down again.

use crate::{
    api::ApiServer,
    config::Config,
    models::App,
    polling::{PollQueue, PollWorker, SchedulerService},
    storage::StorageService,
    upstream::ReviewsFeed,
    Result,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Shared application state plus the handles of its background tasks.
///
/// All handles are passed explicitly; nothing lives in module-level globals.
pub struct Application {
    pub config: Config,
    pub storage: Arc<StorageService>,
    pub queue: Arc<PollQueue>,
    pub upstream: Arc<dyn ReviewsFeed>,
    background: Vec<JoinHandle<()>>,
}

impl Application {
    /// Builds the shared state and spawns the worker pool and, when enabled,
    /// the scheduler. The upstream adapter is injected so tests can substitute
    /// a fixture feed.
    pub async fn start(config: Config, upstream: Arc<dyn ReviewsFeed>) -> Result<Self> {
        let queue = Arc::new(PollQueue::new());
        let storage = Arc::new(StorageService::open(config.storage.path.clone()).await?);

        for app_id in &config.storage.initial_app_ids {
            storage.create_app(App { id: *app_id }).await?;
        }

        let mut background = Vec::new();
        let mut availability = Vec::new();
        for worker_id in 0..config.polling.workers_num {
            let worker = PollWorker::new(
                worker_id,
                storage.clone(),
                queue.clone(),
                upstream.clone(),
                config.polling.reviews_depth(),
            );
            availability.push(worker.availability());
            background.push(tokio::spawn(async move { worker.run().await }));
        }
        info!("Spawned {} poll workers", config.polling.workers_num);

        if config.scheduler.enabled {
            let scheduler = SchedulerService::new(
                queue.clone(),
                storage.clone(),
                availability,
                config.scheduler.delay(),
            );
            background.push(tokio::spawn(async move { scheduler.run().await }));
            info!(
                "Scheduler enabled with a {}s sweep delay",
                config.scheduler.delay_secs
            );
        }

        Ok(Self {
            config,
            storage,
            queue,
            upstream,
            background,
        })
    }

    pub fn api_server(&self) -> ApiServer {
        ApiServer::new(
            self.config.api.clone(),
            self.storage.clone(),
            self.queue.clone(),
        )
    }

    /// Stops the scheduler and workers, then fires the latch of every task
    /// still outstanding so request handlers resume instead of hanging.
    pub async fn shutdown(&mut self) {
        for handle in self.background.drain(..) {
            handle.abort();
        }
        self.queue.release_outstanding().await;
        info!("Application shutdown complete");
    }
}
