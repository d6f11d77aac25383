//! Long-lived executor that drains the poll queue and refreshes the cache.

use crate::{
    models::{App, AppId, Review},
    polling::queue::{PollQueue, PollTask},
    storage::StorageService,
    upstream::{schemas::ReviewEntry, ReviewsFeed, MAX_PAGES},
    GatewayError, Result,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// Worker executor: pops tasks, fetches paginated reviews from upstream and
/// writes them to storage.
///
/// Any processing error is logged and swallowed; the task is completed either
/// way so that waiters never hang on a failed poll. The availability latch is
/// set while the worker is blocked on the queue and cleared while processing;
/// the scheduler paces itself by racing these latches.
pub struct PollWorker {
    id: usize,
    storage: Arc<StorageService>,
    queue: Arc<PollQueue>,
    upstream: Arc<dyn ReviewsFeed>,
    reviews_depth: chrono::Duration,
    available_tx: watch::Sender<bool>,
}

impl PollWorker {
    pub fn new(
        id: usize,
        storage: Arc<StorageService>,
        queue: Arc<PollQueue>,
        upstream: Arc<dyn ReviewsFeed>,
        reviews_depth: chrono::Duration,
    ) -> Self {
        let (available_tx, _) = watch::channel(false);
        Self {
            id,
            storage,
            queue,
            upstream,
            reviews_depth,
            available_tx,
        }
    }

    /// Availability latch: true while the worker is waiting for work.
    pub fn availability(&self) -> watch::Receiver<bool> {
        self.available_tx.subscribe()
    }

    pub async fn run(&self) {
        info!("Start worker: {}", self.id);
        loop {
            self.available_tx.send_replace(true);
            let task = self.queue.pop().await;
            self.available_tx.send_replace(false);

            if let Err(e) = self.process(&task).await {
                error!("Error reviews polling for app {}: {}", task.app_id(), e);
            }
            self.queue.mark_complete(&task).await;
        }
    }

    /// Fetches pages until the feed runs dry, the content ages out of the
    /// freshness window, or the upstream page limit is reached, then writes
    /// the collected reviews in one call.
    async fn process(&self, task: &PollTask) -> Result<()> {
        debug!("Worker {}; Processing task: {}", self.id, task.id());

        let app_id = task.app_id();
        let cutoff = Utc::now() - self.reviews_depth;
        let mut reviews: Vec<Review> = Vec::new();

        for page in 1..=MAX_PAGES {
            let response = self.upstream.get_reviews(app_id, page).await?;
            if response.feed.entry.is_empty() {
                break;
            }
            for entry in &response.feed.entry {
                reviews.push(map_entry(app_id, entry)?);
            }
            // A partial page is fine to keep; anything after the freshness
            // window would only be older.
            if let Some(last) = reviews.last() {
                if last.updated.with_timezone(&Utc) < cutoff {
                    break;
                }
            }
        }

        self.storage.create_reviews(reviews).await?;
        if self.storage.get_app(app_id).await.is_none() {
            self.storage.create_app(App { id: app_id }).await?;
        }
        Ok(())
    }
}

fn map_entry(app_id: AppId, entry: &ReviewEntry) -> Result<Review> {
    let score: u8 = entry.rating.label.parse().map_err(|_| {
        GatewayError::UpstreamSchema {
            message: format!("rating is not an integer: {:?}", entry.rating.label),
        }
    })?;
    if !(1..=5).contains(&score) {
        return Err(GatewayError::UpstreamSchema {
            message: format!("rating out of range: {score}"),
        });
    }
    let updated = DateTime::parse_from_rfc3339(&entry.updated.label).map_err(|e| {
        GatewayError::UpstreamSchema {
            message: format!("updated is not RFC3339 ({}): {:?}", e, entry.updated.label),
        }
    })?;

    Ok(Review {
        id: Review::compose_id(app_id, &entry.id.label),
        app_id,
        title: entry.title.label.clone(),
        content: entry.content.label.clone(),
        author: entry.author.name.label.clone(),
        score,
        updated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::schemas::{Author, Feed, Label, ReviewsPage};
    use async_trait::async_trait;
    use chrono::Duration;
    use std::{
        collections::HashMap,
        sync::atomic::{AtomicU32, Ordering},
    };
    use tokio::time::timeout;

    fn entry(id: &str, updated: &str, rating: &str) -> ReviewEntry {
        ReviewEntry {
            id: Label::new(id),
            author: Author {
                name: Label::new(format!("author of {id}")),
            },
            updated: Label::new(updated),
            rating: Label::new(rating),
            title: Label::new(format!("title {id}")),
            content: Label::new(format!("content {id}")),
        }
    }

    fn page(entries: Vec<ReviewEntry>) -> ReviewsPage {
        ReviewsPage {
            feed: Feed { entry: entries },
        }
    }

    /// Feed serving a fixed page sequence; counts upstream calls.
    struct PagedFeed {
        pages: HashMap<u32, ReviewsPage>,
        calls: AtomicU32,
        fail: bool,
    }

    impl PagedFeed {
        fn new(pages: Vec<ReviewsPage>) -> Self {
            Self {
                pages: pages
                    .into_iter()
                    .enumerate()
                    .map(|(i, page)| (i as u32 + 1, page))
                    .collect(),
                calls: AtomicU32::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                pages: HashMap::new(),
                calls: AtomicU32::new(0),
                fail: true,
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ReviewsFeed for PagedFeed {
        async fn get_reviews(&self, _app_id: AppId, page: u32) -> Result<ReviewsPage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(GatewayError::UpstreamSchema {
                    message: "fixture failure".to_string(),
                });
            }
            Ok(self.pages.get(&page).cloned().unwrap_or_default())
        }
    }

    fn worker(feed: Arc<PagedFeed>, depth: Duration) -> (PollWorker, Arc<StorageService>, Arc<PollQueue>) {
        let storage = Arc::new(StorageService::in_memory());
        let queue = Arc::new(PollQueue::new());
        let worker = PollWorker::new(0, storage.clone(), queue.clone(), feed, depth);
        (worker, storage, queue)
    }

    fn recent() -> String {
        (Utc::now() - Duration::minutes(5)).to_rfc3339()
    }

    #[tokio::test]
    async fn test_process_maps_entries_and_creates_app() {
        let feed = Arc::new(PagedFeed::new(vec![page(vec![entry(
            "101",
            "2024-05-01T10:00:00-07:00",
            "4",
        )])]));
        let (worker, storage, queue) = worker(feed, Duration::hours(48));

        let task = queue.push(9, false).await;
        let popped = queue.pop().await;
        worker.process(&popped).await.unwrap();
        queue.mark_complete(&task).await;

        let reviews = storage.get_review_list(9, None).await;
        assert_eq!(reviews.len(), 1);
        let review = &reviews[0];
        assert_eq!(review.id, "9_101");
        assert_eq!(review.app_id, 9);
        assert_eq!(review.score, 4);
        assert_eq!(review.author, "author of 101");
        assert_eq!(review.updated.to_rfc3339(), "2024-05-01T10:00:00-07:00");

        // unknown app gets created by the worker
        assert_eq!(storage.get_app(9).await, Some(App { id: 9 }));
    }

    #[tokio::test]
    async fn test_pagination_stops_at_empty_page() {
        let feed = Arc::new(PagedFeed::new(vec![
            page(vec![entry("1", &recent(), "5")]),
            page(vec![]),
            page(vec![entry("ghost", &recent(), "5")]),
        ]));
        let (worker, storage, queue) = worker(feed.clone(), Duration::hours(48));

        queue.push(1, false).await;
        let task = queue.pop().await;
        worker.process(&task).await.unwrap();

        assert_eq!(feed.calls(), 2);
        assert_eq!(storage.get_review_list(1, None).await.len(), 1);
    }

    #[tokio::test]
    async fn test_pagination_stops_when_content_ages_out() {
        let stale = (Utc::now() - Duration::days(30)).to_rfc3339();
        let feed = Arc::new(PagedFeed::new(vec![
            page(vec![entry("1", &stale, "5")]),
            page(vec![entry("2", &stale, "5")]),
        ]));
        let (worker, storage, queue) = worker(feed.clone(), Duration::hours(48));

        queue.push(1, false).await;
        let task = queue.pop().await;
        worker.process(&task).await.unwrap();

        // the second page is never requested
        assert_eq!(feed.calls(), 1);
        assert_eq!(storage.get_review_list(1, None).await.len(), 1);
    }

    #[tokio::test]
    async fn test_pagination_never_exceeds_upstream_limit() {
        let pages = (0..20)
            .map(|i| page(vec![entry(&format!("{i}"), &recent(), "5")]))
            .collect();
        let feed = Arc::new(PagedFeed::new(pages));
        let (worker, storage, queue) = worker(feed.clone(), Duration::hours(48));

        queue.push(1, false).await;
        let task = queue.pop().await;
        worker.process(&task).await.unwrap();

        assert_eq!(feed.calls(), MAX_PAGES);
        assert_eq!(storage.get_review_list(1, None).await.len(), MAX_PAGES as usize);
    }

    #[tokio::test]
    async fn test_schema_mismatch_writes_nothing() {
        let feed = Arc::new(PagedFeed::new(vec![page(vec![
            entry("ok", &recent(), "5"),
            entry("bad", &recent(), "five stars"),
        ])]));
        let (worker, storage, queue) = worker(feed, Duration::hours(48));

        queue.push(1, false).await;
        let task = queue.pop().await;
        let result = worker.process(&task).await;

        assert!(matches!(result, Err(GatewayError::UpstreamSchema { .. })));
        assert!(storage.get_review_list(1, None).await.is_empty());
    }

    #[tokio::test]
    async fn test_run_completes_task_even_on_failure() {
        let feed = Arc::new(PagedFeed::failing());
        let (worker, storage, queue) = worker(feed, Duration::hours(48));

        let runner = tokio::spawn(async move { worker.run().await });
        let task = queue.push(1, false).await;

        timeout(std::time::Duration::from_secs(1), task.await_completion())
            .await
            .expect("failed poll must still complete its task");
        assert!(queue.is_completed(&task.id()).await);
        assert!(storage.get_review_list(1, None).await.is_empty());

        runner.abort();
    }

    #[tokio::test]
    async fn test_availability_latch_tracks_idleness() {
        let feed = Arc::new(PagedFeed::new(vec![]));
        let (worker, _storage, queue) = worker(feed, Duration::hours(48));
        let mut availability = worker.availability();
        assert!(!*availability.borrow());

        let runner = tokio::spawn(async move { worker.run().await });

        // idle worker advertises availability
        timeout(std::time::Duration::from_secs(1), async {
            availability.wait_for(|available| *available).await.unwrap();
        })
        .await
        .expect("idle worker should become available");

        let task = queue.push(1, false).await;
        task.await_completion().await;

        runner.abort();
    }
}
