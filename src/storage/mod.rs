//! Persistence service: the local source of truth for apps and reviews.
//!
//! Backed by in-memory maps; when a path is configured the whole document is
//! loaded at startup and atomically rewritten after each mutation. The file
//! layout is not safe for concurrent writer processes, so the gateway runs as
//! a single instance.

use crate::{
    models::{App, AppId, Review, ReviewId},
    Result,
};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StorageData {
    apps: HashMap<AppId, App>,
    reviews: HashMap<ReviewId, Review>,
}

/// Persistent map of apps and reviews with async get/put.
pub struct StorageService {
    data: Mutex<StorageData>,
    path: Option<PathBuf>,
}

impl StorageService {
    /// Opens the store, loading the persisted document when `path` points to
    /// an existing file.
    pub async fn open(path: Option<PathBuf>) -> Result<Self> {
        let data = match &path {
            Some(path) if tokio::fs::try_exists(path).await? => {
                let raw = tokio::fs::read(path).await?;
                let data: StorageData = serde_json::from_slice(&raw)?;
                debug!(
                    "Loaded storage from {}: {} apps, {} reviews",
                    path.display(),
                    data.apps.len(),
                    data.reviews.len()
                );
                data
            }
            _ => StorageData::default(),
        };

        Ok(Self {
            data: Mutex::new(data),
            path,
        })
    }

    /// In-memory store, used by tests and when no persistence path is set.
    pub fn in_memory() -> Self {
        Self {
            data: Mutex::new(StorageData::default()),
            path: None,
        }
    }

    /// Idempotent upsert keyed by app id.
    pub async fn create_app(&self, app: App) -> Result<()> {
        debug!("Creating app: {}", app.id);
        let mut data = self.data.lock().await;
        data.apps.insert(app.id, app);
        self.persist(&data).await
    }

    pub async fn get_app(&self, app_id: AppId) -> Option<App> {
        let data = self.data.lock().await;
        data.apps.get(&app_id).copied()
    }

    pub async fn get_app_list(&self) -> Vec<App> {
        let data = self.data.lock().await;
        data.apps.values().copied().collect()
    }

    /// Upsert keyed by the composite review id.
    pub async fn create_reviews(&self, reviews: Vec<Review>) -> Result<()> {
        debug!("Creating reviews: {}", reviews.len());
        let mut data = self.data.lock().await;
        for review in reviews {
            data.reviews.insert(review.id.clone(), review);
        }
        self.persist(&data).await
    }

    pub async fn get_review(&self, review_id: &str) -> Option<Review> {
        let data = self.data.lock().await;
        data.reviews.get(review_id).cloned()
    }

    /// Reviews for one app, newest first, optionally bounded by `updated_min`.
    pub async fn get_review_list(
        &self,
        app_id: AppId,
        updated_min: Option<DateTime<FixedOffset>>,
    ) -> Vec<Review> {
        let data = self.data.lock().await;
        let mut reviews: Vec<Review> = data
            .reviews
            .values()
            .filter(|review| review.app_id == app_id)
            .filter(|review| updated_min.map_or(true, |min| review.updated >= min))
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.updated.cmp(&a.updated));
        reviews
    }

    // Rewrite is atomic: the document lands in a sibling temp file first and
    // is renamed over the target. Called with the data lock held.
    async fn persist(&self, data: &StorageData) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let raw = serde_json::to_vec_pretty(data)?;
        let tmp = tmp_path(path);
        tokio::fs::write(&tmp, raw).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}
