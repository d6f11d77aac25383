//! Upstream feed adapter: the only dynamic dispatch seam in the core.
//!
//! Workers talk to [`ReviewsFeed`] so tests can swap the real HTTP client for
//! a fixture-returning mock.

use crate::{config::UpstreamConfig, models::AppId, Result};
use async_trait::async_trait;
use tracing::debug;
use url::Url;

pub mod schemas;

pub use schemas::ReviewsPage;

/// Hard pagination limit enforced by the upstream server.
pub const MAX_PAGES: u32 = 10;

/// Fetches one page of reviews for one app from the third party.
#[async_trait]
pub trait ReviewsFeed: Send + Sync {
    /// Gets page `page` (1-based, at most [`MAX_PAGES`]) of the most recent
    /// reviews for `app_id`.
    async fn get_reviews(&self, app_id: AppId, page: u32) -> Result<ReviewsPage>;
}

/// HTTP adapter for the third party iTunes RSS server.
pub struct ItunesRssClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ItunesRssClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let base_url = Url::parse(&config.rss_host).map_err(|e| {
            crate::GatewayError::ConfigurationError(format!(
                "HTTP_EXTERNAL_RSS_HOST is not a valid URL: {e}"
            ))
        })?;
        if base_url.cannot_be_a_base() || base_url.host_str().is_none() {
            return Err(crate::GatewayError::ConfigurationError(format!(
                "HTTP_EXTERNAL_RSS_HOST must be an absolute http(s) URL: {}",
                config.rss_host
            )));
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self { http, base_url })
    }

    // Panics on page out of 1..=MAX_PAGES: the caller is expected to stay
    // within the upstream's hard limit.
    fn reviews_url(&self, app_id: AppId, page: u32) -> Url {
        assert!(
            (1..=MAX_PAGES).contains(&page),
            "page {page} outside the upstream limit of {MAX_PAGES}"
        );
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .expect("upstream base URL cannot be a base");
            segments.pop_if_empty();
            segments.push(&format!("id={app_id}"));
            segments.push("sortBy=mostRecent");
            segments.push(&format!("page={page}"));
            segments.push("json");
        }
        url
    }
}

#[async_trait]
impl ReviewsFeed for ItunesRssClient {
    async fn get_reviews(&self, app_id: AppId, page: u32) -> Result<ReviewsPage> {
        let url = self.reviews_url(app_id, page);
        debug!("Fetching reviews page: {}", url);

        let response = self.http.get(url).send().await?.error_for_status()?;
        let reviews = response.json::<ReviewsPage>().await?;
        Ok(reviews)
    }
}
