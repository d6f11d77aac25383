//! Wire shapes of the iTunes customer reviews feed.
//!
//! Every leaf value in the feed arrives wrapped as `{"label": ...}`. Only the
//! fields the gateway consumes are modeled; unknown keys are ignored.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Label {
    pub label: String,
}

impl Label {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Author {
    pub name: Label,
}

/// One review entry of the feed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewEntry {
    pub id: Label,
    pub author: Author,
    pub updated: Label,
    #[serde(rename = "im:rating")]
    pub rating: Label,
    pub title: Label,
    pub content: Label,
}

/// The feed omits the `entry` key entirely when a page is empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Feed {
    #[serde(default)]
    pub entry: Vec<ReviewEntry>,
}

/// One page of the reviews feed, as returned by [`ReviewsFeed::get_reviews`].
///
/// [`ReviewsFeed::get_reviews`]: super::ReviewsFeed::get_reviews
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewsPage {
    pub feed: Feed,
}
