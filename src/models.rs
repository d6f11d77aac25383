use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// AppStore application identifier, assigned by the upstream catalog.
pub type AppId = u64;

/// Composite review identifier: `"<AppId>_<upstream-review-id>"`.
///
/// Upstream review ids are only unique within one app, so the app id is
/// baked into the key to keep reviews of different apps from colliding.
pub type ReviewId = String;

/// An application known to the gateway.
///
/// Carries only identity for now; the cache tracks reviews per app id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct App {
    pub id: AppId,
}

/// A single customer review as stored and served by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub app_id: AppId,
    pub title: String,
    pub content: String,
    pub author: String,
    pub score: u8,
    pub updated: DateTime<FixedOffset>,
}

impl Review {
    /// Builds the composite review id from the app id and the raw upstream id.
    pub fn compose_id(app_id: AppId, upstream_id: &str) -> ReviewId {
        format!("{app_id}_{upstream_id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_id_embeds_app_id() {
        let id = Review::compose_id(415458524, "11223344");
        assert_eq!(id, "415458524_11223344");
        assert!(id.starts_with("415458524_"));
    }

    #[test]
    fn test_review_serializes_camel_case_rfc3339() {
        let review = Review {
            id: Review::compose_id(1, "2"),
            app_id: 1,
            title: "Great".to_string(),
            content: "Works well".to_string(),
            author: "someone".to_string(),
            score: 5,
            updated: DateTime::parse_from_rfc3339("2024-05-01T10:00:00-07:00").unwrap(),
        };

        let json = serde_json::to_value(&review).unwrap();
        assert_eq!(json["appId"], 1);
        assert_eq!(json["updated"], "2024-05-01T10:00:00-07:00");
        assert!(json.get("app_id").is_none());
    }
}
