use chrono::{DateTime, Utc};
use domain::{Comment, ViewEvent};
use mongodb::bson;
use serde::{Deserialize, Serialize};

/// `posts` collection layout. Projections leave fields out, hence the defaults.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PostDocument {
    pub slug: String,
    pub views: i64,
    pub likes: i64,
    pub comments: Vec<Comment>,
}

/// `views` collection layout; `expireAt` carries the TTL index.
#[derive(Debug, Serialize, Deserialize)]
pub struct ViewEventDocument {
    pub slug: String,
    pub viewer: String,
    #[serde(rename = "expireAt")]
    pub expire_at: bson::DateTime,
}

impl From<&ViewEvent> for ViewEventDocument {
    fn from(event: &ViewEvent) -> Self {
        ViewEventDocument {
            slug: event.slug.clone(),
            viewer: event.viewer.as_str().to_string(),
            expire_at: to_bson_datetime(event.expire_at),
        }
    }
}

pub fn to_bson_datetime(dt: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_millis(dt.timestamp_millis())
}

/// Counters are never negative; anything else in the document reads as zero.
pub fn counter(raw: i64) -> u64 {
    u64::try_from(raw).unwrap_or(0)
}
