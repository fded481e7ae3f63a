use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{ValidationError, ViewerKey};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub slug: String,
    pub views: u64,
    pub likes: u64,
    pub comments: Vec<Comment>,
}

impl Post {
    pub fn empty(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub name: String,
    pub text: String,
    #[serde(deserialize_with = "lenient_utc")]
    pub date: DateTime<Utc>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub replies: Vec<Comment>,
}

impl Comment {
    pub fn new(name: impl Into<String>, text: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            id: new_comment_id(),
            name: name.into(),
            text: text.into(),
            date,
            replies: Vec::new(),
        }
    }
}

/// 16 random bytes, hex encoded.
fn new_comment_id() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}

/// Submission payload for a comment, before it gets an id and timestamp.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewComment {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, rename = "parentId")]
    pub parent_id: Option<String>,
}

impl NewComment {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() || self.text.is_empty() {
            return Err(ValidationError::MissingNameOrText);
        }
        Ok(())
    }

    /// An empty parent id counts as a top-level comment.
    pub fn parent(&self) -> Option<&str> {
        self.parent_id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn into_comment(self, now: DateTime<Utc>) -> Result<Comment, ValidationError> {
        self.validate()?;
        Ok(Comment::new(self.name, self.text, now))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewEvent {
    pub slug: String,
    pub viewer: ViewerKey,
    pub expire_at: DateTime<Utc>,
}

impl ViewEvent {
    pub fn new(slug: impl Into<String>, viewer: ViewerKey, expire_at: DateTime<Utc>) -> Self {
        Self {
            slug: slug.into(),
            viewer,
            expire_at,
        }
    }

    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expire_at > now
    }
}

// 旧数据里的 date 是不带时区的 ISO 字符串，按 UTC 处理
fn lenient_utc<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Comment>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Comment>>::deserialize(deserializer)?.unwrap_or_default())
}
