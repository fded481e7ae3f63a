use async_trait::async_trait;
use domain::{Comment, CommentPath, ViewEvent};
use mongodb::{options::ClientOptions, Client, Collection, Database};
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

mod error;
mod memory;
mod models;
mod repo;

pub use error::StoreError;
pub use memory::MemoryStore;

use models::{PostDocument, ViewEventDocument};

pub const MEMORY_URL_SCHEME: &str = "memory://";

/// Persistence seam for posts and view events.
///
/// Missing posts read as zero counters and no comments; every write that
/// targets a post creates it first if needed.
#[async_trait]
pub trait PostStore: Send + Sync {
    fn backend(&self) -> &'static str;

    async fn ping(&self) -> Result<(), StoreError>;

    /// Idempotent; safe to call repeatedly.
    async fn ensure_indexes(&self) -> Result<(), StoreError>;

    async fn ensure_post(&self, slug: &str) -> Result<(), StoreError>;

    /// Fails with [`StoreError::Duplicate`] while a live event exists for the same (slug, viewer).
    async fn insert_view_event(&self, event: &ViewEvent) -> Result<(), StoreError>;

    async fn increment_views(&self, slug: &str) -> Result<(), StoreError>;

    async fn views(&self, slug: &str) -> Result<u64, StoreError>;

    async fn likes(&self, slug: &str) -> Result<u64, StoreError>;

    /// Atomic upsert-and-increment. Returns the post-increment count.
    async fn increment_likes(&self, slug: &str) -> Result<u64, StoreError>;

    /// `None` when the post does not exist.
    async fn comments(&self, slug: &str) -> Result<Option<Vec<Comment>>, StoreError>;

    /// Appends a top-level comment, creating the post if absent.
    async fn push_comment(&self, slug: &str, comment: &Comment) -> Result<(), StoreError>;

    /// Appends `reply` under the comment at `parent`, provided that comment still has `parent_id`.
    /// Returns whether a comment was matched.
    async fn push_reply(
        &self,
        slug: &str,
        parent: &CommentPath,
        parent_id: &str,
        reply: &Comment,
    ) -> Result<bool, StoreError>;

    async fn shutdown(&self);
}

/// Picks a backend from the connection string.
pub async fn connect(url: &str, db_name: &str) -> anyhow::Result<Arc<dyn PostStore>> {
    if url.starts_with(MEMORY_URL_SCHEME) {
        info!("Using in-memory store");
        return Ok(Arc::new(MemoryStore::new()));
    }
    Ok(Arc::new(Db::new(url, db_name).await?))
}

/// Only the dedup indexes decide the result. Older data may hold several
/// posts per slug, so the unique slug index is allowed to fail.
async fn ensure_dedup_indexes<V, P>(views: V, posts: P) -> Result<(), StoreError>
where
    V: Future<Output = Result<(), StoreError>>,
    P: Future<Output = Result<(), StoreError>>,
{
    let views = views.await;
    if let Err(e) = posts.await {
        warn!("Unique slug index on posts not created: {}", e);
    }
    views
}

#[derive(Clone)]
pub struct Db {
    client: Client,
    db: Database,
}

impl Db {
    pub async fn new(url: &str, db_name: &str) -> anyhow::Result<Self> {
        let mut options = ClientOptions::parse(url).await?;
        options.app_name = Some("post-interactions".to_string());
        let client = Client::with_options(options)?;
        let db = client.database(db_name);
        info!("MongoDB client ready (database: {})", db_name);
        Ok(Self { client, db })
    }

    pub(crate) fn posts(&self) -> Collection<PostDocument> {
        self.db.collection("posts")
    }

    pub(crate) fn views_events(&self) -> Collection<ViewEventDocument> {
        self.db.collection("views")
    }
}

#[async_trait]
impl PostStore for Db {
    fn backend(&self) -> &'static str {
        "mongodb"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.run_ping().await
    }

    async fn ensure_indexes(&self) -> Result<(), StoreError> {
        ensure_dedup_indexes(self.create_view_indexes(), self.create_post_indexes()).await
    }

    async fn ensure_post(&self, slug: &str) -> Result<(), StoreError> {
        self.upsert_post(slug).await
    }

    async fn insert_view_event(&self, event: &ViewEvent) -> Result<(), StoreError> {
        self.insert_view(event).await
    }

    async fn increment_views(&self, slug: &str) -> Result<(), StoreError> {
        self.inc_views(slug).await
    }

    async fn views(&self, slug: &str) -> Result<u64, StoreError> {
        self.get_views(slug).await
    }

    async fn likes(&self, slug: &str) -> Result<u64, StoreError> {
        self.get_likes(slug).await
    }

    async fn increment_likes(&self, slug: &str) -> Result<u64, StoreError> {
        self.inc_likes(slug).await
    }

    async fn comments(&self, slug: &str) -> Result<Option<Vec<Comment>>, StoreError> {
        self.get_comments(slug).await
    }

    async fn push_comment(&self, slug: &str, comment: &Comment) -> Result<(), StoreError> {
        self.push_top_level(slug, comment).await
    }

    async fn push_reply(
        &self,
        slug: &str,
        parent: &CommentPath,
        parent_id: &str,
        reply: &Comment,
    ) -> Result<bool, StoreError> {
        self.push_at(slug, parent, parent_id, reply).await
    }

    async fn shutdown(&self) {
        self.client.clone().shutdown().await;
        info!("MongoDB client closed");
    }
}
