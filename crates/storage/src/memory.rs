use crate::{PostStore, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use domain::{tree, Comment, CommentPath, Post, ViewEvent, ViewerKey};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// In-process store. Expired view events are swept on every insert.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    posts: HashMap<String, Post>,
    views: HashMap<(String, ViewerKey), ViewEvent>,
}

impl Inner {
    fn post_mut(&mut self, slug: &str) -> &mut Post {
        self.posts
            .entry(slug.to_string())
            .or_insert_with(|| Post::empty(slug))
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full snapshot of a post, for inspection.
    pub fn post(&self, slug: &str) -> Option<Post> {
        self.lock().ok()?.posts.get(slug).cloned()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }

    async fn ensure_indexes(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn ensure_post(&self, slug: &str) -> Result<(), StoreError> {
        self.lock()?.post_mut(slug);
        Ok(())
    }

    async fn insert_view_event(&self, event: &ViewEvent) -> Result<(), StoreError> {
        let now = Utc::now();
        let mut inner = self.lock()?;
        // 相当于 TTL 索引的后台清理
        inner.views.retain(|_, existing| existing.is_live(now));

        let key = (event.slug.clone(), event.viewer.clone());
        if inner.views.contains_key(&key) {
            return Err(StoreError::Duplicate);
        }
        inner.views.insert(key, event.clone());
        Ok(())
    }

    async fn increment_views(&self, slug: &str) -> Result<(), StoreError> {
        if let Some(post) = self.lock()?.posts.get_mut(slug) {
            post.views += 1;
        }
        Ok(())
    }

    async fn views(&self, slug: &str) -> Result<u64, StoreError> {
        Ok(self.lock()?.posts.get(slug).map_or(0, |p| p.views))
    }

    async fn likes(&self, slug: &str) -> Result<u64, StoreError> {
        Ok(self.lock()?.posts.get(slug).map_or(0, |p| p.likes))
    }

    async fn increment_likes(&self, slug: &str) -> Result<u64, StoreError> {
        let mut inner = self.lock()?;
        let post = inner.post_mut(slug);
        post.likes += 1;
        Ok(post.likes)
    }

    async fn comments(&self, slug: &str) -> Result<Option<Vec<Comment>>, StoreError> {
        Ok(self.lock()?.posts.get(slug).map(|p| p.comments.clone()))
    }

    async fn push_comment(&self, slug: &str, comment: &Comment) -> Result<(), StoreError> {
        self.lock()?.post_mut(slug).comments.push(comment.clone());
        Ok(())
    }

    async fn push_reply(
        &self,
        slug: &str,
        parent: &CommentPath,
        parent_id: &str,
        reply: &Comment,
    ) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;
        let Some(post) = inner.posts.get_mut(slug) else {
            return Ok(false);
        };
        match tree::node_at_mut(&mut post.comments, parent) {
            Some(node) if node.id == parent_id => {
                node.replies.push(reply.clone());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn shutdown(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn event(slug: &str, viewer: &str, ttl: Duration) -> ViewEvent {
        ViewEvent::new(slug, ViewerKey::new(viewer), Utc::now() + ttl)
    }

    #[tokio::test]
    async fn absent_posts_read_as_empty() {
        let store = MemoryStore::new();
        assert_eq!(store.views("nope").await.unwrap(), 0);
        assert_eq!(store.likes("nope").await.unwrap(), 0);
        assert!(store.comments("nope").await.unwrap().is_none());
        assert!(store.post("nope").is_none());
    }

    #[tokio::test]
    async fn live_view_event_is_a_duplicate() {
        let store = MemoryStore::new();
        let first = event("p", "1.2.3.4", Duration::hours(1));
        store.insert_view_event(&first).await.unwrap();

        let again = store.insert_view_event(&first).await.unwrap_err();
        assert!(again.is_duplicate());

        // other viewer, other slug
        store
            .insert_view_event(&event("p", "5.6.7.8", Duration::hours(1)))
            .await
            .unwrap();
        store
            .insert_view_event(&event("q", "1.2.3.4", Duration::hours(1)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn expired_view_event_is_replaced() {
        let store = MemoryStore::new();
        store
            .insert_view_event(&event("p", "1.2.3.4", Duration::zero()))
            .await
            .unwrap();
        store
            .insert_view_event(&event("p", "1.2.3.4", Duration::hours(1)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn expired_view_events_are_swept() {
        let store = MemoryStore::new();
        for i in 0..1000 {
            store
                .insert_view_event(&event("p", &format!("viewer-{i}"), Duration::zero()))
                .await
                .unwrap();
        }
        store
            .insert_view_event(&event("p", "1.2.3.4", Duration::hours(1)))
            .await
            .unwrap();

        let inner = store.inner.lock().unwrap();
        assert_eq!(inner.views.len(), 1);
        assert!(inner
            .views
            .contains_key(&("p".to_string(), ViewerKey::new("1.2.3.4"))));
    }

    #[tokio::test]
    async fn push_reply_checks_parent_id_at_path() {
        let store = MemoryStore::new();
        let root = Comment::new("Ann", "Hi", Utc::now());
        store.push_comment("p", &root).await.unwrap();

        let reply = Comment::new("Bo", "Re", Utc::now());
        let path = CommentPath::new(vec![0]);
        assert!(!store.push_reply("p", &path, "wrong", &reply).await.unwrap());
        assert!(!store
            .push_reply("p", &CommentPath::new(vec![3]), &root.id, &reply)
            .await
            .unwrap());
        assert!(store.push_reply("p", &path, &root.id, &reply).await.unwrap());

        let post = store.post("p").unwrap();
        assert_eq!(post.comments[0].replies, vec![reply]);
        assert_eq!(post.views, 0);
        assert_eq!(post.likes, 0);
    }

    #[tokio::test]
    async fn increment_likes_creates_post() {
        let store = MemoryStore::new();
        assert_eq!(store.increment_likes("p").await.unwrap(), 1);
        assert_eq!(store.increment_likes("p").await.unwrap(), 2);
        let post = store.post("p").unwrap();
        assert_eq!(post.views, 0);
        assert!(post.comments.is_empty());
    }
}
