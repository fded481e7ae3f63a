use chrono::{Duration, Utc};
use domain::{tree, Comment, CommentPath, NewComment, ValidationError, ViewEvent, ViewerKey};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use storage::{PostStore, StoreError};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Settings;

const MAX_DEDUP_WINDOW_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum InteractionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Parent comment {0} not found")]
    ParentNotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone, Debug)]
pub struct InteractionOptions {
    pub dedup_window: Duration,
    pub strict_parent: bool,
}

impl Default for InteractionOptions {
    fn default() -> Self {
        Self {
            dedup_window: Duration::hours(1),
            strict_parent: false,
        }
    }
}

impl From<&Settings> for InteractionOptions {
    fn from(settings: &Settings) -> Self {
        let secs = settings.views.dedup_window_secs.min(MAX_DEDUP_WINDOW_SECS);
        Self {
            dedup_window: Duration::seconds(secs as i64),
            strict_parent: settings.comments.strict_parent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewOutcome {
    Counted,
    /// A live event for this viewer already exists.
    Duplicate,
    /// The store failed mid-way; the view was let through uncounted.
    Unrecorded,
}

#[derive(Debug, Clone, Copy)]
pub struct RecordedView {
    pub views: u64,
    pub outcome: ViewOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentPlacement {
    TopLevel,
    Reply(CommentPath),
    /// Parent id matched nothing; the comment was not stored.
    Orphaned,
}

#[derive(Debug, Clone)]
pub struct AddedComment {
    pub comment: Comment,
    pub placement: CommentPlacement,
}

/// Views, likes and comment threads for posts, on top of a [`PostStore`].
#[derive(Clone)]
pub struct Interactions {
    store: Arc<dyn PostStore>,
    options: InteractionOptions,
    indexes_ready: Arc<AtomicBool>,
}

impl Interactions {
    pub fn new(store: Arc<dyn PostStore>, options: InteractionOptions) -> Self {
        Self {
            store,
            options,
            indexes_ready: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        self.store.ping().await
    }

    /// Best effort. Retried from [`Self::record_view`] until it succeeds once.
    pub async fn ensure_indexes(&self) {
        if self.indexes_ready.load(Ordering::Relaxed) {
            return;
        }
        match self.store.ensure_indexes().await {
            Ok(()) => {
                self.indexes_ready.store(true, Ordering::Relaxed);
                info!("Store indexes ready ({})", self.store.backend());
            }
            Err(e) => warn!("Index creation failed, will retry: {}", e),
        }
    }

    pub async fn shutdown(&self) {
        self.store.shutdown().await;
    }

    pub async fn record_view(
        &self,
        slug: &str,
        viewer: ViewerKey,
    ) -> Result<RecordedView, StoreError> {
        self.ensure_indexes().await;
        self.store.ensure_post(slug).await?;

        let event = ViewEvent::new(slug, viewer, Utc::now() + self.options.dedup_window);
        let outcome = match self.store.insert_view_event(&event).await {
            Ok(()) => match self.store.increment_views(slug).await {
                Ok(()) => ViewOutcome::Counted,
                Err(e) => {
                    warn!("View for {} not counted: {}", slug, e);
                    ViewOutcome::Unrecorded
                }
            },
            Err(StoreError::Duplicate) => {
                debug!("Repeat view of {} by {}", slug, event.viewer);
                ViewOutcome::Duplicate
            }
            // fail-open：统计不准好过接口报错
            Err(e) => {
                warn!("View dedup insert failed for {}: {}", slug, e);
                ViewOutcome::Unrecorded
            }
        };

        let views = self.store.views(slug).await?;
        Ok(RecordedView { views, outcome })
    }

    pub async fn get_views(&self, slug: &str) -> Result<u64, StoreError> {
        self.store.views(slug).await
    }

    pub async fn get_likes(&self, slug: &str) -> Result<u64, StoreError> {
        self.store.likes(slug).await
    }

    pub async fn like_post(&self, slug: &str) -> Result<u64, StoreError> {
        self.store.increment_likes(slug).await
    }

    pub async fn get_comments(&self, slug: &str) -> Result<Vec<Comment>, StoreError> {
        Ok(self.store.comments(slug).await?.unwrap_or_default())
    }

    pub async fn add_comment(
        &self,
        slug: &str,
        input: NewComment,
    ) -> Result<AddedComment, InteractionError> {
        let parent_id = input.parent().map(str::to_owned);
        let comment = input.into_comment(Utc::now())?;

        let Some(parent_id) = parent_id else {
            self.store.push_comment(slug, &comment).await?;
            return Ok(AddedComment {
                comment,
                placement: CommentPlacement::TopLevel,
            });
        };

        // 文章不存在时，回复也作为顶层评论落库
        let Some(existing) = self.store.comments(slug).await? else {
            self.store.push_comment(slug, &comment).await?;
            return Ok(AddedComment {
                comment,
                placement: CommentPlacement::TopLevel,
            });
        };

        if let Some(path) = tree::locate(&existing, &parent_id) {
            if self
                .store
                .push_reply(slug, &path, &parent_id, &comment)
                .await?
            {
                return Ok(AddedComment {
                    comment,
                    placement: CommentPlacement::Reply(path),
                });
            }
        }

        if self.options.strict_parent {
            return Err(InteractionError::ParentNotFound(parent_id));
        }
        warn!(
            "Reply {} on {} dropped: parent {} not found",
            comment.id, slug, parent_id
        );
        Ok(AddedComment {
            comment,
            placement: CommentPlacement::Orphaned,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use storage::MemoryStore;

    fn service(store: &MemoryStore) -> Interactions {
        Interactions::new(Arc::new(store.clone()), InteractionOptions::default())
    }

    fn new_comment(name: &str, text: &str, parent: Option<&str>) -> NewComment {
        NewComment {
            name: name.to_string(),
            text: text.to_string(),
            parent_id: parent.map(str::to_string),
        }
    }

    fn viewer(ip: &str) -> ViewerKey {
        ViewerKey::new(ip)
    }

    #[tokio::test]
    async fn unseen_slugs_read_as_zero() {
        let svc = service(&MemoryStore::new());
        assert_eq!(svc.get_views("never").await.unwrap(), 0);
        assert_eq!(svc.get_likes("never").await.unwrap(), 0);
        assert!(svc.get_comments("never").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn repeat_views_within_window_count_once() {
        let store = MemoryStore::new();
        let svc = service(&store);

        let first = svc.record_view("p", viewer("1.2.3.4")).await.unwrap();
        assert_eq!((first.views, first.outcome), (1, ViewOutcome::Counted));

        let again = svc.record_view("p", viewer("1.2.3.4")).await.unwrap();
        assert_eq!((again.views, again.outcome), (1, ViewOutcome::Duplicate));

        let other = svc.record_view("p", viewer("5.6.7.8")).await.unwrap();
        assert_eq!(other.views, 2);
        assert_eq!(svc.get_views("p").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn views_count_again_after_window() {
        let store = MemoryStore::new();
        let svc = Interactions::new(
            Arc::new(store.clone()),
            InteractionOptions {
                dedup_window: Duration::zero(),
                ..Default::default()
            },
        );
        svc.record_view("p", viewer("1.2.3.4")).await.unwrap();
        let again = svc.record_view("p", viewer("1.2.3.4")).await.unwrap();
        assert_eq!(again.views, 2);
        assert_eq!(again.outcome, ViewOutcome::Counted);
    }

    #[tokio::test]
    async fn first_view_creates_empty_post() {
        let store = MemoryStore::new();
        service(&store).record_view("p", viewer("unknown")).await.unwrap();
        let post = store.post("p").unwrap();
        assert_eq!((post.views, post.likes), (1, 0));
        assert!(post.comments.is_empty());
    }

    /// Delegates to a [`MemoryStore`] but fails every view-event insert.
    struct BrokenDedup(MemoryStore);

    #[async_trait]
    impl PostStore for BrokenDedup {
        fn backend(&self) -> &'static str {
            "broken"
        }
        async fn ping(&self) -> Result<(), StoreError> {
            self.0.ping().await
        }
        async fn ensure_indexes(&self) -> Result<(), StoreError> {
            Err(StoreError::Poisoned)
        }
        async fn ensure_post(&self, slug: &str) -> Result<(), StoreError> {
            self.0.ensure_post(slug).await
        }
        async fn insert_view_event(&self, _event: &ViewEvent) -> Result<(), StoreError> {
            Err(StoreError::Poisoned)
        }
        async fn increment_views(&self, slug: &str) -> Result<(), StoreError> {
            self.0.increment_views(slug).await
        }
        async fn views(&self, slug: &str) -> Result<u64, StoreError> {
            self.0.views(slug).await
        }
        async fn likes(&self, slug: &str) -> Result<u64, StoreError> {
            self.0.likes(slug).await
        }
        async fn increment_likes(&self, slug: &str) -> Result<u64, StoreError> {
            self.0.increment_likes(slug).await
        }
        async fn comments(&self, slug: &str) -> Result<Option<Vec<Comment>>, StoreError> {
            self.0.comments(slug).await
        }
        async fn push_comment(&self, slug: &str, comment: &Comment) -> Result<(), StoreError> {
            self.0.push_comment(slug, comment).await
        }
        async fn push_reply(
            &self,
            slug: &str,
            parent: &CommentPath,
            parent_id: &str,
            reply: &Comment,
        ) -> Result<bool, StoreError> {
            self.0.push_reply(slug, parent, parent_id, reply).await
        }
        async fn shutdown(&self) {}
    }

    #[tokio::test]
    async fn dedup_failures_fail_open() {
        let svc = Interactions::new(
            Arc::new(BrokenDedup(MemoryStore::new())),
            InteractionOptions::default(),
        );
        let recorded = svc.record_view("p", viewer("1.2.3.4")).await.unwrap();
        assert_eq!(recorded.views, 0);
        assert_eq!(recorded.outcome, ViewOutcome::Unrecorded);
        assert!(!svc.indexes_ready.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn concurrent_likes_are_not_lost() {
        let store = MemoryStore::new();
        let svc = service(&store);
        let tasks: Vec<_> = (0..50)
            .map(|_| {
                let svc = svc.clone();
                tokio::spawn(async move { svc.like_post("p").await.unwrap() })
            })
            .collect();
        let mut seen: Vec<u64> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        seen.sort_unstable();

        assert_eq!(seen, (1..=50).collect::<Vec<u64>>());
        assert_eq!(svc.get_likes("p").await.unwrap(), 50);
    }

    #[tokio::test]
    async fn invalid_comment_touches_nothing() {
        let store = MemoryStore::new();
        let svc = service(&store);
        let err = svc
            .add_comment("p", new_comment("", "Hi", None))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InteractionError::Validation(ValidationError::MissingNameOrText)
        ));
        assert!(store.post("p").is_none());
    }

    #[tokio::test]
    async fn top_level_comments_keep_order() {
        let svc = service(&MemoryStore::new());
        for name in ["a", "b", "c"] {
            let added = svc.add_comment("p", new_comment(name, "t", None)).await.unwrap();
            assert_eq!(added.placement, CommentPlacement::TopLevel);
        }
        let names: Vec<_> = svc
            .get_comments("p")
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn deep_reply_leaves_siblings_unchanged() {
        let store = MemoryStore::new();
        let svc = service(&store);
        let root = svc.add_comment("p", new_comment("root", "t", None)).await.unwrap().comment;
        let sibling = svc.add_comment("p", new_comment("sib", "t", None)).await.unwrap().comment;
        let child = svc
            .add_comment("p", new_comment("child", "t", Some(&root.id)))
            .await
            .unwrap()
            .comment;
        svc.add_comment("p", new_comment("child2", "t", Some(&root.id)))
            .await
            .unwrap();

        let before = svc.get_comments("p").await.unwrap();
        let added = svc
            .add_comment("p", new_comment("grandchild", "t", Some(&child.id)))
            .await
            .unwrap();
        assert_eq!(added.placement, CommentPlacement::Reply(CommentPath::new(vec![0, 0])));

        let after = svc.get_comments("p").await.unwrap();
        assert_eq!(after[1], before[1]);
        assert_eq!(after[1].id, sibling.id);
        assert_eq!(after[0].replies[1], before[0].replies[1]);
        assert_eq!(after[0].replies[0].replies, vec![added.comment]);
    }

    #[tokio::test]
    async fn unknown_parent_is_dropped_by_default() {
        let store = MemoryStore::new();
        let svc = service(&store);
        svc.add_comment("p", new_comment("Ann", "Hi", None)).await.unwrap();
        let before = store.post("p").unwrap();

        let added = svc
            .add_comment("p", new_comment("Bo", "Re", Some("missing")))
            .await
            .unwrap();
        assert_eq!(added.placement, CommentPlacement::Orphaned);
        assert_eq!(store.post("p").unwrap(), before);
    }

    #[tokio::test]
    async fn unknown_parent_is_rejected_when_strict() {
        let store = MemoryStore::new();
        let svc = Interactions::new(
            Arc::new(store.clone()),
            InteractionOptions {
                strict_parent: true,
                ..Default::default()
            },
        );
        svc.add_comment("p", new_comment("Ann", "Hi", None)).await.unwrap();
        let err = svc
            .add_comment("p", new_comment("Bo", "Re", Some("missing")))
            .await
            .unwrap_err();
        assert!(matches!(err, InteractionError::ParentNotFound(id) if id == "missing"));
        assert_eq!(store.post("p").unwrap().comments.len(), 1);
    }

    #[tokio::test]
    async fn reply_on_new_post_becomes_top_level() {
        let store = MemoryStore::new();
        let svc = service(&store);
        let added = svc
            .add_comment("fresh", new_comment("Bo", "Re", Some("whatever")))
            .await
            .unwrap();
        assert_eq!(added.placement, CommentPlacement::TopLevel);
        assert_eq!(store.post("fresh").unwrap().comments, vec![added.comment]);
    }
}
