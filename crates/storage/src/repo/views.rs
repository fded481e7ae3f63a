use crate::{
    models::{counter, ViewEventDocument},
    Db, StoreError,
};
use domain::ViewEvent;
use mongodb::{
    bson::doc,
    options::{FindOneOptions, IndexOptions},
    IndexModel,
};
use std::time::Duration;

impl Db {
    pub(crate) async fn create_view_indexes(&self) -> Result<(), StoreError> {
        let dedup = IndexModel::builder()
            .keys(doc! { "slug": 1, "viewer": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        // TTL: expireAt 到期后由 MongoDB 后台线程清理
        let ttl = IndexModel::builder()
            .keys(doc! { "expireAt": 1 })
            .options(
                IndexOptions::builder()
                    .expire_after(Duration::from_secs(0))
                    .build(),
            )
            .build();

        let events = self.views_events();
        events.create_index(dedup, None).await?;
        events.create_index(ttl, None).await?;
        Ok(())
    }

    pub(crate) async fn insert_view(&self, event: &ViewEvent) -> Result<(), StoreError> {
        self.views_events()
            .insert_one(ViewEventDocument::from(event), None)
            .await?;
        Ok(())
    }

    pub(crate) async fn inc_views(&self, slug: &str) -> Result<(), StoreError> {
        self.posts()
            .update_one(doc! { "slug": slug }, doc! { "$inc": { "views": 1_i64 } }, None)
            .await?;
        Ok(())
    }

    pub(crate) async fn get_views(&self, slug: &str) -> Result<u64, StoreError> {
        let options = FindOneOptions::builder()
            .projection(doc! { "views": 1, "_id": 0 })
            .build();
        let post = self.posts().find_one(doc! { "slug": slug }, options).await?;
        Ok(post.map(|p| counter(p.views)).unwrap_or(0))
    }
}
