use crate::{
    models::{counter, PostDocument},
    Db, StoreError,
};
use mongodb::{
    bson::doc,
    options::{FindOneAndUpdateOptions, FindOneOptions, IndexOptions, ReturnDocument, UpdateOptions},
    IndexModel,
};

impl Db {
    pub(crate) async fn run_ping(&self) -> Result<(), StoreError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await?;
        Ok(())
    }

    pub(crate) async fn create_post_indexes(&self) -> Result<(), StoreError> {
        let by_slug = IndexModel::builder()
            .keys(doc! { "slug": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.posts().create_index(by_slug, None).await?;
        Ok(())
    }

    // 不存在则创建空文章，已存在则什么都不改
    pub(crate) async fn upsert_post(&self, slug: &str) -> Result<(), StoreError> {
        self.posts()
            .update_one(
                doc! { "slug": slug },
                doc! {
                    "$setOnInsert": { "views": 0_i64, "likes": 0_i64, "comments": [] }
                },
                UpdateOptions::builder().upsert(true).build(),
            )
            .await?;
        Ok(())
    }

    pub(crate) async fn get_likes(&self, slug: &str) -> Result<u64, StoreError> {
        let options = FindOneOptions::builder()
            .projection(doc! { "likes": 1, "_id": 0 })
            .build();
        let post = self.posts().find_one(doc! { "slug": slug }, options).await?;
        Ok(post.map(|p| counter(p.likes)).unwrap_or(0))
    }

    pub(crate) async fn inc_likes(&self, slug: &str) -> Result<u64, StoreError> {
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();
        let updated = self
            .posts()
            .find_one_and_update(
                doc! { "slug": slug },
                doc! {
                    "$inc": { "likes": 1_i64 },
                    "$setOnInsert": { "views": 0_i64, "comments": [] }
                },
                options,
            )
            .await?;

        let post = match updated {
            Some(post) => post,
            None => self
                .posts()
                .find_one(doc! { "slug": slug }, None)
                .await?
                .unwrap_or_else(|| PostDocument {
                    likes: 1,
                    ..Default::default()
                }),
        };
        Ok(counter(post.likes))
    }
}
