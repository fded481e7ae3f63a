use crate::{Db, StoreError};
use domain::{Comment, CommentPath};
use mongodb::{
    bson::{doc, to_bson},
    options::{FindOneOptions, UpdateOptions},
};

impl Db {
    pub(crate) async fn get_comments(
        &self,
        slug: &str,
    ) -> Result<Option<Vec<Comment>>, StoreError> {
        let options = FindOneOptions::builder()
            .projection(doc! { "comments": 1, "_id": 0 })
            .build();
        let post = self.posts().find_one(doc! { "slug": slug }, options).await?;
        Ok(post.map(|p| p.comments))
    }

    // upsert + $push：首条评论和文章创建是同一个原子操作
    pub(crate) async fn push_top_level(
        &self,
        slug: &str,
        comment: &Comment,
    ) -> Result<(), StoreError> {
        self.posts()
            .update_one(
                doc! { "slug": slug },
                doc! {
                    "$push": { "comments": to_bson(comment)? },
                    "$setOnInsert": { "views": 0_i64, "likes": 0_i64 }
                },
                UpdateOptions::builder().upsert(true).build(),
            )
            .await?;
        Ok(())
    }

    /// Positional `$push` guarded by the parent's id, so no other branch is rewritten.
    pub(crate) async fn push_at(
        &self,
        slug: &str,
        parent: &CommentPath,
        parent_id: &str,
        reply: &Comment,
    ) -> Result<bool, StoreError> {
        let mut filter = doc! { "slug": slug };
        filter.insert(parent.id_field(), parent_id);

        let mut push = doc! {};
        push.insert(parent.replies_field(), to_bson(reply)?);

        let result = self
            .posts()
            .update_one(filter, doc! { "$push": push }, None)
            .await?;
        Ok(result.matched_count == 1)
    }
}
