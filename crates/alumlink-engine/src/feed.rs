//! Community feed: posts, the like set, and the depth-2 comment tree.
//!
//! The feed order is computed per read from the current like counts, never
//! stored, so it can legitimately change between reads as likes accrue.

use chrono::Utc;
use tracing::{debug, info};

use alumlink_shared::{CommentId, PostId, ReplyId, UserId};
use alumlink_store::{Database, Post, StoreError};

use crate::error::{Result, ValidationError};
use crate::store::ChangeEvent;
use crate::subscription::{spawn_snapshot_watch, Subscription};
use crate::views::{CommentView, PostView};
use crate::Engine;

impl Engine {
    /// Publish a post to the community feed.  Author fields are denormalized
    /// from the author's profile at creation time.
    pub async fn create_post(&self, author_id: UserId, content: &str) -> Result<PostView> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ValidationError::EmptyContent.into());
        }

        let content = content.to_string();
        let post = self.store().with_db(move |db| {
            let author = db.get_profile(author_id)?;
            let post = Post {
                id: PostId::new(),
                author_id,
                author_name: author.display_name,
                author_role: author.role,
                author_affiliation: author.affiliation,
                content,
                created_at: Utc::now(),
            };
            db.insert_post(&post)?;
            Ok(post)
        })?;

        info!(post_id = %post.id, author = %author_id, "post created");
        self.store()
            .publish(ChangeEvent::FeedChanged { post_id: post.id });
        Ok(PostView::assemble(post, Vec::new(), Vec::new()))
    }

    /// Toggle `user_id`'s membership in the post's like set.
    ///
    /// The store runs this as an atomic set-add/set-remove, so repeated
    /// toggles strictly alternate even under concurrent likers.  Returns
    /// `true` when the user now likes the post.
    pub async fn toggle_like(&self, post_id: PostId, user_id: UserId) -> Result<bool> {
        let liked = self
            .store()
            .with_db(|db| db.toggle_like(post_id, user_id))?;
        debug!(post_id = %post_id, user = %user_id, liked, "like toggled");
        self.store().publish(ChangeEvent::FeedChanged { post_id });
        Ok(liked)
    }

    /// Add a comment to a post, or a reply under one of its comments when
    /// `parent` is given.
    ///
    /// Reply-to-a-reply is rejected: reply ids live in their own table, so a
    /// reply id passed as `parent` resolves to no comment and the call fails
    /// with `NotFound`, leaving the post untouched.
    pub async fn add_comment(
        &self,
        post_id: PostId,
        author_id: UserId,
        text: &str,
        parent: Option<CommentId>,
    ) -> Result<()> {
        let body = text.trim();
        if body.is_empty() {
            return Err(ValidationError::EmptyText.into());
        }

        let body = body.to_string();
        self.store().with_db(move |db| {
            db.get_post(post_id)?;
            let author = db.get_profile(author_id)?;
            match parent {
                None => {
                    db.insert_comment(CommentId::new(), post_id, &author, &body)?;
                }
                Some(parent_id) => {
                    let comment = db.get_comment(parent_id)?;
                    if comment.post_id != post_id {
                        return Err(StoreError::NotFound);
                    }
                    db.insert_reply(ReplyId::new(), parent_id, &author, &body)?;
                }
            }
            Ok(())
        })?;

        debug!(post_id = %post_id, author = %author_id, reply = parent.is_some(), "comment added");
        self.store().publish(ChangeEvent::FeedChanged { post_id });
        Ok(())
    }

    /// The feed, ranked by like count with recency breaking ties.
    pub async fn list_feed(&self, limit: Option<usize>) -> Result<Vec<PostView>> {
        let limit = limit.unwrap_or(self.config().feed_page_size);
        self.store().with_db(move |db| load_feed(db, limit))
    }

    /// Live variant of [`Engine::list_feed`]: an initial snapshot, then a
    /// fresh ranked page after every feed change.
    pub fn subscribe_feed(&self, limit: Option<usize>) -> Subscription<Vec<PostView>> {
        let limit = limit.unwrap_or(self.config().feed_page_size);
        spawn_snapshot_watch(
            self.store(),
            self.config(),
            |event| matches!(event, ChangeEvent::FeedChanged { .. }),
            move |db| load_feed(db, limit),
        )
    }
}

fn load_feed(db: &mut Database, limit: usize) -> alumlink_store::Result<Vec<PostView>> {
    let ranked = db.list_posts_ranked(limit)?;
    let mut views = Vec::with_capacity(ranked.len());
    for (post, _) in ranked {
        let likers = db.get_likers(post.id)?;
        let comments = db.list_comments_for_post(post.id)?;
        let mut replies = db.list_replies_for_post(post.id)?;
        let comment_views = comments
            .into_iter()
            .map(|c| {
                let replies = replies.remove(&c.id).unwrap_or_default();
                CommentView::assemble(c, replies)
            })
            .collect();
        views.push(PostView::assemble(post, likers, comment_views));
    }
    Ok(views)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alumlink_shared::Role;
    use crate::error::EngineError;
    use crate::testutil::{engine, seed_profile};

    #[tokio::test]
    async fn empty_content_is_rejected() {
        let engine = engine();
        let author = seed_profile(&engine, "Ada", Role::Alumni).await;

        let err = engine.create_post(author, "  ").await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation(ValidationError::EmptyContent)
        ));
    }

    #[tokio::test]
    async fn like_count_follows_the_set() {
        let engine = engine();
        let author = seed_profile(&engine, "Ada", Role::Alumni).await;
        let alice = seed_profile(&engine, "Alice", Role::Student).await;
        let bob = seed_profile(&engine, "Bob", Role::Student).await;

        let post = engine.create_post(author, "Hello").await.unwrap();
        engine.toggle_like(post.id, alice).await.unwrap();
        engine.toggle_like(post.id, bob).await.unwrap();

        let feed = engine.list_feed(None).await.unwrap();
        assert_eq!(feed[0].like_count, 2);

        engine.toggle_like(post.id, alice).await.unwrap();
        let feed = engine.list_feed(None).await.unwrap();
        assert_eq!(feed[0].like_count, 1);
        assert_eq!(feed[0].liked_by, vec![bob]);
    }

    #[tokio::test]
    async fn repeated_toggles_strictly_alternate() {
        let engine = engine();
        let author = seed_profile(&engine, "Ada", Role::Alumni).await;
        let user = seed_profile(&engine, "Alice", Role::Student).await;

        let post = engine.create_post(author, "Hello").await.unwrap();
        for n in 1..=7 {
            let liked = engine.toggle_like(post.id, user).await.unwrap();
            assert_eq!(liked, n % 2 == 1);
            let feed = engine.list_feed(None).await.unwrap();
            assert_eq!(feed[0].like_count, usize::from(n % 2 == 1));
        }
    }

    #[tokio::test]
    async fn ranking_orders_by_likes_then_recency() {
        let engine = engine();
        let author = seed_profile(&engine, "Ada", Role::Alumni).await;
        let liker = seed_profile(&engine, "Alice", Role::Student).await;

        let older = engine.create_post(author, "older").await.unwrap();
        // Distinct creation instants so the recency tie-break is decisive.
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let newer = engine.create_post(author, "newer").await.unwrap();

        let feed = engine.list_feed(None).await.unwrap();
        assert_eq!(feed[0].id, newer.id);

        engine.toggle_like(older.id, liker).await.unwrap();
        let feed = engine.list_feed(None).await.unwrap();
        assert_eq!(feed[0].id, older.id);
        assert_eq!(feed[1].id, newer.id);
    }

    #[tokio::test]
    async fn comments_nest_exactly_two_levels() {
        let engine = engine();
        let author = seed_profile(&engine, "Ada", Role::Alumni).await;
        let commenter = seed_profile(&engine, "Alice", Role::Student).await;

        let post = engine.create_post(author, "Hello").await.unwrap();
        engine
            .add_comment(post.id, commenter, "nice!", None)
            .await
            .unwrap();

        let feed = engine.list_feed(None).await.unwrap();
        let comment_id = feed[0].comments[0].id;

        engine
            .add_comment(post.id, author, "thanks!", Some(comment_id))
            .await
            .unwrap();

        let feed = engine.list_feed(None).await.unwrap();
        assert_eq!(feed[0].comments.len(), 1);
        assert_eq!(feed[0].comments[0].replies.len(), 1);
        assert_eq!(feed[0].comments[0].replies[0].text, "thanks!");
    }

    #[tokio::test]
    async fn unknown_parent_leaves_the_post_unchanged() {
        let engine = engine();
        let author = seed_profile(&engine, "Ada", Role::Alumni).await;
        let commenter = seed_profile(&engine, "Alice", Role::Student).await;

        let post = engine.create_post(author, "Hello").await.unwrap();
        engine
            .add_comment(post.id, commenter, "first!", None)
            .await
            .unwrap();

        let err = engine
            .add_comment(post.id, commenter, "orphan", Some(CommentId::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));

        let feed = engine.list_feed(None).await.unwrap();
        assert_eq!(feed[0].comments.len(), 1);
        assert_eq!(feed[0].comments[0].text, "first!");
    }

    #[tokio::test]
    async fn replying_to_a_reply_is_rejected() {
        let engine = engine();
        let author = seed_profile(&engine, "Ada", Role::Alumni).await;

        let post = engine.create_post(author, "Hello").await.unwrap();
        engine.add_comment(post.id, author, "top", None).await.unwrap();

        let feed = engine.list_feed(None).await.unwrap();
        let comment_id = feed[0].comments[0].id;
        engine
            .add_comment(post.id, author, "nested", Some(comment_id))
            .await
            .unwrap();

        // A reply id has no slot in the comments table, so using it as a
        // parent is a stale reference.
        let feed = engine.list_feed(None).await.unwrap();
        let reply_id = feed[0].comments[0].replies[0].id;
        let err = engine
            .add_comment(post.id, author, "too deep", Some(CommentId(reply_id.0)))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn comment_on_another_posts_parent_is_rejected() {
        let engine = engine();
        let author = seed_profile(&engine, "Ada", Role::Alumni).await;

        let first = engine.create_post(author, "first").await.unwrap();
        let second = engine.create_post(author, "second").await.unwrap();
        engine.add_comment(first.id, author, "on first", None).await.unwrap();

        let feed = engine.list_feed(None).await.unwrap();
        let foreign_parent = feed
            .iter()
            .find(|p| p.id == first.id)
            .unwrap()
            .comments[0]
            .id;

        let err = engine
            .add_comment(second.id, author, "wrong post", Some(foreign_parent))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn feed_subscription_redelivers_on_change() {
        let engine = engine();
        let author = seed_profile(&engine, "Ada", Role::Alumni).await;
        let liker = seed_profile(&engine, "Alice", Role::Student).await;

        let mut sub = engine.subscribe_feed(None);
        let initial = sub.recv().await.unwrap().unwrap();
        assert!(initial.is_empty());

        let post = engine.create_post(author, "Hello").await.unwrap();
        let after_post = sub.recv().await.unwrap().unwrap();
        assert_eq!(after_post.len(), 1);
        assert_eq!(after_post[0].like_count, 0);

        engine.toggle_like(post.id, liker).await.unwrap();
        let after_like = sub.recv().await.unwrap().unwrap();
        assert_eq!(after_like[0].like_count, 1);
    }
}
