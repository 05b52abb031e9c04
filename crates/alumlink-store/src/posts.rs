use chrono::Utc;
use rusqlite::params;

use alumlink_shared::{PostId, UserId};

use crate::database::Database;
use crate::error::{map_insert_err, Result, StoreError};
use crate::models::{parse_enum, parse_timestamp, parse_uuid, Post};

impl Database {
    pub fn insert_post(&self, post: &Post) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO posts (id, author_id, author_name, author_role,
                                    author_affiliation, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    post.id.to_string(),
                    post.author_id.to_string(),
                    post.author_name,
                    post.author_role.as_str(),
                    post.author_affiliation,
                    post.content,
                    post.created_at.to_rfc3339(),
                ],
            )
            .map_err(map_insert_err)?;
        Ok(())
    }

    pub fn get_post(&self, id: PostId) -> Result<Post> {
        self.conn()
            .query_row(
                "SELECT id, author_id, author_name, author_role, author_affiliation,
                        content, created_at
                 FROM posts WHERE id = ?1",
                params![id.to_string()],
                row_to_post,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Toggle a user's membership in a post's like set.
    ///
    /// One transaction: `INSERT OR IGNORE` into the set, and when the pair was
    /// already present (no row inserted) delete it instead.  The pair primary
    /// key means repeated toggles strictly alternate and can never accumulate
    /// duplicate memberships.  Returns `true` when the user now likes the post.
    pub fn toggle_like(&mut self, post_id: PostId, user_id: UserId) -> Result<bool> {
        let tx = self.conn_mut().transaction()?;

        let post_count: i64 = tx.query_row(
            "SELECT COUNT(*) FROM posts WHERE id = ?1",
            params![post_id.to_string()],
            |row| row.get(0),
        )?;
        if post_count == 0 {
            return Err(StoreError::NotFound);
        }

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO post_likes (post_id, user_id, created_at)
             VALUES (?1, ?2, ?3)",
            params![
                post_id.to_string(),
                user_id.to_string(),
                Utc::now().to_rfc3339()
            ],
        )?;
        if inserted == 0 {
            tx.execute(
                "DELETE FROM post_likes WHERE post_id = ?1 AND user_id = ?2",
                params![post_id.to_string(), user_id.to_string()],
            )?;
        }

        tx.commit()?;
        Ok(inserted > 0)
    }

    pub fn get_likers(&self, post_id: PostId) -> Result<Vec<UserId>> {
        let mut stmt = self.conn().prepare(
            "SELECT user_id FROM post_likes WHERE post_id = ?1 ORDER BY created_at ASC",
        )?;

        let rows = stmt.query_map(params![post_id.to_string()], |row| {
            let id_str: String = row.get(0)?;
            Ok(UserId(parse_uuid(0, &id_str)?))
        })?;

        let mut likers = Vec::new();
        for row in rows {
            likers.push(row?);
        }
        Ok(likers)
    }

    /// Posts ranked by like count (descending), recency breaking ties.
    ///
    /// The ranking is computed by the query, never stored, so the order can
    /// legitimately change between reads as likes accrue.
    pub fn list_posts_ranked(&self, limit: usize) -> Result<Vec<(Post, i64)>> {
        let mut stmt = self.conn().prepare(
            "SELECT p.id, p.author_id, p.author_name, p.author_role, p.author_affiliation,
                    p.content, p.created_at,
                    (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id) AS like_count
             FROM posts p
             ORDER BY like_count DESC, p.created_at DESC
             LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            let post = row_to_post(row)?;
            let like_count: i64 = row.get(7)?;
            Ok((post, like_count))
        })?;

        let mut posts = Vec::new();
        for row in rows {
            posts.push(row?);
        }
        Ok(posts)
    }
}

fn row_to_post(row: &rusqlite::Row<'_>) -> rusqlite::Result<Post> {
    let id_str: String = row.get(0)?;
    let author_str: String = row.get(1)?;
    let role_str: String = row.get(3)?;
    let ts_str: String = row.get(6)?;

    Ok(Post {
        id: PostId(parse_uuid(0, &id_str)?),
        author_id: UserId(parse_uuid(1, &author_str)?),
        author_name: row.get(2)?,
        author_role: parse_enum(3, &role_str)?,
        author_affiliation: row.get(4)?,
        content: row.get(5)?,
        created_at: parse_timestamp(6, &ts_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alumlink_shared::Role;

    fn sample_post(content: &str) -> Post {
        Post {
            id: PostId::new(),
            author_id: UserId::new(),
            author_name: "Ada".to_string(),
            author_role: Role::Alumni,
            author_affiliation: "Analytical Engines Ltd".to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn toggle_strictly_alternates() {
        let mut db = Database::open_in_memory().unwrap();
        let post = sample_post("hello");
        db.insert_post(&post).unwrap();
        let user = UserId::new();

        for n in 1..=6 {
            let liked = db.toggle_like(post.id, user).unwrap();
            assert_eq!(liked, n % 2 == 1);
            let likers = db.get_likers(post.id).unwrap();
            assert_eq!(likers.len(), usize::from(n % 2 == 1));
        }
    }

    #[test]
    fn toggle_unknown_post_is_not_found() {
        let mut db = Database::open_in_memory().unwrap();
        let err = db.toggle_like(PostId::new(), UserId::new()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn ranking_is_computed_at_read_time() {
        let mut db = Database::open_in_memory().unwrap();
        let quiet = sample_post("quiet");
        let popular = sample_post("popular");
        db.insert_post(&quiet).unwrap();
        db.insert_post(&popular).unwrap();

        db.toggle_like(popular.id, UserId::new()).unwrap();
        db.toggle_like(popular.id, UserId::new()).unwrap();
        db.toggle_like(quiet.id, UserId::new()).unwrap();

        let ranked = db.list_posts_ranked(10).unwrap();
        assert_eq!(ranked[0].0.id, popular.id);
        assert_eq!(ranked[0].1, 2);
        assert_eq!(ranked[1].0.id, quiet.id);
        assert_eq!(ranked[1].1, 1);

        // Likes accrued after the first read legitimately reorder the feed.
        db.toggle_like(quiet.id, UserId::new()).unwrap();
        db.toggle_like(quiet.id, UserId::new()).unwrap();
        let reranked = db.list_posts_ranked(10).unwrap();
        assert_eq!(reranked[0].0.id, quiet.id);
    }
}
