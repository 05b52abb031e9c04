use std::collections::HashMap;

use chrono::Utc;
use rusqlite::params;

use alumlink_shared::{CommentId, PostId, ReplyId, UserId};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{parse_enum, parse_timestamp, parse_uuid, Comment, Profile, Reply};

impl Database {
    /// Append a top-level comment to a post.  Author fields are denormalized
    /// from the given profile.
    pub fn insert_comment(
        &self,
        id: CommentId,
        post_id: PostId,
        author: &Profile,
        body: &str,
    ) -> Result<Comment> {
        let created_at = Utc::now();
        self.conn().execute(
            "INSERT INTO comments (id, post_id, author_id, author_name, author_role,
                                   body, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id.to_string(),
                post_id.to_string(),
                author.user_id.to_string(),
                author.display_name,
                author.role.as_str(),
                body,
                created_at.to_rfc3339(),
            ],
        )?;
        let seq = self.conn().last_insert_rowid();

        Ok(Comment {
            seq,
            id,
            post_id,
            author_id: author.user_id,
            author_name: author.display_name.clone(),
            author_role: author.role,
            body: body.to_string(),
            created_at,
        })
    }

    /// Look up a comment by id.  Reply ids do not resolve here: replies live
    /// in their own table, which is what makes the depth-2 limit structural.
    pub fn get_comment(&self, id: CommentId) -> Result<Comment> {
        self.conn()
            .query_row(
                "SELECT seq, id, post_id, author_id, author_name, author_role, body, created_at
                 FROM comments WHERE id = ?1",
                params![id.to_string()],
                row_to_comment,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Append a reply under an existing comment.
    pub fn insert_reply(
        &self,
        id: ReplyId,
        comment_id: CommentId,
        author: &Profile,
        body: &str,
    ) -> Result<Reply> {
        let created_at = Utc::now();
        self.conn().execute(
            "INSERT INTO replies (id, comment_id, author_id, author_name, author_role,
                                  body, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id.to_string(),
                comment_id.to_string(),
                author.user_id.to_string(),
                author.display_name,
                author.role.as_str(),
                body,
                created_at.to_rfc3339(),
            ],
        )?;
        let seq = self.conn().last_insert_rowid();

        Ok(Reply {
            seq,
            id,
            comment_id,
            author_id: author.user_id,
            author_name: author.display_name.clone(),
            author_role: author.role,
            body: body.to_string(),
            created_at,
        })
    }

    pub fn list_comments_for_post(&self, post_id: PostId) -> Result<Vec<Comment>> {
        let mut stmt = self.conn().prepare(
            "SELECT seq, id, post_id, author_id, author_name, author_role, body, created_at
             FROM comments WHERE post_id = ?1 ORDER BY seq ASC",
        )?;

        let rows = stmt.query_map(params![post_id.to_string()], row_to_comment)?;

        let mut comments = Vec::new();
        for row in rows {
            comments.push(row?);
        }
        Ok(comments)
    }

    /// All replies under a post's comments, grouped by comment id (batch query).
    pub fn list_replies_for_post(&self, post_id: PostId) -> Result<HashMap<CommentId, Vec<Reply>>> {
        let mut stmt = self.conn().prepare(
            "SELECT r.seq, r.id, r.comment_id, r.author_id, r.author_name, r.author_role,
                    r.body, r.created_at
             FROM replies r
             JOIN comments c ON c.id = r.comment_id
             WHERE c.post_id = ?1
             ORDER BY r.seq ASC",
        )?;

        let rows = stmt.query_map(params![post_id.to_string()], row_to_reply)?;

        let mut map: HashMap<CommentId, Vec<Reply>> = HashMap::new();
        for row in rows {
            let reply = row?;
            map.entry(reply.comment_id).or_default().push(reply);
        }
        Ok(map)
    }
}

fn row_to_comment(row: &rusqlite::Row<'_>) -> rusqlite::Result<Comment> {
    let id_str: String = row.get(1)?;
    let post_str: String = row.get(2)?;
    let author_str: String = row.get(3)?;
    let role_str: String = row.get(5)?;
    let ts_str: String = row.get(7)?;

    Ok(Comment {
        seq: row.get(0)?,
        id: CommentId(parse_uuid(1, &id_str)?),
        post_id: PostId(parse_uuid(2, &post_str)?),
        author_id: UserId(parse_uuid(3, &author_str)?),
        author_name: row.get(4)?,
        author_role: parse_enum(5, &role_str)?,
        body: row.get(6)?,
        created_at: parse_timestamp(7, &ts_str)?,
    })
}

fn row_to_reply(row: &rusqlite::Row<'_>) -> rusqlite::Result<Reply> {
    let id_str: String = row.get(1)?;
    let comment_str: String = row.get(2)?;
    let author_str: String = row.get(3)?;
    let role_str: String = row.get(5)?;
    let ts_str: String = row.get(7)?;

    Ok(Reply {
        seq: row.get(0)?,
        id: ReplyId(parse_uuid(1, &id_str)?),
        comment_id: CommentId(parse_uuid(2, &comment_str)?),
        author_id: UserId(parse_uuid(3, &author_str)?),
        author_name: row.get(4)?,
        author_role: parse_enum(5, &role_str)?,
        body: row.get(6)?,
        created_at: parse_timestamp(7, &ts_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alumlink_shared::Role;
    use crate::models::Post;

    fn seed(db: &Database) -> (Post, Profile) {
        let author = Profile {
            user_id: UserId::new(),
            display_name: "Ada".to_string(),
            role: Role::Alumni,
            affiliation: "Analytical Engines Ltd".to_string(),
            bio: String::new(),
            experience_years: 7,
            rating_total: 0.0,
            rating_count: 0,
            session_count: 0,
            created_at: Utc::now(),
        };
        db.insert_profile(&author).unwrap();

        let post = Post {
            id: PostId::new(),
            author_id: author.user_id,
            author_name: author.display_name.clone(),
            author_role: author.role,
            author_affiliation: author.affiliation.clone(),
            content: "Hello".to_string(),
            created_at: Utc::now(),
        };
        db.insert_post(&post).unwrap();
        (post, author)
    }

    #[test]
    fn comments_and_replies_keep_insertion_order() {
        let db = Database::open_in_memory().unwrap();
        let (post, author) = seed(&db);

        let first = db
            .insert_comment(CommentId::new(), post.id, &author, "first")
            .unwrap();
        let second = db
            .insert_comment(CommentId::new(), post.id, &author, "second")
            .unwrap();
        db.insert_reply(ReplyId::new(), first.id, &author, "re: first")
            .unwrap();

        let comments = db.list_comments_for_post(post.id).unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].body, "first");
        assert_eq!(comments[1].body, "second");

        let replies = db.list_replies_for_post(post.id).unwrap();
        assert_eq!(replies[&first.id].len(), 1);
        assert!(!replies.contains_key(&second.id));
    }

    #[test]
    fn reply_ids_do_not_resolve_as_comments() {
        let db = Database::open_in_memory().unwrap();
        let (post, author) = seed(&db);

        let comment = db
            .insert_comment(CommentId::new(), post.id, &author, "top")
            .unwrap();
        let reply = db
            .insert_reply(ReplyId::new(), comment.id, &author, "nested")
            .unwrap();

        let err = db.get_comment(CommentId(reply.id.0)).unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }
}
