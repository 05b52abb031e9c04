//! Domain model structs persisted in the SQLite database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to the engine's view layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use alumlink_shared::{
    CommentId, ConnectionMode, MessageId, PostId, ReplyId, RequestId, RequestStatus, Role, UserId,
};

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// A user profile.  The primary key is the opaque id assigned by the external
/// identity provider.
///
/// `rating_total` is the full-precision sum of all submitted stars; the
/// displayed average is derived from it at view-construction time so rounding
/// never compounds across ratings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub user_id: UserId,
    pub display_name: String,
    pub role: Role,
    pub affiliation: String,
    pub bio: String,
    pub experience_years: u32,
    pub rating_total: f64,
    pub rating_count: i64,
    pub session_count: i64,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Mentorship request
// ---------------------------------------------------------------------------

/// A mentorship request from a student to an alumni mentor.
///
/// Once the status leaves `Pending` the record is immutable; an accepted
/// request's id doubles as the key of its message channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MentorshipRequest {
    pub id: RequestId,
    pub sender_id: UserId,
    pub sender_name: String,
    pub mentor_id: UserId,
    pub mentor_name: String,
    pub message: String,
    pub mode: ConnectionMode,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single channel message.
///
/// `seq` and `created_at` are assigned by the store at commit time; `seq` is
/// the channel's total order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub seq: i64,
    pub id: MessageId,
    pub channel_id: RequestId,
    pub sender_id: UserId,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Post
// ---------------------------------------------------------------------------

/// A community feed post.  Author fields are denormalized at creation time so
/// the feed renders without touching the profiles table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    pub id: PostId,
    pub author_id: UserId,
    pub author_name: String,
    pub author_role: Role,
    pub author_affiliation: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Comment / Reply
// ---------------------------------------------------------------------------

/// A top-level comment on a post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    pub seq: i64,
    pub id: CommentId,
    pub post_id: PostId,
    pub author_id: UserId,
    pub author_name: String,
    pub author_role: Role,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// A reply nested under a comment.  Replies have no children; the table has
/// no slot for them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reply {
    pub seq: i64,
    pub id: ReplyId,
    pub comment_id: CommentId,
    pub author_id: UserId,
    pub author_name: String,
    pub author_role: Role,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Row-mapper helpers shared by the per-entity modules
// ---------------------------------------------------------------------------

pub(crate) fn conv_err<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

pub(crate) fn parse_uuid(idx: usize, s: &str) -> rusqlite::Result<uuid::Uuid> {
    uuid::Uuid::parse_str(s).map_err(|e| conv_err(idx, e))
}

pub(crate) fn parse_enum<T>(idx: usize, s: &str) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = alumlink_shared::ParseEnumError>,
{
    s.parse::<T>().map_err(|e| conv_err(idx, e))
}

pub(crate) fn parse_timestamp(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conv_err(idx, e))
}
