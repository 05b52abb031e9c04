//! Serialisable view structs handed to the UI layer over IPC.

use serde::Serialize;

use alumlink_shared::{
    CommentId, ConnectionMode, MessageId, PostId, ReplyId, RequestId, RequestStatus, Role, UserId,
};
use alumlink_store::{Comment, MentorshipRequest, Message, Post, Profile, Reply};

/// Round the running average to one decimal for display.  The store keeps
/// the full-precision total; rounding must never feed back into it.
fn display_rating(total: f64, count: i64) -> f64 {
    if count == 0 {
        0.0
    } else {
        (total / count as f64 * 10.0).round() / 10.0
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatsView {
    pub rating: f64,
    pub rating_count: i64,
    pub session_count: i64,
}

impl StatsView {
    pub(crate) fn from_profile(p: &Profile) -> Self {
        Self {
            rating: display_rating(p.rating_total, p.rating_count),
            rating_count: p.rating_count,
            session_count: p.session_count,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub user_id: UserId,
    pub display_name: String,
    pub role: Role,
    pub affiliation: String,
    pub bio: String,
    pub experience_years: u32,
    pub stats: StatsView,
    pub created_at: String,
}

impl From<Profile> for ProfileView {
    fn from(p: Profile) -> Self {
        Self {
            stats: StatsView::from_profile(&p),
            user_id: p.user_id,
            display_name: p.display_name,
            role: p.role,
            affiliation: p.affiliation,
            bio: p.bio,
            experience_years: p.experience_years,
            created_at: p.created_at.to_rfc3339(),
        }
    }
}

/// Directory card for one alumni mentor.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MentorCard {
    pub user_id: UserId,
    pub display_name: String,
    pub affiliation: String,
    pub bio: String,
    pub experience_years: u32,
    pub stats: StatsView,
}

impl From<Profile> for MentorCard {
    fn from(p: Profile) -> Self {
        Self {
            stats: StatsView::from_profile(&p),
            user_id: p.user_id,
            display_name: p.display_name,
            affiliation: p.affiliation,
            bio: p.bio,
            experience_years: p.experience_years,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestView {
    pub id: RequestId,
    pub sender_id: UserId,
    pub sender_name: String,
    pub mentor_id: UserId,
    pub mentor_name: String,
    pub message: String,
    pub mode: ConnectionMode,
    pub status: RequestStatus,
    pub created_at: String,
}

impl From<MentorshipRequest> for RequestView {
    fn from(r: MentorshipRequest) -> Self {
        Self {
            id: r.id,
            sender_id: r.sender_id,
            sender_name: r.sender_name,
            mentor_id: r.mentor_id,
            mentor_name: r.mentor_name,
            message: r.message,
            mode: r.mode,
            status: r.status,
            created_at: r.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    /// Store-assigned commit sequence; the channel's total order.
    pub seq: i64,
    pub id: MessageId,
    pub channel_id: RequestId,
    pub sender_id: UserId,
    pub text: String,
    pub created_at: String,
}

impl From<Message> for MessageView {
    fn from(m: Message) -> Self {
        Self {
            seq: m.seq,
            id: m.id,
            channel_id: m.channel_id,
            sender_id: m.sender_id,
            text: m.body,
            created_at: m.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyView {
    pub id: ReplyId,
    pub author_id: UserId,
    pub author_name: String,
    pub author_role: Role,
    pub text: String,
    pub created_at: String,
}

impl From<Reply> for ReplyView {
    fn from(r: Reply) -> Self {
        Self {
            id: r.id,
            author_id: r.author_id,
            author_name: r.author_name,
            author_role: r.author_role,
            text: r.body,
            created_at: r.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: CommentId,
    pub author_id: UserId,
    pub author_name: String,
    pub author_role: Role,
    pub text: String,
    pub created_at: String,
    pub replies: Vec<ReplyView>,
}

impl CommentView {
    pub(crate) fn assemble(c: Comment, replies: Vec<Reply>) -> Self {
        Self {
            id: c.id,
            author_id: c.author_id,
            author_name: c.author_name,
            author_role: c.author_role,
            text: c.body,
            created_at: c.created_at.to_rfc3339(),
            replies: replies.into_iter().map(ReplyView::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: PostId,
    pub author_id: UserId,
    pub author_name: String,
    pub author_role: Role,
    pub author_affiliation: String,
    pub content: String,
    pub created_at: String,
    /// `|likedBy|` at query time; the feed order derives from this, so it can
    /// change between reads as likes accrue.
    pub like_count: usize,
    pub liked_by: Vec<UserId>,
    pub comments: Vec<CommentView>,
}

impl PostView {
    pub(crate) fn assemble(post: Post, liked_by: Vec<UserId>, comments: Vec<CommentView>) -> Self {
        Self {
            id: post.id,
            author_id: post.author_id,
            author_name: post.author_name,
            author_role: post.author_role,
            author_affiliation: post.author_affiliation,
            content: post.content,
            created_at: post.created_at.to_rfc3339(),
            like_count: liked_by.len(),
            liked_by,
            comments,
        }
    }
}
