use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Public view of a user, embedded in posts and comments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub url: Option<String>,
    pub content: Option<String>,
    pub points: i64,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
    pub author: Author,
    /// Whether the requesting viewer has upvoted this post. Always false for
    /// anonymous readers.
    pub is_upvoted: bool,
}

/// A single upvote marker. Only ever carries the viewer's own vote, so the
/// list holds zero or one entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpvoteRef {
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub user_id: String,
    pub post_id: i64,
    pub parent_comment_id: Option<i64>,
    pub content: String,
    pub points: i64,
    pub comment_count: i64,
    pub depth: i64,
    pub created_at: DateTime<Utc>,
    pub author: Author,
    pub comment_upvotes: Vec<UpvoteRef>,
    /// Preview of direct replies. Empty unless children were requested, and
    /// never longer than the preview limit; page deeper through the child
    /// comments listing.
    pub child_comments: Vec<Comment>,
}
