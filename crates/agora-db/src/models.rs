//! Database row types. These map directly to SQLite rows and stay distinct
//! from the agora-types API models to keep the DB layer independent.

use chrono::{DateTime, Utc};
use rusqlite::Row;
use rusqlite::types::Type;

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorRow {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Clone)]
pub struct PostRow {
    pub id: i64,
    pub author: AuthorRow,
    pub title: String,
    pub url: Option<String>,
    pub content: Option<String>,
    pub points: i64,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
    pub is_upvoted: bool,
}

#[derive(Debug, Clone)]
pub struct CommentRow {
    pub id: i64,
    pub author: AuthorRow,
    pub post_id: i64,
    pub parent_comment_id: Option<i64>,
    pub content: String,
    pub points: i64,
    pub comment_count: i64,
    pub depth: i64,
    pub created_at: DateTime<Utc>,
    pub is_upvoted: bool,
    pub children: Vec<CommentRow>,
}

/// Input for a new post. Boundary validation has already run.
#[derive(Debug, Clone, Copy)]
pub struct NewPost<'a> {
    pub author_id: &'a str,
    pub title: &'a str,
    pub url: Option<&'a str>,
    pub content: Option<&'a str>,
}

/// Result of an upvote toggle, read after the counter update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub points: i64,
    pub is_upvoted: bool,
}

/// One page of a listing.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_pages: u32,
}

pub(crate) const POST_COLUMNS: &str = "p.id, p.user_id, u.username, p.title, p.url, p.content, \
     p.points, p.comment_count, p.created_at, pu.user_id IS NOT NULL";

pub(crate) const COMMENT_COLUMNS: &str = "c.id, c.user_id, u.username, c.post_id, \
     c.parent_comment_id, c.content, c.points, c.comment_count, c.depth, c.created_at, \
     cu.user_id IS NOT NULL";

pub(crate) fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        created_at: timestamp(row, 3)?,
    })
}

/// Maps a row selected with [`POST_COLUMNS`].
pub(crate) fn post_from_row(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        author: AuthorRow {
            id: row.get(1)?,
            username: row.get(2)?,
        },
        title: row.get(3)?,
        url: row.get(4)?,
        content: row.get(5)?,
        points: row.get(6)?,
        comment_count: row.get(7)?,
        created_at: timestamp(row, 8)?,
        is_upvoted: row.get(9)?,
    })
}

/// Maps a row selected with [`COMMENT_COLUMNS`].
pub(crate) fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        author: AuthorRow {
            id: row.get(1)?,
            username: row.get(2)?,
        },
        post_id: row.get(3)?,
        parent_comment_id: row.get(4)?,
        content: row.get(5)?,
        points: row.get(6)?,
        comment_count: row.get(7)?,
        depth: row.get(8)?,
        created_at: timestamp(row, 9)?,
        is_upvoted: row.get(10)?,
        children: Vec::new(),
    })
}

/// SQLite stores timestamps as ISO-8601 text. Rows written before the
/// millisecond default may still carry "YYYY-MM-DD HH:MM:SS", parsed as UTC.
fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
