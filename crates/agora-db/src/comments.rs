//! Comment insertion. Each insert bumps exactly two kinds of counter: the
//! owning post's total, and for replies the immediate parent's direct count.
//! Deeper ancestors are never touched.
//!
//! Existence checks are folded into the counter update (`UPDATE .. RETURNING`)
//! so a missing target aborts the transaction without a separate SELECT.

use rusqlite::{OptionalExtension, Transaction};
use tracing::debug;

use crate::listing::fetch_comment;
use crate::models::CommentRow;
use crate::{Result, StoreError};

fn validate_content(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(StoreError::InvalidInput("comment content must not be empty".into()));
    }
    Ok(())
}

/// Increment a post's comment counter. `None` when the post does not exist.
fn bump_post(tx: &Transaction<'_>, post_id: i64) -> Result<Option<i64>> {
    let count = tx
        .query_row(
            "UPDATE posts SET comment_count = comment_count + 1 WHERE id = ?1 RETURNING comment_count",
            [post_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(count)
}

fn inserted(tx: &Transaction<'_>, id: i64) -> Result<CommentRow> {
    fetch_comment(tx, id, None)?
        .ok_or_else(|| StoreError::NotFound(format!("comment {} vanished after insert", id)))
}

/// Create a top-level comment (depth 0) on a post.
pub fn create_root_comment(
    tx: &Transaction<'_>,
    post_id: i64,
    author_id: &str,
    content: &str,
) -> Result<CommentRow> {
    validate_content(content)?;

    if bump_post(tx, post_id)?.is_none() {
        return Err(StoreError::not_found("Post"));
    }

    let id: i64 = tx.query_row(
        "INSERT INTO comments (user_id, post_id, content) VALUES (?1, ?2, ?3) RETURNING id",
        (author_id, post_id, content),
        |row| row.get(0),
    )?;

    debug!("Comment {} created on post {}", id, post_id);
    inserted(tx, id)
}

/// Create a reply under an existing comment. The reply inherits the parent's
/// post and sits one level deeper.
pub fn create_reply(
    tx: &Transaction<'_>,
    parent_comment_id: i64,
    author_id: &str,
    content: &str,
) -> Result<CommentRow> {
    validate_content(content)?;

    let parent: Option<(i64, i64)> = tx
        .query_row(
            "UPDATE comments SET comment_count = comment_count + 1 WHERE id = ?1
             RETURNING post_id, depth",
            [parent_comment_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let Some((post_id, parent_depth)) = parent else {
        return Err(StoreError::not_found("Parent comment"));
    };

    if bump_post(tx, post_id)?.is_none() {
        return Err(StoreError::not_found("Post of parent comment"));
    }

    let id: i64 = tx.query_row(
        "INSERT INTO comments (user_id, post_id, parent_comment_id, content, depth)
         VALUES (?1, ?2, ?3, ?4, ?5) RETURNING id",
        (author_id, post_id, parent_comment_id, content, parent_depth + 1),
        |row| row.get(0),
    )?;

    debug!(
        "Reply {} created under comment {} (post {}, depth {})",
        id,
        parent_comment_id,
        post_id,
        parent_depth + 1
    );
    inserted(tx, id)
}
