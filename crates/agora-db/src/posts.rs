use rusqlite::Transaction;

use crate::models::NewPost;
use crate::{Result, StoreError};

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Insert a post with zeroed counters and return its id.
pub fn create_post(tx: &Transaction<'_>, post: NewPost<'_>) -> Result<i64> {
    if post.title.trim().is_empty() {
        return Err(StoreError::InvalidInput("title must not be empty".into()));
    }

    let url = non_blank(post.url);
    let content = non_blank(post.content);
    if url.is_none() && content.is_none() {
        return Err(StoreError::InvalidInput(
            "either url or content must be provided".into(),
        ));
    }

    let id = tx.query_row(
        "INSERT INTO posts (user_id, title, url, content) VALUES (?1, ?2, ?3, ?4) RETURNING id",
        (post.author_id, post.title, url, content),
        |row| row.get(0),
    )?;
    Ok(id)
}
