use rusqlite::{Connection, TransactionBehavior};
use tracing::info;

use crate::Result;

/// Bring the schema up to date. The version is read under the write lock, so
/// handles opening the same fresh file at once apply each step exactly once.
pub fn run(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        tx.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        // Millisecond-precision UTC timestamps sort lexicographically in time order.
        tx.execute_batch(
            "
            CREATE TABLE users (
                id              TEXT PRIMARY KEY,
                username        TEXT NOT NULL UNIQUE,
                password_hash   TEXT NOT NULL,
                created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE posts (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id         TEXT NOT NULL REFERENCES users(id),
                title           TEXT NOT NULL,
                url             TEXT,
                content         TEXT,
                points          INTEGER NOT NULL DEFAULT 0,
                comment_count   INTEGER NOT NULL DEFAULT 0 CHECK (comment_count >= 0),
                created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX idx_posts_user ON posts(user_id);
            CREATE INDEX idx_posts_url ON posts(url);

            CREATE TABLE comments (
                id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id             TEXT NOT NULL REFERENCES users(id),
                post_id             INTEGER NOT NULL REFERENCES posts(id),
                parent_comment_id   INTEGER REFERENCES comments(id),
                content             TEXT NOT NULL,
                points              INTEGER NOT NULL DEFAULT 0,
                comment_count       INTEGER NOT NULL DEFAULT 0 CHECK (comment_count >= 0),
                depth               INTEGER NOT NULL DEFAULT 0,
                created_at          TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX idx_comments_post ON comments(post_id, parent_comment_id);
            CREATE INDEX idx_comments_parent ON comments(parent_comment_id);

            CREATE TABLE post_upvotes (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                post_id     INTEGER NOT NULL REFERENCES posts(id),
                user_id     TEXT NOT NULL REFERENCES users(id),
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                UNIQUE(post_id, user_id)
            );

            CREATE TABLE comment_upvotes (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                comment_id  INTEGER NOT NULL REFERENCES comments(id),
                user_id     TEXT NOT NULL REFERENCES users(id),
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                UNIQUE(comment_id, user_id)
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    tx.commit()?;
    info!("Database migrations complete");
    Ok(())
}
