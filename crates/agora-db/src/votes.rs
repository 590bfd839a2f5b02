use rusqlite::{OptionalExtension, Transaction};
use tracing::debug;

use crate::models::ToggleOutcome;
use crate::{Result, StoreError};

/// What an upvote points at. Each kind owns a counter table and an upvote
/// table keyed by `(target, user)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Post,
    Comment,
}

impl Target {
    fn table(self) -> &'static str {
        match self {
            Self::Post => "posts",
            Self::Comment => "comments",
        }
    }

    fn upvote_table(self) -> &'static str {
        match self {
            Self::Post => "post_upvotes",
            Self::Comment => "comment_upvotes",
        }
    }

    fn target_column(self) -> &'static str {
        match self {
            Self::Post => "post_id",
            Self::Comment => "comment_id",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Post => "Post",
            Self::Comment => "Comment",
        }
    }
}

/// Toggle a user's upvote: withdraws it if present, casts it if not.
///
/// The counter moves by a relative delta (`points = points + ?`) so concurrent
/// toggles from different users never lose an update. A missing target aborts
/// before the upvote table is touched.
pub fn toggle_upvote(
    tx: &Transaction<'_>,
    target: Target,
    target_id: i64,
    user_id: &str,
) -> Result<ToggleOutcome> {
    let existing: Option<i64> = tx
        .query_row(
            &format!(
                "SELECT id FROM {} WHERE {} = ?1 AND user_id = ?2 LIMIT 1",
                target.upvote_table(),
                target.target_column()
            ),
            (target_id, user_id),
            |row| row.get(0),
        )
        .optional()?;

    let delta: i64 = if existing.is_some() { -1 } else { 1 };

    let points: Option<i64> = tx
        .query_row(
            &format!(
                "UPDATE {} SET points = points + ?1 WHERE id = ?2 RETURNING points",
                target.table()
            ),
            (delta, target_id),
            |row| row.get(0),
        )
        .optional()?;
    let Some(points) = points else {
        return Err(StoreError::not_found(target.label()));
    };

    match existing {
        Some(upvote_id) => {
            tx.execute(
                &format!("DELETE FROM {} WHERE id = ?1", target.upvote_table()),
                [upvote_id],
            )?;
        }
        None => {
            tx.execute(
                &format!(
                    "INSERT INTO {} ({}, user_id) VALUES (?1, ?2)",
                    target.upvote_table(),
                    target.target_column()
                ),
                (target_id, user_id),
            )?;
        }
    }

    let is_upvoted = existing.is_none();
    debug!(
        "{} {} {} by {} (points now {})",
        target.label(),
        target_id,
        if is_upvoted { "upvoted" } else { "un-upvoted" },
        user_id,
        points
    );

    Ok(ToggleOutcome { points, is_upvoted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewPost;
    use crate::{Database, ErrorKind};

    fn seed(db: &Database) -> (String, i64) {
        let author = db.create_user("alice", "hash").unwrap();
        let post = db
            .create_post(NewPost {
                author_id: &author,
                title: "Vote on me",
                url: Some("https://example.com/a"),
                content: None,
            })
            .unwrap();
        (author, post)
    }

    fn upvote_rows(db: &Database, table: &str) -> i64 {
        db.with_conn(|conn| {
            Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))?)
        })
        .unwrap()
    }

    #[test]
    fn toggle_from_five_goes_to_six_and_back() {
        let db = Database::open_in_memory().unwrap();
        let (_, post) = seed(&db);
        let voter = db.create_user("carol", "hash").unwrap();

        db.with_tx(|tx| {
            tx.execute("UPDATE posts SET points = 5 WHERE id = ?1", [post])?;
            Ok(())
        })
        .unwrap();

        let first = db.toggle_post_upvote(post, &voter).unwrap();
        assert_eq!(first, ToggleOutcome { points: 6, is_upvoted: true });

        let second = db.toggle_post_upvote(post, &voter).unwrap();
        assert_eq!(second, ToggleOutcome { points: 5, is_upvoted: false });
        assert_eq!(upvote_rows(&db, "post_upvotes"), 0);
    }

    #[test]
    fn contribution_stays_zero_or_one() {
        let db = Database::open_in_memory().unwrap();
        let (_, post) = seed(&db);
        let voter = db.create_user("dave", "hash").unwrap();

        for i in 0..7 {
            let outcome = db.toggle_post_upvote(post, &voter).unwrap();
            let expected = if i % 2 == 0 { 1 } else { 0 };
            assert_eq!(outcome.points, expected);
            assert_eq!(outcome.is_upvoted, expected == 1);
            assert_eq!(upvote_rows(&db, "post_upvotes"), expected);
        }
    }

    #[test]
    fn votes_from_different_users_accumulate() {
        let db = Database::open_in_memory().unwrap();
        let (author, post) = seed(&db);
        let other = db.create_user("erin", "hash").unwrap();

        db.toggle_post_upvote(post, &author).unwrap();
        let outcome = db.toggle_post_upvote(post, &other).unwrap();
        assert_eq!(outcome.points, 2);
        assert!(outcome.is_upvoted);
    }

    #[test]
    fn missing_target_leaves_no_upvote_row() {
        let db = Database::open_in_memory().unwrap();
        let (author, _) = seed(&db);

        let err = db.toggle_post_upvote(777, &author).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = db.toggle_comment_upvote(777, &author).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        assert_eq!(upvote_rows(&db, "post_upvotes"), 0);
        assert_eq!(upvote_rows(&db, "comment_upvotes"), 0);
    }

    #[test]
    fn comment_toggle_is_independent_of_post() {
        let db = Database::open_in_memory().unwrap();
        let (author, post) = seed(&db);
        let comment = db.create_root_comment(post, &author, "nice post").unwrap();

        let outcome = db.toggle_comment_upvote(comment.id, &author).unwrap();
        assert_eq!(outcome, ToggleOutcome { points: 1, is_upvoted: true });
        assert_eq!(db.get_post(post, None).unwrap().points, 0);

        let outcome = db.toggle_comment_upvote(comment.id, &author).unwrap();
        assert_eq!(outcome, ToggleOutcome { points: 0, is_upvoted: false });
    }

    #[test]
    fn unique_index_rejects_duplicate_upvote_rows() {
        let db = Database::open_in_memory().unwrap();
        let (author, post) = seed(&db);
        db.toggle_post_upvote(post, &author).unwrap();

        let err = db
            .with_tx(|tx| {
                tx.execute(
                    "INSERT INTO post_upvotes (post_id, user_id) VALUES (?1, ?2)",
                    (post, &author),
                )?;
                Ok(())
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }
}
