//! Recomputes every denormalized counter from raw rows and reports where the
//! stored value disagrees. Verification support for tests; nothing calls this
//! on the request path.

use rusqlite::Connection;

use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Post(i64),
    Comment(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub entity: Entity,
    pub field: &'static str,
    pub expected: i64,
    pub actual: i64,
}

struct Check {
    field: &'static str,
    post: bool,
    /// Yields `(id, expected, actual)` for mismatching rows only.
    sql: &'static str,
}

const CHECKS: &[Check] = &[
    Check {
        field: "points",
        post: true,
        sql: "SELECT p.id, COUNT(pu.id), p.points
              FROM posts p LEFT JOIN post_upvotes pu ON pu.post_id = p.id
              GROUP BY p.id HAVING COUNT(pu.id) != p.points",
    },
    Check {
        field: "comment_count",
        post: true,
        sql: "SELECT p.id, COUNT(c.id), p.comment_count
              FROM posts p LEFT JOIN comments c ON c.post_id = p.id
              GROUP BY p.id HAVING COUNT(c.id) != p.comment_count",
    },
    Check {
        field: "points",
        post: false,
        sql: "SELECT c.id, COUNT(cu.id), c.points
              FROM comments c LEFT JOIN comment_upvotes cu ON cu.comment_id = c.id
              GROUP BY c.id HAVING COUNT(cu.id) != c.points",
    },
    Check {
        field: "comment_count",
        post: false,
        sql: "SELECT c.id, COUNT(r.id), c.comment_count
              FROM comments c LEFT JOIN comments r ON r.parent_comment_id = c.id
              GROUP BY c.id HAVING COUNT(r.id) != c.comment_count",
    },
    Check {
        field: "depth",
        post: false,
        sql: "SELECT c.id, COALESCE(parent.depth + 1, 0), c.depth
              FROM comments c LEFT JOIN comments parent ON parent.id = c.parent_comment_id
              WHERE c.depth != COALESCE(parent.depth + 1, 0)",
    },
    Check {
        field: "post_id",
        post: false,
        sql: "SELECT c.id, parent.post_id, c.post_id
              FROM comments c JOIN comments parent ON parent.id = c.parent_comment_id
              WHERE c.post_id != parent.post_id",
    },
];

/// Every counter, depth and post link that does not match the raw rows.
/// An empty result means the store is consistent.
pub fn check(conn: &Connection) -> Result<Vec<Violation>> {
    let mut violations = Vec::new();

    for check in CHECKS {
        let mut stmt = conn.prepare(check.sql)?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?, row.get::<_, i64>(2)?))
        })?;

        for row in rows {
            let (id, expected, actual) = row?;
            violations.push(Violation {
                entity: if check.post {
                    Entity::Post(id)
                } else {
                    Entity::Comment(id)
                },
                field: check.field,
                expected,
                actual,
            });
        }
    }

    Ok(violations)
}
