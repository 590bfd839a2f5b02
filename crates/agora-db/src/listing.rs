//! Paginated reads for posts and comment trees.
//!
//! Reads run outside any transaction and may see counters a moment behind a
//! concurrent write. Comment trees are never walked recursively: a listing
//! returns one level plus, optionally, a short preview of each item's direct
//! replies. Deeper levels are paged through [`list_child_comments`].

use std::collections::HashMap;

use agora_types::api::{Order, SortBy};
use rusqlite::{Connection, OptionalExtension};

use crate::models::{
    COMMENT_COLUMNS, CommentRow, POST_COLUMNS, Page, PostRow, comment_from_row, post_from_row,
};
use crate::{Result, StoreError};

/// Direct replies eagerly loaded per comment when children are requested.
pub const CHILD_PREVIEW_LIMIT: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based.
    pub page: u32,
    pub limit: u32,
    pub sort_by: SortBy,
    pub order: Order,
}

impl PageRequest {
    pub fn new(page: u32, limit: u32, sort_by: SortBy, order: Order) -> Self {
        Self {
            page,
            limit,
            sort_by,
            order,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.page == 0 || self.limit == 0 {
            return Err(StoreError::InvalidInput(
                "page and limit must be at least 1".into(),
            ));
        }
        Ok(())
    }

    fn offset(&self) -> Result<i64> {
        (i64::from(self.page) - 1)
            .checked_mul(i64::from(self.limit))
            .ok_or_else(|| StoreError::InvalidInput("page is out of range".into()))
    }

    fn total_pages(&self, count: i64) -> u32 {
        let pages = (count.max(0) as u64).div_ceil(u64::from(self.limit));
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    /// ORDER BY body. The id tie-break keeps equal sort keys in a stable order
    /// across pages.
    fn order_by(&self, alias: &str) -> String {
        let column = match self.sort_by {
            SortBy::Points => "points",
            SortBy::Recent => "created_at",
        };
        let direction = match self.order {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        };
        format!("{alias}.{column} {direction}, {alias}.id {direction}")
    }
}

/// Optional post filters. Both match exactly.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostFilter<'a> {
    pub author_id: Option<&'a str>,
    pub url: Option<&'a str>,
}

const POST_FROM: &str = "FROM posts p
     JOIN users u ON u.id = p.user_id
     LEFT JOIN post_upvotes pu ON pu.post_id = p.id AND pu.user_id = ?1";

const COMMENT_FROM: &str = "FROM comments c
     JOIN users u ON u.id = c.user_id
     LEFT JOIN comment_upvotes cu ON cu.comment_id = c.id AND cu.user_id = ?1";

pub fn list_posts(
    conn: &Connection,
    viewer: Option<&str>,
    filter: PostFilter<'_>,
    page: PageRequest,
) -> Result<Page<PostRow>> {
    page.validate()?;
    let offset = page.offset()?;

    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM posts p
         WHERE (?1 IS NULL OR p.user_id = ?1) AND (?2 IS NULL OR p.url = ?2)",
        (filter.author_id, filter.url),
        |row| row.get(0),
    )?;

    let sql = format!(
        "SELECT {} {}
         WHERE (?2 IS NULL OR p.user_id = ?2) AND (?3 IS NULL OR p.url = ?3)
         ORDER BY {}
         LIMIT ?4 OFFSET ?5",
        POST_COLUMNS,
        POST_FROM,
        page.order_by("p")
    );
    let mut stmt = conn.prepare(&sql)?;
    let items = stmt
        .query_map(
            (viewer, filter.author_id, filter.url, page.limit, offset),
            post_from_row,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Page {
        items,
        total_pages: page.total_pages(count),
    })
}

pub fn get_post(conn: &Connection, post_id: i64, viewer: Option<&str>) -> Result<PostRow> {
    let sql = format!("SELECT {} {} WHERE p.id = ?2", POST_COLUMNS, POST_FROM);
    conn.query_row(&sql, (viewer, post_id), post_from_row)
        .optional()?
        .ok_or_else(|| StoreError::not_found("Post"))
}

pub fn fetch_comment(
    conn: &Connection,
    comment_id: i64,
    viewer: Option<&str>,
) -> Result<Option<CommentRow>> {
    let sql = format!("SELECT {} {} WHERE c.id = ?2", COMMENT_COLUMNS, COMMENT_FROM);
    let row = conn
        .query_row(&sql, (viewer, comment_id), comment_from_row)
        .optional()?;
    Ok(row)
}

/// Top-level comments of a post, optionally with a reply preview on each.
pub fn list_top_level_comments(
    conn: &Connection,
    post_id: i64,
    viewer: Option<&str>,
    page: PageRequest,
    include_children: bool,
) -> Result<Page<CommentRow>> {
    let level = Level::Root { post_id };
    let mut listed = list_level(conn, level, viewer, page)?;
    if include_children {
        attach_children(conn, level, &mut listed.items, viewer, &page)?;
    }
    Ok(listed)
}

/// Direct replies of a comment.
pub fn list_child_comments(
    conn: &Connection,
    parent_comment_id: i64,
    viewer: Option<&str>,
    page: PageRequest,
) -> Result<Page<CommentRow>> {
    list_level(conn, Level::Replies { parent_comment_id }, viewer, page)
}

#[derive(Debug, Clone, Copy)]
enum Level {
    Root { post_id: i64 },
    Replies { parent_comment_id: i64 },
}

impl Level {
    fn key(self) -> i64 {
        match self {
            Self::Root { post_id } => post_id,
            Self::Replies { parent_comment_id } => parent_comment_id,
        }
    }

    fn filter(self, placeholder: &str) -> String {
        match self {
            Self::Root { .. } => {
                format!("c.post_id = {} AND c.parent_comment_id IS NULL", placeholder)
            }
            Self::Replies { .. } => format!("c.parent_comment_id = {}", placeholder),
        }
    }

    fn ensure_exists(self, conn: &Connection) -> Result<()> {
        let (sql, label) = match self {
            Self::Root { .. } => ("SELECT 1 FROM posts WHERE id = ?1", "Post"),
            Self::Replies { .. } => ("SELECT 1 FROM comments WHERE id = ?1", "Comment"),
        };
        let found: Option<i64> = conn.query_row(sql, [self.key()], |r| r.get(0)).optional()?;
        found
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(label))
    }
}

fn list_level(
    conn: &Connection,
    level: Level,
    viewer: Option<&str>,
    page: PageRequest,
) -> Result<Page<CommentRow>> {
    page.validate()?;
    let offset = page.offset()?;
    level.ensure_exists(conn)?;

    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM comments c WHERE {}", level.filter("?1")),
        [level.key()],
        |row| row.get(0),
    )?;

    let sql = format!(
        "SELECT {} {}
         WHERE {}
         ORDER BY {}
         LIMIT ?3 OFFSET ?4",
        COMMENT_COLUMNS,
        COMMENT_FROM,
        level.filter("?2"),
        page.order_by("c")
    );
    let mut stmt = conn.prepare(&sql)?;
    let items = stmt
        .query_map(
            (viewer, level.key(), page.limit, offset),
            comment_from_row,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Page {
        items,
        total_pages: page.total_pages(count),
    })
}

/// Load up to [`CHILD_PREVIEW_LIMIT`] direct replies for every parent on the
/// listed page in one query, ranked per parent with the same ordering as the
/// parent level. The listed page is re-selected in SQL.
fn attach_children(
    conn: &Connection,
    level: Level,
    parents: &mut [CommentRow],
    viewer: Option<&str>,
    page: &PageRequest,
) -> Result<()> {
    if parents.is_empty() {
        return Ok(());
    }

    let sql = format!(
        "WITH listed AS (
             SELECT c.id FROM comments c
             WHERE {}
             ORDER BY {}
             LIMIT ?4 OFFSET ?5
         )
         SELECT * FROM (
             SELECT {}, ROW_NUMBER() OVER (PARTITION BY c.parent_comment_id ORDER BY {}) AS rn
             {}
             WHERE c.parent_comment_id IN (SELECT id FROM listed)
         )
         WHERE rn <= ?2
         ORDER BY parent_comment_id, rn",
        level.filter("?3"),
        page.order_by("c"),
        COMMENT_COLUMNS,
        page.order_by("c"),
        COMMENT_FROM,
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(
            (
                viewer,
                CHILD_PREVIEW_LIMIT,
                level.key(),
                page.limit,
                page.offset()?,
            ),
            comment_from_row,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut by_parent: HashMap<i64, Vec<CommentRow>> = HashMap::new();
    for row in rows {
        if let Some(parent_id) = row.parent_comment_id {
            by_parent.entry(parent_id).or_default().push(row);
        }
    }
    for parent in parents.iter_mut() {
        parent.children = by_parent.remove(&parent.id).unwrap_or_default();
    }

    Ok(())
}
