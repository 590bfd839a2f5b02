use crate::Database;
use crate::Result;
use crate::comments;
use crate::listing::{self, PageRequest, PostFilter};
use crate::models::{CommentRow, NewPost, Page, PostRow, ToggleOutcome, UserRow};
use crate::posts;
use crate::users;
use crate::votes::{self, Target};

/// Convenience entry points: each write runs as one transaction on the
/// writer, each read on a pooled reader.
impl Database {
    // -- Users --

    pub fn create_user(&self, username: &str, password_hash: &str) -> Result<String> {
        self.with_tx(|tx| users::create_user(tx, username, password_hash))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| users::get_user_by_username(conn, username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| users::get_user_by_id(conn, id))
    }

    // -- Posts --

    pub fn create_post(&self, post: NewPost<'_>) -> Result<i64> {
        self.with_tx(|tx| posts::create_post(tx, post))
    }

    pub fn get_post(&self, post_id: i64, viewer: Option<&str>) -> Result<PostRow> {
        self.with_conn(|conn| listing::get_post(conn, post_id, viewer))
    }

    pub fn list_posts(
        &self,
        viewer: Option<&str>,
        filter: PostFilter<'_>,
        page: PageRequest,
    ) -> Result<Page<PostRow>> {
        self.with_conn(|conn| listing::list_posts(conn, viewer, filter, page))
    }

    // -- Comments --

    pub fn create_root_comment(
        &self,
        post_id: i64,
        author_id: &str,
        content: &str,
    ) -> Result<CommentRow> {
        self.with_tx(|tx| comments::create_root_comment(tx, post_id, author_id, content))
    }

    pub fn create_reply(
        &self,
        parent_comment_id: i64,
        author_id: &str,
        content: &str,
    ) -> Result<CommentRow> {
        self.with_tx(|tx| comments::create_reply(tx, parent_comment_id, author_id, content))
    }

    pub fn list_top_level_comments(
        &self,
        post_id: i64,
        viewer: Option<&str>,
        page: PageRequest,
        include_children: bool,
    ) -> Result<Page<CommentRow>> {
        self.with_conn(|conn| {
            listing::list_top_level_comments(conn, post_id, viewer, page, include_children)
        })
    }

    pub fn list_child_comments(
        &self,
        parent_comment_id: i64,
        viewer: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<CommentRow>> {
        self.with_conn(|conn| listing::list_child_comments(conn, parent_comment_id, viewer, page))
    }

    // -- Upvotes --

    pub fn toggle_post_upvote(&self, post_id: i64, user_id: &str) -> Result<ToggleOutcome> {
        self.with_tx(|tx| votes::toggle_upvote(tx, Target::Post, post_id, user_id))
    }

    pub fn toggle_comment_upvote(&self, comment_id: i64, user_id: &str) -> Result<ToggleOutcome> {
        self.with_tx(|tx| votes::toggle_upvote(tx, Target::Comment, comment_id, user_id))
    }
}
