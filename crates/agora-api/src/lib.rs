pub mod auth;
pub mod comments;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod posts;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, patch, post},
};
use tracing::error;

use agora_db::Database;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};

/// Largest page size a client may request.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Run store work off the async runtime.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&Database) -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })?
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/user", get(auth::current_user))
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route("/posts/{post_id}", get(posts::get_post))
        .route("/posts/{post_id}/comment", post(posts::create_comment))
        .route("/posts/{post_id}/comments", get(posts::list_comments))
        .route("/posts/{post_id}/upvote", patch(posts::upvote_post))
        .route("/comments/{comment_id}", post(comments::create_reply))
        .route("/comments/{comment_id}/comments", get(comments::list_child_comments))
        .route("/comments/{comment_id}/upvote", patch(comments::upvote_comment))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::optional_auth,
        ))
        .with_state(state)
}
