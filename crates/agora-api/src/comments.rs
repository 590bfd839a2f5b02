use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use agora_db::models::CommentRow;
use agora_types::api::{
    CommentData, CommentListQuery, CommentUpvoteResponse, CommentsData, CreateCommentRequest,
    PaginatedResponse, SuccessResponse,
};
use agora_types::models::{Author, Comment, UpvoteRef};

use crate::auth::AppState;
use crate::blocking;
use crate::error::{ApiError, ApiResult};
use crate::extract::{JsonBody, PathParam, QueryParams};
use crate::middleware::{AuthUser, Viewer};
use crate::posts::page_request;

const MIN_COMMENT_CHARS: usize = 3;

pub(crate) fn validate_comment(req: &CreateCommentRequest) -> ApiResult<()> {
    if req.content.trim().chars().count() < MIN_COMMENT_CHARS {
        return Err(ApiError::BadRequest(
            "Comment must be at least 3 characters long".into(),
        ));
    }
    Ok(())
}

/// Convert a row (and its reply preview) into the API shape. The upvote list
/// only ever names the viewer.
pub(crate) fn comment_view(row: CommentRow, viewer: Option<&str>) -> Comment {
    let comment_upvotes = match viewer {
        Some(user_id) if row.is_upvoted => vec![UpvoteRef {
            user_id: user_id.to_string(),
        }],
        _ => Vec::new(),
    };

    Comment {
        id: row.id,
        user_id: row.author.id.clone(),
        post_id: row.post_id,
        parent_comment_id: row.parent_comment_id,
        content: row.content,
        points: row.points,
        comment_count: row.comment_count,
        depth: row.depth,
        created_at: row.created_at,
        author: Author {
            id: row.author.id,
            username: row.author.username,
        },
        comment_upvotes,
        child_comments: row
            .children
            .into_iter()
            .map(|child| comment_view(child, viewer))
            .collect(),
    }
}

pub async fn create_reply(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    PathParam(comment_id): PathParam<i64>,
    JsonBody(req): JsonBody<CreateCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    validate_comment(&req)?;

    let author_id = claims.sub.clone();
    let row = blocking(&state, move |db| {
        Ok(db.create_reply(comment_id, &author_id, &req.content)?)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::new(
            "Comment created",
            CommentData {
                comment: comment_view(row, Some(&claims.sub)),
            },
        )),
    ))
}

pub async fn list_child_comments(
    State(state): State<AppState>,
    viewer: Viewer,
    PathParam(comment_id): PathParam<i64>,
    QueryParams(query): QueryParams<CommentListQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = page_request(query.page, query.limit, query.sort_by, query.order);
    let viewer_id = viewer.user_id().map(str::to_string);

    let query_viewer = viewer_id.clone();
    let listed = blocking(&state, move |db| {
        Ok(db.list_child_comments(comment_id, query_viewer.as_deref(), page)?)
    })
    .await?;

    Ok(Json(PaginatedResponse::new(
        "Comments fetched",
        CommentsData {
            comments: listed
                .items
                .into_iter()
                .map(|row| comment_view(row, viewer_id.as_deref()))
                .collect(),
        },
        page.page,
        listed.total_pages,
    )))
}

pub async fn upvote_comment(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    PathParam(comment_id): PathParam<i64>,
) -> ApiResult<impl IntoResponse> {
    let user_id = claims.sub.clone();
    let outcome = blocking(&state, move |db| {
        Ok(db.toggle_comment_upvote(comment_id, &user_id)?)
    })
    .await?;

    let comment_upvotes = if outcome.is_upvoted {
        vec![UpvoteRef { user_id: claims.sub }]
    } else {
        Vec::new()
    };

    Ok(Json(SuccessResponse::new(
        "Comment updated",
        CommentUpvoteResponse {
            count: outcome.points,
            comment_upvotes,
        },
    )))
}
