use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::info;

use agora_db::listing::{PageRequest, PostFilter};
use agora_db::models::{NewPost, PostRow};
use agora_types::api::{
    CommentData, CommentListQuery, CommentsData, CreateCommentRequest, CreatePostRequest,
    CreatePostResponse, Order, PaginatedResponse, PostData, PostListQuery, PostUpvoteResponse,
    PostsData, SortBy, SuccessResponse,
};
use agora_types::models::{Author, Post};

use crate::auth::AppState;
use crate::comments::{comment_view, validate_comment};
use crate::error::{ApiError, ApiResult};
use crate::extract::{JsonBody, PathParam, QueryParams};
use crate::middleware::{AuthUser, Viewer};
use crate::{MAX_PAGE_LIMIT, blocking};

pub(crate) fn post_view(row: PostRow) -> Post {
    Post {
        id: row.id,
        title: row.title,
        url: row.url,
        content: row.content,
        points: row.points,
        comment_count: row.comment_count,
        created_at: row.created_at,
        author: Author {
            id: row.author.id,
            username: row.author.username,
        },
        is_upvoted: row.is_upvoted,
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_post(req: CreatePostRequest) -> ApiResult<CreatePostRequest> {
    let title = req.title.trim().to_string();
    if title.chars().count() < 3 {
        return Err(ApiError::BadRequest(
            "Title must be at least 3 characters".into(),
        ));
    }

    let url = blank_to_none(req.url);
    let content = blank_to_none(req.content);
    if url.is_none() && content.is_none() {
        return Err(ApiError::BadRequest(
            "Either url or content must be provided".into(),
        ));
    }

    if let Some(link) = &url {
        let parsed = url::Url::parse(link)
            .map_err(|_| ApiError::BadRequest("URL must be valid".into()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::BadRequest("URL must be http or https".into()));
        }
    }

    Ok(CreatePostRequest {
        title,
        url,
        content,
    })
}

pub(crate) fn page_request(page: u32, limit: u32, sort_by: SortBy, order: Order) -> PageRequest {
    PageRequest::new(page, limit.min(MAX_PAGE_LIMIT), sort_by, order)
}

pub async fn create_post(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    JsonBody(req): JsonBody<CreatePostRequest>,
) -> ApiResult<impl IntoResponse> {
    let req = validate_post(req)?;

    let author_id = claims.sub.clone();
    let post_id = blocking(&state, move |db| {
        Ok(db.create_post(NewPost {
            author_id: &author_id,
            title: &req.title,
            url: req.url.as_deref(),
            content: req.content.as_deref(),
        })?)
    })
    .await?;

    info!("Post {} created by {}", post_id, claims.username);

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::new(
            "Post created",
            CreatePostResponse { post_id },
        )),
    ))
}

pub async fn list_posts(
    State(state): State<AppState>,
    viewer: Viewer,
    QueryParams(query): QueryParams<PostListQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = page_request(query.page, query.limit, query.sort_by, query.order);
    let viewer_id = viewer.user_id().map(str::to_string);

    let listed = blocking(&state, move |db| {
        let filter = PostFilter {
            author_id: query.author.as_deref(),
            url: query.site.as_deref(),
        };
        Ok(db.list_posts(viewer_id.as_deref(), filter, page)?)
    })
    .await?;

    Ok(Json(PaginatedResponse::new(
        "Posts fetched",
        PostsData {
            posts: listed.items.into_iter().map(post_view).collect(),
        },
        page.page,
        listed.total_pages,
    )))
}

pub async fn get_post(
    State(state): State<AppState>,
    viewer: Viewer,
    PathParam(post_id): PathParam<i64>,
) -> ApiResult<impl IntoResponse> {
    let viewer_id = viewer.user_id().map(str::to_string);
    let row = blocking(&state, move |db| {
        Ok(db.get_post(post_id, viewer_id.as_deref())?)
    })
    .await?;

    Ok(Json(SuccessResponse::new(
        "Post fetched",
        PostData {
            post: post_view(row),
        },
    )))
}

pub async fn create_comment(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    PathParam(post_id): PathParam<i64>,
    JsonBody(req): JsonBody<CreateCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    validate_comment(&req)?;

    let author_id = claims.sub.clone();
    let row = blocking(&state, move |db| {
        Ok(db.create_root_comment(post_id, &author_id, &req.content)?)
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

pub async fn list_comments(
    State(state): State<AppState>,
    viewer: Viewer,
    PathParam(post_id): PathParam<i64>,
    QueryParams(query): QueryParams<CommentListQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = page_request(query.page, query.limit, query.sort_by, query.order);
    let include_children = query.include_children;
    let viewer_id = viewer.user_id().map(str::to_string);

    let query_viewer = viewer_id.clone();
    let listed = blocking(&state, move |db| {
        Ok(db.list_top_level_comments(
            post_id,
            query_viewer.as_deref(),
            page,
            include_children,
        )?)
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

pub async fn upvote_post(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    PathParam(post_id): PathParam<i64>,
) -> ApiResult<impl IntoResponse> {
    let outcome = blocking(&state, move |db| {
        Ok(db.toggle_post_upvote(post_id, &claims.sub)?)
    })
    .await?;

    Ok(Json(SuccessResponse::new(
        "Post updated",
        PostUpvoteResponse {
            count: outcome.points,
            is_upvoted: outcome.is_upvoted,
        },
    )))
}
