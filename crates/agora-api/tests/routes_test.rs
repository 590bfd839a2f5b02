//! End-to-end route tests against an in-memory store.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use agora_api::auth::{AppState, AppStateInner, create_token};
use agora_db::Database;

const SECRET: &str = "test-secret";

fn app() -> (Router, AppState) {
    let state: AppState = Arc::new(AppStateInner {
        db: Database::open_in_memory().expect("open in-memory db"),
        jwt_secret: SECRET.to_string(),
    });
    (agora_api::router(state.clone()), state)
}

/// Create a user directly in the store and mint a session for it.
fn user(state: &AppState, name: &str) -> (String, String) {
    let id = state.db.create_user(name, "not-a-real-hash").unwrap();
    let token = create_token(SECRET, &id, name).unwrap();
    (id, token)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let req = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn create_post(app: &Router, token: &str, title: &str) -> i64 {
    let (status, body) = send(
        app,
        Method::POST,
        "/posts",
        Some(token),
        Some(json!({ "title": title, "content": "some words" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["data"]["postId"].as_i64().unwrap()
}

#[tokio::test]
async fn signup_login_and_duplicate_username() {
    let (app, _) = app();
    let creds = json!({ "username": "alice_1", "password": "hunter2" });

    let (status, body) = send(&app, Method::POST, "/auth/signup", None, Some(creds.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], json!(true));
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, body) = send(&app, Method::GET, "/auth/user", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], json!("alice_1"));

    let (status, body) = send(&app, Method::POST, "/auth/signup", None, Some(creds.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], json!(false));

    let (status, _) = send(&app, Method::POST, "/auth/login", None, Some(creds)).await;
    assert_eq!(status, StatusCode::OK);

    let wrong = json!({ "username": "alice_1", "password": "wrong-password" });
    let (status, _) = send(&app, Method::POST, "/auth/login", None, Some(wrong)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn writes_require_a_session() {
    let (app, _) = app();

    let (status, _) = send(
        &app,
        Method::POST,
        "/posts",
        None,
        Some(json!({ "title": "hello", "content": "body" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::PATCH, "/posts/1/upvote", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/auth/user", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn post_validation() {
    let (app, state) = app();
    let (_, token) = user(&state, "alice");

    let cases = [
        json!({ "title": "no", "content": "body" }),
        json!({ "title": "missing both" }),
        json!({ "title": "bad link", "url": "not a url" }),
        json!({ "title": "bad scheme", "url": "ftp://example.com/file" }),
    ];
    for case in cases {
        let (status, _) = send(&app, Method::POST, "/posts", Some(&token), Some(case)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn post_upvote_toggles_and_annotates_viewer() {
    let (app, state) = app();
    let (_, alice) = user(&state, "alice");
    let (_, bob) = user(&state, "bob");
    let post_id = create_post(&app, &alice, "upvote me").await;

    let uri = format!("/posts/{}/upvote", post_id);
    let (status, body) = send(&app, Method::PATCH, &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({ "count": 1, "isUpvoted": true }));

    let (_, body) = send(&app, Method::GET, "/posts", Some(&bob), None).await;
    assert_eq!(body["data"]["posts"][0]["isUpvoted"], json!(true));
    assert_eq!(body["data"]["posts"][0]["author"]["username"], json!("alice"));
    assert_eq!(body["pagination"], json!({ "page": 1, "totalPages": 1 }));

    let (_, body) = send(&app, Method::GET, "/posts", None, None).await;
    assert_eq!(body["data"]["posts"][0]["isUpvoted"], json!(false));
    assert_eq!(body["data"]["posts"][0]["points"], json!(1));

    let (_, body) = send(&app, Method::PATCH, &uri, Some(&bob), None).await;
    assert_eq!(body["data"], json!({ "count": 0, "isUpvoted": false }));

    let (status, _) = send(&app, Method::PATCH, "/posts/999/upvote", Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_posts_paginates_and_filters() {
    let (app, state) = app();
    let (alice_id, alice) = user(&state, "alice");
    let (_, bob) = user(&state, "bob");
    for i in 0..12 {
        create_post(&app, &alice, &format!("alice post {}", i)).await;
    }
    create_post(&app, &bob, "bob post").await;

    let (_, body) = send(
        &app,
        Method::GET,
        "/posts?page=2&limit=5&sortBy=recent&order=asc",
        None,
        None,
    )
    .await;
    assert_eq!(body["pagination"], json!({ "page": 2, "totalPages": 3 }));
    let titles: Vec<&str> = body["data"]["posts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap())
        .collect();
    assert_eq!(
        titles,
        vec!["alice post 5", "alice post 6", "alice post 7", "alice post 8", "alice post 9"]
    );

    let uri = format!("/posts?author={}&limit=100", alice_id);
    let (_, body) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(body["data"]["posts"].as_array().unwrap().len(), 12);

    let (status, _) = send(&app, Method::GET, "/posts?page=0", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn comment_tree_round_trip() {
    let (app, state) = app();
    let (alice_id, alice) = user(&state, "alice");
    let (_, bob) = user(&state, "bob");
    let post_id = create_post(&app, &alice, "discuss").await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/posts/{}/comment", post_id),
        Some(&bob),
        Some(json!({ "content": "top level" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let root = &body["data"]["comment"];
    assert_eq!(root["depth"], json!(0));
    assert_eq!(root["parentCommentId"], Value::Null);
    assert_eq!(root["author"]["username"], json!("bob"));
    let root_id = root["id"].as_i64().unwrap();

    let mut reply_ids = Vec::new();
    for i in 0..3 {
        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/comments/{}", root_id),
            Some(&alice),
            Some(json!({ "content": format!("reply number {}", i) })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["comment"]["depth"], json!(1));
        reply_ids.push(body["data"]["comment"]["id"].as_i64().unwrap());
    }

    let (_, body) = send(
        &app,
        Method::PATCH,
        &format!("/comments/{}/upvote", reply_ids[0]),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(
        body["data"],
        json!({ "count": 1, "commentUpvotes": [{ "userId": alice_id }] })
    );

    let (_, body) = send(&app, Method::GET, &format!("/posts/{}", post_id), None, None).await;
    assert_eq!(body["data"]["post"]["commentCount"], json!(4));

    let (status, body) = send(
        &app,
        Method::GET,
        &format!(
            "/posts/{}/comments?sortBy=recent&order=asc&includeChildren=true",
            post_id
        ),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let comments = body["data"]["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0]["commentCount"], json!(3));
    let children = comments[0]["childComments"].as_array().unwrap();
    assert_eq!(children.len(), 2);
    assert_eq!(children[0]["id"], json!(reply_ids[0]));
    assert_eq!(children[0]["commentUpvotes"], json!([{ "userId": alice_id }]));
    assert_eq!(children[1]["commentUpvotes"], json!([]));

    let (_, body) = send(
        &app,
        Method::GET,
        &format!("/comments/{}/comments?sortBy=recent&order=asc&page=2&limit=2", root_id),
        None,
        None,
    )
    .await;
    assert_eq!(body["pagination"], json!({ "page": 2, "totalPages": 2 }));
    assert_eq!(body["data"]["comments"][0]["id"], json!(reply_ids[2]));
}

#[tokio::test]
async fn comment_errors() {
    let (app, state) = app();
    let (_, alice) = user(&state, "alice");
    let post_id = create_post(&app, &alice, "errors").await;

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/posts/{}/comment", post_id),
        Some(&alice),
        Some(json!({ "content": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::POST,
        "/posts/404/comment",
        Some(&alice),
        Some(json!({ "content": "hello there" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("Post not found"));

    let (status, _) = send(
        &app,
        Method::POST,
        "/comments/404",
        Some(&alice),
        Some(json!({ "content": "hello there" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::GET, "/posts/404/comments", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::GET, "/comments/404/comments", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_requests_get_json_errors() {
    let (app, state) = app();
    let (_, alice) = user(&state, "alice");

    let (status, body) = send(&app, Method::GET, "/posts/abc", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].is_string());

    let (status, body) = send(&app, Method::GET, "/posts?page=first", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));

    let (status, body) = send(
        &app,
        Method::POST,
        "/posts",
        Some(&alice),
        Some(json!({ "title": "abc", "content": "x", "extra": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].as_str().unwrap().contains("extra"));

    let (status, body) = send(
        &app,
        Method::PATCH,
        "/comments/not-a-number/upvote",
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
}
