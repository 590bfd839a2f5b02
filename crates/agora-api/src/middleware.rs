use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::debug;

use agora_types::api::Claims;

use crate::auth::AppState;
use crate::error::ApiError;

/// Request extension holding the decoded session, if any.
#[derive(Debug, Clone)]
struct Session(Option<Claims>);

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

pub fn decode_token(secret: &str, token: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| debug!("Rejected session token: {}", e))
    .ok()
}

/// Decode the bearer token when present. Reads are open to anonymous
/// viewers, so a missing or invalid token is not an error here; handlers
/// that need a user extract [`AuthUser`].
pub async fn optional_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let claims = bearer_token(req.headers()).and_then(|token| decode_token(&state.jwt_secret, token));
    req.extensions_mut().insert(Session(claims));
    next.run(req).await
}

/// The requesting viewer, `None` when anonymous.
#[derive(Debug, Clone)]
pub struct Viewer(pub Option<Claims>);

impl Viewer {
    pub fn user_id(&self) -> Option<&str> {
        self.0.as_ref().map(|c| c.sub.as_str())
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Viewer {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts.extensions.get::<Session>().and_then(|s| s.0.clone());
        Ok(Self(claims))
    }
}

/// An authenticated user. Rejects with 401 when the request carried no valid
/// session.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .and_then(|s| s.0.clone())
            .map(Self)
            .ok_or_else(|| ApiError::Unauthorized("Unauthorized".into()))
    }
}
