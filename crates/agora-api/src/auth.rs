use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{error, info, warn};

use agora_db::Database;
use agora_types::api::{AuthResponse, Claims, LoginRequest, SuccessResponse, UserData};

use crate::blocking;
use crate::error::{ApiError, ApiResult};
use crate::extract::JsonBody;
use crate::middleware::AuthUser;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
}

const TOKEN_LIFETIME_DAYS: i64 = 30;

fn validate_credentials(req: &LoginRequest) -> ApiResult<()> {
    let name_len = req.username.chars().count();
    if !(3..=31).contains(&name_len)
        || !req
            .username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ApiError::BadRequest(
            "Username must be 3-31 letters, digits or underscores".into(),
        ));
    }
    if !(3..=255).contains(&req.password.len()) {
        return Err(ApiError::BadRequest(
            "Password must be 3-255 characters".into(),
        ));
    }
    Ok(())
}

pub async fn signup(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    validate_credentials(&req)?;

    let username = req.username.clone();
    let created = blocking(&state, move |db| {
        // Hash password with Argon2id
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(req.password.as_bytes(), &salt)
            .map_err(|e| {
                error!("Password hashing failed: {}", e);
                ApiError::Internal
            })?
            .to_string();

        Ok(db.create_user(&req.username, &password_hash)?)
    })
    .await;

    let user_id = match created {
        Ok(id) => id,
        Err(ApiError::Conflict(_)) => {
            return Err(ApiError::Conflict("Username already used".into()));
        }
        Err(e) => return Err(e),
    };

    let token = create_token(&state.jwt_secret, &user_id, &username)?;
    info!("User {} signed up", username);

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::new(
            "User created",
            AuthResponse {
                user_id,
                username,
                token,
            },
        )),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let username = req.username.clone();
    let user = blocking(&state, move |db| {
        let Some(user) = db.get_user_by_username(&req.username)? else {
            return Ok(None);
        };

        // Verify password
        let verified = PasswordHash::new(&user.password_hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(req.password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or_else(|e| {
                warn!("Corrupt password hash for user {}: {}", user.id, e);
                false
            });

        Ok(verified.then_some(user))
    })
    .await?
    .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".into()))?;

    let token = create_token(&state.jwt_secret, &user.id, &username)?;

    Ok(Json(SuccessResponse::new(
        "Logged in",
        AuthResponse {
            user_id: user.id,
            username: user.username,
            token,
        },
    )))
}

pub async fn current_user(AuthUser(claims): AuthUser) -> Json<SuccessResponse<UserData>> {
    Json(SuccessResponse::new(
        "User fetched",
        UserData {
            username: claims.username,
        },
    ))
}

pub fn create_token(secret: &str, user_id: &str, username: &str) -> ApiResult<String> {
    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(TOKEN_LIFETIME_DAYS)).timestamp()
            as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| {
        error!("Failed to sign session token: {}", e);
        ApiError::Internal
    })
}
