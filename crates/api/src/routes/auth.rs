use axum::{
    Json,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
};
use invitely_db::models::User;
use invitely_services::{auth::AccessToken, registration::NewAccount, store::UserStore};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 64))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub display_name: String,
    #[validate(length(min = 8))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub username: String,
    pub display_name: String,
    pub is_staff: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            email: user.email,
            username: user.username,
            display_name: user.display_name,
            is_staff: user.is_staff,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

/// Issues a token for `user` and sets it as the `access_token` cookie.
pub(crate) fn sign_in(
    state: &AppState,
    user: User,
) -> Result<(HeaderMap, Json<AuthResponse>), ApiError> {
    let AccessToken {
        access_token,
        token_type,
        expires_in,
    } = state.auth.generate_token(&user)?;

    let mut headers = HeaderMap::new();
    let cookie = format!(
        "access_token={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        access_token, expires_in
    );
    let cookie =
        HeaderValue::from_str(&cookie).map_err(|e| ApiError::Internal(e.to_string()))?;
    headers.insert(header::SET_COOKIE, cookie);

    let response = AuthResponse {
        access_token,
        token_type,
        expires_in,
        user: user.into(),
    };
    Ok((headers, Json(response)))
}

pub(crate) fn new_account(
    state: &AppState,
    username: String,
    display_name: String,
    password: &str,
) -> Result<NewAccount, ApiError> {
    Ok(NewAccount {
        username,
        display_name,
        password_hash: Some(state.auth.hash_password(password)?),
    })
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, HeaderMap, Json<AuthResponse>), ApiError> {
    body.validate()?;
    let account = new_account(&state, body.username, body.display_name, &body.password)?;
    let user = state.registration.register(&body.email, account).await?;

    let (headers, response) = sign_in(&state, user)?;
    Ok((StatusCode::CREATED, headers, response))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<AuthResponse>), ApiError> {
    let user = if let Some(ref username) = body.username {
        state.users.find_by_username(username).await
    } else if let Some(ref email) = body.email {
        state.users.find_by_email(email).await
    } else {
        return Err(ApiError::BadRequest("Either username or email is required".to_string()));
    }
    .map_err(|_| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    state.auth.authenticate(&user, &body.password)?;
    sign_in(&state, user)
}

pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.users.find_by_id(auth.user_id).await?;
    Ok(Json(user.into()))
}
