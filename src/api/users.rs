//! Account and channel endpoints

use axum::{
    Router,
    extract::{Multipart, Path, State, multipart::MultipartRejection},
    routing::{get, patch, post},
};
use axum_extra::extract::{CookieJar, cookie::Cookie};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::multipart::MultipartForm;
use super::response::{ApiResponse, AppJson};
use crate::AppState;
use crate::auth::{ACCESS_TOKEN_COOKIE, CurrentUser, REFRESH_TOKEN_COOKIE, TokenPair};
use crate::data::{ChannelOwner, ChannelProfile, User, VideoWithOwner};
use crate::error::AppError;
use crate::service::{LoginInput, RegisterInput, UserService};

pub fn users_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/refreshAccessToken", post(refresh_access_token))
        .route("/changePassword", post(change_password))
        .route("/currentUser", get(current_user).post(current_user))
        .route("/updateAccount", patch(update_account))
        .route("/changeAvatar", patch(change_avatar))
        .route("/changeCoverImage", patch(change_cover_image))
        .route("/c/:userName", get(channel_profile))
        .route("/watchHistory", get(watch_history))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<User>,
    access_token: String,
    refresh_token: String,
}

impl TokenResponse {
    fn new(user: Option<User>, tokens: TokenPair) -> Self {
        Self {
            user,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        }
    }
}

fn build_user_service(state: &AppState) -> UserService {
    UserService::new(state.db.clone(), state.media.clone(), state.config.clone())
}

fn with_token_cookies(jar: CookieJar, tokens: &TokenPair, secure: bool) -> CookieJar {
    let cookie = |name: &'static str, value: String| {
        Cookie::build((name, value))
            .http_only(true)
            .secure(secure)
            .path("/")
    };

    jar.add(cookie(ACCESS_TOKEN_COOKIE, tokens.access_token.clone()))
        .add(cookie(REFRESH_TOKEN_COOKIE, tokens.refresh_token.clone()))
}

fn without_token_cookies(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(ACCESS_TOKEN_COOKIE).path("/"))
        .remove(Cookie::build(REFRESH_TOKEN_COOKIE).path("/"))
}

/// POST /users/register
async fn register(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<User>, AppError> {
    let image_limit = state.config.uploads.max_image_bytes;
    let mut form = MultipartForm::read(
        multipart?,
        &[("avatar", image_limit), ("coverImage", image_limit)],
    )
    .await?;

    let input = RegisterInput {
        full_name: form.text("fullName"),
        email: form.text("email"),
        user_name: form.text("userName"),
        password: form.text("password"),
        avatar: form.file("avatar"),
        cover_image: form.file("coverImage"),
    };

    let user = build_user_service(&state).register(input).await?;
    Ok(ApiResponse::created(user, "User Registered Successfully"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    email: Option<String>,
    user_name: Option<String>,
    password: Option<String>,
}

/// POST /users/login
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<(CookieJar, ApiResponse<TokenResponse>), AppError> {
    let (user, tokens) = build_user_service(&state)
        .login(LoginInput {
            email: req.email,
            user_name: req.user_name,
            password: req.password,
        })
        .await?;

    let jar = with_token_cookies(jar, &tokens, state.config.should_use_secure_cookies());
    let data = TokenResponse::new(Some(user), tokens);

    Ok((jar, ApiResponse::ok(data, "User logged In Successfully")))
}

/// POST /users/logout
async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    jar: CookieJar,
) -> Result<(CookieJar, ApiResponse<serde_json::Value>), AppError> {
    build_user_service(&state).logout(&user.id).await?;

    Ok((
        without_token_cookies(jar),
        ApiResponse::ok(json!({}), "User Logged Out"),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    refresh_token: Option<String>,
}

/// POST /users/refreshAccessToken
///
/// The refresh token comes from the cookie, falling back to the JSON body.
async fn refresh_access_token(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Option<AppJson<RefreshRequest>>,
) -> Result<(CookieJar, ApiResponse<TokenResponse>), AppError> {
    let incoming = jar
        .get(REFRESH_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .or_else(|| body.and_then(|AppJson(req)| req.refresh_token))
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::unauthorized("Unauthorized request"))?;

    let tokens = build_user_service(&state).refresh_tokens(&incoming).await?;

    let jar = with_token_cookies(jar, &tokens, state.config.should_use_secure_cookies());
    let data = TokenResponse::new(None, tokens);

    Ok((jar, ApiResponse::ok(data, "Access token refreshed")))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordRequest {
    old_password: Option<String>,
    new_password: Option<String>,
}

/// POST /users/changePassword
async fn change_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(req): AppJson<ChangePasswordRequest>,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    build_user_service(&state)
        .change_password(&user, req.old_password, req.new_password)
        .await?;

    Ok(ApiResponse::ok(json!({}), "Password changed successfully"))
}

/// GET /users/currentUser
async fn current_user(CurrentUser(user): CurrentUser) -> ApiResponse<User> {
    ApiResponse::ok(user, "current user fetched successfully")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateAccountRequest {
    full_name: Option<String>,
    email: Option<String>,
}

/// PATCH /users/updateAccount
async fn update_account(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(req): AppJson<UpdateAccountRequest>,
) -> Result<ApiResponse<User>, AppError> {
    let user = build_user_service(&state)
        .update_account(&user.id, req.full_name, req.email)
        .await?;

    Ok(ApiResponse::ok(user, "Account details updated successfully"))
}

/// PATCH /users/changeAvatar
async fn change_avatar(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<User>, AppError> {
    let mut form = MultipartForm::read(
        multipart?,
        &[("avatar", state.config.uploads.max_image_bytes)],
    )
    .await?;

    let user = build_user_service(&state)
        .change_avatar(&user, form.file("avatar"))
        .await?;

    Ok(ApiResponse::ok(user, "Avatar image updated successfully"))
}

/// PATCH /users/changeCoverImage
async fn change_cover_image(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<User>, AppError> {
    let mut form = MultipartForm::read(
        multipart?,
        &[("coverImage", state.config.uploads.max_image_bytes)],
    )
    .await?;

    let user = build_user_service(&state)
        .change_cover_image(&user, form.file("coverImage"))
        .await?;

    Ok(ApiResponse::ok(user, "Cover image updated successfully"))
}

/// GET /users/c/:userName
async fn channel_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_name): Path<String>,
) -> Result<ApiResponse<ChannelProfile>, AppError> {
    let profile = build_user_service(&state)
        .channel_profile(&user_name, Some(&user.id))
        .await?;

    Ok(ApiResponse::ok(profile, "User channel fetched successfully"))
}

/// GET /users/watchHistory
async fn watch_history(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<ApiResponse<Vec<VideoWithOwner<ChannelOwner>>>, AppError> {
    let history = build_user_service(&state).watch_history(&user.id).await?;

    Ok(ApiResponse::ok(history, "Watch history fetched successfully"))
}
