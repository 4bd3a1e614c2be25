//! User service
//!
//! Handles registration, credentials, tokens and profile media.

use std::sync::Arc;

use chrono::Utc;

use super::required_text;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::{TokenKind, TokenPair, issue_token_pair, verify_token};
use crate::config::AppConfig;
use crate::data::{
    ChannelOwner, ChannelProfile, ChannelProfileQuery, Database, EntityId, User, VideoWithOwner,
    WatchHistoryQuery,
};
use crate::error::AppError;
use crate::storage::{MediaKind, MediaStore, MediaUpload, UploadReservation, delete_best_effort};

/// Registration form
#[derive(Debug, Default)]
pub struct RegisterInput {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub user_name: Option<String>,
    pub password: Option<String>,
    pub avatar: Option<MediaUpload>,
    pub cover_image: Option<MediaUpload>,
}

/// Login by handle or email
#[derive(Debug, Default)]
pub struct LoginInput {
    pub email: Option<String>,
    pub user_name: Option<String>,
    pub password: Option<String>,
}

fn normalize_email(raw: Option<String>) -> Result<String, AppError> {
    let email = required_text(raw, "email")?.to_ascii_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(AppError::validation("email is invalid")),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// User service
pub struct UserService {
    db: Arc<Database>,
    media: Arc<dyn MediaStore>,
    config: Arc<AppConfig>,
}

impl UserService {
    /// Create new user service
    pub fn new(db: Arc<Database>, media: Arc<dyn MediaStore>, config: Arc<AppConfig>) -> Self {
        Self { db, media, config }
    }

    /// Register a new account
    ///
    /// Uploads the avatar (and optional cover image) before inserting the
    /// user; uploaded objects are released if anything after them fails.
    ///
    /// # Errors
    /// - `Validation` for missing fields or a missing avatar
    /// - `Conflict` if the handle or email is taken
    pub async fn register(&self, input: RegisterInput) -> Result<User, AppError> {
        let full_name = required_text(input.full_name, "fullName")?;
        let email = normalize_email(input.email)?;
        let user_name = required_text(input.user_name, "userName")?.to_ascii_lowercase();
        let password = required_text(input.password, "password")?;
        let avatar = input
            .avatar
            .ok_or_else(|| AppError::validation("Avatar file is required"))?;

        // Fast-path check before uploading anything
        if self
            .db
            .find_user_by_login(Some(&user_name), Some(&email))
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "User with email or username already exists".to_string(),
            ));
        }

        let avatar = UploadReservation::upload(self.media.clone(), MediaKind::Avatar, avatar).await?;
        let cover_image = match input.cover_image {
            Some(upload) => {
                match UploadReservation::upload(self.media.clone(), MediaKind::CoverImage, upload)
                    .await
                {
                    Ok(reservation) => Some(reservation),
                    Err(e) => {
                        avatar.release().await;
                        return Err(e);
                    }
                }
            }
            None => None,
        };

        let now = Utc::now();
        let user = match hash_password(password).await {
            Ok(password_hash) => User {
                id: EntityId::new().0,
                user_name,
                email,
                full_name,
                password_hash,
                avatar_url: avatar.media().url.clone(),
                avatar_key: avatar.media().key.clone(),
                cover_image_url: cover_image.as_ref().map(|c| c.media().url.clone()),
                cover_image_key: cover_image.as_ref().map(|c| c.media().key.clone()),
                refresh_token: None,
                created_at: now,
                updated_at: now,
            },
            Err(e) => {
                release_all(avatar, cover_image).await;
                return Err(e);
            }
        };

        if let Err(e) = self.db.insert_user(&user).await {
            release_all(avatar, cover_image).await;
            return Err(e);
        }

        avatar.commit();
        if let Some(cover_image) = cover_image {
            cover_image.commit();
        }

        tracing::info!(user_id = %user.id, user_name = %user.user_name, "User registered");
        Ok(user)
    }

    /// Verify credentials and issue a fresh token pair
    ///
    /// The new refresh token replaces any previously stored one.
    pub async fn login(&self, input: LoginInput) -> Result<(User, TokenPair), AppError> {
        let email = non_blank(input.email);
        let user_name = non_blank(input.user_name);
        if email.is_none() && user_name.is_none() {
            return Err(AppError::validation("username or email is required"));
        }
        let password = required_text(input.password, "password")?;

        let invalid = || AppError::unauthorized("Invalid user credentials");
        let user = self
            .db
            .find_user_by_login(user_name.as_deref(), email.as_deref())
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(password, user.password_hash.clone()).await? {
            return Err(invalid());
        }

        let tokens = issue_token_pair(&user.id, &self.config.auth)?;
        self.db
            .set_refresh_token(&user.id, Some(&tokens.refresh_token))
            .await?;

        tracing::info!(user_id = %user.id, "User logged in");
        Ok((user, tokens))
    }

    /// Invalidate the stored refresh token
    pub async fn logout(&self, user_id: &str) -> Result<(), AppError> {
        self.db.set_refresh_token(user_id, None).await?;
        tracing::info!(user_id = %user_id, "User logged out");
        Ok(())
    }

    /// Exchange a refresh token for a new pair
    ///
    /// The presented token must be the one currently stored; rotation is a
    /// compare-and-set, so a refresh token can be used once.
    pub async fn refresh_tokens(&self, incoming: &str) -> Result<TokenPair, AppError> {
        let claims = verify_token(incoming, TokenKind::Refresh, &self.config.auth)?;

        let user = self
            .db
            .get_user(&claims.sub)
            .await?
            .ok_or_else(|| AppError::unauthorized("Invalid refresh token"))?;

        let tokens = issue_token_pair(&user.id, &self.config.auth)?;
        let rotated = self
            .db
            .rotate_refresh_token(&user.id, incoming.trim(), &tokens.refresh_token)
            .await?;
        if !rotated {
            return Err(AppError::unauthorized("Refresh token is expired or used"));
        }

        Ok(tokens)
    }

    pub async fn change_password(
        &self,
        user: &User,
        old_password: Option<String>,
        new_password: Option<String>,
    ) -> Result<(), AppError> {
        let old_password = required_text(old_password, "oldPassword")?;
        let new_password = required_text(new_password, "newPassword")?;

        if !verify_password(old_password, user.password_hash.clone()).await? {
            return Err(AppError::validation("Invalid old password"));
        }

        let password_hash = hash_password(new_password).await?;
        self.db.update_password_hash(&user.id, &password_hash).await?;

        tracing::info!(user_id = %user.id, "Password changed");
        Ok(())
    }

    pub async fn update_account(
        &self,
        user_id: &str,
        full_name: Option<String>,
        email: Option<String>,
    ) -> Result<User, AppError> {
        let full_name = required_text(full_name, "fullName")?;
        let email = normalize_email(email)?;

        self.db
            .update_account_details(user_id, &full_name, &email)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))
    }

    /// Replace the avatar; the old object is deleted after the update
    pub async fn change_avatar(
        &self,
        user: &User,
        upload: Option<MediaUpload>,
    ) -> Result<User, AppError> {
        let upload = upload.ok_or_else(|| AppError::validation("Avatar file is missing"))?;
        let reservation =
            UploadReservation::upload(self.media.clone(), MediaKind::Avatar, upload).await?;

        let updated = match self
            .db
            .update_avatar(&user.id, &reservation.media().url, &reservation.media().key)
            .await
        {
            Ok(Some(updated)) => updated,
            Ok(None) => {
                reservation.release().await;
                return Err(AppError::not_found("User not found"));
            }
            Err(e) => {
                reservation.release().await;
                return Err(e);
            }
        };
        reservation.commit();

        delete_best_effort(self.media.as_ref(), &user.avatar_key).await;
        Ok(updated)
    }

    /// Replace (or set) the cover image
    pub async fn change_cover_image(
        &self,
        user: &User,
        upload: Option<MediaUpload>,
    ) -> Result<User, AppError> {
        let upload = upload.ok_or_else(|| AppError::validation("Cover image file is missing"))?;
        let reservation =
            UploadReservation::upload(self.media.clone(), MediaKind::CoverImage, upload).await?;

        let updated = match self
            .db
            .update_cover_image(&user.id, &reservation.media().url, &reservation.media().key)
            .await
        {
            Ok(Some(updated)) => updated,
            Ok(None) => {
                reservation.release().await;
                return Err(AppError::not_found("User not found"));
            }
            Err(e) => {
                reservation.release().await;
                return Err(e);
            }
        };
        reservation.commit();

        if let Some(old_key) = &user.cover_image_key {
            delete_best_effort(self.media.as_ref(), old_key).await;
        }
        Ok(updated)
    }

    pub async fn channel_profile(
        &self,
        user_name: &str,
        viewer_id: Option<&str>,
    ) -> Result<ChannelProfile, AppError> {
        let user_name = user_name.trim();
        if user_name.is_empty() {
            return Err(AppError::validation("username is missing"));
        }

        ChannelProfileQuery {
            user_name: user_name.to_string(),
            viewer_id: viewer_id.map(ToOwned::to_owned),
        }
        .execute(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("channel does not exist"))
    }

    pub async fn watch_history(
        &self,
        user_id: &str,
    ) -> Result<Vec<VideoWithOwner<ChannelOwner>>, AppError> {
        WatchHistoryQuery {
            user_id: user_id.to_string(),
        }
        .execute(&self.db)
        .await
    }
}

async fn release_all(avatar: UploadReservation, cover_image: Option<UploadReservation>) {
    avatar.release().await;
    if let Some(cover_image) = cover_image {
        cover_image.release().await;
    }
}
