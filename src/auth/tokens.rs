//! Access and refresh tokens
//!
//! Uses HMAC-signed tokens: base64(claims).base64(hmac_sha256(claims)).
//! Access and refresh tokens are signed with different secrets and carry
//! their kind in the claims, so one can never stand in for the other.

use base64::{Engine as _, engine::general_purpose};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::config::AuthConfig;
use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    fn secret(self, config: &AuthConfig) -> &str {
        match self {
            Self::Access => &config.access_token_secret,
            Self::Refresh => &config.refresh_token_secret,
        }
    }

    fn ttl(self, config: &AuthConfig) -> i64 {
        match self {
            Self::Access => config.access_token_ttl,
            Self::Refresh => config.refresh_token_ttl,
        }
    }

    fn rejection(self) -> AppError {
        match self {
            Self::Access => AppError::unauthorized("Invalid Access Token"),
            Self::Refresh => AppError::unauthorized("Invalid refresh token"),
        }
    }
}

/// Signed token payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    pub kind: TokenKind,
    /// Unique per issued token
    pub jti: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expires at (unix seconds)
    pub exp: i64,
}

/// A freshly issued access/refresh pair
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Issue a single token of `kind` for `user_id`
pub fn issue_token(user_id: &str, kind: TokenKind, config: &AuthConfig) -> Result<String, AppError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        kind,
        jti: ulid::Ulid::new().to_string(),
        iat: now,
        exp: now + kind.ttl(config),
    };

    sign(&claims, kind.secret(config))
}

/// Issue an access token and a refresh token for `user_id`
pub fn issue_token_pair(user_id: &str, config: &AuthConfig) -> Result<TokenPair, AppError> {
    Ok(TokenPair {
        access_token: issue_token(user_id, TokenKind::Access, config)?,
        refresh_token: issue_token(user_id, TokenKind::Refresh, config)?,
    })
}

/// Verify a token of the expected kind and return its claims
///
/// # Errors
/// `Unauthorized` if the token is malformed, forged, of the wrong kind
/// or expired
pub fn verify_token(token: &str, kind: TokenKind, config: &AuthConfig) -> Result<Claims, AppError> {
    let claims = verify(token, kind.secret(config)).ok_or_else(|| kind.rejection())?;

    if claims.kind != kind || claims.exp <= Utc::now().timestamp() {
        return Err(kind.rejection());
    }

    Ok(claims)
}

fn sign(claims: &Claims, secret: &str) -> Result<String, AppError> {
    // 1. Serialize claims to JSON and base64 encode
    let payload = serde_json::to_vec(claims).map_err(|e| AppError::Internal(e.into()))?;
    let payload_b64 = general_purpose::URL_SAFE_NO_PAD.encode(payload);

    // 2. Create HMAC-SHA256 signature
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid token secret: {}", e)))?;
    mac.update(payload_b64.as_bytes());
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    // 3. Return "{payload}.{signature}"
    Ok(format!("{}.{}", payload_b64, signature_b64))
}

fn verify(token: &str, secret: &str) -> Option<Claims> {
    // 1. Split token into payload and signature
    let (payload_b64, signature_b64) = token.trim().split_once('.')?;

    // 2. Verify HMAC signature (constant time)
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(payload_b64.as_bytes());
    let signature = general_purpose::URL_SAFE_NO_PAD.decode(signature_b64).ok()?;
    mac.verify_slice(&signature).ok()?;

    // 3. Decode and deserialize payload
    let payload = general_purpose::URL_SAFE_NO_PAD.decode(payload_b64).ok()?;
    serde_json::from_slice(&payload).ok()
}
