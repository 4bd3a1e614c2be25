//! Authentication
//!
//! Handles:
//! - Password hashing
//! - Access/refresh token issue and verification
//! - Request extractors for the authenticated caller

mod middleware;
pub mod password;
pub mod tokens;

pub use middleware::{ACCESS_TOKEN_COOKIE, CurrentUser, MaybeUser, REFRESH_TOKEN_COOKIE};
pub use tokens::{Claims, TokenKind, TokenPair, issue_token_pair, verify_token};
