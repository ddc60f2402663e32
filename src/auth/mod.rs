//! Staff Authentication
//!
//! Password hashing, JWT issuance/validation, the session cookie and the
//! Axum middleware guarding protected routes.
//!
//! # Module Structure
//!
//! - [`auth::jwt`](crate::auth::jwt) - Argon2id hashing and HS256 tokens
//! - [`auth::cookie`](crate::auth::cookie) - `token` cookie encoding and extraction
//! - [`auth::middleware`](crate::auth::middleware) - middleware, extractors and role checks
//!
//! # Tokens
//!
//! Two kinds of token are signed with the same secret:
//!
//! - **access**: `sub` (email) + `role`, stored in the `token` cookie
//! - **reset**: `sub` only, embedded in password reset links
//!
//! The middleware accepts only access tokens, so a leaked reset link
//! cannot be replayed as a session.
//!
//! # Extracting Claims in Handlers
//!
//! ```ignore
//! async fn protected_handler(user: AuthUser) -> Result<Json<UserInfo>> {
//!     user.require_role(&[Role::Admin])?;
//!     // ...
//! }
//! ```
//!
//! # Configuration
//!
//! Configure via `admissions.toml`:
//! ```toml
//! [auth]
//! jwt_secret_env = "JWT_SECRET"   # env var holding the signing secret
//! access_token_expiry = 3600      # session lifetime (seconds)
//! reset_token_expiry = 900        # reset link lifetime (seconds)
//! ```

/// Session cookie helpers.
pub mod cookie;
/// JWT token generation, validation, and password hashing services.
pub mod jwt;
/// Authentication middleware and extractors for protected routes.
pub mod middleware;
