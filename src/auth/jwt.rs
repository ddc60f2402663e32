use crate::types::{AppError, Claims, Result, Role, TokenKind};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};

/// Why a presented token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Token expired")]
    Expired,
    #[error("Invalid token")]
    Invalid,
}

/// Authentication service for JWT token management and password hashing.
///
/// Passwords are hashed with Argon2id; tokens are HS256 JWTs. Session
/// tokens carry the staff role, reset tokens carry only the email.
pub struct AuthService {
    jwt_secret: String,
    access_expiry: i64,
    reset_expiry: i64,
}

impl AuthService {
    /// Creates a new AuthService.
    ///
    /// # Arguments
    /// * `jwt_secret` - Secret key for signing JWTs (should be at least 32 chars)
    /// * `access_expiry` - Session token validity in seconds
    /// * `reset_expiry` - Password reset token validity in seconds
    pub fn new(jwt_secret: String, access_expiry: i64, reset_expiry: i64) -> Self {
        Self {
            jwt_secret,
            access_expiry,
            reset_expiry,
        }
    }

    /// Session token lifetime in seconds.
    pub fn access_expiry(&self) -> i64 {
        self.access_expiry
    }

    /// Reset link lifetime in seconds.
    pub fn reset_expiry(&self) -> i64 {
        self.reset_expiry
    }

    /// Hashes a password using Argon2id.
    ///
    /// Returns a PHC-formatted hash string.
    pub fn hash_password(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
    }

    /// Verifies a password against an Argon2 hash.
    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Issues the session token stored in the `token` cookie.
    pub fn issue_access_token(&self, email: &str, role: Role) -> Result<String> {
        self.sign(email, Some(role), TokenKind::Access, self.access_expiry)
    }

    /// Issues a short-lived token embedded in password reset links.
    pub fn issue_reset_token(&self, email: &str) -> Result<String> {
        self.sign(email, None, TokenKind::Reset, self.reset_expiry)
    }

    fn sign(&self, email: &str, role: Option<Role>, kind: TokenKind, ttl: i64) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: email.to_string(),
            role,
            kind,
            exp: (now + Duration::seconds(ttl)).timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))
    }

    /// Decodes a token of any kind.
    pub fn decode_token(&self, token: &str) -> std::result::Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid,
        })
    }

    /// Verifies a session token. Reset tokens and role-less tokens are rejected.
    pub fn verify_access_token(&self, token: &str) -> Result<Claims> {
        let claims = self
            .decode_token(token)
            .map_err(|e| AppError::Auth(e.to_string()))?;

        if claims.kind != TokenKind::Access || claims.role.is_none() {
            return Err(AppError::Auth(TokenError::Invalid.to_string()));
        }

        Ok(claims)
    }

    /// Hashes a token using SHA256 for storage.
    pub fn hash_token(&self, token: &str) -> String {
        use sha2::{Digest, Sha256};
        hex::encode(Sha256::digest(token.as_bytes()))
    }
}
