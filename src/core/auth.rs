// passwords and tokens - argon2 hashing plus short-lived HS256 jwts

use crate::Error;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Token lifetime in seconds (1 hour).
const TOKEN_EXPIRY_SECS: u64 = 60 * 60;

/// Claims carried in a login token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// user id
    pub sub: i64,
    pub username: String,
    /// expiration timestamp
    pub exp: u64,
    /// issued at timestamp
    pub iat: u64,
}

/// Signing secret for login tokens.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

/// Static admin credentials. The admin is not a database user: login is a
/// straight credential match and admin endpoints are gated on the key.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub username: String,
    pub password: String,
    pub admin_key: String,
}

impl AdminConfig {
    pub fn is_admin_login(&self, username: &str, password: &str) -> bool {
        username == self.username && password == self.password
    }

    pub fn key_matches(&self, key: &str) -> bool {
        key == self.admin_key
    }
}

pub fn hash_password(password: &str) -> Result<String, Error> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::PasswordHash(e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, Error> {
    let parsed = PasswordHash::new(hash).map_err(|e| Error::PasswordHash(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Issue a login token for the given user.
pub fn issue_token(config: &AuthConfig, user_id: i64, username: &str) -> Result<String, Error> {
    let iat = now_secs();
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: iat + TOKEN_EXPIRY_SECS,
        iat,
    };

    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )?)
}

/// Validate a token and return its claims. Fails on bad signature or expiry.
pub fn verify_token(config: &AuthConfig, token: &str) -> Result<Claims, Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )?;

    Ok(data.claims)
}
