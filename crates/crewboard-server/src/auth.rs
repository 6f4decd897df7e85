//! Bearer-token authentication.
//!
//! Passwords are stored as Argon2id PHC strings with a random 16-byte salt.
//! Tokens are HS256 JWTs carrying the user id and email.

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use crewboard_core::User;
use crewboard_settings::AuthSettings;
use crewboard_store::{ConnectionPool, UserRepository};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::{ApiError, ApiResult};
use crate::server::AppState;

const SALT_LEN: usize = 16;
const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// JWT payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID.
    pub sub: String,
    /// User email.
    pub email: String,
    /// Expiry (seconds since the epoch).
    pub exp: u64,
}

/// Issues and verifies tokens; registers and logs in users.
pub struct AuthService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    token_ttl_secs: u64,
    min_password_length: usize,
}

impl AuthService {
    /// Build from settings. An empty secret gets a random per-process key,
    /// so tokens do not survive a restart.
    pub fn new(settings: &AuthSettings) -> Self {
        let secret: Vec<u8> = if settings.jwt_secret.is_empty() {
            warn!("no JWT secret configured; using a random key for this process");
            rand::random::<[u8; 32]>().to_vec()
        } else {
            settings.jwt_secret.as_bytes().to_vec()
        };
        Self {
            encoding: EncodingKey::from_secret(&secret),
            decoding: DecodingKey::from_secret(&secret),
            token_ttl_secs: settings.token_ttl_secs,
            min_password_length: settings.min_password_length,
        }
    }

    /// Sign a token for a user.
    pub fn issue_token(&self, user: &User) -> ApiResult<String> {
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            exp: jsonwebtoken::get_current_timestamp() + self.token_ttl_secs,
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))
    }

    /// Check signature and expiry.
    pub fn verify_token(&self, token: &str) -> ApiResult<Claims> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "token rejected");
                ApiError::Unauthorized("Invalid or expired token".into())
            })
    }

    /// Create an account. Blocking: call from a worker thread.
    pub fn register(&self, pool: &ConnectionPool, name: &str, email: &str, password: &str) -> ApiResult<User> {
        let name = name.trim();
        let email = email.trim();
        if name.is_empty() {
            return Err(ApiError::Validation("name is required".into()));
        }
        if !email.contains('@') {
            return Err(ApiError::Validation("a valid email is required".into()));
        }
        if password.chars().count() < self.min_password_length {
            return Err(ApiError::Validation(format!(
                "password must be at least {} characters",
                self.min_password_length
            )));
        }

        let password_hash = hash_password(password)?;
        let conn = pool.get().map_err(|e| ApiError::Internal(e.to_string()))?;
        UserRepository::create(&conn, name, email, &password_hash).map_err(|e| {
            if e.is_unique_violation() {
                ApiError::Conflict("Email is already registered".into())
            } else {
                ApiError::from(e)
            }
        })
    }

    /// Check credentials. Unknown email and wrong password fail the same way.
    pub fn login(&self, pool: &ConnectionPool, email: &str, password: &str) -> ApiResult<User> {
        let conn = pool.get().map_err(|e| ApiError::Internal(e.to_string()))?;
        match UserRepository::find_by_email(&conn, email.trim())? {
            Some(stored) if verify_password(password, &stored.password_hash) => Ok(stored.user),
            _ => Err(ApiError::Unauthorized(INVALID_CREDENTIALS.into())),
        }
    }
}

/// Argon2id hash of a password as a PHC string.
pub fn hash_password(password: &str) -> ApiResult<String> {
    let salt_bytes: [u8; SALT_LEN] = rand::random();
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| ApiError::Internal(format!("salt encoding failed: {e}")))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}

/// Check a password against a stored PHC string. Unparseable hashes never match.
pub fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}

/// Middleware: reject requests without a valid bearer token and make the
/// [`Claims`] available to handlers as a request extension.
pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> ApiResult<Response> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".into()))?;
    let claims = state.auth.verify_token(token.trim())?;
    let _ = req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
