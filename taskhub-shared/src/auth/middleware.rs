/// Request authentication
///
/// Resolves the caller of a request into an [`AuthContext`]. Credentials are
/// an access token presented either in the `Authorization` header (`Bearer`
/// or `JWT` scheme) or in the session cookie. The header wins when both are
/// present.
///
/// The account is reloaded from the store on every request so deactivating a
/// user or revoking staff rights takes effect immediately, without waiting
/// for outstanding tokens to expire.
///
/// # Example
///
/// ```no_run
/// use axum::http::HeaderMap;
/// use taskhub_shared::auth::middleware::authenticate;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool, headers: HeaderMap) -> Result<(), Box<dyn std::error::Error>> {
/// let auth = authenticate(&pool, &headers, "jwt-secret", "tasks_cookie").await?;
/// println!("request made by user {}", auth.user_id);
/// # Ok(())
/// # }
/// ```
use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::jwt::{validate_access_token, JwtError};
use crate::models::user::User;

/// Default session cookie carrying the access token
pub const DEFAULT_COOKIE_NAME: &str = "tasks_cookie";

/// Where the credentials were found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// `Authorization` header
    Header,

    /// Session cookie
    Cookie,
}

/// The authenticated principal, inserted into request extensions
///
/// Handlers extract it with `Extension<AuthContext>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: i64,
    pub email: String,
    pub is_active: bool,

    /// Admin flag, required for tag management
    pub is_staff: bool,

    /// Sees every account on the users endpoints
    pub is_superuser: bool,

    pub method: AuthMethod,
}

impl AuthContext {
    pub fn from_user(user: &User, method: AuthMethod) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            is_active: user.is_active,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            method,
        }
    }
}

/// Error type for request authentication
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No credentials at all
    #[error("Authentication credentials were not provided.")]
    MissingCredentials,

    /// `Authorization` header present but unusable
    #[error("Invalid authorization header: {0}")]
    InvalidFormat(String),

    /// Token rejected
    #[error("{0}")]
    InvalidToken(String),

    /// Token names an account that no longer exists
    #[error("User not found")]
    UnknownUser,

    /// Store failure while loading the account
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
            JwtError::InvalidIssuer => AuthError::InvalidToken("Invalid token issuer".to_string()),
            other => AuthError::InvalidToken(format!("Invalid token: {}", other)),
        }
    }
}

/// Finds the raw token and where it came from
pub fn extract_credentials(
    headers: &HeaderMap,
    cookie_name: &str,
) -> Result<(String, AuthMethod), AuthError> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        let value = value
            .to_str()
            .map_err(|_| AuthError::InvalidFormat("not valid ASCII".to_string()))?;

        let (scheme, token) = value
            .trim()
            .split_once(' ')
            .ok_or_else(|| AuthError::InvalidFormat("expected '<scheme> <token>'".to_string()))?;

        if !scheme.eq_ignore_ascii_case("bearer") && !scheme.eq_ignore_ascii_case("jwt") {
            return Err(AuthError::InvalidFormat(format!(
                "unsupported scheme '{}'",
                scheme
            )));
        }

        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::InvalidFormat("empty token".to_string()));
        }

        return Ok((token.to_string(), AuthMethod::Header));
    }

    cookie_value(headers, cookie_name)
        .map(|token| (token, AuthMethod::Cookie))
        .ok_or(AuthError::MissingCredentials)
}

/// Reads one cookie from the `Cookie` headers
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.trim_matches('"').to_string())
}

/// Authenticates a request from its headers
///
/// # Errors
///
/// - `MissingCredentials` when neither header nor cookie is present
/// - `InvalidFormat` / `InvalidToken` when the credentials are rejected
/// - `UnknownUser` when the token's subject no longer exists
pub async fn authenticate(
    pool: &PgPool,
    headers: &HeaderMap,
    secret: &str,
    cookie_name: &str,
) -> Result<AuthContext, AuthError> {
    let (token, method) = extract_credentials(headers, cookie_name)?;
    let claims = validate_access_token(&token, secret)?;

    let mut conn = pool
        .acquire()
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

    let user = User::find_by_id(&mut conn, claims.sub)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?
        .ok_or(AuthError::UnknownUser)?;

    Ok(AuthContext::from_user(&user, method))
}
