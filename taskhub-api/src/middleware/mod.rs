/// Middleware for the API server
///
/// - `security`: Hardening headers on every response
/// - `auth`: Resolves the caller into an `AuthContext` for protected routes

pub mod auth;
pub mod security;
