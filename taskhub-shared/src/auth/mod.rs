/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`jwt`]: Access/refresh token generation and validation
/// - [`middleware`]: Credential extraction and principal loading
/// - [`authorization`]: Composable capability checks

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
