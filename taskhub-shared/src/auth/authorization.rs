/// Capability checks
///
/// Every check is a pure predicate over the principal (and, for ownership,
/// the target's `created_by`). Endpoints compose them as an ordered list
/// that short-circuits on the first failure:
///
/// | Resource action               | Checks                                  |
/// |-------------------------------|-----------------------------------------|
/// | task / comment read           | [`Check::Active`]                       |
/// | task / comment write          | [`Check::Active`], then [`require_creator`] on the loaded object |
/// | tag read                      | [`Check::Active`]                       |
/// | tag create / delete           | [`Check::Active`], [`Check::Admin`]     |
///
/// Authentication itself (401) happens before any of these run.
///
/// # Example
///
/// ```
/// use taskhub_shared::auth::authorization::{authorize, require_creator, MEMBER};
/// use taskhub_shared::auth::middleware::{AuthContext, AuthMethod};
///
/// let auth = AuthContext {
///     user_id: 1,
///     email: "a@example.com".to_string(),
///     is_active: true,
///     is_staff: false,
///     is_superuser: false,
///     method: AuthMethod::Header,
/// };
///
/// assert!(authorize(&auth, MEMBER).is_ok());
/// assert!(require_creator(&auth, Some(2)).is_err());
/// ```
use super::middleware::AuthContext;

/// Error type for capability checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// Principal is deactivated
    #[error("User account is inactive")]
    Inactive,

    /// Action requires the staff flag
    #[error("Admin privileges are required for this action")]
    NotAdmin,

    /// Only the creator may modify the object
    #[error("You do not have permission to modify this object")]
    NotCreator,
}

/// A principal-only check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    /// `is_active` must be set
    Active,

    /// `is_staff` must be set
    Admin,
}

impl Check {
    pub fn evaluate(self, auth: &AuthContext) -> Result<(), AuthzError> {
        match self {
            Check::Active => require_active(auth),
            Check::Admin => require_admin(auth),
        }
    }
}

/// Any active user
pub const MEMBER: &[Check] = &[Check::Active];

/// Active staff users
pub const ADMIN: &[Check] = &[Check::Active, Check::Admin];

/// Evaluates `checks` in order, stopping at the first failure
pub fn authorize(auth: &AuthContext, checks: &[Check]) -> Result<(), AuthzError> {
    checks.iter().try_for_each(|check| check.evaluate(auth))
}

pub fn require_active(auth: &AuthContext) -> Result<(), AuthzError> {
    if auth.is_active {
        Ok(())
    } else {
        Err(AuthzError::Inactive)
    }
}

pub fn require_admin(auth: &AuthContext) -> Result<(), AuthzError> {
    if auth.is_staff {
        Ok(())
    } else {
        Err(AuthzError::NotAdmin)
    }
}

/// Passes only when the principal created the object
///
/// Objects whose creator account was deleted (`created_by` is NULL) can no
/// longer be modified by anyone.
pub fn require_creator(auth: &AuthContext, created_by: Option<i64>) -> Result<(), AuthzError> {
    if created_by == Some(auth.user_id) {
        Ok(())
    } else {
        Err(AuthzError::NotCreator)
    }
}
