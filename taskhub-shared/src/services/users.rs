/// Account operations
///
/// Regular users only ever see their own account; superusers see everyone.
/// Other accounts are reported as missing rather than forbidden so their
/// existence is not confirmed.
use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;
use validator::Validate;

use super::{check_text, WriteMode};
use crate::auth::authorization::{authorize, MEMBER};
use crate::auth::middleware::AuthContext;
use crate::db::query::{Page, PageRequest};
use crate::error::{FieldErrors, ServiceError, ServiceResult};
use crate::models::user::User;

/// Writable account fields
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UserInput {
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub name: Option<String>,
}

pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub fn new(pool: &PgPool) -> Self {
        Self { pool: pool.clone() }
    }

    pub async fn list(&self, auth: &AuthContext, page: PageRequest) -> ServiceResult<Page<User>> {
        authorize(auth, MEMBER)?;
        let only = (!auth.is_superuser).then_some(auth.user_id);

        let mut conn = self.pool.acquire().await?;
        User::list(&mut conn, only, page).await
    }

    pub async fn me(&self, auth: &AuthContext) -> ServiceResult<User> {
        self.get(auth, auth.user_id).await
    }

    pub async fn get(&self, auth: &AuthContext, id: i64) -> ServiceResult<User> {
        authorize(auth, MEMBER)?;
        Self::ensure_visible(auth, id)?;

        let mut conn = self.pool.acquire().await?;
        User::find_by_id(&mut conn, id)
            .await?
            .ok_or(ServiceError::NotFound("User"))
    }

    /// Changes the display name; the name may be blank
    pub async fn update(
        &self,
        auth: &AuthContext,
        id: i64,
        input: UserInput,
        mode: WriteMode,
    ) -> ServiceResult<User> {
        authorize(auth, MEMBER)?;
        Self::ensure_visible(auth, id)?;

        let mut tx = self.pool.begin().await?;
        let user = User::find_by_id(&mut tx, id)
            .await?
            .ok_or(ServiceError::NotFound("User"))?;

        let mut errors: FieldErrors = match input.validate() {
            Ok(()) => FieldErrors::new(),
            Err(e) => e.into(),
        };
        if input.name.is_none() {
            check_text(&mut errors, "name", None, !mode.is_partial());
        }
        errors.into_result()?;

        let user = match input.name {
            Some(name) => User::update_name(&mut tx, id, name.trim())
                .await?
                .ok_or(ServiceError::NotFound("User"))?,
            None => user,
        };
        tx.commit().await?;

        info!(target_user = id, user_id = auth.user_id, "User updated");
        Ok(user)
    }

    fn ensure_visible(auth: &AuthContext, id: i64) -> ServiceResult<()> {
        if auth.is_superuser || auth.user_id == id {
            Ok(())
        } else {
            Err(ServiceError::NotFound("User"))
        }
    }
}
