/// Tag operations
///
/// Any active user may read tags. Creating and deleting them requires the
/// staff flag; tags cannot be edited.
use serde::Deserialize;
use sqlx::PgPool;
use tracing::{info, warn};
use validator::Validate;

use super::{check_text, BLANK};
use crate::auth::authorization::{authorize, require_active, require_admin, ADMIN, MEMBER};
use crate::auth::middleware::AuthContext;
use crate::db::query::{OrderBy, Page, PageRequest};
use crate::error::{FieldErrors, ServiceError, ServiceResult};
use crate::models::tag::{is_hex_color, CreateTag, Tag, DEFAULT_ORDERING, ORDERING_FIELDS, UNIQUE_NAME_INDEX};

pub const DUPLICATE_NAME: &str = "Tag with this name already exists (case-insensitive).";
pub const INVALID_COLOR: &str = "Enter a valid hex color in the format #RRGGBB.";

/// Writable tag fields
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct TagInput {
    #[validate(length(max = 15, message = "Ensure this field has no more than 15 characters."))]
    pub name: Option<String>,

    /// `#RRGGBB`; blank or `null` means no color
    pub color: Option<String>,
}

impl TagInput {
    fn check(&self) -> Result<(), FieldErrors> {
        let mut errors: FieldErrors = match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(e) => e.into(),
        };

        check_text(&mut errors, "name", self.name.as_deref(), true);

        if let Some(color) = self.color() {
            if !is_hex_color(color) {
                errors.add("color", INVALID_COLOR);
            }
        }

        errors.into_result()
    }

    fn color(&self) -> Option<&str> {
        self.color.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }
}

pub struct TagService {
    pool: PgPool,
}

impl TagService {
    pub fn new(pool: &PgPool) -> Self {
        Self { pool: pool.clone() }
    }

    pub async fn list(
        &self,
        auth: &AuthContext,
        search: Option<&str>,
        ordering: Option<&str>,
        page: PageRequest,
    ) -> ServiceResult<Page<Tag>> {
        authorize(auth, MEMBER)?;
        let order = OrderBy::parse(ordering, ORDERING_FIELDS, DEFAULT_ORDERING)?;

        let mut conn = self.pool.acquire().await?;
        Tag::list(&mut conn, search, &order, page).await
    }

    pub async fn get(&self, auth: &AuthContext, id: i64) -> ServiceResult<Tag> {
        authorize(auth, MEMBER)?;

        let mut conn = self.pool.acquire().await?;
        Tag::find_visible(&mut conn, id)
            .await?
            .ok_or(ServiceError::NotFound("Tag"))
    }

    /// Up to ten suggestions; see [`Tag::autocomplete`]
    pub async fn autocomplete(&self, auth: &AuthContext, query: Option<&str>) -> ServiceResult<Vec<Tag>> {
        authorize(auth, MEMBER)?;

        let mut conn = self.pool.acquire().await?;
        Ok(Tag::autocomplete(&mut conn, query.unwrap_or_default()).await?)
    }

    /// Creates a tag whose name is unique ignoring case
    ///
    /// The pre-check reports the common case; a concurrent insert that slips
    /// past it trips the unique index and is reported the same way.
    pub async fn create(&self, auth: &AuthContext, input: TagInput) -> ServiceResult<Tag> {
        authorize(auth, ADMIN)?;
        input.check()?;

        let name = input.name.as_deref().map(str::trim).unwrap_or_default().to_string();
        if name.is_empty() {
            return Err(FieldErrors::single("name", BLANK).into());
        }

        let mut tx = self.pool.begin().await?;

        if Tag::name_taken(&mut tx, &name).await? {
            return Err(FieldErrors::single("name", DUPLICATE_NAME).into());
        }

        let data = CreateTag {
            name,
            color: input.color().map(str::to_string),
            created_by: auth.user_id,
        };

        let tag = match Tag::create(&mut tx, data).await {
            Ok(tag) => tag,
            Err(sqlx::Error::Database(db_err)) if db_err.constraint() == Some(UNIQUE_NAME_INDEX) => {
                warn!(user_id = auth.user_id, "Concurrent tag create lost the unique-name race");
                return Err(FieldErrors::single("name", DUPLICATE_NAME).into());
            }
            Err(e) => return Err(e.into()),
        };

        tx.commit().await?;

        info!(tag_id = tag.id, name = %tag.name, user_id = auth.user_id, "Tag created");
        Ok(tag)
    }

    /// Permanently deletes a tag and unlinks it from every task
    pub async fn delete(&self, auth: &AuthContext, id: i64) -> ServiceResult<()> {
        require_active(auth)?;

        let mut tx = self.pool.begin().await?;

        Tag::find_visible(&mut tx, id)
            .await?
            .ok_or(ServiceError::NotFound("Tag"))?;

        require_admin(auth)?;

        Tag::delete(&mut tx, id).await?;
        tx.commit().await?;

        info!(tag_id = id, user_id = auth.user_id, "Tag deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: Option<&str>, color: Option<&str>) -> TagInput {
        TagInput {
            name: name.map(str::to_string),
            color: color.map(str::to_string),
        }
    }

    #[test]
    fn test_valid_input() {
        assert!(input(Some("urgent"), Some("#FF0000")).check().is_ok());
        assert!(input(Some("urgent"), None).check().is_ok());
        assert!(input(Some("urgent"), Some("")).check().is_ok());
    }

    #[test]
    fn test_name_rules() {
        let errors = input(None, None).check().unwrap_err();
        assert!(errors.contains("name"));

        let errors = input(Some("  "), None).check().unwrap_err();
        assert_eq!(errors.get("name").unwrap()[0], BLANK);

        let errors = input(Some("sixteen-chars-xx"), None).check().unwrap_err();
        assert!(errors.contains("name"));

        assert!(input(Some("fifteen-chars-x"), None).check().is_ok());
    }

    #[test]
    fn test_color_rules() {
        let errors = input(Some("urgent"), Some("red")).check().unwrap_err();
        assert_eq!(errors.get("color").unwrap()[0], INVALID_COLOR);

        let errors = input(Some("urgent"), Some("#FFF")).check().unwrap_err();
        assert!(errors.contains("color"));
    }

    #[test]
    fn test_all_problems_reported_together() {
        let errors = input(Some(""), Some("nope")).check().unwrap_err();
        assert!(errors.contains("name"));
        assert!(errors.contains("color"));
    }
}
