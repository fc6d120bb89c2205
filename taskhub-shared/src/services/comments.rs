/// Comment operations
use serde::Deserialize;
use sqlx::{PgConnection, PgPool};
use tracing::info;

use super::{check_text, WriteMode, REQUIRED};
use crate::auth::authorization::{authorize, require_creator, MEMBER};
use crate::auth::middleware::AuthContext;
use crate::db::query::{OrderBy, Page, PageRequest};
use crate::error::{FieldErrors, ServiceError, ServiceResult};
use crate::models::comment::{Comment, DEFAULT_ORDERING, ORDERING_FIELDS};
use crate::models::task::Task;

const DELETED_TASK: &str = "Cannot comment on a deleted task.";

/// Writable comment fields
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentInput {
    /// Task id; the task must exist and not be deleted
    pub task: Option<i64>,
    pub content: Option<String>,
}

impl CommentInput {
    async fn check(&self, conn: &mut PgConnection, mode: WriteMode) -> ServiceResult<()> {
        let mut errors = FieldErrors::new();
        let required = !mode.is_partial();

        match self.task {
            Some(task_id) => match Task::find_by_id(conn, task_id).await? {
                Some(task) if task.is_deleted => errors.add("task", DELETED_TASK),
                Some(_) => {}
                None => errors.add("task", super::does_not_exist(task_id)),
            },
            None if required => errors.add("task", REQUIRED),
            None => {}
        }

        check_text(&mut errors, "content", self.content.as_deref(), required);

        errors.into_result()?;
        Ok(())
    }
}

pub struct CommentService {
    pool: PgPool,
}

impl CommentService {
    pub fn new(pool: &PgPool) -> Self {
        Self { pool: pool.clone() }
    }

    pub async fn list(
        &self,
        auth: &AuthContext,
        task_id: Option<i64>,
        ordering: Option<&str>,
        page: PageRequest,
    ) -> ServiceResult<Page<Comment>> {
        authorize(auth, MEMBER)?;
        let order = OrderBy::parse(ordering, ORDERING_FIELDS, DEFAULT_ORDERING)?;

        let mut conn = self.pool.acquire().await?;
        Comment::list(&mut conn, task_id, &order, page).await
    }

    pub async fn get(&self, auth: &AuthContext, id: i64) -> ServiceResult<Comment> {
        authorize(auth, MEMBER)?;

        let mut conn = self.pool.acquire().await?;
        Comment::find_visible(&mut conn, id)
            .await?
            .ok_or(ServiceError::NotFound("Comment"))
    }

    pub async fn create(&self, auth: &AuthContext, input: CommentInput) -> ServiceResult<Comment> {
        authorize(auth, MEMBER)?;

        let mut tx = self.pool.begin().await?;
        input.check(&mut tx, WriteMode::Full).await?;

        let (task_id, content) = match (input.task, input.content) {
            (Some(task_id), Some(content)) => (task_id, content),
            _ => return Err(FieldErrors::single("task", REQUIRED).into()),
        };

        let comment = Comment::create(&mut tx, task_id, &content, auth.user_id).await?;
        tx.commit().await?;

        info!(comment_id = comment.id, task_id, user_id = auth.user_id, "Comment created");
        Ok(comment)
    }

    pub async fn update(
        &self,
        auth: &AuthContext,
        id: i64,
        input: CommentInput,
        mode: WriteMode,
    ) -> ServiceResult<Comment> {
        let mut tx = self.pool.begin().await?;
        Self::lock_owned(&mut tx, auth, id).await?;

        input.check(&mut tx, mode).await?;

        let comment = Comment::update(&mut tx, id, input.task, input.content.as_deref(), auth.user_id)
            .await?
            .ok_or(ServiceError::NotFound("Comment"))?;
        tx.commit().await?;

        info!(comment_id = id, user_id = auth.user_id, "Comment updated");
        Ok(comment)
    }

    pub async fn delete(&self, auth: &AuthContext, id: i64) -> ServiceResult<()> {
        let mut tx = self.pool.begin().await?;
        Self::lock_owned(&mut tx, auth, id).await?;

        Comment::soft_delete(&mut tx, id, auth.user_id).await?;
        tx.commit().await?;

        info!(comment_id = id, user_id = auth.user_id, "Comment deleted");
        Ok(())
    }

    async fn lock_owned(conn: &mut PgConnection, auth: &AuthContext, id: i64) -> ServiceResult<Comment> {
        authorize(auth, MEMBER)?;

        let comment = Comment::lock_visible(conn, id)
            .await?
            .ok_or(ServiceError::NotFound("Comment"))?;

        require_creator(auth, comment.created_by)?;
        Ok(comment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_input_from_json() {
        let input: CommentInput =
            serde_json::from_str(r#"{"task": 3, "content": "Looks good"}"#).unwrap();
        assert_eq!(input.task, Some(3));
        assert_eq!(input.content.as_deref(), Some("Looks good"));

        let empty: CommentInput = serde_json::from_str("{}").unwrap();
        assert!(empty.task.is_none() && empty.content.is_none());
    }
}
