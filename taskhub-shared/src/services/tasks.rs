/// Task operations
///
/// Reads are open to any active user. Every write, including the assign and
/// status actions, is reserved for the task's creator.
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{PgConnection, PgPool};
use tracing::info;
use validator::Validate;

use super::{check_text, deserialize_some, does_not_exist, WriteMode, REQUIRED};
use crate::auth::authorization::{authorize, require_creator, MEMBER};
use crate::auth::middleware::AuthContext;
use crate::db::query::{OrderBy, Page, PageRequest};
use crate::error::{FieldErrors, ServiceError, ServiceResult};
use crate::models::tag::Tag;
use crate::models::task::{
    NewTask, Task, TaskChanges, TaskFilter, TaskPriority, TaskStatus, DEFAULT_ORDERING,
    ORDERING_FIELDS,
};
use crate::models::user::User;

/// Writable task fields
///
/// `title` is required on create and full update. `tag_ids`, when present,
/// replaces the whole tag set.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct TaskInput {
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub title: Option<String>,

    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,

    #[serde(default, deserialize_with = "deserialize_some")]
    pub due_date: Option<Option<DateTime<Utc>>>,

    /// Any existing user; `null` clears the assignee
    #[serde(default, deserialize_with = "deserialize_some")]
    pub assigned_to_id: Option<Option<i64>>,

    pub tag_ids: Option<Vec<i64>>,
}

impl TaskInput {
    async fn check(&self, conn: &mut PgConnection, mode: WriteMode) -> ServiceResult<()> {
        let mut errors: FieldErrors = match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(e) => e.into(),
        };

        check_text(&mut errors, "title", self.title.as_deref(), !mode.is_partial());

        if let Some(Some(user_id)) = self.assigned_to_id {
            if User::find_by_id(conn, user_id).await?.is_none() {
                errors.add("assigned_to_id", does_not_exist(user_id));
            }
        }

        if let Some(tag_ids) = &self.tag_ids {
            let found = Tag::find_visible_many(conn, tag_ids).await?;
            if let Some(missing) = tag_ids.iter().find(|id| !found.iter().any(|t| t.id == **id)) {
                errors.add("tag_ids", does_not_exist(*missing));
            }
        }

        errors.into_result()?;
        Ok(())
    }

    fn into_changes(self) -> TaskChanges {
        TaskChanges {
            title: self.title,
            description: self.description,
            status: self.status,
            priority: self.priority,
            due_date: self.due_date,
            assigned_to: self.assigned_to_id,
        }
    }
}

/// Body of the assign action
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssignInput {
    /// Must reference an active user
    pub user_id: Option<i64>,
}

pub struct TaskService {
    pool: PgPool,
}

impl TaskService {
    pub fn new(pool: &PgPool) -> Self {
        Self { pool: pool.clone() }
    }

    /// Filtered, searched, ordered page of tasks
    pub async fn list(
        &self,
        auth: &AuthContext,
        filter: &TaskFilter,
        ordering: Option<&str>,
        page: PageRequest,
    ) -> ServiceResult<Page<Task>> {
        authorize(auth, MEMBER)?;
        let order = OrderBy::parse(ordering, ORDERING_FIELDS, DEFAULT_ORDERING)?;

        let mut conn = self.pool.acquire().await?;
        Task::list(&mut conn, filter, &order, page).await
    }

    /// Tasks created by the caller, newest first
    pub async fn my_tasks(&self, auth: &AuthContext, page: PageRequest) -> ServiceResult<Page<Task>> {
        let filter = TaskFilter {
            created_by: Some(auth.user_id),
            ..TaskFilter::default()
        };
        self.list(auth, &filter, None, page).await
    }

    /// Tasks assigned to the caller, newest first
    pub async fn assigned_to_me(&self, auth: &AuthContext, page: PageRequest) -> ServiceResult<Page<Task>> {
        let filter = TaskFilter {
            assigned_to: Some(auth.user_id),
            ..TaskFilter::default()
        };
        self.list(auth, &filter, None, page).await
    }

    pub async fn get(&self, auth: &AuthContext, id: i64) -> ServiceResult<Task> {
        authorize(auth, MEMBER)?;

        let mut conn = self.pool.acquire().await?;
        Task::find_visible(&mut conn, id)
            .await?
            .ok_or(ServiceError::NotFound("Task"))
    }

    pub async fn create(&self, auth: &AuthContext, input: TaskInput) -> ServiceResult<Task> {
        authorize(auth, MEMBER)?;

        let mut tx = self.pool.begin().await?;
        input.check(&mut tx, WriteMode::Full).await?;

        let tag_ids = input.tag_ids.unwrap_or_default();
        let task = Task::create(
            &mut tx,
            NewTask {
                title: input.title.unwrap_or_default(),
                description: input.description.unwrap_or_default(),
                status: input.status.unwrap_or_default(),
                priority: input.priority.unwrap_or_default(),
                due_date: input.due_date.flatten(),
                assigned_to: input.assigned_to_id.flatten(),
                created_by: auth.user_id,
            },
        )
        .await?;

        if !tag_ids.is_empty() {
            Task::set_tags(&mut tx, task.id, &tag_ids).await?;
        }

        tx.commit().await?;

        info!(task_id = task.id, user_id = auth.user_id, "Task created");
        Ok(task)
    }

    pub async fn update(
        &self,
        auth: &AuthContext,
        id: i64,
        input: TaskInput,
        mode: WriteMode,
    ) -> ServiceResult<Task> {
        let mut tx = self.pool.begin().await?;
        Self::lock_owned(&mut tx, auth, id).await?;

        input.check(&mut tx, mode).await?;

        let tag_ids = input.tag_ids.clone();
        let task = Task::update(&mut tx, id, input.into_changes(), auth.user_id)
            .await?
            .ok_or(ServiceError::NotFound("Task"))?;

        if let Some(tag_ids) = tag_ids {
            Task::set_tags(&mut tx, id, &tag_ids).await?;
        }

        tx.commit().await?;

        info!(task_id = id, user_id = auth.user_id, partial = mode.is_partial(), "Task updated");
        Ok(task)
    }

    /// Soft-deletes the task; its comments stay as they are
    pub async fn delete(&self, auth: &AuthContext, id: i64) -> ServiceResult<()> {
        let mut tx = self.pool.begin().await?;
        let mut task = Self::lock_owned(&mut tx, auth, id).await?;

        task.soft_delete(&mut tx, auth.user_id).await?;
        tx.commit().await?;

        info!(task_id = id, user_id = auth.user_id, "Task deleted");
        Ok(())
    }

    /// Assigns the task to an active user
    pub async fn assign(&self, auth: &AuthContext, id: i64, input: AssignInput) -> ServiceResult<Task> {
        let mut tx = self.pool.begin().await?;
        let mut task = Self::lock_owned(&mut tx, auth, id).await?;

        let user_id = match input.user_id {
            Some(user_id) => user_id,
            None => return Err(FieldErrors::single("user_id", REQUIRED).into()),
        };

        match User::find_by_id(&mut tx, user_id).await? {
            Some(user) if user.is_active => {}
            _ => return Err(FieldErrors::single("user_id", does_not_exist(user_id)).into()),
        }

        task.assign_to(&mut tx, Some(user_id)).await?;
        task.record_updater(&mut tx, auth.user_id).await?;
        tx.commit().await?;

        info!(task_id = id, user_id = auth.user_id, assignee = user_id, "Task assigned");
        Ok(task)
    }

    pub async fn complete(&self, auth: &AuthContext, id: i64) -> ServiceResult<Task> {
        self.transition(auth, id, TaskStatus::Completed).await
    }

    pub async fn mark_in_progress(&self, auth: &AuthContext, id: i64) -> ServiceResult<Task> {
        self.transition(auth, id, TaskStatus::InProgress).await
    }

    pub async fn mark_todo(&self, auth: &AuthContext, id: i64) -> ServiceResult<Task> {
        self.transition(auth, id, TaskStatus::Todo).await
    }

    async fn transition(&self, auth: &AuthContext, id: i64, status: TaskStatus) -> ServiceResult<Task> {
        let mut tx = self.pool.begin().await?;
        let mut task = Self::lock_owned(&mut tx, auth, id).await?;

        match status {
            TaskStatus::Todo => task.mark_todo(&mut tx).await?,
            TaskStatus::InProgress => task.mark_in_progress(&mut tx).await?,
            TaskStatus::Completed => task.mark_completed(&mut tx).await?,
        }
        task.record_updater(&mut tx, auth.user_id).await?;
        tx.commit().await?;

        info!(task_id = id, user_id = auth.user_id, status = %status, "Task status changed");
        Ok(task)
    }

    /// Active check, row lock, then creator check
    async fn lock_owned(conn: &mut PgConnection, auth: &AuthContext, id: i64) -> ServiceResult<Task> {
        authorize(auth, MEMBER)?;

        let task = Task::lock_visible(conn, id)
            .await?
            .ok_or(ServiceError::NotFound("Task"))?;

        require_creator(auth, task.created_by)?;
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_input_from_json() {
        let input: TaskInput = serde_json::from_str(
            r#"{"title": "Plan", "status": "IN_PROGRESS", "priority": 4, "assigned_to_id": null}"#,
        )
        .unwrap();

        assert_eq!(input.status, Some(TaskStatus::InProgress));
        assert_eq!(input.priority, Some(TaskPriority::Critical));
        assert_eq!(input.assigned_to_id, Some(None));
        assert_eq!(input.due_date, None);
        assert!(input.tag_ids.is_none());
    }

    #[test]
    fn test_task_input_rejects_unknown_status() {
        assert!(serde_json::from_str::<TaskInput>(r#"{"status": "DONE"}"#).is_err());
        assert!(serde_json::from_str::<TaskInput>(r#"{"priority": 9}"#).is_err());
    }

    #[test]
    fn test_title_length_validation() {
        let input = TaskInput {
            title: Some("x".repeat(256)),
            ..TaskInput::default()
        };
        let errors: FieldErrors = input.validate().unwrap_err().into();
        assert!(errors.contains("title"));

        let input = TaskInput {
            title: Some("x".repeat(255)),
            ..TaskInput::default()
        };
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_into_changes_keeps_absent_fields_untouched() {
        let input = TaskInput {
            priority: Some(TaskPriority::High),
            due_date: Some(None),
            ..TaskInput::default()
        };
        let changes = input.into_changes();

        assert!(changes.title.is_none());
        assert!(changes.assigned_to.is_none());
        assert_eq!(changes.priority, Some(TaskPriority::High));
        assert_eq!(changes.due_date, Some(None));
    }
}
