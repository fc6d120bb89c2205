/// Task model and database operations
///
/// Tasks are owned by their creator: only the creator may change, delete,
/// assign or move them between states. Assignment does not transfer
/// ownership.
///
/// # Status
///
/// ```text
/// TODO ⇄ IN_PROGRESS ⇄ COMPLETED      (any state reachable from any other)
/// ```
///
/// Status changes are unguarded and idempotent; they write only the status
/// and `updated_at` columns.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('TODO', 'IN_PROGRESS', 'COMPLETED');
///
/// CREATE TABLE tasks (
///     id BIGSERIAL PRIMARY KEY,
///     uuid UUID NOT NULL UNIQUE DEFAULT gen_random_uuid(),
///     title VARCHAR(255) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     status task_status NOT NULL DEFAULT 'TODO',
///     priority INTEGER NOT NULL DEFAULT 2,   -- 1 LOW .. 4 CRITICAL
///     due_date TIMESTAMPTZ,
///     assigned_to BIGINT REFERENCES users(id) ON DELETE SET NULL,
///     created_by BIGINT REFERENCES users(id) ON DELETE SET NULL,
///     updated_by BIGINT REFERENCES users(id) ON DELETE SET NULL,
///     is_deleted BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE task_tags (task_id BIGINT, tag_id BIGINT, PRIMARY KEY (task_id, tag_id));
/// ```
///
/// # Example
///
/// ```no_run
/// use taskhub_shared::models::task::{NewTask, Task, TaskPriority};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool, me: i64) -> Result<(), Box<dyn std::error::Error>> {
/// let mut tx = pool.begin().await?;
///
/// let mut task = Task::create(&mut tx, NewTask {
///     title: "Write release notes".to_string(),
///     priority: TaskPriority::High,
///     ..NewTask::new(me)
/// }).await?;
///
/// task.mark_completed(&mut tx).await?;
/// assert!(task.is_completed());
///
/// tx.commit().await?;
/// # Ok(())
/// # }
/// ```
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, Postgres, QueryBuilder};
use std::fmt;
use uuid::Uuid;

use crate::db::query::{contains_pattern, paginate, visible, OrderBy, Page, PageRequest};
use crate::error::ServiceResult;

/// Client-facing ordering fields
pub const ORDERING_FIELDS: &[(&str, &str)] = &[
    ("created_at", "t.created_at"),
    ("updated_at", "t.updated_at"),
    ("due_date", "t.due_date"),
    ("priority", "t.priority"),
    // Alphabetical by wire name, not enum declaration order
    ("status", "t.status::text"),
];

pub const DEFAULT_ORDERING: &str = "-created_at";

/// Longest accepted title
pub const MAX_TITLE_LENGTH: u64 = 255;

const TASK_COLUMNS: &str = "t.id, t.uuid, t.title, t.description, t.status, t.priority, \
                            t.due_date, t.assigned_to, t.created_by, t.updated_by, \
                            t.is_deleted, t.created_at, t.updated_at";

/// Task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Completed];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "TODO",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Completed => "COMPLETED",
        }
    }

    /// Parses the wire form (`TODO`, `IN_PROGRESS`, `COMPLETED`)
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Todo
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task priority, stored and serialized as its integer level
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[repr(i32)]
#[serde(try_from = "i32", into = "i32")]
pub enum TaskPriority {
    Low = 1,
    Medium = 2,
    High = 3,
    Critical = 4,
}

impl Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::Medium
    }
}

/// Rejected priority level
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("\"{0}\" is not a valid choice.")]
pub struct InvalidPriority(pub i32);

impl TryFrom<i32> for TaskPriority {
    type Error = InvalidPriority;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(TaskPriority::Low),
            2 => Ok(TaskPriority::Medium),
            3 => Ok(TaskPriority::High),
            4 => Ok(TaskPriority::Critical),
            other => Err(InvalidPriority(other)),
        }
    }
}

impl From<TaskPriority> for i32 {
    fn from(priority: TaskPriority) -> Self {
        priority as i32
    }
}

/// Task row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: i64,
    pub uuid: Uuid,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub assigned_to: Option<i64>,
    pub created_by: Option<i64>,
    pub updated_by: Option<i64>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for [`Task::create`]
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub assigned_to: Option<i64>,
    pub created_by: i64,
}

impl NewTask {
    /// Blank TODO task of medium priority created by `created_by`
    pub fn new(created_by: i64) -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            status: TaskStatus::default(),
            priority: TaskPriority::default(),
            due_date: None,
            assigned_to: None,
            created_by,
        }
    }
}

/// Column changes for [`Task::update`]; `None` leaves a column untouched
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub assigned_to: Option<Option<i64>>,
}

/// Structured filters for task listings, combined with AND
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<i64>,

    /// Matches tasks carrying any of these tags
    pub tags: Vec<i64>,

    pub created_by: Option<i64>,

    /// Case-insensitive substring of title or description
    pub search: Option<String>,
}

#[derive(sqlx::FromRow)]
struct CountedTask {
    #[sqlx(flatten)]
    task: Task,
    total_count: i64,
}

#[derive(sqlx::FromRow)]
struct Touched {
    updated_at: DateTime<Utc>,
}

impl Task {
    /// Whether the task is past due at `now`
    ///
    /// Completed tasks and tasks without a due date are never overdue.
    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        match self.due_date {
            Some(due) => self.status != TaskStatus::Completed && now > due,
            None => false,
        }
    }

    pub fn is_overdue(&self) -> bool {
        self.is_overdue_at(Utc::now())
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Inserts a task; `created_by` also becomes the first `updated_by`
    pub async fn create(conn: &mut PgConnection, data: NewTask) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO tasks AS t
                (title, description, status, priority, due_date, assigned_to, created_by, updated_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
             RETURNING {}",
            TASK_COLUMNS
        );

        sqlx::query_as::<_, Task>(&sql)
            .bind(data.title)
            .bind(data.description)
            .bind(data.status)
            .bind(data.priority)
            .bind(data.due_date)
            .bind(data.assigned_to)
            .bind(data.created_by)
            .fetch_one(&mut *conn)
            .await
    }

    /// Looks up a non-deleted task
    pub async fn find_visible(conn: &mut PgConnection, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM tasks t WHERE t.id = $1 AND {}",
            TASK_COLUMNS,
            visible("t")
        );

        sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Looks up a non-deleted task and locks its row until the transaction ends
    pub async fn lock_visible(conn: &mut PgConnection, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM tasks t WHERE t.id = $1 AND {} FOR UPDATE",
            TASK_COLUMNS,
            visible("t")
        );

        sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Direct lookup that ignores the deleted flag
    pub async fn find_by_id(conn: &mut PgConnection, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM tasks t WHERE t.id = $1", TASK_COLUMNS);

        sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Applies `changes` and records `updated_by`
    ///
    /// Returns `None` when the task does not exist or is deleted.
    pub async fn update(
        conn: &mut PgConnection,
        id: i64,
        changes: TaskChanges,
        updated_by: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE tasks AS t SET updated_at = NOW(), updated_by = $2");
        let mut bind_count = 2;

        if changes.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if changes.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if changes.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", status = ${}", bind_count));
        }
        if changes.priority.is_some() {
            bind_count += 1;
            query.push_str(&format!(", priority = ${}", bind_count));
        }
        if changes.due_date.is_some() {
            bind_count += 1;
            query.push_str(&format!(", due_date = ${}", bind_count));
        }
        if changes.assigned_to.is_some() {
            bind_count += 1;
            query.push_str(&format!(", assigned_to = ${}", bind_count));
        }

        query.push_str(&format!(
            " WHERE t.id = $1 AND {} RETURNING {}",
            visible("t"),
            TASK_COLUMNS
        ));

        let mut q = sqlx::query_as::<_, Task>(&query).bind(id).bind(updated_by);

        if let Some(title) = changes.title {
            q = q.bind(title);
        }
        if let Some(description) = changes.description {
            q = q.bind(description);
        }
        if let Some(status) = changes.status {
            q = q.bind(status);
        }
        if let Some(priority) = changes.priority {
            q = q.bind(priority);
        }
        if let Some(due_date) = changes.due_date {
            q = q.bind(due_date);
        }
        if let Some(assigned_to) = changes.assigned_to {
            q = q.bind(assigned_to);
        }

        q.fetch_optional(&mut *conn).await
    }

    /// Replaces the task's tag set
    pub async fn set_tags(conn: &mut PgConnection, id: i64, tag_ids: &[i64]) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM task_tags WHERE task_id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if !tag_ids.is_empty() {
            sqlx::query(
                "INSERT INTO task_tags (task_id, tag_id)
                 SELECT $1, tag_id FROM UNNEST($2::BIGINT[]) AS tag_id
                 ON CONFLICT DO NOTHING",
            )
            .bind(id)
            .bind(tag_ids)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Ids of the tags currently attached, deleted tags included
    pub async fn tag_ids(conn: &mut PgConnection, id: i64) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar("SELECT tag_id FROM task_tags WHERE task_id = $1 ORDER BY tag_id")
            .bind(id)
            .fetch_all(&mut *conn)
            .await
    }

    async fn write_status(&mut self, conn: &mut PgConnection, status: TaskStatus) -> Result<(), sqlx::Error> {
        let touched = sqlx::query_as::<_, Touched>(
            "UPDATE tasks SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING updated_at",
        )
        .bind(self.id)
        .bind(status)
        .fetch_one(&mut *conn)
        .await?;

        self.status = status;
        self.updated_at = touched.updated_at;
        Ok(())
    }

    /// Sets status COMPLETED, writing only status and `updated_at`
    pub async fn mark_completed(&mut self, conn: &mut PgConnection) -> Result<(), sqlx::Error> {
        self.write_status(conn, TaskStatus::Completed).await
    }

    /// Sets status IN_PROGRESS, writing only status and `updated_at`
    pub async fn mark_in_progress(&mut self, conn: &mut PgConnection) -> Result<(), sqlx::Error> {
        self.write_status(conn, TaskStatus::InProgress).await
    }

    /// Sets status TODO, writing only status and `updated_at`
    pub async fn mark_todo(&mut self, conn: &mut PgConnection) -> Result<(), sqlx::Error> {
        self.write_status(conn, TaskStatus::Todo).await
    }

    /// Sets the assignee, writing only `assigned_to` and `updated_at`
    ///
    /// No check is made on the assignee here; callers decide who may be
    /// assigned.
    pub async fn assign_to(&mut self, conn: &mut PgConnection, user_id: Option<i64>) -> Result<(), sqlx::Error> {
        let touched = sqlx::query_as::<_, Touched>(
            "UPDATE tasks SET assigned_to = $2, updated_at = NOW() WHERE id = $1 RETURNING updated_at",
        )
        .bind(self.id)
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;

        self.assigned_to = user_id;
        self.updated_at = touched.updated_at;
        Ok(())
    }

    /// Records who last changed the task
    pub async fn record_updater(&mut self, conn: &mut PgConnection, user_id: i64) -> Result<(), sqlx::Error> {
        let touched = sqlx::query_as::<_, Touched>(
            "UPDATE tasks SET updated_by = $2, updated_at = NOW() WHERE id = $1 RETURNING updated_at",
        )
        .bind(self.id)
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;

        self.updated_by = Some(user_id);
        self.updated_at = touched.updated_at;
        Ok(())
    }

    /// Flags the task as deleted; comments are left as they are
    pub async fn soft_delete(&mut self, conn: &mut PgConnection, deleted_by: i64) -> Result<(), sqlx::Error> {
        let touched = sqlx::query_as::<_, Touched>(
            "UPDATE tasks SET is_deleted = TRUE, updated_by = $2, updated_at = NOW()
             WHERE id = $1 RETURNING updated_at",
        )
        .bind(self.id)
        .bind(deleted_by)
        .fetch_one(&mut *conn)
        .await?;

        self.is_deleted = true;
        self.updated_by = Some(deleted_by);
        self.updated_at = touched.updated_at;
        Ok(())
    }

    /// Pages through non-deleted tasks matching `filter`
    pub async fn list(
        conn: &mut PgConnection,
        filter: &TaskFilter,
        order: &OrderBy,
        page: PageRequest,
    ) -> ServiceResult<Page<Self>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {}, COUNT(*) OVER() AS total_count FROM tasks t WHERE {}",
            TASK_COLUMNS,
            visible("t")
        ));

        if let Some(status) = filter.status {
            qb.push(" AND t.status = ").push_bind(status);
        }
        if let Some(priority) = filter.priority {
            qb.push(" AND t.priority = ").push_bind(priority);
        }
        if let Some(assigned_to) = filter.assigned_to {
            qb.push(" AND t.assigned_to = ").push_bind(assigned_to);
        }
        if let Some(created_by) = filter.created_by {
            qb.push(" AND t.created_by = ").push_bind(created_by);
        }
        if !filter.tags.is_empty() {
            qb.push(" AND EXISTS (SELECT 1 FROM task_tags tt WHERE tt.task_id = t.id AND tt.tag_id = ANY(")
                .push_bind(filter.tags.clone())
                .push("))");
        }
        if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = contains_pattern(term);
            qb.push(" AND (t.title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR t.description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        qb.push(" ORDER BY ")
            .push(order.to_sql("t.id"))
            .push(" LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = qb
            .build_query_as::<CountedTask>()
            .fetch_all(&mut *conn)
            .await?;

        Ok(paginate(page, rows, |r| r.total_count)?.map(|r| r.task))
    }
}
