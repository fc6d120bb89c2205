/// Comments on tasks
///
/// A comment belongs to exactly one task. Rows are soft-deleted like tasks;
/// only a hard delete of the task row removes them.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, Postgres, QueryBuilder};
use std::collections::HashMap;
use uuid::Uuid;

use crate::db::query::{paginate, visible, OrderBy, Page, PageRequest};
use crate::error::ServiceResult;

pub const ORDERING_FIELDS: &[(&str, &str)] = &[
    ("created_at", "c.created_at"),
    ("updated_at", "c.updated_at"),
];

pub const DEFAULT_ORDERING: &str = "created_at";

const COMMENT_COLUMNS: &str = "c.id, c.uuid, c.task_id, c.content, c.created_by, c.updated_by, \
                               c.is_deleted, c.created_at, c.updated_at";

/// Comment row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub uuid: Uuid,
    pub task_id: i64,
    pub content: String,
    pub created_by: Option<i64>,
    pub updated_by: Option<i64>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct CountedComment {
    #[sqlx(flatten)]
    comment: Comment,
    total_count: i64,
}

#[derive(sqlx::FromRow)]
struct TaskCount {
    task_id: i64,
    count: i64,
}

impl Comment {
    pub async fn create(
        conn: &mut PgConnection,
        task_id: i64,
        content: &str,
        created_by: i64,
    ) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO comments AS c (task_id, content, created_by, updated_by)
             VALUES ($1, $2, $3, $3)
             RETURNING {}",
            COMMENT_COLUMNS
        );

        sqlx::query_as::<_, Comment>(&sql)
            .bind(task_id)
            .bind(content)
            .bind(created_by)
            .fetch_one(&mut *conn)
            .await
    }

    /// Looks up a non-deleted comment
    pub async fn find_visible(conn: &mut PgConnection, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM comments c WHERE c.id = $1 AND {}",
            COMMENT_COLUMNS,
            visible("c")
        );

        sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Same as [`Comment::find_visible`] but holds a row lock
    pub async fn lock_visible(conn: &mut PgConnection, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM comments c WHERE c.id = $1 AND {} FOR UPDATE",
            COMMENT_COLUMNS,
            visible("c")
        );

        sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Direct lookup that ignores the deleted flag
    pub async fn find_by_id(conn: &mut PgConnection, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM comments c WHERE c.id = $1", COMMENT_COLUMNS);

        sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Rewrites task and content, recording `updated_by`
    pub async fn update(
        conn: &mut PgConnection,
        id: i64,
        task_id: Option<i64>,
        content: Option<&str>,
        updated_by: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE comments AS c
             SET task_id = COALESCE($2, c.task_id),
                 content = COALESCE($3, c.content),
                 updated_by = $4,
                 updated_at = NOW()
             WHERE c.id = $1 AND {}
             RETURNING {}",
            visible("c"),
            COMMENT_COLUMNS
        );

        sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .bind(task_id)
            .bind(content)
            .bind(updated_by)
            .fetch_optional(&mut *conn)
            .await
    }

    pub async fn soft_delete(conn: &mut PgConnection, id: i64, deleted_by: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE comments SET is_deleted = TRUE, updated_by = $2, updated_at = NOW()
             WHERE id = $1 AND is_deleted = FALSE",
        )
        .bind(id)
        .bind(deleted_by)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Pages through non-deleted comments, optionally for one task
    pub async fn list(
        conn: &mut PgConnection,
        task_id: Option<i64>,
        order: &OrderBy,
        page: PageRequest,
    ) -> ServiceResult<Page<Self>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {}, COUNT(*) OVER() AS total_count FROM comments c WHERE {}",
            COMMENT_COLUMNS,
            visible("c")
        ));

        if let Some(task_id) = task_id {
            qb.push(" AND c.task_id = ").push_bind(task_id);
        }

        qb.push(" ORDER BY ")
            .push(order.to_sql("c.id"))
            .push(" LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = qb
            .build_query_as::<CountedComment>()
            .fetch_all(&mut *conn)
            .await?;

        Ok(paginate(page, rows, |r| r.total_count)?.map(|r| r.comment))
    }

    /// Every non-deleted comment on a task, oldest first
    pub async fn list_for_task(conn: &mut PgConnection, task_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM comments c WHERE c.task_id = $1 AND {} ORDER BY c.created_at, c.id",
            COMMENT_COLUMNS,
            visible("c")
        );

        sqlx::query_as::<_, Comment>(&sql)
            .bind(task_id)
            .fetch_all(&mut *conn)
            .await
    }

    /// Non-deleted comment counts keyed by task id; tasks without comments are absent
    pub async fn count_for_tasks(
        conn: &mut PgConnection,
        task_ids: &[i64],
    ) -> Result<HashMap<i64, i64>, sqlx::Error> {
        if task_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let sql = format!(
            "SELECT c.task_id, COUNT(*) AS count FROM comments c
             WHERE c.task_id = ANY($1) AND {}
             GROUP BY c.task_id",
            visible("c")
        );

        let rows = sqlx::query_as::<_, TaskCount>(&sql)
            .bind(task_ids)
            .fetch_all(&mut *conn)
            .await?;

        Ok(rows.into_iter().map(|r| (r.task_id, r.count)).collect())
    }
}
