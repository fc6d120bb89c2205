/// Response representations
///
/// Rows from the shared models are turned into the JSON shapes clients see.
/// Related rows (users, tags, comment counts) are loaded in one query per
/// relation for a whole page, never per row.
use axum::http::Uri;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgConnection;
use std::collections::HashMap;
use uuid::Uuid;

use taskhub_shared::db::query::Page;
use taskhub_shared::models::comment::Comment;
use taskhub_shared::models::tag::Tag;
use taskhub_shared::models::task::{Task, TaskPriority, TaskStatus};
use taskhub_shared::models::user::User;

/// Embedded user reference
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub email: String,
    pub name: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub url: String,
}

impl UserResponse {
    pub fn new(user: &User, public_url: &str) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            url: format!("{}/api/users/{}", public_url, user.id),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TagResponse {
    pub id: i64,
    pub uuid: Uuid,
    pub name: String,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Tag> for TagResponse {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            uuid: tag.uuid,
            name: tag.name,
            color: tag.color,
            created_at: tag.created_at,
            updated_at: tag.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentResponse {
    pub id: i64,
    pub uuid: Uuid,
    pub task: i64,
    pub content: String,
    pub author: Option<UserSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskResponse {
    pub id: i64,
    pub uuid: Uuid,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub assigned_to: Option<UserSummary>,
    pub tags: Vec<TagResponse>,
    pub created_by: Option<UserSummary>,
    pub is_overdue: bool,
    pub is_completed: bool,
    pub comments_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Task detail adds the task's comments
#[derive(Debug, Clone, Serialize)]
pub struct TaskDetailResponse {
    #[serde(flatten)]
    pub task: TaskResponse,
    pub comments: Vec<CommentResponse>,
}

/// Page envelope: `{count, next, previous, results}`
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Paginated<T> {
    /// Wraps a page, linking its neighbours relative to the request URI
    pub fn new(page: Page<T>, uri: &Uri, public_url: &str) -> Self {
        let next = page
            .has_next()
            .then(|| page_link(public_url, uri, page.number + 1));
        let previous = page
            .has_previous()
            .then(|| page_link(public_url, uri, page.number - 1));

        Self {
            count: page.total,
            next,
            previous,
            results: page.items,
        }
    }
}

/// Link to page `number` of the current listing
///
/// Other query parameters are kept as sent; the first page carries no
/// `page` parameter at all.
pub fn page_link(public_url: &str, uri: &Uri, number: i64) -> String {
    let mut query: Vec<String> = uri
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| pair.split('=').next() != Some("page"))
        .map(str::to_string)
        .collect();

    if number > 1 {
        query.push(format!("page={}", number));
    }

    if query.is_empty() {
        format!("{}{}", public_url, uri.path())
    } else {
        format!("{}{}?{}", public_url, uri.path(), query.join("&"))
    }
}

async fn users_by_id(
    conn: &mut PgConnection,
    mut ids: Vec<i64>,
) -> Result<HashMap<i64, UserSummary>, sqlx::Error> {
    ids.sort_unstable();
    ids.dedup();

    let users = User::find_many(conn, &ids).await?;
    Ok(users.iter().map(|u| (u.id, UserSummary::from(u))).collect())
}

/// Builds task representations for a batch of tasks, keeping their order
pub async fn task_responses(
    conn: &mut PgConnection,
    tasks: Vec<Task>,
) -> Result<Vec<TaskResponse>, sqlx::Error> {
    let task_ids: Vec<i64> = tasks.iter().map(|t| t.id).collect();

    let user_ids: Vec<i64> = tasks
        .iter()
        .flat_map(|t| [t.assigned_to, t.created_by])
        .flatten()
        .collect();

    let users = users_by_id(conn, user_ids).await?;
    let mut tags = Tag::for_tasks(conn, &task_ids).await?;
    let counts = Comment::count_for_tasks(conn, &task_ids).await?;
    let now = Utc::now();

    Ok(tasks
        .into_iter()
        .map(|task| TaskResponse {
            assigned_to: task.assigned_to.and_then(|id| users.get(&id).cloned()),
            created_by: task.created_by.and_then(|id| users.get(&id).cloned()),
            tags: tags
                .remove(&task.id)
                .unwrap_or_default()
                .into_iter()
                .map(TagResponse::from)
                .collect(),
            comments_count: counts.get(&task.id).copied().unwrap_or(0),
            is_overdue: task.is_overdue_at(now),
            is_completed: task.is_completed(),
            id: task.id,
            uuid: task.uuid,
            title: task.title,
            description: task.description,
            status: task.status,
            priority: task.priority,
            due_date: task.due_date,
            created_at: task.created_at,
            updated_at: task.updated_at,
        })
        .collect())
}

pub async fn task_response(conn: &mut PgConnection, task: Task) -> Result<TaskResponse, sqlx::Error> {
    let mut responses = task_responses(conn, vec![task]).await?;
    responses.pop().ok_or(sqlx::Error::RowNotFound)
}

pub async fn task_detail(
    conn: &mut PgConnection,
    task: Task,
) -> Result<TaskDetailResponse, sqlx::Error> {
    let comments = Comment::list_for_task(conn, task.id).await?;
    let comments = comment_responses(conn, comments).await?;
    let task = task_response(conn, task).await?;

    Ok(TaskDetailResponse { task, comments })
}

pub async fn comment_responses(
    conn: &mut PgConnection,
    comments: Vec<Comment>,
) -> Result<Vec<CommentResponse>, sqlx::Error> {
    let author_ids: Vec<i64> = comments.iter().filter_map(|c| c.created_by).collect();
    let users = users_by_id(conn, author_ids).await?;

    Ok(comments
        .into_iter()
        .map(|comment| CommentResponse {
            author: comment.created_by.and_then(|id| users.get(&id).cloned()),
            id: comment.id,
            uuid: comment.uuid,
            task: comment.task_id,
            content: comment.content,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        })
        .collect())
}

pub async fn comment_response(
    conn: &mut PgConnection,
    comment: Comment,
) -> Result<CommentResponse, sqlx::Error> {
    let mut responses = comment_responses(conn, vec![comment]).await?;
    responses.pop().ok_or(sqlx::Error::RowNotFound)
}
