/// Task endpoints
///
/// # Endpoints
///
/// ```text
/// GET    /api/tasks                       # filter, search, order, paginate
/// POST   /api/tasks
/// GET    /api/tasks/my_tasks              # created by the caller
/// GET    /api/tasks/assigned_to_me
/// GET    /api/tasks/:id                   # includes comments
/// PUT    /api/tasks/:id                   # creator only
/// PATCH  /api/tasks/:id                   # creator only
/// DELETE /api/tasks/:id                   # creator only, soft delete
/// POST   /api/tasks/:id/assign            # {"user_id": 5}
/// POST   /api/tasks/:id/complete
/// POST   /api/tasks/:id/mark_in_progress
/// POST   /api/tasks/:id/mark_todo
/// ```
///
/// # List parameters
///
/// `status`, `priority`, `assigned_to`, `tags` (repeatable), `search`,
/// `ordering` (`created_at`, `updated_at`, `due_date`, `priority`, `status`,
/// each optionally prefixed with `-`) and `page`.
use axum::{
    extract::{OriginalUri, State},
    http::{StatusCode, Uri},
    Extension, Json,
};
use taskhub_shared::auth::authorization::{authorize, MEMBER};
use taskhub_shared::auth::middleware::AuthContext;
use taskhub_shared::db::query::{Page, PageRequest};
use taskhub_shared::error::FieldErrors;
use taskhub_shared::models::task::{Task, TaskFilter, TaskPriority, TaskStatus};
use taskhub_shared::services::tasks::{AssignInput, TaskInput};
use taskhub_shared::services::{TaskService, WriteMode};

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath, ApiQuery, QueryParams},
    views::{self, Paginated, TaskDetailResponse, TaskResponse},
};

fn invalid_choice(value: &str) -> String {
    format!("Select a valid choice. {} is not one of the available choices.", value)
}

/// Reads the structured filters and search term from the query string
pub fn task_filter(params: &QueryParams) -> Result<TaskFilter, ApiError> {
    let mut errors = FieldErrors::new();

    let status = params.get("status").and_then(|raw| {
        let parsed = TaskStatus::parse(raw);
        if parsed.is_none() {
            errors.add("status", invalid_choice(raw));
        }
        parsed
    });

    let priority = params.get("priority").and_then(|raw| {
        let parsed = raw
            .parse::<i32>()
            .ok()
            .and_then(|level| TaskPriority::try_from(level).ok());
        if parsed.is_none() {
            errors.add("priority", invalid_choice(raw));
        }
        parsed
    });

    let assigned_to = params.int("assigned_to", &mut errors);
    let tags = params.ints("tags", &mut errors);

    errors.into_result().map_err(ApiError::ValidationError)?;

    Ok(TaskFilter {
        status,
        priority,
        assigned_to,
        tags,
        created_by: None,
        search: params.get("search").map(str::to_string),
    })
}

async fn task_page(
    state: &AppState,
    uri: &Uri,
    mut page: Page<Task>,
) -> ApiResult<Json<Paginated<TaskResponse>>> {
    let tasks = std::mem::take(&mut page.items);

    let mut conn = state.db.acquire().await?;
    let responses = views::task_responses(&mut conn, tasks).await?;

    Ok(Json(Paginated::new(
        page.with_items(responses),
        uri,
        state.public_url(),
    )))
}

async fn single(state: &AppState, task: Task) -> ApiResult<Json<TaskResponse>> {
    let mut conn = state.db.acquire().await?;
    Ok(Json(views::task_response(&mut conn, task).await?))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    OriginalUri(uri): OriginalUri,
    ApiQuery(pairs): ApiQuery<Vec<(String, String)>>,
) -> ApiResult<Json<Paginated<TaskResponse>>> {
    authorize(&auth, MEMBER)?;

    let params = QueryParams::new(pairs);
    let filter = task_filter(&params)?;
    let page = PageRequest::parse(params.get("page"))?;

    let page = TaskService::new(&state.db)
        .list(&auth, &filter, params.get("ordering"), page)
        .await?;

    task_page(&state, &uri, page).await
}

pub async fn my_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    OriginalUri(uri): OriginalUri,
    ApiQuery(pairs): ApiQuery<Vec<(String, String)>>,
) -> ApiResult<Json<Paginated<TaskResponse>>> {
    authorize(&auth, MEMBER)?;

    let page = PageRequest::parse(QueryParams::new(pairs).get("page"))?;
    let page = TaskService::new(&state.db).my_tasks(&auth, page).await?;

    task_page(&state, &uri, page).await
}

pub async fn assigned_to_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    OriginalUri(uri): OriginalUri,
    ApiQuery(pairs): ApiQuery<Vec<(String, String)>>,
) -> ApiResult<Json<Paginated<TaskResponse>>> {
    authorize(&auth, MEMBER)?;

    let page = PageRequest::parse(QueryParams::new(pairs).get("page"))?;
    let page = TaskService::new(&state.db).assigned_to_me(&auth, page).await?;

    task_page(&state, &uri, page).await
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<TaskDetailResponse>> {
    let task = TaskService::new(&state.db).get(&auth, id).await?;

    let mut conn = state.db.acquire().await?;
    Ok(Json(views::task_detail(&mut conn, task).await?))
}

pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(input): ApiJson<TaskInput>,
) -> ApiResult<(StatusCode, Json<TaskResponse>)> {
    let task = TaskService::new(&state.db).create(&auth, input).await?;
    Ok((StatusCode::CREATED, single(&state, task).await?))
}

pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<TaskInput>,
) -> ApiResult<Json<TaskResponse>> {
    let task = TaskService::new(&state.db)
        .update(&auth, id, input, WriteMode::Full)
        .await?;
    single(&state, task).await
}

pub async fn partial_update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<TaskInput>,
) -> ApiResult<Json<TaskResponse>> {
    let task = TaskService::new(&state.db)
        .update(&auth, id, input, WriteMode::Partial)
        .await?;
    single(&state, task).await
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    TaskService::new(&state.db).delete(&auth, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn assign_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<AssignInput>,
) -> ApiResult<Json<TaskResponse>> {
    let task = TaskService::new(&state.db).assign(&auth, id, input).await?;
    single(&state, task).await
}

pub async fn complete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<TaskResponse>> {
    let task = TaskService::new(&state.db).complete(&auth, id).await?;
    single(&state, task).await
}

pub async fn mark_in_progress(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<TaskResponse>> {
    let task = TaskService::new(&state.db).mark_in_progress(&auth, id).await?;
    single(&state, task).await
}

pub async fn mark_todo(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<TaskResponse>> {
    let task = TaskService::new(&state.db).mark_todo(&auth, id).await?;
    single(&state, task).await
}
