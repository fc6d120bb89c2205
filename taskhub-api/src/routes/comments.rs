/// Comment endpoints
///
/// ```text
/// GET    /api/comments?task=<id>&ordering=-created_at&page=2
/// POST   /api/comments                 {"task": 1, "content": "..."}
/// GET    /api/comments/:id
/// PUT    /api/comments/:id             # creator only
/// PATCH  /api/comments/:id             # creator only
/// DELETE /api/comments/:id             # creator only, soft delete
/// ```
use axum::{
    extract::{OriginalUri, State},
    http::StatusCode,
    Extension, Json,
};
use taskhub_shared::auth::authorization::{authorize, MEMBER};
use taskhub_shared::auth::middleware::AuthContext;
use taskhub_shared::db::query::PageRequest;
use taskhub_shared::error::FieldErrors;
use taskhub_shared::services::comments::CommentInput;
use taskhub_shared::services::{CommentService, WriteMode};

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath, ApiQuery, QueryParams},
    views::{self, CommentResponse, Paginated},
};

pub async fn list_comments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    OriginalUri(uri): OriginalUri,
    ApiQuery(pairs): ApiQuery<Vec<(String, String)>>,
) -> ApiResult<Json<Paginated<CommentResponse>>> {
    authorize(&auth, MEMBER)?;

    let params = QueryParams::new(pairs);
    let mut errors = FieldErrors::new();
    let task_id = params.int("task", &mut errors);
    errors.into_result().map_err(ApiError::ValidationError)?;

    let page = PageRequest::parse(params.get("page"))?;
    let mut page = CommentService::new(&state.db)
        .list(&auth, task_id, params.get("ordering"), page)
        .await?;

    let comments = std::mem::take(&mut page.items);
    let mut conn = state.db.acquire().await?;
    let responses = views::comment_responses(&mut conn, comments).await?;

    Ok(Json(Paginated::new(
        page.with_items(responses),
        &uri,
        state.public_url(),
    )))
}

pub async fn get_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<CommentResponse>> {
    let comment = CommentService::new(&state.db).get(&auth, id).await?;

    let mut conn = state.db.acquire().await?;
    Ok(Json(views::comment_response(&mut conn, comment).await?))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(input): ApiJson<CommentInput>,
) -> ApiResult<(StatusCode, Json<CommentResponse>)> {
    let comment = CommentService::new(&state.db).create(&auth, input).await?;

    let mut conn = state.db.acquire().await?;
    let body = views::comment_response(&mut conn, comment).await?;
    Ok((StatusCode::CREATED, Json(body)))
}

async fn write(
    state: &AppState,
    auth: &AuthContext,
    id: i64,
    input: CommentInput,
    mode: WriteMode,
) -> ApiResult<Json<CommentResponse>> {
    let comment = CommentService::new(&state.db)
        .update(auth, id, input, mode)
        .await?;

    let mut conn = state.db.acquire().await?;
    Ok(Json(views::comment_response(&mut conn, comment).await?))
}

pub async fn update_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<CommentInput>,
) -> ApiResult<Json<CommentResponse>> {
    write(&state, &auth, id, input, WriteMode::Full).await
}

pub async fn partial_update_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<CommentInput>,
) -> ApiResult<Json<CommentResponse>> {
    write(&state, &auth, id, input, WriteMode::Partial).await
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    CommentService::new(&state.db).delete(&auth, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
