/// Tag endpoints
///
/// ```text
/// GET    /api/tags?search=urg&ordering=-created_at
/// POST   /api/tags                 # staff only: {"name": "urgent", "color": "#FF0000"}
/// GET    /api/tags/autocomplete?q=urgent
/// GET    /api/tags/:id
/// DELETE /api/tags/:id             # staff only, permanent
/// PUT    /api/tags/:id             # 405
/// PATCH  /api/tags/:id             # 405
/// ```
use axum::{
    extract::{OriginalUri, State},
    http::{Method, StatusCode},
    Extension, Json,
};
use taskhub_shared::auth::authorization::{authorize, MEMBER};
use taskhub_shared::auth::middleware::AuthContext;
use taskhub_shared::db::query::PageRequest;
use taskhub_shared::services::tags::TagInput;
use taskhub_shared::services::TagService;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath, ApiQuery, QueryParams},
    views::{Paginated, TagResponse},
};

pub async fn list_tags(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    OriginalUri(uri): OriginalUri,
    ApiQuery(pairs): ApiQuery<Vec<(String, String)>>,
) -> ApiResult<Json<Paginated<TagResponse>>> {
    authorize(&auth, MEMBER)?;

    let params = QueryParams::new(pairs);
    let page = PageRequest::parse(params.get("page"))?;

    let page = TagService::new(&state.db)
        .list(&auth, params.get("search"), params.get("ordering"), page)
        .await?;

    Ok(Json(Paginated::new(
        page.map(TagResponse::from),
        &uri,
        state.public_url(),
    )))
}

/// Not paginated
pub async fn autocomplete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiQuery(pairs): ApiQuery<Vec<(String, String)>>,
) -> ApiResult<Json<Vec<TagResponse>>> {
    let params = QueryParams::new(pairs);

    let tags = TagService::new(&state.db)
        .autocomplete(&auth, params.raw("q"))
        .await?;

    Ok(Json(tags.into_iter().map(TagResponse::from).collect()))
}

pub async fn get_tag(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<TagResponse>> {
    let tag = TagService::new(&state.db).get(&auth, id).await?;
    Ok(Json(tag.into()))
}

pub async fn create_tag(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(input): ApiJson<TagInput>,
) -> ApiResult<(StatusCode, Json<TagResponse>)> {
    let tag = TagService::new(&state.db).create(&auth, input).await?;
    Ok((StatusCode::CREATED, Json(tag.into())))
}

pub async fn delete_tag(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    TagService::new(&state.db).delete(&auth, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Tags are immutable once created
pub async fn update_not_allowed(
    method: Method,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<StatusCode> {
    authorize(&auth, MEMBER)?;
    Err(ApiError::MethodNotAllowed(format!(
        "Method \"{}\" not allowed.",
        method
    )))
}
