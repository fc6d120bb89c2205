/// User endpoints
///
/// Regular users see only their own account here; superusers see all of
/// them. Any other id answers 404.
use axum::{
    extract::{OriginalUri, State},
    Extension, Json,
};
use taskhub_shared::auth::middleware::AuthContext;
use taskhub_shared::db::query::PageRequest;
use taskhub_shared::services::users::UserInput;
use taskhub_shared::services::{UserService, WriteMode};

use crate::{
    app::AppState,
    error::ApiResult,
    extract::{ApiJson, ApiPath, ApiQuery, QueryParams},
    views::{Paginated, UserResponse},
};

pub async fn list_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    OriginalUri(uri): OriginalUri,
    ApiQuery(pairs): ApiQuery<Vec<(String, String)>>,
) -> ApiResult<Json<Paginated<UserResponse>>> {
    let page = PageRequest::parse(QueryParams::new(pairs).get("page"))?;
    let page = UserService::new(&state.db).list(&auth, page).await?;

    let public_url = state.public_url();
    Ok(Json(Paginated::new(
        page.map(|user| UserResponse::new(&user, public_url)),
        &uri,
        public_url,
    )))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<UserResponse>> {
    let user = UserService::new(&state.db).me(&auth).await?;
    Ok(Json(UserResponse::new(&user, state.public_url())))
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<UserResponse>> {
    let user = UserService::new(&state.db).get(&auth, id).await?;
    Ok(Json(UserResponse::new(&user, state.public_url())))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<UserInput>,
) -> ApiResult<Json<UserResponse>> {
    let user = UserService::new(&state.db)
        .update(&auth, id, input, WriteMode::Full)
        .await?;
    Ok(Json(UserResponse::new(&user, state.public_url())))
}

pub async fn partial_update_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<UserInput>,
) -> ApiResult<Json<UserResponse>> {
    let user = UserService::new(&state.db)
        .update(&auth, id, input, WriteMode::Partial)
        .await?;
    Ok(Json(UserResponse::new(&user, state.public_url())))
}
