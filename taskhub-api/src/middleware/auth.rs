/// Authentication middleware
///
/// Every route behind this layer requires an access token in the
/// `Authorization` header (`Bearer` or `JWT` scheme) or in the session
/// cookie. On success the caller's [`AuthContext`] is inserted into the
/// request extensions; otherwise the request stops here with 401.
///
/// Inactive users still authenticate. The active check belongs to the
/// capability checks so that it answers 403 rather than 401.
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use taskhub_shared::auth::middleware::{authenticate, AuthContext};

use crate::{app::AppState, error::ApiError};

pub async fn auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth: AuthContext = authenticate(
        &state.db,
        req.headers(),
        state.jwt_secret(),
        &state.config.jwt.cookie_name,
    )
    .await
    .map_err(|e| {
        tracing::debug!(error = %e, path = %req.uri().path(), "Authentication failed");
        ApiError::from(e)
    })?;

    req.extensions_mut().insert(auth);

    Ok(next.run(req).await)
}
