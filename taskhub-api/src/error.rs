/// Error handling for the API server
///
/// All handlers return `Result<T, ApiError>`, which converts to a JSON error
/// body and status code:
///
/// ```json
/// {"error": "validation_error", "message": "Invalid input.", "fields": {"name": ["..."]}}
/// ```
///
/// `fields` is present only on validation errors.
///
/// # Example
///
/// ```
/// use taskhub_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::json;
///
/// async fn handler() -> ApiResult<Json<serde_json::Value>> {
///     Err(ApiError::NotFound("Not found.".to_string()))
/// }
/// ```
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;

use taskhub_shared::auth::authorization::AuthzError;
use taskhub_shared::auth::jwt::JwtError;
use taskhub_shared::auth::middleware::AuthError;
use taskhub_shared::db::query::QueryError;
use taskhub_shared::error::{FieldErrors, ServiceError};

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Key used for errors that do not belong to one field
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Method not allowed (405)
    MethodNotAllowed(String),

    /// Field-level validation errors (400)
    ValidationError(FieldErrors),

    /// Internal server error (500)
    InternalError(String),
}

/// Error response format
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "validation_error", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Validation error on a single field
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        ApiError::ValidationError(FieldErrors::single(field, message))
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::MethodNotAllowed(msg) => write!(f, "Method not allowed: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (error_code, message, fields) = match self {
            ApiError::BadRequest(msg) => ("bad_request", msg, None),
            ApiError::Unauthorized(msg) => ("unauthorized", msg, None),
            ApiError::Forbidden(msg) => ("forbidden", msg, None),
            ApiError::NotFound(msg) => ("not_found", msg, None),
            ApiError::MethodNotAllowed(msg) => ("method_not_allowed", msg, None),
            ApiError::ValidationError(errors) => {
                ("validation_error", "Invalid input.".to_string(), Some(errors))
            }
            ApiError::InternalError(msg) => {
                // Details stay in the logs
                tracing::error!("Internal error: {}", msg);
                (
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            fields,
        });

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Not found.".to_string()),
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(_) => ApiError::NotFound("Not found.".to_string()),
            ServiceError::Forbidden(err) => err.into(),
            ServiceError::Validation(fields) => ApiError::ValidationError(fields),
            ServiceError::Query(err) => err.into(),
            ServiceError::Database(err) => err.into(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::DatabaseError(msg) => ApiError::InternalError(msg),
            AuthError::UnknownUser => {
                ApiError::Unauthorized("User not found".to_string())
            }
            other => ApiError::Unauthorized(other.to_string()),
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        ApiError::Forbidden(err.to_string())
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::UnknownOrdering(_) => ApiError::field("ordering", err.to_string()),
            QueryError::InvalidPage => ApiError::NotFound(err.to_string()),
        }
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            JwtError::InvalidIssuer => ApiError::Unauthorized("Invalid token issuer".to_string()),
            JwtError::CreateError(msg) => ApiError::InternalError(msg),
            _ => ApiError::Unauthorized(format!("Invalid token: {}", err)),
        }
    }
}

const JSON_DATA_PREFIX: &str = "Failed to deserialize the JSON body into the target type: ";

/// Splits a serde message of the form `field: message` into its parts
///
/// Messages without a field path land under [`NON_FIELD_ERRORS`].
pub fn split_field_message(text: &str) -> (String, String) {
    let text = text.strip_prefix(JSON_DATA_PREFIX).unwrap_or(text);

    match text.split_once(": ") {
        Some((path, message))
            if !path.is_empty()
                && path != "."
                && path.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '[' || c == ']') =>
        {
            let field = path.split(['.', '[']).next().unwrap_or(path);
            (field.to_string(), message.to_string())
        }
        _ => (NON_FIELD_ERRORS.to_string(), text.to_string()),
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(err) => {
                let (field, message) = split_field_message(&err.body_text());
                ApiError::field(&field, message)
            }
            JsonRejection::JsonSyntaxError(err) => {
                ApiError::field(NON_FIELD_ERRORS, format!("JSON parse error - {}", err.body_text()))
            }
            other => ApiError::BadRequest(other.body_text()),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Non-numeric ids in the path never match an object
impl From<PathRejection> for ApiError {
    fn from(_: PathRejection) -> Self {
        ApiError::NotFound("Not found.".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::NotFound("Not found.".to_string());
        assert_eq!(err.to_string(), "Not found: Not found.");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(ServiceError::NotFound("Task")).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(ServiceError::Forbidden(AuthzError::NotCreator)).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(AuthError::MissingCredentials).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AuthError::InvalidFormat("bad".to_string())).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AuthError::DatabaseError("down".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(QueryError::InvalidPage).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::MethodNotAllowed("PUT".to_string()).status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
    }

    #[test]
    fn test_unknown_ordering_is_field_error() {
        match ApiError::from(QueryError::UnknownOrdering("title".to_string())) {
            ApiError::ValidationError(fields) => assert!(fields.contains("ordering")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_validation_error() {
        let mut fields = FieldErrors::single("name", "Tag with this name already exists.");
        fields.add("color", "Enter a valid hex color.");

        let err = ApiError::ValidationError(fields);
        assert_eq!(err.to_string(), "Validation failed: 2 errors");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_split_field_message() {
        let (field, message) = split_field_message(
            "Failed to deserialize the JSON body into the target type: status: unknown variant `DONE`, expected one of `TODO`, `IN_PROGRESS`, `COMPLETED` at line 1 column 16",
        );
        assert_eq!(field, "status");
        assert!(message.starts_with("unknown variant `DONE`"));

        let (field, _) = split_field_message("tag_ids[1]: invalid type: string \"x\", expected i64");
        assert_eq!(field, "tag_ids");

        let (field, message) = split_field_message("invalid type: map, expected a string");
        assert_eq!(field, NON_FIELD_ERRORS);
        assert_eq!(message, "invalid type: map, expected a string");
    }
}
