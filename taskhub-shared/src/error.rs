/// Error types shared by the domain services
///
/// Services report failures in terms the HTTP layer can map one-to-one:
/// missing objects, failed capability checks, field-level validation
/// problems and store errors.
use std::collections::BTreeMap;

use serde::Serialize;

use crate::auth::authorization::AuthzError;
use crate::db::query::QueryError;

/// Field-keyed validation messages
///
/// Serializes as a plain JSON object: `{"name": ["..."], "tag_ids": ["..."]}`.
/// Keys are kept sorted so error payloads are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set holding a single message for `field`
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    /// Returns `Err(self)` when any message was recorded
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<validator::ValidationErrors> for FieldErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        for (field, errors) in errors.field_errors() {
            for error in errors.iter() {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value ({})", error.code));
                fields.add(field.to_string(), message);
            }
        }
        fields
    }
}

/// Error returned by the domain services
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Target object does not exist or is soft-deleted
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Capability check failed
    #[error(transparent)]
    Forbidden(#[from] AuthzError),

    /// Input failed validation
    #[error("validation failed on {} field(s)", .0.len())]
    Validation(FieldErrors),

    /// Invalid filter, ordering or page parameter
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Underlying store error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<FieldErrors> for ServiceError {
    fn from(errors: FieldErrors) -> Self {
        ServiceError::Validation(errors)
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ServiceError::Validation(errors.into())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Draft {
        #[validate(length(min = 1, message = "This field may not be blank."))]
        title: String,
    }

    #[test]
    fn test_field_errors_serialize_as_object() {
        let mut errors = FieldErrors::single("name", "Tag with this name already exists.");
        errors.add("name", "Ensure this field has no more than 15 characters.");
        errors.add("color", "Enter a valid hex color.");

        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["name"].as_array().unwrap().len(), 2);
        assert_eq!(json["color"][0], "Enter a valid hex color.");
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_into_result() {
        assert!(FieldErrors::new().into_result().is_ok());
        assert!(FieldErrors::single("title", "required").into_result().is_err());
    }

    #[test]
    fn test_from_validation_errors() {
        let draft = Draft {
            title: String::new(),
        };
        let errors: FieldErrors = draft.validate().unwrap_err().into();
        assert!(errors.contains("title"));
        assert_eq!(
            errors.get("title").unwrap()[0],
            "This field may not be blank."
        );
    }
}
