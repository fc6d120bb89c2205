/// Request extractors with API-shaped rejections
///
/// The stock axum extractors reject with plain-text bodies. These wrappers
/// route every rejection through [`ApiError`] so clients always receive the
/// JSON error format.
use axum::{
    extract::{FromRequest, FromRequestParts, Path, Query},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::ApiError;
use taskhub_shared::error::FieldErrors;

/// JSON body extractor and response
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl<T: Serialize> IntoResponse for ApiJson<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Path parameter extractor; malformed ids answer 404
#[derive(FromRequestParts)]
#[from_request(via(Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// Query string extractor
#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Raw query pairs, keeping repeated keys
///
/// Built from `ApiQuery<Vec<(String, String)>>`.
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    /// Last non-blank value for `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(key, value)| key == name && !value.trim().is_empty())
            .map(|(_, value)| value.trim())
    }

    /// Last value for `name` exactly as sent, blank or not
    pub fn raw(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Every non-blank value for `name`, in order
    pub fn all(&self, name: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(key, value)| key == name && !value.trim().is_empty())
            .map(|(_, value)| value.trim())
            .collect()
    }

    /// Parses an integer parameter, recording a field error when malformed
    pub fn int(&self, name: &str, errors: &mut FieldErrors) -> Option<i64> {
        let raw = self.get(name)?;
        match raw.parse::<i64>() {
            Ok(value) => Some(value),
            Err(_) => {
                errors.add(name, "Enter a whole number.");
                None
            }
        }
    }

    /// Parses every value of a repeated integer parameter
    pub fn ints(&self, name: &str, errors: &mut FieldErrors) -> Vec<i64> {
        let mut values = Vec::new();
        for raw in self.all(name) {
            match raw.parse::<i64>() {
                Ok(value) => values.push(value),
                Err(_) => errors.add(name, "Enter a whole number."),
            }
        }
        values
    }
}
