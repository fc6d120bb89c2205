/// Domain services
///
/// A service method is one logical operation: it authorizes the principal,
/// loads (and for mutations, locks) the target, validates the input and
/// writes, all inside a single transaction. Dropping the transaction on an
/// early return rolls everything back.
///
/// Evaluation order for object mutations:
///
/// ```text
/// active check (403) → lookup (404) → creator/admin check (403) → validation (400) → write
/// ```
///
/// Authentication (401) has already happened in the HTTP layer.
use serde::{Deserialize, Deserializer};

pub mod comments;
pub mod tags;
pub mod tasks;
pub mod users;

pub use comments::CommentService;
pub use tags::TagService;
pub use tasks::TaskService;
pub use users::UserService;

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";

/// Message for a reference to a missing related object
pub fn does_not_exist(id: i64) -> String {
    format!("Invalid pk \"{}\" - object does not exist.", id)
}

/// Full replacement (PUT) or partial update (PATCH)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Full,
    Partial,
}

impl WriteMode {
    pub fn is_partial(self) -> bool {
        self == WriteMode::Partial
    }
}

/// Distinguishes an explicit `null` from an absent field
///
/// Use with `#[serde(default, deserialize_with = "deserialize_some")]` on an
/// `Option<Option<T>>`: absent → `None`, `null` → `Some(None)`.
pub fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Records a blank or missing required string field
pub(crate) fn check_text(
    errors: &mut crate::error::FieldErrors,
    field: &str,
    value: Option<&str>,
    required: bool,
) {
    match value {
        Some(text) if text.trim().is_empty() => errors.add(field, BLANK),
        None if required => errors.add(field, REQUIRED),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FieldErrors;

    #[derive(Deserialize)]
    struct DueField {
        #[serde(default, deserialize_with = "deserialize_some")]
        due: Option<Option<i64>>,
    }

    #[test]
    fn test_deserialize_some_distinguishes_null() {
        let absent: DueField = serde_json::from_str("{}").unwrap();
        let null: DueField = serde_json::from_str(r#"{"due": null}"#).unwrap();
        let set: DueField = serde_json::from_str(r#"{"due": 5}"#).unwrap();

        assert_eq!(absent.due, None);
        assert_eq!(null.due, Some(None));
        assert_eq!(set.due, Some(Some(5)));
    }

    #[test]
    fn test_check_text() {
        let mut errors = FieldErrors::new();
        check_text(&mut errors, "title", None, true);
        check_text(&mut errors, "content", Some("   "), false);
        check_text(&mut errors, "description", None, false);
        check_text(&mut errors, "name", Some("ok"), true);

        assert_eq!(errors.get("title").unwrap()[0], REQUIRED);
        assert_eq!(errors.get("content").unwrap()[0], BLANK);
        assert!(!errors.contains("description"));
        assert!(!errors.contains("name"));
    }

    #[test]
    fn test_does_not_exist_message() {
        assert_eq!(does_not_exist(7), "Invalid pk \"7\" - object does not exist.");
    }
}
