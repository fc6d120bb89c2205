/// API route handlers, organized by resource
///
/// - `health`: Health check (public)
/// - `users`: Account listing, detail and name changes
/// - `tasks`: Task CRUD plus the assign and status actions
/// - `comments`: Comment CRUD
/// - `tags`: Tag listing, autocomplete, and staff-only create/delete

pub mod comments;
pub mod health;
pub mod tags;
pub mod tasks;
pub mod users;
