/// Database models for TaskHub
///
/// Each model owns its row type and the queries against its table. Every
/// default read of a soft-deletable model (tasks, comments, tags) goes
/// through [`crate::db::query::visible`]; the `find_by_id` functions are the
/// only lookups that bypass it.
///
/// # Models
///
/// - `user`: Accounts, credentials and the admin/superuser flags
/// - `task`: Tasks, their status/priority enums and tag links
/// - `comment`: Comments on tasks
/// - `tag`: Case-insensitively unique labels shared across tasks
///
/// # Example
///
/// ```no_run
/// use taskhub_shared::models::task::{NewTask, Task};
/// use taskhub_shared::models::user::User;
/// use taskhub_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
/// let mut tx = pool.begin().await?;
///
/// let user = User::create_user(&mut tx, "user@example.com", "Jo", None).await?;
/// let task = Task::create(&mut tx, NewTask {
///     title: "Triage inbox".to_string(),
///     ..NewTask::new(user.id)
/// }).await?;
///
/// tx.commit().await?;
/// # Ok(())
/// # }
/// ```

pub mod comment;
pub mod tag;
pub mod task;
pub mod user;
