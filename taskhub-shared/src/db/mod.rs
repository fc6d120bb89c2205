/// Database layer for TaskHub
///
/// - `pool`: connection pool, health check and pool statistics
/// - `migrations`: embedded schema migrations
/// - `query`: soft-delete predicate, ordering, pagination and search patterns
///
/// Row types and their queries live in the crate-level `models` module.
///
/// ```no_run
/// use taskhub_shared::db::{migrations::run_migrations, pool::{create_pool, DatabaseConfig}};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::new(std::env::var("DATABASE_URL")?)).await?;
/// run_migrations(&pool).await?;
/// # Ok(())
/// # }
/// ```
pub mod migrations;
pub mod pool;
pub mod query;
