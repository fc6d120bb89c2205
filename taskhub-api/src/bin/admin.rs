//! # TaskHub operator CLI
//!
//! ```bash
//! taskhub-admin migrate
//! taskhub-admin create-admin --password "$DEFAULT_ADMIN_PASSWORD"
//! taskhub-admin issue-token --email jane@example.com
//! ```
//!
//! Reads `DATABASE_URL` (and `JWT_SECRET` for `issue-token`) from the
//! environment or a `.env` file.

use anyhow::Context;
use chrono::Duration;
use clap::{Parser, Subcommand};
use taskhub_shared::auth::jwt::issue_token_pair_with;
use taskhub_shared::db::{
    migrations::{ensure_database_exists, get_migration_status, run_migrations},
    pool::{close_pool, create_pool, DatabaseConfig},
};
use taskhub_shared::models::user::User;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "taskhub-admin", about = "TaskHub operator tooling", version)]
struct Cli {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the database if missing, then apply pending migrations
    Migrate,

    /// Create the superuser unless one already exists
    #[command(name = "create-admin")]
    CreateAdmin {
        #[arg(long, default_value = "admin@admin.com")]
        email: String,

        #[arg(long, default_value = "Admin")]
        name: String,

        #[arg(long, env = "DEFAULT_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Print an access and refresh token for an existing user
    #[command(name = "issue-token")]
    IssueToken {
        #[arg(long)]
        email: String,

        #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
        secret: String,

        /// Access token lifetime in minutes
        #[arg(long, env = "JWT_ACCESS_TTL_MINUTES", default_value_t = 15)]
        access_ttl_minutes: i64,

        /// Refresh token lifetime in days
        #[arg(long, env = "JWT_REFRESH_TTL_DAYS", default_value_t = 7)]
        refresh_ttl_days: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "taskhub_shared=warn".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let database_url = cli
        .database_url
        .context("DATABASE_URL must be set (or pass --database-url)")?;

    if matches!(cli.command, Command::Migrate) {
        ensure_database_exists(&database_url).await?;
    }

    let pool = create_pool(DatabaseConfig::new(database_url).with_max_connections(2)).await?;

    match cli.command {
        Command::Migrate => {
            run_migrations(&pool).await?;
            let status = get_migration_status(&pool).await?;
            println!(
                "Applied {}/{} migrations (latest: {})",
                status.applied,
                status.known,
                status
                    .latest_version
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "none".to_string())
            );
        }

        Command::CreateAdmin {
            email,
            name,
            password,
        } => {
            let mut conn = pool.acquire().await?;

            if User::superuser_exists(&mut conn).await? {
                println!("Superuser already exists, skipping creation");
            } else {
                let user = User::create_superuser(&mut conn, &email, &name, &password).await?;
                println!("Superuser created successfully with email: {}", user.email);
            }
        }

        Command::IssueToken {
            email,
            secret,
            access_ttl_minutes,
            refresh_ttl_days,
        } => {
            if secret.len() < 32 {
                anyhow::bail!("JWT_SECRET must be at least 32 characters long");
            }

            let mut conn = pool.acquire().await?;
            let user = User::find_by_email(&mut conn, &email)
                .await?
                .with_context(|| format!("No user with email {}", email))?;

            let (access, refresh) = issue_token_pair_with(
                user.id,
                &secret,
                Duration::minutes(access_ttl_minutes),
                Duration::days(refresh_ttl_days),
            )?;
            User::update_last_login(&mut conn, user.id).await?;

            println!("access:  {}", access);
            println!("refresh: {}", refresh);
        }
    }

    close_pool(pool).await;
    Ok(())
}
