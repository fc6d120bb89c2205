/// User accounts
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id BIGSERIAL PRIMARY KEY,
///     uuid UUID NOT NULL UNIQUE DEFAULT gen_random_uuid(),
///     email VARCHAR(254) NOT NULL,           -- unique on LOWER(email)
///     name VARCHAR(255) NOT NULL DEFAULT '',
///     password_hash VARCHAR(255),            -- NULL = unusable password
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     is_staff BOOLEAN NOT NULL DEFAULT FALSE,
///     is_superuser BOOLEAN NOT NULL DEFAULT FALSE,
///     date_joined TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login TIMESTAMPTZ
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskhub_shared::models::user::User;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let mut conn = pool.acquire().await?;
///
/// let user = User::create_user(&mut conn, "Jane@Example.COM", "Jane", Some("pw")).await?;
/// assert_eq!(user.email, "Jane@example.com");
///
/// let admin = User::create_superuser(&mut conn, "admin@admin.com", "Admin", "pw").await?;
/// assert!(admin.is_staff && admin.is_superuser);
/// # Ok(())
/// # }
/// ```
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::auth::password::{hash_password, PasswordError};
use crate::db::query::{paginate, Page, PageRequest};
use crate::error::ServiceResult;

const USER_COLUMNS: &str = "id, uuid, email, name, password_hash, is_active, is_staff, \
                            is_superuser, date_joined, last_login";

/// User account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub uuid: Uuid,

    /// Login identity, unique regardless of case
    pub email: String,

    pub name: String,

    /// Argon2id PHC string; `None` means the password is unusable
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,

    pub is_active: bool,

    /// Admin flag
    pub is_staff: bool,

    pub is_superuser: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Input for creating a user row
#[derive(Debug, Clone, Default)]
pub struct CreateUser {
    pub email: String,
    pub name: String,
    pub password_hash: Option<String>,
    pub is_staff: bool,
    pub is_superuser: bool,
}

/// Error type for the account-creation helpers
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("The email must be set")]
    MissingEmail,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Lowercases the domain part of an address, leaving the local part intact
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

#[derive(sqlx::FromRow)]
struct CountedUser {
    #[sqlx(flatten)]
    user: User,
    total_count: i64,
}

impl User {
    /// Inserts a user row as given
    pub async fn create(conn: &mut PgConnection, data: CreateUser) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO users (email, name, password_hash, is_staff, is_superuser)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {}",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(data.email)
            .bind(data.name)
            .bind(data.password_hash)
            .bind(data.is_staff)
            .bind(data.is_superuser)
            .fetch_one(&mut *conn)
            .await
    }

    /// Creates a regular account
    ///
    /// The email domain is normalized and the password hashed; without a
    /// password the account gets an unusable one.
    pub async fn create_user(
        conn: &mut PgConnection,
        email: &str,
        name: &str,
        password: Option<&str>,
    ) -> Result<Self, AccountError> {
        Self::create_account(conn, email, name, password, false).await
    }

    /// Creates an account with both the staff and superuser flags set
    pub async fn create_superuser(
        conn: &mut PgConnection,
        email: &str,
        name: &str,
        password: &str,
    ) -> Result<Self, AccountError> {
        Self::create_account(conn, email, name, Some(password), true).await
    }

    async fn create_account(
        conn: &mut PgConnection,
        email: &str,
        name: &str,
        password: Option<&str>,
        superuser: bool,
    ) -> Result<Self, AccountError> {
        if email.trim().is_empty() {
            return Err(AccountError::MissingEmail);
        }

        let password_hash = password.map(hash_password).transpose()?;

        let user = Self::create(
            conn,
            CreateUser {
                email: normalize_email(email),
                name: name.to_string(),
                password_hash,
                is_staff: superuser,
                is_superuser: superuser,
            },
        )
        .await?;

        Ok(user)
    }

    pub async fn find_by_id(conn: &mut PgConnection, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);

        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Case-insensitive lookup by email
    pub async fn find_by_email(
        conn: &mut PgConnection,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM users WHERE LOWER(email) = LOWER($1)",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(email.trim())
            .fetch_optional(&mut *conn)
            .await
    }

    /// Loads several users at once, in no particular order
    pub async fn find_many(conn: &mut PgConnection, ids: &[i64]) -> Result<Vec<Self>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!("SELECT {} FROM users WHERE id = ANY($1)", USER_COLUMNS);

        sqlx::query_as::<_, User>(&sql)
            .bind(ids)
            .fetch_all(&mut *conn)
            .await
    }

    /// Pages through accounts ordered by id
    ///
    /// `only` restricts the listing to a single account; regular users list
    /// only themselves.
    pub async fn list(
        conn: &mut PgConnection,
        only: Option<i64>,
        page: PageRequest,
    ) -> ServiceResult<Page<Self>> {
        let sql = format!(
            "SELECT {}, COUNT(*) OVER() AS total_count
             FROM users
             WHERE ($1::BIGINT IS NULL OR id = $1)
             ORDER BY id ASC
             LIMIT $2 OFFSET $3",
            USER_COLUMNS
        );

        let rows = sqlx::query_as::<_, CountedUser>(&sql)
            .bind(only)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&mut *conn)
            .await?;

        Ok(paginate(page, rows, |r| r.total_count)?.map(|r| r.user))
    }

    /// Changes the display name
    pub async fn update_name(
        conn: &mut PgConnection,
        id: i64,
        name: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE users SET name = $2 WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(name)
            .fetch_optional(&mut *conn)
            .await
    }

    pub async fn set_active(
        conn: &mut PgConnection,
        id: i64,
        is_active: bool,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET is_active = $2 WHERE id = $1")
            .bind(id)
            .bind(is_active)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn update_last_login(conn: &mut PgConnection, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn superuser_exists(conn: &mut PgConnection) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE is_superuser)")
            .fetch_one(&mut *conn)
            .await
    }

    /// Deletes the account; tasks and comments keep their rows with the
    /// creator, updater and assignee references cleared
    pub async fn delete(conn: &mut PgConnection, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count(conn: &mut PgConnection) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&mut *conn)
            .await
    }

    /// Whether the stored password can ever match
    pub fn has_usable_password(&self) -> bool {
        self.password_hash.is_some()
    }
}
