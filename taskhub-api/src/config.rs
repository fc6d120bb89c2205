/// Configuration management for the API server
///
/// Configuration comes from environment variables, with a `.env` file loaded
/// first when present.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `API_HOST` / `API_PORT`: Bind address (default: 0.0.0.0:8080)
/// - `API_CORS_ORIGINS`: Comma-separated allowed origins, `*` for any (default: `*`)
/// - `API_PRODUCTION`: Enables HSTS (default: false)
/// - `API_PUBLIC_URL`: Base URL used in user links (default: http://localhost:8080)
/// - `JWT_SECRET`: HS256 signing secret, at least 32 characters (required)
/// - `JWT_ACCESS_TTL_MINUTES`: Access token lifetime (default: 15)
/// - `JWT_REFRESH_TTL_DAYS`: Refresh token lifetime (default: 7)
/// - `JWT_COOKIE_NAME`: Session cookie carrying the access token (default: tasks_cookie)
/// - `LOG_FORMAT`: `json` for JSON logs, anything else for human-readable output
///
/// # Example
///
/// ```no_run
/// use taskhub_api::config::Config;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}:{}", config.api.host, config.api.port);
/// # Ok(())
/// # }
/// ```
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

use taskhub_shared::auth::middleware::DEFAULT_COOKIE_NAME;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub log: LogConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `*` allows any origin
    pub cors_origins: Vec<String>,

    /// Adds HSTS to the security headers
    pub production: bool,

    /// Externally visible base URL, without a trailing slash
    pub public_url: String,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// HS256 signing secret
    ///
    /// Must be kept secret and be at least 32 characters.
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,

    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,

    /// Session cookie consulted when no `Authorization` header is sent
    pub cookie_name: String,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub format: LogFormat,
}

fn var_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value: {}", name, e)),
        _ => Ok(default),
    }
}

fn string_or(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Splits a comma-separated origin list
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `DATABASE_URL` or `JWT_SECRET` is missing
    /// - `JWT_SECRET` is shorter than 32 characters
    /// - A numeric or boolean variable does not parse
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let format = if string_or("LOG_FORMAT", "pretty").eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        };

        Ok(Self {
            api: ApiConfig {
                host: string_or("API_HOST", "0.0.0.0"),
                port: var_or("API_PORT", 8080)?,
                cors_origins: parse_origins(&string_or("API_CORS_ORIGINS", "*")),
                production: var_or("API_PRODUCTION", false)?,
                public_url: string_or("API_PUBLIC_URL", "http://localhost:8080")
                    .trim_end_matches('/')
                    .to_string(),
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: var_or("DATABASE_MAX_CONNECTIONS", 10)?,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                access_ttl_minutes: var_or("JWT_ACCESS_TTL_MINUTES", 15)?,
                refresh_ttl_days: var_or("JWT_REFRESH_TTL_DAYS", 7)?,
                cookie_name: string_or("JWT_COOKIE_NAME", DEFAULT_COOKIE_NAME),
            },
            log: LogConfig { format },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Whether any origin is allowed
    pub fn cors_permissive(&self) -> bool {
        self.api.cors_origins.is_empty() || self.api.cors_origins.iter().any(|o| o == "*")
    }

    /// Configuration for tests and local tooling
    pub fn for_tests(database_url: impl Into<String>, jwt_secret: impl Into<String>) -> Self {
        Self {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                cors_origins: vec!["*".to_string()],
                production: false,
                public_url: "http://testserver".to_string(),
            },
            database: DatabaseConfig {
                url: database_url.into(),
                max_connections: 5,
            },
            jwt: JwtConfig {
                secret: jwt_secret.into(),
                access_ttl_minutes: 15,
                refresh_ttl_days: 7,
                cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            },
            log: LogConfig {
                format: LogFormat::Pretty,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::for_tests(
            "postgresql://localhost/test",
            "test-secret-key-at-least-32-bytes-long",
        )
    }

    #[test]
    fn test_bind_address() {
        assert_eq!(config().bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins("https://a.example, https://b.example,,"),
            vec!["https://a.example", "https://b.example"]
        );
        assert_eq!(parse_origins("*"), vec!["*"]);
        assert!(parse_origins("").is_empty());
    }

    #[test]
    fn test_cors_permissive() {
        let mut config = config();
        assert!(config.cors_permissive());

        config.api.cors_origins = vec!["https://app.example".to_string()];
        assert!(!config.cors_permissive());
    }

    #[test]
    fn test_default_cookie_name() {
        assert_eq!(config().jwt.cookie_name, "tasks_cookie");
    }
}
