//! # TaskHub Shared Library
//!
//! Domain types, persistence and business rules used by the TaskHub API
//! server and its operator tooling.
//!
//! ## Module Organization
//!
//! - `models`: Database models and their queries
//! - `db`: Connection pooling, migrations and query composition helpers
//! - `auth`: Token handling, password hashing, principals and capability checks
//! - `services`: Authorized, transactional operations on tasks, comments and tags
//! - `error`: Error types shared by the services

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

/// Current version of the TaskHub shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
