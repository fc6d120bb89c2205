//! # TaskHub API Server Library
//!
//! HTTP surface of TaskHub: configuration, router, middleware, request
//! extractors, response representations and route handlers. Business rules
//! live in `taskhub_shared::services`.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: Extractors that reject with the JSON error format
//! - `middleware`: Authentication and security headers
//! - `routes`: API route handlers
//! - `views`: Response representations

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
pub mod views;
