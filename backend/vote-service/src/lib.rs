/// Vote Service Library
///
/// Lets signed-in users like, dislike or cancel their vote on a post, keeps
/// each post's like and dislike counters consistent with the stored votes, and
/// reports a caller's current vote.
///
/// # Modules
///
/// - `domain`: Vote state machine shared by every store
/// - `db`: `VoteStore` trait with PostgreSQL and in-memory implementations
/// - `services`: Vote operations with auth checks, metrics and logging
/// - `handlers`: HTTP request handlers and route table
/// - `middleware`: Bearer-token identity resolution
/// - `models`: Storage rows and API payloads
/// - `error`: Error types and handling
/// - `config`: Configuration management
/// - `metrics`: Prometheus collectors
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};

/// Embedded schema migrations, applied at startup in postgres mode
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
