//! Common library for the sticky-notes services
//!
//! This crate provides the storage plumbing shared by the services: the
//! PostgreSQL pool, the Redis client and their error types.
//!
//! ```rust,no_run
//! use common::database::{DatabaseConfig, ensure_schema, health_check, init_pool};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::from_env()?;
//!     let pool = init_pool(&config).await?;
//!     let is_healthy = health_check(&pool).await?;
//!     ensure_schema(&pool).await?;
//!     println!("Database health check: {}", is_healthy);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod database;
pub mod error;
