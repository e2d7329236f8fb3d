//! # sqlx-sqlite-lifecycle
//!
//! Manages the life of a single SQLite database inside a desktop application:
//! pick an OS-specific directory, create it, open a pooled connection, ping
//! it, and optionally delete the database again on shutdown.
//!
//! ## Core Types
//!
//! - **[`DatabaseLifecycleManager`]**: Owns the connection pool from startup to shutdown
//! - **[`LifecycleConfig`]**: Construction-time options (name, directories, pool limits, deletion)
//! - **[`HostEnvironment`]**: Platform and environment variables used for default directories
//! - **[`ResolvedPath`]**: Directory, file name and connection string derived from the config
//! - **[`LifecycleObserver`]**: Receives initialization and shutdown events
//! - **[`Error`]**: Error type for lifecycle operations
//!
//! ## Default locations
//!
//! | Platform | Directory                                            | File        |
//! |----------|------------------------------------------------------|-------------|
//! | Windows  | `%APPDATA%\{name}`                                   | `{name}.db` |
//! | macOS    | `$HOME/Library/Application Support/{name}/{name}.db` | `{name}.db` |
//! | Linux    | `$HOME/.config/{name}`                               | `{name}.db` |
//!
//! A per-platform override directory replaces the default.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use sqlx_sqlite_lifecycle::{DatabaseLifecycleManager, LifecycleConfig, TracingObserver};
//!
//! #[tokio::main]
//! async fn main() -> sqlx_sqlite_lifecycle::Result<()> {
//!     let mut manager = DatabaseLifecycleManager::new(LifecycleConfig::named("notes"));
//!
//!     let pool = manager.initialize(Arc::new(TracingObserver)).await?.clone();
//!     sqlx::query("CREATE TABLE IF NOT EXISTS note (body TEXT)")
//!         .execute(&pool)
//!         .await?;
//!
//!     manager.shutdown().await?;
//!     Ok(())
//! }
//! ```
mod config;
mod error;
mod manager;
mod observer;
mod path;
mod platform;

// Re-export public types
pub use config::{
   DEFAULT_IDLE_TIMEOUT_SECS, DEFAULT_MAX_IDLE_CONNECTIONS, DEFAULT_MAX_OPEN_CONNECTIONS,
   LifecycleConfig, PoolBounds,
};
pub use error::Error;
pub use manager::{DatabaseLifecycleManager, LifecycleState, MANAGER_NAME, MEMORY_TARGET};
pub use observer::{InitializedEvent, LifecycleObserver, ShutdownEvent, TracingObserver};
pub use path::{ResolvedPath, SHARED_CACHE_MODIFIER};
pub use platform::{HostEnvironment, Platform};

/// A type alias for Results with our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
