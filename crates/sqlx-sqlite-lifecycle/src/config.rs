//! Configuration for a managed SQLite database

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Open connection limit used when `max_open_connections` is zero
pub const DEFAULT_MAX_OPEN_CONNECTIONS: u32 = 1;

/// Idle connection limit used when `max_idle_connections` is zero
pub const DEFAULT_MAX_IDLE_CONNECTIONS: u32 = 2;

/// Idle timeout used when `idle_timeout_secs` is not set
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 30;

/// Configuration for a [`DatabaseLifecycleManager`](crate::DatabaseLifecycleManager)
///
/// Every field is optional when deserialized. Zero connection limits mean
/// "use the default".
///
/// # Examples
///
/// ```
/// use sqlx_sqlite_lifecycle::LifecycleConfig;
///
/// // File database under the platform's default directory
/// let config = LifecycleConfig::named("notes");
///
/// // Scratch database that never touches the filesystem
/// let config = LifecycleConfig::in_memory();
///
/// // Override only what you need
/// let config = LifecycleConfig {
///     linux_dir: Some("/var/lib/notes".into()),
///     delete_on_shutdown: true,
///     ..LifecycleConfig::named("notes")
/// };
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LifecycleConfig {
   /// Database name. The file is named `{name}.db`.
   ///
   /// Required unless `in_memory` is set.
   pub name: String,

   /// Open an in-memory database instead of a file. All directory and
   /// deletion options are ignored.
   pub in_memory: bool,

   /// Directory used on macOS instead of the default location
   pub mac_dir: Option<String>,

   /// Directory used on Windows instead of the default location
   pub windows_dir: Option<String>,

   /// Directory used on Linux instead of the default location
   pub linux_dir: Option<String>,

   /// Remove the database when the manager shuts down
   pub delete_on_shutdown: bool,

   /// When deleting, remove the whole database directory instead of only
   /// the database file
   #[serde(rename = "deleteDir")]
   pub delete_entire_directory: bool,

   /// Open the database with `?cache=shared`
   pub shared_cache: bool,

   /// Maximum number of open connections
   ///
   /// Default: 1
   pub max_open_connections: u32,

   /// Maximum number of idle connections kept open
   ///
   /// Default: 2
   pub max_idle_connections: u32,

   /// Seconds before a connection above the idle limit is closed
   ///
   /// Default: 30
   pub idle_timeout_secs: Option<u64>,
}

impl LifecycleConfig {
   /// Configuration for a file database with the given name and defaults
   /// for everything else.
   pub fn named(name: impl Into<String>) -> Self {
      Self {
         name: name.into(),
         ..Default::default()
      }
   }

   /// Configuration for an in-memory database.
   pub fn in_memory() -> Self {
      Self {
         in_memory: true,
         ..Default::default()
      }
   }

   /// Effective pool limits after applying defaults.
   pub fn pool_bounds(&self) -> PoolBounds {
      PoolBounds::new(self.max_open_connections, self.max_idle_connections)
   }

   pub(crate) fn idle_timeout(&self) -> Duration {
      Duration::from_secs(self.idle_timeout_secs.unwrap_or(DEFAULT_IDLE_TIMEOUT_SECS))
   }
}

/// Connection pool limits with defaults applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolBounds {
   /// Maximum number of open connections (never zero)
   pub max_open: u32,
   /// Maximum number of idle connections (never zero)
   pub max_idle: u32,
}

impl PoolBounds {
   /// Build bounds from raw configured values, replacing zero with the defaults.
   pub fn new(max_open: u32, max_idle: u32) -> Self {
      Self {
         max_open: if max_open == 0 {
            DEFAULT_MAX_OPEN_CONNECTIONS
         } else {
            max_open
         },
         max_idle: if max_idle == 0 {
            DEFAULT_MAX_IDLE_CONNECTIONS
         } else {
            max_idle
         },
      }
   }

   /// Number of connections the pool keeps open while idle.
   ///
   /// An idle limit above the open limit is capped to the open limit.
   pub fn retained_idle(&self) -> u32 {
      self.max_idle.min(self.max_open)
   }
}
