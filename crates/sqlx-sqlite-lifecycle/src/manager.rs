//! The database lifecycle: resolve, create, open, verify, and tear down

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use sqlx::sqlite::{
   SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteQueryResult,
   SqliteRow,
};
use sqlx::Connection;
use tracing::{debug, error};

use crate::Result;
use crate::config::{LifecycleConfig, PoolBounds};
use crate::error::Error;
use crate::observer::{InitializedEvent, LifecycleObserver, ShutdownEvent, TracingObserver};
use crate::path::ResolvedPath;
use crate::platform::HostEnvironment;

/// Target reported for in-memory databases
pub const MEMORY_TARGET: &str = ":memory:";

/// Identifier returned by [`DatabaseLifecycleManager::name`]
pub const MANAGER_NAME: &str = "sqlx-sqlite-lifecycle";

/// Where a [`DatabaseLifecycleManager`] is in its life
///
/// ```text
/// Uninitialized ──initialize──▶ Initializing ──ok──▶ Ready ──shutdown──▶ ShuttingDown ──▶ Closed
///       ▲                            │
///       └──────────── error ─────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LifecycleState {
   Uninitialized,
   Initializing,
   Ready,
   ShuttingDown,
   Closed,
}

impl fmt::Display for LifecycleState {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str(match self {
         LifecycleState::Uninitialized => "uninitialized",
         LifecycleState::Initializing => "initializing",
         LifecycleState::Ready => "ready",
         LifecycleState::ShuttingDown => "shutting down",
         LifecycleState::Closed => "closed",
      })
   }
}

/// Owns a single SQLite connection pool from startup to shutdown.
///
/// The manager is driven by the host application: [`initialize`](Self::initialize)
/// once at startup and [`shutdown`](Self::shutdown) once at exit. In between,
/// [`execute`](Self::execute) and [`query`](Self::query) pass statements
/// straight to the pool and may run concurrently through a shared reference.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use sqlx::sqlite::SqliteArguments;
/// use sqlx_sqlite_lifecycle::{DatabaseLifecycleManager, LifecycleConfig, TracingObserver};
///
/// # async fn example() -> sqlx_sqlite_lifecycle::Result<()> {
/// let mut manager = DatabaseLifecycleManager::new(LifecycleConfig {
///     delete_on_shutdown: true,
///     ..LifecycleConfig::named("notes")
/// });
///
/// manager.initialize(Arc::new(TracingObserver)).await?;
///
/// manager
///     .execute("CREATE TABLE note (body TEXT)", SqliteArguments::default())
///     .await?;
/// let rows = manager
///     .query("SELECT body FROM note", SqliteArguments::default())
///     .await?;
/// assert!(rows.is_empty());
///
/// manager.shutdown().await?;
/// # Ok(())
/// # }
/// ```
pub struct DatabaseLifecycleManager {
   config: LifecycleConfig,
   env: HostEnvironment,
   state: LifecycleState,
   pool: Option<SqlitePool>,
   resolved: Option<ResolvedPath>,
   bounds: Option<PoolBounds>,
   observer: Arc<dyn LifecycleObserver>,
}

/// Pool and location produced by a successful open
struct Opened {
   pool: SqlitePool,
   resolved: Option<ResolvedPath>,
   bounds: PoolBounds,
   target: String,
}

impl DatabaseLifecycleManager {
   /// Create a manager for the running platform and process environment.
   pub fn new(config: LifecycleConfig) -> Self {
      Self::with_environment(config, HostEnvironment::current())
   }

   /// Create a manager that resolves default directories against `env`.
   pub fn with_environment(config: LifecycleConfig, env: HostEnvironment) -> Self {
      Self {
         config,
         env,
         state: LifecycleState::Uninitialized,
         pool: None,
         resolved: None,
         bounds: None,
         observer: Arc::new(TracingObserver),
      }
   }

   /// Fixed identifier for host registration
   pub fn name(&self) -> &'static str {
      MANAGER_NAME
   }

   pub fn config(&self) -> &LifecycleConfig {
      &self.config
   }

   pub fn state(&self) -> LifecycleState {
      self.state
   }

   /// Location of the database file, once initialized with a file database
   pub fn resolved_path(&self) -> Option<&ResolvedPath> {
      self.resolved.as_ref()
   }

   /// Effective pool limits, once initialized
   pub fn pool_bounds(&self) -> Option<PoolBounds> {
      self.bounds
   }

   /// Open the database and verify it answers.
   ///
   /// In-memory configurations skip every directory option. File
   /// configurations resolve the platform directory, create it, open
   /// `{name}.db` inside it and ping the connection.
   ///
   /// `observer` receives the [`InitializedEvent`] on success and the
   /// [`ShutdownEvent`] later on.
   ///
   /// On error the manager is left [`Uninitialized`](LifecycleState::Uninitialized)
   /// with nothing retained, so initialization can be retried. An
   /// initialization that was interrupted (its future dropped) can also be
   /// retried.
   pub async fn initialize(&mut self, observer: Arc<dyn LifecycleObserver>) -> Result<&SqlitePool> {
      if !matches!(
         self.state,
         LifecycleState::Uninitialized | LifecycleState::Initializing
      ) {
         return Err(Error::InvalidState {
            operation: "initialize",
            state: self.state,
         });
      }

      self.state = LifecycleState::Initializing;

      let opened = if self.config.in_memory {
         open_memory(&self.config).await
      } else {
         open_file(&self.config, &self.env).await
      };

      let opened = match opened {
         Ok(opened) => opened,
         Err(e) => {
            self.state = LifecycleState::Uninitialized;
            return Err(e);
         }
      };

      let event = InitializedEvent {
         path: opened.target,
         max_idle: opened.bounds.max_idle,
         max_open: opened.bounds.max_open,
         in_memory: self.config.in_memory,
      };

      self.resolved = opened.resolved;
      self.bounds = Some(opened.bounds);
      self.observer = observer;
      self.state = LifecycleState::Ready;
      self.observer.initialized(&event);

      Ok(&*self.pool.insert(opened.pool))
   }

   /// Close the pool and, when configured, delete the database from disk.
   ///
   /// Runs once: after the first call the manager is
   /// [`Closed`](LifecycleState::Closed) and further calls succeed without
   /// doing anything. A manager that never finished initializing closes
   /// without touching the filesystem.
   ///
   /// The pool is closed before any file is removed. With
   /// `delete_entire_directory` the whole database directory is removed,
   /// otherwise only the database file and its `-wal`, `-shm` and
   /// `-journal` companions. Files that are already gone are not an error.
   pub async fn shutdown(&mut self) -> Result<()> {
      match self.state {
         LifecycleState::Ready => {}
         LifecycleState::Closed | LifecycleState::ShuttingDown => {
            debug!("Shutdown requested for database that is already {}", self.state);
            return Ok(());
         }
         LifecycleState::Uninitialized | LifecycleState::Initializing => {
            debug!("Shutdown requested before initialization completed");
            self.state = LifecycleState::Closed;
            return Ok(());
         }
      }

      self.state = LifecycleState::ShuttingDown;

      if let Some(pool) = self.pool.take() {
         pool.close().await;
      }

      let target = self.deletion_target();
      let result = match &target {
         Some(DeletionTarget::Directory(dir)) => remove_directory(dir).await,
         Some(DeletionTarget::File(file)) => remove_database_file(file).await,
         None => Ok(()),
      };

      self.state = LifecycleState::Closed;

      let event = ShutdownEvent {
         path: target.as_ref().map(|t| t.path().to_string_lossy().into_owned()),
         deleted: target.is_some() && result.is_ok(),
         error: result.as_ref().err().map(|e| e.to_string()),
      };
      self.observer.shut_down(&event);

      if let Err(e) = &result {
         error!("{}", e);
      }

      result
   }

   /// Replace the active pool with one created elsewhere.
   ///
   /// The previous pool is handed back so the caller decides whether to
   /// close it; clones of it may still be in use. A closed pool is rejected
   /// with [`Error::NilHandle`].
   pub fn set_connection(&mut self, pool: SqlitePool) -> Result<Option<SqlitePool>> {
      if pool.is_closed() {
         return Err(Error::NilHandle);
      }

      if self.state != LifecycleState::Ready {
         return Err(Error::InvalidState {
            operation: "set the connection",
            state: self.state,
         });
      }

      Ok(self.pool.replace(pool))
   }

   /// Borrow the active pool.
   pub fn connection(&self) -> Result<&SqlitePool> {
      self.ready_pool("access the connection")
   }

   /// Run a statement that does not return rows.
   ///
   /// This is a direct passthrough: no validation, retry or batching.
   pub async fn execute<'q>(
      &self,
      statement: &'q str,
      args: SqliteArguments<'q>,
   ) -> Result<SqliteQueryResult> {
      let pool = self.ready_pool("execute")?;
      Ok(sqlx::query_with(statement, args).execute(pool).await?)
   }

   /// Run a statement and collect every returned row.
   ///
   /// This is a direct passthrough: no validation, retry or batching.
   pub async fn query<'q>(
      &self,
      statement: &'q str,
      args: SqliteArguments<'q>,
   ) -> Result<Vec<SqliteRow>> {
      let pool = self.ready_pool("query")?;
      Ok(sqlx::query_with(statement, args).fetch_all(pool).await?)
   }

   fn ready_pool(&self, operation: &'static str) -> Result<&SqlitePool> {
      match (&self.state, &self.pool) {
         (LifecycleState::Ready, Some(pool)) => Ok(pool),
         _ => Err(Error::InvalidState {
            operation,
            state: self.state,
         }),
      }
   }

   fn deletion_target(&self) -> Option<DeletionTarget> {
      if !self.config.delete_on_shutdown || self.config.in_memory {
         return None;
      }

      let resolved = self.resolved.as_ref()?;
      if self.config.delete_entire_directory {
         Some(DeletionTarget::Directory(resolved.directory().to_path_buf()))
      } else {
         Some(DeletionTarget::File(resolved.file_path()))
      }
   }
}

impl fmt::Debug for DatabaseLifecycleManager {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("DatabaseLifecycleManager")
         .field("config", &self.config)
         .field("env", &self.env)
         .field("state", &self.state)
         .field("resolved", &self.resolved)
         .field("bounds", &self.bounds)
         .finish_non_exhaustive()
   }
}

enum DeletionTarget {
   File(PathBuf),
   Directory(PathBuf),
}

impl DeletionTarget {
   fn path(&self) -> &Path {
      match self {
         DeletionTarget::File(path) | DeletionTarget::Directory(path) => path,
      }
   }
}

async fn open_memory(config: &LifecycleConfig) -> Result<Opened> {
   debug!("Opening in-memory database");

   let bounds = config.pool_bounds();
   let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(Error::Connection)?;

   // The database lives only as long as one of its connections, so keep one
   // open for the lifetime of the pool
   let pool = SqlitePoolOptions::new()
      .max_connections(bounds.max_open)
      .min_connections(1)
      .idle_timeout(None)
      .max_lifetime(None)
      .connect_with(options)
      .await
      .map_err(Error::Connection)?;

   verify(pool, bounds, None, MEMORY_TARGET.to_string()).await
}

async fn open_file(config: &LifecycleConfig, env: &HostEnvironment) -> Result<Opened> {
   let resolved = ResolvedPath::resolve(config, env)?;

   let directory = resolved.directory();
   debug!("Creating database directory {}", directory.display());
   tokio::fs::create_dir_all(directory)
      .await
      .map_err(|source| Error::Directory {
         path: directory.to_path_buf(),
         source,
      })?;

   let target = resolved.connection_string();
   debug!("Opening database {}", target);

   let options = resolved.connect_options();
   let bounds = config.pool_bounds();

   let pool = SqlitePoolOptions::new()
      .max_connections(bounds.max_open)
      .min_connections(bounds.retained_idle())
      .idle_timeout(Some(config.idle_timeout()))
      .connect_with(options)
      .await
      .map_err(Error::Connection)?;

   verify(pool, bounds, Some(resolved), target).await
}

/// Ping the pool; close it again if it does not answer.
async fn verify(
   pool: SqlitePool,
   bounds: PoolBounds,
   resolved: Option<ResolvedPath>,
   target: String,
) -> Result<Opened> {
   if let Err(e) = ping(&pool).await {
      pool.close().await;
      return Err(e);
   }

   Ok(Opened {
      pool,
      resolved,
      bounds,
      target,
   })
}

async fn ping(pool: &SqlitePool) -> Result<()> {
   let mut conn = pool.acquire().await.map_err(Error::Connectivity)?;
   conn.ping().await.map_err(Error::Connectivity)
}

async fn remove_directory(dir: &Path) -> Result<()> {
   debug!("Removing database directory {}", dir.display());
   match tokio::fs::remove_dir_all(dir).await {
      Err(e) if e.kind() != ErrorKind::NotFound => Err(Error::Deletion {
         path: dir.to_path_buf(),
         source: e,
      }),
      _ => Ok(()),
   }
}

async fn remove_database_file(file: &Path) -> Result<()> {
   debug!("Removing database file {}", file.display());

   // Journal files only exist for some journal modes
   let companions = [
      file.to_path_buf(),
      file.with_extension("db-wal"),
      file.with_extension("db-shm"),
      file.with_extension("db-journal"),
   ];

   for path in companions {
      if let Err(e) = tokio::fs::remove_file(&path).await
         && e.kind() != ErrorKind::NotFound
      {
         return Err(Error::Deletion { path, source: e });
      }
   }

   Ok(())
}

#[cfg(test)]
mod tests {
   use super::*;
   use crate::platform::Platform;
   use std::sync::Mutex;
   use tempfile::TempDir;

   #[derive(Default)]
   struct RecordingObserver {
      initialized: Mutex<Vec<InitializedEvent>>,
      shut_down: Mutex<Vec<ShutdownEvent>>,
   }

   impl LifecycleObserver for RecordingObserver {
      fn initialized(&self, event: &InitializedEvent) {
         self.initialized.lock().unwrap().push(event.clone());
      }

      fn shut_down(&self, event: &ShutdownEvent) {
         self.shut_down.lock().unwrap().push(event.clone());
      }
   }

   fn linux_home(home: &Path) -> HostEnvironment {
      HostEnvironment::fixed(Platform::Linux, [("HOME", home.as_os_str())])
   }

   #[test]
   fn test_state_display() {
      assert_eq!(LifecycleState::ShuttingDown.to_string(), "shutting down");
      assert_eq!(LifecycleState::Ready.to_string(), "ready");
   }

   #[test]
   fn test_name_is_fixed() {
      let manager = DatabaseLifecycleManager::new(LifecycleConfig::in_memory());
      assert_eq!(manager.name(), "sqlx-sqlite-lifecycle");
   }

   #[tokio::test]
   async fn test_initialized_event_reports_path_and_bounds() {
      let home = TempDir::new().unwrap();
      let observer = Arc::new(RecordingObserver::default());
      let mut manager =
         DatabaseLifecycleManager::with_environment(LifecycleConfig::named("app"), linux_home(home.path()));

      manager.initialize(observer.clone()).await.unwrap();

      let events = observer.initialized.lock().unwrap().clone();
      let expected_path = home.path().join(".config").join("app").join("app.db");
      assert_eq!(
         events,
         vec![InitializedEvent {
            path: expected_path.to_string_lossy().into_owned(),
            max_idle: 2,
            max_open: 1,
            in_memory: false,
         }]
      );

      manager.shutdown().await.unwrap();
   }

   #[tokio::test]
   async fn test_shutdown_event_reports_deleted_file() {
      let home = TempDir::new().unwrap();
      let observer = Arc::new(RecordingObserver::default());
      let config = LifecycleConfig {
         delete_on_shutdown: true,
         ..LifecycleConfig::named("app")
      };
      let mut manager = DatabaseLifecycleManager::with_environment(config, linux_home(home.path()));

      manager.initialize(observer.clone()).await.unwrap();
      manager.shutdown().await.unwrap();

      let events = observer.shut_down.lock().unwrap().clone();
      assert_eq!(events.len(), 1);
      assert!(events[0].deleted);
      assert!(events[0].error.is_none());
      assert!(events[0].path.as_deref().unwrap().ends_with("app.db"));
   }

   #[tokio::test]
   async fn test_initialize_twice_is_invalid() {
      let mut manager = DatabaseLifecycleManager::new(LifecycleConfig::in_memory());
      manager.initialize(Arc::new(TracingObserver)).await.unwrap();

      let err = manager.initialize(Arc::new(TracingObserver)).await.unwrap_err();
      assert!(matches!(
         err,
         Error::InvalidState {
            operation: "initialize",
            state: LifecycleState::Ready
         }
      ));

      manager.shutdown().await.unwrap();
   }

   #[tokio::test]
   async fn test_failed_ping_is_connectivity_error() {
      let pool = SqlitePoolOptions::new()
         .connect("sqlite::memory:")
         .await
         .unwrap();
      pool.close().await;

      let err = match verify(pool.clone(), PoolBounds::new(0, 0), None, MEMORY_TARGET.into()).await {
         Ok(_) => panic!("closed pool answered the ping"),
         Err(e) => e,
      };
      assert!(matches!(err, Error::Connectivity(_)));
      assert_eq!(err.error_code(), "CONNECTIVITY_ERROR");
      assert!(pool.is_closed());
   }

   #[tokio::test]
   async fn test_failed_initialize_keeps_nothing() {
      let home = TempDir::new().unwrap();
      let dir = home.path().join("data");
      std::fs::create_dir_all(dir.join("app.db")).unwrap();

      let config = LifecycleConfig {
         linux_dir: Some(dir.to_string_lossy().into_owned()),
         ..LifecycleConfig::named("app")
      };
      let observer = Arc::new(RecordingObserver::default());
      let mut manager = DatabaseLifecycleManager::with_environment(config, linux_home(home.path()));

      let err = manager.initialize(observer.clone()).await.unwrap_err();
      assert!(matches!(err, Error::Connection(_)));
      assert_eq!(manager.state(), LifecycleState::Uninitialized);
      assert!(manager.pool.is_none());
      assert!(manager.resolved.is_none());
      assert!(manager.bounds.is_none());
      assert!(observer.initialized.lock().unwrap().is_empty());
   }

   #[tokio::test]
   async fn test_shutdown_before_initialize_closes() {
      let mut manager = DatabaseLifecycleManager::new(LifecycleConfig::named("never-opened"));
      manager.shutdown().await.unwrap();
      assert_eq!(manager.state(), LifecycleState::Closed);
   }
}
