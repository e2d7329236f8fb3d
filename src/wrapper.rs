use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx_sqlite_lifecycle::{
   DatabaseLifecycleManager, LifecycleObserver, LifecycleState, MEMORY_TARGET,
};
use tokio::sync::RwLock;

use crate::Error;
use crate::decode::{bind_values, row_to_json};

/// Result returned from write operations (e.g. INSERT, UPDATE, DELETE).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteQueryResult {
   /// The number of rows affected by the write operation.
   pub rows_affected: u64,
   /// The last inserted row ID (SQLite ROWID).
   ///
   /// Only set for INSERT operations on tables with a ROWID.
   /// Tables created with `WITHOUT ROWID` will not set this value (returns 0).
   pub last_insert_id: i64,
}

/// Snapshot of the managed database, as reported to the frontend.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseStatus {
   pub state: LifecycleState,
   /// Connection string of a file database, or `:memory:`. Absent before
   /// initialization.
   #[serde(skip_serializing_if = "Option::is_none")]
   pub path: Option<String>,
   #[serde(skip_serializing_if = "Option::is_none")]
   pub max_open: Option<u32>,
   #[serde(skip_serializing_if = "Option::is_none")]
   pub max_idle: Option<u32>,
   pub in_memory: bool,
}

/// Wrapper around [`DatabaseLifecycleManager`] that adapts it for the plugin interface
///
/// Commands share the manager through a read lock, so queries run
/// concurrently up to the pool's open connection limit. Shutdown takes the
/// write lock.
#[derive(Clone)]
pub struct DatabaseWrapper {
   manager: Arc<RwLock<DatabaseLifecycleManager>>,
   shutdown_started: Arc<AtomicBool>,
}

impl DatabaseWrapper {
   /// Initialize `manager` and wrap it.
   pub async fn initialize(
      mut manager: DatabaseLifecycleManager,
      observer: Arc<dyn LifecycleObserver>,
   ) -> Result<Self, Error> {
      manager.initialize(observer).await?;
      Ok(Self::from_manager(manager))
   }

   /// Wrap a manager as-is, whatever its state.
   pub fn from_manager(manager: DatabaseLifecycleManager) -> Self {
      Self {
         manager: Arc::new(RwLock::new(manager)),
         shutdown_started: Arc::new(AtomicBool::new(false)),
      }
   }

   /// Shared handle to the manager for advanced usage
   pub fn manager(&self) -> &Arc<RwLock<DatabaseLifecycleManager>> {
      &self.manager
   }

   /// Execute a write query (INSERT, UPDATE, DELETE, DDL, ...).
   ///
   /// # Example
   ///
   /// ```no_run
   /// # use tauri_plugin_sqlite_lifecycle::DatabaseWrapper;
   /// # use serde_json::json;
   /// # async fn example(db: &DatabaseWrapper) -> Result<(), tauri_plugin_sqlite_lifecycle::Error> {
   /// let result = db
   ///    .execute("INSERT INTO users (name) VALUES (?)".into(), vec![json!("Alice")])
   ///    .await?;
   /// println!("Inserted row {}", result.last_insert_id);
   /// # Ok(())
   /// # }
   /// ```
   pub async fn execute(
      &self,
      query: String,
      values: Vec<JsonValue>,
   ) -> Result<WriteQueryResult, Error> {
      let args = bind_values(values)?;
      let manager = self.manager.read().await;
      let result = manager.execute(&query, args).await?;

      Ok(WriteQueryResult {
         rows_affected: result.rows_affected(),
         last_insert_id: result.last_insert_rowid(),
      })
   }

   /// Execute a query and return every row as a column-ordered JSON map.
   pub async fn query(
      &self,
      query: String,
      values: Vec<JsonValue>,
   ) -> Result<Vec<IndexMap<String, JsonValue>>, Error> {
      let args = bind_values(values)?;
      let manager = self.manager.read().await;
      let rows = manager.query(&query, args).await?;

      rows.iter().map(row_to_json).collect()
   }

   /// Current lifecycle state, location and pool limits.
   pub async fn status(&self) -> DatabaseStatus {
      let manager = self.manager.read().await;
      let in_memory = manager.config().in_memory;

      let path = match manager.resolved_path() {
         Some(resolved) => Some(resolved.connection_string()),
         None if in_memory && manager.pool_bounds().is_some() => Some(MEMORY_TARGET.to_string()),
         None => None,
      };
      let bounds = manager.pool_bounds();

      DatabaseStatus {
         state: manager.state(),
         path,
         max_open: bounds.map(|b| b.max_open),
         max_idle: bounds.map(|b| b.max_idle),
         in_memory,
      }
   }

   /// Shut the manager down: close the pool and apply the deletion settings.
   pub async fn shutdown(&self) -> Result<(), Error> {
      self.shutdown_started.store(true, Ordering::SeqCst);
      let mut manager = self.manager.write().await;
      Ok(manager.shutdown().await?)
   }

   /// Claim the exit-time shutdown. Returns `false` if it was already claimed.
   pub(crate) fn begin_shutdown(&self) -> bool {
      !self.shutdown_started.swap(true, Ordering::SeqCst)
   }
}
