//! Lifecycle notifications
//!
//! The manager never reaches for a global logger or host application. The
//! caller passes a [`LifecycleObserver`] to
//! [`DatabaseLifecycleManager::initialize`](crate::DatabaseLifecycleManager::initialize)
//! and receives events through it.

use serde::Serialize;
use tracing::{info, warn};

/// Reported once initialization has fully succeeded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializedEvent {
   /// Connection string the database was opened with, or `:memory:`
   pub path: String,
   /// Effective idle connection limit
   pub max_idle: u32,
   /// Effective open connection limit
   pub max_open: u32,
   pub in_memory: bool,
}

/// Reported when shutdown completes, whether or not deletion succeeded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShutdownEvent {
   /// Path that was (or would have been) deleted, if the database was file-backed
   #[serde(skip_serializing_if = "Option::is_none")]
   pub path: Option<String>,
   /// Whether files were removed from disk
   pub deleted: bool,
   /// Deletion failure message
   #[serde(skip_serializing_if = "Option::is_none")]
   pub error: Option<String>,
}

/// Receives lifecycle events from a [`DatabaseLifecycleManager`](crate::DatabaseLifecycleManager)
pub trait LifecycleObserver: Send + Sync {
   fn initialized(&self, event: &InitializedEvent);

   fn shut_down(&self, _event: &ShutdownEvent) {}
}

/// Observer that writes events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl LifecycleObserver for TracingObserver {
   fn initialized(&self, event: &InitializedEvent) {
      info!(
         "SQLite initialized (path: {}, idle: {}, open: {})",
         event.path, event.max_idle, event.max_open
      );
   }

   fn shut_down(&self, event: &ShutdownEvent) {
      match (&event.path, &event.error) {
         (Some(path), Some(e)) => warn!("SQLite shut down, failed to delete {}: {}", path, e),
         (Some(path), None) if event.deleted => info!("SQLite shut down, deleted {}", path),
         _ => info!("SQLite shut down"),
      }
   }
}
