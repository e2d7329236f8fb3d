//! Forwards lifecycle events to the frontend

use sqlx_sqlite_lifecycle::{
   InitializedEvent, LifecycleObserver, ShutdownEvent, TracingObserver,
};
use tauri::{AppHandle, Emitter, Runtime};
use tracing::warn;

/// Event emitted once the database is open and answering
pub const INITIALIZED_EVENT: &str = "sqlite-lifecycle:initialized";

/// Event emitted after shutdown, with the deletion outcome
pub const SHUTDOWN_EVENT: &str = "sqlite-lifecycle:shutdown";

/// Observer that logs like [`TracingObserver`] and emits each event to the
/// frontend.
pub struct EventObserver<R: Runtime> {
   app: AppHandle<R>,
}

impl<R: Runtime> EventObserver<R> {
   pub fn new(app: AppHandle<R>) -> Self {
      Self { app }
   }
}

impl<R: Runtime> LifecycleObserver for EventObserver<R> {
   fn initialized(&self, event: &InitializedEvent) {
      TracingObserver.initialized(event);

      if let Err(e) = self.app.emit(INITIALIZED_EVENT, event) {
         warn!("Failed to emit initialized event: {}", e);
      }
   }

   fn shut_down(&self, event: &ShutdownEvent) {
      TracingObserver.shut_down(event);

      if let Err(e) = self.app.emit(SHUTDOWN_EVENT, event) {
         warn!("Failed to emit shutdown event: {}", e);
      }
   }
}
