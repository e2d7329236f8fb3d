//! # tauri-plugin-sqlite-lifecycle
//!
//! Tauri plugin that owns one SQLite database for the life of the app. The
//! database is opened at a per-OS location while the plugin is set up and is
//! closed, and optionally deleted, before the app exits.
//!
//! The lifecycle itself lives in [`sqlx_sqlite_lifecycle`]. This crate adds
//! the [`Builder`], the `execute`, `query` and `status` commands, JSON
//! conversion for parameters and rows, and the
//! [`INITIALIZED_EVENT`] / [`SHUTDOWN_EVENT`] frontend events.

use std::sync::Arc;

use sqlx_sqlite_lifecycle::{DatabaseLifecycleManager, HostEnvironment, LifecycleState};
use tauri::{Manager, RESTART_EXIT_CODE, RunEvent, Runtime, plugin::Builder as PluginBuilder};
use tracing::{debug, error, info, warn};

mod commands;
mod decode;
mod error;
mod events;
mod wrapper;

pub use decode::{bind_values, row_to_json, to_json};
pub use error::{Error, Result};
pub use events::{EventObserver, INITIALIZED_EVENT, SHUTDOWN_EVENT};
pub use sqlx_sqlite_lifecycle::LifecycleConfig;
pub use wrapper::{DatabaseStatus, DatabaseWrapper, WriteQueryResult};

/// Plugin name, also the key of its section under `plugins` in the app configuration
pub const PLUGIN_NAME: &str = "sqlite-lifecycle";

/// Builder for the SQLite lifecycle plugin.
///
/// The database is opened while the plugin is set up and closed (and, if
/// configured, deleted) when the application exits.
///
/// # Example
///
/// ```ignore
/// // Note: This example uses `ignore` instead of `no_run` because
/// // tauri::generate_context!() requires tauri.conf.json at compile time,
/// // which cannot be provided in doc test environments.
/// use tauri_plugin_sqlite_lifecycle::{Builder, LifecycleConfig};
///
/// # fn main() {
/// tauri::Builder::default()
///     .plugin(
///         Builder::new()
///             .config(LifecycleConfig {
///                 delete_on_shutdown: true,
///                 ..LifecycleConfig::named("notes")
///             })
///             .build(),
///     )
///     .run(tauri::generate_context!())
///     .expect("error while running tauri application");
/// # }
/// ```
///
/// # Example with the app configuration file
///
/// Without [`Builder::config`], the plugin reads its options from
/// `tauri.conf.json`:
///
/// ```json
/// {
///   "plugins": {
///     "sqlite-lifecycle": {
///       "name": "notes",
///       "sharedCache": true,
///       "maxOpenConnections": 4
///     }
///   }
/// }
/// ```
#[derive(Default)]
pub struct Builder {
   /// Takes precedence over the app configuration file
   config: Option<LifecycleConfig>,
}

impl Builder {
   /// Create a new builder instance.
   pub fn new() -> Self {
      Self { config: None }
   }

   /// Use `config` instead of the `plugins.sqlite-lifecycle` section of the
   /// app configuration.
   pub fn config(mut self, config: LifecycleConfig) -> Self {
      self.config = Some(config);
      self
   }

   /// Build the plugin with command registration and state management.
   pub fn build<R: Runtime>(self) -> tauri::plugin::TauriPlugin<R, Option<LifecycleConfig>> {
      PluginBuilder::<R, Option<LifecycleConfig>>::new(PLUGIN_NAME)
         .invoke_handler(tauri::generate_handler![
            commands::execute,
            commands::query,
            commands::status,
         ])
         .setup(move |app, api| {
            let config = self
               .config
               .or_else(|| api.config().clone())
               .unwrap_or_default();

            let manager =
               DatabaseLifecycleManager::with_environment(config, HostEnvironment::current());
            let observer = Arc::new(EventObserver::new(app.clone()));

            // Host startup waits for the database; a failure aborts startup
            let wrapper =
               tauri::async_runtime::block_on(DatabaseWrapper::initialize(manager, observer))?;
            app.manage(wrapper);

            debug!("SQLite lifecycle plugin initialized");
            Ok(())
         })
         .on_event(|app, event| {
            match event {
               RunEvent::ExitRequested { api, code, .. } => {
                  let Some(wrapper) = app.try_state::<DatabaseWrapper>() else {
                     return;
                  };
                  let wrapper = wrapper.inner().clone();

                  // The exit re-issued below comes back through here; let it through
                  if !wrapper.begin_shutdown() {
                     return;
                  }

                  info!("App exit requested (code: {:?}) - shutting down database", code);

                  let restarting = *code == Some(RESTART_EXIT_CODE);
                  if !restarting {
                     // Hold the exit until the pool is closed and files are removed
                     api.prevent_exit();
                  }

                  // Spawn a blocking thread to shut down
                  // (block_on panics when called from inside the runtime)
                  let handle = tauri::async_runtime::handle();
                  let cleanup_result = std::thread::spawn(move || {
                     handle.block_on(async move {
                        if let Err(e) = wrapper.shutdown().await {
                           warn!("Error shutting down database: {}", e);
                        } else {
                           debug!("Database shutdown complete");
                        }
                     })
                  })
                  .join();

                  if let Err(e) = cleanup_result {
                     error!("Database shutdown thread panicked: {:?}", e);
                  }

                  if !restarting {
                     app.exit(code.unwrap_or(0));
                  }
               }
               RunEvent::Exit => {
                  // ExitRequested should have already shut the database down
                  // This is just a safety check
                  if let Some(wrapper) = app.try_state::<DatabaseWrapper>() {
                     match wrapper.manager().try_read() {
                        Ok(manager) if manager.state() != LifecycleState::Closed => {
                           warn!(
                              "Exit event fired with database still {} - shutdown may have been skipped",
                              manager.state()
                           );
                        }
                        Ok(_) => debug!("Exit event: database already closed"),
                        Err(_) => {
                           warn!("Exit event: could not check database state (lock held - shutdown may still be in progress)");
                        }
                     }
                  }
               }
               _ => {
                  // Other events don't require action
               }
            }
         })
         .build()
   }
}

/// Initializes the plugin, reading its configuration from the app configuration file.
pub fn init<R: Runtime>() -> tauri::plugin::TauriPlugin<R, Option<LifecycleConfig>> {
   Builder::new().build()
}
