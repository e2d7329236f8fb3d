//! Error types for sqlx-sqlite-lifecycle

use std::path::PathBuf;

use thiserror::Error;

use crate::manager::LifecycleState;

/// Errors that may occur while initializing, using, or shutting down a
/// managed database
#[derive(Error, Debug)]
pub enum Error {
   /// The configuration cannot produce a database location (missing name,
   /// unset home directory variable, ...)
   #[error("Configuration error: {0}")]
   Configuration(String),

   /// Default directories are only known for Windows, macOS and Linux
   #[error("Operating system '{0}' is not supported, please use Windows/macOS/Linux")]
   UnsupportedPlatform(String),

   /// The database directory could not be created
   #[error("Failed to create directory {}: {source}", path.display())]
   Directory {
      path: PathBuf,
      #[source]
      source: std::io::Error,
   },

   /// The connection could not be opened
   #[error("Failed to open database: {0}")]
   Connection(#[source] sqlx::Error),

   /// The opened connection did not answer the liveness check
   #[error("Failed to ping database: {0}")]
   Connectivity(#[source] sqlx::Error),

   /// The database file or directory could not be removed during shutdown
   #[error("Failed to delete database {}: {source}", path.display())]
   Deletion {
      path: PathBuf,
      #[source]
      source: std::io::Error,
   },

   /// An externally supplied connection pool was already closed
   #[error("Attempted to set the connection but the provided pool is closed")]
   NilHandle,

   /// The operation is not allowed in the current lifecycle state
   #[error("Cannot {operation} while the database is {state}")]
   InvalidState {
      operation: &'static str,
      state: LifecycleState,
   },

   /// Error from a passthrough execute or query call
   #[error("Sqlx error: {0}")]
   Sqlx(#[from] sqlx::Error),
}

impl Error {
   /// Machine-readable code for the error, stable across releases.
   pub fn error_code(&self) -> String {
      match self {
         Error::Configuration(_) => "CONFIGURATION_ERROR".to_string(),
         Error::UnsupportedPlatform(_) => "UNSUPPORTED_PLATFORM".to_string(),
         Error::Directory { .. } => "DIRECTORY_ERROR".to_string(),
         Error::Connection(_) => "CONNECTION_ERROR".to_string(),
         Error::Connectivity(_) => "CONNECTIVITY_ERROR".to_string(),
         Error::Deletion { .. } => "DELETION_ERROR".to_string(),
         Error::NilHandle => "NIL_HANDLE".to_string(),
         Error::InvalidState { .. } => "INVALID_STATE".to_string(),
         Error::Sqlx(e) => {
            if let Some(code) = e.as_database_error().and_then(|db_err| db_err.code()) {
               return format!("SQLITE_{}", code);
            }
            "SQLX_ERROR".to_string()
         }
      }
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_error_code_configuration() {
      let err = Error::Configuration("name is required".into());
      assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
      assert!(err.to_string().contains("name is required"));
   }

   #[test]
   fn test_error_code_directory() {
      let err = Error::Directory {
         path: PathBuf::from("/nope/app"),
         source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
      };
      assert_eq!(err.error_code(), "DIRECTORY_ERROR");
      assert!(err.to_string().contains("/nope/app"));
      assert!(err.to_string().contains("denied"));
   }

   #[test]
   fn test_error_code_invalid_state() {
      let err = Error::InvalidState {
         operation: "execute",
         state: LifecycleState::Closed,
      };
      assert_eq!(err.error_code(), "INVALID_STATE");
      assert_eq!(err.to_string(), "Cannot execute while the database is closed");
   }

   #[test]
   fn test_error_code_sqlx_non_database() {
      let err = Error::Sqlx(sqlx::Error::RowNotFound);
      assert_eq!(err.error_code(), "SQLX_ERROR");
   }

   #[test]
   fn test_error_code_nil_handle() {
      assert_eq!(Error::NilHandle.error_code(), "NIL_HANDLE");
   }
}
