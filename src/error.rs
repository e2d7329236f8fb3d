use serde::{Serialize, Serializer};

/// Result type alias for plugin operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Structured error response for frontend.
#[derive(Serialize)]
struct ErrorResponse {
   code: String,
   message: String,
}

/// Error types for the SQLite lifecycle plugin.
#[derive(Debug, thiserror::Error)]
pub enum Error {
   /// Error from the lifecycle manager.
   #[error(transparent)]
   Lifecycle(#[from] sqlx_sqlite_lifecycle::Error),

   /// Error from SQLx while reading result rows.
   #[error(transparent)]
   Sqlx(#[from] sqlx::Error),

   /// SQLite type that cannot be mapped to JSON.
   #[error("unsupported datatype: {0}")]
   UnsupportedDatatype(String),

   /// A bind value could not be encoded.
   #[error("invalid argument: {0}")]
   InvalidArgument(String),
}

impl Error {
   /// Extract a structured error code from the error type.
   ///
   /// This provides machine-readable error codes for frontend error handling.
   pub fn error_code(&self) -> String {
      match self {
         Error::Lifecycle(e) => e.error_code(),
         Error::Sqlx(e) => {
            // Extract SQLite error codes from sqlx errors
            if let Some(code) = e.as_database_error().and_then(|db_err| db_err.code()) {
               return format!("SQLITE_{}", code);
            }
            "SQLX_ERROR".to_string()
         }
         Error::UnsupportedDatatype(_) => "UNSUPPORTED_DATATYPE".to_string(),
         Error::InvalidArgument(_) => "INVALID_ARGUMENT".to_string(),
      }
   }
}

impl Serialize for Error {
   fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
   where
      S: Serializer,
   {
      let response = ErrorResponse {
         code: self.error_code(),
         message: self.to_string(),
      };
      response.serialize(serializer)
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_lifecycle_error_code_passes_through() {
      let err = Error::from(sqlx_sqlite_lifecycle::Error::NilHandle);
      assert_eq!(err.error_code(), "NIL_HANDLE");
   }

   #[test]
   fn test_serialize_as_code_and_message() {
      let err = Error::UnsupportedDatatype("WEIRD".into());
      let json = serde_json::to_value(&err).unwrap();
      assert_eq!(
         json,
         serde_json::json!({
            "code": "UNSUPPORTED_DATATYPE",
            "message": "unsupported datatype: WEIRD"
         })
      );
   }

   #[test]
   fn test_error_code_sqlx_non_database() {
      let err = Error::Sqlx(sqlx::Error::RowNotFound);
      assert_eq!(err.error_code(), "SQLX_ERROR");
   }
}
