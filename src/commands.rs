//! SQLite lifecycle plugin commands
//!
//! This module implements the Tauri command handlers that the frontend calls.
//! Each command goes through the [`DatabaseWrapper`] held in plugin state.

use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use tauri::State;

use crate::{DatabaseStatus, DatabaseWrapper, Result, WriteQueryResult};

/// Execute a write query (INSERT, UPDATE, DELETE, etc.)
#[tauri::command]
pub async fn execute(
   db: State<'_, DatabaseWrapper>,
   query: String,
   values: Vec<JsonValue>,
) -> Result<WriteQueryResult> {
   db.execute(query, values).await
}

/// Execute a query returning all matching rows
#[tauri::command]
pub async fn query(
   db: State<'_, DatabaseWrapper>,
   query: String,
   values: Vec<JsonValue>,
) -> Result<Vec<IndexMap<String, JsonValue>>> {
   db.query(query, values).await
}

/// Report the lifecycle state, location and pool limits
#[tauri::command]
pub async fn status(db: State<'_, DatabaseWrapper>) -> Result<DatabaseStatus> {
   Ok(db.status().await)
}
