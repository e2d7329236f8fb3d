//! JSON at the frontend boundary: binding parameters and decoding rows

use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use sqlx::sqlite::{SqliteArguments, SqliteRow, SqliteValueRef};
use sqlx::{Arguments, Column, Row, TypeInfo, Value, ValueRef};
use time::PrimitiveDateTime;

use crate::Error;

/// Build positional arguments from JSON values.
///
/// Integers are bound as `i64` to preserve precision; unsigned values above
/// `i64::MAX` fall back to `f64`. Arrays and objects are bound as JSON text.
pub fn bind_values(values: Vec<JsonValue>) -> Result<SqliteArguments<'static>, Error> {
   let mut args = SqliteArguments::default();
   for (index, value) in values.into_iter().enumerate() {
      bind_value(&mut args, value).map_err(|e| {
         Error::InvalidArgument(format!("cannot bind parameter {}: {}", index + 1, e))
      })?;
   }
   Ok(args)
}

fn bind_value(
   args: &mut SqliteArguments<'static>,
   value: JsonValue,
) -> Result<(), sqlx::error::BoxDynError> {
   match value {
      JsonValue::Null => Arguments::add(args, None::<String>),
      JsonValue::Bool(b) => Arguments::add(args, b),
      JsonValue::String(s) => Arguments::add(args, s),
      JsonValue::Number(number) => {
         // Preserve integer precision by binding as i64 when possible
         if let Some(int_val) = number.as_i64() {
            Arguments::add(args, int_val)
         } else if let Some(uint_val) = number.as_u64() {
            // Too large for SQLite's INTEGER, use f64 (will lose precision)
            Arguments::add(args, uint_val as f64)
         } else {
            Arguments::add(args, number.as_f64().unwrap_or_default())
         }
      }
      other @ (JsonValue::Array(_) | JsonValue::Object(_)) => Arguments::add(args, other.to_string()),
   }
}

/// Convert a row to a column-ordered map of JSON values.
pub fn row_to_json(row: &SqliteRow) -> Result<IndexMap<String, JsonValue>, Error> {
   let mut map = IndexMap::with_capacity(row.columns().len());
   for (i, column) in row.columns().iter().enumerate() {
      let value = row.try_get_raw(i)?;
      map.insert(column.name().to_string(), to_json(value)?);
   }
   Ok(map)
}

/// Convert a SQLite value to a JSON value.
///
/// Note: BLOB values are returned as base64-encoded strings since JSON
/// has no native binary type. Boolean values are stored as INTEGER in SQLite.
pub fn to_json(value: SqliteValueRef) -> Result<JsonValue, Error> {
   if value.is_null() {
      return Ok(JsonValue::Null);
   }

   let column_type = value.type_info();

   let result = match column_type.name() {
      // SQLite stores dates and times as TEXT
      "TEXT" | "DATE" | "TIME" => value
         .to_owned()
         .try_decode::<String>()
         .map(JsonValue::String)
         .unwrap_or(JsonValue::Null),

      "REAL" => value
         .to_owned()
         .try_decode::<f64>()
         .map(JsonValue::from)
         .unwrap_or(JsonValue::Null),

      "INTEGER" | "NUMERIC" => value
         .to_owned()
         .try_decode::<i64>()
         .map(JsonValue::from)
         .unwrap_or(JsonValue::Null),

      "BOOLEAN" => value
         .to_owned()
         .try_decode::<bool>()
         .map(JsonValue::Bool)
         .unwrap_or(JsonValue::Null),

      "DATETIME" => {
         let owned = value.to_owned();
         if let Ok(dt) = owned.try_decode::<PrimitiveDateTime>() {
            JsonValue::String(dt.to_string())
         } else if let Ok(v) = owned.try_decode::<String>() {
            JsonValue::String(v)
         } else {
            JsonValue::Null
         }
      }

      "BLOB" => value
         .to_owned()
         .try_decode::<Vec<u8>>()
         .map(|blob| JsonValue::String(base64_encode(&blob)))
         .unwrap_or(JsonValue::Null),

      "NULL" => JsonValue::Null,

      _ => {
         // For unknown types, try to decode as text
         if let Ok(text) = value.to_owned().try_decode::<String>() {
            JsonValue::String(text)
         } else {
            return Err(Error::UnsupportedDatatype(format!(
               "Unknown SQLite type: {}",
               column_type.name()
            )));
         }
      }
   };

   Ok(result)
}

fn base64_encode(data: &[u8]) -> String {
   use base64::Engine;
   base64::engine::general_purpose::STANDARD.encode(data)
}

#[cfg(test)]
mod tests {
   use super::*;
   use serde_json::json;

   #[test]
   fn test_base64_encode() {
      assert_eq!(base64_encode(b"hello"), "aGVsbG8=");
      assert_eq!(base64_encode(&[0, 0, 0]), "AAAA");
      assert_eq!(base64_encode(&[]), "");
   }

   #[test]
   fn test_bind_values_counts_every_parameter() {
      let args = bind_values(vec![
         json!(null),
         json!(true),
         json!(42),
         json!(u64::MAX),
         json!(1.5),
         json!("text"),
         json!([1, 2]),
         json!({"a": 1}),
      ])
      .unwrap();
      assert_eq!(Arguments::len(&args), 8);
   }

   #[test]
   fn test_bind_values_empty() {
      let args = bind_values(vec![]).unwrap();
      assert_eq!(Arguments::len(&args), 0);
   }
}
