//! MySQL type conversion utilities.
//!
//! This module handles conversion between MySQL types (from SQLx) and the
//! engine-agnostic `Value` type, in both directions.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::mysql::{MySqlArguments, MySqlRow, MySqlSslMode};
use sqlx::query::Query;
use sqlx::{Column, MySql, Row, TypeInfo, ValueRef};

use crate::traits::{SslMode, Value};

/// Converter between MySQL rows/parameters and `Value`.
pub struct MySqlValueConverter;

impl MySqlValueConverter {
    /// Convert a MySQL row to a list of values.
    pub fn convert_row(mysql_row: &MySqlRow) -> Vec<Value> {
        (0..mysql_row.columns().len())
            .map(|idx| Self::extract_value(mysql_row, idx))
            .collect()
    }

    /// Column names of a MySQL row, in order.
    pub fn column_names(mysql_row: &MySqlRow) -> Vec<String> {
        mysql_row
            .columns()
            .iter()
            .map(|col| col.name().to_string())
            .collect()
    }

    /// Extract a value from a MySQL row at the given column index.
    fn extract_value(row: &MySqlRow, index: usize) -> Value {
        match row.try_get_raw(index) {
            Ok(raw) if raw.is_null() => return Value::Null,
            Err(_) => return Value::Null,
            _ => {}
        }

        let type_name = row.columns()[index].type_info().name().to_string();
        Self::decode_by_type(row, index, &type_name)
    }

    /// Decode a value based on its MySQL type name.
    fn decode_by_type(row: &MySqlRow, index: usize, type_name: &str) -> Value {
        let decoded = match type_name {
            // MySQL uses TINYINT(1) for booleans
            "BOOLEAN" | "BOOL" => row.try_get::<bool, _>(index).map(Value::Bool),

            "TINYINT" => row.try_get::<i8, _>(index).map(|v| Value::Int64(v as i64)),
            "SMALLINT" | "YEAR" => row.try_get::<i16, _>(index).map(|v| Value::Int64(v as i64)),
            "MEDIUMINT" | "INT" | "INTEGER" => {
                row.try_get::<i32, _>(index).map(|v| Value::Int64(v as i64))
            }
            "BIGINT" => row.try_get::<i64, _>(index).map(Value::Int64),

            "TINYINT UNSIGNED" => row.try_get::<u8, _>(index).map(|v| Value::UInt64(v as u64)),
            "SMALLINT UNSIGNED" => row.try_get::<u16, _>(index).map(|v| Value::UInt64(v as u64)),
            "MEDIUMINT UNSIGNED" | "INT UNSIGNED" | "INTEGER UNSIGNED" => {
                row.try_get::<u32, _>(index).map(|v| Value::UInt64(v as u64))
            }
            "BIGINT UNSIGNED" => row.try_get::<u64, _>(index).map(Value::UInt64),

            "FLOAT" => row.try_get::<f32, _>(index).map(|v| Value::Float64(v as f64)),
            "DOUBLE" | "DOUBLE PRECISION" | "REAL" => row.try_get::<f64, _>(index).map(Value::Float64),

            "DECIMAL" | "NUMERIC" => row.try_get::<Decimal, _>(index).map(Value::Decimal),

            "CHAR" | "VARCHAR" | "TINYTEXT" | "TEXT" | "MEDIUMTEXT" | "LONGTEXT" | "ENUM"
            | "SET" => row.try_get::<String, _>(index).map(Value::Text),

            "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT" => {
                row.try_get::<Vec<u8>, _>(index).map(Value::Bytes)
            }

            "DATE" => row.try_get::<NaiveDate, _>(index).map(Value::Date),
            "TIME" => row.try_get::<NaiveTime, _>(index).map(Value::Time),
            "DATETIME" => row.try_get::<NaiveDateTime, _>(index).map(Value::DateTime),
            "TIMESTAMP" => row
                .try_get::<DateTime<Utc>, _>(index)
                .map(Value::DateTimeTz)
                .or_else(|_| row.try_get::<NaiveDateTime, _>(index).map(Value::DateTime)),

            "JSON" => row.try_get::<serde_json::Value, _>(index).map(Value::Json),

            _ => return Self::decode_as_string_fallback(row, index, type_name),
        };

        decoded.unwrap_or_else(|_| Self::decode_as_string_fallback(row, index, type_name))
    }

    /// Fallback for spatial and other types without a native mapping.
    fn decode_as_string_fallback(row: &MySqlRow, index: usize, type_name: &str) -> Value {
        if let Ok(s) = row.try_get_unchecked::<String, _>(index) {
            return Value::Other {
                type_name: type_name.to_string(),
                display: s,
            };
        }

        match row.try_get_unchecked::<Vec<u8>, _>(index) {
            Ok(bytes) => Value::Bytes(bytes),
            Err(_) => Value::Other {
                type_name: type_name.to_string(),
                display: "<unknown>".to_string(),
            },
        }
    }

    /// Bind one positional (`?`) argument.
    pub fn bind<'q>(
        query: Query<'q, MySql, MySqlArguments>,
        value: &'q Value,
    ) -> Query<'q, MySql, MySqlArguments> {
        match value {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Int64(v) => query.bind(*v),
            Value::UInt64(v) => query.bind(*v),
            Value::Float64(v) => query.bind(*v),
            Value::Text(s) => query.bind(s.as_str()),
            Value::Bytes(b) => query.bind(b.as_slice()),
            Value::Decimal(d) => query.bind(*d),
            Value::Date(d) => query.bind(*d),
            Value::Time(t) => query.bind(*t),
            Value::DateTime(dt) => query.bind(*dt),
            Value::DateTimeTz(dt) => query.bind(*dt),
            Value::Uuid(u) => query.bind(u.hyphenated().to_string()),
            Value::Json(j) => query.bind(sqlx::types::Json(j)),
            Value::Array(_) => query.bind(serde_json::to_value(value).unwrap_or_default()),
            Value::Other { display, .. } => query.bind(display.as_str()),
        }
    }

    /// Map the configured SSL mode onto SQLx's MySQL mode.
    pub fn map_ssl_mode(mode: &SslMode) -> MySqlSslMode {
        match mode {
            SslMode::Disable => MySqlSslMode::Disabled,
            SslMode::Prefer => MySqlSslMode::Preferred,
            SslMode::Require => MySqlSslMode::Required,
            SslMode::VerifyCa => MySqlSslMode::VerifyCa,
            SslMode::VerifyFull => MySqlSslMode::VerifyIdentity,
        }
    }
}
