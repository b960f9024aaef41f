//! PostgreSQL type conversion utilities.
//!
//! This module handles conversion between PostgreSQL types (from SQLx)
//! and the engine-agnostic `Value` type, in both directions.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Postgres, Row, TypeInfo, ValueRef};
use uuid::Uuid;

use crate::traits::{SslMode, Value};

/// Converter between PostgreSQL rows/parameters and `Value`.
pub struct PgValueConverter;

impl PgValueConverter {
    /// Convert a PostgreSQL row to a list of values.
    pub fn convert_row(pg_row: &PgRow) -> Vec<Value> {
        (0..pg_row.columns().len())
            .map(|idx| Self::extract_value(pg_row, idx))
            .collect()
    }

    /// Column names of a PostgreSQL row, in order.
    pub fn column_names(pg_row: &PgRow) -> Vec<String> {
        pg_row
            .columns()
            .iter()
            .map(|col| col.name().to_string())
            .collect()
    }

    /// Extract a value from a PostgreSQL row at the given column index.
    fn extract_value(row: &PgRow, index: usize) -> Value {
        match row.try_get_raw(index) {
            Ok(raw) if raw.is_null() => return Value::Null,
            Err(_) => return Value::Null,
            _ => {}
        }

        let type_name = row.columns()[index].type_info().name().to_string();
        Self::decode_by_type(row, index, &type_name)
    }

    /// Decode a value based on its PostgreSQL type name.
    fn decode_by_type(row: &PgRow, index: usize, type_name: &str) -> Value {
        let decoded = match type_name {
            "BOOL" => row.try_get::<bool, _>(index).map(Value::Bool),

            "INT2" => row.try_get::<i16, _>(index).map(|v| Value::Int64(v as i64)),
            "INT4" => row.try_get::<i32, _>(index).map(|v| Value::Int64(v as i64)),
            "INT8" => row.try_get::<i64, _>(index).map(Value::Int64),
            "OID" => row
                .try_get::<sqlx::postgres::types::Oid, _>(index)
                .map(|v| Value::UInt64(v.0 as u64)),

            "FLOAT4" => row.try_get::<f32, _>(index).map(|v| Value::Float64(v as f64)),
            "FLOAT8" => row.try_get::<f64, _>(index).map(Value::Float64),

            "NUMERIC" => row.try_get::<Decimal, _>(index).map(Value::Decimal),

            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "CITEXT" => {
                row.try_get::<String, _>(index).map(Value::Text)
            }

            "BYTEA" => row.try_get::<Vec<u8>, _>(index).map(Value::Bytes),

            "DATE" => row.try_get::<NaiveDate, _>(index).map(Value::Date),
            "TIME" => row.try_get::<NaiveTime, _>(index).map(Value::Time),
            "TIMESTAMP" => row.try_get::<NaiveDateTime, _>(index).map(Value::DateTime),
            "TIMESTAMPTZ" => row.try_get::<DateTime<Utc>, _>(index).map(Value::DateTimeTz),

            "UUID" => row.try_get::<Uuid, _>(index).map(Value::Uuid),

            "JSON" | "JSONB" => row.try_get::<serde_json::Value, _>(index).map(Value::Json),

            "INT4[]" => row
                .try_get::<Vec<i32>, _>(index)
                .map(|arr| Value::Array(arr.into_iter().map(|v| Value::Int64(v as i64)).collect())),
            "INT8[]" => row
                .try_get::<Vec<i64>, _>(index)
                .map(|arr| Value::Array(arr.into_iter().map(Value::Int64).collect())),
            "TEXT[]" | "VARCHAR[]" | "NAME[]" => row
                .try_get::<Vec<String>, _>(index)
                .map(|arr| Value::Array(arr.into_iter().map(Value::Text).collect())),
            "BOOL[]" => row
                .try_get::<Vec<bool>, _>(index)
                .map(|arr| Value::Array(arr.into_iter().map(Value::Bool).collect())),
            "FLOAT8[]" => row
                .try_get::<Vec<f64>, _>(index)
                .map(|arr| Value::Array(arr.into_iter().map(Value::Float64).collect())),

            _ => return Self::decode_as_string_fallback(row, index, type_name),
        };

        decoded.unwrap_or_else(|_| Self::decode_as_string_fallback(row, index, type_name))
    }

    /// Fallback for enums, domains and other types without a native mapping.
    fn decode_as_string_fallback(row: &PgRow, index: usize, type_name: &str) -> Value {
        // Enums and most domains arrive as UTF-8 text even in binary format
        let display = row
            .try_get_unchecked::<String, _>(index)
            .unwrap_or_else(|_| "<unknown>".to_string());

        Value::Other {
            type_name: type_name.to_string(),
            display,
        }
    }

    /// Bind one positional (`$n`) argument.
    pub fn bind<'q>(
        query: Query<'q, Postgres, PgArguments>,
        value: &'q Value,
    ) -> Query<'q, Postgres, PgArguments> {
        match value {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Int64(v) => query.bind(*v),
            Value::UInt64(v) => match i64::try_from(*v) {
                Ok(v) => query.bind(v),
                Err(_) => query.bind(Decimal::from(*v)),
            },
            Value::Float64(v) => query.bind(*v),
            Value::Text(s) => query.bind(s.as_str()),
            Value::Bytes(b) => query.bind(b.as_slice()),
            Value::Decimal(d) => query.bind(*d),
            Value::Date(d) => query.bind(*d),
            Value::Time(t) => query.bind(*t),
            Value::DateTime(dt) => query.bind(*dt),
            Value::DateTimeTz(dt) => query.bind(*dt),
            Value::Uuid(u) => query.bind(*u),
            Value::Json(j) => query.bind(sqlx::types::Json(j)),
            Value::Array(_) => query.bind(serde_json::to_value(value).unwrap_or_default()),
            Value::Other { display, .. } => query.bind(display.as_str()),
        }
    }

    /// Map the configured SSL mode onto SQLx's PostgreSQL mode.
    pub fn map_ssl_mode(mode: &SslMode) -> sqlx::postgres::PgSslMode {
        match mode {
            SslMode::Disable => sqlx::postgres::PgSslMode::Disable,
            SslMode::Prefer => sqlx::postgres::PgSslMode::Prefer,
            SslMode::Require => sqlx::postgres::PgSslMode::Require,
            SslMode::VerifyCa => sqlx::postgres::PgSslMode::VerifyCa,
            SslMode::VerifyFull => sqlx::postgres::PgSslMode::VerifyFull,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssl_mode_mapping() {
        assert!(matches!(
            PgValueConverter::map_ssl_mode(&SslMode::Disable),
            sqlx::postgres::PgSslMode::Disable
        ));
        assert!(matches!(
            PgValueConverter::map_ssl_mode(&SslMode::Prefer),
            sqlx::postgres::PgSslMode::Prefer
        ));
        assert!(matches!(
            PgValueConverter::map_ssl_mode(&SslMode::VerifyFull),
            sqlx::postgres::PgSslMode::VerifyFull
        ));
    }
}
