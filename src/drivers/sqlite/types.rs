//! SQLite type conversion utilities.
//!
//! This module handles conversion between SQLite types (from SQLx)
//! and the engine-agnostic `Value` type, in both directions.
//!
//! SQLite uses dynamic typing with type affinity:
//! - INTEGER: 64-bit signed integer
//! - REAL: 64-bit floating point
//! - TEXT: UTF-8 string
//! - BLOB: Binary data
//! - NULL: Null value

use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Column, Row, Sqlite, TypeInfo, ValueRef};

use crate::traits::Value;

/// Converter between SQLite rows/parameters and `Value`.
pub struct SqliteValueConverter;

impl SqliteValueConverter {
    /// Convert a SQLite row to a list of values.
    pub fn convert_row(sqlite_row: &SqliteRow) -> Vec<Value> {
        (0..sqlite_row.columns().len())
            .map(|idx| Self::extract_value(sqlite_row, idx))
            .collect()
    }

    /// Column names of a SQLite row, in order.
    pub fn column_names(sqlite_row: &SqliteRow) -> Vec<String> {
        sqlite_row
            .columns()
            .iter()
            .map(|col| col.name().to_string())
            .collect()
    }

    /// Extract a value from a SQLite row at the given column index.
    fn extract_value(row: &SqliteRow, index: usize) -> Value {
        match row.try_get_raw(index) {
            Ok(raw) if raw.is_null() => return Value::Null,
            Err(_) => return Value::Null,
            _ => {}
        }

        let type_name = row.columns()[index].type_info().name().to_uppercase();
        Self::decode_by_type(row, index, &type_name)
    }

    /// Decode a value based on its declared SQLite type.
    ///
    /// A value whose storage class disagrees with the declared type falls
    /// back to its storage class.
    fn decode_by_type(row: &SqliteRow, index: usize, type_name: &str) -> Value {
        let decoded = match type_name {
            "BOOLEAN" | "BOOL" => row
                .try_get::<bool, _>(index)
                .map(Value::Bool)
                .ok(),

            "DATE" => Self::decode_date(row, index),
            "TIME" => Self::decode_time(row, index),
            "DATETIME" | "TIMESTAMP" => Self::decode_datetime(row, index),

            "NUMERIC" | "DECIMAL" => Self::decode_numeric(row, index),

            _ => None,
        };

        decoded.unwrap_or_else(|| Self::decode_storage_class(row, index, type_name))
    }

    /// Decode a DATE value stored as ISO-8601 text.
    fn decode_date(row: &SqliteRow, index: usize) -> Option<Value> {
        let s = row.try_get::<String, _>(index).ok()?;
        Some(match chrono::NaiveDate::parse_from_str(&s, "%Y-%m-%d") {
            Ok(date) => Value::Date(date),
            Err(_) => Value::Text(s),
        })
    }

    /// Decode a TIME value stored as text.
    fn decode_time(row: &SqliteRow, index: usize) -> Option<Value> {
        let s = row.try_get::<String, _>(index).ok()?;
        Some(match chrono::NaiveTime::parse_from_str(&s, "%H:%M:%S%.f") {
            Ok(time) => Value::Time(time),
            Err(_) => Value::Text(s),
        })
    }

    /// Decode a DATETIME value stored as text or as Unix seconds.
    fn decode_datetime(row: &SqliteRow, index: usize) -> Option<Value> {
        if let Ok(s) = row.try_get::<String, _>(index) {
            for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
                if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(&s, format) {
                    return Some(Value::DateTime(dt));
                }
            }
            if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(&s) {
                return Some(Value::DateTimeTz(dt.with_timezone(&chrono::Utc)));
            }
            return Some(Value::Text(s));
        }

        let timestamp = row.try_get::<i64, _>(index).ok()?;
        chrono::DateTime::from_timestamp(timestamp, 0).map(Value::DateTimeTz)
    }

    /// Decode a NUMERIC/DECIMAL value, preferring exact decimals.
    fn decode_numeric(row: &SqliteRow, index: usize) -> Option<Value> {
        let s = row.try_get::<String, _>(index).ok()?;
        Some(match s.parse::<rust_decimal::Decimal>() {
            Ok(decimal) => Value::Decimal(decimal),
            Err(_) => Value::Text(s),
        })
    }

    /// Decode by storage class.
    fn decode_storage_class(row: &SqliteRow, index: usize, type_name: &str) -> Value {
        if let Ok(v) = row.try_get::<i64, _>(index) {
            return Value::Int64(v);
        }

        if let Ok(v) = row.try_get::<f64, _>(index) {
            return Value::Float64(v);
        }

        if let Ok(v) = row.try_get::<String, _>(index) {
            return Value::Text(v);
        }

        if let Ok(v) = row.try_get::<Vec<u8>, _>(index) {
            return Value::Bytes(v);
        }

        Value::Other {
            type_name: type_name.to_string(),
            display: "<unknown>".to_string(),
        }
    }

    /// Bind one positional (`?`) argument.
    pub fn bind<'q>(
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
        value: &'q Value,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        match value {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Int64(v) => query.bind(*v),
            Value::UInt64(v) => match i64::try_from(*v) {
                Ok(v) => query.bind(v),
                Err(_) => query.bind(v.to_string()),
            },
            Value::Float64(v) => query.bind(*v),
            Value::Text(s) => query.bind(s.as_str()),
            Value::Bytes(b) => query.bind(b.as_slice()),
            Value::Date(d) => query.bind(*d),
            Value::Time(t) => query.bind(*t),
            Value::DateTime(dt) => query.bind(*dt),
            Value::DateTimeTz(dt) => query.bind(*dt),
            Value::Decimal(_) | Value::Uuid(_) | Value::Other { .. } => {
                query.bind(value.to_display_string())
            }
            Value::Json(j) => query.bind(j.to_string()),
            Value::Array(_) => query.bind(serde_json::to_string(value).unwrap_or_default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    fn decode(sql: &'static str) -> Vec<Value> {
        smol::block_on(async {
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .connect("sqlite::memory:")
                .await
                .unwrap();
            sqlx::query("CREATE TABLE t (flag BOOLEAN, day DATE, amount NUMERIC, n INTEGER, note TEXT, raw BLOB)")
                .execute(&pool)
                .await
                .unwrap();
            sqlx::query(sql).execute(&pool).await.unwrap();
            let row = sqlx::query("SELECT * FROM t").fetch_one(&pool).await.unwrap();
            SqliteValueConverter::convert_row(&row)
        })
    }

    #[test]
    fn test_declared_types_are_decoded() {
        let values = decode("INSERT INTO t VALUES (1, '2024-03-01', 12.5, 7, 'hi', x'01ff')");
        assert_eq!(values[0], Value::Bool(true));
        assert_eq!(
            values[1],
            Value::Date(chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
        );
        // NUMERIC affinity stores well-formed numbers as REAL
        assert_eq!(values[2].to_display_string(), "12.5");
        assert_eq!(values[3], Value::Int64(7));
        assert_eq!(values[4], Value::Text("hi".to_string()));
        assert_eq!(values[5], Value::Bytes(vec![0x01, 0xff]));
    }

    #[test]
    fn test_storage_class_wins_over_declared_type() {
        let values = decode("INSERT INTO t VALUES (NULL, 'someday', NULL, 'seven', NULL, NULL)");
        assert_eq!(values[0], Value::Null);
        assert_eq!(values[1], Value::Text("someday".to_string()));
        assert_eq!(values[3], Value::Text("seven".to_string()));
    }
}
