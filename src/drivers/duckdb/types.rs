//! DuckDB value type conversions.
//!
//! This module handles converting DuckDB values to the unified `Value` type
//! and positional arguments back into DuckDB parameters.

use duckdb::Row;
use duckdb::types::{TimeUnit, Value as DuckValue, ValueRef};

use crate::traits::Value;

// Days between 0001-01-01 (CE day 1) and the Unix epoch
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Converter between DuckDB values and unified Value types.
pub struct DuckDbValueConverter;

impl DuckDbValueConverter {
    /// Convert a DuckDB row to a list of values.
    pub fn convert_row(duckdb_row: &Row<'_>, column_count: usize) -> Vec<Value> {
        (0..column_count)
            .map(|i| Self::extract_value(duckdb_row, i))
            .collect()
    }

    /// Extract a value from a DuckDB row at the given index.
    fn extract_value(row: &Row<'_>, index: usize) -> Value {
        match row.get_ref(index) {
            Ok(value_ref) => Self::value_ref_to_value(value_ref),
            Err(_) => Value::Null,
        }
    }

    fn other(type_name: &str, display: String) -> Value {
        Value::Other {
            type_name: type_name.to_string(),
            display,
        }
    }

    /// Scale to microseconds, saturating at the `i64` range.
    fn micros(unit: TimeUnit, value: i64) -> i64 {
        match unit {
            TimeUnit::Second => value.saturating_mul(1_000_000),
            TimeUnit::Millisecond => value.saturating_mul(1_000),
            TimeUnit::Microsecond => value,
            TimeUnit::Nanosecond => value / 1_000,
        }
    }

    /// Convert a DuckDB ValueRef to our Value type.
    fn value_ref_to_value(value_ref: ValueRef<'_>) -> Value {
        match value_ref {
            ValueRef::Null => Value::Null,
            ValueRef::Boolean(b) => Value::Bool(b),
            ValueRef::TinyInt(i) => Value::Int64(i64::from(i)),
            ValueRef::SmallInt(i) => Value::Int64(i64::from(i)),
            ValueRef::Int(i) => Value::Int64(i64::from(i)),
            ValueRef::BigInt(i) => Value::Int64(i),
            ValueRef::HugeInt(i) => match i64::try_from(i) {
                Ok(v) => Value::Int64(v),
                Err(_) => Self::other("HUGEINT", i.to_string()),
            },
            ValueRef::UTinyInt(i) => Value::UInt64(u64::from(i)),
            ValueRef::USmallInt(i) => Value::UInt64(u64::from(i)),
            ValueRef::UInt(i) => Value::UInt64(u64::from(i)),
            ValueRef::UBigInt(i) => Value::UInt64(i),
            ValueRef::Float(f) => Value::Float64(f64::from(f)),
            ValueRef::Double(f) => Value::Float64(f),
            ValueRef::Decimal(d) => {
                let display = d.to_string();
                match display.parse::<rust_decimal::Decimal>() {
                    Ok(decimal) => Value::Decimal(decimal),
                    Err(_) => Self::other("DECIMAL", display),
                }
            }
            ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).to_string()),
            ValueRef::Blob(bytes) => Value::Bytes(bytes.to_vec()),
            ValueRef::Date32(days) => {
                match chrono::NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_DAYS_FROM_CE) {
                    Some(d) => Value::Date(d),
                    None => Self::other("DATE", format!("DATE({})", days)),
                }
            }
            ValueRef::Time64(unit, value) => {
                let micros = Self::micros(unit, value);
                let time = u32::try_from(micros / 1_000_000).ok().and_then(|secs| {
                    let nanos = u32::try_from((micros % 1_000_000) * 1000).ok()?;
                    chrono::NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
                });
                match time {
                    Some(t) => Value::Time(t),
                    None => Self::other("TIME", format!("TIME({})", value)),
                }
            }
            ValueRef::Timestamp(unit, value) => {
                match chrono::DateTime::from_timestamp_micros(Self::micros(unit, value)) {
                    Some(dt) => Value::DateTime(dt.naive_utc()),
                    None => Self::other("TIMESTAMP", format!("TIMESTAMP({})", value)),
                }
            }
            ValueRef::Interval {
                months,
                days,
                nanos,
            } => Self::other(
                "INTERVAL",
                format!("{} months {} days {} ns", months, days, nanos),
            ),
            ValueRef::Enum(..) => Self::other("ENUM", "[ENUM]".to_string()),
            ValueRef::List(..) => Self::other("LIST", "[LIST]".to_string()),
            ValueRef::Struct(..) => Self::other("STRUCT", "[STRUCT]".to_string()),
            ValueRef::Map(..) => Self::other("MAP", "[MAP]".to_string()),
            ValueRef::Array(..) => Self::other("ARRAY", "[ARRAY]".to_string()),
            ValueRef::Union(..) => Self::other("UNION", "[UNION]".to_string()),
        }
    }

    /// Convert one positional argument into a DuckDB parameter.
    ///
    /// Temporal and exotic values are passed as text and cast by DuckDB.
    pub fn to_param(value: &Value) -> DuckValue {
        match value {
            Value::Null => DuckValue::Null,
            Value::Bool(b) => DuckValue::Boolean(*b),
            Value::Int64(v) => DuckValue::BigInt(*v),
            Value::UInt64(v) => DuckValue::UBigInt(*v),
            Value::Float64(v) => DuckValue::Double(*v),
            Value::Text(s) => DuckValue::Text(s.clone()),
            Value::Bytes(b) => DuckValue::Blob(b.clone()),
            Value::Json(j) => DuckValue::Text(j.to_string()),
            Value::Array(_) => DuckValue::Text(serde_json::to_string(value).unwrap_or_default()),
            _ => DuckValue::Text(value.to_display_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integers_widen_to_64_bits() {
        assert_eq!(
            DuckDbValueConverter::value_ref_to_value(ValueRef::SmallInt(-3)),
            Value::Int64(-3)
        );
        assert_eq!(
            DuckDbValueConverter::value_ref_to_value(ValueRef::UInt(7)),
            Value::UInt64(7)
        );
        assert_eq!(
            DuckDbValueConverter::value_ref_to_value(ValueRef::HugeInt(42)),
            Value::Int64(42)
        );
        assert!(matches!(
            DuckDbValueConverter::value_ref_to_value(ValueRef::HugeInt(i128::MAX)),
            Value::Other { ref type_name, .. } if type_name == "HUGEINT"
        ));
    }

    #[test]
    fn test_temporal_values() {
        assert_eq!(
            DuckDbValueConverter::value_ref_to_value(ValueRef::Date32(0)),
            Value::Date(chrono::NaiveDate::from_ymd_opt(1970, 1, 1).unwrap())
        );
        assert_eq!(
            DuckDbValueConverter::value_ref_to_value(ValueRef::Time64(
                TimeUnit::Microsecond,
                3_600_000_000
            )),
            Value::Time(chrono::NaiveTime::from_hms_opt(1, 0, 0).unwrap())
        );
        assert_eq!(
            DuckDbValueConverter::value_ref_to_value(ValueRef::Timestamp(TimeUnit::Second, 86_400))
                .to_display_string(),
            "1970-01-02 00:00:00"
        );
    }

    #[test]
    fn test_out_of_range_temporals_fall_back() {
        assert!(matches!(
            DuckDbValueConverter::value_ref_to_value(ValueRef::Timestamp(TimeUnit::Second, i64::MAX)),
            Value::Other { ref type_name, .. } if type_name == "TIMESTAMP"
        ));
        assert!(matches!(
            DuckDbValueConverter::value_ref_to_value(ValueRef::Timestamp(
                TimeUnit::Millisecond,
                i64::MIN
            )),
            Value::Other { ref type_name, .. } if type_name == "TIMESTAMP"
        ));
        assert!(matches!(
            DuckDbValueConverter::value_ref_to_value(ValueRef::Time64(TimeUnit::Second, i64::MAX)),
            Value::Other { ref type_name, .. } if type_name == "TIME"
        ));
        assert!(matches!(
            DuckDbValueConverter::value_ref_to_value(ValueRef::Time64(TimeUnit::Microsecond, -1)),
            Value::Other { ref type_name, .. } if type_name == "TIME"
        ));
    }

    #[test]
    fn test_text_and_null() {
        assert_eq!(
            DuckDbValueConverter::value_ref_to_value(ValueRef::Text(b"hello")),
            Value::Text("hello".to_string())
        );
        assert_eq!(DuckDbValueConverter::value_ref_to_value(ValueRef::Null), Value::Null);
    }

    #[test]
    fn test_params() {
        assert_eq!(
            DuckDbValueConverter::to_param(&Value::Int64(5)),
            DuckValue::BigInt(5)
        );
        assert_eq!(
            DuckDbValueConverter::to_param(&Value::Date(
                chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
            )),
            DuckValue::Text("2024-01-02".to_string())
        );
    }
}
