//! MariaDB Parameter Conversion Utilities
//!
//! Converts between facade values and `mysql_async` values. Every caller
//! value travels as a bound parameter, never spliced into SQL text.

use crate::database::types::Value;
use mysql_async::consts::ColumnType;
use mysql_async::Column;

/// Collation id of the `binary` character set
const BINARY_CHARSET: u16 = 63;

/// MariaDB parameter conversion utility
pub struct MariaDbParamConverter;

impl MariaDbParamConverter {
    pub fn convert_value(value: &Value) -> mysql_async::Value {
        match value {
            Value::Null => mysql_async::Value::NULL,
            Value::Bool(b) => mysql_async::Value::Int(*b as i64),
            Value::Int(i) => mysql_async::Value::Int(*i),
            Value::Float(f) => mysql_async::Value::Double(*f),
            Value::String(s) => mysql_async::Value::Bytes(s.as_bytes().to_vec()),
            Value::Binary(b) => mysql_async::Value::Bytes(b.clone()),
            Value::Json(j) => mysql_async::Value::Bytes(j.to_string().into_bytes()),
            Value::DateTime(dt) => {
                let formatted = dt.format("%Y-%m-%d %H:%M:%S%.6f").to_string();
                mysql_async::Value::Bytes(formatted.into_bytes())
            }
        }
    }

    pub fn convert_params(params: &[Value]) -> Vec<mysql_async::Value> {
        params.iter().map(Self::convert_value).collect()
    }

    /// Convert a result value back, using the column metadata to tell BLOB
    /// bytes from text.
    pub fn convert_from_mysql_value(mysql_value: mysql_async::Value, column: Option<&Column>) -> Value {
        match mysql_value {
            mysql_async::Value::NULL => Value::Null,
            mysql_async::Value::Int(i) => Value::Int(i),
            mysql_async::Value::UInt(u) => match i64::try_from(u) {
                Ok(i) => Value::Int(i),
                Err(_) => Value::String(u.to_string()),
            },
            mysql_async::Value::Float(f) => Value::Float(f as f64),
            mysql_async::Value::Double(d) => Value::Float(d),
            mysql_async::Value::Bytes(b) => {
                if column.is_some_and(Self::is_binary_column) {
                    return Value::Binary(b);
                }
                match String::from_utf8(b) {
                    Ok(s) => Value::String(s),
                    Err(e) => Value::Binary(e.into_bytes()),
                }
            }
            mysql_async::Value::Date(year, month, day, hour, minute, second, microsecond) => {
                let datetime_str = format!(
                    "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:06}",
                    year, month, day, hour, minute, second, microsecond
                );
                match chrono::NaiveDateTime::parse_from_str(&datetime_str, "%Y-%m-%d %H:%M:%S%.f") {
                    Ok(naive_dt) => Value::DateTime(naive_dt.and_utc()),
                    // zero dates ('0000-00-00') have no chrono counterpart
                    Err(_) => Value::String(datetime_str),
                }
            }
            mysql_async::Value::Time(is_negative, days, hours, minutes, seconds, microseconds) => {
                let time_str = format!(
                    "{}{:02}:{:02}:{:02}.{:06}",
                    if is_negative { "-" } else { "" },
                    days * 24 + hours as u32,
                    minutes,
                    seconds,
                    microseconds
                );
                Value::String(time_str)
            }
        }
    }

    fn is_binary_column(column: &Column) -> bool {
        column.character_set() == BINARY_CHARSET
            && matches!(
                column.column_type(),
                ColumnType::MYSQL_TYPE_BLOB
                    | ColumnType::MYSQL_TYPE_TINY_BLOB
                    | ColumnType::MYSQL_TYPE_MEDIUM_BLOB
                    | ColumnType::MYSQL_TYPE_LONG_BLOB
                    | ColumnType::MYSQL_TYPE_STRING
                    | ColumnType::MYSQL_TYPE_VAR_STRING
                    | ColumnType::MYSQL_TYPE_VARCHAR
            )
    }

    /// Parameter types for debug logs, without the values themselves
    pub fn create_param_summary(params: &[Value]) -> String {
        params
            .iter()
            .enumerate()
            .map(|(i, param)| {
                let type_name = match param {
                    Value::Null => "NULL",
                    Value::Bool(_) => "BOOL",
                    Value::Int(_) => "INT",
                    Value::Float(_) => "FLOAT",
                    Value::String(_) => "STRING",
                    Value::Binary(_) => "BINARY",
                    Value::Json(_) => "JSON",
                    Value::DateTime(_) => "DATETIME",
                };
                format!("#{}: {}", i + 1, type_name)
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}
