//! Database value types
//!
//! This module defines the values bound to command parameters and read back from
//! result rows. Values read from SQLite are always one of its storage classes:
//! `Null`, `Long`, `Double`, `String` or `Bytes`. Text that is not valid UTF-8 is
//! kept as `Bytes` so no character is ever replaced.

use chrono::NaiveDateTime;
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use uuid::Uuid;

/// Text layout used when binding date/time values
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Database value that can hold different types
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseValue {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// 32-bit floating point
    Float(f32),
    /// 64-bit floating point
    Double(f64),
    /// String value
    String(String),
    /// Binary data
    Bytes(Vec<u8>),
    /// 128-bit unique identifier
    Guid(Uuid),
    /// Date and time without offset
    DateTime(NaiveDateTime),
}

impl DatabaseValue {
    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, DatabaseValue::Null)
    }

    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            DatabaseValue::Null => "null",
            DatabaseValue::Bool(_) => "bool",
            DatabaseValue::Int(_) => "int",
            DatabaseValue::Long(_) => "long",
            DatabaseValue::Float(_) => "float",
            DatabaseValue::Double(_) => "double",
            DatabaseValue::String(_) => "string",
            DatabaseValue::Bytes(_) => "bytes",
            DatabaseValue::Guid(_) => "guid",
            DatabaseValue::DateTime(_) => "datetime",
        }
    }

    /// Copy a borrowed SQLite value into an owned value
    pub fn from_value_ref(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => DatabaseValue::Null,
            ValueRef::Integer(v) => DatabaseValue::Long(v),
            ValueRef::Real(v) => DatabaseValue::Double(v),
            ValueRef::Text(v) => match std::str::from_utf8(v) {
                Ok(text) => DatabaseValue::String(text.to_string()),
                Err(_) => DatabaseValue::Bytes(v.to_vec()),
            },
            ValueRef::Blob(v) => DatabaseValue::Bytes(v.to_vec()),
        }
    }
}

impl ToSql for DatabaseValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            DatabaseValue::Null => ToSqlOutput::Owned(Value::Null),
            DatabaseValue::Bool(v) => ToSqlOutput::Owned(Value::Integer(i64::from(*v))),
            DatabaseValue::Int(v) => ToSqlOutput::Owned(Value::Integer(i64::from(*v))),
            DatabaseValue::Long(v) => ToSqlOutput::Owned(Value::Integer(*v)),
            DatabaseValue::Float(v) => ToSqlOutput::Owned(Value::Real(f64::from(*v))),
            DatabaseValue::Double(v) => ToSqlOutput::Owned(Value::Real(*v)),
            DatabaseValue::String(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
            DatabaseValue::Bytes(v) => ToSqlOutput::Borrowed(ValueRef::Blob(v)),
            DatabaseValue::Guid(v) => ToSqlOutput::Owned(Value::Text(v.hyphenated().to_string())),
            DatabaseValue::DateTime(v) => {
                ToSqlOutput::Owned(Value::Text(v.format(DATETIME_FORMAT).to_string()))
            }
        })
    }
}

impl From<bool> for DatabaseValue {
    fn from(v: bool) -> Self {
        DatabaseValue::Bool(v)
    }
}

impl From<i32> for DatabaseValue {
    fn from(v: i32) -> Self {
        DatabaseValue::Int(v)
    }
}

impl From<i64> for DatabaseValue {
    fn from(v: i64) -> Self {
        DatabaseValue::Long(v)
    }
}

impl From<f32> for DatabaseValue {
    fn from(v: f32) -> Self {
        DatabaseValue::Float(v)
    }
}

impl From<f64> for DatabaseValue {
    fn from(v: f64) -> Self {
        DatabaseValue::Double(v)
    }
}

impl From<String> for DatabaseValue {
    fn from(v: String) -> Self {
        DatabaseValue::String(v)
    }
}

impl From<&str> for DatabaseValue {
    fn from(v: &str) -> Self {
        DatabaseValue::String(v.to_string())
    }
}

impl From<Vec<u8>> for DatabaseValue {
    fn from(v: Vec<u8>) -> Self {
        DatabaseValue::Bytes(v)
    }
}

impl From<&[u8]> for DatabaseValue {
    fn from(v: &[u8]) -> Self {
        DatabaseValue::Bytes(v.to_vec())
    }
}

/// Decimals are bound as text so no digit is lost to a binary float
impl From<rust_decimal::Decimal> for DatabaseValue {
    fn from(v: rust_decimal::Decimal) -> Self {
        DatabaseValue::String(v.to_string())
    }
}

impl From<Uuid> for DatabaseValue {
    fn from(v: Uuid) -> Self {
        DatabaseValue::Guid(v)
    }
}

impl From<NaiveDateTime> for DatabaseValue {
    fn from(v: NaiveDateTime) -> Self {
        DatabaseValue::DateTime(v)
    }
}

impl From<chrono::NaiveDate> for DatabaseValue {
    fn from(v: chrono::NaiveDate) -> Self {
        DatabaseValue::DateTime(v.and_time(chrono::NaiveTime::MIN))
    }
}

impl From<chrono::DateTime<chrono::Utc>> for DatabaseValue {
    fn from(v: chrono::DateTime<chrono::Utc>) -> Self {
        DatabaseValue::DateTime(v.naive_utc())
    }
}

macro_rules! widen_into_long {
    ($($t:ty),*) => {
        $(
            impl From<$t> for DatabaseValue {
                fn from(v: $t) -> Self {
                    DatabaseValue::Long(i64::from(v))
                }
            }
        )*
    };
}

widen_into_long!(i8, i16, u8, u16, u32);

impl<T: Into<DatabaseValue>> From<Option<T>> for DatabaseValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => DatabaseValue::Null,
        }
    }
}
