//! Conversion of raw column values into requested Rust types
//!
//! SQLite stores every integer as 64 bits, identifiers and timestamps as text and
//! booleans as 0/1. [`FromDatabaseValue`] normalizes those storage classes into the
//! declared type of the receiving field or scalar. Rules, in order:
//!
//! 1. `NULL` becomes the target's default (`None` for `Option<T>`).
//! 2. Identifier targets ([`Uuid`]) parse their canonical text form.
//! 3. Date/time targets parse their canonical text form.
//! 4. Enumerations ([`OrdinalEnum`]) read their ordinal.
//! 5. Everything else follows numeric/bool/string change-type semantics. Numerics
//!    widen to [`Decimal`] without passing through a binary float when stored as
//!    integers or text.

use super::error::{DatabaseError, Result};
use super::value::DatabaseValue;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Conversion from a raw column value
pub trait FromDatabaseValue: Sized {
    /// Convert `value`, mapping `NULL` to the type's empty form
    fn from_db_value(value: &DatabaseValue) -> Result<Self>;
}

/// Enumerations stored by ordinal
///
/// Implement this and invoke [`ordinal_enum!`](crate::ordinal_enum) to make the type
/// usable as an entity field, scalar result and parameter value.
pub trait OrdinalEnum: Sized + Default + Copy {
    fn from_ordinal(ordinal: i64) -> Option<Self>;
    fn ordinal(self) -> i64;
}

/// Implement [`FromDatabaseValue`] and `Into<DatabaseValue>` for an [`OrdinalEnum`]
#[macro_export]
macro_rules! ordinal_enum {
    ($ty:ty) => {
        impl $crate::FromDatabaseValue for $ty {
            fn from_db_value(value: &$crate::DatabaseValue) -> $crate::Result<Self> {
                $crate::core::convert::enum_from_value::<$ty>(value, stringify!($ty))
            }
        }

        impl From<$ty> for $crate::DatabaseValue {
            fn from(v: $ty) -> Self {
                $crate::DatabaseValue::Long($crate::OrdinalEnum::ordinal(v))
            }
        }
    };
}

#[doc(hidden)]
pub fn enum_from_value<E: OrdinalEnum>(value: &DatabaseValue, name: &str) -> Result<E> {
    if value.is_null() {
        return Ok(E::default());
    }
    let ordinal = i64::from_db_value(value)?;
    E::from_ordinal(ordinal).ok_or_else(|| {
        DatabaseError::conversion(name, &format!("ordinal {}", ordinal))
    })
}

fn mismatch<T>(expected: &str, value: &DatabaseValue) -> Result<T> {
    Err(DatabaseError::conversion(expected, value.type_name()))
}

/// Round half to even, the rounding used when reals are stored into integer fields.
fn real_to_i64(v: f64, expected: &str) -> Result<i64> {
    let rounded = v.round_ties_even();
    if rounded.is_finite() && rounded >= i64::MIN as f64 && rounded < i64::MAX as f64 {
        Ok(rounded as i64)
    } else {
        Err(DatabaseError::conversion(expected, &format!("real {}", v)))
    }
}

fn to_i64(value: &DatabaseValue, expected: &str) -> Result<i64> {
    match value {
        DatabaseValue::Null => Ok(0),
        DatabaseValue::Bool(v) => Ok(i64::from(*v)),
        DatabaseValue::Int(v) => Ok(i64::from(*v)),
        DatabaseValue::Long(v) => Ok(*v),
        DatabaseValue::Float(v) => real_to_i64(f64::from(*v), expected),
        DatabaseValue::Double(v) => real_to_i64(*v, expected),
        DatabaseValue::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| DatabaseError::conversion(expected, &format!("text '{}'", s))),
        _ => mismatch(expected, value),
    }
}

macro_rules! integer_conversion {
    ($($t:ty),*) => {
        $(
            impl FromDatabaseValue for $t {
                fn from_db_value(value: &DatabaseValue) -> Result<Self> {
                    let wide = to_i64(value, stringify!($t))?;
                    <$t>::try_from(wide).map_err(|_| {
                        DatabaseError::conversion(stringify!($t), &format!("{} (overflow)", wide))
                    })
                }
            }
        )*
    };
}

integer_conversion!(i8, i16, i32, u8, u16, u32, u64, usize);

impl FromDatabaseValue for i64 {
    fn from_db_value(value: &DatabaseValue) -> Result<Self> {
        to_i64(value, "i64")
    }
}

impl FromDatabaseValue for f64 {
    fn from_db_value(value: &DatabaseValue) -> Result<Self> {
        match value {
            DatabaseValue::Null => Ok(0.0),
            DatabaseValue::Bool(v) => Ok(if *v { 1.0 } else { 0.0 }),
            DatabaseValue::Int(v) => Ok(f64::from(*v)),
            DatabaseValue::Long(v) => Ok(*v as f64),
            DatabaseValue::Float(v) => Ok(f64::from(*v)),
            DatabaseValue::Double(v) => Ok(*v),
            DatabaseValue::String(s) => s
                .trim()
                .parse()
                .map_err(|_| DatabaseError::conversion("f64", &format!("text '{}'", s))),
            _ => mismatch("f64", value),
        }
    }
}

impl FromDatabaseValue for Decimal {
    fn from_db_value(value: &DatabaseValue) -> Result<Self> {
        let inexact = |v: f64| DatabaseError::conversion("Decimal", &format!("real {}", v));
        match value {
            DatabaseValue::Null => Ok(Decimal::ZERO),
            DatabaseValue::Bool(v) => Ok(Decimal::from(u8::from(*v))),
            DatabaseValue::Int(v) => Ok(Decimal::from(*v)),
            DatabaseValue::Long(v) => Ok(Decimal::from(*v)),
            DatabaseValue::Float(v) => {
                Decimal::try_from(*v).map_err(|_| inexact(f64::from(*v)))
            }
            DatabaseValue::Double(v) => Decimal::try_from(*v).map_err(|_| inexact(*v)),
            DatabaseValue::String(s) => s
                .trim()
                .parse()
                .map_err(|_| DatabaseError::conversion("Decimal", &format!("text '{}'", s))),
            _ => mismatch("Decimal", value),
        }
    }
}

impl FromDatabaseValue for f32 {
    fn from_db_value(value: &DatabaseValue) -> Result<Self> {
        f64::from_db_value(value).map(|v| v as f32)
    }
}

impl FromDatabaseValue for bool {
    fn from_db_value(value: &DatabaseValue) -> Result<Self> {
        match value {
            DatabaseValue::Null => Ok(false),
            DatabaseValue::Bool(v) => Ok(*v),
            DatabaseValue::Int(v) => Ok(*v != 0),
            DatabaseValue::Long(v) => Ok(*v != 0),
            DatabaseValue::Float(v) => Ok(*v != 0.0),
            DatabaseValue::Double(v) => Ok(*v != 0.0),
            DatabaseValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(true),
                "false" | "0" => Ok(false),
                _ => Err(DatabaseError::conversion("bool", &format!("text '{}'", s))),
            },
            _ => mismatch("bool", value),
        }
    }
}

impl FromDatabaseValue for String {
    fn from_db_value(value: &DatabaseValue) -> Result<Self> {
        match value {
            DatabaseValue::Null => Ok(String::new()),
            DatabaseValue::Bool(v) => Ok(v.to_string()),
            DatabaseValue::Int(v) => Ok(v.to_string()),
            DatabaseValue::Long(v) => Ok(v.to_string()),
            DatabaseValue::Float(v) => Ok(v.to_string()),
            DatabaseValue::Double(v) => Ok(v.to_string()),
            DatabaseValue::String(s) => Ok(s.clone()),
            DatabaseValue::Guid(v) => Ok(v.hyphenated().to_string()),
            DatabaseValue::DateTime(v) => {
                Ok(v.format(super::value::DATETIME_FORMAT).to_string())
            }
            DatabaseValue::Bytes(_) => mismatch("String", value),
        }
    }
}

impl FromDatabaseValue for Vec<u8> {
    fn from_db_value(value: &DatabaseValue) -> Result<Self> {
        match value {
            DatabaseValue::Null => Ok(Vec::new()),
            DatabaseValue::Bytes(b) => Ok(b.clone()),
            DatabaseValue::String(s) => Ok(s.as_bytes().to_vec()),
            _ => mismatch("Vec<u8>", value),
        }
    }
}

impl FromDatabaseValue for Uuid {
    fn from_db_value(value: &DatabaseValue) -> Result<Self> {
        match value {
            DatabaseValue::Null => Ok(Uuid::nil()),
            DatabaseValue::Guid(v) => Ok(*v),
            DatabaseValue::String(s) => Uuid::parse_str(s.trim())
                .map_err(|_| DatabaseError::conversion("Uuid", &format!("text '{}'", s))),
            DatabaseValue::Bytes(b) => Uuid::from_slice(b)
                .map_err(|_| DatabaseError::conversion("Uuid", &format!("{} bytes", b.len()))),
            _ => mismatch("Uuid", value),
        }
    }
}

/// Text layouts accepted for stored timestamps, tried in order
const DATETIME_PARSE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    DATETIME_PARSE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.naive_utc())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
}

impl FromDatabaseValue for NaiveDateTime {
    fn from_db_value(value: &DatabaseValue) -> Result<Self> {
        match value {
            DatabaseValue::Null => Ok(NaiveDateTime::default()),
            DatabaseValue::DateTime(v) => Ok(*v),
            DatabaseValue::String(s) => parse_datetime(s).ok_or_else(|| {
                DatabaseError::conversion("NaiveDateTime", &format!("text '{}'", s))
            }),
            DatabaseValue::Int(_) | DatabaseValue::Long(_) => {
                let seconds = i64::from_db_value(value)?;
                DateTime::from_timestamp(seconds, 0)
                    .map(|dt| dt.naive_utc())
                    .ok_or_else(|| {
                        DatabaseError::conversion("NaiveDateTime", &format!("{} seconds", seconds))
                    })
            }
            _ => mismatch("NaiveDateTime", value),
        }
    }
}

impl FromDatabaseValue for NaiveDate {
    fn from_db_value(value: &DatabaseValue) -> Result<Self> {
        NaiveDateTime::from_db_value(value).map(|dt| dt.date())
    }
}

impl FromDatabaseValue for DateTime<Utc> {
    fn from_db_value(value: &DatabaseValue) -> Result<Self> {
        NaiveDateTime::from_db_value(value).map(|dt| dt.and_utc())
    }
}

impl FromDatabaseValue for DatabaseValue {
    fn from_db_value(value: &DatabaseValue) -> Result<Self> {
        Ok(value.clone())
    }
}

impl<T: FromDatabaseValue> FromDatabaseValue for Option<T> {
    fn from_db_value(value: &DatabaseValue) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_db_value(value).map(Some)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, Default, PartialEq)]
    enum Status {
        #[default]
        Draft,
        Posted,
        Void,
    }

    impl OrdinalEnum for Status {
        fn from_ordinal(ordinal: i64) -> Option<Self> {
            match ordinal {
                0 => Some(Status::Draft),
                1 => Some(Status::Posted),
                2 => Some(Status::Void),
                _ => None,
            }
        }

        fn ordinal(self) -> i64 {
            self as i64
        }
    }

    crate::ordinal_enum!(Status);

    #[test]
    fn test_null_converts_to_default() {
        let null = DatabaseValue::Null;
        assert_eq!(i32::from_db_value(&null).unwrap(), 0);
        assert_eq!(i64::from_db_value(&null).unwrap(), 0);
        assert_eq!(f64::from_db_value(&null).unwrap(), 0.0);
        assert!(!bool::from_db_value(&null).unwrap());
        assert_eq!(String::from_db_value(&null).unwrap(), "");
        assert_eq!(Uuid::from_db_value(&null).unwrap(), Uuid::nil());
        assert_eq!(
            NaiveDateTime::from_db_value(&null).unwrap(),
            NaiveDateTime::default()
        );
        assert_eq!(Status::from_db_value(&null).unwrap(), Status::Draft);
        assert_eq!(Option::<i32>::from_db_value(&null).unwrap(), None);
    }

    #[test]
    fn test_long_storage_narrows_to_i32() {
        assert_eq!(i32::from_db_value(&DatabaseValue::Long(7)).unwrap(), 7);
        let err = i32::from_db_value(&DatabaseValue::Long(i64::from(i32::MAX) + 1)).unwrap_err();
        assert!(matches!(err, DatabaseError::ConversionError { .. }));
        assert!(u8::from_db_value(&DatabaseValue::Long(-1)).is_err());
    }

    #[test]
    fn test_real_to_integer_rounds_half_to_even() {
        assert_eq!(i32::from_db_value(&DatabaseValue::Double(2.5)).unwrap(), 2);
        assert_eq!(i32::from_db_value(&DatabaseValue::Double(3.5)).unwrap(), 4);
        assert_eq!(i32::from_db_value(&DatabaseValue::Double(-1.2)).unwrap(), -1);
    }

    #[test]
    fn test_integer_storage_widens_to_bool_and_real() {
        assert!(bool::from_db_value(&DatabaseValue::Long(1)).unwrap());
        assert!(!bool::from_db_value(&DatabaseValue::Long(0)).unwrap());
        assert_eq!(f64::from_db_value(&DatabaseValue::Long(12)).unwrap(), 12.0);
        assert_eq!(
            String::from_db_value(&DatabaseValue::Long(12)).unwrap(),
            "12"
        );
    }

    #[test]
    fn test_guid_from_text_and_blob() {
        let id = Uuid::parse_str("0e984725-c51c-4bf4-9960-e1c80e27aba0").unwrap();
        let text = DatabaseValue::String("0e984725-c51c-4bf4-9960-e1c80e27aba0".into());
        assert_eq!(Uuid::from_db_value(&text).unwrap(), id);
        let blob = DatabaseValue::Bytes(id.as_bytes().to_vec());
        assert_eq!(Uuid::from_db_value(&blob).unwrap(), id);
        assert_eq!(Uuid::from_db_value(&DatabaseValue::Guid(id)).unwrap(), id);
        assert!(Uuid::from_db_value(&DatabaseValue::String("nope".into())).is_err());
    }

    #[test]
    fn test_datetime_from_text_forms() {
        let expected = NaiveDate::from_ymd_opt(2023, 11, 2)
            .unwrap()
            .and_hms_milli_opt(8, 30, 15, 250)
            .unwrap();
        for text in [
            "2023-11-02 08:30:15.250",
            "2023-11-02T08:30:15.25",
            "2023-11-02T08:30:15.250Z",
        ] {
            let value = DatabaseValue::String(text.to_string());
            assert_eq!(NaiveDateTime::from_db_value(&value).unwrap(), expected, "{}", text);
        }

        let date = DatabaseValue::String("2023-11-02".into());
        assert_eq!(
            NaiveDate::from_db_value(&date).unwrap(),
            NaiveDate::from_ymd_opt(2023, 11, 2).unwrap()
        );
    }

    #[test]
    fn test_datetime_from_unix_seconds() {
        let value = DatabaseValue::Long(86_400);
        let dt = DateTime::<Utc>::from_db_value(&value).unwrap();
        assert_eq!(dt.to_rfc3339(), "1970-01-02T00:00:00+00:00");
    }

    #[test]
    fn test_enum_from_ordinal() {
        assert_eq!(Status::from_db_value(&DatabaseValue::Long(1)).unwrap(), Status::Posted);
        assert!(Status::from_db_value(&DatabaseValue::Long(9)).is_err());
        assert_eq!(DatabaseValue::from(Status::Void), DatabaseValue::Long(2));
    }

    #[test]
    fn test_unsupported_combinations_fail() {
        assert!(i32::from_db_value(&DatabaseValue::Bytes(vec![1, 2])).is_err());
        assert!(String::from_db_value(&DatabaseValue::Bytes(vec![1, 2])).is_err());
        assert!(i32::from_db_value(&DatabaseValue::String("abc".into())).is_err());
    }

    #[test]
    fn test_decimal_from_integer_storage() {
        assert_eq!(Decimal::from_db_value(&DatabaseValue::Null).unwrap(), Decimal::ZERO);
        assert_eq!(
            Decimal::from_db_value(&DatabaseValue::Long(i64::MAX)).unwrap(),
            Decimal::from(i64::MAX)
        );
        assert_eq!(Decimal::from_db_value(&DatabaseValue::Int(-40)).unwrap(), Decimal::from(-40));
        assert_eq!(Decimal::from_db_value(&DatabaseValue::Bool(true)).unwrap(), Decimal::ONE);
    }

    #[test]
    fn test_decimal_from_real_and_text_storage() {
        assert_eq!(
            Decimal::from_db_value(&DatabaseValue::Double(2.25)).unwrap(),
            Decimal::new(225, 2)
        );
        assert_eq!(
            Decimal::from_db_value(&DatabaseValue::String("123456789.123456789".into())).unwrap(),
            Decimal::new(123_456_789_123_456_789, 9)
        );
        let err = Decimal::from_db_value(&DatabaseValue::Double(f64::NAN)).unwrap_err();
        assert!(matches!(err, DatabaseError::ConversionError { .. }));
        assert!(Decimal::from_db_value(&DatabaseValue::Bytes(vec![1])).is_err());
    }

    #[test]
    fn test_option_passes_through_present_values() {
        assert_eq!(
            Option::<i32>::from_db_value(&DatabaseValue::Long(5)).unwrap(),
            Some(5)
        );
    }
}
