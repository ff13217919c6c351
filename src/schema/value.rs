//! Typed property values and the value-mapper contract implemented by
//! generated code.

use crate::schema::error::SchemaError;
use crate::schema::types::FieldKind;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::time::SystemTime;
use serde::Serialize;
use std::fmt;

/// A property value of one of the metamodel type families
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    String(String),
    Int(i32),
    BigInt(i64),
    Real(f32),
    Double(f64),
    Date(DateTime<Utc>),
    Enum(String),
    List(Vec<Value>),
}

impl Value {
    /// Type family of this value, `None` for nulls and lists
    pub fn kind(&self) -> Option<FieldKind> {
        match self {
            Value::Bool(_) => Some(FieldKind::Bool),
            Value::String(_) => Some(FieldKind::String),
            Value::Int(_) => Some(FieldKind::Int),
            Value::BigInt(_) => Some(FieldKind::BigInt),
            Value::Real(_) => Some(FieldKind::Real),
            Value::Double(_) => Some(FieldKind::Double),
            Value::Date(_) => Some(FieldKind::Date),
            Value::Enum(_) => Some(FieldKind::Enum),
            Value::Null | Value::List(_) => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::List(_) => "list",
            other => other.kind().map(|k| k.as_str()).unwrap_or("value"),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(f64::from(*v)),
            Value::BigInt(v) => Some(*v as f64),
            Value::Real(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Enum(s) => Some(s),
            _ => None,
        }
    }

    /// Re-tag a string value as an enum value
    pub fn into_enum(self) -> Value {
        match self {
            Value::String(s) => Value::Enum(s),
            Value::List(items) => Value::List(items.into_iter().map(Value::into_enum).collect()),
            other => other,
        }
    }

    /// Date value from milliseconds since the Unix epoch
    pub fn date_from_millis(millis: i64) -> Value {
        Value::Date(DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or_default())
    }

    /// Parse an RFC 3339 timestamp or a plain `YYYY-MM-DD` date
    pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::String(s) | Value::Enum(s) => write!(f, "{}", s),
            Value::Int(i) => write!(f, "{}", i),
            Value::BigInt(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Double(d) => write!(f, "{}", d),
            Value::Date(d) => write!(f, "{}", d.to_rfc3339()),
            Value::List(items) => {
                let rendered: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", rendered.join(", "))
            }
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(value.into())
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    String => String,
    &str => String,
    i8 => Int,
    i16 => Int,
    i32 => Int,
    u8 => Int,
    u16 => Int,
    i64 => BigInt,
    u32 => BigInt,
    f32 => Real,
    f64 => Double,
    DateTime<Utc> => Date,
    SystemTime => Date,
}

// isize is at most 64 bits wide on every supported target
impl From<isize> for Value {
    fn from(value: isize) -> Self {
        Value::BigInt(value as i64)
    }
}

/// Unsigned integers wider than a bigint convert only when they fit
macro_rules! checked_integer_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl TryFrom<$ty> for Value {
                type Error = SchemaError;

                fn try_from(value: $ty) -> Result<Self, Self::Error> {
                    i64::try_from(value)
                        .map(Value::BigInt)
                        .map_err(|_| SchemaError::ValueType {
                            expected: "bigint".to_string(),
                            found: format!("{} {}", stringify!($ty), value),
                        })
                }
            }
        )*
    };
}

checked_integer_from!(u64, usize);

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        value
            .and_hms_opt(0, 0, 0)
            .map(|naive| Value::Date(naive.and_utc()))
            .unwrap_or(Value::Null)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Value::Date(value.and_utc())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }
}

/// Conversion from a `Value` back into a Rust property type
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, SchemaError>;
}

fn type_error(expected: &str, found: &Value) -> SchemaError {
    SchemaError::ValueType {
        expected: expected.to_string(),
        found: found.type_name().to_string(),
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, SchemaError> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(type_error("bool", &other)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, SchemaError> {
        match value {
            Value::String(s) | Value::Enum(s) => Ok(s),
            other => Err(type_error("string", &other)),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: Value) -> Result<Self, SchemaError> {
        match value {
            Value::Date(d) => Ok(d),
            other => Err(type_error("date", &other)),
        }
    }
}

macro_rules! integer_from_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self, SchemaError> {
                    let wide = match &value {
                        Value::Int(v) => i64::from(*v),
                        Value::BigInt(v) => *v,
                        other => return Err(type_error(stringify!($ty), other)),
                    };
                    <$ty>::try_from(wide).map_err(|_| type_error(stringify!($ty), &value))
                }
            }
        )*
    };
}

integer_from_value!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);

impl FromValue for NaiveDate {
    fn from_value(value: Value) -> Result<Self, SchemaError> {
        DateTime::<Utc>::from_value(value).map(|d| d.date_naive())
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: Value) -> Result<Self, SchemaError> {
        DateTime::<Utc>::from_value(value).map(|d| d.naive_utc())
    }
}

impl FromValue for SystemTime {
    fn from_value(value: Value) -> Result<Self, SchemaError> {
        DateTime::<Utc>::from_value(value).map(SystemTime::from)
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self, SchemaError> {
        match value {
            Value::Real(v) => Ok(v),
            Value::Int(v) => Ok(v as f32),
            other => Err(type_error("real", &other)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, SchemaError> {
        match value {
            Value::Real(v) => Ok(f64::from(v)),
            other => other.as_f64().ok_or_else(|| type_error("double", &other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, SchemaError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, SchemaError> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            Value::Null => Ok(Vec::new()),
            other => Err(type_error("list", &other)),
        }
    }
}

/// Property-name based access to the scalar values of a business object.
///
/// Implemented by the generated `<class>_values.rs` files. Unknown property
/// names are errors, never silently ignored.
pub trait ValueMapper {
    const CLASS_NAME: &'static str;

    fn get_value(&self, property: &str) -> Result<Value, SchemaError>;

    fn set_value(&mut self, property: &str, value: Value) -> Result<(), SchemaError>;
}
