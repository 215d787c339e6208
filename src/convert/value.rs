//! Typed conversion results

use crate::error::{Error, Result};
use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// A converted, typed value
#[derive(Clone)]
pub enum Value {
    Str(String),
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Char(char),
    Path(PathBuf),
    /// A resolved type name
    TypeName(String),
    Array(Vec<Value>),
    List(Vec<Value>),
    /// Unique items in insertion order
    Set(Vec<Value>),
    /// Unique items in natural order
    SortedSet(Vec<Value>),
    /// Any user type produced by a converter or registered constructor
    Custom(Arc<dyn Any + Send + Sync>),
}

impl Value {
    /// Wrap a user value
    pub fn custom<T: Any + Send + Sync>(value: T) -> Self {
        Value::Custom(Arc::new(value))
    }

    /// Borrow a user value of type `T`
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Custom(inner) => inner.downcast_ref::<T>(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) | Value::TypeName(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::UInt(n) => i64::try_from(*n).ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt(n) => Some(*n),
            Value::Int(n) => u64::try_from(*n).ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(*n),
            #[allow(clippy::cast_precision_loss)]
            Value::Int(n) => Some(*n as f64),
            #[allow(clippy::cast_precision_loss)]
            Value::UInt(n) => Some(*n as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_path(&self) -> Option<&std::path::Path> {
        match self {
            Value::Path(p) => Some(p),
            _ => None,
        }
    }

    /// Items of any sequence-shaped value
    #[must_use]
    pub fn items(&self) -> Option<&[Value]> {
        match self {
            Value::Array(v) | Value::List(v) | Value::Set(v) | Value::SortedSet(v) => Some(v),
            _ => None,
        }
    }

    /// Natural ordering between values of the same kind
    ///
    /// Returns `None` for custom values and mixed kinds.
    #[must_use]
    pub fn natural_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) | (Value::TypeName(a), Value::TypeName(b)) => {
                Some(a.cmp(b))
            }
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::UInt(a), Value::UInt(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => Some(a.total_cmp(b)),
            (Value::Char(a), Value::Char(b)) => Some(a.cmp(b)),
            (Value::Path(a), Value::Path(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Bool(_) => "bool",
            Value::Int(_) => "signed integer",
            Value::UInt(_) => "unsigned integer",
            Value::Float(_) => "float",
            Value::Char(_) => "char",
            Value::Path(_) => "path",
            Value::TypeName(_) => "type name",
            Value::Array(_) => "array",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::SortedSet(_) => "sorted set",
            Value::Custom(_) => "custom value",
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Int(n) => f.debug_tuple("Int").field(n).finish(),
            Value::UInt(n) => f.debug_tuple("UInt").field(n).finish(),
            Value::Float(n) => f.debug_tuple("Float").field(n).finish(),
            Value::Char(c) => f.debug_tuple("Char").field(c).finish(),
            Value::Path(p) => f.debug_tuple("Path").field(p).finish(),
            Value::TypeName(s) => f.debug_tuple("TypeName").field(s).finish(),
            Value::Array(v) => f.debug_tuple("Array").field(v).finish(),
            Value::List(v) => f.debug_tuple("List").field(v).finish(),
            Value::Set(v) => f.debug_tuple("Set").field(v).finish(),
            Value::SortedSet(v) => f.debug_tuple("SortedSet").field(v).finish(),
            Value::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) | (Value::TypeName(a), Value::TypeName(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::UInt(a), Value::UInt(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Path(a), Value::Path(b)) => a == b,
            (Value::Array(a), Value::Array(b))
            | (Value::List(a), Value::List(b))
            | (Value::Set(a), Value::Set(b))
            | (Value::SortedSet(a), Value::SortedSet(b)) => a == b,
            (Value::Custom(a), Value::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

macro_rules! value_from {
    ($variant:ident: $($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

value_from!(Int: i8, i16, i32, i64);
value_from!(UInt: u8, u16, u32, u64);
value_from!(Float: f32, f64);
value_from!(Str: String, &str);
value_from!(Path: PathBuf);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<char> for Value {
    fn from(v: char) -> Self {
        Value::Char(v)
    }
}

impl From<isize> for Value {
    fn from(v: isize) -> Self {
        Value::Int(v as i64)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::UInt(v as u64)
    }
}

// =============================================================================
// FromValue
// =============================================================================

/// Extraction of a Rust type from a converted [`Value`]
pub trait FromValue: Sized {
    /// Convert, failing with [`Error::Conversion`] on a kind mismatch
    ///
    /// # Errors
    ///
    /// Returns an error if the value has the wrong kind or is out of range.
    fn from_value(value: Value) -> Result<Self>;
}

fn mismatch<T>(value: &Value) -> Error {
    Error::conversion(value.kind(), std::any::type_name::<T>())
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

macro_rules! int_from_value {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self> {
                    let converted = match &value {
                        Value::Int(n) => <$ty>::try_from(*n).ok(),
                        Value::UInt(n) => <$ty>::try_from(*n).ok(),
                        _ => None,
                    };
                    converted.ok_or_else(|| mismatch::<$ty>(&value))
                }
            }
        )*
    };
}

int_from_value!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self> {
        value.as_f64().ok_or_else(|| mismatch::<f64>(&value))
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self> {
        #[allow(clippy::cast_possible_truncation)]
        value
            .as_f64()
            .map(|n| n as f32)
            .ok_or_else(|| mismatch::<f32>(&value))
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self> {
        value.as_bool().ok_or_else(|| mismatch::<bool>(&value))
    }
}

impl FromValue for char {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Char(c) => Ok(c),
            other => Err(mismatch::<char>(&other)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Str(s) | Value::TypeName(s) => Ok(s),
            other => Err(mismatch::<String>(&other)),
        }
    }
}

impl FromValue for PathBuf {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Path(p) => Ok(p),
            Value::Str(s) => Ok(PathBuf::from(s)),
            other => Err(mismatch::<PathBuf>(&other)),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Array(items)
            | Value::List(items)
            | Value::Set(items)
            | Value::SortedSet(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(mismatch::<Vec<T>>(&other)),
        }
    }
}

impl<T: Any + Send + Sync> FromValue for Arc<T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Custom(inner) => inner
                .downcast::<T>()
                .map_err(|_| Error::conversion("custom value", std::any::type_name::<T>())),
            other => Err(mismatch::<T>(&other)),
        }
    }
}
