//! Typed value payloads.

use crate::codec::MAX_LIST_DEPTH;
use crate::error::{Df2Error, Result};
use crate::kind::Kind;

/// Payload of a value node.
///
/// Equality compares floats by bit pattern, so a decoded `NaN` equals the
/// `NaN` that was written and `0.0` differs from `-0.0`.
#[derive(Debug, Clone)]
pub enum Value {
    Byte(u8),
    SByte(i8),
    Short(i16),
    UShort(u16),
    Int(i32),
    UInt(u32),
    Long(i64),
    ULong(u64),
    Float(f32),
    Double(f64),
    String(String),
    /// Homogeneous sequence of one scalar kind.
    Array(Array),
    /// Heterogeneous sequence; elements are scalars or nested lists.
    List(Vec<Value>),
}

/// Homogeneous array payload, one variant per scalar kind.
#[derive(Debug, Clone)]
pub enum Array {
    Byte(Vec<u8>),
    SByte(Vec<i8>),
    Short(Vec<i16>),
    UShort(Vec<u16>),
    Int(Vec<i32>),
    UInt(Vec<u32>),
    Long(Vec<i64>),
    ULong(Vec<u64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    String(Vec<String>),
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Byte(_) => Kind::Byte,
            Value::SByte(_) => Kind::SByte,
            Value::Short(_) => Kind::Short,
            Value::UShort(_) => Kind::UShort,
            Value::Int(_) => Kind::Int,
            Value::UInt(_) => Kind::UInt,
            Value::Long(_) => Kind::Long,
            Value::ULong(_) => Kind::ULong,
            Value::Float(_) => Kind::Float,
            Value::Double(_) => Kind::Double,
            Value::String(_) => Kind::String,
            Value::Array(_) => Kind::Array,
            Value::List(_) => Kind::List,
        }
    }

    /// Builds a list from anything convertible into values.
    ///
    /// ```
    /// use df2::Value;
    ///
    /// let list = Value::list([Value::from(1u8), Value::from("two"), Value::from(3.0f64)]);
    /// assert_eq!(list.as_list().map(|l| l.len()), Some(3));
    /// ```
    pub fn list<I>(items: I) -> Value
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Rejects payloads the wire format cannot carry.
    pub(crate) fn check_encodable(&self) -> Result<()> {
        self.check_at(0)
    }

    fn check_at(&self, depth: usize) -> Result<()> {
        match self {
            Value::String(s) => check_no_nul(s),
            Value::Array(array) => {
                if u32::try_from(array.len()).is_err() {
                    return Err(Df2Error::Argument(format!(
                        "array of {} elements exceeds the u32 count",
                        array.len()
                    )));
                }
                if let Array::String(items) = array {
                    items.iter().try_for_each(|s| check_no_nul(s))?;
                }
                Ok(())
            }
            Value::List(items) => {
                if depth >= MAX_LIST_DEPTH {
                    return Err(Df2Error::Argument(format!(
                        "lists nest deeper than {MAX_LIST_DEPTH} levels"
                    )));
                }
                items.iter().try_for_each(|item| match item {
                    Value::Array(_) => Err(Df2Error::Argument(
                        "arrays cannot be nested inside a list".to_string(),
                    )),
                    other => other.check_at(depth + 1),
                })
            }
            _ => Ok(()),
        }
    }
}

fn check_no_nul(s: &str) -> Result<()> {
    if s.contains('\0') {
        return Err(Df2Error::Argument(
            "strings may not contain a NUL byte".to_string(),
        ));
    }
    Ok(())
}

impl Array {
    pub fn element_kind(&self) -> Kind {
        match self {
            Array::Byte(_) => Kind::Byte,
            Array::SByte(_) => Kind::SByte,
            Array::Short(_) => Kind::Short,
            Array::UShort(_) => Kind::UShort,
            Array::Int(_) => Kind::Int,
            Array::UInt(_) => Kind::UInt,
            Array::Long(_) => Kind::Long,
            Array::ULong(_) => Kind::ULong,
            Array::Float(_) => Kind::Float,
            Array::Double(_) => Kind::Double,
            Array::String(_) => Kind::String,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Array::Byte(v) => v.len(),
            Array::SByte(v) => v.len(),
            Array::Short(v) => v.len(),
            Array::UShort(v) => v.len(),
            Array::Int(v) => v.len(),
            Array::UInt(v) => v.len(),
            Array::Long(v) => v.len(),
            Array::ULong(v) => v.len(),
            Array::Float(v) => v.len(),
            Array::Double(v) => v.len(),
            Array::String(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn f32_slices_eq(a: &[f32], b: &[f32]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
}

fn f64_slices_eq(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
}

impl PartialEq for Array {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Array::Byte(a), Array::Byte(b)) => a == b,
            (Array::SByte(a), Array::SByte(b)) => a == b,
            (Array::Short(a), Array::Short(b)) => a == b,
            (Array::UShort(a), Array::UShort(b)) => a == b,
            (Array::Int(a), Array::Int(b)) => a == b,
            (Array::UInt(a), Array::UInt(b)) => a == b,
            (Array::Long(a), Array::Long(b)) => a == b,
            (Array::ULong(a), Array::ULong(b)) => a == b,
            (Array::Float(a), Array::Float(b)) => f32_slices_eq(a, b),
            (Array::Double(a), Array::Double(b)) => f64_slices_eq(a, b),
            (Array::String(a), Array::String(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::SByte(a), Value::SByte(b)) => a == b,
            (Value::Short(a), Value::Short(b)) => a == b,
            (Value::UShort(a), Value::UShort(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::UInt(a), Value::UInt(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::ULong(a), Value::ULong(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Array {}
impl Eq for Value {}

macro_rules! scalar_conversions {
    ($($ty:ty => $variant:ident, $getter:ident;)*) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }

            impl From<Vec<$ty>> for Array {
                fn from(v: Vec<$ty>) -> Self {
                    Array::$variant(v)
                }
            }

            impl From<Vec<$ty>> for Value {
                fn from(v: Vec<$ty>) -> Self {
                    Value::Array(Array::$variant(v))
                }
            }

            impl Value {
                pub fn $getter(&self) -> Option<$ty> {
                    match self {
                        Value::$variant(v) => Some(*v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

scalar_conversions! {
    u8 => Byte, as_byte;
    i8 => SByte, as_sbyte;
    i16 => Short, as_short;
    u16 => UShort, as_ushort;
    i32 => Int, as_int;
    u32 => UInt, as_uint;
    i64 => Long, as_long;
    u64 => ULong, as_ulong;
    f32 => Float, as_float;
    f64 => Double, as_double;
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Vec<String>> for Array {
    fn from(v: Vec<String>) -> Self {
        Array::String(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::Array(Array::String(v))
    }
}

impl From<Array> for Value {
    fn from(v: Array) -> Self {
        Value::Array(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}
