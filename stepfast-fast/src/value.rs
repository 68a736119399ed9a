/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! FAST scalar types and values.
//!
//! This module provides:
//! - [`ScalarType`]: Declared wire type of a field
//! - [`FastDecimal`]: Exponent/mantissa decimal as transmitted
//! - [`ScalarValue`]: Decoded (or template-declared) scalar

use bytes::Bytes;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest decimal exponent magnitude allowed on the wire.
pub const MAX_DECIMAL_EXPONENT: i64 = 63;

/// Declared type of a FAST scalar field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    /// Signed 32-bit integer.
    Int32,
    /// Unsigned 32-bit integer.
    UInt32,
    /// Signed 64-bit integer.
    Int64,
    /// Unsigned 64-bit integer.
    UInt64,
    /// 7-bit ASCII string, stop-bit terminated.
    Ascii,
    /// UTF-8 string, length-prefixed.
    Unicode,
    /// Raw bytes, length-prefixed.
    ByteVector,
    /// Scaled decimal.
    Decimal,
}

impl ScalarType {
    /// Returns the type name used in templates and error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Int32 => "int32",
            Self::UInt32 => "uInt32",
            Self::Int64 => "int64",
            Self::UInt64 => "uInt64",
            Self::Ascii => "string",
            Self::Unicode => "unicode",
            Self::ByteVector => "byteVector",
            Self::Decimal => "decimal",
        }
    }

    /// Returns true for the four integer types.
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::Int32 | Self::UInt32 | Self::Int64 | Self::UInt64)
    }

    /// Returns true for strings and byte vectors.
    #[must_use]
    pub const fn is_sequence_of_bytes(self) -> bool {
        matches!(self, Self::Ascii | Self::Unicode | Self::ByteVector)
    }

    /// Converts an integer into a value of this type, if it fits the width.
    #[must_use]
    pub fn int_value(self, value: i128) -> Option<ScalarValue> {
        match self {
            Self::Int32 => i32::try_from(value).ok().map(|v| ScalarValue::Int(i64::from(v))),
            Self::Int64 => i64::try_from(value).ok().map(ScalarValue::Int),
            Self::UInt32 => u32::try_from(value)
                .ok()
                .map(|v| ScalarValue::UInt(u64::from(v))),
            Self::UInt64 => u64::try_from(value).ok().map(ScalarValue::UInt),
            _ => None,
        }
    }

    /// Builds a value of this type from raw bytes.
    ///
    /// Returns `None` if a string type receives invalid UTF-8 or the type is
    /// not a byte-sequence type.
    #[must_use]
    pub fn bytes_value(self, bytes: Vec<u8>) -> Option<ScalarValue> {
        match self {
            Self::Ascii | Self::Unicode => String::from_utf8(bytes).ok().map(ScalarValue::String),
            Self::ByteVector => Some(ScalarValue::Bytes(Bytes::from(bytes))),
            _ => None,
        }
    }

    /// Returns the base value used by Delta when nothing else is known.
    #[must_use]
    pub fn zero(self) -> ScalarValue {
        match self {
            Self::Int32 | Self::Int64 => ScalarValue::Int(0),
            Self::UInt32 | Self::UInt64 => ScalarValue::UInt(0),
            Self::Ascii | Self::Unicode => ScalarValue::String(String::new()),
            Self::ByteVector => ScalarValue::Bytes(Bytes::new()),
            Self::Decimal => ScalarValue::Decimal(FastDecimal::new(0, 0)),
        }
    }

    /// Returns true if `value` is a legal value of this type.
    #[must_use]
    pub fn accepts(self, value: &ScalarValue) -> bool {
        match (self, value) {
            (Self::Int32 | Self::Int64 | Self::UInt32 | Self::UInt64, v) => v
                .to_i128()
                .and_then(|i| self.int_value(i))
                .is_some_and(|converted| &converted == v),
            (Self::Ascii, ScalarValue::String(s)) => s.is_ascii(),
            (Self::Unicode, ScalarValue::String(_))
            | (Self::ByteVector, ScalarValue::Bytes(_)) => true,
            (Self::Decimal, ScalarValue::Decimal(d)) => {
                (-MAX_DECIMAL_EXPONENT..=MAX_DECIMAL_EXPONENT).contains(&i64::from(d.exponent))
            }
            _ => false,
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decimal as transmitted: `mantissa * 10^exponent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FastDecimal {
    /// Power of ten.
    pub exponent: i32,
    /// Scaled integer value.
    pub mantissa: i64,
}

impl FastDecimal {
    /// Creates a new decimal.
    #[must_use]
    pub const fn new(exponent: i32, mantissa: i64) -> Self {
        Self { exponent, mantissa }
    }

    /// Converts to a [`Decimal`], if it fits its 96-bit range and 28-digit scale.
    #[must_use]
    pub fn to_decimal(&self) -> Option<Decimal> {
        if self.exponent <= 0 {
            let scale = self.exponent.unsigned_abs();
            return Decimal::try_from_i128_with_scale(i128::from(self.mantissa), scale).ok();
        }
        let mut value = Decimal::from(self.mantissa);
        for _ in 0..self.exponent {
            value = value.checked_mul(Decimal::TEN)?;
        }
        Some(value)
    }
}

impl fmt::Display for FastDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_decimal() {
            Some(d) => write!(f, "{d}"),
            None => write!(f, "{}E{}", self.mantissa, self.exponent),
        }
    }
}

/// A FAST scalar value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarValue {
    /// Any signed integer type.
    Int(i64),
    /// Any unsigned integer type.
    UInt(u64),
    /// ASCII or Unicode string.
    String(String),
    /// Byte vector.
    Bytes(Bytes),
    /// Decimal.
    Decimal(FastDecimal),
}

impl ScalarValue {
    /// Returns the variant name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Decimal(_) => "decimal",
        }
    }

    /// Returns the value as i64, converting unsigned values that fit.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Returns the value as u64, converting non-negative signed values.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::UInt(v) => Some(*v),
            Self::Int(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Returns integer values widened to i128.
    #[must_use]
    pub fn to_i128(&self) -> Option<i128> {
        match self {
            Self::Int(v) => Some(i128::from(*v)),
            Self::UInt(v) => Some(i128::from(*v)),
            _ => None,
        }
    }

    /// Returns the string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the raw bytes of a string or byte vector.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::String(s) => Some(s.as_bytes()),
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the decimal value.
    #[must_use]
    pub const fn as_decimal(&self) -> Option<FastDecimal> {
        match self {
            Self::Decimal(d) => Some(*d),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::String(s) => f.write_str(s),
            Self::Bytes(b) => {
                for byte in b.iter() {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            Self::Decimal(d) => write!(f, "{d}"),
        }
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u64> for ScalarValue {
    fn from(value: u64) -> Self {
        Self::UInt(value)
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<FastDecimal> for ScalarValue {
    fn from(value: FastDecimal) -> Self {
        Self::Decimal(value)
    }
}
