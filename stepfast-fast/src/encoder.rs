/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! FAST protocol encoder.
//!
//! This module provides encoding of scalar values and presence maps using
//! FAST stop-bit encoding. It mirrors [`crate::codec`] and is used to build
//! payloads for tests and replay tools; operator compression is left to the
//! caller, which decides what to put on the wire.

use crate::error::FastError;
use crate::pmap::PresenceMap;
use crate::value::{FastDecimal, MAX_DECIMAL_EXPONENT, ScalarType, ScalarValue};
use bytes::{BufMut, Bytes, BytesMut};
use smallvec::SmallVec;

/// FAST protocol encoder.
#[derive(Debug, Default)]
pub struct FastEncoder {
    /// Output buffer.
    buffer: BytesMut,
}

impl FastEncoder {
    /// Creates a new FAST encoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new encoder with the specified buffer capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    fn write_unsigned(&mut self, value: u128) {
        let mut groups: SmallVec<[u8; 20]> = SmallVec::new();
        let mut v = value;

        loop {
            groups.push((v & 0x7F) as u8);
            v >>= 7;
            if v == 0 {
                break;
            }
        }

        groups[0] |= 0x80;
        self.buffer.extend(groups.iter().rev());
    }

    fn write_signed(&mut self, value: i128) {
        let mut groups: SmallVec<[u8; 20]> = SmallVec::new();
        let mut v = value;

        loop {
            let group = (v & 0x7F) as u8;
            groups.push(group);
            v >>= 7;

            // Stop once the remaining bits are pure sign extension of bit 6
            let sign_set = group & 0x40 != 0;
            if (v == 0 && !sign_set) || (v == -1 && sign_set) {
                break;
            }
        }

        groups[0] |= 0x80;
        self.buffer.extend(groups.iter().rev());
    }

    /// Encodes an unsigned integer.
    pub fn encode_uint(&mut self, value: u64) {
        self.write_unsigned(u128::from(value));
    }

    /// Encodes a signed integer.
    pub fn encode_int(&mut self, value: i64) {
        self.write_signed(i128::from(value));
    }

    /// Encodes a nullable unsigned integer (`None` as 0, otherwise value + 1).
    pub fn encode_nullable_uint(&mut self, value: Option<u64>) {
        match value {
            Some(v) => self.write_unsigned(u128::from(v) + 1),
            None => self.buffer.put_u8(0x80),
        }
    }

    /// Encodes a nullable signed integer.
    pub fn encode_nullable_int(&mut self, value: Option<i64>) {
        match value {
            Some(v) if v >= 0 => self.write_signed(i128::from(v) + 1),
            Some(v) => self.write_signed(i128::from(v)),
            None => self.buffer.put_u8(0x80),
        }
    }

    fn write_ascii(&mut self, bytes: &[u8]) {
        if let Some((last, head)) = bytes.split_last() {
            self.buffer.put_slice(head);
            self.buffer.put_u8(last | 0x80);
        }
    }

    fn check_ascii(value: &str) -> Result<(), FastError> {
        if value.is_ascii() {
            Ok(())
        } else {
            Err(FastError::TypeMismatch {
                expected: ScalarType::Ascii.name(),
                found: ScalarType::Unicode.name(),
            })
        }
    }

    /// Encodes a mandatory ASCII string.
    ///
    /// `"\0\0"` has no wire form of its own: it would share `0x00 0x80` with
    /// `"\0"` and is rejected.
    ///
    /// # Errors
    /// Returns `FastError::TypeMismatch` if the string is not 7-bit ASCII, or
    /// `FastError::InvalidString` for `"\0\0"`.
    pub fn encode_ascii(&mut self, value: &str) -> Result<(), FastError> {
        Self::check_ascii(value)?;
        match value.as_bytes() {
            [] => self.buffer.put_u8(0x80),
            [0] => self.buffer.put_slice(&[0x00, 0x80]),
            [0, 0] => return Err(self.unencodable_string()),
            bytes => self.write_ascii(bytes),
        }
        Ok(())
    }

    /// Encodes a nullable ASCII string.
    ///
    /// `"\0\0"` and `"\0\0\0"` would share the wire forms of `""` and
    /// `"\0"` and are rejected.
    ///
    /// # Errors
    /// Returns `FastError::TypeMismatch` if the string is not 7-bit ASCII, or
    /// `FastError::InvalidString` for the two NUL-only strings above.
    pub fn encode_nullable_ascii(&mut self, value: Option<&str>) -> Result<(), FastError> {
        let Some(value) = value else {
            self.buffer.put_u8(0x80);
            return Ok(());
        };
        Self::check_ascii(value)?;
        match value.as_bytes() {
            [] => self.buffer.put_slice(&[0x00, 0x80]),
            [0] => self.buffer.put_slice(&[0x00, 0x00, 0x80]),
            [0, 0] | [0, 0, 0] => return Err(self.unencodable_string()),
            bytes => self.write_ascii(bytes),
        }
        Ok(())
    }

    fn unencodable_string(&self) -> FastError {
        FastError::InvalidString {
            offset: self.buffer.len(),
        }
    }

    /// Encodes a mandatory byte vector with its length prefix.
    pub fn encode_bytes(&mut self, value: &[u8]) {
        self.encode_uint(value.len() as u64);
        self.buffer.put_slice(value);
    }

    /// Encodes a nullable byte vector.
    pub fn encode_nullable_bytes(&mut self, value: Option<&[u8]>) {
        match value {
            Some(bytes) => {
                self.encode_nullable_uint(Some(bytes.len() as u64));
                self.buffer.put_slice(bytes);
            }
            None => self.encode_nullable_uint(None),
        }
    }

    /// Encodes a mandatory Unicode string.
    pub fn encode_unicode(&mut self, value: &str) {
        self.encode_bytes(value.as_bytes());
    }

    /// Encodes a nullable Unicode string.
    pub fn encode_nullable_unicode(&mut self, value: Option<&str>) {
        self.encode_nullable_bytes(value.map(str::as_bytes));
    }

    fn check_exponent(value: FastDecimal) -> Result<(), FastError> {
        let exponent = i64::from(value.exponent);
        if (-MAX_DECIMAL_EXPONENT..=MAX_DECIMAL_EXPONENT).contains(&exponent) {
            Ok(())
        } else {
            Err(FastError::InvalidDecimal {
                offset: 0,
                exponent,
            })
        }
    }

    /// Encodes a mandatory decimal.
    ///
    /// # Errors
    /// Returns `FastError::InvalidDecimal` if the exponent is outside [-63, 63].
    pub fn encode_decimal(&mut self, value: FastDecimal) -> Result<(), FastError> {
        Self::check_exponent(value)?;
        self.encode_int(i64::from(value.exponent));
        self.encode_int(value.mantissa);
        Ok(())
    }

    /// Encodes a nullable decimal.
    ///
    /// # Errors
    /// Returns `FastError::InvalidDecimal` if the exponent is outside [-63, 63].
    pub fn encode_nullable_decimal(&mut self, value: Option<FastDecimal>) -> Result<(), FastError> {
        match value {
            Some(d) => {
                Self::check_exponent(d)?;
                self.encode_nullable_int(Some(i64::from(d.exponent)));
                self.encode_int(d.mantissa);
            }
            None => self.encode_nullable_int(None),
        }
        Ok(())
    }

    /// Encodes a scalar of the given type; `None` is only legal when `nullable`.
    ///
    /// # Errors
    /// Returns `FastError::TypeMismatch` if the value does not match `ty` or is
    /// null for a mandatory field.
    pub fn encode_scalar(
        &mut self,
        ty: ScalarType,
        nullable: bool,
        value: Option<&ScalarValue>,
    ) -> Result<(), FastError> {
        let mismatch = |found: &'static str| FastError::TypeMismatch {
            expected: ty.name(),
            found,
        };

        let Some(value) = value else {
            if !nullable {
                return Err(mismatch("null"));
            }
            match ty {
                ScalarType::Int32 | ScalarType::Int64 => self.encode_nullable_int(None),
                ScalarType::UInt32 | ScalarType::UInt64 => self.encode_nullable_uint(None),
                ScalarType::Ascii => self.encode_nullable_ascii(None)?,
                ScalarType::Unicode | ScalarType::ByteVector => self.encode_nullable_bytes(None),
                ScalarType::Decimal => self.encode_nullable_decimal(None)?,
            }
            return Ok(());
        };

        if !ty.accepts(value) {
            return Err(mismatch(value.type_name()));
        }

        match (ty, value) {
            (ScalarType::Int32 | ScalarType::Int64, ScalarValue::Int(v)) => {
                if nullable {
                    self.encode_nullable_int(Some(*v));
                } else {
                    self.encode_int(*v);
                }
            }
            (ScalarType::UInt32 | ScalarType::UInt64, ScalarValue::UInt(v)) => {
                if nullable {
                    self.encode_nullable_uint(Some(*v));
                } else {
                    self.encode_uint(*v);
                }
            }
            (ScalarType::Ascii, ScalarValue::String(s)) => {
                if nullable {
                    self.encode_nullable_ascii(Some(s.as_str()))?;
                } else {
                    self.encode_ascii(s)?;
                }
            }
            (ScalarType::Unicode, ScalarValue::String(s)) => {
                if nullable {
                    self.encode_nullable_unicode(Some(s.as_str()));
                } else {
                    self.encode_unicode(s);
                }
            }
            (ScalarType::ByteVector, ScalarValue::Bytes(b)) => {
                if nullable {
                    self.encode_nullable_bytes(Some(&b[..]));
                } else {
                    self.encode_bytes(b);
                }
            }
            (ScalarType::Decimal, ScalarValue::Decimal(d)) => {
                if nullable {
                    self.encode_nullable_decimal(Some(*d))?;
                } else {
                    self.encode_decimal(*d)?;
                }
            }
            (_, other) => return Err(mismatch(other.type_name())),
        }
        Ok(())
    }

    /// Encodes a presence map.
    pub fn encode_pmap(&mut self, pmap: &PresenceMap) {
        self.buffer.put_slice(&pmap.encode());
    }

    /// Appends raw bytes.
    pub fn put_raw(&mut self, bytes: &[u8]) {
        self.buffer.put_slice(bytes);
    }

    /// Returns the encoded bytes and consumes the encoder.
    #[must_use]
    pub fn finish(self) -> Bytes {
        self.buffer.freeze()
    }

    /// Returns the current buffer contents.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Returns the current buffer length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clears the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
