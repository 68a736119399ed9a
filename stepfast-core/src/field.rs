/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Field types for STEP outer messages.
//!
//! This module provides:
//! - [`tags`]: The structural tag vocabulary of the STEP framing
//! - [`FieldRef`]: Zero-copy reference to a field within a message buffer
//! - [`OwnedField`]: Owned field for storage beyond the buffer lifetime

use crate::error::DecodeError;
use bytes::Bytes;
use std::str::FromStr;

/// Structural STEP tag numbers.
pub mod tags {
    /// BeginString, first field of every message.
    pub const BEGIN_STRING: u32 = 8;
    /// BodyLength, byte count from MsgType up to CheckSum.
    pub const BODY_LENGTH: u32 = 9;
    /// CheckSum, last field of every message.
    pub const CHECKSUM: u32 = 10;
    /// MsgType.
    pub const MSG_TYPE: u32 = 35;
    /// Byte length of the following raw data field.
    pub const RAW_DATA_LENGTH: u32 = 95;
    /// Raw data, read by length rather than by delimiter.
    pub const RAW_DATA: u32 = 96;
}

/// Zero-copy reference to a field within a STEP message buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRef<'a> {
    /// The field tag number.
    pub tag: u32,
    /// Reference to the field value bytes (without delimiters).
    pub value: &'a [u8],
    /// Absolute offset of the first value byte in the scanned buffer.
    pub offset: usize,
}

impl<'a> FieldRef<'a> {
    /// Creates a new field reference.
    ///
    /// # Arguments
    /// * `tag` - The field tag number
    /// * `value` - Reference to the value bytes
    /// * `offset` - Absolute offset of the value in the buffer
    #[inline]
    #[must_use]
    pub const fn new(tag: u32, value: &'a [u8], offset: usize) -> Self {
        Self { tag, value, offset }
    }

    /// Returns the value as a string slice.
    ///
    /// # Errors
    /// Returns `DecodeError::InvalidUtf8` if the value is not valid UTF-8.
    pub fn as_str(&self) -> Result<&'a str, DecodeError> {
        std::str::from_utf8(self.value).map_err(DecodeError::from)
    }

    /// Parses the value as the specified type.
    ///
    /// # Errors
    /// Returns `DecodeError::InvalidFieldValue` if parsing fails.
    pub fn parse<T: FromStr>(&self) -> Result<T, DecodeError> {
        let s = self.as_str()?;
        s.parse().map_err(|_| DecodeError::InvalidFieldValue {
            tag: self.tag,
            reason: format!("failed to parse '{}' as {}", s, std::any::type_name::<T>()),
        })
    }

    /// Returns the value as a u64.
    ///
    /// # Errors
    /// Returns `DecodeError::InvalidFieldValue` if the value is not a valid integer.
    pub fn as_u64(&self) -> Result<u64, DecodeError> {
        self.parse()
    }

    /// Returns the value as an i64.
    ///
    /// # Errors
    /// Returns `DecodeError::InvalidFieldValue` if the value is not a valid integer.
    pub fn as_i64(&self) -> Result<i64, DecodeError> {
        self.parse()
    }

    /// Returns the raw bytes of the value.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &'a [u8] {
        self.value
    }

    /// Returns the length of the value in bytes.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.value.len()
    }

    /// Returns true if the value is empty.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Copies the field into an owned representation.
    #[must_use]
    pub fn to_owned_field(&self) -> OwnedField {
        OwnedField {
            tag: self.tag,
            value: Bytes::copy_from_slice(self.value),
        }
    }
}

/// Owned STEP field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedField {
    /// The field tag number.
    pub tag: u32,
    /// The field value bytes.
    pub value: Bytes,
}

impl OwnedField {
    /// Returns the value as a string slice, if it is valid UTF-8.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.value).ok()
    }
}
