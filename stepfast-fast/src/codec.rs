/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! FAST scalar decoding.
//!
//! Stop-bit encoded integers, ASCII strings, length-prefixed byte vectors and
//! Unicode strings, and decimals, each in mandatory and nullable form.
//! Every function reads from `data` at `*offset` and advances the offset past
//! the consumed bytes.

use crate::error::FastError;
use crate::value::{FastDecimal, MAX_DECIMAL_EXPONENT, ScalarType, ScalarValue};
use bytes::Bytes;

/// Maximum bytes in one stop-bit encoded integer (ceil(64 / 7) + 1).
pub const MAX_STOP_BIT_LEN: usize = 10;

fn read_byte(data: &[u8], offset: &mut usize) -> Result<u8, FastError> {
    let byte = *data
        .get(*offset)
        .ok_or(FastError::UnexpectedEof { offset: *offset })?;
    *offset += 1;
    Ok(byte)
}

fn read_unsigned(data: &[u8], offset: &mut usize) -> Result<u128, FastError> {
    let start = *offset;
    let mut result: u128 = 0;

    loop {
        let byte = read_byte(data, offset)?;
        if *offset - start > MAX_STOP_BIT_LEN {
            return Err(FastError::IntegerOverflow { offset: start });
        }

        result = (result << 7) | u128::from(byte & 0x7F);

        if byte & 0x80 != 0 {
            return Ok(result);
        }
    }
}

fn read_signed(data: &[u8], offset: &mut usize) -> Result<i128, FastError> {
    let start = *offset;
    let first = *data
        .get(start)
        .ok_or(FastError::UnexpectedEof { offset: start })?;

    // Sign extension from bit 6 of the first group
    let mut result: i128 = if first & 0x40 != 0 { -1 } else { 0 };

    loop {
        let byte = read_byte(data, offset)?;
        if *offset - start > MAX_STOP_BIT_LEN {
            return Err(FastError::IntegerOverflow { offset: start });
        }

        result = (result << 7) | i128::from(byte & 0x7F);

        if byte & 0x80 != 0 {
            return Ok(result);
        }
    }
}

fn read_exact(data: &[u8], offset: &mut usize, len: u64) -> Result<Bytes, FastError> {
    let available = data.len().saturating_sub(*offset);
    let end = usize::try_from(len)
        .ok()
        .filter(|len| *len <= available)
        .map(|len| *offset + len)
        .ok_or(FastError::TruncatedPayload {
            offset: *offset,
            expected: len,
            available,
        })?;

    let bytes = Bytes::copy_from_slice(&data[*offset..end]);
    *offset = end;
    Ok(bytes)
}

/// Decodes a mandatory unsigned integer.
///
/// # Arguments
/// * `data` - The input bytes
/// * `offset` - Current position (will be updated)
///
/// # Errors
/// Returns `FastError::UnexpectedEof` if no stop byte is found, or
/// `FastError::IntegerOverflow` if the value does not fit in 64 bits.
pub fn decode_uint(data: &[u8], offset: &mut usize) -> Result<u64, FastError> {
    let start = *offset;
    let raw = read_unsigned(data, offset)?;
    u64::try_from(raw).map_err(|_| FastError::IntegerOverflow { offset: start })
}

/// Decodes a nullable unsigned integer (wire 0 is null, otherwise value + 1).
///
/// # Errors
/// Same as [`decode_uint`].
pub fn decode_nullable_uint(data: &[u8], offset: &mut usize) -> Result<Option<u64>, FastError> {
    let start = *offset;
    match read_unsigned(data, offset)? {
        0 => Ok(None),
        raw => u64::try_from(raw - 1)
            .map(Some)
            .map_err(|_| FastError::IntegerOverflow { offset: start }),
    }
}

/// Decodes a mandatory signed integer.
///
/// # Errors
/// Returns `FastError::UnexpectedEof` if no stop byte is found, or
/// `FastError::IntegerOverflow` if the value does not fit in 64 bits.
pub fn decode_int(data: &[u8], offset: &mut usize) -> Result<i64, FastError> {
    let start = *offset;
    let raw = read_signed(data, offset)?;
    i64::try_from(raw).map_err(|_| FastError::IntegerOverflow { offset: start })
}

/// Decodes a nullable signed integer.
///
/// Non-negative values are transmitted as value + 1 and wire 0 is null;
/// negative values are transmitted unchanged.
///
/// # Errors
/// Same as [`decode_int`].
pub fn decode_nullable_int(data: &[u8], offset: &mut usize) -> Result<Option<i64>, FastError> {
    let start = *offset;
    let raw = match read_signed(data, offset)? {
        0 => return Ok(None),
        raw if raw > 0 => raw - 1,
        raw => raw,
    };
    i64::try_from(raw)
        .map(Some)
        .map_err(|_| FastError::IntegerOverflow { offset: start })
}

fn read_ascii(data: &[u8], offset: &mut usize) -> Result<Vec<u8>, FastError> {
    let mut result = Vec::new();

    loop {
        let byte = read_byte(data, offset)?;
        result.push(byte & 0x7F);

        if byte & 0x80 != 0 {
            return Ok(result);
        }
    }
}

fn ascii_string(bytes: Vec<u8>, start: usize) -> Result<String, FastError> {
    String::from_utf8(bytes).map_err(|_| FastError::InvalidString { offset: start })
}

/// Decodes a mandatory ASCII string.
///
/// `0x80` is the empty string and `0x00 0x80` is a single NUL character.
///
/// # Errors
/// Returns `FastError::UnexpectedEof` if no stop byte is found.
pub fn decode_ascii(data: &[u8], offset: &mut usize) -> Result<String, FastError> {
    let start = *offset;
    let bytes = read_ascii(data, offset)?;
    match bytes.as_slice() {
        [0] => Ok(String::new()),
        [0, 0] => Ok("\0".to_string()),
        _ => ascii_string(bytes, start),
    }
}

/// Decodes a nullable ASCII string.
///
/// `0x80` is null, `0x00 0x80` is the empty string and `0x00 0x00 0x80` is a
/// single NUL character.
///
/// # Errors
/// Returns `FastError::UnexpectedEof` if no stop byte is found.
pub fn decode_nullable_ascii(data: &[u8], offset: &mut usize) -> Result<Option<String>, FastError> {
    let start = *offset;
    let bytes = read_ascii(data, offset)?;
    match bytes.as_slice() {
        [0] => Ok(None),
        [0, 0] => Ok(Some(String::new())),
        [0, 0, 0] => Ok(Some("\0".to_string())),
        _ => ascii_string(bytes, start).map(Some),
    }
}

/// Decodes a mandatory byte vector: unsigned length, then that many bytes.
///
/// # Errors
/// Returns `FastError::UnexpectedEof` if the length prefix is incomplete, or
/// `FastError::TruncatedPayload` if fewer than `length` bytes follow.
pub fn decode_bytes(data: &[u8], offset: &mut usize) -> Result<Bytes, FastError> {
    let len = decode_uint(data, offset)?;
    read_exact(data, offset, len)
}

/// Decodes a nullable byte vector.
///
/// A null length yields `None` without reading further; a zero length yields
/// an empty vector.
///
/// # Errors
/// Same as [`decode_bytes`].
pub fn decode_nullable_bytes(data: &[u8], offset: &mut usize) -> Result<Option<Bytes>, FastError> {
    match decode_nullable_uint(data, offset)? {
        None => Ok(None),
        Some(len) => read_exact(data, offset, len).map(Some),
    }
}

fn utf8_string(bytes: Bytes, start: usize) -> Result<String, FastError> {
    String::from_utf8(bytes.to_vec()).map_err(|_| FastError::InvalidString { offset: start })
}

/// Decodes a mandatory Unicode string (length-prefixed UTF-8).
///
/// # Errors
/// Same as [`decode_bytes`], plus `FastError::InvalidString` on bad UTF-8.
pub fn decode_unicode(data: &[u8], offset: &mut usize) -> Result<String, FastError> {
    let start = *offset;
    let bytes = decode_bytes(data, offset)?;
    utf8_string(bytes, start)
}

/// Decodes a nullable Unicode string.
///
/// # Errors
/// Same as [`decode_unicode`].
pub fn decode_nullable_unicode(data: &[u8], offset: &mut usize) -> Result<Option<String>, FastError> {
    let start = *offset;
    decode_nullable_bytes(data, offset)?
        .map(|bytes| utf8_string(bytes, start))
        .transpose()
}

fn checked_exponent(exponent: i64, offset: usize) -> Result<i32, FastError> {
    if (-MAX_DECIMAL_EXPONENT..=MAX_DECIMAL_EXPONENT).contains(&exponent) {
        i32::try_from(exponent).map_err(|_| FastError::InvalidDecimal { offset, exponent })
    } else {
        Err(FastError::InvalidDecimal { offset, exponent })
    }
}

/// Decodes a mandatory decimal: signed exponent, then signed mantissa.
///
/// # Errors
/// Returns `FastError::InvalidDecimal` if the exponent is outside [-63, 63].
pub fn decode_decimal(data: &[u8], offset: &mut usize) -> Result<FastDecimal, FastError> {
    let start = *offset;
    let exponent = checked_exponent(decode_int(data, offset)?, start)?;
    let mantissa = decode_int(data, offset)?;
    Ok(FastDecimal::new(exponent, mantissa))
}

/// Decodes a nullable decimal. A null exponent is a null decimal and no
/// mantissa follows.
///
/// # Errors
/// Same as [`decode_decimal`].
pub fn decode_nullable_decimal(
    data: &[u8],
    offset: &mut usize,
) -> Result<Option<FastDecimal>, FastError> {
    let start = *offset;
    let Some(exponent) = decode_nullable_int(data, offset)? else {
        return Ok(None);
    };
    let exponent = checked_exponent(exponent, start)?;
    let mantissa = decode_int(data, offset)?;
    Ok(Some(FastDecimal::new(exponent, mantissa)))
}

/// Decodes one scalar of the given type.
///
/// Mandatory fields always yield `Some`. Integer values are range-checked
/// against the declared width.
///
/// # Errors
/// Propagates the errors of the type-specific decoders, and returns
/// `FastError::IntegerOverflow` for an integer outside the declared width.
pub fn decode_scalar(
    ty: ScalarType,
    nullable: bool,
    data: &[u8],
    offset: &mut usize,
) -> Result<Option<ScalarValue>, FastError> {
    let start = *offset;
    let value = match ty {
        ScalarType::Int32 | ScalarType::Int64 => {
            let raw = if nullable {
                decode_nullable_int(data, offset)?
            } else {
                Some(decode_int(data, offset)?)
            };
            raw.map(|v| {
                ty.int_value(i128::from(v))
                    .ok_or(FastError::IntegerOverflow { offset: start })
            })
            .transpose()?
        }
        ScalarType::UInt32 | ScalarType::UInt64 => {
            let raw = if nullable {
                decode_nullable_uint(data, offset)?
            } else {
                Some(decode_uint(data, offset)?)
            };
            raw.map(|v| {
                ty.int_value(i128::from(v))
                    .ok_or(FastError::IntegerOverflow { offset: start })
            })
            .transpose()?
        }
        ScalarType::Ascii => {
            let s = if nullable {
                decode_nullable_ascii(data, offset)?
            } else {
                Some(decode_ascii(data, offset)?)
            };
            s.map(ScalarValue::String)
        }
        ScalarType::Unicode => {
            let s = if nullable {
                decode_nullable_unicode(data, offset)?
            } else {
                Some(decode_unicode(data, offset)?)
            };
            s.map(ScalarValue::String)
        }
        ScalarType::ByteVector => {
            let b = if nullable {
                decode_nullable_bytes(data, offset)?
            } else {
                Some(decode_bytes(data, offset)?)
            };
            b.map(ScalarValue::Bytes)
        }
        ScalarType::Decimal => {
            let d = if nullable {
                decode_nullable_decimal(data, offset)?
            } else {
                Some(decode_decimal(data, offset)?)
            };
            d.map(ScalarValue::Decimal)
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_uint() {
        // 0x81 = 1 with stop bit
        let data = [0x81];
        let mut offset = 0;
        assert_eq!(decode_uint(&data, &mut offset).unwrap(), 1);
        assert_eq!(offset, 1);

        // 942755 = 0x39 0x45 0xA3
        let data = [0x39, 0x45, 0xA3];
        let mut offset = 0;
        assert_eq!(decode_uint(&data, &mut offset).unwrap(), 942_755);
        assert_eq!(offset, 3);
    }

    #[test]
    fn test_decode_int_sign_extension() {
        let mut offset = 0;
        assert_eq!(decode_int(&[0xFF], &mut offset).unwrap(), -1);

        // 64 needs a leading zero group to keep bit 6 clear
        let mut offset = 0;
        assert_eq!(decode_int(&[0x00, 0xC0], &mut offset).unwrap(), 64);

        let mut offset = 0;
        assert_eq!(decode_int(&[0x7F, 0xBF], &mut offset).unwrap(), -65);
    }

    #[test]
    fn test_decode_nullable_integers() {
        let mut offset = 0;
        assert_eq!(decode_nullable_uint(&[0x80], &mut offset).unwrap(), None);
        let mut offset = 0;
        assert_eq!(decode_nullable_uint(&[0x81], &mut offset).unwrap(), Some(0));
        let mut offset = 0;
        assert_eq!(decode_nullable_int(&[0x80], &mut offset).unwrap(), None);
        let mut offset = 0;
        assert_eq!(decode_nullable_int(&[0x82], &mut offset).unwrap(), Some(1));
        let mut offset = 0;
        assert_eq!(decode_nullable_int(&[0xFF], &mut offset).unwrap(), Some(-1));
    }

    #[test]
    fn test_decode_uint_eof_is_distinct() {
        let data = [0x01, 0x02];
        let mut offset = 0;
        assert_eq!(
            decode_uint(&data, &mut offset),
            Err(FastError::UnexpectedEof { offset: 2 })
        );
    }

    #[test]
    fn test_decode_uint_overlong() {
        let data = [0x00; 11];
        let mut offset = 0;
        assert_eq!(
            decode_uint(&data, &mut offset),
            Err(FastError::IntegerOverflow { offset: 0 })
        );
    }

    #[test]
    fn test_decode_ascii() {
        let data = [0x48, 0x65, 0x6C, 0x6C, 0xEF];
        let mut offset = 0;
        assert_eq!(decode_ascii(&data, &mut offset).unwrap(), "Hello");
        assert_eq!(offset, 5);

        let mut offset = 0;
        assert_eq!(decode_ascii(&[0x80], &mut offset).unwrap(), "");
        let mut offset = 0;
        assert_eq!(decode_ascii(&[0x00, 0x80], &mut offset).unwrap(), "\0");
    }

    #[test]
    fn test_decode_nullable_ascii() {
        let mut offset = 0;
        assert_eq!(decode_nullable_ascii(&[0x80], &mut offset).unwrap(), None);
        let mut offset = 0;
        assert_eq!(
            decode_nullable_ascii(&[0x00, 0x80], &mut offset).unwrap(),
            Some(String::new())
        );
        let mut offset = 0;
        assert_eq!(
            decode_nullable_ascii(&[0x31, 0x30, 0xB2], &mut offset).unwrap(),
            Some("102".to_string())
        );
    }

    #[test]
    fn test_decode_nullable_bytes() {
        // null length reads nothing further
        let data = [0x80, 0xFF];
        let mut offset = 0;
        assert_eq!(decode_nullable_bytes(&data, &mut offset).unwrap(), None);
        assert_eq!(offset, 1);

        // zero length is empty, not null
        let mut offset = 0;
        assert_eq!(
            decode_nullable_bytes(&[0x81], &mut offset).unwrap(),
            Some(Bytes::new())
        );

        let data = [0x83, 0xDE, 0xAD];
        let mut offset = 0;
        assert_eq!(
            decode_nullable_bytes(&data, &mut offset).unwrap(),
            Some(Bytes::from_static(&[0xDE, 0xAD]))
        );
    }

    #[test]
    fn test_decode_bytes_truncated() {
        let data = [0x84, 0x01, 0x02];
        let mut offset = 0;
        assert_eq!(
            decode_bytes(&data, &mut offset),
            Err(FastError::TruncatedPayload {
                offset: 1,
                expected: 4,
                available: 2
            })
        );

        let mut offset = 0;
        assert_eq!(
            decode_nullable_bytes(&[0x05], &mut offset),
            Err(FastError::UnexpectedEof { offset: 1 })
        );
    }

    #[test]
    fn test_decode_decimal() {
        // exponent -2, mantissa 12345
        let data = [0xFE, 0x00, 0x60, 0xB9];
        let mut offset = 0;
        assert_eq!(
            decode_decimal(&data, &mut offset).unwrap(),
            FastDecimal::new(-2, 12345)
        );
        assert_eq!(offset, 4);

        let mut offset = 0;
        assert_eq!(decode_nullable_decimal(&[0x80], &mut offset).unwrap(), None);
        assert_eq!(offset, 1);

        let mut offset = 0;
        assert_eq!(
            decode_decimal(&[0x01, 0xC0, 0x81], &mut offset),
            Err(FastError::InvalidDecimal {
                offset: 0,
                exponent: 192
            })
        );
    }

    #[test]
    fn test_decode_scalar_width_check() {
        // 2^32 does not fit uInt32
        let data = [0x10, 0x00, 0x00, 0x00, 0x80];
        let mut offset = 0;
        assert_eq!(
            decode_scalar(ScalarType::UInt32, false, &data, &mut offset),
            Err(FastError::IntegerOverflow { offset: 0 })
        );

        let mut offset = 0;
        assert_eq!(
            decode_scalar(ScalarType::UInt64, false, &data, &mut offset).unwrap(),
            Some(ScalarValue::UInt(1 << 32))
        );
    }
}
