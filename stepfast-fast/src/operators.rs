/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! FAST field operators.
//!
//! Operators define how field values are decoded relative to previous values
//! in the dictionary. [`decode_field`] applies one field instruction: it
//! consumes the presence bit the operator needs, reads from the stream when
//! the value is transmitted, and otherwise derives the value from the
//! dictionary or the template's initial value.

use crate::codec;
use crate::dictionary::{Dictionary, DictionaryKey, TemplateScope};
use crate::error::FastError;
use crate::pmap::PresenceMap;
use crate::template::ScalarField;
use crate::value::{FastDecimal, MAX_DECIMAL_EXPONENT, ScalarType, ScalarValue};
use serde::{Deserialize, Serialize};

/// FAST field operator types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Operator {
    /// No operator - value is always present in stream.
    #[default]
    None,
    /// Constant - value is never in stream, always uses initial value.
    Constant,
    /// Default - if absent, use initial value.
    Default,
    /// Copy - if absent, use previous value from dictionary.
    Copy,
    /// Increment - if absent, increment previous value by 1.
    Increment,
    /// Delta - value in stream is delta from previous value.
    Delta,
    /// Tail - value in stream replaces tail of previous value.
    Tail,
}

impl Operator {
    /// Returns true if this operator uses the dictionary.
    #[must_use]
    pub const fn uses_dictionary(&self) -> bool {
        matches!(
            self,
            Self::Copy | Self::Increment | Self::Delta | Self::Tail
        )
    }

    /// Returns true if a field with this operator takes a presence map bit.
    ///
    /// Optional fields without an operator signal absence through the
    /// nullable encoding instead of a bit; Delta values are always sent.
    #[must_use]
    pub const fn requires_pmap_bit(&self, optional: bool) -> bool {
        match self {
            Self::None | Self::Delta => false,
            Self::Constant => optional,
            Self::Default | Self::Copy | Self::Increment | Self::Tail => true,
        }
    }

    /// Returns true if the value can be absent from the stream.
    #[must_use]
    pub const fn can_be_absent(&self) -> bool {
        matches!(
            self,
            Self::Constant | Self::Default | Self::Copy | Self::Increment | Self::Tail
        )
    }
}

/// Dictionary scope for operator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DictionaryScope {
    /// Global dictionary shared across all templates.
    Global,
    /// Template-specific dictionary.
    #[default]
    Template,
    /// Dictionary shared by templates of the same application type.
    Type,
}

/// State for a dictionary entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DictionaryValue {
    /// No value has been set.
    #[default]
    Undefined,
    /// Value is explicitly empty/null.
    Empty,
    /// Last decoded value.
    Assigned(ScalarValue),
}

impl DictionaryValue {
    /// Returns true if the value is undefined.
    #[must_use]
    pub const fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Returns true if the value is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns the assigned value, if any.
    #[must_use]
    pub const fn as_value(&self) -> Option<&ScalarValue> {
        match self {
            Self::Assigned(v) => Some(v),
            _ => None,
        }
    }
}

fn undefined(field: &ScalarField) -> FastError {
    FastError::UndefinedDictionaryValue {
        key: field.dictionary_key().to_string(),
    }
}

fn mismatch(field: &ScalarField, value: &ScalarValue) -> FastError {
    FastError::TypeMismatch {
        expected: field.ty.name(),
        found: value.type_name(),
    }
}

fn store(dictionary: &mut Dictionary, key: DictionaryKey, value: Option<&ScalarValue>) {
    match value {
        Some(v) => dictionary.assign(key, v.clone()),
        None => dictionary.set(key, DictionaryValue::Empty),
    }
}

/// Decodes one scalar field instruction.
///
/// Returns `Ok(None)` when the field is null (absent optional field).
///
/// # Arguments
/// * `field` - The field instruction
/// * `scope` - Scope of the template being decoded, for dictionary keys
/// * `pmap` - Presence map of the enclosing segment
/// * `data` - The input bytes
/// * `offset` - Current position (will be updated)
/// * `dictionary` - Session dictionary
///
/// # Errors
/// Returns the codec error for a failed stream read,
/// `FastError::PresenceMapExhausted` for a missing presence bit,
/// `FastError::UndefinedDictionaryValue` when a mandatory field has no value
/// to fall back on, and `FastError::IntegerOverflow` when an increment or
/// delta leaves the field's range.
pub fn decode_field(
    field: &ScalarField,
    scope: &TemplateScope,
    pmap: &mut PresenceMap,
    data: &[u8],
    offset: &mut usize,
    dictionary: &mut Dictionary,
) -> Result<Option<ScalarValue>, FastError> {
    match field.operator {
        Operator::None => codec::decode_scalar(field.ty, field.optional, data, offset),
        Operator::Constant => {
            if field.optional && !pmap.next_bit()? {
                return Ok(None);
            }
            field.initial.clone().map(Some).ok_or_else(|| undefined(field))
        }
        Operator::Default => {
            if pmap.next_bit()? {
                codec::decode_scalar(field.ty, field.optional, data, offset)
            } else {
                match &field.initial {
                    Some(initial) => Ok(Some(initial.clone())),
                    None if field.optional => Ok(None),
                    None => Err(undefined(field)),
                }
            }
        }
        Operator::Copy | Operator::Increment => {
            let key = scope.key(field.dictionary, field.dictionary_key());
            if pmap.next_bit()? {
                let value = codec::decode_scalar(field.ty, field.optional, data, offset)?;
                store(dictionary, key, value.as_ref());
                Ok(value)
            } else {
                let increment = field.operator == Operator::Increment;
                reuse(field, key, dictionary, increment, *offset)
            }
        }
        Operator::Delta => {
            let key = scope.key(field.dictionary, field.dictionary_key());
            let value = match field.ty {
                ScalarType::Int32 | ScalarType::UInt32 | ScalarType::Int64 | ScalarType::UInt64 => {
                    delta_integer(field, &key, data, offset, dictionary)?
                }
                ScalarType::Decimal => delta_decimal(field, &key, data, offset, dictionary)?,
                ScalarType::Ascii | ScalarType::Unicode | ScalarType::ByteVector => {
                    delta_bytes(field, &key, data, offset, dictionary)?
                }
            };
            if let Some(v) = &value {
                dictionary.assign(key, v.clone());
            }
            Ok(value)
        }
        Operator::Tail => {
            let key = scope.key(field.dictionary, field.dictionary_key());
            if pmap.next_bit()? {
                tail(field, key, data, offset, dictionary)
            } else {
                reuse(field, key, dictionary, false, *offset)
            }
        }
    }
}

/// Resolves a field that was not transmitted from the dictionary.
fn reuse(
    field: &ScalarField,
    key: DictionaryKey,
    dictionary: &mut Dictionary,
    increment: bool,
    offset: usize,
) -> Result<Option<ScalarValue>, FastError> {
    match dictionary.get(&key) {
        DictionaryValue::Assigned(prior) if increment => {
            let next = prior
                .to_i128()
                .ok_or_else(|| mismatch(field, prior))?
                .checked_add(1)
                .and_then(|v| field.ty.int_value(v))
                .ok_or(FastError::IntegerOverflow { offset })?;
            dictionary.assign(key, next.clone());
            Ok(Some(next))
        }
        DictionaryValue::Assigned(prior) => Ok(Some(prior.clone())),
        DictionaryValue::Undefined => match &field.initial {
            Some(initial) => {
                dictionary.assign(key, initial.clone());
                Ok(Some(initial.clone()))
            }
            None if field.optional => {
                dictionary.set(key, DictionaryValue::Empty);
                Ok(None)
            }
            None => Err(undefined(field)),
        },
        DictionaryValue::Empty if field.optional => Ok(None),
        DictionaryValue::Empty => Err(undefined(field)),
    }
}

/// Base value for Delta: prior value, else initial value, else the type's zero.
fn delta_base(
    field: &ScalarField,
    key: &DictionaryKey,
    dictionary: &Dictionary,
) -> Result<ScalarValue, FastError> {
    match dictionary.get(key) {
        DictionaryValue::Assigned(prior) => Ok(prior.clone()),
        DictionaryValue::Undefined => Ok(field
            .initial
            .clone()
            .unwrap_or_else(|| field.ty.zero())),
        DictionaryValue::Empty => Err(undefined(field)),
    }
}

fn read_delta(field: &ScalarField, data: &[u8], offset: &mut usize) -> Result<Option<i64>, FastError> {
    if field.optional {
        codec::decode_nullable_int(data, offset)
    } else {
        codec::decode_int(data, offset).map(Some)
    }
}

fn delta_integer(
    field: &ScalarField,
    key: &DictionaryKey,
    data: &[u8],
    offset: &mut usize,
    dictionary: &Dictionary,
) -> Result<Option<ScalarValue>, FastError> {
    let start = *offset;
    let Some(delta) = read_delta(field, data, offset)? else {
        return Ok(None);
    };
    let base = delta_base(field, key, dictionary)?;
    let base = base.to_i128().ok_or_else(|| mismatch(field, &base))?;

    field
        .ty
        .int_value(base + i128::from(delta))
        .map(Some)
        .ok_or(FastError::IntegerOverflow { offset: start })
}

fn delta_decimal(
    field: &ScalarField,
    key: &DictionaryKey,
    data: &[u8],
    offset: &mut usize,
    dictionary: &Dictionary,
) -> Result<Option<ScalarValue>, FastError> {
    let start = *offset;
    let Some(exponent_delta) = read_delta(field, data, offset)? else {
        return Ok(None);
    };
    let mantissa_delta = codec::decode_int(data, offset)?;
    let base = delta_base(field, key, dictionary)?;
    let base = base.as_decimal().ok_or_else(|| mismatch(field, &base))?;

    let exponent = i64::from(base.exponent)
        .checked_add(exponent_delta)
        .ok_or(FastError::IntegerOverflow { offset: start })?;
    if !(-MAX_DECIMAL_EXPONENT..=MAX_DECIMAL_EXPONENT).contains(&exponent) {
        return Err(FastError::InvalidDecimal {
            offset: start,
            exponent,
        });
    }
    let mantissa = base
        .mantissa
        .checked_add(mantissa_delta)
        .ok_or(FastError::IntegerOverflow { offset: start })?;

    let exponent = i32::try_from(exponent).map_err(|_| FastError::InvalidDecimal {
        offset: start,
        exponent,
    })?;
    Ok(Some(ScalarValue::Decimal(FastDecimal::new(exponent, mantissa))))
}

/// Applies a string/byte vector delta.
///
/// A non-negative subtraction length removes that many bytes from the end of
/// the base and appends `diff`; a negative one removes `-len - 1` bytes from
/// the front and prepends `diff`.
fn apply_delta(base: &[u8], subtraction: i64, diff: &[u8]) -> Result<Vec<u8>, FastError> {
    let front = subtraction < 0;
    let count = if front {
        subtraction.unsigned_abs() - 1
    } else {
        subtraction.unsigned_abs()
    };
    let count = usize::try_from(count)
        .ok()
        .filter(|count| *count <= base.len())
        .ok_or(FastError::InvalidDelta {
            subtraction,
            base_len: base.len(),
        })?;

    let mut out = Vec::with_capacity(base.len() - count + diff.len());
    if front {
        out.extend_from_slice(diff);
        out.extend_from_slice(&base[count..]);
    } else {
        out.extend_from_slice(&base[..base.len() - count]);
        out.extend_from_slice(diff);
    }
    Ok(out)
}

fn delta_bytes(
    field: &ScalarField,
    key: &DictionaryKey,
    data: &[u8],
    offset: &mut usize,
    dictionary: &Dictionary,
) -> Result<Option<ScalarValue>, FastError> {
    let start = *offset;
    let Some(subtraction) = read_delta(field, data, offset)? else {
        return Ok(None);
    };
    let diff = match field.ty {
        ScalarType::Ascii => codec::decode_ascii(data, offset)?.into_bytes(),
        _ => codec::decode_bytes(data, offset)?.to_vec(),
    };
    let base = delta_base(field, key, dictionary)?;
    let base_bytes = base.as_bytes().ok_or_else(|| mismatch(field, &base))?;

    let combined = apply_delta(base_bytes, subtraction, &diff)?;
    field
        .ty
        .bytes_value(combined)
        .map(Some)
        .ok_or(FastError::InvalidString { offset: start })
}

fn tail(
    field: &ScalarField,
    key: DictionaryKey,
    data: &[u8],
    offset: &mut usize,
    dictionary: &mut Dictionary,
) -> Result<Option<ScalarValue>, FastError> {
    let start = *offset;
    let tail = match (field.ty, field.optional) {
        (ScalarType::Ascii, true) => codec::decode_nullable_ascii(data, offset)?.map(String::into_bytes),
        (ScalarType::Ascii, false) => Some(codec::decode_ascii(data, offset)?.into_bytes()),
        (_, true) => codec::decode_nullable_bytes(data, offset)?.map(|b| b.to_vec()),
        (_, false) => Some(codec::decode_bytes(data, offset)?.to_vec()),
    };
    let Some(tail) = tail else {
        dictionary.set(key, DictionaryValue::Empty);
        return Ok(None);
    };

    let base = match dictionary.get(&key) {
        DictionaryValue::Assigned(prior) => prior.clone(),
        _ => field
            .initial
            .clone()
            .unwrap_or_else(|| field.ty.zero()),
    };
    let base_bytes = base.as_bytes().ok_or_else(|| mismatch(field, &base))?;

    let combined = if tail.len() >= base_bytes.len() {
        tail
    } else {
        let keep = base_bytes.len() - tail.len();
        let mut out = base_bytes[..keep].to_vec();
        out.extend_from_slice(&tail);
        out
    };
    let value = field
        .ty
        .bytes_value(combined)
        .ok_or(FastError::InvalidString { offset: start })?;
    dictionary.assign(key, value.clone());
    Ok(Some(value))
}
