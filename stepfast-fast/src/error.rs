/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! FAST protocol error types.

use stepfast_core::ErrorKind;
use thiserror::Error;

/// Errors that can occur during FAST encoding/decoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FastError {
    /// Input ended while reading a stop-bit encoded unit (integer, length
    /// prefix, ASCII string or presence map).
    #[error("unexpected end of input at offset {offset}")]
    UnexpectedEof {
        /// Offset at which a byte was expected.
        offset: usize,
    },

    /// Input ended inside a length-prefixed byte payload.
    #[error("truncated payload at offset {offset}: expected {expected} bytes, {available} available")]
    TruncatedPayload {
        /// Offset of the first payload byte.
        offset: usize,
        /// Declared payload length.
        expected: u64,
        /// Bytes left in the input.
        available: usize,
    },

    /// Integer overflow during decoding or operator arithmetic.
    #[error("integer overflow at offset {offset}")]
    IntegerOverflow {
        /// Offset of the offending value.
        offset: usize,
    },

    /// Invalid string encoding.
    #[error("invalid string encoding at offset {offset}")]
    InvalidString {
        /// Offset of the offending value.
        offset: usize,
    },

    /// Decimal exponent outside [-63, 63].
    #[error("invalid decimal exponent {exponent} at offset {offset}")]
    InvalidDecimal {
        /// Offset of the exponent.
        offset: usize,
        /// The decoded exponent.
        exponent: i64,
    },

    /// A string or byte vector delta removes more bytes than the base holds.
    #[error("invalid delta: subtraction length {subtraction} exceeds base length {base_len}")]
    InvalidDelta {
        /// Transmitted subtraction length.
        subtraction: i64,
        /// Length of the dictionary base value.
        base_len: usize,
    },

    /// More presence bits were needed than the map transmitted.
    #[error("presence map exhausted: bit {index} requested, {available} transmitted")]
    PresenceMapExhausted {
        /// Zero-based index of the requested bit.
        index: usize,
        /// Number of bits in the map.
        available: usize,
    },

    /// Unknown template ID.
    #[error("unknown template id {template_id} at offset {offset}")]
    UnknownTemplate {
        /// Template id that is not registered.
        template_id: u32,
        /// Start of the message, or of the field for a static reference.
        offset: usize,
    },

    /// The template id bit was clear and no earlier message set one.
    #[error("template id not transmitted and no previous template id at offset {offset}")]
    MissingTemplateId {
        /// Start of the message.
        offset: usize,
    },

    /// Operator needed a previous value for a mandatory field and none exists.
    #[error("undefined dictionary value for mandatory field {key}")]
    UndefinedDictionaryValue {
        /// Dictionary key of the field.
        key: String,
    },

    /// Template definition rejected at registration.
    #[error("invalid template {template_id}: {reason}")]
    InvalidTemplate {
        /// Template id.
        template_id: u32,
        /// Why the template was rejected.
        reason: String,
    },

    /// A value does not match the declared field type.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Declared type name.
        expected: &'static str,
        /// Actual value type name.
        found: &'static str,
    },

    /// Group/sequence recursion exceeded the configured depth.
    #[error("nesting depth {depth} exceeds maximum {max}")]
    NestingTooDeep {
        /// Depth reached.
        depth: usize,
        /// Configured maximum.
        max: usize,
    },

    /// Sequence length exceeds the configured maximum.
    #[error("sequence length {length} exceeds maximum {max}")]
    SequenceTooLong {
        /// Decoded length.
        length: u64,
        /// Configured maximum.
        max: u32,
    },

    /// Error raised while decoding a specific field.
    #[error("template {template_id}, field {field} at offset {offset}: {source}")]
    Field {
        /// Template being decoded.
        template_id: u32,
        /// Field, group or sequence name.
        field: String,
        /// Offset where the field starts.
        offset: usize,
        /// Underlying error.
        source: Box<FastError>,
    },
}

impl FastError {
    /// Classifies this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnexpectedEof { .. } | Self::TruncatedPayload { .. } => {
                ErrorKind::StreamExhausted
            }
            Self::UndefinedDictionaryValue { .. } => ErrorKind::UnrepresentableState,
            Self::Field { source, .. } => source.kind(),
            _ => ErrorKind::Malformed,
        }
    }

    /// Returns the innermost error, skipping field context.
    #[must_use]
    pub fn root(&self) -> &FastError {
        match self {
            Self::Field { source, .. } => source.root(),
            other => other,
        }
    }

    /// Attaches field context unless the error already carries it.
    #[must_use]
    pub fn in_field(self, template_id: u32, field: &str, offset: usize) -> Self {
        match self {
            Self::Field { .. } => self,
            other => Self::Field {
                template_id,
                field: field.to_string(),
                offset,
                source: Box::new(other),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            FastError::UnexpectedEof { offset: 3 }.kind(),
            ErrorKind::StreamExhausted
        );
        assert_eq!(
            FastError::TruncatedPayload {
                offset: 1,
                expected: 4,
                available: 2
            }
            .kind(),
            ErrorKind::StreamExhausted
        );
        assert_eq!(
            FastError::UndefinedDictionaryValue {
                key: "NumTrades".to_string()
            }
            .kind(),
            ErrorKind::UnrepresentableState
        );
        assert_eq!(
            FastError::UnknownTemplate {
                template_id: 9,
                offset: 5
            }
            .kind(),
            ErrorKind::Malformed
        );
        assert_eq!(
            FastError::MissingTemplateId { offset: 0 }.kind(),
            ErrorKind::Malformed
        );
    }

    #[test]
    fn test_field_context_wraps_once() {
        let err = FastError::UnexpectedEof { offset: 12 }
            .in_field(300111, "SecurityID", 10)
            .in_field(300111, "Outer", 0);

        match &err {
            FastError::Field {
                template_id,
                field,
                offset,
                ..
            } => {
                assert_eq!(*template_id, 300111);
                assert_eq!(field, "SecurityID");
                assert_eq!(*offset, 10);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.root(), &FastError::UnexpectedEof { offset: 12 });
        assert_eq!(err.kind(), ErrorKind::StreamExhausted);
        assert_eq!(
            err.to_string(),
            "template 300111, field SecurityID at offset 10: unexpected end of input at offset 12"
        );
    }
}
