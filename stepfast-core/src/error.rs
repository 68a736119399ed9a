/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Error taxonomy shared by the STEP framer and the FAST codec.
//!
//! Every error type in the workspace classifies itself into an [`ErrorKind`]
//! so a caller can decide whether to abort the whole buffer or skip a single
//! message without matching on individual variants.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Coarse classification of a decode failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// An expected literal tag or value was not found where the framing
    /// requires it. Position tracking is lost for the rest of the buffer.
    Framing,
    /// CheckSum is unreadable or disagrees with the message bytes on an
    /// otherwise well-framed message.
    Integrity,
    /// Input ended in the middle of a field or message.
    StreamExhausted,
    /// The message is syntactically broken but its boundary is known.
    Malformed,
    /// An operator needed a previous value that does not exist and the
    /// template declares no fallback.
    UnrepresentableState,
}

impl ErrorKind {
    /// Returns true if the error invalidates every following byte of the
    /// buffer being scanned.
    #[must_use]
    pub const fn aborts_buffer(self) -> bool {
        matches!(self, Self::Framing | Self::Integrity)
    }

    /// Returns true if a caller may drop the current message and continue.
    #[must_use]
    pub const fn is_recoverable(self) -> bool {
        !self.aborts_buffer()
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Framing => "framing",
            Self::Integrity => "integrity",
            Self::StreamExhausted => "stream exhausted",
            Self::Malformed => "malformed",
            Self::UnrepresentableState => "unrepresentable state",
        };
        f.write_str(name)
    }
}

/// Errors that occur while framing STEP outer messages.
///
/// Offsets are absolute positions in the buffer handed to the framer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The buffer ends before the current message is complete.
    #[error("incomplete message at offset {offset}: need {needed} bytes, have {available}")]
    Incomplete {
        /// Offset where the message starts.
        offset: usize,
        /// Bytes required from `offset` to finish the message.
        needed: usize,
        /// Bytes available from `offset`.
        available: usize,
    },

    /// BeginString (tag 8) missing or not the expected literal.
    #[error("invalid begin string at offset {offset}")]
    InvalidBeginString {
        /// Offset where BeginString was expected.
        offset: usize,
    },

    /// BodyLength (tag 9) missing.
    #[error("missing body length field (tag 9) at offset {offset}")]
    MissingBodyLength {
        /// Offset where BodyLength was expected.
        offset: usize,
    },

    /// BodyLength value is not a non-negative integer.
    #[error("invalid body length value at offset {offset}")]
    InvalidBodyLength {
        /// Offset of the BodyLength value.
        offset: usize,
    },

    /// MsgType (tag 35) missing or empty.
    #[error("missing msg type field (tag 35) at offset {offset}")]
    MissingMsgType {
        /// Offset where MsgType was expected.
        offset: usize,
    },

    /// CheckSum (tag 10) not found at the offset implied by BodyLength.
    #[error("missing checksum field (tag 10) at offset {offset}")]
    MissingChecksum {
        /// Offset where CheckSum was expected.
        offset: usize,
    },

    /// CheckSum field sits where BodyLength says but its value is not a
    /// decimal number in 0..=255. Classified as an integrity failure.
    #[error("invalid checksum value at offset {offset}")]
    InvalidChecksum {
        /// Offset of the CheckSum value.
        offset: usize,
    },

    /// Checksum mismatch between calculated and declared values.
    #[error("checksum mismatch at offset {offset}: calculated {calculated}, declared {declared}")]
    ChecksumMismatch {
        /// Offset where the message starts.
        offset: usize,
        /// Calculated checksum value.
        calculated: u8,
        /// Declared checksum value in message.
        declared: u8,
    },

    /// Message exceeds maximum allowed size.
    #[error("message too large at offset {offset}: {size} bytes exceeds maximum {max_size}")]
    MessageTooLarge {
        /// Offset where the message starts.
        offset: usize,
        /// Declared body length in bytes.
        size: usize,
        /// Maximum allowed size in bytes.
        max_size: usize,
    },

    /// A body field could not be parsed. The message boundary is intact.
    #[error("malformed field (tag {tag}) at offset {offset}: {reason}")]
    MalformedField {
        /// Tag of the field, 0 if the tag itself was unreadable.
        tag: u32,
        /// Offset of the field.
        offset: usize,
        /// Description of the problem.
        reason: String,
    },

    /// Missing required field.
    #[error("missing required field: tag {tag} in message at offset {offset}")]
    MissingRequiredField {
        /// The tag number of the missing field.
        tag: u32,
        /// Offset of the message that lacks the field.
        offset: usize,
    },

    /// Invalid field value for the expected type.
    #[error("invalid field value for tag {tag}: {reason}")]
    InvalidFieldValue {
        /// The tag number of the field.
        tag: u32,
        /// Description of why the value is invalid.
        reason: String,
    },

    /// Invalid UTF-8 in string field.
    #[error("invalid utf-8 in field: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

impl DecodeError {
    /// Classifies this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Incomplete { .. } => ErrorKind::StreamExhausted,
            Self::InvalidBeginString { .. }
            | Self::MissingBodyLength { .. }
            | Self::InvalidBodyLength { .. }
            | Self::MissingMsgType { .. }
            | Self::MissingChecksum { .. }
            | Self::MessageTooLarge { .. } => ErrorKind::Framing,
            Self::InvalidChecksum { .. } | Self::ChecksumMismatch { .. } => ErrorKind::Integrity,
            Self::MalformedField { .. }
            | Self::MissingRequiredField { .. }
            | Self::InvalidFieldValue { .. }
            | Self::InvalidUtf8(_) => ErrorKind::Malformed,
        }
    }
}
