/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Message types for STEP outer framing.
//!
//! This module provides:
//! - [`MsgType`]: Enumeration of the STEP message types seen on exchange feeds
//! - [`StepMessage`]: Zero-copy view of one framed outer message
//! - [`OwnedStepMessage`]: Owned message for storage and cross-thread transfer

use crate::error::DecodeError;
use crate::field::{FieldRef, OwnedField};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::ops::Range;

/// Inline capacity of the per-message field list.
pub const INLINE_FIELDS: usize = 16;

/// STEP message types.
///
/// Types outside the administrative set and the market-data messages are kept
/// verbatim as `Custom(String)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MsgType {
    /// Heartbeat (0).
    #[default]
    Heartbeat,
    /// Test Request (1).
    TestRequest,
    /// Resend Request (2).
    ResendRequest,
    /// Reject (3).
    Reject,
    /// Sequence Reset (4).
    SequenceReset,
    /// Logout (5).
    Logout,
    /// Logon (A).
    Logon,
    /// Market Data Snapshot / Full Refresh (W), carries the FAST payload.
    MarketDataSnapshot,
    /// Market Data Incremental Refresh (X).
    MarketDataIncremental,
    /// Security Status (f).
    SecurityStatus,
    /// Business Message Reject (j).
    BusinessMessageReject,
    /// Any other message type.
    Custom(String),
}

impl std::str::FromStr for MsgType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "0" => Self::Heartbeat,
            "1" => Self::TestRequest,
            "2" => Self::ResendRequest,
            "3" => Self::Reject,
            "4" => Self::SequenceReset,
            "5" => Self::Logout,
            "A" => Self::Logon,
            "W" => Self::MarketDataSnapshot,
            "X" => Self::MarketDataIncremental,
            "f" => Self::SecurityStatus,
            "j" => Self::BusinessMessageReject,
            other => Self::Custom(other.to_string()),
        })
    }
}

impl MsgType {
    /// Returns the wire representation of this message type.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Heartbeat => "0",
            Self::TestRequest => "1",
            Self::ResendRequest => "2",
            Self::Reject => "3",
            Self::SequenceReset => "4",
            Self::Logout => "5",
            Self::Logon => "A",
            Self::MarketDataSnapshot => "W",
            Self::MarketDataIncremental => "X",
            Self::SecurityStatus => "f",
            Self::BusinessMessageReject => "j",
            Self::Custom(s) => s.as_str(),
        }
    }

    /// Returns true if this is a session-level message.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(
            self,
            Self::Heartbeat
                | Self::TestRequest
                | Self::ResendRequest
                | Self::Reject
                | Self::SequenceReset
                | Self::Logout
                | Self::Logon
        )
    }
}

impl fmt::Display for MsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Zero-copy view of one framed STEP message.
///
/// Field values borrow from the scanned buffer, so a message cannot outlive
/// the bytes it was framed from. Each message owns a fresh field list.
#[derive(Debug, Clone)]
pub struct StepMessage<'a> {
    /// Bytes from BeginString through the CheckSum delimiter.
    buffer: &'a [u8],
    /// Absolute offset of `buffer` in the scanned input.
    offset: usize,
    /// BeginString value.
    begin_string: &'a [u8],
    /// Declared BodyLength.
    body_length: usize,
    /// The parsed message type.
    msg_type: MsgType,
    /// Transmitted (and verified, unless disabled) checksum.
    checksum: u8,
    /// Body fields in wire order, starting with MsgType.
    fields: SmallVec<[FieldRef<'a>; INLINE_FIELDS]>,
}

impl<'a> StepMessage<'a> {
    /// Creates a message view from framed components.
    #[must_use]
    pub fn new(
        buffer: &'a [u8],
        offset: usize,
        begin_string: &'a [u8],
        body_length: usize,
        msg_type: MsgType,
        checksum: u8,
        fields: SmallVec<[FieldRef<'a>; INLINE_FIELDS]>,
    ) -> Self {
        Self {
            buffer,
            offset,
            begin_string,
            body_length,
            msg_type,
            checksum,
            fields,
        }
    }

    /// Returns the complete message bytes.
    #[inline]
    #[must_use]
    pub const fn buffer(&self) -> &'a [u8] {
        self.buffer
    }

    /// Returns the absolute offset of the message in the scanned input.
    #[inline]
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the BeginString value (e.g., "STEP.1.0.0").
    #[must_use]
    pub fn begin_string(&self) -> &'a str {
        std::str::from_utf8(self.begin_string).unwrap_or("")
    }

    /// Returns the declared BodyLength.
    #[inline]
    #[must_use]
    pub const fn body_length(&self) -> usize {
        self.body_length
    }

    /// Returns the message type.
    #[inline]
    #[must_use]
    pub fn msg_type(&self) -> &MsgType {
        &self.msg_type
    }

    /// Returns the transmitted checksum.
    #[inline]
    #[must_use]
    pub const fn checksum(&self) -> u8 {
        self.checksum
    }

    /// Returns an iterator over the body fields.
    #[inline]
    pub fn fields(&self) -> impl Iterator<Item = &FieldRef<'a>> {
        self.fields.iter()
    }

    /// Returns the number of body fields.
    #[inline]
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Gets the first field with the given tag.
    #[must_use]
    pub fn get_field(&self, tag: u32) -> Option<&FieldRef<'a>> {
        self.fields.iter().find(|f| f.tag == tag)
    }

    /// Gets a field value as a string.
    #[must_use]
    pub fn get_field_str(&self, tag: u32) -> Option<&'a str> {
        self.get_field(tag).and_then(|f| f.as_str().ok())
    }

    /// Gets a field value parsed as the specified type.
    ///
    /// # Errors
    /// Returns `DecodeError` if the field is not found or cannot be parsed.
    pub fn get_field_as<T: std::str::FromStr>(&self, tag: u32) -> Result<T, DecodeError> {
        self.get_field(tag)
            .ok_or(DecodeError::MissingRequiredField {
                tag,
                offset: self.offset(),
            })?
            .parse()
    }

    /// Returns the message length in bytes.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if the message is empty.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Copies this view into an owned message.
    #[must_use]
    pub fn to_owned_message(&self) -> OwnedStepMessage {
        OwnedStepMessage::from_view(self)
    }
}

/// Owned STEP message.
#[derive(Debug, Clone)]
pub struct OwnedStepMessage {
    /// The complete message bytes.
    buffer: Bytes,
    /// The parsed message type.
    msg_type: MsgType,
    /// Field offsets relative to `buffer`: (tag, value_range).
    field_offsets: Vec<(u32, Range<usize>)>,
}

impl OwnedStepMessage {
    /// Copies a borrowed view.
    #[must_use]
    pub fn from_view(view: &StepMessage<'_>) -> Self {
        let buffer = Bytes::copy_from_slice(view.buffer);
        let field_offsets = view
            .fields
            .iter()
            .map(|f| {
                let start = f.offset - view.offset;
                (f.tag, start..start + f.value.len())
            })
            .collect();

        Self {
            buffer,
            msg_type: view.msg_type.clone(),
            field_offsets,
        }
    }

    /// Returns the message type.
    #[inline]
    #[must_use]
    pub fn msg_type(&self) -> &MsgType {
        &self.msg_type
    }

    /// Returns the message bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Gets a field by tag, sharing the message buffer.
    #[must_use]
    pub fn get_field(&self, tag: u32) -> Option<OwnedField> {
        self.field_offsets
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(t, range)| OwnedField {
                tag: *t,
                value: self.buffer.slice(range.clone()),
            })
    }

    /// Gets a field value as a string.
    #[must_use]
    pub fn get_field_str(&self, tag: u32) -> Option<&str> {
        self.field_offsets
            .iter()
            .find(|(t, _)| *t == tag)
            .and_then(|(_, range)| std::str::from_utf8(&self.buffer[range.clone()]).ok())
    }

    /// Returns the number of fields.
    #[inline]
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.field_offsets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::tags;

    #[test]
    fn test_msg_type_from_str() {
        assert_eq!("0".parse::<MsgType>().unwrap(), MsgType::Heartbeat);
        assert_eq!("A".parse::<MsgType>().unwrap(), MsgType::Logon);
        assert_eq!("W".parse::<MsgType>().unwrap(), MsgType::MarketDataSnapshot);
    }

    #[test]
    fn test_msg_type_custom() {
        let custom: MsgType = "UA3201".parse().unwrap();
        assert!(matches!(custom, MsgType::Custom(_)));
        assert_eq!(custom.as_str(), "UA3201");
        assert!(!custom.is_admin());
    }

    #[test]
    fn test_step_message_field_access() {
        // "35=W\x0195=2\x0196=\x81\x82\x01" starting at absolute offset 100
        let buffer: &[u8] = b"35=W\x0195=2\x0196=\x81\x82\x01";
        let mut fields: SmallVec<[FieldRef<'_>; INLINE_FIELDS]> = SmallVec::new();
        fields.push(FieldRef::new(tags::MSG_TYPE, &buffer[3..4], 103));
        fields.push(FieldRef::new(tags::RAW_DATA_LENGTH, &buffer[8..9], 108));
        fields.push(FieldRef::new(tags::RAW_DATA, &buffer[13..15], 113));
        let msg = StepMessage::new(
            buffer,
            100,
            b"STEP.1.0.0",
            buffer.len(),
            MsgType::MarketDataSnapshot,
            0,
            fields,
        );

        assert_eq!(msg.get_field_str(tags::MSG_TYPE), Some("W"));
        assert_eq!(msg.get_field_as::<usize>(tags::RAW_DATA_LENGTH).unwrap(), 2);
        assert_eq!(
            msg.get_field(tags::RAW_DATA).unwrap().as_bytes(),
            &[0x81, 0x82]
        );
        assert!(msg.get_field_as::<u32>(999).is_err());

        let owned = msg.to_owned_message();
        assert_eq!(owned.field_count(), 3);
        assert_eq!(owned.get_field_str(tags::RAW_DATA_LENGTH), Some("2"));
        assert_eq!(&owned.get_field(tags::RAW_DATA).unwrap().value[..], &[0x81, 0x82]);
    }
}
