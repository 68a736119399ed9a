/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Zero-copy STEP message framer.
//!
//! The framer splits a buffer into messages using BodyLength, verifies each
//! checksum and then scans the body fields. Field values are references to
//! the original buffer. In snapshot messages the raw data field (tag 96 by
//! default) is read as the number of bytes announced by the preceding length
//! field (tag 95), so its payload may contain delimiters.
//!
//! Framing and integrity errors stop the scan: once a boundary cannot be
//! trusted nothing after it can be. A malformed body field only rejects its
//! own message, since the checksum has already proven where the next one
//! starts.

use crate::checksum::{calculate_checksum, parse_checksum};
use crate::config::FramerConfig;
use memchr::memchr;
use smallvec::SmallVec;
use stepfast_core::error::DecodeError;
use stepfast_core::field::{FieldRef, tags};
use stepfast_core::message::{INLINE_FIELDS, MsgType, StepMessage};

/// SOH delimiter terminating every field.
pub const SOH: u8 = 0x01;

/// Equals sign delimiter between tag and value.
pub const EQUALS: u8 = b'=';

/// Smallest possible CheckSum field, `10=0<SOH>`.
const MIN_CHECKSUM_FIELD: usize = 5;

/// Zero-copy STEP message framer.
///
/// Iterating yields one `Result` per message and stops at the end of the
/// buffer or after an error that aborts the buffer.
#[derive(Debug)]
pub struct StepDecoder<'a> {
    /// Input buffer.
    input: &'a [u8],
    /// Start of the next message.
    offset: usize,
    /// Framing rules.
    config: FramerConfig,
    /// Set once the scan cannot continue.
    done: bool,
}

impl<'a> StepDecoder<'a> {
    /// Creates a new framer for the given input buffer.
    ///
    /// # Arguments
    /// * `input` - The STEP message bytes to frame
    #[must_use]
    pub fn new(input: &'a [u8]) -> Self {
        Self::with_config(input, FramerConfig::default())
    }

    /// Creates a new framer with explicit configuration.
    #[must_use]
    pub fn with_config(input: &'a [u8], config: FramerConfig) -> Self {
        Self {
            input,
            offset: 0,
            config,
            done: false,
        }
    }

    /// Returns the framer configuration.
    #[must_use]
    pub fn config(&self) -> &FramerConfig {
        &self.config
    }

    /// Returns the offset of the next message.
    #[inline]
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the bytes not yet framed.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> &'a [u8] {
        &self.input[self.offset.min(self.input.len())..]
    }

    /// Returns true if the buffer has been fully consumed.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offset >= self.input.len()
    }

    /// Returns true if an earlier error stopped the scan.
    #[inline]
    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        self.done
    }

    /// Frames the message at the current offset.
    ///
    /// On success, and on a malformed body field, the offset moves past the
    /// message's CheckSum field. On any other error it stays put.
    ///
    /// # Errors
    /// Returns `DecodeError` if the message is incomplete, badly framed,
    /// fails its checksum or has a malformed body field.
    pub fn decode(&mut self) -> Result<StepMessage<'a>, DecodeError> {
        let input = self.input;
        let start = self.offset;
        let available = input.len().saturating_sub(start);
        let incomplete = |needed: usize| DecodeError::Incomplete {
            offset: start,
            needed: needed.max(available + 1),
            available,
        };

        // BeginString
        let (begin, pos) = match read_field(input, start) {
            Ok(Some((field, next))) if field.tag == tags::BEGIN_STRING => (field, next),
            Ok(None) => return Err(incomplete(0)),
            _ => return Err(DecodeError::InvalidBeginString { offset: start }),
        };
        if let Some(expected) = &self.config.begin_string {
            if begin.value != expected.as_bytes() {
                return Err(DecodeError::InvalidBeginString { offset: start });
            }
        }

        // BodyLength
        let (body_length, msg_type_offset) = match read_field(input, pos) {
            Ok(Some((field, next))) if field.tag == tags::BODY_LENGTH => {
                let length = parse_length(field.value)
                    .ok_or(DecodeError::InvalidBodyLength { offset: field.offset })?;
                (length, next)
            }
            Ok(None) => return Err(incomplete(0)),
            _ => return Err(DecodeError::MissingBodyLength { offset: pos }),
        };
        if let Some(max_size) = self.config.max_message_size {
            if body_length > max_size {
                return Err(DecodeError::MessageTooLarge {
                    offset: start,
                    size: body_length,
                    max_size,
                });
            }
        }

        let checksum_offset = msg_type_offset
            .checked_add(body_length)
            .ok_or(DecodeError::InvalidBodyLength { offset: pos })?;
        if checksum_offset > input.len() {
            return Err(incomplete(checksum_offset - start + MIN_CHECKSUM_FIELD));
        }
        let body = &input[..checksum_offset];

        // MsgType, the first body field
        let msg_type = match read_field(body, msg_type_offset) {
            Ok(Some((field, _))) if field.tag == tags::MSG_TYPE => field
                .as_str()
                .ok()
                .filter(|s| !s.is_empty())
                .map(|s| s.parse::<MsgType>().unwrap_or_default()),
            _ => None,
        }
        .ok_or(DecodeError::MissingMsgType {
            offset: msg_type_offset,
        })?;

        // CheckSum, exactly where BodyLength says
        let (declared, end) = match read_field(input, checksum_offset) {
            Ok(Some((field, next))) if field.tag == tags::CHECKSUM => {
                let declared = parse_checksum(field.value)
                    .ok_or(DecodeError::InvalidChecksum { offset: field.offset })?;
                (declared, next)
            }
            Ok(None) => return Err(incomplete(checksum_offset - start + MIN_CHECKSUM_FIELD)),
            _ => {
                return Err(DecodeError::MissingChecksum {
                    offset: checksum_offset,
                });
            }
        };

        if self.config.validate_checksum {
            let calculated = calculate_checksum(&input[start..checksum_offset]);
            if calculated != declared {
                return Err(DecodeError::ChecksumMismatch {
                    offset: start,
                    calculated,
                    declared,
                });
            }
        }

        // The boundary is proven; body errors only reject this message.
        self.offset = end;
        let fields = self.scan_body(body, msg_type_offset, &msg_type)?;

        Ok(StepMessage::new(
            &input[start..end],
            start,
            begin.value,
            body_length,
            msg_type,
            declared,
            fields,
        ))
    }

    /// Scans the body fields between MsgType and CheckSum.
    fn scan_body(
        &self,
        body: &'a [u8],
        mut pos: usize,
        msg_type: &MsgType,
    ) -> Result<SmallVec<[FieldRef<'a>; INLINE_FIELDS]>, DecodeError> {
        let mut fields = SmallVec::new();
        let mut raw_length: Option<usize> = None;
        let raw_data = self.config.has_raw_data(msg_type);

        while pos < body.len() {
            let malformed = |tag: u32, reason: &str| DecodeError::MalformedField {
                tag,
                offset: pos,
                reason: reason.to_string(),
            };

            let (tag, value_start) = match read_tag(body, pos) {
                Ok(Some(found)) => found,
                Ok(None) => return Err(malformed(0, "field runs past body end")),
                Err(reason) => return Err(malformed(0, reason)),
            };

            let value_end = if raw_data && tag == self.config.raw_data_tag {
                let length = raw_length
                    .take()
                    .ok_or_else(|| malformed(tag, "raw data without preceding length"))?;
                let value_end = value_start
                    .checked_add(length)
                    .filter(|&end| end < body.len())
                    .ok_or_else(|| malformed(tag, "raw data runs past body end"))?;
                if body[value_end] != SOH {
                    return Err(malformed(tag, "missing delimiter after raw data"));
                }
                value_end
            } else {
                let value_end = memchr(SOH, &body[value_start..])
                    .map(|i| value_start + i)
                    .ok_or_else(|| malformed(tag, "field runs past body end"))?;
                if raw_data && tag == self.config.raw_data_length_tag {
                    let length = parse_length(&body[value_start..value_end])
                        .ok_or_else(|| malformed(tag, "invalid raw data length"))?;
                    raw_length = Some(length);
                }
                value_end
            };

            fields.push(FieldRef::new(tag, &body[value_start..value_end], value_start));
            pos = value_end + 1;
        }

        Ok(fields)
    }
}

impl<'a> Iterator for StepDecoder<'a> {
    type Item = Result<StepMessage<'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.is_empty() {
            return None;
        }

        let result = self.decode();
        // Nothing past an untrusted boundary or a truncated tail can be framed.
        if matches!(&result, Err(e) if !matches!(e, DecodeError::MalformedField { .. })) {
            self.done = true;
        }
        Some(result)
    }
}

/// Reads `tag=` at `pos`.
///
/// Returns the tag and the offset of its value, `None` if the input ends
/// before the `=`.
fn read_tag(input: &[u8], pos: usize) -> Result<Option<(u32, usize)>, &'static str> {
    let rest = &input[pos..];
    let Some(eq) = memchr(EQUALS, rest) else {
        return if rest.iter().all(u8::is_ascii_digit) {
            Ok(None)
        } else {
            Err("invalid tag")
        };
    };
    let tag = parse_tag(&rest[..eq]).ok_or("invalid tag")?;
    Ok(Some((tag, pos + eq + 1)))
}

/// Reads a delimited `tag=value<SOH>` field at `pos`.
///
/// Returns the field and the offset after its delimiter, `None` if the input
/// ends first.
fn read_field(input: &[u8], pos: usize) -> Result<Option<(FieldRef<'_>, usize)>, &'static str> {
    let Some((tag, value_start)) = read_tag(input, pos)? else {
        return Ok(None);
    };
    let Some(len) = memchr(SOH, &input[value_start..]) else {
        return Ok(None);
    };
    let value_end = value_start + len;
    Ok(Some((
        FieldRef::new(tag, &input[value_start..value_end], value_start),
        value_end + 1,
    )))
}

/// Parses a tag number from ASCII bytes.
///
/// # Arguments
/// * `bytes` - The ASCII bytes representing the tag number
///
/// # Returns
/// The parsed tag number, or `None` if invalid.
#[inline]
fn parse_tag(bytes: &[u8]) -> Option<u32> {
    if bytes.is_empty() || bytes.len() > 10 {
        return None;
    }

    let mut result: u32 = 0;
    for &b in bytes {
        if !b.is_ascii_digit() {
            return None;
        }
        result = result.checked_mul(10)?.checked_add(u32::from(b - b'0'))?;
    }

    Some(result)
}

/// Parses a non-negative decimal length.
#[inline]
fn parse_length(bytes: &[u8]) -> Option<usize> {
    if bytes.is_empty() || bytes.len() > 19 {
        return None;
    }

    let mut result: usize = 0;
    for &b in bytes {
        if !b.is_ascii_digit() {
            return None;
        }
        result = result.checked_mul(10)?.checked_add(usize::from(b - b'0'))?;
    }

    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::StepEncoder;
    use stepfast_core::ErrorKind;

    /// Frames a raw body, writing the checksum without zero padding.
    fn frame(body: &[u8]) -> Vec<u8> {
        frame_with("STEP.1.0.0", body)
    }

    fn frame_with(begin_string: &str, body: &[u8]) -> Vec<u8> {
        let mut message = format!("8={begin_string}\x019={}\x01", body.len()).into_bytes();
        message.extend_from_slice(body);
        let checksum = calculate_checksum(&message);
        message.extend_from_slice(format!("10={checksum}\x01").as_bytes());
        message
    }

    fn snapshot(payload: &[u8]) -> Vec<u8> {
        let mut encoder = StepEncoder::new("STEP.1.0.0");
        encoder.put_str(tags::MSG_TYPE, "W");
        encoder.put_str(49, "SZSE");
        encoder.put_data(payload);
        encoder.finish().to_vec()
    }

    #[test]
    fn test_parse_tag() {
        assert_eq!(parse_tag(b"8"), Some(8));
        assert_eq!(parse_tag(b"35"), Some(35));
        assert_eq!(parse_tag(b"12345"), Some(12345));
        assert_eq!(parse_tag(b""), None);
        assert_eq!(parse_tag(b"abc"), None);
        assert_eq!(parse_tag(b"12a"), None);
        assert_eq!(parse_tag(b"99999999999"), None);
    }

    #[test]
    fn test_read_field() {
        let input = b"8=STEP.1.0.0\x019=5\x01";
        let (field, next) = read_field(input, 0).unwrap().unwrap();
        assert_eq!(field.tag, 8);
        assert_eq!(field.as_str().unwrap(), "STEP.1.0.0");
        assert_eq!(field.offset, 2);

        let (field, next) = read_field(input, next).unwrap().unwrap();
        assert_eq!(field.tag, 9);
        assert_eq!(field.as_str().unwrap(), "5");
        assert_eq!(next, input.len());

        assert_eq!(read_field(b"8=STEP", 0), Ok(None));
        assert_eq!(read_field(b"35", 0), Ok(None));
        assert_eq!(read_field(b"x=1\x01", 0), Err("invalid tag"));
    }

    #[test]
    fn test_decode_snapshot_with_raw_data() {
        // payload contains both delimiters
        let payload = [0xC0, 0x01, b'=', 0x80];
        let data = snapshot(&payload);

        let mut decoder = StepDecoder::new(&data);
        let message = decoder.decode().unwrap();

        assert_eq!(message.begin_string(), "STEP.1.0.0");
        assert_eq!(*message.msg_type(), MsgType::MarketDataSnapshot);
        assert_eq!(message.buffer(), &data[..]);
        let tags: Vec<u32> = message.fields().map(|f| f.tag).collect();
        assert_eq!(tags, [35, 49, 95, 96]);
        assert_eq!(message.get_field_str(95), Some("4"));
        assert_eq!(message.get_field(96).unwrap().value, &payload[..]);
        assert!(decoder.is_empty());
    }

    #[test]
    fn test_iterate_multiple_messages() {
        let mut data = snapshot(b"\x80");
        data.extend(frame(b"35=0\x01"));
        data.extend(snapshot(b"\x81\x82"));

        let messages: Vec<_> = StepDecoder::new(&data).collect::<Result<_, _>>().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(*messages[1].msg_type(), MsgType::Heartbeat);
        assert_eq!(messages[2].get_field(96).unwrap().value, b"\x81\x82");
        assert_eq!(messages[2].offset(), messages[0].len() + messages[1].len());
    }

    #[test]
    fn test_unpadded_checksum_accepted() {
        let data = frame(b"35=W\x0158=hello\x01");
        let message = StepDecoder::new(&data).decode().unwrap();
        assert_eq!(message.get_field_str(58), Some("hello"));
    }

    #[test]
    fn test_any_single_mutated_byte_is_rejected() {
        let data = snapshot(&[0xC0, 0x81, 0x85]);
        let digits = data.len() - 4..data.len() - 1;
        for i in 0..data.len() {
            let mut mutated = data.clone();
            mutated[i] = mutated[i].wrapping_add(1);
            let result = StepDecoder::new(&mutated).next();
            assert!(
                matches!(result, Some(Err(_))),
                "mutation at byte {i} was accepted"
            );
            if digits.contains(&i) {
                if let Some(Err(err)) = result {
                    assert_eq!(err.kind(), ErrorKind::Integrity, "byte {i}: {err}");
                }
            }
        }
    }

    #[test]
    fn test_corrupted_checksum_digit_is_integrity_error() {
        let data = snapshot(&[0xC0, 0x81, 0x85]);
        let n = data.len();
        assert_eq!(&data[n - 7..n - 4], b"10=");

        for i in n - 4..n - 1 {
            for replacement in [b'9', b'x'] {
                if data[i] == replacement {
                    continue;
                }
                let mut mutated = data.clone();
                mutated[i] = replacement;

                let mut decoder = StepDecoder::new(&mutated);
                let err = decoder.next().unwrap().unwrap_err();
                assert_eq!(
                    err.kind(),
                    ErrorKind::Integrity,
                    "byte {i} set to {:?}: {err}",
                    char::from(replacement)
                );
                assert!(decoder.next().is_none());
            }
        }
    }

    #[test]
    fn test_checksum_mismatch_aborts_buffer() {
        let mut data = snapshot(b"\x80");
        let second = data.len();
        data.extend(snapshot(b"\x81"));
        // flip a byte inside the first message's payload
        data[second - 9] ^= 0x40;

        let mut decoder = StepDecoder::new(&data);
        let err = decoder.next().unwrap().unwrap_err();
        assert!(matches!(err, DecodeError::ChecksumMismatch { offset: 0, .. }));
        assert_eq!(err.kind(), ErrorKind::Integrity);
        assert!(decoder.next().is_none());
        assert!(decoder.is_aborted());
    }

    #[test]
    fn test_checksum_validation_disabled() {
        let mut data = frame(b"35=W\x01");
        let n = data.len();
        data[n - 2] = if data[n - 2] == b'0' { b'1' } else { b'0' };

        assert!(StepDecoder::new(&data).decode().is_err());
        let config = FramerConfig::new().with_checksum_validation(false);
        assert!(StepDecoder::with_config(&data, config).decode().is_ok());
    }

    #[test]
    fn test_incomplete_message() {
        let data = snapshot(b"\x80\x81");
        for cut in [1, 10, data.len() - 10, data.len() - 1] {
            let err = StepDecoder::new(&data[..cut]).decode().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::StreamExhausted, "cut at {cut}");
            match err {
                DecodeError::Incomplete {
                    offset,
                    needed,
                    available,
                } => {
                    assert_eq!(offset, 0);
                    assert_eq!(available, cut);
                    assert!(needed > available);
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn test_framing_errors() {
        let err = StepDecoder::new(b"garbage\x01").decode().unwrap_err();
        assert_eq!(err, DecodeError::InvalidBeginString { offset: 0 });
        assert_eq!(err.kind(), ErrorKind::Framing);

        let err = StepDecoder::new(b"8=STEP.1.0.0\x0135=W\x01").decode().unwrap_err();
        assert_eq!(err, DecodeError::MissingBodyLength { offset: 13 });

        let err = StepDecoder::new(b"8=STEP.1.0.0\x019=x\x01").decode().unwrap_err();
        assert_eq!(err, DecodeError::InvalidBodyLength { offset: 15 });

        let err = StepDecoder::new(b"8=STEP.1.0.0\x019=5\x0149=W\x0110=000\x01")
            .decode()
            .unwrap_err();
        assert_eq!(err, DecodeError::MissingMsgType { offset: 17 });

        let err = StepDecoder::new(b"8=STEP.1.0.0\x019=5\x0135=W\x0111=000\x01")
            .decode()
            .unwrap_err();
        assert_eq!(err, DecodeError::MissingChecksum { offset: 22 });

        let err = StepDecoder::new(b"8=STEP.1.0.0\x019=5\x0135=W\x0110=999\x01")
            .decode()
            .unwrap_err();
        assert_eq!(err, DecodeError::InvalidChecksum { offset: 25 });
        assert_eq!(err.kind(), ErrorKind::Integrity);
    }

    #[test]
    fn test_begin_string_check() {
        let fix = frame_with("FIX.4.4", b"35=W\x01");

        let err = StepDecoder::new(&fix).decode().unwrap_err();
        assert_eq!(err, DecodeError::InvalidBeginString { offset: 0 });

        let config = FramerConfig::new().with_any_begin_string();
        let message = StepDecoder::with_config(&fix, config).decode().unwrap();
        assert_eq!(message.begin_string(), "FIX.4.4");
    }

    #[test]
    fn test_message_too_large() {
        let data = frame(b"35=W\x0158=0123456789\x01");
        let config = FramerConfig::new().with_max_message_size(8);
        let err = StepDecoder::with_config(&data, config).decode().unwrap_err();
        assert!(matches!(
            err,
            DecodeError::MessageTooLarge {
                offset: 0,
                max_size: 8,
                ..
            }
        ));
    }

    #[test]
    fn test_malformed_field_skips_only_its_message() {
        let mut data = frame(b"35=W\x01xx\x01");
        data.extend(frame(b"35=W\x0195=10\x0196=abc\x01"));
        data.extend(frame(b"35=W\x0196=abc\x01"));
        data.extend(frame(b"35=0\x01"));

        let results: Vec<_> = StepDecoder::new(&data).collect();
        assert_eq!(results.len(), 4);
        assert!(matches!(
            &results[0],
            Err(DecodeError::MalformedField { tag: 0, .. })
        ));
        assert!(matches!(
            &results[1],
            Err(DecodeError::MalformedField { tag: 96, .. })
        ));
        assert!(matches!(
            &results[2],
            Err(DecodeError::MalformedField { tag: 96, .. })
        ));
        assert_eq!(
            results[0].as_ref().unwrap_err().kind(),
            ErrorKind::Malformed
        );
        let last = results[3].as_ref().unwrap();
        assert_eq!(*last.msg_type(), MsgType::Heartbeat);
    }

    #[test]
    fn test_custom_raw_data_tags() {
        let data = frame(b"35=W\x0193=2\x0189=\x01\x01\x01");
        let config = FramerConfig::new().with_raw_data_tags(93, 89);
        let message = StepDecoder::with_config(&data, config).decode().unwrap();
        assert_eq!(message.get_field(89).unwrap().value, b"\x01\x01");
    }

    #[test]
    fn test_raw_data_rule_applies_to_snapshots_only() {
        let heartbeat = frame(b"35=0\x0196=abc\x0195=x\x01");
        let message = StepDecoder::new(&heartbeat).decode().unwrap();
        assert_eq!(*message.msg_type(), MsgType::Heartbeat);
        assert_eq!(message.get_field(96).unwrap().value, b"abc");
        assert_eq!(message.get_field(95).unwrap().value, b"x");

        let snapshot = frame(b"35=W\x0196=abc\x01");
        let err = StepDecoder::new(&snapshot).decode().unwrap_err();
        assert!(matches!(err, DecodeError::MalformedField { tag: 96, .. }));

        let config = FramerConfig::new().with_raw_data_msg_type(None);
        let err = StepDecoder::with_config(&heartbeat, config).decode().unwrap_err();
        assert!(matches!(err, DecodeError::MalformedField { tag: 96, .. }));
    }
}
