/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! STEP message encoder.
//!
//! Builds tag=value messages, prepending BeginString and BodyLength and
//! appending CheckSum on [`StepEncoder::finish`].

use crate::checksum::{calculate_checksum, format_checksum};
use crate::config::DEFAULT_BEGIN_STRING;
use bytes::{BufMut, Bytes, BytesMut};
use stepfast_core::field::tags;

/// SOH delimiter terminating every field.
pub const SOH: u8 = 0x01;

/// STEP message encoder.
#[derive(Debug)]
pub struct StepEncoder {
    /// Buffer for the message body (between BodyLength and Checksum).
    body: BytesMut,
    /// The BeginString value.
    begin_string: String,
}

impl StepEncoder {
    /// Creates a new encoder with the specified BeginString.
    ///
    /// # Arguments
    /// * `begin_string` - The protocol version string (e.g., "STEP.1.0.0")
    #[must_use]
    pub fn new(begin_string: impl Into<String>) -> Self {
        Self::with_capacity(begin_string, 256)
    }

    /// Creates a new encoder with pre-allocated body capacity.
    #[must_use]
    pub fn with_capacity(begin_string: impl Into<String>, capacity: usize) -> Self {
        Self {
            body: BytesMut::with_capacity(capacity),
            begin_string: begin_string.into(),
        }
    }

    /// Appends a field with a string value.
    #[inline]
    pub fn put_str(&mut self, tag: u32, value: &str) {
        self.put_raw(tag, value.as_bytes());
    }

    /// Appends a field with an integer value.
    #[inline]
    pub fn put_int(&mut self, tag: u32, value: i64) {
        let mut buf = itoa::Buffer::new();
        self.put_raw(tag, buf.format(value).as_bytes());
    }

    /// Appends a field with an unsigned integer value.
    #[inline]
    pub fn put_uint(&mut self, tag: u32, value: u64) {
        let mut buf = itoa::Buffer::new();
        self.put_raw(tag, buf.format(value).as_bytes());
    }

    /// Appends a field with raw bytes.
    ///
    /// The value must not contain the delimiter; use
    /// [`put_data`](Self::put_data) for binary payloads.
    #[inline]
    pub fn put_raw(&mut self, tag: u32, value: &[u8]) {
        let mut tag_buf = itoa::Buffer::new();
        self.body.put_slice(tag_buf.format(tag).as_bytes());
        self.body.put_u8(b'=');
        self.body.put_slice(value);
        self.body.put_u8(SOH);
    }

    /// Appends a binary payload as RawDataLength (95) followed by RawData (96).
    pub fn put_data(&mut self, data: &[u8]) {
        self.put_uint(tags::RAW_DATA_LENGTH, data.len() as u64);
        self.put_raw(tags::RAW_DATA, data);
    }

    /// Finalizes the message and returns the complete encoded bytes.
    #[must_use]
    pub fn finish(self) -> Bytes {
        let body_len = self.body.len();
        let mut len_buf = itoa::Buffer::new();
        let len_str = len_buf.format(body_len);

        let mut message =
            BytesMut::with_capacity(self.begin_string.len() + len_str.len() + body_len + 16);
        message.put_slice(b"8=");
        message.put_slice(self.begin_string.as_bytes());
        message.put_u8(SOH);
        message.put_slice(b"9=");
        message.put_slice(len_str.as_bytes());
        message.put_u8(SOH);
        message.put_slice(&self.body);

        let checksum = format_checksum(calculate_checksum(&message));
        message.put_slice(b"10=");
        message.put_slice(&checksum);
        message.put_u8(SOH);

        message.freeze()
    }

    /// Returns the current body length.
    #[inline]
    #[must_use]
    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    /// Clears the encoder for reuse.
    #[inline]
    pub fn clear(&mut self) {
        self.body.clear();
    }
}

impl Default for StepEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_BEGIN_STRING)
    }
}
