/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Feed pipeline.
//!
//! [`FeedDecoder`] frames STEP messages, routes the raw data of snapshot
//! messages into a FAST decoder and hands every result to a
//! [`FeedHandler`]. The FAST session state lives as long as the feed
//! decoder, so consecutive buffers of one feed share their dictionary.

use crate::config::{ErrorPolicy, FeedConfig};
use crate::error::{Error, Result};
use crate::snapshot::snapshot_registry;
use serde::Serialize;
use std::sync::Arc;
use stepfast_core::{DecodeError, StepMessage};
use stepfast_fast::{FastDecoder, Message, TemplateRegistry};
use stepfast_tagvalue::StepDecoder;
use tracing::{debug, trace, warn};

/// Callback interface for decoded feed content.
///
/// Every method has an empty default so a handler only implements what it
/// needs.
pub trait FeedHandler {
    /// Called for every framed STEP message, snapshot or not.
    ///
    /// # Arguments
    /// * `message` - The framed message, borrowing the scanned buffer
    fn on_step_message(&mut self, message: &StepMessage<'_>) {
        let _ = message;
    }

    /// Called for every FAST message decoded from a snapshot payload.
    fn on_fast_message(&mut self, message: &Message) {
        let _ = message;
    }

    /// Called for every error skipped under [`ErrorPolicy::Skip`].
    fn on_error(&mut self, error: &Error) {
        let _ = error;
    }
}

/// Collects every decoded FAST message.
impl FeedHandler for Vec<Message> {
    fn on_fast_message(&mut self, message: &Message) {
        self.push(message.clone());
    }
}

/// Running counters of a feed decoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FeedStats {
    /// Framed STEP messages.
    pub outer_messages: u64,
    /// Framed messages of the snapshot type.
    pub snapshot_messages: u64,
    /// Decoded FAST messages.
    pub fast_messages: u64,
    /// Errors skipped under [`ErrorPolicy::Skip`].
    pub skipped: u64,
}

/// STEP/FAST feed decoder.
#[derive(Debug)]
pub struct FeedDecoder {
    /// FAST session state.
    fast: FastDecoder,
    /// Pipeline configuration.
    config: FeedConfig,
    /// Counters since creation or the last reset.
    stats: FeedStats,
}

impl FeedDecoder {
    /// Creates a feed decoder with default configuration.
    #[must_use]
    pub fn new(registry: Arc<TemplateRegistry>) -> Self {
        Self::with_config(registry, FeedConfig::default())
    }

    /// Creates a feed decoder with explicit configuration.
    #[must_use]
    pub fn with_config(registry: Arc<TemplateRegistry>, config: FeedConfig) -> Self {
        Self {
            fast: FastDecoder::new(registry).with_config(config.fast.clone()),
            config,
            stats: FeedStats::default(),
        }
    }

    /// Creates a feed decoder for the bundled snapshot template.
    ///
    /// # Errors
    /// Returns an error if the snapshot template fails validation.
    pub fn snapshot(config: FeedConfig) -> Result<Self> {
        Ok(Self::with_config(Arc::new(snapshot_registry()?), config))
    }

    /// Returns the pipeline configuration.
    #[must_use]
    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Returns the counters.
    #[must_use]
    pub const fn stats(&self) -> FeedStats {
        self.stats
    }

    /// Returns the FAST decoder.
    #[must_use]
    pub fn fast_decoder(&self) -> &FastDecoder {
        &self.fast
    }

    /// Clears the FAST session state and the counters.
    pub fn reset(&mut self) {
        self.fast.reset();
        self.stats = FeedStats::default();
    }

    /// Decodes every message in a buffer of STEP data.
    ///
    /// # Errors
    /// Under [`ErrorPolicy::Abort`] returns the first error. Under
    /// [`ErrorPolicy::Skip`] never fails: errors go to
    /// [`FeedHandler::on_error`] and a framing or integrity error ends the
    /// buffer early.
    pub fn decode_buffer<H: FeedHandler>(&mut self, buffer: &[u8], handler: &mut H) -> Result<()> {
        let framer = StepDecoder::with_config(buffer, self.config.framer.clone());

        for result in framer {
            let message = match result {
                Ok(message) => message,
                Err(e) => {
                    self.fail(e.into(), handler)?;
                    continue;
                }
            };

            self.stats.outer_messages += 1;
            trace!(offset = message.offset(), msg_type = %message.msg_type(), "framed message");
            handler.on_step_message(&message);

            if *message.msg_type() != self.config.snapshot_msg_type {
                continue;
            }
            self.stats.snapshot_messages += 1;

            let raw_data_tag = self.config.framer.raw_data_tag;
            let Some(raw) = message.get_field(raw_data_tag) else {
                self.fail(
                    DecodeError::MissingRequiredField {
                        tag: raw_data_tag,
                        offset: message.offset(),
                    }
                    .into(),
                    handler,
                )?;
                continue;
            };

            self.decode_payload_into(raw.value, handler)?;
        }

        Ok(())
    }

    /// Decodes a FAST payload, such as the raw data of a snapshot message.
    ///
    /// # Errors
    /// Returns the first FAST error. Messages decoded before it are lost but
    /// their dictionary updates are kept.
    pub fn decode_payload(&mut self, payload: &[u8]) -> Result<Vec<Message>> {
        let messages = self.fast.decode_all(payload)?;
        self.stats.fast_messages += messages.len() as u64;
        Ok(messages)
    }

    fn decode_payload_into<H: FeedHandler>(&mut self, payload: &[u8], handler: &mut H) -> Result<()> {
        let mut offset = 0;
        while offset < payload.len() {
            match self.fast.decode_message(payload, &mut offset) {
                Ok(message) => {
                    self.stats.fast_messages += 1;
                    handler.on_fast_message(&message);
                }
                Err(e) => {
                    // the rest of the payload has no trustworthy start
                    return self.fail(e.into(), handler);
                }
            }
        }
        Ok(())
    }

    fn fail<H: FeedHandler>(&mut self, error: Error, handler: &mut H) -> Result<()> {
        match self.config.error_policy {
            ErrorPolicy::Abort => Err(error),
            ErrorPolicy::Skip => {
                let kind = error.kind();
                if kind.aborts_buffer() {
                    warn!(%error, %kind, "abandoning rest of buffer");
                } else {
                    debug!(%error, %kind, "skipping message");
                }
                self.stats.skipped += 1;
                handler.on_error(&error);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{MarketSnapshot, SNAPSHOT_TEMPLATE_ID, SnapshotCollector};
    use rust_decimal::Decimal;
    use stepfast_core::{ErrorKind, MsgType, tags};
    use stepfast_fast::{FastEncoder, FastError, PresenceMap};
    use stepfast_tagvalue::StepEncoder;

    /// First snapshot of a security: every copy field is transmitted.
    fn first_snapshot() -> Vec<u8> {
        let mut enc = FastEncoder::new();
        enc.encode_pmap(&PresenceMap::from_bits([true; 6]));
        enc.encode_uint(u64::from(SNAPSHOT_TEMPLATE_ID));
        enc.encode_int(20240102093000123);
        enc.encode_uint(2011);
        enc.encode_ascii("010").unwrap();
        enc.encode_ascii("000001").unwrap();
        enc.encode_nullable_ascii(Some("T0")).unwrap();
        enc.encode_nullable_int(Some(105_000));
        enc.encode_int(1200);
        enc.encode_int(3_500_000);
        enc.encode_int(36_750_000_000);
        enc.finish().to_vec()
    }

    /// Follow-up snapshot: same template and copies, only the totals move.
    fn second_snapshot() -> Vec<u8> {
        let mut enc = FastEncoder::new();
        enc.encode_pmap(&PresenceMap::from_bits([false; 6]));
        enc.encode_nullable_int(None);
        enc.encode_int(5);
        enc.encode_int(1_000);
        enc.encode_int(10_500_000);
        enc.finish().to_vec()
    }

    fn snapshot_payload() -> Vec<u8> {
        [first_snapshot(), second_snapshot()].concat()
    }

    fn step(msg_type: &str, payload: Option<&[u8]>) -> Vec<u8> {
        let mut encoder = StepEncoder::new("STEP.1.0.0");
        encoder.put_str(tags::MSG_TYPE, msg_type);
        encoder.put_str(49, "SZSE");
        if let Some(payload) = payload {
            encoder.put_data(payload);
        }
        encoder.finish().to_vec()
    }

    fn decoder(policy: ErrorPolicy) -> FeedDecoder {
        FeedDecoder::snapshot(FeedConfig::new().with_error_policy(policy)).unwrap()
    }

    #[derive(Default)]
    struct Recorder {
        step: Vec<MsgType>,
        fast: Vec<Message>,
        errors: Vec<Error>,
    }

    impl FeedHandler for Recorder {
        fn on_step_message(&mut self, message: &StepMessage<'_>) {
            self.step.push(message.msg_type().clone());
        }

        fn on_fast_message(&mut self, message: &Message) {
            self.fast.push(message.clone());
        }

        fn on_error(&mut self, error: &Error) {
            self.errors.push(error.clone());
        }
    }

    #[test]
    fn test_payload_prefix_bytes() {
        let payload = snapshot_payload();
        // pmap 1111110, then template id 300111 in three stop-bit bytes
        assert_eq!(&payload[..4], &[0xFE, 0x12, 0x28, 0xCF]);
    }

    #[test]
    fn test_end_to_end_snapshot() {
        let buffer = step("W", Some(&snapshot_payload()));
        let mut feed = decoder(ErrorPolicy::Abort);
        let mut collector = SnapshotCollector::new();

        feed.decode_buffer(&buffer, &mut collector).unwrap();

        let expected_first = MarketSnapshot {
            orig_time: 20240102093000123,
            channel_no: 2011,
            md_stream_id: "010".to_string(),
            security_id: "000001".to_string(),
            security_id_source: "102".to_string(),
            trading_phase_code: Some("T0".to_string()),
            prev_close_px: Some(105_000),
            num_trades: 1200,
            total_volume_trade: 3_500_000,
            total_value_trade: 36_750_000_000,
        };
        let expected_second = MarketSnapshot {
            prev_close_px: None,
            num_trades: 1205,
            total_volume_trade: 3_501_000,
            total_value_trade: 36_760_500_000,
            ..expected_first.clone()
        };

        assert_eq!(collector.snapshots(), [expected_first, expected_second]);
        assert_eq!(collector.snapshots()[1].total_value(), Decimal::new(36_760_500_000, 4));
        assert_eq!(
            feed.stats(),
            FeedStats {
                outer_messages: 1,
                snapshot_messages: 1,
                fast_messages: 2,
                skipped: 0,
            }
        );
    }

    #[test]
    fn test_dictionary_spans_buffers() {
        let mut feed = decoder(ErrorPolicy::Abort);
        let mut messages: Vec<Message> = Vec::new();
        feed.decode_buffer(&step("W", Some(&first_snapshot())), &mut messages)
            .unwrap();
        feed.decode_buffer(&step("W", Some(&second_snapshot())), &mut messages)
            .unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].template_id(), SNAPSHOT_TEMPLATE_ID);
        assert_eq!(messages[1].get_i64("NumTrades"), Some(1205));
        assert_eq!(messages[1].get_str("SecurityID"), Some("000001"));
    }

    #[test]
    fn test_non_snapshot_messages_are_framed_only() {
        let mut buffer = step("0", None);
        buffer.extend(step("W", Some(&snapshot_payload())));

        let mut feed = decoder(ErrorPolicy::Abort);
        let mut recorder = Recorder::default();
        feed.decode_buffer(&buffer, &mut recorder).unwrap();

        assert_eq!(recorder.step, [MsgType::Heartbeat, MsgType::MarketDataSnapshot]);
        assert_eq!(recorder.fast.len(), 2);
        assert_eq!(feed.stats().outer_messages, 2);
        assert_eq!(feed.stats().snapshot_messages, 1);
    }

    #[test]
    fn test_flipped_checksum_never_reaches_fast() {
        let mut buffer = step("W", Some(&snapshot_payload()));
        let last_digit = buffer.len() - 2;
        buffer[last_digit] = if buffer[last_digit] == b'0' { b'1' } else { buffer[last_digit] - 1 };

        let mut feed = decoder(ErrorPolicy::Abort);
        let mut recorder = Recorder::default();
        let err = feed.decode_buffer(&buffer, &mut recorder).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Integrity);
        assert!(matches!(err, Error::Step(DecodeError::ChecksumMismatch { .. })));
        assert!(recorder.step.is_empty());
        assert!(recorder.fast.is_empty());
        assert_eq!(feed.stats().fast_messages, 0);
    }

    #[test]
    fn test_unreadable_checksum_never_reaches_fast() {
        let mut buffer = step("W", Some(&snapshot_payload()));
        let first_digit = buffer.len() - 4;
        buffer[first_digit] = b'x';
        buffer.extend(step("W", Some(&snapshot_payload())));

        let mut feed = decoder(ErrorPolicy::Skip);
        let mut recorder = Recorder::default();
        feed.decode_buffer(&buffer, &mut recorder).unwrap();

        assert_eq!(recorder.errors.len(), 1);
        assert_eq!(recorder.errors[0].kind(), ErrorKind::Integrity);
        assert!(matches!(
            recorder.errors[0],
            Error::Step(DecodeError::InvalidChecksum { .. })
        ));
        assert!(recorder.step.is_empty());
        assert!(recorder.fast.is_empty());
    }

    #[test]
    fn test_skip_policy_continues_after_fast_error() {
        let payload = snapshot_payload();
        let mut buffer = step("W", Some(&payload[..5]));
        let second = buffer.len();
        buffer.extend(step("W", None));
        buffer.extend(step("W", Some(&payload)));

        let mut feed = decoder(ErrorPolicy::Skip);
        let mut recorder = Recorder::default();
        feed.decode_buffer(&buffer, &mut recorder).unwrap();

        assert_eq!(recorder.errors.len(), 2);
        assert_eq!(recorder.errors[0].kind(), ErrorKind::StreamExhausted);
        assert!(matches!(
            &recorder.errors[0],
            Error::Fast(FastError::Field { field, .. }) if field == "OrigTime"
        ));
        assert_eq!(
            recorder.errors[1],
            Error::Step(DecodeError::MissingRequiredField {
                tag: 96,
                offset: second
            })
        );
        assert_eq!(recorder.fast.len(), 2);
        assert_eq!(recorder.fast[0].get_i64("NumTrades"), Some(1200));
        assert_eq!(feed.stats().skipped, 2);
    }

    #[test]
    fn test_skip_policy_stops_at_integrity_error() {
        let mut first = step("W", Some(&snapshot_payload()));
        let n = first.len();
        first[n - 10] ^= 0x01;
        let mut buffer = first;
        buffer.extend(step("0", None));

        let mut feed = decoder(ErrorPolicy::Skip);
        let mut recorder = Recorder::default();
        feed.decode_buffer(&buffer, &mut recorder).unwrap();

        assert_eq!(recorder.errors.len(), 1);
        assert!(recorder.errors[0].kind().aborts_buffer());
        assert!(recorder.step.is_empty());
    }

    #[test]
    fn test_decode_payload_and_reset() {
        let mut feed = decoder(ErrorPolicy::Abort);

        let messages = feed.decode_payload(&snapshot_payload()).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(feed.stats().fast_messages, 2);
        assert_eq!(feed.fast_decoder().last_template_id(), Some(SNAPSHOT_TEMPLATE_ID));

        feed.reset();
        assert_eq!(feed.stats(), FeedStats::default());
        // the second message alone relies on state that is gone
        let err = feed.decode_payload(&second_snapshot()).unwrap_err();
        assert_eq!(err, Error::Fast(FastError::MissingTemplateId { offset: 0 }));
    }
}
