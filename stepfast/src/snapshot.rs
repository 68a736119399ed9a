/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Market data snapshot template and typed view.
//!
//! The bundled definition covers the per-security snapshot header sent in
//! STEP `W` messages. Prices and amounts are integers with four implied
//! decimals; OrigTime is `YYYYMMDDHHMMSSsss` packed into an integer.

use crate::feed::FeedHandler;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Serialize;
use stepfast_fast::{FastError, Message, Operator, ScalarField, ScalarType, Template, TemplateRegistry};
use thiserror::Error;
use tracing::warn;

/// Template id of the snapshot message.
pub const SNAPSHOT_TEMPLATE_ID: u32 = 300111;

/// Implied decimals of prices and amounts.
pub const PRICE_SCALE: u32 = 4;

/// Errors converting a decoded message into a [`MarketSnapshot`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    /// The message was decoded with another template.
    #[error("template {0} is not a snapshot template")]
    WrongTemplate(u32),

    /// A mandatory field is absent or has the wrong type.
    #[error("missing snapshot field {0}")]
    MissingField(&'static str),
}

/// Builds the snapshot template.
#[must_use]
pub fn snapshot_template() -> Template {
    use ScalarType::{Ascii, Int64, UInt32};

    Template::new(SNAPSHOT_TEMPLATE_ID, "MarketSnapshot")
        .field(ScalarField::new("OrigTime", Int64).with_id(42).with_operator(Operator::Copy))
        .field(ScalarField::new("ChannelNo", UInt32).with_id(1180).with_operator(Operator::Copy))
        .field(ScalarField::new("MDStreamID", Ascii).with_id(1500).with_operator(Operator::Copy))
        .field(ScalarField::new("SecurityID", Ascii).with_id(48).with_operator(Operator::Copy))
        .field(
            ScalarField::new("SecurityIDSource", Ascii)
                .with_id(22)
                .with_operator(Operator::Constant)
                .with_initial("102"),
        )
        .field(
            ScalarField::new("TradingPhaseCode", Ascii)
                .optional()
                .with_id(8538)
                .with_operator(Operator::Copy),
        )
        .field(ScalarField::new("PrevClosePx", Int64).optional().with_id(140))
        .field(ScalarField::new("NumTrades", Int64).with_id(8503).with_operator(Operator::Delta))
        .field(ScalarField::new("TotalVolumeTrade", Int64).with_id(387).with_operator(Operator::Delta))
        .field(ScalarField::new("TotalValueTrade", Int64).with_id(8504).with_operator(Operator::Delta))
}

/// Builds a registry holding the snapshot template.
///
/// # Errors
/// Returns `FastError::InvalidTemplate` if the template fails validation.
pub fn snapshot_registry() -> Result<TemplateRegistry, FastError> {
    TemplateRegistry::new().with_template(snapshot_template())
}

/// Typed view of one decoded snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketSnapshot {
    /// Exchange timestamp, `YYYYMMDDHHMMSSsss`.
    pub orig_time: i64,
    /// Channel number.
    pub channel_no: u32,
    /// Market data stream.
    pub md_stream_id: String,
    /// Security code.
    pub security_id: String,
    /// Security code source.
    pub security_id_source: String,
    /// Trading phase, absent outside trading hours on some streams.
    pub trading_phase_code: Option<String>,
    /// Previous close, four implied decimals.
    pub prev_close_px: Option<i64>,
    /// Number of trades.
    pub num_trades: i64,
    /// Traded volume.
    pub total_volume_trade: i64,
    /// Traded value, four implied decimals.
    pub total_value_trade: i64,
}

impl MarketSnapshot {
    /// Builds a snapshot from a decoded message.
    ///
    /// # Errors
    /// Returns `SnapshotError` if the message was not decoded with the
    /// snapshot template or a mandatory field is missing.
    pub fn from_message(message: &Message) -> Result<Self, SnapshotError> {
        if message.template_id() != SNAPSHOT_TEMPLATE_ID {
            return Err(SnapshotError::WrongTemplate(message.template_id()));
        }

        let string = |name: &'static str| {
            message
                .get_str(name)
                .map(str::to_string)
                .ok_or(SnapshotError::MissingField(name))
        };
        let int = |name: &'static str| message.get_i64(name).ok_or(SnapshotError::MissingField(name));

        Ok(Self {
            orig_time: int("OrigTime")?,
            channel_no: message
                .get_u64("ChannelNo")
                .and_then(|v| u32::try_from(v).ok())
                .ok_or(SnapshotError::MissingField("ChannelNo"))?,
            md_stream_id: string("MDStreamID")?,
            security_id: string("SecurityID")?,
            security_id_source: string("SecurityIDSource")?,
            trading_phase_code: message.get_str("TradingPhaseCode").map(str::to_string),
            prev_close_px: message.get_i64("PrevClosePx"),
            num_trades: int("NumTrades")?,
            total_volume_trade: int("TotalVolumeTrade")?,
            total_value_trade: int("TotalValueTrade")?,
        })
    }

    /// Returns OrigTime as a timestamp, `None` if it is not a valid date.
    #[must_use]
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        parse_orig_time(self.orig_time)
    }

    /// Returns the previous close as a decimal.
    #[must_use]
    pub fn prev_close(&self) -> Option<Decimal> {
        self.prev_close_px.map(|px| Decimal::new(px, PRICE_SCALE))
    }

    /// Returns the traded value as a decimal.
    #[must_use]
    pub fn total_value(&self) -> Decimal {
        Decimal::new(self.total_value_trade, PRICE_SCALE)
    }
}

impl TryFrom<&Message> for MarketSnapshot {
    type Error = SnapshotError;

    fn try_from(message: &Message) -> Result<Self, Self::Error> {
        Self::from_message(message)
    }
}

/// Parses a `YYYYMMDDHHMMSSsss` integer.
#[must_use]
pub fn parse_orig_time(value: i64) -> Option<NaiveDateTime> {
    if value < 0 {
        return None;
    }
    let date = value / 1_000_000_000;
    let time = value % 1_000_000_000;

    let year = i32::try_from(date / 10_000).ok()?;
    let month = u32::try_from((date / 100) % 100).ok()?;
    let day = u32::try_from(date % 100).ok()?;
    let hour = u32::try_from(time / 10_000_000).ok()?;
    let minute = u32::try_from((time / 100_000) % 100).ok()?;
    let second = u32::try_from((time / 1_000) % 100).ok()?;
    let milli = u32::try_from(time % 1_000).ok()?;

    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_milli_opt(hour, minute, second, milli)
}

/// Handler collecting every snapshot of a feed.
#[derive(Debug, Default)]
pub struct SnapshotCollector {
    snapshots: Vec<MarketSnapshot>,
    rejected: usize,
}

impl SnapshotCollector {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the collected snapshots in feed order.
    #[must_use]
    pub fn snapshots(&self) -> &[MarketSnapshot] {
        &self.snapshots
    }

    /// Returns the number of snapshot-template messages that failed conversion.
    #[must_use]
    pub const fn rejected(&self) -> usize {
        self.rejected
    }

    /// Consumes the collector, returning the snapshots.
    #[must_use]
    pub fn into_snapshots(self) -> Vec<MarketSnapshot> {
        self.snapshots
    }
}

impl FeedHandler for SnapshotCollector {
    fn on_fast_message(&mut self, message: &Message) {
        if message.template_id() != SNAPSHOT_TEMPLATE_ID {
            return;
        }
        match MarketSnapshot::from_message(message) {
            Ok(snapshot) => self.snapshots.push(snapshot),
            Err(e) => {
                warn!(error = %e, "rejected snapshot");
                self.rejected += 1;
            }
        }
    }
}
