/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Feed pipeline configuration.

use serde::{Deserialize, Serialize};
use stepfast_core::MsgType;
use stepfast_fast::FastConfig;
use stepfast_tagvalue::FramerConfig;

/// What the pipeline does with a failed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ErrorPolicy {
    /// Return the first error to the caller.
    #[default]
    Abort,
    /// Report the error to the handler and carry on with the next message.
    /// Framing and integrity errors still end the current buffer.
    Skip,
}

/// Feed pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// STEP framing rules.
    pub framer: FramerConfig,
    /// FAST decoder limits.
    pub fast: FastConfig,
    /// Outer message type whose raw data holds FAST messages.
    pub snapshot_msg_type: MsgType,
    /// Failure handling.
    pub error_policy: ErrorPolicy,
}

impl FeedConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the framer configuration.
    #[must_use]
    pub fn with_framer(mut self, framer: FramerConfig) -> Self {
        self.framer = framer;
        self
    }

    /// Sets the FAST decoder configuration.
    #[must_use]
    pub fn with_fast(mut self, fast: FastConfig) -> Self {
        self.fast = fast;
        self
    }

    /// Sets the outer message type carrying FAST data. The framer reads raw
    /// data by length in this message type only.
    #[must_use]
    pub fn with_snapshot_msg_type(mut self, msg_type: MsgType) -> Self {
        self.framer.raw_data_msg_type = Some(msg_type.clone());
        self.snapshot_msg_type = msg_type;
        self
    }

    /// Sets the error policy.
    #[must_use]
    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            framer: FramerConfig::default(),
            fast: FastConfig::default(),
            snapshot_msg_type: MsgType::MarketDataSnapshot,
            error_policy: ErrorPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = FeedConfig::default();
        assert_eq!(config.snapshot_msg_type, MsgType::MarketDataSnapshot);
        assert_eq!(config.error_policy, ErrorPolicy::Abort);
        assert!(config.framer.validate_checksum);
        assert!(config.fast.strict_presence_map);
    }

    #[test]
    fn test_config_builder() {
        let config = FeedConfig::new()
            .with_framer(FramerConfig::new().with_checksum_validation(false))
            .with_fast(FastConfig::new().with_max_depth(4))
            .with_snapshot_msg_type(MsgType::MarketDataIncremental)
            .with_error_policy(ErrorPolicy::Skip);

        assert!(!config.framer.validate_checksum);
        assert_eq!(config.fast.max_depth, 4);
        assert_eq!(config.snapshot_msg_type, MsgType::MarketDataIncremental);
        assert!(config.framer.has_raw_data(&MsgType::MarketDataIncremental));
        assert!(!config.framer.has_raw_data(&MsgType::MarketDataSnapshot));
        assert_eq!(config.error_policy, ErrorPolicy::Skip);
    }
}
