/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! STEP framer configuration.

use serde::{Deserialize, Serialize};
use stepfast_core::MsgType;
use stepfast_core::tags;

/// BeginString used by STEP feeds.
pub const DEFAULT_BEGIN_STRING: &str = "STEP.1.0.0";

/// STEP framer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FramerConfig {
    /// Expected BeginString value, `None` accepts any.
    pub begin_string: Option<String>,
    /// Verify the CheckSum field of every message.
    pub validate_checksum: bool,
    /// Largest accepted BodyLength, `None` for no limit.
    pub max_message_size: Option<usize>,
    /// Tag carrying the byte length of the raw data field.
    pub raw_data_length_tag: u32,
    /// Tag whose value is read by length instead of by delimiter.
    pub raw_data_tag: u32,
    /// Message type whose raw data tag is read by length, `None` for every
    /// type. In other messages the raw data tags are ordinary fields.
    pub raw_data_msg_type: Option<MsgType>,
}

impl FramerConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the expected BeginString.
    #[must_use]
    pub fn with_begin_string(mut self, begin_string: impl Into<String>) -> Self {
        self.begin_string = Some(begin_string.into());
        self
    }

    /// Accepts any BeginString value.
    #[must_use]
    pub fn with_any_begin_string(mut self) -> Self {
        self.begin_string = None;
        self
    }

    /// Enables or disables checksum verification.
    #[must_use]
    pub fn with_checksum_validation(mut self, validate: bool) -> Self {
        self.validate_checksum = validate;
        self
    }

    /// Sets the maximum BodyLength.
    #[must_use]
    pub fn with_max_message_size(mut self, max: usize) -> Self {
        self.max_message_size = Some(max);
        self
    }

    /// Sets the raw data length and raw data tags.
    #[must_use]
    pub fn with_raw_data_tags(mut self, length_tag: u32, data_tag: u32) -> Self {
        self.raw_data_length_tag = length_tag;
        self.raw_data_tag = data_tag;
        self
    }

    /// Restricts the raw data rule to one message type, `None` for all.
    #[must_use]
    pub fn with_raw_data_msg_type(mut self, msg_type: Option<MsgType>) -> Self {
        self.raw_data_msg_type = msg_type;
        self
    }

    /// Returns true if `msg_type` carries a length-delimited raw data field.
    #[must_use]
    pub fn has_raw_data(&self, msg_type: &MsgType) -> bool {
        self.raw_data_msg_type
            .as_ref()
            .is_none_or(|expected| expected == msg_type)
    }
}

impl Default for FramerConfig {
    fn default() -> Self {
        Self {
            begin_string: Some(DEFAULT_BEGIN_STRING.to_string()),
            validate_checksum: true,
            max_message_size: None,
            raw_data_length_tag: tags::RAW_DATA_LENGTH,
            raw_data_tag: tags::RAW_DATA,
            raw_data_msg_type: Some(MsgType::MarketDataSnapshot),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = FramerConfig::default();
        assert_eq!(config.begin_string.as_deref(), Some("STEP.1.0.0"));
        assert!(config.validate_checksum);
        assert!(config.max_message_size.is_none());
        assert_eq!(config.raw_data_length_tag, 95);
        assert_eq!(config.raw_data_tag, 96);
        assert!(config.has_raw_data(&MsgType::MarketDataSnapshot));
        assert!(!config.has_raw_data(&MsgType::Heartbeat));
    }

    #[test]
    fn test_config_builder() {
        let config = FramerConfig::new()
            .with_any_begin_string()
            .with_checksum_validation(false)
            .with_max_message_size(4096)
            .with_raw_data_tags(93, 89)
            .with_raw_data_msg_type(None);

        assert!(config.begin_string.is_none());
        assert!(!config.validate_checksum);
        assert_eq!(config.max_message_size, Some(4096));
        assert_eq!((config.raw_data_length_tag, config.raw_data_tag), (93, 89));
        assert!(config.has_raw_data(&MsgType::Heartbeat));
    }
}
