/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! FAST decoder configuration.

use serde::{Deserialize, Serialize};

/// Default maximum group/sequence/reference nesting depth.
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// Default maximum number of sequence elements.
pub const DEFAULT_MAX_SEQUENCE_LENGTH: u32 = 65_536;

/// FAST decoder configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FastConfig {
    /// Maximum nesting depth of groups, sequences and static references.
    pub max_depth: usize,
    /// Fail when a presence bit is read past the transmitted map.
    pub strict_presence_map: bool,
    /// Maximum accepted sequence length.
    pub max_sequence_length: u32,
}

impl FastConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum nesting depth.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Sets presence map strictness.
    #[must_use]
    pub fn with_strict_presence_map(mut self, strict: bool) -> Self {
        self.strict_presence_map = strict;
        self
    }

    /// Sets the maximum sequence length.
    #[must_use]
    pub fn with_max_sequence_length(mut self, max: u32) -> Self {
        self.max_sequence_length = max;
        self
    }
}

impl Default for FastConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            strict_presence_map: true,
            max_sequence_length: DEFAULT_MAX_SEQUENCE_LENGTH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = FastConfig::default();
        assert_eq!(config.max_depth, 16);
        assert!(config.strict_presence_map);
        assert_eq!(config.max_sequence_length, 65_536);
    }

    #[test]
    fn test_config_builder() {
        let config = FastConfig::new()
            .with_max_depth(4)
            .with_strict_presence_map(false)
            .with_max_sequence_length(10);

        assert_eq!(config.max_depth, 4);
        assert!(!config.strict_presence_map);
        assert_eq!(config.max_sequence_length, 10);
    }
}
