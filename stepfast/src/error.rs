/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Top-level error type for the feed pipeline.

use crate::snapshot::SnapshotError;
use stepfast_core::{DecodeError, ErrorKind};
use stepfast_fast::FastError;
use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Any error raised while decoding a feed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// STEP framing or field error.
    #[error("step error: {0}")]
    Step(#[from] DecodeError),

    /// FAST payload decoding error.
    #[error("fast error: {0}")]
    Fast(#[from] FastError),

    /// Decoded message does not match the snapshot layout.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
}

impl Error {
    /// Classifies this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Step(e) => e.kind(),
            Self::Fast(e) => e.kind(),
            Self::Snapshot(_) => ErrorKind::Malformed,
        }
    }
}
