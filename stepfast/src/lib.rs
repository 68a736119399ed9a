/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # StepFast
//!
//! Decoder for exchange market data carried as FAST payloads inside STEP
//! (FIX-derived) tag=value messages.
//!
//! ## Features
//!
//! - **Zero-copy framing**: STEP fields borrow the scanned buffer
//! - **Checksum gate**: corrupted messages never reach the FAST decoder
//! - **FAST 1.1**: presence maps, field operators and a session dictionary
//! - **Typed snapshots**: the bundled snapshot template maps to [`MarketSnapshot`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stepfast::prelude::*;
//!
//! # fn main() -> stepfast::Result<()> {
//! let buffer: Vec<u8> = std::fs::read("step.dat").unwrap_or_default();
//! let mut feed = FeedDecoder::snapshot(FeedConfig::new().with_error_policy(ErrorPolicy::Skip))?;
//! let mut collector = SnapshotCollector::new();
//! feed.decode_buffer(&buffer, &mut collector)?;
//! for snapshot in collector.snapshots() {
//!     println!("{} {:?}", snapshot.security_id, snapshot.prev_close());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Crate Organization
//!
//! - [`core`]: Error taxonomy, STEP fields and message views
//! - [`tagvalue`]: STEP framing, checksum and encoding
//! - [`fast`]: FAST codecs, templates and the session decoder

pub mod config;
pub mod error;
pub mod feed;
pub mod snapshot;

pub mod core {
    //! Error taxonomy, STEP fields and message views.
    pub use stepfast_core::*;
}

pub mod tagvalue {
    //! STEP framing, checksum and encoding.
    pub use stepfast_tagvalue::*;
}

pub mod fast {
    //! FAST codecs, templates and the session decoder.
    pub use stepfast_fast::*;
}

pub use config::{ErrorPolicy, FeedConfig};
pub use error::{Error, Result};
pub use feed::{FeedDecoder, FeedHandler, FeedStats};
pub use snapshot::{MarketSnapshot, SNAPSHOT_TEMPLATE_ID, SnapshotCollector, SnapshotError};

/// Prelude module for convenient imports.
pub mod prelude {
    // Core types
    pub use stepfast_core::{DecodeError, ErrorKind, FieldRef, MsgType, StepMessage};

    // Framing
    pub use stepfast_tagvalue::{FramerConfig, StepDecoder, StepEncoder, calculate_checksum};

    // FAST
    pub use stepfast_fast::{
        DictionaryScope, FastConfig, FastDecoder, FastEncoder, FastError, FieldValue, Message,
        Operator, ScalarField, ScalarType, ScalarValue, Template, TemplateRegistry,
    };

    // Pipeline
    pub use crate::{
        Error, ErrorPolicy, FeedConfig, FeedDecoder, FeedHandler, FeedStats, MarketSnapshot,
        Result, SnapshotCollector,
    };
}
