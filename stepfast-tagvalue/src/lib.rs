/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # StepFast Tag-Value
//!
//! Zero-copy STEP tag=value framing for the stepfast decoder.
//!
//! STEP is the FIX-derived outer framing of exchange market data. Each
//! message is bounded by BodyLength, protected by a CheckSum and may carry a
//! length-prefixed binary payload (RawDataLength/RawData) holding FAST data.
//!
//! ## Features
//!
//! - **Zero-copy framing**: Field values reference the original buffer
//! - **SIMD-accelerated**: Uses `memchr` for delimiter search
//! - **Checksum gate**: Messages failing their checksum are never scanned
//! - **Raw data**: Binary payloads are read by length, not by delimiter

pub mod checksum;
pub mod config;
pub mod decoder;
pub mod encoder;

pub use checksum::calculate_checksum;
pub use config::FramerConfig;
pub use decoder::StepDecoder;
pub use encoder::StepEncoder;
pub use stepfast_core::message::StepMessage;
