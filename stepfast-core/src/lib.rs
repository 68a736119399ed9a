/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # stepfast Core
//!
//! Core types and the error taxonomy for the stepfast STEP/FAST decoder.
//!
//! This crate provides the building blocks shared by the framer and the codec:
//! - **Error types**: [`ErrorKind`] classification and the STEP [`DecodeError`]
//! - **Field types**: [`FieldRef`], [`OwnedField`] and the structural [`tags`]
//! - **Message types**: [`MsgType`], [`StepMessage`], [`OwnedStepMessage`]
//!
//! ## Zero-Copy Design
//!
//! Framed messages borrow from the scanned buffer; owned copies are available
//! for storage and cross-thread transfer.

pub mod error;
pub mod field;
pub mod message;

pub use error::{DecodeError, ErrorKind};
pub use field::{FieldRef, OwnedField, tags};
pub use message::{MsgType, OwnedStepMessage, StepMessage};
