/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # StepFast FAST
//!
//! FAST (FIX Adapted for Streaming) 1.1 decoding for market data payloads.
//!
//! FAST is a binary encoding that strips redundancy from a message stream
//! using stop-bit encoding, presence maps and field operators backed by a
//! session dictionary.
//!
//! ## Features
//!
//! - **Stop-bit primitives**: integers, ASCII strings, byte vectors, decimals
//! - **Presence maps**: strict or lenient bit consumption
//! - **Field operators**: constant, default, copy, increment, delta and tail
//! - **Templates**: groups, sequences and static template references
//! - **Session dictionary**: global, template and type scopes with
//!   per-message commit
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use stepfast_fast::{FastDecoder, Operator, ScalarField, ScalarType, Template, TemplateRegistry};
//!
//! let registry = TemplateRegistry::new()
//!     .with_template(
//!         Template::new(1, "Tick")
//!             .field(ScalarField::new("SeqNo", ScalarType::UInt32).with_operator(Operator::Increment)),
//!     )
//!     .unwrap();
//!
//! let mut decoder = FastDecoder::new(Arc::new(registry));
//! let messages = decoder.decode_all(&[0xE0, 0x81, 0x8A, 0x80]).unwrap();
//! assert_eq!(messages[1].get_u64("SeqNo"), Some(11));
//! ```

pub mod codec;
pub mod config;
pub mod decoder;
pub mod dictionary;
pub mod encoder;
pub mod error;
pub mod message;
pub mod operators;
pub mod pmap;
pub mod template;
pub mod value;

pub use config::FastConfig;
pub use decoder::FastDecoder;
pub use dictionary::{Dictionary, DictionaryKey, ScopeKey, TemplateScope};
pub use encoder::FastEncoder;
pub use error::FastError;
pub use message::{FieldValue, GroupValue, Message};
pub use operators::{DictionaryScope, DictionaryValue, Operator};
pub use pmap::{PresenceMap, PresenceMapBuilder};
pub use template::{Group, Instruction, ScalarField, Sequence, Template, TemplateRegistry};
pub use value::{FastDecimal, ScalarType, ScalarValue};
