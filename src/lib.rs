//! # adminmsg — schema registry and XML codec for administrative messages
//!
//! A mail-platform administrative protocol exchanges hundreds of
//! request/response message types, each one XML element with attributes,
//! child elements, repeated children, or text content. Instead of one
//! hand-written type per message, this crate keeps the catalog as data: a
//! `SchemaRegistry` of `MessageSchema`s drives a generic `Codec` that encodes
//! and decodes `MessageValue`s with validation.
//!
//! ## Schema definition language
//!
//! Catalogs are plain text, parsed with a PEST grammar:
//!
//! ```text
//! namespace "urn:mailadmin";
//!
//! struct CosSelector {
//! 	@by: optional<string>;
//! 	value: text;
//! }
//!
//! message GetCosRequest {
//! 	cos: optional<CosSelector>;
//! }
//! ```
//!
//! ## Usage
//!
//! ```
//! use adminmsg::{parse_schemas, Codec, MessageValue, SchemaRegistry, Value};
//!
//! let mut registry = SchemaRegistry::new();
//! registry
//!     .register_all(parse_schemas("message Ping { @id: optional<int>; }").unwrap())
//!     .unwrap();
//! let codec = Codec::new(registry).unwrap();
//!
//! let value = MessageValue::new().with("id", Value::Int(7));
//! let bytes = codec.encode("Ping", None, &value).unwrap();
//! assert_eq!(bytes, b"<Ping id=\"7\"/>");
//! assert_eq!(codec.decode("Ping", None, &bytes).unwrap(), value);
//! ```
//!
//! Registration and serving are disjoint phases: build and validate the
//! registry at startup (failures there should abort the process), then share
//! the codec read-only across threads. Decode discards fields it does not
//! know, so older catalogs keep processing messages from newer ones.

pub mod batch;
pub mod codec;
pub mod dump;
pub mod lint;
pub mod parser;
pub mod schema;
pub mod value;
pub mod xml;

pub use batch::{decode_batch, encode_batch, BatchDecodeResult, OnError};
pub use codec::{Codec, CodecError};
pub use parser::parse_schemas;
pub use schema::{
    FieldDescriptor, FieldKind, Literal, MessageSchema, ScalarType, SchemaError, SchemaRegistry,
    ValueType,
};
pub use value::{MessageValue, Value};
