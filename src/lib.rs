//! # protowire
//!
//! Protocol-buffers (proto2) wire format codec.
//!
//! ## Layers
//! - [`core`]: varints, field keys, bounds-checked reader and writer
//! - [`schema`]: message descriptors, loadable from TOML, renderable as `.proto`
//! - [`message`] + [`codec`]: dynamic messages encoded and decoded against a schema
//! - [`typed`]: hand-written structs with compile-time field layout
//! - [`raw`]: schema-less parsing, text dump and schema inference
//!
//! Packed and unpacked repeated numeric fields are interchangeable on the
//! decode side. The encode side follows the schema's `packed` flag, or the
//! helper a typed struct calls.
//!
//! ## Example
//! ```rust
//! use protowire::{Codec, FieldDescriptor, Message, MessageDescriptor, ScalarType, Schema};
//!
//! let schema = Schema::new(
//!     Some("tutorial".into()),
//!     vec![
//!         MessageDescriptor::new("PhoneNumber")
//!             .field(FieldDescriptor::new("number", 1, ScalarType::String).required())
//!             .field(FieldDescriptor::new("type", 2, ScalarType::Enum)),
//!         MessageDescriptor::new("Person")
//!             .field(FieldDescriptor::new("name", 1, ScalarType::String).required())
//!             .field(FieldDescriptor::new("id", 2, ScalarType::Int32).required())
//!             .field(FieldDescriptor::new("email", 3, ScalarType::String))
//!             .field(FieldDescriptor::message("phone", 4, "PhoneNumber").repeated()),
//!     ],
//! )?;
//!
//! let mut person = Message::new();
//! person.set(1, "John Doe").set(2, 1234).set(3, "jdoe@example.com");
//! person.push(4, Message::new().with(1, "555-4321").with(2, 1));
//!
//! let codec = Codec::new(&schema);
//! let bytes = codec.encode("Person", &person)?;
//! assert_eq!(codec.decode("Person", &bytes)?, person);
//! # Ok::<(), protowire::CodecError>(())
//! ```

pub mod codec;
pub mod config;
pub mod core;
pub mod error;
pub mod message;
pub mod raw;
pub mod schema;
pub mod typed;
pub mod utils;

pub use codec::Codec;
pub use config::{CodecConfig, LoggingConfig, ProtowireConfig};
pub use error::{CodecError, Result};
pub use message::{FieldValue, Message, MessageBuilder, Value};
pub use raw::{RawMessage, RawValue};
pub use schema::{FieldDescriptor, FieldType, Label, MessageDescriptor, ScalarType, Schema};
pub use typed::WireMessage;
