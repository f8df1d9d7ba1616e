//! # Core Wire Components
//!
//! Low-level building blocks of the protocol-buffers wire format.
//!
//! This module provides the primitives every higher layer is built from:
//! varints, field keys, a bounds-checked reader and an output writer.
//!
//! ## Components
//! - **varint**: base-128 integer encoding
//! - **wire**: wire types and `(tag << 3) | wire_type` keys
//! - **reader**: cursor that reports absolute byte offsets on failure
//! - **writer**: `BytesMut`-backed output with field helpers
//!
//! ## Wire Format
//! ```text
//! [Key(varint)] [Value]  [Key(varint)] [Value]  ...
//!
//! VARINT  value = varint
//! I64     value = 8 bytes little endian
//! LEN     value = [Length(varint)] [Payload(Length)]
//! I32     value = 4 bytes little endian
//! ```
//!
//! ## Safety
//! - Length prefixes are checked against remaining input before slicing
//! - Varints longer than 10 bytes are rejected

pub mod reader;
pub mod varint;
pub mod wire;
pub mod writer;
