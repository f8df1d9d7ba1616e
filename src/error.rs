//! # Error Types
//!
//! Error handling for the wire codec.
//!
//! Every failure aborts the whole encode or decode call. Nothing is returned
//! half-built, so callers either get a complete value or one of these errors.
//!
//! ## Error Categories
//! - **Encoding**: a value does not fit the scalar type its field declares
//! - **Malformed input**: truncated varints, lengths past the end of input,
//!   invalid keys or payloads
//! - **Schema mismatch**: a tag or wire type the descriptor does not allow
//!   (unknown tags only fail in strict mode)
//! - **Schema / configuration**: invalid descriptors or settings
//! - **I/O**: only raised by config loading and the CLI, never by the codec
//!
//! Decode errors carry the byte offset (and the tag when one was read) so a
//! faulty field can be located in a hex dump.
//!
//! ## Example Usage
//! ```rust
//! use protowire::core::varint::decode_varint;
//! use protowire::error::CodecError;
//!
//! match decode_varint(&[0x96]) {
//!     Err(CodecError::MalformedInput { offset, reason, .. }) => {
//!         assert_eq!(offset, 0);
//!         assert_eq!(reason, protowire::error::constants::ERR_TRUNCATED_VARINT);
//!     }
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

use std::io;
use thiserror::Error;

/// Static error messages for the decode paths.
/// Borrowed strings keep the hot error paths allocation-free.
pub mod constants {
    /// Varint errors
    pub const ERR_TRUNCATED_VARINT: &str = "input ends inside a varint";
    pub const ERR_VARINT_OVERFLOW: &str = "varint exceeds 64 bits";

    /// Key errors
    pub const ERR_ZERO_TAG: &str = "field number 0 is invalid";
    pub const ERR_TAG_OUT_OF_RANGE: &str = "field number exceeds 536870911";
    pub const ERR_INVALID_WIRE_TYPE: &str = "invalid wire type";
    pub const ERR_GROUP_UNSUPPORTED: &str = "group wire types are not supported";

    /// Payload errors
    pub const ERR_LENGTH_EXCEEDS_INPUT: &str = "declared length exceeds remaining input";
    pub const ERR_TRUNCATED_FIXED: &str = "input ends inside a fixed-width value";
    pub const ERR_PACKED_WIDTH: &str = "packed payload is not a multiple of the element width";
    pub const ERR_INVALID_UTF8: &str = "string field is not valid UTF-8";
    pub const ERR_RECURSION_LIMIT: &str = "nested messages exceed the recursion limit";
}

/// CodecError is the error type for every codec operation
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Encoding error in field {tag}: {reason}")]
    Encoding { tag: u32, reason: String },

    #[error("Malformed input at offset {offset}{}: {reason}", fmt_tag(.tag))]
    MalformedInput {
        offset: usize,
        tag: Option<u32>,
        reason: &'static str,
    },

    #[error("Schema mismatch for field {tag}{}: {reason}", fmt_offset(.offset))]
    SchemaMismatch {
        tag: u32,
        offset: Option<usize>,
        reason: String,
    },

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Unknown message type: {0}")]
    UnknownMessageType(String),

    #[error("Message too large: {0} bytes")]
    OversizedMessage(usize),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl CodecError {
    /// Shorthand for a [`CodecError::MalformedInput`] without a tag.
    pub fn malformed(offset: usize, reason: &'static str) -> Self {
        CodecError::MalformedInput {
            offset,
            tag: None,
            reason,
        }
    }

    /// Attach a tag to a malformed-input error that does not have one yet.
    pub fn with_tag(self, tag: u32) -> Self {
        match self {
            CodecError::MalformedInput {
                offset,
                tag: None,
                reason,
            } => CodecError::MalformedInput {
                offset,
                tag: Some(tag),
                reason,
            },
            other => other,
        }
    }
}

fn fmt_tag(tag: &Option<u32>) -> String {
    tag.map(|t| format!(" (field {t})")).unwrap_or_default()
}

fn fmt_offset(offset: &Option<usize>) -> String {
    offset.map(|o| format!(" at offset {o}")).unwrap_or_default()
}

/// Type alias for Results using CodecError
pub type Result<T> = std::result::Result<T, CodecError>;
