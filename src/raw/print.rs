//! Indented text dump of a [`RawMessage`].
//!
//! ```text
//! 1 [
//! 	1 {
//! 		1: "John Doe"
//! 		2: 1234
//! 	}
//! 	2: "second"
//! ]
//! ```
//!
//! Single occurrences print as `tag: value` or `tag { ... }`. A tag seen more
//! than once prints as `tag [ ... ]` with its elements numbered from 1.
//! Varints print as signed 64-bit integers, fixed64 as double and fixed32 as
//! float, matching the types [`infer`](super::infer) assigns.

use super::{RawMessage, RawValue};
use std::fmt::{self, Write};

/// Render `message` as text
pub fn to_text(message: &RawMessage) -> String {
    let mut out = String::new();
    // writing to a String cannot fail
    let _ = write_message(message, &mut out, 0);
    out
}

impl fmt::Display for RawMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_message(self, f, 0)
    }
}

fn write_message<W: Write>(message: &RawMessage, out: &mut W, indent: usize) -> fmt::Result {
    for (&tag, values) in message {
        match values.as_slice() {
            [single] => write_entry(tag, single, out, indent)?,
            many => {
                write_indent(out, indent)?;
                writeln!(out, "{tag} [")?;
                for (n, value) in many.iter().enumerate() {
                    write_entry(n as u32 + 1, value, out, indent + 1)?;
                }
                write_indent(out, indent)?;
                writeln!(out, "]")?;
            }
        }
    }
    Ok(())
}

fn write_entry<W: Write>(label: u32, value: &RawValue, out: &mut W, indent: usize) -> fmt::Result {
    write_indent(out, indent)?;
    match value {
        RawValue::Message(nested) => {
            writeln!(out, "{label} {{")?;
            write_message(nested, out, indent + 1)?;
            write_indent(out, indent)?;
            writeln!(out, "}}")
        }
        RawValue::Varint(v) => writeln!(out, "{label}: {}", *v as i64),
        RawValue::Fixed64(bits) => writeln!(out, "{label}: {}", f64::from_bits(*bits)),
        RawValue::Fixed32(bits) => writeln!(out, "{label}: {}", f32::from_bits(*bits)),
        RawValue::Text(s) => {
            write!(out, "{label}: ")?;
            write_quoted(s.as_bytes(), out)?;
            writeln!(out)
        }
        RawValue::Bytes(b) => {
            write!(out, "{label}: ")?;
            write_quoted(b, out)?;
            writeln!(out)
        }
    }
}

fn write_indent<W: Write>(out: &mut W, indent: usize) -> fmt::Result {
    for _ in 0..indent {
        out.write_char('\t')?;
    }
    Ok(())
}

/// Double-quoted with C escapes; bytes outside printable ASCII as `\ooo`
fn write_quoted<W: Write>(bytes: &[u8], out: &mut W) -> fmt::Result {
    out.write_char('"')?;
    for &b in bytes {
        match b {
            b'"' => out.write_str("\\\"")?,
            b'\\' => out.write_str("\\\\")?,
            b'\n' => out.write_str("\\n")?,
            b'\r' => out.write_str("\\r")?,
            b'\t' => out.write_str("\\t")?,
            0x20..=0x7e => out.write_char(char::from(b))?,
            _ => write!(out, "\\{b:03o}")?,
        }
    }
    out.write_char('"')
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_scalars_and_nesting() {
        let mut inner = RawMessage::new();
        inner.push(1, RawValue::Text("555-4321".into()));
        inner.push(2, RawValue::Varint(1));
        let mut msg = RawMessage::new();
        msg.push(1, RawValue::Varint(u64::MAX));
        msg.push(2, RawValue::Fixed64(2.5f64.to_bits()));
        msg.push(3, RawValue::Message(inner));

        assert_eq!(
            to_text(&msg),
            "1: -1\n2: 2.5\n3 {\n\t1: \"555-4321\"\n\t2: 1\n}\n"
        );
    }

    #[test]
    fn test_repeated_numbered_from_one() {
        let mut msg = RawMessage::new();
        msg.push(4, RawValue::Varint(3));
        msg.push(4, RawValue::Varint(270));
        msg.push(4, RawValue::Fixed32(0.5f32.to_bits()));
        assert_eq!(msg.to_string(), "4 [\n\t1: 3\n\t2: 270\n\t3: 0.5\n]\n");
    }

    #[test]
    fn test_escapes() {
        let mut msg = RawMessage::new();
        msg.push(1, RawValue::Bytes(Bytes::from_static(b"a\"\\\n\x00\xff")));
        assert_eq!(to_text(&msg), "1: \"a\\\"\\\\\\n\\000\\377\"\n");
    }
}
