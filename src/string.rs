//! String encoding (Spec 7.1.10).
//!
//! When no restricted character set is in effect, the string is encoded as a
//! length-prefixed sequence of Unicode code points. The length (number of
//! characters) is an Unsigned Integer (Spec 7.1.6), followed by each
//! character's code point as an Unsigned Integer. Restricted character sets
//! (Spec 7.1.10.1) live in the [`crate::rcs`] module.

use crate::bitstream::{BitReader, BitWriter};
use crate::{Error, Result, unsigned_integer};

/// Encodes a string as a length-prefixed sequence of Unicode code points
/// (Spec 7.1.10).
pub fn encode(writer: &mut BitWriter, value: &str) {
    if value.is_ascii() {
        // ASCII: len() == Zeichenanzahl; jeder Codepoint ist exakt das Rohbyte
        unsigned_integer::encode(writer, value.len() as u64);
        writer.write_bytes_aligned(value.as_bytes());
    } else {
        unsigned_integer::encode(writer, value.chars().count() as u64);
        for ch in value.chars() {
            unsigned_integer::encode(writer, ch as u64);
        }
    }
}

/// Decodes a string from a length-prefixed sequence of Unicode code points
/// (Spec 7.1.10).
///
/// Returns [`Error::InvalidCodePoint`] if a decoded code point is a
/// surrogate (U+D800..U+DFFF) or exceeds U+10FFFF.
pub fn decode(reader: &mut BitReader) -> Result<String> {
    let len = unsigned_integer::decode(reader)?;
    let len = usize::try_from(len).map_err(|_| Error::ListLengthOverflow(len))?;
    let mut out = String::with_capacity(len);
    for _ in 0..len {
        let cp = unsigned_integer::decode(reader)?;
        let ch = u32::try_from(cp)
            .ok()
            .and_then(char::from_u32)
            .ok_or(Error::InvalidCodePoint(cp))?;
        out.push(ch);
    }
    Ok(out)
}
