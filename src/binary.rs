//! Binary encoding (Spec 7.1.1) for xsd:base64Binary and xsd:hexBinary.
//!
//! The wire representation is a length-prefixed sequence of octets: the
//! length as an Unsigned Integer (Spec 7.1.6) followed by the raw bytes.
//! The lexical mapping (base64 or hex) only matters at the string boundary.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::bitstream::{BitReader, BitWriter};
use crate::{Error, Result, unsigned_integer};

/// Maximum octet length accepted on decode (guards against corrupted
/// length prefixes).
pub const MAX_BINARY_LENGTH: u64 = 1 << 30;

/// Encodes raw octets (Spec 7.1.1).
pub fn encode(writer: &mut BitWriter, data: &[u8]) {
    unsigned_integer::encode(writer, data.len() as u64);
    writer.write_bytes_aligned(data);
}

/// Decodes raw octets (Spec 7.1.1).
pub fn decode(reader: &mut BitReader) -> Result<Vec<u8>> {
    let len = unsigned_integer::decode(reader)?;
    if len > MAX_BINARY_LENGTH {
        return Err(Error::ListLengthOverflow(len));
    }
    reader.read_bytes_aligned(len as usize)
}

/// Parses an xsd:base64Binary lexical form. Whitespace is removed before
/// decoding (XML Schema allows it between encoding groups).
pub fn parse_base64(lexical: &str) -> Result<Vec<u8>> {
    let compact: String = lexical
        .chars()
        .filter(|c| !matches!(c, ' ' | '\t' | '\n' | '\r'))
        .collect();
    BASE64
        .decode(compact.as_bytes())
        .map_err(|_| Error::value_format(lexical, "base64Binary"))
}

/// Canonical xsd:base64Binary lexical form.
pub fn to_base64(data: &[u8]) -> String {
    BASE64.encode(data)
}

/// Parses an xsd:hexBinary lexical form (even number of hex digits).
pub fn parse_hex(lexical: &str) -> Result<Vec<u8>> {
    let s = crate::typed_value::trim_xml_ws(lexical);
    if s.len() % 2 != 0 {
        return Err(Error::value_format(lexical, "hexBinary"));
    }
    let mut out = Vec::with_capacity(s.len() / 2);
    let bytes = s.as_bytes();
    for pair in bytes.chunks_exact(2) {
        let hi = (pair[0] as char)
            .to_digit(16)
            .ok_or_else(|| Error::value_format(lexical, "hexBinary"))?;
        let lo = (pair[1] as char)
            .to_digit(16)
            .ok_or_else(|| Error::value_format(lexical, "hexBinary"))?;
        out.push(((hi << 4) | lo) as u8);
    }
    Ok(out)
}

/// Canonical xsd:hexBinary lexical form (uppercase digits).
pub fn to_hex(data: &[u8]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(data.len() * 2);
    for b in data {
        // write! auf String kann nicht fehlschlagen
        let _ = write!(s, "{b:02X}");
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(data: &[u8]) -> Vec<u8> {
        let mut w = BitWriter::new();
        encode(&mut w, data);
        let bytes = w.into_vec();
        let mut r = BitReader::new(&bytes);
        decode(&mut r).unwrap()
    }

    #[test]
    fn octets_round_trip() {
        assert_eq!(round_trip(&[]), Vec::<u8>::new());
        assert_eq!(round_trip(&[0x00, 0xFF, 0x7F]), vec![0x00, 0xFF, 0x7F]);
    }

    #[test]
    fn base64_parse_und_canonical() {
        let data = parse_base64("SGVsbG8=").unwrap();
        assert_eq!(data, b"Hello");
        assert_eq!(to_base64(&data), "SGVsbG8=");
    }

    /// XML Schema erlaubt Whitespace zwischen Base64-Gruppen.
    #[test]
    fn base64_mit_whitespace() {
        let data = parse_base64("SGVs\n bG8=").unwrap();
        assert_eq!(data, b"Hello");
    }

    #[test]
    fn base64_ungueltig() {
        assert!(parse_base64("!!!").is_err());
    }

    #[test]
    fn hex_parse_und_canonical() {
        let data = parse_hex("00ff7F").unwrap();
        assert_eq!(data, vec![0x00, 0xFF, 0x7F]);
        assert_eq!(to_hex(&data), "00FF7F");
    }

    #[test]
    fn hex_ungueltig() {
        assert!(parse_hex("0").is_err()); // ungerade Länge
        assert!(parse_hex("zz").is_err());
    }

    /// Korrupter Längen-Prefix wird abgelehnt.
    #[test]
    fn laengen_limit() {
        let mut w = BitWriter::new();
        unsigned_integer::encode(&mut w, MAX_BINARY_LENGTH + 1);
        let data = w.into_vec();
        let mut r = BitReader::new(&data);
        assert!(matches!(decode(&mut r).unwrap_err(), Error::ListLengthOverflow(_)));
    }
}
