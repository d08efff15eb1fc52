//! List encoding (Spec 7.1.11).
//!
//! Values of a list type are encoded as a length-prefixed sequence: the item
//! count as an Unsigned Integer (Spec 7.1.6), then each item by its
//! item-type codec. The lexical side splits on XML Schema list whitespace
//! (space, tab, CR, LF); an empty or whitespace-only lexical form is the
//! zero-item list and canonically renders as the empty string.

use crate::bitstream::{BitReader, BitWriter};
use crate::{Error, Result, unsigned_integer};

/// Maximum list length to guard against corrupted length prefixes.
pub const MAX_LIST_LENGTH: u64 = 1 << 24;

/// Splits a list lexical form into its whitespace-separated items.
pub fn split_items(lexical: &str) -> impl Iterator<Item = &str> {
    lexical
        .split([' ', '\t', '\n', '\r'])
        .filter(|s| !s.is_empty())
}

/// Joins canonical item forms with single spaces.
pub fn join_items<I: IntoIterator<Item = String>>(items: I) -> String {
    items.into_iter().collect::<Vec<_>>().join(" ")
}

/// Encodes a list as a length-prefixed sequence of values (Spec 7.1.11).
pub fn encode<T, F>(writer: &mut BitWriter, items: &[T], mut encode_item: F)
where
    F: FnMut(&mut BitWriter, &T),
{
    unsigned_integer::encode(writer, items.len() as u64);
    for item in items {
        encode_item(writer, item);
    }
}

/// Decodes a list from a length-prefixed sequence of values (Spec 7.1.11).
///
/// Returns [`Error::ListLengthOverflow`] if the decoded length exceeds
/// [`MAX_LIST_LENGTH`].
pub fn decode<T, F>(reader: &mut BitReader, mut decode_item: F) -> Result<Vec<T>>
where
    F: FnMut(&mut BitReader) -> Result<T>,
{
    let len = unsigned_integer::decode(reader)?;
    if len > MAX_LIST_LENGTH {
        return Err(Error::ListLengthOverflow(len));
    }
    let mut items = Vec::with_capacity(len as usize);
    for _ in 0..len {
        items.push(decode_item(reader)?);
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::string;

    /// Spec 7.1.11: leere Liste — length=0, keine Werte.
    #[test]
    fn leere_liste() {
        let mut w = BitWriter::new();
        encode(&mut w, &[] as &[u8], |w, &v| w.write_byte_aligned(v));
        let data = w.into_vec();
        assert_eq!(data, vec![0x00]);

        let mut r = BitReader::new(&data);
        let result: Vec<u8> = decode(&mut r, |r| r.read_byte_aligned()).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn string_liste() {
        let items = vec!["foo".to_string(), "bar".to_string(), "baz".to_string()];
        let mut w = BitWriter::new();
        encode(&mut w, &items, |w, s| string::encode(w, s));
        let data = w.into_vec();

        let mut r = BitReader::new(&data);
        let result: Vec<String> = decode(&mut r, string::decode).unwrap();
        assert_eq!(result, items);
    }

    #[test]
    fn unsigned_liste() {
        let items: Vec<u64> = vec![0, 127, 128, 16383, 16384];
        let mut w = BitWriter::new();
        encode(&mut w, &items, |w, &v| unsigned_integer::encode(w, v));
        let data = w.into_vec();

        let mut r = BitReader::new(&data);
        let result: Vec<u64> = decode(&mut r, unsigned_integer::decode).unwrap();
        assert_eq!(result, items);
    }

    /// XML-Schema-Whitespace trennt Items; Mehrfach-Whitespace kollabiert.
    #[test]
    fn split_mit_beliebigem_whitespace() {
        let items: Vec<&str> = split_items(" 15\t\t65 \r\n 78 ").collect();
        assert_eq!(items, vec!["15", "65", "78"]);
    }

    #[test]
    fn split_leer_und_nur_whitespace() {
        assert_eq!(split_items("").count(), 0);
        assert_eq!(split_items(" \t\r\n ").count(), 0);
    }

    #[test]
    fn join_kanonisch() {
        let joined = join_items(vec!["15".to_string(), "65".to_string(), "78".to_string()]);
        assert_eq!(joined, "15 65 78");
        assert_eq!(join_items(Vec::<String>::new()), "");
    }

    /// Spec 7.1.11: korrupte Länge wird abgelehnt.
    #[test]
    fn laengen_limit() {
        let mut w = BitWriter::new();
        unsigned_integer::encode(&mut w, MAX_LIST_LENGTH + 1);
        let data = w.into_vec();
        let mut r = BitReader::new(&data);
        let result: Result<Vec<u8>> = decode(&mut r, |r| r.read_byte_aligned());
        assert!(matches!(result.unwrap_err(), Error::ListLengthOverflow(_)));
    }

    #[test]
    fn decode_eof_mitten_in_items() {
        let mut w = BitWriter::new();
        unsigned_integer::encode(&mut w, 3);
        unsigned_integer::encode(&mut w, 1);
        let data = w.into_vec();
        let mut r = BitReader::new(&data);
        let result: Result<Vec<u64>> = decode(&mut r, unsigned_integer::decode);
        assert_eq!(result.unwrap_err(), Error::PrematureEndOfStream);
    }
}
