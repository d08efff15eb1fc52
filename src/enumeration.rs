//! Enumeration encoding (Spec 7.2).
//!
//! A value of an enumerated type is encoded as its position in the type's
//! (schema-ordered) value list, as an n-bit unsigned integer with
//! `n = ⌈log₂(m)⌉` for m enumeration values.

use crate::bitstream::{BitReader, BitWriter};
use crate::options::Alignment;
use crate::{Error, Result, n_bit_unsigned_integer};

/// Index width for an enumeration with `enum_count` values (Spec 7.2).
pub fn bits_for(enum_count: usize) -> u8 {
    crate::integer::ceiling_log2(enum_count as u64)
}

/// Encodes an enumeration index (Spec 7.2).
///
/// # Panics
///
/// Panics if `index >= enum_count`.
pub fn encode(writer: &mut BitWriter, index: usize, enum_count: usize, alignment: Alignment) {
    assert!(index < enum_count, "enum index {index} out of range 0..{enum_count}");
    let n = bits_for(enum_count);
    if alignment.is_byte_oriented() {
        n_bit_unsigned_integer::encode_aligned(writer, index as u64, n);
    } else {
        n_bit_unsigned_integer::encode(writer, index as u64, n);
    }
}

/// Decodes an enumeration index (Spec 7.2).
pub fn decode(reader: &mut BitReader, enum_count: usize, alignment: Alignment) -> Result<usize> {
    let n = bits_for(enum_count);
    let index = if alignment.is_byte_oriented() {
        n_bit_unsigned_integer::decode_aligned(reader, n)?
    } else {
        n_bit_unsigned_integer::decode(reader, n)?
    } as usize;
    if index >= enum_count {
        return Err(Error::InvalidEnumerationIndex { index, enum_count });
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Spec 7.2: n = ⌈log₂(m)⌉.
    #[test]
    fn bitbreiten() {
        assert_eq!(bits_for(1), 0);
        assert_eq!(bits_for(2), 1);
        assert_eq!(bits_for(3), 2);
        assert_eq!(bits_for(4), 2);
        assert_eq!(bits_for(5), 3);
        assert_eq!(bits_for(256), 8);
    }

    #[test]
    fn round_trip() {
        for count in [2usize, 3, 7, 16] {
            for idx in 0..count {
                let mut w = BitWriter::new();
                encode(&mut w, idx, count, Alignment::BitPacked);
                let data = w.into_vec();
                let mut r = BitReader::new(&data);
                assert_eq!(decode(&mut r, count, Alignment::BitPacked).unwrap(), idx);
            }
        }
    }

    /// Einziger Enumerationswert: 0 Bits, Wert wird weggelassen.
    #[test]
    fn einzelwert_null_bits() {
        let mut w = BitWriter::new();
        encode(&mut w, 0, 1, Alignment::BitPacked);
        assert_eq!(w.bit_position(), 0);
        let mut r = BitReader::new(&[]);
        assert_eq!(decode(&mut r, 1, Alignment::BitPacked).unwrap(), 0);
    }

    /// Spec 7.2: Index außerhalb des Bereichs wird beim Decode abgelehnt.
    #[test]
    fn index_out_of_range() {
        let mut w = BitWriter::new();
        n_bit_unsigned_integer::encode(&mut w, 3, 2);
        let data = w.into_vec();
        let mut r = BitReader::new(&data);
        assert_eq!(
            decode(&mut r, 3, Alignment::BitPacked).unwrap_err(),
            Error::InvalidEnumerationIndex { index: 3, enum_count: 3 }
        );
    }

    #[test]
    fn byte_aligned_layout() {
        let mut w = BitWriter::new();
        encode(&mut w, 5, 200, Alignment::ByteAligned);
        assert_eq!(w.into_vec(), vec![5]);
    }
}
