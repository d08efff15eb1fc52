//! Variable-length 7-bit unsigned integer encoding (Spec 7.1.6).
//!
//! Each octet has a continuation bit (MSB) and 7 data bits. The least
//! significant group is written first. The last octet has continuation = 0.
//! The representation is unbounded; the `big` variants carry magnitudes
//! beyond `u64` through `num_bigint::BigUint`.

use num_bigint::BigUint;

use crate::bitstream::{BitReader, BitWriter};
use crate::{Error, Result};

/// Encodes a `u64` as a variable-length unsigned integer (Spec 7.1.6).
#[inline]
pub fn encode(writer: &mut BitWriter, value: u64) {
    if value < 128 {
        // Fast-Path: Single-Byte (häufigster Fall — Codepoints, kleine Längen)
        writer.write_byte_aligned(value as u8);
        return;
    }
    let mut v = value;
    loop {
        let low7 = (v & 0x7F) as u8;
        v >>= 7;
        if v == 0 {
            writer.write_byte_aligned(low7);
            break;
        }
        writer.write_byte_aligned(0x80 | low7);
    }
}

/// Decodes a variable-length unsigned integer from the stream (Spec 7.1.6).
///
/// Returns [`Error::IntegerOverflow`] when the value does not fit in `u64`;
/// use [`decode_big`] where unbounded magnitudes are legal.
#[inline]
pub fn decode(reader: &mut BitReader) -> Result<u64> {
    let byte = reader.read_byte_aligned()?;
    if byte & 0x80 == 0 {
        return Ok(u64::from(byte));
    }
    let mut result = u64::from(byte & 0x7F);
    let mut shift: u32 = 7;
    loop {
        let byte = reader.read_byte_aligned()?;
        let data = u64::from(byte & 0x7F);
        // Spec 7.1.6: beim 10. Byte (shift 63) ist nur Daten-Bit 0 gültig
        // und kein weiteres Continuation-Byte erlaubt.
        if shift == 63 && (data > 1 || byte & 0x80 != 0) {
            return Err(Error::IntegerOverflow);
        }
        result |= data << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
    }
}

/// Encodes an arbitrary-precision unsigned integer (Spec 7.1.6).
pub fn encode_big(writer: &mut BitWriter, value: &BigUint) {
    // to_radix_le(128) liefert genau die 7-Bit-Gruppen, LSB-Gruppe zuerst.
    let groups = value.to_radix_le(128);
    let last = groups.len() - 1;
    for (i, &g) in groups.iter().enumerate() {
        if i == last {
            writer.write_byte_aligned(g);
        } else {
            writer.write_byte_aligned(0x80 | g);
        }
    }
}

/// Maximale Anzahl Octets für [`decode_big`] (10^400 ≈ 190 Gruppen; großzügig
/// darüber, schützt gegen endlose Continuation-Bytes aus korrupten Streams).
const MAX_BIG_OCTETS: usize = 4096;

/// Decodes an arbitrary-precision unsigned integer (Spec 7.1.6).
pub fn decode_big(reader: &mut BitReader) -> Result<BigUint> {
    let mut groups: Vec<u8> = Vec::new();
    loop {
        let byte = reader.read_byte_aligned()?;
        groups.push(byte & 0x7F);
        if byte & 0x80 == 0 {
            break;
        }
        if groups.len() >= MAX_BIG_OCTETS {
            return Err(Error::IntegerOverflow);
        }
    }
    Ok(BigUint::from_radix_le(&groups, 128).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(value: u64) -> u64 {
        let mut w = BitWriter::new();
        encode(&mut w, value);
        let data = w.into_vec();
        let mut r = BitReader::new(&data);
        decode(&mut r).unwrap()
    }

    // Spec 7.1.6: smallest value, single byte
    #[test]
    fn encode_decode_0() {
        assert_eq!(round_trip(0), 0);
    }

    // Spec 7.1.6: max single-byte value (7 data bits)
    #[test]
    fn encode_decode_127() {
        assert_eq!(round_trip(127), 127);
        let mut w = BitWriter::new();
        encode(&mut w, 127);
        assert_eq!(w.into_vec(), vec![0x7F]);
    }

    // Spec 7.1.6: first two-byte value
    #[test]
    fn encode_decode_128() {
        assert_eq!(round_trip(128), 128);
        let mut w = BitWriter::new();
        encode(&mut w, 128);
        assert_eq!(w.into_vec(), vec![0x80, 0x01]);
    }

    #[test]
    fn encode_decode_diverse() {
        for &v in &[1, 300, 16383, 16384, u32::MAX as u64, u64::MAX] {
            assert_eq!(round_trip(v), v, "failed for {v}");
        }
    }

    /// Spec 7.1.6: Decode bricht bei u64-Überlauf ab.
    #[test]
    fn decode_overflow() {
        // 11 Continuation-Bytes mit gesetzten Daten-Bits
        let data = [0xFF; 11];
        let mut r = BitReader::new(&data);
        assert_eq!(decode(&mut r).unwrap_err(), Error::IntegerOverflow);
    }

    #[test]
    fn decode_eof() {
        let mut r = BitReader::new(&[0x80]);
        assert_eq!(decode(&mut r).unwrap_err(), Error::PrematureEndOfStream);
    }

    /// Spec 7.1.6: Big-Path ist mit dem u64-Pfad wire-kompatibel.
    #[test]
    fn big_und_u64_wire_kompatibel() {
        let mut w = BitWriter::new();
        encode_big(&mut w, &BigUint::from(16384u32));
        let data = w.into_vec();
        let mut r = BitReader::new(&data);
        assert_eq!(decode(&mut r).unwrap(), 16384);
    }

    #[test]
    fn big_round_trip_ueber_u64() {
        let big: BigUint = "184467440737095516160000000001".parse().unwrap();
        let mut w = BitWriter::new();
        encode_big(&mut w, &big);
        let data = w.into_vec();
        let mut r = BitReader::new(&data);
        assert_eq!(decode_big(&mut r).unwrap(), big);
    }

    #[test]
    fn big_null() {
        let mut w = BitWriter::new();
        encode_big(&mut w, &BigUint::from(0u32));
        let data = w.into_vec();
        assert_eq!(data, vec![0x00]);
        let mut r = BitReader::new(&data);
        assert_eq!(decode_big(&mut r).unwrap(), BigUint::from(0u32));
    }
}
