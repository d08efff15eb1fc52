//! Signed integer encoding (Spec 7.1.5) and xsd:integer lexical handling.
//!
//! Three wire variants depending on schema-derived bounds:
//! 1. Bounded (range ≤ 4096): n-bit unsigned offset from the minimum
//! 2. Non-negative (min ≥ 0): `unsigned_integer` directly (no wrapper here)
//! 3. Unbounded signed: 1-bit sign + unsigned integer magnitude
//!
//! Magnitudes beyond 64 bits take the arbitrary-precision path
//! ([`IntegerValue::Big`]); the wire format is identical, only the decoder's
//! materialisation differs.

use num_bigint::{BigInt, BigUint, Sign};

use crate::bitstream::{BitReader, BitWriter};
use crate::typed_value::trim_xml_ws;
use crate::{Error, Result, n_bit_unsigned_integer, unsigned_integer};

/// An xsd:integer value: i64 fast path, arbitrary precision beyond.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegerValue {
    /// Values representable in a signed 64-bit integer.
    I64(i64),
    /// Values exceeding the i64 range, full digit-string precision.
    Big(BigInt),
}

impl IntegerValue {
    /// Parses an xsd:integer lexical form (whitespace-collapsed, optional
    /// sign, decimal digits).
    pub fn parse(lexical: &str) -> Result<Self> {
        let s = trim_xml_ws(lexical);
        let unsigned = s.strip_prefix(['+', '-']).unwrap_or(s);
        if unsigned.is_empty() || !unsigned.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::value_format(lexical, "integer"));
        }
        if let Ok(v) = s.parse::<i64>() {
            return Ok(Self::I64(v));
        }
        // > 64 Bit: voller Digit-String über BigInt
        let big = s
            .parse::<BigInt>()
            .map_err(|_| Error::value_format(lexical, "integer"))?;
        Ok(Self::Big(big))
    }

    /// Canonical lexical form: no leading '+', no leading zeros, "-0" → "0".
    pub fn canonical_lexical(&self) -> String {
        match self {
            Self::I64(v) => v.to_string(),
            Self::Big(v) => v.to_string(),
        }
    }

    /// The value as i64 when it fits.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::I64(v) => Some(*v),
            Self::Big(_) => None,
        }
    }

    /// True for values < 0.
    pub fn is_negative(&self) -> bool {
        match self {
            Self::I64(v) => *v < 0,
            Self::Big(v) => v.sign() == Sign::Minus,
        }
    }

    /// Magnitude for the sign+magnitude wire form: `value` for non-negative,
    /// `-value - 1` for negative (Spec 7.1.5).
    fn wire_magnitude(&self) -> BigUint {
        match self {
            Self::I64(v) => {
                if *v >= 0 {
                    BigUint::from(*v as u64)
                } else {
                    // (-v - 1) über Bit-Negation, vermeidet Overflow bei i64::MIN
                    BigUint::from(!(*v as u64))
                }
            }
            Self::Big(v) => {
                if v.sign() == Sign::Minus {
                    (-v - 1i32).magnitude().clone()
                } else {
                    v.magnitude().clone()
                }
            }
        }
    }
}

/// Encodes a signed integer (Spec 7.1.5, unbounded signed case).
///
/// Sign bit (0 = non-negative, 1 = negative) followed by the magnitude as an
/// unsigned integer. For negative values the magnitude is `(-value - 1)`.
pub fn encode(writer: &mut BitWriter, value: i64) {
    if value >= 0 {
        writer.write_bit(false);
        unsigned_integer::encode(writer, value as u64);
    } else {
        writer.write_bit(true);
        unsigned_integer::encode(writer, !(value as u64));
    }
}

/// Decodes a signed integer (Spec 7.1.5, unbounded signed case).
pub fn decode(reader: &mut BitReader) -> Result<i64> {
    let sign = reader.read_bit()?;
    let magnitude = unsigned_integer::decode(reader)?;
    if magnitude > i64::MAX as u64 {
        return Err(Error::IntegerOverflow);
    }
    if sign {
        Ok(-(magnitude as i64) - 1)
    } else {
        Ok(magnitude as i64)
    }
}

/// Encodes an [`IntegerValue`], taking the big path only when needed
/// (Spec 7.1.5). Wire-compatible with [`encode`].
pub fn encode_value(writer: &mut BitWriter, value: &IntegerValue) {
    match value {
        IntegerValue::I64(v) => encode(writer, *v),
        IntegerValue::Big(_) => {
            writer.write_bit(value.is_negative());
            unsigned_integer::encode_big(writer, &value.wire_magnitude());
        }
    }
}

/// Decodes an [`IntegerValue`]; magnitudes beyond i64 materialise as
/// [`IntegerValue::Big`] (Spec 7.1.5).
pub fn decode_value(reader: &mut BitReader) -> Result<IntegerValue> {
    let sign = reader.read_bit()?;
    let magnitude = unsigned_integer::decode_big(reader)?;
    if let Ok(mag) = u64::try_from(&magnitude) {
        if !sign && mag <= i64::MAX as u64 {
            return Ok(IntegerValue::I64(mag as i64));
        }
        if sign && mag <= i64::MAX as u64 {
            return Ok(IntegerValue::I64(-(mag as i64) - 1));
        }
    }
    let big = BigInt::from_biguint(Sign::Plus, magnitude);
    Ok(IntegerValue::Big(if sign { -big - 1i32 } else { big }))
}

/// Encodes a bounded integer (Spec 7.1.5, bounded case): an n-bit unsigned
/// offset from `min`, where `n = ⌈log₂(max - min + 1)⌉`.
///
/// # Panics
///
/// Panics if `max < min`, if `value` is not in `[min, max]`, or if
/// `max - min + 1 > 4096`.
pub fn encode_bounded(writer: &mut BitWriter, value: i64, min: i64, max: i64, aligned: bool) {
    let range = bounded_range(min, max);
    assert!(value >= min && value <= max, "value {value} not in [{min}, {max}]");
    let n = ceiling_log2(range);
    if aligned {
        n_bit_unsigned_integer::encode_aligned(writer, (value - min) as u64, n);
    } else {
        n_bit_unsigned_integer::encode(writer, (value - min) as u64, n);
    }
}

/// Decodes a bounded integer (Spec 7.1.5, bounded case).
///
/// # Panics
///
/// Panics if `max < min` or if `max - min + 1 > 4096`.
pub fn decode_bounded(reader: &mut BitReader, min: i64, max: i64, aligned: bool) -> Result<i64> {
    let range = bounded_range(min, max);
    let n = ceiling_log2(range);
    let offset = if aligned {
        n_bit_unsigned_integer::decode_aligned(reader, n)?
    } else {
        n_bit_unsigned_integer::decode(reader, n)?
    };
    if offset >= range {
        return Err(Error::IntegerOverflow);
    }
    Ok(min + offset as i64)
}

/// Computes `max - min + 1` as u64, panicking if the range exceeds 4096.
pub(crate) fn bounded_range(min: i64, max: i64) -> u64 {
    assert!(max >= min, "max ({max}) < min ({min})");
    let range = max as i128 - min as i128 + 1;
    assert!(range <= 4096, "range {range} exceeds 4096");
    range as u64
}

/// Ceiling log₂: number of bits needed to represent values 0..range-1.
pub(crate) fn ceiling_log2(range: u64) -> u8 {
    if range <= 1 {
        0
    } else {
        (range - 1).ilog2() as u8 + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_round_trip(value: i64) -> i64 {
        let mut w = BitWriter::new();
        encode(&mut w, value);
        let data = w.into_vec();
        let mut r = BitReader::new(&data);
        decode(&mut r).unwrap()
    }

    fn value_round_trip(value: &IntegerValue) -> IntegerValue {
        let mut w = BitWriter::new();
        encode_value(&mut w, value);
        let data = w.into_vec();
        let mut r = BitReader::new(&data);
        decode_value(&mut r).unwrap()
    }

    /// Spec 7.1.5: sign=1, magnitude=0 ist -1.
    #[test]
    fn signed_minus_one_layout() {
        assert_eq!(signed_round_trip(-1), -1);
        let mut w = BitWriter::new();
        encode(&mut w, -1);
        // sign bit 1, dann unsigned_integer(0): 1_0000000 0... = 0x80 0x00
        assert_eq!(w.into_vec(), vec![0x80, 0x00]);
    }

    #[test]
    fn signed_round_trip_diverse() {
        for &val in &[0, 1, -1, 127, -128, i64::MAX, i64::MIN] {
            assert_eq!(signed_round_trip(val), val, "failed for {val}");
        }
    }

    // --- Lexical parsing ---

    /// Whitespace-Collapse vor dem Parsen (XML Schema whiteSpace=collapse).
    #[test]
    fn parse_mit_whitespace() {
        let v = IntegerValue::parse(" \t\r 42\n").unwrap();
        assert_eq!(v, IntegerValue::I64(42));
        assert_eq!(v.canonical_lexical(), "42");
    }

    #[test]
    fn parse_vorzeichen_normalisierung() {
        assert_eq!(IntegerValue::parse("+17").unwrap().canonical_lexical(), "17");
        assert_eq!(IntegerValue::parse("-0").unwrap().canonical_lexical(), "0");
        assert_eq!(IntegerValue::parse("007").unwrap().canonical_lexical(), "7");
    }

    #[test]
    fn parse_ungueltig() {
        for bad in ["", "  ", "1.5", "abc", "1 2", "--3", "+"] {
            assert!(IntegerValue::parse(bad).is_err(), "accepted {bad:?}");
        }
    }

    /// > 64 Bit: voller Digit-String bleibt erhalten.
    #[test]
    fn parse_ueber_i64() {
        let lex = "92233720368547758079223372036854775807";
        let v = IntegerValue::parse(lex).unwrap();
        assert!(matches!(v, IntegerValue::Big(_)));
        assert_eq!(v.canonical_lexical(), lex);
        assert_eq!(value_round_trip(&v), v);
    }

    #[test]
    fn parse_negativ_ueber_i64() {
        let lex = "-18446744073709551617";
        let v = IntegerValue::parse(lex).unwrap();
        assert_eq!(v.canonical_lexical(), lex);
        assert_eq!(value_round_trip(&v), v);
    }

    /// Der Big-Pfad ist wire-kompatibel mit dem i64-Pfad.
    #[test]
    fn value_wire_kompatibel_mit_i64() {
        for &val in &[0i64, -1, 4711, i64::MIN, i64::MAX] {
            let mut w = BitWriter::new();
            encode_value(&mut w, &IntegerValue::I64(val));
            let data = w.into_vec();
            let mut r = BitReader::new(&data);
            assert_eq!(decode(&mut r).unwrap(), val, "failed for {val}");
        }
    }

    #[test]
    fn value_round_trip_grenzen() {
        for v in [
            IntegerValue::I64(i64::MIN),
            IntegerValue::I64(i64::MAX),
            IntegerValue::parse("9223372036854775808").unwrap(), // i64::MAX + 1
            IntegerValue::parse("-9223372036854775809").unwrap(), // i64::MIN - 1
        ] {
            assert_eq!(value_round_trip(&v), v, "failed for {v:?}");
        }
    }

    // --- Bounded ---

    /// Spec 7.1.5: Range -5..5 → 11 Werte → 4 Bits.
    #[test]
    fn bounded_round_trip() {
        assert_eq!(ceiling_log2(11), 4);
        for val in -5..=5 {
            let mut w = BitWriter::new();
            encode_bounded(&mut w, val, -5, 5, false);
            let data = w.into_vec();
            let mut r = BitReader::new(&data);
            assert_eq!(decode_bounded(&mut r, -5, 5, false).unwrap(), val);
        }
    }

    /// Spec 7.1.5: Range 1 → 0 Bits, Wert wird weggelassen.
    #[test]
    fn bounded_single_value() {
        let mut w = BitWriter::new();
        encode_bounded(&mut w, 42, 42, 42, false);
        assert_eq!(w.bit_position(), 0);
        let data = w.into_vec();
        let mut r = BitReader::new(&data);
        assert_eq!(decode_bounded(&mut r, 42, 42, false).unwrap(), 42);
    }

    #[test]
    #[should_panic(expected = "exceeds 4096")]
    fn bounded_range_too_large() {
        let mut w = BitWriter::new();
        encode_bounded(&mut w, 0, 0, 4096, false);
    }

    /// Spec 7.1.5: korrupter Offset >= range wird abgelehnt.
    #[test]
    fn bounded_decode_offset_out_of_range() {
        let mut w = BitWriter::new();
        n_bit_unsigned_integer::encode(&mut w, 3, 2);
        let data = w.into_vec();
        let mut r = BitReader::new(&data);
        assert_eq!(
            decode_bounded(&mut r, 0, 2, false).unwrap_err(),
            Error::IntegerOverflow
        );
    }

    #[test]
    fn bounded_aligned_belegt_bytes() {
        let mut w = BitWriter::new();
        encode_bounded(&mut w, 200, 0, 255, true);
        assert_eq!(w.into_vec(), vec![200]);
    }
}
