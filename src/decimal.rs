//! Decimal encoding (Spec 7.1.3) and xsd:decimal lexical handling.
//!
//! The wire representation is a Boolean sign (Spec 7.1.2) followed by two
//! Unsigned Integers (Spec 7.1.6): the integral portion and the fractional
//! portion with its digits in reverse order (preserving leading zeros of the
//! fraction). Minus zero is representable on the wire (sign=1, both parts 0)
//! but renders canonically as "0" — the sign flag survives, the canonical
//! integral part does not carry it (parity with float's 0E0 handling).

use num_bigint::BigUint;

use crate::bitstream::{BitReader, BitWriter};
use crate::options::Alignment;
use crate::typed_value::trim_xml_ws;
use crate::{Error, Result, boolean, unsigned_integer};

/// A decimal value as sign plus digit strings (Spec 7.1.3).
///
/// `integral` has no leading zeros ("0" for zero); `fraction` has no
/// trailing zeros and may be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecimalValue {
    /// True if the value is negative (including minus zero).
    pub negative: bool,
    /// Integral digits, canonical (no sign, no leading zeros).
    pub integral: String,
    /// Fraction digits, canonical (no trailing zeros, possibly empty).
    pub fraction: String,
}

impl DecimalValue {
    /// Parses an xsd:decimal lexical form (whitespace-collapsed, optional
    /// sign, digits with at most one decimal point).
    pub fn parse(lexical: &str) -> Result<Self> {
        let s = trim_xml_ws(lexical);
        let (negative, rest) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };
        let (int_part, frac_part) = match rest.split_once('.') {
            Some((i, f)) => (i, f),
            None => (rest, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(Error::value_format(lexical, "decimal"));
        }
        if !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(Error::value_format(lexical, "decimal"));
        }
        let integral = int_part.trim_start_matches('0');
        let fraction = frac_part.trim_end_matches('0');
        Ok(Self {
            negative,
            integral: if integral.is_empty() { "0".to_string() } else { integral.to_string() },
            fraction: fraction.to_string(),
        })
    }

    /// Canonical lexical form: "-0" renders as "0"; the sign appears only
    /// with a non-zero magnitude.
    pub fn canonical_lexical(&self) -> String {
        let zero = self.integral == "0" && self.fraction.is_empty();
        let sign = if self.negative && !zero { "-" } else { "" };
        if self.fraction.is_empty() {
            format!("{sign}{}", self.integral)
        } else {
            format!("{sign}{}.{}", self.integral, self.fraction)
        }
    }
}

/// Parst einen Digit-String als BigUint (leerer String = 0).
fn digits_to_uint(digits: &str) -> BigUint {
    if digits.is_empty() {
        return BigUint::from(0u32);
    }
    // Nur ASCII-Ziffern möglich (von DecimalValue::parse validiert)
    digits.parse().unwrap_or_default()
}

/// Encodes a decimal value (Spec 7.1.3): sign, integral, reversed fraction.
pub fn encode(writer: &mut BitWriter, value: &DecimalValue, alignment: Alignment) {
    boolean::encode(writer, value.negative, alignment);
    unsigned_integer::encode_big(writer, &digits_to_uint(&value.integral));
    let reversed: String = value.fraction.chars().rev().collect();
    unsigned_integer::encode_big(writer, &digits_to_uint(&reversed));
}

/// Decodes a decimal value (Spec 7.1.3).
pub fn decode(reader: &mut BitReader, alignment: Alignment) -> Result<DecimalValue> {
    let negative = boolean::decode(reader, alignment)?;
    let integral = unsigned_integer::decode_big(reader)?.to_string();
    let reversed = unsigned_integer::decode_big(reader)?;
    let fraction: String = if reversed == BigUint::from(0u32) {
        String::new()
    } else {
        reversed.to_string().chars().rev().collect()
    };
    Ok(DecimalValue { negative, integral, fraction })
}
