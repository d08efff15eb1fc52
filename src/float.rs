//! Float encoding (Spec 7.1.4) and xsd:float/double lexical handling.
//!
//! The wire representation is two consecutive Integers (Spec 7.1.5): a
//! mantissa and a base-10 exponent. The mantissa range is -(2^63) to 2^63-1,
//! the exponent range -(2^14-1) to 2^14-1. The special exponent value
//! -(2^14) encodes infinity, negative infinity and NaN: mantissa 1 = INF,
//! mantissa -1 = -INF, any other mantissa = NaN.
//!
//! The canonical lexical form is `<mantissa>E<exponent>` with no trailing
//! zeros in the mantissa; `INF`, `-INF`, `NaN` pass through unchanged.

use crate::bitstream::{BitReader, BitWriter};
use crate::typed_value::trim_xml_ws;
use crate::{Error, Result, integer};

/// Normal exponent range: -(2^14-1) to 2^14-1.
const EXPONENT_MIN: i64 = -(1 << 14) + 1; // -16383
const EXPONENT_MAX: i64 = (1 << 14) - 1; // 16383

/// Special exponent value for INF, -INF, NaN.
const SPECIAL_EXPONENT: i64 = -(1 << 14); // -16384

/// A float value (Spec 7.1.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatValue {
    /// A finite value: m × 10^e.
    Value { mantissa: i64, exponent: i64 },
    /// Positive infinity (INF).
    Infinity,
    /// Negative infinity (-INF).
    NegativeInfinity,
    /// Not-a-Number (NaN).
    NaN,
}

impl FloatValue {
    /// Parses an xsd:float/double lexical form into mantissa/exponent form.
    ///
    /// `12.78e-2` becomes mantissa 1278, exponent -4; trailing mantissa
    /// zeros shift into the exponent (`-1E4` stays -1/4, `10E-1` becomes
    /// 1/0). The sentinel tokens `INF`, `-INF`, `NaN` map to their variants.
    pub fn parse(lexical: &str) -> Result<Self> {
        let s = trim_xml_ws(lexical);
        match s {
            "INF" => return Ok(Self::Infinity),
            "-INF" => return Ok(Self::NegativeInfinity),
            "NaN" => return Ok(Self::NaN),
            _ => {}
        }

        let (negative, rest) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };
        let (digits_part, exp_part) = match rest.split_once(['e', 'E']) {
            Some((d, e)) => (d, Some(e)),
            None => (rest, None),
        };
        let (int_digits, frac_digits) = match digits_part.split_once('.') {
            Some((i, f)) => (i, f),
            None => (digits_part, ""),
        };
        if int_digits.is_empty() && frac_digits.is_empty() {
            return Err(Error::value_format(lexical, "float"));
        }
        if !int_digits.bytes().all(|b| b.is_ascii_digit())
            || !frac_digits.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(Error::value_format(lexical, "float"));
        }
        let mut exponent: i64 = match exp_part {
            Some(e) => e.parse().map_err(|_| Error::value_format(lexical, "float"))?,
            None => 0,
        };
        exponent -= frac_digits.len() as i64;

        // Mantisse aus allen Digits; führende Nullen fallen beim Parsen weg.
        let all_digits = format!("{int_digits}{frac_digits}");
        let mut mantissa: i64 = all_digits
            .parse()
            .map_err(|_| Error::value_format(lexical, "float"))?;
        if negative {
            mantissa = -mantissa;
        }

        // Trailing-Zero-Normalisierung: 10E-1 → 1E0, 0E5 → 0E0.
        if mantissa == 0 {
            exponent = 0;
        } else {
            while mantissa % 10 == 0 {
                mantissa /= 10;
                exponent += 1;
            }
        }

        if !(EXPONENT_MIN..=EXPONENT_MAX).contains(&exponent) {
            return Err(Error::FloatOutOfRange);
        }
        Ok(Self::Value { mantissa, exponent })
    }

    /// Canonical lexical form (`<mantissa>E<exponent>`, sentinels unchanged).
    pub fn canonical_lexical(&self) -> String {
        match self {
            Self::Value { mantissa, exponent } => format!("{mantissa}E{exponent}"),
            Self::Infinity => "INF".to_string(),
            Self::NegativeInfinity => "-INF".to_string(),
            Self::NaN => "NaN".to_string(),
        }
    }
}

/// Encodes a float value (Spec 7.1.4).
///
/// # Panics
///
/// Panics if a `Value` has an exponent outside the accepted range.
pub fn encode(writer: &mut BitWriter, value: FloatValue) {
    match value {
        FloatValue::Value { mantissa, exponent } => {
            assert!(
                (EXPONENT_MIN..=EXPONENT_MAX).contains(&exponent),
                "exponent {exponent} out of range [{EXPONENT_MIN}, {EXPONENT_MAX}]"
            );
            integer::encode(writer, mantissa);
            integer::encode(writer, exponent);
        }
        FloatValue::Infinity => {
            integer::encode(writer, 1);
            integer::encode(writer, SPECIAL_EXPONENT);
        }
        FloatValue::NegativeInfinity => {
            integer::encode(writer, -1);
            integer::encode(writer, SPECIAL_EXPONENT);
        }
        FloatValue::NaN => {
            integer::encode(writer, 0);
            integer::encode(writer, SPECIAL_EXPONENT);
        }
    }
}

/// Decodes a float value (Spec 7.1.4).
///
/// Returns [`Error::FloatOutOfRange`] if the exponent exceeds the accepted
/// range.
pub fn decode(reader: &mut BitReader) -> Result<FloatValue> {
    let mantissa = integer::decode(reader)?;
    let exponent = integer::decode(reader)?;

    if exponent == SPECIAL_EXPONENT {
        return Ok(match mantissa {
            1 => FloatValue::Infinity,
            -1 => FloatValue::NegativeInfinity,
            _ => FloatValue::NaN,
        });
    }
    if !(EXPONENT_MIN..=EXPONENT_MAX).contains(&exponent) {
        return Err(Error::FloatOutOfRange);
    }
    Ok(FloatValue::Value { mantissa, exponent })
}
