//! Boolean encoding (Spec 7.1.2).
//!
//! Two encoding variants (context-dependent):
//! 1. Default: 1-bit unsigned integer (0=false, 1=true); one octet when the
//!    alignment is byte-oriented.
//! 2. When pattern facets are present on the type: 2-bit unsigned integer
//!    preserving all four lexical forms (0="false", 1="0", 2="true", 3="1").

use crate::bitstream::{BitReader, BitWriter};
use crate::options::Alignment;
use crate::{Error, Result, n_bit_unsigned_integer};

/// The four lexical values of a boolean with pattern facets (Spec 7.1.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanValue {
    /// Lexical "false" (encoded as 0).
    False = 0,
    /// Lexical "0" (encoded as 1).
    Zero = 1,
    /// Lexical "true" (encoded as 2).
    True = 2,
    /// Lexical "1" (encoded as 3).
    One = 3,
}

impl BooleanValue {
    /// Parses one of the four xsd:boolean lexical forms.
    pub fn parse(lexical: &str) -> Result<Self> {
        match lexical {
            "false" => Ok(Self::False),
            "0" => Ok(Self::Zero),
            "true" => Ok(Self::True),
            "1" => Ok(Self::One),
            _ => Err(Error::value_format(lexical, "boolean")),
        }
    }

    /// The exact lexical form this value preserves.
    pub fn as_lexical(self) -> &'static str {
        match self {
            Self::False => "false",
            Self::Zero => "0",
            Self::True => "true",
            Self::One => "1",
        }
    }

    /// The truth value.
    pub fn as_bool(self) -> bool {
        matches!(self, Self::True | Self::One)
    }
}

/// Encodes a boolean as a 1-bit unsigned integer; one octet when the
/// alignment is byte-oriented (Spec 7.1.2).
pub fn encode(writer: &mut BitWriter, value: bool, alignment: Alignment) {
    if alignment.is_byte_oriented() {
        n_bit_unsigned_integer::encode_aligned(writer, value as u64, 1);
    } else {
        n_bit_unsigned_integer::encode(writer, value as u64, 1);
    }
}

/// Decodes a boolean (Spec 7.1.2).
pub fn decode(reader: &mut BitReader, alignment: Alignment) -> Result<bool> {
    let bit = if alignment.is_byte_oriented() {
        n_bit_unsigned_integer::decode_aligned(reader, 1)?
    } else {
        n_bit_unsigned_integer::decode(reader, 1)?
    };
    Ok(bit == 1)
}

/// Encodes a boolean with pattern facets as a 2-bit unsigned integer
/// (Spec 7.1.2).
pub fn encode_with_pattern(writer: &mut BitWriter, value: BooleanValue, alignment: Alignment) {
    if alignment.is_byte_oriented() {
        n_bit_unsigned_integer::encode_aligned(writer, value as u64, 2);
    } else {
        n_bit_unsigned_integer::encode(writer, value as u64, 2);
    }
}

/// Decodes a boolean with pattern facets (Spec 7.1.2).
pub fn decode_with_pattern(reader: &mut BitReader, alignment: Alignment) -> Result<BooleanValue> {
    let bits = if alignment.is_byte_oriented() {
        n_bit_unsigned_integer::decode_aligned(reader, 2)?
    } else {
        n_bit_unsigned_integer::decode(reader, 2)?
    };
    Ok(match bits {
        0 => BooleanValue::False,
        1 => BooleanValue::Zero,
        2 => BooleanValue::True,
        _ => BooleanValue::One,
    })
}

/// Parses an xsd:boolean lexical form to its truth value (Spec 7.1.2).
pub fn parse_lexical(lexical: &str) -> Result<bool> {
    BooleanValue::parse(lexical).map(BooleanValue::as_bool)
}
