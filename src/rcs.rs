//! Restricted character sets (Spec 7.1.10.1).
//!
//! When a string is known to draw from a small character repertoire — the
//! lexical space of a numeric or date built-in type — each character is
//! encoded as an n-bit index into the (code-point-sorted) set, with
//! `n = ⌈log₂(N+1)⌉`. The extra value N acts as an escape: it is followed
//! by the full code point as an Unsigned Integer, so deviating characters
//! survive (Spec 7.1.10.1 "characters not in the set").

use crate::bitstream::{BitReader, BitWriter};
use crate::schema::DatatypeSerial;
use crate::{Error, Result, n_bit_unsigned_integer, unsigned_integer};

/// A restricted character set: code-point-sorted characters plus the
/// derived index width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestrictedCharset {
    /// Sorted characters of the set.
    chars: &'static [char],
    /// Index width in bits: ⌈log₂(N+1)⌉.
    bits: u8,
}

impl RestrictedCharset {
    const fn new(chars: &'static [char]) -> Self {
        // ⌈log₂(N+1)⌉ — const-freundlich ohne ilog2
        let n = chars.len() as u64;
        let mut bits = 0u8;
        while (1u64 << bits) < n + 1 {
            bits += 1;
        }
        Self { chars, bits }
    }

    /// Number of characters in the set.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// True when the set is empty (never the case for the built-in sets).
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Index width in bits.
    pub fn bits(&self) -> u8 {
        self.bits
    }

    fn index_of(&self, ch: char) -> Option<u64> {
        self.chars.binary_search(&ch).ok().map(|i| i as u64)
    }

    /// Encodes one string through the set: length prefix, then per-char
    /// index or escape + code point (Spec 7.1.10.1).
    pub fn encode(&self, writer: &mut BitWriter, value: &str) {
        unsigned_integer::encode(writer, value.chars().count() as u64);
        let escape = self.chars.len() as u64;
        for ch in value.chars() {
            match self.index_of(ch) {
                Some(idx) => n_bit_unsigned_integer::encode(writer, idx, self.bits),
                None => {
                    n_bit_unsigned_integer::encode(writer, escape, self.bits);
                    unsigned_integer::encode(writer, ch as u64);
                }
            }
        }
    }

    /// Decodes one string through the set (Spec 7.1.10.1).
    pub fn decode(&self, reader: &mut BitReader) -> Result<String> {
        let len = unsigned_integer::decode(reader)?;
        let len = usize::try_from(len).map_err(|_| Error::ListLengthOverflow(len))?;
        let escape = self.chars.len() as u64;
        let mut out = String::with_capacity(len);
        for _ in 0..len {
            let idx = n_bit_unsigned_integer::decode(reader, self.bits)?;
            if idx < escape {
                out.push(self.chars[idx as usize]);
            } else {
                let cp = unsigned_integer::decode(reader)?;
                let ch = u32::try_from(cp)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or(Error::InvalidCodePoint(cp))?;
                out.push(ch);
            }
        }
        Ok(out)
    }
}

// Zeichensätze code-point-sortiert ('+' 43 < '-' 45 < '.' 46 < '0'..'9' < ':' 58).

/// xsd:boolean lexical space: false | 0 | true | 1.
static BOOLEAN_CHARS: &[char] = &['0', '1', 'a', 'e', 'f', 'l', 'r', 's', 't', 'u'];
/// xsd:integer family.
static INTEGER_CHARS: &[char] =
    &['+', '-', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];
/// xsd:decimal.
static DECIMAL_CHARS: &[char] =
    &['+', '-', '.', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];
/// xsd:float / xsd:double (inkl. Exponent und INF/NaN Buchstaben).
static FLOAT_CHARS: &[char] = &[
    '+', '-', '.', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'E', 'F', 'I', 'N', 'a',
    'e',
];
/// Date/time family: Ziffern, Separatoren, 'T', 'Z'.
static DATETIME_CHARS: &[char] = &[
    '+', '-', '.', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', ':', 'T', 'Z',
];

static BOOLEAN_SET: RestrictedCharset = RestrictedCharset::new(BOOLEAN_CHARS);
static INTEGER_SET: RestrictedCharset = RestrictedCharset::new(INTEGER_CHARS);
static DECIMAL_SET: RestrictedCharset = RestrictedCharset::new(DECIMAL_CHARS);
static FLOAT_SET: RestrictedCharset = RestrictedCharset::new(FLOAT_CHARS);
static DATETIME_SET: RestrictedCharset = RestrictedCharset::new(DATETIME_CHARS);

/// The built-in restricted charset for a datatype serial, if one exists
/// (Spec 7.2: lexical values encode through the datatype's charset).
pub fn for_serial(serial: DatatypeSerial) -> Option<&'static RestrictedCharset> {
    use DatatypeSerial as S;
    match serial {
        S::Boolean => Some(&BOOLEAN_SET),
        S::Integer | S::NonNegativeInteger | S::Long | S::Int => Some(&INTEGER_SET),
        S::Decimal => Some(&DECIMAL_SET),
        S::Float | S::Double => Some(&FLOAT_SET),
        S::DateTime
        | S::Date
        | S::Time
        | S::GYear
        | S::GYearMonth
        | S::GMonth
        | S::GMonthDay
        | S::GDay => Some(&DATETIME_SET),
        _ => None,
    }
}
