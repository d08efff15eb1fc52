//! Typed value encoding/decoding (Spec 7, Table 7-1).
//!
//! Schema-informed streams encode AT/CH values with the codec of their
//! governing simple type instead of as strings. [`parse_typed`] turns a
//! lexical form into a [`TypedValue`] (whitespace-collapsed, canonicalised),
//! [`encode_typed`]/[`decode_typed`] move it across the wire, and
//! [`TypedValue::canonical_lexical`] renders the deterministic canonical
//! form on the way out.
//!
//! Lexical preservation (Spec 7.2) bypasses this module's parsing: the
//! verbatim source string travels through the datatype's restricted
//! character set instead (see the encoder/decoder value paths).

use std::borrow::Cow;

use crate::bitstream::{BitReader, BitWriter};
use crate::boolean::{self, BooleanValue};
use crate::datetime::{self, DateTimeKind, DateTimeValue};
use crate::decimal::{self, DecimalValue};
use crate::float::{self, FloatValue};
use crate::integer::{self, IntegerValue};
use crate::options::Alignment;
use crate::qname::QName;
use crate::schema::{DatatypeSerial, SchemaCorpus, SimpleType, TypeDef, TypeId, Variety};
use crate::{Error, Result, binary, enumeration, list, string, unsigned_integer};

/// Strips leading/trailing XML whitespace (space, tab, CR, LF) per the
/// XML Schema whiteSpace=collapse facet.
pub(crate) fn trim_xml_ws(s: &str) -> &str {
    s.trim_matches(|c| matches!(c, ' ' | '\t' | '\n' | '\r'))
}

/// XML 1.0 end-of-line normalisation: `\r\n` and bare `\r` become `\n`.
pub(crate) fn normalize_eol(s: &str) -> Cow<'_, str> {
    if !s.contains('\r') {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\r' {
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            out.push('\n');
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

/// A typed value: the decoded form of an AT/CH payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedValue {
    /// String-family and untyped values.
    String(String),
    Boolean(bool),
    /// Boolean under pattern facets: the exact lexical form survives
    /// (Spec 7.1.2, 2-bit variant).
    BooleanLexical(BooleanValue),
    Integer(IntegerValue),
    Decimal(DecimalValue),
    Float(FloatValue),
    /// Binary octets; `hex` selects the lexical mapping.
    Binary { data: Vec<u8>, hex: bool },
    DateTime(DateTimeValue),
    /// QName payloads (xsi:type, Spec 7.1.7).
    QName(QName),
    /// One value per list item (Spec 7.1.11).
    List(Vec<TypedValue>),
    /// Enumerated types carry the index; the lexical form is the schema's
    /// enumeration value (Spec 7.2).
    Enumerated { index: usize, lexical: String },
}

impl TypedValue {
    /// Deterministic canonical serialisation (independent of the original
    /// lexical form).
    pub fn canonical_lexical(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Boolean(b) => if *b { "true" } else { "false" }.to_string(),
            Self::BooleanLexical(v) => v.as_lexical().to_string(),
            Self::Integer(v) => v.canonical_lexical(),
            Self::Decimal(v) => v.canonical_lexical(),
            Self::Float(v) => v.canonical_lexical(),
            Self::Binary { data, hex } => {
                if *hex {
                    binary::to_hex(data)
                } else {
                    binary::to_base64(data)
                }
            }
            Self::DateTime(v) => v.canonical_lexical(),
            Self::QName(q) => q.to_string(),
            Self::List(items) => {
                list::join_items(items.iter().map(TypedValue::canonical_lexical))
            }
            Self::Enumerated { lexical, .. } => lexical.clone(),
        }
    }
}

/// Date-time kind for a serial, if the serial is in the date-time family.
fn datetime_kind(serial: DatatypeSerial) -> Option<DateTimeKind> {
    use DatatypeSerial as S;
    Some(match serial {
        S::DateTime => DateTimeKind::DateTime,
        S::Date => DateTimeKind::Date,
        S::Time => DateTimeKind::Time,
        S::GYear => DateTimeKind::GYear,
        S::GYearMonth => DateTimeKind::GYearMonth,
        S::GMonth => DateTimeKind::GMonth,
        S::GMonthDay => DateTimeKind::GMonthDay,
        S::GDay => DateTimeKind::GDay,
        _ => return None,
    })
}

fn resolve_simple<'a>(corpus: &'a SchemaCorpus, type_id: TypeId) -> Option<&'a SimpleType> {
    match corpus.type_def(corpus.content_simple_type(type_id)?) {
        TypeDef::Simple(s) => Some(s),
        TypeDef::Complex(_) => None,
    }
}

/// Parses a lexical form against the datatype of `type_id` (Spec 7.1).
///
/// Complex types with simple content resolve to their content type; types
/// without character semantics fall back to the string representation.
pub fn parse_typed(lexical: &str, type_id: TypeId, corpus: &SchemaCorpus) -> Result<TypedValue> {
    let Some(simple) = resolve_simple(corpus, type_id) else {
        return Ok(TypedValue::String(lexical.to_string()));
    };
    parse_simple(lexical, simple, corpus)
}

fn parse_simple(lexical: &str, simple: &SimpleType, corpus: &SchemaCorpus) -> Result<TypedValue> {
    // Enumeration facet: Wert muss einer der Enumerationswerte sein (Spec 7.2)
    if !simple.enumeration.is_empty() {
        let collapsed = trim_xml_ws(lexical);
        let index = simple
            .enumeration
            .iter()
            .position(|v| v == collapsed)
            .ok_or_else(|| Error::value_format(lexical, "enumeration"))?;
        return Ok(TypedValue::Enumerated {
            index,
            lexical: simple.enumeration[index].clone(),
        });
    }

    match &simple.variety {
        Variety::List { item } => {
            let item_simple = match corpus.type_def(*item) {
                TypeDef::Simple(s) => s,
                TypeDef::Complex(_) => {
                    return Err(Error::value_format(lexical, "list"));
                }
            };
            let items = list::split_items(lexical)
                .map(|part| parse_simple(part, item_simple, corpus))
                .collect::<Result<Vec<_>>>()?;
            Ok(TypedValue::List(items))
        }
        // Union-Werte laufen über die String-Repräsentation (Spec 7.1.10)
        Variety::Union { .. } => Ok(TypedValue::String(lexical.to_string())),
        Variety::Atomic => parse_atomic(lexical, simple),
    }
}

fn parse_atomic(lexical: &str, simple: &SimpleType) -> Result<TypedValue> {
    use DatatypeSerial as S;
    match simple.serial {
        S::Boolean => {
            if simple.has_pattern_facets {
                Ok(TypedValue::BooleanLexical(BooleanValue::parse(trim_xml_ws(lexical))?))
            } else {
                Ok(TypedValue::Boolean(boolean::parse_lexical(trim_xml_ws(lexical))?))
            }
        }
        S::Decimal => Ok(TypedValue::Decimal(DecimalValue::parse(lexical)?)),
        S::Float | S::Double => Ok(TypedValue::Float(FloatValue::parse(lexical)?)),
        S::Integer | S::Long | S::Int => {
            let value = IntegerValue::parse(lexical)?;
            if let (Some((min, max)), Some(v)) = (simple.bounds, value.as_i64()) {
                if v < min || v > max {
                    return Err(Error::value_format(lexical, "integer"));
                }
            }
            Ok(TypedValue::Integer(value))
        }
        S::NonNegativeInteger => {
            let value = IntegerValue::parse(lexical)?;
            if value.is_negative() {
                return Err(Error::value_format(lexical, "nonNegativeInteger"));
            }
            Ok(TypedValue::Integer(value))
        }
        S::Base64Binary => Ok(TypedValue::Binary {
            data: binary::parse_base64(lexical)?,
            hex: false,
        }),
        S::HexBinary => Ok(TypedValue::Binary { data: binary::parse_hex(lexical)?, hex: true }),
        _ => {
            if let Some(kind) = datetime_kind(simple.serial) {
                return Ok(TypedValue::DateTime(DateTimeValue::parse(lexical, kind)?));
            }
            // String-Familie: Wert bleibt unangetastet
            Ok(TypedValue::String(lexical.to_string()))
        }
    }
}

/// Encodes a typed value with the codec of `type_id` (Spec 7.1).
///
/// The value must have been produced by [`parse_typed`] against the same
/// type (the dispatch relies on the variant matching the serial).
pub fn encode_typed(
    writer: &mut BitWriter,
    value: &TypedValue,
    type_id: TypeId,
    corpus: &SchemaCorpus,
    alignment: Alignment,
) -> Result<()> {
    let simple = resolve_simple(corpus, type_id);
    match value {
        TypedValue::Enumerated { index, .. } => {
            let count = simple.map(|s| s.enumeration.len()).unwrap_or(0);
            if *index >= count {
                return Err(Error::InvalidEnumerationIndex { index: *index, enum_count: count });
            }
            enumeration::encode(writer, *index, count, alignment);
        }
        TypedValue::List(items) => {
            let item_type = match simple.map(|s| &s.variety) {
                Some(Variety::List { item }) => *item,
                _ => return Err(Error::value_format(value.canonical_lexical(), "list")),
            };
            unsigned_integer::encode(writer, items.len() as u64);
            for item in items {
                encode_typed(writer, item, item_type, corpus, alignment)?;
            }
        }
        TypedValue::String(s) => string::encode(writer, s),
        TypedValue::Boolean(b) => boolean::encode(writer, *b, alignment),
        TypedValue::BooleanLexical(v) => boolean::encode_with_pattern(writer, *v, alignment),
        TypedValue::Integer(v) => {
            let bounds = simple.and_then(|s| s.bounds);
            let serial = simple.map(|s| s.serial).unwrap_or(DatatypeSerial::Integer);
            encode_integer(writer, v, bounds, serial, alignment);
        }
        TypedValue::Decimal(v) => decimal::encode(writer, v, alignment),
        TypedValue::Float(v) => float::encode(writer, *v),
        TypedValue::Binary { data, .. } => binary::encode(writer, data),
        TypedValue::DateTime(v) => datetime::encode(writer, v),
        TypedValue::QName(q) => {
            string::encode(writer, &q.uri);
            string::encode(writer, &q.local_name);
        }
    }
    Ok(())
}

fn encode_integer(
    writer: &mut BitWriter,
    value: &IntegerValue,
    bounds: Option<(i64, i64)>,
    serial: DatatypeSerial,
    alignment: Alignment,
) {
    if let (Some((min, max)), Some(v)) = (bounds, value.as_i64()) {
        integer::encode_bounded(writer, v, min, max, alignment.is_byte_oriented());
        return;
    }
    if serial == DatatypeSerial::NonNegativeInteger {
        // Spec 7.1.6: nicht-negative Typen ohne Sign-Bit
        match value {
            IntegerValue::I64(v) => unsigned_integer::encode(writer, *v as u64),
            IntegerValue::Big(v) => {
                unsigned_integer::encode_big(writer, v.magnitude());
            }
        }
        return;
    }
    integer::encode_value(writer, value);
}

/// Decodes a typed value with the codec of `type_id` (Spec 7.1).
pub fn decode_typed(
    reader: &mut BitReader,
    type_id: TypeId,
    corpus: &SchemaCorpus,
    alignment: Alignment,
) -> Result<TypedValue> {
    let Some(simple) = resolve_simple(corpus, type_id) else {
        return Ok(TypedValue::String(string::decode(reader)?));
    };
    decode_simple(reader, simple, corpus, alignment)
}

fn decode_simple(
    reader: &mut BitReader,
    simple: &SimpleType,
    corpus: &SchemaCorpus,
    alignment: Alignment,
) -> Result<TypedValue> {
    use DatatypeSerial as S;

    if !simple.enumeration.is_empty() {
        let index = enumeration::decode(reader, simple.enumeration.len(), alignment)?;
        return Ok(TypedValue::Enumerated {
            index,
            lexical: simple.enumeration[index].clone(),
        });
    }

    match &simple.variety {
        Variety::List { item } => {
            let item_simple = match corpus.type_def(*item) {
                TypeDef::Simple(s) => s,
                TypeDef::Complex(_) => return Err(Error::PrematureEndOfStream),
            };
            let len = unsigned_integer::decode(reader)?;
            if len > list::MAX_LIST_LENGTH {
                return Err(Error::ListLengthOverflow(len));
            }
            let mut items = Vec::with_capacity(len as usize);
            for _ in 0..len {
                items.push(decode_simple(reader, item_simple, corpus, alignment)?);
            }
            Ok(TypedValue::List(items))
        }
        Variety::Union { .. } => Ok(TypedValue::String(string::decode(reader)?)),
        Variety::Atomic => match simple.serial {
            S::Boolean => {
                if simple.has_pattern_facets {
                    Ok(TypedValue::BooleanLexical(boolean::decode_with_pattern(
                        reader, alignment,
                    )?))
                } else {
                    Ok(TypedValue::Boolean(boolean::decode(reader, alignment)?))
                }
            }
            S::Decimal => Ok(TypedValue::Decimal(decimal::decode(reader, alignment)?)),
            S::Float | S::Double => Ok(TypedValue::Float(float::decode(reader)?)),
            S::Integer | S::Long | S::Int => {
                if let Some((min, max)) = simple.bounds {
                    let v =
                        integer::decode_bounded(reader, min, max, alignment.is_byte_oriented())?;
                    Ok(TypedValue::Integer(IntegerValue::I64(v)))
                } else {
                    Ok(TypedValue::Integer(integer::decode_value(reader)?))
                }
            }
            S::NonNegativeInteger => {
                let magnitude = unsigned_integer::decode_big(reader)?;
                let value = match u64::try_from(&magnitude) {
                    Ok(v) if v <= i64::MAX as u64 => IntegerValue::I64(v as i64),
                    _ => IntegerValue::Big(magnitude.into()),
                };
                Ok(TypedValue::Integer(value))
            }
            S::Base64Binary => {
                Ok(TypedValue::Binary { data: binary::decode(reader)?, hex: false })
            }
            S::HexBinary => Ok(TypedValue::Binary { data: binary::decode(reader)?, hex: true }),
            _ => {
                if let Some(kind) = datetime_kind(simple.serial) {
                    return Ok(TypedValue::DateTime(datetime::decode(reader, kind)?));
                }
                Ok(TypedValue::String(string::decode(reader)?))
            }
        },
    }
}
