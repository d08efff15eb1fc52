//! Central error types for the schema-informed EXI engine.
//!
//! Variants are grouped by the four failure families: grammar construction,
//! unexpected events (strict schema deviations), malformed streams, and
//! value-format failures. Each variant references the relevant W3C EXI 1.0
//! Second Edition spec section where one applies.

use core::fmt;
use std::borrow::Cow;

use crate::qname::QName;

/// All error conditions surfaced by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The schema corpus is inconsistent with grammar construction rules
    /// (Spec 8.5). Raised during `GrammarCache::build`, never mid-session.
    GrammarBuild(Cow<'static, str>),
    /// An SE event has no matching declared or wildcard production (Spec 8.5.4.4).
    UnexpectedElement {
        /// QName des Elements das keine Production gefunden hat.
        qname: QName,
    },
    /// An AT event has no matching declared or wildcard production (Spec 8.5.4.4).
    UnexpectedAttribute {
        /// QName des Attributs das keine Production gefunden hat.
        qname: QName,
    },
    /// The EXI header is malformed (Spec 5).
    MalformedHeader,
    /// The EXI distinguishing bits are not `10` (Spec 5.2).
    InvalidDistinguishingBits(u8),
    /// EXI version number is not supported (Spec 5.3).
    UnsupportedVersion,
    /// An event code does not match any entry in the current event type list
    /// (Spec 6.1, 6.2).
    InvalidEventCode {
        /// Der Event Code der nicht passte.
        event_code: Cow<'static, str>,
        /// Der Grammar-Zustand in dem der Fehler auftrat (leer wenn nicht verfügbar).
        grammar_state: Cow<'static, str>,
    },
    /// The EXI stream ended before a complete structure was decoded (Spec 6).
    PrematureEndOfStream,
    /// A typed value's lexical form cannot be parsed against its datatype
    /// (Spec 7.1). Recovered via the untyped fallback production when the
    /// grammar offers one; fatal otherwise.
    ValueFormat {
        /// Die lexikalische Form die nicht geparst werden konnte.
        value: String,
        /// Name des Datentyps (built-in local name).
        datatype: &'static str,
    },
    /// An integer value exceeds the representable range (Spec 7.1.5, 7.1.6).
    IntegerOverflow,
    /// A float value exceeds the representable range (Spec 7.1.4 MUST NOT).
    FloatOutOfRange,
    /// A Unicode code point is invalid: surrogate (U+D800..U+DFFF) or > U+10FFFF (Spec 7.1.10).
    InvalidCodePoint(u64),
    /// A list length exceeds the maximum allowed size (Spec 7.1.11).
    ListLengthOverflow(u64),
    /// An enumeration index exceeds the valid range (Spec 7.2).
    InvalidEnumerationIndex { index: usize, enum_count: usize },
    /// An invalid combination of codec options was specified (Spec 5.4).
    InvalidOptionCombination,
    /// Block size must be greater than zero (Spec 9.1).
    InvalidBlockSize,
    /// xsi:type references a type not found in the schema corpus (Spec 8.5.4.4).
    ///
    /// Bei strict wird der Verweis hart abgelehnt; lenient fällt auf die
    /// AT(*)-Production zurück.
    XsiTypeNotFound(String),
    /// xsi:type and xsi:nil were both supplied under strict mode (Spec 8.5.4.4.2).
    ///
    /// "It is not possible to use xsi:type and xsi:nil attributes together on
    /// the same element."
    XsiTypeAndNilTogether,
    /// Self-contained (SC) processing is not supported (Spec 8.4.3).
    ///
    /// Die Option wird akzeptiert und die Production reserviert; echtes
    /// SC-State-Management (Grammar/Tabellen-Snapshots) fehlt.
    UnsupportedSelfContained,
    /// DEFLATE compression failed (RFC 1951, Spec 9.3).
    CompressionError(String),
    /// DEFLATE decompression failed (RFC 1951, Spec 9.3).
    DecompressionError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GrammarBuild(msg) => write!(f, "grammar build failed: {msg} (Spec 8.5)"),
            Self::UnexpectedElement { qname } => {
                write!(f, "unexpected element {qname} (Spec 8.5.4.4)")
            }
            Self::UnexpectedAttribute { qname } => {
                write!(f, "unexpected attribute {qname} (Spec 8.5.4.4)")
            }
            Self::MalformedHeader => write!(f, "malformed EXI header (Spec 5)"),
            Self::InvalidDistinguishingBits(bits) => {
                write!(f, "invalid distinguishing bits {bits:02b}, expected 10 (Spec 5.2)")
            }
            Self::UnsupportedVersion => write!(f, "unsupported EXI version (Spec 5.3)"),
            Self::InvalidEventCode { event_code, grammar_state } => {
                if grammar_state.is_empty() {
                    write!(f, "invalid event code '{event_code}' (Spec 6.1, 6.2)")
                } else {
                    write!(
                        f,
                        "invalid event code '{event_code}' in state '{grammar_state}' (Spec 6.1, 6.2)"
                    )
                }
            }
            Self::PrematureEndOfStream => write!(f, "premature end of EXI stream (Spec 6)"),
            Self::ValueFormat { value, datatype } => {
                write!(f, "value '{value}' is not a valid {datatype} (Spec 7.1)")
            }
            Self::IntegerOverflow => write!(f, "integer overflow (Spec 7.1.5, 7.1.6)"),
            Self::FloatOutOfRange => write!(f, "float value out of range (Spec 7.1.4)"),
            Self::InvalidCodePoint(cp) => {
                write!(f, "invalid Unicode code point U+{cp:X} (Spec 7.1.10)")
            }
            Self::ListLengthOverflow(len) => {
                write!(f, "list length {len} exceeds max allowed size (Spec 7.1.11)")
            }
            Self::InvalidEnumerationIndex { index, enum_count } => {
                write!(f, "enum index {index} exceeds valid range 0..{enum_count} (Spec 7.2)")
            }
            Self::InvalidOptionCombination => {
                write!(f, "invalid codec option combination (Spec 5.4)")
            }
            Self::InvalidBlockSize => write!(f, "block size must be greater than zero (Spec 9.1)"),
            Self::XsiTypeNotFound(name) => {
                write!(f, "xsi:type '{name}' not found in schema corpus (Spec 8.5.4.4)")
            }
            Self::XsiTypeAndNilTogether => write!(
                f,
                "xsi:type and xsi:nil cannot be used together on the same element (Spec 8.5.4.4.2)"
            ),
            Self::UnsupportedSelfContained => {
                write!(f, "self-contained (SC) processing not supported (Spec 8.4.3)")
            }
            Self::CompressionError(msg) => {
                write!(f, "DEFLATE compression failed (RFC 1951, Spec 9.3): {msg}")
            }
            Self::DecompressionError(msg) => {
                write!(f, "DEFLATE decompression failed (RFC 1951, Spec 9.3): {msg}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Erstellt einen `GrammarBuild` Fehler mit Nachricht.
    pub fn grammar_build(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::GrammarBuild(msg.into())
    }

    /// Erstellt einen `InvalidEventCode` Fehler mit Kontext.
    pub fn invalid_event_code(
        event_code: impl Into<Cow<'static, str>>,
        grammar_state: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::InvalidEventCode {
            event_code: event_code.into(),
            grammar_state: grammar_state.into(),
        }
    }

    /// Erstellt einen `ValueFormat` Fehler.
    pub fn value_format(value: impl Into<String>, datatype: &'static str) -> Self {
        Self::ValueFormat { value: value.into(), datatype }
    }
}

/// A convenience `Result` type alias using [`Error`].
pub type Result<T> = core::result::Result<T, Error>;
