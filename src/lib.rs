//! exig – schema-informed EXI 1.0 event-coding engine
//!
//! Compiles an XML Schema corpus into deterministic grammars, then encodes
//! and decodes XML-infoset event streams against them: per-state event type
//! lists assign compact multi-part codes, typed value codecs carry the
//! content, four alignments cover bit-packed, byte-aligned and the
//! channelled compression modes.
//!
//! # Beispiel
//!
//! ```
//! use std::rc::Rc;
//! use exig::{ChContent, CodecOptions, ExiEvent, GrammarCache, GrammarOptions, QName};
//! use exig::schema::{DatatypeSerial, SchemaBuilder};
//!
//! // Schema: <A> mit xsd:decimal-Inhalt
//! let mut builder = SchemaBuilder::new();
//! let decimal = builder.builtin(DatatypeSerial::Decimal);
//! builder.element("", "A", decimal);
//! let cache = GrammarCache::build(builder.build().unwrap(), GrammarOptions::STRICT).unwrap();
//!
//! let events = vec![
//!     ExiEvent::StartDocument,
//!     ExiEvent::StartElement(Rc::new(QName::new("", "A"))),
//!     ExiEvent::Characters(ChContent { value: " 1267.89675 ".into() }),
//!     ExiEvent::EndElement,
//!     ExiEvent::EndDocument,
//! ];
//! let opts = CodecOptions::default().with_grammar_options(GrammarOptions::STRICT);
//! let bytes = exig::encoder::encode_events(&events, &cache, &opts).unwrap();
//! let decoded = exig::decoder::decode_events(&bytes, &cache, &opts).unwrap();
//!
//! // Typed round-trip: whitespace kollabiert, Wert kanonisch
//! let ExiEvent::Characters(ch) = &decoded[2] else { panic!() };
//! assert_eq!(&*ch.value, "1267.89675");
//! ```

pub mod binary;
pub mod bitstream;
pub mod boolean;
pub mod cache;
pub mod compression;
pub mod datetime;
pub mod decimal;
pub mod decoder;
pub mod encoder;
pub mod enumeration;
pub mod error;
pub mod event;
pub mod event_code;
pub mod float;
pub mod grammar;
pub mod header;
pub mod integer;
pub mod list;
pub mod n_bit_unsigned_integer;
pub mod options;
pub mod qname;
pub mod rcs;
pub mod schema;
pub mod state;
pub mod string;
pub mod string_table;
pub mod typed_value;
pub mod unsigned_integer;

pub use error::{Error, Result};

/// HashMap mit ahash (schneller, nicht DoS-resistent — für interne
/// Datenstrukturen). Nutzt hashbrown direkt.
pub(crate) type FastHashMap<K, V> = hashbrown::HashMap<K, V, ahash::RandomState>;

/// IndexMap mit ahash (deterministische Iteration + schnelles Hashing).
pub(crate) type FastIndexMap<K, V> = indexmap::IndexMap<K, V, ahash::RandomState>;

// Public API: Events
pub use event::{AtContent, ChContent, CmContent, ErContent, EventType, EventTypeList, ExiEvent, PiContent};

// Public API: Options
pub use options::{Alignment, CodecOptions, GrammarOptions};

// Public API: Grammars
pub use cache::GrammarCache;
pub use state::StateMachine;

// Public API: Schema
pub use schema::{SchemaBuilder, SchemaCorpus};

// Public API: Encoder/Decoder
pub use decoder::{Scanner, decode_events};
pub use encoder::{Encoder, encode_events};

// Public API: Types
pub use qname::QName;
pub use typed_value::TypedValue;
