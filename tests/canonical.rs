//! Kanonisierung typisierter Werte und Lexical Preservation (Spec 7).

use std::rc::Rc;

use exig::schema::{DatatypeSerial, SchemaBuilder};
use exig::{
    ChContent, CodecOptions, ExiEvent, GrammarCache, GrammarOptions, QName, decode_events,
    encode_events,
};

fn q(name: &str) -> Rc<QName> {
    Rc::new(QName::new("", name))
}

/// Encode → Decode eines einzelnen CH-Werts; liefert die dekodierte Form.
fn ch_round_trip(serial: DatatypeSerial, lexical: &str, grammar: GrammarOptions) -> String {
    let mut b = SchemaBuilder::new();
    let t = b.builtin(serial);
    b.element("", "v", t);
    let cache = GrammarCache::build(b.build().unwrap(), grammar).unwrap();
    let opts = CodecOptions::default().with_grammar_options(grammar);

    let events = vec![
        ExiEvent::StartDocument,
        ExiEvent::StartElement(q("v")),
        ExiEvent::Characters(ChContent { value: lexical.into() }),
        ExiEvent::EndElement,
        ExiEvent::EndDocument,
    ];
    let bytes = encode_events(&events, &cache, &opts).unwrap();
    let decoded = decode_events(&bytes, &cache, &opts).unwrap();
    let ExiEvent::Characters(ch) = &decoded[2] else {
        panic!("expected CH, got {:?}", decoded[2]);
    };
    ch.value.to_string()
}

/// Decimal: Whitespace kollabiert, Vorzeichen und Ziffern bleiben.
#[test]
fn decimal_whitespace_collapse() {
    assert_eq!(
        ch_round_trip(DatatypeSerial::Decimal, " \t\r 1267.89675\n", GrammarOptions::STRICT),
        "1267.89675"
    );
}

/// Float: "-1E4" bleibt, "12.78e-2" kanonisiert zu "1278E-4".
#[test]
fn float_kanonisch() {
    assert_eq!(
        ch_round_trip(DatatypeSerial::Float, "-1E4", GrammarOptions::STRICT),
        "-1E4"
    );
    assert_eq!(
        ch_round_trip(DatatypeSerial::Float, "12.78e-2", GrammarOptions::STRICT),
        "1278E-4"
    );
}

/// INF/-INF/NaN laufen unverändert durch.
#[test]
fn float_sentinels() {
    for s in ["INF", "-INF", "NaN"] {
        assert_eq!(ch_round_trip(DatatypeSerial::Double, s, GrammarOptions::STRICT), s);
    }
}

/// Integer: Normalisierung und Big-Integer-Pfad.
#[test]
fn integer_kanonisch() {
    assert_eq!(
        ch_round_trip(DatatypeSerial::Integer, " +0042 ", GrammarOptions::STRICT),
        "42"
    );
    assert_eq!(
        ch_round_trip(
            DatatypeSerial::Integer,
            "92233720368547758079223372036854775807",
            GrammarOptions::STRICT
        ),
        "92233720368547758079223372036854775807"
    );
    assert_eq!(
        ch_round_trip(DatatypeSerial::Integer, "-0", GrammarOptions::STRICT),
        "0"
    );
}

/// Listen: beliebiges Trenn-Whitespace → Single-Space-Kanonform;
/// leere/nur-Whitespace-Liste → leerer String.
#[test]
fn listen_kanonisch() {
    let mut b = SchemaBuilder::new();
    let int = b.builtin(DatatypeSerial::Integer);
    let lt = b.list_type(Some(("", "Ints")), int);
    b.element("", "v", lt);
    let cache = GrammarCache::build(b.build().unwrap(), GrammarOptions::STRICT).unwrap();
    let opts = CodecOptions::default().with_grammar_options(GrammarOptions::STRICT);

    let round = |lexical: &str| {
        let events = vec![
            ExiEvent::StartDocument,
            ExiEvent::StartElement(q("v")),
            ExiEvent::Characters(ChContent { value: lexical.into() }),
            ExiEvent::EndElement,
            ExiEvent::EndDocument,
        ];
        let bytes = encode_events(&events, &cache, &opts).unwrap();
        let decoded = decode_events(&bytes, &cache, &opts).unwrap();
        let ExiEvent::Characters(ch) = &decoded[2] else { panic!() };
        ch.value.to_string()
    };

    assert_eq!(round("15 \t 65\r\n78"), "15 65 78");
    assert_eq!(round("  \t "), "");
    assert_eq!(round(""), "");
}

/// Lexical Preservation: exotische-aber-gültige Form kommt exakt zurück
/// (nach EOL-Normalisierung auf "\n"), nicht die Kanonform (Spec 7.2).
#[test]
fn lexical_preservation_verbatim() {
    let grammar = GrammarOptions::PRESERVE_LEXICAL_VALUES;
    let source = " \t\r *9223372036854775807*\r\n";
    let expected = " \t\n *9223372036854775807*\n";
    assert_eq!(
        ch_round_trip(DatatypeSerial::Integer, source, grammar),
        expected
    );
}

/// Lexical Preservation erhält auch nicht-kanonische Zahlformen.
#[test]
fn lexical_preservation_nicht_kanonisch() {
    let grammar = GrammarOptions::PRESERVE_LEXICAL_VALUES;
    assert_eq!(
        ch_round_trip(DatatypeSerial::Decimal, "+0012.3400", grammar),
        "+0012.3400"
    );
    assert_eq!(
        ch_round_trip(DatatypeSerial::Float, "12.78e-2", grammar),
        "12.78e-2"
    );
}

/// Ohne Preservation ist die Kanonform unabhängig von der Quellform.
#[test]
fn kanonform_unabhaengig_von_quelle() {
    for source in ["1278E-4", "12.78e-2", "0.1278", "+0.12780000"] {
        assert_eq!(
            ch_round_trip(DatatypeSerial::Float, source, GrammarOptions::STRICT),
            "1278E-4",
            "source {source:?}"
        );
    }
}

/// Boolean: kanonisch true/false.
#[test]
fn boolean_kanonisch() {
    assert_eq!(ch_round_trip(DatatypeSerial::Boolean, " 1 ", GrammarOptions::STRICT), "true");
    assert_eq!(ch_round_trip(DatatypeSerial::Boolean, "0", GrammarOptions::STRICT), "false");
}

/// Base64/Hex: kanonische Lexikalformen.
#[test]
fn binary_kanonisch() {
    assert_eq!(
        ch_round_trip(DatatypeSerial::Base64Binary, "SGVs bG8=", GrammarOptions::STRICT),
        "SGVsbG8="
    );
    assert_eq!(
        ch_round_trip(DatatypeSerial::HexBinary, "00ff7f", GrammarOptions::STRICT),
        "00FF7F"
    );
}

/// dateTime: +00:00 kanonisiert zu Z, Fraction ohne Trailing Zeros.
#[test]
fn datetime_kanonisch() {
    assert_eq!(
        ch_round_trip(
            DatatypeSerial::DateTime,
            "2001-10-26T21:32:52.1270+00:00",
            GrammarOptions::STRICT
        ),
        "2001-10-26T21:32:52.127Z"
    );
}
