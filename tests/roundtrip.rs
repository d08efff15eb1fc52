//! Round-Trip-Matrix über alle vier Alignments (Spec 6, 9).

use std::rc::Rc;

use exig::schema::{
    AttributeUse, ComplexType, ContentModel, DatatypeSerial, Particle, SchemaBuilder, Term,
};
use exig::{
    Alignment, AtContent, ChContent, CodecOptions, ExiEvent, GrammarCache, GrammarOptions, QName,
    decode_events, encode_events,
};

fn q(name: &str) -> Rc<QName> {
    Rc::new(QName::new("", name))
}

const ALIGNMENTS: [Alignment; 4] = [
    Alignment::BitPacked,
    Alignment::ByteAligned,
    Alignment::PreCompress,
    Alignment::Compress,
];

/// Schema: <order id> mit (item: decimal)* und optionalem <note: string>.
fn order_cache(grammar: GrammarOptions) -> GrammarCache {
    let mut b = SchemaBuilder::new();
    let s = b.builtin(DatatypeSerial::String);
    let dec = b.builtin(DatatypeSerial::Decimal);
    let a_id = b.attribute("", "id", s);
    let item = b.local_element("", "item", dec);
    let note = b.local_element("", "note", s);
    let ct = b.complex_type(ComplexType {
        name: Some(("".into(), "OrderType".into())),
        base: None,
        derivation: None,
        attributes: vec![AttributeUse { attribute: a_id, required: true }],
        attribute_wildcard: None,
        content: ContentModel::ElementOnly(Particle::required(Term::Sequence(vec![
            Particle::repeated(Term::Element(item)),
            Particle::optional(Term::Element(note)),
        ]))),
        has_named_subtypes: false,
    });
    b.element("", "order", ct);
    GrammarCache::build(b.build().unwrap(), grammar).unwrap()
}

fn order_events() -> Vec<ExiEvent> {
    vec![
        ExiEvent::StartDocument,
        ExiEvent::StartElement(q("order")),
        ExiEvent::Attribute(AtContent { qname: q("id"), value: "A-17".into() }),
        ExiEvent::StartElement(q("item")),
        ExiEvent::Characters(ChContent { value: "12.5".into() }),
        ExiEvent::EndElement,
        ExiEvent::StartElement(q("item")),
        ExiEvent::Characters(ChContent { value: "0.99".into() }),
        ExiEvent::EndElement,
        ExiEvent::StartElement(q("note")),
        ExiEvent::Characters(ChContent { value: "fragile".into() }),
        ExiEvent::EndElement,
        ExiEvent::EndElement,
        ExiEvent::EndDocument,
    ]
}

/// decode(encode(x)) == x für alle vier Alignments, feldgenau.
#[test]
fn matrix_alle_alignments() {
    let cache = order_cache(GrammarOptions::STRICT);
    let events = order_events();
    for alignment in ALIGNMENTS {
        let opts = CodecOptions::default()
            .with_grammar_options(GrammarOptions::STRICT)
            .with_alignment(alignment);
        let bytes = encode_events(&events, &cache, &opts)
            .unwrap_or_else(|e| panic!("{alignment:?}: encode failed: {e}"));
        let decoded = decode_events(&bytes, &cache, &opts)
            .unwrap_or_else(|e| panic!("{alignment:?}: decode failed: {e}"));
        assert_eq!(decoded, events, "{alignment:?}");
    }
}

/// `<A/>` unter STRICT sind exakt 4 Events: SD, SE, EE, ED.
#[test]
fn leeres_element_vier_events() {
    let mut b = SchemaBuilder::new();
    let s = b.builtin(DatatypeSerial::String);
    b.element("", "A", s);
    let cache = GrammarCache::build(b.build().unwrap(), GrammarOptions::STRICT).unwrap();
    let opts = CodecOptions::default().with_grammar_options(GrammarOptions::STRICT);

    let events = vec![
        ExiEvent::StartDocument,
        ExiEvent::StartElement(q("A")),
        ExiEvent::EndElement,
        ExiEvent::EndDocument,
    ];
    let bytes = encode_events(&events, &cache, &opts).unwrap();
    let decoded = decode_events(&bytes, &cache, &opts).unwrap();
    assert_eq!(decoded.len(), 4);
    assert_eq!(decoded[0], ExiEvent::StartDocument);
    assert!(matches!(&decoded[1], ExiEvent::StartElement(q) if &*q.local_name == "A" && q.uri.is_empty()));
    assert_eq!(decoded[2], ExiEvent::EndElement);
    assert_eq!(decoded[3], ExiEvent::EndDocument);
}

/// Cookie: exakt 4 Bytes Unterschied, identische Event-Folge (Spec 5.1).
#[test]
fn cookie_framing() {
    let cache = order_cache(GrammarOptions::STRICT);
    let events = order_events();
    for alignment in ALIGNMENTS {
        let base = CodecOptions::default()
            .with_grammar_options(GrammarOptions::STRICT)
            .with_alignment(alignment);
        let with_cookie = base.clone().with_cookie();

        let plain = encode_events(&events, &cache, &base).unwrap();
        let cookied = encode_events(&events, &cache, &with_cookie).unwrap();
        assert_eq!(cookied.len(), plain.len() + 4, "{alignment:?}");
        assert_eq!(&cookied[..4], b"$EXI", "{alignment:?}");

        assert_eq!(decode_events(&plain, &cache, &base).unwrap(), events);
        assert_eq!(decode_events(&cookied, &cache, &with_cookie).unwrap(), events);
    }
}

/// Zwei unabhängig gebaute Caches encodieren byte-identisch
/// (deterministische Grammar-Konstruktion).
#[test]
fn grammar_cache_deterministisch() {
    let events = order_events();
    let opts = CodecOptions::default().with_grammar_options(GrammarOptions::STRICT);
    let a = encode_events(&events, &order_cache(GrammarOptions::STRICT), &opts).unwrap();
    let b = encode_events(&events, &order_cache(GrammarOptions::STRICT), &opts).unwrap();
    assert_eq!(a, b);
}

/// Schema-less: unbekannte Struktur läuft über Wildcards (DEFAULT).
#[test]
fn schema_less_wildcards() {
    let cache = GrammarCache::schema_less(GrammarOptions::DEFAULT).unwrap();
    let events = vec![
        ExiEvent::StartDocument,
        ExiEvent::StartElement(Rc::new(QName::new("urn:x", "doc"))),
        ExiEvent::Attribute(AtContent {
            qname: Rc::new(QName::new("", "version")),
            value: "1.0".into(),
        }),
        ExiEvent::StartElement(Rc::new(QName::new("urn:x", "child"))),
        ExiEvent::Characters(ChContent { value: "text".into() }),
        ExiEvent::EndElement,
        ExiEvent::EndElement,
        ExiEvent::EndDocument,
    ];
    for alignment in ALIGNMENTS {
        let opts = CodecOptions::default().with_alignment(alignment);
        let bytes = encode_events(&events, &cache, &opts).unwrap();
        let decoded = decode_events(&bytes, &cache, &opts).unwrap();
        assert_eq!(decoded, events, "{alignment:?}");
    }
}

/// Wiederholte Wildcard-QNames werden über Compact-Ids kleiner.
#[test]
fn string_table_compact_ids() {
    let cache = GrammarCache::schema_less(GrammarOptions::DEFAULT).unwrap();
    let one = |count: usize| {
        let mut events = vec![ExiEvent::StartDocument, ExiEvent::StartElement(q("r"))];
        for _ in 0..count {
            events.push(ExiEvent::StartElement(Rc::new(QName::new("urn:ns", "leaf"))));
            events.push(ExiEvent::EndElement);
        }
        events.push(ExiEvent::EndElement);
        events.push(ExiEvent::EndDocument);
        events
    };
    let opts = CodecOptions::default();
    let two = encode_events(&one(2), &cache, &opts).unwrap();
    let four = encode_events(&one(4), &cache, &opts).unwrap();
    // Jedes weitere Vorkommen kostet nur Compact-Ids, nicht den Literal-QName
    let growth = four.len() - two.len();
    let first_cost = {
        let zero = encode_events(&one(0), &cache, &opts).unwrap();
        two.len() - zero.len()
    };
    assert!(growth < first_cost, "growth {growth} vs first {first_cost}");

    let decoded = decode_events(&four, &cache, &opts).unwrap();
    assert_eq!(decoded, one(4));
}

/// Fidelity-Events (CM/PI) round-trippen, wenn die Optionen sie erhalten.
#[test]
fn fidelity_events() {
    let grammar = GrammarOptions::PRESERVE_COMMENTS | GrammarOptions::PRESERVE_PIS;
    let cache = GrammarCache::schema_less(grammar).unwrap();
    let opts = CodecOptions::default().with_grammar_options(grammar);

    let events = vec![
        ExiEvent::StartDocument,
        ExiEvent::Comment(exig::CmContent { text: "header".into() }),
        ExiEvent::StartElement(q("r")),
        ExiEvent::ProcessingInstruction(exig::PiContent {
            name: "target".into(),
            text: "data".into(),
        }),
        ExiEvent::EndElement,
        ExiEvent::EndDocument,
    ];
    let bytes = encode_events(&events, &cache, &opts).unwrap();
    assert_eq!(decode_events(&bytes, &cache, &opts).unwrap(), events);
}
