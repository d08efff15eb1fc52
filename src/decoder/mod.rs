//! Stream decoder / scanner (Spec 6): reads event codes against the
//! current event type list, resolves them to events, decodes values and
//! advances the same grammar state machine the encoder drove.
//!
//! [`Scanner::process_header`] reads and validates the EXI header (cookie,
//! distinguishing bits, version) before any event decoding begins. For the
//! channelled alignments (Spec 9) it also runs the full two-pass decode:
//! structure channel first — which yields the value-channel order and
//! per-channel counts — then the value channels, stitching values back into
//! their events. [`Scanner::next_event`] then hands out events one at a
//! time; `Ok(None)` signals the end after ED.
//!
//! # Beispiel
//!
//! ```
//! use std::rc::Rc;
//! use exig::{CodecOptions, ExiEvent, GrammarCache, GrammarOptions, QName};
//! use exig::encoder::encode_events;
//! use exig::decoder::decode_events;
//!
//! let cache = GrammarCache::schema_less(GrammarOptions::DEFAULT).unwrap();
//! let events = vec![
//!     ExiEvent::StartDocument,
//!     ExiEvent::StartElement(Rc::new(QName::new("", "root"))),
//!     ExiEvent::EndElement,
//!     ExiEvent::EndDocument,
//! ];
//! let opts = CodecOptions::default();
//! let bytes = encode_events(&events, &cache, &opts).unwrap();
//! let decoded = decode_events(&bytes, &cache, &opts).unwrap();
//! assert_eq!(decoded, events);
//! ```

mod value;


use std::collections::VecDeque;
use std::rc::Rc;

use crate::bitstream::BitReader;
use crate::cache::GrammarCache;
use crate::compression::{ChannelKey, channel_key, read_block};
use crate::event::{AtContent, ChContent, CmContent, ErContent, EventKind, ExiEvent, PiContent};
use crate::event_code;
use crate::options::{Alignment, CodecOptions};
use crate::qname::QName;
use crate::schema::TypeId;
use crate::state::StateMachine;
use crate::string_table::StringTable;
use crate::{Error, Result, boolean, header, string};

/// Ergebnis eines Struktur-Schritts: fertiges Event oder Wert-Träger.
enum Decoded {
    Event(ExiEvent),
    Attribute { qname: Rc<QName>, type_id: Option<TypeId> },
    Characters { channel: Rc<QName>, type_id: Option<TypeId> },
}

/// The pull decoder. One instance per stream; shares the immutable cache.
pub struct Scanner<'g, 'b> {
    cache: &'g GrammarCache,
    options: CodecOptions,
    reader: BitReader<'b>,
    sm: StateMachine<'g>,
    table: StringTable,
    element_stack: Vec<Rc<QName>>,
    header_done: bool,
    /// Channelled alignments decode eagerly; events drain from here.
    queue: VecDeque<ExiEvent>,
}

impl<'g, 'b> Scanner<'g, 'b> {
    /// Creates a scanner over a byte stream. The codec options' grammar
    /// bit-set must be the one the cache was compiled with.
    pub fn new(data: &'b [u8], cache: &'g GrammarCache, options: CodecOptions) -> Result<Self> {
        options.validate()?;
        if options.grammar_options() != cache.options() {
            return Err(Error::InvalidOptionCombination);
        }
        let alignment = options.alignment();
        Ok(Self {
            cache,
            options,
            reader: BitReader::new(data),
            sm: StateMachine::new(cache),
            table: StringTable::new(cache.corpus(), alignment),
            element_stack: Vec::new(),
            header_done: false,
            queue: VecDeque::new(),
        })
    }

    /// Reads and validates the EXI header (Spec 5); must precede event
    /// decoding. For the channelled alignments this also runs the two-pass
    /// body decode (Spec 9).
    pub fn process_header(&mut self) -> Result<()> {
        debug_assert!(!self.header_done, "header already processed");
        let alignment = self.options.alignment();
        header::decode(&mut self.reader, alignment.is_byte_oriented())?;
        self.header_done = true;
        if alignment.is_channelled() {
            self.decode_channelled()?;
        }
        Ok(())
    }

    /// The next event, or `None` after ED (Spec 6).
    pub fn next_event(&mut self) -> Result<Option<ExiEvent>> {
        if !self.header_done {
            self.process_header()?;
        }
        if self.options.alignment().is_channelled() {
            return Ok(self.queue.pop_front());
        }
        if self.sm.is_done() {
            return Ok(None);
        }

        let alignment = self.options.alignment();
        let step = decode_structure(
            &mut self.reader,
            &mut self.sm,
            &mut self.table,
            &mut self.element_stack,
            alignment,
        )?;
        let event = match step {
            Decoded::Event(e) => e,
            Decoded::Attribute { qname, type_id } => {
                let lexical = value::decode_value(
                    &mut self.reader,
                    type_id,
                    self.cache.corpus(),
                    self.options.grammar_options(),
                    alignment,
                )?;
                ExiEvent::Attribute(AtContent { qname, value: lexical })
            }
            Decoded::Characters { type_id, .. } => {
                let lexical = value::decode_value(
                    &mut self.reader,
                    type_id,
                    self.cache.corpus(),
                    self.options.grammar_options(),
                    alignment,
                )?;
                ExiEvent::Characters(ChContent { value: lexical })
            }
        };
        Ok(Some(event))
    }

    /// Two-pass channelled decode (Spec 9): structure channel, then value
    /// channels in first-appearance order.
    fn decode_channelled(&mut self) -> Result<()> {
        let alignment = self.options.alignment();
        let deflate = alignment == Alignment::Compress;
        let structure_bytes = read_block(&mut self.reader, deflate)?;
        let mut structure = BitReader::new(&structure_bytes);

        struct Pending {
            event_index: usize,
            key: ChannelKey,
            type_id: Option<TypeId>,
            is_attribute: bool,
            qname: Rc<QName>,
        }
        let mut events: Vec<ExiEvent> = Vec::new();
        let mut pending: Vec<Pending> = Vec::new();
        let mut channel_order: Vec<ChannelKey> = Vec::new();

        while !self.sm.is_done() {
            let step = decode_structure(
                &mut structure,
                &mut self.sm,
                &mut self.table,
                &mut self.element_stack,
                alignment,
            )?;
            match step {
                Decoded::Event(e) => events.push(e),
                Decoded::Attribute { qname, type_id } => {
                    let key = channel_key(&qname);
                    if !channel_order.contains(&key) {
                        channel_order.push(key.clone());
                    }
                    pending.push(Pending {
                        event_index: events.len(),
                        key,
                        type_id,
                        is_attribute: true,
                        qname: qname.clone(),
                    });
                    events.push(ExiEvent::Attribute(AtContent { qname, value: Rc::from("") }));
                }
                Decoded::Characters { channel, type_id } => {
                    let key = channel_key(&channel);
                    if !channel_order.contains(&key) {
                        channel_order.push(key.clone());
                    }
                    pending.push(Pending {
                        event_index: events.len(),
                        key,
                        type_id,
                        is_attribute: false,
                        qname: channel,
                    });
                    events.push(ExiEvent::Characters(ChContent { value: Rc::from("") }));
                }
            }
        }
        log::trace!(
            "structure pass: {} events, {} pending values in {} channels",
            events.len(),
            pending.len(),
            channel_order.len()
        );

        for key in &channel_order {
            let block = read_block(&mut self.reader, deflate)?;
            let mut channel = BitReader::new(&block);
            for p in pending.iter().filter(|p| &p.key == key) {
                let lexical = value::decode_value(
                    &mut channel,
                    p.type_id,
                    self.cache.corpus(),
                    self.options.grammar_options(),
                    alignment,
                )?;
                events[p.event_index] = if p.is_attribute {
                    ExiEvent::Attribute(AtContent { qname: p.qname.clone(), value: lexical })
                } else {
                    ExiEvent::Characters(ChContent { value: lexical })
                };
            }
        }

        self.queue = events.into();
        Ok(())
    }
}

/// Decodes one structural step: code against the current list, structural
/// content, state transition (Spec 6.2).
fn decode_structure(
    reader: &mut BitReader<'_>,
    sm: &mut StateMachine<'_>,
    table: &mut StringTable,
    element_stack: &mut Vec<Rc<QName>>,
    alignment: Alignment,
) -> Result<Decoded> {
    let list = sm.current_list();
    let et = event_code::decode(reader, &list, alignment, sm.state_name())?.clone();

    match &et.kind {
        EventKind::StartDocument => {
            sm.apply_start_document()?;
            Ok(Decoded::Event(ExiEvent::StartDocument))
        }
        EventKind::EndDocument => {
            sm.apply_end_document()?;
            Ok(Decoded::Event(ExiEvent::EndDocument))
        }
        EventKind::StartElement(_) => {
            let qname = et.qname.clone().expect("declared SE carries its qname");
            element_stack.push(qname.clone());
            sm.apply_start_element(&et, &qname)?;
            Ok(Decoded::Event(ExiEvent::StartElement(qname)))
        }
        EventKind::StartElementNs(_) | EventKind::StartElementWildcard => {
            let qname = Rc::new(table.decode_qname(reader)?);
            element_stack.push(qname.clone());
            sm.apply_start_element(&et, &qname)?;
            Ok(Decoded::Event(ExiEvent::StartElement(qname)))
        }
        EventKind::EndElement => {
            element_stack.pop();
            sm.apply_end_element()?;
            Ok(Decoded::Event(ExiEvent::EndElement))
        }
        EventKind::Attribute(_) => {
            let qname = et.qname.clone().expect("declared AT carries its qname");
            sm.apply_attribute(&et)?;
            Ok(Decoded::Attribute { qname, type_id: et.type_id })
        }
        EventKind::AttributeNs(_) | EventKind::AttributeWildcard => {
            let qname = Rc::new(table.decode_qname(reader)?);
            sm.apply_attribute(&et)?;
            Ok(Decoded::Attribute { qname, type_id: None })
        }
        EventKind::Characters(type_id) => {
            let type_id = *type_id;
            sm.apply_characters(&et)?;
            let channel = element_stack
                .last()
                .cloned()
                .unwrap_or_else(|| Rc::new(QName::new("", "")));
            Ok(Decoded::Characters { channel, type_id: Some(type_id) })
        }
        EventKind::CharactersUntyped => {
            sm.apply_characters(&et)?;
            let channel = element_stack
                .last()
                .cloned()
                .unwrap_or_else(|| Rc::new(QName::new("", "")));
            Ok(Decoded::Characters { channel, type_id: None })
        }
        EventKind::Nil => {
            // xsi:nil ist strukturell (Spec 9.1)
            let value = boolean::decode(reader, alignment)?;
            sm.apply_nil(value)?;
            Ok(Decoded::Event(ExiEvent::Nil(value)))
        }
        EventKind::TypeCast => {
            // xsi:type ist strukturell (Spec 9.1)
            let target = Rc::new(table.decode_qname(reader)?);
            let resolved = sm.resolve_type_cast(&target)?;
            sm.apply_type_cast(resolved)?;
            Ok(Decoded::Event(ExiEvent::TypeCast(target)))
        }
        EventKind::Comment => {
            let text = string::decode(reader)?;
            sm.apply_misc()?;
            Ok(Decoded::Event(ExiEvent::Comment(CmContent { text: Rc::from(text) })))
        }
        EventKind::ProcessingInstruction => {
            let name = string::decode(reader)?;
            let text = string::decode(reader)?;
            sm.apply_misc()?;
            Ok(Decoded::Event(ExiEvent::ProcessingInstruction(PiContent {
                name: Rc::from(name),
                text: Rc::from(text),
            })))
        }
        EventKind::EntityReference => {
            let name = string::decode(reader)?;
            sm.apply_misc()?;
            Ok(Decoded::Event(ExiEvent::EntityReference(ErContent { name: Rc::from(name) })))
        }
        EventKind::SelfContained => Err(Error::UnsupportedSelfContained),
        EventKind::NamespaceDecl => Err(Error::invalid_event_code("NS", sm.state_name())),
    }
}

/// Decodes a complete stream with a fresh [`Scanner`].
pub fn decode_events(
    data: &[u8],
    cache: &GrammarCache,
    options: &CodecOptions,
) -> Result<Vec<ExiEvent>> {
    let mut scanner = Scanner::new(data, cache, options.clone())?;
    scanner.process_header()?;
    let mut events = Vec::new();
    while let Some(event) = scanner.next_event()? {
        events.push(event);
    }
    Ok(events)
}
