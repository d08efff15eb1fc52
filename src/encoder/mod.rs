//! Stream encoder (Spec 6): drives an ordered event sequence through the
//! grammar state machine, writing each event's multi-part code and value.
//!
//! For every incoming event the encoder asks the current event type list
//! for the matching entry (exact qname before wildcard), writes the code
//! per the alignment mode, invokes the value codec where the event carries
//! content, then advances the state machine. An event with no matching
//! production is a fatal [`Error::UnexpectedElement`] /
//! [`Error::UnexpectedAttribute`].
//!
//! In the channelled alignments (Spec 9) codes and structural content go to
//! the structure channel and values to per-qname channels, buffered for the
//! whole document and emitted as (optionally DEFLATE'd) blocks at the end.
//! xsi:type/xsi:nil payloads are structural (Spec 9.1) — the string table
//! is only ever touched from the structure channel, keeping both sides'
//! tables in lockstep.
//!
//! # Beispiel
//!
//! ```
//! use std::rc::Rc;
//! use exig::{CodecOptions, ExiEvent, GrammarCache, GrammarOptions, QName};
//! use exig::encoder::encode_events;
//!
//! let cache = GrammarCache::schema_less(GrammarOptions::DEFAULT).unwrap();
//! let events = vec![
//!     ExiEvent::StartDocument,
//!     ExiEvent::StartElement(Rc::new(QName::new("", "greeting"))),
//!     ExiEvent::EndElement,
//!     ExiEvent::EndDocument,
//! ];
//! let bytes = encode_events(&events, &cache, &CodecOptions::default()).unwrap();
//! assert!(!bytes.is_empty());
//! ```

mod value;


use std::rc::Rc;

use crate::bitstream::BitWriter;
use crate::cache::GrammarCache;
use crate::compression::ChannelSet;
use crate::event::{AtContent, EventKind, EventType, ExiEvent};
use crate::event_code;
use crate::options::{Alignment, CodecOptions, GrammarOptions};
use crate::qname::{QName, URI_XSI};
use crate::state::StateMachine;
use crate::string_table::StringTable;
use crate::typed_value::{TypedValue, parse_typed};
use crate::{Error, Result, boolean, header, string};

/// Wohin Codes/Struktur und Werte fließen (Spec 9.1).
enum Sink<'a> {
    Plain(&'a mut BitWriter),
    Channelled(&'a mut ChannelSet),
}

impl Sink<'_> {
    fn structure(&mut self) -> &mut BitWriter {
        match self {
            Self::Plain(w) => w,
            Self::Channelled(c) => &mut c.structure,
        }
    }

    fn values(&mut self, qname: &QName) -> &mut BitWriter {
        match self {
            Self::Plain(w) => w,
            Self::Channelled(c) => c.channel(qname),
        }
    }
}

/// The stream encoder. One instance per session; shares the immutable
/// grammar cache.
pub struct Encoder<'g> {
    cache: &'g GrammarCache,
    options: CodecOptions,
}

impl<'g> Encoder<'g> {
    /// Creates an encoder over a cache. The codec options' grammar bit-set
    /// must be the one the cache was compiled with.
    pub fn new(cache: &'g GrammarCache, options: CodecOptions) -> Result<Self> {
        options.validate()?;
        if options.grammar_options() != cache.options() {
            return Err(Error::InvalidOptionCombination);
        }
        Ok(Self { cache, options })
    }

    /// Encodes a complete event sequence (SD … ED) to an EXI stream.
    pub fn encode(&self, events: &[ExiEvent]) -> Result<Vec<u8>> {
        let alignment = self.options.alignment();
        let mut writer = BitWriter::new();
        header::encode(&mut writer, self.options.cookie(), alignment.is_byte_oriented());

        let mut sm = StateMachine::new(self.cache);
        let mut table = StringTable::new(self.cache.corpus(), alignment);
        let mut element_stack: Vec<Rc<QName>> = Vec::new();

        if alignment.is_channelled() {
            let mut channels = ChannelSet::new();
            let mut sink = Sink::Channelled(&mut channels);
            for event in events {
                self.encode_event(event, &mut sm, &mut table, &mut element_stack, &mut sink)?;
            }
            if !sm.is_done() {
                return Err(Error::PrematureEndOfStream);
            }
            channels.emit(&mut writer, alignment == Alignment::Compress)?;
        } else {
            let mut sink = Sink::Plain(&mut writer);
            for event in events {
                self.encode_event(event, &mut sm, &mut table, &mut element_stack, &mut sink)?;
            }
            if !sm.is_done() {
                return Err(Error::PrematureEndOfStream);
            }
        }
        log::debug!("encoded {} events", events.len());
        Ok(writer.into_vec())
    }

    fn grammar_options(&self) -> GrammarOptions {
        self.options.grammar_options()
    }

    fn encode_event(
        &self,
        event: &ExiEvent,
        sm: &mut StateMachine<'_>,
        table: &mut StringTable,
        element_stack: &mut Vec<Rc<QName>>,
        sink: &mut Sink<'_>,
    ) -> Result<()> {
        // xsi:type/xsi:nil dürfen auch als gewöhnliche AT-Events ankommen
        // (Signalisierungs-Hooks der Event-Quelle, Spec 8.5.4.4).
        if let ExiEvent::Attribute(at) = event {
            if at.qname.matches(URI_XSI, "type") {
                let target = self.parse_type_lexical(&at.value)?;
                return self.encode_event(
                    &ExiEvent::TypeCast(Rc::new(target)),
                    sm,
                    table,
                    element_stack,
                    sink,
                );
            }
            if at.qname.matches(URI_XSI, "nil") {
                let value = boolean::parse_lexical(crate::typed_value::trim_xml_ws(&at.value))
                    .map_err(|_| Error::UnexpectedAttribute { qname: (*at.qname).clone() })?;
                return self.encode_event(&ExiEvent::Nil(value), sm, table, element_stack, sink);
            }
        }

        let alignment = self.options.alignment();
        let list = sm.current_list();
        match event {
            ExiEvent::StartDocument => {
                let et = list
                    .find_kind(&EventKind::StartDocument)
                    .ok_or_else(|| Error::invalid_event_code("SD", sm.state_name()))?;
                event_code::encode(sink.structure(), &list, et, alignment);
                sm.apply_start_document()
            }
            ExiEvent::EndDocument => {
                let et = list
                    .find_kind(&EventKind::EndDocument)
                    .ok_or_else(|| Error::invalid_event_code("ED", sm.state_name()))?;
                event_code::encode(sink.structure(), &list, et, alignment);
                sm.apply_end_document()
            }
            ExiEvent::StartElement(qname) => {
                let et = list
                    .match_start_element(qname)
                    .ok_or_else(|| Error::UnexpectedElement { qname: (**qname).clone() })?
                    .clone();
                event_code::encode(sink.structure(), &list, &et, alignment);
                if !matches!(et.kind, EventKind::StartElement(_)) {
                    table.encode_qname(sink.structure(), qname);
                }
                element_stack.push(qname.clone());
                sm.apply_start_element(&et, qname)
            }
            ExiEvent::EndElement => {
                let et = list
                    .end_element()
                    .ok_or_else(|| Error::invalid_event_code("EE", sm.state_name()))?;
                event_code::encode(sink.structure(), &list, et, alignment);
                element_stack.pop();
                sm.apply_end_element()
            }
            ExiEvent::Attribute(at) => self.encode_attribute(at, &list, sm, table, sink),
            ExiEvent::Characters(ch) => {
                self.encode_characters(&ch.value, &list, sm, element_stack, sink)
            }
            ExiEvent::Nil(value) => {
                let et = list
                    .find_kind(&EventKind::Nil)
                    .ok_or_else(|| Error::UnexpectedAttribute { qname: crate::state::xsi_nil_qname() })?;
                event_code::encode(sink.structure(), &list, et, alignment);
                // xsi:nil ist strukturell (Spec 9.1)
                boolean::encode(sink.structure(), *value, alignment);
                sm.apply_nil(*value)
            }
            ExiEvent::TypeCast(target) => {
                let et = list
                    .find_kind(&EventKind::TypeCast)
                    .ok_or_else(|| Error::UnexpectedAttribute { qname: crate::state::xsi_type_qname() })?;
                let resolved = sm.resolve_type_cast(target)?;
                event_code::encode(sink.structure(), &list, et, alignment);
                // xsi:type ist strukturell (Spec 9.1)
                table.encode_qname(sink.structure(), target);
                sm.apply_type_cast(resolved)
            }
            ExiEvent::Comment(cm) => {
                let et = list
                    .find_kind(&EventKind::Comment)
                    .ok_or_else(|| Error::invalid_event_code("CM", sm.state_name()))?;
                event_code::encode(sink.structure(), &list, et, alignment);
                string::encode(sink.structure(), &cm.text);
                sm.apply_misc()
            }
            ExiEvent::ProcessingInstruction(pi) => {
                let et = list
                    .find_kind(&EventKind::ProcessingInstruction)
                    .ok_or_else(|| Error::invalid_event_code("PI", sm.state_name()))?;
                event_code::encode(sink.structure(), &list, et, alignment);
                string::encode(sink.structure(), &pi.name);
                string::encode(sink.structure(), &pi.text);
                sm.apply_misc()
            }
            ExiEvent::EntityReference(er) => {
                let et = list
                    .find_kind(&EventKind::EntityReference)
                    .ok_or_else(|| Error::invalid_event_code("ER", sm.state_name()))?;
                event_code::encode(sink.structure(), &list, et, alignment);
                string::encode(sink.structure(), &er.name);
                sm.apply_misc()
            }
        }
    }

    fn encode_attribute(
        &self,
        at: &AtContent,
        list: &crate::event::EventTypeList,
        sm: &mut StateMachine<'_>,
        table: &mut StringTable,
        sink: &mut Sink<'_>,
    ) -> Result<()> {
        let alignment = self.options.alignment();
        let et = list
            .match_attribute(&at.qname)
            .ok_or_else(|| Error::UnexpectedAttribute { qname: (*at.qname).clone() })?
            .clone();

        // Typed-Pfad zuerst parsen: bei ValueFormat fällt der Encoder auf die
        // untypisierte AT(*)-Production zurück, sofern die Grammar eine
        // anbietet (Spec 8.5.4.4.1).
        let mut chosen = et;
        let mut typed: Option<TypedValue> = None;
        if let (Some(type_id), false) = (chosen.type_id, self.preserve_lexical()) {
            match parse_typed(&at.value, type_id, self.cache.corpus()) {
                Ok(v) => typed = Some(v),
                Err(Error::ValueFormat { .. }) => {
                    let fallback = list
                        .find_kind(&EventKind::AttributeWildcard)
                        .ok_or_else(|| Error::UnexpectedAttribute {
                            qname: (*at.qname).clone(),
                        })?;
                    chosen = fallback.clone();
                }
                Err(e) => return Err(e),
            }
        }

        event_code::encode(sink.structure(), list, &chosen, alignment);
        if !matches!(chosen.kind, EventKind::Attribute(_)) {
            table.encode_qname(sink.structure(), &at.qname);
        }
        value::encode_value(
            sink.values(&at.qname),
            &at.value,
            typed,
            chosen.type_id,
            self.cache.corpus(),
            self.grammar_options(),
            alignment,
        )?;
        sm.apply_attribute(&chosen)
    }

    fn encode_characters(
        &self,
        text: &Rc<str>,
        list: &crate::event::EventTypeList,
        sm: &mut StateMachine<'_>,
        element_stack: &[Rc<QName>],
        sink: &mut Sink<'_>,
    ) -> Result<()> {
        let alignment = self.options.alignment();
        let typed_entry = list
            .items()
            .iter()
            .find(|e| matches!(e.kind, EventKind::Characters(_)) && e.depth == 1);
        let untyped_d1 = list
            .items()
            .iter()
            .find(|e| e.kind == EventKind::CharactersUntyped && e.depth == 1);

        // Insignifikanten Whitespace in element-only Content verwerfen
        // (kein CH auf Tiefe 1 vorhanden).
        let ws_only = text.chars().all(|c| matches!(c, ' ' | '\t' | '\n' | '\r'));
        if ws_only
            && typed_entry.is_none()
            && untyped_d1.is_none()
            && !self.options.preserve_whitespaces()
        {
            return Ok(());
        }

        let mut chosen: Option<EventType> = None;
        let mut typed: Option<TypedValue> = None;
        if let Some(et) = typed_entry {
            if self.preserve_lexical() {
                chosen = Some(et.clone());
            } else {
                let type_id = et.type_id.expect("typed CH carries its type");
                match parse_typed(text, type_id, self.cache.corpus()) {
                    Ok(v) => {
                        typed = Some(v);
                        chosen = Some(et.clone());
                    }
                    Err(Error::ValueFormat { .. }) => {}
                    Err(e) => return Err(e),
                }
            }
        }
        if chosen.is_none() {
            // Mixed-content CH oder untypisierter Fallback (Spec 8.5.4.4.1)
            let fallback = untyped_d1
                .or_else(|| list.find_kind(&EventKind::CharactersUntyped))
                .ok_or_else(|| {
                    if let Some(et) = typed_entry {
                        let type_id = et.type_id.expect("typed CH carries its type");
                        match parse_typed(text, type_id, self.cache.corpus()) {
                            Err(e) => e,
                            Ok(_) => Error::invalid_event_code("CH", sm.state_name()),
                        }
                    } else {
                        Error::invalid_event_code("CH", sm.state_name())
                    }
                })?;
            chosen = Some(fallback.clone());
        }
        let chosen = chosen.expect("resolved above");

        event_code::encode(sink.structure(), list, &chosen, alignment);
        let channel_qname = element_stack.last().cloned().unwrap_or_else(|| {
            Rc::new(QName::new("", ""))
        });
        value::encode_value(
            sink.values(&channel_qname),
            text,
            typed,
            chosen.type_id,
            self.cache.corpus(),
            self.grammar_options(),
            alignment,
        )?;
        sm.apply_characters(&chosen)
    }

    fn preserve_lexical(&self) -> bool {
        self.grammar_options().has(GrammarOptions::PRESERVE_LEXICAL_VALUES)
    }

    /// Resolves an xsi:type attribute value to a qname: `{uri}local` Clark
    /// notation, or a bare local name looked up across the corpus's
    /// namespaces in registration order.
    fn parse_type_lexical(&self, value: &str) -> Result<QName> {
        let s = crate::typed_value::trim_xml_ws(value);
        if let Some(rest) = s.strip_prefix('{') {
            if let Some((uri, local)) = rest.split_once('}') {
                return Ok(QName::new(uri, local));
            }
        }
        let local = s.rsplit(':').next().unwrap_or(s);
        let corpus = self.cache.corpus();
        if corpus.type_by_name("", local).is_some() {
            return Ok(QName::new("", local));
        }
        for uri in corpus.uris() {
            if corpus.type_by_name(uri, local).is_some() {
                return Ok(QName::new(uri, local));
            }
        }
        Err(Error::XsiTypeNotFound(s.to_string()))
    }
}

/// Encodes an event sequence with a fresh [`Encoder`].
pub fn encode_events(
    events: &[ExiEvent],
    cache: &GrammarCache,
    options: &CodecOptions,
) -> Result<Vec<u8>> {
    Encoder::new(cache, options.clone())?.encode(events)
}
