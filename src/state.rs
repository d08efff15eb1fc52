//! Per-document grammar state machine (Spec 8.4, 8.5.4.4).
//!
//! Tracks the document phase and a stack of per-element frames
//! `{grammar node, effective type, xsi flags, xs:all occurrence mask}`.
//! [`StateMachine::current_list`] derives the event type list in force —
//! a pure function of the explicit state, nothing else — and the `apply_*`
//! operations advance it: SE pushes a frame, EE pops, AT/NL/TP move the
//! current frame's cursor, CH stays or advances per the content model.
//!
//! Depth-1 entries follow the canonical production order: TP, NL, declared
//! SE productions, declared AT productions, typed/mixed CH, EE. Depth-2
//! appends the wildcard tier (schema attribute wildcard, then the lenient
//! AT(*)/SE(*)/CH fallbacks and fidelity NS/SC/ER), depth-3 carries CM/PI.

use std::rc::Rc;

use crate::cache::GrammarCache;
use crate::event::{EventKind, EventType, EventTypeList};
use crate::grammar::{GrammarNodeId, NodeKind, ProdEvent, Production};
use crate::options::GrammarOptions;
use crate::qname::{QName, URI_XSI};
use crate::schema::{ElementId, TypeDef, TypeId};
use crate::{Error, Result};

/// The qname of xsi:type.
pub(crate) fn xsi_type_qname() -> QName {
    QName::new(URI_XSI, "type")
}

/// The qname of xsi:nil.
pub(crate) fn xsi_nil_qname() -> QName {
    QName::new(URI_XSI, "nil")
}

/// Document-level phase (Spec 8.5.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocPhase {
    /// Before SD.
    Start,
    /// Between SD and the root element's EE.
    Content,
    /// After the root element closed; ED pending.
    End,
    /// After ED: no more events.
    Done,
}

/// One open element (Spec 8.4 grammar instance).
#[derive(Debug, Clone)]
pub(crate) struct Frame {
    /// Current grammar node (the production cursor).
    node: GrammarNodeId,
    /// Declared element, when matched through a declared production.
    pub(crate) element: Option<ElementId>,
    /// Effective type: declared, or substituted after xsi:type.
    pub(crate) type_id: Option<TypeId>,
    nillable: bool,
    tp_seen: bool,
    nil_seen: bool,
    /// xsi:nil="true" active: only AT and EE remain legal (Spec 8.5.4.4.2).
    nil_content: bool,
    /// A schema deviation consumed the start-tag phase.
    content_started: bool,
    /// Occurrence mask for xs:all members (Spec 8.5.4.1.8).
    all_mask: u64,
}

/// The per-session state machine. Holds an immutable reference to the
/// shared cache; all mutable state lives in the explicit stack.
pub struct StateMachine<'g> {
    cache: &'g GrammarCache,
    phase: DocPhase,
    stack: Vec<Frame>,
}

impl<'g> StateMachine<'g> {
    /// A fresh machine at the Initial(SD) state.
    pub fn new(cache: &'g GrammarCache) -> Self {
        Self { cache, phase: DocPhase::Start, stack: Vec::new() }
    }

    fn options(&self) -> GrammarOptions {
        self.cache.options()
    }

    /// Element nesting depth.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// True once ED was consumed.
    pub fn is_done(&self) -> bool {
        self.phase == DocPhase::Done
    }

    /// Diagnostic label of the current state (Spec 6.1 error context).
    pub fn state_name(&self) -> &'static str {
        match self.phase {
            DocPhase::Start => "Document",
            DocPhase::End => "DocEnd",
            DocPhase::Done => "Done",
            DocPhase::Content => match self.stack.last() {
                None => "DocContent",
                Some(f) => self.cache.grammars().node(f.node).name(),
            },
        }
    }

    fn frame(&self) -> &Frame {
        self.stack.last().expect("no open element")
    }

    fn frame_mut(&mut self) -> &mut Frame {
        self.stack.last_mut().expect("no open element")
    }

    pub(crate) fn current_frame(&self) -> Option<&Frame> {
        self.stack.last()
    }

    // ========================================================================
    // Event type list resolution (Spec 6.1, 8.5.4.4)
    // ========================================================================

    /// The event type list currently in force — a pure function of
    /// (phase, stack top, options).
    pub fn current_list(&self) -> EventTypeList {
        match self.phase {
            DocPhase::Start => EventTypeList::new(vec![entry(EventKind::StartDocument, 1)]),
            DocPhase::Done => EventTypeList::new(Vec::new()),
            DocPhase::End => {
                let mut items = vec![entry(EventKind::EndDocument, 1)];
                self.push_fidelity(&mut items);
                EventTypeList::new(items)
            }
            DocPhase::Content => match self.stack.last() {
                None => self.doc_content_list(),
                Some(frame) => self.element_list(frame),
            },
        }
    }

    /// Root element choices (Spec 8.5.1): global elements in schema order,
    /// SE(*) fallback when lenient.
    fn doc_content_list(&self) -> EventTypeList {
        let corpus = self.cache.corpus();
        let mut items = Vec::new();
        for &elem in corpus.global_elements() {
            let decl = corpus.element(elem);
            items.push(EventType {
                kind: EventKind::StartElement(elem),
                qname: Some(Rc::new(decl.qname())),
                type_id: Some(decl.type_id),
                index: 0,
                depth: 1,
                next: None,
            });
        }
        if !self.options().is_strict() {
            items.push(entry(EventKind::StartElementWildcard, 2));
        }
        self.push_fidelity(&mut items);
        EventTypeList::new(items)
    }

    /// Element-level list (Spec 8.5.4.4): see module docs for the canonical
    /// depth ordering.
    fn element_list(&self, frame: &Frame) -> EventTypeList {
        let corpus = self.cache.corpus();
        let grammars = self.cache.grammars();
        let node = grammars.node(frame.node);
        let strict = self.options().is_strict();
        let at_ok = node.at_phase && !frame.content_started;

        let mut items: Vec<EventType> = Vec::new();

        // TP/NL: Singletons am Start-Tag, Index 0 bzw. dahinter (Spec 8.5.4.4.2)
        if at_ok && !frame.tp_seen {
            let offered = if strict {
                frame
                    .type_id
                    .is_some_and(|t| type_admits_xsi_type(corpus, t))
            } else {
                true
            };
            if offered && !(strict && frame.nil_seen) {
                items.push(entry(EventKind::TypeCast, 1));
            }
        }
        if at_ok && !frame.nil_seen {
            let offered = if strict { frame.nillable } else { true };
            if offered && !(strict && frame.tp_seen) {
                items.push(entry(EventKind::Nil, 1));
            }
        }

        // Schema-declared productions in node order: SE, then AT, then CH
        let (prods, node_ee) = self.effective_productions(frame, node);
        for p in prods.iter() {
            if let ProdEvent::Se(elem) = p.event {
                if frame.nil_content {
                    continue;
                }
                let decl = corpus.element(elem);
                items.push(EventType {
                    kind: EventKind::StartElement(elem),
                    qname: Some(Rc::new(decl.qname())),
                    type_id: Some(decl.type_id),
                    index: 0,
                    depth: 1,
                    next: Some(p.next),
                });
            } else if let ProdEvent::SeNs(constraint) = &p.event {
                if !frame.nil_content {
                    items.push(EventType {
                        kind: EventKind::StartElementNs(constraint.clone()),
                        qname: None,
                        type_id: None,
                        index: 0,
                        depth: 1,
                        next: Some(p.next),
                    });
                }
            }
        }
        for p in prods.iter() {
            if let ProdEvent::At(attr) = p.event {
                if !at_ok {
                    continue;
                }
                let decl = corpus.attribute(attr);
                items.push(EventType {
                    kind: EventKind::Attribute(attr),
                    qname: Some(Rc::new(decl.qname())),
                    type_id: Some(decl.type_id),
                    index: 0,
                    depth: 1,
                    next: Some(p.next),
                });
            }
        }
        for p in prods.iter() {
            match p.event {
                ProdEvent::Ch(type_id) if !frame.nil_content => {
                    items.push(EventType {
                        kind: EventKind::Characters(type_id),
                        qname: None,
                        type_id: Some(type_id),
                        index: 0,
                        depth: 1,
                        next: Some(p.next),
                    });
                }
                ProdEvent::ChUntyped if !frame.nil_content => {
                    items.push(EventType {
                        kind: EventKind::CharactersUntyped,
                        qname: None,
                        type_id: None,
                        index: 0,
                        depth: 1,
                        next: Some(p.next),
                    });
                }
                _ => {}
            }
        }

        if node_ee || frame.nil_content {
            items.push(entry(EventKind::EndElement, 1));
        }

        // Depth 2: schema attribute wildcard first, then lenient fallbacks
        // and fidelity events (Spec 8.5.4.4.1).
        if at_ok {
            if let Some(constraint) = self.attribute_wildcard_of(frame) {
                items.push(EventType {
                    kind: EventKind::AttributeNs(constraint),
                    qname: None,
                    type_id: None,
                    index: 0,
                    depth: 2,
                    next: None,
                });
            }
            if !strict {
                items.push(entry(EventKind::AttributeWildcard, 2));
            }
            if self.options().has(GrammarOptions::PRESERVE_PREFIXES) {
                items.push(entry(EventKind::NamespaceDecl, 2));
            }
            if self.options().has(GrammarOptions::SELF_CONTAINED) {
                items.push(entry(EventKind::SelfContained, 2));
            }
        }
        if !strict && !frame.nil_content {
            items.push(entry(EventKind::StartElementWildcard, 2));
            items.push(entry(EventKind::CharactersUntyped, 2));
        }
        if self.options().has(GrammarOptions::PRESERVE_DTD) {
            items.push(entry(EventKind::EntityReference, 2));
        }
        self.push_fidelity(&mut items);

        EventTypeList::new(items)
    }

    /// CM/PI at depth 3 (fidelity options, Spec 6.3).
    fn push_fidelity(&self, items: &mut Vec<EventType>) {
        if self.options().has(GrammarOptions::PRESERVE_COMMENTS) {
            items.push(entry(EventKind::Comment, 3));
        }
        if self.options().has(GrammarOptions::PRESERVE_PIS) {
            items.push(entry(EventKind::ProcessingInstruction, 3));
        }
    }

    /// Productions and EE validity of the frame's node, with xs:all nodes
    /// resolved against the frame's occurrence mask (Spec 8.5.4.1.8).
    fn effective_productions(
        &self,
        frame: &Frame,
        node: &crate::grammar::GrammarNode,
    ) -> (Vec<Production>, bool) {
        match &node.kind {
            NodeKind::Regular => (node.productions().to_vec(), node.ee_valid()),
            NodeKind::All { members, follow, skippable } => {
                let mut prods = Vec::new();
                for (i, m) in members.iter().enumerate() {
                    if frame.all_mask & (1u64 << i) == 0 {
                        prods.push(Production {
                            event: ProdEvent::Se(m.element),
                            next: frame.node,
                        });
                    }
                }
                // Nicht-SE-Extras des Knotens (mixed-content CH)
                for p in node.productions() {
                    if !matches!(p.event, ProdEvent::Se(_)) {
                        prods.push(p.clone());
                    }
                }
                let complete = members
                    .iter()
                    .enumerate()
                    .all(|(i, m)| !m.required || frame.all_mask & (1u64 << i) != 0);
                let open = (frame.all_mask == 0 && *skippable) || complete;
                let mut ee = false;
                if open {
                    let follow_node = self.cache.grammars().node(*follow);
                    prods.extend(follow_node.productions().iter().cloned());
                    ee = follow_node.ee_valid();
                }
                (prods, ee)
            }
        }
    }

    /// The effective type's attribute wildcard, if it declares one.
    fn attribute_wildcard_of(
        &self,
        frame: &Frame,
    ) -> Option<crate::schema::NamespaceConstraint> {
        let type_id = frame.type_id?;
        match self.cache.corpus().type_def(type_id) {
            TypeDef::Complex(c) => c.attribute_wildcard.clone(),
            TypeDef::Simple(_) => None,
        }
    }

    // ========================================================================
    // Transitions (Spec 8.4)
    // ========================================================================

    /// SD: Initial → DocContent.
    pub fn apply_start_document(&mut self) -> Result<()> {
        debug_assert_eq!(self.phase, DocPhase::Start);
        self.phase = DocPhase::Content;
        Ok(())
    }

    /// ED: DocEnd → Done.
    pub fn apply_end_document(&mut self) -> Result<()> {
        debug_assert_eq!(self.phase, DocPhase::End);
        self.phase = DocPhase::Done;
        Ok(())
    }

    /// SE: pushes a frame for the matched child (Spec 8.4). For wildcard
    /// matches the declaration is resolved by qname when the corpus knows
    /// a global element of that name; otherwise the child is untyped.
    pub fn apply_start_element(&mut self, matched: &EventType, qname: &QName) -> Result<()> {
        let corpus = self.cache.corpus();
        let grammars = self.cache.grammars();

        let (element, type_id, node) = match &matched.kind {
            EventKind::StartElement(elem) => {
                let decl = corpus.element(*elem);
                (Some(*elem), Some(decl.type_id), grammars.type_start(decl.type_id))
            }
            EventKind::StartElementNs(_) | EventKind::StartElementWildcard => {
                match corpus.element_by_name(&qname.uri, &qname.local_name) {
                    Some(elem) => {
                        let decl = corpus.element(elem);
                        (Some(elem), Some(decl.type_id), grammars.type_start(decl.type_id))
                    }
                    None => (None, None, grammars.untyped_start()),
                }
            }
            _ => {
                return Err(Error::UnexpectedElement { qname: qname.clone() });
            }
        };

        // Elternkontext fortschalten
        if let Some(parent) = self.stack.last_mut() {
            let parent_node = grammars.node(parent.node);
            if let NodeKind::All { members, .. } = &parent_node.kind {
                if let EventKind::StartElement(elem) = &matched.kind {
                    if let Some(i) = members.iter().position(|m| m.element == *elem) {
                        parent.all_mask |= 1u64 << i;
                    }
                }
                parent.content_started = true;
            } else if let Some(next) = matched.next {
                parent.node = next;
                parent.content_started = true;
            } else {
                // Deviation (SE(*) auf Tiefe 2): Positionscursor bleibt stehen
                parent.content_started = true;
                if parent_node.untyped {
                    parent.node = grammars.untyped_content();
                }
            }
        }

        let nillable = element.is_some_and(|e| corpus.element(e).nillable);
        self.stack.push(Frame {
            node,
            element,
            type_id,
            nillable,
            tp_seen: false,
            nil_seen: false,
            nil_content: false,
            content_started: false,
            all_mask: 0,
        });
        Ok(())
    }

    /// EE: pops the current frame; an empty stack moves to DocEnd.
    pub fn apply_end_element(&mut self) -> Result<()> {
        self.stack.pop().expect("EE without open element");
        if self.stack.is_empty() {
            self.phase = DocPhase::End;
        }
        Ok(())
    }

    /// AT: advances the attribute cursor for declared matches; wildcard
    /// matches leave the cursor in place.
    pub fn apply_attribute(&mut self, matched: &EventType) -> Result<()> {
        if let Some(next) = matched.next {
            self.frame_mut().node = next;
        }
        Ok(())
    }

    /// CH: advances per the matched production; a depth-2 deviation only
    /// closes the start-tag phase.
    pub fn apply_characters(&mut self, matched: &EventType) -> Result<()> {
        let untyped_content = self.cache.grammars().untyped_content();
        let is_untyped_node = {
            let frame = self.frame();
            self.cache.grammars().node(frame.node).untyped
        };
        let frame = self.frame_mut();
        if let Some(next) = matched.next {
            frame.node = next;
        } else if is_untyped_node {
            frame.node = untyped_content;
        }
        frame.content_started = true;
        Ok(())
    }

    /// NL (Spec 8.5.4.4.2): marks the element nil; `true` restricts the
    /// remaining content to attributes and EE. Strict mode rejects NL after
    /// TP with the unexpected-attribute error.
    pub fn apply_nil(&mut self, value: bool) -> Result<()> {
        let strict = self.options().is_strict();
        let frame = self.frame_mut();
        if strict && frame.tp_seen {
            return Err(Error::UnexpectedAttribute { qname: xsi_nil_qname() });
        }
        frame.nil_seen = true;
        if value {
            frame.nil_content = true;
        }
        Ok(())
    }

    /// TP (Spec 8.5.4.4): substitutes the frame's grammar with the named
    /// type's. The list for the TP event itself came from the original
    /// grammar; subsequent lists are computed against the substituted one.
    pub fn apply_type_cast(&mut self, target: TypeId) -> Result<()> {
        let strict = self.options().is_strict();
        let node = self.cache.grammars().type_start(target);
        let frame = self.frame_mut();
        if strict && frame.nil_seen {
            return Err(Error::UnexpectedAttribute { qname: xsi_type_qname() });
        }
        frame.tp_seen = true;
        frame.type_id = Some(target);
        frame.node = node;
        frame.all_mask = 0;
        Ok(())
    }

    /// Resolves an xsi:type target qname against the corpus (Spec 8.5.4.4).
    /// Strict requires the named type to be derivation-reachable from the
    /// declared type; lenient accepts any named type in the corpus.
    pub fn resolve_type_cast(&self, target: &QName) -> Result<TypeId> {
        let corpus = self.cache.corpus();
        let Some(named) = corpus.type_by_name(&target.uri, &target.local_name) else {
            return Err(Error::XsiTypeNotFound(target.to_string()));
        };
        if self.options().is_strict() {
            let declared = self.frame().type_id;
            let reachable = declared.is_some_and(|d| corpus.derives_from(named, d));
            if !reachable {
                return Err(Error::UnexpectedAttribute { qname: xsi_type_qname() });
            }
        }
        Ok(named)
    }

    /// CM/PI/ER: no grammar state change (Spec 8.3).
    pub fn apply_misc(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Eintrag ohne QName/Typ (Strukturevents, Wildcards, Fidelity).
fn entry(kind: EventKind, depth: u8) -> EventType {
    EventType { kind, qname: None, type_id: None, index: 0, depth, next: None }
}

/// Strict admissibility of xsi:type on a declared type (Spec 8.5.4.4.2):
/// named subtypes reachable, or a union type.
fn type_admits_xsi_type(corpus: &crate::schema::SchemaCorpus, type_id: TypeId) -> bool {
    match corpus.type_def(type_id) {
        TypeDef::Simple(s) => {
            s.has_named_subtypes || matches!(s.variety, crate::schema::Variety::Union { .. })
        }
        TypeDef::Complex(c) => c.has_named_subtypes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        ComplexType, ContentModel, DatatypeSerial, Particle, SchemaBuilder, Term,
    };

    fn cache_with_root(strict: bool) -> GrammarCache {
        let mut b = SchemaBuilder::new();
        let s = b.builtin(DatatypeSerial::String);
        b.element("", "A", s);
        let opts = if strict { GrammarOptions::STRICT } else { GrammarOptions::DEFAULT };
        GrammarCache::build(b.build().unwrap(), opts).unwrap()
    }

    #[test]
    fn dokument_phasen() {
        let cache = cache_with_root(true);
        let mut sm = StateMachine::new(&cache);

        let list = sm.current_list();
        assert_eq!(list.len(), 1);
        assert_eq!(list.get(0).unwrap().kind, EventKind::StartDocument);
        sm.apply_start_document().unwrap();

        let list = sm.current_list();
        let se = list.match_start_element(&QName::new("", "A")).unwrap().clone();
        sm.apply_start_element(&se, &QName::new("", "A")).unwrap();
        assert_eq!(sm.depth(), 1);

        sm.apply_end_element().unwrap();
        let list = sm.current_list();
        assert_eq!(list.get(0).unwrap().kind, EventKind::EndDocument);
        sm.apply_end_document().unwrap();
        assert!(sm.is_done());
        assert!(sm.current_list().is_empty());
    }

    /// Strict: keine Wildcard-Fallbacks auf Dokumentebene (Spec 8.5.4.4.2).
    #[test]
    fn strict_ohne_wildcards() {
        let cache = cache_with_root(true);
        let mut sm = StateMachine::new(&cache);
        sm.apply_start_document().unwrap();
        let list = sm.current_list();
        assert!(list.find_kind(&EventKind::StartElementWildcard).is_none());

        let lenient = cache_with_root(false);
        let mut sm = StateMachine::new(&lenient);
        sm.apply_start_document().unwrap();
        assert!(sm
            .current_list()
            .find_kind(&EventKind::StartElementWildcard)
            .is_some());
    }

    /// Spec 8.5.4.4.2: TP an Index 0, NL direkt dahinter (lenient).
    #[test]
    fn tp_vor_nl_am_start_tag() {
        let cache = cache_with_root(false);
        let mut sm = StateMachine::new(&cache);
        sm.apply_start_document().unwrap();
        let se = sm
            .current_list()
            .match_start_element(&QName::new("", "A"))
            .unwrap()
            .clone();
        sm.apply_start_element(&se, &QName::new("", "A")).unwrap();

        let list = sm.current_list();
        assert_eq!(list.get(0).unwrap().kind, EventKind::TypeCast);
        assert_eq!(list.get(1).unwrap().kind, EventKind::Nil);
    }

    /// Strict + nicht-nillable + Typ ohne Subtypen: weder TP noch NL.
    #[test]
    fn strict_ohne_tp_nl() {
        let mut b = SchemaBuilder::new();
        // Leaf-Typ ohne benannte Subtypen
        let leaf = b.simple_type(Some(("", "Leaf")), b.builtin(DatatypeSerial::String));
        b.element("", "A", leaf);
        let cache = GrammarCache::build(b.build().unwrap(), GrammarOptions::STRICT).unwrap();
        let mut sm = StateMachine::new(&cache);
        sm.apply_start_document().unwrap();
        let se = sm
            .current_list()
            .match_start_element(&QName::new("", "A"))
            .unwrap()
            .clone();
        sm.apply_start_element(&se, &QName::new("", "A")).unwrap();

        let list = sm.current_list();
        assert!(list.find_kind(&EventKind::TypeCast).is_none());
        assert!(list.find_kind(&EventKind::Nil).is_none());
    }

    /// Strict + nillable: NL vorhanden, verschwindet nach Konsum.
    #[test]
    fn nillable_strict_nl() {
        let mut b = SchemaBuilder::new();
        let s = b.builtin(DatatypeSerial::String);
        b.nillable_element("", "A", s);
        let cache = GrammarCache::build(b.build().unwrap(), GrammarOptions::STRICT).unwrap();
        let mut sm = StateMachine::new(&cache);
        sm.apply_start_document().unwrap();
        let se = sm
            .current_list()
            .match_start_element(&QName::new("", "A"))
            .unwrap()
            .clone();
        sm.apply_start_element(&se, &QName::new("", "A")).unwrap();

        assert!(sm.current_list().find_kind(&EventKind::Nil).is_some());
        sm.apply_nil(true).unwrap();

        let list = sm.current_list();
        assert!(list.find_kind(&EventKind::Nil).is_none());
        // Nach xsi:nil="true" nur noch EE (Spec 8.5.4.4.2)
        assert!(list.end_element().is_some());
        assert!(list.find_kind(&EventKind::Characters(s_type(&cache))).is_none());
    }

    fn s_type(cache: &GrammarCache) -> TypeId {
        cache.corpus().builtin(DatatypeSerial::String)
    }

    /// Spec 8.5.4.4.2: strict lehnt TP nach NL ab (UNEXPECTED_ATTR).
    #[test]
    fn strict_tp_nach_nl_abgelehnt() {
        let mut b = SchemaBuilder::new();
        let base = b.simple_type(Some(("", "Base")), b.builtin(DatatypeSerial::String));
        let _sub = b.simple_type(Some(("", "Sub")), base);
        b.nillable_element("", "A", base);
        let cache = GrammarCache::build(b.build().unwrap(), GrammarOptions::STRICT).unwrap();
        let mut sm = StateMachine::new(&cache);
        sm.apply_start_document().unwrap();
        let se = sm
            .current_list()
            .match_start_element(&QName::new("", "A"))
            .unwrap()
            .clone();
        sm.apply_start_element(&se, &QName::new("", "A")).unwrap();

        sm.apply_nil(false).unwrap();
        let sub = cache.corpus().type_by_name("", "Sub").unwrap();
        assert!(matches!(
            sm.apply_type_cast(sub).unwrap_err(),
            Error::UnexpectedAttribute { .. }
        ));
    }

    /// Lenient: TP + NL koexistieren; TP substituiert die Grammar.
    #[test]
    fn lenient_tp_und_nl() {
        let mut b = SchemaBuilder::new();
        let base = b.simple_type(Some(("", "Base")), b.builtin(DatatypeSerial::String));
        let sub = b.simple_type(Some(("", "Sub")), base);
        b.element("", "A", base);
        let cache = GrammarCache::build(b.build().unwrap(), GrammarOptions::DEFAULT).unwrap();
        let mut sm = StateMachine::new(&cache);
        sm.apply_start_document().unwrap();
        let se = sm
            .current_list()
            .match_start_element(&QName::new("", "A"))
            .unwrap()
            .clone();
        sm.apply_start_element(&se, &QName::new("", "A")).unwrap();

        let resolved = sm.resolve_type_cast(&QName::new("", "Sub")).unwrap();
        assert_eq!(resolved, sub);
        sm.apply_type_cast(resolved).unwrap();

        // Nach TP: NL an niedrigem Index, TP nicht mehr angeboten
        let list = sm.current_list();
        assert_eq!(list.get(0).unwrap().kind, EventKind::Nil);
        assert!(list.find_kind(&EventKind::TypeCast).is_none());
        sm.apply_nil(true).unwrap();
        assert!(sm.current_list().end_element().is_some());
    }

    /// Strict: xsi:type auf nicht ableitungs-erreichbaren Typ → UNEXPECTED_ATTR.
    #[test]
    fn strict_type_cast_nicht_erreichbar() {
        let mut b = SchemaBuilder::new();
        let base = b.simple_type(Some(("", "Base")), b.builtin(DatatypeSerial::String));
        let _sub = b.simple_type(Some(("", "Sub")), base);
        b.simple_type(Some(("", "Other")), b.builtin(DatatypeSerial::Integer));
        b.element("", "A", base);
        let cache = GrammarCache::build(b.build().unwrap(), GrammarOptions::STRICT).unwrap();
        let mut sm = StateMachine::new(&cache);
        sm.apply_start_document().unwrap();
        let se = sm
            .current_list()
            .match_start_element(&QName::new("", "A"))
            .unwrap()
            .clone();
        sm.apply_start_element(&se, &QName::new("", "A")).unwrap();

        assert!(matches!(
            sm.resolve_type_cast(&QName::new("", "Other")).unwrap_err(),
            Error::UnexpectedAttribute { .. }
        ));
        // Lenient akzeptiert denselben Cast
        let lenient = {
            let mut b = SchemaBuilder::new();
            let base = b.simple_type(Some(("", "Base")), b.builtin(DatatypeSerial::String));
            b.simple_type(Some(("", "Other")), b.builtin(DatatypeSerial::Integer));
            b.element("", "A", base);
            GrammarCache::build(b.build().unwrap(), GrammarOptions::DEFAULT).unwrap()
        };
        let mut sm = StateMachine::new(&lenient);
        sm.apply_start_document().unwrap();
        let se = sm
            .current_list()
            .match_start_element(&QName::new("", "A"))
            .unwrap()
            .clone();
        sm.apply_start_element(&se, &QName::new("", "A")).unwrap();
        let other = lenient.corpus().type_by_name("", "Other").unwrap();
        assert_eq!(sm.resolve_type_cast(&QName::new("", "Other")).unwrap(), other);
    }

    /// xs:all: Mitglieder verschwinden nach Konsum, EE erst nach Pflichtteilen.
    #[test]
    fn all_gruppe_maske() {
        let mut b = SchemaBuilder::new();
        let s = b.builtin(DatatypeSerial::String);
        let ea = b.local_element("", "a", s);
        let eb = b.local_element("", "b", s);
        let ct = b.complex_type(ComplexType {
            name: Some(("".into(), "T".into())),
            base: None,
            derivation: None,
            attributes: Vec::new(),
            attribute_wildcard: None,
            content: ContentModel::ElementOnly(Particle::required(Term::All(vec![
                Particle::required(Term::Element(ea)),
                Particle::required(Term::Element(eb)),
            ]))),
            has_named_subtypes: false,
        });
        b.element("", "root", ct);
        let cache = GrammarCache::build(b.build().unwrap(), GrammarOptions::STRICT).unwrap();
        let mut sm = StateMachine::new(&cache);
        sm.apply_start_document().unwrap();
        let root_q = QName::new("", "root");
        let se = sm.current_list().match_start_element(&root_q).unwrap().clone();
        sm.apply_start_element(&se, &root_q).unwrap();

        // Beide Mitglieder verfügbar, kein EE
        let list = sm.current_list();
        assert!(list.match_start_element(&QName::new("", "a")).is_some());
        assert!(list.match_start_element(&QName::new("", "b")).is_some());
        assert!(list.end_element().is_none());

        // b zuerst (beliebige Permutation), dann nur noch a
        let q_b = QName::new("", "b");
        let se_b = sm.current_list().match_start_element(&q_b).unwrap().clone();
        sm.apply_start_element(&se_b, &q_b).unwrap();
        sm.apply_end_element().unwrap();

        let list = sm.current_list();
        assert!(list.match_start_element(&q_b).is_none(), "b darf nicht wiederholen");
        assert!(list.end_element().is_none(), "a ist noch Pflicht");

        let q_a = QName::new("", "a");
        let se_a = sm.current_list().match_start_element(&q_a).unwrap().clone();
        sm.apply_start_element(&se_a, &q_a).unwrap();
        sm.apply_end_element().unwrap();
        assert!(sm.current_list().end_element().is_some());
    }

    /// Wildcard-SE auf unbekanntes Element → Untyped-Grammar.
    #[test]
    fn wildcard_push_untyped() {
        let cache = cache_with_root(false);
        let mut sm = StateMachine::new(&cache);
        sm.apply_start_document().unwrap();
        let q = QName::new("urn:unknown", "mystery");
        let se = sm.current_list().match_start_element(&q).unwrap().clone();
        assert_eq!(se.kind, EventKind::StartElementWildcard);
        sm.apply_start_element(&se, &q).unwrap();

        let list = sm.current_list();
        assert!(list.end_element().is_some());
        assert!(list.find_kind(&EventKind::StartElementWildcard).is_some());
        assert!(list.find_kind(&EventKind::CharactersUntyped).is_some());
        // CH verlässt die Start-Tag-Phase
        let ch = list.find_kind(&EventKind::CharactersUntyped).unwrap().clone();
        sm.apply_characters(&ch).unwrap();
        assert!(sm.current_list().find_kind(&EventKind::AttributeWildcard).is_none());
    }

    /// Liste ist reine Funktion des Zustands: zweifacher Abruf identisch.
    #[test]
    fn liste_ist_pur() {
        let cache = cache_with_root(false);
        let mut sm = StateMachine::new(&cache);
        sm.apply_start_document().unwrap();
        let a = sm.current_list();
        let b = sm.current_list();
        assert_eq!(a.items(), b.items());
    }
}
