//! Event model (Spec 4, Table 4-1) and per-state event type lists
//! (Spec 6.1, 8.2).
//!
//! [`ExiEvent`] is the public event surface consumed by the encoder and
//! produced by the decoder. [`EventType`] describes one *potential* event at
//! the current grammar state: its kind, optional qname, optional governing
//! type, its index within the [`EventTypeList`], and its event-code depth
//! (1–3). The list order is a pure function of (grammar node, options,
//! overrides) — see the state machine.

use std::rc::Rc;

use crate::grammar::GrammarNodeId;
use crate::qname::QName;
use crate::schema::{ElementId, NamespaceConstraint, TypeId};

/// Content for Attribute (AT) events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtContent {
    /// The qualified name of the attribute.
    pub qname: Rc<QName>,
    /// The attribute value (lexical form on the public surface).
    pub value: Rc<str>,
}

/// Content for Characters (CH) events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChContent {
    /// The character data.
    pub value: Rc<str>,
}

/// Content for Comment (CM) events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmContent {
    /// The comment text.
    pub text: Rc<str>,
}

/// Content for Processing Instruction (PI) events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PiContent {
    /// The PI target name.
    pub name: Rc<str>,
    /// The PI data.
    pub text: Rc<str>,
}

/// Content for Entity Reference (ER) events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErContent {
    /// The entity name.
    pub name: Rc<str>,
}

/// An event occurrence: produced by the decoder, consumed by the encoder
/// (Spec 4, Table 4-1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExiEvent {
    /// Start Document.
    StartDocument,
    /// End Document.
    EndDocument,
    /// Start Element with the given qname.
    StartElement(Rc<QName>),
    /// End Element.
    EndElement,
    /// Attribute with qname and value.
    Attribute(AtContent),
    /// Character data.
    Characters(ChContent),
    /// xsi:nil="true|false" (NL event, Spec 8.5.4.4).
    Nil(bool),
    /// xsi:type override naming the effective type (TP event, Spec 8.5.4.4).
    TypeCast(Rc<QName>),
    /// Comment (fidelity option).
    Comment(CmContent),
    /// Processing instruction (fidelity option).
    ProcessingInstruction(PiContent),
    /// Unexpanded entity reference (fidelity option).
    EntityReference(ErContent),
}

/// Item kind of a potential event (Spec 8.2 terminal symbols).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Start Document.
    StartDocument,
    /// End Document.
    EndDocument,
    /// Schema-declared SE(qname).
    StartElement(ElementId),
    /// Schema-declared element wildcard SE(uri:* / *) from the content model.
    StartElementNs(NamespaceConstraint),
    /// Lenient SE(*) fallback (Spec 8.5.4.4.1).
    StartElementWildcard,
    /// End Element.
    EndElement,
    /// Schema-declared AT(qname) with its governing type.
    Attribute(crate::schema::AttributeId),
    /// Schema-declared attribute wildcard AT(uri:* / *) (xs:anyAttribute).
    AttributeNs(NamespaceConstraint),
    /// Lenient untyped AT(*) fallback (Spec 8.5.4.4.1).
    AttributeWildcard,
    /// Schema-typed character content.
    Characters(TypeId),
    /// Untyped character content (mixed content / lenient fallback).
    CharactersUntyped,
    /// xsi:nil attribute (NL).
    Nil,
    /// xsi:type attribute (TP).
    TypeCast,
    /// Namespace declaration (prefix preservation).
    NamespaceDecl,
    /// Self-contained marker (reserved; processing unsupported).
    SelfContained,
    /// Comment.
    Comment,
    /// Processing instruction.
    ProcessingInstruction,
    /// Entity reference.
    EntityReference,
}

/// One potential event at the current grammar state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventType {
    pub kind: EventKind,
    /// Qualified name for SE(qname)/AT(qname) entries.
    pub qname: Option<Rc<QName>>,
    /// Governing simple type for typed AT/CH entries ("schema substance").
    pub type_id: Option<TypeId>,
    /// Position within the event type list (event code part at its depth).
    pub index: usize,
    /// Event-code depth 1–3: how many sub-codes the bitstream carries
    /// (Spec 6.2; wildcards and fidelity events sit at depth 2/3).
    pub depth: u8,
    /// Grammar node the state moves to after this event (None = handled
    /// structurally: SE pushes, EE pops, TP/NL substitute).
    pub next: Option<GrammarNodeId>,
}

/// Ordered, per-state list of potential events with O(1) indexed access and
/// O(1) EE lookup (Spec 6.1).
#[derive(Debug, Clone, Default)]
pub struct EventTypeList {
    items: Vec<EventType>,
    ee_index: Option<usize>,
    /// Anzahl Einträge je Tiefe (bestimmt die Event-Code-Breiten, Spec 6.2).
    depth_counts: [usize; 3],
}

impl EventTypeList {
    /// Builds a list from items in final order; indices are assigned here.
    pub(crate) fn new(mut items: Vec<EventType>) -> Self {
        let mut ee_index = None;
        let mut depth_counts = [0usize; 3];
        for (i, item) in items.iter_mut().enumerate() {
            item.index = i;
            if item.kind == EventKind::EndElement && item.depth == 1 && ee_index.is_none() {
                ee_index = Some(i);
            }
            depth_counts[(item.depth - 1) as usize] += 1;
        }
        Self { items, ee_index, depth_counts }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when no events are possible (terminal states only).
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Indexed access.
    pub fn get(&self, index: usize) -> Option<&EventType> {
        self.items.get(index)
    }

    /// All entries in order.
    pub fn items(&self) -> &[EventType] {
        &self.items
    }

    /// The depth-1 EE entry, if present.
    pub fn end_element(&self) -> Option<&EventType> {
        self.ee_index.map(|i| &self.items[i])
    }

    /// Entries per depth (1–3).
    pub fn depth_count(&self, depth: u8) -> usize {
        self.depth_counts[(depth - 1) as usize]
    }

    /// Position of an entry within its depth group (the sub-code value
    /// written to the stream, Spec 6.2).
    pub fn position_in_depth(&self, index: usize) -> usize {
        let depth = self.items[index].depth;
        self.items[..index].iter().filter(|e| e.depth == depth).count()
    }

    /// Entry at a (depth, position-in-depth) coordinate — the decoder's
    /// inverse of [`Self::position_in_depth`].
    pub fn at_depth_position(&self, depth: u8, position: usize) -> Option<&EventType> {
        self.items
            .iter()
            .filter(|e| e.depth == depth)
            .nth(position)
    }

    /// First matching declared SE entry for a qname, preferring exact
    /// matches over wildcards (Spec 8.5.4.4 match order).
    pub fn match_start_element(&self, qname: &QName) -> Option<&EventType> {
        self.items
            .iter()
            .find(|e| {
                matches!(e.kind, EventKind::StartElement(_))
                    && e.qname.as_deref().is_some_and(|q| q == qname)
            })
            .or_else(|| {
                self.items.iter().find(|e| match &e.kind {
                    EventKind::StartElementNs(constraint) => constraint.allows(&qname.uri),
                    _ => false,
                })
            })
            .or_else(|| {
                self.items
                    .iter()
                    .find(|e| e.kind == EventKind::StartElementWildcard)
            })
    }

    /// First matching declared AT entry for a qname, preferring exact
    /// matches over wildcards (Spec 8.5.4.4 match order).
    pub fn match_attribute(&self, qname: &QName) -> Option<&EventType> {
        self.items
            .iter()
            .find(|e| {
                matches!(e.kind, EventKind::Attribute(_))
                    && e.qname.as_deref().is_some_and(|q| q == qname)
            })
            .or_else(|| {
                self.items.iter().find(|e| match &e.kind {
                    EventKind::AttributeNs(constraint) => constraint.allows(&qname.uri),
                    _ => false,
                })
            })
            .or_else(|| {
                self.items
                    .iter()
                    .find(|e| e.kind == EventKind::AttributeWildcard)
            })
    }

    /// First entry of the given kind.
    pub fn find_kind(&self, kind: &EventKind) -> Option<&EventType> {
        self.items.iter().find(|e| &e.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn et(kind: EventKind, depth: u8) -> EventType {
        EventType { kind, qname: None, type_id: None, index: 0, depth, next: None }
    }

    #[test]
    fn indices_und_tiefen_zugewiesen() {
        let list = EventTypeList::new(vec![
            et(EventKind::EndElement, 1),
            et(EventKind::CharactersUntyped, 2),
            et(EventKind::Comment, 3),
            et(EventKind::ProcessingInstruction, 3),
        ]);
        assert_eq!(list.len(), 4);
        assert_eq!(list.get(1).unwrap().index, 1);
        assert_eq!(list.depth_count(1), 1);
        assert_eq!(list.depth_count(2), 1);
        assert_eq!(list.depth_count(3), 2);
    }

    #[test]
    fn ee_lookup_o1() {
        let list = EventTypeList::new(vec![
            et(EventKind::CharactersUntyped, 1),
            et(EventKind::EndElement, 1),
        ]);
        assert_eq!(list.end_element().unwrap().index, 1);

        let leer = EventTypeList::new(vec![et(EventKind::CharactersUntyped, 1)]);
        assert!(leer.end_element().is_none());
    }

    #[test]
    fn position_in_depth_und_inverse() {
        let list = EventTypeList::new(vec![
            et(EventKind::EndElement, 1),
            et(EventKind::StartElementWildcard, 2),
            et(EventKind::CharactersUntyped, 2),
            et(EventKind::Comment, 3),
        ]);
        assert_eq!(list.position_in_depth(0), 0);
        assert_eq!(list.position_in_depth(1), 0);
        assert_eq!(list.position_in_depth(2), 1);
        assert_eq!(list.position_in_depth(3), 0);

        assert_eq!(list.at_depth_position(2, 1).unwrap().index, 2);
        assert!(list.at_depth_position(2, 2).is_none());
    }

    /// Exakter QName-Match hat Vorrang vor Wildcards (Spec 8.5.4.4).
    #[test]
    fn se_match_exakt_vor_wildcard() {
        let q = Rc::new(QName::new("urn:x", "a"));
        let mut exact = et(EventKind::StartElement(ElementId(0)), 1);
        exact.qname = Some(q.clone());
        let list = EventTypeList::new(vec![
            et(EventKind::StartElementWildcard, 2),
            exact,
        ]);
        let hit = list.match_start_element(&q).unwrap();
        assert!(matches!(hit.kind, EventKind::StartElement(_)));

        let other = QName::new("urn:x", "b");
        let hit = list.match_start_element(&other).unwrap();
        assert_eq!(hit.kind, EventKind::StartElementWildcard);
    }

    #[test]
    fn se_ns_wildcard_constraint() {
        let list = EventTypeList::new(vec![et(
            EventKind::StartElementNs(NamespaceConstraint::Namespaces(vec!["urn:ok".into()])),
            1,
        )]);
        assert!(list.match_start_element(&QName::new("urn:ok", "x")).is_some());
        assert!(list.match_start_element(&QName::new("urn:nope", "x")).is_none());
    }

    #[test]
    fn at_match_exakt_vor_wildcard() {
        let q = Rc::new(QName::new("", "id"));
        let mut exact = et(EventKind::Attribute(crate::schema::AttributeId(0)), 1);
        exact.qname = Some(q.clone());
        let list = EventTypeList::new(vec![exact, et(EventKind::AttributeWildcard, 2)]);

        let hit = list.match_attribute(&q).unwrap();
        assert!(matches!(hit.kind, EventKind::Attribute(_)));
        let hit = list.match_attribute(&QName::new("", "other")).unwrap();
        assert_eq!(hit.kind, EventKind::AttributeWildcard);
    }
}
