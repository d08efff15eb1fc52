//! Schema corpus view (Spec 8.5).
//!
//! A read-only, arena-based index over a compiled schema: types, element and
//! attribute declarations, substitution groups and wildcards, addressed by
//! `u32` newtype ids. The corpus is what the grammar builder consumes; XSD
//! text parsing happens upstream and is not part of this crate.
//!
//! Built-in XML Schema types are pre-registered by [`SchemaBuilder::new`]
//! and carry a [`DatatypeSerial`] that selects the value codec (Spec 7.1,
//! Table 7-1).

use crate::qname::{QName, URI_XSD};
use crate::{Error, FastHashMap, Result};

// ============================================================================
// Ids
// ============================================================================

/// Arena index of a type definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) u32);

/// Arena index of an element declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub(crate) u32);

/// Arena index of an attribute declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttributeId(pub(crate) u32);

// ============================================================================
// Datatype serials (Spec 7.1, Table 7-1)
// ============================================================================

/// Well-known built-in type constants selecting the value codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum DatatypeSerial {
    /// Untyped / string-family values (string representation, Spec 7.1.10).
    String,
    Boolean,
    Decimal,
    Float,
    Double,
    Integer,
    /// Non-negative integers encode without a sign bit (Spec 7.1.6).
    NonNegativeInteger,
    Long,
    Int,
    DateTime,
    Date,
    Time,
    GYear,
    GYearMonth,
    GMonth,
    GMonthDay,
    GDay,
    Base64Binary,
    HexBinary,
    AnyUri,
    /// QName values (xsi:type payloads, Spec 7.1.7).
    QName,
    AnySimpleType,
}

impl DatatypeSerial {
    /// Built-in local name in the XSD namespace.
    pub fn local_name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Decimal => "decimal",
            Self::Float => "float",
            Self::Double => "double",
            Self::Integer => "integer",
            Self::NonNegativeInteger => "nonNegativeInteger",
            Self::Long => "long",
            Self::Int => "int",
            Self::DateTime => "dateTime",
            Self::Date => "date",
            Self::Time => "time",
            Self::GYear => "gYear",
            Self::GYearMonth => "gYearMonth",
            Self::GMonth => "gMonth",
            Self::GMonthDay => "gMonthDay",
            Self::GDay => "gDay",
            Self::Base64Binary => "base64Binary",
            Self::HexBinary => "hexBinary",
            Self::AnyUri => "anyURI",
            Self::QName => "QName",
            Self::AnySimpleType => "anySimpleType",
        }
    }

    fn all() -> &'static [DatatypeSerial] {
        &[
            Self::AnySimpleType,
            Self::String,
            Self::Boolean,
            Self::Decimal,
            Self::Float,
            Self::Double,
            Self::Integer,
            Self::NonNegativeInteger,
            Self::Long,
            Self::Int,
            Self::DateTime,
            Self::Date,
            Self::Time,
            Self::GYear,
            Self::GYearMonth,
            Self::GMonth,
            Self::GMonthDay,
            Self::GDay,
            Self::Base64Binary,
            Self::HexBinary,
            Self::AnyUri,
            Self::QName,
        ]
    }
}

// ============================================================================
// Type definitions
// ============================================================================

/// Art der Typableitung (XSD 1.0 Part 1 §3.4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivationKind {
    Extension,
    Restriction,
}

/// Variety of a simple type (XSD 1.0 Part 2 §4.1).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Variety {
    #[default]
    Atomic,
    /// Whitespace-separated list of `item`-typed values.
    List { item: TypeId },
    /// One of several member types; values encode through the string
    /// representation (Spec 7.1.10).
    Union { members: Vec<TypeId> },
}

/// A simple type definition (Spec 8.5.4.1.3.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleType {
    /// (uri, local-name) for named types, None for anonymous ones.
    pub name: Option<(String, String)>,
    /// Base type for derivation chains (None only for anySimpleType).
    pub base: Option<TypeId>,
    /// Codec selector (ultimate built-in ancestor).
    pub serial: DatatypeSerial,
    pub variety: Variety,
    /// Enumeration facet values in schema order (empty = not enumerated).
    pub enumeration: Vec<String>,
    /// Facet-derived integer bounds; ranges ≤ 4096 use n-bit coding
    /// (Spec 7.1.5 bounded case).
    pub bounds: Option<(i64, i64)>,
    /// Pattern facets present: booleans keep their 2-bit lexical coding
    /// (Spec 7.1.2).
    pub has_pattern_facets: bool,
    /// A named type derives from this one; xsi:type stays available under
    /// strict (Spec 8.5.4.4.2). Computed by [`SchemaBuilder::build`].
    pub has_named_subtypes: bool,
}

/// Content model of a complex type (Spec 8.5.4.1.3.2).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ContentModel {
    /// No children, no character content.
    #[default]
    Empty,
    /// Character content of the given simple type.
    Simple(TypeId),
    /// Element-only particle content.
    ElementOnly(Particle),
    /// Particle content with interleaved character data (untyped CH).
    Mixed(Particle),
}

/// Maximum occurrence bound of a particle (Spec 8.5.4.1.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxOccurs {
    Bounded(u32),
    Unbounded,
}

/// A content-model particle (Spec 8.5.4.1.5).
///
/// minOccurs beyond 1 and bounded maxOccurs beyond 1 are normalised by the
/// upstream compiler into repeated particles; the grammar builder relies on
/// minOccurs ∈ {0, 1}.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Particle {
    pub min_occurs: u32,
    pub max_occurs: MaxOccurs,
    pub term: Term,
}

impl Particle {
    /// Required single occurrence.
    pub fn required(term: Term) -> Self {
        Self { min_occurs: 1, max_occurs: MaxOccurs::Bounded(1), term }
    }

    /// Optional single occurrence.
    pub fn optional(term: Term) -> Self {
        Self { min_occurs: 0, max_occurs: MaxOccurs::Bounded(1), term }
    }

    /// Zero or more occurrences.
    pub fn repeated(term: Term) -> Self {
        Self { min_occurs: 0, max_occurs: MaxOccurs::Unbounded, term }
    }
}

/// A particle term (Spec 8.5.4.1.6 – 8.5.4.1.8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Element(ElementId),
    /// xs:any element wildcard.
    Wildcard(NamespaceConstraint),
    Sequence(Vec<Particle>),
    Choice(Vec<Particle>),
    /// xs:all group: any permutation, each particle at most once.
    All(Vec<Particle>),
}

/// Namespace constraint of a wildcard (Spec 8.5.4.1.7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceConstraint {
    /// ##any
    Any,
    /// ##other relative to the given namespaces.
    Not(Vec<String>),
    /// An explicit namespace list. Must not be empty.
    Namespaces(Vec<String>),
}

impl NamespaceConstraint {
    /// True when the constraint admits the given namespace URI.
    pub fn allows(&self, uri: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Not(excluded) => !excluded.iter().any(|e| e == uri),
            Self::Namespaces(list) => list.iter().any(|e| e == uri),
        }
    }
}

/// An attribute use within a complex type (Spec 8.5.4.1.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeUse {
    pub attribute: AttributeId,
    pub required: bool,
}

/// A complex type definition (Spec 8.5.4.1.3.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexType {
    pub name: Option<(String, String)>,
    pub base: Option<TypeId>,
    pub derivation: Option<DerivationKind>,
    /// Attribute uses; sorted by qname schema order in [`SchemaBuilder::build`]
    /// (Spec 8.5.4.1.4).
    pub attributes: Vec<AttributeUse>,
    /// xs:anyAttribute wildcard.
    pub attribute_wildcard: Option<NamespaceConstraint>,
    pub content: ContentModel,
    /// Computed by [`SchemaBuilder::build`].
    pub has_named_subtypes: bool,
}

/// A type definition: simple or complex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDef {
    Simple(SimpleType),
    Complex(ComplexType),
}

impl TypeDef {
    /// (uri, local-name) for named types.
    pub fn name(&self) -> Option<(&str, &str)> {
        let name = match self {
            Self::Simple(s) => s.name.as_ref(),
            Self::Complex(c) => c.name.as_ref(),
        };
        name.map(|(u, l)| (u.as_str(), l.as_str()))
    }

    /// Base type in the derivation chain.
    pub fn base(&self) -> Option<TypeId> {
        match self {
            Self::Simple(s) => s.base,
            Self::Complex(c) => c.base,
        }
    }

    /// True when a named type derives from this one (Spec 8.5.4.4.2).
    pub fn has_named_subtypes(&self) -> bool {
        match self {
            Self::Simple(s) => s.has_named_subtypes,
            Self::Complex(c) => c.has_named_subtypes,
        }
    }
}

/// An element declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementDecl {
    pub uri: String,
    pub local_name: String,
    pub type_id: TypeId,
    pub nillable: bool,
    /// Global declarations are document-root candidates and substitution
    /// targets; local ones exist only inside content models.
    pub global: bool,
    pub substitution_head: Option<ElementId>,
}

impl ElementDecl {
    /// QName of this declaration.
    pub fn qname(&self) -> QName {
        QName::new(&self.uri, &self.local_name)
    }
}

/// A global attribute declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDecl {
    pub uri: String,
    pub local_name: String,
    pub type_id: TypeId,
}

impl AttributeDecl {
    /// QName of this declaration.
    pub fn qname(&self) -> QName {
        QName::new(&self.uri, &self.local_name)
    }
}

// ============================================================================
// Corpus
// ============================================================================

/// The read-only schema corpus. Built once through [`SchemaBuilder`],
/// shared by all grammar caches and sessions (owned strings and indices
/// only, so the corpus is `Send + Sync`).
#[derive(Debug, Clone)]
pub struct SchemaCorpus {
    types: Vec<TypeDef>,
    elements: Vec<ElementDecl>,
    attributes: Vec<AttributeDecl>,
    /// Global elements in qname schema order (document grammar root choices,
    /// Spec 8.5.1).
    global_elements: Vec<ElementId>,
    type_by_name: FastHashMap<(Box<str>, Box<str>), TypeId>,
    element_by_name: FastHashMap<(Box<str>, Box<str>), ElementId>,
    attribute_by_name: FastHashMap<(Box<str>, Box<str>), AttributeId>,
    substitution_groups: FastHashMap<ElementId, Vec<ElementId>>,
    builtins: FastHashMap<DatatypeSerial, TypeId>,
    /// Distinct namespace URIs in registration order (string table seeds).
    uris: Vec<String>,
}

impl SchemaCorpus {
    /// Type definition by id.
    pub fn type_def(&self, id: TypeId) -> &TypeDef {
        &self.types[id.0 as usize]
    }

    /// Number of type definitions (ids are dense from 0).
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Element declaration by id.
    pub fn element(&self, id: ElementId) -> &ElementDecl {
        &self.elements[id.0 as usize]
    }

    /// Attribute declaration by id.
    pub fn attribute(&self, id: AttributeId) -> &AttributeDecl {
        &self.attributes[id.0 as usize]
    }

    /// The built-in type for a serial.
    pub fn builtin(&self, serial: DatatypeSerial) -> TypeId {
        self.builtins[&serial]
    }

    /// Named type lookup.
    pub fn type_by_name(&self, uri: &str, local_name: &str) -> Option<TypeId> {
        self.type_by_name.get(&(Box::from(uri), Box::from(local_name))).copied()
    }

    /// Global element lookup.
    pub fn element_by_name(&self, uri: &str, local_name: &str) -> Option<ElementId> {
        self.element_by_name.get(&(Box::from(uri), Box::from(local_name))).copied()
    }

    /// Global attribute lookup.
    pub fn attribute_by_name(&self, uri: &str, local_name: &str) -> Option<AttributeId> {
        self.attribute_by_name.get(&(Box::from(uri), Box::from(local_name))).copied()
    }

    /// Global elements in qname schema order (Spec 8.5.1).
    pub fn global_elements(&self) -> &[ElementId] {
        &self.global_elements
    }

    /// Substitution group members of a head element (direct members).
    pub fn substitution_members(&self, head: ElementId) -> &[ElementId] {
        self.substitution_groups.get(&head).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The codec serial governing a type's values: simple types report their
    /// own serial, complex types with simple content their content type's.
    pub fn serial_of(&self, id: TypeId) -> DatatypeSerial {
        match self.type_def(id) {
            TypeDef::Simple(s) => s.serial,
            TypeDef::Complex(c) => match c.content {
                ContentModel::Simple(inner) => self.serial_of(inner),
                _ => DatatypeSerial::String,
            },
        }
    }

    /// The simple type governing character content of `id`, if any.
    pub fn content_simple_type(&self, id: TypeId) -> Option<TypeId> {
        match self.type_def(id) {
            TypeDef::Simple(_) => Some(id),
            TypeDef::Complex(c) => match c.content {
                ContentModel::Simple(inner) => Some(inner),
                _ => None,
            },
        }
    }

    /// True when `sub` is `base` or reachable from it via the base-type
    /// chain (xsi:type admissibility under strict, Spec 8.5.4.4).
    pub fn derives_from(&self, sub: TypeId, base: TypeId) -> bool {
        let mut current = Some(sub);
        while let Some(id) = current {
            if id == base {
                return true;
            }
            current = self.type_def(id).base();
        }
        false
    }

    /// Distinct namespace URIs in registration order.
    pub fn uris(&self) -> &[String] {
        &self.uris
    }

    /// Alle lokalen Namen (Elemente, Attribute, Typen) einer URI,
    /// dedupliziert und sortiert (String-Table-Seeds, Spec 7.3.2).
    pub fn local_names_of(&self, uri: &str) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for e in &self.elements {
            if e.uri == uri {
                names.push(&e.local_name);
            }
        }
        for a in &self.attributes {
            if a.uri == uri {
                names.push(&a.local_name);
            }
        }
        for t in &self.types {
            if let Some((u, l)) = t.name() {
                if u == uri {
                    names.push(l);
                }
            }
        }
        names.sort_unstable();
        names.dedup();
        names
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Programmatic corpus construction. Seeds the XSD built-in types, then
/// registers user types, elements and attributes; [`SchemaBuilder::build`]
/// validates and derives the computed fields.
pub struct SchemaBuilder {
    types: Vec<TypeDef>,
    elements: Vec<ElementDecl>,
    attributes: Vec<AttributeDecl>,
    type_by_name: FastHashMap<(Box<str>, Box<str>), TypeId>,
    element_by_name: FastHashMap<(Box<str>, Box<str>), ElementId>,
    attribute_by_name: FastHashMap<(Box<str>, Box<str>), AttributeId>,
    substitution_groups: FastHashMap<ElementId, Vec<ElementId>>,
    builtins: FastHashMap<DatatypeSerial, TypeId>,
}

impl SchemaBuilder {
    /// Creates a builder with the XSD built-in types pre-registered.
    pub fn new() -> Self {
        let mut b = Self {
            types: Vec::new(),
            elements: Vec::new(),
            attributes: Vec::new(),
            type_by_name: FastHashMap::default(),
            element_by_name: FastHashMap::default(),
            attribute_by_name: FastHashMap::default(),
            substitution_groups: FastHashMap::default(),
            builtins: FastHashMap::default(),
        };
        let any = b.push_type(TypeDef::Simple(SimpleType {
            name: Some((URI_XSD.to_string(), "anySimpleType".to_string())),
            base: None,
            serial: DatatypeSerial::AnySimpleType,
            variety: Variety::Atomic,
            enumeration: Vec::new(),
            bounds: None,
            has_pattern_facets: false,
            has_named_subtypes: false,
        }));
        b.builtins.insert(DatatypeSerial::AnySimpleType, any);
        for &serial in DatatypeSerial::all() {
            if serial == DatatypeSerial::AnySimpleType {
                continue;
            }
            let id = b.push_type(TypeDef::Simple(SimpleType {
                name: Some((URI_XSD.to_string(), serial.local_name().to_string())),
                base: Some(any),
                serial,
                variety: Variety::Atomic,
                enumeration: Vec::new(),
                bounds: None,
                has_pattern_facets: false,
                has_named_subtypes: false,
            }));
            b.builtins.insert(serial, id);
        }
        b
    }

    fn push_type(&mut self, def: TypeDef) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        if let Some((uri, local)) = def.name() {
            self.type_by_name.insert((Box::from(uri), Box::from(local)), id);
        }
        self.types.push(def);
        id
    }

    /// The pre-registered built-in type for a serial.
    pub fn builtin(&self, serial: DatatypeSerial) -> TypeId {
        self.builtins[&serial]
    }

    /// Registers a simple type. The serial is inherited from `base`.
    pub fn simple_type(&mut self, name: Option<(&str, &str)>, base: TypeId) -> TypeId {
        let serial = match &self.types[base.0 as usize] {
            TypeDef::Simple(s) => s.serial,
            TypeDef::Complex(_) => DatatypeSerial::String,
        };
        self.push_type(TypeDef::Simple(SimpleType {
            name: name.map(|(u, l)| (u.to_string(), l.to_string())),
            base: Some(base),
            serial,
            variety: Variety::Atomic,
            enumeration: Vec::new(),
            bounds: None,
            has_pattern_facets: false,
            has_named_subtypes: false,
        }))
    }

    /// Registers a simple type with full control over its fields.
    pub fn simple_type_with(&mut self, def: SimpleType) -> TypeId {
        self.push_type(TypeDef::Simple(def))
    }

    /// Registers a whitespace-separated list type.
    pub fn list_type(&mut self, name: Option<(&str, &str)>, item: TypeId) -> TypeId {
        self.push_type(TypeDef::Simple(SimpleType {
            name: name.map(|(u, l)| (u.to_string(), l.to_string())),
            base: Some(self.builtin(DatatypeSerial::AnySimpleType)),
            serial: DatatypeSerial::AnySimpleType,
            variety: Variety::List { item },
            enumeration: Vec::new(),
            bounds: None,
            has_pattern_facets: false,
            has_named_subtypes: false,
        }))
    }

    /// Registers a union type (values encode as strings, Spec 7.1.10).
    pub fn union_type(&mut self, name: Option<(&str, &str)>, members: Vec<TypeId>) -> TypeId {
        self.push_type(TypeDef::Simple(SimpleType {
            name: name.map(|(u, l)| (u.to_string(), l.to_string())),
            base: Some(self.builtin(DatatypeSerial::AnySimpleType)),
            serial: DatatypeSerial::String,
            variety: Variety::Union { members },
            enumeration: Vec::new(),
            bounds: None,
            has_pattern_facets: false,
            has_named_subtypes: false,
        }))
    }

    /// Registers a complex type.
    pub fn complex_type(&mut self, def: ComplexType) -> TypeId {
        self.push_type(TypeDef::Complex(def))
    }

    /// Registers a global attribute declaration.
    pub fn attribute(&mut self, uri: &str, local_name: &str, type_id: TypeId) -> AttributeId {
        let id = AttributeId(self.attributes.len() as u32);
        self.attribute_by_name.insert((Box::from(uri), Box::from(local_name)), id);
        self.attributes.push(AttributeDecl {
            uri: uri.to_string(),
            local_name: local_name.to_string(),
            type_id,
        });
        id
    }

    /// Registers a global element declaration (document-root candidate).
    pub fn element(&mut self, uri: &str, local_name: &str, type_id: TypeId) -> ElementId {
        self.element_impl(uri, local_name, type_id, false, true)
    }

    /// Registers a nillable global element declaration.
    pub fn nillable_element(&mut self, uri: &str, local_name: &str, type_id: TypeId) -> ElementId {
        self.element_impl(uri, local_name, type_id, true, true)
    }

    /// Registers a local element declaration (content-model only).
    pub fn local_element(&mut self, uri: &str, local_name: &str, type_id: TypeId) -> ElementId {
        self.element_impl(uri, local_name, type_id, false, false)
    }

    /// Registers a nillable local element declaration.
    pub fn nillable_local_element(
        &mut self,
        uri: &str,
        local_name: &str,
        type_id: TypeId,
    ) -> ElementId {
        self.element_impl(uri, local_name, type_id, true, false)
    }

    fn element_impl(
        &mut self,
        uri: &str,
        local_name: &str,
        type_id: TypeId,
        nillable: bool,
        global: bool,
    ) -> ElementId {
        let id = ElementId(self.elements.len() as u32);
        if global {
            self.element_by_name.insert((Box::from(uri), Box::from(local_name)), id);
        }
        self.elements.push(ElementDecl {
            uri: uri.to_string(),
            local_name: local_name.to_string(),
            type_id,
            nillable,
            global,
            substitution_head: None,
        });
        id
    }

    /// Declares `member` substitutable for the global element `head`.
    pub fn substitution(&mut self, head: ElementId, member: ElementId) {
        self.elements[member.0 as usize].substitution_head = Some(head);
        self.substitution_groups.entry(head).or_default().push(member);
    }

    /// Validates and finalises the corpus (Spec 8.5 consistency rules).
    pub fn build(mut self) -> Result<SchemaCorpus> {
        // Facet-Bounds und Wildcard-Konsistenz
        for def in &self.types {
            match def {
                TypeDef::Simple(s) => {
                    if let Some((min, max)) = s.bounds {
                        if max < min {
                            return Err(Error::grammar_build(format!(
                                "invalid facet bounds: max {max} < min {min}"
                            )));
                        }
                    }
                    if let Variety::Union { members } = &s.variety {
                        if members.is_empty() {
                            return Err(Error::grammar_build("union type without member types"));
                        }
                    }
                }
                TypeDef::Complex(c) => {
                    if let Some(NamespaceConstraint::Namespaces(list)) = &c.attribute_wildcard {
                        if list.is_empty() {
                            return Err(Error::grammar_build(
                                "attribute wildcard with empty namespace list",
                            ));
                        }
                    }
                    check_particles(&c.content)?;
                }
            }
        }

        // Ableitungszyklen erkennen und has_named_subtypes ableiten
        let count = self.types.len();
        let mut has_named_sub = vec![false; count];
        for (i, def) in self.types.iter().enumerate() {
            let mut current = def.base();
            let mut steps = 0usize;
            while let Some(base) = current {
                if steps > count {
                    return Err(Error::grammar_build("cyclic type derivation"));
                }
                if def.name().is_some() && i != base.0 as usize {
                    has_named_sub[base.0 as usize] = true;
                }
                current = self.types[base.0 as usize].base();
                steps += 1;
            }
        }
        for (def, flag) in self.types.iter_mut().zip(has_named_sub) {
            match def {
                TypeDef::Simple(s) => s.has_named_subtypes = flag,
                TypeDef::Complex(c) => c.has_named_subtypes = flag,
            }
        }

        // Attribute Uses pro Complex Type sortieren (Spec 8.5.4.1.4)
        let attrs = std::mem::take(&mut self.attributes);
        for def in &mut self.types {
            if let TypeDef::Complex(c) = def {
                c.attributes.sort_by(|a, b| {
                    let da = &attrs[a.attribute.0 as usize];
                    let db = &attrs[b.attribute.0 as usize];
                    (da.local_name.as_str(), da.uri.as_str())
                        .cmp(&(db.local_name.as_str(), db.uri.as_str()))
                });
            }
        }
        self.attributes = attrs;

        // Globale Elemente in Schema-Ordnung (Spec 8.5.1)
        let mut global_elements: Vec<ElementId> = self
            .elements
            .iter()
            .enumerate()
            .filter(|(_, e)| e.global)
            .map(|(i, _)| ElementId(i as u32))
            .collect();
        global_elements.sort_by(|a, b| {
            let ea = &self.elements[a.0 as usize];
            let eb = &self.elements[b.0 as usize];
            (ea.local_name.as_str(), ea.uri.as_str())
                .cmp(&(eb.local_name.as_str(), eb.uri.as_str()))
        });

        // Namespace-URIs in Registrierungsreihenfolge sammeln
        let mut uris: Vec<String> = Vec::new();
        let mut push_uri = |uris: &mut Vec<String>, uri: &str| {
            if !uris.iter().any(|u| u == uri) {
                uris.push(uri.to_string());
            }
        };
        for e in &self.elements {
            push_uri(&mut uris, &e.uri);
        }
        for a in &self.attributes {
            push_uri(&mut uris, &a.uri);
        }

        log::debug!(
            "schema corpus built: {} types, {} elements ({} global), {} attributes",
            self.types.len(),
            self.elements.len(),
            global_elements.len(),
            self.attributes.len()
        );

        Ok(SchemaCorpus {
            types: self.types,
            elements: self.elements,
            attributes: self.attributes,
            global_elements,
            type_by_name: self.type_by_name,
            element_by_name: self.element_by_name,
            attribute_by_name: self.attribute_by_name,
            substitution_groups: self.substitution_groups,
            builtins: self.builtins,
            uris,
        })
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Particle-Konsistenz: min ≤ max, keine leeren Gruppen (Spec 8.5.4.1.5).
fn check_particles(content: &ContentModel) -> Result<()> {
    fn check(p: &Particle) -> Result<()> {
        if let MaxOccurs::Bounded(max) = p.max_occurs {
            if max < p.min_occurs {
                return Err(Error::grammar_build(format!(
                    "invalid particle occurs: max {max} < min {}",
                    p.min_occurs
                )));
            }
        }
        match &p.term {
            Term::Sequence(ps) | Term::Choice(ps) | Term::All(ps) => {
                if ps.is_empty() {
                    return Err(Error::grammar_build("empty model group"));
                }
                ps.iter().try_for_each(check)
            }
            Term::Wildcard(NamespaceConstraint::Namespaces(list)) if list.is_empty() => {
                Err(Error::grammar_build("element wildcard with empty namespace list"))
            }
            _ => Ok(()),
        }
    }
    match content {
        ContentModel::ElementOnly(p) | ContentModel::Mixed(p) => check(p),
        _ => Ok(()),
    }
}
