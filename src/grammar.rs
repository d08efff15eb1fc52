//! Schema grammar construction (Spec 8.5.4).
//!
//! Compiles the schema corpus into an arena of grammar nodes, one
//! deterministic automaton per type. Nodes hold ordered productions
//! `(event → next node)`; content models are linearised with minOccurs
//! relaxation (Spec 8.5.4.1.5): optional particles contribute their
//! follow-set through `includes` links, which [`flatten`](GrammarSetBuilder)
//! resolves into each node's final production list at build time. xs:all
//! groups stay symbolic ([`NodeKind::All`]) — the runtime frame tracks which
//! members occurred, avoiding permutation blowup (Spec 8.5.4.1.8).
//!
//! The arena is immutable after construction and uses indices only, so a
//! built grammar set is freely shared across sessions and threads.

use crate::FastHashMap;
use crate::schema::{
    AttributeId, AttributeUse, ComplexType, ContentModel, ElementId, MaxOccurs,
    NamespaceConstraint, Particle, SchemaCorpus, Term, TypeDef, TypeId,
};
use crate::{Error, Result};

/// Arena index of a grammar node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GrammarNodeId(pub(crate) u32);

/// A grammar-level production event (translated to an
/// [`crate::event::EventKind`] during event type list resolution).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProdEvent {
    /// Schema-declared SE(qname).
    Se(ElementId),
    /// Schema-declared element wildcard (xs:any).
    SeNs(NamespaceConstraint),
    /// Schema-declared AT(qname).
    At(AttributeId),
    /// Schema-typed character content.
    Ch(TypeId),
    /// Untyped character content (mixed content).
    ChUntyped,
}

/// One production: event consumed, node the state moves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Production {
    pub event: ProdEvent,
    pub next: GrammarNodeId,
}

/// One xs:all member with its occurrence requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllMember {
    pub element: ElementId,
    pub required: bool,
}

/// Node behaviour beyond the plain production list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Regular,
    /// xs:all group: any permutation of `members`, each at most once; the
    /// runtime frame carries the occurrence mask (Spec 8.5.4.1.8).
    /// `skippable` admits the follow-set before any member occurred
    /// (minOccurs 0 on the group particle).
    All { members: Vec<AllMember>, follow: GrammarNodeId, skippable: bool },
}

/// One grammar state.
#[derive(Debug, Clone)]
pub struct GrammarNode {
    pub(crate) kind: NodeKind,
    /// Ordered productions; final after flattening.
    pub(crate) prods: Vec<Production>,
    /// EE is a valid depth-1 event here.
    pub(crate) ee_valid: bool,
    /// Start-tag phase: xsi:type/xsi:nil, declared ATs and attribute
    /// wildcards are still admissible (Spec 8.4.3 StartTagContent).
    pub(crate) at_phase: bool,
    /// Part of the universal undeclared element grammar.
    pub(crate) untyped: bool,
    /// Diagnostic label (Spec 6.1 error context).
    pub(crate) name: &'static str,
    /// Follow-set links, resolved by flattening (empty afterwards).
    includes: Vec<GrammarNodeId>,
}

impl GrammarNode {
    fn new(name: &'static str) -> Self {
        Self {
            kind: NodeKind::Regular,
            prods: Vec::new(),
            ee_valid: false,
            at_phase: false,
            untyped: false,
            name,
            includes: Vec::new(),
        }
    }

    /// Ordered productions of this state.
    pub fn productions(&self) -> &[Production] {
        &self.prods
    }

    /// EE is valid at this state.
    pub fn ee_valid(&self) -> bool {
        self.ee_valid
    }

    /// Diagnostic state label.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// The compiled grammar arena: one start node per type, plus the shared
/// untyped element grammar (Spec 8.5.4.4.1) and the document grammar's
/// root-choice data.
#[derive(Debug, Clone)]
pub struct GrammarSet {
    nodes: Vec<GrammarNode>,
    type_start: FastHashMap<TypeId, GrammarNodeId>,
    untyped_start: GrammarNodeId,
    untyped_content: GrammarNodeId,
}

impl GrammarSet {
    /// Node by id.
    pub fn node(&self, id: GrammarNodeId) -> &GrammarNode {
        &self.nodes[id.0 as usize]
    }

    /// Start-tag node of a type's grammar.
    pub fn type_start(&self, type_id: TypeId) -> GrammarNodeId {
        self.type_start[&type_id]
    }

    /// Start-tag node of the untyped element grammar.
    pub fn untyped_start(&self) -> GrammarNodeId {
        self.untyped_start
    }

    /// Content node of the untyped element grammar.
    pub fn untyped_content(&self) -> GrammarNodeId {
        self.untyped_content
    }

    /// Number of nodes (diagnostics).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the arena is empty (never after a successful build).
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Builds the grammar arena for a corpus (Spec 8.5.4).
pub(crate) fn build(corpus: &SchemaCorpus) -> Result<GrammarSet> {
    let mut b = GrammarSetBuilder { corpus, nodes: Vec::new() };

    // Universelle Untyped-Grammar (Spec 8.5.4.4.1): Transitionen erfolgen
    // strukturell im State-Machine-Code, daher keine Productions.
    let untyped_start = b.push({
        let mut n = GrammarNode::new("UntypedStartTag");
        n.ee_valid = true;
        n.at_phase = true;
        n.untyped = true;
        n
    });
    let untyped_content = b.push({
        let mut n = GrammarNode::new("UntypedContent");
        n.ee_valid = true;
        n.untyped = true;
        n
    });

    // Eine Grammar pro Typ, in TypeId-Ordnung (deterministisch).
    let mut type_start = FastHashMap::default();
    for id in 0..corpus.type_count() as u32 {
        let type_id = TypeId(id);
        let start = b.build_type(type_id)?;
        type_start.insert(type_id, start);
    }

    let mut set = GrammarSet { nodes: b.nodes, type_start, untyped_start, untyped_content };
    flatten(&mut set)?;
    log::debug!("grammar set built: {} nodes for {} types", set.len(), set.type_start.len());
    Ok(set)
}

struct GrammarSetBuilder<'c> {
    corpus: &'c SchemaCorpus,
    nodes: Vec<GrammarNode>,
}

impl<'c> GrammarSetBuilder<'c> {
    fn push(&mut self, node: GrammarNode) -> GrammarNodeId {
        let id = GrammarNodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Builds one type grammar: attribute-use chain (Spec 8.5.4.1.4) in
    /// front of the content automaton; returns the start-tag node.
    fn build_type(&mut self, type_id: TypeId) -> Result<GrammarNodeId> {
        match self.corpus.type_def(type_id) {
            TypeDef::Simple(_) => {
                let content = self.build_simple_content(type_id);
                Ok(self.at_phase_copy(content))
            }
            TypeDef::Complex(complex) => {
                let complex = complex.clone();
                let content = self.build_complex_content(type_id, &complex)?;
                let content_at = self.at_phase_copy(content);
                Ok(self.build_attribute_chain(&complex.attributes, content_at))
            }
        }
    }

    /// Simple content: CH [typed] → end; EE valid throughout so empty
    /// elements stay two events (SE, EE).
    fn build_simple_content(&mut self, simple_type: TypeId) -> GrammarNodeId {
        let end = self.push({
            let mut n = GrammarNode::new("SimpleContentEnd");
            n.ee_valid = true;
            n
        });
        self.push({
            let mut n = GrammarNode::new("SimpleContent");
            n.prods.push(Production { event: ProdEvent::Ch(simple_type), next: end });
            n.ee_valid = true;
            n
        })
    }

    fn build_complex_content(
        &mut self,
        type_id: TypeId,
        complex: &ComplexType,
    ) -> Result<GrammarNodeId> {
        match &complex.content {
            ContentModel::Empty => Ok(self.push({
                let mut n = GrammarNode::new("EmptyContent");
                n.ee_valid = true;
                n
            })),
            ContentModel::Simple(inner) => Ok(self.build_simple_content(*inner)),
            ContentModel::ElementOnly(p) => self.build_particle_content(p, false),
            ContentModel::Mixed(p) => self.build_particle_content(p, true),
        }
        .map_err(|e| {
            let label = self
                .corpus
                .type_def(type_id)
                .name()
                .map(|(u, l)| format!("{{{u}}}{l}"))
                .unwrap_or_else(|| "anonymous type".to_string());
            match e {
                Error::GrammarBuild(msg) => {
                    Error::grammar_build(format!("{label}: {msg}"))
                }
                other => other,
            }
        })
    }

    fn build_particle_content(&mut self, particle: &Particle, mixed: bool) -> Result<GrammarNodeId> {
        let first_node = self.nodes.len();
        let end = self.push({
            let mut n = GrammarNode::new("ElementContentEnd");
            n.ee_valid = true;
            n
        });
        let start = self.build_particle(particle, end, true)?;
        if mixed {
            // Mixed Content: untypisiertes CH an jeder Position, wiederholbar
            // (Spec 8.5.4.1.3.2 mixed).
            for idx in first_node..self.nodes.len() {
                let id = GrammarNodeId(idx as u32);
                self.nodes[idx].prods.push(Production { event: ProdEvent::ChUntyped, next: id });
            }
        }
        Ok(start)
    }

    /// Linearises one particle in front of `follow` (Spec 8.5.4.1.5).
    fn build_particle(
        &mut self,
        particle: &Particle,
        follow: GrammarNodeId,
        top_level: bool,
    ) -> Result<GrammarNodeId> {
        match particle.max_occurs {
            MaxOccurs::Bounded(0) => Ok(follow),
            MaxOccurs::Bounded(1) => {
                self.build_term(&particle.term, follow, particle.min_occurs == 0, top_level)
            }
            MaxOccurs::Bounded(n) => {
                // Kette von n Einzelvorkommen; Vorkommen jenseits minOccurs
                // sind optional.
                let mut f = follow;
                for i in (0..n).rev() {
                    let skippable = i >= particle.min_occurs;
                    f = self.build_term(&particle.term, f, skippable, false)?;
                }
                Ok(f)
            }
            MaxOccurs::Unbounded => {
                // Loop-Knoten: Term-First-Produktionen plus Follow-Set.
                let loop_id = self.push(GrammarNode::new("ElementContent"));
                let term_start = self.build_term(&particle.term, loop_id, false, false)?;
                self.nodes[loop_id.0 as usize].includes.push(term_start);
                self.nodes[loop_id.0 as usize].includes.push(follow);
                if particle.min_occurs == 0 {
                    Ok(loop_id)
                } else {
                    Ok(term_start)
                }
            }
        }
    }

    fn build_term(
        &mut self,
        term: &Term,
        follow: GrammarNodeId,
        skippable: bool,
        top_level: bool,
    ) -> Result<GrammarNodeId> {
        match term {
            Term::Element(element) => {
                let mut n = GrammarNode::new("ElementContent");
                n.prods.push(Production { event: ProdEvent::Se(*element), next: follow });
                // Substitution-Group-Mitglieder sind an derselben Position
                // zulässig (Spec 8.5.4.1.6).
                for &member in self.corpus.substitution_members(*element) {
                    n.prods.push(Production { event: ProdEvent::Se(member), next: follow });
                }
                if skippable {
                    n.includes.push(follow);
                }
                Ok(self.push(n))
            }
            Term::Wildcard(constraint) => {
                let mut n = GrammarNode::new("ElementContent");
                n.prods
                    .push(Production { event: ProdEvent::SeNs(constraint.clone()), next: follow });
                if skippable {
                    n.includes.push(follow);
                }
                Ok(self.push(n))
            }
            Term::Sequence(particles) => {
                let mut f = follow;
                for p in particles.iter().rev() {
                    f = self.build_particle(p, f, false)?;
                }
                if skippable {
                    // Gesamte Gruppe überspringbar: Follow-Set zusätzlich am Start
                    let mut n = GrammarNode::new("ElementContent");
                    n.includes.push(f);
                    n.includes.push(follow);
                    Ok(self.push(n))
                } else {
                    Ok(f)
                }
            }
            Term::Choice(particles) => {
                let mut n = GrammarNode::new("ElementContent");
                for p in particles {
                    let branch = self.build_particle(p, follow, false)?;
                    n.includes.push(branch);
                }
                if skippable {
                    n.includes.push(follow);
                }
                Ok(self.push(n))
            }
            Term::All(particles) => {
                if !top_level {
                    return Err(Error::grammar_build("xs:all group must be the whole content model"));
                }
                let mut members = Vec::with_capacity(particles.len());
                for p in particles {
                    let Term::Element(element) = p.term else {
                        return Err(Error::grammar_build(
                            "xs:all group members must be element particles",
                        ));
                    };
                    if !matches!(p.max_occurs, MaxOccurs::Bounded(1)) {
                        return Err(Error::grammar_build(
                            "xs:all group members must have maxOccurs 1",
                        ));
                    }
                    members.push(AllMember { element, required: p.min_occurs > 0 });
                }
                let mut n = GrammarNode::new("AllContent");
                n.kind = NodeKind::All { members, follow, skippable };
                Ok(self.push(n))
            }
        }
    }

    /// Attribute chain (Spec 8.5.4.1.4): state i offers AT(a_j) for every j
    /// not blocked by a required attribute in between; once the remainder is
    /// all-optional, the content start's productions are admissible too.
    fn build_attribute_chain(
        &mut self,
        attributes: &[AttributeUse],
        content_at_phase: GrammarNodeId,
    ) -> GrammarNodeId {
        let content_kind = self.nodes[content_at_phase.0 as usize].kind.clone();
        let mut states: Vec<GrammarNodeId> = vec![content_at_phase];
        // Rückwärts: attr_state(n) = Content; attr_state(i) davor.
        for i in (0..attributes.len()).rev() {
            let mut n = GrammarNode::new("StartTagContent");
            n.at_phase = true;
            for (j, a) in attributes.iter().enumerate().skip(i) {
                // states[k] hält attr_state(n - k); Ziel ist attr_state(j + 1)
                let next = states[attributes.len() - (j + 1)];
                n.prods.push(Production { event: ProdEvent::At(a.attribute), next });
                if a.required {
                    break;
                }
            }
            if attributes.iter().skip(i).all(|a| !a.required) {
                // Restliche Attribute alle optional: Content-Produktionen
                // sind hier bereits zulässig. xs:all-Kinder sind dynamisch
                // und reisen über den Node-Kind mit.
                n.kind = content_kind.clone();
                n.includes.push(content_at_phase);
            }
            let id = self.push(n);
            states.push(id);
        }
        *states.last().expect("at least the content state")
    }

    /// Start-tag copy of a content node: same behaviour, but with the
    /// start-tag phase marker (Spec 8.4.3 StartTagContent vs ElementContent).
    fn at_phase_copy(&mut self, content: GrammarNodeId) -> GrammarNodeId {
        let kind = self.nodes[content.0 as usize].kind.clone();
        let mut n = GrammarNode::new("StartTagContent");
        n.at_phase = true;
        n.kind = kind;
        n.includes.push(content);
        self.push(n)
    }
}

/// Resolves `includes` links into final production lists: depth-first over
/// the link graph, own productions first, one production per event
/// (deterministic grammars, Spec 8.2).
fn flatten(set: &mut GrammarSet) -> Result<()> {
    let count = set.nodes.len();
    let mut resolved: Vec<Option<(Vec<Production>, bool)>> = vec![None; count];

    fn resolve(
        nodes: &[GrammarNode],
        resolved: &mut Vec<Option<(Vec<Production>, bool)>>,
        id: usize,
        visiting: &mut Vec<bool>,
    ) -> (Vec<Production>, bool) {
        if let Some(r) = &resolved[id] {
            return r.clone();
        }
        if visiting[id] {
            // Zyklus über includes: trägt keine neuen Productions bei
            return (Vec::new(), false);
        }
        visiting[id] = true;
        let mut prods = nodes[id].prods.clone();
        let mut ee = nodes[id].ee_valid;
        for &inc in &nodes[id].includes {
            let (inc_prods, inc_ee) = resolve(nodes, resolved, inc.0 as usize, visiting);
            for p in inc_prods {
                if !prods.iter().any(|q| q.event == p.event) {
                    prods.push(p);
                }
            }
            ee |= inc_ee;
        }
        visiting[id] = false;
        resolved[id] = Some((prods.clone(), ee));
        (prods, ee)
    }

    let mut visiting = vec![false; count];
    for id in 0..count {
        resolve(&set.nodes, &mut resolved, id, &mut visiting);
    }
    for (node, r) in set.nodes.iter_mut().zip(resolved) {
        let (prods, ee) = r.expect("resolved above");
        node.prods = prods;
        node.ee_valid = ee;
        node.includes.clear();
    }
    Ok(())
}
