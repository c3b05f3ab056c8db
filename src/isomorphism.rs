//! Subgraph isomorphism by VF2-style backtracking.
//!
//! [`Vf2`] extends a partial pattern-to-target mapping one pattern node at a
//! time and yields every complete mapping lazily. Stopping after the first
//! result is a cheap existence check; the search is restarted by building a
//! new [`Vf2`].
//!
//! Pattern nodes are visited in a fixed connectivity-first order, so each node
//! after the first of its component has an already-mapped neighbor (its
//! anchor) and its candidates are drawn from the neighbors of the anchor's
//! image instead of the whole target.

use std::collections::{BTreeMap, BTreeSet};

use clap::ValueEnum;
use tracing::{debug, trace};

use crate::{
    error::Result,
    graph::{GraphView, Mapping, NodeId, Topology},
    molecule::{atoms_match, bonds_match, AtomAttr, BondAttr, Molecule},
};

/// How strictly the pattern's edges must be reproduced in the target.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum MatchMode {
    /// Every pattern edge must be present in the target; the target may have
    /// extra edges between mapped nodes.
    #[default]
    Subgraph,
    /// Additionally, non-adjacent pattern nodes must map to non-adjacent
    /// target nodes.
    Induced,
}

/// Caller-imposed restrictions on individual node pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairConstraints {
    /// Pairs `(pattern, target)` every mapping must contain.
    pub mandatory: BTreeMap<NodeId, NodeId>,
    /// Pairs `(pattern, target)` no mapping may contain.
    pub forbidden: BTreeSet<(NodeId, NodeId)>,
}

impl PairConstraints {
    pub fn is_empty(&self) -> bool {
        self.mandatory.is_empty() && self.forbidden.is_empty()
    }

    pub fn allows(&self, pattern: NodeId, target: NodeId) -> bool {
        !self.forbidden.contains(&(pattern, target))
            && self.mandatory.get(&pattern).is_none_or(|&t| t == target)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vf2Options {
    pub mode: MatchMode,
    pub constraints: PairConstraints,
}

impl Vf2Options {
    pub fn induced() -> Self {
        Self {
            mode: MatchMode::Induced,
            ..Default::default()
        }
    }
}

/// A matcher that accepts everything.
pub fn always<A: ?Sized, B: ?Sized>(_: &A, _: &B) -> bool {
    true
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum SearchState {
    Initial,
    Searching,
    MatchFound,
    Exhausted,
}

struct Frame {
    candidates: Vec<NodeId>,
    next: usize,
    assigned: Option<NodeId>,
}

/// Lazy sequence of mappings from `pattern` nodes to `target` nodes.
pub struct Vf2<'a, G, H, NM, EM>
where
    G: GraphView + ?Sized,
    H: GraphView + ?Sized,
{
    pattern: Topology,
    target: Topology,
    pattern_nodes: Vec<&'a G::NodeAttr>,
    pattern_edges: Vec<&'a G::EdgeAttr>,
    target_nodes: Vec<&'a H::NodeAttr>,
    target_edges: Vec<&'a H::EdgeAttr>,
    node_match: NM,
    edge_match: EM,
    options: Vf2Options,
    /// Pattern nodes in visiting order, with an earlier neighbor if any.
    order: Vec<(NodeId, Option<NodeId>)>,
    /// Target node reserved by a mandatory pair, keyed by target.
    reserved: BTreeMap<NodeId, NodeId>,
    pattern_map: Vec<Option<NodeId>>,
    target_map: Vec<Option<NodeId>>,
    stack: Vec<Frame>,
    state: SearchState,
}

impl<'a, G, H, NM, EM> Vf2<'a, G, H, NM, EM>
where
    G: GraphView + ?Sized,
    H: GraphView + ?Sized,
    NM: Fn(&G::NodeAttr, &H::NodeAttr) -> bool,
    EM: Fn(&G::EdgeAttr, &H::EdgeAttr) -> bool,
{
    /// Prepare a search for embeddings of `pattern` in `target`.
    ///
    /// Fails only if either graph is structurally invalid.
    pub fn new(
        pattern: &'a G,
        target: &'a H,
        node_match: NM,
        edge_match: EM,
        options: Vf2Options,
    ) -> Result<Self> {
        let pattern_topo = Topology::of(pattern)?;
        let target_topo = Topology::of(target)?;
        let pattern_nodes = pattern_topo
            .nodes()
            .map(|p| pattern.node_attr(p))
            .collect::<Result<Vec<_>>>()?;
        let pattern_edges = pattern_topo
            .edges()
            .map(|e| pattern.edge_attr(e))
            .collect::<Result<Vec<_>>>()?;
        let target_nodes = target_topo
            .nodes()
            .map(|t| target.node_attr(t))
            .collect::<Result<Vec<_>>>()?;
        let target_edges = target_topo
            .edges()
            .map(|f| target.edge_attr(f))
            .collect::<Result<Vec<_>>>()?;

        let order = visiting_order(&pattern_topo);
        let reserved = options
            .constraints
            .mandatory
            .iter()
            .map(|(&p, &t)| (t, p))
            .collect::<BTreeMap<_, _>>();

        let viable = pattern_topo.node_count() <= target_topo.node_count()
            && pattern_topo.edge_count() <= target_topo.edge_count()
            && reserved.len() == options.constraints.mandatory.len()
            && options.constraints.mandatory.iter().all(|(&p, &t)| {
                p < pattern_topo.node_count()
                    && t < target_topo.node_count()
                    && !options.constraints.forbidden.contains(&(p, t))
            });

        debug!(
            pattern_nodes = pattern_topo.node_count(),
            target_nodes = target_topo.node_count(),
            mode = ?options.mode,
            viable,
            "starting VF2 search"
        );

        Ok(Self {
            pattern_map: vec![None; pattern_topo.node_count()],
            target_map: vec![None; target_topo.node_count()],
            pattern: pattern_topo,
            target: target_topo,
            pattern_nodes,
            pattern_edges,
            target_nodes,
            target_edges,
            node_match,
            edge_match,
            options,
            order,
            reserved,
            stack: Vec::new(),
            state: if viable {
                SearchState::Initial
            } else {
                SearchState::Exhausted
            },
        })
    }

    /// Candidate targets for the pattern node at `depth`, in ascending order.
    fn candidates(&self, depth: usize) -> Vec<NodeId> {
        let (p, anchor) = self.order[depth];
        if let Some(&t) = self.options.constraints.mandatory.get(&p) {
            return vec![t];
        }
        match anchor.and_then(|a| self.pattern_map[a]) {
            Some(image) => self
                .target
                .neighbors(image)
                .keys()
                .copied()
                .filter(|&t| self.target_map[t].is_none())
                .collect(),
            None => self
                .target
                .nodes()
                .filter(|&t| self.target_map[t].is_none())
                .collect(),
        }
    }

    fn is_feasible(&self, p: NodeId, t: NodeId) -> bool {
        if self.target_map[t].is_some()
            || self.target.degree(t) < self.pattern.degree(p)
            || !self.options.constraints.allows(p, t)
            || self.reserved.get(&t).is_some_and(|&q| q != p)
            || !(self.node_match)(self.pattern_nodes[p], self.target_nodes[t])
        {
            return false;
        }

        let mut mapped_neighbors = 0;
        for (&q, &e) in self.pattern.neighbors(p) {
            let Some(tq) = self.pattern_map[q] else {
                continue;
            };
            match self.target.edge_between(t, tq) {
                Some(f) if (self.edge_match)(self.pattern_edges[e], self.target_edges[f]) => {
                    mapped_neighbors += 1
                }
                _ => return false,
            }
        }

        match self.options.mode {
            MatchMode::Subgraph => true,
            MatchMode::Induced => {
                let target_mapped = self
                    .target
                    .neighbors(t)
                    .keys()
                    .filter(|&&u| self.target_map[u].is_some())
                    .count();
                target_mapped == mapped_neighbors
            }
        }
    }

    /// Move the frame at `depth` to its next feasible candidate.
    fn advance(&mut self, depth: usize) -> Option<NodeId> {
        let p = self.order[depth].0;
        loop {
            let frame = &mut self.stack[depth];
            let t = *frame.candidates.get(frame.next)?;
            frame.next += 1;
            if self.is_feasible(p, t) {
                return Some(t);
            }
        }
    }

    fn current_mapping(&self) -> Mapping {
        self.pattern_map
            .iter()
            .enumerate()
            .filter_map(|(p, t)| t.map(|t| (p, t)))
            .collect()
    }
}

impl<G, H, NM, EM> Iterator for Vf2<'_, G, H, NM, EM>
where
    G: GraphView + ?Sized,
    H: GraphView + ?Sized,
    NM: Fn(&G::NodeAttr, &H::NodeAttr) -> bool,
    EM: Fn(&G::EdgeAttr, &H::EdgeAttr) -> bool,
{
    type Item = Mapping;

    fn next(&mut self) -> Option<Mapping> {
        match self.state {
            SearchState::Exhausted => return None,
            SearchState::Initial => {
                if self.order.is_empty() {
                    // The empty pattern embeds exactly once.
                    self.state = SearchState::Exhausted;
                    return Some(Mapping::new());
                }
                let candidates = self.candidates(0);
                self.stack.push(Frame {
                    candidates,
                    next: 0,
                    assigned: None,
                });
            }
            SearchState::Searching | SearchState::MatchFound => {}
        }
        self.state = SearchState::Searching;

        while !self.stack.is_empty() {
            let depth = self.stack.len() - 1;
            let p = self.order[depth].0;
            if let Some(t) = self.stack[depth].assigned.take() {
                self.pattern_map[p] = None;
                self.target_map[t] = None;
            }

            let Some(t) = self.advance(depth) else {
                self.stack.pop();
                continue;
            };
            self.pattern_map[p] = Some(t);
            self.target_map[t] = Some(p);
            self.stack[depth].assigned = Some(t);

            if depth + 1 == self.order.len() {
                trace!(depth, "VF2 mapping complete");
                self.state = SearchState::MatchFound;
                return Some(self.current_mapping());
            }
            let candidates = self.candidates(depth + 1);
            self.stack.push(Frame {
                candidates,
                next: 0,
                assigned: None,
            });
        }

        trace!("VF2 search exhausted");
        self.state = SearchState::Exhausted;
        None
    }
}

/// Order the pattern nodes so that each one is adjacent to an earlier node
/// whenever its component allows it.
///
/// The next node is the unplaced node with the most placed neighbors, then
/// the highest degree, then the smallest id. Its anchor is its neighbor that
/// was placed first.
fn visiting_order(topo: &Topology) -> Vec<(NodeId, Option<NodeId>)> {
    let n = topo.node_count();
    let mut position: Vec<Option<usize>> = vec![None; n];
    let mut placed_neighbors = vec![0usize; n];
    let mut order = Vec::with_capacity(n);

    for step in 0..n {
        let Some(next) = topo
            .nodes()
            .filter(|&v| position[v].is_none())
            .max_by_key(|&v| (placed_neighbors[v], topo.degree(v), std::cmp::Reverse(v)))
        else {
            break;
        };
        let anchor = topo
            .neighbors(next)
            .keys()
            .filter_map(|&u| position[u].map(|pos| (pos, u)))
            .min()
            .map(|(_, u)| u);
        position[next] = Some(step);
        for &u in topo.neighbors(next).keys() {
            placed_neighbors[u] += 1;
        }
        order.push((next, anchor));
    }
    order
}

/// Return `true` iff `pattern` embeds in `target`.
pub fn has_substructure<G, H, NM, EM>(
    pattern: &G,
    target: &H,
    node_match: NM,
    edge_match: EM,
    mode: MatchMode,
) -> Result<bool>
where
    G: GraphView + ?Sized,
    H: GraphView + ?Sized,
    NM: Fn(&G::NodeAttr, &H::NodeAttr) -> bool,
    EM: Fn(&G::EdgeAttr, &H::EdgeAttr) -> bool,
{
    let options = Vf2Options {
        mode,
        ..Default::default()
    };
    Ok(Vf2::new(pattern, target, node_match, edge_match, options)?
        .next()
        .is_some())
}

/// Collect every embedding of `pattern` in `target`.
pub fn substructure_matches<G, H, NM, EM>(
    pattern: &G,
    target: &H,
    node_match: NM,
    edge_match: EM,
    options: Vf2Options,
) -> Result<Vec<Mapping>>
where
    G: GraphView + ?Sized,
    H: GraphView + ?Sized,
    NM: Fn(&G::NodeAttr, &H::NodeAttr) -> bool,
    EM: Fn(&G::EdgeAttr, &H::EdgeAttr) -> bool,
{
    Ok(Vf2::new(pattern, target, node_match, edge_match, options)?.collect())
}

/// Return `true` iff `g` and `h` are isomorphic under the given matchers.
pub fn is_isomorphic<G, H, NM, EM>(g: &G, h: &H, node_match: NM, edge_match: EM) -> Result<bool>
where
    G: GraphView + ?Sized,
    H: GraphView + ?Sized,
    NM: Fn(&G::NodeAttr, &H::NodeAttr) -> bool,
    EM: Fn(&G::EdgeAttr, &H::EdgeAttr) -> bool,
{
    if g.node_count() != h.node_count() || g.edge_count() != h.edge_count() {
        return Ok(false);
    }
    has_substructure(g, h, node_match, edge_match, MatchMode::Induced)
}

pub type AtomMatcher = fn(&AtomAttr, &AtomAttr) -> bool;
pub type BondMatcher = fn(&BondAttr, &BondAttr) -> bool;

/// Substructure search between molecules with the default chemical matchers.
pub fn molecule_matches<'a>(
    pattern: &'a Molecule,
    target: &'a Molecule,
    options: Vf2Options,
) -> Result<Vf2<'a, Molecule, Molecule, AtomMatcher, BondMatcher>> {
    Vf2::new(
        pattern,
        target,
        atoms_match as AtomMatcher,
        bonds_match as BondMatcher,
        options,
    )
}
