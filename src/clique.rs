//! Maximum and maximal clique search.
//!
//! Both searches run over a [`CliqueGraph`], a bitset adjacency matrix. The
//! same structure backs the modular product graph in [`crate::mcs`], so the
//! clique engine is shared between standalone use and common-substructure
//! search. Callers may pin nodes into every reported clique (`mandatory`) or
//! exclude them from the search entirely (`forbidden`).

use std::collections::BTreeSet;

use bit_set::BitSet;
use tracing::{debug, trace};

use crate::{
    error::{GraphError, Result},
    graph::{GraphView, NodeId, Topology},
};

/// An undirected graph stored as one adjacency bitset per node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliqueGraph {
    graph: Vec<BitSet>,
}

impl CliqueGraph {
    /// An edgeless graph on `size` nodes.
    pub fn with_nodes(size: usize) -> Self {
        Self {
            graph: (0..size).map(|_| BitSet::with_capacity(size)).collect(),
        }
    }

    pub fn from_topology(topo: &Topology) -> Self {
        let mut cg = Self::with_nodes(topo.node_count());
        for e in topo.edges() {
            let (u, v) = topo.endpoints(e);
            cg.connect(u, v);
        }
        cg
    }

    pub fn from_graph<G: GraphView + ?Sized>(g: &G) -> Result<Self> {
        Ok(Self::from_topology(&Topology::of(g)?))
    }

    /// Connect `u` and `v`. Self-loops are ignored.
    pub fn add_edge(&mut self, u: usize, v: usize) -> Result<()> {
        for node in [u, v] {
            if node >= self.graph.len() {
                return Err(GraphError::NodeOutOfRange(node));
            }
        }
        self.connect(u, v);
        Ok(())
    }

    /// Connect two nodes already known to be in range.
    pub(crate) fn connect(&mut self, u: usize, v: usize) {
        if u != v {
            self.graph[u].insert(v);
            self.graph[v].insert(u);
        }
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.iter().map(BitSet::len).sum::<usize>() / 2
    }

    pub(crate) fn degree(&self, v: usize, subgraph: &BitSet) -> usize {
        self.graph[v].intersection(subgraph).count()
    }

    pub(crate) fn neighbors(&self, v: usize) -> &BitSet {
        &self.graph[v]
    }

    /// Out-of-range nodes are adjacent to nothing.
    pub fn are_adjacent(&self, v: usize, u: usize) -> bool {
        self.graph.get(v).is_some_and(|row| row.contains(u))
    }

    /// Return `true` iff the nodes of `set` are pairwise adjacent.
    pub fn is_clique<'a>(&self, set: impl IntoIterator<Item = &'a usize> + Clone) -> bool {
        set.clone().into_iter().all(|&u| {
            set.clone()
                .into_iter()
                .all(|&v| u == v || self.are_adjacent(u, v))
        })
    }
}

/// Restrictions on which nodes a clique may contain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliqueConstraints {
    /// Nodes every reported clique must contain.
    pub mandatory: BTreeSet<usize>,
    /// Nodes no reported clique may contain.
    pub forbidden: BTreeSet<usize>,
}

impl CliqueConstraints {
    pub fn is_empty(&self) -> bool {
        self.mandatory.is_empty() && self.forbidden.is_empty()
    }

    /// Compute the initial clique and candidate set, or `None` if no clique
    /// can satisfy the constraints.
    fn seed(&self, cg: &CliqueGraph) -> Option<(Vec<usize>, BitSet)> {
        let n = cg.len();
        let valid = self
            .mandatory
            .iter()
            .all(|&m| m < n && !self.forbidden.contains(&m));
        if !valid || !cg.is_clique(&self.mandatory) {
            return None;
        }

        let mut candidates: BitSet = (0..n).collect();
        for &f in &self.forbidden {
            candidates.remove(f);
        }
        for &m in &self.mandatory {
            candidates.intersect_with(cg.neighbors(m));
        }
        Some((self.mandatory.iter().copied().collect(), candidates))
    }
}

/// Return one clique of maximum size in `g`.
///
/// The empty graph yields the empty set and an edgeless graph a single node.
/// Which of several maximum cliques is returned is not part of the contract.
pub fn max_clique<G: GraphView + ?Sized>(g: &G) -> Result<BTreeSet<NodeId>> {
    let cg = CliqueGraph::from_graph(g)?;
    Ok(max_clique_in(&cg, &CliqueConstraints::default()))
}

/// Branch-and-bound maximum clique search under `constraints`.
///
/// Returns the empty set when the constraints cannot be satisfied.
pub fn max_clique_in(cg: &CliqueGraph, constraints: &CliqueConstraints) -> BTreeSet<usize> {
    let Some((mut clique, candidates)) = constraints.seed(cg) else {
        return BTreeSet::new();
    };
    let mut best = Vec::new();
    expand(cg, &mut clique, candidates, &mut best);
    debug!(size = best.len(), "maximum clique");
    best.into_iter().collect()
}

fn expand(cg: &CliqueGraph, clique: &mut Vec<usize>, mut candidates: BitSet, best: &mut Vec<usize>) {
    if candidates.is_empty() {
        if clique.len() > best.len() {
            trace!(size = clique.len(), "improved clique");
            *best = clique.clone();
        }
        return;
    }

    // Visit candidates by decreasing degree within the candidate set.
    let mut order: Vec<usize> = candidates.iter().collect();
    order.sort_by_key(|&v| std::cmp::Reverse(cg.degree(v, &candidates)));

    for v in order {
        if clique.len() + candidates.len() <= best.len() {
            return;
        }
        let mut next = candidates.clone();
        next.intersect_with(cg.neighbors(v));
        clique.push(v);
        expand(cg, clique, next, best);
        clique.pop();
        candidates.remove(v);
    }
}

/// Return every maximal clique of `g`, in enumeration order.
pub fn maximal_cliques<G: GraphView + ?Sized>(g: &G) -> Result<Vec<BTreeSet<NodeId>>> {
    let cg = CliqueGraph::from_graph(g)?;
    Ok(MaximalCliques::new(&cg, &CliqueConstraints::default()).collect())
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum SearchState {
    Initial,
    Searching,
    Exhausted,
}

struct Frame {
    clique_len: usize,
    candidates: BitSet,
    excluded: BitSet,
    todo: Vec<usize>,
}

/// Lazy Bron-Kerbosch enumeration of maximal cliques with pivoting.
///
/// The recursion is unrolled onto an explicit stack; each call to `next`
/// resumes where the previous clique was reported. With constraints, a clique
/// is maximal with respect to the graph minus the forbidden nodes, and always
/// contains every mandatory node.
pub struct MaximalCliques<'a> {
    graph: &'a CliqueGraph,
    clique: Vec<usize>,
    stack: Vec<Frame>,
    state: SearchState,
}

impl<'a> MaximalCliques<'a> {
    pub fn new(graph: &'a CliqueGraph, constraints: &CliqueConstraints) -> Self {
        let mut search = Self {
            graph,
            clique: Vec::new(),
            stack: Vec::new(),
            state: SearchState::Initial,
        };
        match constraints.seed(graph) {
            Some((clique, candidates)) if !graph.is_empty() => {
                let todo = search.pivot_todo(&candidates, &BitSet::new());
                search.stack.push(Frame {
                    clique_len: clique.len(),
                    candidates,
                    excluded: BitSet::new(),
                    todo,
                });
                search.clique = clique;
            }
            _ => search.state = SearchState::Exhausted,
        }
        search
    }

    /// Candidates left after removing the neighbors of the pivot, in the order
    /// they will be popped (ascending id).
    fn pivot_todo(&self, candidates: &BitSet, excluded: &BitSet) -> Vec<usize> {
        let pivot = candidates
            .union(excluded)
            .max_by_key(|&u| (self.graph.degree(u, candidates), std::cmp::Reverse(u)));
        let mut todo: Vec<usize> = match pivot {
            Some(u) => candidates.difference(self.graph.neighbors(u)).collect(),
            None => Vec::new(),
        };
        todo.reverse();
        todo
    }
}

impl Iterator for MaximalCliques<'_> {
    type Item = BTreeSet<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state == SearchState::Initial {
            self.state = SearchState::Searching;
            // Mandatory nodes that admit no extension form the only clique.
            if let Some(root) = self.stack.first() {
                if root.candidates.is_empty() && !self.clique.is_empty() {
                    self.stack.clear();
                    self.state = SearchState::Exhausted;
                    return Some(self.clique.iter().copied().collect());
                }
            }
        }

        while self.state == SearchState::Searching {
            let Some(frame) = self.stack.last_mut() else {
                trace!("maximal clique search exhausted");
                self.state = SearchState::Exhausted;
                break;
            };
            let Some(v) = frame.todo.pop() else {
                self.stack.pop();
                continue;
            };

            self.clique.truncate(frame.clique_len);
            self.clique.push(v);
            let mut candidates = frame.candidates.clone();
            candidates.intersect_with(self.graph.neighbors(v));
            let mut excluded = frame.excluded.clone();
            excluded.intersect_with(self.graph.neighbors(v));
            frame.candidates.remove(v);
            frame.excluded.insert(v);
            let clique_len = frame.clique_len + 1;

            if candidates.is_empty() {
                if excluded.is_empty() {
                    return Some(self.clique.iter().copied().collect());
                }
                continue;
            }
            let todo = self.pivot_todo(&candidates, &excluded);
            self.stack.push(Frame {
                clique_len,
                candidates,
                excluded,
                todo,
            });
        }
        None
    }
}

/// Return every triangle of `g` as an ascending triple, in lexicographic
/// order.
pub fn triangles<G: GraphView + ?Sized>(g: &G) -> Result<Vec<[NodeId; 3]>> {
    let topo = Topology::of(g)?;
    let mut found = Vec::new();
    for u in topo.nodes() {
        for &v in topo.neighbors(u).keys().filter(|&&v| v > u) {
            for &w in topo.neighbors(v).keys().filter(|&&w| w > v) {
                if topo.are_adjacent(u, w) {
                    found.push([u, v, w]);
                }
            }
        }
    }
    Ok(found)
}
