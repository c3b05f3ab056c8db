//! The graph capability contract shared by every algorithm in this crate.
//!
//! [`GraphView`] is the read-only interface: node and edge enumeration,
//! adjacency, and attribute access. Anything that implements it (a molecule
//! read from a file, a query graph, a line graph) can be fed to the
//! connectivity, clique, isomorphism and MCS routines. [`SimpleGraph`] is the
//! concrete representation used throughout the crate; it owns a
//! [`PropertyCache`] that is invalidated by every mutation.
//!
//! Algorithms never walk a [`GraphView`] directly. They first take a
//! [`Topology`] snapshot, which validates the graph (dense identifiers, no
//! dangling endpoints, no self-loops or parallel edges, symmetric adjacency)
//! and stores it in index-addressable form.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Debug,
};

use petgraph::{
    dot::Dot,
    graph::{EdgeIndex, Graph, NodeIndex},
    visit::EdgeRef,
    Undirected,
};

use crate::{
    cache::{CacheKey, MemoizeMode, PropertyCache},
    connectivity,
    error::{GraphError, Result},
};

pub type NodeId = usize;
pub type EdgeId = usize;

/// A partial injective function between the identifiers of two graphs.
pub type Mapping = BTreeMap<usize, usize>;

pub(crate) type Index = u32;
pub(crate) type PGraph<N, E> = Graph<N, E, Undirected, Index>;

/// Read contract of a simple undirected graph.
///
/// Node identifiers are expected to be `0..node_count()` and edge identifiers
/// `0..edge_count()`; [`Topology::of`] rejects anything else.
pub trait GraphView {
    type NodeAttr;
    type EdgeAttr;

    fn node_count(&self) -> usize;

    fn edge_count(&self) -> usize;

    fn node_set(&self) -> BTreeSet<NodeId>;

    fn edge_set(&self) -> BTreeSet<EdgeId>;

    /// Return the two endpoints of `edge`, smaller identifier first.
    fn edge_endpoints(&self, edge: EdgeId) -> Result<(NodeId, NodeId)>;

    /// Return a map from each neighbor of `node` to the connecting edge.
    fn neighbors(&self, node: NodeId) -> Result<BTreeMap<NodeId, EdgeId>>;

    /// Return the neighbors of `node`.
    fn adjacencies(&self, node: NodeId) -> Result<BTreeSet<NodeId>> {
        Ok(self.neighbors(node)?.into_keys().collect())
    }

    fn node_attr(&self, node: NodeId) -> Result<&Self::NodeAttr>;

    fn edge_attr(&self, edge: EdgeId) -> Result<&Self::EdgeAttr>;
}

/// A simple, loopless, undirected graph with attributes on nodes and edges.
///
/// Identifiers are assigned densely in insertion order and are never reused;
/// there is no removal. Derived structural properties (components, cut
/// vertices, bridges, ...) are memoized in an owned [`PropertyCache`], which
/// every mutation entry point clears before returning.
#[derive(Debug, Clone)]
pub struct SimpleGraph<N, E> {
    graph: PGraph<N, E>,
    cache: PropertyCache,
}

impl<N, E> Default for SimpleGraph<N, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N, E> SimpleGraph<N, E> {
    pub fn new() -> Self {
        Self::with_memoize(MemoizeMode::Properties)
    }

    /// Construct an empty graph whose derived properties are cached according
    /// to `mode`.
    pub fn with_memoize(mode: MemoizeMode) -> Self {
        Self {
            graph: PGraph::default(),
            cache: PropertyCache::new(mode),
        }
    }

    /// Return the underlying petgraph representation.
    pub fn graph(&self) -> &PGraph<N, E> {
        &self.graph
    }

    pub fn cache(&self) -> &PropertyCache {
        &self.cache
    }

    /// Replace the cache with an empty one using `mode`.
    pub fn set_memoize(&mut self, mode: MemoizeMode) {
        self.cache = PropertyCache::new(mode);
    }

    /// Add a node carrying `attr` and return its identifier.
    pub fn add_node(&mut self, attr: N) -> NodeId {
        let ix = self.graph.add_node(attr);
        self.cache.invalidate();
        ix.index()
    }

    /// Add an edge between `a` and `b` carrying `attr`.
    ///
    /// Fails if either endpoint does not exist, if `a == b`, or if the two
    /// nodes are already adjacent.
    pub fn add_edge(&mut self, a: NodeId, b: NodeId, attr: E) -> Result<EdgeId> {
        let u = self.node_index(a)?;
        let v = self.node_index(b)?;
        if a == b {
            return Err(GraphError::SelfLoop(a));
        }
        if self.graph.find_edge(u, v).is_some() {
            return Err(GraphError::ParallelEdge(a.min(b), a.max(b)));
        }
        let ix = self.graph.add_edge(u, v, attr);
        self.cache.invalidate();
        Ok(ix.index())
    }

    /// Replace the attribute of `node`, returning the previous one.
    pub fn set_node_attr(&mut self, node: NodeId, attr: N) -> Result<N> {
        let ix = self.node_index(node)?;
        let slot = self
            .graph
            .node_weight_mut(ix)
            .ok_or(GraphError::NodeOutOfRange(node))?;
        let old = std::mem::replace(slot, attr);
        self.cache.invalidate();
        Ok(old)
    }

    /// Replace the attribute of `edge`, returning the previous one.
    pub fn set_edge_attr(&mut self, edge: EdgeId, attr: E) -> Result<E> {
        let slot = self
            .graph
            .edge_weight_mut(EdgeIndex::new(edge))
            .ok_or(GraphError::EdgeOutOfRange(edge))?;
        let old = std::mem::replace(slot, attr);
        self.cache.invalidate();
        Ok(old)
    }

    /// Return the edge joining `a` and `b`, if any.
    pub fn find_edge(&self, a: NodeId, b: NodeId) -> Option<EdgeId> {
        if a >= self.graph.node_count() || b >= self.graph.node_count() {
            return None;
        }
        self.graph
            .find_edge(NodeIndex::new(a), NodeIndex::new(b))
            .map(|e| e.index())
    }

    /// Partition the node set into connected components (memoized).
    pub fn connected_components(&self) -> Result<Vec<BTreeSet<NodeId>>> {
        self.cache
            .node_partition(CacheKey::ConnectedComponents, || {
                connectivity::connected_components(self)
            })
    }

    /// Return the articulation points of the graph (memoized).
    pub fn cut_vertices(&self) -> Result<BTreeSet<NodeId>> {
        self.cache.node_set(CacheKey::CutVertices, || {
            Ok(connectivity::biconnectivity(self)?.cut_vertices)
        })
    }

    /// Return the bridges of the graph (memoized).
    pub fn bridges(&self) -> Result<BTreeSet<EdgeId>> {
        self.cache.edge_set(CacheKey::Bridges, || {
            Ok(connectivity::biconnectivity(self)?.bridges)
        })
    }

    /// Return the node sets of the biconnected blocks (memoized).
    pub fn biconnected_components(&self) -> Result<Vec<BTreeSet<NodeId>>> {
        self.cache
            .node_partition(CacheKey::BiconnectedComponents, || {
                Ok(connectivity::biconnectivity(self)?.components)
            })
    }

    /// Return the two-edge-connected components (memoized).
    pub fn two_edge_connected_components(&self) -> Result<Vec<BTreeSet<NodeId>>> {
        self.cache
            .node_partition(CacheKey::TwoEdgeConnectedComponents, || {
                connectivity::two_edge_connected_components(self)
            })
    }

    fn node_index(&self, node: NodeId) -> Result<NodeIndex<Index>> {
        if node < self.graph.node_count() {
            Ok(NodeIndex::new(node))
        } else {
            Err(GraphError::NodeOutOfRange(node))
        }
    }
}

impl<N: Debug, E: Debug> SimpleGraph<N, E> {
    /// Return a pretty-printable (DOT) representation of this graph.
    pub fn info(&self) -> String {
        let dot = Dot::new(&self.graph);
        format!("{dot:?}")
    }
}

impl<N, E> GraphView for SimpleGraph<N, E> {
    type NodeAttr = N;
    type EdgeAttr = E;

    fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn node_set(&self) -> BTreeSet<NodeId> {
        self.graph.node_indices().map(|ix| ix.index()).collect()
    }

    fn edge_set(&self) -> BTreeSet<EdgeId> {
        self.graph.edge_indices().map(|ix| ix.index()).collect()
    }

    fn edge_endpoints(&self, edge: EdgeId) -> Result<(NodeId, NodeId)> {
        let (a, b) = self
            .graph
            .edge_endpoints(EdgeIndex::new(edge))
            .ok_or(GraphError::EdgeOutOfRange(edge))?;
        let (a, b) = (a.index(), b.index());
        Ok((a.min(b), a.max(b)))
    }

    fn neighbors(&self, node: NodeId) -> Result<BTreeMap<NodeId, EdgeId>> {
        let ix = self.node_index(node)?;
        Ok(self
            .graph
            .edges(ix)
            .map(|e| {
                let other = if e.source() == ix { e.target() } else { e.source() };
                (other.index(), e.id().index())
            })
            .collect())
    }

    fn node_attr(&self, node: NodeId) -> Result<&N> {
        self.graph
            .node_weight(NodeIndex::new(node))
            .ok_or(GraphError::NodeOutOfRange(node))
    }

    fn edge_attr(&self, edge: EdgeId) -> Result<&E> {
        self.graph
            .edge_weight(EdgeIndex::new(edge))
            .ok_or(GraphError::EdgeOutOfRange(edge))
    }
}

/// Validated, index-addressable snapshot of a graph's structure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topology {
    adjacency: Vec<BTreeMap<NodeId, EdgeId>>,
    endpoints: Vec<(NodeId, NodeId)>,
}

impl Topology {
    /// Snapshot the structure of `g`, checking that it is a well-formed
    /// simple graph.
    pub fn of<G: GraphView + ?Sized>(g: &G) -> Result<Self> {
        let n = g.node_count();
        for (i, node) in g.node_set().into_iter().enumerate() {
            if node != i {
                return Err(GraphError::SparseNodeIds(i));
            }
        }

        let mut adjacency = vec![BTreeMap::new(); n];
        let mut endpoints = Vec::with_capacity(g.edge_count());
        for (i, edge) in g.edge_set().into_iter().enumerate() {
            if edge != i {
                return Err(GraphError::SparseEdgeIds(i));
            }
            let (u, v) = g.edge_endpoints(edge)?;
            for node in [u, v] {
                if node >= n {
                    return Err(GraphError::DanglingEndpoint { edge, node });
                }
            }
            if u == v {
                return Err(GraphError::SelfLoop(u));
            }
            if adjacency[u].insert(v, edge).is_some() {
                return Err(GraphError::ParallelEdge(u.min(v), u.max(v)));
            }
            adjacency[v].insert(u, edge);
            endpoints.push((u.min(v), u.max(v)));
        }

        // The declared neighborhoods must agree with the edge list.
        for (node, expected) in adjacency.iter().enumerate() {
            let declared = g.neighbors(node)?;
            for (other, edge) in &declared {
                if expected.get(other) != Some(edge) {
                    return Err(GraphError::AsymmetricAdjacency(node, *other));
                }
            }
            if let Some(other) = expected.keys().find(|v| !declared.contains_key(v)) {
                return Err(GraphError::AsymmetricAdjacency(*other, node));
            }
        }

        Ok(Self {
            adjacency,
            endpoints,
        })
    }

    /// Build a topology over `0..node_count` from an edge list; edge `i` is
    /// the `i`-th pair.
    pub fn from_edges(node_count: usize, edges: &[(NodeId, NodeId)]) -> Result<Self> {
        let mut g = SimpleGraph::<(), ()>::with_memoize(MemoizeMode::None);
        for _ in 0..node_count {
            g.add_node(());
        }
        for &(u, v) in edges {
            g.add_edge(u, v, ())?;
        }
        Self::of(&g)
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.endpoints.len()
    }

    pub fn nodes(&self) -> std::ops::Range<NodeId> {
        0..self.adjacency.len()
    }

    pub fn edges(&self) -> std::ops::Range<EdgeId> {
        0..self.endpoints.len()
    }

    /// Neighbors of `node` mapped to the connecting edges. `node` must come
    /// from [`Self::nodes`].
    pub(crate) fn neighbors(&self, node: NodeId) -> &BTreeMap<NodeId, EdgeId> {
        &self.adjacency[node]
    }

    pub(crate) fn degree(&self, node: NodeId) -> usize {
        self.adjacency[node].len()
    }

    pub(crate) fn endpoints(&self, edge: EdgeId) -> (NodeId, NodeId) {
        self.endpoints[edge]
    }

    pub fn edge_between(&self, u: NodeId, v: NodeId) -> Option<EdgeId> {
        self.adjacency.get(u)?.get(&v).copied()
    }

    pub fn are_adjacent(&self, u: NodeId, v: NodeId) -> bool {
        self.edge_between(u, v).is_some()
    }

    /// Return the endpoint shared by edges `e` and `f`, if they are distinct
    /// and incident. Both must come from [`Self::edges`].
    pub(crate) fn shared_endpoint(&self, e: EdgeId, f: EdgeId) -> Option<NodeId> {
        if e == f {
            return None;
        }
        let (a, b) = self.endpoints[e];
        let (c, d) = self.endpoints[f];
        if a == c || a == d {
            Some(a)
        } else if b == c || b == d {
            Some(b)
        } else {
            None
        }
    }
}
