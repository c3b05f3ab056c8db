//! Maximum common substructure via cliques in the modular product graph.
//!
//! A node of the modular product of `G` and `H` is a compatible pair `(g, h)`.
//! Two pairs are adjacent iff they use distinct nodes on both sides and agree
//! on adjacency: both pairs of endpoints are joined by matching edges, or
//! neither is joined at all. Cliques of the product are then exactly the
//! injective mappings preserving adjacency and non-adjacency, i.e., common
//! induced subgraphs.
//!
//! The edge-induced variant runs the same search on the line graphs of `G`
//! and `H`. A line graph cannot tell a triangle from a three-edge star, so
//! each candidate edge mapping goes through the delta-y correction in
//! [`delta_y_correction`] before it is compared with the best so far.

use std::collections::BTreeSet;

use clap::ValueEnum;
use tracing::{debug, trace};

use crate::{
    clique::{CliqueConstraints, CliqueGraph, MaximalCliques},
    error::{GraphError, Result},
    graph::{EdgeId, GraphView, Mapping, NodeId, SimpleGraph, Topology},
    isomorphism::PairConstraints,
    molecule::{atoms_match, bonds_match, Molecule},
    utils::{edge_induced_subgraph, induced_subgraph, largest_connected_subset, line_graph_of},
};

/// Which kind of common substructure to search for.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum McsMode {
    /// Maximum common induced subgraph; the mapping is node to node.
    #[default]
    NodeInduced,
    /// Maximum common edge subgraph; the mapping is edge to edge.
    EdgeInduced,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct McsOptions {
    pub mode: McsMode,
    /// Mandatory and forbidden pairs, over nodes in node-induced mode and over
    /// edges in edge-induced mode.
    pub constraints: PairConstraints,
    /// Only accept substructures that are connected in the first graph.
    pub connected: bool,
}

/// The best common substructure found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct McsResult {
    pub mode: McsMode,
    /// Node-to-node or edge-to-edge mapping from the first graph to the
    /// second, depending on `mode`.
    pub mapping: Mapping,
}

impl McsResult {
    pub fn size(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    /// Copy the common substructure out of `g`, the first graph of the search.
    pub fn substructure<G>(
        &self,
        g: &G,
    ) -> Result<(SimpleGraph<G::NodeAttr, G::EdgeAttr>, Mapping)>
    where
        G: GraphView + ?Sized,
        G::NodeAttr: Clone,
        G::EdgeAttr: Clone,
    {
        let ids: BTreeSet<usize> = self.mapping.keys().copied().collect();
        match self.mode {
            McsMode::NodeInduced => induced_subgraph(g, &ids),
            McsMode::EdgeInduced => edge_induced_subgraph(g, &ids),
        }
    }
}

/// Modular product of two graphs, stored as a [`CliqueGraph`] over the
/// compatible pairs.
#[derive(Debug, Clone, Default)]
pub struct ModularProduct {
    pairs: Vec<(usize, usize)>,
    graph: CliqueGraph,
}

impl ModularProduct {
    /// Build the product of `g` and `h`, keeping the pairs accepted by
    /// `pair_ok` and joining agreeing adjacencies whose edges satisfy
    /// `edge_ok`.
    pub fn build(
        g: &Topology,
        h: &Topology,
        pair_ok: impl Fn(NodeId, NodeId) -> bool,
        edge_ok: impl Fn(EdgeId, EdgeId) -> bool,
    ) -> Self {
        let pairs: Vec<(usize, usize)> = g
            .nodes()
            .flat_map(|a| h.nodes().map(move |b| (a, b)))
            .filter(|&(a, b)| pair_ok(a, b))
            .collect();

        let mut graph = CliqueGraph::with_nodes(pairs.len());
        for (i, &(g1, h1)) in pairs.iter().enumerate() {
            for (j, &(g2, h2)) in pairs.iter().enumerate().skip(i + 1) {
                if g1 == g2 || h1 == h2 {
                    continue;
                }
                let agree = match (g.edge_between(g1, g2), h.edge_between(h1, h2)) {
                    (Some(e), Some(f)) => edge_ok(e, f),
                    (None, None) => true,
                    _ => false,
                };
                if agree {
                    graph.connect(i, j);
                }
            }
        }
        debug!(
            nodes = pairs.len(),
            edges = graph.edge_count(),
            "modular product"
        );
        Self { pairs, graph }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    pub fn graph(&self) -> &CliqueGraph {
        &self.graph
    }

    pub fn index_of(&self, pair: (usize, usize)) -> Option<usize> {
        self.pairs.binary_search(&pair).ok()
    }

    /// Read a clique of the product back as a mapping.
    pub fn mapping(&self, clique: &BTreeSet<usize>) -> Mapping {
        clique.iter().map(|&i| self.pairs[i]).collect()
    }

    /// Translate pair constraints into product-node constraints, or `None` if
    /// a mandatory pair is not a node of the product.
    fn clique_constraints(&self, pairs: &PairConstraints) -> Option<CliqueConstraints> {
        let mut constraints = CliqueConstraints::default();
        for (&a, &b) in &pairs.mandatory {
            constraints.mandatory.insert(self.index_of((a, b))?);
        }
        constraints.forbidden = pairs
            .forbidden
            .iter()
            .filter_map(|&pair| self.index_of(pair))
            .collect();
        Some(constraints)
    }
}

/// Find a maximum common substructure of `g` and `h`.
///
/// Identical graphs map every node (or edge) onto itself; if either graph is
/// empty the result is empty.
pub fn mcs<G, H, NM, EM>(
    g: &G,
    h: &H,
    node_match: NM,
    edge_match: EM,
    options: &McsOptions,
) -> Result<McsResult>
where
    G: GraphView + ?Sized,
    H: GraphView + ?Sized,
    NM: Fn(&G::NodeAttr, &H::NodeAttr) -> bool,
    EM: Fn(&G::EdgeAttr, &H::EdgeAttr) -> bool,
{
    let g_topo = Topology::of(g)?;
    let h_topo = Topology::of(h)?;
    let g_nodes = g_topo
        .nodes()
        .map(|a| g.node_attr(a))
        .collect::<Result<Vec<_>>>()?;
    let h_nodes = h_topo
        .nodes()
        .map(|b| h.node_attr(b))
        .collect::<Result<Vec<_>>>()?;
    let g_edges = g_topo
        .edges()
        .map(|e| g.edge_attr(e))
        .collect::<Result<Vec<_>>>()?;
    let h_edges = h_topo
        .edges()
        .map(|f| h.edge_attr(f))
        .collect::<Result<Vec<_>>>()?;
    let nodes_ok = |a: NodeId, b: NodeId| node_match(g_nodes[a], h_nodes[b]);
    let edges_ok = |e: EdgeId, f: EdgeId| edge_match(g_edges[e], h_edges[f]);

    let mapping = match options.mode {
        McsMode::NodeInduced => node_induced(&g_topo, &h_topo, nodes_ok, edges_ok, options),
        McsMode::EdgeInduced => edge_induced(&g_topo, &h_topo, nodes_ok, edges_ok, options)?,
    };
    debug!(mode = ?options.mode, size = mapping.len(), "maximum common substructure");
    Ok(McsResult {
        mode: options.mode,
        mapping,
    })
}

/// [`mcs`] between molecules with the default chemical matchers.
pub fn molecule_mcs(g: &Molecule, h: &Molecule, options: &McsOptions) -> Result<McsResult> {
    mcs(g, h, atoms_match, bonds_match, options)
}

fn node_induced(
    g: &Topology,
    h: &Topology,
    nodes_ok: impl Fn(NodeId, NodeId) -> bool,
    edges_ok: impl Fn(EdgeId, EdgeId) -> bool,
    options: &McsOptions,
) -> Mapping {
    let product = ModularProduct::build(g, h, nodes_ok, edges_ok);
    let Some(constraints) = product.clique_constraints(&options.constraints) else {
        return Mapping::new();
    };

    let mut best = Mapping::new();
    for clique in MaximalCliques::new(product.graph(), &constraints) {
        let mut candidate = product.mapping(&clique);
        if candidate.len() <= best.len() {
            continue;
        }
        if options.connected {
            let keys = candidate.keys().copied().collect();
            let keep = largest_connected_subset(g, &keys);
            candidate.retain(|a, _| keep.contains(a));
        }
        if candidate.len() > best.len() {
            trace!(size = candidate.len(), "improved node mapping");
            best = candidate;
        }
    }
    best
}

fn edge_induced(
    g: &Topology,
    h: &Topology,
    nodes_ok: impl Fn(NodeId, NodeId) -> bool,
    edges_ok: impl Fn(EdgeId, EdgeId) -> bool,
    options: &McsOptions,
) -> Result<Mapping> {
    if g.edge_count() == 0 || h.edge_count() == 0 {
        return Ok(Mapping::new());
    }

    // Node i of a line graph is edge i of the original graph; each line-graph
    // edge carries the original node the two edges share.
    let lg = line_graph_of(g)?;
    let lh = line_graph_of(h)?;
    let lg_topo = Topology::of(&lg)?;
    let lh_topo = Topology::of(&lh)?;
    let g_shared = lg_topo
        .edges()
        .map(|x| lg.edge_attr(x).copied())
        .collect::<Result<Vec<_>>>()?;
    let h_shared = lh_topo
        .edges()
        .map(|y| lh.edge_attr(y).copied())
        .collect::<Result<Vec<_>>>()?;

    let ends_ok = |e: EdgeId, f: EdgeId| {
        let (a, b) = g.endpoints(e);
        let (c, d) = h.endpoints(f);
        (nodes_ok(a, c) && nodes_ok(b, d)) || (nodes_ok(a, d) && nodes_ok(b, c))
    };
    let product = ModularProduct::build(
        &lg_topo,
        &lh_topo,
        |e, f| edges_ok(e, f) && ends_ok(e, f),
        |x, y| nodes_ok(g_shared[x], h_shared[y]),
    );
    let Some(constraints) = product.clique_constraints(&options.constraints) else {
        return Ok(Mapping::new());
    };

    let mut best = Mapping::new();
    for clique in MaximalCliques::new(product.graph(), &constraints) {
        let candidate = product.mapping(&clique);
        if candidate.len() < best.len() {
            continue;
        }
        let mut candidate = delta_y_correction(&candidate, g, h)?;
        if options.connected {
            let keys = candidate.keys().copied().collect();
            let keep = largest_connected_subset(&lg_topo, &keys);
            candidate.retain(|e, _| keep.contains(e));
        }
        if candidate.len() > best.len() {
            trace!(size = candidate.len(), "improved edge mapping");
            best = candidate;
        }
    }
    Ok(best)
}

/// Strip delta-y inconsistencies from an edge-to-edge mapping.
///
/// Looks at every triple of mapped edges of `g` that are pairwise adjacent.
/// Such a triple is either a triangle (three distinct shared nodes) or a star
/// (one node shared by all three). If its image in `h` has the other shape,
/// all three edges are removed from the mapping. Other inconsistencies are
/// not detected. Every key must be an edge of `g` and every value an edge of
/// `h`.
pub fn delta_y_correction(mapping: &Mapping, g: &Topology, h: &Topology) -> Result<Mapping> {
    for (&e, &f) in mapping {
        if e >= g.edge_count() {
            return Err(GraphError::EdgeOutOfRange(e));
        }
        if f >= h.edge_count() {
            return Err(GraphError::EdgeOutOfRange(f));
        }
    }
    let pairs: Vec<(EdgeId, EdgeId)> = mapping.iter().map(|(&e, &f)| (e, f)).collect();
    let mut strip = BTreeSet::new();

    for (i, &(e1, f1)) in pairs.iter().enumerate() {
        for (j, &(e2, f2)) in pairs.iter().enumerate().skip(i + 1) {
            let Some(g12) = g.shared_endpoint(e1, e2) else {
                continue;
            };
            let h12 = h.shared_endpoint(f1, f2);
            for &(e3, f3) in &pairs[j + 1..] {
                let (Some(g13), Some(g23)) = (g.shared_endpoint(e1, e3), g.shared_endpoint(e2, e3))
                else {
                    continue;
                };
                let g_star = g12 == g13 && g13 == g23;
                let h_star = match (h12, h.shared_endpoint(f1, f3), h.shared_endpoint(f2, f3)) {
                    (Some(a), Some(b), Some(c)) => a == b && b == c,
                    _ => continue,
                };
                if g_star != h_star {
                    trace!(e1, e2, e3, g_star, "delta-y exchange");
                    strip.extend([e1, e2, e3]);
                }
            }
        }
    }

    Ok(mapping
        .iter()
        .filter(|(e, _)| !strip.contains(*e))
        .map(|(&e, &f)| (e, f))
        .collect())
}

#[cfg(test)]
mod tests {
    use crate::isomorphism::always;

    use super::*;

    fn unlabeled(n: usize, edges: &[(usize, usize)]) -> SimpleGraph<(), ()> {
        let mut g = SimpleGraph::new();
        for _ in 0..n {
            g.add_node(());
        }
        for &(u, v) in edges {
            g.add_edge(u, v, ()).unwrap();
        }
        g
    }

    fn run(g: &SimpleGraph<(), ()>, h: &SimpleGraph<(), ()>, options: &McsOptions) -> McsResult {
        mcs(g, h, always, always, options).unwrap()
    }

    fn edge_mode() -> McsOptions {
        McsOptions {
            mode: McsMode::EdgeInduced,
            ..Default::default()
        }
    }

    #[test]
    fn product_of_edge_and_edge() {
        let g = Topology::from_edges(2, &[(0, 1)]).unwrap();
        let p = ModularProduct::build(&g, &g, |_, _| true, |_, _| true);
        assert_eq!(p.len(), 4);
        // (0,0)-(1,1) and (0,1)-(1,0) are the only agreeing pairs.
        assert_eq!(p.graph().edge_count(), 2);
        assert!(p.graph().are_adjacent(0, 3));
        assert!(p.graph().are_adjacent(1, 2));
        assert_eq!(p.index_of((1, 0)), Some(2));
    }

    #[test]
    fn identical_graphs_map_completely() {
        let g = unlabeled(5, &[(0, 1), (1, 2), (2, 3), (3, 4), (4, 0), (0, 2)]);
        let r = run(&g, &g, &McsOptions::default());
        assert_eq!(r.size(), 5);
        let r = run(&g, &g, &edge_mode());
        assert_eq!(r.size(), 6);
    }

    #[test]
    fn empty_graph_gives_empty_result() {
        let g = unlabeled(3, &[(0, 1), (1, 2)]);
        let empty = unlabeled(0, &[]);
        assert!(run(&g, &empty, &McsOptions::default()).is_empty());
        assert!(run(&empty, &g, &McsOptions::default()).is_empty());
        assert!(run(&g, &empty, &edge_mode()).is_empty());
    }

    #[test]
    fn path_against_triangle() {
        let path = unlabeled(3, &[(0, 1), (1, 2)]);
        let triangle = unlabeled(3, &[(0, 1), (1, 2), (2, 0)]);
        // Induced: the path's ends are not adjacent, so only two nodes map.
        assert_eq!(run(&path, &triangle, &McsOptions::default()).size(), 2);
        // Edges: both path edges fit in the triangle.
        assert_eq!(run(&path, &triangle, &edge_mode()).size(), 2);
    }

    #[test]
    fn triangle_is_not_confused_with_a_star() {
        let triangle = unlabeled(3, &[(0, 1), (1, 2), (2, 0)]);
        let star = unlabeled(4, &[(0, 1), (0, 2), (0, 3)]);
        // The line graphs are both triangles, so every candidate maps all
        // three edges and loses the whole triple to the correction.
        let r = run(&triangle, &star, &edge_mode());
        assert!(r.is_empty());

        // A tail on the triangle survives next to the stripped triple.
        let tailed = unlabeled(4, &[(0, 1), (1, 2), (2, 0), (2, 3)]);
        let r = run(&tailed, &tailed, &edge_mode());
        assert_eq!(r.size(), 4);
    }

    #[test]
    fn delta_y_strips_the_whole_triple() {
        let triangle = Topology::from_edges(3, &[(0, 1), (1, 2), (2, 0)]).unwrap();
        let star = Topology::from_edges(4, &[(0, 1), (0, 2), (0, 3)]).unwrap();
        let mapping = Mapping::from([(0, 0), (1, 1), (2, 2)]);
        assert!(delta_y_correction(&mapping, &triangle, &star)
            .unwrap()
            .is_empty());
        assert_eq!(delta_y_correction(&mapping, &star, &star).unwrap(), mapping);
    }

    #[test]
    fn delta_y_rejects_unknown_edges() {
        let triangle = Topology::from_edges(3, &[(0, 1), (1, 2), (2, 0)]).unwrap();
        let shifted = Mapping::from([(5, 0), (6, 1), (7, 2)]);
        assert_eq!(
            delta_y_correction(&shifted, &triangle, &triangle),
            Err(GraphError::EdgeOutOfRange(5))
        );
        let overshoot = Mapping::from([(0, 0), (1, 3)]);
        assert_eq!(
            delta_y_correction(&overshoot, &triangle, &triangle),
            Err(GraphError::EdgeOutOfRange(3))
        );
    }

    #[test]
    fn connected_option_drops_detached_pieces() {
        // Two separate edges against a path of four nodes.
        let g = unlabeled(4, &[(0, 1), (2, 3)]);
        let h = unlabeled(4, &[(0, 1), (1, 2), (2, 3)]);
        assert_eq!(run(&g, &h, &McsOptions::default()).size(), 3);
        let connected = McsOptions {
            connected: true,
            ..Default::default()
        };
        assert_eq!(run(&g, &h, &connected).size(), 2);
    }

    #[test]
    fn mandatory_pairs_are_respected() {
        let path = unlabeled(3, &[(0, 1), (1, 2)]);
        let options = McsOptions {
            constraints: PairConstraints {
                mandatory: [(1, 0)].into(),
                ..Default::default()
            },
            ..Default::default()
        };
        let r = run(&path, &path, &options);
        assert_eq!(r.mapping.get(&1), Some(&0));
        assert_eq!(r.size(), 2);
    }

    #[test]
    fn substructure_extraction() {
        let g = unlabeled(4, &[(0, 1), (1, 2), (2, 3)]);
        let h = unlabeled(3, &[(0, 1), (1, 2)]);
        let r = run(&g, &h, &McsOptions::default());
        let (sub, _) = r.substructure(&g).unwrap();
        assert_eq!(sub.node_count(), 3);
        assert_eq!(sub.edge_count(), 2);
    }
}
