//! Connected components and biconnectivity.
//!
//! Both traversals are depth-first with an explicit stack, so molecule-sized
//! inputs never approach the native recursion limit, and both restart from
//! every still-unvisited node so disconnected graphs are handled.

use std::collections::{btree_map, BTreeSet};

use tracing::debug;

use crate::{
    error::Result,
    graph::{EdgeId, GraphView, NodeId, Topology},
};

/// Result of a biconnectivity analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Biconnectivity {
    /// Articulation points: nodes whose removal disconnects their component.
    pub cut_vertices: BTreeSet<NodeId>,
    /// Edges whose removal disconnects their component.
    pub bridges: BTreeSet<EdgeId>,
    /// Node sets of the biconnected blocks. Isolated nodes belong to none.
    pub components: Vec<BTreeSet<NodeId>>,
}

/// Partition the nodes of `g` into connected components.
///
/// The empty graph yields no components; an isolated node forms a singleton.
pub fn connected_components<G: GraphView + ?Sized>(g: &G) -> Result<Vec<BTreeSet<NodeId>>> {
    let topo = Topology::of(g)?;
    Ok(components_where(&topo, |_| true))
}

/// Connected components of `topo` restricted to the edges accepted by
/// `keep`.
pub(crate) fn components_where(
    topo: &Topology,
    keep: impl Fn(EdgeId) -> bool,
) -> Vec<BTreeSet<NodeId>> {
    let mut remaining: BTreeSet<NodeId> = topo.nodes().collect();
    let mut components = Vec::new();
    while let Some(start) = remaining.pop_first() {
        let mut component = BTreeSet::from([start]);
        let mut stack = vec![start];
        while let Some(u) = stack.pop() {
            for (&v, &e) in topo.neighbors(u) {
                if keep(e) && remaining.remove(&v) {
                    component.insert(v);
                    stack.push(v);
                }
            }
        }
        components.push(component);
    }
    components
}

struct Frame<'a> {
    node: NodeId,
    parent_edge: Option<EdgeId>,
    neighbors: btree_map::Iter<'a, NodeId, EdgeId>,
}

/// Find cut vertices, bridges and biconnected blocks with Tarjan's low-link
/// method.
///
/// A child `v` of `u` with `low[v] >= level[u]` makes `u` an articulation
/// point (roots need two such children) and closes a block; only the strict
/// inequality makes the edge `(u, v)` a bridge, so the edge joining two blocks
/// at a shared cut vertex is not reported.
pub fn biconnectivity<G: GraphView + ?Sized>(g: &G) -> Result<Biconnectivity> {
    let topo = Topology::of(g)?;
    Ok(biconnectivity_of(&topo))
}

pub(crate) fn biconnectivity_of(topo: &Topology) -> Biconnectivity {
    let n = topo.node_count();
    let mut level: Vec<Option<usize>> = vec![None; n];
    let mut low = vec![0; n];
    let mut result = Biconnectivity::default();

    // Nodes visited since the last block was flushed.
    let mut buffer: Vec<NodeId> = Vec::new();

    for root in topo.nodes() {
        if level[root].is_some() {
            continue;
        }
        level[root] = Some(0);
        low[root] = 0;
        buffer.push(root);
        let mut root_children = 0;

        let mut frames = vec![Frame {
            node: root,
            parent_edge: None,
            neighbors: topo.neighbors(root).iter(),
        }];

        while let Some(frame) = frames.last_mut() {
            let u = frame.node;
            let u_level = level[u].unwrap_or_default();

            if let Some((&v, &e)) = frame.neighbors.next() {
                if frame.parent_edge == Some(e) {
                    continue;
                }
                match level[v] {
                    Some(v_level) => low[u] = low[u].min(v_level),
                    None => {
                        level[v] = Some(u_level + 1);
                        low[v] = u_level + 1;
                        buffer.push(v);
                        frames.push(Frame {
                            node: v,
                            parent_edge: Some(e),
                            neighbors: topo.neighbors(v).iter(),
                        });
                    }
                }
                continue;
            }

            // `u` is finished; fold it into its parent.
            let parent_edge = frame.parent_edge;
            frames.pop();
            let (Some(parent), Some(edge)) = (frames.last(), parent_edge) else {
                continue;
            };
            let p = parent.node;
            let p_level = level[p].unwrap_or_default();
            low[p] = low[p].min(low[u]);

            if low[u] >= p_level {
                if p == root {
                    root_children += 1;
                } else {
                    result.cut_vertices.insert(p);
                }
                if low[u] > p_level {
                    result.bridges.insert(edge);
                }
                let mut block = BTreeSet::from([p]);
                while let Some(w) = buffer.pop() {
                    block.insert(w);
                    if w == u {
                        break;
                    }
                }
                result.components.push(block);
            }
        }

        if root_children > 1 {
            result.cut_vertices.insert(root);
        }
        buffer.clear();
    }

    debug!(
        cut_vertices = result.cut_vertices.len(),
        bridges = result.bridges.len(),
        blocks = result.components.len(),
        "biconnectivity"
    );
    result
}

/// Return the articulation points of `g`.
pub fn cut_vertices<G: GraphView + ?Sized>(g: &G) -> Result<BTreeSet<NodeId>> {
    Ok(biconnectivity(g)?.cut_vertices)
}

/// Return the bridges of `g`.
pub fn bridges<G: GraphView + ?Sized>(g: &G) -> Result<BTreeSet<EdgeId>> {
    Ok(biconnectivity(g)?.bridges)
}

/// Return the node sets of the biconnected blocks of `g`.
pub fn biconnected_components<G: GraphView + ?Sized>(g: &G) -> Result<Vec<BTreeSet<NodeId>>> {
    Ok(biconnectivity(g)?.components)
}

/// Delete every bridge and partition the nodes by the residual edges. Nodes
/// left isolated by the deletion come back as singletons.
pub fn two_edge_connected_components<G: GraphView + ?Sized>(
    g: &G,
) -> Result<Vec<BTreeSet<NodeId>>> {
    let topo = Topology::of(g)?;
    let bridges = biconnectivity_of(&topo).bridges;
    Ok(components_where(&topo, |e| !bridges.contains(&e)))
}

/// Return the edges that lie on at least one cycle.
pub fn ring_bonds<G: GraphView + ?Sized>(g: &G) -> Result<BTreeSet<EdgeId>> {
    let topo = Topology::of(g)?;
    let bridges = biconnectivity_of(&topo).bridges;
    Ok(topo.edges().filter(|e| !bridges.contains(e)).collect())
}

/// Return the ring systems of `g`: biconnected blocks containing a cycle.
pub fn ring_systems<G: GraphView + ?Sized>(g: &G) -> Result<Vec<BTreeSet<NodeId>>> {
    Ok(biconnected_components(g)?
        .into_iter()
        .filter(|block| block.len() >= 3)
        .collect())
}
