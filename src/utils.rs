use std::collections::BTreeSet;

use crate::{
    cache::MemoizeMode,
    error::Result,
    graph::{EdgeId, GraphView, Mapping, NodeId, SimpleGraph, Topology},
};

/// Build the line graph of `g`.
///
/// Node `i` of the result stands for edge `i` of `g` and carries that id as
/// its attribute; two nodes are adjacent iff the original edges share an
/// endpoint, and the connecting edge carries the shared node.
pub fn line_graph<G: GraphView + ?Sized>(g: &G) -> Result<SimpleGraph<EdgeId, NodeId>> {
    line_graph_of(&Topology::of(g)?)
}

pub(crate) fn line_graph_of(topo: &Topology) -> Result<SimpleGraph<EdgeId, NodeId>> {
    let mut lg = SimpleGraph::with_memoize(MemoizeMode::None);
    for e in topo.edges() {
        lg.add_node(e);
    }
    for node in topo.nodes() {
        let incident: Vec<EdgeId> = topo.neighbors(node).values().copied().collect();
        for (i, &e) in incident.iter().enumerate() {
            for &f in &incident[i + 1..] {
                lg.add_edge(e, f, node)?;
            }
        }
    }
    Ok(lg)
}

/// Copy the subgraph of `g` induced by `nodes`.
///
/// Returns the copy together with the map from original node ids to ids in
/// the copy.
pub fn induced_subgraph<G>(
    g: &G,
    nodes: &BTreeSet<NodeId>,
) -> Result<(SimpleGraph<G::NodeAttr, G::EdgeAttr>, Mapping)>
where
    G: GraphView + ?Sized,
    G::NodeAttr: Clone,
    G::EdgeAttr: Clone,
{
    let topo = Topology::of(g)?;
    let edges: BTreeSet<EdgeId> = topo
        .edges()
        .filter(|&e| {
            let (u, v) = topo.endpoints(e);
            nodes.contains(&u) && nodes.contains(&v)
        })
        .collect();
    copy_subgraph(g, &topo, nodes, &edges)
}

/// Copy the subgraph of `g` made of `edges` and their endpoints.
pub fn edge_induced_subgraph<G>(
    g: &G,
    edges: &BTreeSet<EdgeId>,
) -> Result<(SimpleGraph<G::NodeAttr, G::EdgeAttr>, Mapping)>
where
    G: GraphView + ?Sized,
    G::NodeAttr: Clone,
    G::EdgeAttr: Clone,
{
    let topo = Topology::of(g)?;
    let mut nodes = BTreeSet::new();
    for &e in edges {
        if e >= topo.edge_count() {
            return Err(crate::error::GraphError::EdgeOutOfRange(e));
        }
        let (u, v) = topo.endpoints(e);
        nodes.insert(u);
        nodes.insert(v);
    }
    copy_subgraph(g, &topo, &nodes, edges)
}

fn copy_subgraph<G>(
    g: &G,
    topo: &Topology,
    nodes: &BTreeSet<NodeId>,
    edges: &BTreeSet<EdgeId>,
) -> Result<(SimpleGraph<G::NodeAttr, G::EdgeAttr>, Mapping)>
where
    G: GraphView + ?Sized,
    G::NodeAttr: Clone,
    G::EdgeAttr: Clone,
{
    let mut sub = SimpleGraph::new();
    let mut io_map = Mapping::new();
    for &node in nodes {
        let copy = sub.add_node(g.node_attr(node)?.clone());
        io_map.insert(node, copy);
    }
    for &e in edges {
        let (u, v) = topo.endpoints(e);
        let (Some(&um), Some(&vm)) = (io_map.get(&u), io_map.get(&v)) else {
            continue;
        };
        sub.add_edge(um, vm, g.edge_attr(e)?.clone())?;
    }
    Ok((sub, io_map))
}

/// Return the largest subset of `nodes` that is connected in `topo`; ties go
/// to the subset containing the smallest node id.
pub(crate) fn largest_connected_subset(
    topo: &Topology,
    nodes: &BTreeSet<NodeId>,
) -> BTreeSet<NodeId> {
    let mut remaining = nodes.clone();
    let mut best = BTreeSet::new();
    while let Some(start) = remaining.pop_first() {
        let mut component = BTreeSet::from([start]);
        let mut stack = vec![start];
        while let Some(u) = stack.pop() {
            for &v in topo.neighbors(u).keys() {
                if remaining.remove(&v) {
                    component.insert(v);
                    stack.push(v);
                }
            }
        }
        if component.len() > best.len() {
            best = component;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn star() -> SimpleGraph<char, u8> {
        let mut g = SimpleGraph::new();
        let c = g.add_node('c');
        for label in ['a', 'b', 'd'] {
            let leaf = g.add_node(label);
            g.add_edge(c, leaf, 1).unwrap();
        }
        g
    }

    #[test]
    fn line_graph_of_star_is_triangle() {
        let lg = line_graph(&star()).unwrap();
        assert_eq!(lg.node_count(), 3);
        assert_eq!(lg.edge_count(), 3);
        for e in lg.edge_set() {
            assert_eq!(lg.edge_attr(e), Ok(&0));
        }
    }

    #[test]
    fn line_graph_of_path() {
        let mut g = SimpleGraph::<(), ()>::new();
        for _ in 0..4 {
            g.add_node(());
        }
        for i in 1..4 {
            g.add_edge(i - 1, i, ()).unwrap();
        }
        let lg = line_graph(&g).unwrap();
        assert_eq!(lg.node_count(), 3);
        assert_eq!(lg.adjacencies(1).unwrap(), BTreeSet::from([0, 2]));
        assert_eq!(lg.node_attr(2), Ok(&2));
    }

    #[test]
    fn induced_subgraph_keeps_attributes() {
        let g = star();
        let (sub, map) = induced_subgraph(&g, &BTreeSet::from([0, 2, 3])).unwrap();
        assert_eq!(sub.node_count(), 3);
        assert_eq!(sub.edge_count(), 2);
        assert_eq!(sub.node_attr(map[&2]), Ok(&'b'));
    }

    #[test]
    fn edge_subgraph_pulls_in_endpoints() {
        let (sub, map) = edge_induced_subgraph(&star(), &BTreeSet::from([1])).unwrap();
        assert_eq!(sub.node_count(), 2);
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![0, 2]);
        assert!(edge_induced_subgraph(&star(), &BTreeSet::from([7])).is_err());
    }

    #[test]
    fn largest_connected_subset_picks_biggest_piece() {
        let t = Topology::from_edges(6, &[(0, 1), (2, 3), (3, 4), (4, 5)]).unwrap();
        let picked = largest_connected_subset(&t, &BTreeSet::from([0, 1, 2, 3, 4]));
        assert_eq!(picked, BTreeSet::from([2, 3, 4]));
        let tie = largest_connected_subset(&t, &BTreeSet::from([0, 1, 3, 4]));
        assert_eq!(tie, BTreeSet::from([0, 1]));
    }
}
